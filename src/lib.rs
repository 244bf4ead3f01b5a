//! CPF Authorizer - authorizes people by CPF and manages their profiles
//!
//! This library provides the record-access core and its plumbing:
//! - a record store abstraction with DynamoDB and in-memory backends
//! - the profile repository (lookup, full-overwrite upsert, merge, redact)
//! - the authorization service and the HTTP adapter in front of it

pub mod authorization;
pub mod aws;
pub mod config;
pub mod dynamodb;
pub mod error;
pub mod http;
pub mod lambda;
pub mod profile;
pub mod repository;
pub mod store;
