//! HTTP adapter
//!
//! Routes requests to the [`AuthorizationService`] and renders outcomes as
//! status codes and JSON bodies. The same router serves the hyper server and
//! the Lambda runtime.
//!
//! ## Routes
//!
//! - `POST /authorize`: body `{"cpf": "..."}`; 200 when registered, 401 otherwise
//! - `POST /user`: body is a full profile; 201 on success
//! - `PATCH /user/{cpf}`: body is a partial profile; 204 on success
//! - `PUT /user/{cpf}/clean`: redacts the profile; 204 on success, 404 if unknown
//! - `GET /health`

use crate::authorization::{AuthorizationService, UNAUTHORIZED_MESSAGE};
use crate::profile::Profile;
use crate::repository::Redaction;
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Body;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Method, Request, Response, StatusCode};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt::Display;
use thiserror::Error;
use tracing::{debug, error, warn};

/// Errors raised while reading a request body
#[derive(Error, Debug)]
pub enum BodyError {
    #[error("failed to read request body: {0}")]
    Read(String),

    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

/// Body of `POST /authorize`
#[derive(Debug, Deserialize)]
pub struct AuthorizeRequest {
    #[serde(default)]
    pub cpf: String,
}

/// Transport-neutral response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Bytes,
}

impl ApiResponse {
    fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: Bytes::new(),
        }
    }

    fn json<T: Serialize>(status: StatusCode, value: &T) -> Self {
        match serde_json::to_vec(value) {
            Ok(body) => Self {
                status,
                body: Bytes::from(body),
            },
            Err(e) => {
                error!(error = %e, "Failed to serialize response");
                Self::error(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
            }
        }
    }

    fn error(status: StatusCode, message: &str) -> Self {
        Self {
            status,
            body: Bytes::from(serde_json::json!({ "error": message }).to_string()),
        }
    }

    /// Builds an `http` response, wrapping the body bytes with `wrap`
    pub fn into_response<B>(self, wrap: impl FnOnce(Bytes) -> B) -> Response<B> {
        let has_body = !self.body.is_empty();
        let mut response = Response::new(wrap(self.body));
        *response.status_mut() = self.status;
        if has_body {
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        response
    }
}

#[derive(Clone)]
pub struct Router {
    service: AuthorizationService,
}

impl Router {
    pub fn new(service: AuthorizationService) -> Self {
        Self { service }
    }

    /// Handles one request
    pub async fn dispatch<B>(&self, req: Request<B>) -> ApiResponse
    where
        B: Body,
        B::Error: Display,
    {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let decoded: Vec<Cow<'_, str>> = match path
            .trim_matches('/')
            .split('/')
            .map(|segment| percent_decode_str(segment).decode_utf8())
            .collect()
        {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(path = %path, error = %e, "Path is not valid UTF-8 once decoded");
                return ApiResponse::error(StatusCode::BAD_REQUEST, "invalid path");
            }
        };
        let segments: Vec<&str> = decoded.iter().map(|segment| segment.as_ref()).collect();
        debug!(method = %method, path = %path, "Dispatching request");

        match (&method, segments.as_slice()) {
            (&Method::POST, ["authorize"]) => self.authorize(req.into_body()).await,
            (&Method::POST, ["user"]) => self.create(req.into_body()).await,
            (&Method::PATCH, ["user", cpf]) => self.update(cpf, req.into_body()).await,
            (&Method::PUT, ["user", cpf, "clean"]) => self.redact(cpf).await,
            (&Method::GET, ["health"]) => {
                ApiResponse::json(StatusCode::OK, &serde_json::json!({ "status": "ok" }))
            }
            _ => ApiResponse::error(StatusCode::NOT_FOUND, "not found"),
        }
    }

    async fn authorize<B>(&self, body: B) -> ApiResponse
    where
        B: Body,
        B::Error: Display,
    {
        let request: AuthorizeRequest = match read_json(body).await {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Bad request");
                return ApiResponse::error(StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE);
            }
        };
        if request.cpf.is_empty() {
            warn!("Bad request: empty cpf");
            return ApiResponse::error(StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE);
        }

        match self.service.authorize(&request.cpf).await {
            Ok(result) if result.authorized => ApiResponse::json(StatusCode::OK, &result),
            Ok(result) => ApiResponse::json(StatusCode::UNAUTHORIZED, &result),
            Err(e) => {
                error!(cpf = %request.cpf, error = %e, "Failed to get user");
                ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "failed to get user")
            }
        }
    }

    async fn create<B>(&self, body: B) -> ApiResponse
    where
        B: Body,
        B::Error: Display,
    {
        let profile: Profile = match read_json(body).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(error = %e, "Failed to bind user");
                return ApiResponse::error(StatusCode::BAD_REQUEST, "invalid request payload");
            }
        };
        if profile.cpf.is_empty() {
            warn!("Failed to bind user: empty cpf");
            return ApiResponse::error(StatusCode::BAD_REQUEST, "invalid request payload");
        }

        match self.service.create_or_replace(&profile).await {
            Ok(()) => ApiResponse::empty(StatusCode::CREATED),
            Err(e) => {
                error!(cpf = %profile.cpf, error = %e, "Failed to save user");
                ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "failed to create user")
            }
        }
    }

    async fn update<B>(&self, cpf: &str, body: B) -> ApiResponse
    where
        B: Body,
        B::Error: Display,
    {
        if cpf.is_empty() {
            return ApiResponse::error(StatusCode::BAD_REQUEST, "cpf must not be empty");
        }
        let mut profile: Profile = match read_json(body).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!(cpf = %cpf, error = %e, "Failed to bind user");
                return ApiResponse::error(StatusCode::BAD_REQUEST, "invalid request payload");
            }
        };
        if profile.cpf.is_empty() {
            profile.cpf = cpf.to_string();
        } else if profile.cpf != cpf {
            warn!(cpf = %cpf, body_cpf = %profile.cpf, "Path and body cpf differ");
            return ApiResponse::error(StatusCode::BAD_REQUEST, "cpf does not match path");
        }

        match self.service.update(&profile).await {
            Ok(()) => ApiResponse::empty(StatusCode::NO_CONTENT),
            Err(e) => {
                error!(cpf = %cpf, error = %e, "Failed to update user");
                ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "failed to update user")
            }
        }
    }

    async fn redact(&self, cpf: &str) -> ApiResponse {
        if cpf.is_empty() {
            return ApiResponse::error(StatusCode::BAD_REQUEST, "cpf must not be empty");
        }

        match self.service.redact(cpf).await {
            Ok(Redaction::Redacted) => ApiResponse::empty(StatusCode::NO_CONTENT),
            Ok(Redaction::NotFound) => ApiResponse::error(StatusCode::NOT_FOUND, "user not found"),
            Err(e) => {
                error!(cpf = %cpf, error = %e, "Failed to deactivate user");
                ApiResponse::error(StatusCode::INTERNAL_SERVER_ERROR, "failed to deactivate user")
            }
        }
    }
}

/// Reads the whole body and parses it as JSON
async fn read_json<T, B>(body: B) -> Result<T, BodyError>
where
    T: serde::de::DeserializeOwned,
    B: Body,
    B::Error: Display,
{
    let bytes = body
        .collect()
        .await
        .map_err(|e| BodyError::Read(e.to_string()))?
        .to_bytes();
    Ok(serde_json::from_slice(&bytes)?)
}
