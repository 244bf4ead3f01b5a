//! Record store construction
//!
//! Builds the AWS SDK configuration and the DynamoDB client, or an in-memory
//! store for local development, from the resolved [`AppConfig`].
//!
//! ## Local DynamoDB
//!
//! Point the service at DynamoDB Local with:
//!
//! ```bash
//! DYNAMODB_TABLE_NAME=users DYNAMODB_ENDPOINT_URL=http://localhost:8000 cpf-authorizer
//! ```

use crate::config::{AppConfig, StoreBackend};
use crate::dynamodb::DynamoStore;
use crate::profile::CPF_ATTR;
use crate::store::{MemoryStore, RecordStore};
use aws_config::Region;
use aws_sdk_dynamodb::Client as DynamoClient;
use std::sync::Arc;
use tracing::info;

/// Creates the record store selected by `config`
pub async fn build_store(config: &AppConfig) -> Arc<dyn RecordStore> {
    match &config.backend {
        StoreBackend::DynamoDb {
            table_name,
            endpoint_url,
            region,
        } => {
            info!(
                table = %table_name,
                endpoint = ?endpoint_url,
                region = ?region,
                "Initializing DynamoDB client"
            );

            let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
            if let Some(region) = region {
                loader = loader.region(Region::new(region.clone()));
            }
            if let Some(endpoint_url) = endpoint_url {
                loader = loader.endpoint_url(endpoint_url);
            }
            let sdk_config = loader.load().await;

            let client = DynamoClient::new(&sdk_config);
            info!("DynamoDB client initialized successfully");

            Arc::new(DynamoStore::new(
                client,
                table_name,
                CPF_ATTR,
                config.store_timeout,
            ))
        }
        StoreBackend::Memory => {
            info!("Using in-memory record store (development mode)");
            Arc::new(MemoryStore::new(CPF_ATTR))
        }
    }
}
