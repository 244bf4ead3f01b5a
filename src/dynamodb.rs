//! DynamoDB-backed record store
//!
//! ## Table Schema
//!
//! The table uses a single-table design with:
//! - `CPF` (String): Partition key, no sort key
//! - every other attribute is a String holding one profile field
//!
//! Each call is bounded by the configured deadline. An elapsed deadline
//! surfaces as [`StoreError::Timeout`]; the SDK's own retry policy runs
//! inside that window.

use crate::error::StoreError;
use crate::profile::Item;
use crate::store::{RecordStore, Removal};
use async_trait::async_trait;
use aws_sdk_dynamodb::config::http::HttpResponse;
use aws_sdk_dynamodb::error::{DisplayErrorContext, SdkError};
use aws_sdk_dynamodb::operation::update_item::UpdateItemError;
use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
use aws_sdk_dynamodb::Client as DynamoClient;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

/// DynamoDB wrapper addressing one table by a single partition key
pub struct DynamoStore {
    client: DynamoClient,
    table_name: String,
    key_attribute: String,
    timeout: Duration,
}

impl DynamoStore {
    /// Creates a new store over `table_name`
    pub fn new(
        client: DynamoClient,
        table_name: impl Into<String>,
        key_attribute: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            key_attribute: key_attribute.into(),
            timeout,
        }
    }

    fn key(&self, key: &str) -> (String, AttributeValue) {
        (self.key_attribute.clone(), AttributeValue::S(key.to_string()))
    }
}

#[async_trait]
impl RecordStore for DynamoStore {
    async fn get(&self, key: &str) -> Result<Option<Item>, StoreError> {
        info!(key = %key, table = %self.table_name, "Retrieving record");
        let (key_name, key_value) = self.key(key);

        let response = with_deadline(self.timeout, "GetItem", async {
            self.client
                .get_item()
                .table_name(&self.table_name)
                .key(key_name, key_value)
                .send()
                .await
                .map_err(|e| unavailable("GetItem", e))
        })
        .await?;

        match response.item {
            Some(item) if !item.is_empty() => {
                let item = parse_item(item)?;
                debug!(key = %key, "Record retrieved successfully");
                Ok(Some(item))
            }
            _ => {
                debug!(key = %key, "Record not found");
                Ok(None)
            }
        }
    }

    async fn put(&self, key: &str, item: Item) -> Result<(), StoreError> {
        info!(key = %key, attributes = item.len(), "Storing record");

        let mut attributes: HashMap<String, AttributeValue> = item
            .into_iter()
            .map(|(name, value)| (name, AttributeValue::S(value)))
            .collect();
        let (key_name, key_value) = self.key(key);
        attributes.insert(key_name, key_value);

        with_deadline(self.timeout, "PutItem", async {
            self.client
                .put_item()
                .table_name(&self.table_name)
                .set_item(Some(attributes))
                .send()
                .await
                .map_err(|e| unavailable("PutItem", e))
        })
        .await?;

        debug!(key = %key, "Record stored successfully");
        Ok(())
    }

    async fn remove_attributes(
        &self,
        key: &str,
        attributes: &[&str],
    ) -> Result<Removal, StoreError> {
        info!(key = %key, attributes = ?attributes, "Removing record attributes");
        let (key_name, key_value) = self.key(key);
        let update = remove_expression(&self.key_attribute, attributes);

        let request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(key_name, key_value)
            .set_update_expression(update.expression)
            .set_condition_expression(update.condition)
            .set_expression_attribute_names(Some(update.names))
            .return_values(ReturnValue::UpdatedNew);

        let outcome = with_deadline(self.timeout, "UpdateItem", async {
            removal_outcome(request.send().await)
        })
        .await?;

        debug!(key = %key, outcome = ?outcome, "Attribute removal completed");
        Ok(outcome)
    }

    async fn set_attributes(&self, key: &str, attributes: Item) -> Result<(), StoreError> {
        info!(key = %key, attributes = attributes.len(), "Setting record attributes");
        let (key_name, key_value) = self.key(key);
        let update = set_expression(&self.key_attribute, attributes);

        let mut request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(key_name, key_value)
            .set_update_expression(update.expression);
        if !update.names.is_empty() {
            request = request
                .set_expression_attribute_names(Some(update.names))
                .set_expression_attribute_values(Some(update.values));
        }

        with_deadline(self.timeout, "UpdateItem", async {
            request
                .send()
                .await
                .map_err(|e| unavailable("UpdateItem", e))
        })
        .await?;

        debug!(key = %key, "Record attributes set");
        Ok(())
    }
}

/// Pieces of an UpdateItem request
#[derive(Debug, Default, PartialEq)]
struct UpdateExpression {
    expression: Option<String>,
    condition: Option<String>,
    names: HashMap<String, String>,
    values: HashMap<String, AttributeValue>,
}

/// `REMOVE` of `attributes`, conditional on the item existing
fn remove_expression(key_attribute: &str, attributes: &[&str]) -> UpdateExpression {
    let mut update = UpdateExpression {
        condition: Some("attribute_exists(#key)".to_string()),
        ..Default::default()
    };
    update
        .names
        .insert("#key".to_string(), key_attribute.to_string());

    let mut placeholders = Vec::with_capacity(attributes.len());
    for (i, attribute) in attributes.iter().enumerate() {
        let placeholder = format!("#a{}", i);
        update
            .names
            .insert(placeholder.clone(), attribute.to_string());
        placeholders.push(placeholder);
    }
    if !placeholders.is_empty() {
        update.expression = Some(format!("REMOVE {}", placeholders.join(", ")));
    }
    update
}

/// `SET` of every attribute except the key, in name order
fn set_expression(key_attribute: &str, attributes: Item) -> UpdateExpression {
    let mut update = UpdateExpression::default();
    let sorted: BTreeMap<String, String> = attributes
        .into_iter()
        .filter(|(name, _)| name != key_attribute)
        .collect();

    let mut assignments = Vec::with_capacity(sorted.len());
    for (i, (name, value)) in sorted.into_iter().enumerate() {
        update.names.insert(format!("#a{i}"), name);
        update
            .values
            .insert(format!(":v{i}"), AttributeValue::S(value));
        assignments.push(format!("#a{i} = :v{i}"));
    }
    if !assignments.is_empty() {
        update.expression = Some(format!("SET {}", assignments.join(", ")));
    }
    update
}

/// A failed existence condition means there was no item to redact.
/// The updated values are not needed; success is the absence of an error.
fn removal_outcome<O>(
    result: Result<O, SdkError<UpdateItemError, HttpResponse>>,
) -> Result<Removal, StoreError> {
    match result {
        Ok(_) => Ok(Removal::Applied),
        Err(e)
            if e.as_service_error()
                .is_some_and(|se| se.is_conditional_check_failed_exception()) =>
        {
            Ok(Removal::Missing)
        }
        Err(e) => Err(unavailable("UpdateItem", e)),
    }
}

/// Bounds `call` by `timeout`, reporting an elapsed deadline as a store timeout
async fn with_deadline<T, F>(
    timeout: Duration,
    operation: &'static str,
    call: F,
) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => {
            warn!(operation, timeout_ms = timeout.as_millis() as u64, "Store call timed out");
            Err(StoreError::Timeout { operation })
        }
    }
}

fn unavailable<E>(operation: &'static str, error: E) -> StoreError
where
    E: std::error::Error,
{
    StoreError::Unavailable {
        operation,
        message: DisplayErrorContext(error).to_string(),
    }
}

/// Parses a DynamoDB item into a store-neutral item
fn parse_item(item: HashMap<String, AttributeValue>) -> Result<Item, StoreError> {
    item.into_iter()
        .map(|(name, value)| match value {
            AttributeValue::S(s) => Ok((name, s)),
            other => Err(StoreError::Malformed {
                message: format!("expected string attribute, found {:?}", other),
                attribute: name,
            }),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_item_strings() {
        let mut raw = HashMap::new();
        raw.insert("CPF".to_string(), AttributeValue::S("111".to_string()));
        raw.insert("Name".to_string(), AttributeValue::S("Ana".to_string()));

        let item = parse_item(raw).unwrap();
        assert_eq!(item.get("CPF"), Some(&"111".to_string()));
        assert_eq!(item.get("Name"), Some(&"Ana".to_string()));
    }

    #[test]
    fn test_parse_item_rejects_non_string() {
        let mut raw = HashMap::new();
        raw.insert("CPF".to_string(), AttributeValue::S("111".to_string()));
        raw.insert("Phone".to_string(), AttributeValue::N("5550100".to_string()));

        let err = parse_item(raw).unwrap_err();
        assert!(matches!(err, StoreError::Malformed { ref attribute, .. } if attribute == "Phone"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_elapsed() {
        let call = std::future::pending::<Result<(), StoreError>>();
        let err = with_deadline(Duration::from_millis(50), "GetItem", call)
            .await
            .unwrap_err();
        assert_eq!(err, StoreError::Timeout { operation: "GetItem" });
    }

    #[tokio::test]
    async fn test_deadline_passes_result_through() {
        let ok = with_deadline(Duration::from_secs(1), "PutItem", async { Ok(7) }).await;
        assert_eq!(ok, Ok(7));

        let err = with_deadline(Duration::from_secs(1), "PutItem", async {
            Err::<(), _>(StoreError::Unavailable {
                operation: "PutItem",
                message: "throttled".to_string(),
            })
        })
        .await;
        assert!(matches!(err, Err(StoreError::Unavailable { .. })));
    }

    fn names(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_remove_expression() {
        let update = remove_expression("CPF", &["Name", "Email", "Phone", "Address"]);
        assert_eq!(
            update.expression.as_deref(),
            Some("REMOVE #a0, #a1, #a2, #a3")
        );
        assert_eq!(update.condition.as_deref(), Some("attribute_exists(#key)"));
        assert_eq!(
            update.names,
            names(&[
                ("#key", "CPF"),
                ("#a0", "Name"),
                ("#a1", "Email"),
                ("#a2", "Phone"),
                ("#a3", "Address"),
            ])
        );
        assert!(update.values.is_empty());
    }

    #[test]
    fn test_remove_expression_without_attributes_only_checks_existence() {
        let update = remove_expression("CPF", &[]);
        assert_eq!(update.expression, None);
        assert_eq!(update.condition.as_deref(), Some("attribute_exists(#key)"));
        assert_eq!(update.names, names(&[("#key", "CPF")]));
    }

    #[test]
    fn test_set_expression_skips_key() {
        let mut item = Item::new();
        item.insert("Phone".to_string(), "555".to_string());
        item.insert("CPF".to_string(), "999".to_string());
        item.insert("Email".to_string(), "c@x.com".to_string());

        let update = set_expression("CPF", item);
        assert_eq!(update.expression.as_deref(), Some("SET #a0 = :v0, #a1 = :v1"));
        assert_eq!(update.condition, None);
        assert_eq!(update.names, names(&[("#a0", "Email"), ("#a1", "Phone")]));
        assert_eq!(
            update.values.get(":v0"),
            Some(&AttributeValue::S("c@x.com".to_string()))
        );
        assert_eq!(
            update.values.get(":v1"),
            Some(&AttributeValue::S("555".to_string()))
        );
        assert_eq!(update.values.len(), 2);
    }

    #[test]
    fn test_set_expression_with_only_key_is_empty() {
        let mut item = Item::new();
        item.insert("CPF".to_string(), "999".to_string());
        assert_eq!(set_expression("CPF", item), UpdateExpression::default());
    }

    fn raw_response(status: u16) -> HttpResponse {
        HttpResponse::new(
            aws_smithy_runtime_api::http::StatusCode::try_from(status).unwrap(),
            aws_smithy_types::body::SdkBody::empty(),
        )
    }

    #[test]
    fn test_failed_condition_means_missing() {
        use aws_sdk_dynamodb::types::error::ConditionalCheckFailedException;

        let err = UpdateItemError::ConditionalCheckFailedException(
            ConditionalCheckFailedException::builder()
                .message("The conditional request failed")
                .build(),
        );
        let result: Result<(), _> = Err(SdkError::service_error(err, raw_response(400)));
        assert_eq!(removal_outcome(result), Ok(Removal::Missing));
    }

    #[test]
    fn test_removal_outcome_success_and_failure() {
        assert_eq!(removal_outcome(Ok(())), Ok(Removal::Applied));

        let result: Result<(), SdkError<UpdateItemError, HttpResponse>> =
            Err(SdkError::timeout_error("read timed out"));
        assert!(matches!(
            removal_outcome(result),
            Err(StoreError::Unavailable { operation: "UpdateItem", .. })
        ));
    }

    #[test]
    fn test_unavailable_keeps_operation() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "connection refused");
        let err = unavailable("GetItem", io);
        assert!(matches!(err, StoreError::Unavailable { operation: "GetItem", .. }));
        assert!(err.to_string().contains("connection refused"));
    }
}
