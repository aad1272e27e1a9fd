use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_item};

use crate::models::match_event::MatchEvent;
use crate::repositories::errors::event_repository_errors::EventRepositoryError;

/// Append-only per-match log keyed by (match_id, sequence).
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Writes the event unless its sequence is already taken (`Duplicate`).
    async fn append_event(&self, event: &MatchEvent) -> Result<(), EventRepositoryError>;

    /// Events with sequence strictly greater than `after`, in order.
    async fn events_after(
        &self,
        match_id: &str,
        after: u64,
    ) -> Result<Vec<MatchEvent>, EventRepositoryError>;
}

pub struct DynamoDbEventRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbEventRepository {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl EventRepository for DynamoDbEventRepository {
    async fn append_event(&self, event: &MatchEvent) -> Result<(), EventRepositoryError> {
        let item =
            to_item(event).map_err(|e| EventRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(#seq)")
            .expression_attribute_names("#seq", "sequence")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        return Err(EventRepositoryError::Duplicate {
                            match_id: event.match_id.clone(),
                            sequence: event.sequence,
                        });
                    }
                }
                Err(EventRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }

    async fn events_after(
        &self,
        match_id: &str,
        after: u64,
    ) -> Result<Vec<MatchEvent>, EventRepositoryError> {
        let mut events = Vec::new();
        let mut start_key = None;

        loop {
            let output = self
                .client
                .query()
                .table_name(&self.table_name)
                .key_condition_expression("match_id = :match_id AND #seq > :after")
                .expression_attribute_names("#seq", "sequence")
                .expression_attribute_values(":match_id", AttributeValue::S(match_id.to_string()))
                .expression_attribute_values(":after", AttributeValue::N(after.to_string()))
                .consistent_read(true)
                .set_exclusive_start_key(start_key)
                .send()
                .await
                .map_err(|e| EventRepositoryError::DynamoDb(e.to_string()))?;

            for item in output.items.unwrap_or_default() {
                let event: MatchEvent = from_item(item)
                    .map_err(|e| EventRepositoryError::Serialization(e.to_string()))?;
                events.push(event);
            }

            match output.last_evaluated_key {
                Some(key) if !key.is_empty() => start_key = Some(key),
                _ => break,
            }
        }

        Ok(events)
    }
}
