use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_dynamo::aws_sdk_dynamodb_1::to_item;

use crate::repositories::errors::lock_repository_errors::LockRepositoryError;

/// A held lease on one match. Only the owner may release it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchLease {
    pub match_id: String,
    pub owner: String,
    pub expires_at_ms: i64,
}

impl MatchLease {
    pub fn new(match_id: &str, owner: &str, now: DateTime<Utc>, ttl_ms: i64) -> Self {
        MatchLease {
            match_id: match_id.to_string(),
            owner: owner.to_string(),
            expires_at_ms: now.timestamp_millis() + ttl_ms,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at_ms <= now.timestamp_millis()
    }
}

#[async_trait]
pub trait LockRepository: Send + Sync {
    /// Takes the lease if nobody holds it or the holder's lease has expired.
    /// Returns `false` when someone else holds a live lease.
    async fn try_acquire(&self, lease: &MatchLease, now: DateTime<Utc>)
        -> Result<bool, LockRepositoryError>;

    /// Drops the lease if still owned. Releasing a lease that was taken over is a no-op.
    async fn release(&self, lease: &MatchLease) -> Result<(), LockRepositoryError>;
}

pub struct DynamoDbLockRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbLockRepository {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl LockRepository for DynamoDbLockRepository {
    async fn try_acquire(
        &self,
        lease: &MatchLease,
        now: DateTime<Utc>,
    ) -> Result<bool, LockRepositoryError> {
        let item = to_item(lease).map_err(|e| LockRepositoryError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(match_id) OR expires_at_ms <= :now")
            .expression_attribute_values(":now", AttributeValue::N(now.timestamp_millis().to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        return Ok(false);
                    }
                }
                Err(LockRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }

    async fn release(&self, lease: &MatchLease) -> Result<(), LockRepositoryError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("match_id", AttributeValue::S(lease.match_id.clone()))
            .condition_expression("#owner = :owner")
            .expression_attribute_names("#owner", "owner")
            .expression_attribute_values(":owner", AttributeValue::S(lease.owner.clone()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        return Ok(());
                    }
                }
                Err(LockRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }
}
