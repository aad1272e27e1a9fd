use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_dynamo::aws_sdk_dynamodb_1::to_item;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

use crate::models::match_state::{Match, MatchResult};
use crate::repositories::errors::rating_trigger_errors::RatingTriggerError;

/// Work item for the rating service. Keyed by match id so it is written at most once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingJob {
    pub match_id: String,
    pub white_id: String,
    pub black_id: String,
    pub result: MatchResult,
    pub time_control: String,
    pub finished_at: DateTime<Utc>,
}

impl RatingJob {
    /// `None` for matches that have no result yet.
    pub fn from_match(m: &Match) -> Option<Self> {
        Some(RatingJob {
            match_id: m.match_id.clone(),
            white_id: m.white_id.clone(),
            black_id: m.black_id.clone(),
            result: m.result?,
            time_control: m.time_control.to_string(),
            finished_at: m.finished_at?,
        })
    }
}

/// Hands finished rated games to rating recomputation. Calls must be idempotent
/// per match id.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait RatingTrigger: Send + Sync {
    async fn on_match_finished(&self, job: &RatingJob) -> Result<(), RatingTriggerError>;
}

pub struct DynamoDbRatingTrigger {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbRatingTrigger {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }
}

#[async_trait]
impl RatingTrigger for DynamoDbRatingTrigger {
    async fn on_match_finished(&self, job: &RatingJob) -> Result<(), RatingTriggerError> {
        let item = to_item(job).map_err(|e| RatingTriggerError::Serialization(e.to_string()))?;

        let result = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .condition_expression("attribute_not_exists(match_id)")
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        debug!(match_id = %job.match_id, "Rating job already recorded");
                        return Ok(());
                    }
                }
                Err(RatingTriggerError::DynamoDb(e.to_string()))
            }
        }
    }
}
