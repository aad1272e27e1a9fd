use async_trait::async_trait;
use aws_sdk_dynamodb::error::SdkError;
use aws_sdk_dynamodb::types::{AttributeValue, Delete, Put, TransactWriteItem};
use aws_sdk_dynamodb::Client;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_dynamo::aws_sdk_dynamodb_1::{from_item, to_item};

use crate::models::queue::{PendingAssignment, QueueEntry, QueueKey};
use crate::models::side::Side;
use crate::repositories::errors::queue_repository_errors::QueueRepositoryError;

/// Waiting lists, one per queue key, oldest entry first.
#[async_trait]
pub trait QueueRepository: Send + Sync {
    /// Adds the player unless they are already waiting on this key. Returns
    /// `false` when the membership check fails. Check and insert are one operation.
    async fn enqueue_if_absent(&self, entry: &QueueEntry) -> Result<bool, QueueRepositoryError>;

    /// Removes the two oldest entries in one step, or nothing if fewer than two wait.
    /// When the two entries belong to different players their memberships are
    /// released in the same step.
    async fn pop_two(
        &self,
        key: &QueueKey,
    ) -> Result<Option<(QueueEntry, QueueEntry)>, QueueRepositoryError>;

    /// Puts an entry back at the head of its queue without touching membership.
    async fn push_front(&self, entry: &QueueEntry) -> Result<(), QueueRepositoryError>;

    /// Removes a waiting player. Returns `false` if they were not queued.
    async fn leave_queue(&self, key: &QueueKey, player_id: &str)
        -> Result<bool, QueueRepositoryError>;

    /// Stores the seat a player was given, replacing any older one.
    async fn record_assignment(
        &self,
        assignment: &PendingAssignment,
    ) -> Result<(), QueueRepositoryError>;

    async fn pending_assignment(
        &self,
        player_id: &str,
    ) -> Result<Option<PendingAssignment>, QueueRepositoryError>;

    /// Drops the player's assignment if it still points at `match_id`.
    async fn clear_assignment(
        &self,
        player_id: &str,
        match_id: &str,
    ) -> Result<(), QueueRepositoryError>;
}

const ENTRY_PREFIX: &str = "E#";
const MEMBER_PREFIX: &str = "M#";
const ASSIGNMENT_PREFIX: &str = "A#";
const ASSIGNMENT_SORT_KEY: &str = "assignment";
const POP_ATTEMPTS: usize = 3;

/// One row of the queue table. Entries and memberships share a partition so a
/// single transaction can touch both.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct QueueItem {
    queue_key: String,
    sort_key: String,
    player_id: String,
    joined_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    entry_sort_key: Option<String>,
}

/// Assignments live in their own partition per player, outside any waiting list.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct AssignmentItem {
    queue_key: String,
    sort_key: String,
    player_id: String,
    match_id: String,
    side: Side,
    assigned_at: DateTime<Utc>,
}

fn assignment_partition(player_id: &str) -> String {
    format!("{}{}", ASSIGNMENT_PREFIX, player_id)
}

fn entry_sort_key(entry: &QueueEntry) -> String {
    // Zero padded so lexical order is arrival order.
    format!(
        "{}{:020}#{}",
        ENTRY_PREFIX,
        entry.joined_at.timestamp_millis().max(0),
        entry.player_id
    )
}

fn member_sort_key(player_id: &str) -> String {
    format!("{}{}", MEMBER_PREFIX, player_id)
}

pub struct DynamoDbQueueRepository {
    pub client: Client,
    pub table_name: String,
}

impl DynamoDbQueueRepository {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    fn entry_item(&self, entry: &QueueEntry) -> QueueItem {
        QueueItem {
            queue_key: entry.key.partition_key(),
            sort_key: entry_sort_key(entry),
            player_id: entry.player_id.clone(),
            joined_at: entry.joined_at,
            entry_sort_key: None,
        }
    }

    fn delete_op(
        &self,
        partition: &str,
        sort_key: &str,
    ) -> Result<TransactWriteItem, QueueRepositoryError> {
        let delete = Delete::builder()
            .table_name(&self.table_name)
            .key("queue_key", AttributeValue::S(partition.to_string()))
            .key("sort_key", AttributeValue::S(sort_key.to_string()))
            .condition_expression("attribute_exists(sort_key)")
            .build()
            .map_err(|e| QueueRepositoryError::Transaction(e.to_string()))?;
        Ok(TransactWriteItem::builder().delete(delete).build())
    }

    async fn oldest_two(&self, key: &QueueKey) -> Result<Vec<QueueItem>, QueueRepositoryError> {
        let output = self
            .client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("queue_key = :queue_key AND begins_with(sort_key, :prefix)")
            .expression_attribute_values(":queue_key", AttributeValue::S(key.partition_key()))
            .expression_attribute_values(":prefix", AttributeValue::S(ENTRY_PREFIX.to_string()))
            .consistent_read(true)
            .limit(2)
            .send()
            .await
            .map_err(|e| QueueRepositoryError::DynamoDb(e.to_string()))?;

        output
            .items
            .unwrap_or_default()
            .into_iter()
            .map(|item| {
                from_item(item).map_err(|e| QueueRepositoryError::Serialization(e.to_string()))
            })
            .collect()
    }
}

fn to_entry(key: &QueueKey, item: QueueItem) -> QueueEntry {
    QueueEntry::new(*key, &item.player_id, item.joined_at)
}

#[async_trait]
impl QueueRepository for DynamoDbQueueRepository {
    async fn enqueue_if_absent(&self, entry: &QueueEntry) -> Result<bool, QueueRepositoryError> {
        let partition = entry.key.partition_key();
        let entry_item = self.entry_item(entry);
        let member_item = QueueItem {
            queue_key: partition.clone(),
            sort_key: member_sort_key(&entry.player_id),
            player_id: entry.player_id.clone(),
            joined_at: entry.joined_at,
            entry_sort_key: Some(entry_item.sort_key.clone()),
        };

        let member_put = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(
                to_item(&member_item)
                    .map_err(|e| QueueRepositoryError::Serialization(e.to_string()))?,
            ))
            .condition_expression("attribute_not_exists(sort_key)")
            .build()
            .map_err(|e| QueueRepositoryError::Transaction(e.to_string()))?;
        let entry_put = Put::builder()
            .table_name(&self.table_name)
            .set_item(Some(
                to_item(&entry_item)
                    .map_err(|e| QueueRepositoryError::Serialization(e.to_string()))?,
            ))
            .build()
            .map_err(|e| QueueRepositoryError::Transaction(e.to_string()))?;

        let result = self
            .client
            .transact_write_items()
            .transact_items(TransactWriteItem::builder().put(member_put).build())
            .transact_items(TransactWriteItem::builder().put(entry_put).build())
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_transaction_canceled_exception() {
                        return Ok(false);
                    }
                }
                Err(QueueRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }

    async fn pop_two(
        &self,
        key: &QueueKey,
    ) -> Result<Option<(QueueEntry, QueueEntry)>, QueueRepositoryError> {
        let partition = key.partition_key();

        for _ in 0..POP_ATTEMPTS {
            let mut oldest = self.oldest_two(key).await?;
            if oldest.len() < 2 {
                return Ok(None);
            }
            let second = oldest.remove(1);
            let first = oldest.remove(0);

            let mut ops = vec![
                self.delete_op(&partition, &first.sort_key)?,
                self.delete_op(&partition, &second.sort_key)?,
            ];
            if first.player_id != second.player_id {
                ops.push(self.delete_op(&partition, &member_sort_key(&first.player_id))?);
                ops.push(self.delete_op(&partition, &member_sort_key(&second.player_id))?);
            }

            let result = self
                .client
                .transact_write_items()
                .set_transact_items(Some(ops))
                .send()
                .await;

            match result {
                Ok(_) => return Ok(Some((to_entry(key, first), to_entry(key, second)))),
                Err(e) => {
                    if let SdkError::ServiceError(service_err) = &e {
                        if service_err.err().is_transaction_canceled_exception() {
                            // Another pairer took one of them; look again.
                            continue;
                        }
                    }
                    return Err(QueueRepositoryError::Transaction(e.to_string()));
                }
            }
        }

        Ok(None)
    }

    async fn push_front(&self, entry: &QueueEntry) -> Result<(), QueueRepositoryError> {
        // The original join time keeps the entry ahead of everyone who arrived later.
        let item = to_item(self.entry_item(entry))
            .map_err(|e| QueueRepositoryError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| QueueRepositoryError::DynamoDb(e.to_string()))?;

        Ok(())
    }

    async fn leave_queue(
        &self,
        key: &QueueKey,
        player_id: &str,
    ) -> Result<bool, QueueRepositoryError> {
        let partition = key.partition_key();
        let member_key = member_sort_key(player_id);

        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("queue_key", AttributeValue::S(partition.clone()))
            .key("sort_key", AttributeValue::S(member_key.clone()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| QueueRepositoryError::DynamoDb(e.to_string()))?;

        let Some(item) = output.item else {
            return Ok(false);
        };
        let member: QueueItem =
            from_item(item).map_err(|e| QueueRepositoryError::Serialization(e.to_string()))?;

        let mut ops = vec![self.delete_op(&partition, &member_key)?];
        if let Some(entry_key) = member.entry_sort_key {
            let delete = Delete::builder()
                .table_name(&self.table_name)
                .key("queue_key", AttributeValue::S(partition.clone()))
                .key("sort_key", AttributeValue::S(entry_key))
                .build()
                .map_err(|e| QueueRepositoryError::Transaction(e.to_string()))?;
            ops.push(TransactWriteItem::builder().delete(delete).build());
        }

        let result = self
            .client
            .transact_write_items()
            .set_transact_items(Some(ops))
            .send()
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_transaction_canceled_exception() {
                        // Paired or removed concurrently.
                        return Ok(false);
                    }
                }
                Err(QueueRepositoryError::Transaction(e.to_string()))
            }
        }
    }

    async fn record_assignment(
        &self,
        assignment: &PendingAssignment,
    ) -> Result<(), QueueRepositoryError> {
        let item = AssignmentItem {
            queue_key: assignment_partition(&assignment.player_id),
            sort_key: ASSIGNMENT_SORT_KEY.to_string(),
            player_id: assignment.player_id.clone(),
            match_id: assignment.match_id.clone(),
            side: assignment.side,
            assigned_at: assignment.assigned_at,
        };
        let item = to_item(item).map_err(|e| QueueRepositoryError::Serialization(e.to_string()))?;

        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| QueueRepositoryError::DynamoDb(e.to_string()))?;

        Ok(())
    }

    async fn pending_assignment(
        &self,
        player_id: &str,
    ) -> Result<Option<PendingAssignment>, QueueRepositoryError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key("queue_key", AttributeValue::S(assignment_partition(player_id)))
            .key("sort_key", AttributeValue::S(ASSIGNMENT_SORT_KEY.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| QueueRepositoryError::DynamoDb(e.to_string()))?;

        let Some(item) = output.item else {
            return Ok(None);
        };
        let item: AssignmentItem =
            from_item(item).map_err(|e| QueueRepositoryError::Serialization(e.to_string()))?;

        Ok(Some(PendingAssignment {
            player_id: item.player_id,
            match_id: item.match_id,
            side: item.side,
            assigned_at: item.assigned_at,
        }))
    }

    async fn clear_assignment(
        &self,
        player_id: &str,
        match_id: &str,
    ) -> Result<(), QueueRepositoryError> {
        let result = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key("queue_key", AttributeValue::S(assignment_partition(player_id)))
            .key("sort_key", AttributeValue::S(ASSIGNMENT_SORT_KEY.to_string()))
            .condition_expression("match_id = :match_id")
            .expression_attribute_values(":match_id", AttributeValue::S(match_id.to_string()))
            .send()
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                if let SdkError::ServiceError(service_err) = &e {
                    if service_err.err().is_conditional_check_failed_exception() {
                        // Already replaced by a newer assignment.
                        return Ok(());
                    }
                }
                Err(QueueRepositoryError::DynamoDb(e.to_string()))
            }
        }
    }
}
