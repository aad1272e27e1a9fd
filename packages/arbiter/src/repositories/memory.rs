//! In-process adapters for every storage trait. Used by the test suites and for
//! running the API locally without DynamoDB. They give the same atomicity as the
//! DynamoDB conditional writes by doing each operation under one lock.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::models::match_event::MatchEvent;
use crate::models::match_state::Match;
use crate::models::queue::{PendingAssignment, QueueEntry, QueueKey};
use crate::repositories::errors::event_repository_errors::EventRepositoryError;
use crate::repositories::errors::lock_repository_errors::LockRepositoryError;
use crate::repositories::errors::match_repository_errors::MatchRepositoryError;
use crate::repositories::errors::queue_repository_errors::QueueRepositoryError;
use crate::repositories::errors::rating_trigger_errors::RatingTriggerError;
use crate::repositories::event_repository::EventRepository;
use crate::repositories::lock_repository::{LockRepository, MatchLease};
use crate::repositories::match_repository::MatchRepository;
use crate::repositories::queue_repository::QueueRepository;
use crate::repositories::rating_trigger::{RatingJob, RatingTrigger};

#[derive(Default)]
struct WaitingList {
    entries: VecDeque<QueueEntry>,
    members: HashSet<String>,
}

#[derive(Default)]
pub struct InMemoryQueueRepository {
    queues: Mutex<HashMap<QueueKey, WaitingList>>,
    assignments: Mutex<HashMap<String, PendingAssignment>>,
}

impl InMemoryQueueRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry without the membership check, as a lost race would.
    pub async fn seed_raw(&self, entry: QueueEntry) {
        let mut queues = self.queues.lock().await;
        let list = queues.entry(entry.key).or_default();
        list.members.insert(entry.player_id.clone());
        list.entries.push_back(entry);
    }

    pub async fn waiting(&self, key: &QueueKey) -> Vec<String> {
        let queues = self.queues.lock().await;
        queues
            .get(key)
            .map(|list| list.entries.iter().map(|e| e.player_id.clone()).collect())
            .unwrap_or_default()
    }

    pub async fn is_member(&self, key: &QueueKey, player_id: &str) -> bool {
        let queues = self.queues.lock().await;
        queues
            .get(key)
            .is_some_and(|list| list.members.contains(player_id))
    }
}

#[async_trait]
impl QueueRepository for InMemoryQueueRepository {
    async fn enqueue_if_absent(&self, entry: &QueueEntry) -> Result<bool, QueueRepositoryError> {
        let mut queues = self.queues.lock().await;
        let list = queues.entry(entry.key).or_default();
        if !list.members.insert(entry.player_id.clone()) {
            return Ok(false);
        }
        list.entries.push_back(entry.clone());
        Ok(true)
    }

    async fn pop_two(
        &self,
        key: &QueueKey,
    ) -> Result<Option<(QueueEntry, QueueEntry)>, QueueRepositoryError> {
        let mut queues = self.queues.lock().await;
        let Some(list) = queues.get_mut(key) else {
            return Ok(None);
        };
        if list.entries.len() < 2 {
            return Ok(None);
        }
        let (Some(first), Some(second)) = (list.entries.pop_front(), list.entries.pop_front())
        else {
            return Ok(None);
        };
        if first.player_id != second.player_id {
            list.members.remove(&first.player_id);
            list.members.remove(&second.player_id);
        }
        Ok(Some((first, second)))
    }

    async fn push_front(&self, entry: &QueueEntry) -> Result<(), QueueRepositoryError> {
        let mut queues = self.queues.lock().await;
        queues
            .entry(entry.key)
            .or_default()
            .entries
            .push_front(entry.clone());
        Ok(())
    }

    async fn leave_queue(
        &self,
        key: &QueueKey,
        player_id: &str,
    ) -> Result<bool, QueueRepositoryError> {
        let mut queues = self.queues.lock().await;
        let Some(list) = queues.get_mut(key) else {
            return Ok(false);
        };
        if !list.members.remove(player_id) {
            return Ok(false);
        }
        list.entries.retain(|e| e.player_id != player_id);
        Ok(true)
    }

    async fn record_assignment(
        &self,
        assignment: &PendingAssignment,
    ) -> Result<(), QueueRepositoryError> {
        self.assignments
            .lock()
            .await
            .insert(assignment.player_id.clone(), assignment.clone());
        Ok(())
    }

    async fn pending_assignment(
        &self,
        player_id: &str,
    ) -> Result<Option<PendingAssignment>, QueueRepositoryError> {
        Ok(self.assignments.lock().await.get(player_id).cloned())
    }

    async fn clear_assignment(
        &self,
        player_id: &str,
        match_id: &str,
    ) -> Result<(), QueueRepositoryError> {
        let mut assignments = self.assignments.lock().await;
        if assignments
            .get(player_id)
            .is_some_and(|a| a.match_id == match_id)
        {
            assignments.remove(player_id);
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct InMemoryMatchRepository {
    matches: Mutex<HashMap<String, Match>>,
    failing_updates: AtomicUsize,
}

impl InMemoryMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` row updates fail as if the process died mid-commit.
    pub fn fail_next_updates(&self, count: usize) {
        self.failing_updates.store(count, Ordering::SeqCst);
    }

    pub async fn stored(&self, match_id: &str) -> Option<Match> {
        self.matches.lock().await.get(match_id).cloned()
    }
}

#[async_trait]
impl MatchRepository for InMemoryMatchRepository {
    async fn create_match(&self, m: &Match) -> Result<(), MatchRepositoryError> {
        let mut matches = self.matches.lock().await;
        if matches.contains_key(&m.match_id) {
            return Err(MatchRepositoryError::AlreadyExists);
        }
        matches.insert(m.match_id.clone(), m.clone());
        Ok(())
    }

    async fn get_match(&self, match_id: &str) -> Result<Option<Match>, MatchRepositoryError> {
        Ok(self.matches.lock().await.get(match_id).cloned())
    }

    async fn update_match(
        &self,
        m: &Match,
        expected_sequence: u64,
    ) -> Result<(), MatchRepositoryError> {
        if self
            .failing_updates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(MatchRepositoryError::DynamoDb(
                "injected update failure".to_string(),
            ));
        }

        let mut matches = self.matches.lock().await;
        match matches.get(&m.match_id) {
            Some(stored) if stored.last_sequence == expected_sequence => {
                matches.insert(m.match_id.clone(), m.clone());
                Ok(())
            }
            _ => Err(MatchRepositoryError::Conflict {
                match_id: m.match_id.clone(),
                expected_sequence,
            }),
        }
    }
}

#[derive(Default)]
pub struct InMemoryEventRepository {
    logs: Mutex<HashMap<String, BTreeMap<u64, MatchEvent>>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all_events(&self, match_id: &str) -> Vec<MatchEvent> {
        self.logs
            .lock()
            .await
            .get(match_id)
            .map(|log| log.values().cloned().collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn append_event(&self, event: &MatchEvent) -> Result<(), EventRepositoryError> {
        let mut logs = self.logs.lock().await;
        let log = logs.entry(event.match_id.clone()).or_default();
        if log.contains_key(&event.sequence) {
            return Err(EventRepositoryError::Duplicate {
                match_id: event.match_id.clone(),
                sequence: event.sequence,
            });
        }
        log.insert(event.sequence, event.clone());
        Ok(())
    }

    async fn events_after(
        &self,
        match_id: &str,
        after: u64,
    ) -> Result<Vec<MatchEvent>, EventRepositoryError> {
        let logs = self.logs.lock().await;
        Ok(logs
            .get(match_id)
            .map(|log| {
                log.range(after.saturating_add(1)..)
                    .map(|(_, e)| e.clone())
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct InMemoryLockRepository {
    leases: Mutex<HashMap<String, MatchLease>>,
}

impl InMemoryLockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn holder(&self, match_id: &str) -> Option<MatchLease> {
        self.leases.lock().await.get(match_id).cloned()
    }
}

#[async_trait]
impl LockRepository for InMemoryLockRepository {
    async fn try_acquire(
        &self,
        lease: &MatchLease,
        now: DateTime<Utc>,
    ) -> Result<bool, LockRepositoryError> {
        let mut leases = self.leases.lock().await;
        match leases.get(&lease.match_id) {
            Some(current) if !current.is_expired(now) => Ok(false),
            _ => {
                leases.insert(lease.match_id.clone(), lease.clone());
                Ok(true)
            }
        }
    }

    async fn release(&self, lease: &MatchLease) -> Result<(), LockRepositoryError> {
        let mut leases = self.leases.lock().await;
        if leases
            .get(&lease.match_id)
            .is_some_and(|current| current.owner == lease.owner)
        {
            leases.remove(&lease.match_id);
        }
        Ok(())
    }
}

/// Keeps every call so tests can count them. Duplicate match ids are recorded
/// once, as the DynamoDB trigger does.
#[derive(Default)]
pub struct RecordingRatingTrigger {
    calls: AtomicUsize,
    jobs: Mutex<Vec<RatingJob>>,
    unavailable: AtomicBool,
}

impl RecordingRatingTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn jobs(&self) -> Vec<RatingJob> {
        self.jobs.lock().await.clone()
    }
}

#[async_trait]
impl RatingTrigger for RecordingRatingTrigger {
    async fn on_match_finished(&self, job: &RatingJob) -> Result<(), RatingTriggerError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RatingTriggerError::Unavailable(
                "rating queue offline".to_string(),
            ));
        }
        let mut jobs = self.jobs.lock().await;
        if !jobs.iter().any(|j| j.match_id == job.match_id) {
            jobs.push(job.clone());
        }
        Ok(())
    }
}
