//! Transaction Buffer Module
//!
//! Pending operations per transaction ID, replayed in order on commit.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use crate::error::{CacheError, Result};

/// Closed markers kept for double-close detection; the oldest go first.
pub(crate) const MAX_CLOSED_MARKERS: usize = 1024;

// == Transaction Op ==
/// One deferred mutation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TransactionOp<V> {
    Set {
        cache_id: String,
        item_id: String,
        value: V,
        group_ids: Vec<String>,
    },
    Remove {
        cache_id: String,
        item_id: String,
    },
    RemoveGroup {
        cache_id: String,
        group_id: String,
    },
}

// == Transaction State ==
#[derive(Debug)]
enum TransactionState<V> {
    Open {
        ops: Vec<TransactionOp<V>>,
        opened_at: DateTime<Utc>,
    },
    /// Committed or rolled back; kept so a second close is reported
    Closed { closed_at: DateTime<Utc> },
}

// == Transaction Buffer ==
/// Tracks open and recently closed transactions.
#[derive(Debug)]
pub(crate) struct TransactionBuffer<V> {
    states: HashMap<String, TransactionState<V>>,
    /// Closed IDs, oldest first
    closed: VecDeque<String>,
}

impl<V> Default for TransactionBuffer<V> {
    fn default() -> Self {
        Self {
            states: HashMap::new(),
            closed: VecDeque::new(),
        }
    }
}

impl<V> TransactionBuffer<V> {
    pub fn new() -> Self {
        Self::default()
    }

    // == Begin ==
    /// Opens a transaction under a fresh random ID.
    pub fn begin(&mut self, now: DateTime<Utc>) -> String {
        let mut id = Uuid::new_v4().to_string();
        while self.states.contains_key(&id) {
            id = Uuid::new_v4().to_string();
        }
        self.states.insert(
            id.clone(),
            TransactionState::Open {
                ops: Vec::new(),
                opened_at: now,
            },
        );
        id
    }

    // == Push ==
    /// Appends an operation to an open transaction.
    pub fn push(&mut self, trans_id: &str, op: TransactionOp<V>) -> Result<()> {
        match self.states.get_mut(trans_id) {
            Some(TransactionState::Open { ops, .. }) => {
                ops.push(op);
                Ok(())
            }
            Some(TransactionState::Closed { .. }) => {
                Err(CacheError::TransactionClosed(trans_id.to_string()))
            }
            None => Err(CacheError::TransactionNotFound(trans_id.to_string())),
        }
    }

    // == Close ==
    /// Marks a transaction closed and hands back its operations in order.
    pub fn close(&mut self, trans_id: &str, now: DateTime<Utc>) -> Result<Vec<TransactionOp<V>>> {
        let state = self
            .states
            .get_mut(trans_id)
            .ok_or_else(|| CacheError::TransactionNotFound(trans_id.to_string()))?;
        match std::mem::replace(state, TransactionState::Closed { closed_at: now }) {
            TransactionState::Open { ops, .. } => {
                self.remember_closed(trans_id);
                Ok(ops)
            }
            closed @ TransactionState::Closed { .. } => {
                *state = closed;
                Err(CacheError::TransactionClosed(trans_id.to_string()))
            }
        }
    }

    fn remember_closed(&mut self, trans_id: &str) {
        self.closed.push_back(trans_id.to_string());
        while self.closed.len() > MAX_CLOSED_MARKERS {
            if let Some(oldest) = self.closed.pop_front() {
                self.states.remove(&oldest);
            }
        }
    }

    // == Purge ==
    /// Forgets transactions idle for longer than `max_age`: open ones are
    /// dropped without being applied, closed markers are released.
    pub fn purge(&mut self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let max_age = TimeDelta::from_std(max_age).unwrap_or(TimeDelta::MAX);
        let before = self.states.len();
        self.states.retain(|_, state| {
            let since = match state {
                TransactionState::Open { opened_at, .. } => *opened_at,
                TransactionState::Closed { closed_at } => *closed_at,
            };
            now.signed_duration_since(since) <= max_age
        });
        let states = &self.states;
        self.closed.retain(|id| states.contains_key(id));
        before - self.states.len()
    }

    #[cfg(test)]
    pub fn is_open(&self, trans_id: &str) -> bool {
        matches!(self.states.get(trans_id), Some(TransactionState::Open { .. }))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn open_count(&self) -> usize {
        self.states
            .values()
            .filter(|s| matches!(s, TransactionState::Open { .. }))
            .count()
    }
}
