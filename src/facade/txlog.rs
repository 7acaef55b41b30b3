//! Client-side transaction log.
//!
//! Append-only record of transactions the facade submitted, kept for display.
//! Records only move forward: `Pending` to `Confirmed` or `Failed`.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use alloy::primitives::TxHash;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::model::ActionKind;

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Lifecycle state of a logged transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum TxStatus {
    Pending,
    Confirmed { block_number: u64 },
    Failed { reason: String },
}

impl TxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TxStatus::Pending => "pending",
            TxStatus::Confirmed { .. } => "confirmed",
            TxStatus::Failed { .. } => "failed",
        }
    }
}

/// One submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub id: Uuid,
    pub tx_hash: TxHash,
    pub kind: ActionKind,
    pub status: TxStatus,
    /// Unix seconds.
    pub submitted_at: u64,
    /// Unix seconds; set once the record leaves `Pending`.
    pub settled_at: Option<u64>,
}

/// Shared, append-only transaction log.
#[derive(Debug, Clone, Default)]
pub struct TransactionLog {
    inner: Arc<RwLock<Vec<TransactionRecord>>>,
}

impl TransactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a pending record and return its id.
    pub async fn record_pending(&self, tx_hash: TxHash, kind: ActionKind) -> Uuid {
        let record = TransactionRecord {
            id: Uuid::new_v4(),
            tx_hash,
            kind,
            status: TxStatus::Pending,
            submitted_at: now(),
            settled_at: None,
        };
        let id = record.id;
        self.inner.write().await.push(record);
        id
    }

    /// Mark a pending record confirmed. Returns false if it was not pending.
    pub async fn confirm(&self, id: Uuid, block_number: u64) -> bool {
        self.settle(id, TxStatus::Confirmed { block_number }).await
    }

    /// Mark a pending record failed. Returns false if it was not pending.
    pub async fn fail(&self, id: Uuid, reason: impl Into<String>) -> bool {
        self.settle(id, TxStatus::Failed { reason: reason.into() }).await
    }

    async fn settle(&self, id: Uuid, status: TxStatus) -> bool {
        let mut records = self.inner.write().await;
        match records
            .iter_mut()
            .find(|r| r.id == id && r.status == TxStatus::Pending)
        {
            Some(record) => {
                record.status = status;
                record.settled_at = Some(now());
                true
            }
            None => false,
        }
    }

    /// Snapshot of every record, oldest first.
    pub async fn entries(&self) -> Vec<TransactionRecord> {
        self.inner.read().await.clone()
    }

    pub async fn get(&self, id: Uuid) -> Option<TransactionRecord> {
        self.inner.read().await.iter().find(|r| r.id == id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pending_then_confirmed() {
        let log = TransactionLog::new();
        let id = log.record_pending(TxHash::ZERO, ActionKind::VerifyCrisis).await;

        let record = log.get(id).await.unwrap();
        assert_eq!(record.status, TxStatus::Pending);
        assert!(record.settled_at.is_none());

        assert!(log.confirm(id, 12).await);
        let record = log.get(id).await.unwrap();
        assert_eq!(record.status, TxStatus::Confirmed { block_number: 12 });
        assert!(record.settled_at.is_some());
        assert_eq!(log.len().await, 1);
    }

    #[tokio::test]
    async fn test_settled_records_do_not_change() {
        let log = TransactionLog::new();
        let id = log.record_pending(TxHash::ZERO, ActionKind::GrantAccess).await;

        assert!(log.fail(id, "reverted").await);
        assert!(!log.confirm(id, 3).await);
        assert_eq!(log.get(id).await.unwrap().status.as_str(), "failed");
    }

    #[tokio::test]
    async fn test_clones_share_records() {
        let log = TransactionLog::new();
        let view = log.clone();
        log.record_pending(TxHash::ZERO, ActionKind::EmergencyAccess).await;
        assert!(!view.is_empty().await);
    }
}
