//! In-memory record store.

use async_trait::async_trait;
use gridfill_types::{RecordId, StoredRecord};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::{PutOutcome, RecordStore, Result, StoreSummary};

/// Ordered in-memory store.
///
/// Cloning is cheap and clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: Arc<RwLock<BTreeMap<RecordId, StoredRecord>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with records. Later duplicates are ignored.
    #[must_use]
    pub fn with_records(records: impl IntoIterator<Item = StoredRecord>) -> Self {
        let mut map = BTreeMap::new();
        for record in records {
            map.entry(record.id().clone()).or_insert(record);
        }
        Self {
            records: Arc::new(RwLock::new(map)),
        }
    }

    /// Returns the number of stored records.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

fn edge<'a>(
    records: impl Iterator<Item = &'a StoredRecord>,
    latest: bool,
) -> Option<StoredRecord> {
    let key = |r: &&StoredRecord| (r.period_start(), r.id().clone());
    if latest {
        records.max_by_key(key).cloned()
    } else {
        records.min_by_key(key).cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get(&self, id: &RecordId) -> Result<Option<StoredRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn put(&self, record: &StoredRecord) -> Result<PutOutcome> {
        let mut records = self.records.write().await;
        match records.entry(record.id().clone()) {
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(PutOutcome::Inserted)
            }
            Entry::Occupied(_) => Ok(PutOutcome::AlreadyPresent),
        }
    }

    async fn earliest(&self) -> Result<Option<StoredRecord>> {
        Ok(edge(self.records.read().await.values(), false))
    }

    async fn summary(&self) -> Result<StoreSummary> {
        let records = self.records.read().await;
        Ok(StoreSummary {
            count: records.len(),
            earliest: edge(records.values(), false),
            latest: edge(records.values(), true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use gridfill_types::{SettlementPeriod, SourceId};

    fn record(series: &str, d: u32, period: u8) -> StoredRecord {
        let source = SourceId::new("B1620").unwrap().series(series);
        let date = NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        let period = SettlementPeriod::new(period).unwrap();
        StoredRecord::new(source, period.start_on(date), date, period, 1.0)
    }

    #[tokio::test]
    async fn test_put_twice_keeps_one_copy() {
        let store = MemoryStore::new();
        let rec = record("Solar", 5, 20);

        assert_eq!(store.put(&rec).await.unwrap(), PutOutcome::Inserted);
        assert_eq!(store.put(&rec).await.unwrap(), PutOutcome::AlreadyPresent);
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(rec.id()).await.unwrap(), Some(rec));
    }

    #[tokio::test]
    async fn test_earliest_orders_by_period_start_not_id() {
        // "B1620.WIND" sorts after "B1620.SOLAR" but holds the older period
        let older = record("Wind", 1, 1);
        let newer = record("Solar", 2, 1);
        let store = MemoryStore::with_records([newer.clone(), older.clone()]);

        assert_eq!(store.earliest().await.unwrap(), Some(older.clone()));

        let summary = store.summary().await.unwrap();
        assert_eq!(summary.count, 2);
        assert_eq!(summary.earliest, Some(older));
        assert_eq!(summary.latest, Some(newer));
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);
        assert!(store.earliest().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clones_share_contents() {
        let store = MemoryStore::new();
        let clone = store.clone();
        store.put(&record("Nuclear", 3, 3)).await.unwrap();
        assert_eq!(clone.len().await, 1);
    }
}
