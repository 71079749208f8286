use std::collections::HashSet;

use chrono::NaiveDate;

use crate::record::{NormalizedRecord, Vendor};

/// Natural key of a daily traffic row.
pub type DedupKey = (NaiveDate, String, Vendor);

/// Records ready to be committed in one load call.
///
/// Only built by [`dedupe`], so no two members share a [`DedupKey`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadBatch {
    records: Vec<NormalizedRecord>,
}

impl LoadBatch {
    pub fn records(&self) -> &[NormalizedRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<NormalizedRecord> {
        self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl NormalizedRecord {
    pub fn dedup_key(&self) -> DedupKey {
        (self.date, self.cell_id.clone(), self.vendor.clone())
    }
}

/// Collapse records sharing `(date, cell_id, vendor)`, keeping the first
/// occurrence in iteration order.
pub fn dedupe<I>(records: I) -> LoadBatch
where
    I: IntoIterator<Item = NormalizedRecord>,
{
    let mut seen: HashSet<DedupKey> = HashSet::new();
    let records = records
        .into_iter()
        .filter(|r| seen.insert(r.dedup_key()))
        .collect();

    LoadBatch { records }
}
