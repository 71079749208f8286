use chrono::NaiveDate;

use crate::record::NormalizedRecord;

/// Date of the last successfully ingested record for a target table.
///
/// Supplied by the caller for each run. Nothing in this crate advances or
/// persists it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Watermark(NaiveDate);

impl Watermark {
    pub fn new(last_date: NaiveDate) -> Self {
        Self(last_date)
    }

    pub fn last_date(&self) -> NaiveDate {
        self.0
    }

    /// Strictly newer than the boundary; a record dated on the watermark
    /// itself was already ingested.
    pub fn admits(&self, record: &NormalizedRecord) -> bool {
        record.date > self.0
    }
}

impl From<NaiveDate> for Watermark {
    fn from(value: NaiveDate) -> Self {
        Self::new(value)
    }
}

/// Restrict `records` to those dated after `watermark`.
pub fn filter<I>(records: I, watermark: Watermark) -> impl Iterator<Item = NormalizedRecord>
where
    I: IntoIterator<Item = NormalizedRecord>,
{
    records.into_iter().filter(move |r| watermark.admits(r))
}
