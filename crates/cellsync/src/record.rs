use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Equipment vendor tag attached to every record extracted from its exports.
///
/// Stored lowercase so that `Nokia`, `NOKIA` and `nokia` in configuration
/// all refer to the same input directory and dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Vendor(String);

impl Vendor {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(name.as_ref().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Vendor {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Vendor {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Vendor> for String {
    fn from(value: Vendor) -> Self {
        value.0
    }
}

/// The canonical row shape shared by every vendor export.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub date: NaiveDate,
    pub cell_id: String,
    /// eNodeB aggregate for LTE, RNC for UMTS.
    pub aggregation_id: String,
    /// Daily data traffic in GB. `None` when the export had no usable value.
    pub traffic_value: Option<f64>,
    pub vendor: Vendor,
}
