use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::Vendor;

/// Radio access technology of a daily traffic export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Technology {
    Lte,
    Umts,
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lte => write!(f, "lte"),
            Self::Umts => write!(f, "umts"),
        }
    }
}

/// A warehouse relation holding normalized daily traffic rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrafficTable {
    pub name: &'static str,
    pub technology: Technology,
    /// Column that receives [`NormalizedRecord::aggregation_id`](crate::NormalizedRecord).
    pub aggregation_column: &'static str,
    /// Vendors exporting into this table when a job does not list its own.
    pub default_vendors: &'static [&'static str],
}

impl TrafficTable {
    pub const LTE_CELL_TRAFFIC_DAILY: TrafficTable = TrafficTable {
        name: "lte_cell_traffic_daily",
        technology: Technology::Lte,
        aggregation_column: "enb_agg",
        default_vendors: &["ericsson", "nokia", "huawei", "samsung"],
    };

    pub const UMTS_CELL_TRAFFIC_DAILY: TrafficTable = TrafficTable {
        name: "umts_cell_traffic_daily",
        technology: Technology::Umts,
        aggregation_column: "rnc",
        default_vendors: &["ericsson", "nokia", "huawei"],
    };

    pub const ALL: [TrafficTable; 2] = [Self::LTE_CELL_TRAFFIC_DAILY, Self::UMTS_CELL_TRAFFIC_DAILY];

    /// Look up a table by its relation name.
    pub fn by_name(name: &str) -> Option<TrafficTable> {
        Self::ALL.into_iter().find(|t| t.name == name)
    }

    /// Warehouse columns in insert order.
    pub fn columns(&self) -> [&'static str; 5] {
        ["date", self.aggregation_column, "cell", "traffic_d_user_ps_gb", "vendor"]
    }

    pub fn default_vendors(&self) -> Vec<Vendor> {
        self.default_vendors.iter().map(Vendor::new).collect()
    }
}

impl fmt::Display for TrafficTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// Payload column names a vendor export uses for the canonical fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub date: String,
    pub aggregation: String,
    pub cell: String,
    pub traffic: String,
}

impl ColumnMapping {
    /// Layout shared by every vendor of a technology.
    ///
    /// Nokia UMTS exports also carry a `NODEB` column; it is ignored so the
    /// RNC stays the aggregation node across vendors.
    pub fn for_technology(technology: Technology) -> Self {
        let aggregation = match technology {
            Technology::Lte => "ENB_AGG",
            Technology::Umts => "RNC",
        };

        Self {
            date: "DATE".to_owned(),
            aggregation: aggregation.to_owned(),
            cell: "CELL".to_owned(),
            traffic: "TRAFFIC_D_USER_PS_GB".to_owned(),
        }
    }
}
