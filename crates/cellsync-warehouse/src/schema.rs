use rusqlite_migration::{M, Migrations};

/// Warehouse relations, oldest migration first.
///
/// The daily traffic tables carry no uniqueness constraint. Loads append, and
/// duplicates are kept out by the watermark filter and dedup before loading.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![
        M::up(
            "CREATE TABLE lte_cell_traffic_daily (
                date                  TEXT NOT NULL,
                enb_agg               TEXT,
                cell                  TEXT NOT NULL,
                traffic_d_user_ps_gb  REAL,
                vendor                TEXT NOT NULL
            );

            CREATE TABLE umts_cell_traffic_daily (
                date                  TEXT NOT NULL,
                rnc                   TEXT,
                cell                  TEXT NOT NULL,
                traffic_d_user_ps_gb  REAL,
                vendor                TEXT NOT NULL
            );

            CREATE INDEX idx_lte_cell_traffic_daily_date ON lte_cell_traffic_daily(date);
            CREATE INDEX idx_umts_cell_traffic_daily_date ON umts_cell_traffic_daily(date);",
        ),
        M::up(
            "CREATE TABLE lte_cell_change_event (
                region        TEXT NOT NULL,
                province      TEXT NOT NULL,
                municipality  TEXT NOT NULL,
                att_name      TEXT NOT NULL,
                date          TEXT NOT NULL,
                add_cell      INTEGER,
                delete_cell   INTEGER,
                total_cell    INTEGER,
                remark        TEXT,
                b2_h4g INTEGER, b2_e4g INTEGER, b2_n4g INTEGER, b2_s4g INTEGER,
                b4_h4g INTEGER, b4_e4g INTEGER, b4_n4g INTEGER, b4_s4g INTEGER,
                b5_h4g INTEGER, b5_e4g INTEGER, b5_n4g INTEGER, b5_s4g INTEGER,
                b7_h4g INTEGER, b7_e4g INTEGER, b7_n4g INTEGER, b7_s4g INTEGER,
                b26_h4g INTEGER, b26_e4g INTEGER, b26_n4g INTEGER, b26_s4g INTEGER,
                b42_h4g INTEGER, b42_e4g INTEGER, b42_n4g INTEGER, b42_s4g INTEGER,
                x_h4g INTEGER, x_e4g INTEGER, x_n4g INTEGER, x_s4g INTEGER,
                created_at    TEXT DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (region, province, municipality, att_name, date)
            );

            CREATE TABLE umts_cell_change_event (
                region        TEXT NOT NULL,
                province      TEXT NOT NULL,
                municipality  TEXT NOT NULL,
                att_name      TEXT NOT NULL,
                date          TEXT NOT NULL,
                add_cell      INTEGER,
                delete_cell   INTEGER,
                total_cell    INTEGER,
                remark        TEXT,
                b2_h3g INTEGER, b2_e3g INTEGER, b2_n3g INTEGER,
                b4_h3g INTEGER, b4_e3g INTEGER, b4_n3g INTEGER,
                b5_h3g INTEGER, b5_e3g INTEGER, b5_n3g INTEGER,
                x_h3g INTEGER, x_e3g INTEGER, x_n3g INTEGER,
                created_at    TEXT DEFAULT CURRENT_TIMESTAMP,
                PRIMARY KEY (region, province, municipality, att_name, date)
            );",
        ),
    ])
}
