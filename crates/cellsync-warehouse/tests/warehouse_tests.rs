use cellsync::{NormalizedRecord, TrafficTable, Vendor, dedupe};
use cellsync_warehouse::{LoadError, Warehouse};
use chrono::NaiveDate;

const LTE: TrafficTable = TrafficTable::LTE_CELL_TRAFFIC_DAILY;

fn record(date: &str, cell: &str, vendor: &str, traffic: Option<f64>) -> NormalizedRecord {
    NormalizedRecord {
        date: date.parse().unwrap(),
        cell_id: cell.to_owned(),
        aggregation_id: "ENB1".to_owned(),
        traffic_value: traffic,
        vendor: Vendor::new(vendor),
    }
}

fn create_warehouse() -> Warehouse {
    Warehouse::open_in_memory().unwrap()
}

#[test]
fn fresh_warehouse_has_all_tables() {
    let warehouse = create_warehouse();
    for table in [
        "lte_cell_traffic_daily",
        "umts_cell_traffic_daily",
        "lte_cell_change_event",
        "umts_cell_change_event",
    ] {
        assert_eq!(warehouse.row_count(table).unwrap(), 0, "{table}");
    }
}

#[test]
fn insert_batch_commits_every_row() {
    let mut warehouse = create_warehouse();
    let batch = dedupe(vec![
        record("2024-01-02", "A", "nokia", Some(1.5)),
        record("2024-01-02", "B", "nokia", None),
    ]);

    assert_eq!(warehouse.insert_batch(&LTE, &batch).unwrap(), 2);
    assert_eq!(warehouse.row_count(LTE.name).unwrap(), 2);

    let (agg, traffic): (String, Option<f64>) = warehouse
        .connection()
        .query_row(
            "SELECT enb_agg, traffic_d_user_ps_gb FROM lte_cell_traffic_daily WHERE cell = 'B'",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap();
    assert_eq!(agg, "ENB1");
    assert_eq!(traffic, None);
}

#[test]
fn insert_batch_spans_several_statements() {
    let mut warehouse = create_warehouse();
    let records: Vec<_> = (0..400)
        .map(|i| record("2024-01-03", &format!("CELL_{i}"), "ericsson", Some(i as f64)))
        .collect();
    let batch = dedupe(records);

    assert_eq!(warehouse.insert_batch(&LTE, &batch).unwrap(), 400);
    assert_eq!(warehouse.row_count(LTE.name).unwrap(), 400);
}

#[test]
fn empty_batch_is_a_no_op() {
    let mut warehouse = create_warehouse();
    assert_eq!(warehouse.insert_batch(&LTE, &dedupe(Vec::new())).unwrap(), 0);
}

#[test]
fn failure_mid_batch_rolls_back_the_whole_batch() {
    let mut warehouse = create_warehouse();
    warehouse
        .connection()
        .execute_batch(
            "CREATE TRIGGER reject_bad_cell BEFORE INSERT ON lte_cell_traffic_daily
             WHEN NEW.cell = 'BAD'
             BEGIN SELECT RAISE(ABORT, 'constraint violation'); END;",
        )
        .unwrap();

    // Enough rows that the failing one lands in a later INSERT statement.
    let mut records: Vec<_> = (0..200)
        .map(|i| record("2024-01-03", &format!("CELL_{i}"), "nokia", None))
        .collect();
    records.push(record("2024-01-03", "BAD", "nokia", None));

    let err = warehouse.insert_batch(&LTE, &dedupe(records)).unwrap_err();
    assert!(matches!(err, LoadError::Database(_)));
    assert_eq!(warehouse.row_count(LTE.name).unwrap(), 0);
}

#[test]
fn latest_date_tracks_max_date() {
    let mut warehouse = create_warehouse();
    assert_eq!(warehouse.latest_date(&LTE).unwrap(), None);

    let batch = dedupe(vec![
        record("2024-01-09", "A", "nokia", None),
        record("2024-01-11", "A", "nokia", None),
        record("2024-01-10", "A", "nokia", None),
    ]);
    warehouse.insert_batch(&LTE, &batch).unwrap();

    assert_eq!(
        warehouse.latest_date(&LTE).unwrap(),
        NaiveDate::from_ymd_opt(2024, 1, 11)
    );
    assert_eq!(
        warehouse
            .latest_date(&TrafficTable::UMTS_CELL_TRAFFIC_DAILY)
            .unwrap(),
        None
    );
}

#[test]
fn copy_csv_loads_columns_in_any_order() {
    let mut warehouse = create_warehouse();
    let csv = "vendor,cell,date,traffic_d_user_ps_gb,rnc\n\
nokia,U1,2024-02-01,2.5,RNC1\n\
huawei,U2,2024-02-01,,RNC2\n";

    let rows = warehouse
        .copy_csv("umts_cell_traffic_daily", csv.as_bytes())
        .unwrap();
    assert_eq!(rows, 2);

    let traffic: Option<f64> = warehouse
        .connection()
        .query_row(
            "SELECT traffic_d_user_ps_gb FROM umts_cell_traffic_daily WHERE cell = 'U2'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(traffic, None);
}

#[test]
fn copy_csv_header_missing_a_column_loads_nothing() {
    let mut warehouse = create_warehouse();
    let csv = "date,enb_agg,cell,vendor\n2024-02-01,E1,C1,nokia\n";

    let err = warehouse
        .copy_csv("lte_cell_traffic_daily", csv.as_bytes())
        .unwrap_err();
    match err {
        LoadError::HeaderMismatch { missing, unexpected, .. } => {
            assert_eq!(missing, vec!["traffic_d_user_ps_gb"]);
            assert!(unexpected.is_empty());
        }
        other => panic!("expected header mismatch, got {other:?}"),
    }
    assert_eq!(warehouse.row_count(LTE.name).unwrap(), 0);
}

#[test]
fn copy_csv_malformed_row_rolls_back() {
    let mut warehouse = create_warehouse();
    let csv = "date,enb_agg,cell,traffic_d_user_ps_gb,vendor\n\
2024-02-01,E1,C1,1.0,nokia\n\
2024-02-01,E1,C2\n";

    let err = warehouse
        .copy_csv("lte_cell_traffic_daily", csv.as_bytes())
        .unwrap_err();
    assert!(matches!(err, LoadError::Csv(_)));
    assert_eq!(warehouse.row_count(LTE.name).unwrap(), 0);
}

#[test]
fn copy_csv_rejects_non_iso_dates() {
    let mut warehouse = create_warehouse();
    let csv = "date,enb_agg,cell,traffic_d_user_ps_gb,vendor\n\
2024-01-04,E1,C1,1.0,nokia\n\
2024-01-05 00:00:00,E1,C2,1.0,nokia\n";

    let err = warehouse
        .copy_csv("lte_cell_traffic_daily", csv.as_bytes())
        .unwrap_err();
    match err {
        LoadError::InvalidDate { row, value, .. } => {
            assert_eq!(row, 2);
            assert_eq!(value, "2024-01-05 00:00:00");
        }
        other => panic!("expected invalid date, got {other:?}"),
    }
    assert_eq!(warehouse.row_count(LTE.name).unwrap(), 0);
    assert_eq!(warehouse.latest_date(&LTE).unwrap(), None);
}

#[test]
fn copy_csv_into_change_event_table() {
    let mut warehouse = create_warehouse();
    let columns = warehouse.table_columns("umts_cell_change_event").unwrap();
    let header = columns.join(",");
    let mut row: Vec<String> = vec![String::new(); columns.len()];
    for (i, name) in columns.iter().enumerate() {
        row[i] = match name.as_str() {
            "region" => "NORTH".into(),
            "province" => "P1".into(),
            "municipality" => "M1".into(),
            "att_name" => "SITE_1".into(),
            "date" => "2024-03-01".into(),
            "add_cell" => "2".into(),
            _ => String::new(),
        };
    }
    let csv = format!("{header}\n{}\n", row.join(","));

    assert_eq!(
        warehouse
            .copy_csv("umts_cell_change_event", csv.as_bytes())
            .unwrap(),
        1
    );
}

#[test]
fn copy_csv_rejects_unknown_and_invalid_tables() {
    let mut warehouse = create_warehouse();

    assert!(matches!(
        warehouse.copy_csv("no_such_table", "a\n1\n".as_bytes()),
        Err(LoadError::UnknownTable(_))
    ));
    assert!(matches!(
        warehouse.copy_csv("x; DROP TABLE lte_cell_traffic_daily", "a\n1\n".as_bytes()),
        Err(LoadError::InvalidTableName(_))
    ));
}

#[test]
fn reopening_a_file_keeps_rows() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("warehouse.db");

    {
        let mut warehouse = Warehouse::open(&path).unwrap();
        let batch = dedupe(vec![record("2024-01-02", "A", "nokia", Some(1.0))]);
        warehouse.insert_batch(&LTE, &batch).unwrap();
    }

    let warehouse = Warehouse::open(&path).unwrap();
    assert_eq!(warehouse.row_count(LTE.name).unwrap(), 1);
}
