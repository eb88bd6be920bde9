use std::fs::File;
use std::io::Write;

use fuzzyof_config::{TraceRow, TraceStatus, load_trace_csv, read_trace};
use rstest::rstest;
use tempfile::tempdir;

const HEADER: &str = "t_ms,neighbor,status,attempts,delay_ms\n";

#[rstest]
fn trace_from_file_parses_all_columns() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("trace.csv");
    let mut f = File::create(&path).unwrap();
    write!(
        f,
        "{HEADER}0,2,ok,1,\n150,2,noack,3,\n300, 00:12:4b:00:00:00:00:03 ,ok,2,80\n420,3,other,0,\n"
    )
    .unwrap();

    let rows = load_trace_csv(&path).unwrap();
    assert_eq!(rows.len(), 4);
    assert_eq!(
        rows[0],
        TraceRow {
            t_ms: 0,
            neighbor: "2".into(),
            status: TraceStatus::Ok,
            attempts: 1,
            delay_ms: None,
        }
    );
    assert_eq!(rows[1].status, TraceStatus::Noack);
    // fields are trimmed
    assert_eq!(rows[2].neighbor, "00:12:4b:00:00:00:00:03");
    assert_eq!(rows[2].delay_ms, Some(80));
    assert_eq!(rows[3].status, TraceStatus::Other);
}

#[test]
fn no_ack_alias_is_accepted() {
    let rows = read_trace(format!("{HEADER}5,2,no_ack,4,").as_bytes()).unwrap();
    assert_eq!(rows[0].status, TraceStatus::Noack);
}

#[test]
fn equal_timestamps_are_ordered() {
    let rows = read_trace(format!("{HEADER}10,2,ok,1,\n10,3,ok,1,\n").as_bytes()).unwrap();
    assert_eq!(rows.len(), 2);
}

#[test]
fn header_only_trace_is_empty() {
    assert!(read_trace(HEADER.as_bytes()).unwrap().is_empty());
}

#[rstest]
#[case("time,node,result,tries,delay\n0,2,ok,1,\n")]
#[case("t_ms,neighbor,status,attempts\n0,2,ok,1\n")]
#[case("neighbor,t_ms,status,attempts,delay_ms\n2,0,ok,1,\n")]
fn wrong_headers_are_rejected(#[case] csv: &str) {
    let err = read_trace(csv.as_bytes()).unwrap_err();
    assert!(format!("{err}").contains("trace CSV must have headers"));
}

#[test]
fn backwards_timestamp_is_rejected_with_row_number() {
    let err = read_trace(format!("{HEADER}100,2,ok,1,\n50,2,ok,1,\n").as_bytes()).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("trace rows must be ordered by t_ms"), "{msg}");
    assert!(msg.contains("row 3"), "{msg}");
}

#[rstest]
#[case("0,2,maybe,1,\n")]
#[case("0,2,ok,300,\n")]
#[case("-1,2,ok,1,\n")]
#[case("0,2,ok,1,70000\n")]
fn malformed_rows_are_rejected(#[case] row: &str) {
    let err = read_trace(format!("{HEADER}{row}").as_bytes()).unwrap_err();
    assert!(format!("{err}").contains("invalid CSV row 2"));
}

#[test]
fn missing_file_names_the_path() {
    let dir = tempdir().unwrap();
    let err = load_trace_csv(&dir.path().join("absent.csv")).unwrap_err();
    assert!(format!("{err}").contains("absent.csv"));
}
