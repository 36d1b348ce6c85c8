//! Integration tests for corostc
//!
//! Everything here runs offline against the library types; nothing
//! talks to the live COROS API.

use chrono::NaiveDate;
use corostc::utils::fit;
use corostc::{sanitize_title, Activity, AppError, CorosConfig, ErrorCode, FileType, SportType};

#[test]
fn test_sport_codes_match_wire_values() {
    assert_eq!(SportType::Run.code(), 100);
    assert_eq!(SportType::Bike.code(), 200);
    assert_eq!(SportType::PoolSwim.code(), 300);
    assert_eq!(SportType::Walk.code(), 900);

    // Unknown codes survive a round trip
    let unknown = SportType::from_code(731);
    assert_eq!(unknown, SportType::Other(731));
    assert_eq!(unknown.code(), 731);
}

#[test]
fn test_file_type_cli_parsing() {
    for (input, expected, code) in [
        ("fit", FileType::Fit, 4),
        ("TCX", FileType::Tcx, 3),
        ("Gpx", FileType::Gpx, 1),
        ("kml", FileType::Kml, 2),
        ("csv", FileType::Csv, 0),
    ] {
        let parsed: FileType = input.parse().unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(parsed.code(), code);
    }
    assert!("pdf".parse::<FileType>().is_err());
}

#[test]
fn test_activity_page_decoding() {
    // Shaped like a real /activity/query entry, fields beyond the typed
    // set included to exercise the extras map
    let json = serde_json::json!({
        "labelId": "433577465829212261",
        "name": "Lunch Hike",
        "sportType": 104,
        "date": 20251123,
        "startTime": 1763910000,
        "endTime": 1763917200,
        "startTimezone": 4,
        "endTimezone": 4,
        "distance": 7421.0,
        "totalTime": 7200.0,
        "calorie": 512000.0,
        "hasTrack": 1,
        "device": "APEX 2 Pro"
    });
    let act: Activity = serde_json::from_value(json).unwrap();

    assert_eq!(act.sport(), SportType::Hike);
    assert_eq!(act.local_date(), NaiveDate::from_ymd_opt(2025, 11, 23));
    // +4 quarter hours = UTC+1
    let start = act.start().unwrap();
    assert_eq!(start.offset().local_minus_utc(), 3600);
    assert_eq!(start.timestamp(), 1763910000);
    assert_eq!(act.total_time, Some(7200.0));
    assert_eq!(act.flag("hasTrack"), Some(true));
    assert_eq!(
        act.extra.get("device").and_then(|v| v.as_str()),
        Some("APEX 2 Pro")
    );
}

#[test]
fn test_error_classification() {
    assert!(AppError::timeout("t").is_retryable());
    assert!(AppError::rate_limited().is_retryable());
    assert!(!AppError::login_failed("bad password").is_retryable());
    assert!(!AppError::no_export_url("42").is_retryable());

    let err = AppError::api_result("2002", "activity not exist");
    assert_eq!(err.code, ErrorCode::ApiResult);
    assert!(err.to_string().contains("API_RESULT"));
}

#[test]
fn test_filename_sanitization() {
    assert_eq!(sanitize_title("Morning Run"), Some("Morning_Run".to_string()));
    assert_eq!(sanitize_title("10k PB!!!"), Some("k_PB".to_string()));
    assert_eq!(sanitize_title("!!!"), None);
}

#[test]
fn test_config_defaults_and_urls() {
    let config = CorosConfig::default();
    assert!(config.api_base.starts_with("https://"));

    let url = config.activity_url("433577465829212261");
    assert!(url.contains("labelId=433577465829212261"));
    assert!(url.contains("/activity-detail"));
}

#[test]
fn test_fit_session_start_time_end_to_end() {
    // A small FIT stream: a record message definition/data pair followed
    // by the session message corosup actually looks for
    let mut records = Vec::new();

    // record (global 20) with a single 4-byte timestamp field
    records.push(0x41); // definition, local type 1
    records.extend_from_slice(&[0, 0]); // reserved, little-endian
    records.extend_from_slice(&20u16.to_le_bytes());
    records.push(1);
    records.extend_from_slice(&[253, 4, 0x86]);
    records.push(0x01); // data, local type 1
    records.extend_from_slice(&100u32.to_le_bytes());

    // session (global 18) with start_time field 2
    let unix = 1_763_910_000i64;
    let fit_secs = (unix - fit::FIT_EPOCH_OFFSET) as u32;
    records.push(0x40); // definition, local type 0
    records.extend_from_slice(&[0, 0]);
    records.extend_from_slice(&18u16.to_le_bytes());
    records.push(1);
    records.extend_from_slice(&[2, 4, 0x86]);
    records.push(0x00); // data, local type 0
    records.extend_from_slice(&fit_secs.to_le_bytes());

    let mut file = Vec::new();
    file.push(14u8); // 14-byte header with CRC
    file.push(0x20);
    file.extend_from_slice(&0u16.to_le_bytes());
    file.extend_from_slice(&(records.len() as u32).to_le_bytes());
    file.extend_from_slice(b".FIT");
    file.extend_from_slice(&[0, 0]); // header CRC
    file.extend_from_slice(&records);
    file.extend_from_slice(&[0, 0]); // file CRC

    let ts = fit::session_start_time(&file).unwrap().unwrap();
    assert_eq!(ts.timestamp(), unix);
}

#[test]
fn test_fit_rejects_non_fit_bytes() {
    let not_fit = b"<?xml version=\"1.0\"?><gpx></gpx>";
    assert!(fit::session_start_time(not_fit).is_err());
}
