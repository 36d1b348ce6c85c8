//! Type definitions for the COROS Training Center wire format
//!
//! Every API payload is wrapped in a `{result, message, data}` envelope;
//! the structs here are the serde mappings for the payloads the client
//! touches. Raw integer encodings (YYYYMMDD dates, quarter-hour timezone
//! offsets, unix timestamps) stay raw in the structs and are decoded by
//! accessors, so unknown values survive a round trip untouched.

use chrono::{DateTime, FixedOffset, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::models::errors::{AppError, ErrorCode};

// ============================================
// SPORT TYPES
// ============================================

/// COROS numeric sport codes.
///
/// Codes not in the table are preserved as `Other(code)` rather than
/// rejected; the server adds new sports faster than clients update.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SportType {
    Run,
    IndoorRun,
    TrackRun,
    Hike,
    MtnClimb,
    Bike,
    IndoorBike,
    PoolSwim,
    OpenWater,
    GymCardio,
    GpsCardio,
    Strength,
    Ski,
    Snowboard,
    XcSki,
    SkiTouring,
    Rowing,
    IndoorRower,
    Whitewater,
    Flatwater,
    Windsurfing,
    Speedsurfing,
    Walk,
    /// Unrecognized sport code, kept verbatim
    Other(u16),
}

impl SportType {
    /// Decode a numeric sport code. Total: unknown codes become `Other`.
    pub fn from_code(code: u16) -> Self {
        match code {
            100 => Self::Run,
            101 => Self::IndoorRun,
            103 => Self::TrackRun,
            104 => Self::Hike,
            105 => Self::MtnClimb,
            200 => Self::Bike,
            201 => Self::IndoorBike,
            300 => Self::PoolSwim,
            301 => Self::OpenWater,
            400 => Self::GymCardio,
            401 => Self::GpsCardio,
            402 => Self::Strength,
            500 => Self::Ski,
            501 => Self::Snowboard,
            502 => Self::XcSki,
            503 => Self::SkiTouring,
            700 => Self::Rowing,
            701 => Self::IndoorRower,
            702 => Self::Whitewater,
            704 => Self::Flatwater,
            705 => Self::Windsurfing,
            706 => Self::Speedsurfing,
            900 => Self::Walk,
            other => Self::Other(other),
        }
    }

    /// Numeric code as sent on the wire
    pub fn code(&self) -> u16 {
        match self {
            Self::Run => 100,
            Self::IndoorRun => 101,
            Self::TrackRun => 103,
            Self::Hike => 104,
            Self::MtnClimb => 105,
            Self::Bike => 200,
            Self::IndoorBike => 201,
            Self::PoolSwim => 300,
            Self::OpenWater => 301,
            Self::GymCardio => 400,
            Self::GpsCardio => 401,
            Self::Strength => 402,
            Self::Ski => 500,
            Self::Snowboard => 501,
            Self::XcSki => 502,
            Self::SkiTouring => 503,
            Self::Rowing => 700,
            Self::IndoorRower => 701,
            Self::Whitewater => 702,
            Self::Flatwater => 704,
            Self::Windsurfing => 705,
            Self::Speedsurfing => 706,
            Self::Walk => 900,
            Self::Other(code) => *code,
        }
    }

    /// Human-readable name
    pub fn name(&self) -> String {
        match self {
            Self::Run => "Run".into(),
            Self::IndoorRun => "Indoor Run".into(),
            Self::TrackRun => "Track Run".into(),
            Self::Hike => "Hike".into(),
            Self::MtnClimb => "Mountain Climb".into(),
            Self::Bike => "Bike".into(),
            Self::IndoorBike => "Indoor Bike".into(),
            Self::PoolSwim => "Pool Swim".into(),
            Self::OpenWater => "Open Water".into(),
            Self::GymCardio => "Gym Cardio".into(),
            Self::GpsCardio => "GPS Cardio".into(),
            Self::Strength => "Strength".into(),
            Self::Ski => "Ski".into(),
            Self::Snowboard => "Snowboard".into(),
            Self::XcSki => "XC Ski".into(),
            Self::SkiTouring => "Ski Touring".into(),
            Self::Rowing => "Rowing".into(),
            Self::IndoorRower => "Indoor Rower".into(),
            Self::Whitewater => "Whitewater".into(),
            Self::Flatwater => "Flatwater".into(),
            Self::Windsurfing => "Windsurfing".into(),
            Self::Speedsurfing => "Speedsurfing".into(),
            Self::Walk => "Walk".into(),
            Self::Other(code) => format!("Sport {}", code),
        }
    }

    /// Whether the code is in the known table
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

impl fmt::Display for SportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

// ============================================
// EXPORT FILE TYPES
// ============================================

/// Export formats offered by the activity download endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
    Csv,
    Gpx,
    Kml,
    Tcx,
    Fit,
}

impl FileType {
    /// Numeric code as sent on the wire
    pub fn code(&self) -> u8 {
        match self {
            Self::Csv => 0,
            Self::Gpx => 1,
            Self::Kml => 2,
            Self::Tcx => 3,
            Self::Fit => 4,
        }
    }

    /// File extension (no dot)
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Gpx => "gpx",
            Self::Kml => "kml",
            Self::Tcx => "tcx",
            Self::Fit => "fit",
        }
    }
}

impl FromStr for FileType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "gpx" => Ok(Self::Gpx),
            "kml" => Ok(Self::Kml),
            "tcx" => Ok(Self::Tcx),
            "fit" => Ok(Self::Fit),
            other => Err(AppError::new(
                ErrorCode::ConfigInvalidValue,
                format!("unknown file type {:?} (expected csv, gpx, kml, tcx or fit)", other),
            )),
        }
    }
}

impl fmt::Display for FileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

// ============================================
// ENVELOPE
// ============================================

/// The `{result, message, data}` wrapper around every API payload.
/// `result` is `"0000"` on success; anything else is a server-side error
/// with a human-readable `message`.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiEnvelope<T> {
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub data: Option<T>,
}

// ============================================
// ACTIVITY LISTING
// ============================================

/// One page from `GET /activity/query`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityPage {
    /// Total activities on the account (constant across pages)
    pub count: u64,
    #[serde(default)]
    pub data_list: Vec<Activity>,
}

/// A single activity from the listing.
///
/// Only the fields the client interprets are typed; everything else the
/// server sends is preserved in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    /// Server-side activity ID ("label")
    #[serde(deserialize_with = "string_or_number")]
    pub label_id: String,
    #[serde(default)]
    pub name: String,
    /// Raw sport code; decode with [`Activity::sport`]
    #[serde(default)]
    pub sport_type: u16,
    /// Calendar date as a YYYYMMDD integer
    #[serde(default)]
    pub date: u32,
    /// Start of the activity, unix seconds
    #[serde(default)]
    pub start_time: i64,
    /// End of the activity, unix seconds
    #[serde(default)]
    pub end_time: i64,
    /// UTC offset at start, in 15-minute units
    #[serde(default)]
    pub start_timezone: i32,
    /// UTC offset at end, in 15-minute units
    #[serde(default)]
    pub end_timezone: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calorie: Option<f64>,
    /// Fields this client does not interpret, kept verbatim
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Activity {
    /// Decoded sport type (total, unknown codes preserved)
    pub fn sport(&self) -> SportType {
        SportType::from_code(self.sport_type)
    }

    /// Calendar date decoded from the YYYYMMDD integer
    pub fn local_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(
            (self.date / 10000) as i32,
            self.date / 100 % 100,
            self.date % 100,
        )
    }

    /// UTC offset at start (server sends 15-minute units)
    pub fn start_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.start_timezone * 15 * 60)
    }

    /// UTC offset at end
    pub fn end_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.end_timezone * 15 * 60)
    }

    /// Offset-aware start datetime
    pub fn start(&self) -> Option<DateTime<FixedOffset>> {
        let offset = self.start_offset()?;
        DateTime::from_timestamp(self.start_time, 0).map(|dt| dt.with_timezone(&offset))
    }

    /// Offset-aware end datetime
    pub fn end(&self) -> Option<DateTime<FixedOffset>> {
        let offset = self.end_offset()?;
        DateTime::from_timestamp(self.end_time, 0).map(|dt| dt.with_timezone(&offset))
    }

    /// Interpret a `has*`/`is*` style field from `extra` as a boolean.
    /// The server encodes these as 0/1 integers.
    pub fn flag(&self, key: &str) -> Option<bool> {
        match self.extra.get(key)? {
            serde_json::Value::Bool(b) => Some(*b),
            serde_json::Value::Number(n) => n.as_i64().map(|v| v != 0),
            _ => None,
        }
    }
}

// ============================================
// ACTIVITY DETAIL
// ============================================

/// `POST /activity/detail/query` payload
#[derive(Debug, Clone, Deserialize)]
pub struct ActivityDetail {
    #[serde(default)]
    pub summary: Option<ActivitySummary>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Summary block inside the activity detail
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ============================================
// AUTH / DOWNLOAD PAYLOADS
// ============================================

/// `POST /account/login` payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
    pub access_token: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// `GET /activity/detail/download` payload
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadData {
    #[serde(default)]
    pub file_url: Option<String>,
}

/// Accept both `"123"` and `123` for ID-like fields; the server is not
/// consistent about which it sends.
fn string_or_number<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Number(i64),
    }

    Ok(match StringOrNumber::deserialize(d)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sport_type_round_trip() {
        for code in [100u16, 101, 103, 104, 105, 200, 201, 300, 301, 400, 401, 402, 500, 501,
            502, 503, 700, 701, 702, 704, 705, 706, 900]
        {
            let sport = SportType::from_code(code);
            assert!(sport.is_known(), "code {} should be known", code);
            assert_eq!(sport.code(), code);
        }
    }

    #[test]
    fn test_sport_type_unknown_preserved() {
        let sport = SportType::from_code(10_000);
        assert_eq!(sport, SportType::Other(10_000));
        assert_eq!(sport.code(), 10_000);
        assert!(!sport.is_known());
        assert_eq!(sport.name(), "Sport 10000");
    }

    #[test]
    fn test_file_type_parsing() {
        assert_eq!("FIT".parse::<FileType>().unwrap(), FileType::Fit);
        assert_eq!("gpx".parse::<FileType>().unwrap(), FileType::Gpx);
        assert_eq!(FileType::Tcx.code(), 3);
        assert_eq!(FileType::Csv.extension(), "csv");
        assert!("xlsx".parse::<FileType>().is_err());
    }

    #[test]
    fn test_activity_decoding() {
        let json = serde_json::json!({
            "labelId": "433577465829212261",
            "name": "Morning Run",
            "sportType": 100,
            "date": 20260315,
            "startTime": 1773824400,
            "endTime": 1773828000,
            "startTimezone": -32,
            "endTimezone": -32,
            "distance": 10421.5,
            "hasTrack": 1,
            "isShow": 0
        });
        let act: Activity = serde_json::from_value(json).unwrap();

        assert_eq!(act.label_id, "433577465829212261");
        assert_eq!(act.sport(), SportType::Run);
        assert_eq!(
            act.local_date(),
            NaiveDate::from_ymd_opt(2026, 3, 15)
        );
        // -32 quarter hours = UTC-8
        assert_eq!(act.start_offset(), FixedOffset::east_opt(-8 * 3600));
        let start = act.start().unwrap();
        assert_eq!(start.timestamp(), 1773824400);
        assert_eq!(act.flag("hasTrack"), Some(true));
        assert_eq!(act.flag("isShow"), Some(false));
        assert_eq!(act.flag("hasNoSuchKey"), None);
        assert_eq!(act.distance, Some(10421.5));
    }

    #[test]
    fn test_activity_numeric_label_id() {
        let json = serde_json::json!({
            "labelId": 433577465829212261i64,
            "sportType": 999
        });
        let act: Activity = serde_json::from_value(json).unwrap();
        assert_eq!(act.label_id, "433577465829212261");
        assert_eq!(act.sport(), SportType::Other(999));
    }

    #[test]
    fn test_envelope_error_shape() {
        let json = r#"{"result":"1001","message":"account not exist"}"#;
        let env: ApiEnvelope<LoginData> = serde_json::from_str(json).unwrap();
        assert_eq!(env.result.as_deref(), Some("1001"));
        assert_eq!(env.message.as_deref(), Some("account not exist"));
        assert!(env.data.is_none());
    }

    #[test]
    fn test_envelope_success_shape() {
        let json = r#"{"result":"0000","message":"OK","data":{"accessToken":"deadbeef"}}"#;
        let env: ApiEnvelope<LoginData> = serde_json::from_str(json).unwrap();
        assert_eq!(env.result.as_deref(), Some("0000"));
        assert_eq!(env.data.unwrap().access_token, "deadbeef");
    }
}
