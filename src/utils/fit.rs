//! Minimal FIT decoder
//!
//! Decodes just enough of the Garmin FIT container format to recover the
//! session start time of an uploaded activity file. The import endpoint
//! does not return the new activity's label ID, so the only way to find
//! it is to match this timestamp against a fresh activity listing.
//!
//! Format notes:
//! - File header is 12 or 14 bytes, ".FIT" magic at offset 8,
//!   little-endian data size at offset 4.
//! - Records are definition messages (declare the layout of a local
//!   message type, possibly big-endian, possibly with developer fields)
//!   or data messages (payload laid out per the active definition).
//! - Compressed-timestamp headers carry the local type in bits 5-6.
//! - The session message is global number 18; its `start_time` is field
//!   2, a u32 of seconds since the FIT epoch (1989-12-31T00:00:00Z).

use chrono::{DateTime, Utc};
use std::collections::HashMap;

use crate::models::errors::{AppError, CorosResult};

/// FIT epoch as unix seconds (1989-12-31T00:00:00Z)
pub const FIT_EPOCH_OFFSET: i64 = 631_065_600;

/// Global message number of the session message
const SESSION_GLOBAL_MSG: u16 = 18;

/// Field number of `start_time` within the session message
const SESSION_START_TIME_FIELD: u8 = 2;

/// Sentinel for an unset FIT date_time
const FIT_DATETIME_INVALID: u32 = 0xFFFF_FFFF;

/// Layout of one field within a definition
#[derive(Debug, Clone, Copy)]
struct FieldDef {
    field_num: u8,
    size: u8,
}

/// Active definition for a local message type
#[derive(Debug, Clone)]
struct MessageDef {
    global_msg: u16,
    big_endian: bool,
    fields: Vec<FieldDef>,
    /// Total bytes of developer fields appended to each data message
    dev_bytes: usize,
}

impl MessageDef {
    /// Payload size of a data message using this definition
    fn data_size(&self) -> usize {
        self.fields.iter().map(|f| f.size as usize).sum::<usize>() + self.dev_bytes
    }
}

/// Extract the session start time from a FIT file.
///
/// Returns `Ok(None)` for a well-formed file that carries no session
/// start time; malformed or truncated input is an error.
pub fn session_start_time(data: &[u8]) -> CorosResult<Option<DateTime<Utc>>> {
    if data.len() < 12 {
        return Err(AppError::fit_malformed("file shorter than a FIT header"));
    }

    let header_size = data[0] as usize;
    if header_size < 12 || header_size > data.len() {
        return Err(AppError::fit_malformed(format!(
            "implausible FIT header size {}",
            header_size
        )));
    }
    if &data[8..12] != b".FIT" {
        return Err(AppError::fit_malformed("missing .FIT magic"));
    }

    let data_size =
        u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    // The trailing 2-byte CRC may be absent on files cut short by the
    // recording device; clip to what is actually there.
    let end = (header_size + data_size).min(data.len());

    let mut defs: HashMap<u8, MessageDef> = HashMap::new();
    let mut offset = header_size;

    while offset < end {
        let hdr = data[offset];
        offset += 1;

        if hdr & 0x80 != 0 {
            // Compressed-timestamp data message: local type in bits 5-6
            let local = (hdr >> 5) & 0x03;
            offset = skip_data_message(data, offset, end, &defs, local, None)?;
        } else if hdr & 0x40 != 0 {
            // Definition message
            let local = hdr & 0x0F;
            let has_dev = hdr & 0x20 != 0;
            let (def, next) = read_definition(data, offset, end, has_dev)?;
            defs.insert(local, def);
            offset = next;
        } else {
            // Normal data message
            let local = hdr & 0x0F;
            let mut found = None;
            offset = skip_data_message(data, offset, end, &defs, local, Some(&mut found))?;
            if let Some(fit_secs) = found {
                return Ok(DateTime::from_timestamp(
                    fit_secs as i64 + FIT_EPOCH_OFFSET,
                    0,
                ));
            }
        }
    }

    Ok(None)
}

/// Parse a definition message starting at `offset` (after the record
/// header byte). Returns the definition and the offset past it.
fn read_definition(
    data: &[u8],
    offset: usize,
    end: usize,
    has_dev: bool,
) -> CorosResult<(MessageDef, usize)> {
    if offset + 5 > end {
        return Err(AppError::fit_malformed("truncated definition message"));
    }

    let big_endian = match data[offset + 1] {
        0 => false,
        1 => true,
        arch => {
            return Err(AppError::fit_malformed(format!(
                "unknown architecture byte {}",
                arch
            )))
        }
    };
    let global_msg = if big_endian {
        u16::from_be_bytes([data[offset + 2], data[offset + 3]])
    } else {
        u16::from_le_bytes([data[offset + 2], data[offset + 3]])
    };
    let num_fields = data[offset + 4] as usize;
    let mut pos = offset + 5;

    if pos + num_fields * 3 > end {
        return Err(AppError::fit_malformed("truncated field definitions"));
    }
    let mut fields = Vec::with_capacity(num_fields);
    for _ in 0..num_fields {
        fields.push(FieldDef {
            field_num: data[pos],
            size: data[pos + 1],
        });
        pos += 3; // field num, size, base type
    }

    let mut dev_bytes = 0usize;
    if has_dev {
        if pos >= end {
            return Err(AppError::fit_malformed("truncated developer field count"));
        }
        let num_dev = data[pos] as usize;
        pos += 1;
        if pos + num_dev * 3 > end {
            return Err(AppError::fit_malformed("truncated developer fields"));
        }
        for _ in 0..num_dev {
            dev_bytes += data[pos + 1] as usize;
            pos += 3; // field num, size, developer data index
        }
    }

    Ok((
        MessageDef {
            global_msg,
            big_endian,
            fields,
            dev_bytes,
        },
        pos,
    ))
}

/// Walk one data message, optionally extracting the session start time
/// into `found`. Returns the offset past the message.
fn skip_data_message(
    data: &[u8],
    offset: usize,
    end: usize,
    defs: &HashMap<u8, MessageDef>,
    local: u8,
    mut found: Option<&mut Option<u32>>,
) -> CorosResult<usize> {
    let def = defs.get(&local).ok_or_else(|| {
        AppError::fit_malformed(format!("data record for undefined local type {}", local))
    })?;

    if offset + def.data_size() > end {
        return Err(AppError::fit_malformed("truncated data message"));
    }

    let mut pos = offset;
    for field in &def.fields {
        if def.global_msg == SESSION_GLOBAL_MSG
            && field.field_num == SESSION_START_TIME_FIELD
            && field.size == 4
        {
            let raw = [data[pos], data[pos + 1], data[pos + 2], data[pos + 3]];
            let value = if def.big_endian {
                u32::from_be_bytes(raw)
            } else {
                u32::from_le_bytes(raw)
            };
            if value != FIT_DATETIME_INVALID {
                if let Some(slot) = found.as_mut() {
                    **slot = Some(value);
                }
            }
        }
        pos += field.size as usize;
    }

    Ok(offset + def.data_size())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Assemble a FIT file from raw record bytes
    fn fit_file(records: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        out.push(12u8); // header size
        out.push(0x10); // protocol version
        out.extend_from_slice(&100u16.to_le_bytes()); // profile version
        out.extend_from_slice(&(records.len() as u32).to_le_bytes());
        out.extend_from_slice(b".FIT");
        out.extend_from_slice(records);
        out.extend_from_slice(&[0, 0]); // CRC, unchecked
        out
    }

    /// Definition + data records for a session message whose only field
    /// is start_time
    fn session_records(fit_secs: u32, big_endian: bool) -> Vec<u8> {
        let mut rec = Vec::new();
        rec.push(0x40); // definition, local type 0
        rec.push(0); // reserved
        rec.push(if big_endian { 1 } else { 0 });
        if big_endian {
            rec.extend_from_slice(&SESSION_GLOBAL_MSG.to_be_bytes());
        } else {
            rec.extend_from_slice(&SESSION_GLOBAL_MSG.to_le_bytes());
        }
        rec.push(1); // one field
        rec.extend_from_slice(&[SESSION_START_TIME_FIELD, 4, 0x86]); // uint32
        rec.push(0x00); // data, local type 0
        if big_endian {
            rec.extend_from_slice(&fit_secs.to_be_bytes());
        } else {
            rec.extend_from_slice(&fit_secs.to_le_bytes());
        }
        rec
    }

    #[test]
    fn test_session_start_time_le() {
        // 2020-01-01T00:00:00Z = unix 1577836800
        let fit_secs = (1_577_836_800i64 - FIT_EPOCH_OFFSET) as u32;
        let file = fit_file(&session_records(fit_secs, false));
        let ts = session_start_time(&file).unwrap().unwrap();
        assert_eq!(ts.timestamp(), 1_577_836_800);
    }

    #[test]
    fn test_session_start_time_be() {
        let fit_secs = (1_577_836_800i64 - FIT_EPOCH_OFFSET) as u32;
        let file = fit_file(&session_records(fit_secs, true));
        let ts = session_start_time(&file).unwrap().unwrap();
        assert_eq!(ts.timestamp(), 1_577_836_800);
    }

    #[test]
    fn test_developer_fields_skipped() {
        let fit_secs = (1_600_000_000i64 - FIT_EPOCH_OFFSET) as u32;
        let mut rec = Vec::new();
        rec.push(0x60); // definition with developer data, local type 0
        rec.push(0);
        rec.push(0); // little-endian
        rec.extend_from_slice(&SESSION_GLOBAL_MSG.to_le_bytes());
        rec.push(1);
        rec.extend_from_slice(&[SESSION_START_TIME_FIELD, 4, 0x86]);
        rec.push(1); // one developer field of 2 bytes
        rec.extend_from_slice(&[0, 2, 0]);
        rec.push(0x00); // data message
        rec.extend_from_slice(&fit_secs.to_le_bytes());
        rec.extend_from_slice(&[0xAB, 0xCD]); // developer payload

        let file = fit_file(&rec);
        let ts = session_start_time(&file).unwrap().unwrap();
        assert_eq!(ts.timestamp(), 1_600_000_000);
    }

    #[test]
    fn test_no_session_message() {
        // A record message (global 20) only; no session
        let mut rec = Vec::new();
        rec.push(0x40);
        rec.push(0);
        rec.push(0);
        rec.extend_from_slice(&20u16.to_le_bytes());
        rec.push(1);
        rec.extend_from_slice(&[253, 4, 0x86]); // timestamp field
        rec.push(0x00);
        rec.extend_from_slice(&123u32.to_le_bytes());

        let file = fit_file(&rec);
        assert!(session_start_time(&file).unwrap().is_none());
    }

    #[test]
    fn test_invalid_start_time_sentinel() {
        let file = fit_file(&session_records(FIT_DATETIME_INVALID, false));
        assert!(session_start_time(&file).unwrap().is_none());
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut file = fit_file(&session_records(1, false));
        file[8] = b'X';
        assert!(session_start_time(&file).is_err());
    }

    #[test]
    fn test_truncated_file_rejected() {
        let file = fit_file(&session_records(1, false));
        // Cut into the data message
        assert!(session_start_time(&file[..file.len() - 6]).is_err());
    }

    #[test]
    fn test_undefined_local_type_rejected() {
        let file = fit_file(&[0x03]); // data message, never defined
        assert!(session_start_time(&file).is_err());
    }
}
