// ABOUTME: FIT activity-file encoder producing little-endian, CRC-terminated binaries
// ABOUTME: Emits file-id, file-creator, record, lap, session, and activity messages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 FitGlue

use bytes::{BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};

use fitglue_core::models::{ActivityType, Lap, Record, Session, StandardizedActivity};

use super::crc;

/// Seconds between the Unix epoch and the FIT epoch (1989-12-31T00:00:00Z)
pub const FIT_EPOCH_OFFSET: i64 = 631_065_600;

/// Header length in bytes (the 14-byte form with a header CRC)
const HEADER_SIZE: u8 = 14;
/// FIT protocol version 2.0
const PROTOCOL_VERSION: u8 = 0x20;
/// FIT profile version 21.32
const PROFILE_VERSION: u16 = 2132;
/// Development manufacturer id
const MANUFACTURER_DEVELOPMENT: u16 = 255;
/// Product id within the development namespace
const PRODUCT_ID: u16 = 1;
/// file_creator software version
const SOFTWARE_VERSION: u16 = 42;

// Global message numbers.
const MSG_FILE_ID: u16 = 0;
const MSG_SESSION: u16 = 18;
const MSG_LAP: u16 = 19;
const MSG_RECORD: u16 = 20;
const MSG_ACTIVITY: u16 = 34;
const MSG_FILE_CREATOR: u16 = 49;

// Base types.
const BASE_ENUM: u8 = 0x00;
const BASE_UINT8: u8 = 0x02;
const BASE_UINT16: u8 = 0x84;
const BASE_SINT32: u8 = 0x85;
const BASE_UINT32: u8 = 0x86;
const BASE_UINT32Z: u8 = 0x8C;

// Invalid-value sentinels for optional fields.
const INVALID_UINT8: u8 = 0xFF;
const INVALID_UINT16: u16 = 0xFFFF;
const INVALID_UINT32: u32 = 0xFFFF_FFFF;
const INVALID_SINT32: i32 = 0x7FFF_FFFF;

/// One field in a definition message
struct FieldDef {
    number: u8,
    size: u8,
    base_type: u8,
}

const fn field(number: u8, size: u8, base_type: u8) -> FieldDef {
    FieldDef {
        number,
        size,
        base_type,
    }
}

/// Which optional record fields are present anywhere in the activity.
///
/// A single definition message covers every record; records missing a field
/// write its invalid-value sentinel.
#[derive(Debug, Clone, Copy, Default)]
struct RecordLayout {
    heart_rate: bool,
    power: bool,
    position: bool,
    altitude: bool,
    distance: bool,
}

impl RecordLayout {
    fn scan(session: &Session) -> Self {
        let mut layout = Self::default();
        for record in session.laps.iter().flat_map(|lap| lap.records.iter()) {
            layout.heart_rate |= record.heart_rate.is_some();
            layout.power |= record.power.is_some();
            layout.position |= record.latitude.is_some() && record.longitude.is_some();
            layout.altitude |= record.altitude.is_some();
            layout.distance |= record.distance.is_some();
        }
        layout
    }

    fn fields(self) -> Vec<FieldDef> {
        let mut fields = vec![field(253, 4, BASE_UINT32)];
        if self.position {
            fields.push(field(0, 4, BASE_SINT32));
            fields.push(field(1, 4, BASE_SINT32));
        }
        if self.altitude {
            fields.push(field(2, 2, BASE_UINT16));
        }
        if self.heart_rate {
            fields.push(field(3, 1, BASE_UINT8));
        }
        if self.distance {
            fields.push(field(5, 4, BASE_UINT32));
        }
        if self.power {
            fields.push(field(7, 2, BASE_UINT16));
        }
        fields
    }
}

/// Seconds since the FIT epoch, saturating at zero for pre-epoch times
#[must_use]
pub fn fit_timestamp(at: DateTime<Utc>) -> u32 {
    (at.timestamp() - FIT_EPOCH_OFFSET).max(0) as u32
}

/// Degrees to the FIT semicircle convention (signed 32-bit)
#[must_use]
pub fn semicircles(degrees: f64) -> i32 {
    let scaled = degrees * (f64::from(1u32 << 31)) / 180.0;
    scaled.round().clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
}

/// FIT sport and sub-sport codes for an activity category
const fn sport_codes(activity_type: ActivityType) -> (u8, u8) {
    match activity_type {
        ActivityType::Running => (1, 0),
        ActivityType::Cycling => (2, 0),
        ActivityType::Swimming => (5, 0),
        ActivityType::WeightTraining => (10, 20),
        ActivityType::Yoga => (10, 43),
        ActivityType::Walking => (11, 0),
        ActivityType::Rowing => (15, 0),
        ActivityType::Hiking => (17, 0),
        ActivityType::Other => (0, 0),
    }
}

/// FNV-1a over the external id; gives the file a stable serial number so
/// identical inputs encode byte-identically.
fn serial_number(external_id: &str) -> u32 {
    let mut hash: u32 = 0x811C_9DC5;
    for byte in external_id.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(0x0100_0193);
    }
    // uint32z treats zero as invalid.
    hash.max(1)
}

/// Encode the activity into a FIT binary.
///
/// Returns `None` when there is nothing to encode (no session), which
/// callers surface as an omitted artifact rather than a zero-length file.
#[must_use]
pub fn encode_activity(activity: &StandardizedActivity) -> Option<Bytes> {
    let session = activity.session.as_ref()?;

    let mut data = BytesMut::with_capacity(1024);
    write_file_id(&mut data, activity, session);
    write_file_creator(&mut data);
    write_records(&mut data, session);
    write_laps(&mut data, session);
    write_session(&mut data, activity, session);
    write_activity_msg(&mut data, session);

    let mut out = BytesMut::with_capacity(data.len() + HEADER_SIZE as usize + 2);
    out.put_u8(HEADER_SIZE);
    out.put_u8(PROTOCOL_VERSION);
    out.put_u16_le(PROFILE_VERSION);
    out.put_u32_le(data.len() as u32);
    out.put_slice(b".FIT");
    let header_crc = crc::checksum(&out[..12]);
    out.put_u16_le(header_crc);
    out.put_slice(&data);
    let file_crc = crc::checksum(&out[..]);
    out.put_u16_le(file_crc);
    Some(out.freeze())
}

fn write_definition(buf: &mut BytesMut, local: u8, global: u16, fields: &[FieldDef]) {
    buf.put_u8(0x40 | local);
    buf.put_u8(0); // reserved
    buf.put_u8(0); // little-endian architecture
    buf.put_u16_le(global);
    buf.put_u8(fields.len() as u8);
    for field in fields {
        buf.put_u8(field.number);
        buf.put_u8(field.size);
        buf.put_u8(field.base_type);
    }
}

fn write_file_id(buf: &mut BytesMut, activity: &StandardizedActivity, session: &Session) {
    write_definition(
        buf,
        0,
        MSG_FILE_ID,
        &[
            field(0, 1, BASE_ENUM),
            field(1, 2, BASE_UINT16),
            field(2, 2, BASE_UINT16),
            field(3, 4, BASE_UINT32Z),
            field(4, 4, BASE_UINT32),
        ],
    );
    buf.put_u8(0);
    buf.put_u8(4); // file type: activity
    buf.put_u16_le(MANUFACTURER_DEVELOPMENT);
    buf.put_u16_le(PRODUCT_ID);
    buf.put_u32_le(serial_number(&activity.external_id));
    buf.put_u32_le(fit_timestamp(session.start_time));
}

fn write_file_creator(buf: &mut BytesMut) {
    write_definition(buf, 1, MSG_FILE_CREATOR, &[field(0, 2, BASE_UINT16)]);
    buf.put_u8(1);
    buf.put_u16_le(SOFTWARE_VERSION);
}

fn write_records(buf: &mut BytesMut, session: &Session) {
    let has_records = session.laps.iter().any(|lap| !lap.records.is_empty());
    if !has_records {
        return;
    }
    let layout = RecordLayout::scan(session);
    write_definition(buf, 2, MSG_RECORD, &layout.fields());
    for lap in &session.laps {
        for record in &lap.records {
            write_record(buf, record, layout);
        }
    }
}

fn write_record(buf: &mut BytesMut, record: &Record, layout: RecordLayout) {
    buf.put_u8(2);
    buf.put_u32_le(fit_timestamp(record.timestamp));
    if layout.position {
        match (record.latitude, record.longitude) {
            (Some(latitude), Some(longitude)) => {
                buf.put_i32_le(semicircles(latitude));
                buf.put_i32_le(semicircles(longitude));
            }
            _ => {
                buf.put_i32_le(INVALID_SINT32);
                buf.put_i32_le(INVALID_SINT32);
            }
        }
    }
    if layout.altitude {
        // Stored as (meters + 500) * 5.
        let stored = record
            .altitude
            .map(|altitude| ((altitude + 500.0) * 5.0).round().clamp(0.0, 65_534.0) as u16)
            .unwrap_or(INVALID_UINT16);
        buf.put_u16_le(stored);
    }
    if layout.heart_rate {
        let stored = record
            .heart_rate
            .map(|heart_rate| heart_rate.min(254) as u8)
            .unwrap_or(INVALID_UINT8);
        buf.put_u8(stored);
    }
    if layout.distance {
        // Centimeters.
        let stored = record
            .distance
            .map(|distance| (distance * 100.0).round().clamp(0.0, f64::from(u32::MAX) - 1.0) as u32)
            .unwrap_or(INVALID_UINT32);
        buf.put_u32_le(stored);
    }
    if layout.power {
        let stored = record
            .power
            .map(|power| power.min(65_534) as u16)
            .unwrap_or(INVALID_UINT16);
        buf.put_u16_le(stored);
    }
}

fn write_laps(buf: &mut BytesMut, session: &Session) {
    if session.laps.is_empty() {
        return;
    }
    write_definition(
        buf,
        3,
        MSG_LAP,
        &[
            field(253, 4, BASE_UINT32),
            field(2, 4, BASE_UINT32),
            field(7, 4, BASE_UINT32),
            field(8, 4, BASE_UINT32),
            field(9, 4, BASE_UINT32),
        ],
    );
    for lap in &session.laps {
        write_lap(buf, lap);
    }
}

fn write_lap(buf: &mut BytesMut, lap: &Lap) {
    let elapsed_ms = (lap.total_elapsed_time * 1000.0).round().max(0.0) as u32;
    let end = lap.start_time + chrono::Duration::milliseconds(i64::from(elapsed_ms));
    let distance_cm = lap
        .records
        .iter()
        .filter_map(|record| record.distance)
        .next_back()
        .map(|distance| (distance * 100.0).round().max(0.0) as u32)
        .unwrap_or(0);
    buf.put_u8(3);
    buf.put_u32_le(fit_timestamp(end));
    buf.put_u32_le(fit_timestamp(lap.start_time));
    buf.put_u32_le(elapsed_ms);
    buf.put_u32_le(elapsed_ms);
    buf.put_u32_le(distance_cm);
}

fn write_session(buf: &mut BytesMut, activity: &StandardizedActivity, session: &Session) {
    write_definition(
        buf,
        4,
        MSG_SESSION,
        &[
            field(253, 4, BASE_UINT32),
            field(2, 4, BASE_UINT32),
            field(7, 4, BASE_UINT32),
            field(8, 4, BASE_UINT32),
            field(9, 4, BASE_UINT32),
            field(5, 1, BASE_ENUM),
            field(6, 1, BASE_ENUM),
            field(25, 2, BASE_UINT16),
            field(26, 2, BASE_UINT16),
        ],
    );
    let elapsed_ms = (session.total_elapsed_time * 1000.0).round().max(0.0) as u32;
    let end = session.start_time + chrono::Duration::milliseconds(i64::from(elapsed_ms));
    let (sport, sub_sport) = sport_codes(activity.activity_type);
    buf.put_u8(4);
    buf.put_u32_le(fit_timestamp(end));
    buf.put_u32_le(fit_timestamp(session.start_time));
    buf.put_u32_le(elapsed_ms);
    buf.put_u32_le(elapsed_ms);
    buf.put_u32_le((session.total_distance * 100.0).round().max(0.0) as u32);
    buf.put_u8(sport);
    buf.put_u8(sub_sport);
    buf.put_u16_le(0);
    buf.put_u16_le(session.laps.len() as u16);
}

fn write_activity_msg(buf: &mut BytesMut, session: &Session) {
    write_definition(
        buf,
        5,
        MSG_ACTIVITY,
        &[
            field(253, 4, BASE_UINT32),
            field(0, 4, BASE_UINT32),
            field(1, 2, BASE_UINT16),
            field(2, 1, BASE_ENUM),
            field(3, 1, BASE_ENUM),
            field(4, 1, BASE_ENUM),
        ],
    );
    let elapsed_ms = (session.total_elapsed_time * 1000.0).round().max(0.0) as u32;
    let end = session.start_time + chrono::Duration::milliseconds(i64::from(elapsed_ms));
    buf.put_u8(5);
    buf.put_u32_le(fit_timestamp(end));
    buf.put_u32_le(elapsed_ms);
    buf.put_u16_le(1); // num_sessions
    buf.put_u8(0); // type: manual
    buf.put_u8(26); // event: activity
    buf.put_u8(1); // event_type: stop
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use uuid::Uuid;

    fn base_activity(session: Option<Session>) -> StandardizedActivity {
        StandardizedActivity {
            external_id: "w-42".into(),
            user_id: Uuid::new_v4(),
            source: "SOURCE_HEVY".into(),
            start_time: Utc.with_ymd_and_hms(2026, 2, 2, 18, 0, 0).unwrap(),
            name: "Evening Lift".into(),
            description: String::new(),
            activity_type: ActivityType::WeightTraining,
            tags: Vec::new(),
            session,
        }
    }

    #[test]
    fn no_session_yields_empty_artifact_signal() {
        assert!(encode_activity(&base_activity(None)).is_none());
    }

    #[test]
    fn semicircle_conversion_matches_convention() {
        assert_eq!(semicircles(0.0), 0);
        assert_eq!(semicircles(180.0), i32::MAX);
        assert_eq!(semicircles(90.0), 1 << 30);
        assert_eq!(semicircles(-90.0), -(1 << 30));
    }

    #[test]
    fn fit_timestamp_is_offset_from_1989() {
        let epoch = Utc.with_ymd_and_hms(1989, 12, 31, 0, 0, 0).unwrap();
        assert_eq!(fit_timestamp(epoch), 0);
        assert_eq!(fit_timestamp(epoch + chrono::Duration::seconds(100)), 100);
    }

    #[test]
    fn serial_number_is_stable_and_nonzero() {
        assert_eq!(serial_number("abc"), serial_number("abc"));
        assert_ne!(serial_number("abc"), serial_number("abd"));
        assert_ne!(serial_number(""), 0);
    }

    #[test]
    fn encoded_file_has_valid_header_and_crc() {
        let start = Utc.with_ymd_and_hms(2026, 2, 2, 18, 0, 0).unwrap();
        let session = Session {
            start_time: start,
            total_elapsed_time: 120.0,
            total_distance: 400.0,
            laps: vec![Lap {
                start_time: start,
                total_elapsed_time: 120.0,
                records: (0..120)
                    .map(|second| Record {
                        timestamp: start + chrono::Duration::seconds(second),
                        heart_rate: Some(120),
                        power: None,
                        latitude: Some(51.5),
                        longitude: Some(-0.17),
                        altitude: None,
                        distance: None,
                    })
                    .collect(),
            }],
            strength_sets: Vec::new(),
        };
        let bytes = encode_activity(&base_activity(Some(session))).unwrap();

        // Header shape.
        assert_eq!(bytes[0], 14);
        assert_eq!(bytes[1], 0x20);
        assert_eq!(&bytes[8..12], b".FIT");
        let data_size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        assert_eq!(bytes.len(), 14 + data_size + 2);

        // Header CRC and file CRC both verify.
        let header_crc = u16::from_le_bytes([bytes[12], bytes[13]]);
        assert_eq!(crc::checksum(&bytes[..12]), header_crc);
        assert_eq!(crc::checksum(&bytes), 0);
    }

    #[test]
    fn identical_inputs_encode_byte_identically() {
        let start = Utc.with_ymd_and_hms(2026, 2, 2, 18, 0, 0).unwrap();
        let session = Session {
            start_time: start,
            total_elapsed_time: 30.0,
            total_distance: 0.0,
            laps: vec![Lap {
                start_time: start,
                total_elapsed_time: 30.0,
                records: Vec::new(),
            }],
            strength_sets: Vec::new(),
        };
        let a = encode_activity(&base_activity(Some(session.clone()))).unwrap();
        let b = encode_activity(&base_activity(Some(session))).unwrap();
        assert_eq!(a, b);
    }
}
