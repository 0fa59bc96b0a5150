//! Typed decoding of text-format result fields
//!
//! The server tags every result column with a type OID; [`decode_text`]
//! bridges those OIDs to native values. Unknown OIDs fall back to the raw
//! string, which keeps the decoder forward-compatible with types it has
//! never heard of.

mod json;

pub use json::Json;

use crate::{Error, Result};
use bytes::Bytes;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;

/// Postgres object identifier (type tag)
pub type Oid = u32;

/// Well-known type OIDs from `pg_type.dat`
pub mod oids {
    use super::Oid;

    pub const BOOL: Oid = 16;
    pub const BYTEA: Oid = 17;
    pub const CHAR: Oid = 18;
    pub const NAME: Oid = 19;
    pub const INT8: Oid = 20;
    pub const INT2: Oid = 21;
    pub const INT4: Oid = 23;
    pub const REGPROC: Oid = 24;
    pub const TEXT: Oid = 25;
    pub const OID: Oid = 26;
    pub const JSON: Oid = 114;
    pub const JSON_ARRAY: Oid = 199;
    pub const FLOAT4: Oid = 700;
    pub const FLOAT8: Oid = 701;
    pub const BPCHAR: Oid = 1042;
    pub const VARCHAR: Oid = 1043;
    pub const DATE: Oid = 1082;
    pub const TIME: Oid = 1083;
    pub const TIMESTAMP: Oid = 1114;
    pub const TIMESTAMPTZ: Oid = 1184;
    pub const BIT: Oid = 1560;
    pub const NUMERIC: Oid = 1700;
    pub const UUID: Oid = 2950;
    pub const JSONB: Oid = 3802;
    pub const JSONB_ARRAY: Oid = 3807;
}

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const TIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second].[subsecond]");
const TIME_FORMAT_NO_FRAC: &[BorrowedFormatItem<'static>] =
    format_description!("[hour]:[minute]:[second]");
const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second].[subsecond]");
const TIMESTAMP_FORMAT_NO_FRAC: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Timestamps are cut to `YYYY-MM-DD HH:MM:SS.fff` before parsing;
/// the server may send up to six fractional digits.
const TIMESTAMP_TEXT_LEN: usize = 23;

/// One decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum PgValue {
    /// SQL NULL (wire length -1)
    Null,
    /// `bool`: the text `t` is true, anything else false
    Bool(bool),
    /// `bytea`: raw bytes of the text representation
    Bytes(Bytes),
    /// `"char"`: first Unicode scalar
    Char(char),
    /// `text`, `name`, `varchar`, `bpchar`, `regproc`, and the fallback
    Text(String),
    /// `int2`
    Int2(i16),
    /// `int4`
    Int4(i32),
    /// `int8`
    Int8(i64),
    /// `oid`
    Oid(Oid),
    /// `float4`
    Float4(f32),
    /// `float8` and `numeric` (numeric loses precision by design)
    Float8(f64),
    /// `date`
    Date(time::Date),
    /// `time`
    Time(time::Time),
    /// `timestamp` without time zone
    Timestamp(time::PrimitiveDateTime),
    /// `timestamptz`, kept as raw text
    TimestampTz(String),
    /// `uuid`
    Uuid(uuid::Uuid),
    /// `json` / `jsonb`, parsed lazily
    Json(Json),
}

impl PgValue {
    /// True for SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, PgValue::Null)
    }

    /// Boolean value, if this is a `Bool`
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// String slice for textual variants
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PgValue::Text(s) => Some(s),
            PgValue::TimestampTz(s) => Some(s),
            _ => None,
        }
    }

    /// Integer value widened to i64 for `Int2`/`Int4`/`Int8`
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PgValue::Int2(v) => Some(i64::from(*v)),
            PgValue::Int4(v) => Some(i64::from(*v)),
            PgValue::Int8(v) => Some(*v),
            _ => None,
        }
    }

    /// Float value widened to f64 for `Float4`/`Float8`
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PgValue::Float4(v) => Some(f64::from(*v)),
            PgValue::Float8(v) => Some(*v),
            _ => None,
        }
    }

    /// Raw bytes, if this is a `Bytes`
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            PgValue::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// UUID value, if this is a `Uuid`
    pub fn as_uuid(&self) -> Option<uuid::Uuid> {
        match self {
            PgValue::Uuid(u) => Some(*u),
            _ => None,
        }
    }

    /// Lazy JSON value, if this is a `Json`
    pub fn as_json(&self) -> Option<&Json> {
        match self {
            PgValue::Json(j) => Some(j),
            _ => None,
        }
    }

    /// Date value, if this is a `Date`
    pub fn as_date(&self) -> Option<time::Date> {
        match self {
            PgValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Timestamp value, if this is a `Timestamp`
    pub fn as_timestamp(&self) -> Option<time::PrimitiveDateTime> {
        match self {
            PgValue::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }
}

impl std::fmt::Display for PgValue {
    /// Server-style text rendering; NULL renders as the empty string.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PgValue::Null => Ok(()),
            PgValue::Bool(b) => f.write_str(if *b { "t" } else { "f" }),
            PgValue::Bytes(b) => write!(f, "{:?}", b),
            PgValue::Char(c) => write!(f, "{}", c),
            PgValue::Text(s) => f.write_str(s),
            PgValue::Int2(v) => write!(f, "{}", v),
            PgValue::Int4(v) => write!(f, "{}", v),
            PgValue::Int8(v) => write!(f, "{}", v),
            PgValue::Oid(v) => write!(f, "{}", v),
            PgValue::Float4(v) => write!(f, "{}", v),
            PgValue::Float8(v) => write!(f, "{}", v),
            PgValue::Date(d) => write!(f, "{}", d),
            PgValue::Time(t) => write!(f, "{}", t),
            PgValue::Timestamp(ts) => write!(f, "{}", ts),
            PgValue::TimestampTz(s) => f.write_str(s),
            PgValue::Uuid(u) => write!(f, "{}", u),
            PgValue::Json(j) => f.write_str(j.as_str()),
        }
    }
}

/// Decode one text-format field by its column OID.
///
/// Dispatch is a closed table; any OID without an entry decodes as the raw
/// string so newer server types degrade gracefully instead of failing.
pub fn decode_text(oid: Oid, raw: &[u8]) -> Result<PgValue> {
    use oids::*;

    Ok(match oid {
        BOOL | BIT => PgValue::Bool(raw == b"t"),
        BYTEA => PgValue::Bytes(Bytes::copy_from_slice(raw)),
        CHAR => {
            let s = utf8(raw)?;
            let c = s
                .chars()
                .next()
                .ok_or_else(|| Error::Decode("empty \"char\" value".to_string()))?;
            PgValue::Char(c)
        }
        INT8 => PgValue::Int8(parse_number(raw, "int8")?),
        INT2 => PgValue::Int2(parse_number(raw, "int2")?),
        INT4 => PgValue::Int4(parse_number(raw, "int4")?),
        OID => PgValue::Oid(parse_number(raw, "oid")?),
        FLOAT4 => PgValue::Float4(parse_number(raw, "float4")?),
        FLOAT8 | NUMERIC => PgValue::Float8(parse_number(raw, "float8")?),
        DATE => {
            let s = utf8(raw)?;
            let date = time::Date::parse(s, DATE_FORMAT)
                .map_err(|e| Error::Decode(format!("bad date {:?}: {}", s, e)))?;
            PgValue::Date(date)
        }
        TIME => {
            let s = utf8(raw)?;
            let t = time::Time::parse(s, TIME_FORMAT)
                .or_else(|_| time::Time::parse(s, TIME_FORMAT_NO_FRAC))
                .map_err(|e| Error::Decode(format!("bad time {:?}: {}", s, e)))?;
            PgValue::Time(t)
        }
        TIMESTAMP => {
            let s = utf8(raw)?;
            let s = truncate_chars(s, TIMESTAMP_TEXT_LEN);
            let ts = time::PrimitiveDateTime::parse(s, TIMESTAMP_FORMAT)
                .or_else(|_| time::PrimitiveDateTime::parse(s, TIMESTAMP_FORMAT_NO_FRAC))
                .map_err(|e| Error::Decode(format!("bad timestamp {:?}: {}", s, e)))?;
            PgValue::Timestamp(ts)
        }
        TIMESTAMPTZ => PgValue::TimestampTz(utf8_lossy(raw)),
        UUID => {
            let s = utf8(raw)?;
            let u = uuid::Uuid::parse_str(s)
                .map_err(|e| Error::Decode(format!("bad uuid {:?}: {}", s, e)))?;
            PgValue::Uuid(u)
        }
        JSON | JSON_ARRAY | JSONB | JSONB_ARRAY => PgValue::Json(Json::from_raw(utf8_lossy(raw))),
        NAME | REGPROC | TEXT | BPCHAR | VARCHAR => PgValue::Text(utf8_lossy(raw)),
        _ => PgValue::Text(utf8_lossy(raw)),
    })
}

fn utf8(raw: &[u8]) -> Result<&str> {
    std::str::from_utf8(raw).map_err(|e| Error::Decode(format!("invalid UTF-8: {}", e)))
}

fn utf8_lossy(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).to_string()
}

fn parse_number<T: std::str::FromStr>(raw: &[u8], what: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    let s = utf8(raw)?;
    s.parse::<T>()
        .map_err(|e| Error::Decode(format!("bad {} {:?}: {}", what, s, e)))
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, time as t};

    #[test]
    fn test_decode_bool_rule() {
        assert_eq!(decode_text(16, b"t").unwrap(), PgValue::Bool(true));
        assert_eq!(decode_text(16, b"f").unwrap(), PgValue::Bool(false));
        // Anything that is not exactly "t" is false
        assert_eq!(decode_text(16, b"true").unwrap(), PgValue::Bool(false));
    }

    #[test]
    fn test_decode_bit_uses_bool_rule() {
        assert_eq!(decode_text(1560, b"t").unwrap(), PgValue::Bool(true));
        assert_eq!(decode_text(1560, b"1").unwrap(), PgValue::Bool(false));
    }

    #[test]
    fn test_decode_integers() {
        assert_eq!(decode_text(21, b"-7").unwrap(), PgValue::Int2(-7));
        assert_eq!(decode_text(23, b"1").unwrap(), PgValue::Int4(1));
        assert_eq!(
            decode_text(20, b"9007199254740993").unwrap(),
            PgValue::Int8(9007199254740993)
        );
        assert_eq!(decode_text(26, b"16384").unwrap(), PgValue::Oid(16384));
    }

    #[test]
    fn test_decode_integer_rejects_garbage() {
        assert!(matches!(decode_text(23, b"1x"), Err(Error::Decode(_))));
        assert!(matches!(decode_text(20, b""), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_floats_and_numeric() {
        assert_eq!(decode_text(700, b"1.5").unwrap(), PgValue::Float4(1.5));
        assert_eq!(decode_text(701, b"-2.25").unwrap(), PgValue::Float8(-2.25));
        // numeric decodes as f64, precision loss accepted
        assert_eq!(
            decode_text(1700, b"12345.6789").unwrap(),
            PgValue::Float8(12345.6789)
        );
    }

    #[test]
    fn test_decode_strings() {
        for oid in [19u32, 24, 25, 1042, 1043] {
            assert_eq!(
                decode_text(oid, b"hello").unwrap(),
                PgValue::Text("hello".to_string()),
                "oid {}",
                oid
            );
        }
    }

    #[test]
    fn test_decode_char_first_scalar() {
        assert_eq!(decode_text(18, b"x").unwrap(), PgValue::Char('x'));
        assert_eq!(
            decode_text(18, "émile".as_bytes()).unwrap(),
            PgValue::Char('é')
        );
        assert!(matches!(decode_text(18, b""), Err(Error::Decode(_))));
    }

    #[test]
    fn test_decode_bytea_raw() {
        assert_eq!(
            decode_text(17, b"\\x0102").unwrap(),
            PgValue::Bytes(Bytes::from_static(b"\\x0102"))
        );
    }

    #[test]
    fn test_decode_date() {
        assert_eq!(
            decode_text(1082, b"2024-02-13").unwrap(),
            PgValue::Date(date!(2024 - 02 - 13))
        );
        assert!(decode_text(1082, b"13/02/2024").is_err());
    }

    #[test]
    fn test_decode_time_with_and_without_fraction() {
        assert_eq!(
            decode_text(1083, b"05:28:17").unwrap(),
            PgValue::Time(t!(05:28:17))
        );
        assert_eq!(
            decode_text(1083, b"05:28:17.5").unwrap(),
            PgValue::Time(t!(05:28:17.5))
        );
    }

    #[test]
    fn test_decode_timestamp_truncates_to_millis() {
        // Six fractional digits from the server; only the first three survive
        let value = decode_text(1114, b"2024-02-13 05:28:17.756152").unwrap();
        match value {
            PgValue::Timestamp(ts) => {
                assert_eq!(ts.date(), date!(2024 - 02 - 13));
                assert_eq!(ts.time(), t!(05:28:17.756));
            }
            other => panic!("expected Timestamp, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_timestamp_without_fraction() {
        let value = decode_text(1114, b"2024-02-13 05:28:17").unwrap();
        assert_eq!(
            value,
            PgValue::Timestamp(time::PrimitiveDateTime::new(
                date!(2024 - 02 - 13),
                t!(05:28:17)
            ))
        );
    }

    #[test]
    fn test_decode_timestamptz_is_raw_text() {
        let value = decode_text(1184, b"2024-02-13 05:28:17.756152+02").unwrap();
        assert_eq!(
            value,
            PgValue::TimestampTz("2024-02-13 05:28:17.756152+02".to_string())
        );
    }

    #[test]
    fn test_decode_uuid() {
        let value = decode_text(2950, b"a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11").unwrap();
        assert_eq!(
            value.as_uuid().unwrap().to_string(),
            "a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11"
        );
        assert!(decode_text(2950, b"not-a-uuid").is_err());
    }

    #[test]
    fn test_decode_json_is_lazy() {
        for oid in [114u32, 199, 3802, 3807] {
            let value = decode_text(oid, b"\"foo\"").unwrap();
            let json = value.as_json().expect("json variant");
            assert_eq!(json.as_str(), "\"foo\"");
            assert_eq!(
                json.value().unwrap(),
                serde_json::Value::String("foo".to_string())
            );
        }
    }

    #[test]
    fn test_decode_unknown_oid_falls_back_to_text() {
        // 600 is `point`, which the table does not know
        assert_eq!(
            decode_text(600, b"(1,2)").unwrap(),
            PgValue::Text("(1,2)".to_string())
        );
    }

    #[test]
    fn test_as_i64_widening() {
        assert_eq!(PgValue::Int2(3).as_i64(), Some(3));
        assert_eq!(PgValue::Int4(3).as_i64(), Some(3));
        assert_eq!(PgValue::Int8(3).as_i64(), Some(3));
        assert_eq!(PgValue::Text("3".to_string()).as_i64(), None);
    }

    #[test]
    fn test_null_accessors() {
        assert!(PgValue::Null.is_null());
        assert_eq!(PgValue::Null.as_bool(), None);
        assert_eq!(PgValue::Null.as_str(), None);
    }
}
