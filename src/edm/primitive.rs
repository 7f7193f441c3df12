//! Primitive values and their canonical text forms
//!
//! Every value produced by [`PrimitiveValue::to_wire_string`] parses back to
//! an equal value with [`PrimitiveValue::parse`].

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, TimeDelta,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use uuid::Uuid;

use crate::config::ODataVersion;
use crate::edm::geospatial::Geospatial;
use crate::edm::simple_type::{EdmSimpleType, NativeKind};
use crate::error::{CodecError, Result};

/// Fraction digits kept by the canonical decimal form
pub const DECIMAL_MAX_FRACTION_DIGITS: usize = 23;

/// Largest decimal exponent accepted when expanding scientific notation
const DECIMAL_MAX_EXPONENT: u64 = 4096;

static DECIMAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-])?(\d*)(?:\.(\d*))?(?:[eE]([+-]?\d+))?$").unwrap()
});

static DURATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(-)?P(?:(\d+)D)?(?:T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+)(?:\.(\d{1,9}))?S)?)?$",
    )
    .unwrap()
});

static LEGACY_DATE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\\?/Date\((-?\d+)(?:[+-]\d{4})?\)\\?/$").unwrap()
});

/// Arbitrary precision decimal held in canonical plain notation
///
/// The canonical form has no exponent, no leading zeros in the integer part,
/// at most [`DECIMAL_MAX_FRACTION_DIGITS`] fraction digits (rounded half to
/// even) and no trailing fraction zeros. Negative zero is normalised to `0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EdmDecimal(String);

impl EdmDecimal {
    /// Parse plain or scientific decimal text
    pub fn parse(text: &str) -> Result<Self> {
        let invalid = || CodecError::invalid_value("Edm.Decimal", text);
        let caps = DECIMAL_RE.captures(text.trim()).ok_or_else(invalid)?;

        let negative = caps.get(1).is_some_and(|m| m.as_str() == "-");
        let int_part = caps.get(2).map_or("", |m| m.as_str());
        let frac_part = caps.get(3).map_or("", |m| m.as_str());
        if int_part.is_empty() && frac_part.is_empty() {
            return Err(invalid());
        }
        let exponent: i64 = match caps.get(4) {
            Some(m) => m.as_str().parse().map_err(|_| invalid())?,
            None => 0,
        };
        if exponent.unsigned_abs() > DECIMAL_MAX_EXPONENT {
            return Err(invalid());
        }

        let mut digits: Vec<u8> = int_part
            .bytes()
            .chain(frac_part.bytes())
            .map(|b| b - b'0')
            .collect();
        let mut point = int_part.len() as i64 + exponent;

        // Place the decimal point inside the digit string
        if point < 0 {
            let mut padded = vec![0u8; (-point) as usize];
            padded.extend_from_slice(&digits);
            digits = padded;
            point = 0;
        } else if point as usize > digits.len() {
            digits.resize(point as usize, 0);
        }
        let point = point as usize;

        let mut int_digits = digits[..point].to_vec();
        let mut frac_digits = digits[point..].to_vec();

        if frac_digits.len() > DECIMAL_MAX_FRACTION_DIGITS {
            let rest = frac_digits.split_off(DECIMAL_MAX_FRACTION_DIGITS);
            let first = rest[0];
            let tail_nonzero = rest[1..].iter().any(|d| *d != 0);
            let last_kept = frac_digits
                .last()
                .or(int_digits.last())
                .copied()
                .unwrap_or(0);
            let round_up = first > 5 || (first == 5 && (tail_nonzero || last_kept % 2 == 1));
            if round_up && increment(&mut frac_digits) {
                if increment(&mut int_digits) {
                    int_digits.insert(0, 1);
                }
            }
        }

        while frac_digits.last() == Some(&0) {
            frac_digits.pop();
        }
        let first_nonzero = int_digits.iter().position(|d| *d != 0);
        let int_digits = match first_nonzero {
            Some(idx) => &int_digits[idx..],
            None => &[][..],
        };

        let mut canonical = String::new();
        let is_zero = int_digits.is_empty() && frac_digits.is_empty();
        if negative && !is_zero {
            canonical.push('-');
        }
        if int_digits.is_empty() {
            canonical.push('0');
        } else {
            canonical.extend(int_digits.iter().map(|d| char::from(b'0' + d)));
        }
        if !frac_digits.is_empty() {
            canonical.push('.');
            canonical.extend(frac_digits.iter().map(|d| char::from(b'0' + d)));
        }
        Ok(EdmDecimal(canonical))
    }

    /// Canonical text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn to_f64(&self) -> f64 {
        self.0.parse().unwrap_or(f64::NAN)
    }

    /// Convert a finite float using its shortest round-trip digits
    pub fn from_f64(value: f64) -> Result<Self> {
        if !value.is_finite() {
            return Err(CodecError::invalid_value("Edm.Decimal", value.to_string()));
        }
        Self::parse(&format!("{value:e}"))
    }

    pub fn is_integral(&self) -> bool {
        !self.0.contains('.')
    }
}

/// Add one to a big-endian digit vector; returns the carry
fn increment(digits: &mut [u8]) -> bool {
    for d in digits.iter_mut().rev() {
        if *d == 9 {
            *d = 0;
        } else {
            *d += 1;
            return false;
        }
    }
    true
}

impl From<i64> for EdmDecimal {
    fn from(value: i64) -> Self {
        EdmDecimal(value.to_string())
    }
}

impl std::fmt::Display for EdmDecimal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for EdmDecimal {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A value of an Edm primitive type
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveValue {
    Binary(Vec<u8>),
    Boolean(bool),
    Byte(u8),
    SByte(i8),
    /// Local timestamp (V3 `Edm.DateTime`)
    DateTime(NaiveDateTime),
    /// Calendar date (V4 `Edm.Date`)
    Date(NaiveDate),
    DateTimeOffset(DateTime<FixedOffset>),
    /// V3 `Edm.Time`, a duration since midnight
    Time(TimeDelta),
    TimeOfDay(NaiveTime),
    Duration(TimeDelta),
    Decimal(EdmDecimal),
    Single(f32),
    Double(f64),
    Geospatial(Geospatial),
    Guid(Uuid),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    String(String),
    /// URI of a stream
    Stream(String),
}

impl PrimitiveValue {
    /// The Edm type this value belongs to
    pub fn edm_type(&self) -> EdmSimpleType {
        match self {
            PrimitiveValue::Binary(_) => EdmSimpleType::Binary,
            PrimitiveValue::Boolean(_) => EdmSimpleType::Boolean,
            PrimitiveValue::Byte(_) => EdmSimpleType::Byte,
            PrimitiveValue::SByte(_) => EdmSimpleType::SByte,
            PrimitiveValue::DateTime(_) => EdmSimpleType::DateTime,
            PrimitiveValue::Date(_) => EdmSimpleType::Date,
            PrimitiveValue::DateTimeOffset(_) => EdmSimpleType::DateTimeOffset,
            PrimitiveValue::Time(_) => EdmSimpleType::Time,
            PrimitiveValue::TimeOfDay(_) => EdmSimpleType::TimeOfDay,
            PrimitiveValue::Duration(_) => EdmSimpleType::Duration,
            PrimitiveValue::Decimal(_) => EdmSimpleType::Decimal,
            PrimitiveValue::Single(_) => EdmSimpleType::Single,
            PrimitiveValue::Double(_) => EdmSimpleType::Double,
            PrimitiveValue::Geospatial(g) => g.edm_type(),
            PrimitiveValue::Guid(_) => EdmSimpleType::Guid,
            PrimitiveValue::Int16(_) => EdmSimpleType::Int16,
            PrimitiveValue::Int32(_) => EdmSimpleType::Int32,
            PrimitiveValue::Int64(_) => EdmSimpleType::Int64,
            PrimitiveValue::String(_) => EdmSimpleType::String,
            PrimitiveValue::Stream(_) => EdmSimpleType::Stream,
        }
    }

    pub fn native_kind(&self) -> NativeKind {
        self.edm_type().native_kind()
    }

    /// Parse the wire text of a value declared as `edm_type`
    ///
    /// # Errors
    ///
    /// [`CodecError::InvalidValue`] when the text is not a valid literal, and
    /// for geospatial and null types, which have no text form.
    pub fn parse(edm_type: EdmSimpleType, text: &str) -> Result<Self> {
        let invalid = || CodecError::invalid_value(edm_type.full_name(), text);
        let value = match edm_type {
            EdmSimpleType::Null => return Err(invalid()),
            EdmSimpleType::Binary => {
                PrimitiveValue::Binary(BASE64.decode(text.trim()).map_err(|_| invalid())?)
            }
            EdmSimpleType::Boolean => match text.trim() {
                "true" | "1" => PrimitiveValue::Boolean(true),
                "false" | "0" => PrimitiveValue::Boolean(false),
                _ => return Err(invalid()),
            },
            EdmSimpleType::Byte => PrimitiveValue::Byte(text.trim().parse().map_err(|_| invalid())?),
            EdmSimpleType::SByte => {
                PrimitiveValue::SByte(text.trim().parse().map_err(|_| invalid())?)
            }
            EdmSimpleType::Int16 => {
                PrimitiveValue::Int16(text.trim().parse().map_err(|_| invalid())?)
            }
            EdmSimpleType::Int32 => {
                PrimitiveValue::Int32(text.trim().parse().map_err(|_| invalid())?)
            }
            EdmSimpleType::Int64 => {
                let trimmed = text.trim();
                let digits = trimmed.strip_suffix(['L', 'l']).unwrap_or(trimmed);
                PrimitiveValue::Int64(digits.parse().map_err(|_| invalid())?)
            }
            EdmSimpleType::DateTime => {
                PrimitiveValue::DateTime(parse_local_datetime(text.trim()).ok_or_else(invalid)?)
            }
            EdmSimpleType::Date => PrimitiveValue::Date(
                NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d").map_err(|_| invalid())?,
            ),
            EdmSimpleType::DateTimeOffset => PrimitiveValue::DateTimeOffset(
                DateTime::parse_from_rfc3339(text.trim()).map_err(|_| invalid())?,
            ),
            EdmSimpleType::Time => {
                PrimitiveValue::Time(parse_duration(text.trim()).ok_or_else(invalid)?)
            }
            EdmSimpleType::TimeOfDay => {
                let trimmed = text.trim();
                let time = NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")
                    .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
                    .map_err(|_| invalid())?;
                PrimitiveValue::TimeOfDay(time)
            }
            EdmSimpleType::Duration => {
                PrimitiveValue::Duration(parse_duration(text.trim()).ok_or_else(invalid)?)
            }
            EdmSimpleType::Decimal => PrimitiveValue::Decimal(
                EdmDecimal::parse(text).map_err(|_| invalid())?,
            ),
            EdmSimpleType::Single => {
                PrimitiveValue::Single(parse_float::<f32>(text).ok_or_else(invalid)?)
            }
            EdmSimpleType::Double => {
                PrimitiveValue::Double(parse_float::<f64>(text).ok_or_else(invalid)?)
            }
            EdmSimpleType::Guid => {
                PrimitiveValue::Guid(Uuid::parse_str(text.trim()).map_err(|_| invalid())?)
            }
            EdmSimpleType::String => PrimitiveValue::String(text.to_string()),
            EdmSimpleType::Stream => PrimitiveValue::Stream(text.trim().to_string()),
            _ => return Err(invalid()),
        };
        Ok(value)
    }

    /// Canonical wire text
    pub fn to_wire_string(&self) -> String {
        match self {
            PrimitiveValue::Binary(bytes) => BASE64.encode(bytes),
            PrimitiveValue::Boolean(b) => b.to_string(),
            PrimitiveValue::Byte(v) => v.to_string(),
            PrimitiveValue::SByte(v) => v.to_string(),
            PrimitiveValue::DateTime(dt) => dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            PrimitiveValue::Date(d) => d.format("%Y-%m-%d").to_string(),
            PrimitiveValue::DateTimeOffset(dt) => dt.to_rfc3339_opts(SecondsFormat::AutoSi, true),
            PrimitiveValue::Time(d) | PrimitiveValue::Duration(d) => format_duration(*d),
            PrimitiveValue::TimeOfDay(t) => t.format("%H:%M:%S%.f").to_string(),
            PrimitiveValue::Decimal(d) => d.to_string(),
            PrimitiveValue::Single(v) => format_float(*v),
            PrimitiveValue::Double(v) => format_float(*v),
            PrimitiveValue::Geospatial(g) => g.to_string(),
            PrimitiveValue::Guid(u) => u.hyphenated().to_string(),
            PrimitiveValue::Int16(v) => v.to_string(),
            PrimitiveValue::Int32(v) => v.to_string(),
            PrimitiveValue::Int64(v) => v.to_string(),
            PrimitiveValue::String(s) | PrimitiveValue::Stream(s) => s.clone(),
        }
    }

    /// Decode a JSON value declared as `edm_type`
    ///
    /// Numbers and strings are both accepted for numeric types; geospatial
    /// types expect a GeoJSON object.
    pub fn from_json(edm_type: EdmSimpleType, value: &Value) -> Result<Self> {
        if edm_type.is_geospatial() {
            return Ok(PrimitiveValue::Geospatial(Geospatial::from_geojson(
                edm_type, value,
            )?));
        }
        match value {
            Value::String(s) => {
                if edm_type == EdmSimpleType::DateTime {
                    if let Some(dt) = parse_legacy_date(s) {
                        return Ok(PrimitiveValue::DateTime(dt));
                    }
                }
                Self::parse(edm_type, s)
            }
            Value::Number(n) => Self::parse(edm_type, &n.to_string()),
            Value::Bool(b) => Self::parse(edm_type, if *b { "true" } else { "false" }),
            other => Err(CodecError::invalid_value(
                edm_type.full_name(),
                other.to_string(),
            )),
        }
    }

    /// Encode as a JSON value
    ///
    /// V3 writes Int64 and Decimal as strings; V4 writes them as numbers when
    /// the number survives the trip through a double. Non-finite floats are
    /// written as `"INF"`, `"-INF"` and `"NaN"`.
    pub fn to_json(&self, version: ODataVersion) -> Value {
        match self {
            PrimitiveValue::Boolean(b) => Value::Bool(*b),
            PrimitiveValue::Byte(v) => Value::from(*v),
            PrimitiveValue::SByte(v) => Value::from(*v),
            PrimitiveValue::Int16(v) => Value::from(*v),
            PrimitiveValue::Int32(v) => Value::from(*v),
            PrimitiveValue::Int64(v) => match version {
                ODataVersion::V3 => Value::String(v.to_string()),
                ODataVersion::V4 => Value::from(*v),
            },
            PrimitiveValue::Decimal(d) => {
                let as_number = serde_json::Number::from_f64(d.to_f64())
                    .filter(|n| EdmDecimal::parse(&n.to_string()).ok().as_ref() == Some(d));
                match (version, as_number) {
                    (ODataVersion::V4, Some(n)) => Value::Number(n),
                    _ => Value::String(d.to_string()),
                }
            }
            PrimitiveValue::Single(v) => float_json(f64::from(*v), self),
            PrimitiveValue::Double(v) => float_json(*v, self),
            PrimitiveValue::Geospatial(g) => g.to_geojson(),
            other => Value::String(other.to_wire_string()),
        }
    }
}

impl std::fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_wire_string())
    }
}

fn float_json(v: f64, original: &PrimitiveValue) -> Value {
    match serde_json::Number::from_f64(v) {
        Some(n) if matches!(original, PrimitiveValue::Double(_)) => Value::Number(n),
        _ => Value::String(original.to_wire_string()),
    }
}

fn parse_local_datetime(text: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M"))
        .ok()
        .or_else(|| parse_legacy_date(text))
}

/// `/Date(1357027200000)/` as written by verbose V3 JSON
fn parse_legacy_date(text: &str) -> Option<NaiveDateTime> {
    let caps = LEGACY_DATE_RE.captures(text)?;
    let millis: i64 = caps.get(1)?.as_str().parse().ok()?;
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

trait WireFloat: Copy + std::str::FromStr + std::fmt::UpperExp {
    fn is_nan(self) -> bool;
    fn is_infinite(self) -> bool;
    fn is_sign_negative(self) -> bool;
}

impl WireFloat for f32 {
    fn is_nan(self) -> bool {
        f32::is_nan(self)
    }
    fn is_infinite(self) -> bool {
        f32::is_infinite(self)
    }
    fn is_sign_negative(self) -> bool {
        f32::is_sign_negative(self)
    }
}

impl WireFloat for f64 {
    fn is_nan(self) -> bool {
        f64::is_nan(self)
    }
    fn is_infinite(self) -> bool {
        f64::is_infinite(self)
    }
    fn is_sign_negative(self) -> bool {
        f64::is_sign_negative(self)
    }
}

fn parse_float<F: WireFloat>(text: &str) -> Option<F> {
    let trimmed = text.trim();
    let normalised = match trimmed {
        "INF" => "inf",
        "-INF" => "-inf",
        other => other,
    };
    let trimmed = normalised
        .strip_suffix(['f', 'F', 'd', 'D', 'm', 'M'])
        .filter(|rest| !rest.is_empty() && !rest.ends_with(['n', 'N', 'e', 'E']))
        .unwrap_or(normalised);
    trimmed.parse().ok()
}

fn format_float<F: WireFloat>(v: F) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v.is_infinite() {
        if v.is_sign_negative() {
            "-INF".to_string()
        } else {
            "INF".to_string()
        }
    } else {
        format!("{v:E}")
    }
}

fn parse_duration(text: &str) -> Option<TimeDelta> {
    let caps = DURATION_RE.captures(text)?;
    // "P" alone and "PT" carry no component
    if caps.iter().skip(2).all(|c| c.is_none()) {
        return None;
    }
    let number = |idx: usize| -> Option<i64> {
        match caps.get(idx) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    let days = number(2)?;
    let hours = number(3)?;
    let minutes = number(4)?;
    let seconds = number(5)?;
    let nanos: u32 = match caps.get(6) {
        Some(m) => format!("{:0<9}", m.as_str()).parse().ok()?,
        None => 0,
    };

    let total_seconds = days
        .checked_mul(86_400)?
        .checked_add(hours.checked_mul(3_600)?)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(seconds)?;
    let delta = TimeDelta::new(total_seconds, nanos)?;
    if caps.get(1).is_some() {
        Some(-delta)
    } else {
        Some(delta)
    }
}

fn format_duration(delta: TimeDelta) -> String {
    let negative = delta < TimeDelta::zero();
    let abs = if negative { -delta } else { delta };
    let total = abs.num_seconds();
    let nanos = abs.subsec_nanos();

    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push('P');
    if days > 0 {
        out.push_str(&format!("{days}D"));
    }
    let has_time = hours > 0 || minutes > 0 || seconds > 0 || nanos > 0;
    if has_time || days == 0 {
        out.push('T');
    }
    if hours > 0 {
        out.push_str(&format!("{hours}H"));
    }
    if minutes > 0 {
        out.push_str(&format!("{minutes}M"));
    }
    if seconds > 0 || nanos > 0 || (days == 0 && hours == 0 && minutes == 0) {
        out.push_str(&seconds.to_string());
        if nanos > 0 {
            let frac = format!("{nanos:09}");
            out.push('.');
            out.push_str(frac.trim_end_matches('0'));
        }
        out.push('S');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(value: PrimitiveValue) {
        let text = value.to_wire_string();
        let back = PrimitiveValue::parse(value.edm_type(), &text).unwrap();
        assert_eq!(back, value, "wire text {text}");
    }

    #[test]
    fn test_decimal_canonical_forms() {
        assert_eq!(EdmDecimal::parse("1.50").unwrap().as_str(), "1.5");
        assert_eq!(EdmDecimal::parse("007").unwrap().as_str(), "7");
        assert_eq!(EdmDecimal::parse(".5").unwrap().as_str(), "0.5");
        assert_eq!(EdmDecimal::parse("-0.000").unwrap().as_str(), "0");
        assert_eq!(EdmDecimal::parse("1.5E3").unwrap().as_str(), "1500");
        assert_eq!(EdmDecimal::parse("25e-4").unwrap().as_str(), "0.0025");
        assert!(EdmDecimal::parse("1.2.3").is_err());
        assert!(EdmDecimal::parse("").is_err());
        assert!(EdmDecimal::parse(".").is_err());
    }

    #[test]
    fn test_decimal_rounds_half_even() {
        let twenty_three = "0.".to_string() + &"1".repeat(23);
        assert_eq!(
            EdmDecimal::parse(&(twenty_three.clone() + "5")).unwrap().as_str(),
            twenty_three[..24].to_string() + "2"
        );
        assert_eq!(
            EdmDecimal::parse(&("0.".to_string() + &"9".repeat(24))).unwrap().as_str(),
            "1"
        );
    }

    #[test]
    fn test_float_canonical_forms() {
        assert_eq!(PrimitiveValue::Double(1.5).to_wire_string(), "1.5E0");
        assert_eq!(PrimitiveValue::Double(100.0).to_wire_string(), "1E2");
        assert_eq!(PrimitiveValue::Single(f32::INFINITY).to_wire_string(), "INF");
        assert_eq!(PrimitiveValue::Double(f64::NEG_INFINITY).to_wire_string(), "-INF");
        assert_eq!(PrimitiveValue::Double(f64::NAN).to_wire_string(), "NaN");
        assert_eq!(
            PrimitiveValue::parse(EdmSimpleType::Double, "-INF").unwrap(),
            PrimitiveValue::Double(f64::NEG_INFINITY)
        );
        assert_eq!(
            PrimitiveValue::parse(EdmSimpleType::Single, "2.5f").unwrap(),
            PrimitiveValue::Single(2.5)
        );
    }

    #[test]
    fn test_roundtrip_samples() {
        roundtrip(PrimitiveValue::Int64(i64::MIN));
        roundtrip(PrimitiveValue::Byte(255));
        roundtrip(PrimitiveValue::SByte(-128));
        roundtrip(PrimitiveValue::Binary(vec![0, 1, 2, 254, 255]));
        roundtrip(PrimitiveValue::Guid(Uuid::new_v4()));
        roundtrip(PrimitiveValue::Double(0.1));
        roundtrip(PrimitiveValue::Single(3.4028235e38));
        roundtrip(PrimitiveValue::Decimal(EdmDecimal::parse("-12.345").unwrap()));
        roundtrip(PrimitiveValue::Duration(TimeDelta::new(90_061, 500_000_000).unwrap()));
        roundtrip(PrimitiveValue::Time(-TimeDelta::new(3_600, 0).unwrap()));
        roundtrip(PrimitiveValue::String("  padded  ".to_string()));
    }

    #[test]
    fn test_temporal_forms() {
        let dt = PrimitiveValue::parse(EdmSimpleType::DateTime, "2013-01-01T10:20:30").unwrap();
        assert_eq!(dt.to_wire_string(), "2013-01-01T10:20:30");
        let dto =
            PrimitiveValue::parse(EdmSimpleType::DateTimeOffset, "2013-01-01T10:20:30+00:00")
                .unwrap();
        assert_eq!(dto.to_wire_string(), "2013-01-01T10:20:30Z");
        let tod = PrimitiveValue::parse(EdmSimpleType::TimeOfDay, "07:05:00.25").unwrap();
        assert_eq!(tod.to_wire_string(), "07:05:00.250");
    }

    #[test]
    fn test_duration_forms() {
        let d = PrimitiveValue::parse(EdmSimpleType::Duration, "P1DT2H3M4.5S").unwrap();
        assert_eq!(d.to_wire_string(), "P1DT2H3M4.5S");
        assert_eq!(
            PrimitiveValue::Duration(TimeDelta::zero()).to_wire_string(),
            "PT0S"
        );
        assert_eq!(
            PrimitiveValue::Duration(TimeDelta::new(2 * 86_400, 0).unwrap()).to_wire_string(),
            "P2D"
        );
        assert!(PrimitiveValue::parse(EdmSimpleType::Duration, "PT").is_err());
    }

    #[test]
    fn test_legacy_json_date() {
        let value = PrimitiveValue::from_json(
            EdmSimpleType::DateTime,
            &Value::String("/Date(0)/".to_string()),
        )
        .unwrap();
        assert_eq!(value.to_wire_string(), "1970-01-01T00:00:00");
    }

    #[test]
    fn test_json_encoding_by_version() {
        let big = PrimitiveValue::Int64(5_000_000_000);
        assert_eq!(big.to_json(ODataVersion::V3), Value::String("5000000000".into()));
        assert_eq!(big.to_json(ODataVersion::V4), serde_json::json!(5_000_000_000i64));
        let dec = PrimitiveValue::Decimal(EdmDecimal::parse("0.1").unwrap());
        assert_eq!(dec.to_json(ODataVersion::V4), serde_json::json!(0.1));
        assert_eq!(
            PrimitiveValue::Double(f64::NAN).to_json(ODataVersion::V4),
            Value::String("NaN".into())
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            PrimitiveValue::parse(EdmSimpleType::Int32, "abc"),
            Err(CodecError::InvalidValue { .. })
        ));
        assert!(PrimitiveValue::parse(EdmSimpleType::Byte, "256").is_err());
        assert!(PrimitiveValue::parse(EdmSimpleType::GeographyPoint, "POINT(1 2)").is_err());
    }
}
