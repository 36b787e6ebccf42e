//! Incremental cursor filters
//!
//! Checkpoints travel as opaque strings, but the filter sent to the store
//! must carry the cursor field's native type or comparisons silently match
//! nothing. This module decodes a checkpoint back into the native type the
//! field had at discovery time and builds the strictly-greater-than filter
//! for the next scan. A checkpoint that cannot be decoded is a hard error,
//! never a quiet fall back to a full refresh.

use crate::error::{Error, Result};
use crate::schema::element_type_name;
use bson::oid::ObjectId;
use bson::spec::ElementType;
use bson::{doc, Bson, Decimal128, Document};
use std::cmp::Ordering;
use std::str::FromStr;

// ============================================================================
// Cursor State
// ============================================================================

/// Where an incremental scan resumes.
///
/// `native_type` is the type discovery observed for the cursor field; the
/// checkpoint `value` is decoded against it.
#[derive(Debug, Clone)]
pub struct CursorState {
    /// Field the scan is ordered by
    pub field: String,

    /// Native type the field carried at discovery time
    pub native_type: ElementType,

    /// Last checkpointed value, as an opaque string
    pub value: String,
}

impl CursorState {
    /// Create a cursor state
    pub fn new(field: &str, native_type: ElementType, value: &str) -> Self {
        Self {
            field: field.to_string(),
            native_type,
            value: value.to_string(),
        }
    }
}

// ============================================================================
// Filter Building
// ============================================================================

/// Build the `$gt` filter that selects documents past the checkpoint.
///
/// Documents where the cursor field is missing or equal to the checkpoint
/// are excluded by construction.
pub fn build_filter(state: &CursorState, collection: &str) -> Result<Document> {
    let decoded = decode_cursor_value(state, collection)?;
    Ok(doc! { &state.field: { "$gt": decoded } })
}

/// Decode the string checkpoint into the cursor field's native type
fn decode_cursor_value(state: &CursorState, collection: &str) -> Result<Bson> {
    let raw = state.value.as_str();
    let mismatch = |message: String| {
        Error::cursor_type_mismatch(
            collection,
            &state.field,
            element_type_name(state.native_type),
            message,
        )
    };

    match state.native_type {
        ElementType::Int32 => raw
            .parse::<i32>()
            .map(Bson::Int32)
            .map_err(|e| mismatch(e.to_string())),
        ElementType::Int64 => raw
            .parse::<i64>()
            .map(Bson::Int64)
            .map_err(|e| mismatch(e.to_string())),
        ElementType::Double => raw
            .parse::<f64>()
            .map(Bson::Double)
            .map_err(|e| mismatch(e.to_string())),
        ElementType::Decimal128 => Decimal128::from_str(raw)
            .map(Bson::Decimal128)
            .map_err(|e| mismatch(e.to_string())),
        ElementType::String => Ok(Bson::String(raw.to_string())),
        ElementType::Symbol => Ok(Bson::Symbol(raw.to_string())),
        ElementType::ObjectId => ObjectId::parse_str(raw)
            .map(Bson::ObjectId)
            .map_err(|e| mismatch(e.to_string())),
        ElementType::DateTime => decode_datetime(raw)
            .ok_or_else(|| mismatch(format!("'{raw}' is neither RFC 3339 nor epoch milliseconds"))),
        ElementType::Boolean => match raw {
            "true" => Ok(Bson::Boolean(true)),
            "false" => Ok(Bson::Boolean(false)),
            other => Err(mismatch(format!("'{other}' is not a boolean"))),
        },
        other => Err(mismatch(format!(
            "values of type {} do not order an incremental scan",
            element_type_name(other)
        ))),
    }
}

/// Accept RFC 3339 timestamps and fall back to epoch milliseconds
fn decode_datetime(raw: &str) -> Option<Bson> {
    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(Bson::DateTime(bson::DateTime::from_chrono(parsed)));
    }
    raw.parse::<i64>()
        .ok()
        .map(|millis| Bson::DateTime(bson::DateTime::from_millis(millis)))
}

/// Render a native value as the opaque checkpoint string the decoder
/// accepts back. Timestamps render as RFC 3339 when representable, falling
/// back to epoch milliseconds.
pub fn encode_cursor_value(value: &Bson) -> String {
    match value {
        Bson::String(v) | Bson::Symbol(v) => v.clone(),
        Bson::Int32(v) => v.to_string(),
        Bson::Int64(v) => v.to_string(),
        Bson::Double(v) => v.to_string(),
        Bson::Decimal128(v) => v.to_string(),
        Bson::ObjectId(v) => v.to_hex(),
        Bson::DateTime(v) => v
            .try_to_rfc3339_string()
            .unwrap_or_else(|_| v.timestamp_millis().to_string()),
        Bson::Boolean(v) => v.to_string(),
        other => other.to_string(),
    }
}

// ============================================================================
// Value Ordering
// ============================================================================

/// Order two values of the same logical type.
///
/// Numeric variants compare with each other across representations; every
/// other variant only compares with itself. Integer and `Decimal128` pairs
/// compare exactly, remaining numeric mixes go through `f64`. Returns
/// `None` for pairs that cannot order an incremental scan.
pub fn bson_order(left: &Bson, right: &Bson) -> Option<Ordering> {
    match (left, right) {
        (Bson::Int32(a), Bson::Int32(b)) => Some(a.cmp(b)),
        (Bson::Int64(a), Bson::Int64(b)) => Some(a.cmp(b)),
        (Bson::Int32(a), Bson::Int64(b)) => Some(i64::from(*a).cmp(b)),
        (Bson::Int64(a), Bson::Int32(b)) => Some(a.cmp(&i64::from(*b))),
        (Bson::Decimal128(a), Bson::Decimal128(b)) => {
            decimal_order(&a.to_string(), &b.to_string())
        }
        (Bson::String(a), Bson::String(b)) => Some(a.cmp(b)),
        (Bson::Symbol(a), Bson::Symbol(b)) => Some(a.cmp(b)),
        (Bson::ObjectId(a), Bson::ObjectId(b)) => Some(a.bytes().cmp(&b.bytes())),
        (Bson::DateTime(a), Bson::DateTime(b)) => {
            Some(a.timestamp_millis().cmp(&b.timestamp_millis()))
        }
        (Bson::Boolean(a), Bson::Boolean(b)) => Some(a.cmp(b)),
        (Bson::Timestamp(a), Bson::Timestamp(b)) => {
            Some((a.time, a.increment).cmp(&(b.time, b.increment)))
        }
        _ => {
            let a = numeric(left)?;
            let b = numeric(right)?;
            a.partial_cmp(&b)
        }
    }
}

fn numeric(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(f64::from(*v)),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        Bson::Decimal128(v) => v.to_string().parse().ok(),
        _ => None,
    }
}

/// Exact ordering for the decimal string forms the driver renders
/// (`123.4`, `-0.5`, `1.2E+10`, `Infinity`, `NaN`).
///
/// `Decimal128` carries 34 significant digits, more than `f64` can keep
/// apart, so values are ordered by aligning exponents and comparing digit
/// strings instead of rounding.
fn decimal_order(left: &str, right: &str) -> Option<Ordering> {
    let a = DecimalKey::parse(left)?;
    let b = DecimalKey::parse(right)?;
    Some(a.order(&b))
}

/// A decimal reduced to sign, significant digits and a power of ten:
/// the value is `0.<digits> * 10^exponent`.
struct DecimalKey {
    negative: bool,
    infinite: bool,
    /// Leading and trailing zeros stripped; empty encodes zero.
    digits: String,
    exponent: i64,
}

impl DecimalKey {
    fn parse(text: &str) -> Option<Self> {
        let (negative, body) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        if body.eq_ignore_ascii_case("nan") {
            return None;
        }
        if body.eq_ignore_ascii_case("infinity") || body.eq_ignore_ascii_case("inf") {
            return Some(Self {
                negative,
                infinite: true,
                digits: String::new(),
                exponent: 0,
            });
        }

        let (mantissa, exponent) = match body.split_once(['E', 'e']) {
            Some((mantissa, exponent)) => (mantissa, exponent.parse::<i64>().ok()?),
            None => (body, 0),
        };
        let (integral, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
        if integral.is_empty() && fraction.is_empty() {
            return None;
        }
        if !integral.bytes().all(|b| b.is_ascii_digit())
            || !fraction.bytes().all(|b| b.is_ascii_digit())
        {
            return None;
        }

        // integral.fraction * 10^exponent == 0.<integral fraction> * 10^(exponent + |integral|)
        let digits = format!("{integral}{fraction}");
        let significant = digits.trim_start_matches('0');
        let point = i64::try_from(integral.len()).ok()?;
        let stripped = i64::try_from(digits.len() - significant.len()).ok()?;
        let exponent = exponent.checked_add(point)?.checked_sub(stripped)?;
        let digits = significant.trim_end_matches('0').to_string();
        Some(Self {
            negative,
            infinite: false,
            digits,
            exponent,
        })
    }

    fn order(&self, other: &Self) -> Ordering {
        // -Infinity < negatives < zero < positives < Infinity
        fn class(key: &DecimalKey) -> i8 {
            match (key.infinite, key.digits.is_empty(), key.negative) {
                (true, _, true) => -2,
                (true, _, false) => 2,
                (false, true, _) => 0,
                (false, false, true) => -1,
                (false, false, false) => 1,
            }
        }

        let by_class = class(self).cmp(&class(other));
        if by_class != Ordering::Equal || self.infinite || self.digits.is_empty() {
            return by_class;
        }
        let magnitude = self
            .exponent
            .cmp(&other.exponent)
            .then_with(|| self.digits.cmp(&other.digits));
        if self.negative {
            magnitude.reverse()
        } else {
            magnitude
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(native_type: ElementType, value: &str) -> CursorState {
        CursorState::new("cursor", native_type, value)
    }

    #[test]
    fn test_filter_int32() {
        let filter = build_filter(&state(ElementType::Int32, "42"), "orders").unwrap();
        assert_eq!(filter, doc! { "cursor": { "$gt": 42_i32 } });
    }

    #[test]
    fn test_filter_int64() {
        let filter = build_filter(&state(ElementType::Int64, "9000000000"), "orders").unwrap();
        assert_eq!(filter, doc! { "cursor": { "$gt": 9_000_000_000_i64 } });
    }

    #[test]
    fn test_filter_double() {
        let filter = build_filter(&state(ElementType::Double, "3.5"), "orders").unwrap();
        assert_eq!(filter, doc! { "cursor": { "$gt": 3.5_f64 } });
    }

    #[test]
    fn test_filter_decimal128() {
        let filter = build_filter(&state(ElementType::Decimal128, "10.99"), "orders").unwrap();
        let expected = Decimal128::from_str("10.99").unwrap();
        assert_eq!(filter, doc! { "cursor": { "$gt": expected } });
    }

    #[test]
    fn test_filter_string_passthrough() {
        let filter = build_filter(&state(ElementType::String, "abc"), "orders").unwrap();
        assert_eq!(filter, doc! { "cursor": { "$gt": "abc" } });
    }

    #[test]
    fn test_filter_object_id() {
        let hex = "507f1f77bcf86cd799439011";
        let filter = build_filter(&state(ElementType::ObjectId, hex), "orders").unwrap();
        let expected = ObjectId::parse_str(hex).unwrap();
        assert_eq!(filter, doc! { "cursor": { "$gt": expected } });
    }

    #[test]
    fn test_filter_datetime_rfc3339() {
        let filter =
            build_filter(&state(ElementType::DateTime, "2024-01-15T10:30:00Z"), "orders").unwrap();
        // 2024-01-15T10:30:00Z as epoch milliseconds
        let expected = bson::DateTime::from_millis(1_705_314_600_000);
        assert_eq!(filter, doc! { "cursor": { "$gt": expected } });
    }

    #[test]
    fn test_filter_datetime_epoch_millis() {
        let filter = build_filter(&state(ElementType::DateTime, "1700000000000"), "orders").unwrap();
        assert_eq!(
            filter,
            doc! { "cursor": { "$gt": bson::DateTime::from_millis(1_700_000_000_000) } }
        );
    }

    #[test]
    fn test_filter_boolean() {
        let filter = build_filter(&state(ElementType::Boolean, "true"), "orders").unwrap();
        assert_eq!(filter, doc! { "cursor": { "$gt": true } });
    }

    #[test]
    fn test_mismatch_non_numeric_checkpoint() {
        let err = build_filter(&state(ElementType::Int32, "abc"), "orders").unwrap_err();
        assert!(matches!(err, Error::CursorTypeMismatch { .. }));
        let message = err.to_string();
        assert!(message.contains("orders"));
        assert!(message.contains("cursor"));
        assert!(message.contains("int"));
    }

    #[test]
    fn test_mismatch_bad_object_id() {
        let err = build_filter(&state(ElementType::ObjectId, "not-hex"), "orders").unwrap_err();
        assert!(matches!(err, Error::CursorTypeMismatch { .. }));
    }

    #[test]
    fn test_mismatch_bad_boolean() {
        let err = build_filter(&state(ElementType::Boolean, "yes"), "orders").unwrap_err();
        assert!(matches!(err, Error::CursorTypeMismatch { .. }));
    }

    #[test]
    fn test_mismatch_unorderable_type() {
        let err = build_filter(&state(ElementType::Binary, "AAAA"), "orders").unwrap_err();
        assert!(matches!(err, Error::CursorTypeMismatch { .. }));
        assert!(err.to_string().contains("binary"));
    }

    #[test]
    fn test_order_numeric_across_representations() {
        assert_eq!(
            bson_order(&Bson::Int32(2), &Bson::Int64(10)),
            Some(Ordering::Less)
        );
        assert_eq!(
            bson_order(&Bson::Double(2.5), &Bson::Int32(2)),
            Some(Ordering::Greater)
        );
    }

    #[test]
    fn test_order_int64_beyond_f64_precision() {
        // 2^53 and 2^53 + 1 collapse to the same f64
        let low = Bson::Int64(9_007_199_254_740_992);
        let high = Bson::Int64(9_007_199_254_740_993);
        assert_eq!(bson_order(&high, &low), Some(Ordering::Greater));
        assert_eq!(bson_order(&low, &high), Some(Ordering::Less));
        assert_eq!(bson_order(&high, &high), Some(Ordering::Equal));
    }

    #[test]
    fn test_order_mixed_integer_widths_stay_exact() {
        assert_eq!(
            bson_order(&Bson::Int32(7), &Bson::Int64(7)),
            Some(Ordering::Equal)
        );
        assert_eq!(
            bson_order(&Bson::Int64(i64::MIN), &Bson::Int32(i32::MIN)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_order_decimal128_beyond_f64_precision() {
        let low = Decimal128::from_str("123456789012345678901234567890.1").unwrap();
        let high = Decimal128::from_str("123456789012345678901234567890.2").unwrap();
        assert_eq!(
            bson_order(&Bson::Decimal128(high), &Bson::Decimal128(low)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            bson_order(&Bson::Decimal128(low), &Bson::Decimal128(high)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_order_decimal128_signs_and_zero() {
        let negative = Decimal128::from_str("-4.5").unwrap();
        let zero = Decimal128::from_str("0").unwrap();
        let negative_zero = Decimal128::from_str("-0").unwrap();
        assert_eq!(
            bson_order(&Bson::Decimal128(negative), &Bson::Decimal128(zero)),
            Some(Ordering::Less)
        );
        assert_eq!(
            bson_order(&Bson::Decimal128(negative_zero), &Bson::Decimal128(zero)),
            Some(Ordering::Equal)
        );
    }

    #[test]
    fn test_decimal_order_notation_forms() {
        assert_eq!(decimal_order("1.2E+3", "1200"), Some(Ordering::Equal));
        assert_eq!(decimal_order("9.9E-2", "0.1"), Some(Ordering::Less));
        assert_eq!(
            decimal_order("-Infinity", "-9.9E+6000"),
            Some(Ordering::Less)
        );
        assert_eq!(decimal_order("NaN", "1"), None);
    }

    #[test]
    fn test_order_strings() {
        assert_eq!(
            bson_order(&Bson::String("a".into()), &Bson::String("b".into())),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_order_object_ids() {
        let small = ObjectId::parse_str("507f1f77bcf86cd799439011").unwrap();
        let large = ObjectId::parse_str("507f1f77bcf86cd799439012").unwrap();
        assert_eq!(
            bson_order(&Bson::ObjectId(small), &Bson::ObjectId(large)),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn test_order_incomparable() {
        assert_eq!(bson_order(&Bson::String("a".into()), &Bson::Int32(1)), None);
        assert_eq!(bson_order(&Bson::Null, &Bson::Null), None);
    }

    #[test]
    fn test_encode_round_trips_through_decode() {
        let hex = "507f1f77bcf86cd799439011";
        let oid = ObjectId::parse_str(hex).unwrap();
        assert_eq!(encode_cursor_value(&Bson::ObjectId(oid)), hex);

        assert_eq!(encode_cursor_value(&Bson::Int64(9_000_000_000)), "9000000000");
        assert_eq!(encode_cursor_value(&Bson::String("abc".into())), "abc");

        // A checkpoint built from an observed value must decode again
        let encoded = encode_cursor_value(&Bson::DateTime(bson::DateTime::from_millis(
            1_705_314_600_000,
        )));
        let filter = build_filter(&state(ElementType::DateTime, &encoded), "orders").unwrap();
        assert_eq!(
            filter,
            doc! { "cursor": { "$gt": bson::DateTime::from_millis(1_705_314_600_000) } }
        );
    }
}
