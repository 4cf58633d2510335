//! Unit tests for PostgreSQL value conversion

use super::*;
use bytes::BytesMut;
use convert::{PgNumericString, PgValue, bind_params, encode_numeric};
use postgres_types::Type;
use tessera_core::Value;

fn numeric_round_trip(text: &str) -> String {
    let mut buf = BytesMut::new();
    encode_numeric(text, &mut buf).unwrap();
    PgNumericString::parse(&buf).unwrap()
}

// ============================================================================
// Parameter Coercion Tests
// ============================================================================

mod coercion_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_grid_text_parses_into_target_type() {
        assert_eq!(
            PgValue::from_value_for_type(&Value::String("42".into()), &Type::INT4),
            PgValue::Int32(42)
        );
        assert_eq!(
            PgValue::from_value_for_type(&Value::String(" 7 ".into()), &Type::INT8),
            PgValue::Int64(7)
        );
        assert_eq!(
            PgValue::from_value_for_type(&Value::String("t".into()), &Type::BOOL),
            PgValue::Bool(true)
        );
        assert_eq!(
            PgValue::from_value_for_type(&Value::String("2024-02-29".into()), &Type::DATE),
            PgValue::Date(chrono::NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
        );
    }

    #[test]
    fn test_unparseable_text_stays_text() {
        assert_eq!(
            PgValue::from_value_for_type(&Value::String("abc".into()), &Type::INT4),
            PgValue::String("abc".into())
        );
    }

    #[test]
    fn test_integers_narrow_to_column_width() {
        assert_eq!(
            PgValue::from_value_for_type(&Value::Int64(3), &Type::INT2),
            PgValue::Int16(3)
        );
        assert_eq!(
            PgValue::from_value_for_type(&Value::Int64(3), &Type::NUMERIC),
            PgValue::Numeric("3".into())
        );
    }

    #[test]
    fn test_missing_parameter_types_fall_back() {
        let bound = bind_params(&[Value::Int32(1), Value::Null], &[Type::INT8]);
        assert_eq!(bound, vec![PgValue::Int64(1), PgValue::Null]);
    }
}

// ============================================================================
// NUMERIC Encoding Tests
// ============================================================================

mod numeric_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fractional_values_keep_scale() {
        assert_eq!(numeric_round_trip("123.45"), "123.45");
        assert_eq!(numeric_round_trip("0.001"), "0.001");
        assert_eq!(numeric_round_trip("00012.5000"), "12.5000");
    }

    #[test]
    fn test_sign_and_magnitude() {
        assert_eq!(numeric_round_trip("-1000000"), "-1000000");
        assert_eq!(numeric_round_trip("0"), "0");
        assert_eq!(numeric_round_trip("NaN"), "NaN");
    }

    #[test]
    fn test_wire_layout() {
        let mut buf = BytesMut::new();
        encode_numeric("123.45", &mut buf).unwrap();
        // ndigits=2 weight=0 sign=+ dscale=2 | 123 4500
        assert_eq!(&buf[..], &[0, 2, 0, 0, 0, 0, 0, 2, 0, 123, 0x11, 0x94]);
    }

    #[test]
    fn test_rejects_non_numeric_text() {
        let mut buf = BytesMut::new();
        assert!(encode_numeric("12a", &mut buf).is_err());
        assert!(encode_numeric("", &mut buf).is_err());
    }
}
