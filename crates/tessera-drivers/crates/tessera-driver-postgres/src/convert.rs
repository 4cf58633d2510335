//! Value conversion between Tessera and tokio-postgres

use bytes::{BufMut, BytesMut};
use postgres_types::{FromSql, IsNull, ToSql, Type};
use tessera_core::{Result, TesseraError, Value};
use tokio_postgres::Row as PgRow;

type BoxError = Box<dyn std::error::Error + Sync + Send>;

/// Readable message for a server error, with detail and hint when present.
pub(crate) fn format_postgres_error(error: &tokio_postgres::Error) -> String {
    let Some(db_error) = error.as_db_error() else {
        return error.to_string();
    };

    let code = db_error.code();
    let mut message = db_error.message().to_string();

    if let Some(detail) = db_error.detail().filter(|d| !d.trim().is_empty()) {
        message.push_str(&format!(" (detail: {})", detail));
    }
    if let Some(hint) = db_error.hint().filter(|h| !h.trim().is_empty()) {
        message.push_str(&format!(" (hint: {})", hint));
    }
    if let Some(column) = db_error.column().filter(|c| !c.trim().is_empty()) {
        message.push_str(&format!(" (column: {})", column));
    }

    match code.code() {
        "23505" => format!("duplicate value violates unique constraint: {}", message),
        "23503" => format!("foreign key violation: {}", message),
        "23502" => format!("null value violates not-null constraint: {}", message),
        "22007" => format!("invalid datetime format: {}", message),
        "22P02" => format!("invalid input syntax: {}", message),
        other => format!("{} (code: {})", message, other),
    }
}

pub(crate) fn query_error(context: &str, error: &tokio_postgres::Error) -> TesseraError {
    TesseraError::Query(format!("{}: {}", context, format_postgres_error(error)))
}

/// Owned parameter value that tokio-postgres can bind.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PgValue {
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Numeric(String),
    String(String),
    Bytes(Vec<u8>),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
    DateTimeUtc(chrono::DateTime<chrono::Utc>),
    Date(chrono::NaiveDate),
    Time(chrono::NaiveTime),
    DateTime(chrono::NaiveDateTime),
}

impl PgValue {
    /// Convert a value into the variant matching the prepared parameter
    /// type, so tokio-postgres writes the binary width the server expects.
    /// Grid edits arrive as text, so strings are parsed into the target type.
    pub(crate) fn from_value_for_type(value: &Value, target_type: &Type) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => match *target_type {
                Type::TEXT | Type::VARCHAR => PgValue::String(v.to_string()),
                _ => PgValue::Bool(*v),
            },
            Value::Int8(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int16(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int32(v) => Self::coerce_int(*v as i64, target_type),
            Value::Int64(v) => Self::coerce_int(*v, target_type),
            Value::Float32(v) => Self::coerce_float(*v as f64, target_type),
            Value::Float64(v) => Self::coerce_float(*v, target_type),
            Value::Decimal(v) => Self::coerce_string(v, target_type),
            Value::String(v) => Self::coerce_string(v, target_type),
            _ => Self::from_value(value),
        }
    }

    fn coerce_int(value: i64, target_type: &Type) -> Self {
        match *target_type {
            Type::INT2 => PgValue::Int16(value as i16),
            Type::INT4 => PgValue::Int32(value as i32),
            Type::FLOAT4 => PgValue::Float32(value as f32),
            Type::FLOAT8 => PgValue::Float64(value as f64),
            Type::NUMERIC => PgValue::Numeric(value.to_string()),
            Type::BOOL => PgValue::Bool(value != 0),
            Type::TEXT | Type::VARCHAR | Type::BPCHAR => PgValue::String(value.to_string()),
            _ => PgValue::Int64(value),
        }
    }

    fn coerce_float(value: f64, target_type: &Type) -> Self {
        match *target_type {
            Type::FLOAT4 => PgValue::Float32(value as f32),
            Type::NUMERIC => PgValue::Numeric(value.to_string()),
            Type::TEXT | Type::VARCHAR => PgValue::String(value.to_string()),
            _ => PgValue::Float64(value),
        }
    }

    fn coerce_string(value: &str, target_type: &Type) -> Self {
        let fallback = || PgValue::String(value.to_string());
        let trimmed = value.trim();

        match *target_type {
            Type::INT2 => trimmed.parse().map(PgValue::Int16).unwrap_or_else(|_| fallback()),
            Type::INT4 => trimmed.parse().map(PgValue::Int32).unwrap_or_else(|_| fallback()),
            Type::INT8 => trimmed.parse().map(PgValue::Int64).unwrap_or_else(|_| fallback()),
            Type::FLOAT4 => trimmed.parse().map(PgValue::Float32).unwrap_or_else(|_| fallback()),
            Type::FLOAT8 => trimmed.parse().map(PgValue::Float64).unwrap_or_else(|_| fallback()),
            Type::NUMERIC => PgValue::Numeric(trimmed.to_string()),
            Type::BOOL => match trimmed.to_ascii_lowercase().as_str() {
                "t" | "true" | "1" | "yes" | "y" | "on" => PgValue::Bool(true),
                "f" | "false" | "0" | "no" | "n" | "off" => PgValue::Bool(false),
                _ => fallback(),
            },
            Type::UUID => uuid::Uuid::parse_str(trimmed)
                .map(PgValue::Uuid)
                .unwrap_or_else(|_| fallback()),
            Type::JSON | Type::JSONB => serde_json::from_str::<serde_json::Value>(value)
                .map(PgValue::Json)
                .unwrap_or_else(|_| fallback()),
            Type::DATE => chrono::NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .map(PgValue::Date)
                .unwrap_or_else(|_| fallback()),
            Type::TIME => chrono::NaiveTime::parse_from_str(trimmed, "%H:%M:%S%.f")
                .map(PgValue::Time)
                .unwrap_or_else(|_| fallback()),
            Type::TIMESTAMP => parse_naive_timestamp(trimmed)
                .map(PgValue::DateTime)
                .unwrap_or_else(fallback),
            Type::TIMESTAMPTZ => chrono::DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|ts| ts.with_timezone(&chrono::Utc))
                .or_else(|| parse_naive_timestamp(trimmed).map(|ts| ts.and_utc()))
                .map(PgValue::DateTimeUtc)
                .unwrap_or_else(fallback),
            _ => fallback(),
        }
    }

    /// Used when the target type is unknown.
    pub(crate) fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => PgValue::Null,
            Value::Bool(v) => PgValue::Bool(*v),
            Value::Int8(v) => PgValue::Int16(*v as i16),
            Value::Int16(v) => PgValue::Int16(*v),
            Value::Int32(v) => PgValue::Int32(*v),
            Value::Int64(v) => PgValue::Int64(*v),
            Value::Float32(v) => PgValue::Float32(*v),
            Value::Float64(v) => PgValue::Float64(*v),
            Value::Decimal(v) => PgValue::Numeric(v.clone()),
            Value::String(v) => PgValue::String(v.clone()),
            Value::Bytes(v) => PgValue::Bytes(v.clone()),
            Value::Uuid(v) => PgValue::Uuid(*v),
            Value::Json(v) => PgValue::Json(v.clone()),
            Value::DateTimeUtc(v) => PgValue::DateTimeUtc(*v),
            Value::Date(v) => PgValue::Date(*v),
            Value::Time(v) => PgValue::Time(*v),
            Value::DateTime(v) => PgValue::DateTime(*v),
            Value::Array(_) => PgValue::Json(tessera_core::value_to_json(value)),
        }
    }
}

fn parse_naive_timestamp(value: &str) -> Option<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
        .or_else(|_| chrono::NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f"))
        .ok()
        .or_else(|| {
            chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

/// Bind values against the parameter types of a prepared statement.
pub(crate) fn bind_params(params: &[Value], param_types: &[Type]) -> Vec<PgValue> {
    params
        .iter()
        .enumerate()
        .map(|(i, value)| match param_types.get(i) {
            Some(target_type) => PgValue::from_value_for_type(value, target_type),
            None => PgValue::from_value(value),
        })
        .collect()
}

impl ToSql for PgValue {
    fn to_sql(&self, ty: &Type, out: &mut BytesMut) -> std::result::Result<IsNull, BoxError> {
        match self {
            PgValue::Null => Ok(IsNull::Yes),
            PgValue::Bool(v) => v.to_sql(ty, out),
            PgValue::Int16(v) => v.to_sql(ty, out),
            PgValue::Int32(v) => v.to_sql(ty, out),
            PgValue::Int64(v) => v.to_sql(ty, out),
            PgValue::Float32(v) => v.to_sql(ty, out),
            PgValue::Float64(v) => v.to_sql(ty, out),
            PgValue::Numeric(v) if *ty == Type::NUMERIC => {
                encode_numeric(v, out)?;
                Ok(IsNull::No)
            }
            PgValue::Numeric(v) | PgValue::String(v) => v.to_sql(ty, out),
            PgValue::Bytes(v) => v.to_sql(ty, out),
            PgValue::Uuid(v) => v.to_sql(ty, out),
            PgValue::Json(v) => v.to_sql(ty, out),
            PgValue::DateTimeUtc(v) => v.to_sql(ty, out),
            PgValue::Date(v) => v.to_sql(ty, out),
            PgValue::Time(v) => v.to_sql(ty, out),
            PgValue::DateTime(v) => v.to_sql(ty, out),
        }
    }

    fn accepts(_: &Type) -> bool {
        true
    }

    postgres_types::to_sql_checked!();
}

const NUMERIC_POS: u16 = 0x0000;
const NUMERIC_NEG: u16 = 0x4000;
const NUMERIC_NAN: u16 = 0xC000;

/// Write decimal text in the NUMERIC binary format: base-10000 digit
/// groups with a weight, sign and display scale.
pub(crate) fn encode_numeric(text: &str, out: &mut BytesMut) -> std::result::Result<(), BoxError> {
    let text = text.trim();
    if text.eq_ignore_ascii_case("nan") {
        out.put_i16(0);
        out.put_i16(0);
        out.put_u16(NUMERIC_NAN);
        out.put_i16(0);
        return Ok(());
    }

    let (negative, unsigned) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };
    let (int_part, frac_part) = unsigned.split_once('.').unwrap_or((unsigned, ""));
    if (int_part.is_empty() && frac_part.is_empty())
        || !int_part.bytes().chain(frac_part.bytes()).all(|b| b.is_ascii_digit())
    {
        return Err(format!("invalid numeric value: {}", text).into());
    }

    let dscale = frac_part.len();
    let int_part = int_part.trim_start_matches('0');
    let int_pad = (4 - int_part.len() % 4) % 4;
    let frac_pad = (4 - frac_part.len() % 4) % 4;
    let digits: String = "0".repeat(int_pad) + int_part + frac_part + &"0".repeat(frac_pad);

    let mut groups: Vec<u16> = digits
        .as_bytes()
        .chunks(4)
        .map(|chunk| chunk.iter().fold(0u16, |acc, d| acc * 10 + (d - b'0') as u16))
        .collect();
    let mut weight = ((int_pad + int_part.len()) / 4) as i16 - 1;

    let leading = groups.iter().take_while(|g| **g == 0).count();
    groups.drain(..leading);
    weight -= leading as i16;
    while groups.last() == Some(&0) {
        groups.pop();
    }
    if groups.is_empty() {
        weight = 0;
    }

    let sign = if negative && !groups.is_empty() {
        NUMERIC_NEG
    } else {
        NUMERIC_POS
    };

    out.put_i16(groups.len() as i16);
    out.put_i16(weight);
    out.put_u16(sign);
    out.put_i16(dscale as i16);
    for group in groups {
        out.put_u16(group);
    }
    Ok(())
}

/// NUMERIC decoded to its exact decimal text.
#[derive(Debug)]
pub(crate) struct PgNumericString(pub(crate) String);

impl PgNumericString {
    pub(crate) fn parse(raw: &[u8]) -> std::result::Result<String, BoxError> {
        if raw.len() < 8 {
            return Err("invalid NUMERIC payload: too short".into());
        }

        let ndigits = i16::from_be_bytes([raw[0], raw[1]]) as usize;
        let weight = i16::from_be_bytes([raw[2], raw[3]]);
        let sign = u16::from_be_bytes([raw[4], raw[5]]);
        let dscale = i16::from_be_bytes([raw[6], raw[7]]) as usize;

        if raw.len() < 8 + ndigits * 2 {
            return Err("invalid NUMERIC payload: truncated digits".into());
        }
        if sign == NUMERIC_NAN {
            return Ok("NaN".to_string());
        }

        let digits: Vec<u16> = (0..ndigits)
            .map(|i| u16::from_be_bytes([raw[8 + i * 2], raw[9 + i * 2]]))
            .collect();
        if digits.iter().any(|g| *g > 9999) {
            return Err("invalid NUMERIC payload: group out of range".into());
        }

        // Group i holds 10000^(weight - i)
        let mut integer_text = String::new();
        for position in 0..=weight.max(-1) {
            let group = digits.get(position as usize).copied().unwrap_or(0);
            if integer_text.is_empty() {
                if group != 0 {
                    integer_text.push_str(&group.to_string());
                }
            } else {
                integer_text.push_str(&format!("{group:04}"));
            }
        }
        if integer_text.is_empty() {
            integer_text.push('0');
        }

        let mut fraction_text = String::new();
        if dscale > 0 {
            let mut exponent = -1i32;
            while fraction_text.len() < dscale {
                let index = weight as i32 - exponent;
                let group = if index >= 0 {
                    digits.get(index as usize).copied().unwrap_or(0)
                } else {
                    0
                };
                fraction_text.push_str(&format!("{group:04}"));
                exponent -= 1;
            }
            fraction_text.truncate(dscale);
        }

        let mut output = String::new();
        if sign == NUMERIC_NEG {
            output.push('-');
        }
        output.push_str(&integer_text);
        if !fraction_text.is_empty() {
            output.push('.');
            output.push_str(&fraction_text);
        }
        Ok(output)
    }
}

impl<'a> FromSql<'a> for PgNumericString {
    fn from_sql(_: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        Ok(Self(Self::parse(raw)?))
    }

    fn accepts(ty: &Type) -> bool {
        *ty == Type::NUMERIC
    }
}

/// Raw UTF-8 payload, for enums and other types without a mapping.
#[derive(Debug)]
struct PgFallbackString(String);

impl<'a> FromSql<'a> for PgFallbackString {
    fn from_sql(_: &Type, raw: &'a [u8]) -> std::result::Result<Self, BoxError> {
        Ok(Self(String::from_utf8(raw.to_vec())?))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

fn get<'a, T: FromSql<'a>>(row: &'a PgRow, idx: usize) -> Result<Option<T>> {
    row.try_get::<_, Option<T>>(idx).map_err(|e| {
        TesseraError::Query(format!(
            "Failed to decode column '{}': {}",
            row.columns()[idx].name(),
            e
        ))
    })
}

/// Convert PostgreSQL row value to our Value type
pub(crate) fn postgres_to_value(row: &PgRow, idx: usize) -> Result<Value> {
    let type_name = row.columns()[idx].type_().name();

    let value = match type_name {
        "bool" => get::<bool>(row, idx)?.map(Value::Bool),
        "int2" => get::<i16>(row, idx)?.map(Value::Int16),
        "int4" => get::<i32>(row, idx)?.map(Value::Int32),
        "int8" => get::<i64>(row, idx)?.map(Value::Int64),
        "oid" => get::<u32>(row, idx)?.map(|v| Value::Int64(v as i64)),
        "float4" => get::<f32>(row, idx)?.map(Value::Float32),
        "float8" => get::<f64>(row, idx)?.map(Value::Float64),
        "numeric" => get::<PgNumericString>(row, idx)?.map(|v| Value::Decimal(v.0)),
        "text" | "varchar" | "bpchar" | "name" => get::<String>(row, idx)?.map(Value::String),
        "bytea" => get::<Vec<u8>>(row, idx)?.map(Value::Bytes),
        "uuid" => get::<uuid::Uuid>(row, idx)?.map(Value::Uuid),
        "json" | "jsonb" => get::<serde_json::Value>(row, idx)?.map(Value::Json),
        "date" => get::<chrono::NaiveDate>(row, idx)?.map(Value::Date),
        "time" => get::<chrono::NaiveTime>(row, idx)?.map(Value::Time),
        "timestamp" => get::<chrono::NaiveDateTime>(row, idx)?.map(Value::DateTime),
        "timestamptz" => get::<chrono::DateTime<chrono::Utc>>(row, idx)?.map(Value::DateTimeUtc),
        // Array type names carry a leading underscore
        "_text" | "_varchar" | "_bpchar" | "_name" => get::<Vec<String>>(row, idx)?
            .map(|arr| Value::Array(arr.into_iter().map(Value::String).collect())),
        "_int2" => get::<Vec<i16>>(row, idx)?
            .map(|arr| Value::Array(arr.into_iter().map(Value::Int16).collect())),
        "_int4" => get::<Vec<i32>>(row, idx)?
            .map(|arr| Value::Array(arr.into_iter().map(Value::Int32).collect())),
        "_int8" => get::<Vec<i64>>(row, idx)?
            .map(|arr| Value::Array(arr.into_iter().map(Value::Int64).collect())),
        _ => row
            .try_get::<_, Option<PgFallbackString>>(idx)
            .ok()
            .flatten()
            .map(|v| Value::String(v.0)),
    };

    Ok(value.unwrap_or(Value::Null))
}
