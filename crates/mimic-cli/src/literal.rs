//! Argument literals for `--arg` and `--returning`
//!
//! `null`, `true`, `false`, integers (`42` is i32, `42i64`, `7u32`, `7u64`),
//! floats (`1.5` is f64, `1.5f32`), and strings, quoted or bare.

use mimic_engine::loader::Literal;
use mimic_engine::{TypeRef, Value};

pub fn parse(text: &str) -> Value {
    let trimmed = text.trim();
    match trimmed {
        "null" => return Value::Null,
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => {}
    }

    if let Some(inner) = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
    {
        return Value::str(inner);
    }

    number(trimmed).unwrap_or_else(|| Value::str(trimmed))
}

fn number(text: &str) -> Option<Value> {
    if let Some(digits) = text.strip_suffix("i64") {
        return digits.parse().ok().map(Value::I64);
    }
    if let Some(digits) = text.strip_suffix("u32") {
        return digits.parse().ok().map(Value::U32);
    }
    if let Some(digits) = text.strip_suffix("u64") {
        return digits.parse().ok().map(Value::U64);
    }
    if let Some(digits) = text.strip_suffix("f32") {
        return digits.parse().ok().map(Value::F32);
    }
    if let Some(digits) = text.strip_suffix("i32") {
        return digits.parse().ok().map(Value::I32);
    }

    if let Ok(i) = text.parse::<i32>() {
        return Some(Value::I32(i));
    }
    if let Ok(i) = text.parse::<i64>() {
        return Some(Value::I64(i));
    }
    if text.contains('.') || text.contains('e') {
        return text.parse().ok().map(Value::F64);
    }
    None
}

/// Convert a parsed literal to `ty` when it holds the value exactly.
///
/// Values already of type `ty`, and those with no exact conversion, come
/// back unchanged.
pub fn convert_to(value: Value, ty: &TypeRef) -> Value {
    if value.is_assignable_to(ty) {
        return value;
    }
    let literal = match &value {
        Value::Bool(b) => Literal::Bool(*b),
        Value::I32(i) => Literal::Int(i64::from(*i)),
        Value::I64(i) => Literal::Int(*i),
        Value::U32(u) => Literal::Int(i64::from(*u)),
        Value::U64(u) => match i64::try_from(*u) {
            Ok(i) => Literal::Int(i),
            Err(_) => return value,
        },
        Value::F32(f) => Literal::Float(f64::from(*f)),
        Value::F64(f) => Literal::Float(*f),
        _ => return value,
    };
    literal.to_value(ty).unwrap_or(value)
}

/// Split `NAME=LITERAL`
pub fn parse_override(text: &str) -> anyhow::Result<(String, Value)> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("expected NAME=LITERAL, got '{}'", text))?;
    let name = name.trim();
    if name.is_empty() {
        anyhow::bail!("missing method name in '{}'", text);
    }
    Ok((name.to_string(), parse(value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        assert_eq!(parse("null"), Value::Null);
        assert_eq!(parse("true"), Value::Bool(true));
        assert_eq!(parse("false"), Value::Bool(false));
    }

    #[test]
    fn test_numbers() {
        assert_eq!(parse("42"), Value::I32(42));
        assert_eq!(parse("-7"), Value::I32(-7));
        assert_eq!(parse("42i64"), Value::I64(42));
        assert_eq!(parse("5000000000"), Value::I64(5_000_000_000));
        assert_eq!(parse("7u32"), Value::U32(7));
        assert_eq!(parse("7u64"), Value::U64(7));
        assert_eq!(parse("1.5"), Value::F64(1.5));
        assert_eq!(parse("1.5f32"), Value::F32(1.5));
    }

    #[test]
    fn test_strings() {
        assert_eq!(parse("\"42\""), Value::str("42"));
        assert_eq!(parse("hello"), Value::str("hello"));
        assert_eq!(parse("\"\""), Value::str(""));
        assert_eq!(parse("node"), Value::str("node"));
        assert_eq!(parse("  busy "), Value::str("busy"));
        assert_eq!(parse(" \" padded \" "), Value::str(" padded "));
    }

    #[test]
    fn test_convert_to_declared_type() {
        assert_eq!(convert_to(parse("3"), &TypeRef::U64), Value::U64(3));
        assert_eq!(convert_to(parse("3"), &TypeRef::U32), Value::U32(3));
        assert_eq!(convert_to(parse("3"), &TypeRef::F32), Value::F32(3.0));
        assert_eq!(convert_to(parse("3"), &TypeRef::I64), Value::I64(3));
        assert_eq!(convert_to(parse("1.5"), &TypeRef::F32), Value::F32(1.5));
        assert_eq!(convert_to(parse("5000000000"), &TypeRef::I32), Value::I64(5_000_000_000));
        assert_eq!(convert_to(parse("-1"), &TypeRef::U64), Value::I32(-1));
        assert_eq!(convert_to(parse("16777217"), &TypeRef::F32), Value::I32(16_777_217));
        assert_eq!(convert_to(parse("null"), &TypeRef::Str), Value::Null);
    }

    #[test]
    fn test_override() {
        assert_eq!(
            parse_override("count=3").unwrap(),
            ("count".to_string(), Value::I32(3))
        );
        assert!(parse_override("count").is_err());
        assert!(parse_override("=3").is_err());
    }
}
