//! Constant values of expressions, as JSON.
//!
//! Statements that hand arguments to the execution engine (bulk loads,
//! output destinations, chart specs) need values rather than SQL text.

use serde_json::{Number, Value};

use crate::pr::{EscapeItem, Expr, ExprKind, Literal, UnOp, UnaryExpr};
use crate::{Error, Result, WithErrorInfo};

/// The value of `expr`, or `None` when it is only known at execution time.
pub(crate) fn eval_value(expr: &Expr) -> Result<Option<Value>> {
    eval_kind(&expr.kind).with_span_fallback(expr.span)
}

fn eval_kind(kind: &ExprKind) -> Result<Option<Value>> {
    Ok(match kind {
        ExprKind::Literal(literal) => literal_value(literal)?,
        ExprKind::Unary(UnaryExpr {
            op: UnOp::Neg,
            expr,
        }) => match eval_value(expr)? {
            Some(Value::Number(n)) => Some(negate(&n)?),
            _ => None,
        },
        ExprKind::Tuple(items) if items.len() == 1 => eval_value(&items[0])?,
        ExprKind::Escaped(items) => escaped_text(items).map(Value::String),
        _ => None,
    })
}

pub(crate) fn literal_value(literal: &Literal) -> Result<Option<Value>> {
    Ok(match literal {
        Literal::Null => Some(Value::Null),
        Literal::Boolean(b) => Some(Value::Bool(*b)),
        Literal::Number(text) => Some(Value::Number(parse_number(text)?)),
        Literal::String(text) => Some(Value::String(unquote_string(text))),
        Literal::Json(text) => Some(Value::String(parse_json_string(text)?)),
        Literal::Blob(_) => None,
    })
}

fn parse_number(text: &str) -> Result<Number> {
    let invalid = || Error::new_semantic(format!("invalid number `{text}`"));

    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return i64::from_str_radix(hex, 16)
            .map(Number::from)
            .map_err(|_| invalid());
    }
    if let Ok(int) = text.parse::<i64>() {
        return Ok(Number::from(int));
    }
    text.parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .ok_or_else(invalid)
}

fn negate(n: &Number) -> Result<Value> {
    let negated = if let Some(int) = n.as_i64() {
        int.checked_neg().map(Number::from)
    } else {
        n.as_f64().and_then(|f| Number::from_f64(-f))
    };
    negated
        .map(Value::Number)
        .ok_or_else(|| Error::new_semantic(format!("cannot negate `{n}`")))
}

/// The text of a single-quoted SQL string.
pub(crate) fn unquote_string(text: &str) -> String {
    let inner = text
        .strip_prefix('\'')
        .and_then(|t| t.strip_suffix('\''))
        .unwrap_or(text);
    inner.replace("''", "'")
}

fn parse_json_string(text: &str) -> Result<String> {
    serde_json::from_str(text)
        .map_err(|e| Error::new_semantic(format!("invalid JSON string {text}: {e}")))
}

/// The text of an escaped string that needs no conversions.
fn escaped_text(items: &[EscapeItem]) -> Option<String> {
    let mut text = String::new();
    for item in items {
        match item {
            EscapeItem::Text(t) => text += t,
            EscapeItem::Apostrophe => text.push('\''),
            EscapeItem::Percent => text.push('%'),
            EscapeItem::Backslash => text.push('\\'),
            EscapeItem::Control(code) => text.push(char::from_u32(*code)?),
            EscapeItem::Unicode(hex) => text.push(char::from_u32(u32::from_str_radix(hex, 16).ok()?)?),
            EscapeItem::Format { .. } | EscapeItem::Interpolate(_) | EscapeItem::Unknown(_) => {
                return None
            }
        }
    }
    Some(text)
}

#[cfg(test)]
mod test {
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::test::parse_expr;

    fn value(source: &str) -> Option<Value> {
        eval_value(&parse_expr(source)).unwrap()
    }

    #[rstest]
    #[case::integer("42", json!(42))]
    #[case::negative("-7", json!(-7))]
    #[case::hex("0x1F", json!(31))]
    #[case::float("1.5e3", json!(1500.0))]
    #[case::string("'it''s'", json!("it's"))]
    #[case::json(r#""a\tb""#, json!("a\tb"))]
    #[case::escaped(r"e'\u{29e3d}!'", json!("𩸽!"))]
    #[case::null("null", json!(null))]
    #[case::parenthesized("(true)", json!(true))]
    fn test_constants(#[case] source: &str, #[case] expected: Value) {
        assert_eq!(value(source), Some(expected));
    }

    #[test]
    fn test_non_constants() {
        assert_eq!(value("a + 1"), None);
        assert_eq!(value("x'00'"), None);
        assert_eq!(value(r"e'\(a)'"), None);
    }

    #[test]
    fn test_invalid_number() {
        let err = eval_value(&parse_expr("0xffffffffffffffffff")).unwrap_err();
        assert_eq!(err.reason.to_string(), "invalid number `0xffffffffffffffffff`");
        assert!(err.span.is_some());
    }
}
