use metadata::Filter;

use super::Value;
use crate::ast::{BinaryOp, UnaryOp};
use crate::context::Context;
use crate::duration::Duration;
use crate::error::{Error, Result};

/// Apply a binary operator to two evaluated operands.
///
/// `context` is the operator's context; every error is reported there.
pub fn binary(op: BinaryOp, left: Value, right: Value, context: Context) -> Result<Value> {
    match op {
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            arithmetic(op, left, right, context)
        }
        BinaryOp::And | BinaryOp::Or => logical(op, left, right, context),
        _ => super::compare(op, &left, &right, context),
    }
}

fn mismatch(op: BinaryOp, left: &Value, right: &Value, context: Context) -> Error {
    Error::type_error(
        context,
        format!(
            "cannot apply `{op}` to {} and {}",
            left.type_name(),
            right.type_name()
        ),
    )
}

fn division_by_zero(context: Context) -> Error {
    Error::arithmetic(context, "division by zero")
}

fn duration_overflow(context: Context) -> Error {
    Error::arithmetic(context, "duration overflow")
}

fn arithmetic(op: BinaryOp, left: Value, right: Value, context: Context) -> Result<Value> {
    match (&left, &right) {
        (Value::Integer(a), Value::Integer(b)) => integer(op, *a, *b, context),
        (Value::Integer(_) | Value::Double(_), Value::Integer(_) | Value::Double(_)) => {
            double(op, as_f64(&left), as_f64(&right), context)
        }
        (Value::Duration(a), Value::Duration(b)) => {
            let result = match op {
                BinaryOp::Add => a.checked_add(b),
                BinaryOp::Sub => a.checked_sub(b),
                _ => return Err(mismatch(op, &left, &right, context)),
            };
            result
                .map(Value::Duration)
                .ok_or_else(|| duration_overflow(context))
        }
        (Value::Duration(d), n) if n.is_number() => match op {
            BinaryOp::Mul => scale(d, n, context),
            BinaryOp::Div => divide(d, n, context),
            _ => Err(mismatch(op, &left, &right, context)),
        },
        (n, Value::Duration(d)) if n.is_number() => match op {
            BinaryOp::Mul => scale(d, n, context),
            BinaryOp::Div => divide_into(n, d, context),
            _ => Err(mismatch(op, &left, &right, context)),
        },
        (Value::String(a), Value::String(b)) if op == BinaryOp::Add => {
            Ok(Value::String(format!("{a}{b}")))
        }
        _ => Err(mismatch(op, &left, &right, context)),
    }
}

fn as_f64(value: &Value) -> f64 {
    match value {
        Value::Integer(v) => *v as f64,
        Value::Double(v) => *v,
        _ => f64::NAN,
    }
}

fn integer(op: BinaryOp, a: i64, b: i64, context: Context) -> Result<Value> {
    let value = match op {
        BinaryOp::Add => a.wrapping_add(b),
        BinaryOp::Sub => a.wrapping_sub(b),
        BinaryOp::Mul => a.wrapping_mul(b),
        _ if b == 0 => return Err(division_by_zero(context)),
        _ => a.wrapping_div(b),
    };
    Ok(Value::Integer(value))
}

fn double(op: BinaryOp, a: f64, b: f64, context: Context) -> Result<Value> {
    let value = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        _ if b == 0.0 => return Err(division_by_zero(context)),
        _ => a / b,
    };
    Ok(Value::Double(value))
}

fn scale(duration: &Duration, factor: &Value, context: Context) -> Result<Value> {
    let result = match factor {
        Value::Integer(n) => duration.checked_mul(*n),
        _ => duration.scale(as_f64(factor)),
    };
    result
        .map(Value::Duration)
        .ok_or_else(|| duration_overflow(context))
}

fn divide(duration: &Duration, divisor: &Value, context: Context) -> Result<Value> {
    let result = match divisor {
        Value::Integer(0) => return Err(division_by_zero(context)),
        Value::Integer(n) => duration.checked_div(*n),
        _ => {
            let n = as_f64(divisor);
            if n == 0.0 {
                return Err(division_by_zero(context));
            }
            duration.scale(1.0 / n)
        }
    };
    result
        .map(Value::Duration)
        .ok_or_else(|| duration_overflow(context))
}

// A number over a duration scales the duration's unit by the quotient
fn divide_into(numerator: &Value, duration: &Duration, context: Context) -> Result<Value> {
    if duration.value == 0 {
        return Err(division_by_zero(context));
    }
    let result = match numerator {
        Value::Integer(n) => duration.checked_div_into(*n),
        _ => Duration::new(1, duration.unit).scale(as_f64(numerator) / duration.value as f64),
    };
    result
        .map(Value::Duration)
        .ok_or_else(|| duration_overflow(context))
}

/// `and` / `or` over two booleans or two selectors. Both operands are
/// always evaluated by the caller.
pub fn logical(op: BinaryOp, left: Value, right: Value, context: Context) -> Result<Value> {
    match (left, right) {
        (Value::Boolean(a), Value::Boolean(b)) => Ok(Value::Boolean(match op {
            BinaryOp::Or => a || b,
            _ => a && b,
        })),
        (Value::SeriesSelector(a), Value::SeriesSelector(b)) => {
            Ok(Value::SeriesSelector(match op {
                BinaryOp::Or => Filter::or(vec![a, b]),
                _ => Filter::and(vec![a, b]),
            }))
        }
        (left, right) => Err(mismatch(op, &left, &right, context)),
    }
}

pub fn unary(op: UnaryOp, operand: Value, context: Context) -> Result<Value> {
    match (op, operand) {
        (UnaryOp::Negate, Value::Integer(v)) => Ok(Value::Integer(v.wrapping_neg())),
        (UnaryOp::Negate, Value::Double(v)) => Ok(Value::Double(-v)),
        (UnaryOp::Negate, Value::Duration(d)) => d
            .checked_neg()
            .map(Value::Duration)
            .ok_or_else(|| duration_overflow(context)),
        (UnaryOp::Not, Value::Boolean(b)) => Ok(Value::Boolean(!b)),
        (UnaryOp::Not, Value::SeriesSelector(filter)) => {
            Ok(Value::SeriesSelector(Filter::not(filter)))
        }
        (op, operand) => Err(Error::type_error(
            context,
            format!("cannot apply `{op}` to {}", operand.type_name()),
        )),
    }
}
