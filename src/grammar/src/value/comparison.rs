use std::cmp::Ordering;
use std::mem::discriminant;

use super::Value;
use crate::ast::BinaryOp;
use crate::context::Context;
use crate::error::{Error, Result};

fn orderable(left: &Value, right: &Value) -> bool {
    matches!(
        (left, right),
        (Value::Integer(_) | Value::Double(_), Value::Integer(_) | Value::Double(_))
            | (Value::Duration(_), Value::Duration(_))
            | (Value::String(_), Value::String(_))
    )
}

/// Ordering of two values of an ordered type. `None` when the types are
/// not ordered against each other, or when a double is NaN.
pub fn ordering(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
        (Value::Integer(a), Value::Double(b)) => (*a as f64).partial_cmp(b),
        (Value::Double(a), Value::Integer(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Double(a), Value::Double(b)) => a.partial_cmp(b),
        (Value::Duration(a), Value::Duration(b)) => Some(a.cmp(b)),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn equal(left: &Value, right: &Value) -> Option<bool> {
    if left.is_number() && right.is_number() {
        return Some(ordering(left, right) == Some(Ordering::Equal));
    }
    if discriminant(left) != discriminant(right) {
        return None;
    }
    Some(left == right)
}

/// Evaluate a comparison operator, reporting errors at `context`
pub fn compare(op: BinaryOp, left: &Value, right: &Value, context: Context) -> Result<Value> {
    let mismatch = || {
        Error::type_error(
            context,
            format!(
                "cannot compare {} and {} with `{op}`",
                left.type_name(),
                right.type_name()
            ),
        )
    };

    let result = match op {
        BinaryOp::Eq => equal(left, right).ok_or_else(mismatch)?,
        BinaryOp::NotEq => !equal(left, right).ok_or_else(mismatch)?,
        BinaryOp::Less | BinaryOp::LessEq | BinaryOp::Greater | BinaryOp::GreaterEq => {
            if !orderable(left, right) {
                return Err(mismatch());
            }
            match ordering(left, right) {
                Some(ordering) => match op {
                    BinaryOp::Less => ordering.is_lt(),
                    BinaryOp::LessEq => ordering.is_le(),
                    BinaryOp::Greater => ordering.is_gt(),
                    _ => ordering.is_ge(),
                },
                None => false,
            }
        }
        _ => {
            return Err(Error::type_error(
                context,
                format!("`{op}` is not a comparison"),
            ));
        }
    };

    Ok(Value::Boolean(result))
}
