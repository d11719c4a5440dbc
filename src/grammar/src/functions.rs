//! Built-in functions callable from queries.
//!
//! The registry is closed: a call is resolved by name, then checked for
//! arity, before any argument is evaluated.

use std::cmp::Ordering;

use metadata::Filter;

use crate::context::Context;
use crate::error::{Error, Result};
use crate::parser::is_identifier;
use crate::value::{Value, ordering};

/// An evaluated call argument
#[derive(Debug, Clone)]
pub struct Argument {
    pub value: Value,
    pub context: Context,
}

pub type Implementation = fn(&[Argument], Context) -> Result<Value>;

pub struct Function {
    pub name: &'static str,
    pub arity: usize,
    pub call: Implementation,
}

static FUNCTIONS: &[Function] = &[
    Function { name: "abs", arity: 1, call: abs },
    Function { name: "min", arity: 2, call: min },
    Function { name: "max", arity: 2, call: max },
    Function { name: "len", arity: 1, call: len },
    Function { name: "str", arity: 1, call: to_str },
    Function { name: "int", arity: 1, call: to_int },
    Function { name: "double", arity: 1, call: to_double },
    Function { name: "seconds", arity: 1, call: seconds },
    Function { name: "millis", arity: 1, call: millis },
    Function { name: "key", arity: 1, call: key },
    Function { name: "has", arity: 1, call: has },
];

pub fn lookup(name: &str) -> Option<&'static Function> {
    FUNCTIONS.iter().find(|f| f.name == name)
}

fn expected(name: &str, what: &str, argument: &Argument) -> Error {
    Error::type_error(
        argument.context,
        format!(
            "`{name}` expects {what}, found {}",
            argument.value.type_name()
        ),
    )
}

fn abs(args: &[Argument], context: Context) -> Result<Value> {
    match &args[0].value {
        Value::Integer(v) => v
            .checked_abs()
            .map(Value::Integer)
            .ok_or_else(|| Error::arithmetic(context, "integer overflow in `abs`")),
        Value::Double(v) => Ok(Value::Double(v.abs())),
        Value::Duration(d) if d.value < 0 => d
            .checked_neg()
            .map(Value::Duration)
            .ok_or_else(|| Error::arithmetic(context, "duration overflow")),
        Value::Duration(d) => Ok(Value::Duration(*d)),
        _ => Err(expected("abs", "a number or duration", &args[0])),
    }
}

fn pick(
    name: &str,
    args: &[Argument],
    context: Context,
    keep_left: fn(Ordering) -> bool,
) -> Result<Value> {
    let (left, right) = (&args[0].value, &args[1].value);
    let ordering = ordering(left, right).ok_or_else(|| {
        Error::type_error(
            context,
            format!(
                "`{name}` cannot order {} and {}",
                left.type_name(),
                right.type_name()
            ),
        )
    })?;
    Ok(if keep_left(ordering) { left.clone() } else { right.clone() })
}

fn min(args: &[Argument], context: Context) -> Result<Value> {
    pick("min", args, context, |o| o.is_le())
}

fn max(args: &[Argument], context: Context) -> Result<Value> {
    pick("max", args, context, |o| o.is_ge())
}

fn len(args: &[Argument], _context: Context) -> Result<Value> {
    let len = match &args[0].value {
        Value::String(s) => s.chars().count(),
        Value::List(items) => items.len(),
        _ => return Err(expected("len", "a string or list", &args[0])),
    };
    Ok(Value::Integer(len as i64))
}

fn to_str(args: &[Argument], _context: Context) -> Result<Value> {
    Ok(match &args[0].value {
        Value::String(s) => Value::String(s.clone()),
        other => Value::String(other.to_string()),
    })
}

fn to_int(args: &[Argument], context: Context) -> Result<Value> {
    match &args[0].value {
        Value::Integer(v) => Ok(Value::Integer(*v)),
        Value::Double(v) => {
            let truncated = v.trunc();
            if !truncated.is_finite() || truncated >= i64::MAX as f64 || truncated < i64::MIN as f64 {
                return Err(Error::arithmetic(context, format!("{v:?} does not fit in an integer")));
            }
            Ok(Value::Integer(truncated as i64))
        }
        Value::String(s) => s.trim().parse::<i64>().map(Value::Integer).map_err(|_| {
            Error::type_error(args[0].context, format!("cannot convert {s:?} to an integer"))
        }),
        _ => Err(expected("int", "a number or string", &args[0])),
    }
}

fn to_double(args: &[Argument], _context: Context) -> Result<Value> {
    match &args[0].value {
        Value::Integer(v) => Ok(Value::Double(*v as f64)),
        Value::Double(v) => Ok(Value::Double(*v)),
        Value::String(s) => s.trim().parse::<f64>().map(Value::Double).map_err(|_| {
            Error::type_error(args[0].context, format!("cannot convert {s:?} to a double"))
        }),
        _ => Err(expected("double", "a number or string", &args[0])),
    }
}

fn total_millis(name: &str, args: &[Argument], context: Context) -> Result<i64> {
    match &args[0].value {
        Value::Duration(d) => d
            .to_millis()
            .ok_or_else(|| Error::arithmetic(context, "duration overflow")),
        _ => Err(expected(name, "a duration", &args[0])),
    }
}

fn seconds(args: &[Argument], context: Context) -> Result<Value> {
    total_millis("seconds", args, context).map(|ms| Value::Integer(ms / 1_000))
}

fn millis(args: &[Argument], context: Context) -> Result<Value> {
    total_millis("millis", args, context).map(Value::Integer)
}

fn key(args: &[Argument], _context: Context) -> Result<Value> {
    match &args[0].value {
        Value::String(s) => Ok(Value::SeriesSelector(Filter::match_key(s.as_str()))),
        _ => Err(expected("key", "a string", &args[0])),
    }
}

fn has(args: &[Argument], _context: Context) -> Result<Value> {
    match &args[0].value {
        Value::String(s) if is_identifier(s) => {
            Ok(Value::SeriesSelector(Filter::has_tag(s.as_str())))
        }
        Value::String(s) => Err(Error::type_error(
            args[0].context,
            format!("`has` expects a tag name, found {}", metadata::filter::quote_string(s)),
        )),
        _ => Err(expected("has", "a string", &args[0])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::duration::{Duration, TimeUnit};
    use crate::error::ErrorKind;

    fn call(name: &str, values: Vec<Value>) -> Result<Value> {
        let function = lookup(name).unwrap();
        assert_eq!(function.arity, values.len());
        let args: Vec<Argument> = values
            .into_iter()
            .enumerate()
            .map(|(i, value)| Argument {
                value,
                context: Context::new(i * 10, i * 10 + 1),
            })
            .collect();
        (function.call)(&args, Context::new(0, 50))
    }

    #[test]
    fn test_registry() {
        assert!(lookup("abs").is_some());
        assert!(lookup("nope").is_none());
        assert_eq!(FUNCTIONS.len(), 11);
    }

    #[test]
    fn test_numeric() {
        assert_eq!(call("abs", vec![Value::from(-3)]).unwrap(), Value::Integer(3));
        assert_eq!(
            call("abs", vec![Value::from(Duration::seconds(-3))]).unwrap(),
            Value::Duration(Duration::seconds(3))
        );
        assert_eq!(call("abs", vec![Value::from(i64::MIN)]).unwrap_err().kind(), ErrorKind::Arithmetic);
        assert_eq!(call("min", vec![Value::from(2), Value::from(1.5)]).unwrap(), Value::Double(1.5));
        assert_eq!(call("max", vec![Value::from("a"), Value::from("b")]).unwrap(), Value::from("b"));
        assert_eq!(
            call("min", vec![Value::from(1), Value::from("b")]).unwrap_err().kind(),
            ErrorKind::Type
        );
    }

    #[test]
    fn test_conversions() {
        assert_eq!(call("int", vec![Value::from(2.9)]).unwrap(), Value::Integer(2));
        assert_eq!(call("int", vec![Value::from(" 42 ")]).unwrap(), Value::Integer(42));
        assert_eq!(call("int", vec![Value::from(f64::NAN)]).unwrap_err().kind(), ErrorKind::Arithmetic);
        assert_eq!(call("double", vec![Value::from(2)]).unwrap(), Value::Double(2.0));
        assert_eq!(call("str", vec![Value::from(1.5)]).unwrap(), Value::from("1.5"));
        assert_eq!(call("str", vec![Value::from("x")]).unwrap(), Value::from("x"));
        assert_eq!(call("len", vec![Value::from("héllo")]).unwrap(), Value::Integer(5));
    }

    #[test]
    fn test_durations() {
        let d = Value::from(Duration::new(2, TimeUnit::Minutes));
        assert_eq!(call("seconds", vec![d.clone()]).unwrap(), Value::Integer(120));
        assert_eq!(call("millis", vec![d]).unwrap(), Value::Integer(120_000));
    }

    #[test]
    fn test_selectors() {
        assert_eq!(
            call("key", vec![Value::from("cpu")]).unwrap(),
            Value::SeriesSelector(Filter::match_key("cpu"))
        );
        assert_eq!(
            call("has", vec![Value::from("dc")]).unwrap(),
            Value::SeriesSelector(Filter::has_tag("dc"))
        );
    }

    #[test]
    fn test_has_rejects_names_that_do_not_reparse() {
        for name in ["and", "a-b", "", "1x", "a b"] {
            let err = call("has", vec![Value::from(name)]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Type, "{name}");
            assert_eq!(err.context(), Context::new(0, 1));
        }
        assert_eq!(
            call("has", vec![Value::from("a-b")]).unwrap_err().to_string(),
            "type error: `has` expects a tag name, found \"a-b\""
        );
        assert!(call("has", vec![Value::from("cpu.load_1")]).is_ok());
    }

    #[test]
    fn test_argument_type_error_points_at_argument() {
        let err = call("len", vec![Value::from(1)]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
        assert_eq!(err.context(), Context::new(0, 1));
        assert_eq!(err.to_string(), "type error: `len` expects a string or list, found integer");
    }
}
