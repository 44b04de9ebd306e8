//! Methods available on arrays, strings and numbers without a prototype chain.

use crate::Isolate;
use crate::error::{ErrorKind, Exception};
use crate::heap::ObjectKind;
use crate::interp::length_value;
use crate::value::{Value, as_index, as_integer, number_to_string};
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Dispatches `this.name(args)` to a built-in method, or returns `None` if
/// `this` has no such method.
pub(crate) fn call_method(
    isolate: &mut Isolate,
    this: &Value,
    name: &str,
    args: &[Value],
) -> Option<Result<Value, Exception>> {
    match this {
        Value::String(s) => string_method(isolate, s, name, args),
        Value::Number(n) => number_method(isolate, *n, name, args),
        Value::Object(id) => {
            if matches!(isolate.heap.get(*id).kind, ObjectKind::Array(_)) {
                if let Some(result) = array_method(isolate, this, name, args) {
                    return Some(result);
                }
            }
            (name == "toString").then(|| Ok(Value::String(isolate.coerce_string(this))))
        }
        Value::Bool(_) => (name == "toString").then(|| Ok(Value::String(isolate.coerce_string(this)))),
        Value::Undefined | Value::Null => None,
    }
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

/// Resolves a relative index argument against `len`, clamping like `slice`.
#[allow(clippy::cast_possible_wrap, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
fn relative(isolate: &Isolate, value: &Value, len: usize, default: usize) -> usize {
    if matches!(value, Value::Undefined) {
        return default;
    }
    let n = isolate.to_number(value);
    if n.is_nan() {
        return 0;
    }
    let n = if n.is_infinite() {
        if n > 0.0 { len as i64 } else { -(len as i64) }
    } else {
        n as i64
    };
    let len = len as i64;
    let resolved = if n < 0 { (len + n).max(0) } else { n.min(len) };
    resolved as usize
}

fn items(isolate: &Isolate, array: &Value) -> Vec<Value> {
    match array.as_object().map(|id| &isolate.heap.get(id).kind) {
        Some(ObjectKind::Array(items)) => items.clone(),
        _ => Vec::new(),
    }
}

fn with_items<R>(isolate: &mut Isolate, array: &Value, f: impl FnOnce(&mut Vec<Value>) -> R) -> Option<R> {
    let id = array.as_object()?;
    match &mut isolate.heap.get_mut(id).kind {
        ObjectKind::Array(items) => Some(f(items)),
        _ => None,
    }
}

fn array_method(isolate: &mut Isolate, this: &Value, name: &str, args: &[Value]) -> Option<Result<Value, Exception>> {
    let result = match name {
        "push" => {
            let len = with_items(isolate, this, |items| {
                items.extend_from_slice(args);
                items.len()
            })?;
            Ok(length_value(len))
        }
        "pop" => Ok(with_items(isolate, this, Vec::pop)?.unwrap_or_default()),
        "shift" => Ok(with_items(isolate, this, |items| {
            if items.is_empty() {
                Value::Undefined
            } else {
                items.remove(0)
            }
        })?),
        "unshift" => {
            let len = with_items(isolate, this, |items| {
                items.splice(0..0, args.iter().cloned());
                items.len()
            })?;
            Ok(length_value(len))
        }
        "indexOf" => {
            let needle = arg(args, 0);
            let position = items(isolate, this).iter().position(|v| v.strict_equals(&needle));
            Ok(position.map_or(Value::Number(-1.0), length_value))
        }
        "includes" => {
            let needle = arg(args, 0);
            Ok(Value::Bool(items(isolate, this).iter().any(|v| v.strict_equals(&needle))))
        }
        "join" => {
            let separator = match arg(args, 0) {
                Value::Undefined => Rc::from(","),
                other => isolate.coerce_string(&other),
            };
            let mut out = String::new();
            for (i, item) in items(isolate, this).iter().enumerate() {
                if i > 0 {
                    out.push_str(&separator);
                }
                if !item.is_nullish() {
                    out.push_str(&isolate.coerce_string(item));
                }
            }
            Ok(Value::from(out))
        }
        "slice" => {
            let all = items(isolate, this);
            let start = relative(isolate, &arg(args, 0), all.len(), 0);
            let end = relative(isolate, &arg(args, 1), all.len(), all.len());
            let part = all.get(start..end.max(start)).map(<[Value]>::to_vec).unwrap_or_default();
            isolate.new_array(part)
        }
        "forEach" | "map" | "filter" => iterate(isolate, this, name, &arg(args, 0)),
        _ => return None,
    };
    Some(result)
}

fn iterate(isolate: &mut Isolate, this: &Value, name: &str, callback: &Value) -> Result<Value, Exception> {
    if !isolate.is_callable(callback) {
        return Err(isolate.throw_error(
            ErrorKind::TypeError,
            alloc::format!("{} is not a function", isolate.coerce_string(callback)),
        ));
    }
    let mut out = Vec::new();
    for (i, item) in items(isolate, this).into_iter().enumerate() {
        isolate.poll_interrupts()?;
        let result = isolate.call(callback, &[item.clone(), length_value(i), this.clone()])?;
        match name {
            "map" => out.push(result),
            "filter" if result.truthy() => out.push(item),
            _ => {}
        }
    }
    if name == "forEach" {
        Ok(Value::Undefined)
    } else {
        isolate.new_array(out)
    }
}

fn string_method(isolate: &mut Isolate, s: &Rc<str>, name: &str, args: &[Value]) -> Option<Result<Value, Exception>> {
    let index_arg = |isolate: &Isolate| as_index(isolate.to_number(&arg(args, 0)));
    let result = match name {
        "charAt" => {
            let c = match arg(args, 0) {
                Value::Undefined => s.chars().next(),
                _ => index_arg(isolate).and_then(|i| s.chars().nth(i)),
            };
            Ok(Value::from(c.map(String::from).unwrap_or_default()))
        }
        "charCodeAt" => {
            let c = match arg(args, 0) {
                Value::Undefined => s.chars().next(),
                _ => index_arg(isolate).and_then(|i| s.chars().nth(i)),
            };
            Ok(c.map_or(Value::Number(f64::NAN), |c| Value::Number(f64::from(u32::from(c)))))
        }
        "indexOf" => {
            let needle = isolate.coerce_string(&arg(args, 0));
            let position = s.find(&*needle).map(|byte| s[..byte].chars().count());
            Ok(position.map_or(Value::Number(-1.0), length_value))
        }
        "includes" => {
            let needle = isolate.coerce_string(&arg(args, 0));
            Ok(Value::Bool(s.contains(&*needle)))
        }
        "startsWith" => {
            let needle = isolate.coerce_string(&arg(args, 0));
            Ok(Value::Bool(s.starts_with(&*needle)))
        }
        "slice" | "substring" => {
            let chars: Vec<char> = s.chars().collect();
            let start = relative(isolate, &arg(args, 0), chars.len(), 0);
            let end = relative(isolate, &arg(args, 1), chars.len(), chars.len());
            let part: String = chars.get(start..end.max(start)).unwrap_or_default().iter().collect();
            Ok(Value::from(part))
        }
        "split" => {
            let parts: Vec<Value> = match arg(args, 0) {
                Value::Undefined => alloc::vec![Value::String(Rc::clone(s))],
                separator => {
                    let separator = isolate.coerce_string(&separator);
                    if separator.is_empty() {
                        s.chars().map(|c| Value::from(c.to_string())).collect()
                    } else {
                        s.split(&*separator).map(Value::from).collect()
                    }
                }
            };
            isolate.new_array(parts)
        }
        "trim" => Ok(Value::string(s.trim())),
        "toUpperCase" => Ok(Value::from(s.to_uppercase())),
        "toLowerCase" => Ok(Value::from(s.to_lowercase())),
        "toString" => Ok(Value::String(Rc::clone(s))),
        _ => return None,
    };
    Some(result)
}

fn number_method(isolate: &mut Isolate, n: f64, name: &str, args: &[Value]) -> Option<Result<Value, Exception>> {
    if name != "toString" {
        return None;
    }
    let radix = match arg(args, 0) {
        Value::Undefined => 10,
        value => match as_integer(isolate.to_number(&value)) {
            Some(r @ 2..=36) => r,
            _ => {
                return Some(Err(isolate.throw_error(
                    ErrorKind::RangeError,
                    "toString() radix must be between 2 and 36",
                )));
            }
        },
    };
    if radix == 10 {
        return Some(Ok(Value::from(number_to_string(n))));
    }
    let Some(int) = as_integer(n) else {
        return Some(Ok(Value::from(number_to_string(n))));
    };
    Some(Ok(Value::from(format_radix(int, radix.unsigned_abs()))))
}

#[allow(clippy::cast_possible_truncation)]
fn format_radix(value: i64, radix: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut magnitude = value.unsigned_abs();
    let mut out = Vec::new();
    loop {
        out.push(DIGITS[(magnitude % radix) as usize]);
        magnitude /= radix;
        if magnitude == 0 {
            break;
        }
    }
    if value < 0 {
        out.push(b'-');
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}
