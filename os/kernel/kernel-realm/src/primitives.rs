//! The host functions bound into a realm's global namespace.
//!
//! | name | does |
//! |------|------|
//! | `eval(code, name)` | runs `code` in the calling context |
//! | `load(path)` | boot image resource as text, or `undefined` |
//! | `exec(delegate, name, code)` | runs `code` in a context layered over `delegate` |
//! | `iso(code, bindings)` | runs `code` in a fresh nested realm; a failure is reported and gives `undefined` |
//! | `poll()` | most recent interrupt vector, or `undefined` |
//! | `ticks()` | timer interrupts since boot |
//! | `inb(port)`, `outb(port, value)` | raw port I/O |
//! | `buff(base, size, width)` | view over physical memory |
//! | `kill(realm)` | terminates a realm |
//! | `schedule(realm, code)` | queues `code` into a realm |
//! | `realm()` | handle of the calling realm |
//! | `print(...)` | writes a line to the diagnostic sink |
//!
//! `inb`, `outb` and `buff` do exactly what they are told. Bounds checks on a
//! `buff` view apply to its indices, never to the physical range.

use crate::capabilities::Capabilities;
use crate::error::RealmError;
use crate::manager::Runtime;
use crate::transfer::{Transferable, realm_handle};
use crate::RealmHandle;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use kernel_script::{Context, ElementWidth, ErrorKind, Exception, Isolate, MemoryView, Value};

/// What every primitive of one realm closes over.
pub(crate) struct Binding {
    pub(crate) runtime: Rc<Runtime>,
    pub(crate) handle: RealmHandle,
    pub(crate) capabilities: Capabilities,
}

type Primitive = fn(&Binding, &mut Isolate, &[Value]) -> Result<Value, Exception>;

/// Defines every primitive `binding.capabilities` allows as a global of
/// `context`.
pub(crate) fn install(isolate: &mut Isolate, context: &Context, binding: &Rc<Binding>) -> Result<(), Exception> {
    let caps = binding.capabilities;
    let table: [(&str, bool, Primitive); 13] = [
        ("eval", caps.eval(), eval),
        ("load", caps.load(), load),
        ("exec", caps.exec(), exec),
        ("iso", caps.iso(), iso),
        ("poll", caps.poll(), poll),
        ("ticks", caps.ticks(), ticks),
        ("inb", caps.inb(), inb),
        ("outb", caps.outb(), outb),
        ("buff", caps.buff(), buff),
        ("kill", caps.kill(), kill),
        ("schedule", caps.schedule(), schedule),
        ("realm", caps.realm(), realm),
        ("print", caps.print(), print),
    ];

    for (name, enabled, primitive) in table {
        if !enabled {
            continue;
        }
        let binding = Rc::clone(binding);
        let native = isolate.new_native(name, move |isolate, args| primitive(&binding, isolate, args))?;
        isolate.set_global(context, name, native);
    }
    Ok(())
}

fn arg(args: &[Value], i: usize) -> Value {
    args.get(i).cloned().unwrap_or_default()
}

fn string_arg(isolate: &Isolate, args: &[Value], i: usize, default: &str) -> Rc<str> {
    match arg(args, i) {
        Value::Undefined => Rc::from(default),
        value => isolate.coerce_string(&value),
    }
}

/// Non-negative integral number below 2^64.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn unsigned_arg(isolate: &Isolate, args: &[Value], i: usize) -> Option<u64> {
    let n = isolate.to_number(&arg(args, i));
    if !(0.0..18_446_744_073_709_551_616.0).contains(&n) {
        return None;
    }
    let int = n as u64;
    (int as f64 == n).then_some(int)
}

/// Low 16 bits, the way port numbers wrap in hardware.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn port_arg(isolate: &Isolate, args: &[Value], i: usize) -> u16 {
    let n = isolate.to_number(&arg(args, i));
    if n.is_finite() { n as i64 as u16 } else { 0 }
}

fn handle_arg(isolate: &mut Isolate, args: &[Value], primitive: &str) -> Result<RealmHandle, Exception> {
    let value = arg(args, 0);
    realm_handle(isolate, &value).ok_or_else(|| {
        let got = isolate.type_of(&value);
        isolate.throw_error(
            ErrorKind::TypeError,
            format!("{primitive}: expected a realm handle, got {got}"),
        )
    })
}

fn eval(_: &Binding, isolate: &mut Isolate, args: &[Value]) -> Result<Value, Exception> {
    let code = string_arg(isolate, args, 0, "");
    let name = string_arg(isolate, args, 1, "eval");
    isolate.eval_in_current(&code, &name)
}

fn load(binding: &Binding, isolate: &mut Isolate, args: &[Value]) -> Result<Value, Exception> {
    let path = string_arg(isolate, args, 0, "");
    match binding.runtime.services().resources.get(&path) {
        Some(bytes) => Ok(Value::from(String::from_utf8_lossy(bytes).into_owned())),
        None => {
            log::debug!("{}: load({path:?}) found nothing", binding.handle);
            Ok(Value::Undefined)
        }
    }
}

fn exec(_: &Binding, isolate: &mut Isolate, args: &[Value]) -> Result<Value, Exception> {
    let context = isolate.new_proxy_context(&arg(args, 0))?;
    let name = string_arg(isolate, args, 1, "exec");
    let code = string_arg(isolate, args, 2, "");
    let result = isolate.run_source(&context, &code, &name);
    if !matches!(&result, Ok(value) if value.as_object() == context.global().as_object()) {
        isolate.release_context(context);
    }
    result
}

fn iso(binding: &Binding, isolate: &mut Isolate, args: &[Value]) -> Result<Value, Exception> {
    let code = string_arg(isolate, args, 0, "");
    let bindings = transfer_bindings(isolate, &arg(args, 1));

    let result = binding.runtime.run_nested(
        binding.handle.depth(),
        binding.capabilities,
        &code,
        bindings,
    );
    match result {
        Ok(value) => value.into_value(isolate),
        Err(RealmError::NestingTooDeep { limit }) => Err(isolate.throw_error(
            ErrorKind::RangeError,
            format!("realm nesting limit of {limit} reached"),
        )),
        // Already reported by the nested realm.
        Err(_) => Ok(Value::Undefined),
    }
}

/// Own properties of `object` that can be copied into another realm.
fn transfer_bindings(isolate: &mut Isolate, object: &Value) -> Vec<(String, Transferable)> {
    if object.as_object().is_none() {
        return Vec::new();
    }
    let mut out = Vec::new();
    for key in isolate.own_keys(object) {
        let Ok(value) = isolate.get(object, &key) else {
            continue;
        };
        match Transferable::from_value(isolate, &value) {
            Some(value) => out.push((String::from(&*key), value)),
            None => log::debug!("iso: binding {key:?} is not transferable"),
        }
    }
    out
}

#[allow(clippy::cast_precision_loss)]
fn poll(binding: &Binding, _: &mut Isolate, _: &[Value]) -> Result<Value, Exception> {
    Ok(binding
        .runtime
        .services()
        .events
        .poll()
        .map_or(Value::Undefined, |event| Value::Number(f64::from(event.vector))))
}

#[allow(clippy::cast_precision_loss)]
fn ticks(binding: &Binding, _: &mut Isolate, _: &[Value]) -> Result<Value, Exception> {
    Ok(Value::Number(binding.runtime.services().ticks.ticks() as f64))
}

fn inb(binding: &Binding, isolate: &mut Isolate, args: &[Value]) -> Result<Value, Exception> {
    let port = port_arg(isolate, args, 0);
    // SAFETY: raw port access is what this primitive grants.
    let value = unsafe { binding.runtime.services().ports.inb(port) };
    Ok(Value::Number(f64::from(value)))
}

#[allow(clippy::cast_possible_truncation)]
fn outb(binding: &Binding, isolate: &mut Isolate, args: &[Value]) -> Result<Value, Exception> {
    let port = port_arg(isolate, args, 0);
    let value = port_arg(isolate, args, 1) as u8;
    // SAFETY: raw port access is what this primitive grants.
    unsafe { binding.runtime.services().ports.outb(port, value) };
    Ok(Value::Undefined)
}

fn buff(binding: &Binding, isolate: &mut Isolate, args: &[Value]) -> Result<Value, Exception> {
    let (Some(base), Some(size)) = (unsigned_arg(isolate, args, 0), unsigned_arg(isolate, args, 1)) else {
        return Err(isolate.throw_error(
            ErrorKind::RangeError,
            "buff: base and size must be non-negative integers",
        ));
    };
    let width = match arg(args, 2) {
        Value::Undefined => Some(ElementWidth::U8),
        _ => unsigned_arg(isolate, args, 2)
            .and_then(|w| u32::try_from(w).ok())
            .and_then(ElementWidth::from_bytes),
    };
    let Some(width) = width else {
        return Err(isolate.throw_error(ErrorKind::RangeError, "buff: width must be 1, 2 or 4"));
    };
    let mapped = usize::try_from(size)
        .ok()
        .and_then(|size| Some((binding.runtime.services().memory.map(base, size)?, size)));
    let Some((ptr, size)) = mapped else {
        return Err(isolate.throw_error(
            ErrorKind::RangeError,
            format!("buff: cannot map {size:#x} bytes at {base:#x}"),
        ));
    };
    // SAFETY: the physical range is trusted; handing it out is this
    // primitive's purpose.
    let Some(view) = (unsafe { MemoryView::new(ptr, size, width) }) else {
        return Err(isolate.throw_error(
            ErrorKind::RangeError,
            format!("buff: {base:#x} is not aligned to {} bytes", width.bytes()),
        ));
    };
    isolate.new_memory_view(view)
}

fn kill(_: &Binding, isolate: &mut Isolate, args: &[Value]) -> Result<Value, Exception> {
    let target = handle_arg(isolate, args, "kill")?;
    Ok(Value::Bool(target.terminate()))
}

fn schedule(_: &Binding, isolate: &mut Isolate, args: &[Value]) -> Result<Value, Exception> {
    let target = handle_arg(isolate, args, "schedule")?;
    let code = string_arg(isolate, args, 1, "");
    Ok(Value::Bool(target.schedule("schedule", &*code)))
}

fn realm(binding: &Binding, isolate: &mut Isolate, _: &[Value]) -> Result<Value, Exception> {
    Transferable::Realm(binding.handle.clone()).into_value(isolate)
}

fn print(binding: &Binding, isolate: &mut Isolate, args: &[Value]) -> Result<Value, Exception> {
    let parts: Vec<Rc<str>> = args.iter().map(|v| isolate.coerce_string(v)).collect();
    binding.runtime.services().diagnostics.print(&binding.handle, &parts.join(" "));
    Ok(Value::Undefined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsigned_arguments() {
        let isolate = Isolate::new(kernel_script::IsolateConfig::default());
        let args = [Value::Number(4096.0), Value::Number(-1.0), Value::Number(1.5), Value::from("16")];
        assert_eq!(unsigned_arg(&isolate, &args, 0), Some(4096));
        assert_eq!(unsigned_arg(&isolate, &args, 1), None);
        assert_eq!(unsigned_arg(&isolate, &args, 2), None);
        assert_eq!(unsigned_arg(&isolate, &args, 3), Some(16));
        assert_eq!(unsigned_arg(&isolate, &args, 9), None);
    }

    #[test]
    fn ports_wrap_to_sixteen_bits() {
        let isolate = Isolate::new(kernel_script::IsolateConfig::default());
        let args = [Value::Number(f64::from(0x1_0060)), Value::Number(f64::NAN)];
        assert_eq!(port_arg(&isolate, &args, 0), 0x60);
        assert_eq!(port_arg(&isolate, &args, 1), 0);
    }
}
