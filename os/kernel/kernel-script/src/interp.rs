//! Tree-walking evaluation.

use crate::Isolate;
use crate::ast::{BinaryOp, Expr, ExprKind, FunctionDecl, LogicalOp, Stmt, UnaryOp};
use crate::builtins;
use crate::env::{Env, Resolution, Root};
use crate::error::{ErrorKind, Exception};
use crate::heap::ObjectKind;
use crate::isolate::Frame;
use crate::source::Span;
use crate::value::{Value, as_index, number_to_string, string_to_number, to_int32, to_uint32};
use alloc::format;
use alloc::rc::Rc;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::mem;

/// Largest gap an array write may open past the current length.
const MAX_ARRAY_GROWTH: usize = 1 << 16;

/// Nesting bound when converting arrays to strings.
const MAX_STRING_DEPTH: usize = 16;

pub(crate) enum Flow {
    Normal,
    Return(Value),
    Break,
    Continue,
}

#[derive(Debug, Clone)]
pub(crate) enum Key {
    Index(usize),
    Name(Rc<str>),
}

impl Key {
    pub fn named(name: &str) -> Self {
        canonical_index(name).map_or_else(|| Self::Name(Rc::from(name)), Self::Index)
    }

    pub fn name(&self) -> Rc<str> {
        match self {
            Self::Index(i) => Rc::from(i.to_string()),
            Self::Name(n) => Rc::clone(n),
        }
    }

    fn is(&self, name: &str) -> bool {
        matches!(self, Self::Name(n) if &**n == name)
    }
}

/// `"0"`, `"17"`, but not `"017"` or `"-1"`.
fn canonical_index(s: &str) -> Option<usize> {
    if s.is_empty() || (s.len() > 1 && s.starts_with('0')) || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn length_value(n: usize) -> Value {
    Value::Number(n as f64)
}

enum Place {
    Var(Rc<str>),
    Prop(Value, Key),
}

impl Isolate {
    pub(crate) fn mark(&mut self, span: Span) {
        if let Some(frame) = self.frames.last_mut() {
            frame.span = span;
        }
    }

    pub(crate) fn exec_body(&mut self, body: &[Stmt], env: &Rc<Env>) -> Result<Flow, Exception> {
        for stmt in body {
            if let Stmt::Function(decl) = stmt {
                let closure = self.make_closure(decl, env)?;
                if let Some(name) = &decl.name {
                    self.declare(env, name, closure);
                }
            }
        }
        for stmt in body {
            match self.exec_stmt(stmt, env)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_stmt(&mut self, stmt: &Stmt, env: &Rc<Env>) -> Result<Flow, Exception> {
        self.poll_interrupts()?;
        self.mark(stmt.span());
        match stmt {
            Stmt::Var(decls, _) => {
                for (name, init) in decls {
                    match init {
                        Some(expr) => {
                            let value = self.eval(expr, env)?;
                            self.declare(env, name, value);
                        }
                        None => self.declare_absent(env, name),
                    }
                }
            }
            // hoisted by `exec_body`
            Stmt::Function(_) | Stmt::Empty(_) => {}
            Stmt::Expr(expr) => {
                self.completion = self.eval(expr, env)?;
            }
            Stmt::If {
                test,
                then,
                otherwise,
                ..
            } => {
                if self.eval(test, env)?.truthy() {
                    return self.exec_stmt(then, env);
                } else if let Some(otherwise) = otherwise {
                    return self.exec_stmt(otherwise, env);
                }
            }
            Stmt::While { test, body, .. } => loop {
                self.poll_interrupts()?;
                if !self.eval(test, env)?.truthy() {
                    break;
                }
                match self.exec_stmt(body, env)? {
                    Flow::Break => break,
                    Flow::Return(v) => return Ok(Flow::Return(v)),
                    Flow::Normal | Flow::Continue => {}
                }
            },
            Stmt::For {
                init,
                test,
                update,
                body,
                ..
            } => {
                if let Some(init) = init {
                    self.exec_stmt(init, env)?;
                }
                loop {
                    self.poll_interrupts()?;
                    if let Some(test) = test
                        && !self.eval(test, env)?.truthy()
                    {
                        break;
                    }
                    match self.exec_stmt(body, env)? {
                        Flow::Break => break,
                        Flow::Return(v) => return Ok(Flow::Return(v)),
                        Flow::Normal | Flow::Continue => {}
                    }
                    if let Some(update) = update {
                        self.eval(update, env)?;
                    }
                }
            }
            Stmt::Block(body, _) => return self.exec_body(body, env),
            Stmt::Return(value, _) => {
                let value = match value {
                    Some(expr) => self.eval(expr, env)?,
                    None => Value::Undefined,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Break(_) => return Ok(Flow::Break),
            Stmt::Continue(_) => return Ok(Flow::Continue),
            Stmt::Throw(expr, span) => {
                let value = self.eval(expr, env)?;
                self.mark(*span);
                return Err(self.throw_value(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn declare(&mut self, env: &Rc<Env>, name: &Rc<str>, value: Value) {
        match env.as_root() {
            Some(root) => self.heap.get_mut(root.global).set(name, value),
            None => env.define_local(name, value),
        }
    }

    /// `var x;` leaves an existing binding alone.
    fn declare_absent(&mut self, env: &Rc<Env>, name: &Rc<str>) {
        match env.as_root() {
            Some(root) => {
                let global = self.heap.get_mut(root.global);
                if global.get(name).is_none() {
                    global.set(name, Value::Undefined);
                }
            }
            None if !env.has_local(name) => env.define_local(name, Value::Undefined),
            None => {}
        }
    }

    pub(crate) fn lookup_root(&self, root: Root, name: &str) -> Option<Value> {
        if let Some(value) = self.heap.get(root.global).get(name) {
            return Some(value.clone());
        }
        match root.resolution {
            Resolution::Own => None,
            Resolution::Delegating { delegate } => self.heap.get(delegate).get(name).cloned(),
        }
    }

    fn lookup(&self, env: &Env, name: &str) -> Option<Value> {
        let mut scope = env;
        loop {
            if let Some(root) = scope.as_root() {
                return self.lookup_root(root, name);
            }
            if let Some(value) = scope.get_local(name) {
                return Some(value);
            }
            scope = &**scope.parent()?;
        }
    }

    /// Writes to the nearest binding; unknown names become globals.
    fn assign(&mut self, env: &Env, name: &str, value: Value) {
        let mut scope = env;
        loop {
            if let Some(root) = scope.as_root() {
                self.heap.get_mut(root.global).set(name, value);
                return;
            }
            if scope.set_local(name, value.clone()) {
                return;
            }
            match scope.parent() {
                Some(parent) => scope = &**parent,
                None => return,
            }
        }
    }

    fn make_closure(&mut self, decl: &Rc<FunctionDecl>, env: &Rc<Env>) -> Result<Value, Exception> {
        self.alloc(ObjectKind::Closure {
            decl: Rc::clone(decl),
            env: Rc::clone(env),
        })
        .map(Value::Object)
    }

    pub(crate) fn eval(&mut self, expr: &Expr, env: &Rc<Env>) -> Result<Value, Exception> {
        match &expr.kind {
            ExprKind::Number(n) => Ok(Value::Number(*n)),
            ExprKind::Str(s) => Ok(Value::String(Rc::clone(s))),
            ExprKind::Bool(b) => Ok(Value::Bool(*b)),
            ExprKind::Null => Ok(Value::Null),
            ExprKind::Undefined => Ok(Value::Undefined),
            ExprKind::Ident(name) => match self.lookup(env, name) {
                Some(value) => Ok(value),
                None => {
                    self.mark(expr.span);
                    Err(self.throw_error(ErrorKind::ReferenceError, format!("{name} is not defined")))
                }
            },
            ExprKind::Array(items) => {
                let mut values = Vec::with_capacity(items.len());
                for item in items {
                    values.push(self.eval(item, env)?);
                }
                self.new_array(values)
            }
            ExprKind::Object(props) => {
                let id = self.alloc(ObjectKind::Plain)?;
                for (key, value) in props {
                    let value = self.eval(value, env)?;
                    self.heap.get_mut(id).set(key, value);
                }
                Ok(Value::Object(id))
            }
            ExprKind::Function(decl) => self.make_closure(decl, env),
            ExprKind::Unary(op, operand) => self.unary(*op, operand, env),
            ExprKind::Update {
                increment,
                prefix,
                target,
            } => {
                let place = self.place(target, env)?;
                let old = self.read_place(&place, env, target.span)?;
                let old = self.to_number(&old);
                let new = if *increment { old + 1.0 } else { old - 1.0 };
                self.write_place(place, env, Value::Number(new), expr.span)?;
                Ok(Value::Number(if *prefix { new } else { old }))
            }
            ExprKind::Binary(op, left, right) => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                Ok(self.binary(*op, &left, &right))
            }
            ExprKind::Logical(op, left, right) => {
                let left = self.eval(left, env)?;
                match (op, left.truthy()) {
                    (LogicalOp::And, false) | (LogicalOp::Or, true) => Ok(left),
                    _ => self.eval(right, env),
                }
            }
            ExprKind::Conditional(test, then, otherwise) => {
                if self.eval(test, env)?.truthy() {
                    self.eval(then, env)
                } else {
                    self.eval(otherwise, env)
                }
            }
            ExprKind::Assign(op, target, value) => {
                let place = self.place(target, env)?;
                let value = match op {
                    None => self.eval(value, env)?,
                    Some(op) => {
                        let current = self.read_place(&place, env, target.span)?;
                        let rhs = self.eval(value, env)?;
                        self.binary(*op, &current, &rhs)
                    }
                };
                self.write_place(place, env, value.clone(), expr.span)?;
                Ok(value)
            }
            ExprKind::Call(callee, args) => self.eval_call(expr, callee, args, env),
            ExprKind::Member(object, name) => {
                let object = self.eval(object, env)?;
                self.mark(expr.span);
                self.get_property(&object, &Key::Name(Rc::clone(name)))
            }
            ExprKind::Index(object, index) => {
                let object = self.eval(object, env)?;
                let index = self.eval(index, env)?;
                let key = self.to_key(&index);
                self.mark(expr.span);
                self.get_property(&object, &key)
            }
        }
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr, env: &Rc<Env>) -> Result<Value, Exception> {
        if op == UnaryOp::Typeof
            && let ExprKind::Ident(name) = &operand.kind
            && self.lookup(env, name).is_none()
        {
            return Ok(Value::string("undefined"));
        }
        let value = self.eval(operand, env)?;
        Ok(match op {
            UnaryOp::Neg => Value::Number(-self.to_number(&value)),
            UnaryOp::Plus => Value::Number(self.to_number(&value)),
            UnaryOp::Not => Value::Bool(!value.truthy()),
            UnaryOp::BitNot => Value::Number(f64::from(!to_int32(self.to_number(&value)))),
            UnaryOp::Typeof => Value::string(self.type_of(&value)),
        })
    }

    fn eval_call(&mut self, call: &Expr, callee: &Expr, arg_exprs: &[Expr], env: &Rc<Env>) -> Result<Value, Exception> {
        let receiver = match &callee.kind {
            ExprKind::Member(object, name) => Some((self.eval(object, env)?, Rc::clone(name))),
            _ => None,
        };
        let function = match &receiver {
            None => Some(self.eval(callee, env)?),
            Some((this, name)) if matches!(this, Value::Object(_)) => {
                let property = self.get_property(this, &Key::Name(Rc::clone(name)))?;
                self.is_callable(&property).then_some(property)
            }
            Some((this, name)) if this.is_nullish() => {
                self.mark(callee.span);
                return Err(self.throw_error(
                    ErrorKind::TypeError,
                    format!("Cannot read properties of {} (reading '{name}')", self.coerce_string(this)),
                ));
            }
            Some(_) => None,
        };

        let mut args = Vec::with_capacity(arg_exprs.len());
        for arg in arg_exprs {
            args.push(self.eval(arg, env)?);
        }
        self.mark(call.span);

        if let Some(function) = function.filter(|f| self.is_callable(f)) {
            return self.call(&function, &args);
        }
        if let Some((this, name)) = &receiver
            && let Some(result) = builtins::call_method(self, this, name, &args)
        {
            return result;
        }
        Err(self.throw_error(
            ErrorKind::TypeError,
            format!("{} is not a function", describe_callee(callee)),
        ))
    }

    /// Calls a script or native function.
    pub fn call(&mut self, function: &Value, args: &[Value]) -> Result<Value, Exception> {
        let kind = function.as_object().map(|id| &self.heap.get(id).kind);
        match kind {
            Some(ObjectKind::Closure { decl, env }) => {
                let (decl, env) = (Rc::clone(decl), Rc::clone(env));
                self.call_closure(&decl, &env, args)
            }
            Some(ObjectKind::Native { f, .. }) => {
                let f = Rc::clone(f);
                f(self, args)
            }
            _ => Err(self.throw_error(
                ErrorKind::TypeError,
                format!("{} is not a function", self.type_of(function)),
            )),
        }
    }

    fn call_closure(&mut self, decl: &Rc<FunctionDecl>, captured: &Rc<Env>, args: &[Value]) -> Result<Value, Exception> {
        if self.frames.len() >= self.config.max_call_depth {
            return Err(self.throw_error(ErrorKind::RangeError, "Maximum call stack size exceeded"));
        }
        let env = Env::child(captured);
        for (i, param) in decl.params.iter().enumerate() {
            env.define_local(param, args.get(i).cloned().unwrap_or_default());
        }
        self.frames.push(Frame {
            function: Some(decl.name.clone().unwrap_or_else(|| Rc::from("<anonymous>"))),
            source: Rc::clone(&decl.source),
            span: decl.span,
        });
        let saved = mem::take(&mut self.completion);
        let result = self.exec_body(&decl.body, &env);
        self.completion = saved;
        self.frames.pop();
        match result? {
            Flow::Return(value) => Ok(value),
            Flow::Normal | Flow::Break | Flow::Continue => Ok(Value::Undefined),
        }
    }

    fn place(&mut self, target: &Expr, env: &Rc<Env>) -> Result<Place, Exception> {
        match &target.kind {
            ExprKind::Ident(name) => Ok(Place::Var(Rc::clone(name))),
            ExprKind::Member(object, name) => {
                let object = self.eval(object, env)?;
                Ok(Place::Prop(object, Key::Name(Rc::clone(name))))
            }
            ExprKind::Index(object, index) => {
                let object = self.eval(object, env)?;
                let index = self.eval(index, env)?;
                let key = self.to_key(&index);
                Ok(Place::Prop(object, key))
            }
            _ => {
                self.mark(target.span);
                Err(self.throw_error(ErrorKind::ReferenceError, "invalid assignment target"))
            }
        }
    }

    fn read_place(&mut self, place: &Place, env: &Rc<Env>, span: Span) -> Result<Value, Exception> {
        match place {
            Place::Var(name) => match self.lookup(env, name) {
                Some(value) => Ok(value),
                None => {
                    self.mark(span);
                    Err(self.throw_error(ErrorKind::ReferenceError, format!("{name} is not defined")))
                }
            },
            Place::Prop(object, key) => {
                self.mark(span);
                self.get_property(object, key)
            }
        }
    }

    fn write_place(&mut self, place: Place, env: &Rc<Env>, value: Value, span: Span) -> Result<(), Exception> {
        match place {
            Place::Var(name) => {
                self.assign(env, &name, value);
                Ok(())
            }
            Place::Prop(object, key) => {
                self.mark(span);
                self.set_property(&object, key, value)
            }
        }
    }

    fn to_key(&self, value: &Value) -> Key {
        match value {
            Value::Number(n) => as_index(*n).map_or_else(|| Key::Name(Rc::from(number_to_string(*n))), Key::Index),
            Value::String(s) => canonical_index(s).map_or_else(|| Key::Name(Rc::clone(s)), Key::Index),
            other => Key::Name(self.coerce_string(other)),
        }
    }

    pub(crate) fn get_property(&mut self, target: &Value, key: &Key) -> Result<Value, Exception> {
        let id = match target {
            Value::Undefined | Value::Null => {
                return Err(self.throw_error(
                    ErrorKind::TypeError,
                    format!(
                        "Cannot read properties of {} (reading '{}')",
                        self.coerce_string(target),
                        key.name()
                    ),
                ));
            }
            Value::String(s) => {
                return Ok(match key {
                    Key::Index(i) => s.chars().nth(*i).map_or(Value::Undefined, |c| Value::from(c.to_string())),
                    key if key.is("length") => length_value(s.chars().count()),
                    Key::Name(_) => Value::Undefined,
                });
            }
            Value::Bool(_) | Value::Number(_) => return Ok(Value::Undefined),
            Value::Object(id) => *id,
        };
        let object = self.heap.get(id);
        match (&object.kind, key) {
            (ObjectKind::Array(items), Key::Index(i)) => return Ok(items.get(*i).cloned().unwrap_or_default()),
            (ObjectKind::Array(items), key) if key.is("length") => return Ok(length_value(items.len())),
            (ObjectKind::Memory(view), Key::Index(i)) => {
                return Ok(view.read(*i).map_or(Value::Undefined, |v| Value::Number(f64::from(v))));
            }
            (ObjectKind::Memory(view), key) if key.is("length") => return Ok(length_value(view.len())),
            (ObjectKind::Closure { decl, .. }, key) if key.is("name") => {
                return Ok(decl.name.clone().map_or_else(|| Value::string(""), Value::String));
            }
            _ => {}
        }
        Ok(object.get(&key.name()).cloned().unwrap_or_default())
    }

    pub(crate) fn set_property(&mut self, target: &Value, key: Key, value: Value) -> Result<(), Exception> {
        enum Slot {
            ArrayIndex(usize),
            ArrayLength,
            Memory(usize),
            Named,
        }

        let id = match target {
            Value::Undefined | Value::Null => {
                return Err(self.throw_error(
                    ErrorKind::TypeError,
                    format!(
                        "Cannot set properties of {} (setting '{}')",
                        self.coerce_string(target),
                        key.name()
                    ),
                ));
            }
            Value::Object(id) => *id,
            _ => return Ok(()),
        };

        let slot = match (&self.heap.get(id).kind, &key) {
            (ObjectKind::Array(_), Key::Index(i)) => Slot::ArrayIndex(*i),
            (ObjectKind::Array(_), key) if key.is("length") => Slot::ArrayLength,
            (ObjectKind::Memory(_), Key::Index(i)) => Slot::Memory(*i),
            _ => Slot::Named,
        };

        match slot {
            Slot::ArrayIndex(index) => {
                let ObjectKind::Array(items) = &mut self.heap.get_mut(id).kind else {
                    unreachable!("slot kind checked above");
                };
                if index >= items.len() + MAX_ARRAY_GROWTH {
                    return Err(self.throw_error(ErrorKind::RangeError, format!("array index {index} too large")));
                }
                if index >= items.len() {
                    items.resize(index + 1, Value::Undefined);
                }
                items[index] = value;
            }
            Slot::ArrayLength => {
                let length = as_index(self.to_number(&value));
                let ObjectKind::Array(items) = &mut self.heap.get_mut(id).kind else {
                    unreachable!("slot kind checked above");
                };
                match length {
                    Some(n) if n <= items.len() + MAX_ARRAY_GROWTH => items.resize(n, Value::Undefined),
                    _ => return Err(self.throw_error(ErrorKind::RangeError, "Invalid array length")),
                }
            }
            Slot::Memory(index) => {
                // out-of-range stores are dropped, like typed arrays do
                let raw = to_uint32(self.to_number(&value));
                if let Some(view) = self.memory_view(target) {
                    view.write(index, raw);
                }
            }
            Slot::Named => self.heap.get_mut(id).set(&key.name(), value),
        }
        Ok(())
    }

    pub(crate) fn binary(&self, op: BinaryOp, left: &Value, right: &Value) -> Value {
        match op {
            BinaryOp::Add => {
                let (left, right) = (self.to_primitive(left), self.to_primitive(right));
                if matches!(left, Value::String(_)) || matches!(right, Value::String(_)) {
                    let joined = format!("{}{}", self.coerce_string(&left), self.coerce_string(&right));
                    Value::from(joined)
                } else {
                    Value::Number(self.to_number(&left) + self.to_number(&right))
                }
            }
            BinaryOp::Sub => Value::Number(self.to_number(left) - self.to_number(right)),
            BinaryOp::Mul => Value::Number(self.to_number(left) * self.to_number(right)),
            BinaryOp::Div => Value::Number(self.to_number(left) / self.to_number(right)),
            BinaryOp::Rem => Value::Number(self.to_number(left) % self.to_number(right)),
            BinaryOp::Eq => Value::Bool(self.loose_equals(left, right)),
            BinaryOp::NotEq => Value::Bool(!self.loose_equals(left, right)),
            BinaryOp::StrictEq => Value::Bool(left.strict_equals(right)),
            BinaryOp::StrictNotEq => Value::Bool(!left.strict_equals(right)),
            BinaryOp::Lt => Value::Bool(self.compare(left, right) == Some(Ordering::Less)),
            BinaryOp::Gt => Value::Bool(self.compare(left, right) == Some(Ordering::Greater)),
            BinaryOp::LtEq => Value::Bool(matches!(
                self.compare(left, right),
                Some(Ordering::Less | Ordering::Equal)
            )),
            BinaryOp::GtEq => Value::Bool(matches!(
                self.compare(left, right),
                Some(Ordering::Greater | Ordering::Equal)
            )),
            BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr => {
                let a = to_int32(self.to_number(left));
                let b = to_int32(self.to_number(right));
                #[allow(clippy::cast_sign_loss)]
                let shift = (b & 31) as u32;
                let result = match op {
                    BinaryOp::BitAnd => a & b,
                    BinaryOp::BitOr => a | b,
                    BinaryOp::BitXor => a ^ b,
                    BinaryOp::Shl => a.wrapping_shl(shift),
                    _ => a >> shift,
                };
                Value::Number(f64::from(result))
            }
            BinaryOp::UShr => {
                let a = to_uint32(self.to_number(left));
                let shift = to_uint32(self.to_number(right)) & 31;
                Value::Number(f64::from(a >> shift))
            }
        }
    }

    fn compare(&self, left: &Value, right: &Value) -> Option<Ordering> {
        match (self.to_primitive(left), self.to_primitive(right)) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(&b)),
            (a, b) => self.to_number(&a).partial_cmp(&self.to_number(&b)),
        }
    }

    fn loose_equals(&self, left: &Value, right: &Value) -> bool {
        match (left, right) {
            (Value::Object(_), Value::Object(_)) => left.strict_equals(right),
            (Value::Object(_), other) | (other, Value::Object(_)) if !other.is_nullish() => {
                let (a, b) = (self.to_primitive(left), self.to_primitive(right));
                a.loose_equals(&b)
            }
            _ => left.loose_equals(right),
        }
    }

    /// Objects become their string form; primitives are unchanged.
    fn to_primitive(&self, value: &Value) -> Value {
        match value {
            Value::Object(_) => Value::String(self.coerce_string(value)),
            other => other.clone(),
        }
    }

    pub fn to_number(&self, value: &Value) -> f64 {
        match value {
            Value::Undefined => f64::NAN,
            Value::Null => 0.0,
            Value::Bool(b) => f64::from(u8::from(*b)),
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
            Value::Object(_) => string_to_number(&self.coerce_string(value)),
        }
    }

    /// String conversion as `String(value)` would perform it.
    pub fn coerce_string(&self, value: &Value) -> Rc<str> {
        self.string_of(value, 0)
    }

    fn string_of(&self, value: &Value, depth: usize) -> Rc<str> {
        match value {
            Value::Undefined => Rc::from("undefined"),
            Value::Null => Rc::from("null"),
            Value::Bool(b) => Rc::from(if *b { "true" } else { "false" }),
            Value::Number(n) => Rc::from(number_to_string(*n)),
            Value::String(s) => Rc::clone(s),
            Value::Object(id) => {
                let object = self.heap.get(*id);
                let text: String = match &object.kind {
                    ObjectKind::Array(_) if depth >= MAX_STRING_DEPTH => String::new(),
                    ObjectKind::Array(items) => {
                        let mut out = String::new();
                        for (i, item) in items.iter().enumerate() {
                            if i > 0 {
                                out.push(',');
                            }
                            if !item.is_nullish() {
                                out.push_str(&self.string_of(item, depth + 1));
                            }
                        }
                        out
                    }
                    ObjectKind::Closure { decl, .. } => {
                        format!("function {}() {{ [code] }}", decl.name.as_deref().unwrap_or(""))
                    }
                    ObjectKind::Native { name, .. } => format!("function {name}() {{ [native code] }}"),
                    ObjectKind::Memory(_) => String::from("[object Buffer]"),
                    ObjectKind::Host { tag, .. } => format!("[object {tag}]"),
                    ObjectKind::Plain => match (object.get("name"), object.get("message")) {
                        (Some(Value::String(name)), Some(message)) if depth < MAX_STRING_DEPTH => {
                            let message = self.string_of(message, depth + 1);
                            if message.is_empty() {
                                name.to_string()
                            } else {
                                format!("{name}: {message}")
                            }
                        }
                        _ => String::from("[object Object]"),
                    },
                };
                Rc::from(text)
            }
        }
    }
}

/// Renders a callee expression for "is not a function" messages.
fn describe_callee(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Ident(name) => name.to_string(),
        ExprKind::Member(object, name) => format!("{}.{name}", describe_callee(object)),
        ExprKind::Index(object, _) => format!("{}[...]", describe_callee(object)),
        ExprKind::Call(callee, _) => format!("{}(...)", describe_callee(callee)),
        _ => String::from("expression"),
    }
}
