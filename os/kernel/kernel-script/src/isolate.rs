use crate::ast::Program;
use crate::env::{Env, Resolution};
use crate::error::{ErrorKind, Exception, Failure, ScriptError, StackFrame, Thrown};
use crate::heap::{Heap, HeapObject, MemoryView, ObjectKind};
use crate::parser::parse;
use crate::source::{Source, Span};
use crate::value::{ObjectId, Value};
use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::format;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::any::Any;
use core::mem;
use core::sync::atomic::{AtomicBool, AtomicU8, AtomicU64, Ordering};
use kernel_sync::SpinLock;

static NEXT_ISOLATE_ID: AtomicU64 = AtomicU64::new(1);

/// Resource limits of one isolate.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct IsolateConfig {
    /// Heap objects the isolate may allocate over its lifetime.
    pub max_objects: usize,
    /// Nested script function calls, including nested script runs.
    pub max_call_depth: usize,
}

impl IsolateConfig {
    pub const DEFAULT: Self = Self {
        max_objects: 65_536,
        max_call_depth: 64,
    };
}

impl Default for IsolateConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[repr(u8)]
pub enum IsolateState {
    Created = 0,
    Running = 1,
    Interrupted = 2,
    Completed = 3,
    Terminated = 4,
    Disposed = 5,
}

impl IsolateState {
    const fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::Interrupted,
            3 => Self::Completed,
            4 => Self::Terminated,
            _ => Self::Disposed,
        }
    }

    /// Script code is on the stack.
    pub const fn is_executing(self) -> bool {
        matches!(self, Self::Running | Self::Interrupted)
    }
}

pub type HostInterrupt = Box<dyn FnOnce(&mut Isolate) -> Result<(), Exception> + Send>;

/// Work injected into a running isolate at its next safe point.
pub enum Interrupt {
    /// Source evaluated in whatever context is current at the safe point.
    Script { name: String, source: String },
    /// Embedder callback with full access to the isolate.
    Host(HostInterrupt),
}

impl core::fmt::Debug for Interrupt {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Script { name, .. } => write!(f, "Interrupt::Script({name})"),
            Self::Host(_) => f.write_str("Interrupt::Host"),
        }
    }
}

struct Shared {
    id: u64,
    state: AtomicU8,
    terminate: AtomicBool,
    pending: AtomicBool,
    inbox: SpinLock<VecDeque<Interrupt>>,
}

impl Shared {
    fn state(&self) -> IsolateState {
        IsolateState::from_u8(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: IsolateState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

/// Thread-safe control surface of an [`Isolate`].
///
/// This is the only part of an isolate that may be shared with other
/// execution contexts: it can ask the isolate to stop or to run extra work,
/// and observe its state, but never touches its heap.
#[derive(Clone)]
pub struct IsolateHandle(Arc<Shared>);

impl IsolateHandle {
    pub fn id(&self) -> u64 {
        self.0.id
    }

    pub fn state(&self) -> IsolateState {
        self.0.state()
    }

    /// Forcibly aborts whatever script the isolate is executing.
    ///
    /// Returns `false`, and does nothing, if no script is executing.
    pub fn terminate_execution(&self) -> bool {
        if !self.state().is_executing() {
            return false;
        }
        self.0.terminate.store(true, Ordering::Release);
        true
    }

    pub fn is_terminating(&self) -> bool {
        self.0.terminate.load(Ordering::Acquire)
    }

    /// Queues `interrupt` for the isolate's next safe point.
    ///
    /// Returns `false` if the isolate already finished, in which case the
    /// interrupt is dropped.
    pub fn request_interrupt(&self, interrupt: Interrupt) -> bool {
        if !matches!(
            self.state(),
            IsolateState::Created | IsolateState::Running | IsolateState::Interrupted
        ) {
            return false;
        }
        self.0.inbox.with_lock(|inbox| inbox.push_back(interrupt));
        self.0.pending.store(true, Ordering::Release);
        true
    }

    pub fn pending_interrupts(&self) -> usize {
        self.0.inbox.with_lock(|inbox| inbox.len())
    }
}

impl core::fmt::Debug for IsolateHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("IsolateHandle")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}

/// A global scope inside an isolate.
#[derive(Clone, Debug)]
pub struct Context {
    pub(crate) global: ObjectId,
    pub(crate) env: Rc<Env>,
    isolate: u64,
}

impl Context {
    /// The global object, as a script value.
    pub const fn global(&self) -> Value {
        Value::Object(self.global)
    }

    pub fn resolution(&self) -> Resolution {
        self.env.as_root().map_or(Resolution::Own, |root| root.resolution)
    }

    pub const fn isolate_id(&self) -> u64 {
        self.isolate
    }
}

/// Compiled script, reusable across contexts and isolates.
#[derive(Clone, Debug)]
pub struct Script {
    pub(crate) program: Rc<Program>,
}

impl Script {
    pub fn compile(source: &str, name: &str) -> Result<Self, ScriptError> {
        let source = Rc::new(Source::new(name, source));
        match parse(Rc::clone(&source)) {
            Ok(program) => Ok(Self {
                program: Rc::new(program),
            }),
            Err(err) => Err(ScriptError::Compile(Failure {
                message: format!("SyntaxError: {}", err.message),
                location: Some(source.location(err.span)),
                stack: Vec::new(),
            })),
        }
    }

    pub fn name(&self) -> &str {
        &self.program.source.name
    }

    /// Number of top-level statements.
    pub fn statement_count(&self) -> usize {
        self.program.body.len()
    }
}

#[derive(Debug)]
pub(crate) struct Frame {
    pub function: Option<Rc<str>>,
    pub source: Rc<Source>,
    pub span: Span,
}

/// An independent script heap with its own global contexts.
///
/// Execution is single-threaded: the isolate itself is neither `Send` nor
/// `Sync`. Cross-context control goes through [`IsolateHandle`].
pub struct Isolate {
    shared: Arc<Shared>,
    pub(crate) heap: Heap,
    pub(crate) config: IsolateConfig,
    pub(crate) entered: Vec<Context>,
    pub(crate) frames: Vec<Frame>,
    pub(crate) completion: Value,
}

impl Isolate {
    pub fn new(config: IsolateConfig) -> Self {
        let id = NEXT_ISOLATE_ID.fetch_add(1, Ordering::Relaxed);
        log::trace!("creating isolate {id}");
        Self {
            shared: Arc::new(Shared {
                id,
                state: AtomicU8::new(IsolateState::Created as u8),
                terminate: AtomicBool::new(false),
                pending: AtomicBool::new(false),
                inbox: SpinLock::new(VecDeque::new()),
            }),
            heap: Heap::new(config.max_objects),
            config,
            entered: Vec::new(),
            frames: Vec::new(),
            completion: Value::Undefined,
        }
    }

    pub fn handle(&self) -> IsolateHandle {
        IsolateHandle(Arc::clone(&self.shared))
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn state(&self) -> IsolateState {
        self.shared.state()
    }

    pub const fn config(&self) -> IsolateConfig {
        self.config
    }

    pub fn object_count(&self) -> usize {
        self.heap.len()
    }

    /// Depth of script calls and nested runs currently on the stack.
    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    /// Creates a context whose names resolve against its own global only.
    pub fn new_context(&mut self) -> Context {
        let global = self.heap.alloc_unbudgeted(HeapObject::new(ObjectKind::Plain));
        Context {
            global,
            env: Env::root(global, Resolution::Own),
            isolate: self.id(),
        }
    }

    /// Creates a context layered over the object `delegate`.
    ///
    /// The new global starts with a copy of every property `delegate` owns
    /// right now, so enumerating the global sees them. Names the global lacks
    /// are still looked up on `delegate` itself, which makes properties the
    /// delegate gains later reachable by name. All writes land on the new
    /// global.
    ///
    /// The new global counts against the object budget. Hand it back with
    /// [`release_context`](Self::release_context) once the context is done.
    pub fn new_proxy_context(&mut self, delegate: &Value) -> Result<Context, Exception> {
        let Some(delegate) = delegate.as_object() else {
            return Err(self.throw_error(
                ErrorKind::TypeError,
                format!("proxy delegate must be an object, got {}", self.type_of(delegate)),
            ));
        };
        let mut object = HeapObject::new(ObjectKind::Plain);
        object.props = self.heap.get(delegate).props.clone();
        let global = self.alloc_object(object)?;
        Ok(Context {
            global,
            env: Env::root(global, Resolution::Delegating { delegate }),
            isolate: self.id(),
        })
    }

    /// Frees the global of a context that is finished with.
    ///
    /// The heap only shrinks from the top: the global is reclaimed when it
    /// is the newest object and the context is not executing. Otherwise
    /// something allocated later may still refer to it, and it stays until
    /// dispose. Returns whether it was reclaimed. Neither `context` nor any
    /// clone of it may be used afterwards.
    pub fn release_context(&mut self, context: Context) -> bool {
        if context.isolate != self.id() || self.entered.iter().any(|c| c.global == context.global) {
            return false;
        }
        self.heap.release_newest(context.global)
    }

    /// The innermost context currently executing.
    pub fn current_context(&self) -> Option<Context> {
        self.entered.last().cloned()
    }

    pub fn get_global(&self, context: &Context, name: &str) -> Option<Value> {
        self.lookup_root(context.env.as_root()?, name)
    }

    pub fn set_global(&mut self, context: &Context, name: &str, value: Value) {
        self.heap.get_mut(context.global).set(name, value);
    }

    /// Runs `script` in `context`; yields the completion value.
    pub fn run(&mut self, context: &Context, script: &Script) -> Result<Value, Exception> {
        if context.isolate != self.id() {
            return Err(self.throw_error(
                ErrorKind::TypeError,
                "context belongs to a different isolate",
            ));
        }
        if self.frames.len() >= self.config.max_call_depth {
            return Err(self.throw_error(ErrorKind::RangeError, "Maximum call stack size exceeded"));
        }

        let outermost = self.entered.is_empty();
        if outermost {
            self.shared.terminate.store(false, Ordering::Release);
            self.shared.set_state(IsolateState::Running);
        }

        self.entered.push(context.clone());
        self.frames.push(Frame {
            function: None,
            source: Rc::clone(&script.program.source),
            span: Span::default(),
        });
        let saved = mem::take(&mut self.completion);
        let program = Rc::clone(&script.program);
        let result = self.exec_body(&program.body, &context.env);
        let completion = mem::replace(&mut self.completion, saved);
        self.frames.pop();
        self.entered.pop();

        if outermost {
            let terminated = matches!(result, Err(Exception::Terminated));
            self.shared.terminate.store(false, Ordering::Release);
            self.shared.set_state(if terminated {
                IsolateState::Terminated
            } else {
                IsolateState::Completed
            });
        }
        result.map(|_| completion)
    }

    /// Compiles and runs `source` in `context`, rendering any failure.
    pub fn execute(&mut self, context: &Context, source: &str, name: &str) -> Result<Value, ScriptError> {
        let script = Script::compile(source, name)?;
        self.run(context, &script).map_err(|e| self.report(e))
    }

    /// Compiles and runs `source` in the current context. A compile error
    /// surfaces as a thrown `SyntaxError`.
    pub fn eval_in_current(&mut self, source: &str, name: &str) -> Result<Value, Exception> {
        let Some(context) = self.current_context() else {
            return Err(self.throw_error(ErrorKind::Error, "no context is executing"));
        };
        self.run_source(&context, source, name)
    }

    /// Compiles and runs `source` in `context` from inside a running script.
    /// A compile error surfaces as a thrown `SyntaxError`.
    pub fn run_source(&mut self, context: &Context, source: &str, name: &str) -> Result<Value, Exception> {
        let script = match Script::compile(source, name) {
            Ok(script) => script,
            Err(err) => {
                let detail = match err.failure() {
                    Some(Failure {
                        message,
                        location: Some(loc),
                        ..
                    }) => format!(
                        "{} ({}:{}:{})",
                        message.trim_start_matches("SyntaxError: "),
                        loc.file,
                        loc.line,
                        loc.column_start + 1
                    ),
                    _ => format!("{err}"),
                };
                return Err(self.throw_error(ErrorKind::SyntaxError, detail));
            }
        };
        self.run(context, &script)
    }

    /// Turns an exception that escaped to the embedder into a report.
    pub fn report(&self, exception: Exception) -> ScriptError {
        match exception {
            Exception::Terminated => ScriptError::Terminated,
            Exception::Throw(thrown) => ScriptError::Uncaught(Failure {
                message: format!("Uncaught {}", self.coerce_string(&thrown.value)),
                location: thrown.location,
                stack: thrown.stack,
            }),
        }
    }

    /// Checks for termination and runs queued interrupts.
    ///
    /// The interpreter calls this before every statement and loop iteration;
    /// long-running native functions may call it too.
    pub fn poll_interrupts(&mut self) -> Result<(), Exception> {
        if self.shared.terminate.load(Ordering::Acquire) {
            return Err(Exception::Terminated);
        }
        if !self.shared.pending.load(Ordering::Acquire) {
            return Ok(());
        }
        loop {
            let pending = &self.shared.pending;
            let next = self.shared.inbox.with_lock(|inbox| {
                let next = inbox.pop_front();
                if inbox.is_empty() {
                    pending.store(false, Ordering::Release);
                }
                next
            });
            let Some(interrupt) = next else {
                return Ok(());
            };
            log::trace!("isolate {} servicing {interrupt:?}", self.id());
            let resume = self.state();
            self.shared.set_state(IsolateState::Interrupted);
            let result = match interrupt {
                Interrupt::Script { name, source } => self.eval_in_current(&source, &name).map(drop),
                Interrupt::Host(callback) => callback(self),
            };
            self.shared.set_state(resume);
            result?;
            if self.shared.terminate.load(Ordering::Acquire) {
                return Err(Exception::Terminated);
            }
        }
    }

    /// Releases the isolate and everything it allocated.
    pub fn dispose(self) {
        drop(self);
    }

    pub(crate) fn alloc(&mut self, kind: ObjectKind) -> Result<ObjectId, Exception> {
        self.alloc_object(HeapObject::new(kind))
    }

    fn alloc_object(&mut self, object: HeapObject) -> Result<ObjectId, Exception> {
        match self.heap.alloc(object) {
            Some(id) => Ok(id),
            None => Err(self.throw_error(
                ErrorKind::RangeError,
                format!("heap budget exhausted ({} objects)", self.config.max_objects),
            )),
        }
    }

    pub fn new_object(&mut self) -> Result<Value, Exception> {
        self.alloc(ObjectKind::Plain).map(Value::Object)
    }

    pub fn new_array(&mut self, items: Vec<Value>) -> Result<Value, Exception> {
        self.alloc(ObjectKind::Array(items)).map(Value::Object)
    }

    pub fn new_native(
        &mut self,
        name: &str,
        f: impl Fn(&mut Self, &[Value]) -> Result<Value, Exception> + 'static,
    ) -> Result<Value, Exception> {
        self.alloc(ObjectKind::Native {
            name: Rc::from(name),
            f: Rc::new(f),
        })
        .map(Value::Object)
    }

    /// Wraps embedder data in an opaque script object printed as
    /// `[object <tag>]`.
    pub fn new_host_object(&mut self, tag: &str, data: Rc<dyn Any>) -> Result<Value, Exception> {
        self.alloc(ObjectKind::Host {
            tag: Rc::from(tag),
            data,
        })
        .map(Value::Object)
    }

    pub fn host_data(&self, value: &Value) -> Option<Rc<dyn Any>> {
        match &self.heap.get(value.as_object()?).kind {
            ObjectKind::Host { data, .. } => Some(Rc::clone(data)),
            _ => None,
        }
    }

    pub fn new_memory_view(&mut self, view: MemoryView) -> Result<Value, Exception> {
        self.alloc(ObjectKind::Memory(view)).map(Value::Object)
    }

    pub fn memory_view(&self, value: &Value) -> Option<MemoryView> {
        match &self.heap.get(value.as_object()?).kind {
            ObjectKind::Memory(view) => Some(*view),
            _ => None,
        }
    }

    /// Own property names of an object, in insertion order.
    pub fn own_keys(&self, value: &Value) -> Vec<Rc<str>> {
        value.as_object().map_or_else(Vec::new, |id| {
            self.heap.get(id).props.iter().map(|(k, _)| Rc::clone(k)).collect()
        })
    }

    pub fn get(&mut self, target: &Value, name: &str) -> Result<Value, Exception> {
        let key = crate::interp::Key::named(name);
        self.get_property(target, &key)
    }

    pub fn set(&mut self, target: &Value, name: &str, value: Value) -> Result<(), Exception> {
        let key = crate::interp::Key::named(name);
        self.set_property(target, key, value)
    }

    pub fn is_callable(&self, value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|id| self.heap.get(id).is_callable())
    }

    pub fn type_of(&self, value: &Value) -> &'static str {
        match value {
            Value::Undefined => "undefined",
            Value::Null => "object",
            Value::Object(_) if self.is_callable(value) => "function",
            Value::Object(_) => "object",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    /// Throws a fresh built-in error object.
    pub fn throw_error(&mut self, kind: ErrorKind, message: impl Into<String>) -> Exception {
        let message: String = message.into();
        let mut error = HeapObject::new(ObjectKind::Plain);
        error.set("name", Value::string(kind.name()));
        error.set("message", Value::from(message));
        let id = self.heap.alloc_unbudgeted(error);
        self.throw_value(Value::Object(id))
    }

    /// Throws `value`, capturing the current position and call stack.
    pub fn throw_value(&self, value: Value) -> Exception {
        let location = self.frames.last().map(|f| f.source.location(f.span));
        let stack = self
            .frames
            .iter()
            .rev()
            .map(|frame| {
                let loc = frame.source.location(frame.span);
                StackFrame {
                    function: frame.function.clone(),
                    file: loc.file,
                    line: loc.line,
                    column: loc.column_start + 1,
                }
            })
            .collect();
        Exception::Throw(Box::new(Thrown {
            value,
            location,
            stack,
        }))
    }
}

impl Drop for Isolate {
    fn drop(&mut self) {
        self.shared.set_state(IsolateState::Disposed);
        let dropped = self.shared.inbox.with_lock(|inbox| mem::take(inbox));
        if !dropped.is_empty() {
            log::debug!("isolate {} disposed with {} queued interrupts", self.id(), dropped.len());
        }
        log::trace!("disposing isolate {} ({} objects)", self.id(), self.heap.len());
    }
}
