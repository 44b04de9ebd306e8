use crate::source::Location;
use crate::value::Value;
use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

/// Abrupt completion travelling up the interpreter.
#[derive(Debug)]
pub enum Exception {
    /// A script value was thrown and not (yet) caught.
    Throw(Box<Thrown>),
    /// The isolate was asked to stop. Never observable by script code.
    Terminated,
}

#[derive(Debug)]
pub struct Thrown {
    pub value: Value,
    pub location: Option<Location>,
    pub stack: Vec<StackFrame>,
}

impl Exception {
    pub const fn is_termination(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    pub fn thrown_value(&self) -> Option<&Value> {
        match self {
            Self::Throw(t) => Some(&t.value),
            Self::Terminated => None,
        }
    }
}

/// Built-in error constructors scripts can observe by `name`.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ErrorKind {
    Error,
    TypeError,
    RangeError,
    ReferenceError,
    SyntaxError,
}

impl ErrorKind {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::TypeError => "TypeError",
            Self::RangeError => "RangeError",
            Self::ReferenceError => "ReferenceError",
            Self::SyntaxError => "SyntaxError",
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StackFrame {
    /// `None` for top-level script code.
    pub function: Option<Rc<str>>,
    pub file: Rc<str>,
    pub line: u32,
    /// 1-based.
    pub column: u32,
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.function {
            Some(name) => write!(f, "at {name} ({}:{}:{})", self.file, self.line, self.column),
            None => write!(f, "at {}:{}:{}", self.file, self.line, self.column),
        }
    }
}

/// A rendered, isolate-independent description of a script failure.
///
/// The `Display` form is the multi-line report the kernel prints:
///
/// ```text
/// init.js:3: Uncaught TypeError: x is not a function
/// var y = x(1);
///         ^^^^
///     at init.js:3:9
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Failure {
    pub message: String,
    pub location: Option<Location>,
    pub stack: Vec<StackFrame>,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(loc) = &self.location else {
            f.write_str(&self.message)?;
            for frame in &self.stack {
                write!(f, "\n    {frame}")?;
            }
            return Ok(());
        };
        write!(f, "{}:{}: {}", loc.file, loc.line, self.message)?;
        write!(f, "\n{}\n", loc.source_line)?;
        let carets = loc.column_end.saturating_sub(loc.column_start).max(1);
        for _ in 0..loc.column_start {
            f.write_str(" ")?;
        }
        for _ in 0..carets {
            f.write_str("^")?;
        }
        for frame in &self.stack {
            write!(f, "\n    {frame}")?;
        }
        Ok(())
    }
}

/// Outcome of compiling or running a script, as seen by embedders.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("{0}")]
    Compile(Failure),
    #[error("{0}")]
    Uncaught(Failure),
    #[error("execution terminated")]
    Terminated,
}

impl ScriptError {
    pub const fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Compile(f) | Self::Uncaught(f) => Some(f),
            Self::Terminated => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn failure_report_underlines_span() {
        let failure = Failure {
            message: "Uncaught Error: boom".to_string(),
            location: Some(Location {
                file: "a.js".into(),
                line: 2,
                column_start: 4,
                column_end: 7,
                source_line: "    f();".to_string(),
            }),
            stack: vec![StackFrame {
                function: Some("g".into()),
                file: "a.js".into(),
                line: 2,
                column: 5,
            }],
        };
        assert_eq!(
            failure.to_string(),
            "a.js:2: Uncaught Error: boom\n    f();\n    ^^^\n    at g (a.js:2:5)"
        );
    }

    #[test]
    fn failure_without_location_is_just_the_message() {
        let failure = Failure {
            message: "out of memory".to_string(),
            location: None,
            stack: Vec::new(),
        };
        assert_eq!(ScriptError::Uncaught(failure).to_string(), "out of memory");
    }
}
