use crate::bootstrap::KernelContext;
use alloc::vec::Vec;
use kernel_realm::{RealmError, Transferable};

/// Expected outcome of a [`SelfTest`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Expect {
    Number(f64),
    Text(&'static str),
    Bool(bool),
    Undefined,
    /// The realm is terminated before it completes.
    Terminated,
}

impl Expect {
    fn matches(self, outcome: &Result<Transferable, RealmError>) -> bool {
        match (self, outcome) {
            (Self::Terminated, Err(e)) => e.is_termination(),
            (Self::Number(n), Ok(Transferable::Number(v))) => n == *v,
            (Self::Text(s), Ok(Transferable::String(v))) => s == v.as_str(),
            (Self::Bool(b), Ok(Transferable::Bool(v))) => b == *v,
            (Self::Undefined, Ok(Transferable::Undefined)) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Copy, Clone)]
pub struct SelfTest {
    pub name: &'static str,
    pub source: &'static str,
    pub expect: Expect,
}

const fn case(name: &'static str, source: &'static str, expect: Expect) -> SelfTest {
    SelfTest {
        name,
        source,
        expect,
    }
}

/// Built-in checks of the script engine and the realm primitives.
pub const SELF_TESTS: &[SelfTest] = &[
    case("arithmetic", "1 + 2 * 3", Expect::Number(7.0)),
    case(
        "closures",
        "var mk = function (n) { return function () { return n += 1; }; }; var c = mk(1); c(); c()",
        Expect::Number(3.0),
    ),
    case("strings", "'abc'.toUpperCase() + 'xyz'.charAt(1)", Expect::Text("ABCy")),
    case(
        "arrays",
        "[3, 1, 2].map(function (x) { return x * 2; }).join('-')",
        Expect::Text("6-2-4"),
    ),
    case("eval", "eval('6 * 7')", Expect::Number(42.0)),
    case("proxy fallthrough", "exec({ a: 1, b: 2 }, 'p.js', 'a + b')", Expect::Number(3.0)),
    case("nested realm", "iso('1 + 1')", Expect::Number(2.0)),
    case("isolation", "var o = {}; iso('typeof o')", Expect::Text("undefined")),
    case("nested failure", "iso('throw 1'); 'alive'", Expect::Text("alive")),
    case("ticks", "ticks() >= 0", Expect::Bool(true)),
    case(
        "poll",
        "var e = poll(); e === undefined || typeof e === 'number'",
        Expect::Bool(true),
    ),
    case("undefined completion", "var x = 1;", Expect::Undefined),
    case(
        "termination",
        "schedule(realm(), 'kill(realm())'); while (true) {}",
        Expect::Terminated,
    ),
];

#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct SelfTestReport {
    pub passed: usize,
    pub failed: Vec<&'static str>,
}

impl SelfTestReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

pub(super) fn run(ctx: &KernelContext, tests: &[SelfTest]) -> SelfTestReport {
    let mut report = SelfTestReport::default();
    for test in tests {
        let outcome = ctx.realms.run_nested(test.source, Vec::new());
        let key = alloc::format!("selftest.{}", test.name);
        if test.expect.matches(&outcome) {
            log::info!("selftest {}: ok", test.name);
            ctx.keys.set(&key, "pass");
            report.passed += 1;
        } else {
            log::error!(
                "selftest {}: expected {:?}, got {outcome:?}",
                test.name,
                test.expect
            );
            ctx.keys.set(&key, "fail");
            report.failed.push(test.name);
        }
    }
    log::info!(
        "selftest: {} passed, {} failed",
        report.passed,
        report.failed.len()
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernel_script::ScriptError;

    #[test]
    fn expectations() {
        assert!(Expect::Number(2.0).matches(&Ok(Transferable::Number(2.0))));
        assert!(!Expect::Number(2.0).matches(&Ok(Transferable::from("2"))));
        assert!(Expect::Text("a").matches(&Ok(Transferable::from("a"))));
        assert!(Expect::Terminated.matches(&Err(RealmError::Script(ScriptError::Terminated))));
        assert!(!Expect::Undefined.matches(&Err(RealmError::NestingTooDeep { limit: 1 })));
    }

    #[test]
    fn names_are_unique() {
        for (i, a) in SELF_TESTS.iter().enumerate() {
            assert!(SELF_TESTS[i + 1..].iter().all(|b| b.name != a.name), "{}", a.name);
        }
    }
}
