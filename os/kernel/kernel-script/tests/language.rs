use kernel_script::{Isolate, IsolateConfig, ScriptError, Value};

fn eval(source: &str) -> Value {
    let mut isolate = Isolate::new(IsolateConfig::default());
    let context = isolate.new_context();
    isolate
        .execute(&context, source, "test.js")
        .unwrap_or_else(|e| panic!("script failed: {e}"))
}

fn eval_string(source: &str) -> String {
    let mut isolate = Isolate::new(IsolateConfig::default());
    let context = isolate.new_context();
    let value = isolate
        .execute(&context, source, "test.js")
        .unwrap_or_else(|e| panic!("script failed: {e}"));
    isolate.coerce_string(&value).to_string()
}

fn number(source: &str) -> f64 {
    match eval(source) {
        Value::Number(n) => n,
        other => panic!("expected a number, got {other:?}"),
    }
}

#[test]
fn completion_value_is_last_expression() {
    assert_eq!(number("1 + 1"), 2.0);
    assert_eq!(number("var a = 3; a * 4; var b = 1;"), 12.0);
    assert!(matches!(eval("var x = 1;"), Value::Undefined));
}

#[test]
fn closures_capture_their_scope() {
    let source = "
        function counter() {
            var n = 0;
            return function () { n += 1; return n; };
        }
        var c = counter();
        c(); c();
        var d = counter();
        d();
        c() * 10 + d()
    ";
    assert_eq!(number(source), 32.0);
}

#[test]
fn hoisted_functions_and_recursion() {
    assert_eq!(number("fib(10); function fib(n) { return n < 2 ? n : fib(n - 1) + fib(n - 2); }"), 55.0);
}

#[test]
fn loops_with_break_and_continue() {
    let source = "
        var total = 0;
        for (var i = 0; i < 10; i++) {
            if (i % 2) continue;
            if (i > 6) break;
            total += i;
        }
        var j = 0;
        while (true) { if (++j == 5) break; }
        total * 100 + j
    ";
    assert_eq!(number(source), 1205.0);
}

#[test]
fn string_and_array_operations() {
    assert_eq!(eval_string("'a' + 1 + 2"), "a12");
    assert_eq!(eval_string("[1, 2, 3].join('-')"), "1-2-3");
    assert_eq!(eval_string("var a = []; a.push(1); a.push(2, 3); a.length + ':' + a"), "3:1,2,3");
    assert_eq!(eval_string("'hello'.slice(1, -1).toUpperCase()"), "ELL");
    assert_eq!(eval_string("'a,b,c'.split(',').map(function (s) { return s + s; })"), "aa,bb,cc");
    assert_eq!(eval_string("(255).toString(16)"), "ff");
    assert_eq!(number("'ABC'.charCodeAt(1)"), 66.0);
    assert_eq!(number("[5, 6, 7].indexOf(7)"), 2.0);
}

#[test]
fn objects_and_indexing() {
    let source = "
        var o = { a: 1, 'b': { c: [10, 20] } };
        o.d = o.a + o.b.c[1];
        o['e'] = typeof o.missing;
        o.d + o.e
    ";
    assert_eq!(eval_string(source), "21undefined");
}

#[test]
fn operators_follow_script_semantics() {
    assert_eq!(number("7 % 3 + (-7 % 3)"), 0.0);
    assert_eq!(number("1 << 4 | 1"), 17.0);
    assert_eq!(number("-1 >>> 28"), 15.0);
    assert!(matches!(eval("null == undefined && 1 == '1' && 1 !== '1'"), Value::Bool(true)));
    assert!(matches!(eval("'b' > 'a' && 10 > 9 && !('10' < '9')"), Value::Bool(false)));
    assert_eq!(eval_string("typeof function () {} + ' ' + typeof null"), "function object");
}

#[test]
fn syntax_errors_are_reported_with_position() {
    let mut isolate = Isolate::new(IsolateConfig::default());
    let context = isolate.new_context();
    let err = isolate
        .execute(&context, "var a = 1;\nvar = 2;\n", "bad.js")
        .unwrap_err();
    let ScriptError::Compile(failure) = &err else {
        panic!("expected compile error, got {err:?}");
    };
    let location = failure.location.as_ref().unwrap();
    assert_eq!(&*location.file, "bad.js");
    assert_eq!(location.line, 2);
    assert_eq!(location.source_line, "var = 2;");
    assert!(failure.message.starts_with("SyntaxError: unexpected '='"));
}

#[test]
fn long_operator_chains_are_syntax_errors() {
    // Same stack the kernel gives its boot core.
    let worker = std::thread::Builder::new()
        .stack_size(2 << 20)
        .spawn(|| {
            let mut isolate = Isolate::new(IsolateConfig::default());
            let context = isolate.new_context();
            let source = format!("1{}", "+1".repeat(10_000));
            let err = isolate.execute(&context, &source, "chain.js").unwrap_err();
            let ScriptError::Compile(failure) = &err else {
                panic!("expected compile error, got {err:?}");
            };
            assert_eq!(failure.message, "SyntaxError: nesting too deep");

            let short = format!("1{}", "+1".repeat(40));
            assert!(matches!(isolate.execute(&context, &short, "short.js"), Ok(Value::Number(n)) if n == 41.0));
        })
        .unwrap();
    worker.join().unwrap();
}

#[test]
fn typeof_null_is_object() {
    assert_eq!(eval_string("typeof null"), "object");
    assert_eq!(eval_string("var f = function () {}; typeof f"), "function");
    assert_eq!(eval_string("typeof {}"), "object");
}

#[test]
fn uncaught_errors_carry_a_stack_trace() {
    let mut isolate = Isolate::new(IsolateConfig::default());
    let context = isolate.new_context();
    let source = "function inner() {\n  missing();\n}\nfunction outer() { inner(); }\nouter();\n";
    let err = isolate.execute(&context, source, "trace.js").unwrap_err();
    let failure = err.failure().unwrap();
    assert_eq!(failure.message, "Uncaught ReferenceError: missing is not defined");

    let location = failure.location.as_ref().unwrap();
    assert_eq!((location.line, location.column_start, location.column_end), (2, 2, 9));

    let functions: Vec<Option<&str>> = failure.stack.iter().map(|f| f.function.as_deref()).collect();
    assert_eq!(functions, [Some("inner"), Some("outer"), None]);
    assert_eq!(failure.stack[2].line, 5);

    let report = err.to_string();
    assert!(report.starts_with("trace.js:2: Uncaught ReferenceError: missing is not defined\n  missing();\n  ^^^^^^^"));
    assert!(report.contains("\n    at outer (trace.js:4:20)"));
}

#[test]
fn thrown_values_are_described() {
    let mut isolate = Isolate::new(IsolateConfig::default());
    let context = isolate.new_context();
    let err = isolate
        .execute(&context, "throw { name: 'Oops', message: 'it broke' };", "t.js")
        .unwrap_err();
    assert_eq!(err.failure().unwrap().message, "Uncaught Oops: it broke");

    let err = isolate.execute(&context, "throw 42", "t.js").unwrap_err();
    assert_eq!(err.failure().unwrap().message, "Uncaught 42");
}

#[test]
fn calling_a_non_function_is_a_type_error() {
    let mut isolate = Isolate::new(IsolateConfig::default());
    let context = isolate.new_context();
    let err = isolate.execute(&context, "var o = {}; o.nope(1);", "t.js").unwrap_err();
    assert_eq!(err.failure().unwrap().message, "Uncaught TypeError: o.nope is not a function");
    let err = isolate.execute(&context, "undefined.x", "t.js").unwrap_err();
    assert_eq!(
        err.failure().unwrap().message,
        "Uncaught TypeError: Cannot read properties of undefined (reading 'x')"
    );
}

#[test]
fn runaway_recursion_is_a_range_error() {
    let config = IsolateConfig {
        max_call_depth: 16,
        ..IsolateConfig::default()
    };
    let mut isolate = Isolate::new(config);
    let context = isolate.new_context();
    let err = isolate
        .execute(&context, "function f() { return f(); } f();", "deep.js")
        .unwrap_err();
    assert_eq!(err.failure().unwrap().message, "Uncaught RangeError: Maximum call stack size exceeded");
}

#[test]
fn object_budget_is_enforced() {
    let config = IsolateConfig {
        max_objects: 32,
        ..IsolateConfig::default()
    };
    let mut isolate = Isolate::new(config);
    let context = isolate.new_context();
    let err = isolate
        .execute(&context, "var keep = []; while (true) keep.push({});", "oom.js")
        .unwrap_err();
    assert!(err.failure().unwrap().message.starts_with("Uncaught RangeError: heap budget exhausted"));
}
