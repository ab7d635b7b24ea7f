//! Static-semantic error matrix: everything the resolver must reject, and
//! the shadowing patterns it must allow.  Any reported error suppresses
//! execution entirely, which the output assertions below rely on.

use std::cell::RefCell;
use std::io::{self, Write};
use std::rc::Rc;

use loxide::runner::Lox;

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).expect("output is UTF-8")
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

struct Outcome {
    stdout: String,
    stderr: String,
    had_error: bool,
}

fn run(source: &'static str) -> Outcome {
    let out = SharedBuffer::default();
    let err = SharedBuffer::default();
    let mut lox = Lox::with_writers(Box::new(out.clone()), Box::new(err.clone()), false);

    lox.run(source);

    Outcome {
        stdout: out.contents(),
        stderr: err.contents(),
        had_error: lox.had_error(),
    }
}

#[test]
fn redeclaration_in_same_scope_fails() {
    let outcome = run("{ var a = 1; var a = 2; }");

    assert!(outcome.had_error);
    assert!(outcome.stderr.contains("already declared"));
}

#[test]
fn redeclaration_in_nested_scope_shadows_without_error() {
    let outcome = run("{ var a = 1; { var a = 2; print a; } print a; }");

    assert!(!outcome.had_error);
    assert_eq!(outcome.stdout, "2\n1\n");
}

#[test]
fn global_redeclaration_is_allowed() {
    let outcome = run("var a = 1; var a = 2; print a;");

    assert!(!outcome.had_error);
    assert_eq!(outcome.stdout, "2\n");
}

#[test]
fn reading_local_in_its_own_initializer_fails() {
    let outcome = run("var a = 1; { var a = a; }");

    assert!(outcome.had_error);
    assert!(outcome.stderr.contains("its own initializer"));
}

#[test]
fn return_at_top_level_fails() {
    let outcome = run("return 1;");

    assert!(outcome.had_error);
    assert!(outcome.stderr.contains("'return' used outside of function"));
}

#[test]
fn returning_a_value_from_init_fails() {
    let outcome = run("class Foo { init() { return 1; } }");

    assert!(outcome.had_error);
    assert!(outcome
        .stderr
        .contains("Cannot return a value from an initializer"));
}

#[test]
fn bare_return_in_init_is_allowed() {
    let outcome = run("class Foo { init() { return; } } print Foo();");

    assert!(!outcome.had_error);
    assert_eq!(outcome.stdout, "Foo instance\n");
}

#[test]
fn this_outside_a_class_fails() {
    let outcome = run("print this;");

    assert!(outcome.had_error);
    assert!(outcome.stderr.contains("Cannot use 'this' outside of a class"));

    let in_function = run("fun f() { return this; }");
    assert!(in_function.had_error);
}

#[test]
fn static_errors_accumulate_across_the_pass() {
    let outcome = run("return 1;\n{ var a = 1; var a = 2; }\nprint this;");

    assert!(outcome.had_error);
    assert!(outcome.stderr.contains("'return' used outside of function"));
    assert!(outcome.stderr.contains("already declared"));
    assert!(outcome.stderr.contains("outside of a class"));
}

#[test]
fn any_static_error_suppresses_execution() {
    let outcome = run("print \"side effect\"; { var a = 1; var a = 2; }");

    assert!(outcome.had_error);
    assert_eq!(outcome.stdout, "", "resolve errors must suppress execution");
}

#[test]
fn resolver_pins_references_to_their_declaration_scope() {
    // The closure keeps seeing the global `a`, even after a shadowing
    // declaration appears later in the block.
    let outcome = run(concat!(
        "var a = \"global\";\n",
        "{\n",
        "  fun show() { print a; }\n",
        "  show();\n",
        "  var a = \"block\";\n",
        "  show();\n",
        "}\n",
    ));

    assert!(!outcome.had_error);
    assert_eq!(outcome.stdout, "global\nglobal\n");
}
