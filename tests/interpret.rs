//! End-to-end scenarios run through the public `Vm::interpret` entry
//! point, driving the whole lex -> read -> compile -> execute pipeline
//! the way an embedder would, rather than exercising any one stage in
//! isolation (those live in each module's own `#[cfg(test)]` block).

use std::cell::RefCell;
use std::rc::Rc;

use hololisp::common::error::{DiagnosticKind, Outcome};
use hololisp::{Vm, VmConfig};

fn capture_output() -> (VmConfig, Rc<RefCell<String>>) {
    let out = Rc::new(RefCell::new(String::new()));
    let sink = Rc::clone(&out);
    let config = VmConfig { write_fn: Box::new(move |s| sink.borrow_mut().push_str(s)), error_fn: Box::new(|_| {}), ..VmConfig::default() };
    (config, out)
}

fn run_and_capture(src: &str) -> (Outcome, String) {
    let (config, out) = capture_output();
    let mut vm = Vm::new(config);
    let outcome = vm.interpret(src, "<test>");
    let text = out.borrow().clone();
    (outcome, text)
}

#[test]
fn addition_prints_the_sum() {
    let (outcome, text) = run_and_capture("(print (+ 1 2 3))");
    assert!(outcome.is_ok());
    assert_eq!(text, "6\n");
}

#[test]
fn if_with_a_false_condition_takes_the_else_branch() {
    let (outcome, text) = run_and_capture("(print (if () 1 2))");
    assert!(outcome.is_ok());
    assert_eq!(text, "2\n");
}

#[test]
fn lambda_squares_its_argument() {
    let (outcome, text) = run_and_capture("(print ((lambda (x) (* x x)) 5))");
    assert!(outcome.is_ok());
    assert_eq!(text, "25\n");
}

#[test]
fn recursive_defun_computes_factorial() {
    let src = "(defun fact (n) (if (<= n 1) 1 (* n (fact (- n 1))))) (print (fact 5))";
    let (outcome, text) = run_and_capture(src);
    assert!(outcome.is_ok());
    assert_eq!(text, "120\n");
}

#[test]
fn let_bindings_are_visible_to_the_body() {
    let (outcome, text) = run_and_capture("(let ((a 1) (b 2)) (print (+ a b)))");
    assert!(outcome.is_ok());
    assert_eq!(text, "3\n");
}

#[test]
fn car_of_a_quoted_list_returns_its_first_element() {
    let (outcome, text) = run_and_capture("(print (car (quote (1 2 3))))");
    assert!(outcome.is_ok());
    assert_eq!(text, "1\n");
}

#[test]
fn unclosed_paren_is_a_single_read_error() {
    let mut vm = Vm::new(VmConfig::default());
    match vm.interpret("(", "<test>") {
        Outcome::CompileError(diags) => {
            assert_eq!(diags.len(), 1);
            assert_eq!(diags[0].kind, DiagnosticKind::Read);
        }
        other => panic!("expected CompileError, got {other:?}"),
    }
}

#[test]
fn calling_an_unbound_symbol_is_a_runtime_error() {
    let mut vm = Vm::new(VmConfig::default());
    match vm.interpret("(foo)", "<test>") {
        Outcome::RuntimeError(d) => {
            assert_eq!(d.kind, DiagnosticKind::Runtime);
            assert!(d.message.contains("unbound symbol"));
        }
        other => panic!("expected RuntimeError, got {other:?}"),
    }
}

#[test]
fn adding_a_non_number_is_a_runtime_type_error() {
    let mut vm = Vm::new(VmConfig::default());
    match vm.interpret("(+ 1 ())", "<test>") {
        Outcome::RuntimeError(d) => {
            assert_eq!(d.kind, DiagnosticKind::Runtime);
            assert!(d.message.contains("expected a number"));
        }
        other => panic!("expected RuntimeError, got {other:?}"),
    }
}

#[test]
fn duplicate_let_binding_is_a_single_compile_error() {
    let mut vm = Vm::new(VmConfig::default());
    match vm.interpret("(let ((x 1) (x 2)))", "<test>") {
        Outcome::CompileError(diags) => {
            assert_eq!(diags.len(), 1);
            assert_eq!(diags[0].kind, DiagnosticKind::Compile);
            assert!(diags[0].message.contains("duplicate let binding"));
        }
        other => panic!("expected CompileError, got {other:?}"),
    }
}

#[test]
fn compile_errors_are_collected_across_every_top_level_form() {
    // Three forms: valid, broken, broken again. If `interpret` stopped
    // scanning at the first broken form it would report only the second
    // form's diagnostic; it must report both.
    let src = "(defun ok () 1) (let ((x 1) (x 2)) x) (let ((y 1) (y 2)) y)";
    let mut vm = Vm::new(VmConfig::default());
    match vm.interpret(src, "<test>") {
        Outcome::CompileError(diags) => {
            assert_eq!(diags.len(), 2);
            assert!(diags.iter().all(|d| d.kind == DiagnosticKind::Compile));
            assert!(diags[0].message.contains("duplicate let binding: x"));
            assert!(diags[1].message.contains("duplicate let binding: y"));
        }
        other => panic!("expected CompileError with two diagnostics, got {other:?}"),
    }
}

#[test]
fn multiple_top_level_forms_share_state_across_calls() {
    let (outcome, text) = run_and_capture("(defun double (x) (* x 2)) (print (double 21))");
    assert!(outcome.is_ok());
    assert_eq!(text, "42\n");
}

#[test]
fn while_loop_and_setq_mutate_across_iterations() {
    let src = "(let ((i 0) (acc 0)) (while (< i 5) (setq acc (+ acc i)) (setq i (+ i 1))) (print acc))";
    let (outcome, text) = run_and_capture(src);
    assert!(outcome.is_ok());
    assert_eq!(text, "10\n");
}

#[test]
fn defmacro_runs_its_expansion() {
    let src = "(defmacro unless (c body) (list (quote if) c (quote ()) body)) (print (unless () 42))";
    let (outcome, text) = run_and_capture(src);
    assert!(outcome.is_ok());
    assert_eq!(text, "42\n");
}
