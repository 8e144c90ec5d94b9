use std::{cell::RefCell, rc::Rc};

use pretty_assertions::assert_eq;
use treelox::{
    config::Config,
    lox::{Lox, LoxError},
    tree_walk_interpreter::{ExecutionError, Interpreter},
};

fn test_valid_program(source: &str, expected_output: &str) {
    let tokens = treelox::tokenizer::tokens(source).expect("Tokenize should work on valid program");
    let program =
        treelox::parser::program(&tokens, false).expect("Parse should work on valid program");
    let output = Rc::new(RefCell::new(Vec::new()));
    let mut interpreter = Interpreter::new(output.clone());
    interpreter
        .interpret(&program)
        .expect("Interpret should work on valid program");
    let output = String::from_utf8(output.take()).expect("Output should be valid UTF-8");
    assert_eq!(output, expected_output);
}

fn run_failing_program(source: &str) -> (LoxError, String) {
    let output = Rc::new(RefCell::new(Vec::new()));
    let mut lox = Lox::with_output(Config::default(), output.clone());
    let error = lox
        .run(source)
        .expect_err("Run should fail on invalid program");
    let output = String::from_utf8(output.take()).expect("Output should be valid UTF-8");
    (error, output)
}

#[test]
fn test_print_sum() {
    test_valid_program("print 1 + 2;", "3\n");
}

#[test]
fn test_string_equality() {
    test_valid_program("print \"a\" == \"a\";", "true\n");
}

#[test]
fn test_reassignment() {
    test_valid_program("var a = 1; a = 2; print a;", "2\n");
}

#[test]
fn test_scopes() {
    let source = r#"
    var a = "global a";
    var b = "global b";
    var c = "global c";
    {
        var a = "outer a";
        var b = "outer b";
        {
            var a = "inner a";
            print a;
            print b;
            print c;
        }
        print a;
        print b;
        print c;
    }
    print a;
    print b;
    print c;
    "#;
    let expected_output = "'inner a'\n'outer b'\n'global c'\n\
                           'outer a'\n'outer b'\n'global c'\n\
                           'global a'\n'global b'\n'global c'\n";
    test_valid_program(source, expected_output);
}

#[test]
fn test_assignment_reaches_enclosing_scope() {
    let source = r#"
    var count = 0;
    {
        count = count + 1;
        {
            count = count + 1;
        }
    }
    print count;
    "#;
    test_valid_program(source, "2\n");
}

#[test]
fn test_nested_if_else() {
    let source = r#"
    var score = 72;
    var grade;
    if (score >= 90) grade = "A";
    else if (score >= 70) {
        grade = "C";
        if (score > 75) grade = "C+";
    } else grade = "F";
    print grade;
    "#;
    test_valid_program(source, "'C'\n");
}

#[test]
fn test_comments_and_multiline_strings() {
    let source = "/* block\ncomment */ print \"two\nlines\"; // trailing\nprint 0.5 * 3;";
    test_valid_program(source, "'two\nlines'\n1.5\n");
}

#[test]
fn test_redeclaration_in_same_scope() {
    test_valid_program("var a = 1; var a = a + 1; print a;", "2\n");
}

#[test]
fn test_division_by_zero_exit_code() {
    let (error, output) = run_failing_program("1/0;");
    assert_eq!(error.exit_code(), 70);
    assert!(matches!(
        error,
        LoxError::Execution(ExecutionError::Runtime(_))
    ));
    assert_eq!(error.to_string(), "[line 1] Division by Zero is not allowed");
    assert_eq!(output, "");
}

#[test]
fn test_uninitialized_variable() {
    let (error, _) = run_failing_program("var x;\n{\n  print x;\n}");
    assert_eq!(error.to_string(), "[line 3] Uninitialized variable 'x'");
}

#[test]
fn test_two_parse_errors() {
    let (error, output) = run_failing_program("print 1 +;\nvar 2 = 3;\nprint \"never\";");
    assert_eq!(error.exit_code(), 65);
    let LoxError::Parse(errors) = &error else {
        panic!("expected parse errors, got {error:?}");
    };
    assert_eq!(errors.len(), 2);
    assert_eq!(
        error.to_string(),
        "[line 1] Error at ';': Expect expression.\n\
         [line 2] Error at '2': Expect variable name"
    );
    assert_eq!(output, "");
}

#[test]
fn test_scan_error_exit_code() {
    let (error, _) = run_failing_program("print \"unterminated;");
    assert_eq!(error.exit_code(), 65);
    assert!(matches!(error, LoxError::Tokenize(_)));
}

#[test]
fn test_print_string_and_number() {
    test_valid_program("print 579; print \"string\";", "579\n'string'\n");
}

#[test]
fn test_broken_statement_in_block_reports_once() {
    let (error, output) = run_failing_program("{ print ; print 1; }\nprint 2;");
    assert_eq!(error.to_string(), "[line 1] Error at ';': Expect expression.");
    assert_eq!(output, "");
}
