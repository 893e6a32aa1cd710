//! Embedding API: parser JSON, persistent globals and error recovery

use cwalk_runtime::ast::build::*;
use cwalk_runtime::{
    run, run_with_config, EvalError, EvaluatorConfig, Runtime, RuntimeError, Span, Value,
};
use pretty_assertions::assert_eq;

/// int square(int n) { return n * n; }
/// int main() { int x = 3.9; putchar(65); return square(x); }
const MAIN_PROGRAM: &str = r#"{
  "type": "Program",
  "body": [
    {
      "type": "FunctionDeclaration",
      "id": {
        "type": "MemberExpression",
        "object": { "type": "Identifier", "name": "square" },
        "property": { "type": "TypeTag", "name": "int" },
        "computed": false
      },
      "params": [
        {
          "type": "MemberExpression",
          "object": { "type": "Identifier", "name": "n" },
          "property": { "type": "TypeTag", "name": "int" },
          "computed": false
        }
      ],
      "body": {
        "type": "BlockStatement",
        "body": [
          {
            "type": "ReturnStatement",
            "argument": {
              "type": "BinaryExpression",
              "operator": "*",
              "left": { "type": "Identifier", "name": "n" },
              "right": { "type": "Identifier", "name": "n" }
            }
          }
        ]
      },
      "loc": { "line": 1, "column": 0 }
    },
    {
      "type": "FunctionDeclaration",
      "id": {
        "type": "MemberExpression",
        "object": { "type": "Identifier", "name": "main" },
        "property": { "type": "TypeTag", "name": "int" },
        "computed": false
      },
      "params": [],
      "body": {
        "type": "BlockStatement",
        "body": [
          {
            "type": "VariableDeclaration",
            "declarations": [
              {
                "id": {
                  "type": "MemberExpression",
                  "object": { "type": "Identifier", "name": "x" },
                  "property": { "type": "TypeTag", "name": "int" },
                  "computed": false
                },
                "init": { "type": "Literal", "value": 3.9 }
              }
            ]
          },
          {
            "type": "ExpressionStatement",
            "expression": {
              "type": "CallExpression",
              "callee": { "type": "Identifier", "name": "putchar" },
              "arguments": [{ "type": "Literal", "value": 65 }]
            }
          },
          {
            "type": "ReturnStatement",
            "argument": {
              "type": "CallExpression",
              "callee": { "type": "Identifier", "name": "square" },
              "arguments": [{ "type": "Identifier", "name": "x" }]
            }
          }
        ]
      },
      "loc": { "line": 2, "column": 0 }
    }
  ]
}"#;

#[test]
fn test_json_program_runs_entry_point() {
    let runtime = Runtime::new();
    assert_eq!(runtime.eval_json(MAIN_PROGRAM).unwrap(), Value::Number(9.0));
    assert_eq!(runtime.take_output(), "A");
    assert_eq!(runtime.take_output(), "");
}

#[test]
fn test_json_error_carries_location() {
    let json = r#"{
      "type": "Program",
      "body": [
        {
          "type": "ExpressionStatement",
          "expression": { "type": "Identifier", "name": "nope", "loc": { "line": 3, "column": 4 } }
        }
      ]
    }"#;
    let runtime = Runtime::new();
    match runtime.eval_json(json) {
        Err(EvalError::Runtime(error)) => {
            assert!(matches!(&error, RuntimeError::UndefinedVariable { name, .. } if name == "nope"));
            assert_eq!(error.span(), Some(Span::new(3, 4)));
        }
        other => panic!("Expected a runtime error, got {:?}", other),
    }
}

#[test]
fn test_malformed_json_is_invalid_tree() {
    let runtime = Runtime::new();
    let err = runtime
        .eval_json(r#"{"type": "Program", "body": [{"type": "GotoStatement"}]}"#)
        .unwrap_err();
    assert!(matches!(err, EvalError::InvalidTree(_)));
    assert!(err.to_string().starts_with("Invalid syntax tree"));
    // Nothing ran, nothing recorded
    assert!(runtime.errors().is_empty());
}

// ============================================================================
// Persistence and recovery
// ============================================================================

#[test]
fn test_globals_persist_across_evaluations() {
    let runtime = Runtime::with_config(EvaluatorConfig::default().without_entry_point());
    runtime
        .eval(&program(vec![
            var("int", "counter", Some(num(1.0))),
            func("int", "bump", &[], vec![ret(Some(assign(
                cwalk_runtime::ast::AssignOp::AddAssign,
                ident("counter"),
                num(1.0),
            )))]),
        ]))
        .unwrap();
    runtime.eval(&program(vec![expr(call("bump", vec![]))])).unwrap();
    let result = runtime.eval(&program(vec![expr(call("bump", vec![]))]));
    assert_eq!(result, Ok(Value::Number(3.0)));
}

#[test]
fn test_runtime_recovers_after_error() {
    let runtime = Runtime::new();
    let err = runtime
        .eval(&program(vec![
            var("int", "kept", Some(num(5.0))),
            func("void", "deep", &[], vec![block(vec![expr(ident("missing"))])]),
            expr(call("deep", vec![])),
        ]))
        .unwrap_err();
    assert!(matches!(err, RuntimeError::UndefinedVariable { .. }));

    runtime.inspect(|state| {
        assert_eq!(state.depth(), state.outer_environment_count());
        assert!(state.call_boundaries().is_empty());
        assert_eq!(state.node_depth(), 0);
    });

    // Globals declared before the failure survive; the next run is clean
    let result = runtime.eval(&program(vec![expr(ident("kept"))]));
    assert_eq!(result, Ok(Value::Number(5.0)));
    assert_eq!(runtime.errors().len(), 1);
}

#[test]
fn test_errors_accumulate_in_order() {
    let runtime = Runtime::new();
    let _ = runtime.eval(&program(vec![expr(bin(
        cwalk_runtime::ast::BinaryOp::Div,
        num(1.0),
        num(0.0),
    ))]));
    let _ = runtime.eval(&program(vec![brk()]));
    let errors = runtime.errors();
    assert_eq!(errors.len(), 2);
    assert!(matches!(errors[0], RuntimeError::DivideByZero { .. }));
    assert!(matches!(errors[1], RuntimeError::JumpOutsideLoop { .. }));
}

#[test]
fn test_run_helpers() {
    let (value, errors) = run(&program(vec![expr(num(4.0))]));
    assert_eq!(value, Some(Value::Number(4.0)));
    assert!(errors.is_empty());

    let config = EvaluatorConfig::default().with_max_steps(5);
    let (value, errors) = run_with_config(
        &program(vec![while_(boolean(true), block(vec![]))]),
        config,
    );
    assert_eq!(value, None);
    assert_eq!(errors, vec![RuntimeError::StepLimitExceeded { limit: 5 }]);
}

#[test]
fn test_entry_point_defined_by_earlier_program_not_rerun() {
    let runtime = Runtime::new();
    runtime
        .eval(&program(vec![func("int", "main", &[], vec![ret(Some(num(1.0)))])]))
        .unwrap();
    // This program does not declare `main`, so only its own tail counts
    let result = runtime.eval(&program(vec![expr(num(2.0))]));
    assert_eq!(result, Ok(Value::Number(2.0)));
}

#[test]
fn test_runtime_from_directory_reads_project_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("cwalk.toml"),
        "[evaluator]\nmax_call_depth = 4\n",
    )
    .unwrap();
    let nested = dir.path().join("src");
    std::fs::create_dir(&nested).unwrap();

    let runtime = Runtime::from_directory(&nested).unwrap();
    let err = runtime
        .eval(&program(vec![
            func("int", "f", &[], vec![ret(Some(call("f", vec![])))]),
            expr(call("f", vec![])),
        ]))
        .unwrap_err();
    assert_eq!(err, RuntimeError::StackOverflow { limit: 4, span: None });
}

#[test]
fn test_runtime_from_directory_rejects_bad_config() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("cwalk.toml"), "[evaluator]\nmax_call_depth = 0\n").unwrap();
    assert!(Runtime::from_directory(dir.path()).is_err());
}
