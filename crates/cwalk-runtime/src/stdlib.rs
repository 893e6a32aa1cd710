//! Built-in functions seeded into the global frame
//!
//! Built-ins never touch host I/O: output is appended to the execution
//! state so runs stay deterministic and replayable.

use crate::environment::{Binding, ExecutionState};
use crate::kind::Kind;
use crate::value::{format_number, NativeFunction, RuntimeError, Value};

/// Every built-in function, in registration order
pub const BUILTINS: &[NativeFunction] = &[
    NativeFunction {
        name: "print",
        params: &[Kind::DOUBLE],
        ret: Kind::VOID,
        func: print,
    },
    NativeFunction {
        name: "putchar",
        params: &[Kind::INT],
        ret: Kind::INT,
        func: putchar,
    },
    NativeFunction {
        name: "abs",
        params: &[Kind::INT],
        ret: Kind::INT,
        func: abs,
    },
];

/// Register the built-ins and `NULL` in the global frame
pub fn seed_globals(state: &ExecutionState) {
    let global = state.global();
    for native in BUILTINS {
        global.insert(
            native.name.to_string(),
            Binding {
                kind: native.ret,
                value: Value::Native(*native),
            },
        );
    }
    global.insert(
        "NULL".to_string(),
        Binding {
            kind: Kind::VOID.pointer_to(),
            value: Value::Number(0.0),
        },
    );
}

/// print(x: double): writes `x` and a newline
fn print(args: &[Value], state: &mut ExecutionState) -> Result<Value, RuntimeError> {
    let n = number_arg("print", args)?;
    state.write_output(&format_number(n));
    state.write_output("\n");
    Ok(Value::Void)
}

/// putchar(c: int): writes the character with code `c`, returns `c`
fn putchar(args: &[Value], state: &mut ExecutionState) -> Result<Value, RuntimeError> {
    let code = number_arg("putchar", args)?;
    let ch = u32::try_from(code as i64)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| {
            RuntimeError::type_error(format!("putchar: {code} is not a character code"), None)
        })?;
    let mut buf = [0u8; 4];
    state.write_output(ch.encode_utf8(&mut buf));
    Ok(Value::Number(code))
}

fn abs(args: &[Value], _state: &mut ExecutionState) -> Result<Value, RuntimeError> {
    Ok(Value::Number(number_arg("abs", args)?.abs()))
}

fn number_arg(name: &str, args: &[Value]) -> Result<f64, RuntimeError> {
    match args {
        [value] => value.as_number().ok_or_else(|| {
            RuntimeError::type_error(
                format!("{name}() expects a number, found {}", value.type_name()),
                None,
            )
        }),
        _ => Err(RuntimeError::ArityMismatch {
            name: name.to_string(),
            expected: 1,
            received: args.len(),
            span: None,
        }),
    }
}
