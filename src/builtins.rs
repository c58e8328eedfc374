//! The builtin native library bound into every interpreter at construction:
//! the predefined `null`/`true`/`false`, the arithmetic and comparison
//! operators (operator symbols resolve through the top-level scope like any
//! other name), `error`, and the `printf`/`sprintf` pair.

use std::io::Write;
use std::rc::Rc;

use crate::interpreter::env::Frame;
use crate::interpreter::error::{ExecError, ExecErrorKind};
use crate::interpreter::value::Value;
use crate::interpreter::{Interp, Output};
use crate::token::SrcLoc;

pub(crate) fn install(interp: &mut Interp, out: Output) {
    interp.bind("null", Value::Null);
    interp.bind("true", Value::Bool(true));
    interp.bind("false", Value::Bool(false));

    interp.bind("==", Value::native(native_equals));
    interp.bind("!=", Value::native(native_not_equals));
    interp.bind("+", Value::native(native_add));
    interp.bind("-", Value::native(native_sub));
    interp.bind("*", Value::native(native_mul));
    interp.bind("/", Value::native(native_div));
    interp.bind("%", Value::native(native_mod));
    interp.bind("^", Value::native(native_pow));
    interp.bind("<", Value::native(native_less));
    interp.bind(">", Value::native(native_greater));
    interp.bind("<=", Value::native(native_less_equal));
    interp.bind(">=", Value::native(native_greater_equal));
    interp.bind("!", Value::native(native_not));
    interp.bind("error", Value::native(native_error));
    interp.bind(
        "printf",
        Value::native(move |args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc| {
            let text = format_args_text(args, loc)?;
            out.borrow_mut()
                .write_all(text.as_bytes())
                .map_err(|error| ExecError::message(loc, format!("printf: {error}")))?;
            Ok(Value::Number(text.len() as f64))
        }),
    );
    interp.bind(
        "sprintf",
        Value::native(|args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc| {
            Ok(Value::string(format_args_text(args, loc)?))
        }),
    );
}

fn two_numbers(args: &[Value], loc: &SrcLoc) -> Result<(f64, f64), ExecError> {
    if args.len() != 2 {
        return Err(ExecError::message(loc, "2 arguments required"));
    }
    Ok((args[0].as_number(loc)?, args[1].as_number(loc)?))
}

fn native_equals(args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc) -> Result<Value, ExecError> {
    if args.len() != 2 {
        return Err(ExecError::message(loc, "2 arguments required"));
    }
    Ok(Value::Bool(args[0].equals(&args[1])))
}

fn native_not_equals(args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc) -> Result<Value, ExecError> {
    if args.len() != 2 {
        return Err(ExecError::message(loc, "2 arguments required"));
    }
    Ok(Value::Bool(!args[0].equals(&args[1])))
}

fn native_add(args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc) -> Result<Value, ExecError> {
    let (x, y) = two_numbers(args, loc)?;
    Ok(Value::Number(x + y))
}

// `-` is both binary subtraction and unary negation.
fn native_sub(args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc) -> Result<Value, ExecError> {
    if args.len() == 1 {
        let x = args[0].as_number(loc)?;
        return Ok(Value::Number(-x));
    }
    let (x, y) = two_numbers(args, loc)?;
    Ok(Value::Number(x - y))
}

fn native_mul(args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc) -> Result<Value, ExecError> {
    let (x, y) = two_numbers(args, loc)?;
    Ok(Value::Number(x * y))
}

fn native_div(args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc) -> Result<Value, ExecError> {
    let (x, y) = two_numbers(args, loc)?;
    Ok(Value::Number(x / y))
}

fn native_mod(args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc) -> Result<Value, ExecError> {
    let (x, y) = two_numbers(args, loc)?;
    Ok(Value::Number(x % y))
}

fn native_pow(args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc) -> Result<Value, ExecError> {
    let (x, y) = two_numbers(args, loc)?;
    Ok(Value::Number(x.powf(y)))
}

fn native_less(args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc) -> Result<Value, ExecError> {
    let (x, y) = two_numbers(args, loc)?;
    Ok(Value::Bool(x < y))
}

fn native_greater(args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc) -> Result<Value, ExecError> {
    let (x, y) = two_numbers(args, loc)?;
    Ok(Value::Bool(x > y))
}

fn native_less_equal(args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc) -> Result<Value, ExecError> {
    let (x, y) = two_numbers(args, loc)?;
    Ok(Value::Bool(x <= y))
}

fn native_greater_equal(
    args: &[Value],
    _env: &Rc<Frame>,
    loc: &SrcLoc,
) -> Result<Value, ExecError> {
    let (x, y) = two_numbers(args, loc)?;
    Ok(Value::Bool(x >= y))
}

fn native_not(args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc) -> Result<Value, ExecError> {
    if args.len() != 1 {
        return Err(ExecError::message(loc, "1 argument required"));
    }
    Ok(Value::Bool(!args[0].is_truthy()))
}

/// `error()` raises a plain error; `error(v)` raises a user exception
/// carrying `v`, retrievable by the host.
fn native_error(args: &[Value], _env: &Rc<Frame>, loc: &SrcLoc) -> Result<Value, ExecError> {
    match args.first() {
        None => Err(ExecError::message(loc, "error")),
        Some(value) => Err(ExecError::new(loc, ExecErrorKind::Exception(value.clone()))),
    }
}

// Shared formatting engine for printf/sprintf. `%%` lands in the output
// buffer like any other character.
fn format_args_text(args: &[Value], loc: &SrcLoc) -> Result<String, ExecError> {
    let Some(first) = args.first() else {
        return Ok(String::new());
    };
    let Value::Str(format) = first else {
        return Err(ExecError::message(loc, "argument 1 must be string"));
    };

    fn take_arg<'a>(
        args: &'a [Value],
        next_arg: &mut usize,
        loc: &SrcLoc,
    ) -> Result<&'a Value, ExecError> {
        let arg = args
            .get(*next_arg)
            .ok_or_else(|| ExecError::message(loc, "not enough arguments"))?;
        *next_arg += 1;
        Ok(arg)
    }

    let mut out = String::new();
    let mut next_arg = 1;

    let mut chars = format.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        let Some(spec) = chars.next() else {
            return Err(ExecError::message(loc, "invalid format specifier: '%'"));
        };
        match spec {
            '%' => out.push('%'),
            's' => {
                let arg = take_arg(args, &mut next_arg, loc)?;
                match arg {
                    Value::Str(text) => out.push_str(text),
                    other => out.push_str(&other.to_string()),
                }
            }
            'd' => {
                let num = take_arg(args, &mut next_arg, loc)?.as_int(loc)?;
                out.push_str(&num.to_string());
            }
            'f' => {
                let num = take_arg(args, &mut next_arg, loc)?.as_number(loc)?;
                out.push_str(&format!("{num:.6}"));
            }
            'g' => {
                let num = take_arg(args, &mut next_arg, loc)?.as_number(loc)?;
                out.push_str(&num.to_string());
            }
            other => {
                return Err(ExecError::message(
                    loc,
                    format!("invalid format specifier: '%{other}'"),
                ));
            }
        }
    }
    Ok(out)
}
