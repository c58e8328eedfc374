use std::process::exit;

use anyhow::{Context, Result};
use glim::{Interp, Value};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let path = args
        .next()
        .context("usage: glim FILE [ARGS...]")?;
    let script_args: Vec<Value> = args.map(|arg| Value::string(arg)).collect();

    let mut interp = Interp::new();
    if let Err(error) = interp.parse_file(&path) {
        println!("{error}");
        exit(1);
    }

    if let Err(error) = interp.call("main", &script_args) {
        println!("{error}");
        exit(1);
    }
    Ok(())
}
