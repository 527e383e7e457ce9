//! Runs a type-checked ASL program from its serialized AST.
//!
//! The parser and type checker live upstream; this binary consumes their
//! JSON output, runs `main` on the native backend and prints the result.
//!
//! Usage: `asli <program.json> [--unroll N] [--v0] [--trace]`

use std::{env, fs, process::ExitCode, time::Instant};

use asli::{
    AslVersion, Backend, Config, NativeBackend, NoopTracer, RecordingTracer, StdPrint, ast::Program, run_with,
};

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let mut file_path: Option<&str> = None;
    let mut config = Config::default();
    let mut trace = false;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--unroll" => {
                let Some(value) = iter.next().and_then(|v| v.parse::<usize>().ok()).filter(|n| *n > 0) else {
                    eprintln!("error: --unroll expects a positive integer");
                    return ExitCode::FAILURE;
                };
                config.unroll = value;
            }
            "--v0" => config.version = AslVersion::V0,
            "--trace" => trace = true,
            path if file_path.is_none() => file_path = Some(path),
            unexpected => {
                eprintln!("error: unexpected argument {unexpected}");
                return ExitCode::FAILURE;
            }
        }
    }
    let Some(file_path) = file_path else {
        eprintln!("usage: asli <program.json> [--unroll N] [--v0] [--trace]");
        return ExitCode::FAILURE;
    };

    let source = match fs::read_to_string(file_path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read {file_path}: {err}");
            return ExitCode::FAILURE;
        }
    };
    let program: Program = match serde_json::from_str(&source) {
        Ok(program) => program,
        Err(err) => {
            eprintln!("error: {file_path} is not a serialized program: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut backend = NativeBackend::new();
    let start = Instant::now();
    let result = if trace {
        let mut tracer = RecordingTracer::new();
        let result = run_with(&program, &mut backend, &config, vec![], &mut StdPrint, &mut tracer);
        for rule in tracer.rules() {
            eprintln!("{rule}");
        }
        result
    } else {
        run_with(&program, &mut backend, &config, vec![], &mut StdPrint, &mut NoopTracer)
    };
    let elapsed = start.elapsed();

    match result {
        Ok(value) => {
            eprintln!("success after {elapsed:?}");
            println!("{}", backend.debug_value(&value));
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error after {elapsed:?}\n{err}");
            ExitCode::FAILURE
        }
    }
}
