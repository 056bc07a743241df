//! JSON Constraint CLI
//!
//! Command-line interface for checking JSON documents against draft 3/4
//! schemas.

use std::path::Path;
use std::process::ExitCode;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;
use url::Url;

use json_constraint::{
    check_with, compile_with, file_base_uri, is_url, load_document_auto, CheckError, CheckMode,
    CheckOptions, ConfigError, ErrorSet, DEFAULT_MAX_DEPTH,
};

#[derive(Parser)]
#[command(name = "json-constraint")]
#[command(about = "Check JSON documents against JSON Schema (draft 3 / draft 4)")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG wins
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check an instance against a schema
    Check {
        #[command(flatten)]
        sources: Sources,

        /// Use the compiled backend instead of the interpreter
        #[arg(long)]
        compiled: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Compile once and time repeated checks
    Bench {
        #[command(flatten)]
        sources: Sources,

        /// Number of checks to run per backend
        #[arg(long, short = 'n', default_value_t = 1000)]
        iterations: u32,
    },
}

#[derive(Args)]
struct Sources {
    /// Schema source: file path or URL (http:// or https://)
    schema: String,

    /// Instance source: file path or URL (http:// or https://)
    instance: String,

    /// Also treat numeric strings as numbers
    #[arg(long)]
    coerce: bool,

    /// Recursion limit for checking and compilation
    #[arg(long, default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Check {
            sources,
            compiled,
            json,
        } => run_check(&sources, compiled, json),
        Commands::Bench {
            sources,
            iterations,
        } => run_bench(&sources, iterations),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

struct Loaded {
    schema: Value,
    instance: Value,
    options: CheckOptions,
}

fn load(sources: &Sources, json_output: bool) -> Result<Loaded, u8> {
    let schema = load_document_auto(&sources.schema).map_err(|e| {
        report_error(json_output, &format!("loading schema: {}", e));
        e.exit_code() as u8
    })?;
    let instance = load_document_auto(&sources.instance).map_err(|e| {
        report_error(json_output, &format!("loading instance: {}", e));
        e.exit_code() as u8
    })?;

    let mode = if sources.coerce {
        CheckMode::Coerce
    } else {
        CheckMode::Normal
    };
    let mut options = CheckOptions::new().mode(mode).max_depth(sources.max_depth);
    // Relative references resolve against the schema's own location.
    if let Some(base) = schema_base(&sources.schema) {
        tracing::debug!(base = %base, "schema base URI");
        options = options.base_uri(base);
    }

    Ok(Loaded {
        schema,
        instance,
        options,
    })
}

fn schema_base(source: &str) -> Option<Url> {
    if is_url(source) {
        Url::parse(source).ok()
    } else {
        file_base_uri(Path::new(source))
    }
}

fn run_check(sources: &Sources, compiled: bool, json_output: bool) -> Result<(), u8> {
    let Loaded {
        schema,
        instance,
        options,
    } = load(sources, json_output)?;

    let result = if compiled {
        compile_with(&schema, &options).and_then(|plan| plan.check(&instance))
    } else {
        check_with(&instance, &schema, &options)
    };

    match result {
        Ok(errors) if errors.is_valid() => {
            if json_output {
                println!(r#"{{"valid":true}}"#);
            } else {
                println!("Valid");
            }
            Ok(())
        }
        Ok(errors) => {
            report_invalid(json_output, &errors);
            Err(CheckError::Invalid { errors }.exit_code() as u8)
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(CheckError::Config(e).exit_code() as u8)
        }
    }
}

fn run_bench(sources: &Sources, iterations: u32) -> Result<(), u8> {
    let Loaded {
        schema,
        instance,
        options,
    } = load(sources, false)?;
    let iterations = iterations.max(1);

    let fail = |e: ConfigError| {
        report_error(false, &e.to_string());
        CheckError::Config(e).exit_code() as u8
    };

    let started = Instant::now();
    let plan = compile_with(&schema, &options).map_err(fail)?;
    let compile_time = started.elapsed();

    let started = Instant::now();
    let mut errors = 0;
    for _ in 0..iterations {
        errors = plan.check(&instance).map_err(fail)?.len();
    }
    let compiled_time = started.elapsed();

    let started = Instant::now();
    for _ in 0..iterations {
        check_with(&instance, &schema, &options).map_err(fail)?;
    }
    let interpreted_time = started.elapsed();

    println!("compile:     {:>10.3} ms", compile_time.as_secs_f64() * 1e3);
    println!(
        "compiled:    {:>10.3} us/check",
        compiled_time.as_secs_f64() * 1e6 / f64::from(iterations)
    );
    println!(
        "interpreted: {:>10.3} us/check",
        interpreted_time.as_secs_f64() * 1e6 / f64::from(iterations)
    );
    println!("{} checks per backend, {} error(s) per check", iterations, errors);
    Ok(())
}

fn report_invalid(json_output: bool, errors: &ErrorSet) {
    if json_output {
        let output = serde_json::json!({
            "valid": false,
            "errors": errors
        });
        println!("{}", output);
    } else {
        eprintln!("Validation failed:");
        for error in errors {
            eprintln!("  {}", error);
        }
    }
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", serde_json::json!({"valid": false, "error": msg}));
    } else {
        eprintln!("Error: {}", msg);
    }
}
