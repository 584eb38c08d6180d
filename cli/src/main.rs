//! `form-schema`: normalize, inspect, and validate form schemas from the
//! command line.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use form_schema_core::{FormSchema, extract_defaults, flatten, parse_schema};
use form_schema_engine::validate_submission;
use serde_json::Value;

#[derive(Debug, Parser)]
#[command(name = "form-schema")]
#[command(about = "Normalize, inspect, and validate declarative form schemas")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parse a schema document and print its normalized form.
    Normalize(NormalizeArgs),
    /// Print the initial submission values for a schema.
    Defaults(SchemaArgs),
    /// List the data-bearing components of a schema in order.
    Flatten(SchemaArgs),
    /// Validate a submission data file against a schema.
    Validate(ValidateArgs),
}

#[derive(Debug, Args)]
struct NormalizeArgs {
    /// Schema JSON file.
    schema: PathBuf,
    /// Pretty-print the output.
    #[arg(long)]
    pretty: bool,
}

#[derive(Debug, Args)]
struct SchemaArgs {
    /// Schema JSON file.
    schema: PathBuf,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    /// Schema JSON file.
    schema: PathBuf,
    /// Submission data JSON file (a flat key-to-value object).
    #[arg(long)]
    data: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let outcome = match cli.command {
        Command::Normalize(args) => run_normalize(&args),
        Command::Defaults(args) => run_defaults(&args),
        Command::Flatten(args) => run_flatten(&args),
        Command::Validate(args) => run_validate(&args),
    };

    match outcome {
        Ok(code) => code,
        Err(message) => {
            eprintln!("error: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run_normalize(args: &NormalizeArgs) -> Result<ExitCode, String> {
    let schema = load_schema(&args.schema)?;
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&schema)
    } else {
        serde_json::to_string(&schema)
    }
    .map_err(|error| format!("failed to serialize schema: {error}"))?;
    println!("{rendered}");
    Ok(ExitCode::SUCCESS)
}

fn run_defaults(args: &SchemaArgs) -> Result<ExitCode, String> {
    let schema = load_schema(&args.schema)?;
    let defaults = extract_defaults(&schema.components);
    let rendered = serde_json::to_string_pretty(&defaults)
        .map_err(|error| format!("failed to serialize defaults: {error}"))?;
    println!("{rendered}");
    Ok(ExitCode::SUCCESS)
}

fn run_flatten(args: &SchemaArgs) -> Result<ExitCode, String> {
    let schema = load_schema(&args.schema)?;
    for component in flatten(&schema.components) {
        println!(
            "{}\t{}\t{}",
            component.key,
            component.component_type,
            component.display_label()
        );
    }
    Ok(ExitCode::SUCCESS)
}

fn run_validate(args: &ValidateArgs) -> Result<ExitCode, String> {
    let schema = load_schema(&args.schema)?;
    let data = load_json(&args.data)?;
    let data = data
        .as_object()
        .cloned()
        .ok_or_else(|| format!("{}: submission data must be a JSON object", args.data.display()))?;

    let errors = validate_submission(&schema, &data);
    let rendered = serde_json::to_string_pretty(&errors)
        .map_err(|error| format!("failed to serialize errors: {error}"))?;
    println!("{rendered}");

    if errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

fn load_schema(path: &Path) -> Result<FormSchema, String> {
    Ok(parse_schema(&load_json(path)?))
}

fn load_json(path: &Path) -> Result<Value, String> {
    let text = fs::read_to_string(path)
        .map_err(|error| format!("{}: {error}", path.display()))?;
    serde_json::from_str(&text).map_err(|error| format!("{}: {error}", path.display()))
}
