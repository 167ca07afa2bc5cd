mod dynamic;
mod manifest;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scopeargs_argparse::{BindReport, HelpRequest, Outcome, Outline, ParseResult};
use serde_json::{Value, json};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};

use crate::dynamic::{DynamicCommand, build_outline};
use crate::manifest::{load_manifest, write_default_manifest};

#[derive(Parser)]
#[command(name = "scopeargs", disable_help_subcommand = true)]
#[command(version, about = "Scoped multi-command argument parser", long_about = None)]
struct Cli {
    /// Path to the application declaration (default: ./scopeargs.json)
    #[arg(long, global = true, value_name = "FILE")]
    spec: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a sample scopeargs.json
    Init(InitArgs),

    /// Parse and bind argv, printing the outcome as JSON
    Parse(ArgvArgs),

    /// Render help for argv
    Help(ArgvArgs),

    /// Print the compiled metadata as JSON
    Describe,
}

#[derive(Parser)]
struct InitArgs {
    /// Project directory (default: current directory)
    #[arg(value_name = "DIR")]
    dir: Option<PathBuf>,

    /// Overwrite an existing declaration
    #[arg(long)]
    force: bool,
}

#[derive(Parser)]
struct ArgvArgs {
    /// Arguments for the declared application (pass after `--`)
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    argv: Vec<String>,
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init(args) => init(args),
        Commands::Parse(args) => parse(cli.spec, args),
        Commands::Help(args) => help(cli.spec, args),
        Commands::Describe => describe(cli.spec),
    }
}

fn init(args: InitArgs) -> Result<()> {
    let dir = args.dir.unwrap_or_else(|| PathBuf::from("."));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create directory: {}", dir.display()))?;

    let path = write_default_manifest(&dir, args.force)?;

    eprintln!("Created: {}", path.display());
    eprintln!("\nNext steps:");
    eprintln!("  1. Edit {} to declare your commands", path.display());
    eprintln!("  2. Run: scopeargs describe");
    eprintln!("  3. Run: scopeargs parse -- status -d 2");

    Ok(())
}

fn load_outline(spec: Option<PathBuf>) -> Result<Outline<DynamicCommand>> {
    let loaded = load_manifest(spec.as_deref())?;
    build_outline(&loaded.manifest)
        .with_context(|| format!("invalid declaration: {}", loaded.path.display()))
}

fn parse(spec: Option<PathBuf>, args: ArgvArgs) -> Result<()> {
    let outline = load_outline(spec)?;
    tracing::debug!(argv = ?args.argv, "parsing");

    let (outcome, report) = outline.parse_reported(&args.argv)?;
    let out = match outcome {
        Outcome::Command(cmd) => json!({
            "outcome": "command",
            "command": cmd.command,
            "values": cmd.values,
            "report": report_json(&report),
        }),
        Outcome::Help(request) => json!({
            "outcome": "help",
            "group": request.group(),
            "command": request.command(),
            "parseResult": parse_result_json(&request.result),
        }),
        Outcome::NoCommand => json!({ "outcome": "no-command" }),
    };

    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn help(spec: Option<PathBuf>, args: ArgvArgs) -> Result<()> {
    let outline = load_outline(spec)?;
    let result = outline.parse_result(&args.argv)?;
    print!("{}", outline.help(&HelpRequest { result }));
    Ok(())
}

fn describe(spec: Option<PathBuf>) -> Result<()> {
    let outline = load_outline(spec)?;
    let json = serde_json::to_string_pretty(outline.metadata())
        .context("failed to serialize metadata")?;
    println!("{json}");
    Ok(())
}

fn parse_result_json(result: &ParseResult) -> Value {
    json!({
        "group": result.group,
        "command": result.command,
        "helpRequested": result.help_requested,
        "globalOptions": result.global_options,
        "groupOptions": result.group_options,
        "commandOptions": result.command_options,
        "arguments": result.arguments,
    })
}

fn report_json(report: &BindReport) -> Value {
    let conversion: Vec<Value> = report
        .conversion_errors
        .iter()
        .map(|e| {
            json!({
                "field": e.field,
                "value": e.value,
                "message": e.message,
            })
        })
        .collect();
    let disallowed: Vec<Value> = report
        .disallowed_values
        .iter()
        .map(|d| {
            json!({
                "option": d.option,
                "value": d.value,
                "allowed": d.allowed,
            })
        })
        .collect();
    json!({
        "conversionErrors": conversion,
        "disallowedValues": disallowed,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
