use anyhow::{Context, Result};
use clap::Parser;
use no_more_finals::classfile;
use no_more_finals::cli::{Cli, Commands, OutputFormat, RunArgs};
use no_more_finals::config::resolve_filter_config;
use no_more_finals::transform::{RunReport, Transformer};
use std::path::Path;
use tracing::warn;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    init_logging();
    let cli = parse_cli();

    match cli.command.clone() {
        Commands::Run(args) => {
            let config = resolve_filter_config(cli.config.as_deref(), &args)?;
            if config.is_empty() {
                warn!("No classes or packages selected; output will mirror input");
            }
            let report = Transformer::new(&config)
                .parallel(args.parallel)
                .run(&args.input, &args.output)?;
            write_report(&report, &args)?;
        }
        Commands::Inspect { class_file } => {
            inspect(&class_file)?;
        }
    }

    Ok(())
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_cli() -> Cli {
    let args: Vec<String> = std::env::args().collect();
    Cli::parse_from(rewrite_args_for_implicit_run(args))
}

/// `no-more-finals IN OUT ...` is shorthand for `no-more-finals run IN OUT ...`.
///
/// Only `--config` is global; every other leading flag belongs to `run`.
fn rewrite_args_for_implicit_run(mut args: Vec<String>) -> Vec<String> {
    if args.len() <= 1 {
        return args;
    }

    let passthrough = ["run", "inspect", "help", "-h", "--help"];

    let mut idx = 1usize;
    while idx < args.len() {
        let a = args[idx].as_str();
        if a == "--config" {
            idx += 2;
            continue;
        }

        if a.starts_with("--config=") {
            idx += 1;
            continue;
        }

        break;
    }

    if let Some(token) = args.get(idx)
        && !passthrough.contains(&token.as_str())
    {
        args.insert(idx, "run".to_string());
    }

    args
}

fn inspect(path: &Path) -> Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    let class = classfile::parse(&bytes)
        .with_context(|| format!("Failed to parse class file: {}", path.display()))?;
    println!("{}", serde_json::to_string_pretty(&class.summary())?);
    Ok(())
}

fn write_report(report: &RunReport, args: &RunArgs) -> Result<()> {
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Text => {
            let mut out = String::new();
            out.push_str(&format!("input: {}\n", report.input));
            out.push_str(&format!("output: {}\n", report.output));
            out.push_str(&format!("copied_files: {}\n", report.copied_files));
            out.push_str(&format!("transformed_classes: {}\n", report.transformed_classes));
            out.push_str(&format!("untouched_classes: {}\n", report.untouched_classes));
            out.push_str(&format!("fallback_classes: {}\n", report.fallback_classes));
            out.push_str(&format!("duration_ms: {}\n", report.duration_ms));
            for t in &report.transformed {
                out.push_str(&format!(
                    "- {} (class: {}, methods: {})\n",
                    t.class_name,
                    t.class_stripped,
                    t.methods.join(", ")
                ));
            }
            for f in &report.fallbacks {
                out.push_str(&format!("! {}: {}\n", f.path, f.error));
            }
            print!("{out}");
        }
    }
    Ok(())
}
