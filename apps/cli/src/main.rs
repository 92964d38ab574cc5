//! `aurum` - validate a CDA document against a gold model from the shell.

use anyhow::Context;
use aurum_descriptors::{c32, ValidationKind};
use aurum_models::ValueModel;
use aurum_validator::{ContentValidator, DocumentValidator, ValidationIssue};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "aurum", about = "Validate CDA/C32 documents against a gold model")]
struct Cli {
    /// Gold model JSON file.
    #[arg(long)]
    gold: PathBuf,

    /// CDA XML document to validate.
    #[arg(long)]
    document: PathBuf,

    /// Document schema variant (c32-v2.1, c32-v2.5, c32-v2.5-c83, ccr).
    #[arg(long, default_value = "c32-v2.5")]
    kind: String,

    /// Restrict validation to specific components (repeatable).
    #[arg(long = "component")]
    components: Vec<String>,

    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {:#}", error);
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let kind: ValidationKind = cli.kind.parse()?;

    let gold_text = std::fs::read_to_string(&cli.gold)
        .with_context(|| format!("reading gold model {}", cli.gold.display()))?;
    let gold = ValueModel::from_str(&gold_text).context("parsing gold model")?;

    let xml = std::fs::read_to_string(&cli.document)
        .with_context(|| format!("reading document {}", cli.document.display()))?;
    let doc = roxmltree::Document::parse(&xml).context("parsing document")?;

    let registry = Arc::new(c32::registry()?);
    let mut validator = ContentValidator::new(registry, kind);
    if !cli.components.is_empty() {
        validator = validator.with_components(cli.components.clone())?;
    }

    let issues = validator.validate(gold.as_gold(), &doc);

    match cli.format {
        Format::Text => print_text(&issues),
        Format::Json => print_json(&issues)?,
    }

    let errors = issues.iter().filter(|i| i.is_error()).count();
    if errors > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

fn print_text(issues: &[ValidationIssue]) {
    if issues.is_empty() {
        println!("document matches the gold model");
        return;
    }

    for issue in issues {
        let mut line = format!("{} [{}] {}", issue.severity, issue.section, issue.message);
        if let Some(location) = &issue.location {
            line.push_str(&format!(" (at {})", location));
        }
        if issue.reviewable() {
            line.push_str(" [review]");
        }
        println!("{}", line);
    }

    let errors = issues.iter().filter(|i| i.is_error()).count();
    let warnings = issues.len() - errors;
    println!("{} error(s), {} warning(s)", errors, warnings);
}

fn print_json(issues: &[ValidationIssue]) -> anyhow::Result<()> {
    let report: Vec<serde_json::Value> = issues.iter().map(ValidationIssue::to_json).collect();
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
