//! Terminal output for the command-line interface.
//!
//! Results are printed either as colored, human-readable text or as JSON,
//! depending on the selected [`OutputFormat`].

use comfy_table::{Attribute, Cell, Table};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::sync::Arc;

use crate::error::StructuredError;
use crate::models::{CanonicalResult, ModelListing, SearchRecord};
use crate::providers::{Provider, ProviderCapabilities};

/// Check if stdout is a terminal.
pub fn is_terminal() -> bool {
    std::io::stdout().is_terminal()
}

/// How results are written to stdout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text on a terminal, JSON otherwise
    #[default]
    Auto,
    Json,
    Plain,
}

impl OutputFormat {
    /// Replace `Auto` with the concrete format for this stdout
    pub fn resolve(self, terminal: bool) -> OutputFormat {
        match self {
            OutputFormat::Auto if terminal => OutputFormat::Plain,
            OutputFormat::Auto => OutputFormat::Json,
            other => other,
        }
    }
}

/// Status types for colored output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Error,
    Warning,
    Info,
}

/// Status icons for different outcomes.
pub fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Success => "✓",
        Status::Error => "✗",
        Status::Warning => "⚠",
        Status::Info => "ℹ",
    }
}

/// Print a styled status message.
pub fn print_status(status: Status, msg: &str) {
    let icon = status_icon(status);
    match status {
        Status::Success => println!("{} {}", icon.green().bold(), msg),
        Status::Error => eprintln!("{} {}", icon.red().bold(), msg),
        Status::Warning => eprintln!("{} {}", icon.yellow().bold(), msg),
        Status::Info => println!("{} {}", icon.cyan().bold(), msg),
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

/// Print a divider line.
pub fn print_divider() {
    println!("{}", "─".repeat(80).dimmed());
}

/// Truncate text to at most `max_chars` characters, marking the cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return "...".to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print a generation result.
pub fn print_canonical_result(
    result: &CanonicalResult,
    format: OutputFormat,
) -> Result<(), serde_json::Error> {
    if format.resolve(is_terminal()) == OutputFormat::Json {
        return print_json(result);
    }

    print_section(result.module().as_str());
    match result {
        CanonicalResult::Topic { titles } => {
            for (i, title) in titles.iter().enumerate() {
                println!("{:>2}. {}", (i + 1).to_string().yellow(), title.bold());
            }
        }
        CanonicalResult::Outline { sections, logic } => {
            for (i, section) in sections.iter().enumerate() {
                println!("{:>2}. {}", (i + 1).to_string().yellow(), section.bold());
            }
            if !logic.is_empty() {
                print_divider();
                for step in logic {
                    println!("  → {}", step);
                }
            }
        }
        CanonicalResult::Draft { draft } => println!("{}", draft),
        CanonicalResult::Polish { polished } => println!("{}", polished),
        CanonicalResult::Search { results } => println!("{}", search_table(results)),
        CanonicalResult::Citations { citation_block } => println!("{}", citation_block),
    }
    Ok(())
}

fn search_table(records: &[SearchRecord]) -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.set_header(vec!["Title", "Year", "Source"]);
    for record in records {
        table.add_row(vec![
            Cell::new(truncate_with_ellipsis(&record.title, 60)).add_attribute(Attribute::Bold),
            Cell::new(record.year),
            Cell::new(truncate_with_ellipsis(&record.source, 30)),
        ]);
    }
    table
}

/// Print a generation failure.
pub fn print_generation_error(
    err: &StructuredError,
    format: OutputFormat,
) -> Result<(), serde_json::Error> {
    if format.resolve(is_terminal()) == OutputFormat::Json {
        return print_json(err);
    }
    print_status(Status::Error, &format!("[{}] {}", err.kind, err.message));
    Ok(())
}

/// Print the registered providers.
pub fn print_providers(
    providers: &[&Arc<dyn Provider>],
    detailed: bool,
    format: OutputFormat,
) -> Result<(), serde_json::Error> {
    if format.resolve(is_terminal()) == OutputFormat::Json {
        let value: Vec<serde_json::Value> = providers
            .iter()
            .map(|p| {
                serde_json::json!({
                    "id": p.id(),
                    "name": p.name(),
                    "protocol": p.protocol().to_string(),
                    "default_model": p.default_model(),
                    "default_base_url": p.default_base_url(),
                    "list_models": p.supports_model_listing(),
                })
            })
            .collect();
        return print_json(&value);
    }

    print_section("Providers");
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    if detailed {
        table.set_header(vec!["ID", "Name", "Protocol", "Default model", "Base URL", "Capabilities"]);
    } else {
        table.set_header(vec!["ID", "Name", "Default model"]);
    }

    for provider in providers {
        if detailed {
            table.add_row(vec![
                Cell::new(provider.id()).add_attribute(Attribute::Bold),
                Cell::new(provider.name()),
                Cell::new(provider.protocol()),
                Cell::new(provider.default_model()),
                Cell::new(provider.default_base_url()),
                Cell::new(capability_names(provider.capabilities()).join(", ")),
            ]);
        } else {
            table.add_row(vec![
                Cell::new(provider.id()).add_attribute(Attribute::Bold),
                Cell::new(provider.name()),
                Cell::new(provider.default_model()),
            ]);
        }
    }
    println!("{table}");
    Ok(())
}

fn capability_names(capabilities: ProviderCapabilities) -> Vec<&'static str> {
    [
        (ProviderCapabilities::GENERATE, "generate"),
        (ProviderCapabilities::LIST_MODELS, "list models"),
        (ProviderCapabilities::SYSTEM_ROLE, "system role"),
    ]
    .into_iter()
    .filter(|(flag, _)| capabilities.contains(*flag))
    .map(|(_, name)| name)
    .collect()
}

/// Print a model listing.
pub fn print_models(listing: &ModelListing, format: OutputFormat) -> Result<(), serde_json::Error> {
    if format.resolve(is_terminal()) == OutputFormat::Json {
        return print_json(listing);
    }

    if let Some(error) = &listing.error {
        print_status(Status::Error, error);
        return Ok(());
    }
    if listing.models.is_empty() {
        print_status(Status::Warning, "No models available");
        return Ok(());
    }

    print_section(&format!("{} models", listing.models.len()));
    for model in &listing.models {
        println!("  {}", model.id);
    }
    Ok(())
}
