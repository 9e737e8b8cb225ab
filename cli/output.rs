use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use contextbuilder_core::{HistoryRow, LogNotifier, NotificationLevel, Notifier, Ruleset};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;

// Colored notifications on stderr, so stdout stays clean for documents.
// In quiet mode informational messages only reach the log.
pub struct ConsoleNotifier {
    quiet: bool,
}

impl ConsoleNotifier {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Notifier for ConsoleNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Info if self.quiet => LogNotifier.notify(level, message),
            NotificationLevel::Info => eprintln!("{} {}", "✅".green(), message),
            NotificationLevel::Warning => eprintln!("{} {}", "⚠️".yellow(), message.yellow()),
            NotificationLevel::Error => eprintln!("{} {}", "Error:".red().bold(), message),
        }
    }
}

pub fn readable_size(bytes: usize) -> String {
    Byte::from_u128(bytes as u128)
        .unwrap_or_default()
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

pub fn write_document(content: &str, output_path: Option<&Path>) -> Result<()> {
    match output_path {
        Some(path) => write_to_file(path, content),
        None => write_to_stdout(content, false),
    }
}

pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(data).context("Failed to serialize JSON output")?;
    write_to_stdout(&content, true)
}

fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

fn write_to_stdout(content: &str, end_with_newline: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    write_content(&mut handle, content, end_with_newline).context("Failed to write to stdout")
}

// Documents go out byte for byte; only terminal-facing output gets a closing newline.
fn write_content<W: Write>(out: &mut W, content: &str, end_with_newline: bool) -> io::Result<()> {
    out.write_all(content.as_bytes())?;
    if end_with_newline && !content.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}

pub fn print_history_table(rows: &[HistoryRow<'_>]) {
    if rows.is_empty() {
        println!("{}", "(No history entries)".yellow());
        return;
    }
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("ID").fg(Color::Green),
        Cell::new("Name").fg(Color::Green),
        Cell::new("Created").fg(Color::Green),
        Cell::new("Files").fg(Color::Green),
        Cell::new("First Path").fg(Color::Green),
    ]);
    for row in rows {
        let entry = row.entry;
        table.add_row(vec![
            Cell::new(row.id).set_alignment(CellAlignment::Right),
            Cell::new(entry.display_name()).fg(Color::Cyan),
            Cell::new(&entry.timestamp).fg(Color::DarkGrey),
            Cell::new(entry.file_paths.len()).set_alignment(CellAlignment::Right),
            Cell::new(entry.file_paths.first().map(String::as_str).unwrap_or("-")),
        ]);
    }
    println!("{table}");
}

pub fn print_ruleset(rules: &Ruleset, tokenizer_model: &str) {
    let print_list = |title: &str, items: Vec<&String>| {
        println!("{}", title.green().bold());
        if items.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for item in items {
            println!("  {}", item.cyan());
        }
    };
    print_list(
        "Excluded directories:",
        rules.excluded_directories.iter().collect(),
    );
    print_list(
        "Always-include paths:",
        rules.always_include_paths.iter().collect(),
    );
    print_list(
        "Excluded file types:",
        rules.excluded_file_types.iter().collect(),
    );
    println!("{} {}", "Tokenizer model:".green().bold(), tokenizer_model.cyan());
    println!("{}", "Template:".green().bold());
    println!("{}", rules.template);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_is_written_exactly() {
        let mut out = Vec::new();
        write_content(&mut out, "", false).unwrap();
        assert!(out.is_empty());

        write_content(&mut out, "# a.py\n```python\nprint(1)\n```\n\n", false).unwrap();
        assert_eq!(out, b"# a.py\n```python\nprint(1)\n```\n\n");
    }

    #[test]
    fn test_json_output_ends_with_newline() {
        let mut out = Vec::new();
        write_content(&mut out, "{}", true).unwrap();
        assert_eq!(out, b"{}\n");
    }
}
