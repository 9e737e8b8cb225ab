use anyhow::{Context, Result};
use colored::*;
use contextbuilder_core::{
    self as core, HistoryStore, Host, Notifier, PathTree, Settings, SortMode, entry_from_drop,
};
use std::io::{self, Write};

use crate::cli_args::{HistoryArgs, HistoryCommand, ShowFormat, SortArg};
use crate::commands::CommandContext;
use crate::commands::generate::summary;
use crate::output::{print_history_table, print_json, write_document};

impl From<SortArg> for SortMode {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Date => SortMode::DateDesc,
            SortArg::Name => SortMode::NameAsc,
        }
    }
}

pub fn handle_history_command(args: HistoryArgs, ctx: &CommandContext) -> Result<()> {
    let mut settings = ctx.load_settings()?;
    let mut history = HistoryStore::from_entries(std::mem::take(&mut settings.entries));

    let changed = match args.command {
        HistoryCommand::List { sort, search } => {
            let rows = history.view(sort.into(), search.as_deref().unwrap_or(""));
            print_history_table(&rows);
            false
        }
        HistoryCommand::Show { id, filter, format } => {
            let entry = history.get(id)?;
            let mut tree = PathTree::build(&entry.file_paths);
            if let Some(query) = &filter {
                tree.filter(query);
            }
            match format {
                ShowFormat::Json => print_json(&tree.to_nested())?,
                ShowFormat::Text => {
                    println!("{} {}", "Entry:".green().bold(), entry.display_name().cyan());
                    print!("{}", tree.render());
                }
            }
            false
        }
        HistoryCommand::Regenerate { id, output } => {
            let paths = history.get(id)?.file_paths.clone();
            let generated = core::render_paths(
                paths,
                &ctx.project_base,
                &settings.template,
                &settings.tokenizer_model,
                &Host::local(),
            );
            write_document(&generated.text, output.as_deref())?;
            ctx.notifier.info(&summary(&generated, output.as_deref()));
            false
        }
        HistoryCommand::Rename { id, name } => {
            if history.rename(id, &name)? {
                ctx.notifier.info(&format!("Renamed entry {} to '{}'", id, name.trim()));
                true
            } else {
                ctx.notifier.warn("Name must not be blank; entry left unchanged.");
                false
            }
        }
        HistoryCommand::Clear { yes } => {
            if history.is_empty() {
                ctx.notifier.info("History is already empty.");
                false
            } else if yes || confirm(&format!("Delete all {} history entries?", history.len()))? {
                let removed = history.clear();
                ctx.notifier.info(&format!("Removed {} history entries", removed));
                true
            } else {
                println!("Clear cancelled.");
                false
            }
        }
        HistoryCommand::Export { dir } => {
            let path = history
                .export_to_dir(&dir)
                .context("Failed to export history")?;
            ctx.notifier.info(&format!(
                "Exported {} entries to {}",
                history.len(),
                path.display()
            ));
            false
        }
        HistoryCommand::Import { file } => {
            let count = history
                .import_file(&file)
                .context("Failed to import history")?;
            ctx.notifier
                .info(&format!("Imported {} entries from {}", count, file.display()));
            true
        }
        HistoryCommand::Add { paths } => {
            let entry = entry_from_drop(&paths, &ctx.project_root);
            let count = entry.file_paths.len();
            let id = history.add(entry);
            ctx.notifier
                .info(&format!("New history entry {} added with {} file(s)", id, count));
            true
        }
    };

    if changed {
        persist(settings, history, ctx)?;
    }
    Ok(())
}

fn persist(mut settings: Settings, history: HistoryStore, ctx: &CommandContext) -> Result<()> {
    settings.entries = history.into_entries();
    ctx.save_settings(&settings)
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} {} [{}/{}] ", "⚠️".yellow(), question, "y".green(), "N".red());
    io::stdout().flush().context("Failed to flush stdout")?;
    let mut response = String::new();
    io::stdin()
        .read_line(&mut response)
        .context("Failed to read user input")?;
    Ok(response.trim().eq_ignore_ascii_case("y"))
}
