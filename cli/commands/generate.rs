use anyhow::{Context, Result};
use colored::*;
use contextbuilder_core::{
    self as core, AppError, BACKGROUND_ROOT_THRESHOLD, GeneratedContext, GenerationRequest,
    HistoryEvent, HistoryStore, Host, Notifier,
};
use std::sync::atomic::AtomicBool;

use crate::cli_args::GenerateArgs;
use crate::commands::CommandContext;
use crate::output::{readable_size, write_document};

pub fn handle_generate_command(args: GenerateArgs, ctx: &CommandContext) -> Result<()> {
    let mut settings = ctx.load_settings()?;

    let mut ruleset = settings.ruleset();
    if let Some(template) = &args.template {
        log::debug!("Using template override for this run");
        ruleset.template = template.clone();
    }
    let tokenizer_model = args
        .model
        .clone()
        .unwrap_or_else(|| settings.tokenizer_model.clone());

    let roots = args
        .paths
        .iter()
        .map(|p| ctx.absolute_path(p))
        .collect::<Result<Vec<String>>>()?;

    let request = GenerationRequest {
        roots,
        project_base: ctx.project_base.clone(),
        ruleset,
        tokenizer_model,
    };

    let generated = if args.background || request.roots.len() > BACKGROUND_ROOT_THRESHOLD {
        run_in_background(request, ctx)?
    } else {
        core::generate(&request, &Host::local(), &AtomicBool::new(false), &mut |_| {})
            .context("Failed to generate context")?
    };

    if generated.paths.is_empty() {
        ctx.notifier
            .warn("No files matched the selection after applying rules.");
    }

    write_document(&generated.text, args.output.as_deref())?;

    if !args.no_history {
        let mut history = HistoryStore::from_entries(std::mem::take(&mut settings.entries));
        history.subscribe(Box::new(|event: &HistoryEvent| {
            if let HistoryEvent::Added { id } = event {
                log::info!("Recorded history entry {}", id);
            }
        }));
        history.record(generated.paths.clone());
        settings.entries = history.into_entries();
        ctx.save_settings(&settings)?;
    }

    ctx.notifier.info(&summary(&generated, args.output.as_deref()));
    Ok(())
}

fn run_in_background(request: GenerationRequest, ctx: &CommandContext) -> Result<GeneratedContext> {
    let total = request.roots.len();
    let task = core::spawn_generation(request, Host::local())
        .context("Failed to start background generation")?;

    let cancel = task.cancel_handle();
    if let Err(e) = ctrlc::set_handler(move || cancel.cancel()) {
        log::warn!("Could not install Ctrl+C handler: {}", e);
    }

    for progress in task.progress().iter() {
        if !ctx.quiet {
            eprint!(
                "\r{} {}/{} roots ({:.0}%)",
                "Resolving".cyan(),
                progress.completed,
                progress.total,
                progress.fraction() * 100.0
            );
        }
    }
    if !ctx.quiet && total > 0 {
        eprintln!();
    }

    match task.join() {
        Err(e @ AppError::Cancelled { .. }) => {
            ctx.notifier.warn("Generation cancelled; nothing was recorded.");
            Err(e.into())
        }
        other => other.context("Background generation failed"),
    }
}

pub fn summary(generated: &GeneratedContext, output: Option<&std::path::Path>) -> String {
    let tokens = match generated.token_count {
        Some(count) => count.to_string(),
        None => "unavailable".to_string(),
    };
    let target = output
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "stdout".to_string());
    format!(
        "Context for {} file(s) written to {} ({}). Token count: {}",
        generated.paths.len(),
        target,
        readable_size(generated.text.len()),
        tokens
    )
}
