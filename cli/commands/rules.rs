use anyhow::{Context, Result};
use contextbuilder_core::{Notifier, config::DEFAULT_TEMPLATE, rule_path_from};

use crate::cli_args::{RulesArgs, RulesCommand};
use crate::commands::CommandContext;
use crate::output::{print_json, print_ruleset};

pub fn handle_rules_command(args: RulesArgs, ctx: &CommandContext) -> Result<()> {
    let mut settings = ctx.load_settings()?;
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let cwd = cwd.canonicalize().unwrap_or(cwd);
    let rel = |input: &str| rule_path_from(input, &cwd, &ctx.project_base);

    // (changed, message when changed, message when unchanged)
    let outcome = match args.command {
        RulesCommand::Show { json } => {
            if json {
                print_json(&settings.ruleset())?;
            } else {
                print_ruleset(&settings.ruleset(), &settings.tokenizer_model);
            }
            return Ok(());
        }
        RulesCommand::ExcludeDir { path } => {
            let path = rel(&path);
            (
                settings.exclude_directory(&path)?,
                format!("Excluded: {}", path),
                format!("Already excluded: {}", path),
            )
        }
        RulesCommand::Include { path } => {
            let path = rel(&path);
            (
                settings.always_include(&path)?,
                format!("Always include: {}", path),
                format!("Already in always-include list: {}", path),
            )
        }
        RulesCommand::ExcludeType { tag } => (
            settings.exclude_file_type(&tag)?,
            format!("Excluded file type: {}", tag.trim()),
            format!("File type already excluded: {}", tag.trim()),
        ),
        RulesCommand::RemoveDir { path } => {
            let path = rel(&path);
            (
                settings.remove_excluded_directory(&path),
                format!("No longer excluded: {}", path),
                format!("Not an excluded directory: {}", path),
            )
        }
        RulesCommand::RemoveInclude { path } => {
            let path = rel(&path);
            (
                settings.remove_always_include(&path),
                format!("No longer always included: {}", path),
                format!("Not in always-include list: {}", path),
            )
        }
        RulesCommand::RemoveType { tag } => (
            settings.remove_excluded_file_type(&tag),
            format!("File type no longer excluded: {}", tag.trim()),
            format!("File type was not excluded: {}", tag.trim()),
        ),
        RulesCommand::Template { template, reset } => {
            let new_template = match (template, reset) {
                (_, true) => DEFAULT_TEMPLATE.to_string(),
                (Some(t), false) => t,
                (None, false) => {
                    println!("{}", settings.template);
                    return Ok(());
                }
            };
            let changed = settings.template != new_template;
            settings.set_template(&new_template);
            (
                changed,
                "Template updated.".to_string(),
                "Template unchanged.".to_string(),
            )
        }
    };

    let (changed, changed_msg, unchanged_msg) = outcome;
    if changed {
        ctx.save_settings(&settings)?;
        ctx.notifier.info(&changed_msg);
    } else {
        ctx.notifier.warn(&unchanged_msg);
    }
    Ok(())
}
