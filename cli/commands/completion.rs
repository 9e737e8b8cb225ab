use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use colored::*;
use contextbuilder_core::AppError;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::cli_args::{Cli, CompletionArgs};

fn parse_shell(name: &str) -> Result<Shell> {
    match name.to_lowercase().as_str() {
        "fish" => Ok(Shell::Fish),
        "bash" => Ok(Shell::Bash),
        "zsh" => Ok(Shell::Zsh),
        _ => anyhow::bail!(AppError::InvalidArgument(format!(
            "Unsupported shell for completion: {}",
            name
        ))),
    }
}

fn completion_target(shell: Shell, bin_name: &str) -> Option<PathBuf> {
    match shell {
        Shell::Fish => dirs::config_dir()
            .map(|p| p.join("fish").join("completions").join(format!("{}.fish", bin_name))),
        Shell::Bash => dirs::data_local_dir()
            .map(|p| p.join("bash-completion").join("completions").join(bin_name)),
        Shell::Zsh => dirs::data_local_dir()
            .map(|p| p.join("zsh").join("site-functions").join(format!("_{}", bin_name))),
        _ => None,
    }
}

pub fn handle_completion_command(args: &CompletionArgs, quiet: bool) -> Result<()> {
    let shell_name = args.shell.as_deref().unwrap_or("fish");
    let shell = parse_shell(shell_name)?;

    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();

    if !args.save {
        generate(shell, &mut command, bin_name, &mut io::stdout());
        return Ok(());
    }

    let save_path = completion_target(shell, &bin_name)
        .ok_or_else(|| anyhow::anyhow!("Could not determine standard completion directory."))?;

    if save_path.exists() {
        if quiet {
            anyhow::bail!(
                "Target file '{}' exists. Overwrite prevented in quiet mode.",
                save_path.display()
            );
        }
        print!(
            "{} Completion file already exists at '{}'. Overwrite? [{}/{}] ",
            "⚠️".yellow(),
            save_path.display().to_string().cyan(),
            "y".green(),
            "N".red()
        );
        io::stdout().flush().context("Failed to flush stdout")?;
        let mut response = String::new();
        io::stdin()
            .read_line(&mut response)
            .context("Failed to read user input")?;
        if !response.trim().eq_ignore_ascii_case("y") {
            println!("Save cancelled.");
            return Ok(());
        }
    }

    if let Some(save_dir) = save_path.parent() {
        fs::create_dir_all(save_dir)
            .with_context(|| format!("Failed to create directory {}", save_dir.display()))?;
    }
    let mut file = File::create(&save_path)
        .with_context(|| format!("Failed to create file {}", save_path.display()))?;
    generate(shell, &mut command, bin_name, &mut file);

    if !quiet {
        println!(
            "{} {} completions saved to: {}",
            "✅".green(),
            shell_name.cyan(),
            save_path.display().to_string().blue()
        );
    }
    Ok(())
}
