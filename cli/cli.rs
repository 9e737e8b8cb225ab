mod cli_args;
mod commands;
mod output;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use colored::*;
use log;
use std::process;

use cli_args::{Cli, Commands};
use commands::CommandContext;
use contextbuilder_core::AppError;

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);

            // Cancellation and invalid input are always reported, even in quiet mode.
            if !quiet || exit_code == 1 || exit_code == 5 || exit_code == 130 {
                eprintln!("{} {:#}", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    match err.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::TomlSerialize(_)) => 1,
        Some(AppError::Io(_)) => 2,
        Some(AppError::FileRead { .. }) => 2,
        Some(AppError::FileWrite { .. }) => 2,
        Some(AppError::DirCreation { .. }) => 2,
        Some(AppError::HistoryImport { .. }) => 2,
        Some(AppError::HistoryExport { .. }) => 2,
        Some(AppError::InvalidArgument(_)) => 5,
        Some(AppError::JsonSerialize(_)) => 6,
        Some(AppError::TikToken(_)) => 8,
        Some(AppError::Cancelled { .. }) => 130,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    if let Commands::Completion(args) = &command {
        log::debug!("Executing 'completion' command...");
        return commands::completion::handle_completion_command(args, quiet);
    }

    let ctx = CommandContext::from_opts(&cli.project, quiet)?;
    match command {
        Commands::Generate(args) => {
            log::debug!("Executing 'generate' command...");
            commands::generate::handle_generate_command(args, &ctx)?;
        }
        Commands::History(args) => {
            log::debug!("Executing 'history' command...");
            commands::history::handle_history_command(args, &ctx)?;
        }
        Commands::Rules(args) => {
            log::debug!("Executing 'rules' command...");
            commands::rules::handle_rules_command(args, &ctx)?;
        }
        Commands::Count(args) => {
            log::debug!("Executing 'count' command...");
            commands::count::handle_count_command(args, &ctx)?;
        }
        Commands::Completion(_) => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_exit_codes_follow_core_errors() {
        let cancelled = anyhow::Error::from(AppError::Cancelled {
            completed: 1,
            total: 4,
        });
        assert_eq!(exit_code_for(&cancelled), 130);

        let import = anyhow::Error::from(AppError::HistoryImport {
            path: PathBuf::from("x.json"),
            reason: "bad".to_string(),
        })
        .context("Failed to import history");
        assert_eq!(exit_code_for(&import), 2);

        assert_eq!(exit_code_for(&anyhow::anyhow!("plain")), 1);
    }

    #[test]
    fn test_generate_args_parse() {
        let cli = Cli::try_parse_from([
            "contextbuilder",
            "generate",
            "src",
            "README.md",
            "--no-history",
            "-o",
            "out.md",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Generate(args)) => {
                assert_eq!(args.paths.len(), 2);
                assert!(args.no_history);
                assert_eq!(args.output, Some(PathBuf::from("out.md")));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
