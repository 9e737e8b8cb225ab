use anyhow::{Context, Result};
use colored::*;
use contextbuilder_core::{TokenCounterOperations, tokens::shared_counter};
use std::fs;
use std::io::{self, Read};

use crate::cli_args::CountArgs;
use crate::commands::CommandContext;
use crate::output::readable_size;

pub fn handle_count_command(args: CountArgs, ctx: &CommandContext) -> Result<()> {
    let model = match args.model {
        Some(model) => model,
        None => ctx.load_settings()?.tokenizer_model,
    };

    let (label, text) = match &args.file {
        Some(path) => {
            let bytes = fs::read(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let text = contextbuilder_core::host::decode_text(bytes)
                .with_context(|| format!("Failed to decode {}", path.display()))?;
            (path.display().to_string(), text)
        }
        None => {
            let mut text = String::new();
            io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read standard input")?;
            ("stdin".to_string(), text)
        }
    };

    let counter = shared_counter(&model).context("Failed to load tokenizer")?;
    let tokens = counter.count_tokens(&text);
    log::debug!("Counted {} tokens with {}", tokens, counter.encoding_label());

    if ctx.quiet {
        println!("{}", tokens);
    } else {
        println!(
            "{:<12} {}\n{:<12} {}\n{:<12} {}\n{:<12} {}",
            "Source:".green(),
            label.cyan(),
            "Size:".green(),
            readable_size(text.len()).cyan(),
            "Encoding:".green(),
            counter.encoding_label().cyan(),
            "Tokens:".green(),
            tokens.to_string().cyan()
        );
    }
    Ok(())
}
