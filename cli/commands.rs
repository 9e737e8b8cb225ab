pub mod completion;
pub mod count;
pub mod generate;
pub mod history;
pub mod rules;

use anyhow::{Context, Result};
use contextbuilder_core::{self as core, FileSettingsStore, Settings, SettingsStore};
use std::path::{Path, PathBuf};

use crate::cli_args::ProjectOpts;
use crate::output::ConsoleNotifier;

pub struct CommandContext {
    pub project_root: PathBuf,
    pub project_base: String,
    pub store: FileSettingsStore,
    pub notifier: ConsoleNotifier,
    pub quiet: bool,
}

impl CommandContext {
    pub fn from_opts(opts: &ProjectOpts, quiet: bool) -> Result<Self> {
        let project_root = core::determine_project_root(opts.project_root.as_ref())
            .context("Failed to determine project root")?;
        log::info!("Project root determined: {}", project_root.display());
        let store = FileSettingsStore::locate(opts.settings_file.as_ref())
            .context("Failed to locate settings file")?;
        Ok(Self {
            project_base: core::project_base(&project_root),
            project_root,
            store,
            notifier: ConsoleNotifier::new(quiet),
            quiet,
        })
    }

    pub fn load_settings(&self) -> Result<Settings> {
        self.store
            .load()
            .with_context(|| format!("Failed to load settings from {}", self.store.path().display()))
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        self.store
            .save(settings)
            .with_context(|| format!("Failed to save settings to {}", self.store.path().display()))
    }

    // Absolute, forward-slash form of a user-supplied path. Relative paths
    // are taken relative to the working directory, as a shell would.
    pub fn absolute_path(&self, path: &Path) -> Result<String> {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()
                .context("Failed to read current directory")?
                .join(path)
        };
        let resolved = joined.canonicalize().unwrap_or(joined);
        Ok(core::host::normalize_path(&resolved))
    }
}
