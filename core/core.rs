pub mod config;
pub mod error;
pub mod history;
pub mod host;
pub mod pipeline;
pub mod render;
pub mod resolve;
pub mod tokens;
pub mod tree;

pub use config::{
    FileSettingsStore, Ruleset, Settings, SettingsStore, determine_project_root, project_base,
    rule_path_from, to_rule_path,
};
pub use error::{AppError, Result};
pub use history::{
    HistoryEntry, HistoryEvent, HistoryRow, HistoryStore, SortMode, entry_from_drop,
};
pub use host::{
    ExtensionTypeTagger, FileEntry, FileTree, LocalFileTree, LogNotifier, NotificationLevel,
    Notifier, TypeTagger,
};
pub use pipeline::{
    BACKGROUND_ROOT_THRESHOLD, CancelHandle, GeneratedContext, GenerationRequest,
    GenerationTask, Host, Progress, generate, render_paths, spawn_generation,
};
pub use resolve::{PathResolver, ResolvedSelection, relative_path, resolve};
pub use tokens::{BpeTokenCounter, TokenCounterOperations, count_tokens};
pub use tree::{PathTree, TreeNode};
