use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "contextbuilder",
    author,
    version,
    about = "Assemble selected project files into one templated context document.",
    long_about = "contextbuilder resolves a selection of files and folders against persistent \nexclusion and always-include rules, renders them through a template into a single \ndocument for language-model prompts, and keeps a searchable history of past selections.",
    help_template = "{about-section}\nUsage: {usage}\n\n{all-args}{after-help}",
    after_help = "EXAMPLES:\n  contextbuilder generate src README.md -o context.md\n  contextbuilder rules exclude-dir target/\n  contextbuilder history list --sort name --search api\n  contextbuilder history regenerate 3",
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[arg(short, long, action = clap::ArgAction::Count, global = true, help = "Increase message verbosity (-v, -vv).")]
    pub verbose: u8,

    #[arg(
        short,
        long,
        global = true,
        help = "Silence informational messages and warnings."
    )]
    pub quiet: bool,

    #[command(flatten)]
    pub project: ProjectOpts,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProjectOpts {
    #[arg(
        long,
        global = true,
        help = "Specify the project directory paths are made relative to (default: current dir).",
        help_heading = "Project Setup",
        value_name = "PATH"
    )]
    pub project_root: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        help = "Specify the settings file (default: <config dir>/contextbuilder/settings.toml).",
        help_heading = "Project Setup",
        value_name = "FILE"
    )]
    pub settings_file: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    #[command(
        visible_alias = "g",
        visible_alias = "gen",
        about = "Generate a context document from files and folders."
    )]
    Generate(GenerateArgs),

    #[command(
        visible_alias = "h",
        about = "List, inspect, regenerate and manage past generations."
    )]
    History(HistoryArgs),

    #[command(
        visible_alias = "r",
        about = "Show or edit exclusion rules and the document template."
    )]
    Rules(RulesArgs),

    #[command(
        visible_alias = "c",
        about = "Count tokens in a file or standard input."
    )]
    Count(CountArgs),

    #[command(about = "Generate or save shell completion scripts.")]
    Completion(CompletionArgs),
}

#[derive(Args, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(
        required = true,
        value_name = "PATHS",
        help = "Files and folders to include, in order."
    )]
    pub paths: Vec<PathBuf>,

    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "Write the document to FILE instead of stdout.",
        help_heading = "Output"
    )]
    pub output: Option<PathBuf>,

    #[arg(
        long,
        help = "Do not record this generation in the history.",
        help_heading = "Output"
    )]
    pub no_history: bool,

    #[arg(
        long,
        value_name = "TEMPLATE",
        help = "Use this template for this run only ({path}, {filetype}, {content}).",
        help_heading = "Rendering"
    )]
    pub template: Option<String>,

    #[arg(
        long,
        value_name = "MODEL",
        help = "Tokenizer model for this run only.",
        help_heading = "Rendering"
    )]
    pub model: Option<String>,

    #[arg(
        long,
        help = "Run on a background worker with progress and Ctrl+C cancellation.",
        help_heading = "Rendering"
    )]
    pub background: bool,
}

#[derive(Args, Debug, Clone)]
pub struct HistoryArgs {
    #[command(subcommand)]
    pub command: HistoryCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum HistoryCommand {
    #[command(visible_alias = "ls", about = "List entries with their ids.")]
    List {
        #[arg(long, value_enum, default_value_t = SortArg::Date, help = "Sort order.")]
        sort: SortArg,
        #[arg(short, long, value_name = "QUERY", help = "Only entries whose name, timestamp or paths contain QUERY.")]
        search: Option<String>,
    },

    #[command(about = "Show the file tree of one entry.")]
    Show {
        id: usize,
        #[arg(long, value_name = "QUERY", help = "Prune leaves whose name does not contain QUERY.")]
        filter: Option<String>,
        #[arg(short = 'f', long, value_enum, default_value_t = ShowFormat::Text, help = "Output format.")]
        format: ShowFormat,
    },

    #[command(visible_alias = "regen", about = "Render an entry's files again.")]
    Regenerate {
        id: usize,
        #[arg(short, long, value_name = "FILE", help = "Write the document to FILE instead of stdout.")]
        output: Option<PathBuf>,
    },

    #[command(about = "Give an entry a custom name.")]
    Rename { id: usize, name: String },

    #[command(about = "Delete every entry.")]
    Clear {
        #[arg(short, long, help = "Do not ask for confirmation.")]
        yes: bool,
    },

    #[command(about = "Write history_export.json into DIR.")]
    Export {
        #[arg(value_name = "DIR")]
        dir: PathBuf,
    },

    #[command(about = "Append entries from an exported JSON file.")]
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    #[command(about = "Add an entry listing every file under PATHS, without applying rules.")]
    Add {
        #[arg(required = true, value_name = "PATHS")]
        paths: Vec<PathBuf>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortArg {
    Date,
    Name,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowFormat {
    Text,
    Json,
}

#[derive(Args, Debug, Clone)]
pub struct RulesArgs {
    #[command(subcommand)]
    pub command: RulesCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum RulesCommand {
    #[command(about = "Print the current rules and template.")]
    Show {
        #[arg(long, help = "Print as JSON.")]
        json: bool,
    },
    #[command(about = "Exclude a directory prefix (relative to the project root).")]
    ExcludeDir { path: String },
    #[command(about = "Always include a file or folder, overriding exclusions.")]
    Include { path: String },
    #[command(about = "Exclude a file type tag such as JSON or Markdown.")]
    ExcludeType { tag: String },
    #[command(about = "Remove a directory exclusion.")]
    RemoveDir { path: String },
    #[command(about = "Remove an always-include path.")]
    RemoveInclude { path: String },
    #[command(about = "Remove a file type exclusion.")]
    RemoveType { tag: String },
    #[command(about = "Print the template, or replace it.")]
    Template {
        template: Option<String>,
        #[arg(long, conflicts_with = "template", help = "Restore the default template.")]
        reset: bool,
    },
}

#[derive(Args, Debug, Clone)]
pub struct CountArgs {
    #[arg(value_name = "FILE", help = "File to count (default: stdin).")]
    pub file: Option<PathBuf>,
    #[arg(long, value_name = "MODEL", help = "Tokenizer model (default: from settings).")]
    pub model: Option<String>,
}

#[derive(Args, Debug, Clone)]
pub struct CompletionArgs {
    #[arg(
        long,
        value_name = "SHELL",
        help = "Shell to generate completions for (fish, bash, zsh) [default: fish]"
    )]
    pub shell: Option<String>,
    #[arg(
        long,
        help = "Save completion script to default location (prompts overwrite)."
    )]
    pub save: bool,
}
