use crate::error::{AppError, Result};
use crate::history::HistoryEntry;
use crate::host::normalize_path;
use crate::resolve::relative_path;
use indexmap::IndexSet;
use log;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const APP_DIR_NAME: &str = "contextbuilder";
pub const DEFAULT_SETTINGS_FILENAME: &str = "settings.toml";
pub const SETTINGS_PATH_ENV: &str = "CONTEXTBUILDER_SETTINGS";
pub const PROJECT_ROOT_ENV: &str = "CONTEXTBUILDER_PROJECT_ROOT";
pub const DEFAULT_TEMPLATE: &str = "# {path}\n```{filetype}\n{content}\n```";
pub const DEFAULT_TOKENIZER_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Settings {
    #[serde(default = "default_template")]
    pub template: String,
    #[serde(default = "default_tokenizer_model")]
    pub tokenizer_model: String,
    #[serde(default)]
    pub excluded_file_types: IndexSet<String>,
    #[serde(default)]
    pub excluded_directories: IndexSet<String>,
    #[serde(default)]
    pub always_include_paths: IndexSet<String>,
    #[serde(default)]
    pub entries: Vec<HistoryEntry>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct Ruleset {
    pub excluded_file_types: IndexSet<String>,
    pub excluded_directories: IndexSet<String>,
    pub always_include_paths: IndexSet<String>,
    pub template: String,
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}
fn default_tokenizer_model() -> String {
    DEFAULT_TOKENIZER_MODEL.to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            template: default_template(),
            tokenizer_model: default_tokenizer_model(),
            excluded_file_types: IndexSet::new(),
            excluded_directories: IndexSet::new(),
            always_include_paths: IndexSet::new(),
            entries: Vec::new(),
        }
    }
}

impl Default for Ruleset {
    fn default() -> Self {
        Self {
            excluded_file_types: IndexSet::new(),
            excluded_directories: IndexSet::new(),
            always_include_paths: IndexSet::new(),
            template: default_template(),
        }
    }
}

impl Ruleset {
    pub fn is_always_included(&self, relative_path: &str) -> bool {
        self.always_include_paths.contains(relative_path)
    }

    // Plain string prefix match, not a glob.
    pub fn is_directory_excluded(&self, relative_path: &str) -> bool {
        self.excluded_directories
            .iter()
            .any(|prefix| relative_path.starts_with(prefix.as_str()))
    }

    pub fn is_type_excluded(&self, type_tag: &str) -> bool {
        let tag_lower = type_tag.to_lowercase();
        self.excluded_file_types
            .iter()
            .any(|t| t.to_lowercase() == tag_lower)
    }
}

impl Settings {
    pub fn ruleset(&self) -> Ruleset {
        Ruleset {
            excluded_file_types: self.excluded_file_types.clone(),
            excluded_directories: self.excluded_directories.clone(),
            always_include_paths: self.always_include_paths.clone(),
            template: self.template.clone(),
        }
    }

    pub fn exclude_directory(&mut self, relative_path: &str) -> Result<bool> {
        let path = non_empty_rule(relative_path, "Excluded directory")?;
        Ok(self.excluded_directories.insert(path))
    }

    pub fn remove_excluded_directory(&mut self, relative_path: &str) -> bool {
        self.excluded_directories.shift_remove(relative_path)
    }

    pub fn always_include(&mut self, relative_path: &str) -> Result<bool> {
        let path = non_empty_rule(relative_path, "Always-include path")?;
        Ok(self.always_include_paths.insert(path))
    }

    pub fn remove_always_include(&mut self, relative_path: &str) -> bool {
        self.always_include_paths.shift_remove(relative_path)
    }

    // Type tags compare case-insensitively, so `python` and `Python` are the
    // same rule.
    pub fn exclude_file_type(&mut self, type_tag: &str) -> Result<bool> {
        let tag = non_empty_rule(type_tag, "File type")?;
        let tag_lower = tag.to_lowercase();
        if self
            .excluded_file_types
            .iter()
            .any(|t| t.to_lowercase() == tag_lower)
        {
            return Ok(false);
        }
        Ok(self.excluded_file_types.insert(tag))
    }

    pub fn remove_excluded_file_type(&mut self, type_tag: &str) -> bool {
        let tag_lower = type_tag.trim().to_lowercase();
        let before = self.excluded_file_types.len();
        self.excluded_file_types
            .retain(|t| t.to_lowercase() != tag_lower);
        self.excluded_file_types.len() != before
    }

    pub fn set_template(&mut self, template: &str) {
        log::debug!("Updating document template ({} chars)", template.len());
        self.template = template.to_string();
    }
}

fn non_empty_rule(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidArgument(format!(
            "{} must not be empty",
            what
        )));
    }
    Ok(trimmed.to_string())
}

// Turns user input into the form rules are stored in: relative to the
// project base when it lies inside it, forward slashes, no leading `./`.
pub fn to_rule_path(input: &str, project_base: &str) -> String {
    let normalized = input.trim().replace('\\', "/");
    let relative = relative_path(&normalized, project_base);
    relative
        .strip_prefix("./")
        .map(str::to_string)
        .unwrap_or(relative)
}

// Relative input is taken from `cwd` the way a shell would; `.` and `..` are
// folded lexically and a trailing `/` is kept.
pub fn rule_path_from(input: &str, cwd: &Path, project_base: &str) -> String {
    let normalized = input.trim().replace('\\', "/");
    if normalized.is_empty() || normalized.starts_with('/') || Path::new(&normalized).is_absolute() {
        return to_rule_path(&normalized, project_base);
    }
    let mut segments: Vec<String> = normalize_path(cwd)
        .trim_end_matches('/')
        .split('/')
        .map(str::to_string)
        .collect();
    for segment in normalized.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.len() > 1 {
                    segments.pop();
                }
            }
            other => segments.push(other.to_string()),
        }
    }
    let mut joined = segments.join("/");
    if normalized.ends_with('/') && !joined.ends_with('/') {
        joined.push('/');
    }
    to_rule_path(&joined, project_base)
}

pub trait SettingsStore {
    fn load(&self) -> Result<Settings>;
    fn save(&self, settings: &Settings) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn locate(cli_settings_file: Option<&String>) -> Result<Self> {
        let explicit = cli_settings_file
            .cloned()
            .or_else(|| env::var(SETTINGS_PATH_ENV).ok().filter(|s| !s.is_empty()));

        let path = match explicit {
            Some(p_str) => {
                let path = PathBuf::from(shellexpand::tilde(&p_str).as_ref());
                log::debug!("Using explicit settings file: {}", path.display());
                path
            }
            None => {
                let config_dir = dirs::config_dir().ok_or_else(|| {
                    AppError::Config(
                        "Could not determine the user configuration directory".to_string(),
                    )
                })?;
                let path = config_dir.join(APP_DIR_NAME).join(DEFAULT_SETTINGS_FILENAME);
                log::debug!("Using default settings file: {}", path.display());
                path
            }
        };
        Ok(Self::new(path))
    }
}

impl SettingsStore for FileSettingsStore {
    fn load(&self) -> Result<Settings> {
        if !self.path.exists() {
            log::debug!(
                "Settings file {} does not exist, using defaults.",
                self.path.display()
            );
            return Ok(Settings::default());
        }
        log::info!("Loading settings from: {}", self.path.display());
        let toml_content = fs::read_to_string(&self.path).map_err(|e| AppError::FileRead {
            path: self.path.clone(),
            source: e,
        })?;
        toml::from_str::<Settings>(&toml_content).map_err(|e| {
            AppError::TomlParse(format!(
                "Error parsing settings file '{}': {}",
                self.path.display(),
                e
            ))
        })
    }

    fn save(&self, settings: &Settings) -> Result<()> {
        let content = toml::to_string(settings)?;
        write_atomic(&self.path, content.as_bytes())?;
        log::debug!(
            "Saved settings ({} history entries) to {}",
            settings.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}

// Writes through a temporary file in the target directory and renames it
// into place, so a failed write never leaves a partial file behind.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(|e| AppError::DirCreation {
        path: parent.clone(),
        source: e,
    })?;

    let write_err = |e: std::io::Error| AppError::FileWrite {
        path: path.to_path_buf(),
        source: e,
    };
    let mut temp = NamedTempFile::new_in(&parent).map_err(write_err)?;
    temp.write_all(content).map_err(write_err)?;
    temp.flush().map_err(write_err)?;
    temp.persist(path).map_err(|e| write_err(e.error))?;
    Ok(())
}

pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
    let path_str_opt = cli_project_root
        .map(|p| p.to_string_lossy().to_string())
        .or_else(|| env::var(PROJECT_ROOT_ENV).ok().filter(|s| !s.is_empty()));

    let path_to_resolve = match path_str_opt {
        Some(p_str) => PathBuf::from(shellexpand::tilde(&p_str).as_ref()),
        None => env::current_dir().map_err(AppError::Io)?,
    };

    path_to_resolve.canonicalize().map_err(|e| {
        AppError::Io(std::io::Error::new(
            e.kind(),
            format!(
                "Failed to canonicalize project root '{}': {}",
                path_to_resolve.display(),
                e
            ),
        ))
    })
}

pub fn project_base(project_root: &Path) -> String {
    let base = normalize_path(project_root);
    if base.len() > 1 {
        base.trim_end_matches('/').to_string()
    } else {
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_settings_use_markdown_template() {
        let settings = Settings::default();
        assert_eq!(settings.template, "# {path}\n```{filetype}\n{content}\n```");
        assert_eq!(settings.tokenizer_model, DEFAULT_TOKENIZER_MODEL);
        assert!(settings.entries.is_empty());
    }

    #[test]
    fn test_ruleset_type_match_ignores_case() {
        let mut settings = Settings::default();
        settings.exclude_file_type("JSON").unwrap();
        let rules = settings.ruleset();
        assert!(rules.is_type_excluded("json"));
        assert!(rules.is_type_excluded("Json"));
        assert!(!rules.is_type_excluded("YAML"));
    }

    #[test]
    fn test_directory_exclusion_is_plain_prefix() {
        let mut settings = Settings::default();
        settings.exclude_directory("build").unwrap();
        let rules = settings.ruleset();
        assert!(rules.is_directory_excluded("build/a.txt"));
        // Prefix, not segment, semantics.
        assert!(rules.is_directory_excluded("buildscripts/run.sh"));
        assert!(!rules.is_directory_excluded("src/build/a.txt"));
    }

    #[test]
    fn test_rule_insertion_reports_duplicates() {
        let mut settings = Settings::default();
        assert!(settings.exclude_directory("target/").unwrap());
        assert!(!settings.exclude_directory("target/").unwrap());
        assert!(settings.always_include("README.md").unwrap());
        assert!(!settings.always_include(" README.md ").unwrap());
        assert!(settings.exclude_file_type("Python").unwrap());
        assert!(!settings.exclude_file_type("python").unwrap());
        assert_eq!(settings.excluded_file_types.len(), 1);
    }

    #[test]
    fn test_empty_rule_is_rejected() {
        let mut settings = Settings::default();
        assert!(matches!(
            settings.exclude_directory("  "),
            Err(AppError::InvalidArgument(_))
        ));
        assert!(settings.excluded_directories.is_empty());
    }

    #[test]
    fn test_rule_removal() {
        let mut settings = Settings::default();
        settings.exclude_file_type("Markdown").unwrap();
        settings.always_include("docs/keep.md").unwrap();
        assert!(settings.remove_excluded_file_type("markdown"));
        assert!(!settings.remove_excluded_file_type("markdown"));
        assert!(settings.remove_always_include("docs/keep.md"));
        assert!(!settings.remove_excluded_directory("nothing/"));
    }

    #[test]
    fn test_to_rule_path_relativizes_inside_project() {
        assert_eq!(to_rule_path("/proj/build/", "/proj"), "build/");
        assert_eq!(to_rule_path("./src/main.rs", "/proj"), "src/main.rs");
        assert_eq!(to_rule_path("src\\lib.rs", "/proj"), "src/lib.rs");
        assert_eq!(to_rule_path("/elsewhere/x", "/proj"), "/elsewhere/x");
    }

    #[test]
    fn test_rule_path_from_subdirectory_is_project_relative() {
        let cwd = Path::new("/proj/sub");
        assert_eq!(rule_path_from("./gen/", cwd, "/proj"), "sub/gen/");
        assert_eq!(rule_path_from("gen", cwd, "/proj"), "sub/gen");
        assert_eq!(rule_path_from("../lib/", cwd, "/proj"), "lib/");
        assert_eq!(rule_path_from("/proj/build/", cwd, "/proj"), "build/");
        assert_eq!(rule_path_from("../../other/x", cwd, "/proj"), "/other/x");
    }

    #[test]
    fn test_rule_path_from_subdirectory_excludes_that_subtree() {
        let mut settings = Settings::default();
        let rule = rule_path_from("./gen/", Path::new("/proj/sub"), "/proj");
        assert!(settings.exclude_directory(&rule).unwrap());
        let rules = settings.ruleset();
        assert!(rules.is_directory_excluded("sub/gen/x.txt"));
        assert!(!rules.is_directory_excluded("gen/x.txt"));
    }

    #[test]
    fn test_store_load_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("settings.toml"));
        assert_eq!(store.load().unwrap(), Settings::default());
    }

    #[test]
    fn test_store_save_then_load() {
        let dir = tempdir().unwrap();
        let store = FileSettingsStore::new(dir.path().join("nested").join("settings.toml"));
        let mut settings = Settings::default();
        settings.exclude_directory("build/").unwrap();
        settings.always_include("build/keep.txt").unwrap();
        settings.entries.push(HistoryEntry {
            timestamp: "2024-01-02 03:04:05".to_string(),
            created_at: 42,
            custom_name: "first".to_string(),
            file_paths: vec!["src/main.rs".to_string()],
        });

        store.save(&settings).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_store_load_malformed_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "template = [unclosed").unwrap();
        let store = FileSettingsStore::new(&path);
        assert!(matches!(store.load(), Err(AppError::TomlParse(_))));
    }

    #[test]
    fn test_write_atomic_replaces_existing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.txt");
        fs::write(&path, "old").unwrap();
        write_atomic(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[test]
    fn test_project_base_trims_trailing_separator() {
        assert_eq!(project_base(Path::new("/proj/")), "/proj");
        assert_eq!(project_base(Path::new("/")), "/");
    }
}
