// Generation history: records, ordering, search, and JSON import/export.

use crate::config::write_atomic;
use crate::error::{AppError, Result};
use crate::host::normalize_path;
use crate::resolve::relative_path;
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const EXPORT_FILENAME: &str = "history_export.json";
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    #[serde(default)]
    pub timestamp: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub custom_name: String,
    #[serde(default)]
    pub file_paths: Vec<String>,
}

impl HistoryEntry {
    pub fn new(file_paths: Vec<String>) -> Self {
        let now = Local::now();
        Self {
            timestamp: now.format(TIMESTAMP_FORMAT).to_string(),
            created_at: now.timestamp_millis(),
            custom_name: String::new(),
            file_paths,
        }
    }

    pub fn display_name(&self) -> &str {
        if self.custom_name.trim().is_empty() {
            &self.timestamp
        } else {
            &self.custom_name
        }
    }

    fn matches(&self, query_lower: &str) -> bool {
        self.custom_name.to_lowercase().contains(query_lower)
            || self.timestamp.to_lowercase().contains(query_lower)
            || self
                .file_paths
                .iter()
                .any(|p| p.to_lowercase().contains(query_lower))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortMode {
    #[default]
    DateDesc,
    NameAsc,
}

// Stable sort; equal keys keep their input order.
pub fn sort<B: Borrow<HistoryEntry>>(mut entries: Vec<B>, mode: SortMode) -> Vec<B> {
    match mode {
        SortMode::DateDesc => {
            entries.sort_by(|a, b| b.borrow().created_at.cmp(&a.borrow().created_at))
        }
        SortMode::NameAsc => entries.sort_by_cached_key(|e| e.borrow().display_name().to_lowercase()),
    }
    entries
}

// Case-insensitive substring filter over name, timestamp and file paths.
// Input order is preserved; an empty query keeps everything.
pub fn search<B: Borrow<HistoryEntry>>(entries: Vec<B>, query: &str) -> Vec<B> {
    if query.is_empty() {
        return entries;
    }
    let query_lower = query.to_lowercase();
    entries
        .into_iter()
        .filter(|e| e.borrow().matches(&query_lower))
        .collect()
}

#[derive(Debug, Clone, Copy)]
pub struct HistoryRow<'a> {
    pub id: usize,
    pub entry: &'a HistoryEntry,
}

impl Borrow<HistoryEntry> for HistoryRow<'_> {
    fn borrow(&self) -> &HistoryEntry {
        self.entry
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryEvent {
    Added { id: usize },
    Renamed { id: usize },
    Cleared { removed: usize },
    Imported { count: usize },
}

pub type HistoryListener = Box<dyn Fn(&HistoryEvent) + Send>;

#[derive(Default)]
pub struct HistoryStore {
    entries: Vec<HistoryEntry>,
    listeners: Vec<HistoryListener>,
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("entries", &self.entries)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<HistoryEntry>) -> Self {
        Self {
            entries,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: HistoryListener) {
        self.listeners.push(listener);
    }

    fn notify(&self, event: HistoryEvent) {
        log::debug!("History changed: {:?}", event);
        for listener in &self.listeners {
            listener(&event);
        }
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<HistoryEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: usize) -> Result<&HistoryEntry> {
        self.entries.get(id).ok_or_else(|| self.bad_id(id))
    }

    fn bad_id(&self, id: usize) -> AppError {
        AppError::InvalidArgument(format!(
            "No history entry with id {} ({} entries)",
            id,
            self.entries.len()
        ))
    }

    pub fn add(&mut self, entry: HistoryEntry) -> usize {
        self.entries.push(entry);
        let id = self.entries.len() - 1;
        self.notify(HistoryEvent::Added { id });
        id
    }

    pub fn record(&mut self, file_paths: Vec<String>) -> usize {
        self.add(HistoryEntry::new(file_paths))
    }

    // Sets the custom name. Blank names are ignored and return `false`.
    pub fn rename(&mut self, id: usize, name: &str) -> Result<bool> {
        let trimmed = name.trim();
        if id >= self.entries.len() {
            return Err(self.bad_id(id));
        }
        if trimmed.is_empty() {
            log::debug!("Ignoring blank name for history entry {}", id);
            return Ok(false);
        }
        self.entries[id].custom_name = trimmed.to_string();
        self.notify(HistoryEvent::Renamed { id });
        Ok(true)
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.notify(HistoryEvent::Cleared { removed });
        removed
    }

    // Appends `entries` verbatim. Duplicates of existing entries are kept.
    pub fn import_merge(&mut self, entries: Vec<HistoryEntry>) -> usize {
        let count = entries.len();
        self.entries.extend(entries);
        self.notify(HistoryEvent::Imported { count });
        count
    }

    // Parses the whole file before touching the store, so a malformed file
    // leaves it unchanged.
    pub fn import_file(&mut self, path: &Path) -> Result<usize> {
        let content = fs::read_to_string(path).map_err(|e| AppError::HistoryImport {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let imported: Vec<HistoryEntry> =
            serde_json::from_str(&content).map_err(|e| AppError::HistoryImport {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;
        log::info!("Importing {} history entries from {}", imported.len(), path.display());
        Ok(self.import_merge(imported))
    }

    pub fn export(&self) -> Vec<HistoryEntry> {
        self.entries.clone()
    }

    pub fn export_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.entries)?)
    }

    pub fn export_to_dir(&self, dir: &Path) -> Result<PathBuf> {
        let target = dir.join(EXPORT_FILENAME);
        let export_err = |reason: String| AppError::HistoryExport {
            path: target.clone(),
            reason,
        };
        if !dir.is_dir() {
            return Err(export_err("not a directory".to_string()));
        }
        let json = self.export_json()?;
        write_atomic(&target, json.as_bytes()).map_err(|e| export_err(e.to_string()))?;
        log::info!("Exported {} history entries to {}", self.entries.len(), target.display());
        Ok(target)
    }

    pub fn view(&self, mode: SortMode, query: &str) -> Vec<HistoryRow<'_>> {
        let rows: Vec<HistoryRow<'_>> = self
            .entries
            .iter()
            .enumerate()
            .map(|(id, entry)| HistoryRow { id, entry })
            .collect();
        search(sort(rows, mode), query)
    }
}

pub fn collect_dropped_paths(dropped: &[PathBuf], project_root: &Path) -> Vec<String> {
    let root = project_root
        .canonicalize()
        .unwrap_or_else(|_| project_root.to_path_buf());
    let base = normalize_path(&root);

    let mut paths = Vec::new();
    for drop_path in dropped {
        for entry_result in WalkDir::new(drop_path).sort_by_file_name() {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Skipping unreadable dropped path: {}", e);
                    continue;
                }
            };
            // Links are not followed, so a linked directory shows up as a non-dir entry.
            if entry.file_type().is_dir() || (entry.path_is_symlink() && entry.path().is_dir()) {
                continue;
            }
            let absolute = entry
                .path()
                .canonicalize()
                .unwrap_or_else(|_| entry.path().to_path_buf());
            let relative = match pathdiff::diff_paths(&absolute, &root) {
                Some(diff) if absolute.starts_with(&root) => normalize_path(&diff),
                _ => relative_path(&normalize_path(&absolute), &base),
            };
            paths.push(relative);
        }
    }
    paths
}

pub fn entry_from_drop(dropped: &[PathBuf], project_root: &Path) -> HistoryEntry {
    HistoryEntry::new(collect_dropped_paths(dropped, project_root))
}
