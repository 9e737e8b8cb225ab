use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub mod type_tags;

pub use type_tags::ExtensionTypeTagger;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileEntry {
    pub path: String,
    pub is_dir: bool,
}

impl FileEntry {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: false,
        }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            is_dir: true,
        }
    }

    pub fn name(&self) -> &str {
        self.path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.path)
    }

    pub fn extension(&self) -> Option<&str> {
        let name = self.name();
        match name.rfind('.') {
            Some(0) | None => None,
            Some(idx) => Some(&name[idx + 1..]),
        }
    }
}

pub trait FileTree: Send + Sync {
    // Looks up an absolute path. `None` means the target does not exist.
    fn find(&self, path: &str) -> Option<FileEntry>;

    fn children(&self, dir: &FileEntry) -> Vec<FileEntry>;

    fn read_text(&self, file: &FileEntry) -> io::Result<String>;
}

pub trait TypeTagger: Send + Sync {
    fn type_tag(&self, entry: &FileEntry) -> String;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

pub trait Notifier {
    fn notify(&self, level: NotificationLevel, message: &str);

    fn info(&self, message: &str) {
        self.notify(NotificationLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.notify(NotificationLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.notify(NotificationLevel::Error, message);
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, level: NotificationLevel, message: &str) {
        match level {
            NotificationLevel::Info => log::info!("{}", message),
            NotificationLevel::Warning => log::warn!("{}", message),
            NotificationLevel::Error => log::error!("{}", message),
        }
    }
}

pub fn normalize_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

// `FileTree` over the local filesystem. Children are sorted by file name
// and symlinked directories are not descended into.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileTree;

impl LocalFileTree {
    pub fn new() -> Self {
        LocalFileTree
    }
}

impl FileTree for LocalFileTree {
    fn find(&self, path: &str) -> Option<FileEntry> {
        match fs::metadata(path) {
            Ok(meta) => Some(FileEntry {
                path: path.replace('\\', "/"),
                is_dir: meta.is_dir(),
            }),
            Err(e) => {
                log::trace!("Lookup failed for {}: {}", path, e);
                None
            }
        }
    }

    fn children(&self, dir: &FileEntry) -> Vec<FileEntry> {
        let read_dir = match fs::read_dir(&dir.path) {
            Ok(rd) => rd,
            Err(e) => {
                log::warn!("Could not list directory {}: {}", dir.path, e);
                return Vec::new();
            }
        };

        let mut entries: Vec<(String, PathBuf, bool)> = Vec::new();
        for entry_result in read_dir {
            let entry = match entry_result {
                Ok(entry) => entry,
                Err(e) => {
                    log::warn!("Error reading entry in {}: {}", dir.path, e);
                    continue;
                }
            };
            let path = entry.path();
            let file_type = match entry.file_type() {
                Ok(ft) => ft,
                Err(e) => {
                    log::warn!("Could not stat {}: {}", path.display(), e);
                    continue;
                }
            };
            let is_dir = if file_type.is_symlink() {
                if path.is_dir() {
                    log::trace!("Not following symlinked directory: {}", path.display());
                    continue;
                }
                false
            } else {
                file_type.is_dir()
            };
            entries.push((entry.file_name().to_string_lossy().into_owned(), path, is_dir));
        }
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        entries
            .into_iter()
            .map(|(_, path, is_dir)| FileEntry {
                path: normalize_path(&path),
                is_dir,
            })
            .collect()
    }

    fn read_text(&self, file: &FileEntry) -> io::Result<String> {
        let bytes = fs::read(&file.path)?;
        decode_text(bytes)
    }
}

// Honours a UTF-8 or UTF-16 byte-order mark. Stray bytes in 8-bit text become U+FFFD.
pub fn decode_text(bytes: Vec<u8>) -> io::Result<String> {
    let invalid = |msg: String| io::Error::new(io::ErrorKind::InvalidData, msg);
    match bytes.as_slice() {
        [0xEF, 0xBB, 0xBF, rest @ ..] => Ok(String::from_utf8_lossy(rest).into_owned()),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes).map_err(invalid),
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes).map_err(invalid),
        _ => Ok(match String::from_utf8(bytes) {
            Ok(text) => text,
            Err(e) => {
                log::debug!("Replacing invalid UTF-8 at byte {}", e.utf8_error().valid_up_to());
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        }),
    }
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String, String> {
    if bytes.len() % 2 != 0 {
        return Err("truncated UTF-16 data".to_string());
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| e.to_string())
}
