// src/host/type_tags.rs
use super::{FileEntry, TypeTagger};

pub const PLAIN_TEXT_TAG: &str = "PLAIN_TEXT";
pub const UNKNOWN_TAG: &str = "UNKNOWN";

// Maps file extensions (lowercase) to file-type tags.
// Tags are what exclusion rules match against (case-insensitively) and,
// lower-cased, what ends up in the `{filetype}` placeholder.
pub fn map_extension_to_type_tag(extension: &str) -> Option<&'static str> {
    match extension {
        "rs" => Some("Rust"),
        "py" | "pyi" | "pyw" => Some("Python"),
        "rb" | "rake" => Some("Ruby"),
        "c" | "h" => Some("C"),
        "cpp" | "cc" | "cxx" | "hpp" | "hh" => Some("CPP"),
        "go" => Some("Go"),
        "java" => Some("JAVA"),
        "kt" | "kts" => Some("Kotlin"),
        "scala" => Some("Scala"),
        "swift" => Some("Swift"),
        "cs" => Some("CSharp"),
        "js" | "cjs" | "mjs" | "jsx" => Some("JavaScript"),
        "ts" | "tsx" => Some("TypeScript"),
        "php" => Some("PHP"),
        "sh" | "bash" | "zsh" => Some("Shell"),
        "sql" => Some("SQL"),
        "html" | "htm" => Some("HTML"),
        "css" => Some("CSS"),
        "scss" => Some("SCSS"),
        "md" | "markdown" => Some("Markdown"),
        "json" => Some("JSON"),
        "yaml" | "yml" => Some("YAML"),
        "toml" => Some("TOML"),
        "xml" => Some("XML"),
        "properties" => Some("Properties"),
        "txt" | "text" | "log" => Some(PLAIN_TEXT_TAG),
        "png" | "jpg" | "jpeg" | "gif" | "bmp" | "ico" | "svg" | "webp" => Some("Image"),
        "jar" | "zip" | "class" | "so" | "dll" | "exe" => Some("Archive"),
        _ => None,
    }
}

// Filenames (exact match - case sensitivity respected here)
pub fn map_filename_to_type_tag(filename: &str) -> Option<&'static str> {
    match filename {
        "Makefile" | "GNUmakefile" => Some("Makefile"),
        "Dockerfile" => Some("Dockerfile"),
        "Rakefile" | "Gemfile" => Some("Ruby"),
        "CMakeLists.txt" => Some("CMake"),
        ".gitignore" | ".dockerignore" => Some("IgnoreList"),
        _ => None,
    }
}

// Derives tags from well-known filenames first, then from the extension.
// Extension-less files are plain text; unrecognised extensions are
// `UNKNOWN`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtensionTypeTagger;

impl ExtensionTypeTagger {
    pub fn new() -> Self {
        ExtensionTypeTagger
    }
}

impl TypeTagger for ExtensionTypeTagger {
    fn type_tag(&self, entry: &FileEntry) -> String {
        if let Some(tag) = map_filename_to_type_tag(entry.name()) {
            return tag.to_string();
        }
        let tag = match entry.extension() {
            Some(ext) => map_extension_to_type_tag(&ext.to_lowercase()).unwrap_or(UNKNOWN_TAG),
            None => PLAIN_TEXT_TAG,
        };
        log::trace!("Type tag for {}: {}", entry.path, tag);
        tag.to_string()
    }
}
