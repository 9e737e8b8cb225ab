// Turns a file/folder selection plus a `Ruleset` into an ordered,
// deduplicated list of project-relative file paths.

use crate::config::Ruleset;
use crate::host::{FileEntry, FileTree, TypeTagger};
use indexmap::IndexSet;
use serde::Serialize;

// Strips `project_base` from `absolute` when it is a path prefix (on a
// segment boundary). Otherwise the path is returned unchanged, as it is
// when the base is empty.
pub fn relative_path(absolute: &str, project_base: &str) -> String {
    if project_base.is_empty() {
        return absolute.to_string();
    }
    if absolute == project_base {
        return String::new();
    }
    let base = project_base.trim_end_matches('/');
    match absolute.strip_prefix(base) {
        Some(rest) if rest.starts_with('/') => rest[1..].to_string(),
        _ => absolute.to_string(),
    }
}

// Files only, no duplicates, first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ResolvedSelection {
    paths: IndexSet<String>,
}

impl ResolvedSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, path: String) -> bool {
        self.paths.insert(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }

    pub fn into_vec(self) -> Vec<String> {
        self.paths.into_iter().collect()
    }
}

pub struct PathResolver<'a> {
    tree: &'a dyn FileTree,
    tagger: &'a dyn TypeTagger,
    ruleset: &'a Ruleset,
    project_base: &'a str,
}

impl<'a> PathResolver<'a> {
    pub fn new(
        tree: &'a dyn FileTree,
        tagger: &'a dyn TypeTagger,
        ruleset: &'a Ruleset,
        project_base: &'a str,
    ) -> Self {
        Self {
            tree,
            tagger,
            ruleset,
            project_base,
        }
    }

    pub fn resolve(&self, roots: &[FileEntry]) -> ResolvedSelection {
        let mut selection = ResolvedSelection::new();
        for root in roots {
            self.resolve_into(root, &mut selection);
        }
        log::debug!(
            "Resolved {} root(s) into {} file(s)",
            roots.len(),
            selection.len()
        );
        selection
    }

    pub fn resolve_into(&self, entry: &FileEntry, selection: &mut ResolvedSelection) {
        let relative = relative_path(&entry.path, self.project_base);
        let always_include = self.ruleset.is_always_included(&relative);

        if !always_include && self.ruleset.is_directory_excluded(&relative) {
            log::trace!("Skipping excluded path: {}", relative);
            return;
        }

        if entry.is_dir {
            for child in self.tree.children(entry) {
                self.resolve_into(&child, selection);
            }
            return;
        }

        if !always_include {
            let tag = self.tagger.type_tag(entry);
            if self.ruleset.is_type_excluded(&tag) {
                log::trace!("Skipping {} (excluded type {})", relative, tag);
                return;
            }
        }

        if !selection.push(relative) {
            log::trace!("Duplicate path ignored: {}", entry.path);
        }
    }
}

pub fn resolve(
    roots: &[FileEntry],
    ruleset: &Ruleset,
    project_base: &str,
    tree: &dyn FileTree,
    tagger: &dyn TypeTagger,
) -> ResolvedSelection {
    PathResolver::new(tree, tagger, ruleset, project_base).resolve(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::ExtensionTypeTagger;
    use crate::host::testing::MemoryFileTree;

    fn ruleset(dirs: &[&str], includes: &[&str], types: &[&str]) -> Ruleset {
        Ruleset {
            excluded_directories: dirs.iter().map(|s| s.to_string()).collect(),
            always_include_paths: includes.iter().map(|s| s.to_string()).collect(),
            excluded_file_types: types.iter().map(|s| s.to_string()).collect(),
            ..Ruleset::default()
        }
    }

    fn run(tree: &MemoryFileTree, roots: &[&str], rules: &Ruleset) -> Vec<String> {
        let roots: Vec<FileEntry> = roots.iter().filter_map(|r| tree.find(r)).collect();
        resolve(&roots, rules, "/p", tree, &ExtensionTypeTagger::new()).into_vec()
    }

    #[test]
    fn test_relative_path_on_segment_boundary() {
        assert_eq!(relative_path("/p/src/a.rs", "/p"), "src/a.rs");
        assert_eq!(relative_path("/p/src/a.rs", "/p/"), "src/a.rs");
        assert_eq!(relative_path("/proj/a.rs", "/p"), "/proj/a.rs");
        assert_eq!(relative_path("/x/a.rs", ""), "/x/a.rs");
        assert_eq!(relative_path("/p", "/p"), "");
    }

    #[test]
    fn test_always_include_under_excluded_directory() {
        let tree = MemoryFileTree::new()
            .with_file("/p/build/a.txt", "a")
            .with_file("/p/build/keep.txt", "k")
            .with_file("/p/src/main.py", "print(1)");
        let rules = ruleset(&["build/"], &["build/keep.txt"], &[]);
        let out = run(&tree, &["/p"], &rules);
        assert_eq!(out, vec!["build/keep.txt", "src/main.py"]);
    }

    #[test]
    fn test_excluded_prefix_hides_whole_subtree() {
        let tree = MemoryFileTree::new()
            .with_file("/p/build/a.txt", "a")
            .with_file("/p/build/deep/b.txt", "b")
            .with_file("/p/src/main.py", "");
        let rules = ruleset(&["build/"], &[], &[]);
        assert_eq!(run(&tree, &["/p"], &rules), vec!["src/main.py"]);
    }

    #[test]
    fn test_always_included_directory_bypasses_exclusions_for_itself() {
        let tree = MemoryFileTree::new()
            .with_file("/p/vendor/lib.py", "")
            .with_file("/p/vendor/notes.txt", "");
        let rules = ruleset(&["vendor"], &["vendor"], &["Python"]);
        // The directory is walked, but its children are judged on their own.
        assert_eq!(run(&tree, &["/p/vendor"], &rules), Vec::<String>::new());
    }

    #[test]
    fn test_always_include_overrides_type_exclusion() {
        let tree = MemoryFileTree::new()
            .with_file("/p/a.json", "{}")
            .with_file("/p/b.json", "{}");
        let rules = ruleset(&[], &["b.json"], &["json"]);
        assert_eq!(run(&tree, &["/p"], &rules), vec!["b.json"]);
    }

    #[test]
    fn test_dedup_preserves_first_seen_order() {
        let tree = MemoryFileTree::new()
            .with_file("/p/src/b.rs", "")
            .with_file("/p/src/a.rs", "")
            .with_file("/p/README.md", "");
        let rules = Ruleset::default();
        let out = run(&tree, &["/p/src/a.rs", "/p", "/p/src"], &rules);
        assert_eq!(out, vec!["src/a.rs", "src/b.rs", "README.md"]);
    }

    #[test]
    fn test_path_outside_base_kept_absolute() {
        let tree = MemoryFileTree::new().with_file("/other/x.rs", "");
        let out = run(&tree, &["/other/x.rs"], &Ruleset::default());
        assert_eq!(out, vec!["/other/x.rs"]);
    }
}
