// Document rendering: one template block per resolved path.
use crate::host::{FileTree, TypeTagger};
use rayon::prelude::*;
use std::path::Path;

pub const FILE_SEPARATOR: &str = "\n\n";
pub const READ_ERROR_PREFIX: &str = "Error reading file: ";

const PLACEHOLDER_PATH: &str = "{path}";
const PLACEHOLDER_FILETYPE: &str = "{filetype}";
const PLACEHOLDER_CONTENT: &str = "{content}";

// Replaces `{path}`, `{filetype}` and `{content}` in one left-to-right pass.
// Substituted text is never re-scanned and unknown placeholders stay as-is.
pub fn substitute_template(template: &str, path: &str, filetype: &str, content: &str) -> String {
    let mut out = String::with_capacity(template.len() + path.len() + content.len());
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let replacement = [
            (PLACEHOLDER_PATH, path),
            (PLACEHOLDER_FILETYPE, filetype),
            (PLACEHOLDER_CONTENT, content),
        ]
        .into_iter()
        .find(|(placeholder, _)| tail.starts_with(placeholder));

        match replacement {
            Some((placeholder, value)) => {
                out.push_str(value);
                rest = &tail[placeholder.len()..];
            }
            None => {
                out.push('{');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn absolute_path(relative: &str, project_base: &str) -> String {
    if project_base.is_empty() || Path::new(relative).is_absolute() || relative.starts_with('/') {
        relative.to_string()
    } else {
        format!("{}/{}", project_base.trim_end_matches('/'), relative)
    }
}

fn render_block(
    relative: &str,
    project_base: &str,
    template: &str,
    tree: &dyn FileTree,
    tagger: &dyn TypeTagger,
) -> Option<String> {
    let absolute = absolute_path(relative, project_base);
    let entry = match tree.find(&absolute) {
        Some(entry) if !entry.is_dir => entry,
        Some(_) => {
            log::trace!("Skipping directory during render: {}", absolute);
            return None;
        }
        None => {
            log::debug!("Skipping missing file during render: {}", absolute);
            return None;
        }
    };

    let content = match tree.read_text(&entry) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("Could not read {}: {}", absolute, e);
            format!("{}{}", READ_ERROR_PREFIX, e)
        }
    };
    let filetype = tagger.type_tag(&entry).to_lowercase();

    let mut block = substitute_template(template, relative, &filetype, &content);
    block.push_str(FILE_SEPARATOR);
    Some(block)
}

// Concatenates one block per path in input order. Reads may happen in
// parallel; the output does not depend on scheduling.
pub fn render<S: AsRef<str> + Sync>(
    paths: &[S],
    project_base: &str,
    template: &str,
    tree: &dyn FileTree,
    tagger: &dyn TypeTagger,
) -> String {
    let blocks: Vec<Option<String>> = paths
        .par_iter()
        .map(|path| render_block(path.as_ref(), project_base, template, tree, tagger))
        .collect();

    let rendered: String = blocks.into_iter().flatten().collect();
    log::debug!(
        "Rendered {} path(s) into {} bytes",
        paths.len(),
        rendered.len()
    );
    rendered
}
