// Resolve → render → count, run inline or on a background worker.

use crate::config::Ruleset;
use crate::error::{AppError, Result};
use crate::host::{ExtensionTypeTagger, FileTree, LocalFileTree, TypeTagger};
use crate::render::render;
use crate::resolve::{PathResolver, ResolvedSelection};
use crate::tokens::{TokenCounterOperations, shared_counter};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

// Selections with more roots than this are generated off the calling thread.
pub const BACKGROUND_ROOT_THRESHOLD: usize = 8;

#[derive(Clone)]
pub struct Host {
    pub tree: Arc<dyn FileTree>,
    pub tagger: Arc<dyn TypeTagger>,
}

impl Host {
    pub fn new(tree: Arc<dyn FileTree>, tagger: Arc<dyn TypeTagger>) -> Self {
        Self { tree, tagger }
    }

    pub fn local() -> Self {
        Self::new(Arc::new(LocalFileTree::new()), Arc::new(ExtensionTypeTagger::new()))
    }
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub roots: Vec<String>,
    pub project_base: String,
    pub ruleset: Ruleset,
    pub tokenizer_model: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedContext {
    pub paths: Vec<String>,
    pub text: String,
    pub token_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
}

impl Progress {
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.completed as f64 / self.total as f64
        }
    }
}

// Resolves every root, then pulls in always-include paths that were not
// reached through a selected root. Cancellation is checked before each root.
pub fn resolve_selection(
    request: &GenerationRequest,
    host: &Host,
    cancel: &AtomicBool,
    on_progress: &mut dyn FnMut(Progress),
) -> Result<ResolvedSelection> {
    let resolver = PathResolver::new(
        host.tree.as_ref(),
        host.tagger.as_ref(),
        &request.ruleset,
        &request.project_base,
    );
    let total = request.roots.len();
    let mut selection = ResolvedSelection::new();

    for (index, root) in request.roots.iter().enumerate() {
        if cancel.load(Ordering::SeqCst) {
            log::info!("Generation cancelled after {} of {} roots", index, total);
            return Err(AppError::Cancelled {
                completed: index,
                total,
            });
        }
        match host.tree.find(root) {
            Some(entry) => resolver.resolve_into(&entry, &mut selection),
            None => log::warn!("Selected path not found, skipping: {}", root),
        }
        on_progress(Progress {
            completed: index + 1,
            total,
        });
    }

    for include in &request.ruleset.always_include_paths {
        if selection.contains(include) {
            continue;
        }
        let absolute = join_base(&request.project_base, include);
        match host.tree.find(&absolute) {
            Some(entry) => resolver.resolve_into(&entry, &mut selection),
            None => log::debug!("Always-include path not found: {}", absolute),
        }
    }

    Ok(selection)
}

fn join_base(project_base: &str, relative: &str) -> String {
    if project_base.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", project_base.trim_end_matches('/'), relative)
    }
}

// Renders already-resolved paths and attaches an advisory token count.
// A tokenizer failure is logged and recorded, never returned.
pub fn render_paths(
    paths: Vec<String>,
    project_base: &str,
    template: &str,
    tokenizer_model: &str,
    host: &Host,
) -> GeneratedContext {
    let text = render(
        &paths,
        project_base,
        template,
        host.tree.as_ref(),
        host.tagger.as_ref(),
    );
    let (token_count, token_error) = match shared_counter(tokenizer_model) {
        Ok(counter) => (Some(counter.count_tokens(&text)), None),
        Err(e) => {
            log::warn!("Token count unavailable: {}", e);
            (None, Some(e.to_string()))
        }
    };
    GeneratedContext {
        paths,
        text,
        token_count,
        token_error,
    }
}

pub fn generate(
    request: &GenerationRequest,
    host: &Host,
    cancel: &AtomicBool,
    on_progress: &mut dyn FnMut(Progress),
) -> Result<GeneratedContext> {
    let selection = resolve_selection(request, host, cancel, on_progress)?;
    log::info!("Generating context for {} file(s)", selection.len());
    Ok(render_paths(
        selection.into_vec(),
        &request.project_base,
        &request.ruleset.template,
        &request.tokenizer_model,
        host,
    ))
}

#[derive(Debug, Clone)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct GenerationTask {
    progress: Receiver<Progress>,
    cancel: CancelHandle,
    handle: JoinHandle<Result<GeneratedContext>>,
}

impl GenerationTask {
    pub fn progress(&self) -> &Receiver<Progress> {
        &self.progress
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn join(self) -> Result<GeneratedContext> {
        self.handle
            .join()
            .map_err(|_| AppError::Worker("generation thread panicked".to_string()))?
    }
}

pub fn spawn_generation(request: GenerationRequest, host: Host) -> Result<GenerationTask> {
    let (tx, rx) = mpsc::channel::<Progress>();
    let flag = Arc::new(AtomicBool::new(false));
    let worker_flag = Arc::clone(&flag);

    let handle = thread::Builder::new()
        .name("contextbuilder-generate".to_string())
        .spawn(move || {
            let mut send_progress = |progress: Progress| {
                // The receiver may already be gone; progress is best-effort.
                let _ = tx.send(progress);
            };
            generate(&request, &host, &worker_flag, &mut send_progress)
        })?;

    Ok(GenerationTask {
        progress: rx,
        cancel: CancelHandle(flag),
        handle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_TEMPLATE, DEFAULT_TOKENIZER_MODEL};
    use crate::host::FileEntry;
    use crate::host::testing::MemoryFileTree;
    use std::io;

    fn host_for(tree: MemoryFileTree) -> Host {
        Host::new(Arc::new(tree), Arc::new(ExtensionTypeTagger::new()))
    }

    fn request(roots: &[&str], ruleset: Ruleset) -> GenerationRequest {
        GenerationRequest {
            roots: roots.iter().map(|r| r.to_string()).collect(),
            project_base: "/p".to_string(),
            ruleset,
            tokenizer_model: DEFAULT_TOKENIZER_MODEL.to_string(),
        }
    }

    #[test]
    fn test_generate_renders_and_counts() {
        let host = host_for(MemoryFileTree::new().with_file("/p/a.py", "print(1)"));
        let req = request(&["/p/a.py"], Ruleset::default());
        let mut seen = Vec::new();
        let out = generate(&req, &host, &AtomicBool::new(false), &mut |p| seen.push(p)).unwrap();

        assert_eq!(out.paths, vec!["a.py"]);
        assert_eq!(out.text, "# a.py\n```python\nprint(1)\n```\n\n");
        assert!(out.token_count.unwrap_or(0) > 0);
        assert_eq!(seen, vec![Progress { completed: 1, total: 1 }]);
        assert_eq!(req.ruleset.template, DEFAULT_TEMPLATE);
    }

    #[test]
    fn test_deeper_always_include_under_excluded_directory() {
        let host = host_for(
            MemoryFileTree::new()
                .with_file("/p/build/a.txt", "a")
                .with_file("/p/build/keep.txt", "k")
                .with_file("/p/src/main.py", ""),
        );
        let mut ruleset = Ruleset::default();
        ruleset.excluded_directories.insert("build".to_string());
        ruleset.always_include_paths.insert("build/keep.txt".to_string());
        ruleset.always_include_paths.insert("missing.txt".to_string());

        let selection =
            resolve_selection(&request(&["/p"], ruleset), &host, &AtomicBool::new(false), &mut |_| {})
                .unwrap();
        assert_eq!(selection.into_vec(), vec!["src/main.py", "build/keep.txt"]);
    }

    #[test]
    fn test_missing_root_is_skipped() {
        let host = host_for(MemoryFileTree::new().with_file("/p/a.txt", "a"));
        let req = request(&["/p/gone", "/p/a.txt"], Ruleset::default());
        let out = generate(&req, &host, &AtomicBool::new(false), &mut |_| {}).unwrap();
        assert_eq!(out.paths, vec!["a.txt"]);
    }

    struct CancellingTree {
        inner: MemoryFileTree,
        flag: Arc<AtomicBool>,
    }

    impl FileTree for CancellingTree {
        fn find(&self, path: &str) -> Option<FileEntry> {
            self.inner.find(path)
        }
        fn children(&self, dir: &FileEntry) -> Vec<FileEntry> {
            self.flag.store(true, Ordering::SeqCst);
            self.inner.children(dir)
        }
        fn read_text(&self, file: &FileEntry) -> io::Result<String> {
            self.inner.read_text(file)
        }
    }

    #[test]
    fn test_cancellation_is_checked_per_root() {
        let flag = Arc::new(AtomicBool::new(false));
        let tree = CancellingTree {
            inner: MemoryFileTree::new()
                .with_file("/p/one/a.txt", "a")
                .with_file("/p/two/b.txt", "b"),
            flag: Arc::clone(&flag),
        };
        let host = Host::new(Arc::new(tree), Arc::new(ExtensionTypeTagger::new()));
        let req = request(&["/p/one", "/p/two"], Ruleset::default());

        let result = generate(&req, &host, &flag, &mut |_| {});
        match result {
            Err(AppError::Cancelled { completed, total }) => {
                assert_eq!((completed, total), (1, 2));
            }
            other => panic!("expected cancellation, got {:?}", other.map(|c| c.paths)),
        }
    }

    #[test]
    fn test_background_generation_reports_progress() {
        let host = host_for(
            MemoryFileTree::new()
                .with_file("/p/a.txt", "a")
                .with_file("/p/b.txt", "b")
                .with_file("/p/c.txt", "c"),
        );
        let req = request(&["/p/a.txt", "/p/b.txt", "/p/c.txt"], Ruleset::default());
        let task = spawn_generation(req, host).unwrap();
        let progress: Vec<Progress> = task.progress().iter().collect();
        let out = task.join().unwrap();

        assert_eq!(out.paths, vec!["a.txt", "b.txt", "c.txt"]);
        assert_eq!(progress.len(), 3);
        assert_eq!(progress[2], Progress { completed: 3, total: 3 });
        assert_eq!(progress[0].fraction(), 1.0 / 3.0);
    }

    #[test]
    fn test_cancel_handle_is_shared_with_task() {
        let host = host_for(MemoryFileTree::new().with_file("/p/a.txt", "a"));
        let task = spawn_generation(request(&["/p/a.txt"], Ruleset::default()), host).unwrap();
        let handle = task.cancel_handle();
        task.cancel();
        assert!(handle.is_cancelled());
        match task.join() {
            Ok(out) => assert_eq!(out.paths, vec!["a.txt"]),
            Err(AppError::Cancelled { completed, total }) => assert_eq!((completed, total), (0, 1)),
            Err(other) => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_progress_fraction_of_empty_selection() {
        assert_eq!(Progress { completed: 0, total: 0 }.fraction(), 1.0);
    }
}
