use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::fs;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::PageSettings;
use crate::links::rewrite_links;
use crate::markdown::{MarkdownRenderer, Renderer};
use crate::template::PageTemplate;
use crate::writer::write_page;

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("source directory not specified")]
    MissingSourceDir,
    #[error("page template not specified")]
    MissingTemplate,
}

#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("{} could not be read: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{} could not be written: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Called after every successful conversion with the source path relative to
/// the source root.
pub trait ConversionHook: Send + Sync {
    fn converted(&self, source: &Path);
}

/// Per-file outcome counts for one walk.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BuildReport {
    pub written: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl BuildReport {
    fn merge(&mut self, other: BuildReport) {
        self.written += other.written;
        self.failed += other.failed;
        self.skipped += other.skipped;
    }
}

pub struct PipelineBuilder {
    source_dir: Option<PathBuf>,
    output_dir: PathBuf,
    template: Option<Arc<PageTemplate>>,
    settings: PageSettings,
    renderer: Option<Arc<dyn Renderer>>,
    hook: Option<Arc<dyn ConversionHook>>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            source_dir: None,
            output_dir: PathBuf::from("./dist"),
            template: None,
            settings: PageSettings::default(),
            renderer: None,
            hook: None,
        }
    }

    // Required configuration
    pub fn source_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.source_dir = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn template(mut self, template: Arc<PageTemplate>) -> Self {
        self.template = Some(template);
        self
    }

    // Optional configuration
    pub fn output_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.output_dir = path.as_ref().to_path_buf();
        self
    }

    pub fn page_settings(mut self, settings: PageSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Replace the default markdown renderer.
    pub fn renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    pub fn hook(mut self, hook: Arc<dyn ConversionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    pub fn build(self) -> Result<Pipeline, BuildError> {
        let source_root = self.source_dir.ok_or(BuildError::MissingSourceDir)?;
        let template = self.template.ok_or(BuildError::MissingTemplate)?;
        let renderer = self.renderer.unwrap_or_else(|| {
            Arc::new(MarkdownRenderer::new(self.settings.syntax_theme.clone()))
        });

        Ok(Pipeline {
            source_root,
            output_root: self.output_dir,
            template,
            settings: self.settings,
            renderer,
            hook: self.hook,
        })
    }
}

/// Mirrors a source tree of markdown files into a tree of composed pages.
pub struct Pipeline {
    source_root: PathBuf,
    output_root: PathBuf,
    template: Arc<PageTemplate>,
    settings: PageSettings,
    renderer: Arc<dyn Renderer>,
    hook: Option<Arc<dyn ConversionHook>>,
}

pub type WalkFuture = Pin<Box<dyn Future<Output = BuildReport> + Send>>;

impl Pipeline {
    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Convert the whole source tree. Per-file failures are logged and
    /// counted, never returned.
    pub async fn build(self: &Arc<Self>) -> BuildReport {
        if let Err(err) = fs::create_dir_all(&self.output_root).await {
            error!(
                path = %self.output_root.display(),
                "{} could not be created: {err}",
                self.output_root.display()
            );
        }

        self.walk_dir(PathBuf::new()).await
    }

    /// List one directory (relative to the source root) and visit each entry
    /// concurrently. Resolves once every entry below it has been handled.
    pub fn walk_dir(self: &Arc<Self>, dir: PathBuf) -> WalkFuture {
        let pipeline = Arc::clone(self);

        Box::pin(async move {
            let mut report = BuildReport::default();
            let source_dir = pipeline.source_root.join(&dir);

            let mut entries = match fs::read_dir(&source_dir).await {
                Ok(entries) => entries,
                Err(err) => {
                    error!(
                        path = %source_dir.display(),
                        "{} can't be read as a directory: {err}",
                        source_dir.display()
                    );
                    report.failed += 1;
                    return report;
                }
            };

            let mut tasks = JoinSet::new();
            loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => {
                        let child = dir.join(entry.file_name());
                        let pipeline = Arc::clone(&pipeline);
                        tasks.spawn(async move { pipeline.visit(child).await });
                    }
                    Ok(None) => break,
                    Err(err) => {
                        error!(
                            path = %source_dir.display(),
                            "listing {} stopped early: {err}",
                            source_dir.display()
                        );
                        report.failed += 1;
                        break;
                    }
                }
            }

            while let Some(joined) = tasks.join_next().await {
                match joined {
                    Ok(child) => report.merge(child),
                    Err(err) => {
                        error!("conversion task did not finish: {err}");
                        report.failed += 1;
                    }
                }
            }

            report
        })
    }

    async fn visit(self: Arc<Self>, entry: PathBuf) -> BuildReport {
        let source = self.source_root.join(&entry);

        // Follows symlinks, so a link to a directory is walked like one.
        let metadata = match fs::metadata(&source).await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = %source.display(), "{} can't be inspected: {err}", source.display());
                return BuildReport {
                    skipped: 1,
                    ..BuildReport::default()
                };
            }
        };

        if metadata.is_dir() {
            self.mirror_dir(&entry).await;
            self.walk_dir(entry).await
        } else if metadata.is_file() {
            let mut report = BuildReport::default();
            if self.run_file(&entry).await {
                report.written += 1;
            } else {
                report.failed += 1;
            }
            report
        } else {
            warn!(
                path = %source.display(),
                "{} is neither a file nor a directory, skipping",
                source.display()
            );
            BuildReport {
                skipped: 1,
                ..BuildReport::default()
            }
        }
    }

    async fn mirror_dir(&self, dir: &Path) {
        let target = self.output_root.join(dir);
        match fs::create_dir(&target).await {
            Ok(()) => debug!(path = %target.display(), "created {}", target.display()),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {}
            Err(err) => error!(
                path = %target.display(),
                "{} could not be created: {err}",
                target.display()
            ),
        }
    }

    /// Convert one file and log the outcome. Returns whether a page was written.
    pub async fn run_file(&self, source: &Path) -> bool {
        match self.convert(source).await {
            Ok(target) => {
                info!(path = %target.display(), "{} written", target.display());
                if let Some(hook) = &self.hook {
                    hook.converted(source);
                }
                true
            }
            Err(err) => {
                error!("{err}");
                false
            }
        }
    }

    /// Read, rewrite, render, compose and write a single file given relative
    /// to the source root.
    pub async fn convert(&self, source: &Path) -> Result<PathBuf, ConvertError> {
        let source_path = self.source_root.join(source);
        let bytes = fs::read(&source_path).await.map_err(|err| ConvertError::Read {
            path: source_path.clone(),
            source: err,
        })?;

        let text = rewrite_links(&String::from_utf8_lossy(&bytes));
        let fragment = self.renderer.render(&text);
        let page = self.template.compose(&fragment, &source_path, &self.settings);

        let destination = self.output_root.join(source);
        write_page(&destination, &page)
            .await
            .map_err(|err| ConvertError::Write {
                path: crate::writer::target_path(&destination),
                source: err,
            })
    }
}
