use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use handover_core::{ConversionHook, PageSettings, PageTemplate, Pipeline, PipelineBuilder};
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use walkdir::WalkDir;

const TEMPLATE: &str = "<title>{{title}}</title>{{operation}}<body>{{content}}</body>";

struct Fixture {
    _dir: TempDir,
    source: PathBuf,
    output: PathBuf,
}

impl Fixture {
    fn new(files: &[(&str, &str)]) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("src");
        let output = dir.path().join("dist");
        std::fs::create_dir_all(&source).unwrap();
        std::fs::create_dir_all(&output).unwrap();

        for (path, content) in files {
            let path = source.join(path);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }

        Self { _dir: dir, source, output }
    }

    fn pipeline(&self) -> Arc<Pipeline> {
        self.builder().build().map(Arc::new).unwrap()
    }

    fn builder(&self) -> PipelineBuilder {
        let template = PageTemplate::parse(TEMPLATE, "test").unwrap();
        PipelineBuilder::new()
            .source_dir(&self.source)
            .output_dir(&self.output)
            .template(Arc::new(template))
            .page_settings(PageSettings::default())
    }

    fn read(&self, path: &str) -> String {
        std::fs::read_to_string(self.output.join(path)).unwrap()
    }
}

fn tree(root: &Path) -> BTreeSet<String> {
    WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| {
            let relative = e.path().strip_prefix(root).unwrap().to_string_lossy().to_string();
            if e.file_type().is_dir() {
                format!("{relative}/")
            } else {
                relative
            }
        })
        .collect()
}

#[derive(Default)]
struct RecordingHook {
    seen: Mutex<Vec<PathBuf>>,
}

impl ConversionHook for RecordingHook {
    fn converted(&self, source: &Path) {
        self.seen.lock().unwrap().push(source.to_path_buf());
    }
}

#[tokio::test]
async fn test_output_tree_mirrors_source_tree() {
    let fixture = Fixture::new(&[
        ("index.md", "# Home"),
        ("modA/page.md", "hello"),
        ("modA/nested/deep.md", "deep"),
        ("modB/notes.txt", "plain"),
    ]);
    std::fs::create_dir(fixture.source.join("empty")).unwrap();

    let report = fixture.pipeline().build().await;

    assert_eq!(report.written, 4);
    assert_eq!(report.failed, 0);
    let expected: BTreeSet<String> = [
        "empty/",
        "index.html",
        "modA/",
        "modA/nested/",
        "modA/nested/deep.html",
        "modA/page.html",
        "modB/",
        "modB/notes.txt",
    ]
    .into_iter()
    .map(String::from)
    .collect();
    assert_eq!(tree(&fixture.output), expected);
}

#[tokio::test]
async fn test_pages_are_titled_by_module() {
    let fixture = Fixture::new(&[("index.md", "top"), ("modA/page.md", "hi")]);

    fixture.pipeline().build().await;

    assert_eq!(
        fixture.read("modA/page.html"),
        "<title>modA</title><button id=\"back\">Back</button><body><p>hi</p>\n</body>"
    );
    assert_eq!(
        fixture.read("index.html"),
        "<title>Handover Documentation</title><body><p>top</p>\n</body>"
    );
}

#[tokio::test]
async fn test_links_point_at_generated_pages() {
    let fixture = Fixture::new(&[("index.md", "see [guide](modA/guide.md) and [b](b.md#top).")]);

    fixture.pipeline().build().await;

    let page = fixture.read("index.html");
    assert!(page.contains("<a href=\"modA/guide.html\">guide</a>"));
    assert!(page.contains("<a href=\"b.html#top\">b</a>"));
}

#[tokio::test]
async fn test_rebuild_is_byte_identical() {
    let fixture = Fixture::new(&[
        ("index.md", "# Home\n\n[a](modA/a.md)"),
        ("modA/a.md", "```rust\nfn main() {}\n```\n"),
    ]);
    let pipeline = fixture.pipeline();

    pipeline.build().await;
    let first: Vec<_> = tree(&fixture.output)
        .into_iter()
        .filter(|p| !p.ends_with('/'))
        .map(|p| (p.clone(), std::fs::read(fixture.output.join(&p)).unwrap()))
        .collect();

    pipeline.build().await;
    let second: Vec<_> = tree(&fixture.output)
        .into_iter()
        .filter(|p| !p.ends_with('/'))
        .map(|p| (p.clone(), std::fs::read(fixture.output.join(&p)).unwrap()))
        .collect();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_write_failure_does_not_stop_siblings() {
    let fixture = Fixture::new(&[
        ("modA/a.md", "a"),
        ("modA/b.md", "b"),
        ("modA/c.md", "c"),
    ]);
    // A directory squatting on the target makes that one write fail.
    std::fs::create_dir_all(fixture.output.join("modA/b.html")).unwrap();

    let report = fixture.pipeline().build().await;

    assert_eq!(report.written, 2);
    assert_eq!(report.failed, 1);
    assert!(fixture.read("modA/a.html").contains("<p>a</p>"));
    assert!(fixture.read("modA/c.html").contains("<p>c</p>"));
}

#[tokio::test]
async fn test_missing_output_root_is_created() {
    let fixture = Fixture::new(&[("index.md", "x")]);
    std::fs::remove_dir_all(&fixture.output).unwrap();

    let report = fixture.pipeline().build().await;

    assert_eq!(report.written, 1);
    assert!(fixture.output.join("index.html").is_file());
}

#[tokio::test]
async fn test_hook_sees_each_converted_file() {
    let fixture = Fixture::new(&[("index.md", "x"), ("modA/a.md", "a")]);
    std::fs::create_dir_all(fixture.output.join("modA/a.html")).unwrap();
    let hook = Arc::new(RecordingHook::default());

    let pipeline = Arc::new(fixture.builder().hook(hook.clone()).build().unwrap());
    pipeline.build().await;

    // Failed conversions are never reported to the hook.
    let seen = hook.seen.lock().unwrap().clone();
    assert_eq!(seen, vec![PathBuf::from("index.md")]);
}

#[tokio::test]
async fn test_convert_single_file() {
    let fixture = Fixture::new(&[("modA/a.md", "first")]);
    let pipeline = fixture.pipeline();
    pipeline.build().await;

    std::fs::write(fixture.source.join("modA/a.md"), "second").unwrap();
    let target = pipeline.convert(Path::new("modA/a.md")).await.unwrap();

    assert_eq!(target, fixture.output.join("modA/a.html"));
    assert!(fixture.read("modA/a.html").contains("<p>second</p>"));
}

#[tokio::test]
async fn test_convert_reports_read_failure() {
    let fixture = Fixture::new(&[]);
    let pipeline = fixture.pipeline();

    let err = pipeline.convert(Path::new("gone.md")).await.unwrap_err();

    assert!(matches!(err, handover_core::ConvertError::Read { .. }));
    assert!(!pipeline.run_file(Path::new("gone.md")).await);
}

#[cfg(unix)]
#[tokio::test]
async fn test_dangling_entries_are_skipped() {
    let fixture = Fixture::new(&[("index.md", "x")]);
    std::os::unix::fs::symlink(fixture.source.join("nowhere"), fixture.source.join("broken.md"))
        .unwrap();

    let report = fixture.pipeline().build().await;

    assert_eq!(report.written, 1);
    assert_eq!(report.skipped, 1);
    assert!(!fixture.output.join("broken.html").exists());
}

#[test]
fn test_builder_requires_source_and_template() {
    let err = PipelineBuilder::new().build().err().unwrap();
    assert!(matches!(err, handover_core::BuildError::MissingSourceDir));

    let err = PipelineBuilder::new().source_dir("src").build().err().unwrap();
    assert!(matches!(err, handover_core::BuildError::MissingTemplate));
}
