pub mod config;
pub mod links;
pub mod markdown;
pub mod pipeline;
pub mod template;
pub mod writer;

// Re-export main types
pub use config::{Config, MARKUP_EXTENSION, Mode, PAGE_EXTENSION, PageSettings};
pub use links::rewrite_links;
pub use markdown::{MarkdownRenderer, Renderer};
pub use pipeline::{BuildError, BuildReport, ConversionHook, ConvertError, Pipeline, PipelineBuilder};
pub use template::{PageTemplate, TemplateError};
pub use writer::{target_path, write_page};
