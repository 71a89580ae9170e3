use std::path::Path;

use tracing::warn;

use crate::config::PageSettings;

pub const CONTENT_PLACEHOLDER: &str = "{{content}}";
pub const TITLE_PLACEHOLDER: &str = "{{title}}";
pub const OPERATION_PLACEHOLDER: &str = "{{operation}}";

const PLACEHOLDERS: [&str; 3] = [CONTENT_PLACEHOLDER, TITLE_PLACEHOLDER, OPERATION_PLACEHOLDER];

#[derive(Debug, thiserror::Error)]
pub enum TemplateError {
    #[error("failed to read template {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("template {path} has no {placeholder} placeholder")]
    MissingPlaceholder {
        path: String,
        placeholder: &'static str,
    },
}

/// The shared page every rendered fragment is wrapped in.
///
/// Loaded once at startup and read-only afterwards.
#[derive(Debug, Clone)]
pub struct PageTemplate {
    text: String,
}

impl PageTemplate {
    /// Read the template from disk and check its placeholders.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self, TemplateError> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| TemplateError::Io {
                path: path.display().to_string(),
                source,
            })?;

        Self::parse(text, &path.display().to_string())
    }

    /// Build a template from text already in memory. `origin` names it in errors.
    pub fn parse<S: Into<String>>(text: S, origin: &str) -> Result<Self, TemplateError> {
        let text = text.into();

        for placeholder in PLACEHOLDERS {
            match text.matches(placeholder).count() {
                0 => {
                    return Err(TemplateError::MissingPlaceholder {
                        path: origin.to_string(),
                        placeholder,
                    });
                }
                1 => {}
                n => warn!(
                    template = origin,
                    "{placeholder} appears {n} times in {origin}, only the first is filled"
                ),
            }
        }

        Ok(Self { text })
    }

    /// Wrap `fragment` in the template for the source file at `source_path`.
    ///
    /// Files whose parent directory is the root marker get the root title and
    /// no operation control; everything else is titled after its parent
    /// directory and gets the back control.
    pub fn compose(&self, fragment: &str, source_path: &Path, settings: &PageSettings) -> String {
        let (title, operation) = match module_name(source_path) {
            Some(module) if module != settings.root_marker => {
                (module, settings.back_control.as_str())
            }
            _ => (settings.root_title.as_str(), ""),
        };

        // Content goes in last so placeholder text inside it stays verbatim.
        self.text
            .replacen(TITLE_PLACEHOLDER, title, 1)
            .replacen(OPERATION_PLACEHOLDER, operation, 1)
            .replacen(CONTENT_PLACEHOLDER, fragment, 1)
    }
}

/// Name of the directory directly containing `path`.
pub fn module_name(path: &Path) -> Option<&str> {
    path.parent()?.file_name()?.to_str()
}
