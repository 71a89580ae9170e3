use serde::{Deserialize, Serialize};

/// Extension of the markdown sources.
pub const MARKUP_EXTENSION: &str = "md";
/// Extension of the generated pages.
pub const PAGE_EXTENSION: &str = "html";

/// Operating mode, decided once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Development,
    Production,
}

impl Mode {
    /// `development` in any case selects development mode, and so does an
    /// empty value, which counts as unset. Anything else does not.
    pub fn from_setting(value: &str) -> Self {
        let value = value.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("development") {
            Mode::Development
        } else {
            Mode::Production
        }
    }

    pub fn watches(&self) -> bool {
        matches!(self, Mode::Development)
    }
}

#[derive(Deserialize, Serialize, Debug, Clone)]
#[serde(default)]
pub struct Config {
    pub mode: String,
    pub page: PageSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            mode: "development".to_string(),
            page: PageSettings::default(),
        }
    }
}

impl Config {
    pub fn mode(&self) -> Mode {
        Mode::from_setting(&self.mode)
    }
}

/// Settings the template compositor reads for every page.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PageSettings {
    /// Parent directory name that marks a top-level document.
    pub root_marker: String,
    /// Title used for top-level documents.
    pub root_title: String,
    /// Markup inserted as the operation control of module pages.
    pub back_control: String,
    /// Syntect theme for fenced code blocks.
    pub syntax_theme: String,
}

impl Default for PageSettings {
    fn default() -> Self {
        Self {
            root_marker: "src".to_string(),
            root_title: "Handover Documentation".to_string(),
            back_control: r#"<button id="back">Back</button>"#.to_string(),
            syntax_theme: "base16-ocean.dark".to_string(),
        }
    }
}
