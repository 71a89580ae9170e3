use std::sync::LazyLock;
use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd, html};
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

// Initialize syntax highlighting resources once
static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);
static THEME_SET: LazyLock<ThemeSet> = LazyLock::new(ThemeSet::load_defaults);

/// Converts markdown source text into an HTML fragment.
pub trait Renderer: Send + Sync {
    fn render(&self, source: &str) -> String;
}

/// CommonMark renderer with raw HTML passthrough and highlighted code blocks.
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    syntax_theme: String,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new("base16-ocean.dark")
    }
}

impl MarkdownRenderer {
    pub fn new<S: Into<String>>(syntax_theme: S) -> Self {
        Self {
            syntax_theme: syntax_theme.into(),
        }
    }

    fn options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_TASKLISTS
            | Options::ENABLE_FOOTNOTES
    }

    fn highlight(&self, lang: &str, code: &str) -> String {
        let syntax = SYNTAX_SET.find_syntax_by_token(lang).or_else(|| {
            // Fallback mappings for unsupported languages
            match lang {
                "toml" => SYNTAX_SET.find_syntax_by_name("YAML"),
                _ => None,
            }
        });

        let highlighted = match (syntax, THEME_SET.themes.get(&self.syntax_theme)) {
            (Some(syntax), Some(theme)) => {
                highlighted_html_for_string(code, &SYNTAX_SET, syntax, theme).ok()
            }
            _ => None,
        };

        highlighted.unwrap_or_else(|| plain_code_block(code))
    }
}

impl Renderer for MarkdownRenderer {
    fn render(&self, source: &str) -> String {
        let mut events = Parser::new_ext(source, Self::options());
        let mut processed = Vec::new();

        while let Some(event) = events.next() {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(lang))) => {
                    // Collect all text events until the end of the code block
                    let mut code = String::new();
                    for inner in events.by_ref() {
                        match inner {
                            Event::End(TagEnd::CodeBlock) => break,
                            Event::Text(text) => code.push_str(&text),
                            _ => {}
                        }
                    }
                    processed.push(Event::Html(self.highlight(&lang, &code).into()));
                }
                other => processed.push(other),
            }
        }

        let mut out = String::new();
        html::push_html(&mut out, processed.into_iter());
        out
    }
}

fn plain_code_block(code: &str) -> String {
    format!("<pre><code>{}</code></pre>\n", html_escape::encode_text(code))
}
