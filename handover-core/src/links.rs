use std::sync::LazyLock;

use regex::Regex;

// `.md` followed by exactly one character that is not an ASCII word character.
static MARKUP_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.md([^0-9A-Za-z_])").expect("valid link pattern"));

/// Point references to markdown sources at the generated pages instead.
///
/// This is a plain textual pass: every `.md` followed by a non-word
/// character is rewritten, including ones inside code spans or prose.
/// A `.md` at the very end of the text has no following character and is
/// left alone.
pub fn rewrite_links(text: &str) -> String {
    MARKUP_LINK.replace_all(text, ".html${1}").into_owned()
}
