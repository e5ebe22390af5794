//! Guarding `{{ ... }}` placeholders before YAML parsing
//!
//! Profiles may contain template expressions that the backend expands later.
//! A bare `{{x}}` is a flow mapping to a YAML parser, so it is quoted before
//! parsing. `${{x}}` is literal text for the backend and is left alone.

use std::sync::LazyLock;

use regex::Regex;

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{.*?\}\}").expect("valid placeholder regex"));

/// Quote every `{{expr}}` that is not immediately preceded by `$`
pub fn convert_template_guard(source: &str) -> String {
    let mut out = String::with_capacity(source.len() + 8);
    let mut last = 0;

    for m in PLACEHOLDER.find_iter(source) {
        let escaped = source[..m.start()].ends_with('$');
        out.push_str(&source[last..m.start()]);
        if escaped {
            out.push_str(m.as_str());
        } else {
            out.push('"');
            out.push_str(m.as_str());
            out.push('"');
        }
        last = m.end();
    }
    out.push_str(&source[last..]);
    out
}
