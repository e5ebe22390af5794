//! Line-oriented parser for the backend's config.ini
//!
//! Recognises `;` comments, `[section]` headers and `key=value` lines. A blank
//! line closes the current section, so any following keys land at the top
//! level. Anything else is ignored.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static SECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[\s*([^\]]*)\s*\]\s*$").expect("valid section regex"));
static PARAM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*([^=]+?)\s*=\s*(.*?)\s*$").expect("valid param regex"));
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*;").expect("valid comment regex"));

/// A top-level entry: either a plain value or a whole section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IniValue {
    Value(String),
    Section(BTreeMap<String, String>),
}

/// Parsed INI text
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IniDocument(pub BTreeMap<String, IniValue>);

impl IniDocument {
    /// A key outside of any section
    pub fn top_level(&self, key: &str) -> Option<&str> {
        match self.0.get(key) {
            Some(IniValue::Value(v)) => Some(v),
            _ => None,
        }
    }

    pub fn section(&self, name: &str) -> Option<&BTreeMap<String, String>> {
        match self.0.get(name) {
            Some(IniValue::Section(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.section(section)
            .and_then(|s| s.get(key))
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Parse INI text into a nested mapping.
///
/// Duplicate keys keep the last value. Reopening a section merges into it.
pub fn parse_ini_string(text: &str) -> IniDocument {
    let mut doc = BTreeMap::new();
    let mut current: Option<String> = None;

    for line in text.lines() {
        if COMMENT.is_match(line) {
            continue;
        }

        if let Some(caps) = PARAM.captures(line) {
            let key = caps[1].to_string();
            let value = caps[2].to_string();
            match &current {
                Some(section) => {
                    if let Some(IniValue::Section(entries)) = doc.get_mut(section) {
                        entries.insert(key, value);
                    }
                }
                None => {
                    doc.insert(key, IniValue::Value(value));
                }
            }
        } else if let Some(caps) = SECTION.captures(line) {
            let name = caps[1].trim().to_string();
            match doc.get(&name) {
                Some(IniValue::Section(_)) => {}
                _ => {
                    doc.insert(name.clone(), IniValue::Section(BTreeMap::new()));
                }
            }
            current = Some(name);
        } else if line.trim().is_empty() && current.is_some() {
            current = None;
        }
    }

    IniDocument(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn section(pairs: &[(&str, &str)]) -> IniValue {
        IniValue::Section(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn sections_separated_by_blank_line() {
        let doc = parse_ini_string("[a]\nk=v\n\n[b]\nk2=v2");

        let mut expected = BTreeMap::new();
        expected.insert("a".to_string(), section(&[("k", "v")]));
        expected.insert("b".to_string(), section(&[("k2", "v2")]));
        assert_eq!(doc, IniDocument(expected));
        assert_eq!(doc.top_level("k"), None);
        assert_eq!(doc.top_level("k2"), None);
    }

    #[test]
    fn blank_line_resets_to_top_level() {
        let doc = parse_ini_string("[a]\nk=v\n\nk2=v2");

        assert_eq!(doc.get("a", "k"), Some("v"));
        assert_eq!(doc.get("a", "k2"), None);
        assert_eq!(doc.top_level("k2"), Some("v2"));
    }

    #[test]
    fn comments_never_become_keys() {
        let doc = parse_ini_string("; top = comment\n[a]\n;inner=comment\nk=v");

        assert_eq!(doc.0.len(), 1);
        assert_eq!(doc.section("a").unwrap().len(), 1);
        assert_eq!(doc.get("a", "k"), Some("v"));
    }

    #[test]
    fn whitespace_is_trimmed_around_keys_and_values() {
        let doc = parse_ini_string("[ stirring ]\n  target_rpm   =  400  \r\n");
        assert_eq!(doc.get("stirring", "target_rpm"), Some("400"));
    }

    #[test]
    fn last_write_wins() {
        let doc = parse_ini_string("[a]\nk=1\nk=2");
        assert_eq!(doc.get("a", "k"), Some("2"));
    }

    #[test]
    fn reopened_section_merges() {
        let doc = parse_ini_string("[a]\nk=1\n\n[a]\nj=2");
        assert_eq!(doc.get("a", "k"), Some("1"));
        assert_eq!(doc.get("a", "j"), Some("2"));
    }

    #[test]
    fn values_may_contain_equals() {
        let doc = parse_ini_string("url=http://x/?a=b");
        assert_eq!(doc.top_level("url"), Some("http://x/?a=b"));
    }

    #[test]
    fn malformed_lines_are_ignored() {
        let doc = parse_ini_string("just words\n[unterminated\n=novalue");
        assert!(doc.is_empty());
    }

    #[test]
    fn empty_section_is_kept() {
        let doc = parse_ini_string("[empty]\n");
        assert_eq!(doc.section("empty").map(|s| s.len()), Some(0));
    }

    #[test]
    fn serializes_as_nested_json() {
        let doc = parse_ini_string("top=1\n[a]\nk=v");
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json, serde_json::json!({"top": "1", "a": {"k": "v"}}));
    }
}
