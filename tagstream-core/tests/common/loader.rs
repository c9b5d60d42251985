//! Fixture loading from YAML files

use serde::Deserialize;
use tagstream_core::ParserOptions;

use std::path::Path;

/// A single test case from a fixture file
#[derive(Debug, Clone, Deserialize)]
pub struct TestCase {
    pub id: String,
    pub desc: String,
    pub html: String,
    /// Parser switches the case needs (all off by default)
    #[serde(default)]
    pub options: CaseOptions,
    /// The case depends on end-of-input position; skip context wrapping
    #[serde(default)]
    pub standalone: bool,
    pub events: Vec<ExpectedEvent>,
}

/// Deserializable subset of [`ParserOptions`]
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct CaseOptions {
    pub xml_mode: bool,
    pub decode_entities: bool,
    pub recognize_self_closing: bool,
    pub recognize_cdata: bool,
}

impl CaseOptions {
    pub fn to_parser_options(self) -> ParserOptions {
        ParserOptions {
            xml_mode: self.xml_mode,
            decode_entities: self.decode_entities,
            recognize_self_closing: self.recognize_self_closing,
            recognize_cdata: self.recognize_cdata,
            ..ParserOptions::default()
        }
    }
}

/// Expected event - either a bare name or [name, content]
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ExpectedEvent {
    /// Event with no content (CommentEnd, CdataStart, End, ...)
    Bare(String),
    /// Content event [EventName, "content"]
    WithContent(String, String),
}

impl ExpectedEvent {
    pub fn name(&self) -> &str {
        match self {
            ExpectedEvent::Bare(name) => name,
            ExpectedEvent::WithContent(name, _) => name,
        }
    }

    pub fn content(&self) -> Option<&str> {
        match self {
            ExpectedEvent::Bare(_) => None,
            ExpectedEvent::WithContent(_, content) => Some(content),
        }
    }
}

/// Load all test cases from a YAML fixture file
pub fn load_fixtures(path: &Path) -> Vec<TestCase> {
    let content = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read fixture file {:?}: {}", path, e));
    serde_yaml::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture file {:?}: {}", path, e))
}

/// Load fixtures from the standard fixtures directory
pub fn load_fixtures_by_name(name: &str) -> Vec<TestCase> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(format!("{}.yaml", name));
    load_fixtures(&path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_basic() {
        let cases = load_fixtures_by_name("basic");
        assert!(!cases.is_empty());
        assert!(cases.iter().any(|c| c.id == "open_close"));
    }
}
