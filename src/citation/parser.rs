use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A `{file, startLine, endLine}` reference claimed by generated text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub file: String,
    #[serde(alias = "start_line")]
    pub start_line: usize,
    #[serde(alias = "end_line")]
    pub end_line: usize,
}

impl Citation {
    pub fn new(file: impl Into<String>, start_line: usize, end_line: usize) -> Self {
        Self {
            file: file.into(),
            start_line,
            end_line,
        }
    }
}

/// Finds `[path:start-end]` and `[path:line]` tokens in free text.
///
/// Purely syntactic. A bracket body cannot contain `[` or `]`, so with nested
/// brackets the match starts at the innermost opening bracket, and a match
/// never spans two tokens. A body holding several references
/// (`[a.py:1-2 and b.py:3-4]`) yields each of them, with paths cut at
/// whitespace.
pub struct CitationParser {
    pattern: Regex,
    /// A `:line[-line]` followed by more text inside a matched path.
    embedded: Regex,
    /// One reference within a multi-reference body.
    reference: Regex,
}

impl CitationParser {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"\[([^\[\]\n]+?):\s*(\d+)(?:\s*[-–]\s*(\d+))?\s*\]")
                .expect("citation pattern is valid"),
            embedded: Regex::new(r":\s*\d+(?:\s*[-–]\s*\d+)?[\s,;]").expect("embedded pattern is valid"),
            reference: Regex::new(r"([^\s\[\],;]+?):\s*(\d+)(?:\s*[-–]\s*(\d+))?\b")
                .expect("reference pattern is valid"),
        }
    }

    /// Citations in first-seen order, identical triples reported once.
    /// Tokens with unparsable or inverted line numbers are skipped.
    pub fn parse(&self, text: &str) -> Vec<Citation> {
        let mut seen = HashSet::new();
        let mut citations = Vec::new();

        for caps in self.pattern.captures_iter(text) {
            let found: Vec<Citation> = if self.embedded.is_match(&caps[1]) {
                let token = &caps[0];
                let body = &token[1..token.len() - 1];
                self.reference.captures_iter(body).filter_map(|c| to_citation(&c)).collect()
            } else {
                to_citation(&caps).into_iter().collect()
            };

            for citation in found {
                if seen.insert(citation.clone()) {
                    citations.push(citation);
                }
            }
        }

        citations
    }
}

/// Groups 1-3 are path, start and optional end.
fn to_citation(caps: &Captures) -> Option<Citation> {
    let file = caps[1].trim().trim_matches('`').trim();
    if file.is_empty() {
        return None;
    }
    let start = caps[2].parse::<usize>().ok()?;
    let end = match caps.get(3) {
        Some(m) => m.as_str().parse::<usize>().ok()?,
        None => start,
    };
    if start == 0 || end < start {
        return None;
    }
    Some(Citation::new(file, start, end))
}

impl Default for CitationParser {
    fn default() -> Self {
        Self::new()
    }
}
