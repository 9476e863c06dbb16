//! Repeated-run consistency check for answer outputs.
use super::parser::Citation;
use crate::indexer::chunker::Chunk;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use thiserror::Error;

/// One recorded pipeline output: the answer text plus what it cited and
/// what retrieval returned for it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnswerRecord {
    #[serde(default)]
    pub answer: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub chunks: Vec<Chunk>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum DeterminismError {
    #[error("Found {found} different outputs (expected at most {allowed})")]
    Outputs { found: usize, allowed: usize },

    #[error("Found {found} different answers (expected at most {allowed})")]
    Answers { found: usize, allowed: usize },
}

/// SHA-256 hex of the record's canonical form: citations and chunks sorted
/// by `(file, startLine, endLine)`, object keys sorted, compact JSON.
pub fn hash_output(record: &AnswerRecord) -> String {
    let mut citations: Vec<&Citation> = record.citations.iter().collect();
    citations.sort_by(|a, b| (&a.file, a.start_line, a.end_line).cmp(&(&b.file, b.start_line, b.end_line)));

    let mut chunks: Vec<&Chunk> = record.chunks.iter().collect();
    chunks.sort_by(|a, b| (&a.file, a.start_line, a.end_line).cmp(&(&b.file, b.start_line, b.end_line)));

    // serde_json::Value keeps object keys in a BTreeMap, so key order is canonical.
    let canonical = serde_json::json!({
        "answer": record.answer,
        "citations": citations,
        "chunks": chunks,
    });

    let digest = Sha256::digest(canonical.to_string().as_bytes());
    format!("{digest:x}")
}

/// Accepts at most `tolerance + 1` distinct outputs (and answer texts)
/// across `records`. Fewer than two records always pass.
pub fn validate_deterministic(records: &[AnswerRecord], tolerance: usize) -> Result<(), DeterminismError> {
    if records.len() < 2 {
        return Ok(());
    }
    let allowed = tolerance + 1;

    let hashes: HashSet<String> = records.iter().map(hash_output).collect();
    if hashes.len() > allowed {
        return Err(DeterminismError::Outputs {
            found: hashes.len(),
            allowed,
        });
    }

    let answers: HashSet<&str> = records.iter().map(|r| r.answer.as_str()).collect();
    if answers.len() > allowed {
        return Err(DeterminismError::Answers {
            found: answers.len(),
            allowed,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(file: &str, start: usize, end: usize) -> Chunk {
        Chunk {
            file: file.to_string(),
            start_line: start,
            end_line: end,
            text: format!("{file} {start}"),
        }
    }

    fn record(answer: &str) -> AnswerRecord {
        AnswerRecord {
            answer: answer.to_string(),
            citations: vec![Citation::new("b.py", 1, 2), Citation::new("a.py", 5, 9)],
            chunks: vec![chunk("b.py", 1, 80), chunk("a.py", 1, 80)],
        }
    }

    #[test]
    fn test_hash_ignores_list_order() {
        let a = record("x");
        let mut b = record("x");
        b.citations.reverse();
        b.chunks.reverse();
        assert_eq!(hash_output(&a), hash_output(&b));
        assert_eq!(hash_output(&a).len(), 64);
    }

    #[test]
    fn test_hash_sensitive_to_content() {
        let a = record("x");
        let mut b = record("x");
        b.chunks[0].text.push('!');
        assert_ne!(hash_output(&a), hash_output(&b));
        assert_ne!(hash_output(&a), hash_output(&record("y")));
    }

    #[test]
    fn test_single_record_passes() {
        assert!(validate_deterministic(&[], 0).is_ok());
        assert!(validate_deterministic(&[record("x")], 0).is_ok());
    }

    #[test]
    fn test_identical_records_pass() {
        assert!(validate_deterministic(&[record("x"), record("x"), record("x")], 0).is_ok());
    }

    #[test]
    fn test_divergent_records_fail() {
        let records = vec![record("x"), record("y")];
        assert_eq!(
            validate_deterministic(&records, 0),
            Err(DeterminismError::Outputs { found: 2, allowed: 1 })
        );
        assert!(validate_deterministic(&records, 1).is_ok());
    }

    #[test]
    fn test_records_deserialize_from_snake_case() {
        let json = r#"[{"answer": "a", "citations": [{"file": "a.py", "start_line": 1, "end_line": 2}]}]"#;
        let records: Vec<AnswerRecord> = serde_json::from_str(json).unwrap();
        assert_eq!(records[0].citations[0], Citation::new("a.py", 1, 2));
        assert!(records[0].chunks.is_empty());
    }
}
