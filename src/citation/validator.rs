//! Reconciles an answer's citations against the chunks that were actually
//! retrieved for it.
//!
//! Per citation, the first rule that finds a chunk wins:
//! 1. `ExactPath`: same `(file, start, end)` triple.
//! 2. `FilenameOnly`: same triple comparing file basenames only.
//! 3. `LineOverlap`: same basename and intersecting line ranges.
//!
//! The aggregate percentages are observability signals; nothing here blocks
//! or retries an answer.
use super::parser::Citation;
use crate::indexer::chunker::Chunk;
use crate::indexer::source::basename;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    ExactPath,
    FilenameOnly,
    LineOverlap,
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub citation: Citation,
    pub matched: bool,
    pub match_kind: MatchKind,
    /// Index into the retrieved chunk list of the chunk that satisfied the rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CitationReport {
    pub results: Vec<ValidationResult>,
    pub total_citations: usize,
    pub matched_citations: usize,
    pub total_chunks: usize,
    pub cited_chunks: usize,
    /// Percentage of citations that matched a retrieved chunk.
    pub citation_accuracy: f64,
    /// Percentage of retrieved chunks targeted by at least one matched citation.
    pub chunk_citation_rate: f64,
    /// The answer makes no citations at all.
    pub under_grounded: bool,
}

fn ranges_overlap(a_start: usize, a_end: usize, b_start: usize, b_end: usize) -> bool {
    a_start <= b_end && b_start <= a_end
}

fn same_basename(citation: &Citation, chunk: &Chunk) -> bool {
    basename(&citation.file) == basename(&chunk.file)
}

fn overlaps(citation: &Citation, chunk: &Chunk) -> bool {
    same_basename(citation, chunk)
        && ranges_overlap(citation.start_line, citation.end_line, chunk.start_line, chunk.end_line)
}

/// Classifies one citation against the retrieved chunks.
pub fn classify(citation: &Citation, chunks: &[Chunk]) -> (MatchKind, Option<usize>) {
    let same_lines =
        |chunk: &Chunk| chunk.start_line == citation.start_line && chunk.end_line == citation.end_line;

    let rules: [(MatchKind, &dyn Fn(&Chunk) -> bool); 3] = [
        (MatchKind::ExactPath, &|c| c.file == citation.file && same_lines(c)),
        (MatchKind::FilenameOnly, &|c| same_basename(citation, c) && same_lines(c)),
        (MatchKind::LineOverlap, &|c| overlaps(citation, c)),
    ];

    for (kind, rule) in rules {
        if let Some(idx) = chunks.iter().position(|c| rule(c)) {
            return (kind, Some(idx));
        }
    }
    (MatchKind::None, None)
}

/// `matched / total` as a percentage; 100 when nothing was cited.
pub fn citation_accuracy(results: &[ValidationResult]) -> f64 {
    if results.is_empty() {
        return 100.0;
    }
    let matched = results.iter().filter(|r| r.matched).count();
    matched as f64 / results.len() as f64 * 100.0
}

/// Share of retrieved chunks that some matched citation points into, using
/// the basename + line-overlap equivalence. 0 when no chunks were retrieved.
pub fn chunk_citation_rate(results: &[ValidationResult], chunks: &[Chunk]) -> f64 {
    if chunks.is_empty() {
        return 0.0;
    }
    cited_chunk_count(results, chunks) as f64 / chunks.len() as f64 * 100.0
}

fn cited_chunk_count(results: &[ValidationResult], chunks: &[Chunk]) -> usize {
    chunks
        .iter()
        .filter(|chunk| {
            results
                .iter()
                .any(|r| r.matched && overlaps(&r.citation, chunk))
        })
        .count()
}

pub fn validate(citations: &[Citation], chunks: &[Chunk]) -> CitationReport {
    let results: Vec<ValidationResult> = citations
        .iter()
        .map(|citation| {
            let (match_kind, chunk_index) = classify(citation, chunks);
            ValidationResult {
                citation: citation.clone(),
                matched: match_kind != MatchKind::None,
                match_kind,
                chunk_index,
            }
        })
        .collect();

    let matched_citations = results.iter().filter(|r| r.matched).count();
    CitationReport {
        total_citations: results.len(),
        matched_citations,
        total_chunks: chunks.len(),
        cited_chunks: cited_chunk_count(&results, chunks),
        citation_accuracy: citation_accuracy(&results),
        chunk_citation_rate: chunk_citation_rate(&results, chunks),
        under_grounded: results.is_empty(),
        results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(file: &str, start: usize, end: usize) -> Chunk {
        Chunk {
            file: file.to_string(),
            start_line: start,
            end_line: end,
            text: String::new(),
        }
    }

    #[test]
    fn test_exact_path() {
        let chunks = vec![chunk("src/auth.py", 35, 42)];
        let (kind, idx) = classify(&Citation::new("src/auth.py", 35, 42), &chunks);
        assert_eq!(kind, MatchKind::ExactPath);
        assert_eq!(idx, Some(0));
    }

    #[test]
    fn test_filename_only() {
        let chunks = vec![chunk("src/auth.py", 35, 42)];
        let (kind, _) = classify(&Citation::new("auth.py", 35, 42), &chunks);
        assert_eq!(kind, MatchKind::FilenameOnly);
    }

    #[test]
    fn test_line_overlap() {
        let chunks = vec![chunk("x.py", 1, 80)];
        let (kind, _) = classify(&Citation::new("x.py", 12, 12), &chunks);
        assert_eq!(kind, MatchKind::LineOverlap);
    }

    #[test]
    fn test_exact_wins_over_earlier_weaker_chunk() {
        let chunks = vec![chunk("a/util.py", 1, 80), chunk("b/util.py", 1, 80), chunk("util.py", 71, 100)];
        let (kind, idx) = classify(&Citation::new("b/util.py", 1, 80), &chunks);
        assert_eq!(kind, MatchKind::ExactPath);
        assert_eq!(idx, Some(1));

        let (kind, idx) = classify(&Citation::new("util.py", 75, 76), &chunks);
        assert_eq!(kind, MatchKind::LineOverlap);
        assert_eq!(idx, Some(0));
    }

    #[test]
    fn test_no_match() {
        let chunks = vec![chunk("x.py", 1, 80)];
        assert_eq!(classify(&Citation::new("y.py", 1, 80), &chunks), (MatchKind::None, None));
        assert_eq!(classify(&Citation::new("x.py", 81, 90), &chunks), (MatchKind::None, None));
    }

    #[test]
    fn test_boundary_line_overlaps() {
        let chunks = vec![chunk("x.py", 71, 100)];
        assert_eq!(classify(&Citation::new("x.py", 60, 71), &chunks).0, MatchKind::LineOverlap);
        assert_eq!(classify(&Citation::new("x.py", 100, 120), &chunks).0, MatchKind::LineOverlap);
    }

    #[test]
    fn test_no_citations_is_full_accuracy() {
        let report = validate(&[], &[chunk("a.py", 1, 80)]);
        assert_eq!(report.citation_accuracy, 100.0);
        assert_eq!(report.chunk_citation_rate, 0.0);
        assert!(report.under_grounded);
    }

    #[test]
    fn test_citations_without_chunks_is_zero_accuracy() {
        let report = validate(&[Citation::new("a.py", 1, 2)], &[]);
        assert_eq!(report.citation_accuracy, 0.0);
        assert_eq!(report.chunk_citation_rate, 0.0);
        assert_eq!(report.results[0].match_kind, MatchKind::None);
        assert!(!report.results[0].matched);
        assert!(!report.under_grounded);
    }

    #[test]
    fn test_report_metrics() {
        let chunks = vec![
            chunk("src/auth.py", 1, 80),
            chunk("src/auth.py", 71, 150),
            chunk("src/db.py", 1, 40),
            chunk("src/api.py", 1, 80),
        ];
        let citations = vec![
            Citation::new("src/auth.py", 1, 80),
            Citation::new("db.py", 10, 12),
            Citation::new("missing.py", 1, 2),
        ];
        let report = validate(&citations, &chunks);

        let kinds: Vec<MatchKind> = report.results.iter().map(|r| r.match_kind).collect();
        assert_eq!(kinds, vec![MatchKind::ExactPath, MatchKind::LineOverlap, MatchKind::None]);
        assert_eq!(report.matched_citations, 2);
        assert!((report.citation_accuracy - 200.0 / 3.0).abs() < 1e-9);
        // auth 1-80 overlaps both auth chunks; db 10-12 overlaps the db chunk.
        assert_eq!(report.cited_chunks, 3);
        assert_eq!(report.chunk_citation_rate, 75.0);
    }

    #[test]
    fn test_unmatched_citations_do_not_count_as_cited() {
        let chunks = vec![chunk("x.py", 1, 10)];
        let results = vec![ValidationResult {
            citation: Citation::new("x.py", 5, 6),
            matched: false,
            match_kind: MatchKind::None,
            chunk_index: None,
        }];
        assert_eq!(chunk_citation_rate(&results, &chunks), 0.0);
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let report = validate(&[Citation::new("a.py", 1, 1)], &[chunk("a.py", 1, 1)]);
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["citationAccuracy"], 100.0);
        assert_eq!(json["results"][0]["matchKind"], "exact_path");
        assert_eq!(json["results"][0]["chunkIndex"], 0);
    }
}
