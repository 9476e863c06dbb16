use super::languages::Language;

/// One repository file, immutable for the duration of an ingestion run.
///
/// Lines are 1-indexed. Line terminators are kept in the backing text so a
/// line range maps to an exact byte slice of the original file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Repository-relative, forward-slash separated.
    pub path: String,
    pub language: Option<Language>,
    content: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = path.into().replace('\\', "/");
        let content = content.into();
        let language = Language::from_path(&path);

        let mut line_starts = Vec::new();
        if !content.is_empty() {
            line_starts.push(0);
            line_starts.extend(
                content
                    .match_indices('\n')
                    .map(|(idx, _)| idx + 1)
                    .filter(|&start| start < content.len()),
            );
        }

        Self {
            path,
            language,
            content,
            line_starts,
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// 1-based line number containing the byte at `offset`.
    pub fn line_of_offset(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset).max(1)
    }

    /// Text of lines `start..=end` (1-based, inclusive), terminators included.
    /// Out-of-range bounds are clamped.
    pub fn line_span(&self, start: usize, end: usize) -> &str {
        let count = self.line_count();
        if count == 0 || start > end || start > count {
            return "";
        }
        let from = self.line_starts[start.max(1) - 1];
        let to = if end >= count {
            self.content.len()
        } else {
            self.line_starts[end]
        };
        &self.content[from..to]
    }

    /// Final path segment.
    pub fn file_name(&self) -> &str {
        basename(&self.path)
    }
}

/// Final segment of a slash (or backslash) separated path.
pub fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_table() {
        let file = SourceFile::new("a.py", "one\ntwo\nthree\n");
        assert_eq!(file.line_count(), 3);
        assert_eq!(file.line_span(2, 2), "two\n");
        assert_eq!(file.line_span(1, 3), "one\ntwo\nthree\n");
        assert_eq!(file.line_span(3, 10), "three\n");
    }

    #[test]
    fn test_missing_trailing_newline() {
        let file = SourceFile::new("a.py", "one\ntwo");
        assert_eq!(file.line_count(), 2);
        assert_eq!(file.line_span(2, 2), "two");
    }

    #[test]
    fn test_empty_file() {
        let file = SourceFile::new("empty.py", "");
        assert_eq!(file.line_count(), 0);
        assert_eq!(file.line_span(1, 1), "");
    }

    #[test]
    fn test_line_of_offset() {
        let file = SourceFile::new("a.py", "ab\ncd\nef");
        assert_eq!(file.line_of_offset(0), 1);
        assert_eq!(file.line_of_offset(2), 1);
        assert_eq!(file.line_of_offset(3), 2);
        assert_eq!(file.line_of_offset(7), 3);
    }

    #[test]
    fn test_language_and_separator_normalization() {
        let file = SourceFile::new("src\\lib\\util.ts", "");
        assert_eq!(file.path, "src/lib/util.ts");
        assert_eq!(file.language, Some(Language::TypeScript));
        assert_eq!(file.file_name(), "util.ts");
        assert_eq!(SourceFile::new("README.md", "").language, None);
    }

    #[test]
    fn test_basename() {
        assert_eq!(basename("src/auth.py"), "auth.py");
        assert_eq!(basename("auth.py"), "auth.py");
        assert_eq!(basename("a\\b\\c.rs"), "c.rs");
    }
}
