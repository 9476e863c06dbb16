use super::languages::Language;
use super::source::SourceFile;
use regex::Regex;
use std::collections::{HashMap, HashSet};

/// An unresolved import reference found in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImportToken {
    pub source_file: String,
    pub raw_text: String,
    /// 1-based line of the import specifier.
    pub line_number: usize,
}

/// Textual import scanner. No parsing: each language contributes a handful of
/// regexes and anything that looks like an import is emitted. False positives
/// are left for the resolver's existence check.
pub struct ImportExtractor {
    patterns: HashMap<Language, Vec<Regex>>,
}

impl ImportExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        let mut patterns = HashMap::new();

        for lang in Language::ALL {
            let compiled = lang
                .rules()
                .import_patterns
                .iter()
                .map(|p| Regex::new(p))
                .collect::<Result<Vec<_>, _>>()?;
            patterns.insert(lang, compiled);
        }

        Ok(Self { patterns })
    }

    /// Lazily yields the import tokens of `file`, pattern by pattern, in
    /// match order. Files without a supported language yield nothing.
    pub fn extract<'a>(&'a self, file: &'a SourceFile) -> impl Iterator<Item = ImportToken> + 'a {
        let patterns: &'a [Regex] = file
            .language
            .and_then(|lang| self.patterns.get(&lang))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let grouped = file.language == Some(Language::Rust);
        let mut seen = HashSet::new();
        let text = file.content();

        patterns
            .iter()
            .flat_map(move |re| re.captures_iter(text))
            .filter_map(|caps| caps.get(1))
            .flat_map(move |m| {
                let raw = m.as_str().trim();
                let line_number = file.line_of_offset(m.start());
                let raws = if grouped && raw.contains('{') {
                    expand_use_tree(raw)
                } else {
                    vec![raw.to_string()]
                };
                raws.into_iter()
                    .filter(|raw| !raw.is_empty())
                    .map(move |raw| (raw, line_number))
                    .collect::<Vec<_>>()
            })
            .filter(move |(raw, line_number)| seen.insert((raw.clone(), *line_number)))
            .map(move |(raw_text, line_number)| ImportToken {
                source_file: file.path.clone(),
                raw_text,
                line_number,
            })
    }
}

/// Flattens a grouped `use` path into one path per member:
/// `a::{b, c::{d, self}, e as f}` gives `a::b`, `a::c::d`, `a::c`, `a::e`.
fn expand_use_tree(tree: &str) -> Vec<String> {
    let tree = tree.trim();
    let Some(open) = tree.find('{') else {
        // `x as y` imports `x`.
        return vec![tree.split_whitespace().next().unwrap_or_default().to_string()];
    };

    let prefix = tree[..open].trim().trim_end_matches("::");
    let inner = tree[open + 1..].trim_end();
    let inner = inner.strip_suffix('}').unwrap_or(inner);

    split_top_level(inner)
        .into_iter()
        .flat_map(expand_use_tree)
        .filter(|member| !member.is_empty() && member != "*")
        .map(|member| match (prefix.is_empty(), member.as_str()) {
            (_, "self") => prefix.to_string(),
            (true, _) => member,
            (false, _) => format!("{prefix}::{member}"),
        })
        .collect()
}

/// Splits on commas outside nested braces.
fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, c) in list.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(&list[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&list[start..]);
    parts
}
