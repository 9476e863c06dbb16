//! Per-language import rules.
//!
//! Each supported language carries its own import patterns and the
//! extension/index-file tables the resolver tries. Dispatch is a lookup on
//! the closed [`Language`] enum.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Go,
    Rust,
    Java,
    Ruby,
    C,
    Cpp,
}

impl Language {
    pub const ALL: [Language; 9] = [
        Language::Python,
        Language::JavaScript,
        Language::TypeScript,
        Language::Go,
        Language::Rust,
        Language::Java,
        Language::Ruby,
        Language::C,
        Language::Cpp,
    ];

    pub fn as_str(&self) -> &'static str {
        self.rules().name
    }

    /// Language for a bare extension (no leading dot, any case). `None`
    /// means imports are not extracted for that file type.
    pub fn from_extension(ext: &str) -> Option<Language> {
        let ext = ext.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|lang| lang.rules().extensions.iter().any(|e| *e == ext))
    }

    pub fn from_path(path: &str) -> Option<Language> {
        extension_of(path).and_then(Self::from_extension)
    }

    pub fn from_name(name: &str) -> Option<Language> {
        Self::ALL.into_iter().find(|lang| lang.rules().name == name)
    }

    pub fn rules(&self) -> &'static LanguageRules {
        match self {
            Language::Python => &PYTHON,
            Language::JavaScript => &JAVASCRIPT,
            Language::TypeScript => &TYPESCRIPT,
            Language::Go => &GO,
            Language::Rust => &RUST,
            Language::Java => &JAVA,
            Language::Ruby => &RUBY,
            Language::C => &C,
            Language::Cpp => &CPP,
        }
    }
}

/// Extension of the final path segment, without the dot.
pub fn extension_of(path: &str) -> Option<&str> {
    let name = path.rsplit('/').next().unwrap_or(path);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(&name[idx + 1..]),
    }
}

pub struct LanguageRules {
    pub name: &'static str,
    pub extensions: &'static [&'static str],
    /// Regexes whose first capture group is the raw import token.
    pub import_patterns: &'static [&'static str],
    /// Suffixes appended to a candidate path, in priority order.
    pub resolve_extensions: &'static [&'static str],
    /// Files that stand in for a directory-as-module.
    pub index_files: &'static [&'static str],
    /// Namespace separator for dotted-module syntax (`.` or `::`).
    pub namespace_separator: Option<&'static str>,
    /// The last namespace segment may name an item rather than a module.
    pub item_imports: bool,
    /// Imports name a package directory rather than a file.
    pub package_dirs: bool,
}

// JS and TS share the statement shapes: `import x from '..'`, bare
// `import '..'`, `export .. from '..'`, `require('..')` and dynamic `import('..')`.
const ECMASCRIPT_IMPORTS: &[&str] = &[
    r#"(?:^|[^\w$.])(?:import|export)\s[^'";]*?from\s*['"]([^'"\n]+)['"]"#,
    r#"(?:^|[^\w$.])import\s*['"]([^'"\n]+)['"]"#,
    r#"(?:^|[^\w$.])(?:require|import)\s*\(\s*['"]([^'"\n]+)['"]\s*\)"#,
];

static PYTHON: LanguageRules = LanguageRules {
    name: "python",
    extensions: &["py", "pyi"],
    import_patterns: &[
        r"(?m)^[ \t]*import[ \t]+([\w.]+)",
        r"(?m)^[ \t]*from[ \t]+([\w.]+)[ \t]+import\b",
    ],
    resolve_extensions: &[".py", ".pyi"],
    index_files: &["__init__.py"],
    namespace_separator: Some("."),
    item_imports: false,
    package_dirs: false,
};

static JAVASCRIPT: LanguageRules = LanguageRules {
    name: "javascript",
    extensions: &["js", "jsx", "mjs", "cjs", "vue", "svelte"],
    import_patterns: ECMASCRIPT_IMPORTS,
    resolve_extensions: &[".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx", ".vue", ".svelte"],
    index_files: &["index.js", "index.jsx", "index.ts", "index.tsx"],
    namespace_separator: None,
    item_imports: false,
    package_dirs: false,
};

static TYPESCRIPT: LanguageRules = LanguageRules {
    name: "typescript",
    extensions: &["ts", "tsx", "mts", "cts"],
    import_patterns: ECMASCRIPT_IMPORTS,
    resolve_extensions: &[".ts", ".tsx", ".d.ts", ".js", ".jsx"],
    index_files: &["index.ts", "index.tsx", "index.js", "index.jsx"],
    namespace_separator: None,
    item_imports: false,
    package_dirs: false,
};

static GO: LanguageRules = LanguageRules {
    name: "go",
    extensions: &["go"],
    import_patterns: &[
        r#"(?m)^[ \t]*import[ \t]+(?:[\w.]+[ \t]+)?"([^"\n]+)""#,
        r#"(?m)^[ \t]*(?:[\w.]+[ \t]+)?"([^"\n]+)"[ \t]*(?://.*)?$"#,
    ],
    resolve_extensions: &[".go"],
    index_files: &[],
    namespace_separator: None,
    item_imports: false,
    package_dirs: true,
};

static RUST: LanguageRules = LanguageRules {
    name: "rust",
    extensions: &["rs"],
    import_patterns: &[
        r"(?m)^[ \t]*(?:pub(?:\([^)\n]*\))?[ \t]+)?use[ \t]+((?:::)?\w+(?:::\w+)*(?:::\{[^;]*\})?)",
        r"(?m)^[ \t]*(?:pub(?:\([^)\n]*\))?[ \t]+)?mod[ \t]+(\w+)[ \t]*;",
    ],
    resolve_extensions: &[".rs"],
    index_files: &["mod.rs"],
    namespace_separator: Some("::"),
    item_imports: true,
    package_dirs: false,
};

static JAVA: LanguageRules = LanguageRules {
    name: "java",
    extensions: &["java"],
    import_patterns: &[r"(?m)^[ \t]*import[ \t]+(?:static[ \t]+)?([\w.]+)[ \t]*;"],
    resolve_extensions: &[".java"],
    index_files: &[],
    namespace_separator: Some("."),
    item_imports: true,
    package_dirs: false,
};

static RUBY: LanguageRules = LanguageRules {
    name: "ruby",
    extensions: &["rb"],
    import_patterns: &[r#"(?m)^[ \t]*require(?:_relative)?[ \t(]+['"]([^'"\n]+)['"]"#],
    resolve_extensions: &[".rb"],
    index_files: &[],
    namespace_separator: None,
    item_imports: false,
    package_dirs: false,
};

static C: LanguageRules = LanguageRules {
    name: "c",
    extensions: &["c", "h"],
    import_patterns: &[r#"(?m)^[ \t]*#[ \t]*include[ \t]*"([^"\n]+)""#],
    resolve_extensions: &[],
    index_files: &[],
    namespace_separator: None,
    item_imports: false,
    package_dirs: false,
};

static CPP: LanguageRules = LanguageRules {
    name: "cpp",
    extensions: &["cpp", "cc", "cxx", "hpp", "hh", "hxx"],
    import_patterns: &[r#"(?m)^[ \t]*#[ \t]*include[ \t]*"([^"\n]+)""#],
    resolve_extensions: &[],
    index_files: &[],
    namespace_separator: None,
    item_imports: false,
    package_dirs: false,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension("py"), Some(Language::Python));
        assert_eq!(Language::from_extension("tsx"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("rs"), Some(Language::Rust));
        assert_eq!(Language::from_extension("md"), None);
        assert_eq!(Language::from_extension("json"), None);
        assert_eq!(Language::from_extension("TS"), Some(Language::TypeScript));
        assert_eq!(Language::from_extension("Py"), Some(Language::Python));
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path("src/app.py"), Some(Language::Python));
        assert_eq!(Language::from_path("web/ui/App.jsx"), Some(Language::JavaScript));
        assert_eq!(Language::from_path("Makefile"), None);
        assert_eq!(Language::from_path(".bashrc"), None);
        assert_eq!(Language::from_path("dir.v2/README"), None);
        assert_eq!(Language::from_path("src/App.TS"), Some(Language::TypeScript));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a/b/c.d.ts"), Some("ts"));
        assert_eq!(extension_of("a/.env"), None);
        assert_eq!(extension_of("noext"), None);
    }

    #[test]
    fn test_name_round_trip() {
        for lang in Language::ALL {
            assert_eq!(Language::from_name(lang.as_str()), Some(lang));
        }
    }

    #[test]
    fn test_every_pattern_has_a_capture_group() {
        for lang in Language::ALL {
            for pattern in lang.rules().import_patterns {
                let re = regex::Regex::new(pattern).expect("pattern compiles");
                assert!(re.captures_len() >= 2, "{pattern} has no capture group");
            }
        }
    }
}
