//! Maps raw import tokens to files of the repository.
//!
//! Resolution order, first hit wins:
//! 1. the token as a path,
//! 2. the path plus each of the language's source extensions,
//! 3. the path as a directory holding the language's index file (or, for
//!    package-directory languages like Go, its first non-test source file),
//! 4. for namespace syntax (`a.b.c`, `a::b::c`), the same three attempts on the
//!    slash-converted path.
//!
//! Each attempt is made against a list of base directories chosen from the
//! token's shape: relative tokens only look next to the importing file,
//! absolute-style tokens look at the repository root (and, for namespace
//! languages, every ancestor directory of the importing file).
use super::languages::{Language, LanguageRules};
use super::source::basename;
use std::collections::{BTreeSet, HashSet};
use std::ops::Bound;

/// Root manifest whose `module` line names the Go module path.
pub const GO_MOD: &str = "go.mod";

pub struct PathResolver {
    files: BTreeSet<String>,
    /// Module path from `go.mod`; Go imports under it are repository-relative.
    go_module: Option<String>,
}

/// Where to look for a token and under which path.
#[derive(Debug, PartialEq, Eq)]
struct Lookup {
    path: String,
    bases: Vec<String>,
    /// A lone trailing segment may be an item of the base module itself
    /// (`super::Item`, `self::Item`).
    anchored: bool,
}

impl Lookup {
    fn at(path: impl Into<String>, bases: Vec<String>) -> Self {
        Self {
            path: path.into(),
            bases,
            anchored: false,
        }
    }
}

impl PathResolver {
    pub fn new<I, S>(files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            files: files.into_iter().map(Into::into).collect(),
            go_module: None,
        }
    }

    pub fn with_go_module(mut self, module: impl Into<String>) -> Self {
        self.go_module = Some(module.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Resolves `raw` as written in `source_file`. `None` is the normal
    /// outcome for third-party and standard-library imports.
    pub fn resolve(&self, source_file: &str, raw: &str, lang: Language) -> Option<String> {
        let rules = lang.rules();
        let lookup = lookup_for(source_file, raw, lang, self.go_module.as_deref())?;

        if let Some(hit) = self.find_in_bases(&lookup.bases, &lookup.path, rules) {
            return Some(hit);
        }

        let sep = rules.namespace_separator?;
        let slashed = lookup.path.replace(sep, "/");
        if slashed != lookup.path {
            if let Some(hit) = self.find_in_bases(&lookup.bases, &slashed, rules) {
                return Some(hit);
            }
        }
        if !rules.item_imports {
            return None;
        }

        match slashed.rsplit_once('/') {
            Some((module, _item)) => self.find_in_bases(&lookup.bases, module, rules),
            None if lookup.anchored => lookup
                .bases
                .iter()
                .filter(|base| !base.is_empty())
                .find_map(|base| self.find_in(parent_dir(base), basename(base), rules)),
            None => None,
        }
    }

    fn find_in_bases(&self, bases: &[String], path: &str, rules: &LanguageRules) -> Option<String> {
        bases.iter().find_map(|base| self.find_in(base, path, rules))
    }

    /// Steps 1–3 for one base directory.
    fn find_in(&self, base: &str, path: &str, rules: &LanguageRules) -> Option<String> {
        let candidate = join_normalized(base, path)?;

        if !path.is_empty() {
            if let Some(hit) = self.files.get(&candidate) {
                return Some(hit.clone());
            }
            for ext in rules.resolve_extensions {
                if let Some(hit) = self.files.get(&format!("{candidate}{ext}")) {
                    return Some(hit.clone());
                }
            }
        }

        for index in rules.index_files {
            let path = if candidate.is_empty() {
                (*index).to_string()
            } else {
                format!("{candidate}/{index}")
            };
            if let Some(hit) = self.files.get(&path) {
                return Some(hit.clone());
            }
        }

        if rules.package_dirs {
            return self.package_file(&candidate, rules);
        }
        None
    }

    /// Lexically first source file directly inside `dir`, test files excluded.
    fn package_file(&self, dir: &str, rules: &LanguageRules) -> Option<String> {
        let prefix = if dir.is_empty() {
            String::new()
        } else {
            format!("{dir}/")
        };
        self.files
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|file| file.starts_with(&prefix))
            .filter(|file| parent_dir(file) == dir)
            .find(|file| {
                rules.resolve_extensions.iter().any(|ext| {
                    file.ends_with(ext) && !file.ends_with(&format!("_test{ext}"))
                })
            })
            .cloned()
    }
}

/// The module path declared by a `go.mod` manifest.
pub fn go_module_path(manifest: &str) -> Option<String> {
    manifest.lines().find_map(|line| {
        let line = line.split("//").next().unwrap_or_default().trim();
        let rest = line.strip_prefix("module")?;
        if !rest.starts_with(char::is_whitespace) {
            return None;
        }
        let module = rest.trim().trim_matches('"');
        (!module.is_empty()).then(|| module.to_string())
    })
}

fn lookup_for(source_file: &str, raw: &str, lang: Language, go_module: Option<&str>) -> Option<Lookup> {
    let dir = parent_dir(source_file);

    let lookup = match lang {
        Language::Python => {
            let rest = raw.trim_start_matches('.');
            let level = raw.len() - rest.len();
            if level > 0 {
                Lookup::at(rest, vec![ascend(dir, level - 1)?])
            } else {
                Lookup::at(rest, ancestors(dir))
            }
        }
        Language::JavaScript | Language::TypeScript => {
            if is_relative(raw) {
                Lookup::at(raw, vec![dir.to_string()])
            } else if let Some(alias) = raw.strip_prefix("@/").or_else(|| raw.strip_prefix("~/")) {
                Lookup::at(alias, vec![String::new(), "src".to_string()])
            } else {
                Lookup::at(raw.trim_start_matches('/'), vec![String::new()])
            }
        }
        Language::Go => {
            if is_relative(raw) {
                Lookup::at(raw, vec![dir.to_string()])
            } else {
                let local = go_module.and_then(|module| {
                    if raw == module {
                        Some("")
                    } else {
                        raw.strip_prefix(module)?.strip_prefix('/')
                    }
                });
                Lookup::at(local.unwrap_or(raw), vec![String::new()])
            }
        }
        Language::Rust => rust_lookup(source_file, dir, raw)?,
        Language::Java => Lookup::at(raw, ancestors(dir)),
        Language::Ruby | Language::C | Language::Cpp => {
            let mut bases = vec![dir.to_string()];
            if !is_relative(raw) {
                bases.push(String::new());
                if lang == Language::Ruby {
                    bases.push("lib".to_string());
                }
            }
            Lookup::at(raw, dedup(bases))
        }
    };

    let rules = lang.rules();
    if lookup.path.is_empty() && rules.index_files.is_empty() && !rules.package_dirs {
        return None;
    }
    Some(lookup)
}

fn rust_lookup(source_file: &str, dir: &str, raw: &str) -> Option<Lookup> {
    // Children of `foo.rs` live in `foo/`; `mod.rs`, `lib.rs` and `main.rs`
    // own their directory.
    let name = basename(source_file);
    let module_dir = match name {
        "mod.rs" | "lib.rs" | "main.rs" => dir.to_string(),
        _ => {
            let stem = name.strip_suffix(".rs").unwrap_or(name);
            join_normalized(dir, stem)?
        }
    };

    let raw = raw.trim_start_matches("::");

    if let Some(rest) = raw.strip_prefix("crate::") {
        return Some(Lookup::at(rest, ancestors(dir)));
    }
    if let Some(rest) = raw.strip_prefix("self::") {
        return Some(Lookup {
            anchored: true,
            ..Lookup::at(rest, vec![module_dir])
        });
    }
    if raw == "super" || raw.starts_with("super::") {
        let mut segments = raw.split("::").peekable();
        let mut levels = 0;
        while segments.next_if_eq(&"super").is_some() {
            levels += 1;
        }
        let rest = segments.collect::<Vec<_>>().join("::");
        let parent = ascend(&module_dir, levels)?;
        if rest.is_empty() {
            // Bare `super` names the parent module's own file.
            if parent.is_empty() {
                return None;
            }
            return Some(Lookup::at(basename(&parent), vec![parent_dir(&parent).to_string()]));
        }
        return Some(Lookup {
            anchored: true,
            ..Lookup::at(rest, vec![parent])
        });
    }
    if matches!(raw, "crate" | "self") {
        return None;
    }

    Some(Lookup::at(raw, dedup(vec![module_dir, dir.to_string()])))
}

fn is_relative(raw: &str) -> bool {
    raw == "." || raw == ".." || raw.starts_with("./") || raw.starts_with("../")
}

/// Directory part of a repository-relative path (`""` for root files).
pub fn parent_dir(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

/// `dir`, its parent, ..., up to the repository root `""`.
fn ancestors(dir: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = dir;
    while !current.is_empty() {
        out.push(current.to_string());
        current = parent_dir(current);
    }
    out.push(String::new());
    out
}

fn ascend(dir: &str, levels: usize) -> Option<String> {
    let mut current = dir;
    for _ in 0..levels {
        if current.is_empty() {
            return None;
        }
        current = parent_dir(current);
    }
    Some(current.to_string())
}

/// Lexically joins `base` and `path`, folding `.` and `..`. Returns `None` if
/// the result would climb above the repository root.
pub fn join_normalized(base: &str, path: &str) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for segment in base.split('/').chain(path.split('/')) {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}

fn dedup(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
