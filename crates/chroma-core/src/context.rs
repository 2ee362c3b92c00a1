//! Context variables and search-path file resolution.
//!
//! Configs reference per-shot data through variables like `$SHOT` or
//! `${SEQ}` in file paths, CCC IDs and look lists. The context supplies
//! their values at compile time and participates in cache keys: distinct
//! contexts resolve distinct file sets and therefore produce distinct
//! processors.
//!
//! # Example
//!
//! ```
//! use chroma_core::Context;
//!
//! let mut ctx = Context::new();
//! ctx.set("SHOT", "sh010");
//! ctx.set("SEQ", "sq01");
//!
//! let resolved = ctx.resolve("/shows/$SEQ/shots/$SHOT/luts/grade.cube");
//! assert_eq!(resolved, "/shows/sq01/shots/sh010/luts/grade.cube");
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{ChromaError, ChromaResult};

/// Variable mapping for token substitution in paths and parameters.
///
/// Variables are stored sorted so [`Context::fingerprint`] is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    vars: BTreeMap<String, String>,
    strict: bool,
}

impl Context {
    /// Creates an empty context.
    ///
    /// Unresolved tokens are left verbatim in the output.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a strict context: unresolved tokens substitute to empty.
    #[inline]
    pub fn strict() -> Self {
        Self {
            vars: BTreeMap::new(),
            strict: true,
        }
    }

    /// Sets a variable.
    #[inline]
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(name.into(), value.into());
    }

    /// Gets a variable value.
    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.vars.get(name).map(String::as_str)
    }

    /// Checks if a variable is defined.
    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.vars.contains_key(name)
    }

    /// All defined variables, sorted by name.
    #[inline]
    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    /// True if unresolved tokens substitute to empty strings.
    #[inline]
    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Resolves all `$VAR` and `${VAR}` references in a string.
    ///
    /// Unknown variables are kept verbatim, or replaced with the empty
    /// string when the context is strict.
    pub fn resolve(&self, input: &str) -> String {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();

        while let Some(c) = chars.next() {
            if c != '$' {
                result.push(c);
                continue;
            }
            if chars.peek() == Some(&'{') {
                chars.next();
                let var_name: String = chars.by_ref().take_while(|&c| c != '}').collect();
                if let Some(value) = self.get(&var_name) {
                    result.push_str(value);
                } else if !self.strict {
                    result.push_str("${");
                    result.push_str(&var_name);
                    result.push('}');
                }
            } else {
                let mut var_name = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_alphanumeric() || ch == '_' {
                        var_name.push(ch);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if var_name.is_empty() {
                    result.push('$');
                } else if let Some(value) = self.get(&var_name) {
                    result.push_str(value);
                } else if !self.strict {
                    result.push('$');
                    result.push_str(&var_name);
                }
            }
        }

        result
    }

    /// Deterministic text form for cache-key derivation.
    pub fn fingerprint(&self) -> String {
        let mut out = String::new();
        for (k, v) in &self.vars {
            out.push_str(k);
            out.push('=');
            out.push_str(v);
            out.push(';');
        }
        if self.strict {
            out.push_str("strict;");
        }
        out
    }
}

/// Search-path file resolution for `FileTransform` sources.
///
/// An ambiguous name (relative, not `./`-rooted) probes each substituted
/// search-path entry in order and returns the first existing hit. Absence
/// everywhere is a [`ChromaError::MissingFile`], a distinct recoverable
/// kind so callers may iterate alternate contexts.
#[derive(Debug, Clone)]
pub struct FileResolver {
    search_paths: Vec<String>,
    working_dir: PathBuf,
}

impl FileResolver {
    /// Creates a resolver over the given search paths and working directory.
    pub fn new(search_paths: Vec<String>, working_dir: impl Into<PathBuf>) -> Self {
        Self {
            search_paths,
            working_dir: working_dir.into(),
        }
    }

    /// Search-path entries, unsubstituted.
    #[inline]
    pub fn search_paths(&self) -> &[String] {
        &self.search_paths
    }

    /// Resolves a file reference to an on-disk path.
    ///
    /// `src` has context variables substituted first. Absolute and
    /// `./`-rooted paths are checked directly (relative to the working
    /// directory); anything else probes the search paths in order.
    pub fn resolve(&self, src: &str, context: &Context) -> ChromaResult<PathBuf> {
        let name = context.resolve(src);
        let as_path = Path::new(&name);

        if as_path.is_absolute() || name.starts_with("./") {
            let candidate = if as_path.is_absolute() {
                as_path.to_path_buf()
            } else {
                self.working_dir.join(as_path)
            };
            if candidate.is_file() {
                return Ok(candidate);
            }
            return Err(ChromaError::MissingFile {
                name,
                searched: vec![candidate],
            });
        }

        let mut searched = Vec::with_capacity(self.search_paths.len().max(1));
        for entry in &self.search_paths {
            let entry = context.resolve(entry);
            let base = if Path::new(&entry).is_absolute() {
                PathBuf::from(entry)
            } else {
                self.working_dir.join(entry)
            };
            let candidate = base.join(&name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(candidate);
        }

        // No search paths: fall back to the working directory itself.
        if self.search_paths.is_empty() {
            let candidate = self.working_dir.join(&name);
            if candidate.is_file() {
                return Ok(candidate);
            }
            searched.push(candidate);
        }

        Err(ChromaError::MissingFile { name, searched })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolve_simple_var() {
        let mut ctx = Context::new();
        ctx.set("SHOT", "sh010");
        assert_eq!(ctx.resolve("/path/$SHOT/file"), "/path/sh010/file");
    }

    #[test]
    fn resolve_braced_var() {
        let mut ctx = Context::new();
        ctx.set("SEQ", "sq01");
        assert_eq!(ctx.resolve("/path/${SEQ}_data"), "/path/sq01_data");
    }

    #[test]
    fn unresolved_kept_verbatim_by_default() {
        let ctx = Context::new();
        assert_eq!(ctx.resolve("$UNKNOWN"), "$UNKNOWN");
        assert_eq!(ctx.resolve("${UNKNOWN}"), "${UNKNOWN}");
    }

    #[test]
    fn strict_substitutes_empty() {
        let ctx = Context::strict();
        assert_eq!(ctx.resolve("a/$UNKNOWN/b"), "a//b");
        assert_eq!(ctx.resolve("${UNKNOWN}x"), "x");
    }

    #[test]
    fn dollar_at_end() {
        let ctx = Context::new();
        assert_eq!(ctx.resolve("test$"), "test$");
    }

    #[test]
    fn fingerprint_is_sorted() {
        let mut a = Context::new();
        a.set("B", "2");
        a.set("A", "1");
        let mut b = Context::new();
        b.set("A", "1");
        b.set("B", "2");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn search_path_order_wins() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("a")).unwrap();
        std::fs::create_dir(dir.path().join("b")).unwrap();
        for sub in ["a", "b"] {
            let mut f = std::fs::File::create(dir.path().join(sub).join("lut.cube")).unwrap();
            write!(f, "LUT_1D_SIZE 2\n0 0 0\n1 1 1\n").unwrap();
        }

        let resolver = FileResolver::new(vec!["a".into(), "b".into()], dir.path());
        let hit = resolver.resolve("lut.cube", &Context::new()).unwrap();
        assert!(hit.ends_with("a/lut.cube"));
    }

    #[test]
    fn missing_file_is_distinct_kind() {
        let dir = tempfile::tempdir().unwrap();
        let resolver = FileResolver::new(vec!["luts".into()], dir.path());
        let err = resolver.resolve("nope.cube", &Context::new()).unwrap_err();
        assert!(matches!(err, ChromaError::MissingFile { .. }));
    }
}
