//! File rules and viewing rules.
//!
//! File rules assign a color space to a file path. They are evaluated in
//! order; the reserved terminal `Default` rule always matches, is always
//! last, and cannot be removed. The reserved `ColorSpaceNamePathSearch`
//! rule matches when any known color space name or alias occurs in the
//! path, preferring the right-most and then longest occurrence.
//!
//! Viewing rules gate which views are offered for an input color space,
//! matching on color space name or encoding tag.

use std::collections::BTreeMap;

use glob::{MatchOptions, Pattern};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{ChromaError, ChromaResult};

/// Reserved name of the terminal default rule.
pub const DEFAULT_RULE_NAME: &str = "Default";
/// Reserved name of the path-search rule.
pub const PATH_SEARCH_RULE_NAME: &str = "ColorSpaceNamePathSearch";

/// A single file rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FileRule {
    /// Rule name (unique within the list, case-insensitive).
    pub name: String,
    /// Color space assigned on match. Empty for the path-search rule.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub colorspace: String,
    /// Glob pattern matched against the path (exclusive with `regex`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    /// Extension glob (exclusive with `regex`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension: Option<String>,
    /// Full-path regex (exclusive with `pattern`/`extension`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// Arbitrary key/value metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_keys: BTreeMap<String, String>,
}

impl FileRule {
    /// Creates a glob rule: `pattern` matched with `extension`.
    pub fn glob(
        name: impl Into<String>,
        colorspace: impl Into<String>,
        pattern: impl Into<String>,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            colorspace: colorspace.into(),
            pattern: Some(pattern.into()),
            extension: Some(extension.into()),
            regex: None,
            custom_keys: BTreeMap::new(),
        }
    }

    /// Creates a regex rule.
    pub fn regex(
        name: impl Into<String>,
        colorspace: impl Into<String>,
        regex: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            colorspace: colorspace.into(),
            pattern: None,
            extension: None,
            regex: Some(regex.into()),
            custom_keys: BTreeMap::new(),
        }
    }

    /// The path-search rule. Carries no color space of its own.
    pub fn path_search() -> Self {
        Self {
            name: PATH_SEARCH_RULE_NAME.to_string(),
            ..Default::default()
        }
    }

    /// Sets the glob pattern/extension, clearing any regex.
    pub fn set_pattern(&mut self, pattern: impl Into<String>, extension: impl Into<String>) {
        self.pattern = Some(pattern.into());
        self.extension = Some(extension.into());
        self.regex = None;
    }

    /// Sets the regex, clearing any pattern/extension.
    pub fn set_regex(&mut self, regex: impl Into<String>) {
        self.regex = Some(regex.into());
        self.pattern = None;
        self.extension = None;
    }

    /// Gets a custom key value.
    pub fn custom_key(&self, key: &str) -> ChromaResult<&str> {
        self.custom_keys
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ChromaError::NotFound {
                what: format!("custom key '{key}' on rule '{}'", self.name),
            })
    }

    /// True for the reserved terminal rule.
    pub fn is_default(&self) -> bool {
        self.name.eq_ignore_ascii_case(DEFAULT_RULE_NAME)
    }

    /// True for the reserved path-search rule.
    pub fn is_path_search(&self) -> bool {
        self.name.eq_ignore_ascii_case(PATH_SEARCH_RULE_NAME)
    }

    fn matches(&self, path: &str) -> bool {
        if self.is_default() {
            return true;
        }
        if let Some(re) = &self.regex {
            return Regex::new(re).map(|re| re.is_match(path)).unwrap_or(false);
        }
        let pattern = self.pattern.as_deref().unwrap_or("*");
        let extension = self.extension.as_deref().unwrap_or("*");
        let full = format!("{pattern}.{extension}");
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::default()
        };
        Pattern::new(&full)
            .map(|p| p.matches_with(path, options))
            .unwrap_or(false)
    }
}

/// Ordered file rule list ending in the terminal default rule.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRules {
    rules: Vec<FileRule>,
}

impl Default for FileRules {
    fn default() -> Self {
        Self {
            rules: vec![FileRule {
                name: DEFAULT_RULE_NAME.to_string(),
                colorspace: crate::role::names::DEFAULT.to_string(),
                ..Default::default()
            }],
        }
    }
}

impl FileRules {
    /// Rule list with only the default rule.
    pub fn new() -> Self {
        Self::default()
    }

    /// All rules in evaluation order.
    #[inline]
    pub fn rules(&self) -> &[FileRule] {
        &self.rules
    }

    /// Number of rules (at least one).
    #[inline]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Never true; the default rule is always present.
    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Gets a rule by index.
    pub fn get(&self, index: usize) -> ChromaResult<&FileRule> {
        self.rules.get(index).ok_or_else(|| ChromaError::NotFound {
            what: format!("file rule index {index}"),
        })
    }

    /// Inserts a rule before the default rule.
    ///
    /// `index` may range up to `len() - 1`: a rule can never land after
    /// the terminal default.
    pub fn insert(&mut self, index: usize, rule: FileRule) -> ChromaResult<()> {
        if rule.is_default() {
            return Err(ChromaError::InvalidParameter {
                reason: "the Default rule already exists".to_string(),
            });
        }
        if index > self.rules.len() - 1 {
            return Err(ChromaError::NotFound {
                what: format!("file rule index {index}"),
            });
        }
        if self
            .rules
            .iter()
            .any(|r| r.name.eq_ignore_ascii_case(&rule.name))
        {
            return Err(ChromaError::Duplicate {
                name: rule.name.clone(),
            });
        }
        self.rules.insert(index, rule);
        Ok(())
    }

    /// Removes a rule by index. The terminal default cannot be removed.
    pub fn remove(&mut self, index: usize) -> ChromaResult<FileRule> {
        if index >= self.rules.len() {
            return Err(ChromaError::NotFound {
                what: format!("file rule index {index}"),
            });
        }
        if self.rules[index].is_default() {
            return Err(ChromaError::InvalidParameter {
                reason: "the Default rule cannot be removed".to_string(),
            });
        }
        Ok(self.rules.remove(index))
    }

    /// Sets the color space the default rule assigns.
    pub fn set_default_colorspace(&mut self, colorspace: impl Into<String>) {
        if let Some(last) = self.rules.last_mut() {
            last.colorspace = colorspace.into();
        }
    }

    /// Evaluates the rules against a path.
    ///
    /// `known_names` feeds the path-search rule (color space names and
    /// aliases). Returns the matched color space name and the rule index.
    pub fn evaluate<'a>(&'a self, path: &str, known_names: &[&'a str]) -> (&'a str, usize) {
        for (index, rule) in self.rules.iter().enumerate() {
            if rule.is_path_search() {
                if let Some(name) = path_search(path, known_names) {
                    return (name, index);
                }
                continue;
            }
            if rule.matches(path) {
                return (rule.colorspace.as_str(), index);
            }
        }
        // Unreachable in practice: the default rule matches everything.
        let last = self.rules.len() - 1;
        (self.rules[last].colorspace.as_str(), last)
    }

    /// Replaces the whole list. Deserialization only; the caller is
    /// responsible for the terminal-default invariant (validation
    /// re-checks it).
    pub(crate) fn set_rules(&mut self, rules: Vec<FileRule>) {
        if rules.is_empty() {
            *self = Self::default();
        } else {
            self.rules = rules;
        }
    }
}

/// Right-most, then longest, substring match of a known name in `path`.
fn path_search<'a>(path: &str, known_names: &[&'a str]) -> Option<&'a str> {
    let lower = path.to_ascii_lowercase();
    let mut best: Option<(usize, usize, &'a str)> = None;
    for name in known_names {
        let needle = name.to_ascii_lowercase();
        if needle.is_empty() {
            continue;
        }
        if let Some(pos) = lower.rfind(&needle) {
            let candidate = (pos, needle.len(), *name);
            best = match best {
                Some(b) if (b.0, b.1) >= (pos, needle.len()) => Some(b),
                _ => Some(candidate),
            };
        }
    }
    best.map(|(_, _, name)| name)
}

/// A single viewing rule.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewingRule {
    /// Rule name.
    pub name: String,
    /// Color space names this rule matches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub colorspaces: Vec<String>,
    /// Encoding tags this rule matches.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub encodings: Vec<String>,
    /// Arbitrary key/value metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_keys: BTreeMap<String, String>,
}

impl ViewingRule {
    /// True if this rule applies to the given color space name/encoding.
    pub fn applies_to(&self, colorspace: &str, encoding: Option<&str>) -> bool {
        if self
            .colorspaces
            .iter()
            .any(|c| c.eq_ignore_ascii_case(colorspace))
        {
            return true;
        }
        if let Some(enc) = encoding {
            return self.encodings.iter().any(|e| e.eq_ignore_ascii_case(enc));
        }
        false
    }
}

/// Ordered viewing rule list.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ViewingRules {
    rules: Vec<ViewingRule>,
}

impl ViewingRules {
    /// Empty rule list.
    pub fn new() -> Self {
        Self::default()
    }

    /// All rules.
    #[inline]
    pub fn rules(&self) -> &[ViewingRule] {
        &self.rules
    }

    /// Adds a rule.
    pub fn add(&mut self, rule: ViewingRule) -> ChromaResult<()> {
        if self
            .rules
            .iter()
            .any(|r| r.name.eq_ignore_ascii_case(&rule.name))
        {
            return Err(ChromaError::Duplicate { name: rule.name });
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Looks up a rule by name.
    pub fn get(&self, name: &str) -> Option<&ViewingRule> {
        self.rules
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(name))
    }

    pub(crate) fn set_rules(&mut self, rules: Vec<ViewingRule>) {
        self.rules = rules;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rules() -> FileRules {
        let mut rules = FileRules::new();
        rules
            .insert(0, FileRule::glob("jpeg", "cs1", "*", "jpg"))
            .unwrap();
        rules
            .insert(1, FileRule::glob("png", "cs2", "*", "png"))
            .unwrap();
        rules
            .insert(2, FileRule::glob("exr", "cs3", "*", "exr"))
            .unwrap();
        rules
    }

    #[test]
    fn rules_resolve_in_order() {
        let rules = sample_rules();
        assert_eq!(rules.evaluate("test.png", &[]), ("cs2", 1));
        assert_eq!(rules.evaluate("pic.txt", &[]), ("default", 3));
    }

    #[test]
    fn extension_match_is_case_insensitive() {
        let rules = sample_rules();
        assert_eq!(rules.evaluate("/shots/A010/PLATE.EXR", &[]), ("cs3", 2));
    }

    #[test]
    fn default_rule_is_protected() {
        let mut rules = FileRules::new();
        assert!(rules.remove(0).is_err());
        let err = rules.insert(1, FileRule::glob("x", "cs", "*", "tif"));
        assert!(err.is_err());
    }

    #[test]
    fn regex_clears_glob() {
        let mut rule = FileRule::glob("r", "cs", "*", "dpx");
        rule.set_regex(".*\\.dpx$");
        assert!(rule.pattern.is_none());
        assert!(rule.extension.is_none());
    }

    #[test]
    fn path_search_prefers_rightmost_then_longest() {
        let names = ["lin", "log", "log_film"];
        assert_eq!(path_search("/x/lin/plate_log.exr", &names), Some("log"));
        assert_eq!(path_search("/x/plate_log_film.exr", &names), Some("log_film"));
    }

    #[test]
    fn path_search_rule_in_list() {
        let mut rules = FileRules::new();
        rules.insert(0, FileRule::path_search()).unwrap();
        let names = ["acescg"];
        assert_eq!(rules.evaluate("/a/acescg/t.exr", &names), ("acescg", 0));
        assert_eq!(rules.evaluate("/a/other/t.exr", &names).1, 1);
    }

    #[test]
    fn viewing_rule_matches_name_or_encoding() {
        let rule = ViewingRule {
            name: "video".into(),
            colorspaces: vec!["sRGB".into()],
            encodings: vec!["sdr-video".into()],
            ..Default::default()
        };
        assert!(rule.applies_to("srgb", None));
        assert!(rule.applies_to("rec709", Some("sdr-video")));
        assert!(!rule.applies_to("acescg", Some("scene-linear")));
    }
}
