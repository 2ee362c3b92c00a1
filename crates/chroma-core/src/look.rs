//! Looks: named creative grades applied in a process color space.
//!
//! Looks are selected by list strings. Each entry may carry a `+` (forward,
//! the default) or `-` (inverse) prefix, and `|` separates fallback
//! alternatives evaluated left to right. An empty trailing alternative is a
//! legitimate "no looks" fallback.
//!
//! # Example
//!
//! ```
//! use chroma_core::{Look, parse_look_list};
//!
//! let look = Look::new("show_grade")
//!     .process_space("log_1")
//!     .description("Main show look");
//! assert_eq!(look.get_process_space(), "log_1");
//!
//! let alternatives = parse_look_list("shot_cc, -show_grade | ");
//! assert_eq!(alternatives.len(), 2);
//! assert!(alternatives[1].is_empty());
//! ```

use serde::{Deserialize, Serialize};

use crate::transform::Transform;

/// A named creative look.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Look {
    name: String,
    #[serde(default)]
    process_space: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    transform: Option<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inverse_transform: Option<Transform>,
}

impl Look {
    /// Creates a look with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Sets the process space (the space the transform operates in).
    pub fn process_space(mut self, space: impl Into<String>) -> Self {
        self.process_space = space.into();
        self
    }

    /// Sets the description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Sets the forward transform.
    pub fn transform(mut self, t: Transform) -> Self {
        self.transform = Some(t);
        self
    }

    /// Sets an explicit inverse transform.
    pub fn inverse_transform(mut self, t: Transform) -> Self {
        self.inverse_transform = Some(t);
        self
    }

    /// Look name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Process space name.
    #[inline]
    pub fn get_process_space(&self) -> &str {
        &self.process_space
    }

    /// Forward transform, if defined.
    #[inline]
    pub fn get_transform(&self) -> Option<&Transform> {
        self.transform.as_ref()
    }

    /// Explicit inverse transform, if defined.
    #[inline]
    pub fn get_inverse_transform(&self) -> Option<&Transform> {
        self.inverse_transform.as_ref()
    }

    /// Description text.
    #[inline]
    pub fn get_description(&self) -> &str {
        &self.description
    }
}

/// One entry of a parsed look list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookRef {
    /// Look name.
    pub name: String,
    /// False for `-name` entries (apply the inverse).
    pub forward: bool,
}

/// Parses a look list with `|` fallback alternatives.
///
/// Each alternative is a comma-separated list of `+`/`-` prefixed names.
/// An empty alternative parses to an empty vec, which callers treat as
/// "apply no looks".
pub fn parse_look_list(spec: &str) -> Vec<Vec<LookRef>> {
    spec.split('|')
        .map(|alternative| {
            alternative
                .split(',')
                .filter_map(|entry| {
                    let entry = entry.trim();
                    if entry.is_empty() {
                        return None;
                    }
                    if let Some(name) = entry.strip_prefix('-') {
                        Some(LookRef {
                            name: name.trim().to_string(),
                            forward: false,
                        })
                    } else if let Some(name) = entry.strip_prefix('+') {
                        Some(LookRef {
                            name: name.trim().to_string(),
                            forward: true,
                        })
                    } else {
                        Some(LookRef {
                            name: entry.to_string(),
                            forward: true,
                        })
                    }
                })
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single() {
        let alts = parse_look_list("show_grade");
        assert_eq!(alts.len(), 1);
        assert_eq!(alts[0][0].name, "show_grade");
        assert!(alts[0][0].forward);
    }

    #[test]
    fn parse_directions() {
        let alts = parse_look_list("+fwd, -inv");
        assert_eq!(alts[0][0], LookRef { name: "fwd".into(), forward: true });
        assert_eq!(alts[0][1], LookRef { name: "inv".into(), forward: false });
    }

    #[test]
    fn parse_fallbacks_with_empty_tail() {
        let alts = parse_look_list("shot_cc | show_grade |");
        assert_eq!(alts.len(), 3);
        assert_eq!(alts[0][0].name, "shot_cc");
        assert_eq!(alts[1][0].name, "show_grade");
        assert!(alts[2].is_empty());
    }
}
