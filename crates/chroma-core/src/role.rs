//! Color space roles.
//!
//! Roles give semantic names (`scene_linear`, `color_timing`) to color
//! spaces so configs stay portable: a look authored against `color_timing`
//! works in any config that maps the role.

use std::collections::BTreeMap;

/// Standard role names.
pub mod names {
    /// Scene-referred linear reference (required by validation).
    pub const REFERENCE: &str = "reference";
    /// Default input color space.
    pub const DEFAULT: &str = "default";
    /// Non-color data (normals, masks).
    pub const DATA: &str = "data";
    /// Scene-referred linear working space.
    pub const SCENE_LINEAR: &str = "scene_linear";
    /// Rendering calculations space.
    pub const RENDERING: &str = "rendering";
    /// Log compositing space.
    pub const COMPOSITING_LOG: &str = "compositing_log";
    /// Color grading space.
    pub const COLOR_TIMING: &str = "color_timing";
    /// Texture painting space.
    pub const TEXTURE_PAINT: &str = "texture_paint";
    /// Matte painting space.
    pub const MATTE_PAINT: &str = "matte_paint";
    /// Color picker display space.
    pub const COLOR_PICKING: &str = "color_picking";
}

/// Role to color space mapping.
///
/// Role names compare case-insensitively; they are stored lowercased so
/// serialization order is deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Roles {
    mapping: BTreeMap<String, String>,
}

impl Roles {
    /// Creates an empty mapping.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defines a role.
    #[inline]
    pub fn define(&mut self, role: impl AsRef<str>, colorspace: impl Into<String>) {
        self.mapping
            .insert(role.as_ref().to_ascii_lowercase(), colorspace.into());
    }

    /// Removes a role. Returns true if it existed.
    pub fn remove(&mut self, role: &str) -> bool {
        self.mapping.remove(&role.to_ascii_lowercase()).is_some()
    }

    /// Gets the color space name for a role.
    #[inline]
    pub fn get(&self, role: &str) -> Option<&str> {
        self.mapping
            .get(&role.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Checks if a role is defined.
    #[inline]
    pub fn contains(&self, role: &str) -> bool {
        self.mapping.contains_key(&role.to_ascii_lowercase())
    }

    /// All roles, sorted by name.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.mapping.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of roles.
    #[inline]
    pub fn len(&self) -> usize {
        self.mapping.len()
    }

    /// Checks if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.mapping.is_empty()
    }

    /// Gets the reference color space name.
    #[inline]
    pub fn reference(&self) -> Option<&str> {
        self.get(names::REFERENCE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_case_insensitive() {
        let mut roles = Roles::new();
        roles.define("Scene_Linear", "ACEScg");
        assert_eq!(roles.get("scene_linear"), Some("ACEScg"));
        assert!(roles.contains("SCENE_LINEAR"));
    }

    #[test]
    fn remove_role() {
        let mut roles = Roles::new();
        roles.define("data", "raw");
        assert!(roles.remove("DATA"));
        assert!(!roles.contains("data"));
    }
}
