//! Color space and named transform definitions.
//!
//! A color space is positioned relative to the config's reference space by
//! its to/from-reference transforms; a named transform carries independent
//! forward/inverse graphs with no implied position (utility LUTs and the
//! like). Both kinds share the config's case-insensitive name/alias
//! namespace.
//!
//! # Example
//!
//! ```
//! use chroma_core::{ColorSpace, Transform, TransferTransform, TransferStyle};
//!
//! let srgb = ColorSpace::new("sRGB")
//!     .alias("srgb_tx")
//!     .family("Display")
//!     .encoding("sdr-video")
//!     .from_reference(Transform::Transfer(TransferTransform {
//!         style: TransferStyle::Srgb,
//!         ..Default::default()
//!     }));
//!
//! assert!(srgb.matches("SRGB_TX"));
//! ```

use serde::{Deserialize, Serialize};

use crate::transform::Transform;

/// Reference space family a space (or view transform) is anchored to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceSpaceType {
    /// Scene-referred reference.
    #[default]
    Scene,
    /// Display-referred reference.
    Display,
}

/// A named color space.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColorSpace {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    family: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    encoding: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    categories: Vec<String>,
    #[serde(default)]
    is_data: bool,
    #[serde(default)]
    reference_space: ReferenceSpaceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to_reference: Option<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from_reference: Option<Transform>,
}

impl ColorSpace {
    /// Creates a color space with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds an alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sets the family.
    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    /// Sets the encoding tag (scene-linear, log, sdr-video, data...).
    pub fn encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = Some(encoding.into());
        self
    }

    /// Sets the description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Adds a category.
    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Marks this space as data (bypasses all color transforms).
    pub fn data(mut self, is_data: bool) -> Self {
        self.is_data = is_data;
        self
    }

    /// Anchors this space to the display-referred reference.
    pub fn display_referred(mut self) -> Self {
        self.reference_space = ReferenceSpaceType::Display;
        self
    }

    /// Sets the to-reference transform.
    pub fn to_reference(mut self, t: Transform) -> Self {
        self.to_reference = Some(t);
        self
    }

    /// Sets the from-reference transform.
    pub fn from_reference(mut self, t: Transform) -> Self {
        self.from_reference = Some(t);
        self
    }

    /// Color space name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Renames the space. Uniqueness is enforced by the owning config.
    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Alias list.
    #[inline]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Family string.
    #[inline]
    pub fn get_family(&self) -> &str {
        &self.family
    }

    pub(crate) fn set_family(&mut self, family: impl Into<String>) {
        self.family = family.into();
    }

    /// Encoding tag.
    #[inline]
    pub fn get_encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    /// Description text.
    #[inline]
    pub fn get_description(&self) -> &str {
        &self.description
    }

    /// Category list.
    #[inline]
    pub fn get_categories(&self) -> &[String] {
        &self.categories
    }

    /// True for data spaces (normals, depth, mattes).
    #[inline]
    pub fn is_data(&self) -> bool {
        self.is_data
    }

    /// Reference space family.
    #[inline]
    pub fn reference_space(&self) -> ReferenceSpaceType {
        self.reference_space
    }

    /// To-reference transform, if defined.
    #[inline]
    pub fn get_to_reference(&self) -> Option<&Transform> {
        self.to_reference.as_ref()
    }

    /// From-reference transform, if defined.
    #[inline]
    pub fn get_from_reference(&self) -> Option<&Transform> {
        self.from_reference.as_ref()
    }

    /// True if `name` equals this space's name or any alias,
    /// case-insensitively.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

/// A named transform: forward/inverse graphs with no reference position.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct NamedTransform {
    name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    aliases: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    family: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    forward: Option<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inverse: Option<Transform>,
}

impl NamedTransform {
    /// Creates a named transform.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds an alias.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sets the family.
    pub fn family(mut self, family: impl Into<String>) -> Self {
        self.family = family.into();
        self
    }

    /// Sets the description.
    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Sets the forward transform.
    pub fn forward(mut self, t: Transform) -> Self {
        self.forward = Some(t);
        self
    }

    /// Sets the inverse transform.
    pub fn inverse(mut self, t: Transform) -> Self {
        self.inverse = Some(t);
        self
    }

    /// Transform name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Alias list.
    #[inline]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Family string.
    #[inline]
    pub fn get_family(&self) -> &str {
        &self.family
    }

    pub(crate) fn set_family(&mut self, family: impl Into<String>) {
        self.family = family.into();
    }

    /// Forward transform, if defined.
    #[inline]
    pub fn get_forward(&self) -> Option<&Transform> {
        self.forward.as_ref()
    }

    /// Inverse transform, if defined.
    #[inline]
    pub fn get_inverse(&self) -> Option<&Transform> {
        self.inverse.as_ref()
    }

    /// Case-insensitive name/alias match.
    pub fn matches(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_lookup_is_case_insensitive() {
        let cs = ColorSpace::new("ACEScg").alias("lin_ap1");
        assert!(cs.matches("acescg"));
        assert!(cs.matches("LIN_AP1"));
        assert!(!cs.matches("srgb"));
    }

    #[test]
    fn data_flag_round_trips() {
        let cs = ColorSpace::new("normals").data(true).encoding("data");
        let text = serde_yaml::to_string(&cs).unwrap();
        let back: ColorSpace = serde_yaml::from_str(&text).unwrap();
        assert!(back.is_data());
    }
}
