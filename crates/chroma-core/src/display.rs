//! Displays, views and view transforms.
//!
//! A display maps to an ordered list of views. A view either names a color
//! space directly, or pairs a view transform (scene reference to display
//! reference) with a display-referred color space. Views may also be
//! defined once as shared views and referenced from several displays.

use serde::{Deserialize, Serialize};

use crate::colorspace::ReferenceSpaceType;
use crate::transform::Transform;

/// A single view of a display.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct View {
    /// View name.
    pub name: String,
    /// Display color space (or the final space for simple views).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colorspace: Option<String>,
    /// View transform name, for views through the display reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub view_transform: Option<String>,
    /// Default look list applied by this view.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub looks: Option<String>,
    /// Viewing rule gating which input spaces this view is offered for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Description text.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
}

impl View {
    /// Creates a simple view naming a color space.
    pub fn new(name: impl Into<String>, colorspace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            colorspace: Some(colorspace.into()),
            ..Default::default()
        }
    }

    /// Creates a view through a view transform and display color space.
    pub fn with_view_transform(
        name: impl Into<String>,
        view_transform: impl Into<String>,
        display_colorspace: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            colorspace: Some(display_colorspace.into()),
            view_transform: Some(view_transform.into()),
            ..Default::default()
        }
    }

    /// Sets the default look list.
    pub fn looks(mut self, looks: impl Into<String>) -> Self {
        self.looks = Some(looks.into());
        self
    }

    /// Sets the viewing rule.
    pub fn rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }
}

/// A display device and its views.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Display {
    /// Display name.
    pub name: String,
    /// Views local to this display, in menu order.
    #[serde(default)]
    pub views: Vec<View>,
    /// Names of shared views this display offers.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub shared_views: Vec<String>,
}

impl Display {
    /// Creates a display with no views.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Adds a local view.
    pub fn view(mut self, view: View) -> Self {
        self.views.push(view);
        self
    }

    /// References a shared view.
    pub fn shared_view(mut self, name: impl Into<String>) -> Self {
        self.shared_views.push(name.into());
        self
    }

    /// Looks up a local view by name, case-insensitively.
    pub fn find_view(&self, name: &str) -> Option<&View> {
        self.views.iter().find(|v| v.name.eq_ignore_ascii_case(name))
    }

    /// True if this display references the shared view.
    pub fn has_shared_view(&self, name: &str) -> bool {
        self.shared_views
            .iter()
            .any(|v| v.eq_ignore_ascii_case(name))
    }
}

/// A reference-space-typed transform used by display pipelines.
///
/// The forward direction maps the scene reference to the display
/// reference.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ViewTransform {
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default)]
    reference_space: ReferenceSpaceType,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from_reference: Option<Transform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to_reference: Option<Transform>,
}

impl ViewTransform {
    /// Creates a view transform.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
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

    /// Sets the from-reference transform (scene ref to display ref).
    pub fn from_reference(mut self, t: Transform) -> Self {
        self.from_reference = Some(t);
        self
    }

    /// Sets the to-reference transform (display ref to scene ref).
    pub fn to_reference(mut self, t: Transform) -> Self {
        self.to_reference = Some(t);
        self
    }

    /// View transform name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Description text.
    #[inline]
    pub fn get_description(&self) -> &str {
        &self.description
    }

    /// Reference space family this transform is typed against.
    #[inline]
    pub fn reference_space(&self) -> ReferenceSpaceType {
        self.reference_space
    }

    /// From-reference transform, if defined.
    #[inline]
    pub fn get_from_reference(&self) -> Option<&Transform> {
        self.from_reference.as_ref()
    }

    /// To-reference transform, if defined.
    #[inline]
    pub fn get_to_reference(&self) -> Option<&Transform> {
        self.to_reference.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_lookup_case_insensitive() {
        let display = Display::new("sRGB Monitor")
            .view(View::new("Film", "sRGB"))
            .shared_view("Raw");
        assert!(display.find_view("film").is_some());
        assert!(display.has_shared_view("RAW"));
        assert!(display.find_view("Raw").is_none());
    }
}
