//! Config YAML serialization.
//!
//! The on-disk profile is a YAML document with fixed section order;
//! transforms serialize as externally tagged enum variants (`!MatrixTransform`
//! and friends). Serialization is canonical: the same config always
//! produces the same bytes, which the cache ID computation relies on.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::colorspace::{ColorSpace, NamedTransform};
use crate::config::{Config, PROFILE_VERSION};
use crate::display::{Display, View, ViewTransform};
use crate::error::ChromaResult;
use crate::look::Look;
use crate::rules::{FileRule, ViewingRule};

/// The YAML document layout. Field order is the section order in the
/// emitted file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawConfig {
    profile_version: u32,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    search_path: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    environment: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    strict_context: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    roles: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    file_rules: Vec<FileRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    viewing_rules: Vec<ViewingRule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    shared_views: Vec<View>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    displays: Vec<Display>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    active_displays: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    active_views: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    looks: Vec<Look>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    view_transforms: Vec<ViewTransform>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_view_transform: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    colorspaces: Vec<ColorSpace>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    named_transforms: Vec<NamedTransform>,
}

impl From<&Config> for RawConfig {
    fn from(c: &Config) -> Self {
        Self {
            profile_version: c.version,
            name: c.name.clone(),
            description: c.description.clone(),
            search_path: c.search_paths.clone(),
            environment: c.environment.clone(),
            strict_context: c.strict_context,
            roles: c
                .roles
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            file_rules: c.file_rules.rules().to_vec(),
            viewing_rules: c.viewing_rules.rules().to_vec(),
            shared_views: c.shared_views.clone(),
            displays: c.displays.clone(),
            active_displays: c.active_displays.clone(),
            active_views: c.active_views.clone(),
            looks: c.looks.clone(),
            view_transforms: c.view_transforms.clone(),
            default_view_transform: c.default_view_transform.clone(),
            colorspaces: c.colorspaces.clone(),
            named_transforms: c.named_transforms.clone(),
        }
    }
}

impl From<RawConfig> for Config {
    fn from(raw: RawConfig) -> Self {
        let mut config = Config {
            version: if raw.profile_version == 0 {
                PROFILE_VERSION
            } else {
                raw.profile_version
            },
            name: raw.name,
            description: raw.description,
            search_paths: raw.search_path,
            environment: raw.environment,
            strict_context: raw.strict_context,
            shared_views: raw.shared_views,
            displays: raw.displays,
            active_displays: raw.active_displays,
            active_views: raw.active_views,
            looks: raw.looks,
            view_transforms: raw.view_transforms,
            default_view_transform: raw.default_view_transform,
            colorspaces: raw.colorspaces,
            named_transforms: raw.named_transforms,
            ..Default::default()
        };
        for (role, cs) in raw.roles {
            config.roles.define(role, cs);
        }
        config.file_rules.set_rules(raw.file_rules);
        config.viewing_rules.set_rules(raw.viewing_rules);
        config
    }
}

/// Serializes a config to its canonical YAML form.
pub fn to_yaml(config: &Config) -> ChromaResult<String> {
    Ok(serde_yaml::to_string(&RawConfig::from(config))?)
}

/// Parses a config from YAML.
pub fn from_yaml(text: &str) -> ChromaResult<Config> {
    let raw: RawConfig = serde_yaml::from_str(text)?;
    Ok(raw.into())
}

impl Config {
    /// Serializes to canonical YAML.
    pub fn to_yaml(&self) -> ChromaResult<String> {
        to_yaml(self)
    }

    /// Parses from YAML text.
    pub fn from_yaml(text: &str) -> ChromaResult<Self> {
        from_yaml(text)
    }

    /// Writes the config to a file.
    pub fn write_file(&self, path: impl AsRef<Path>) -> ChromaResult<()> {
        std::fs::write(path, self.to_yaml()?)?;
        Ok(())
    }

    /// Reads a config from a file. The file's directory becomes the
    /// working directory for relative search paths.
    pub fn from_file(path: impl AsRef<Path>) -> ChromaResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&text)?;
        if let Some(dir) = path.parent() {
            config.set_working_dir(dir);
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::{Transform, TransferStyle, TransferTransform};

    fn sample() -> Config {
        let mut c = Config::new();
        c.set_name("show");
        c.add_search_path("luts");
        c.set_environment_var("SHOT", "sh010");
        c.add_colorspace(ColorSpace::new("linear")).unwrap();
        c.add_colorspace(
            ColorSpace::new("sRGB")
                .encoding("sdr-video")
                .from_reference(Transform::Transfer(TransferTransform {
                    style: TransferStyle::Srgb,
                    ..Default::default()
                })),
        )
        .unwrap();
        c.roles_mut().define("reference", "linear");
        c.add_display(Display::new("monitor").view(View::new("Film", "sRGB")))
            .unwrap();
        c
    }

    #[test]
    fn yaml_round_trip() {
        let c = sample();
        let text = c.to_yaml().unwrap();
        let back = Config::from_yaml(&text).unwrap();
        assert_eq!(back.name(), "show");
        assert_eq!(back.colorspaces().len(), 2);
        assert_eq!(back.roles().get("reference"), Some("linear"));
        assert_eq!(back.views("monitor"), vec!["Film"]);
        assert_eq!(back.environment().get("SHOT").map(String::as_str), Some("sh010"));
        // Re-serialization is byte-stable.
        assert_eq!(back.to_yaml().unwrap(), text);
    }

    #[test]
    fn transforms_serialize_as_tags() {
        let c = sample();
        let text = c.to_yaml().unwrap();
        assert!(text.contains("!TransferTransform"));
        assert!(text.contains("style: srgb"));
    }

    #[test]
    fn missing_file_rules_fall_back_to_default() {
        let c = Config::from_yaml("profile_version: 2\n").unwrap();
        assert_eq!(c.file_rules().len(), 1);
        assert!(c.file_rules().rules()[0].is_default());
    }

    #[test]
    fn file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        sample().write_file(&path).unwrap();
        let back = Config::from_file(&path).unwrap();
        assert_eq!(back.working_dir(), dir.path());
        assert_eq!(back.name(), "show");
    }
}
