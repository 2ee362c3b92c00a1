//! The color configuration: the root object of the engine.
//!
//! A [`Config`] owns the color space graph, roles, looks, displays and
//! rules, and hands out compiled [`Processor`]s for conversion requests.
//! All name lookups resolve role first, then canonical name, then alias,
//! case-insensitively. Mutations validate uniqueness at insertion time so
//! lookups never have to disambiguate.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::colorspace::{ColorSpace, NamedTransform};
use crate::compiler::Compiler;
use crate::context::{Context, FileResolver};
use crate::display::{Display, View, ViewTransform};
use crate::error::{ChromaError, ChromaResult};
use crate::look::Look;
use crate::processor::Processor;
use crate::role::Roles;
use crate::rules::{FileRules, ViewingRules};
use crate::transform::{Transform, TransformDirection};

/// Current config profile version written by serialization.
pub const PROFILE_VERSION: u32 = 2;

/// A complete color management configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub(crate) version: u32,
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) search_paths: Vec<String>,
    pub(crate) working_dir: PathBuf,
    pub(crate) environment: BTreeMap<String, String>,
    pub(crate) strict_context: bool,
    pub(crate) roles: Roles,
    pub(crate) colorspaces: Vec<ColorSpace>,
    pub(crate) named_transforms: Vec<NamedTransform>,
    pub(crate) looks: Vec<Look>,
    pub(crate) view_transforms: Vec<ViewTransform>,
    pub(crate) default_view_transform: Option<String>,
    pub(crate) shared_views: Vec<View>,
    pub(crate) displays: Vec<Display>,
    pub(crate) active_displays: Vec<String>,
    pub(crate) active_views: Vec<String>,
    pub(crate) file_rules: FileRules,
    pub(crate) viewing_rules: ViewingRules,
}

impl Config {
    /// Creates an empty config at the current profile version.
    pub fn new() -> Self {
        Self {
            version: PROFILE_VERSION,
            ..Default::default()
        }
    }

    /// Profile version.
    #[inline]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Config name.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the config name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Description text.
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Sets the description.
    pub fn set_description(&mut self, desc: impl Into<String>) {
        self.description = desc.into();
    }

    // ------------------------------------------------------------------
    // Search paths and context

    /// Search path entries, in probe order.
    #[inline]
    pub fn search_paths(&self) -> &[String] {
        &self.search_paths
    }

    /// Appends a search path entry. Entries may contain context variables
    /// and are resolved relative to the working directory.
    pub fn add_search_path(&mut self, path: impl Into<String>) {
        self.search_paths.push(path.into());
    }

    /// Replaces the search path list.
    pub fn set_search_paths(&mut self, paths: Vec<String>) {
        self.search_paths = paths;
    }

    /// Directory relative paths resolve against (normally the config file's
    /// directory).
    #[inline]
    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Sets the working directory.
    pub fn set_working_dir(&mut self, dir: impl Into<PathBuf>) {
        self.working_dir = dir.into();
    }

    /// Declared environment variable defaults.
    #[inline]
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    /// Declares a context variable with its default value.
    pub fn set_environment_var(&mut self, name: impl Into<String>, default: impl Into<String>) {
        self.environment.insert(name.into(), default.into());
    }

    /// Sets strict context resolution: unresolved variables collapse to
    /// empty instead of passing through verbatim.
    pub fn set_strict_context(&mut self, strict: bool) {
        self.strict_context = strict;
    }

    /// Builds the effective context: declared defaults, overridden by the
    /// process environment, overridden by `overrides`.
    pub fn context(&self, overrides: Option<&Context>) -> Context {
        let mut ctx = if self.strict_context {
            Context::strict()
        } else {
            Context::new()
        };
        for (name, default) in &self.environment {
            match std::env::var(name) {
                Ok(value) => ctx.set(name, value),
                Err(_) => ctx.set(name, default),
            }
        }
        if let Some(overrides) = overrides {
            for (name, value) in overrides.vars() {
                ctx.set(name, value);
            }
        }
        ctx
    }

    /// The file resolver for this config's search paths.
    pub fn file_resolver(&self) -> FileResolver {
        FileResolver::new(self.search_paths.clone(), self.working_dir.clone())
    }

    // ------------------------------------------------------------------
    // Name bookkeeping

    /// True if `name` collides with any color space or named transform
    /// name or alias.
    fn name_taken(&self, name: &str) -> bool {
        self.colorspaces.iter().any(|cs| cs.matches(name))
            || self.named_transforms.iter().any(|nt| nt.matches(name))
    }

    fn check_names_free<'a>(&self, names: impl Iterator<Item = &'a str>) -> ChromaResult<()> {
        for name in names {
            if self.name_taken(name) {
                return Err(ChromaError::Duplicate {
                    name: name.to_string(),
                });
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Color spaces

    /// Color spaces in declaration order.
    #[inline]
    pub fn colorspaces(&self) -> &[ColorSpace] {
        &self.colorspaces
    }

    /// Color space names in declaration order.
    pub fn colorspace_names(&self) -> Vec<&str> {
        self.colorspaces.iter().map(|cs| cs.name()).collect()
    }

    /// Adds a color space. The name and every alias must be free across
    /// color spaces and named transforms, case-insensitively.
    pub fn add_colorspace(&mut self, cs: ColorSpace) -> ChromaResult<()> {
        self.check_names_free(
            std::iter::once(cs.name()).chain(cs.aliases().iter().map(String::as_str)),
        )?;
        self.colorspaces.push(cs);
        Ok(())
    }

    /// Removes a color space by canonical name. Returns true if removed.
    pub fn remove_colorspace(&mut self, name: &str) -> bool {
        let before = self.colorspaces.len();
        self.colorspaces.retain(|cs| !cs.name().eq_ignore_ascii_case(name));
        self.colorspaces.len() != before
    }

    /// Resolves a role, name or alias to a color space.
    pub fn colorspace(&self, name: &str) -> Option<&ColorSpace> {
        let target = self.roles.get(name).unwrap_or(name);
        self.colorspaces.iter().find(|cs| cs.matches(target))
    }

    /// Like [`Config::colorspace`] but errors with the requested name.
    pub fn require_colorspace(&self, name: &str) -> ChromaResult<&ColorSpace> {
        self.colorspace(name)
            .ok_or_else(|| ChromaError::ColorSpaceNotFound {
                name: name.to_string(),
            })
    }

    /// Resolves a role, name or alias to the canonical color space name.
    pub fn canonical_name(&self, name: &str) -> Option<&str> {
        self.colorspace(name).map(|cs| cs.name())
    }

    // ------------------------------------------------------------------
    // Named transforms

    /// Named transforms in declaration order.
    #[inline]
    pub fn named_transforms(&self) -> &[NamedTransform] {
        &self.named_transforms
    }

    /// Adds a named transform, enforcing the shared name/alias namespace.
    pub fn add_named_transform(&mut self, nt: NamedTransform) -> ChromaResult<()> {
        self.check_names_free(
            std::iter::once(nt.name()).chain(nt.aliases().iter().map(String::as_str)),
        )?;
        self.named_transforms.push(nt);
        Ok(())
    }

    /// Looks up a named transform by name or alias.
    pub fn named_transform(&self, name: &str) -> Option<&NamedTransform> {
        self.named_transforms.iter().find(|nt| nt.matches(name))
    }

    // ------------------------------------------------------------------
    // Roles

    /// Role mapping.
    #[inline]
    pub fn roles(&self) -> &Roles {
        &self.roles
    }

    /// Mutable role mapping.
    #[inline]
    pub fn roles_mut(&mut self) -> &mut Roles {
        &mut self.roles
    }

    // ------------------------------------------------------------------
    // Looks

    /// Looks in declaration order.
    #[inline]
    pub fn looks(&self) -> &[Look] {
        &self.looks
    }

    /// Adds a look. Look names share a namespace with each other only.
    pub fn add_look(&mut self, look: Look) -> ChromaResult<()> {
        if self.looks.iter().any(|l| l.name().eq_ignore_ascii_case(look.name())) {
            return Err(ChromaError::Duplicate {
                name: look.name().to_string(),
            });
        }
        self.looks.push(look);
        Ok(())
    }

    /// Looks up a look by name, case-insensitively.
    pub fn look(&self, name: &str) -> Option<&Look> {
        self.looks.iter().find(|l| l.name().eq_ignore_ascii_case(name))
    }

    // ------------------------------------------------------------------
    // View transforms

    /// View transforms in declaration order.
    #[inline]
    pub fn view_transforms(&self) -> &[ViewTransform] {
        &self.view_transforms
    }

    /// Adds a view transform.
    pub fn add_view_transform(&mut self, vt: ViewTransform) -> ChromaResult<()> {
        if self
            .view_transforms
            .iter()
            .any(|v| v.name().eq_ignore_ascii_case(vt.name()))
        {
            return Err(ChromaError::Duplicate {
                name: vt.name().to_string(),
            });
        }
        self.view_transforms.push(vt);
        Ok(())
    }

    /// Looks up a view transform by name.
    pub fn view_transform(&self, name: &str) -> Option<&ViewTransform> {
        self.view_transforms
            .iter()
            .find(|v| v.name().eq_ignore_ascii_case(name))
    }

    /// Sets the default view transform used when a display-referred
    /// conversion does not name one.
    pub fn set_default_view_transform(&mut self, name: Option<String>) {
        self.default_view_transform = name;
    }

    /// The explicitly configured default view transform name, if any.
    #[inline]
    pub fn default_view_transform_name(&self) -> Option<&str> {
        self.default_view_transform.as_deref()
    }

    /// The default view transform: the named one, else the first declared.
    pub fn default_view_transform(&self) -> Option<&ViewTransform> {
        match &self.default_view_transform {
            Some(name) => self.view_transform(name),
            None => self.view_transforms.first(),
        }
    }

    // ------------------------------------------------------------------
    // Displays and views

    /// Displays in declaration order.
    #[inline]
    pub fn displays(&self) -> &[Display] {
        &self.displays
    }

    /// Adds a display.
    pub fn add_display(&mut self, display: Display) -> ChromaResult<()> {
        if self
            .displays
            .iter()
            .any(|d| d.name.eq_ignore_ascii_case(&display.name))
        {
            return Err(ChromaError::Duplicate {
                name: display.name.clone(),
            });
        }
        self.displays.push(display);
        Ok(())
    }

    /// Looks up a display by name.
    pub fn display(&self, name: &str) -> Option<&Display> {
        self.displays.iter().find(|d| d.name.eq_ignore_ascii_case(name))
    }

    /// Shared view definitions.
    #[inline]
    pub fn shared_views(&self) -> &[View] {
        &self.shared_views
    }

    /// Adds a shared view definition.
    pub fn add_shared_view(&mut self, view: View) -> ChromaResult<()> {
        if self
            .shared_views
            .iter()
            .any(|v| v.name.eq_ignore_ascii_case(&view.name))
        {
            return Err(ChromaError::Duplicate {
                name: view.name.clone(),
            });
        }
        self.shared_views.push(view);
        Ok(())
    }

    /// Restricts which displays are offered. Empty means all.
    pub fn set_active_displays(&mut self, names: Vec<String>) {
        self.active_displays = names;
    }

    /// The active display list.
    #[inline]
    pub fn active_displays(&self) -> &[String] {
        &self.active_displays
    }

    /// Restricts which views are offered. Empty means all.
    pub fn set_active_views(&mut self, names: Vec<String>) {
        self.active_views = names;
    }

    /// The active view list.
    #[inline]
    pub fn active_views(&self) -> &[String] {
        &self.active_views
    }

    /// The default display: the first active one, else the first declared.
    pub fn default_display(&self) -> Option<&str> {
        for name in &self.active_displays {
            if let Some(d) = self.display(name) {
                return Some(d.name.as_str());
            }
        }
        self.displays.first().map(|d| d.name.as_str())
    }

    /// The default view of a display: the first offered one.
    pub fn default_view(&self, display: &str) -> Option<&str> {
        self.views(display).into_iter().next()
    }

    /// Resolves a view of a display, checking local then shared views.
    pub fn find_view(&self, display: &str, view: &str) -> Option<&View> {
        let d = self.display(display)?;
        if let Some(v) = d.find_view(view) {
            return Some(v);
        }
        if d.has_shared_view(view) {
            return self
                .shared_views
                .iter()
                .find(|v| v.name.eq_ignore_ascii_case(view));
        }
        None
    }

    /// View names offered by a display, in declaration order, filtered by
    /// the active-view list when one is set.
    pub fn views(&self, display: &str) -> Vec<&str> {
        let Some(d) = self.display(display) else {
            return Vec::new();
        };
        let active = |name: &str| {
            self.active_views.is_empty()
                || self.active_views.iter().any(|a| a.eq_ignore_ascii_case(name))
        };
        let mut out: Vec<&str> = d
            .views
            .iter()
            .map(|v| v.name.as_str())
            .filter(|n| active(n))
            .collect();
        for shared in &d.shared_views {
            if active(shared) {
                if let Some(v) = self
                    .shared_views
                    .iter()
                    .find(|v| v.name.eq_ignore_ascii_case(shared))
                {
                    out.push(v.name.as_str());
                }
            }
        }
        out
    }

    /// View names offered by a display for material in a given color
    /// space, additionally filtered through each view's viewing rule.
    ///
    /// A view with no rule is always offered. An unknown color space
    /// filters to the unrestricted list.
    pub fn views_for(&self, display: &str, colorspace: &str) -> Vec<&str> {
        let Some(cs) = self.colorspace(colorspace) else {
            return self.views(display);
        };
        self.views(display)
            .into_iter()
            .filter(|name| {
                let Some(view) = self.find_view(display, name) else {
                    return false;
                };
                match &view.rule {
                    None => true,
                    Some(rule) => match self.viewing_rules.get(rule) {
                        Some(r) => r.applies_to(cs.name(), cs.get_encoding()),
                        None => false,
                    },
                }
            })
            .collect()
    }

    // ------------------------------------------------------------------
    // Rules

    /// File rules for path-based color space assignment.
    #[inline]
    pub fn file_rules(&self) -> &FileRules {
        &self.file_rules
    }

    /// Mutable file rules.
    #[inline]
    pub fn file_rules_mut(&mut self) -> &mut FileRules {
        &mut self.file_rules
    }

    /// Viewing rules gating views per color space.
    #[inline]
    pub fn viewing_rules(&self) -> &ViewingRules {
        &self.viewing_rules
    }

    /// Mutable viewing rules.
    #[inline]
    pub fn viewing_rules_mut(&mut self) -> &mut ViewingRules {
        &mut self.viewing_rules
    }

    /// Assigns a color space to a file path via the file rules.
    ///
    /// Returns the color space name and the index of the matching rule.
    /// The terminal Default rule guarantees a result.
    pub fn colorspace_from_filepath(&self, path: &str) -> (&str, usize) {
        let names: Vec<&str> = self.colorspaces.iter().map(|cs| cs.name()).collect();
        self.file_rules.evaluate(path, &names)
    }

    // ------------------------------------------------------------------
    // Processors

    /// Compiles a processor converting between two color spaces (each a
    /// role, name or alias).
    pub fn processor(&self, src: &str, dst: &str) -> ChromaResult<Processor> {
        self.processor_with_context(None, src, dst)
    }

    /// Compiles a color space conversion under an explicit context.
    pub fn processor_with_context(
        &self,
        context: Option<&Context>,
        src: &str,
        dst: &str,
    ) -> ChromaResult<Processor> {
        let ctx = self.context(context);
        Compiler::new(self, ctx).colorspace_processor(src, dst)
    }

    /// Compiles the full display pipeline for a view.
    pub fn display_processor(
        &self,
        src: &str,
        display: &str,
        view: &str,
    ) -> ChromaResult<Processor> {
        self.display_processor_with_context(None, src, display, view, None)
    }

    /// Compiles a display pipeline with an explicit context and an
    /// optional look override (replacing the view's look list).
    pub fn display_processor_with_context(
        &self,
        context: Option<&Context>,
        src: &str,
        display: &str,
        view: &str,
        looks_override: Option<&str>,
    ) -> ChromaResult<Processor> {
        let ctx = self.context(context);
        Compiler::new(self, ctx).display_processor(src, display, view, looks_override)
    }

    /// Compiles an arbitrary transform graph.
    pub fn transform_processor(
        &self,
        context: Option<&Context>,
        transform: &Transform,
        direction: TransformDirection,
    ) -> ChromaResult<Processor> {
        let ctx = self.context(context);
        Compiler::new(self, ctx).transform_processor(transform, direction)
    }

    /// Compiles a named transform in the given direction.
    pub fn named_transform_processor(
        &self,
        context: Option<&Context>,
        name: &str,
        direction: TransformDirection,
    ) -> ChromaResult<Processor> {
        let ctx = self.context(context);
        Compiler::new(self, ctx).named_transform_processor(name, direction)
    }

    // ------------------------------------------------------------------
    // Cache identity

    /// Content hash of this config under a context.
    ///
    /// With a context, covers the canonical serialized form plus, for
    /// every file-based transform, the resolved file's size and mtime
    /// (or a missing marker); two configs with equal IDs produce
    /// identical processors. Without a context this degrades to a pure
    /// structural hash of the document and never touches the
    /// filesystem.
    pub fn cache_id(&self, context: Option<&Context>) -> ChromaResult<String> {
        let mut h = Sha256::new();
        let yaml = crate::serialize::to_yaml(self)?;
        h.update(yaml.as_bytes());

        let Some(overrides) = context else {
            return Ok(crate::cache::hex_digest(h));
        };
        let ctx = self.context(Some(overrides));
        h.update(ctx.fingerprint().as_bytes());

        let resolver = self.file_resolver();
        for src in self.file_transform_sources() {
            h.update(src.as_bytes());
            match resolver.resolve(&src, &ctx) {
                Ok(path) => match std::fs::metadata(&path) {
                    Ok(meta) => {
                        h.update(meta.len().to_le_bytes());
                        if let Ok(mtime) = meta.modified() {
                            if let Ok(d) = mtime.duration_since(std::time::UNIX_EPOCH) {
                                h.update(d.as_nanos().to_le_bytes());
                            }
                        }
                    }
                    Err(_) => h.update(b"missing"),
                },
                Err(_) => h.update(b"missing"),
            }
        }
        Ok(crate::cache::hex_digest(h))
    }

    /// Every `FileTransform` source string referenced by this config, in
    /// deterministic order.
    pub(crate) fn file_transform_sources(&self) -> Vec<String> {
        let mut sources = Vec::new();
        let mut collect = |t: &Transform| {
            t.walk(&mut |node| {
                if let Transform::File(f) = node {
                    sources.push(f.src.clone());
                }
            });
        };
        for cs in &self.colorspaces {
            if let Some(t) = cs.get_to_reference() {
                collect(t);
            }
            if let Some(t) = cs.get_from_reference() {
                collect(t);
            }
        }
        for nt in &self.named_transforms {
            if let Some(t) = nt.get_forward() {
                collect(t);
            }
            if let Some(t) = nt.get_inverse() {
                collect(t);
            }
        }
        for look in &self.looks {
            if let Some(t) = look.get_transform() {
                collect(t);
            }
            if let Some(t) = look.get_inverse_transform() {
                collect(t);
            }
        }
        for vt in &self.view_transforms {
            if let Some(t) = vt.get_from_reference() {
                collect(t);
            }
            if let Some(t) = vt.get_to_reference() {
                collect(t);
            }
        }
        sources.sort();
        sources.dedup();
        sources
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::MatrixTransform;

    fn basic_config() -> Config {
        let mut config = Config::new();
        config
            .add_colorspace(ColorSpace::new("linear").alias("lin"))
            .unwrap();
        config
            .add_colorspace(
                ColorSpace::new("sRGB").from_reference(Transform::Matrix(MatrixTransform {
                    matrix: {
                        let mut m = MatrixTransform::IDENTITY;
                        m[0] = 2.0;
                        m[5] = 2.0;
                        m[10] = 2.0;
                        m
                    },
                    ..Default::default()
                })),
            )
            .unwrap();
        config.roles_mut().define("reference", "linear");
        config.roles_mut().define("scene_linear", "linear");
        config
    }

    #[test]
    fn lookup_role_then_name_then_alias() {
        let config = basic_config();
        assert_eq!(config.colorspace("scene_linear").unwrap().name(), "linear");
        assert_eq!(config.colorspace("SRGB").unwrap().name(), "sRGB");
        assert_eq!(config.colorspace("LIN").unwrap().name(), "linear");
        assert!(config.colorspace("missing").is_none());
    }

    #[test]
    fn duplicate_names_rejected_across_collections() {
        let mut config = basic_config();
        assert!(matches!(
            config.add_colorspace(ColorSpace::new("LINEAR")),
            Err(ChromaError::Duplicate { .. })
        ));
        assert!(matches!(
            config.add_named_transform(NamedTransform::new("lin")),
            Err(ChromaError::Duplicate { .. })
        ));
        assert!(config.add_named_transform(NamedTransform::new("utility")).is_ok());
        assert!(matches!(
            config.add_colorspace(ColorSpace::new("spaced").alias("Utility")),
            Err(ChromaError::Duplicate { .. })
        ));
    }

    #[test]
    fn default_display_prefers_active_list() {
        let mut config = basic_config();
        config.add_display(Display::new("a").view(View::new("v", "sRGB"))).unwrap();
        config.add_display(Display::new("b").view(View::new("v", "sRGB"))).unwrap();
        assert_eq!(config.default_display(), Some("a"));
        config.set_active_displays(vec!["b".into()]);
        assert_eq!(config.default_display(), Some("b"));
    }

    #[test]
    fn shared_views_resolve_through_displays() {
        let mut config = basic_config();
        config
            .add_shared_view(View::new("Raw", "linear"))
            .unwrap();
        config
            .add_display(Display::new("mon").view(View::new("Film", "sRGB")).shared_view("Raw"))
            .unwrap();
        assert_eq!(config.views("mon"), vec!["Film", "Raw"]);
        assert!(config.find_view("mon", "raw").is_some());
    }

    #[test]
    fn active_views_filter() {
        let mut config = basic_config();
        config
            .add_display(
                Display::new("mon")
                    .view(View::new("Film", "sRGB"))
                    .view(View::new("Log", "sRGB")),
            )
            .unwrap();
        config.set_active_views(vec!["Log".into()]);
        assert_eq!(config.views("mon"), vec!["Log"]);
    }

    #[test]
    fn context_override_chain() {
        let mut config = basic_config();
        config.set_environment_var("SHOT", "sh010");
        let ctx = config.context(None);
        assert_eq!(ctx.get("SHOT"), Some("sh010"));

        let mut overrides = Context::new();
        overrides.set("SHOT", "sh020");
        let ctx = config.context(Some(&overrides));
        assert_eq!(ctx.get("SHOT"), Some("sh020"));
    }
}
