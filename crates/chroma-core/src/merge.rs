//! Config merging.
//!
//! Combines a base config with an input config section by section. Each
//! section follows a strategy (the default, unless overridden for that
//! section); entity collisions are resolved by name, case-insensitively.
//! Merging never mutates its operands and is deterministic: base entries
//! keep their order, new input entries append in input order.

use tracing::info;

use crate::config::Config;
use crate::error::{ChromaError, ChromaResult};

/// How a section combines entries from both configs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeStrategy {
    /// Base wins collisions; input-only entries are appended.
    PreferBase,
    /// Input wins collisions; input-only entries are appended.
    #[default]
    PreferInput,
    /// The section is taken from the input alone.
    InputOnly,
    /// The section is taken from the base alone.
    BaseOnly,
    /// Entries named by the input are removed from the base.
    Remove,
}

/// Per-section strategy overrides and merge tuning.
#[derive(Debug, Clone, Default)]
pub struct MergeOptions {
    /// Strategy for sections without an override.
    pub default_strategy: MergeStrategy,
    /// Roles section override.
    pub roles: Option<MergeStrategy>,
    /// Color spaces section override.
    pub colorspaces: Option<MergeStrategy>,
    /// Named transforms section override.
    pub named_transforms: Option<MergeStrategy>,
    /// Looks section override.
    pub looks: Option<MergeStrategy>,
    /// Displays/views section override.
    pub displays: Option<MergeStrategy>,
    /// View transforms section override.
    pub view_transforms: Option<MergeStrategy>,
    /// File rules section override.
    pub file_rules: Option<MergeStrategy>,
    /// Viewing rules section override.
    pub viewing_rules: Option<MergeStrategy>,
    /// Prefix applied to the family of entries contributed by the input.
    pub input_family_prefix: String,
    /// Prefix applied to the family of entries kept from the base.
    pub base_family_prefix: String,
    /// Fail on collisions instead of resolving them silently.
    pub error_on_conflict: bool,
}

impl MergeOptions {
    /// Options with the given default strategy.
    pub fn with_strategy(strategy: MergeStrategy) -> Self {
        Self {
            default_strategy: strategy,
            ..Default::default()
        }
    }

    fn section(&self, over: Option<MergeStrategy>) -> MergeStrategy {
        over.unwrap_or(self.default_strategy)
    }
}

/// Merges `input` onto `base`, returning a new config.
pub fn merge(base: &Config, input: &Config, options: &MergeOptions) -> ChromaResult<Config> {
    let mut out = base.clone();
    out.version = base.version.max(input.version);

    if options.default_strategy == MergeStrategy::PreferInput && !input.name().is_empty() {
        out.name = input.name().to_string();
    }
    if options.default_strategy == MergeStrategy::PreferInput && !input.description().is_empty() {
        out.description = input.description().to_string();
    }

    merge_search_paths(&mut out, input, options.default_strategy);
    merge_environment(&mut out, input, options.default_strategy);
    merge_roles(&mut out, input, options)?;

    out.colorspaces = merge_named(
        base.colorspaces.clone(),
        input.colorspaces.clone(),
        options.section(options.colorspaces),
        options.error_on_conflict,
        "colorspaces",
        |cs| cs.name().to_string(),
    )?;
    apply_family_prefixes(&mut out, base, input, options);

    out.named_transforms = merge_named(
        base.named_transforms.clone(),
        input.named_transforms.clone(),
        options.section(options.named_transforms),
        options.error_on_conflict,
        "named_transforms",
        |nt| nt.name().to_string(),
    )?;
    out.looks = merge_named(
        base.looks.clone(),
        input.looks.clone(),
        options.section(options.looks),
        options.error_on_conflict,
        "looks",
        |l| l.name().to_string(),
    )?;
    out.view_transforms = merge_named(
        base.view_transforms.clone(),
        input.view_transforms.clone(),
        options.section(options.view_transforms),
        options.error_on_conflict,
        "view_transforms",
        |vt| vt.name().to_string(),
    )?;
    if out.default_view_transform.is_none() {
        out.default_view_transform = input.default_view_transform.clone();
    }

    merge_displays(&mut out, base, input, options)?;
    merge_file_rules(&mut out, input, options)?;

    let viewing = merge_named(
        base.viewing_rules.rules().to_vec(),
        input.viewing_rules.rules().to_vec(),
        options.section(options.viewing_rules),
        options.error_on_conflict,
        "viewing_rules",
        |r| r.name.clone(),
    )?;
    out.viewing_rules.set_rules(viewing);

    info!(
        base = base.name(),
        input = input.name(),
        colorspaces = out.colorspaces.len(),
        "merged configs"
    );
    Ok(out)
}

/// Merges the same pair once per options set, one output per set.
pub fn merge_batch(
    base: &Config,
    input: &Config,
    options: &[MergeOptions],
) -> ChromaResult<Vec<Config>> {
    options.iter().map(|o| merge(base, input, o)).collect()
}

fn merge_search_paths(out: &mut Config, input: &Config, strategy: MergeStrategy) {
    match strategy {
        MergeStrategy::BaseOnly => {}
        MergeStrategy::InputOnly => out.search_paths = input.search_paths.clone(),
        MergeStrategy::Remove => {
            out.search_paths.retain(|p| !input.search_paths.contains(p));
        }
        _ => {
            for p in &input.search_paths {
                if !out.search_paths.contains(p) {
                    out.search_paths.push(p.clone());
                }
            }
        }
    }
}

fn merge_environment(out: &mut Config, input: &Config, strategy: MergeStrategy) {
    match strategy {
        MergeStrategy::BaseOnly => {}
        MergeStrategy::InputOnly => out.environment = input.environment.clone(),
        MergeStrategy::Remove => {
            for name in input.environment.keys() {
                out.environment.remove(name);
            }
        }
        MergeStrategy::PreferBase => {
            for (name, value) in &input.environment {
                out.environment
                    .entry(name.clone())
                    .or_insert_with(|| value.clone());
            }
        }
        MergeStrategy::PreferInput => {
            for (name, value) in &input.environment {
                out.environment.insert(name.clone(), value.clone());
            }
        }
    }
}

fn merge_roles(out: &mut Config, input: &Config, options: &MergeOptions) -> ChromaResult<()> {
    match options.section(options.roles) {
        MergeStrategy::BaseOnly => {}
        MergeStrategy::InputOnly => {
            out.roles = input.roles.clone();
        }
        MergeStrategy::Remove => {
            let names: Vec<String> = input.roles.iter().map(|(k, _)| k.to_string()).collect();
            for name in names {
                out.roles.remove(&name);
            }
        }
        MergeStrategy::PreferBase => {
            for (role, cs) in input.roles.iter() {
                if !out.roles.contains(role) {
                    out.roles.define(role, cs);
                }
            }
        }
        MergeStrategy::PreferInput => {
            for (role, cs) in input.roles.iter() {
                if options.error_on_conflict
                    && out.roles.get(role).is_some_and(|existing| existing != cs)
                {
                    return Err(ChromaError::MergeConflict {
                        section: "roles",
                        name: role.to_string(),
                    });
                }
                out.roles.define(role, cs);
            }
        }
    }
    Ok(())
}

/// Generic by-name entity list merge.
fn merge_named<T: Clone + PartialEq>(
    base: Vec<T>,
    input: Vec<T>,
    strategy: MergeStrategy,
    error_on_conflict: bool,
    section: &'static str,
    key: impl Fn(&T) -> String,
) -> ChromaResult<Vec<T>> {
    let collides = |list: &[T], item: &T| {
        list.iter()
            .position(|x| key(x).eq_ignore_ascii_case(&key(item)))
    };
    match strategy {
        MergeStrategy::BaseOnly => Ok(base),
        MergeStrategy::InputOnly => Ok(input),
        MergeStrategy::Remove => {
            let mut out = base;
            out.retain(|x| {
                !input
                    .iter()
                    .any(|i| key(i).eq_ignore_ascii_case(&key(x)))
            });
            Ok(out)
        }
        MergeStrategy::PreferBase => {
            let mut out = base;
            for item in input {
                if collides(&out, &item).is_none() {
                    out.push(item);
                }
            }
            Ok(out)
        }
        MergeStrategy::PreferInput => {
            let mut out = base;
            for item in input {
                match collides(&out, &item) {
                    Some(i) => {
                        if error_on_conflict && out[i] != item {
                            return Err(ChromaError::MergeConflict {
                                section,
                                name: key(&item),
                            });
                        }
                        out[i] = item;
                    }
                    None => out.push(item),
                }
            }
            Ok(out)
        }
    }
}

/// Tags merged color spaces and named transforms with family prefixes so
/// merged menus show provenance.
fn apply_family_prefixes(out: &mut Config, base: &Config, input: &Config, options: &MergeOptions) {
    if options.input_family_prefix.is_empty() && options.base_family_prefix.is_empty() {
        return;
    }
    let from_base = |name: &str| base.colorspace(name).is_some();
    for cs in &mut out.colorspaces {
        let prefix = if from_base(cs.name()) && base.colorspace(cs.name()) == Some(&*cs) {
            &options.base_family_prefix
        } else if input.colorspace(cs.name()).is_some() {
            &options.input_family_prefix
        } else {
            &options.base_family_prefix
        };
        if !prefix.is_empty() {
            cs.set_family(format!("{prefix}{}", cs.get_family()));
        }
    }
    for nt in &mut out.named_transforms {
        let prefix = if input.named_transform(nt.name()).is_some()
            && base.named_transform(nt.name()).is_none()
        {
            &options.input_family_prefix
        } else {
            &options.base_family_prefix
        };
        if !prefix.is_empty() {
            nt.set_family(format!("{prefix}{}", nt.get_family()));
        }
    }
}

fn merge_displays(
    out: &mut Config,
    base: &Config,
    input: &Config,
    options: &MergeOptions,
) -> ChromaResult<()> {
    let strategy = options.section(options.displays);
    out.shared_views = merge_named(
        base.shared_views.clone(),
        input.shared_views.clone(),
        strategy,
        options.error_on_conflict,
        "shared_views",
        |v| v.name.clone(),
    )?;
    match strategy {
        MergeStrategy::BaseOnly => {}
        MergeStrategy::InputOnly => out.displays = input.displays.clone(),
        MergeStrategy::Remove => {
            out.displays.retain(|d| {
                !input
                    .displays
                    .iter()
                    .any(|i| i.name.eq_ignore_ascii_case(&d.name))
            });
        }
        _ => {
            // Colliding displays merge their view lists by view name.
            for display in &input.displays {
                match out
                    .displays
                    .iter_mut()
                    .find(|d| d.name.eq_ignore_ascii_case(&display.name))
                {
                    Some(existing) => {
                        existing.views = merge_named(
                            existing.views.clone(),
                            display.views.clone(),
                            strategy,
                            options.error_on_conflict,
                            "views",
                            |v| v.name.clone(),
                        )?;
                        for shared in &display.shared_views {
                            if !existing.has_shared_view(shared) {
                                existing.shared_views.push(shared.clone());
                            }
                        }
                    }
                    None => out.displays.push(display.clone()),
                }
            }
        }
    }
    out.active_displays = merge_named(
        base.active_displays.clone(),
        input.active_displays.clone(),
        strategy,
        false,
        "active_displays",
        |s| s.clone(),
    )?;
    out.active_views = merge_named(
        base.active_views.clone(),
        input.active_views.clone(),
        strategy,
        false,
        "active_views",
        |s| s.clone(),
    )?;
    Ok(())
}

fn merge_file_rules(out: &mut Config, input: &Config, options: &MergeOptions) -> ChromaResult<()> {
    let strategy = options.section(options.file_rules);
    match strategy {
        MergeStrategy::BaseOnly => Ok(()),
        MergeStrategy::InputOnly => {
            out.file_rules = input.file_rules.clone();
            Ok(())
        }
        MergeStrategy::Remove => {
            let doomed: Vec<String> = input
                .file_rules
                .rules()
                .iter()
                .filter(|r| !r.is_default())
                .map(|r| r.name.clone())
                .collect();
            for name in doomed {
                if let Some(i) = out
                    .file_rules
                    .rules()
                    .iter()
                    .position(|r| r.name.eq_ignore_ascii_case(&name))
                {
                    let _ = out.file_rules.remove(i);
                }
            }
            Ok(())
        }
        _ => {
            // Non-default input rules are woven in before the terminal
            // default, which itself follows the strategy.
            for rule in input.file_rules.rules() {
                if rule.is_default() {
                    if strategy == MergeStrategy::PreferInput {
                        out.file_rules.set_default_colorspace(rule.colorspace.clone());
                    }
                    continue;
                }
                let existing = out
                    .file_rules
                    .rules()
                    .iter()
                    .position(|r| r.name.eq_ignore_ascii_case(&rule.name));
                match existing {
                    Some(i) => {
                        if strategy == MergeStrategy::PreferInput {
                            if options.error_on_conflict && out.file_rules.rules()[i] != *rule {
                                return Err(ChromaError::MergeConflict {
                                    section: "file_rules",
                                    name: rule.name.clone(),
                                });
                            }
                            let _ = out.file_rules.remove(i);
                            out.file_rules.insert(i, rule.clone())?;
                        }
                    }
                    None => {
                        let end = out.file_rules.len() - 1;
                        out.file_rules.insert(end, rule.clone())?;
                    }
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorspace::ColorSpace;
    use crate::rules::FileRule;

    fn base() -> Config {
        let mut c = Config::new();
        c.set_name("base");
        c.add_colorspace(ColorSpace::new("linear").family("Linear")).unwrap();
        c.add_colorspace(ColorSpace::new("sRGB").description("base flavor")).unwrap();
        c.roles_mut().define("reference", "linear");
        c
    }

    fn input() -> Config {
        let mut c = Config::new();
        c.set_name("input");
        c.add_colorspace(ColorSpace::new("sRGB").description("input flavor")).unwrap();
        c.add_colorspace(ColorSpace::new("ACEScg")).unwrap();
        c.roles_mut().define("scene_linear", "ACEScg");
        c
    }

    #[test]
    fn prefer_input_overrides_collisions() {
        let merged = merge(&base(), &input(), &MergeOptions::default()).unwrap();
        assert_eq!(merged.colorspaces().len(), 3);
        assert_eq!(
            merged.colorspace("sRGB").unwrap().get_description(),
            "input flavor"
        );
        assert_eq!(merged.roles().get("scene_linear"), Some("ACEScg"));
        // Base order first, appended input entries after.
        assert_eq!(merged.colorspace_names(), vec!["linear", "sRGB", "ACEScg"]);
    }

    #[test]
    fn prefer_base_keeps_collisions() {
        let options = MergeOptions::with_strategy(MergeStrategy::PreferBase);
        let merged = merge(&base(), &input(), &options).unwrap();
        assert_eq!(
            merged.colorspace("sRGB").unwrap().get_description(),
            "base flavor"
        );
        assert!(merged.colorspace("ACEScg").is_some());
    }

    #[test]
    fn remove_strategy_deletes_named_entries() {
        let options = MergeOptions::with_strategy(MergeStrategy::Remove);
        let merged = merge(&base(), &input(), &options).unwrap();
        assert!(merged.colorspace("sRGB").is_none());
        assert!(merged.colorspace("linear").is_some());
    }

    #[test]
    fn section_override_beats_default() {
        let options = MergeOptions {
            colorspaces: Some(MergeStrategy::BaseOnly),
            ..Default::default()
        };
        let merged = merge(&base(), &input(), &options).unwrap();
        assert!(merged.colorspace("ACEScg").is_none());
        // Roles still follow the default strategy.
        assert_eq!(merged.roles().get("scene_linear"), Some("ACEScg"));
    }

    #[test]
    fn conflict_errors_when_requested() {
        let options = MergeOptions {
            error_on_conflict: true,
            ..Default::default()
        };
        let err = merge(&base(), &input(), &options);
        assert!(matches!(
            err,
            Err(ChromaError::MergeConflict {
                section: "colorspaces",
                ..
            })
        ));
    }

    #[test]
    fn family_prefix_tags_input_entries() {
        let options = MergeOptions {
            input_family_prefix: "in/".to_string(),
            ..Default::default()
        };
        let merged = merge(&base(), &input(), &options).unwrap();
        assert_eq!(merged.colorspace("ACEScg").unwrap().get_family(), "in/");
        assert_eq!(merged.colorspace("linear").unwrap().get_family(), "Linear");
    }

    #[test]
    fn file_rules_weave_before_default() {
        let mut b = base();
        b.file_rules_mut()
            .insert(0, FileRule::glob("exr", "linear", "*", "exr"))
            .unwrap();
        let mut i = input();
        i.file_rules_mut()
            .insert(0, FileRule::glob("png", "sRGB", "*", "png"))
            .unwrap();
        let merged = merge(&b, &i, &MergeOptions::default()).unwrap();
        let names: Vec<&str> = merged
            .file_rules()
            .rules()
            .iter()
            .map(|r| r.name.as_str())
            .collect();
        assert_eq!(names, vec!["exr", "png", "Default"]);
    }

    #[test]
    fn merge_is_deterministic() {
        let a = merge(&base(), &input(), &MergeOptions::default()).unwrap();
        let b = merge(&base(), &input(), &MergeOptions::default()).unwrap();
        assert_eq!(a.to_yaml().unwrap(), b.to_yaml().unwrap());
    }

    #[test]
    fn batch_yields_one_config_per_options_set() {
        let sets = [
            MergeOptions::default(),
            MergeOptions::with_strategy(MergeStrategy::BaseOnly),
        ];
        let out = merge_batch(&base(), &input(), &sets).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].colorspaces().len(), 3);
        assert_eq!(out[1].colorspaces().len(), 2);
    }
}
