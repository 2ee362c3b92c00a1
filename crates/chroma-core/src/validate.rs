//! Config validation.
//!
//! Structural checks over a whole config: dangling references, missing
//! required roles, malformed rules and transform parameter errors.
//! [`check`] reports everything it finds; [`Config::validate`] fails on
//! the first error-severity issue.

use std::fmt;

use tracing::warn;

use crate::config::Config;
use crate::error::{ChromaError, ChromaResult};
use crate::role::names;
use crate::transform::Transform;

/// Issue severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Suspicious but usable.
    Warning,
    /// The config will misbehave.
    Error,
}

/// A single validation finding.
#[derive(Debug, Clone)]
pub struct Issue {
    /// Severity.
    pub severity: Severity,
    /// Human-readable description.
    pub message: String,
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{tag}: {}", self.message)
    }
}

fn error(issues: &mut Vec<Issue>, message: String) {
    issues.push(Issue {
        severity: Severity::Error,
        message,
    });
}

fn warning(issues: &mut Vec<Issue>, message: String) {
    warn!("{message}");
    issues.push(Issue {
        severity: Severity::Warning,
        message,
    });
}

/// Runs every check and returns all findings.
pub fn check(config: &Config) -> Vec<Issue> {
    let mut issues = Vec::new();

    check_roles(config, &mut issues);
    check_colorspaces(config, &mut issues);
    check_file_rules(config, &mut issues);
    check_displays(config, &mut issues);
    check_looks(config, &mut issues);
    check_view_transforms(config, &mut issues);

    issues
}

fn check_roles(config: &Config, issues: &mut Vec<Issue>) {
    if config.roles().get(names::REFERENCE).is_none() {
        error(issues, format!("the '{}' role is required", names::REFERENCE));
    }
    for (role, cs) in config.roles().iter() {
        if config.colorspace(cs).is_none() {
            error(
                issues,
                format!("role '{role}' maps to unknown color space '{cs}'"),
            );
        }
    }
}

fn check_colorspaces(config: &Config, issues: &mut Vec<Issue>) {
    for cs in config.colorspaces() {
        for t in [cs.get_to_reference(), cs.get_from_reference()]
            .into_iter()
            .flatten()
        {
            if let Err(e) = t.validate() {
                error(
                    issues,
                    format!("color space '{}' has an invalid transform: {e}", cs.name()),
                );
            }
            check_transform_refs(config, t, &format!("color space '{}'", cs.name()), issues);
        }
    }
}

/// Checks config references made from inside a transform graph.
fn check_transform_refs(config: &Config, t: &Transform, owner: &str, issues: &mut Vec<Issue>) {
    t.walk(&mut |node| match node {
        Transform::ColorSpace(c) => {
            for name in [&c.src, &c.dst] {
                if config.colorspace(name).is_none() {
                    error(
                        issues,
                        format!("{owner} references unknown color space '{name}'"),
                    );
                }
            }
        }
        Transform::Look(l) => {
            for name in [&l.src, &l.dst] {
                if config.colorspace(name).is_none() {
                    error(
                        issues,
                        format!("{owner} references unknown color space '{name}'"),
                    );
                }
            }
        }
        Transform::DisplayView(dv) => {
            if config.display(&dv.display).is_none() {
                error(
                    issues,
                    format!("{owner} references unknown display '{}'", dv.display),
                );
            }
        }
        _ => {}
    });
}

fn check_file_rules(config: &Config, issues: &mut Vec<Issue>) {
    let rules = config.file_rules().rules();
    match rules.last() {
        Some(last) if last.is_default() => {}
        _ => error(issues, "file rules must end with the Default rule".to_string()),
    }
    for rule in rules {
        if rule.is_path_search() {
            continue;
        }
        if config.colorspace(&rule.colorspace).is_none() {
            error(
                issues,
                format!(
                    "file rule '{}' assigns unknown color space '{}'",
                    rule.name, rule.colorspace
                ),
            );
        }
        if rule.regex.is_some() && (rule.pattern.is_some() || rule.extension.is_some()) {
            error(
                issues,
                format!("file rule '{}' mixes regex and glob matching", rule.name),
            );
        }
    }
}

fn check_displays(config: &Config, issues: &mut Vec<Issue>) {
    for display in config.displays() {
        for view in &display.views {
            check_view(config, &display.name, view, issues);
        }
        for shared in &display.shared_views {
            if !config
                .shared_views()
                .iter()
                .any(|v| v.name.eq_ignore_ascii_case(shared))
            {
                error(
                    issues,
                    format!(
                        "display '{}' references unknown shared view '{shared}'",
                        display.name
                    ),
                );
            }
        }
    }
    for view in config.shared_views() {
        check_view(config, "(shared)", view, issues);
    }
    for active in active_without_match(config) {
        warning(issues, active);
    }
}

fn active_without_match(config: &Config) -> Vec<String> {
    let mut out = Vec::new();
    for name in config.active_displays() {
        if config.display(name).is_none() {
            out.push(format!("active display '{name}' does not exist"));
        }
    }
    out
}

fn check_view(config: &Config, display: &str, view: &crate::display::View, issues: &mut Vec<Issue>) {
    match &view.colorspace {
        Some(cs) if config.colorspace(cs).is_none() => error(
            issues,
            format!(
                "view '{}' of '{display}' references unknown color space '{cs}'",
                view.name
            ),
        ),
        None => error(
            issues,
            format!("view '{}' of '{display}' names no color space", view.name),
        ),
        _ => {}
    }
    if let Some(vt) = &view.view_transform {
        if config.view_transform(vt).is_none() {
            error(
                issues,
                format!(
                    "view '{}' of '{display}' references unknown view transform '{vt}'",
                    view.name
                ),
            );
        }
    }
    if let Some(rule) = &view.rule {
        if config.viewing_rules().get(rule).is_none() {
            error(
                issues,
                format!(
                    "view '{}' of '{display}' references unknown viewing rule '{rule}'",
                    view.name
                ),
            );
        }
    }
    if let Some(looks) = &view.looks {
        for alternative in crate::look::parse_look_list(looks) {
            for look_ref in alternative {
                if config.look(&look_ref.name).is_none() {
                    warning(
                        issues,
                        format!(
                            "view '{}' of '{display}' references unknown look '{}'",
                            view.name, look_ref.name
                        ),
                    );
                }
            }
        }
    }
}

fn check_looks(config: &Config, issues: &mut Vec<Issue>) {
    for look in config.looks() {
        if config.colorspace(look.get_process_space()).is_none() {
            error(
                issues,
                format!(
                    "look '{}' uses unknown process space '{}'",
                    look.name(),
                    look.get_process_space()
                ),
            );
        }
        if look.get_transform().is_none() && look.get_inverse_transform().is_none() {
            warning(
                issues,
                format!("look '{}' defines no transform", look.name()),
            );
        }
    }
}

fn check_view_transforms(config: &Config, issues: &mut Vec<Issue>) {
    if let Some(name) = config.default_view_transform_name() {
        if config.view_transform(name).is_none() {
            error(
                issues,
                format!("default view transform '{name}' does not exist"),
            );
        }
    }
    for vt in config.view_transforms() {
        if vt.get_from_reference().is_none() && vt.get_to_reference().is_none() {
            warning(
                issues,
                format!("view transform '{}' defines no transform", vt.name()),
            );
        }
    }
}

impl Config {
    /// Validates the config, failing on the first error-severity issue.
    pub fn validate(&self) -> ChromaResult<()> {
        for issue in check(self) {
            if issue.severity == Severity::Error {
                return Err(ChromaError::Validation(issue.message));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::colorspace::ColorSpace;
    use crate::display::{Display, View};
    use crate::look::Look;

    fn valid_config() -> Config {
        let mut c = Config::new();
        c.add_colorspace(ColorSpace::new("linear")).unwrap();
        c.add_colorspace(ColorSpace::new("sRGB")).unwrap();
        c.roles_mut().define("reference", "linear");
        c.file_rules_mut().set_default_colorspace("linear");
        c
    }

    #[test]
    fn valid_config_passes() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn missing_reference_role_fails() {
        let mut c = valid_config();
        c.roles_mut().remove("reference");
        assert!(c.validate().is_err());
    }

    #[test]
    fn dangling_role_fails() {
        let mut c = valid_config();
        c.roles_mut().define("scene_linear", "nope");
        assert!(c.validate().is_err());
    }

    #[test]
    fn dangling_view_colorspace_fails() {
        let mut c = valid_config();
        c.add_display(Display::new("mon").view(View::new("Film", "nope")))
            .unwrap();
        assert!(c.validate().is_err());
    }

    #[test]
    fn unknown_view_look_is_warning_only() {
        let mut c = valid_config();
        c.add_display(Display::new("mon").view(View::new("Film", "sRGB").looks("mystery")))
            .unwrap();
        assert!(c.validate().is_ok());
        let issues = check(&c);
        assert!(issues.iter().any(|i| i.severity == Severity::Warning));
    }

    #[test]
    fn dangling_look_process_space_fails() {
        let mut c = valid_config();
        c.add_look(Look::new("grade").process_space("nope")).unwrap();
        assert!(c.validate().is_err());
    }

    #[test]
    fn file_rule_unknown_colorspace_fails() {
        let mut c = valid_config();
        c.file_rules_mut().set_default_colorspace("nope");
        assert!(c.validate().is_err());
    }
}
