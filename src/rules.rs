//! Decides which classes are in scope for final-stripping.
//!
//! Rules are evaluated top-down and the first one that fires wins:
//!
//! 1. an exact `excludedClasses` match rejects the class;
//! 2. with subpackage matching, an included package that is a dot-segment
//!    prefix of the class's package accepts it, unless an excluded package at
//!    least as specific also covers that package;
//! 3. without subpackage matching, an exact `packages` match accepts it
//!    (`excludedPackages` is not consulted on this path);
//! 4. an exact `classes` match accepts it;
//! 5. nothing else does.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::config::FilterConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "rule", content = "value", rename_all = "snake_case")]
pub enum Decision {
    ExcludedClass,
    PackagePrefix(String),
    Package(String),
    IncludedClass,
    NoMatch,
}

impl Decision {
    pub fn is_included(&self) -> bool {
        matches!(
            self,
            Decision::PackagePrefix(_) | Decision::Package(_) | Decision::IncludedClass
        )
    }
}

#[derive(Debug, Clone, Default)]
pub struct FilterRules {
    classes: BTreeSet<String>,
    excluded_classes: BTreeSet<String>,
    packages: BTreeSet<String>,
    excluded_packages: BTreeSet<String>,
    include_subpackages: bool,
}

impl FilterRules {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            classes: config.classes.iter().cloned().collect(),
            excluded_classes: config.excluded_classes.iter().cloned().collect(),
            packages: config.packages.iter().cloned().collect(),
            excluded_packages: config.excluded_packages.iter().cloned().collect(),
            include_subpackages: config.include_subpackages,
        }
    }

    pub fn decide(&self, fqn: &str, package_name: &str) -> bool {
        self.evaluate(fqn, package_name).is_included()
    }

    pub fn evaluate(&self, fqn: &str, package_name: &str) -> Decision {
        if self.excluded_classes.contains(fqn) {
            return Decision::ExcludedClass;
        }

        if self.include_subpackages {
            if let Some(prefix) = self.matching_prefix(package_name) {
                return Decision::PackagePrefix(prefix.to_string());
            }
        } else if self.packages.contains(package_name) {
            return Decision::Package(package_name.to_string());
        }

        if self.classes.contains(fqn) {
            return Decision::IncludedClass;
        }

        Decision::NoMatch
    }

    /// First included package covering `package_name` that no excluded
    /// package of equal or greater depth overrides.
    fn matching_prefix(&self, package_name: &str) -> Option<&str> {
        self.packages
            .iter()
            .filter(|p| !self.excluded_packages.contains(*p))
            .filter(|p| is_package_prefix(p, package_name))
            .find(|p| !self.is_excluded_below(p, package_name))
            .map(String::as_str)
    }

    fn is_excluded_below(&self, included: &str, package_name: &str) -> bool {
        self.excluded_packages.iter().any(|excluded| {
            depth(excluded) >= depth(included) && is_package_prefix(excluded, package_name)
        })
    }
}

/// `prefix` covers `package_name` on dot-segment boundaries. The empty
/// prefix is the root and covers everything.
pub fn is_package_prefix(prefix: &str, package_name: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    match package_name.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('.'),
        None => false,
    }
}

fn depth(package_name: &str) -> usize {
    if package_name.is_empty() {
        0
    } else {
        package_name.split('.').count()
    }
}
