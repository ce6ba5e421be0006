use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::cli::RunArgs;

pub const CONFIG_ENV: &str = "NO_MORE_FINALS_CONFIG";

/// Which classes get their final modifiers stripped.
///
/// Read from JSON with camelCase keys; every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct FilterConfig {
    pub classes: Vec<String>,
    pub excluded_classes: Vec<String>,
    pub packages: Vec<String>,
    pub excluded_packages: Vec<String>,
    pub include_subpackages: bool,
}

impl FilterConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Folds command-line rules into this config. Lists are extended and
    /// `include_subpackages` can only be switched on.
    pub fn merge_args(&mut self, args: &RunArgs) {
        self.classes.extend(args.classes.iter().cloned());
        self.excluded_classes.extend(args.excluded_classes.iter().cloned());
        self.packages.extend(args.packages.iter().cloned());
        self.excluded_packages.extend(args.excluded_packages.iter().cloned());
        self.include_subpackages |= args.include_subpackages;
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty() && self.packages.is_empty()
    }
}

/// `--config`, then `$NO_MORE_FINALS_CONFIG`, then none.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(p) = explicit {
        return Some(p.to_path_buf());
    }

    env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
}

pub fn resolve_filter_config(explicit: Option<&Path>, args: &RunArgs) -> Result<FilterConfig> {
    let mut config = match resolve_config_path(explicit) {
        Some(path) => FilterConfig::load(&path)?,
        None => FilterConfig::default(),
    };
    config.merge_args(args);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn run_args() -> RunArgs {
        RunArgs {
            input: PathBuf::from("in"),
            output: PathBuf::from("out"),
            classes: vec!["com.example.Widget".to_string()],
            excluded_classes: vec![],
            packages: vec!["com.extra".to_string()],
            excluded_packages: vec![],
            include_subpackages: true,
            parallel: false,
            format: crate::cli::OutputFormat::Json,
        }
    }

    #[test]
    fn missing_keys_default_to_empty() -> Result<()> {
        let config: FilterConfig = serde_json::from_str("{}")?;
        assert_eq!(config, FilterConfig::default());
        assert!(!config.include_subpackages);
        assert!(config.is_empty());
        Ok(())
    }

    #[test]
    fn parses_camel_case_keys() -> Result<()> {
        let config: FilterConfig = serde_json::from_str(
            r#"{
                "classes": ["com.example.Widget"],
                "excludedClasses": ["com.example.Gadget"],
                "packages": ["com.example"],
                "excludedPackages": ["com.example.internal"],
                "includeSubpackages": true
            }"#,
        )?;
        assert_eq!(config.classes, vec!["com.example.Widget"]);
        assert_eq!(config.excluded_classes, vec!["com.example.Gadget"]);
        assert_eq!(config.packages, vec!["com.example"]);
        assert_eq!(config.excluded_packages, vec!["com.example.internal"]);
        assert!(config.include_subpackages);
        Ok(())
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = serde_json::from_str::<FilterConfig>(r#"{"package": ["com.example"]}"#);
        assert!(err.is_err());
    }

    #[test]
    fn load_then_merge_args() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"packages": ["com.example"], "excludedPackages": ["com.example.internal"]}}"#
        )?;

        let config = resolve_filter_config(Some(file.path()), &run_args())?;
        assert_eq!(config.packages, vec!["com.example", "com.extra"]);
        assert_eq!(config.classes, vec!["com.example.Widget"]);
        assert_eq!(config.excluded_packages, vec!["com.example.internal"]);
        assert!(config.include_subpackages);
        Ok(())
    }

    #[test]
    fn load_reports_path_on_error() {
        let err = FilterConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }

    #[test]
    fn explicit_path_wins() {
        let p = Path::new("/tmp/explicit.json");
        assert_eq!(resolve_config_path(Some(p)), Some(p.to_path_buf()));
    }
}
