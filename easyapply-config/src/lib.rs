//! Loader for `easyapply.yaml` with environment overlays.
//!
//! Sources are merged in order: YAML file(s) or inline YAML, then
//! `EASYAPPLY__`-prefixed environment variables (`__` separates path
//! segments, e.g. `EASYAPPLY__ENGINE__MAX_PAGES_PER_JOB=6`). After merging,
//! every string value goes through `${VAR}` expansion so secrets and personal
//! details can live in the environment instead of the file.
//!
//! Environment values are taken as text. Numeric and boolean settings parse
//! them on deserialization; text fields such as postal codes keep them
//! verbatim. In YAML, quote digit-only text so leading zeros survive.
use config::{Config, ConfigError, Environment, File};
use easyapply_common::{ApplyError, BrowserSettings, EngineSettings, LoggingSettings, Profile};
use serde::Deserialize;
use serde_json::Value;
use std::path::{Path, PathBuf};

pub mod validate;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

/// Top-level configuration for a run.
#[derive(Debug, Deserialize)]
pub struct ApplyConfig {
    pub version: Option<String>,
    pub profile: Profile,
    #[serde(default)]
    pub engine: EngineSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl ApplyConfig {
    /// Validate engine bounds and the profile, stripping unsafe characters
    /// from free-text answers. Warnings are logged, hard errors returned.
    pub fn validated(mut self) -> Result<Self, ApplyError> {
        validate::validate_engine(&self.engine)?;
        validate::validate_profile(&mut self.profile)?;
        Ok(self)
    }
}

/// Per-user fallback location: `<config dir>/easyapply/easyapply.yaml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("easyapply").join("easyapply.yaml"))
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hiding the `config` crate wiring (YAML + env overrides).
pub struct ApplyConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
    env_prefix: &'static str,
}

impl Default for ApplyConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ApplyConfigLoader {
    /// Start empty; environment overrides are applied last in [`load`](Self::load).
    ///
    /// ```
    /// use easyapply_config::ApplyConfigLoader;
    ///
    /// let config = ApplyConfigLoader::new()
    ///     .with_yaml_str("version: '1'\nprofile:\n  contact:\n    phone: '555-0100'\n")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.version.as_deref(), Some("1"));
    /// assert_eq!(config.profile.contact.phone, "555-0100");
    /// assert_eq!(config.engine.max_pages_per_job, 10);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env_prefix: "EASYAPPLY",
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Attach a file that may be absent.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use easyapply_config::ApplyConfigLoader;
    ///
    /// let cfg = ApplyConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// profile:
    ///   contact:
    ///     phone: "555-0100"
    ///   experience:
    ///     baseline: 1
    ///     technologies:
    ///       python: 5
    /// engine:
    ///   max_pages_per_job: 6
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.engine.max_pages_per_job, 6);
    /// assert_eq!(cfg.profile.experience.technologies["python"], 5);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into typed config.
    ///
    /// ```
    /// use easyapply_config::ApplyConfigLoader;
    ///
    /// unsafe { std::env::set_var("DOCTEST_PHONE", "555-0199"); }
    ///
    /// let config = ApplyConfigLoader::new()
    ///     .with_yaml_str(r#"
    /// profile:
    ///   contact:
    ///     phone: "${DOCTEST_PHONE}"
    /// "#)
    ///     .load()
    ///     .expect("valid configuration");
    ///
    /// assert_eq!(config.profile.contact.phone, "555-0199");
    ///
    /// unsafe { std::env::remove_var("DOCTEST_PHONE"); }
    /// ```
    pub fn load(self) -> Result<ApplyConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix(self.env_prefix).separator("__"),
            )
            .build()?;

        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        let typed: ApplyConfig =
            serde_json::from_value(v).map_err(|e| config::ConfigError::Message(e.to_string()))?;

        Ok(typed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("EA_FOO", Some("bar"), || {
            let mut v = json!("prefix-${EA_FOO}-suffix");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("prefix-bar-suffix"));
        });
    }

    #[test]
    fn expands_nested_profile_values() {
        temp_env::with_vars(
            [("EA_CITY", Some("Winston")), ("EA_STATE", Some("NC"))],
            || {
                let mut v = json!({
                    "contact": { "city": "$EA_CITY", "state": "${EA_STATE}" },
                    "experience": { "technologies": { "python": 5 } },
                    "notes": ["${EA_CITY}-${EA_STATE}", true, null]
                });
                expand_env_in_value(&mut v);
                assert_eq!(v["contact"]["city"], json!("Winston"));
                assert_eq!(v["contact"]["state"], json!("NC"));
                assert_eq!(v["experience"]["technologies"]["python"], json!(5));
                assert_eq!(v["notes"], json!(["Winston-NC", true, null]));
            },
        );
    }

    #[test]
    fn expands_recursively_and_stops_on_cycles() {
        temp_env::with_vars(
            [
                ("EA_BAZ", Some("qux")),
                ("EA_BAR", Some("mid-${EA_BAZ}")),
                ("EA_A", Some("${EA_B}")),
                ("EA_B", Some("${EA_A}")),
            ],
            || {
                let mut chained = json!("X=${EA_BAR}");
                expand_env_in_value(&mut chained);
                assert_eq!(chained, json!("X=mid-qux"));

                let mut cyclic = json!("x=${EA_A}-y");
                expand_env_in_value(&mut cyclic);
                let s = cyclic.as_str().unwrap();
                assert!(s.starts_with("x=") && s.ends_with("-y"));
                assert!(s.contains("${"));
            },
        );
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("hi-${EA_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("hi-${EA_DOES_NOT_EXIST}"));
    }

    #[test]
    fn missing_profile_is_a_config_error() {
        let err = ApplyConfigLoader::new()
            .with_yaml_str("version: '1'\n")
            .load()
            .unwrap_err();
        assert!(err.to_string().contains("profile"));
    }
}
