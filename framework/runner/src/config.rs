//! Loading and validating `runmeter.toml`.
//!
//! ```toml
//! duration = "30s"
//! warmups = 5
//! max_concurrent_sessions = 10 # optional
//! parse_curl = false           # optional
//!
//! [scenarios.list]
//! script = "ls -la"
//!
//! [scenarios.api]
//! script = "curl http://localhost:8080/health"
//! parse_curl = true
//! duration = "1m"
//! ```
//!
//! Validation reports every problem it finds, not only the first one.

use std::fmt;
use std::path::{Path, PathBuf};

use runmeter_core::prelude::ScenarioDuration;
use toml::{Table, Value};

pub const CONFIG_FILE_NAME: &str = "runmeter.toml";
pub const DEFAULT_MAX_CONCURRENT_SESSIONS: usize = 10;

const SHARED_KEYS: &[&str] = &[
    "duration",
    "warmups",
    "max_concurrent_sessions",
    "parse_curl",
    "scenarios",
];
const SCENARIO_KEYS: &[&str] = &[
    "script",
    "duration",
    "warmups",
    "max_concurrent_sessions",
    "parse_curl",
];

/// One field-level validation problem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Dotted path of the field, e.g. `scenarios.api.script`.
    pub path: String,
    pub message: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Config file is not valid TOML: {0}")]
    Syntax(#[from] toml::de::Error),
    #[error("Invalid configuration:{}", format_issues(.0))]
    Invalid(Vec<ConfigIssue>),
}

fn format_issues(issues: &[ConfigIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("\n  - {issue}"))
        .collect()
}

/// Top level settings that every scenario inherits.
#[derive(Debug, Clone, PartialEq)]
pub struct SharedConfig {
    pub duration: ScenarioDuration,
    pub warmups: usize,
    pub max_concurrent_sessions: Option<usize>,
    pub parse_curl: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioConfig {
    pub script: String,
    pub duration: Option<ScenarioDuration>,
    pub warmups: Option<usize>,
    pub max_concurrent_sessions: Option<usize>,
    pub parse_curl: Option<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFile {
    pub defaults: SharedConfig,
    /// In file order.
    pub scenarios: Vec<(String, ScenarioConfig)>,
}

/// A scenario with every setting filled in.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedScenario {
    pub name: String,
    pub script: String,
    pub duration: ScenarioDuration,
    pub warmups: usize,
    pub max_concurrent_sessions: usize,
    pub parse_curl: bool,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let table = text.parse::<Table>()?;

        let mut validator = Validator::default();
        let config = validator.config_file(&table);

        match config {
            Some(config) if validator.issues.is_empty() => Ok(config),
            _ => Err(ConfigError::Invalid(validator.issues)),
        }
    }

    pub fn resolve(&self) -> Vec<ResolvedScenario> {
        let defaults = &self.defaults;
        self.scenarios
            .iter()
            .map(|(name, scenario)| ResolvedScenario {
                name: name.clone(),
                script: scenario.script.clone(),
                duration: scenario
                    .duration
                    .clone()
                    .unwrap_or_else(|| defaults.duration.clone()),
                warmups: scenario.warmups.unwrap_or(defaults.warmups),
                max_concurrent_sessions: scenario
                    .max_concurrent_sessions
                    .or(defaults.max_concurrent_sessions)
                    .unwrap_or(DEFAULT_MAX_CONCURRENT_SESSIONS),
                parse_curl: scenario
                    .parse_curl
                    .or(defaults.parse_curl)
                    .unwrap_or_default(),
            })
            .collect()
    }
}

/// Read and validate the config file, `runmeter.toml` in the working directory by default.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, ConfigError> {
    let path = path.unwrap_or(Path::new(CONFIG_FILE_NAME));
    log::debug!("Loading config from {}", path.display());

    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    ConfigFile::parse(&text)
}

#[derive(Default)]
struct Validator {
    issues: Vec<ConfigIssue>,
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

impl Validator {
    fn issue(&mut self, path: String, message: impl Into<String>) {
        self.issues.push(ConfigIssue {
            path,
            message: message.into(),
        });
    }

    fn expected(&mut self, path: String, expected: &str, received: &Value) {
        self.issue(
            path,
            format!("Expected {expected}, received {}", received.type_str()),
        );
    }

    fn warn_unknown_keys(&self, table: &Table, prefix: &str, known: &[&str]) {
        for key in table.keys().filter(|key| !known.contains(&key.as_str())) {
            log::warn!("Ignoring unknown config key `{}`", join_path(prefix, key));
        }
    }

    fn config_file(&mut self, table: &Table) -> Option<ConfigFile> {
        self.warn_unknown_keys(table, "", SHARED_KEYS);

        let duration = self.required(table, "", "duration", Self::duration);
        let warmups = self.required(table, "", "warmups", Self::warmups);
        let max_concurrent_sessions =
            self.optional(table, "", "max_concurrent_sessions", Self::sessions);
        let parse_curl = self.optional(table, "", "parse_curl", Self::boolean);
        let scenarios = self.required(table, "", "scenarios", Self::scenarios);

        Some(ConfigFile {
            defaults: SharedConfig {
                duration: duration?,
                warmups: warmups?,
                max_concurrent_sessions: max_concurrent_sessions?,
                parse_curl: parse_curl?,
            },
            scenarios: scenarios?,
        })
    }

    fn scenarios(&mut self, path: String, value: &Value) -> Option<Vec<(String, ScenarioConfig)>> {
        let Value::Table(table) = value else {
            self.expected(path, "table", value);
            return None;
        };
        if table.is_empty() {
            self.issue(path, "At least one scenario is required");
            return None;
        }

        let mut scenarios = Vec::with_capacity(table.len());
        let mut all_valid = true;
        for (name, value) in table {
            match self.scenario(join_path(&path, name), value) {
                Some(scenario) => scenarios.push((name.clone(), scenario)),
                None => all_valid = false,
            }
        }

        all_valid.then_some(scenarios)
    }

    fn scenario(&mut self, path: String, value: &Value) -> Option<ScenarioConfig> {
        let Value::Table(table) = value else {
            self.expected(path, "table", value);
            return None;
        };
        self.warn_unknown_keys(table, &path, SCENARIO_KEYS);

        let script = self.required(table, &path, "script", Self::string);
        let duration = self.optional(table, &path, "duration", Self::duration);
        let warmups = self.optional(table, &path, "warmups", Self::warmups);
        let max_concurrent_sessions =
            self.optional(table, &path, "max_concurrent_sessions", Self::sessions);
        let parse_curl = self.optional(table, &path, "parse_curl", Self::boolean);

        Some(ScenarioConfig {
            script: script?,
            duration: duration?,
            warmups: warmups?,
            max_concurrent_sessions: max_concurrent_sessions?,
            parse_curl: parse_curl?,
        })
    }

    /// `None` if the field is missing or invalid, both of which are recorded as issues.
    fn required<T>(
        &mut self,
        table: &Table,
        prefix: &str,
        key: &str,
        check: impl FnOnce(&mut Self, String, &Value) -> Option<T>,
    ) -> Option<T> {
        let path = join_path(prefix, key);
        match table.get(key) {
            Some(value) => check(self, path, value),
            None => {
                self.issue(path, "Required");
                None
            }
        }
    }

    /// `Some(None)` if the field is missing and `None` if it is invalid.
    fn optional<T>(
        &mut self,
        table: &Table,
        prefix: &str,
        key: &str,
        check: impl FnOnce(&mut Self, String, &Value) -> Option<T>,
    ) -> Option<Option<T>> {
        match table.get(key) {
            Some(value) => check(self, join_path(prefix, key), value).map(Some),
            None => Some(None),
        }
    }

    fn string(&mut self, path: String, value: &Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s.clone()),
            other => {
                self.expected(path, "string", other);
                None
            }
        }
    }

    fn boolean(&mut self, path: String, value: &Value) -> Option<bool> {
        match value {
            Value::Boolean(b) => Some(*b),
            other => {
                self.expected(path, "boolean", other);
                None
            }
        }
    }

    fn duration(&mut self, path: String, value: &Value) -> Option<ScenarioDuration> {
        let literal = self.string(path.clone(), value)?;
        match literal.parse::<ScenarioDuration>() {
            Ok(duration) => Some(duration),
            Err(e) => {
                self.issue(path, e.to_string());
                None
            }
        }
    }

    fn warmups(&mut self, path: String, value: &Value) -> Option<usize> {
        self.count(path, value, 0)
    }

    fn sessions(&mut self, path: String, value: &Value) -> Option<usize> {
        self.count(path, value, 1)
    }

    fn count(&mut self, path: String, value: &Value, minimum: i64) -> Option<usize> {
        let Value::Integer(n) = value else {
            self.expected(path, "integer", value);
            return None;
        };
        if *n < minimum {
            self.issue(
                path,
                format!("Number must be greater than or equal to {minimum}"),
            );
            return None;
        }

        match usize::try_from(*n) {
            Ok(n) => Some(n),
            Err(_) => {
                self.issue(path, "Number is too large");
                None
            }
        }
    }
}
