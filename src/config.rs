//! Configuration loading for drillbit.
//!
//! Configuration follows a precedence chain:
//! 1. Environment variables (highest priority)
//! 2. Project config (`.drillbit/config.toml`)
//! 3. User config (`~/.drillbit/config.toml`)
//! 4. Defaults (lowest priority)
//!
//! All configuration is optional. The engine runs with the classic BKT
//! parameters and the built-in subject table when no config exists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::checker::CheckerConfig;
use crate::core::{BktParams, RecommenderConfig};
use crate::error::{DrillError, FailOpen, Result};
use crate::util::read_to_string_limited;

/// Name of the per-project and per-user configuration directory.
pub const CONFIG_DIR_NAME: &str = ".drillbit";

/// Subject practiced when nothing else is configured.
pub const DEFAULT_SUBJECT: &str = "高等数学";

/// Main configuration struct for drillbit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Knowledge tracing parameters.
    pub bkt: BktParams,
    /// Question selection thresholds.
    pub recommender: RecommenderConfig,
    /// Answer checking options.
    pub checker: CheckerConfig,
    /// Subject name to question bank file.
    ///
    /// Relative file names are resolved against `questions_dir`.
    pub subjects: BTreeMap<String, String>,
    /// Subject loaded when a session starts.
    pub default_subject: String,
    /// Directory holding the question bank files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bkt: BktParams::default(),
            recommender: RecommenderConfig::default(),
            checker: CheckerConfig::default(),
            subjects: default_subjects(),
            default_subject: DEFAULT_SUBJECT.to_string(),
            questions_dir: None,
        }
    }
}

fn default_subjects() -> BTreeMap<String, String> {
    [
        ("高等数学", "math1.json"),
        ("线性代数", "linalg.json"),
        ("概率论", "prob.json"),
    ]
    .into_iter()
    .map(|(name, file)| (name.to_string(), file.to_string()))
    .collect()
}

impl Config {
    /// Load configuration with full precedence chain.
    ///
    /// Precedence (highest to lowest):
    /// 1. Environment variables
    /// 2. Project config (`.drillbit/config.toml` in cwd or an ancestor)
    /// 3. User config (`~/.drillbit/config.toml`)
    /// 4. Defaults
    pub fn load() -> Self {
        match env::current_dir() {
            Ok(cwd) => Self::load_from_cwd(&cwd),
            Err(_) => {
                let mut config = Config::default();
                if let Some(user_config) = Self::load_user_config() {
                    config = config.merge(user_config);
                }
                config.apply_env_overrides();
                config
            }
        }
    }

    /// Load configuration with a specific working directory.
    pub fn load_from_cwd(cwd: &Path) -> Self {
        let mut config = Config::default();

        if let Some(user_config) = Self::load_user_config() {
            config = config.merge(user_config);
        }

        if let Some(project_config) = Self::load_project_config(cwd) {
            config = config.merge(project_config);
        }

        config.apply_env_overrides();

        config
    }

    /// Load config with fail-open behavior.
    ///
    /// A layered config that fails validation is replaced by defaults.
    pub fn load_fail_open() -> Self {
        Self::validated_or_default(Self::load())
    }

    fn validated_or_default(config: Config) -> Self {
        config
            .validate()
            .map(|()| config)
            .fail_open_default("validating config")
    }

    /// Load user config from `<drillbit_home>/config.toml`.
    fn load_user_config() -> Option<Config> {
        let home = drillbit_home()?;
        let config_path = home.join("config.toml");
        Self::load_layer(&config_path, &home)
    }

    /// Load project config from the nearest `.drillbit/config.toml`.
    fn load_project_config(cwd: &Path) -> Option<Config> {
        let root = find_project_root(cwd);
        let config_path = root.join(CONFIG_DIR_NAME).join("config.toml");
        Self::load_layer(&config_path, &root)
    }

    /// Load one config layer. Relative `questions_dir` values are anchored at `base`.
    fn load_layer(path: &Path, base: &Path) -> Option<Config> {
        if !path.exists() {
            return None;
        }
        match Self::load_from_file(path) {
            Ok(mut config) => {
                if let Some(dir) = config.questions_dir.take() {
                    config.questions_dir = Some(if dir.is_relative() {
                        base.join(dir)
                    } else {
                        dir
                    });
                }
                tracing::debug!("loaded config layer {}", path.display());
                Some(config)
            }
            Err(e) => {
                tracing::warn!("ignoring config {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Load config from a specific file path.
    pub fn load_from_file(path: &Path) -> Result<Config> {
        let content = read_to_string_limited(path)?;
        toml::from_str(&content).map_err(|e| DrillError::config(e.to_string()))
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_override("DRILLBIT_LEARN_RATE", &self.bkt.learn_rate, is_probability) {
            self.bkt.learn_rate = v;
        }
        if let Some(v) = env_override("DRILLBIT_SLIP_RATE", &self.bkt.slip_rate, is_probability) {
            self.bkt.slip_rate = v;
        }
        if let Some(v) = env_override("DRILLBIT_GUESS_RATE", &self.bkt.guess_rate, is_probability) {
            self.bkt.guess_rate = v;
        }
        if let Some(v) = env_override(
            "DRILLBIT_DEFAULT_MASTERY",
            &self.bkt.default_mastery,
            is_probability,
        ) {
            self.bkt.default_mastery = v;
        }

        if let Some(v) = env_override(
            "DRILLBIT_MASTERED_THRESHOLD",
            &self.recommender.mastered_threshold,
            is_probability,
        ) {
            self.recommender.mastered_threshold = v;
        }
        if let Ok(val) = env::var("DRILLBIT_SEED") {
            match val.parse::<u64>() {
                Ok(seed) => self.recommender.seed = Some(seed),
                Err(_) => tracing::warn!(
                    "Invalid DRILLBIT_SEED value '{}'. Expected an unsigned integer. Ignoring.",
                    val
                ),
            }
        }

        if let Some(v) = env_override(
            "DRILLBIT_NUMERIC_TOLERANCE",
            &self.checker.numeric_tolerance,
            |t: &f64| t.is_finite() && *t >= 0.0,
        ) {
            self.checker.numeric_tolerance = v;
        }
        if let Ok(val) = env::var("DRILLBIT_CASE_SENSITIVE") {
            self.checker.case_sensitive_strings = val == "true" || val == "1";
        }

        if let Ok(val) = env::var("DRILLBIT_SUBJECT") {
            if self.subjects.contains_key(&val) {
                self.default_subject = val;
            } else {
                tracing::warn!(
                    "Invalid DRILLBIT_SUBJECT value '{}'. Known subjects: {:?}. Using '{}'.",
                    val,
                    self.subjects.keys().collect::<Vec<_>>(),
                    self.default_subject
                );
            }
        }

        if let Ok(val) = env::var("DRILLBIT_QUESTIONS_DIR") {
            if val.is_empty() {
                tracing::warn!("DRILLBIT_QUESTIONS_DIR is empty, ignoring");
            } else {
                self.questions_dir = Some(PathBuf::from(val));
            }
        }
    }

    /// Merge another config into this one.
    ///
    /// The `other` config takes precedence field by field: every value of
    /// `other` that differs from the default replaces the value in `self`.
    /// Subject tables merge additively.
    ///
    /// # Limitation
    ///
    /// A layer cannot reset a value back to its default once a lower layer
    /// has changed it, since "unset" and "set to default" look the same.
    fn merge(mut self, other: Config) -> Self {
        let default_bkt = BktParams::default();
        if other.bkt.learn_rate != default_bkt.learn_rate {
            self.bkt.learn_rate = other.bkt.learn_rate;
        }
        if other.bkt.slip_rate != default_bkt.slip_rate {
            self.bkt.slip_rate = other.bkt.slip_rate;
        }
        if other.bkt.guess_rate != default_bkt.guess_rate {
            self.bkt.guess_rate = other.bkt.guess_rate;
        }
        if other.bkt.default_mastery != default_bkt.default_mastery {
            self.bkt.default_mastery = other.bkt.default_mastery;
        }

        let default_recommender = RecommenderConfig::default();
        if other.recommender.mastered_threshold != default_recommender.mastered_threshold {
            self.recommender.mastered_threshold = other.recommender.mastered_threshold;
        }
        if other.recommender.band_width != default_recommender.band_width {
            self.recommender.band_width = other.recommender.band_width;
        }
        if other.recommender.seed.is_some() {
            self.recommender.seed = other.recommender.seed;
        }

        let default_checker = CheckerConfig::default();
        if other.checker.numeric_tolerance != default_checker.numeric_tolerance {
            self.checker.numeric_tolerance = other.checker.numeric_tolerance;
        }
        if other.checker.max_formula_len != default_checker.max_formula_len {
            self.checker.max_formula_len = other.checker.max_formula_len;
        }
        if other.checker.case_sensitive_strings != default_checker.case_sensitive_strings {
            self.checker.case_sensitive_strings = other.checker.case_sensitive_strings;
        }

        for (name, file) in other.subjects {
            self.subjects.insert(name, file);
        }
        if other.default_subject != DEFAULT_SUBJECT {
            self.default_subject = other.default_subject;
        }
        if other.questions_dir.is_some() {
            self.questions_dir = other.questions_dir;
        }

        self
    }

    /// Check every value is usable.
    pub fn validate(&self) -> Result<()> {
        self.bkt.validate()?;

        if !is_probability(&self.recommender.mastered_threshold) {
            return Err(DrillError::config(format!(
                "recommender.mastered_threshold must be within [0, 1], got {}",
                self.recommender.mastered_threshold
            )));
        }
        if !(self.recommender.band_width.is_finite() && self.recommender.band_width >= 0.0) {
            return Err(DrillError::config(format!(
                "recommender.band_width must be non-negative, got {}",
                self.recommender.band_width
            )));
        }
        if !(self.checker.numeric_tolerance.is_finite() && self.checker.numeric_tolerance >= 0.0) {
            return Err(DrillError::config(format!(
                "checker.numeric_tolerance must be non-negative, got {}",
                self.checker.numeric_tolerance
            )));
        }
        if !self.subjects.contains_key(&self.default_subject) {
            return Err(DrillError::config(format!(
                "default_subject '{}' is not listed in [subjects]",
                self.default_subject
            )));
        }

        Ok(())
    }

    /// Resolve the question bank file of a subject.
    ///
    /// Returns `None` for subjects missing from the table.
    pub fn question_bank_path(&self, subject: &str) -> Option<PathBuf> {
        let file = PathBuf::from(self.subjects.get(subject)?);
        if file.is_absolute() {
            return Some(file);
        }
        Some(match &self.questions_dir {
            Some(dir) => dir.join(file),
            None => file,
        })
    }

    /// Configured subject names in sorted order.
    pub fn subject_names(&self) -> Vec<&str> {
        self.subjects.keys().map(String::as_str).collect()
    }
}

fn is_probability(value: &f64) -> bool {
    (0.0..=1.0).contains(value)
}

/// Parse an environment override, warning about and ignoring bad values.
fn env_override<T>(name: &str, current: &T, valid: impl Fn(&T) -> bool) -> Option<T>
where
    T: FromStr + Display,
{
    let val = env::var(name).ok()?;
    match val.parse::<T>() {
        Ok(parsed) if valid(&parsed) => Some(parsed),
        Ok(parsed) => {
            tracing::warn!(
                "Invalid {} value '{}'. Out of range. Using '{}'.",
                name,
                parsed,
                current
            );
            None
        }
        Err(_) => {
            tracing::warn!(
                "Invalid {} value '{}'. Expected a number. Using '{}'.",
                name,
                val,
                current
            );
            None
        }
    }
}

/// Get the drillbit home directory.
///
/// Checks `DRILLBIT_HOME` environment variable first, then falls back to
/// `~/.drillbit`.
///
/// # Validation
///
/// If `DRILLBIT_HOME` is set, it must be non-empty. Relative values are
/// canonicalized when they exist and used as-is otherwise.
pub fn drillbit_home() -> Option<PathBuf> {
    if let Ok(home) = env::var("DRILLBIT_HOME") {
        if home.is_empty() {
            tracing::warn!("DRILLBIT_HOME is empty, using default");
        } else {
            let path = PathBuf::from(&home);
            if path.is_absolute() {
                return Some(path);
            }
            if let Ok(canonical) = path.canonicalize() {
                return Some(canonical);
            }
            tracing::warn!("DRILLBIT_HOME is relative and doesn't exist, using as-is");
            return Some(path);
        }
    }

    if let Some(home) = dirs::home_dir() {
        return Some(home.join(CONFIG_DIR_NAME));
    }

    // Containers and minimal environments may run without HOME.
    let fallback_path = fallback_drillbit_home();
    tracing::warn!(
        "HOME not set, using fallback location: {}",
        fallback_path.display()
    );
    Some(fallback_path)
}

#[cfg(unix)]
fn fallback_drillbit_home() -> PathBuf {
    use std::os::unix::fs::MetadataExt;
    let uid = std::fs::metadata("/").map(|m| m.uid()).unwrap_or(0);
    PathBuf::from(format!("/tmp/drillbit-{}", uid))
}

#[cfg(not(unix))]
fn fallback_drillbit_home() -> PathBuf {
    std::env::temp_dir().join("drillbit")
}

/// Find the project root for a given working directory.
///
/// The nearest ancestor holding a `.drillbit/` directory wins; otherwise
/// `cwd` itself.
pub fn find_project_root(cwd: &Path) -> PathBuf {
    cwd.ancestors()
        .find(|ancestor| ancestor.join(CONFIG_DIR_NAME).is_dir())
        .unwrap_or(cwd)
        .to_path_buf()
}

/// Get the learner state directory.
///
/// Returns `<drillbit_home>/learners/`.
pub fn learners_dir() -> Option<PathBuf> {
    drillbit_home().map(|h| h.join("learners"))
}

/// Get the interaction log path.
///
/// Returns `<drillbit_home>/interactions.log`.
pub fn interactions_log_path() -> Option<PathBuf> {
    drillbit_home().map(|h| h.join("interactions.log"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "DRILLBIT_HOME",
        "DRILLBIT_LEARN_RATE",
        "DRILLBIT_SLIP_RATE",
        "DRILLBIT_GUESS_RATE",
        "DRILLBIT_DEFAULT_MASTERY",
        "DRILLBIT_MASTERED_THRESHOLD",
        "DRILLBIT_SEED",
        "DRILLBIT_NUMERIC_TOLERANCE",
        "DRILLBIT_CASE_SENSITIVE",
        "DRILLBIT_SUBJECT",
        "DRILLBIT_QUESTIONS_DIR",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            env::remove_var(var);
        }
    }

    /// Point the user layer at an empty temp home so the real one is never read.
    fn isolated_home() -> TempDir {
        clear_env();
        let home = TempDir::new().unwrap();
        env::set_var("DRILLBIT_HOME", home.path());
        home
    }

    fn write_project_config(dir: &Path, content: &str) {
        let config_dir = dir.join(CONFIG_DIR_NAME);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("config.toml"), content).unwrap();
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.bkt, BktParams::default());
        assert_eq!(config.recommender.mastered_threshold, 0.95);
        assert_eq!(config.checker.max_formula_len, 512);
        assert_eq!(config.default_subject, "高等数学");
        assert_eq!(config.subject_names(), vec!["概率论", "线性代数", "高等数学"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config: Config = toml::from_str(
            r#"
[bkt]
learn_rate = 0.25

[subjects]
"离散数学" = "discrete.json"
"#,
        )
        .unwrap();

        assert_eq!(config.bkt.learn_rate, 0.25);
        assert_eq!(config.bkt.slip_rate, 0.1);
        assert_eq!(config.subjects.get("离散数学").unwrap(), "discrete.json");
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = Config::default();
        let content = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&content).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_question_bank_path() {
        let mut config = Config::default();
        assert_eq!(
            config.question_bank_path("线性代数"),
            Some(PathBuf::from("linalg.json"))
        );
        assert_eq!(config.question_bank_path("拓扑学"), None);

        config.questions_dir = Some(PathBuf::from("/data/questions"));
        assert_eq!(
            config.question_bank_path("高等数学"),
            Some(PathBuf::from("/data/questions/math1.json"))
        );

        config
            .subjects
            .insert("自定义".to_string(), "/abs/custom.json".to_string());
        assert_eq!(
            config.question_bank_path("自定义"),
            Some(PathBuf::from("/abs/custom.json"))
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.bkt.slip_rate = 1.5;
        assert!(config.validate().unwrap_err().to_string().contains("slip_rate"));

        let mut config = Config::default();
        config.recommender.band_width = -0.1;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.default_subject = "拓扑学".to_string();
        assert!(config.validate().unwrap_err().to_string().contains("拓扑学"));
    }

    #[test]
    fn test_merge_field_by_field() {
        let mut user = Config::default();
        user.bkt.learn_rate = 0.4;
        user.checker.case_sensitive_strings = true;

        let mut project = Config::default();
        project.bkt.guess_rate = 0.25;
        project.recommender.seed = Some(7);

        let merged = Config::default().merge(user).merge(project);
        assert_eq!(merged.bkt.learn_rate, 0.4);
        assert_eq!(merged.bkt.guess_rate, 0.25);
        assert!(merged.checker.case_sensitive_strings);
        assert_eq!(merged.recommender.seed, Some(7));
    }

    #[test]
    #[serial]
    fn test_project_config_precedence() {
        let home = isolated_home();
        fs::write(
            home.path().join("config.toml"),
            "[bkt]\nlearn_rate = 0.4\nslip_rate = 0.15\n",
        )
        .unwrap();

        let dir = TempDir::new().unwrap();
        write_project_config(dir.path(), "[bkt]\nlearn_rate = 0.35\n");

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.bkt.learn_rate, 0.35);
        assert_eq!(config.bkt.slip_rate, 0.15);
        assert_eq!(config.bkt.guess_rate, 0.2);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_project_config_found_in_ancestor() {
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        write_project_config(dir.path(), "questions_dir = \"banks\"\n");
        let nested = dir.path().join("a").join("b");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(find_project_root(&nested), dir.path());
        let config = Config::load_from_cwd(&nested);
        assert_eq!(config.questions_dir, Some(dir.path().join("banks")));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_malformed_project_config_ignored() {
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        write_project_config(dir.path(), "[bkt\nlearn_rate = ");

        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config, Config::default());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_var_precedence() {
        let _home = isolated_home();
        let dir = TempDir::new().unwrap();
        write_project_config(dir.path(), "[bkt]\nlearn_rate = 0.35\n");

        env::set_var("DRILLBIT_LEARN_RATE", "0.5");
        let config = Config::load_from_cwd(dir.path());
        assert_eq!(config.bkt.learn_rate, 0.5);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_env_var_overrides() {
        clear_env();
        env::set_var("DRILLBIT_SLIP_RATE", "0.05");
        env::set_var("DRILLBIT_GUESS_RATE", "0.15");
        env::set_var("DRILLBIT_DEFAULT_MASTERY", "0.4");
        env::set_var("DRILLBIT_MASTERED_THRESHOLD", "0.9");
        env::set_var("DRILLBIT_SEED", "42");
        env::set_var("DRILLBIT_NUMERIC_TOLERANCE", "0.001");
        env::set_var("DRILLBIT_CASE_SENSITIVE", "1");
        env::set_var("DRILLBIT_SUBJECT", "线性代数");
        env::set_var("DRILLBIT_QUESTIONS_DIR", "/srv/questions");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config.bkt.slip_rate, 0.05);
        assert_eq!(config.bkt.guess_rate, 0.15);
        assert_eq!(config.bkt.default_mastery, 0.4);
        assert_eq!(config.recommender.mastered_threshold, 0.9);
        assert_eq!(config.recommender.seed, Some(42));
        assert_eq!(config.checker.numeric_tolerance, 0.001);
        assert!(config.checker.case_sensitive_strings);
        assert_eq!(config.default_subject, "线性代数");
        assert_eq!(config.questions_dir, Some(PathBuf::from("/srv/questions")));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_env_values_ignored() {
        clear_env();
        env::set_var("DRILLBIT_LEARN_RATE", "fast");
        env::set_var("DRILLBIT_SLIP_RATE", "1.5");
        env::set_var("DRILLBIT_SEED", "-3");
        env::set_var("DRILLBIT_SUBJECT", "拓扑学");
        env::set_var("DRILLBIT_QUESTIONS_DIR", "");

        let mut config = Config::default();
        config.apply_env_overrides();

        assert_eq!(config, Config::default());

        clear_env();
    }

    #[test]
    #[serial]
    fn test_drillbit_home_env() {
        clear_env();
        let dir = TempDir::new().unwrap();
        env::set_var("DRILLBIT_HOME", dir.path());

        assert_eq!(drillbit_home(), Some(dir.path().to_path_buf()));
        assert_eq!(learners_dir(), Some(dir.path().join("learners")));
        assert_eq!(
            interactions_log_path(),
            Some(dir.path().join("interactions.log"))
        );

        clear_env();
    }

    #[test]
    #[serial]
    fn test_drillbit_home_empty_falls_back() {
        clear_env();
        env::set_var("DRILLBIT_HOME", "");

        let home = drillbit_home().unwrap();
        assert_ne!(home, PathBuf::from(""));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_layered_config_falls_back_to_defaults() {
        let home = isolated_home();
        fs::write(home.path().join("config.toml"), "default_subject = \"拓扑学\"\n").unwrap();

        let dir = TempDir::new().unwrap();
        let loaded = Config::load_from_cwd(dir.path());
        assert_eq!(loaded.default_subject, "拓扑学");

        let config = Config::validated_or_default(loaded);
        assert_eq!(config, Config::default());

        clear_env();
    }
}
