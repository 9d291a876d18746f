use std::{
    collections::HashMap,
    env,
    fs,
    io::{BufRead, BufReader},
    path::PathBuf,
    time::Duration,
};

use directories::BaseDirs;
use tracing::warn;

pub const SCRIPT_TIMEOUT_KEY: &str = "OCTAVE_SCRIPT_TIMEOUT";
pub const CONCURRENCY_LIMIT_KEY: &str = "OCTAVE_CONCURRENCY_LIMIT";
pub const SCRIPT_LENGTH_LIMIT_KEY: &str = "OCTAVE_SCRIPT_LENGTH_LIMIT";
pub const BINARY_KEY: &str = "OCTAVE_BINARY";
pub const GRAPHICS_TOOLKIT_KEY: &str = "OCTAVE_GRAPHICS_TOOLKIT";
pub const PLOT_DIR_KEY: &str = "OCTAVE_PLOT_DIR";
pub const LOG_LEVEL_KEY: &str = "LOG_LEVEL";

pub const DEFAULT_SCRIPT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CONCURRENCY_LIMIT: usize = 10;
pub const DEFAULT_SCRIPT_LENGTH_LIMIT: usize = 10_000;

#[derive(Debug, Clone)]
pub struct Config {
    inner: HashMap<String, String>,
}

impl Config {
    pub fn load() -> Self {
        let mut map = default_map();
        let config_path = default_config_path();

        // Read .runnerrc if exists
        if config_path.exists() {
            if let Ok(file) = fs::File::open(&config_path) {
                let reader = BufReader::new(file);
                for line in reader.lines().map_while(Result::ok) {
                    if let Some((k, v)) = parse_line(&line) {
                        map.insert(k, v);
                    }
                }
            }
        }

        // Overlay environment variables (take precedence)
        for (k, v) in env::vars() {
            if is_config_key(&k) {
                map.insert(k, v);
            }
        }

        Self { inner: map }
    }

    /// Defaults overlaid with explicit pairs, without touching the rc file.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = default_map();
        for (k, v) in pairs {
            map.insert(k.into(), v.into());
        }
        Self { inner: map }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        // ENV first
        if let Ok(v) = env::var(key) {
            return Some(v);
        }
        self.inner.get(key).cloned()
    }

    pub fn get_path(&self, key: &str) -> Option<PathBuf> {
        self.get(key)
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Positive integer lookup; anything else logs a warning and yields `default`.
    pub fn get_positive_usize(&self, key: &str, default: usize) -> usize {
        match self.get(key) {
            None => default,
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!(key, value = %raw, default, "invalid config value, using default");
                    default
                }
            },
        }
    }

    pub fn script_timeout(&self) -> Duration {
        let secs = self.get_positive_usize(SCRIPT_TIMEOUT_KEY, DEFAULT_SCRIPT_TIMEOUT_SECS as usize);
        Duration::from_secs(secs as u64)
    }

    pub fn concurrency_limit(&self) -> usize {
        self.get_positive_usize(CONCURRENCY_LIMIT_KEY, DEFAULT_CONCURRENCY_LIMIT)
    }

    pub fn script_length_limit(&self) -> usize {
        self.get_positive_usize(SCRIPT_LENGTH_LIMIT_KEY, DEFAULT_SCRIPT_LENGTH_LIMIT)
    }

    pub fn binary(&self) -> String {
        self.get(BINARY_KEY)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| "octave".into())
    }

    pub fn graphics_toolkit(&self) -> String {
        let toolkit = self.get(GRAPHICS_TOOLKIT_KEY).unwrap_or_default();
        if !toolkit.is_empty() && toolkit.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return toolkit;
        }
        if !toolkit.is_empty() {
            warn!(key = GRAPHICS_TOOLKIT_KEY, value = %toolkit, "invalid graphics toolkit, using qt");
        }
        "qt".into()
    }

    pub fn plot_dir(&self) -> Option<PathBuf> {
        self.get_path(PLOT_DIR_KEY)
    }
}

fn parse_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }
    line.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
}

fn is_config_key(k: &str) -> bool {
    const KEYS: &[&str] = &[
        SCRIPT_TIMEOUT_KEY,
        CONCURRENCY_LIMIT_KEY,
        SCRIPT_LENGTH_LIMIT_KEY,
        BINARY_KEY,
        GRAPHICS_TOOLKIT_KEY,
        PLOT_DIR_KEY,
        LOG_LEVEL_KEY,
    ];

    KEYS.contains(&k)
}

fn default_config_path() -> PathBuf {
    let base = BaseDirs::new()
        .map(|b| b.config_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("~/.config"));
    base.join("octave_runner").join(".runnerrc")
}

fn default_map() -> HashMap<String, String> {
    let mut m = HashMap::new();

    // Numbers
    m.insert(SCRIPT_TIMEOUT_KEY.into(), DEFAULT_SCRIPT_TIMEOUT_SECS.to_string());
    m.insert(CONCURRENCY_LIMIT_KEY.into(), DEFAULT_CONCURRENCY_LIMIT.to_string());
    m.insert(SCRIPT_LENGTH_LIMIT_KEY.into(), DEFAULT_SCRIPT_LENGTH_LIMIT.to_string());

    // Strings
    m.insert(BINARY_KEY.into(), "octave".into());
    m.insert(GRAPHICS_TOOLKIT_KEY.into(), "qt".into());
    m.insert(LOG_LEVEL_KEY.into(), "info".into());

    m
}

#[cfg(test)]
mod tests {
    use super::*;

    // Keys below are never set in the test environment, so env lookups fall through.
    const UNSET_KEY: &str = "OCTAVE_RUNNER_TEST_ONLY_KEY";

    #[test]
    fn defaults_apply_without_overrides() {
        let cfg = Config::from_pairs(Vec::<(String, String)>::new());
        assert_eq!(cfg.get_positive_usize(UNSET_KEY, 7), 7);
        assert!(!cfg.binary().is_empty());
        assert!(cfg.script_length_limit() > 0);
    }

    #[test]
    fn invalid_numbers_fall_back_to_default() {
        let cfg = Config::from_pairs([(UNSET_KEY, "ten")]);
        assert_eq!(cfg.get_positive_usize(UNSET_KEY, 10), 10);

        let cfg = Config::from_pairs([(UNSET_KEY, "0")]);
        assert_eq!(cfg.get_positive_usize(UNSET_KEY, 10), 10);

        let cfg = Config::from_pairs([(UNSET_KEY, "-3")]);
        assert_eq!(cfg.get_positive_usize(UNSET_KEY, 10), 10);
    }

    #[test]
    fn valid_numbers_are_used() {
        let cfg = Config::from_pairs([(UNSET_KEY, " 42 ")]);
        assert_eq!(cfg.get_positive_usize(UNSET_KEY, 10), 42);
    }

    #[test]
    fn rc_lines_skip_comments_and_blanks() {
        assert_eq!(parse_line("# comment"), None);
        assert_eq!(parse_line("   "), None);
        assert_eq!(
            parse_line(" OCTAVE_CONCURRENCY_LIMIT = 4 "),
            Some(("OCTAVE_CONCURRENCY_LIMIT".into(), "4".into()))
        );
        assert_eq!(parse_line("no separator"), None);
    }

    #[test]
    fn only_known_keys_are_taken_from_env() {
        assert!(is_config_key(SCRIPT_TIMEOUT_KEY));
        assert!(is_config_key("LOG_LEVEL"));
        assert!(!is_config_key("HOME"));
    }
}
