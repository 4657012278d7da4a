//! # Configuration
//!
//! A minimal key/value configuration store. Values are strings; typed
//! accessors live on the immutable [`ConfigSnapshot`] that components take
//! at construction time.
//!
//! ## Setting and reading values
//! ```rust
//! use mart_core::MartConfig;
//! let mut config = MartConfig::new();
//!
//! config.set("catalog.max_avatars", "3");
//!
//! let snapshot = config.snapshot();
//! assert_eq!(snapshot.get_usize("catalog.max_avatars"), Some(3));
//! ```
//!
//! ## Environment overrides
//! [`MartConfig::load_env`] maps prefixed environment variables onto
//! dotted keys, so `MART__HTTP__PORT=8080` becomes `http.port = "8080"`.

use std::collections::HashMap;

#[derive(Debug, Default, Clone)]
pub struct MartConfig {
    values: HashMap<String, String>,
}

impl MartConfig {
    /// Create an empty config store.
    pub fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// Set a configuration key to a string value.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.insert(key.into(), value.into());
    }

    /// Set a key only if it is not present yet.
    pub fn set_default<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Get a configuration value by key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(|s| s.as_str())
    }

    /// Check whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Apply every environment variable starting with `prefix`.
    ///
    /// `MART__UPLOAD__MAX_FILE_BYTES` → `upload.max_file_bytes`
    pub fn load_env(&mut self, prefix: &str) -> usize {
        self.load_vars(prefix, std::env::vars())
    }

    /// Same as [`load_env`](Self::load_env) over an explicit variable list.
    pub fn load_vars<I>(&mut self, prefix: &str, vars: I) -> usize
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut applied = 0;
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix(prefix) {
                let normalized = stripped.to_lowercase().replace("__", ".");
                if normalized.is_empty() {
                    continue;
                }
                self.set(normalized, value);
                applied += 1;
            }
        }
        applied
    }

    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot::new(self.values.clone())
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConfigSnapshot {
    map: HashMap<String, String>,
}

impl ConfigSnapshot {
    pub(crate) fn new(map: HashMap<String, String>) -> Self {
        Self { map }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(|s| s.as_str())
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    pub fn get_usize(&self, key: &str) -> Option<usize> {
        self.get(key).and_then(|v| v.trim().parse::<usize>().ok())
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(|v| v.trim().parse::<u64>().ok())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(|v| v.trim().parse::<bool>().ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_style_keys_become_dotted_lowercase() {
        let mut config = MartConfig::new();
        let applied = config.load_vars(
            "MART__",
            vec![
                ("MART__HTTP__PORT".to_string(), "8080".to_string()),
                ("MART__CLEANUP__MAX_ATTEMPTS".to_string(), "5".to_string()),
                ("HOME".to_string(), "/root".to_string()),
            ],
        );

        assert_eq!(applied, 2);
        let snapshot = config.snapshot();
        assert_eq!(snapshot.get("http.port"), Some("8080"));
        assert_eq!(snapshot.get_usize("cleanup.max_attempts"), Some(5));
        assert!(!config.has("home"));
    }

    #[test]
    fn set_default_keeps_existing_values() {
        let mut config = MartConfig::new();
        config.set("media.backend", "s3");
        config.set_default("media.backend", "memory");
        config.set_default("http.host", "127.0.0.1");

        assert_eq!(config.get("media.backend"), Some("s3"));
        assert_eq!(config.get("http.host"), Some("127.0.0.1"));
    }

    #[test]
    fn typed_getters_reject_garbage() {
        let mut config = MartConfig::new();
        config.set("upload.max_file_bytes", "lots");
        config.set("store.sync", "true");
        let snapshot = config.snapshot();

        assert_eq!(snapshot.get_u64("upload.max_file_bytes"), None);
        assert_eq!(snapshot.get_bool("store.sync"), Some(true));
    }
}
