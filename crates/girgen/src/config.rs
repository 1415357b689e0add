//! Generator configuration and cross-run state
//!
//! Both are small JSON documents. A missing config or state file is not an
//! error: generation proceeds with the defaults.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GenError, GenResult};

/// Per-namespace generator configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Functions to skip, as `name` or `Container.name`
    pub black: Vec<String>,

    /// Callbacks without user data whose trampoline forwards to a
    /// hand-written `handle_<callback>` function
    pub manual_callbacks: Vec<String>,

    /// Types that get no `get_type` function
    pub no_get_type: Vec<String>,

    /// Namespaces referenced by this one, as `Name-Version`
    pub deps: Vec<String>,

    /// Containers whose methods must be found without the direct method
    /// query, which crashes some introspection libraries
    pub no_call_find: Vec<String>,
}

impl Config {
    /// Load a config file; a missing file yields the default config
    pub fn load(path: &Path) -> GenResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg = serde_json::from_str(&content)?;
                log::info!("loaded config {}", path.display());
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn is_black(&self, name: &str) -> bool {
        self.black.iter().any(|b| b == name)
    }

    pub fn is_manual_callback(&self, name: &str) -> bool {
        self.manual_callbacks.iter().any(|c| c == name)
    }

    pub fn skips_get_type(&self, name: &str) -> bool {
        self.no_get_type.iter().any(|t| t == name)
    }

    pub fn skips_call_find(&self, container: &str) -> bool {
        self.no_call_find.iter().any(|c| c == container)
    }

    /// The dependency entry naming namespace `ns`, e.g. `GLib-2.0` for `GLib`
    pub fn dep_for(&self, ns: &str) -> Option<&str> {
        self.deps
            .iter()
            .find(|dep| dep.strip_prefix(ns).is_some_and(|rest| rest.starts_with('-')))
            .map(String::as_str)
    }
}

/// Id counters carried from one generator run to the next.
///
/// Namespaces compiled into the same binary share one id space for invoker
/// and GType cache entries, so each run continues where the previous one
/// stopped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GenState {
    pub prev_namespace: String,
    pub func_next_id: u32,
    pub get_type_next_id: u32,
}

impl GenState {
    /// Load a state file; a missing file yields the initial state
    pub fn load(path: &Path) -> GenResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> GenResult<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check that the previous run generated namespace `expected`
    pub fn expect_after(&self, path: &Path, expected: &str) -> GenResult<()> {
        if self.prev_namespace != expected {
            return Err(GenError::StateMismatch {
                path: path.to_path_buf(),
                expected: expected.to_string(),
                found: self.prev_namespace.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_files_yield_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load(&dir.path().join("config.json")).unwrap();
        assert_eq!(cfg, Config::default());
        let state = GenState::load(&dir.path().join("state.json")).unwrap();
        assert_eq!(state.func_next_id, 0);
    }

    #[test]
    fn test_config_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{ "black": ["Widget.destroy"], "noGetType": ["Rect"], "deps": ["GLib-2.0"],
                "noCallFind": ["ObjectClass"] }"#,
        )
        .unwrap();
        let cfg = Config::load(&path).unwrap();
        assert!(cfg.is_black("Widget.destroy"));
        assert!(!cfg.is_black("destroy"));
        assert!(cfg.skips_get_type("Rect"));
        assert!(cfg.manual_callbacks.is_empty());
        assert!(cfg.skips_call_find("ObjectClass"));
        assert_eq!(cfg.dep_for("GLib"), Some("GLib-2.0"));
        assert_eq!(cfg.dep_for("GLi"), None);
    }

    #[test]
    fn test_malformed_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ black: ").unwrap();
        assert!(matches!(Config::load(&path), Err(GenError::Json(_))));
    }

    #[test]
    fn test_state_round_trip_and_order_check() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let state = GenState {
            prev_namespace: "GLib".to_string(),
            func_next_id: 120,
            get_type_next_id: 14,
        };
        state.save(&path).unwrap();

        let loaded = GenState::load(&path).unwrap();
        assert_eq!(loaded, state);
        assert!(loaded.expect_after(&path, "GLib").is_ok());
        assert!(matches!(
            loaded.expect_after(&path, "GObject"),
            Err(GenError::StateMismatch { .. })
        ));
    }
}
