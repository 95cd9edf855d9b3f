//! Tree Configuration
//!
//! Runtime settings for the tree engine, read from the environment by the
//! server binary and built directly in tests.
//!
//! # Environment Variables
//!
//! - `NODETREE_DB_PATH` - database file (default `~/.nodetree/database/nodetree.db`)
//! - `NODETREE_DELETE_POLICY` - `cascade` (default) or `reject`
//! - `NODETREE_MAX_RETRIES` - retries of a transaction hitting a locked database
//! - `NODETREE_MAX_TREE_DEPTH` - deepest level the nested tree read returns (default 256)

use crate::db::DEFAULT_BUSY_TIMEOUT_MS;
use crate::services::RetryConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

pub const DB_PATH_VAR: &str = "NODETREE_DB_PATH";
pub const DELETE_POLICY_VAR: &str = "NODETREE_DELETE_POLICY";
pub const MAX_RETRIES_VAR: &str = "NODETREE_MAX_RETRIES";
pub const MAX_TREE_DEPTH_VAR: &str = "NODETREE_MAX_TREE_DEPTH";

/// Default limit for [`TreeConfig::max_tree_depth`]
pub const DEFAULT_MAX_TREE_DEPTH: usize = 256;

/// What DeleteNode does with a node that still has children
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Remove the whole subtree, children first, in one transaction
    #[default]
    Cascade,
    /// Refuse with `TreeConflict::HasChildren`
    RejectIfHasChildren,
}

impl FromStr for DeletePolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cascade" => Ok(Self::Cascade),
            "reject" | "reject_if_has_children" => Ok(Self::RejectIfHasChildren),
            other => Err(ConfigError::invalid_value(DELETE_POLICY_VAR, other)),
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cascade => write!(f, "cascade"),
            Self::RejectIfHasChildren => write!(f, "reject"),
        }
    }
}

/// Configuration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to get home directory")]
    HomeDirUnavailable,

    #[error("Invalid value for {var}: '{value}'")]
    InvalidValue { var: String, value: String },
}

impl ConfigError {
    pub fn invalid_value(var: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidValue {
            var: var.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeConfig {
    pub database_path: PathBuf,
    pub delete_policy: DeletePolicy,
    pub retry: RetryConfig,
    pub busy_timeout_ms: u64,
    /// Edges between the root and the deepest node `get_tree` will nest
    pub max_tree_depth: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("nodetree.db"),
            delete_policy: DeletePolicy::default(),
            retry: RetryConfig::query(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            max_tree_depth: DEFAULT_MAX_TREE_DEPTH,
        }
    }
}

impl TreeConfig {
    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    pub fn with_delete_policy(mut self, policy: DeletePolicy) -> Self {
        self.delete_policy = policy;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_tree_depth(mut self, max_tree_depth: usize) -> Self {
        self.max_tree_depth = max_tree_depth;
        self
    }

    /// Build configuration from `NODETREE_*` environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`TreeConfig::from_env`] with an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_path = match lookup(DB_PATH_VAR) {
            Some(path) if !path.trim().is_empty() => {
                tracing::info!("Using database path from {}: {}", DB_PATH_VAR, path);
                PathBuf::from(path)
            }
            _ => default_database_path()?,
        };

        let delete_policy = lookup(DELETE_POLICY_VAR)
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();

        let mut retry = RetryConfig::query();
        if let Some(raw) = lookup(MAX_RETRIES_VAR) {
            retry.max_retries = raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_value(MAX_RETRIES_VAR, raw.clone()))?;
        }

        let max_tree_depth = match lookup(MAX_TREE_DEPTH_VAR) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_value(MAX_TREE_DEPTH_VAR, raw.clone()))?,
            None => DEFAULT_MAX_TREE_DEPTH,
        };

        Ok(Self {
            database_path,
            delete_policy,
            retry,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            max_tree_depth,
        })
    }
}

/// `~/.nodetree/database/nodetree.db`
pub fn default_database_path() -> Result<PathBuf, ConfigError> {
    let home_dir = dirs::home_dir().ok_or(ConfigError::HomeDirUnavailable)?;

    Ok(home_dir
        .join(".nodetree")
        .join("database")
        .join("nodetree.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_delete_policy_parsing() {
        assert_eq!("cascade".parse::<DeletePolicy>(), Ok(DeletePolicy::Cascade));
        assert_eq!(
            " Reject ".parse::<DeletePolicy>(),
            Ok(DeletePolicy::RejectIfHasChildren)
        );
        assert!("sometimes".parse::<DeletePolicy>().is_err());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = TreeConfig::from_lookup(lookup_from(&[
            (DB_PATH_VAR, "/tmp/tree.db"),
            (DELETE_POLICY_VAR, "reject"),
            (MAX_RETRIES_VAR, "7"),
            (MAX_TREE_DEPTH_VAR, "32"),
        ]))
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/tree.db"));
        assert_eq!(config.delete_policy, DeletePolicy::RejectIfHasChildren);
        assert_eq!(config.retry.max_retries, 7);
        assert_eq!(config.max_tree_depth, 32);
    }

    #[test]
    fn test_invalid_max_retries_rejected() {
        let err = TreeConfig::from_lookup(lookup_from(&[
            (DB_PATH_VAR, "/tmp/tree.db"),
            (MAX_RETRIES_VAR, "lots"),
        ]))
        .unwrap_err();

        assert_eq!(err, ConfigError::invalid_value(MAX_RETRIES_VAR, "lots"));
    }

    #[test]
    fn test_defaults() {
        let config = TreeConfig::default();
        assert_eq!(config.delete_policy, DeletePolicy::Cascade);
        assert_eq!(config.retry, RetryConfig::query());
        assert_eq!(config.busy_timeout_ms, DEFAULT_BUSY_TIMEOUT_MS);
        assert_eq!(config.max_tree_depth, DEFAULT_MAX_TREE_DEPTH);
    }
}
