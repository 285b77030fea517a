//! Format constants and node size limits.
//!
//! The page size is part of the on-disk format and fixed at compile time.
//! The key and value size limits default to the compile-time maximums and
//! can be lowered (or traded against each other) at runtime through
//! environment variables.
//!
//! # Environment Variables
//!
//! - `BNODE_MAX_KEY_SIZE`: largest key accepted by `append_kv` (default: `1000`)
//! - `BNODE_MAX_VAL_SIZE`: largest value accepted by `append_kv` (default: `3000`)
//!
//! # Invariants
//!
//! - A node holding one entry with a key and value of the maximum sizes
//!   always fits into a single page. This is asserted at compile time for the
//!   constants and checked by [`NodeConfig::validate`] for runtime limits.

use crate::node::layout;

/// Page size in bytes (4KB).
pub const PAGE_SIZE: usize = 4096;

/// Default maximum key size in bytes.
pub const MAX_KEY_SIZE: usize = 1000;

/// Default maximum value size in bytes.
pub const MAX_VAL_SIZE: usize = 3000;

const _: () = {
    assert!(
        PAGE_SIZE <= u16::MAX as usize,
        "page positions must fit into 16-bit offsets"
    );
    assert!(
        layout::node_size(1, layout::entry_size(MAX_KEY_SIZE, MAX_VAL_SIZE)) <= PAGE_SIZE,
        "a single entry of maximum size must fit into one page"
    );
};

/// Size limits applied when appending entries to a node.
///
/// # Post-conditions
///
/// A config returned by [`NodeConfig::validate`], [`NodeConfig::from_env`] or
/// [`NodeConfig::default`] always admits at least one entry of maximum size
/// per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    /// Largest key, in bytes, that `append_kv` accepts.
    pub max_key_size: usize,
    /// Largest value, in bytes, that `append_kv` accepts.
    pub max_val_size: usize,
}

/// Error returned when loading or validating a configuration fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    InvalidValue { name: String, message: String },
    /// A single entry of maximum size would not fit into one page.
    CapacityExceeded { required: usize, capacity: usize },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { name, message } => {
                write!(f, "invalid value for {name}: {message}")
            }
            Self::CapacityExceeded { required, capacity } => {
                write!(
                    f,
                    "node with one maximum-size entry needs {required} bytes but a page holds {capacity}"
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl NodeConfig {
    /// Environment variable holding the maximum key size.
    pub const MAX_KEY_SIZE_VAR: &'static str = "BNODE_MAX_KEY_SIZE";
    /// Environment variable holding the maximum value size.
    pub const MAX_VAL_SIZE_VAR: &'static str = "BNODE_MAX_VAL_SIZE";

    /// The compile-time limits.
    pub const DEFAULT: Self = Self {
        max_key_size: MAX_KEY_SIZE,
        max_val_size: MAX_VAL_SIZE,
    };

    /// Load limits from environment variables, falling back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is set but not a number, or if the
    /// resulting limits fail [`NodeConfig::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load limits through an arbitrary variable lookup.
    ///
    /// `from_env` is this with `std::env::var`; tests pass a closure instead
    /// of mutating the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let max_key_size = Self::load_size(&lookup, Self::MAX_KEY_SIZE_VAR, MAX_KEY_SIZE)?;
        let max_val_size = Self::load_size(&lookup, Self::MAX_VAL_SIZE_VAR, MAX_VAL_SIZE)?;

        let config = Self {
            max_key_size,
            max_val_size,
        }
        .validate()?;

        tracing::debug!(
            max_key_size = config.max_key_size,
            max_val_size = config.max_val_size,
            "loaded node config"
        );
        Ok(config)
    }

    /// Check that one entry of maximum size fits into a page.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::CapacityExceeded`] if it does not.
    pub const fn validate(self) -> Result<Self, ConfigError> {
        let required = self.max_node_size();
        if required > PAGE_SIZE {
            return Err(ConfigError::CapacityExceeded {
                required,
                capacity: PAGE_SIZE,
            });
        }
        Ok(self)
    }

    /// Encoded size of a node holding a single entry of maximum size.
    #[must_use]
    pub const fn max_node_size(self) -> usize {
        layout::node_size(1, layout::entry_size(self.max_key_size, self.max_val_size))
    }

    /// Parse one size variable.
    ///
    /// Returns the default if not set.
    fn load_size(
        lookup: &impl Fn(&str) -> Option<String>,
        name: &str,
        default: usize,
    ) -> Result<usize, ConfigError> {
        match lookup(name) {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .map_err(|_| ConfigError::InvalidValue {
                    name: name.to_string(),
                    message: format!("'{value}' is not a valid size in bytes"),
                }),
            None => Ok(default),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
