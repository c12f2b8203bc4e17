//! Mapper configuration and limits.
//!
//! `MapperConfig` is plain data with serde defaults, so it can be built in
//! code or loaded from JSON:
//!
//! ```
//! use remap_core::MapperConfig;
//! let config = MapperConfig::from_json(r#"{ "map_nulls": true }"#).unwrap();
//! assert!(config.map_nulls);
//! assert!(!config.truncate_numbers);
//! ```

use crate::error::{MappingError, Result};
use serde::{Deserialize, Serialize};

/// Maximum nesting of object mappings within one invocation.
pub const MAX_MAPPING_DEPTH: u32 = 1_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Write explicit nulls when a source property is null. Overridden per
    /// class map and per field.
    pub map_nulls: bool,

    /// Let numeric narrowing silently wrap instead of failing.
    pub truncate_numbers: bool,

    /// Register the numeric, enum and string converters on construction.
    pub use_builtin_converters: bool,

    /// Generate a same-name class map when a pair has none registered.
    pub auto_generate: bool,

    /// Nesting limit for object mappings in one invocation.
    pub max_depth: u32,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            map_nulls: false,
            truncate_numbers: false,
            use_builtin_converters: true,
            auto_generate: true,
            max_depth: MAX_MAPPING_DEPTH,
        }
    }
}

impl MapperConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(text).map_err(|e| MappingError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(MappingError::Config("max_depth must be positive".into()));
        }
        Ok(())
    }

    pub fn with_map_nulls(mut self, map_nulls: bool) -> Self {
        self.map_nulls = map_nulls;
        self
    }

    pub fn with_truncate_numbers(mut self, truncate: bool) -> Self {
        self.truncate_numbers = truncate;
        self
    }

    pub fn with_builtin_converters(mut self, enabled: bool) -> Self {
        self.use_builtin_converters = enabled;
        self
    }

    pub fn with_auto_generate(mut self, enabled: bool) -> Self {
        self.auto_generate = enabled;
        self
    }

    pub fn with_max_depth(mut self, max_depth: u32) -> Self {
        self.max_depth = max_depth;
        self
    }
}
