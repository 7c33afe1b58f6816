//! Core Configuration Module
//!
//! Sizing for the segment pool, buffer room factor and binder registry.
//! Loaded from TOML; every section and key is optional and falls back to
//! the constants in [`defaults`](crate::defaults).

use crate::defaults;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Complete core configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
#[serde(default)]
pub struct CoreConfig {
    pub pool: PoolConfig,
    pub buffer: BufferConfig,
    pub binder: BinderConfig,
}

/// Segment pool sizing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct PoolConfig {
    /// Segments are `2^segment_exponent` bytes
    pub segment_exponent: u8,
    pub segments_per_chunk: usize,
    pub max_chunks: usize,
}

/// Buffer room factor bounds
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BufferConfig {
    pub room_level_min: u8,
    pub room_level_max: u8,
    pub initial_room_level: u8,
}

/// Binder registry sizing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct BinderConfig {
    pub initial_type_capacity: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            segment_exponent: defaults::SEGMENT_EXPONENT,
            segments_per_chunk: defaults::SEGMENTS_PER_CHUNK,
            max_chunks: defaults::MAX_CHUNKS,
        }
    }
}

impl PoolConfig {
    /// Segment size in bytes
    pub fn segment_size(&self) -> usize {
        1usize << self.segment_exponent
    }

    pub fn validate(&self) -> Result<()> {
        if !(defaults::MIN_SEGMENT_EXPONENT..=defaults::MAX_SEGMENT_EXPONENT)
            .contains(&self.segment_exponent)
        {
            bail!(
                "pool.segment_exponent {} outside [{}, {}]",
                self.segment_exponent,
                defaults::MIN_SEGMENT_EXPONENT,
                defaults::MAX_SEGMENT_EXPONENT
            );
        }
        if self.segments_per_chunk == 0 {
            bail!("pool.segments_per_chunk must be non-zero");
        }
        if self.max_chunks == 0 {
            bail!("pool.max_chunks must be non-zero");
        }
        Ok(())
    }
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            room_level_min: defaults::room::MIN_LEVEL,
            room_level_max: defaults::room::MAX_LEVEL,
            initial_room_level: defaults::room::INITIAL_LEVEL,
        }
    }
}

impl BufferConfig {
    pub fn validate(&self) -> Result<()> {
        if self.room_level_max > defaults::room::LEVEL_CEILING {
            bail!(
                "buffer.room_level_max {} exceeds {}",
                self.room_level_max,
                defaults::room::LEVEL_CEILING
            );
        }
        if self.room_level_min > self.initial_room_level
            || self.initial_room_level > self.room_level_max
        {
            bail!(
                "buffer room levels must satisfy min <= initial <= max (got {} <= {} <= {})",
                self.room_level_min,
                self.initial_room_level,
                self.room_level_max
            );
        }
        Ok(())
    }
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            initial_type_capacity: defaults::INITIAL_TYPE_CAPACITY,
        }
    }
}

impl CoreConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).context("Failed to parse core configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        info!(path = %path.display(), "Loaded core configuration");
        Ok(config)
    }

    /// Load from `path` when given, otherwise use defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => {
                debug!("No configuration path given, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        self.buffer.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_are_valid() {
        let config = CoreConfig::default();
        config.validate().unwrap();
        assert_eq!(config.pool.segment_size(), 4096);
        assert_eq!(config.buffer.initial_room_level, 1);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CoreConfig::from_toml_str(
            r#"
[pool]
segment_exponent = 8

[buffer]
room_level_max = 6
"#,
        )
        .unwrap();

        assert_eq!(config.pool.segment_size(), 256);
        assert_eq!(config.pool.segments_per_chunk, defaults::SEGMENTS_PER_CHUNK);
        assert_eq!(config.buffer.room_level_max, 6);
        assert_eq!(config.buffer.room_level_min, 0);
        assert_eq!(config.binder, BinderConfig::default());
    }

    #[test]
    fn test_rejects_bad_exponent() {
        let err = CoreConfig::from_toml_str("[pool]\nsegment_exponent = 2\n").unwrap_err();
        assert!(err.to_string().contains("segment_exponent"));
    }

    #[test]
    fn test_rejects_inverted_room_levels() {
        let err = CoreConfig::from_toml_str(
            "[buffer]\nroom_level_min = 3\ninitial_room_level = 2\nroom_level_max = 4\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("min <= initial <= max"));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("core.toml");
        fs::write(&path, "[pool]\nmax_chunks = 2\nsegments_per_chunk = 4\n").unwrap();

        let config = CoreConfig::load(Some(&path)).unwrap();
        assert_eq!(config.pool.max_chunks, 2);
        assert_eq!(config.pool.segments_per_chunk, 4);

        assert_eq!(CoreConfig::load(None).unwrap(), CoreConfig::default());
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = CoreConfig::from_file(Path::new("/nonexistent/core.toml")).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/core.toml"));
    }
}
