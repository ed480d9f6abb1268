use std::fmt;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_RAM_SIZE: usize = 512usize;
pub const DEFAULT_BLOCK_SIZE: usize = 8usize;
pub const DEFAULT_WAYS: usize = 4usize;

/// geometry of memory and cache, in words.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub ram_size: usize,
    pub block_size: usize,
    pub num_sets: usize,
    pub num_ways: usize,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be non-zero")]
    Zero { field: &'static str },
    #[error("block size {block_size} does not divide ram size {ram_size}")]
    BlockSizeMismatch { ram_size: usize, block_size: usize },
    #[error("{num_sets} sets do not divide {num_blocks} memory blocks")]
    SetCountMismatch { num_blocks: usize, num_sets: usize },
}

impl Default for CacheConfig {
    fn default() -> Self {
        let num_blocks = DEFAULT_RAM_SIZE / DEFAULT_BLOCK_SIZE;
        Self {
            ram_size: DEFAULT_RAM_SIZE,
            block_size: DEFAULT_BLOCK_SIZE,
            num_sets: num_blocks / (DEFAULT_WAYS * DEFAULT_WAYS),
            num_ways: DEFAULT_WAYS,
        }
    }
}

impl CacheConfig {
    pub fn new(
        ram_size: usize,
        block_size: usize,
        num_sets: usize,
        num_ways: usize,
    ) -> std::result::Result<Self, ConfigError> {
        let config = Self {
            ram_size,
            block_size,
            num_sets,
            num_ways,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        macro_rules! non_zero {
            ($($field:ident),*) => {
                $(
                    if self.$field == 0 {
                        return Err(ConfigError::Zero {
                            field: stringify!($field),
                        });
                    }
                )*
            };
        }
        non_zero!(ram_size, block_size, num_sets, num_ways);
        if self.ram_size % self.block_size != 0 {
            return Err(ConfigError::BlockSizeMismatch {
                ram_size: self.ram_size,
                block_size: self.block_size,
            });
        }
        let num_blocks = self.num_blocks();
        if num_blocks % self.num_sets != 0 {
            return Err(ConfigError::SetCountMismatch {
                num_blocks,
                num_sets: self.num_sets,
            });
        }
        Ok(())
    }

    /// reads a (possibly partial) json config; absent fields take their default.
    pub fn deser(file: impl std::io::Read) -> Result<Self> {
        let config: Self = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn num_blocks(&self) -> usize {
        self.ram_size / self.block_size
    }

    pub fn total_lines(&self) -> usize {
        self.num_sets * self.num_ways
    }
}

impl fmt::Display for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} words of RAM, {}-word blocks, {} sets x {} ways",
            self.ram_size, self.block_size, self.num_sets, self.num_ways
        )
    }
}
