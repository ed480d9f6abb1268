use std::fmt;

use crate::{config::CacheConfig, memory::Addr};

/// where an address lives in the cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Location {
    pub block_number: usize,
    pub set_index: usize,
    pub tag: usize,
    pub offset: usize,
}

impl Location {
    /// the one decomposition rule shared by reads, writes and block loads.
    pub fn of(addr: Addr, config: &CacheConfig) -> Self {
        let a = addr.inner();
        let block_number = a / config.block_size;
        Self {
            block_number,
            set_index: block_number % config.num_sets,
            tag: block_number / config.num_sets,
            offset: a % config.block_size,
        }
    }

    /// inverse of [`Location::of`].
    pub fn addr(&self, config: &CacheConfig) -> Addr {
        let block_number = block_number_of(self.set_index, self.tag, config);
        Addr::new(block_number * config.block_size + self.offset)
    }
}

pub fn block_number_of(set_index: usize, tag: usize, config: &CacheConfig) -> usize {
    set_index + tag * config.num_sets
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "block number: {}, offset: {}, set index: {}, tag: {}",
            self.block_number, self.offset, self.set_index, self.tag
        )
    }
}
