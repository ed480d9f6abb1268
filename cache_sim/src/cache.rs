use std::fmt;

use serde::Serialize;

use crate::{
    config::CacheConfig,
    memory::{Addr, Memory, Word},
};

#[derive(Clone, Debug)]
pub struct CacheLine {
    pub valid: bool,
    pub tag: usize,
    pub block: Vec<Word>,
    pub load_order: u64,
}

impl CacheLine {
    fn new(block_size: usize) -> Self {
        Self {
            valid: false,
            tag: 0,
            block: vec![0; block_size],
            load_order: 0,
        }
    }
}

/// one row of [`Cache::dump`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LineDump {
    pub set: usize,
    pub way: usize,
    pub valid: bool,
    pub tag: usize,
    pub block: Vec<Word>,
}

pub struct Cache {
    config: CacheConfig,
    sets: Vec<Vec<CacheLine>>,
}

impl Cache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            sets: vec![vec![CacheLine::new(config.block_size); config.num_ways]; config.num_sets],
        }
    }

    pub fn line(&self, set_index: usize, way: usize) -> &CacheLine {
        &self.sets[set_index][way]
    }

    pub fn line_mut(&mut self, set_index: usize, way: usize) -> &mut CacheLine {
        &mut self.sets[set_index][way]
    }

    pub fn probe(&self, set_index: usize, tag: usize) -> Option<usize> {
        self.sets[set_index]
            .iter()
            .position(|l| l.valid && l.tag == tag)
    }

    /// first empty way, else the way loaded earliest.
    pub fn select_victim(&self, set_index: usize) -> usize {
        let set = &self.sets[set_index];
        if let Some(way) = set.iter().position(|l| !l.valid) {
            return way;
        }
        // min_by_key keeps the first minimum, so ties go to the lowest way
        set.iter()
            .enumerate()
            .min_by_key(|(_, l)| l.load_order)
            .map(|(way, _)| way)
            .unwrap_or(0)
    }

    /// fills `way` with `block_number` from memory. returns the tag it replaced, if any.
    pub fn load_block(
        &mut self,
        set_index: usize,
        way: usize,
        block_number: usize,
        memory: &Memory,
        stamp: u64,
    ) -> Option<usize> {
        let tag = block_number / self.config.num_sets;
        let start = Addr::new(block_number * self.config.block_size);
        let line = &mut self.sets[set_index][way];
        let evicted = line.valid.then_some(line.tag);
        memory.read_block(start, &mut line.block);
        line.valid = true;
        line.tag = tag;
        line.load_order = stamp;
        evicted
    }

    pub fn lines(&self) -> impl Iterator<Item = (usize, usize, &CacheLine)> + '_ {
        self.sets.iter().enumerate().flat_map(|(set, ways)| {
            ways.iter()
                .enumerate()
                .map(move |(way, line)| (set, way, line))
        })
    }

    pub fn valid_lines(&self) -> impl Iterator<Item = &CacheLine> + '_ {
        self.lines().map(|(_, _, l)| l).filter(|l| l.valid)
    }

    pub fn dump(&self) -> Vec<LineDump> {
        self.lines()
            .map(|(set, way, l)| LineDump {
                set,
                way,
                valid: l.valid,
                tag: l.tag,
                block: l.block.clone(),
            })
            .collect()
    }

    pub fn view(&self) -> CacheView<'_> {
        CacheView { cache: self }
    }
}

pub struct CacheView<'a> {
    cache: &'a Cache,
}

impl fmt::Display for CacheView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Cache contents:")?;
        for (set, ways) in self.cache.sets.iter().enumerate() {
            writeln!(f, "Set {set}:")?;
            for (way, l) in ways.iter().enumerate() {
                write!(f, "  Way {way} | ")?;
                if l.valid {
                    write!(f, "Tag: {} , Data: ", l.tag)?;
                } else {
                    write!(f, "Empty line, Data: ")?;
                }
                let data = l
                    .block
                    .iter()
                    .map(|v| v.to_string())
                    .collect::<Vec<_>>()
                    .join(" ");
                writeln!(f, "{data}")?;
            }
        }
        Ok(())
    }
}
