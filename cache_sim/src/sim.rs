use std::{fs, path::Path};

use crate::{
    bulk::{self, LoadError},
    cache::{Cache, CacheView, LineDump},
    config::{CacheConfig, ConfigError},
    location::Location,
    memory::{self, Addr, Memory, MemoryView, Word},
    stat::{ratio, AddStats, CacheStat, Stats},
    trace::{record, AccessKind, Trace, TraceEvent},
};

/// memory, the cache in front of it, and the access counters.
pub struct System {
    config: CacheConfig,
    memory: Memory,
    cache: Cache,
    hit_count: u64,
    miss_count: u64,
    global_time: u64,
}

impl System {
    pub fn new(config: CacheConfig) -> Self {
        log::info!("cache initialized: {config}");
        Self {
            config,
            memory: Memory::new(config.ram_size),
            cache: Cache::new(config),
            hit_count: 0,
            miss_count: 0,
            global_time: 0,
        }
    }

    pub fn init(
        ram_size: usize,
        block_size: usize,
        num_sets: usize,
        num_ways: usize,
    ) -> Result<Self, ConfigError> {
        let config = CacheConfig::new(ram_size, block_size, num_sets, num_ways)?;
        Ok(Self::new(config))
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count
    }

    pub fn miss_count(&self) -> u64 {
        self.miss_count
    }

    /// serves `loc` from the cache, loading its block on a miss. returns the way holding it.
    fn fetch(&mut self, loc: &Location, trace: &mut Option<Trace>) -> usize {
        if let Some(way) = self.cache.probe(loc.set_index, loc.tag) {
            self.hit_count += 1;
            record(trace, || TraceEvent::Hit {
                set: loc.set_index,
                way,
            });
            return way;
        }
        self.miss_count += 1;
        record(trace, || TraceEvent::Miss { set: loc.set_index });
        let way = self.cache.select_victim(loc.set_index);
        let stamp = self.global_time;
        self.global_time += 1;
        let evicted_tag =
            self.cache
                .load_block(loc.set_index, way, loc.block_number, &self.memory, stamp);
        if let Some(tag) = evicted_tag {
            log::debug!(
                "evicted tag {tag} from set {}, way {way} for tag {}",
                loc.set_index,
                loc.tag
            );
        }
        record(trace, || TraceEvent::Loaded {
            set: loc.set_index,
            way,
            evicted_tag,
        });
        way
    }

    fn locate(
        &self,
        kind: AccessKind,
        addr: Addr,
        trace: &mut Option<Trace>,
    ) -> memory::Result<Location> {
        self.memory.check(addr)?;
        let location = Location::of(addr, &self.config);
        record(trace, || TraceEvent::Decomposed {
            kind,
            addr,
            location,
        });
        Ok(location)
    }

    pub fn read(&mut self, addr: usize, trace: &mut Option<Trace>) -> memory::Result<Word> {
        let loc = self.locate(AccessKind::Read, Addr::new(addr), trace)?;
        let way = self.fetch(&loc, trace);
        Ok(self.cache.line(loc.set_index, way).block[loc.offset])
    }

    /// write-through, write-allocate.
    pub fn write(
        &mut self,
        addr: usize,
        val: Word,
        trace: &mut Option<Trace>,
    ) -> memory::Result<()> {
        let addr = Addr::new(addr);
        let loc = self.locate(AccessKind::Write, addr, trace)?;
        self.memory.write_word(addr, val)?;
        let way = match self.cache.probe(loc.set_index, loc.tag) {
            Some(way) => {
                record(trace, || TraceEvent::WriteHit {
                    set: loc.set_index,
                    way,
                });
                way
            }
            None => {
                // the allocating read is accounted as an ordinary read miss
                let loc = self.locate(AccessKind::Read, addr, trace)?;
                let way = self.fetch(&loc, trace);
                record(trace, || TraceEvent::WriteAllocate {
                    set: loc.set_index,
                    way,
                });
                way
            }
        };
        self.cache.line_mut(loc.set_index, way).block[loc.offset] = val;
        Ok(())
    }

    pub fn load_bulk(&mut self, words: &[Word]) -> usize {
        let loaded = self.memory.load_bulk(words);
        log::info!("{loaded} numbers loaded into RAM.");
        loaded
    }

    /// loads whitespace separated integers from `path` into memory from index 0.
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<usize, LoadError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| LoadError::Unreadable {
            path: path.to_owned(),
            source,
        })?;
        let parsed = bulk::parse_words(&content, self.config.ram_size);
        let loaded = self.load_bulk(&parsed.words);
        match parsed.malformed_at {
            Some(at) => Err(LoadError::Malformed { loaded, at }),
            None => Ok(loaded),
        }
    }

    pub fn dump_memory(&self) -> Vec<(usize, Word)> {
        self.memory.words().iter().copied().enumerate().collect()
    }

    pub fn dump_cache(&self) -> Vec<LineDump> {
        self.cache.dump()
    }

    pub fn memory_view(&self) -> MemoryView<'_> {
        MemoryView::new(self.memory.words(), self.config.block_size)
    }

    pub fn cache_view(&self) -> CacheView<'_> {
        self.cache.view()
    }

    pub fn stats(&self) -> CacheStat {
        let mut filled_lines = 0;
        let mut sum = 0i64;
        let mut count = 0u64;
        for line in self.cache.valid_lines() {
            filled_lines += 1;
            sum += line.block.iter().map(|&v| v as i64).sum::<i64>();
            count += line.block.len() as u64;
        }
        let total = self.hit_count + self.miss_count;
        CacheStat {
            hits: self.hit_count,
            misses: self.miss_count,
            hit_rate: ratio(self.hit_count, total),
            miss_rate: ratio(self.miss_count, total),
            filled_lines,
            total_lines: self.config.total_lines(),
            avg_cached_value: if count == 0 {
                0.0
            } else {
                sum as f64 / count as f64
            },
        }
    }

    pub fn collect_stat(&self) -> Stats {
        let mut ss = Stats::default();
        self.add_stats(&mut ss);
        ss
    }
}

impl AddStats for System {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stats()));
        #[cfg(feature = "stat")]
        self.memory.add_stats(buf);
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
