use std::fmt;

use rand::{rngs::StdRng, Rng, SeedableRng};
use thiserror::Error;

use crate::sim::System;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TrafficError {
    #[error("locality range {range} must lie in 1..{ram_size}")]
    InvalidRange { range: usize, ram_size: usize },
}

fn rng_from(seed: Option<u64>) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(s),
        None => StdRng::from_entropy(),
    }
}

/// `start..start + requests`, dropping anything past the end of memory.
pub struct Sequential {
    next: usize,
    end: usize,
}

impl Sequential {
    pub fn new(start: usize, requests: usize, ram_size: usize) -> Self {
        Self {
            next: start,
            end: start.saturating_add(requests).min(ram_size),
        }
    }
}

impl Iterator for Sequential {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.next >= self.end {
            return None;
        }
        let addr = self.next;
        self.next += 1;
        Some(addr)
    }
}

/// `count` addresses drawn uniformly from the whole memory.
pub struct Random {
    rng: StdRng,
    remaining: usize,
    ram_size: usize,
}

impl Random {
    pub fn new(count: usize, ram_size: usize, seed: Option<u64>) -> Self {
        Self {
            rng: rng_from(seed),
            remaining: if ram_size == 0 { 0 } else { count },
            ram_size,
        }
    }
}

impl Iterator for Random {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        Some(self.rng.gen_range(0..self.ram_size))
    }
}

/// clusters of accesses: each region starts at a random base and stays within `range` words of it.
pub struct Locality {
    rng: StdRng,
    requests_per_region: usize,
    range: usize,
    regions_left: usize,
    ram_size: usize,
    base: usize,
    left_in_region: usize,
}

impl Locality {
    pub fn new(
        requests_per_region: usize,
        range: usize,
        regions: usize,
        ram_size: usize,
        seed: Option<u64>,
    ) -> Result<Self, TrafficError> {
        if range == 0 || range >= ram_size {
            return Err(TrafficError::InvalidRange { range, ram_size });
        }
        Ok(Self {
            rng: rng_from(seed),
            requests_per_region,
            range,
            regions_left: regions,
            ram_size,
            base: 0,
            left_in_region: 0,
        })
    }
}

impl Iterator for Locality {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        loop {
            if self.left_in_region > 0 {
                self.left_in_region -= 1;
                let addr = self.base + self.rng.gen_range(0..self.range);
                if addr < self.ram_size {
                    return Some(addr);
                }
                continue;
            }
            if self.regions_left == 0 || self.requests_per_region == 0 {
                return None;
            }
            self.regions_left -= 1;
            self.base = self.rng.gen_range(0..self.ram_size - self.range);
            self.left_in_region = self.requests_per_region;
            log::info!("accessing region starting at address {}", self.base);
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TrafficSummary {
    pub issued: usize,
    pub hits: u64,
    pub misses: u64,
}

impl fmt::Display for TrafficSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} reads issued: {} hits, {} misses",
            self.issued, self.hits, self.misses
        )
    }
}

/// issues one read per generated address.
pub fn run_traffic(sys: &mut System, addrs: impl IntoIterator<Item = usize>) -> TrafficSummary {
    let (hits, misses) = (sys.hit_count(), sys.miss_count());
    let mut issued = 0;
    for addr in addrs {
        match sys.read(addr, &mut None) {
            Ok(_) => issued += 1,
            Err(e) => log::warn!("{e}"),
        }
    }
    let summary = TrafficSummary {
        issued,
        hits: sys.hit_count() - hits,
        misses: sys.miss_count() - misses,
    };
    log::info!("traffic complete: {summary}");
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_clamps_to_memory() {
        assert_eq!(vec![3, 4, 5], Sequential::new(3, 3, 512).collect::<Vec<_>>());
        assert_eq!(vec![510, 511], Sequential::new(510, 10, 512).collect::<Vec<_>>());
        assert_eq!(0, Sequential::new(600, 10, 512).count());
    }

    #[test]
    fn test_random_is_seeded() {
        let a: Vec<_> = Random::new(50, 512, Some(7)).collect();
        let b: Vec<_> = Random::new(50, 512, Some(7)).collect();
        assert_eq!(50, a.len());
        assert_eq!(a, b);
        assert!(a.iter().all(|&x| x < 512));
    }

    #[test]
    fn test_locality_stays_in_region() {
        let addrs: Vec<_> = Locality::new(20, 16, 3, 512, Some(1)).unwrap().collect();
        assert_eq!(60, addrs.len());
        for region in addrs.chunks(20) {
            let lo = *region.iter().min().unwrap();
            let hi = *region.iter().max().unwrap();
            assert!(hi - lo < 16);
        }
        assert_eq!(
            Err(TrafficError::InvalidRange {
                range: 512,
                ram_size: 512
            }),
            Locality::new(1, 512, 1, 512, None).map(|_| ())
        );
    }

    #[test]
    fn test_run_traffic() {
        let mut sys = System::default();
        let s = run_traffic(&mut sys, Sequential::new(0, 16, 512));
        assert_eq!(
            TrafficSummary {
                issued: 16,
                hits: 14,
                misses: 2
            },
            s
        );
        let s = run_traffic(&mut sys, Sequential::new(0, 16, 512));
        assert_eq!((16, 0), (s.hits, s.misses));
    }
}
