use std::fmt;

use serde::Serialize;

pub trait Stat {
    fn view(&self, max_width: usize) -> Box<dyn StatView + '_>;
}

pub trait StatView: fmt::Display {
    /// header of stat
    fn header(&self) -> &'static str;
    /// body width
    fn width(&self) -> usize;
}

pub trait AddStats {
    /// add stat to `buf`.
    fn add_stats(&self, buf: &mut Stats);
}

#[derive(Default)]
pub struct Stats {
    stats: Vec<Box<dyn Stat>>,
}

impl Stats {
    pub fn push(&mut self, stat: Box<dyn Stat>) {
        self.stats.push(stat)
    }
    pub fn view(&self, max_width: usize) -> StatAllView<'_> {
        StatAllView {
            views: self.stats.iter().map(|s| s.view(max_width)).collect(),
        }
    }
}

pub struct StatAllView<'s> {
    views: Vec<Box<dyn StatView + 's>>,
}

impl fmt::Display for StatAllView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .views
            .iter()
            .map(|s| s.header().len().max(s.width()))
            .max()
            .unwrap_or(20);
        writeln!(f, "{:-^width$}", " statistics ")?;
        for sv in &self.views {
            writeln!(f, "{}:", sv.header())?;
            writeln!(f, "{}", sv)?;
        }
        write!(f, "{:-<width$}", "")
    }
}

/// snapshot of the cache counters and occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CacheStat {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub filled_lines: usize,
    pub total_lines: usize,
    pub avg_cached_value: f64,
}

impl CacheStat {
    pub fn accesses(&self) -> u64 {
        self.hits + self.misses
    }
}

/// `part / total`, or 0 when there is nothing to divide by.
pub fn ratio(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64
    }
}

impl Stat for CacheStat {
    fn view(&self, _: usize) -> Box<dyn StatView + '_> {
        Box::new(self)
    }
}

impl StatView for &'_ CacheStat {
    fn header(&self) -> &'static str {
        "cache"
    }
    fn width(&self) -> usize {
        36
    }
}

impl fmt::Display for &'_ CacheStat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "  total accesses: {:>10}", self.accesses())?;
        let hits = format!("{} ({:.2}%)", self.hits, self.hit_rate * 100.0);
        writeln!(f, "  hits:           {hits:>18}")?;
        let misses = format!("{} ({:.2}%)", self.misses, self.miss_rate * 100.0);
        writeln!(f, "  misses:         {misses:>18}")?;
        let filled = format!("{} / {}", self.filled_lines, self.total_lines);
        writeln!(f, "  filled lines:   {filled:>10}")?;
        write!(f, "  average value:  {:>10.3}", self.avg_cached_value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_guards_zero() {
        assert_eq!(0.0, ratio(0, 0));
        assert_eq!(0.25, ratio(1, 4));
    }

    #[test]
    fn test_view() {
        let mut ss = Stats::default();
        ss.push(Box::new(CacheStat {
            hits: 3,
            misses: 1,
            hit_rate: 0.75,
            miss_rate: 0.25,
            filled_lines: 1,
            total_lines: 16,
            avg_cached_value: 3.5,
        }));
        let out = ss.view(80).to_string();
        assert!(out.contains("cache:"));
        assert!(out.contains("3 (75.00%)"));
        assert!(out.contains("1 / 16"));
    }
}
