use std::fmt::{self, Display};

#[cfg(feature = "stat")]
use std::cell::RefCell;

use thiserror::Error;

#[cfg(feature = "stat")]
use crate::stat::{AddStats, Stats};

pub type Word = i32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Addr(usize);

impl Addr {
    pub fn new(v: usize) -> Self {
        Self(v)
    }
    pub fn inner(self) -> usize {
        self.0
    }
}

impl Display for Addr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum MemoryAccessError {
    #[error("invalid address {accessed_address}: out of range for memory of {ram_size} words")]
    OutOfBounds {
        accessed_address: usize,
        ram_size: usize,
    },
}

pub type Result<T> = std::result::Result<T, MemoryAccessError>;

pub struct Memory {
    inner: Vec<Word>,
    #[cfg(feature = "stat")]
    stat_mem: RefCell<stat::MemoryStat>,
}

impl Memory {
    /// every word starts out holding its own index.
    pub fn new(size: usize) -> Self {
        Self {
            inner: (0..size).map(|i| i as Word).collect(),
            #[cfg(feature = "stat")]
            stat_mem: RefCell::default(),
        }
    }
    pub fn check(&self, addr: Addr) -> Result<usize> {
        let index = addr.inner();
        if index >= self.inner.len() {
            return Err(MemoryAccessError::OutOfBounds {
                accessed_address: index,
                ram_size: self.inner.len(),
            });
        }
        Ok(index)
    }
    pub fn read_word(&self, addr: Addr) -> Result<Word> {
        let index = self.check(addr)?;
        #[cfg(feature = "stat")]
        self.stat_mem.borrow_mut().on_read(1);
        Ok(self.inner[index])
    }
    pub fn write_word(&mut self, addr: Addr, val: Word) -> Result<()> {
        let index = self.check(addr)?;
        #[cfg(feature = "stat")]
        self.stat_mem.borrow_mut().on_write(1);
        self.inner[index] = val;
        Ok(())
    }
    /// copies `buf.len()` words starting at `start`; words past the end read as zero.
    pub fn read_block(&self, start: Addr, buf: &mut [Word]) {
        let start = start.inner();
        let end = (start + buf.len()).min(self.inner.len());
        let available = end.saturating_sub(start);
        if available > 0 {
            buf[..available].copy_from_slice(&self.inner[start..end]);
        }
        buf[available..].fill(0);
        #[cfg(feature = "stat")]
        self.stat_mem.borrow_mut().on_read(available);
    }
    /// overwrites words from index 0; anything beyond capacity is dropped.
    pub fn load_bulk(&mut self, values: &[Word]) -> usize {
        let count = values.len().min(self.inner.len());
        self.inner[..count].copy_from_slice(&values[..count]);
        #[cfg(feature = "stat")]
        self.stat_mem.borrow_mut().on_bulk_load(count);
        count
    }
    pub fn words(&self) -> &[Word] {
        &self.inner
    }
}

#[cfg(feature = "stat")]
impl AddStats for Memory {
    fn add_stats(&self, buf: &mut Stats) {
        buf.push(Box::new(self.stat_mem.borrow().to_owned()));
    }
}

#[cfg(feature = "stat")]
mod stat {
    use std::fmt;

    use crate::stat::*;

    #[derive(Clone, Copy, Default)]
    pub struct MemoryStat {
        read: usize,
        write: usize,
        bulk_loaded: usize,
    }

    impl MemoryStat {
        pub fn on_read(&mut self, words: usize) {
            self.read += words;
        }
        pub fn on_write(&mut self, words: usize) {
            self.write += words;
        }
        pub fn on_bulk_load(&mut self, words: usize) {
            self.bulk_loaded += words;
        }
    }

    impl Stat for MemoryStat {
        fn view(&self, _: usize) -> Box<dyn StatView + '_> {
            Box::new(MemoryStatView { stat: self })
        }
    }

    pub struct MemoryStatView<'a> {
        stat: &'a MemoryStat,
    }

    impl StatView for MemoryStatView<'_> {
        fn header(&self) -> &'static str {
            "word traffic of memory"
        }
        fn width(&self) -> usize {
            28
        }
    }

    impl fmt::Display for MemoryStatView<'_> {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            writeln!(f, "  read:        {:>13}", self.stat.read)?;
            writeln!(f, "  written:     {:>13}", self.stat.write)?;
            write!(f, "  bulk loaded: {:>13}", self.stat.bulk_loaded)
        }
    }
}

/// row-per-block listing of memory contents.
pub struct MemoryView<'a> {
    words: &'a [Word],
    row: usize,
}

impl<'a> MemoryView<'a> {
    pub fn new(words: &'a [Word], row: usize) -> Self {
        Self {
            words,
            row: row.max(1),
        }
    }
}

impl Display for MemoryView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RAM contents:")?;
        for (r, chunk) in self.words.chunks(self.row).enumerate() {
            let base = r * self.row;
            let line = chunk
                .iter()
                .enumerate()
                .map(|(i, v)| format!("[{}]={v}", base + i))
                .collect::<Vec<_>>()
                .join(" ");
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory() {
        let mut m = Memory::new(16);
        assert_eq!(7, m.read_word(Addr::new(7)).unwrap());
        m.write_word(Addr::new(3), -42).unwrap();
        assert_eq!(-42, m.read_word(Addr::new(3)).unwrap());
    }

    #[test]
    fn test_out_of_bounds() {
        let mut m = Memory::new(16);
        assert_eq!(
            Err(MemoryAccessError::OutOfBounds {
                accessed_address: 16,
                ram_size: 16
            }),
            m.write_word(Addr::new(16), 1)
        );
        assert!(m.read_word(Addr::new(100)).is_err());
        assert_eq!((0..16).collect::<Vec<Word>>(), m.words());
    }

    #[test]
    fn test_read_block_pads_with_zero() {
        let m = Memory::new(10);
        let mut buf = [-1; 4];
        m.read_block(Addr::new(8), &mut buf);
        assert_eq!([8, 9, 0, 0], buf);
    }

    #[test]
    fn test_load_bulk() {
        let mut m = Memory::new(4);
        assert_eq!(2, m.load_bulk(&[10, 20]));
        assert_eq!([10, 20, 2, 3], m.words());
        assert_eq!(4, m.load_bulk(&[1, 2, 3, 4, 5, 6]));
        assert_eq!([1, 2, 3, 4], m.words());
    }
}
