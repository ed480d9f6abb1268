use std::fmt;

use crate::{location::Location, memory::Addr};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessKind {
    Read,
    Write,
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessKind::Read => write!(f, "Reading from"),
            AccessKind::Write => write!(f, "Writing to"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TraceEvent {
    Decomposed {
        kind: AccessKind,
        addr: Addr,
        location: Location,
    },
    Hit {
        set: usize,
        way: usize,
    },
    Miss {
        set: usize,
    },
    Loaded {
        set: usize,
        way: usize,
        evicted_tag: Option<usize>,
    },
    WriteHit {
        set: usize,
        way: usize,
    },
    WriteAllocate {
        set: usize,
        way: usize,
    },
}

impl fmt::Display for TraceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        use TraceEvent::*;
        match self {
            Decomposed {
                kind,
                addr,
                location,
            } => write!(f, "{kind} address {addr}: {location}"),
            Hit { set, way } => write!(f, "  CACHE HIT (set {set}, way {way})"),
            Miss { set } => write!(f, "  CACHE MISS (set {set}). Loading block from RAM."),
            Loaded {
                set,
                way,
                evicted_tag: Some(tag),
            } => write!(
                f,
                "  Loaded block stored in set {set}, way {way} (evicted tag {tag})"
            ),
            Loaded { set, way, .. } => {
                write!(f, "  Loaded block stored in set {set}, way {way}")
            }
            WriteHit { set, way } => {
                write!(f, "  Write to cache (HIT) in set {set}, way {way}")
            }
            WriteAllocate { set, way } => write!(
                f,
                "  Write to cache (write-allocate) in set {set}, way {way}"
            ),
        }
    }
}

/// events collected while serving accesses. pass `&mut None` to skip tracing.
#[derive(Default, Debug)]
pub struct Trace {
    events: Vec<TraceEvent>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn events(&self) -> &[TraceEvent] {
        &self.events
    }
    pub fn clear(&mut self) {
        self.events.clear()
    }
}

pub(crate) fn record(trace: &mut Option<Trace>, event: impl FnOnce() -> TraceEvent) {
    if let Some(t) = trace {
        t.events.push(event());
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, e) in self.events.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{e}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;

    #[test]
    fn test_event_display() {
        let c = CacheConfig::default();
        let addr = Addr::new(77);
        let location = Location::of(addr, &c);
        assert_eq!(
            "Reading from address 77: block number: 9, offset: 5, set index: 1, tag: 2",
            TraceEvent::Decomposed {
                kind: AccessKind::Read,
                addr,
                location,
            }
            .to_string()
        );
        assert_eq!(
            "Writing to address 77: block number: 9, offset: 5, set index: 1, tag: 2",
            TraceEvent::Decomposed {
                kind: AccessKind::Write,
                addr,
                location,
            }
            .to_string()
        );
        assert_eq!(
            "  CACHE HIT (set 1, way 2)",
            TraceEvent::Hit { set: 1, way: 2 }.to_string()
        );
        assert_eq!(
            "  CACHE MISS (set 3). Loading block from RAM.",
            TraceEvent::Miss { set: 3 }.to_string()
        );
        assert_eq!(
            "  Loaded block stored in set 0, way 1",
            TraceEvent::Loaded {
                set: 0,
                way: 1,
                evicted_tag: None,
            }
            .to_string()
        );
        assert_eq!(
            "  Loaded block stored in set 0, way 1 (evicted tag 4)",
            TraceEvent::Loaded {
                set: 0,
                way: 1,
                evicted_tag: Some(4),
            }
            .to_string()
        );
        assert_eq!(
            "  Write to cache (HIT) in set 2, way 3",
            TraceEvent::WriteHit { set: 2, way: 3 }.to_string()
        );
        assert_eq!(
            "  Write to cache (write-allocate) in set 2, way 0",
            TraceEvent::WriteAllocate { set: 2, way: 0 }.to_string()
        );
    }

    #[test]
    fn test_trace_joins_lines() {
        let mut trace = Some(Trace::new());
        record(&mut trace, || TraceEvent::Miss { set: 0 });
        record(&mut trace, || TraceEvent::Hit { set: 0, way: 0 });
        let trace = trace.unwrap();
        assert_eq!(
            "  CACHE MISS (set 0). Loading block from RAM.\n  CACHE HIT (set 0, way 0)",
            trace.to_string()
        );

        let mut off = None;
        record(&mut off, || TraceEvent::Miss { set: 0 });
        assert!(off.is_none());
    }
}
