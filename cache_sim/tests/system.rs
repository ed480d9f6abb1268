use std::{fs, path::PathBuf};

use cache_sim::{
    bulk::LoadError,
    config::CacheConfig,
    location::Location,
    memory::{Addr, MemoryAccessError},
    sim::System,
    trace::{Trace, TraceEvent},
    traffic::{run_traffic, Random},
};

fn resident_tags(sys: &System, set: usize) -> Vec<usize> {
    let mut tags: Vec<_> = sys
        .dump_cache()
        .into_iter()
        .filter(|l| l.set == set && l.valid)
        .map(|l| l.tag)
        .collect();
    tags.sort();
    tags
}

#[test]
fn write_then_read_returns_written_value() {
    let mut sys = System::default();
    for addr in (0..512).step_by(37) {
        sys.read(addr, &mut None).unwrap();
    }
    for (i, addr) in (3..512).step_by(29).enumerate() {
        let v = -(i as i32) * 1000;
        sys.write(addr, v, &mut None).unwrap();
        assert_eq!(v, sys.read(addr, &mut None).unwrap());
        assert_eq!(v, sys.dump_memory()[addr].1);
    }
}

#[test]
fn repeated_reads_hit() {
    let mut sys = System::default();
    sys.read(200, &mut None).unwrap();
    let misses = sys.miss_count();
    for _ in 0..10 {
        assert_eq!(200, sys.read(200, &mut None).unwrap());
    }
    assert_eq!(misses, sys.miss_count());
    assert_eq!(10, sys.hit_count());
}

#[test]
fn fifo_evicts_oldest_load_not_least_recent() {
    let mut sys = System::default();
    // blocks 0, 4, 8, 12 share set 0 with tags 0..4
    for addr in [0, 32, 64, 96] {
        sys.read(addr, &mut None).unwrap();
    }
    for _ in 0..5 {
        sys.read(1, &mut None).unwrap();
    }
    assert_eq!(vec![0, 1, 2, 3], resident_tags(&sys, 0));

    let mut trace = Some(Trace::new());
    sys.read(128, &mut trace).unwrap();
    assert!(trace.unwrap().events().contains(&TraceEvent::Loaded {
        set: 0,
        way: 0,
        evicted_tag: Some(0),
    }));
    assert_eq!(vec![1, 2, 3, 4], resident_tags(&sys, 0));

    // the next victim is the block loaded second
    sys.read(0, &mut None).unwrap();
    assert_eq!(vec![0, 2, 3, 4], resident_tags(&sys, 0));
}

#[test]
fn write_miss_counts_as_extra_miss() {
    let mut sys = System::default();
    let mut reads = 0;
    let mut write_misses = 0;
    for addr in (0..512).step_by(13) {
        sys.read(addr, &mut None).unwrap();
        reads += 1;
    }
    for addr in (5..512).step_by(11) {
        let loc = Location::of(Addr::new(addr), sys.config());
        if sys.cache().probe(loc.set_index, loc.tag).is_none() {
            write_misses += 1;
        }
        sys.write(addr, 1, &mut None).unwrap();
    }
    assert!(write_misses > 0);
    assert_eq!(reads + write_misses, sys.hit_count() + sys.miss_count());
}

#[test]
fn empty_stats() {
    let s = System::default().stats();
    assert_eq!(0, s.filled_lines);
    assert_eq!(16, s.total_lines);
    assert_eq!((0.0, 0.0), (s.hit_rate, s.miss_rate));
    assert_eq!(0.0, s.avg_cached_value);
}

#[test]
fn boundary_address() {
    let mut sys = System::init(512, 8, 4, 4).unwrap();
    assert_eq!(0, sys.read(0, &mut None).unwrap());
    assert_eq!(0, sys.read(0, &mut None).unwrap());
    let before = sys.stats();
    let cache_before = sys.dump_cache();
    assert_eq!(
        Err(MemoryAccessError::OutOfBounds {
            accessed_address: 512,
            ram_size: 512
        }),
        sys.read(512, &mut None)
    );
    assert_eq!(before, sys.stats());
    assert_eq!(cache_before, sys.dump_cache());
    assert_eq!((1, 1), (before.hits, before.misses));
}

#[test]
fn occupancy_never_exceeds_capacity() {
    let config = CacheConfig::new(256, 4, 8, 2).unwrap();
    let mut sys = System::new(config);
    let summary = run_traffic(&mut sys, Random::new(1000, config.ram_size, Some(42)));
    assert_eq!(1000, summary.issued);
    let s = sys.stats();
    assert_eq!(1000, s.hits + s.misses);
    assert!(s.filled_lines <= config.total_lines());
    for set in 0..config.num_sets {
        let tags = resident_tags(&sys, set);
        let mut dedup = tags.clone();
        dedup.dedup();
        assert_eq!(tags, dedup);
    }
}

fn temp_file(name: &str, content: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("cache_sim_{}_{name}", std::process::id()));
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn load_file() {
    let mut sys = System::default();
    let path = temp_file("good.txt", "5 6 7\n8");
    assert_eq!(4, sys.load_file(&path).unwrap());
    let head: Vec<(usize, i32)> = vec![(0, 5), (1, 6), (2, 7), (3, 8), (4, 4)];
    assert_eq!(head, sys.dump_memory()[..5]);
    fs::remove_file(path).unwrap();

    let path = temp_file("bad.txt", "1 2 oops 3");
    let err = sys.load_file(&path).unwrap_err();
    assert!(matches!(err, LoadError::Malformed { loaded: 2, .. }));
    assert_eq!(2, sys.dump_memory()[1].1);
    fs::remove_file(path).unwrap();

    let err = sys.load_file("/nonexistent/cache_sim/ram.txt").unwrap_err();
    assert_eq!(0, err.loaded());
}

#[test]
fn load_file_ignores_text_past_capacity() {
    let mut sys = System::init(16, 4, 2, 2).unwrap();
    let words: Vec<String> = (100..120).map(|v| v.to_string()).collect();
    let path = temp_file("overfull.txt", &format!("{} oops", words.join(" ")));
    assert_eq!(16, sys.load_file(&path).unwrap());
    assert_eq!(115, sys.dump_memory()[15].1);
    fs::remove_file(path).unwrap();
}
