//! End-to-end runs of the calibration pipeline.
//!
//! Most tests drive the session through a simulated set-associative hierarchy so the expected
//! levels are known exactly; one smoke test runs a tiny scan on the real hardware.

use cache_calibrator::harness::Probe;
use cache_calibrator::{CacheEntity, CalibrationConfig, CalibrationSession, Result};
use std::collections::{BTreeSet, HashMap};

struct Level {
    size: usize,
    associativity: usize,
    line: usize,
    latency: u64,
}

impl Level {
    fn set_of(&self, address: usize) -> usize {
        (address / self.line) % (self.size / (self.associativity * self.line))
    }
}

/// LRU hierarchy under a cyclic chase: a set holding more distinct lines than it has ways misses
/// on every access, so those slots are served by the next level down
struct SimulatedHierarchy {
    levels: Vec<Level>,
    memory_latency: u64,
}

impl SimulatedHierarchy {
    /// 32 KiB 8-way L1 and 1 MiB 16-way L2, both with 64 B lines
    fn desktop() -> Self {
        SimulatedHierarchy {
            levels: vec![
                Level {
                    size: 32 * 1024,
                    associativity: 8,
                    line: 64,
                    latency: 100,
                },
                Level {
                    size: 1024 * 1024,
                    associativity: 16,
                    line: 64,
                    latency: 300,
                },
            ],
            memory_latency: 1000,
        }
    }
}

impl Probe for SimulatedHierarchy {
    fn measure(&mut self, stride: usize, spots: usize) -> Result<u64> {
        let addresses: Vec<usize> = (0..spots).map(|slot| slot * stride).collect();
        let mut latencies = vec![self.memory_latency; spots];
        let mut served = vec![false; spots];

        for level in &self.levels {
            let mut lines_per_set: HashMap<usize, BTreeSet<usize>> = HashMap::new();
            for &address in &addresses {
                lines_per_set
                    .entry(level.set_of(address))
                    .or_default()
                    .insert(address / level.line);
            }
            for (slot, &address) in addresses.iter().enumerate() {
                if !served[slot] && lines_per_set[&level.set_of(address)].len() <= level.associativity {
                    latencies[slot] = level.latency;
                    served[slot] = true;
                }
            }
        }

        Ok(latencies.iter().sum::<u64>() / spots as u64)
    }

    fn capacity(&self) -> usize {
        usize::MAX
    }
}

#[test]
fn discovers_simulated_levels() {
    let mut session =
        CalibrationSession::with_probe(CalibrationConfig::default(), SimulatedHierarchy::desktop()).unwrap();

    let report = session.run().unwrap();
    let entities: Vec<CacheEntity> = report.levels().iter().map(|level| level.entity).collect();

    assert_eq!(
        entities,
        vec![
            CacheEntity {
                size: 32 * 1024,
                associativity: 8
            },
            CacheEntity {
                size: 1024 * 1024,
                associativity: 16
            },
        ]
    );
    assert_eq!(report.levels()[0].line_size.bytes(), Some(64));
}

#[test]
fn report_lists_levels_in_order() {
    let mut session =
        CalibrationSession::with_probe(CalibrationConfig::default(), SimulatedHierarchy::desktop()).unwrap();

    let text = session.run().unwrap().to_string();
    let lines: Vec<&str> = text.lines().collect();

    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0], "L1 cache size: 32768, assoc: 8, cache line: 64");
    assert!(lines[1].starts_with("L2 cache size: 1048576, assoc: 16, cache line: "));
}

#[test]
fn repeated_runs_agree() {
    let config = CalibrationConfig::default();
    let first = CalibrationSession::with_probe(config.clone(), SimulatedHierarchy::desktop())
        .unwrap()
        .run()
        .unwrap();
    let second = CalibrationSession::with_probe(config, SimulatedHierarchy::desktop())
        .unwrap()
        .run()
        .unwrap();

    assert_eq!(first, second);
    assert_eq!(first.to_string(), second.to_string());
}

#[test]
fn hardware_scan_completes() {
    let config = CalibrationConfig::new()
        .stride_count(4)
        .max_associativity(4)
        .trial_count(2)
        .hops_per_trial(1_000)
        .line_probe_max_spots(8);

    let mut session = CalibrationSession::new(config).unwrap();
    let report = session.run().unwrap();

    // whatever the host looks like, every level must carry a line size slot
    for level in report.levels() {
        assert!(level.entity.associativity >= 1);
        assert!(level.entity.size >= level.entity.associativity);
    }
}
