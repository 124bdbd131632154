//! Deterministic, constraint-aware city sampler.
//!
//! Picks a diverse subset of the reference pool: a per-region quota first,
//! then a shuffled fill, then a bounded repair pass that swaps ordinary
//! mid-latitude picks for southern and high-latitude cities. If no attempt
//! satisfies the hemisphere/latitude minimums within the attempt cap, the
//! last attempt is accepted as-is and reported as `AcceptedUnmet`.

use crate::cities::{CityPool, CityRecord, Region};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};

/// Default attempt cap for the select-and-repair loop.
pub const DEFAULT_MAX_ATTEMPTS: usize = 200;

/// Fixed per-run selection constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConstraints {
    pub target_count: usize,
    pub min_per_region: usize,
    /// Minimum cities with latitude < 0.
    pub min_southern: usize,
    /// Minimum cities with |latitude| > `high_latitude`.
    pub min_above_55: usize,
    pub high_latitude: f64,
}

impl Default for SelectionConstraints {
    fn default() -> Self {
        Self {
            target_count: 30,
            min_per_region: 4,
            min_southern: 6,
            min_above_55: 6,
            high_latitude: 55.0,
        }
    }
}

/// How the selection loop terminated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SelectionOutcome {
    Satisfied { attempts: usize },
    /// Attempt cap reached; the last attempt is returned unmodified.
    AcceptedUnmet { attempts: usize, southern: usize, high_latitude: usize },
}

/// An ordered, duplicate-free city sample.
#[derive(Debug, Clone)]
pub struct Selection {
    pub cities: Vec<CityRecord>,
    pub outcome: SelectionOutcome,
}

impl Selection {
    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    pub fn southern_count(&self) -> usize {
        southern_count(&self.cities)
    }

    pub fn high_latitude_count(&self, threshold: f64) -> usize {
        high_latitude_count(&self.cities, threshold)
    }

    pub fn region_counts(&self) -> BTreeMap<Region, usize> {
        let mut counts = BTreeMap::new();
        for city in &self.cities {
            *counts.entry(city.region).or_insert(0) += 1;
        }
        counts
    }
}

/// Derive a 32-bit seed from a seed string: SHA-256, low 32 bits of the
/// big-endian digest value.
pub fn seed_from_str(seed: &str) -> u32 {
    let digest = Sha256::digest(seed.as_bytes());
    u32::from_be_bytes([digest[28], digest[29], digest[30], digest[31]])
}

/// Sample `n` cities from `pool` with the default constraints.
pub fn select(pool: &CityPool, n: usize, seed: u32) -> Selection {
    let constraints = SelectionConstraints { target_count: n, ..SelectionConstraints::default() };
    Selector::new(constraints).select(pool, seed)
}

/// The sampler.
#[derive(Debug, Clone)]
pub struct Selector {
    constraints: SelectionConstraints,
    max_attempts: usize,
}

impl Selector {
    pub fn new(constraints: SelectionConstraints) -> Self {
        Self { constraints, max_attempts: DEFAULT_MAX_ATTEMPTS }
    }

    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub fn constraints(&self) -> &SelectionConstraints {
        &self.constraints
    }

    pub fn select(&self, pool: &CityPool, seed: u32) -> Selection {
        let mut rng = ChaCha8Rng::seed_from_u64(u64::from(seed));
        let groups = pool.by_region();
        let n = self.constraints.target_count;

        let mut selected = Vec::new();
        for attempt in 1..=self.max_attempts {
            selected = self.draw(pool, &groups, &mut rng);
            if self.satisfied(&selected) {
                selected.truncate(n);
                return Selection { cities: selected, outcome: SelectionOutcome::Satisfied { attempts: attempt } };
            }

            self.repair(pool, &mut selected, &mut rng);
            if self.satisfied(&selected) {
                selected.truncate(n);
                return Selection { cities: selected, outcome: SelectionOutcome::Satisfied { attempts: attempt } };
            }
            log::debug!("selection attempt {} left constraints unmet", attempt);
        }

        selected.truncate(n);
        let outcome = SelectionOutcome::AcceptedUnmet {
            attempts: self.max_attempts,
            southern: southern_count(&selected),
            high_latitude: high_latitude_count(&selected, self.constraints.high_latitude),
        };
        log::warn!("selection constraints unmet after {} attempts; accepting last attempt", self.max_attempts);
        Selection { cities: selected, outcome }
    }

    /// Region quota, then shuffled fill up to the target count.
    fn draw(
        &self,
        pool: &CityPool,
        groups: &BTreeMap<Region, Vec<&CityRecord>>,
        rng: &mut ChaCha8Rng,
    ) -> Vec<CityRecord> {
        let n = self.constraints.target_count;
        let mut selected: Vec<CityRecord> = Vec::with_capacity(n);
        let mut used: HashSet<String> = HashSet::new();

        for region in Region::ALL {
            let Some(candidates) = groups.get(&region) else { continue };
            let take = self.constraints.min_per_region.min(candidates.len());
            for city in candidates.choose_multiple(rng, take) {
                if used.insert(city.name.clone()) {
                    selected.push((*city).clone());
                }
            }
        }

        let mut remaining: Vec<&CityRecord> = pool
            .cities()
            .iter()
            .filter(|c| !used.contains(&c.name))
            .collect();
        remaining.shuffle(rng);
        for city in remaining {
            if selected.len() >= n {
                break;
            }
            used.insert(city.name.clone());
            selected.push(city.clone());
        }

        selected
    }

    /// Swap ordinary northern mid-latitude picks for extreme ones:
    /// southern first, then high latitude.
    fn repair(&self, pool: &CityPool, selected: &mut [CityRecord], rng: &mut ChaCha8Rng) {
        let c = &self.constraints;

        let mut southern = southern_count(selected);
        if southern < c.min_southern {
            let used = names(selected);
            let mut candidates: Vec<&CityRecord> = pool
                .cities()
                .iter()
                .filter(|city| city.is_southern() && !used.contains(city.name.as_str()))
                .collect();
            candidates.shuffle(rng);
            let mut replaceable = self.replaceable(selected);
            for candidate in candidates {
                if southern >= c.min_southern {
                    break;
                }
                let Some(idx) = replaceable.pop() else { break };
                selected[idx] = candidate.clone();
                southern += 1;
            }
        }

        let mut high = high_latitude_count(selected, c.high_latitude);
        if high < c.min_above_55 {
            let used = names(selected);
            let mut candidates: Vec<&CityRecord> = pool
                .cities()
                .iter()
                .filter(|city| city.is_high_latitude(c.high_latitude) && !used.contains(city.name.as_str()))
                .collect();
            candidates.shuffle(rng);
            let mut replaceable = self.replaceable(selected);
            for candidate in candidates {
                if high >= c.min_above_55 {
                    break;
                }
                let Some(idx) = replaceable.pop() else { break };
                selected[idx] = candidate.clone();
                high += 1;
            }
        }
    }

    /// Indices of picks that are neither southern nor high-latitude.
    fn replaceable(&self, selected: &[CityRecord]) -> Vec<usize> {
        selected
            .iter()
            .enumerate()
            .filter(|(_, c)| c.latitude > 0.0 && c.latitude < self.constraints.high_latitude)
            .map(|(i, _)| i)
            .collect()
    }

    fn satisfied(&self, selected: &[CityRecord]) -> bool {
        southern_count(selected) >= self.constraints.min_southern
            && high_latitude_count(selected, self.constraints.high_latitude) >= self.constraints.min_above_55
    }
}

fn names(cities: &[CityRecord]) -> HashSet<&str> {
    cities.iter().map(|c| c.name.as_str()).collect()
}

fn southern_count(cities: &[CityRecord]) -> usize {
    cities.iter().filter(|c| c.is_southern()).count()
}

fn high_latitude_count(cities: &[CityRecord], threshold: f64) -> usize {
    cities.iter().filter(|c| c.is_high_latitude(threshold)).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names_of(selection: &Selection) -> Vec<String> {
        selection.cities.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn test_seed_from_str_low_32_bits() {
        assert_eq!(seed_from_str("polaris"), 1_574_162_625);
        assert_eq!(seed_from_str("2026-02-14polaris"), 4_007_393_548);
    }

    #[test]
    fn test_select_deterministic() {
        let pool = CityPool::builtin();
        let a = select(&pool, 30, 12345);
        let b = select(&pool, 30, 12345);
        assert_eq!(names_of(&a), names_of(&b));
        assert_eq!(a.outcome, b.outcome);
    }

    #[test]
    fn test_different_seeds_differ() {
        let pool = CityPool::builtin();
        let a = select(&pool, 30, 1);
        let b = select(&pool, 30, 2);
        assert_ne!(names_of(&a), names_of(&b));
    }

    #[test]
    fn test_selection_length_and_unique() {
        let pool = CityPool::builtin();
        for seed in [0, 7, 42, seed_from_str("2026-10-15polaris")] {
            let sel = select(&pool, 30, seed);
            assert_eq!(sel.len(), 30);
            let unique: HashSet<_> = sel.cities.iter().map(|c| &c.name).collect();
            assert_eq!(unique.len(), 30, "duplicate city names for seed {}", seed);
        }
    }

    #[test]
    fn test_builtin_pool_meets_constraints() {
        let pool = CityPool::builtin();
        let sel = select(&pool, 30, 99);
        assert!(matches!(sel.outcome, SelectionOutcome::Satisfied { .. }));
        assert!(sel.southern_count() >= 6);
        assert!(sel.high_latitude_count(55.0) >= 6);
    }

    #[test]
    fn test_region_quota_before_fill() {
        let pool = CityPool::builtin();
        let constraints = SelectionConstraints {
            target_count: 30,
            min_southern: 0,
            min_above_55: 0,
            ..SelectionConstraints::default()
        };
        let sel = Selector::new(constraints).select(&pool, 5);
        let counts = sel.region_counts();
        for region in Region::ALL {
            assert!(counts.get(&region).copied().unwrap_or(0) >= 4, "{} under quota", region);
        }
        assert_eq!(sel.outcome, SelectionOutcome::Satisfied { attempts: 1 });
    }

    #[test]
    fn test_unsatisfiable_returns_last_attempt() {
        // No southern cities at all: the minimum can never be met.
        let pool = CityPool::from_records(
            (0..40)
                .map(|i| CityRecord::new(format!("North {}", i), Region::ALL[i % 6], 10.0 + i as f64))
                .collect(),
        );
        let constraints = SelectionConstraints { target_count: 20, ..SelectionConstraints::default() };
        let sel = Selector::new(constraints).with_max_attempts(5).select(&pool, 3);
        assert_eq!(sel.len(), 20);
        match sel.outcome {
            SelectionOutcome::AcceptedUnmet { attempts, southern, .. } => {
                assert_eq!(attempts, 5);
                assert_eq!(southern, 0);
            }
            other => panic!("expected AcceptedUnmet, got {:?}", other),
        }
    }

    #[test]
    fn test_small_pool_returns_everything() {
        let pool = CityPool::from_records(vec![
            CityRecord::new("A", Region::Europe, 60.0),
            CityRecord::new("B", Region::Oceania, -30.0),
        ]);
        let constraints = SelectionConstraints {
            target_count: 5,
            min_southern: 1,
            min_above_55: 1,
            ..SelectionConstraints::default()
        };
        let sel = Selector::new(constraints).select(&pool, 1);
        assert_eq!(sel.len(), 2);
        assert!(matches!(sel.outcome, SelectionOutcome::Satisfied { .. }));
    }
}
