//! Running time/volume-weighted price oracle.
//!
//! ## Write path
//!
//! Every successful fill offers the oracle an observation. If less than
//! [`SAMPLE_INTERVAL`] time-units passed since the pair's latest sample the
//! observation is dropped; otherwise a new sample is appended carrying
//! *running cumulative sums*, not raw values:
//!
//! - `cum_price` accumulates `price * elapsed` (time-weighted)
//! - `cum_base` / `cum_quote` accumulate filled volumes
//!
//! Any two samples' sum difference divided by their time/volume span is a
//! windowed average. The buffer is a fixed 120-slot ring per pair: once
//! full, the cursor wraps and the oldest slot is overwritten. Its
//! contribution is already folded into every later sample's running sums
//! (held in u128, which cannot wrap at these magnitudes), so overwriting
//! preserves the running-sum invariant.
//!
//! ## Read path
//!
//! The ring wraps, so one monotonic binary search over the whole array is
//! invalid. `find_index` searches the two monotone halves on either side
//! of the cursor separately and returns whichever half's nearest timestamp
//! is closer to the target. Each half-search is a plain bisection followed
//! by a neighbor comparison, which is provably the arg-min of
//! `|timestamp - target|` within its half.

use std::collections::HashMap;

use crate::error::{MarketError, Result};
use crate::types::price::{isqrt, SCALE};
use crate::types::Pair;

/// Fixed ring capacity per pair.
pub const ORACLE_CAPACITY: usize = 120;

/// Minimum time between samples; fills arriving sooner are not sampled.
pub const SAMPLE_INTERVAL: u64 = 30;

/// One oracle observation: running sums up to `timestamp`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sample {
    /// Cumulative `price * elapsed` since the pair's first sample
    pub cum_price: u128,

    /// Cumulative sampled base-asset (maker sell side) volume
    pub cum_base: u128,

    /// Cumulative sampled quote-asset (maker buy side) volume
    pub cum_quote: u128,

    /// Host timestamp of this sample
    pub timestamp: u64,
}

/// Per-pair ring buffer with a write cursor pointing at the latest sample.
#[derive(Debug, Default)]
struct Ring {
    samples: Vec<Sample>,
    cursor: usize,
}

/// TWAP/VWAP/AWAP oracle over per-pair sample rings.
#[derive(Debug, Default)]
pub struct PriceOracle {
    rings: HashMap<Pair, Ring>,
}

impl PriceOracle {
    /// Create an empty oracle
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Write path
    // ========================================================================

    /// Offer an observation for `pair`.
    ///
    /// `price` is the fill's fixed-point price (`buy * SCALE / sell`);
    /// `base`/`quote` are the filled volumes. Returns true when a sample
    /// was actually appended.
    pub fn record(&mut self, pair: Pair, price: u64, base: u64, quote: u64, now: u64) -> bool {
        let ring = self.rings.entry(pair).or_default();

        if ring.samples.is_empty() {
            // The first sample is the baseline: no elapsed span to weight
            // the price over yet
            ring.samples.push(Sample {
                cum_price: 0,
                cum_base: base as u128,
                cum_quote: quote as u128,
                timestamp: now,
            });
            ring.cursor = 0;
            return true;
        }

        let latest = ring.samples[ring.cursor];
        let elapsed = now.saturating_sub(latest.timestamp);
        if elapsed <= SAMPLE_INTERVAL {
            return false;
        }

        let sample = Sample {
            cum_price: latest.cum_price + (price as u128) * (elapsed as u128),
            cum_base: latest.cum_base + base as u128,
            cum_quote: latest.cum_quote + quote as u128,
            timestamp: now,
        };

        if ring.samples.len() < ORACLE_CAPACITY {
            ring.samples.push(sample);
            ring.cursor = ring.samples.len() - 1;
        } else {
            ring.cursor = (ring.cursor + 1) % ORACLE_CAPACITY;
            ring.samples[ring.cursor] = sample;
        }
        true
    }

    // ========================================================================
    // Read path
    // ========================================================================

    /// Number of samples held for `pair`
    pub fn sample_count(&self, pair: Pair) -> usize {
        self.rings.get(&pair).map_or(0, |r| r.samples.len())
    }

    /// The pair's latest sample
    pub fn latest(&self, pair: Pair) -> Option<Sample> {
        let ring = self.rings.get(&pair)?;
        ring.samples.get(ring.cursor).copied()
    }

    /// Time-weighted average price over the trailing `age` window.
    pub fn twap(&self, pair: Pair, now: u64, age: u64) -> Result<u64> {
        let (past, latest) = self.window(pair, now, age)?;
        let span = (latest.timestamp - past.timestamp) as u128;
        let avg = (latest.cum_price - past.cum_price) / span;
        u64::try_from(avg).map_err(|_| MarketError::Overflow)
    }

    /// Volume-weighted average price over the trailing `age` window.
    pub fn vwap(&self, pair: Pair, now: u64, age: u64) -> Result<u64> {
        let (past, latest) = self.window(pair, now, age)?;
        let base = latest.cum_base - past.cum_base;
        if base == 0 {
            return Err(MarketError::NoOracleHistory);
        }
        let quote = latest.cum_quote - past.cum_quote;
        let avg = quote * (SCALE as u128) / base;
        u64::try_from(avg).map_err(|_| MarketError::Overflow)
    }

    /// Blended average price: pure TWAP at `weight` 0, pure VWAP at
    /// `weight` [`SCALE`], otherwise a weighted geometric blend via integer
    /// square root (the midpoint weight is the exact geometric mean).
    pub fn awap(&self, pair: Pair, now: u64, age: u64, weight: u64) -> Result<u64> {
        if weight == 0 {
            return self.twap(pair, now, age);
        }
        if weight >= SCALE {
            return self.vwap(pair, now, age);
        }

        let twap = self.twap(pair, now, age)? as u128;
        let vwap = self.vwap(pair, now, age)? as u128;

        let twap_part = twap * 2 * ((SCALE - weight) as u128) / (SCALE as u128);
        let vwap_part = vwap * 2 * (weight as u128) / (SCALE as u128);
        let blended = isqrt(twap_part * vwap_part);
        u64::try_from(blended).map_err(|_| MarketError::Overflow)
    }

    /// Resolve the historical sample nearest `now - age` plus the latest
    /// sample; errors when they coincide (no span to average over).
    fn window(&self, pair: Pair, now: u64, age: u64) -> Result<(Sample, Sample)> {
        let ring = self.rings.get(&pair).ok_or(MarketError::NoOracleHistory)?;
        if ring.samples.len() < 2 {
            return Err(MarketError::NoOracleHistory);
        }

        let base_ts = now.saturating_sub(age);
        let idx = Self::find_index(ring, base_ts);
        if idx == ring.cursor {
            return Err(MarketError::NoOracleHistory);
        }
        Ok((ring.samples[idx], ring.samples[ring.cursor]))
    }

    /// Index of the sample whose timestamp is closest to `target`.
    ///
    /// The two monotone halves around the cursor are searched separately;
    /// a single search across the wrap point would not be monotone.
    fn find_index(ring: &Ring, target: u64) -> usize {
        let newer = Self::nearest_in(&ring.samples[..=ring.cursor], 0, target);
        let older = if ring.cursor + 1 < ring.samples.len() {
            Self::nearest_in(&ring.samples[ring.cursor + 1..], ring.cursor + 1, target)
        } else {
            None
        };

        match (newer, older) {
            (Some((ni, nd)), Some((oi, od))) => {
                if od < nd {
                    oi
                } else {
                    ni
                }
            }
            (Some((ni, _)), None) => ni,
            (None, Some((oi, _))) => oi,
            // window() guarantees at least the newer half is non-empty
            (None, None) => ring.cursor,
        }
    }

    /// Bisect a monotone slice for the timestamp nearest `target`,
    /// returning the global index and the absolute difference.
    fn nearest_in(slice: &[Sample], offset: usize, target: u64) -> Option<(usize, u64)> {
        if slice.is_empty() {
            return None;
        }

        let split = slice.partition_point(|s| s.timestamp < target);
        let mut best: Option<(usize, u64)> = None;
        for idx in [split.wrapping_sub(1), split] {
            if let Some(sample) = slice.get(idx) {
                let diff = sample.timestamp.abs_diff(target);
                match best {
                    Some((_, d)) if d <= diff => {}
                    _ => best = Some((offset + idx, diff)),
                }
            }
        }
        best
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
