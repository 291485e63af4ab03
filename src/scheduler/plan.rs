//! Randomized cycle plans
//!
//! A plan spreads `item_count` slots irregularly across one window: random
//! cut points split the window into gaps, the gaps are rounded to whole
//! minutes (at least one each) and the last gap absorbs the rounding
//! remainder so the plan always sums to the window length.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, warn};

/// Ordered waits (minutes) for one window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CyclePlan {
    intervals: Vec<u32>,
}

impl CyclePlan {
    /// Planned waits in slot order
    pub fn intervals(&self) -> &[u32] {
        &self.intervals
    }

    /// Number of slots
    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    /// Whether the plan has no slots
    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    /// Sum of all waits
    pub fn total_minutes(&self) -> u32 {
        self.intervals.iter().sum()
    }
}

/// Split `window_minutes` into `item_count` irregular whole-minute waits
///
/// Every wait is at least one minute and the waits sum to `window_minutes`.
/// Fewer than two items yield the whole window as a single wait. Counts above
/// the window length are capped, one minute per slot.
pub fn plan<R: Rng + ?Sized>(item_count: u32, window_minutes: u32, rng: &mut R) -> Vec<u32> {
    if item_count < 2 || window_minutes < 2 {
        return vec![window_minutes];
    }

    let count = if item_count > window_minutes {
        warn!(item_count, window_minutes, "More slots than minutes, capping");
        window_minutes
    } else {
        item_count
    };

    let window = f64::from(window_minutes);
    let mut points: Vec<f64> = (1..count).map(|_| rng.gen_range(0.0..=window)).collect();
    points.sort_by(f64::total_cmp);

    let mut bounds = Vec::with_capacity(points.len() + 2);
    bounds.push(0.0);
    bounds.extend(points);
    bounds.push(window);

    let mut intervals: Vec<i64> = bounds
        .windows(2)
        .map(|w| ((w[1] - w[0]).round() as i64).max(1))
        .collect();

    let sum: i64 = intervals.iter().sum();
    let last = intervals.len() - 1;
    intervals[last] += i64::from(window_minutes) - sum;

    // Raising short gaps to one minute can push the last gap below one;
    // borrow the missing minutes from the longest gaps.
    while intervals[last] < 1 {
        let donor = (0..last)
            .filter(|&i| intervals[i] > 1)
            .max_by_key(|&i| intervals[i]);
        match donor {
            Some(i) => {
                intervals[i] -= 1;
                intervals[last] += 1;
            }
            None => break,
        }
    }

    intervals.into_iter().map(|m| m.max(1) as u32).collect()
}

/// Produces successive plans from one random stream
#[derive(Debug, Clone)]
pub struct CyclePlanner {
    item_count: u32,
    window_minutes: u32,
    rng: ChaCha8Rng,
}

impl CyclePlanner {
    /// Planner seeded from `seed`, or from OS entropy when absent
    pub fn new(item_count: u32, window_minutes: u32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            item_count,
            window_minutes,
            rng,
        }
    }

    /// Generate the next plan
    pub fn next_plan(&mut self) -> CyclePlan {
        let intervals = plan(self.item_count, self.window_minutes, &mut self.rng);
        debug!(?intervals, "Cycle plan generated");
        CyclePlan { intervals }
    }
}
