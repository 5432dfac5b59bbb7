//! One-dimensional elastic constraints.
//!
//! A spring maps a size to a tension through a table of ticks. Each tick is a
//! position plus the range of tensions the spring exerts there; between
//! ticks tension is interpolated linearly. Positive tension pushes the spring
//! to grow, negative tension to shrink, so tension never increases with
//! position.
//!
//! ```text
//! tension
//!   MAX ┤█
//!  PREF ┤█╲
//!     0 ┤   ╲____
//! -PREF ┤        ╲█
//!  -MAX ┤         █
//!       └─┬───┬───┬── position
//!        min pref max
//! ```

use std::fmt;

use crate::error::{Error, Result};

/// Size reported for tensions below the lowest tick.
pub const MAX_SIZE: f64 = 1_000_000.0;
/// Tension at the hard limits of a default spring.
pub const MAX_TENSION: f64 = 1_000_000.0;
/// Tension at the soft limits (min and max) of a default spring.
pub const PREF_TENSION: f64 = 1_000.0;

/// A breakpoint: at `position` the spring exerts any tension in
/// `[min_tension, max_tension]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub position: f64,
    pub min_tension: f64,
    pub max_tension: f64,
}

impl Tick {
    pub fn new(position: f64, min_tension: f64, max_tension: f64) -> Self {
        Self {
            position,
            min_tension,
            max_tension,
        }
    }

    /// A tick with a single tension.
    pub fn point(position: f64, tension: f64) -> Self {
        Self::new(position, tension, tension)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Accumulates ticks for a [`TensionSpring`].
#[derive(Debug, Clone)]
pub struct TensionSpringBuilder {
    min: f64,
    max: f64,
    pref: f64,
    ticks: Vec<Tick>,
}

impl TensionSpringBuilder {
    /// Append a tick. It must lie strictly after the previous tick and exert
    /// no more tension than the previous tick's minimum.
    pub fn with(mut self, position: f64, min_tension: f64, max_tension: f64) -> Result<Self> {
        let tick = Tick::new(position, min_tension, max_tension);
        validate_tick(self.ticks.last(), &tick)?;
        self.ticks.push(tick);
        Ok(self)
    }

    /// Finish the spring. Without explicit ticks, the default table is
    /// derived from min, preferred and max.
    pub fn build(self) -> Result<TensionSpring> {
        if !(self.min.is_finite() && self.pref.is_finite() && self.max.is_finite()) {
            return Err(Error::invalid_constraint("spring bounds must be finite"));
        }
        if self.min < 0.0 || self.min > self.pref || self.pref > self.max {
            return Err(Error::invalid_constraint(format!(
                "spring bounds must satisfy 0 <= min <= pref <= max, got {} / {} / {}",
                self.min, self.pref, self.max
            )));
        }
        let ticks = if self.ticks.is_empty() {
            default_ticks(self.min, self.pref, self.max)
        } else {
            self.ticks
        };
        Ok(TensionSpring {
            min: self.min,
            max: self.max,
            pref: self.pref,
            ticks,
        })
    }
}

fn validate_tick(previous: Option<&Tick>, tick: &Tick) -> Result<()> {
    if !(tick.position.is_finite() && tick.min_tension.is_finite() && tick.max_tension.is_finite()) {
        return Err(Error::invalid_constraint("tick values must be finite"));
    }
    if tick.min_tension > tick.max_tension {
        return Err(Error::invalid_constraint(format!(
            "tick at {}: min tension {} exceeds max tension {}",
            tick.position, tick.min_tension, tick.max_tension
        )));
    }
    if let Some(prev) = previous {
        if tick.position <= prev.position {
            return Err(Error::invalid_constraint(format!(
                "tick positions must increase: {} after {}",
                tick.position, prev.position
            )));
        }
        if tick.max_tension > prev.min_tension {
            return Err(Error::invalid_constraint(format!(
                "tension must not increase with position: {} at {} after {} at {}",
                tick.max_tension, tick.position, prev.min_tension, prev.position
            )));
        }
    }
    Ok(())
}

/// Build a validated tick list, merging ticks that share a position.
fn merge_ticks(points: impl IntoIterator<Item = Tick>) -> Vec<Tick> {
    let mut ticks: Vec<Tick> = Vec::new();
    for tick in points {
        match ticks.last_mut() {
            Some(last) if (tick.position - last.position).abs() <= f64::EPSILON * last.position.abs().max(1.0) => {
                last.min_tension = last.min_tension.min(tick.min_tension);
                last.max_tension = last.max_tension.max(tick.max_tension);
            }
            _ => ticks.push(tick),
        }
    }
    ticks
}

fn default_ticks(min: f64, pref: f64, max: f64) -> Vec<Tick> {
    merge_ticks([
        Tick::new(min, PREF_TENSION, MAX_TENSION),
        Tick::point(pref, 0.0),
        Tick::new(max, -MAX_TENSION, -PREF_TENSION),
    ])
}

// ---------------------------------------------------------------------------
// TensionSpring
// ---------------------------------------------------------------------------

/// An immutable spring.
#[derive(Debug, Clone, PartialEq)]
pub struct TensionSpring {
    min: f64,
    max: f64,
    pref: f64,
    ticks: Vec<Tick>,
}

impl TensionSpring {
    /// Start a spring with the given bounds.
    pub fn build(min: f64, max: f64, pref: f64) -> TensionSpringBuilder {
        TensionSpringBuilder {
            min,
            max,
            pref,
            ticks: Vec::new(),
        }
    }

    /// A spring that resists any size but `size` with maximum tension.
    pub fn fixed(size: f64) -> Result<Self> {
        TensionSpring::build(size, size, size)
            .with(size, -MAX_TENSION, MAX_TENSION)?
            .build()
    }

    /// A spring from an already merged, ordered tick table.
    pub(crate) fn from_ticks(min: f64, max: f64, pref: f64, ticks: Vec<Tick>) -> Result<Self> {
        let mut builder = TensionSpring::build(min, max, pref);
        for tick in ticks {
            builder = builder.with(tick.position, tick.min_tension, tick.max_tension)?;
        }
        if builder.ticks.is_empty() {
            return Err(Error::invalid_constraint("a spring needs at least one tick"));
        }
        builder.build()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn pref(&self) -> f64 {
        self.pref
    }

    /// How far the spring can stretch past its minimum.
    pub fn flexibility(&self) -> f64 {
        (self.max.min(MAX_SIZE) - self.min).max(0.0)
    }

    pub fn ticks(&self) -> TickIterator<'_> {
        TickIterator {
            ticks: &self.ticks,
            next: 0,
        }
    }

    pub fn get_size(&self, tension: f64) -> f64 {
        self.ticks().get_size(tension)
    }

    pub fn get_tension(&self, position: f64) -> f64 {
        self.ticks().get_tension(position)
    }
}

impl fmt::Display for TensionSpring {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spring({} <= {} <= {})", self.min, self.pref, self.max)
    }
}

// ---------------------------------------------------------------------------
// TickIterator
// ---------------------------------------------------------------------------

/// Iterates a spring's ticks and answers size/tension queries over them.
#[derive(Debug, Clone)]
pub struct TickIterator<'a> {
    ticks: &'a [Tick],
    next: usize,
}

impl Iterator for TickIterator<'_> {
    type Item = Tick;

    fn next(&mut self) -> Option<Tick> {
        let tick = self.ticks.get(self.next).copied()?;
        self.next += 1;
        Some(tick)
    }
}

impl TickIterator<'_> {
    /// The highest tension in the table.
    pub fn highest(&self) -> f64 {
        self.ticks.first().map_or(0.0, |t| t.max_tension)
    }

    /// The lowest tension in the table.
    pub fn lowest(&self) -> f64 {
        self.ticks.last().map_or(0.0, |t| t.min_tension)
    }

    /// The smallest position exerting `tension`. Tensions above the table
    /// give 0, tensions below it give [`MAX_SIZE`], NaN gives NaN.
    pub fn get_size(&self, tension: f64) -> f64 {
        self.size_range(tension).0
    }

    /// The smallest and largest positions exerting `tension`. The two differ
    /// only on segments of constant tension.
    pub fn size_range(&self, tension: f64) -> (f64, f64) {
        if tension.is_nan() {
            return (f64::NAN, f64::NAN);
        }
        if self.ticks.is_empty() || tension > self.highest() {
            return (0.0, 0.0);
        }
        if tension < self.lowest() {
            return (MAX_SIZE, MAX_SIZE);
        }
        let mut low = f64::INFINITY;
        let mut high = f64::NEG_INFINITY;
        let mut include = |p: f64| {
            low = low.min(p);
            high = high.max(p);
        };
        for (i, tick) in self.ticks.iter().enumerate() {
            if tick.min_tension <= tension && tension <= tick.max_tension {
                include(tick.position);
            }
            let Some(next) = self.ticks.get(i + 1) else {
                break;
            };
            let (a, b) = (tick.min_tension, next.max_tension);
            if a == b && a == tension {
                include(tick.position);
                include(next.position);
            } else if b < tension && tension < a {
                let fraction = (a - tension) / (a - b);
                include(tick.position + fraction * (next.position - tick.position));
            }
        }
        (low, high)
    }

    /// Tension at `position`: the maximum tension at a tick, linear in
    /// between, and extrapolated with the nearest segment's slope outside the
    /// table. A single-tick table is a step. NaN gives NaN.
    pub fn get_tension(&self, position: f64) -> f64 {
        if position.is_nan() {
            return f64::NAN;
        }
        let ticks = self.ticks;
        let (Some(first), Some(last)) = (ticks.first(), ticks.last()) else {
            return 0.0;
        };
        if position <= first.position {
            if position == first.position || ticks.len() == 1 {
                return first.max_tension;
            }
            let second = ticks[1];
            let slope = segment_slope(first, &second);
            return first.max_tension + slope * (position - first.position);
        }
        if position > last.position {
            if ticks.len() == 1 {
                return last.min_tension;
            }
            let before = ticks[ticks.len() - 2];
            let slope = segment_slope(&before, last);
            return last.min_tension + slope * (position - last.position);
        }
        // first.position < position <= last.position
        let i = ticks.partition_point(|t| t.position < position);
        let tick = ticks[i];
        if tick.position == position {
            return tick.max_tension;
        }
        let prev = ticks[i - 1];
        let fraction = (position - prev.position) / (tick.position - prev.position);
        prev.min_tension + fraction * (tick.max_tension - prev.min_tension)
    }
}

fn segment_slope(from: &Tick, to: &Tick) -> f64 {
    (to.max_tension - from.min_tension) / (to.position - from.position)
}

// ---------------------------------------------------------------------------
// Composition
// ---------------------------------------------------------------------------

/// Springs placed end to end: sizes add at equal tension.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSpring {
    components: Vec<TensionSpring>,
    combined: TensionSpring,
}

impl SeriesSpring {
    pub fn new(components: Vec<TensionSpring>) -> Result<Self> {
        if components.is_empty() {
            return Err(Error::invalid_constraint("a series needs at least one spring"));
        }
        let mut tensions: Vec<f64> = components
            .iter()
            .flat_map(|s| s.ticks().flat_map(|t| [t.min_tension, t.max_tension]))
            .collect();
        tensions.sort_by(|a, b| b.total_cmp(a));
        tensions.dedup();

        let mut points = Vec::new();
        for &tension in &tensions {
            let (low, high) = components.iter().fold((0.0, 0.0), |(lo, hi), s| {
                let (l, h) = s.ticks().size_range(tension);
                (lo + l, hi + h)
            });
            points.push(Tick::point(low.min(MAX_SIZE), tension));
            if high > low {
                points.push(Tick::point(high.min(MAX_SIZE), tension));
            }
        }

        let sum = |f: fn(&TensionSpring) -> f64| components.iter().map(f).sum::<f64>().min(MAX_SIZE);
        let combined = TensionSpring::from_ticks(
            sum(TensionSpring::min),
            sum(TensionSpring::max),
            sum(TensionSpring::pref),
            merge_ticks(points),
        )?;
        Ok(Self {
            components,
            combined,
        })
    }

    pub fn components(&self) -> &[TensionSpring] {
        &self.components
    }

    /// The series as a single spring.
    pub fn spring(&self) -> &TensionSpring {
        &self.combined
    }

    /// Split `total` among the components at a common tension. Slack on
    /// constant-tension segments is handed out in component order. A NaN
    /// total is treated as 0.
    pub fn distribute(&self, total: f64) -> Vec<f64> {
        let total = if total.is_nan() { 0.0 } else { total.clamp(0.0, MAX_SIZE) };
        let tension = self.balance_tension(total);
        let ranges: Vec<(f64, f64)> = self
            .components
            .iter()
            .map(|s| s.ticks().size_range(tension))
            .collect();
        let mut sizes: Vec<f64> = ranges.iter().map(|(low, _)| *low).collect();
        let mut remainder = total - sizes.iter().sum::<f64>();
        for (size, (low, high)) in sizes.iter_mut().zip(&ranges) {
            if remainder <= 0.0 {
                break;
            }
            let grow = remainder.min(high - low);
            *size += grow;
            remainder -= grow;
        }
        // Rounding residue goes to the first component.
        if remainder.abs() > 0.0 {
            if let Some(first) = sizes.first_mut() {
                *first = (*first + remainder).max(0.0);
            }
        }
        sizes
    }

    /// The tension at which the components' combined size reaches `total`.
    fn balance_tension(&self, total: f64) -> f64 {
        let summed = |tension: f64| -> (f64, f64) {
            self.components.iter().fold((0.0, 0.0), |(lo, hi), s| {
                let (l, h) = s.ticks().size_range(tension);
                (lo + l, hi + h)
            })
        };
        let contains = |tension: f64| {
            let (low, high) = summed(tension);
            low <= total && total <= high
        };
        // Constant-tension segments are only reachable at a tick's tension.
        if let Some(tension) = self
            .combined
            .ticks()
            .flat_map(|t| [t.max_tension, t.min_tension])
            .find(|&t| contains(t))
        {
            return tension;
        }
        // Size is non-increasing in tension: find t with low(t) <= total <= high(t).
        let mut hi_t = self.combined.ticks().highest();
        let mut lo_t = self.combined.ticks().lowest();
        for _ in 0..200 {
            let mid = lo_t + (hi_t - lo_t) / 2.0;
            if mid == lo_t || mid == hi_t {
                break;
            }
            let (low, high) = summed(mid);
            if low > total {
                lo_t = mid;
            } else if high < total {
                hi_t = mid;
            } else {
                return mid;
            }
        }
        let miss = |tension: f64| {
            let (low, high) = summed(tension);
            (low - total).max(total - high).max(0.0)
        };
        if miss(hi_t) <= miss(lo_t) {
            hi_t
        } else {
            lo_t
        }
    }
}

/// Springs spanning the same interval: tensions add at equal size.
#[derive(Debug, Clone, PartialEq)]
pub struct ParallelSpring {
    components: Vec<TensionSpring>,
    combined: TensionSpring,
}

impl ParallelSpring {
    pub fn new(components: Vec<TensionSpring>) -> Result<Self> {
        if components.is_empty() {
            return Err(Error::invalid_constraint("a parallel group needs at least one spring"));
        }
        let min = components.iter().map(TensionSpring::min).fold(0.0, f64::max);
        let max = components.iter().map(TensionSpring::max).fold(MAX_SIZE, f64::min);
        if min > max {
            return Err(Error::invalid_constraint(format!(
                "parallel springs cannot agree on a size: min {min} exceeds max {max}"
            )));
        }

        let mut positions: Vec<f64> = components
            .iter()
            .flat_map(|s| s.ticks().map(|t| t.position))
            .collect();
        positions.sort_by(f64::total_cmp);
        positions.dedup();

        let ticks: Vec<Tick> = positions
            .into_iter()
            .map(|p| {
                let (lo, hi) = components.iter().fold((0.0, 0.0), |(lo, hi), s| {
                    let (l, h) = tension_range(s, p);
                    (lo + l, hi + h)
                });
                Tick::new(p, lo, hi)
            })
            .collect();

        let probe = TickIterator {
            ticks: &ticks,
            next: 0,
        };
        let pref = probe.get_size(0.0).clamp(min, max);
        let combined = TensionSpring::from_ticks(min, max, pref, ticks)?;
        Ok(Self {
            components,
            combined,
        })
    }

    pub fn components(&self) -> &[TensionSpring] {
        &self.components
    }

    /// The group as a single spring.
    pub fn spring(&self) -> &TensionSpring {
        &self.combined
    }
}

/// Range of tensions a spring exerts at `position`.
fn tension_range(spring: &TensionSpring, position: f64) -> (f64, f64) {
    match spring.ticks().find(|t| t.position == position) {
        Some(tick) => (tick.min_tension, tick.max_tension),
        None => {
            let t = spring.get_tension(position);
            (t, t)
        }
    }
}
