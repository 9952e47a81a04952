//! Date-time indices: the shared calendar every series in a collection is
//! aligned to.
//!
//! Two representations implement the same [`TimeIndex`] capability set:
//!
//! * [`UniformIndex`] is `start + frequency * i` for `i in 0..periods`, stored
//!   compactly and looked up in O(1).
//! * [`IrregularIndex`] is an explicit strictly increasing list, looked up by
//!   binary search.
//!
//! [`DateTimeIndex`] is the sum of the two. Equality compares the enumerated
//! timestamps, so a uniform index and an irregular index listing the same
//! instants are equal. Every operation returns a new index; nothing mutates an
//! existing one.

use std::collections::BTreeSet;
use std::ops::Range;
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::frequency::Frequency;
use crate::utils::{format_timestamp, parse_timestamp};
use crate::Timestamp;

/// Position lookup and ordered access shared by every index representation.
pub trait TimeIndex {
    /// Number of positions.
    fn size(&self) -> usize;

    /// Timestamp at `position`, `None` past the end.
    fn timestamp_at(&self, position: usize) -> Option<Timestamp>;

    /// Position holding exactly `t`, `None` when `t` is not in the index.
    fn position_of(&self, t: Timestamp) -> Option<usize>;

    /// First position whose timestamp is `>= t` (`size()` if none).
    fn lower_bound(&self, t: Timestamp) -> usize;

    /// First position whose timestamp is `> t` (`size()` if none).
    fn upper_bound(&self, t: Timestamp) -> usize;

    fn is_empty(&self) -> bool {
        self.size() == 0
    }

    fn first(&self) -> Option<Timestamp> {
        self.timestamp_at(0)
    }

    fn last(&self) -> Option<Timestamp> {
        self.size().checked_sub(1).and_then(|i| self.timestamp_at(i))
    }
}

// `slice::partition_point` over positions 0..len; a uniform index has no
// backing slice to search.
fn partition_point(len: usize, before: impl Fn(usize) -> bool) -> usize {
    let (mut lo, mut hi) = (0, len);
    while lo < hi {
        let mid = lo + (hi - lo) / 2;
        if before(mid) {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    lo
}

/// Fixed-step calendar: `start`, `start + 1 step`, ... (`periods` entries).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UniformIndex {
    start: Timestamp,
    periods: usize,
    frequency: Frequency,
}

impl UniformIndex {
    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn periods(&self) -> usize {
        self.periods
    }

    pub fn frequency(&self) -> &Frequency {
        &self.frequency
    }

    fn at(&self, position: usize) -> Timestamp {
        self.frequency.advance(self.start, position as i64)
    }
}

impl TimeIndex for UniformIndex {
    fn size(&self) -> usize {
        self.periods
    }

    fn timestamp_at(&self, position: usize) -> Option<Timestamp> {
        (position < self.periods).then(|| self.at(position))
    }

    fn position_of(&self, t: Timestamp) -> Option<usize> {
        let n = self.frequency.difference(self.start, t)?;
        usize::try_from(n).ok().filter(|&n| n < self.periods)
    }

    fn lower_bound(&self, t: Timestamp) -> usize {
        partition_point(self.periods, |i| self.at(i) < t)
    }

    fn upper_bound(&self, t: Timestamp) -> usize {
        partition_point(self.periods, |i| self.at(i) <= t)
    }
}

/// Explicit, strictly increasing list of timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "Vec<Timestamp>", into = "Vec<Timestamp>")]
pub struct IrregularIndex {
    instants: Vec<Timestamp>,
}

impl IrregularIndex {
    pub fn instants(&self) -> &[Timestamp] {
        &self.instants
    }
}

impl TryFrom<Vec<Timestamp>> for IrregularIndex {
    type Error = Error;

    /// Accepts an already strictly increasing list; does not sort.
    fn try_from(instants: Vec<Timestamp>) -> Result<Self> {
        if let Some(pair) = instants.windows(2).find(|w| w[0] >= w[1]) {
            return Err(Error::InvalidRange(format!(
                "irregular index is not strictly increasing at {}",
                format_timestamp(&pair[1])
            )));
        }
        Ok(Self { instants })
    }
}

impl From<IrregularIndex> for Vec<Timestamp> {
    fn from(index: IrregularIndex) -> Self {
        index.instants
    }
}

impl TimeIndex for IrregularIndex {
    fn size(&self) -> usize {
        self.instants.len()
    }

    fn timestamp_at(&self, position: usize) -> Option<Timestamp> {
        self.instants.get(position).copied()
    }

    fn position_of(&self, t: Timestamp) -> Option<usize> {
        self.instants.binary_search(&t).ok()
    }

    fn lower_bound(&self, t: Timestamp) -> usize {
        self.instants.partition_point(|x| *x < t)
    }

    fn upper_bound(&self, t: Timestamp) -> usize {
        self.instants.partition_point(|x| *x <= t)
    }
}

/// The shared calendar of a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DateTimeIndex {
    Uniform(UniformIndex),
    Irregular(IrregularIndex),
}

impl DateTimeIndex {
    /// Builds a uniform index of `count` steps from `start`.
    ///
    /// # Errors
    /// * [`Error::InvalidRange`] if `count` is negative, or if the last
    ///   timestamp falls outside the representable date range.
    pub fn uniform(start: Timestamp, count: i64, frequency: Frequency) -> Result<Self> {
        let periods = usize::try_from(count)
            .map_err(|_| Error::InvalidRange(format!("index count must be >= 0, got {count}")))?;
        if count > 0 && frequency.checked_advance(start, count - 1).is_none() {
            return Err(Error::InvalidRange(format!(
                "{count} steps of {frequency} from {} overflow the date range",
                format_timestamp(&start)
            )));
        }
        Ok(Self::Uniform(UniformIndex {
            start,
            periods,
            frequency,
        }))
    }

    /// Builds an irregular index, sorting and dropping exact duplicates.
    ///
    /// # Errors
    /// * [`Error::EmptyIndex`] if no timestamps remain.
    pub fn irregular<I: IntoIterator<Item = Timestamp>>(timestamps: I) -> Result<Self> {
        let instants: BTreeSet<Timestamp> = timestamps.into_iter().collect();
        if instants.is_empty() {
            return Err(Error::EmptyIndex);
        }
        Ok(Self::Irregular(IrregularIndex {
            instants: instants.into_iter().collect(),
        }))
    }

    fn from_sorted(instants: Vec<Timestamp>) -> Self {
        Self::Irregular(IrregularIndex { instants })
    }

    pub fn is_uniform(&self) -> bool {
        matches!(self, Self::Uniform(_))
    }

    /// Timestamps in position order.
    pub fn iter(&self) -> Instants<'_> {
        match self {
            Self::Uniform(u) => Instants::Uniform {
                frequency: &u.frequency,
                next: u.start,
                remaining: u.periods,
            },
            Self::Irregular(i) => Instants::Irregular(i.instants.iter()),
        }
    }

    pub fn to_vec(&self) -> Vec<Timestamp> {
        self.iter().collect()
    }

    /// The same timestamps as an explicit list.
    pub fn to_irregular(&self) -> Self {
        match self {
            Self::Irregular(_) => self.clone(),
            Self::Uniform(_) => Self::from_sorted(self.to_vec()),
        }
    }

    /// Positions kept by [`slice_by_date`](Self::slice_by_date).
    ///
    /// `from > to` is a valid, empty range rather than an error.
    pub fn slice_positions_by_date(&self, from: Timestamp, to: Timestamp) -> Range<usize> {
        let lo = self.lower_bound(from);
        if from > to {
            return lo..lo;
        }
        lo..self.upper_bound(to).max(lo)
    }

    /// Timestamps within `[from, to]`, inclusive on both ends.
    ///
    /// A uniform source stays uniform; an irregular source stays irregular.
    pub fn slice_by_date(&self, from: Timestamp, to: Timestamp) -> Self {
        self.sub_range(self.slice_positions_by_date(from, to))
    }

    /// Timestamps at positions `range`.
    ///
    /// # Errors
    /// * [`Error::InvalidRange`] if the range is reversed or exceeds the index.
    pub fn slice_by_positions(&self, range: Range<usize>) -> Result<Self> {
        if range.start > range.end || range.end > self.size() {
            return Err(Error::InvalidRange(format!(
                "positions {}..{} outside index of size {}",
                range.start,
                range.end,
                self.size()
            )));
        }
        Ok(self.sub_range(range))
    }

    pub(crate) fn sub_range(&self, range: Range<usize>) -> Self {
        match self {
            Self::Uniform(u) => Self::Uniform(UniformIndex {
                start: u.at(range.start),
                periods: range.end - range.start,
                frequency: u.frequency.clone(),
            }),
            Self::Irregular(i) => Self::from_sorted(i.instants[range].to_vec()),
        }
    }

    /// Irregular index listing the timestamps at the kept positions.
    ///
    /// # Errors
    /// * [`Error::InvalidRange`] if a position is outside the index.
    pub fn filter_by_positions(&self, keep: &BTreeSet<usize>) -> Result<Self> {
        self.check_positions(keep.last().copied())?;
        Ok(Self::from_sorted(self.gather(keep.iter().copied())))
    }

    /// Like [`filter_by_positions`](Self::filter_by_positions) for a strictly
    /// increasing position list, but keeps a uniform index uniform when the
    /// positions are evenly spaced.
    pub fn select_positions(&self, positions: &[usize]) -> Result<Self> {
        if positions.windows(2).any(|w| w[0] >= w[1]) {
            return Err(Error::InvalidRange("positions must be strictly increasing".into()));
        }
        self.check_positions(positions.last().copied())?;
        Ok(self.select_sorted(positions))
    }

    // Positions must be strictly increasing and in range.
    pub(crate) fn select_sorted(&self, positions: &[usize]) -> Self {
        if let (Self::Uniform(u), Some(&first)) = (self, positions.first()) {
            let stride = positions.get(1).map_or(1, |second| second - first);
            let even = positions.windows(2).all(|w| w[1] - w[0] == stride);
            if let Some(frequency) = even.then(|| u.frequency.checked_mul(stride)).flatten() {
                return Self::Uniform(UniformIndex {
                    start: u.at(first),
                    periods: positions.len(),
                    frequency,
                });
            }
        }
        Self::from_sorted(self.gather(positions.iter().copied()))
    }

    fn check_positions(&self, max: Option<usize>) -> Result<()> {
        match max {
            Some(p) if p >= self.size() => Err(Error::InvalidRange(format!(
                "position {p} outside index of size {}",
                self.size()
            ))),
            _ => Ok(()),
        }
    }

    fn gather(&self, positions: impl Iterator<Item = usize>) -> Vec<Timestamp> {
        match self {
            Self::Irregular(i) => positions.map(|p| i.instants[p]).collect(),
            Self::Uniform(_) => {
                let all = self.to_vec();
                positions.map(|p| all[p]).collect()
            }
        }
    }

    /// All timestamps of both indices.
    pub fn union(&self, other: &Self) -> Self {
        if self == other {
            return self.clone();
        }
        let merged: BTreeSet<Timestamp> = self.iter().chain(other.iter()).collect();
        Self::from_sorted(merged.into_iter().collect())
    }

    /// Timestamps present in both indices, `None` when they are disjoint.
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        if self == other {
            return (!self.is_empty()).then(|| self.clone());
        }
        let (mut a, mut b) = (self.iter().peekable(), other.iter().peekable());
        let mut common = Vec::new();
        while let (Some(x), Some(y)) = (a.peek().copied(), b.peek().copied()) {
            match x.cmp(&y) {
                std::cmp::Ordering::Less => {
                    a.next();
                }
                std::cmp::Ordering::Greater => {
                    b.next();
                }
                std::cmp::Ordering::Equal => {
                    common.push(x);
                    a.next();
                    b.next();
                }
            }
        }
        (!common.is_empty()).then(|| Self::from_sorted(common))
    }
}

impl TimeIndex for DateTimeIndex {
    fn size(&self) -> usize {
        match self {
            Self::Uniform(u) => u.size(),
            Self::Irregular(i) => i.size(),
        }
    }

    fn timestamp_at(&self, position: usize) -> Option<Timestamp> {
        match self {
            Self::Uniform(u) => u.timestamp_at(position),
            Self::Irregular(i) => i.timestamp_at(position),
        }
    }

    fn position_of(&self, t: Timestamp) -> Option<usize> {
        match self {
            Self::Uniform(u) => u.position_of(t),
            Self::Irregular(i) => i.position_of(t),
        }
    }

    fn lower_bound(&self, t: Timestamp) -> usize {
        match self {
            Self::Uniform(u) => u.lower_bound(t),
            Self::Irregular(i) => i.lower_bound(t),
        }
    }

    fn upper_bound(&self, t: Timestamp) -> usize {
        match self {
            Self::Uniform(u) => u.upper_bound(t),
            Self::Irregular(i) => i.upper_bound(t),
        }
    }
}

impl PartialEq for DateTimeIndex {
    fn eq(&self, other: &Self) -> bool {
        if self.size() != other.size() {
            return false;
        }
        if let (Self::Uniform(a), Self::Uniform(b)) = (self, other) {
            if a.start == b.start
                && a.frequency == b.frequency
                && a.frequency.holidays() == b.frequency.holidays()
            {
                return true;
            }
        }
        self.iter().eq(other.iter())
    }
}

impl Eq for DateTimeIndex {}

/// Ordered iterator over an index's timestamps.
pub enum Instants<'a> {
    Uniform {
        frequency: &'a Frequency,
        next: Timestamp,
        remaining: usize,
    },
    Irregular(std::slice::Iter<'a, Timestamp>),
}

impl Iterator for Instants<'_> {
    type Item = Timestamp;

    fn next(&mut self) -> Option<Timestamp> {
        match self {
            Instants::Uniform {
                frequency,
                next,
                remaining,
            } => {
                if *remaining == 0 {
                    return None;
                }
                let current = *next;
                *remaining -= 1;
                if *remaining > 0 {
                    *next = frequency.advance(current, 1);
                }
                Some(current)
            }
            Instants::Irregular(iter) => iter.next().copied(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = match self {
            Instants::Uniform { remaining, .. } => *remaining,
            Instants::Irregular(iter) => iter.len(),
        };
        (n, Some(n))
    }
}

impl ExactSizeIterator for Instants<'_> {}

/// Text form: `uniform,<start>,<periods>,<frequency>` or
/// `irregular,<t0>,<t1>,...`. Holiday calendars are not part of the text.
impl fmt::Display for DateTimeIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uniform(u) => write!(
                f,
                "uniform,{},{},{}",
                format_timestamp(&u.start),
                u.periods,
                u.frequency
            ),
            Self::Irregular(i) => {
                f.write_str("irregular")?;
                for t in &i.instants {
                    write!(f, ",{}", format_timestamp(t))?;
                }
                Ok(())
            }
        }
    }
}

impl FromStr for DateTimeIndex {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut fields = s.trim().split(',');
        match fields.next() {
            Some("uniform") => {
                let (Some(start), Some(periods), Some(freq), None) =
                    (fields.next(), fields.next(), fields.next(), fields.next())
                else {
                    return Err(Error::Parse(format!("malformed uniform index {s:?}")));
                };
                let periods: i64 = periods
                    .trim()
                    .parse()
                    .map_err(|e| Error::Parse(format!("bad periods in {s:?}: {e}")))?;
                Self::uniform(parse_timestamp(start)?, periods, freq.parse()?)
            }
            Some("irregular") => {
                // An empty list is valid here: slicing can produce it.
                let instants = fields.map(parse_timestamp).collect::<Result<BTreeSet<_>>>()?;
                Ok(Self::from_sorted(instants.into_iter().collect()))
            }
            _ => Err(Error::Parse(format!("unknown index kind in {s:?}"))),
        }
    }
}
