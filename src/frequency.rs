//! Calendar step arithmetic.
//!
//! A [`Frequency`] pairs a non-zero step with a [`FrequencyUnit`]. Duration
//! units (seconds through calendar days) step by a fixed amount of UTC time;
//! [`FrequencyUnit::BusinessDay`] steps over Saturdays, Sundays and an optional
//! holiday set.
//!
//! ```
//! use timeseries_collection::frequency::Frequency;
//! use timeseries_collection::utils::parse_timestamp;
//!
//! let friday = parse_timestamp("2015-04-10").unwrap();
//! let bday = Frequency::business_days(1).unwrap();
//! assert_eq!(bday.advance(friday, 1), parse_timestamp("2015-04-13").unwrap());
//! assert_eq!(bday.difference(friday, parse_timestamp("2015-04-13").unwrap()), Some(1));
//! ```

use std::collections::BTreeSet;
use std::hash::{Hash, Hasher};
use std::num::NonZeroU32;
use std::{fmt, str::FromStr};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::Timestamp;

const SECONDS_PER_DAY: i64 = 86_400;

/// Step granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrequencyUnit {
    Second,
    Minute,
    Hour,
    /// Calendar day, 24h in UTC
    Day,
    /// Monday..Friday minus holidays
    BusinessDay,
}

impl FrequencyUnit {
    fn seconds(self) -> Option<i64> {
        match self {
            FrequencyUnit::Second => Some(1),
            FrequencyUnit::Minute => Some(60),
            FrequencyUnit::Hour => Some(3_600),
            FrequencyUnit::Day => Some(SECONDS_PER_DAY),
            FrequencyUnit::BusinessDay => None,
        }
    }

    fn symbol(self) -> &'static str {
        match self {
            FrequencyUnit::Second => "s",
            FrequencyUnit::Minute => "m",
            FrequencyUnit::Hour => "h",
            FrequencyUnit::Day => "D",
            FrequencyUnit::BusinessDay => "B",
        }
    }
}

/// A frequency = step × unit (e.g. 1-Day, 3-BusinessDay, 15-Minute).
///
/// Equality and hashing only look at the unit and the step; the holiday
/// calendar of a business-day frequency does not participate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frequency {
    unit: FrequencyUnit,
    step: NonZeroU32,
    holidays: BTreeSet<NaiveDate>,
}

impl Frequency {
    /// Creates a frequency, rejecting a zero step with [`Error::InvalidRange`].
    pub fn new(unit: FrequencyUnit, step: u32) -> Result<Self> {
        let step = NonZeroU32::new(step)
            .ok_or_else(|| Error::InvalidRange("frequency step must be >= 1".into()))?;
        Ok(Self {
            unit,
            step,
            holidays: BTreeSet::new(),
        })
    }

    pub fn seconds(step: u32) -> Result<Self> {
        Self::new(FrequencyUnit::Second, step)
    }

    pub fn minutes(step: u32) -> Result<Self> {
        Self::new(FrequencyUnit::Minute, step)
    }

    pub fn hours(step: u32) -> Result<Self> {
        Self::new(FrequencyUnit::Hour, step)
    }

    pub fn days(step: u32) -> Result<Self> {
        Self::new(FrequencyUnit::Day, step)
    }

    pub fn business_days(step: u32) -> Result<Self> {
        Self::new(FrequencyUnit::BusinessDay, step)
    }

    /// Adds dates that business-day stepping must skip.
    ///
    /// Holidays have no effect on duration units.
    pub fn with_holidays<I: IntoIterator<Item = NaiveDate>>(mut self, holidays: I) -> Self {
        self.holidays.extend(holidays);
        self
    }

    pub fn unit(&self) -> FrequencyUnit {
        self.unit
    }

    pub fn step(&self) -> u32 {
        self.step.get()
    }

    pub fn holidays(&self) -> &BTreeSet<NaiveDate> {
        &self.holidays
    }

    /// The same unit and calendar with the step multiplied by `factor`.
    ///
    /// Returns `None` for a zero factor or when the step would overflow.
    pub fn checked_mul(&self, factor: usize) -> Option<Self> {
        let factor = u32::try_from(factor).ok()?;
        let step = self.step.checked_mul(NonZeroU32::new(factor)?)?;
        Some(Self {
            unit: self.unit,
            step,
            holidays: self.holidays.clone(),
        })
    }

    /// Moves `t` by `n` steps (backwards when `n` is negative).
    ///
    /// For business days each step lands on the next business day in the
    /// direction of travel, so a weekend start moves to Monday (forwards) or
    /// Friday (backwards). Time of day is preserved.
    ///
    /// Panics if the result falls outside chrono's representable range.
    pub fn advance(&self, t: Timestamp, n: i64) -> Timestamp {
        let steps = n * i64::from(self.step.get());
        if steps == 0 {
            return t;
        }
        match self.unit.seconds() {
            Some(unit_seconds) => t + Duration::seconds(steps * unit_seconds),
            None if self.holidays.is_empty() => advance_weekdays(t, steps),
            None => self.advance_with_holidays(t, steps),
        }
    }

    /// [`advance`](Self::advance) that returns `None` instead of panicking
    /// when the step count or the result leaves chrono's representable range.
    pub fn checked_advance(&self, t: Timestamp, n: i64) -> Option<Timestamp> {
        let steps = n.checked_mul(i64::from(self.step.get()))?;
        if steps == 0 {
            return Some(t);
        }
        match self.unit.seconds() {
            Some(unit_seconds) => {
                t.checked_add_signed(Duration::try_seconds(steps.checked_mul(unit_seconds)?)?)
            }
            None => {
                // Each holiday pushes the result at most one business day further.
                let slack = i64::try_from(self.holidays.len()).ok()?;
                let bound = steps.checked_add(steps.signum().checked_mul(slack)?)?;
                let reached = checked_advance_weekdays(t, steps)?;
                checked_advance_weekdays(t, bound)?;
                if self.holidays.is_empty() {
                    Some(reached)
                } else {
                    Some(self.advance_with_holidays(t, steps))
                }
            }
        }
    }

    /// Number of steps `n` such that `advance(t1, n) == t2`.
    ///
    /// `None` when `t2` is not reachable from `t1` by whole steps.
    pub fn difference(&self, t1: Timestamp, t2: Timestamp) -> Option<i64> {
        if t1 == t2 {
            return Some(0);
        }
        let step = i64::from(self.step.get());
        match self.unit.seconds() {
            Some(unit_seconds) => {
                let delta = t2 - t1;
                if delta.subsec_nanos() != 0 {
                    return None;
                }
                let span = unit_seconds * step;
                let secs = delta.num_seconds();
                (secs % span == 0).then_some(secs / span)
            }
            None => {
                if t1.time() != t2.time() || !self.is_business_day(t2.date_naive()) {
                    return None;
                }
                let days = if self.holidays.is_empty() {
                    weekday_distance(t1, t2)
                } else {
                    self.business_distance(t1, t2)?
                };
                if days % step != 0 {
                    return None;
                }
                let n = days / step;
                (self.advance(t1, n) == t2).then_some(n)
            }
        }
    }

    /// True for dates a business-day frequency can land on.
    pub fn is_business_day(&self, date: NaiveDate) -> bool {
        date.weekday().num_days_from_monday() < 5 && !self.holidays.contains(&date)
    }

    fn advance_with_holidays(&self, t: Timestamp, steps: i64) -> Timestamp {
        let dir = Duration::days(steps.signum());
        let mut cur = t;
        for _ in 0..steps.unsigned_abs() {
            cur += dir;
            while !self.is_business_day(cur.date_naive()) {
                cur += dir;
            }
        }
        cur
    }

    // Business days walked from t1 to t2, t2 being a business day.
    fn business_distance(&self, t1: Timestamp, t2: Timestamp) -> Option<i64> {
        let forward = t2 > t1;
        let dir = Duration::days(if forward { 1 } else { -1 });
        let mut cur = t1;
        let mut count = 0i64;
        loop {
            cur += dir;
            if self.is_business_day(cur.date_naive()) {
                count += 1;
            }
            if cur == t2 {
                return Some(if forward { count } else { -count });
            }
            if (forward && cur > t2) || (!forward && cur < t2) {
                return None;
            }
        }
    }
}

// Days since Monday 1969-12-29, the Monday before the Unix epoch.
fn day_number(t: Timestamp) -> i64 {
    t.timestamp().div_euclid(SECONDS_PER_DAY) + 3
}

// Ordinal of the business day a step from `t` starts counting at. Weekend
// dates count from Friday when moving forwards and from Monday when moving back.
fn weekday_ordinal(t: Timestamp, forward: bool) -> i64 {
    let day = day_number(t);
    let (week, dow) = (day.div_euclid(7), day.rem_euclid(7));
    match dow {
        0..=4 => week * 5 + dow,
        _ if forward => week * 5 + 4,
        _ => week * 5 + 5,
    }
}

fn advance_weekdays(t: Timestamp, steps: i64) -> Timestamp {
    let target = weekday_ordinal(t, steps > 0) + steps;
    let target_day = target.div_euclid(5) * 7 + target.rem_euclid(5);
    t + Duration::days(target_day - day_number(t))
}

fn checked_advance_weekdays(t: Timestamp, steps: i64) -> Option<Timestamp> {
    let target = weekday_ordinal(t, steps > 0).checked_add(steps)?;
    let target_day = target
        .div_euclid(5)
        .checked_mul(7)?
        .checked_add(target.rem_euclid(5))?;
    t.checked_add_signed(Duration::try_days(target_day.checked_sub(day_number(t))?)?)
}

fn weekday_distance(t1: Timestamp, t2: Timestamp) -> i64 {
    let forward = t2 > t1;
    weekday_ordinal(t2, forward) - weekday_ordinal(t1, forward)
}

impl PartialEq for Frequency {
    fn eq(&self, other: &Self) -> bool {
        self.unit == other.unit && self.step == other.step
    }
}

impl Eq for Frequency {}

impl Hash for Frequency {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.unit.hash(state);
        self.step.hash(state);
    }
}

/// Compact descriptor: `1D`, `3B`, `15m`, `2h`, `30s`.
impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.step, self.unit.symbol())
    }
}

impl FromStr for Frequency {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let Some(symbol) = s.chars().last() else {
            return Err(Error::Parse("empty frequency".into()));
        };
        let digits = &s[..s.len() - symbol.len_utf8()];
        let step: u32 = digits
            .parse()
            .map_err(|e| Error::Parse(format!("bad frequency step in {s:?}: {e}")))?;
        let unit = match symbol {
            's' => FrequencyUnit::Second,
            'm' => FrequencyUnit::Minute,
            'h' => FrequencyUnit::Hour,
            'D' => FrequencyUnit::Day,
            'B' => FrequencyUnit::BusinessDay,
            _ => return Err(Error::Parse(format!("unknown frequency unit in {s:?}"))),
        };
        Self::new(unit, step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::parse_timestamp;
    use proptest::prelude::*;

    fn ts(s: &str) -> Timestamp {
        parse_timestamp(s).unwrap()
    }

    #[test]
    fn zero_step_is_rejected() {
        assert!(matches!(Frequency::days(0), Err(Error::InvalidRange(_))));
    }

    #[test]
    fn calendar_days_add_whole_days() {
        let freq = Frequency::days(2).unwrap();
        assert_eq!(freq.advance(ts("2015-04-09"), 3), ts("2015-04-15"));
        assert_eq!(freq.advance(ts("2015-04-15"), -3), ts("2015-04-09"));
        assert_eq!(freq.difference(ts("2015-04-09"), ts("2015-04-15")), Some(3));
        assert_eq!(freq.difference(ts("2015-04-09"), ts("2015-04-10")), None);
        assert_eq!(freq.difference(ts("2015-04-09"), ts("2015-04-11 01:00:00")), None);
    }

    #[test]
    fn business_days_skip_weekends() {
        let freq = Frequency::business_days(1).unwrap();
        // 2015-04-10 is a Friday
        assert_eq!(freq.advance(ts("2015-04-10"), 1), ts("2015-04-13"));
        assert_eq!(freq.advance(ts("2015-04-13"), -1), ts("2015-04-10"));
        assert_eq!(freq.advance(ts("2015-04-09"), 5), ts("2015-04-16"));
        assert_eq!(freq.advance(ts("2015-04-11"), 1), ts("2015-04-13"));
        assert_eq!(freq.advance(ts("2015-04-12"), -1), ts("2015-04-10"));
        assert_eq!(freq.difference(ts("2015-04-09"), ts("2015-04-16")), Some(5));
        assert_eq!(freq.difference(ts("2015-04-16"), ts("2015-04-09")), Some(-5));
        assert_eq!(freq.difference(ts("2015-04-09"), ts("2015-04-11")), None);
    }

    #[test]
    fn business_days_skip_holidays() {
        let good_friday = NaiveDate::from_ymd_opt(2015, 4, 3).unwrap();
        let freq = Frequency::business_days(1)
            .unwrap()
            .with_holidays([good_friday]);
        assert_eq!(freq.advance(ts("2015-04-02"), 1), ts("2015-04-06"));
        assert_eq!(freq.advance(ts("2015-04-06"), -1), ts("2015-04-02"));
        assert_eq!(freq.difference(ts("2015-04-01"), ts("2015-04-07")), Some(3));
        assert_eq!(freq.difference(ts("2015-04-01"), ts("2015-04-03")), None);
        assert_eq!(freq, Frequency::business_days(1).unwrap());
    }

    #[test]
    fn strided_business_days() {
        let freq = Frequency::business_days(2).unwrap();
        assert_eq!(freq.advance(ts("2015-04-09"), 1), ts("2015-04-13"));
        assert_eq!(freq.difference(ts("2015-04-09"), ts("2015-04-13")), Some(1));
        assert_eq!(freq.difference(ts("2015-04-09"), ts("2015-04-10")), None);
    }

    #[test]
    fn intraday_units() {
        let freq = Frequency::minutes(15).unwrap();
        assert_eq!(freq.advance(ts("2015-04-09"), 5), ts("2015-04-09 01:15:00"));
        assert_eq!(freq.difference(ts("2015-04-09"), ts("2015-04-09 01:15:00")), Some(5));
        assert_eq!(freq.difference(ts("2015-04-09"), ts("2015-04-09 01:10:00")), None);
    }

    #[test]
    fn descriptor_round_trips() {
        for text in ["1D", "3B", "15m", "2h", "30s"] {
            let freq: Frequency = text.parse().unwrap();
            assert_eq!(freq.to_string(), text);
        }
        assert!("0D".parse::<Frequency>().is_err());
        assert!("5x".parse::<Frequency>().is_err());
        assert!("".parse::<Frequency>().is_err());
    }

    #[test]
    fn checked_mul_scales_step() {
        let freq = Frequency::days(2).unwrap().checked_mul(3).unwrap();
        assert_eq!(freq, Frequency::days(6).unwrap());
        assert!(Frequency::days(2).unwrap().checked_mul(0).is_none());
    }

    #[test]
    fn checked_advance_stops_at_chrono_limits() {
        let start = ts("2015-04-09");
        let day = Frequency::days(1).unwrap();
        assert_eq!(day.checked_advance(start, 3), Some(day.advance(start, 3)));
        assert_eq!(day.checked_advance(start, 1_000_000_000_000), None);
        assert_eq!(Frequency::seconds(1).unwrap().checked_advance(start, i64::MAX), None);
        assert_eq!(Frequency::days(7).unwrap().checked_advance(start, i64::MIN / 2), None);

        let bday = Frequency::business_days(1).unwrap();
        assert_eq!(bday.checked_advance(start, 5), Some(ts("2015-04-16")));
        assert_eq!(bday.checked_advance(start, 1_000_000_000_000), None);

        let good_friday = NaiveDate::from_ymd_opt(2015, 4, 3).unwrap();
        let holidays = bday.clone().with_holidays([good_friday]);
        assert_eq!(holidays.checked_advance(ts("2015-04-02"), 1), Some(ts("2015-04-06")));
        assert_eq!(holidays.checked_advance(ts("2015-04-02"), i64::MAX), None);
    }

    proptest! {
        #[test]
        fn business_day_advance_reverses(offset in 0i64..20_000, n in -500i64..500, step in 1u32..5) {
            let freq = Frequency::business_days(step).unwrap();
            let start = freq.advance(ts("1990-01-01"), offset);
            let moved = freq.advance(start, n);
            prop_assert_eq!(freq.advance(moved, -n), start);
            prop_assert_eq!(freq.difference(start, moved), Some(n));
        }

        #[test]
        fn day_advance_reverses(n in -100_000i64..100_000, step in 1u32..10) {
            let freq = Frequency::days(step).unwrap();
            let start = ts("2000-02-29 12:30:00");
            let moved = freq.advance(start, n);
            prop_assert_eq!(freq.advance(moved, -n), start);
            prop_assert_eq!(freq.difference(start, moved), Some(n));
        }
    }
}
