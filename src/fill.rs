//! Missing-value repair for a single series.
//!
//! NaN marks a missing observation. Every method fills in place; a NaN that a
//! method cannot reach (for example a leading NaN under [`FillMethod::Previous`])
//! stays NaN.

use std::{fmt, str::FromStr};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMethod {
    /// Replace with 0.0
    Zero,
    /// Carry the last observed value forward
    Previous,
    /// Carry the next observed value backward
    Next,
    /// Closest observed value by position; ties go to the earlier one
    Nearest,
    /// Straight line between the surrounding observed values
    Linear,
}

impl FillMethod {
    pub fn apply(self, values: &mut [f64]) {
        match self {
            FillMethod::Zero => fill_value(values, 0.0),
            FillMethod::Previous => fill_previous(values),
            FillMethod::Next => fill_next(values),
            FillMethod::Nearest => fill_nearest(values),
            FillMethod::Linear => fill_linear(values),
        }
    }
}

impl fmt::Display for FillMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FillMethod::Zero => "zero",
            FillMethod::Previous => "previous",
            FillMethod::Next => "next",
            FillMethod::Nearest => "nearest",
            FillMethod::Linear => "linear",
        };
        f.write_str(name)
    }
}

impl FromStr for FillMethod {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "zero" => Ok(FillMethod::Zero),
            "previous" => Ok(FillMethod::Previous),
            "next" => Ok(FillMethod::Next),
            "nearest" => Ok(FillMethod::Nearest),
            "linear" => Ok(FillMethod::Linear),
            other => Err(Error::Parse(format!("unknown fill method {other:?}"))),
        }
    }
}

pub fn fill_value(values: &mut [f64], filler: f64) {
    for v in values.iter_mut().filter(|v| v.is_nan()) {
        *v = filler;
    }
}

pub fn fill_previous(values: &mut [f64]) {
    let mut last = f64::NAN;
    for v in values.iter_mut() {
        if v.is_nan() {
            *v = last;
        } else {
            last = *v;
        }
    }
}

pub fn fill_next(values: &mut [f64]) {
    let mut next = f64::NAN;
    for v in values.iter_mut().rev() {
        if v.is_nan() {
            *v = next;
        } else {
            next = *v;
        }
    }
}

pub fn fill_nearest(values: &mut [f64]) {
    let observed: Vec<usize> = (0..values.len()).filter(|&i| !values[i].is_nan()).collect();
    if observed.is_empty() {
        return;
    }
    let mut cursor = 0;
    for i in 0..values.len() {
        if !values[i].is_nan() {
            continue;
        }
        while cursor + 1 < observed.len() && observed[cursor + 1] < i {
            cursor += 1;
        }
        let before = observed[cursor];
        let source = match observed.get(cursor + 1) {
            _ if before > i => before,
            Some(&after) if after - i < i - before => after,
            _ => before,
        };
        values[i] = values[source];
    }
}

pub fn fill_linear(values: &mut [f64]) {
    let mut previous: Option<usize> = None;
    for i in 0..values.len() {
        if values[i].is_nan() {
            continue;
        }
        if let Some(p) = previous {
            let gap = i - p;
            if gap > 1 {
                let (from, to) = (values[p], values[i]);
                for k in 1..gap {
                    values[p + k] = from + (to - from) * (k as f64) / (gap as f64);
                }
            }
        }
        previous = Some(i);
    }
}
