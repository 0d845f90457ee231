use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{StatArbError, StatArbResult};

/// A date-aligned sequence of optional values.
///
/// `None` marks an undefined observation (warm-up, zero exposure, zero
/// variance, ...). Dates are strictly increasing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeries {
    pub dates: Vec<NaiveDate>,
    pub values: Vec<Option<f64>>,
}

impl TimeSeries {
    /// Build a series, checking that both vectors line up and dates ascend.
    pub fn new(dates: Vec<NaiveDate>, values: Vec<Option<f64>>) -> StatArbResult<Self> {
        if dates.len() != values.len() {
            return Err(StatArbError::invalid(
                "values",
                format!(
                    "{} values supplied for {} dates",
                    values.len(),
                    dates.len()
                ),
            ));
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(StatArbError::DateError(
                "Series dates must be strictly increasing".into(),
            ));
        }
        Ok(TimeSeries { dates, values })
    }

    /// Pair already-aligned dates and values produced inside the crate.
    pub(crate) fn aligned(dates: &[NaiveDate], values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(dates.len(), values.len());
        TimeSeries {
            dates: dates.to_vec(),
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Value on `date`, `None` when the date is absent or undefined.
    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.dates
            .binary_search(&date)
            .ok()
            .and_then(|i| self.values[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Option<f64>)> + '_ {
        self.dates.iter().copied().zip(self.values.iter().copied())
    }

    /// Defined observations only, in date order.
    pub fn defined(&self) -> impl Iterator<Item = (NaiveDate, f64)> + '_ {
        self.iter().filter_map(|(d, v)| v.map(|v| (d, v)))
    }

    pub fn defined_values(&self) -> Vec<f64> {
        self.values.iter().flatten().copied().collect()
    }

    pub fn defined_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_some()).count()
    }

    pub fn first(&self) -> Option<(NaiveDate, Option<f64>)> {
        self.iter().next()
    }

    pub fn last(&self) -> Option<(NaiveDate, Option<f64>)> {
        self.iter().last()
    }
}
