use std::collections::HashSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::Ticker;
use crate::{StatArbError, StatArbResult};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One ticker's adjusted closes, aligned to the table's date index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceColumn {
    pub ticker: Ticker,
    pub prices: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawPriceTable {
    dates: Vec<NaiveDate>,
    columns: Vec<PriceColumn>,
}

/// Wide table of adjusted close prices: one row per date, one column per
/// ticker. Dates are sorted ascending and unique; missing prices are `None`.
///
/// Column order is the order tickers were supplied and is preserved by
/// every transformation, so pair enumeration is reproducible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPriceTable", into = "RawPriceTable")]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    tickers: Vec<Ticker>,
    columns: Vec<Vec<Option<f64>>>,
}

/// Two price series inner-joined on the dates where both are defined.
///
/// `y` belongs to ticker `a` (the dependent leg), `x` to ticker `b`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedPair {
    pub a: Ticker,
    pub b: Ticker,
    pub dates: Vec<NaiveDate>,
    pub y: Vec<f64>,
    pub x: Vec<f64>,
}

impl AlignedPair {
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Construction
// ---------------------------------------------------------------------------

impl PriceTable {
    /// Build a table from unsorted rows.
    ///
    /// Rows are sorted by date; when a date repeats, the last row supplied
    /// wins. Non-finite and non-positive prices are stored as missing.
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<PriceColumn>) -> StatArbResult<Self> {
        let n = dates.len();
        let mut seen = HashSet::new();
        for col in &columns {
            if col.ticker.trim().is_empty() {
                return Err(StatArbError::invalid("ticker", "Ticker names must be non-empty"));
            }
            if !seen.insert(col.ticker.as_str()) {
                return Err(StatArbError::invalid(
                    "ticker",
                    format!("Ticker '{}' appears more than once", col.ticker),
                ));
            }
            if col.prices.len() != n {
                return Err(StatArbError::invalid(
                    "prices",
                    format!(
                        "Ticker '{}' has {} prices for {} dates",
                        col.ticker,
                        col.prices.len(),
                        n
                    ),
                ));
            }
        }

        // Stable sort keeps the original order among equal dates, so the
        // last occurrence is the one left standing after de-duplication.
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by_key(|&i| dates[i]);
        let mut keep: Vec<usize> = Vec::with_capacity(n);
        for i in order {
            match keep.last_mut() {
                Some(last) if dates[*last] == dates[i] => *last = i,
                _ => keep.push(i),
            }
        }

        let sorted_dates = keep.iter().map(|&i| dates[i]).collect();
        let tickers = columns.iter().map(|c| c.ticker.clone()).collect();
        let columns = columns
            .into_iter()
            .map(|c| keep.iter().map(|&i| sanitize(c.prices[i])).collect())
            .collect();

        Ok(PriceTable {
            dates: sorted_dates,
            tickers,
            columns,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn tickers(&self) -> &[Ticker] {
        &self.tickers
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn num_tickers(&self) -> usize {
        self.tickers.len()
    }

    pub fn column(&self, ticker: &str) -> Option<&[Option<f64>]> {
        self.index_of(ticker).map(|i| self.columns[i].as_slice())
    }

    /// Non-missing observations for one ticker.
    pub fn observations(&self, ticker: &str) -> usize {
        self.column(ticker)
            .map(|c| c.iter().filter(|v| v.is_some()).count())
            .unwrap_or(0)
    }

    /// Dates on which both tickers have a price.
    pub fn joint_observations(&self, a: &str, b: &str) -> StatArbResult<usize> {
        let (ca, cb) = (self.require(a)?, self.require(b)?);
        Ok(ca
            .iter()
            .zip(cb)
            .filter(|(pa, pb)| pa.is_some() && pb.is_some())
            .count())
    }

    /// Inner join of two columns on the dates where both are defined.
    pub fn pair(&self, a: &str, b: &str) -> StatArbResult<AlignedPair> {
        let (ca, cb) = (self.require(a)?, self.require(b)?);
        let mut dates = Vec::new();
        let mut y = Vec::new();
        let mut x = Vec::new();
        for ((date, pa), pb) in self.dates.iter().zip(ca).zip(cb) {
            if let (Some(pa), Some(pb)) = (pa, pb) {
                dates.push(*date);
                y.push(*pa);
                x.push(*pb);
            }
        }
        Ok(AlignedPair {
            a: a.to_string(),
            b: b.to_string(),
            dates,
            y,
            x,
        })
    }

    // -----------------------------------------------------------------------
    // Transformations
    // -----------------------------------------------------------------------

    /// Keep dates in `[start, end]`; `end = None` is open-ended.
    pub fn slice(&self, start: NaiveDate, end: Option<NaiveDate>) -> PriceTable {
        self.retain_rows(|_, date| date >= start && end.map_or(true, |e| date <= e))
    }

    /// Remove dates on which every ticker is missing.
    pub fn drop_empty_rows(&self) -> PriceTable {
        let columns = &self.columns;
        self.retain_rows(|i, _| columns.iter().any(|c| c[i].is_some()))
    }

    /// Carry the last observed price forward over gaps. Leading gaps stay
    /// missing.
    pub fn forward_fill(&self) -> PriceTable {
        let columns = self
            .columns
            .iter()
            .map(|col| {
                let mut last = None;
                col.iter()
                    .map(|v| {
                        if v.is_some() {
                            last = *v;
                        }
                        last
                    })
                    .collect()
            })
            .collect();
        PriceTable {
            dates: self.dates.clone(),
            tickers: self.tickers.clone(),
            columns,
        }
    }

    /// Drop tickers with fewer than `min_obs` prices.
    pub fn drop_sparse(&self, min_obs: usize) -> PriceTable {
        let keep: Vec<usize> = (0..self.tickers.len())
            .filter(|&i| self.columns[i].iter().filter(|v| v.is_some()).count() >= min_obs)
            .collect();
        self.retain_columns(&keep)
    }

    /// Standard pre-processing before pair selection: drop all-missing
    /// dates, forward-fill, then drop tickers lacking `min_obs` prices.
    pub fn clean(&self, min_obs: usize) -> PriceTable {
        self.drop_empty_rows().forward_fill().drop_sparse(min_obs)
    }

    /// Restrict to the named tickers, in the order requested.
    pub fn select(&self, tickers: &[Ticker]) -> StatArbResult<PriceTable> {
        let mut keep = Vec::with_capacity(tickers.len());
        for t in tickers {
            let idx = self.index_of(t).ok_or_else(|| {
                StatArbError::invalid("tickers", format!("Unknown ticker '{t}'"))
            })?;
            if keep.contains(&idx) {
                return Err(StatArbError::invalid(
                    "tickers",
                    format!("Ticker '{t}' requested twice"),
                ));
            }
            keep.push(idx);
        }
        Ok(self.retain_columns(&keep))
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn index_of(&self, ticker: &str) -> Option<usize> {
        self.tickers.iter().position(|t| t == ticker)
    }

    fn require(&self, ticker: &str) -> StatArbResult<&[Option<f64>]> {
        self.column(ticker)
            .ok_or_else(|| StatArbError::invalid("ticker", format!("Unknown ticker '{ticker}'")))
    }

    fn retain_rows(&self, keep: impl Fn(usize, NaiveDate) -> bool) -> PriceTable {
        let rows: Vec<usize> = self
            .dates
            .iter()
            .enumerate()
            .filter(|(i, d)| keep(*i, **d))
            .map(|(i, _)| i)
            .collect();
        PriceTable {
            dates: rows.iter().map(|&i| self.dates[i]).collect(),
            tickers: self.tickers.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| rows.iter().map(|&i| c[i]).collect())
                .collect(),
        }
    }

    fn retain_columns(&self, keep: &[usize]) -> PriceTable {
        PriceTable {
            dates: self.dates.clone(),
            tickers: keep.iter().map(|&i| self.tickers[i].clone()).collect(),
            columns: keep.iter().map(|&i| self.columns[i].clone()).collect(),
        }
    }
}

fn sanitize(price: Option<f64>) -> Option<f64> {
    price.filter(|p| p.is_finite() && *p > 0.0)
}

// ---------------------------------------------------------------------------
// Serde bridge
// ---------------------------------------------------------------------------

impl TryFrom<RawPriceTable> for PriceTable {
    type Error = StatArbError;

    fn try_from(raw: RawPriceTable) -> Result<Self, Self::Error> {
        PriceTable::new(raw.dates, raw.columns)
    }
}

impl From<PriceTable> for RawPriceTable {
    fn from(table: PriceTable) -> Self {
        RawPriceTable {
            dates: table.dates,
            columns: table
                .tickers
                .into_iter()
                .zip(table.columns)
                .map(|(ticker, prices)| PriceColumn { ticker, prices })
                .collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
    }

    fn col(ticker: &str, prices: &[Option<f64>]) -> PriceColumn {
        PriceColumn {
            ticker: ticker.into(),
            prices: prices.to_vec(),
        }
    }

    #[test]
    fn test_sorts_and_deduplicates_last_wins() {
        let table = PriceTable::new(
            vec![d(3), d(1), d(3), d(2)],
            vec![col("AAA", &[Some(30.0), Some(10.0), Some(31.0), Some(20.0)])],
        )
        .unwrap();
        assert_eq!(table.dates(), &[d(1), d(2), d(3)]);
        assert_eq!(
            table.column("AAA").unwrap(),
            &[Some(10.0), Some(20.0), Some(31.0)]
        );
    }

    #[test]
    fn test_invalid_prices_become_missing() {
        let table = PriceTable::new(
            vec![d(1), d(2), d(3), d(4)],
            vec![col("AAA", &[Some(f64::NAN), Some(0.0), Some(-5.0), Some(7.0)])],
        )
        .unwrap();
        assert_eq!(table.column("AAA").unwrap(), &[None, None, None, Some(7.0)]);
    }

    #[test]
    fn test_rejects_length_mismatch_and_duplicates() {
        assert!(PriceTable::new(vec![d(1), d(2)], vec![col("AAA", &[Some(1.0)])]).is_err());
        assert!(PriceTable::new(
            vec![d(1)],
            vec![col("AAA", &[Some(1.0)]), col("AAA", &[Some(2.0)])]
        )
        .is_err());
    }

    #[test]
    fn test_forward_fill_leaves_leading_gap() {
        let table = PriceTable::new(
            vec![d(1), d(2), d(3), d(4)],
            vec![col("AAA", &[None, Some(5.0), None, Some(6.0)])],
        )
        .unwrap()
        .forward_fill();
        assert_eq!(
            table.column("AAA").unwrap(),
            &[None, Some(5.0), Some(5.0), Some(6.0)]
        );
    }

    #[test]
    fn test_clean_drops_empty_rows_and_sparse_tickers() {
        let table = PriceTable::new(
            vec![d(1), d(2), d(3), d(4)],
            vec![
                col("AAA", &[Some(1.0), None, Some(1.2), Some(1.3)]),
                col("BBB", &[None, None, None, Some(9.0)]),
            ],
        )
        .unwrap()
        .clean(3);
        assert_eq!(table.tickers(), &["AAA".to_string()]);
        assert_eq!(table.dates(), &[d(1), d(3), d(4)]);
    }

    #[test]
    fn test_pair_is_inner_join() {
        let table = PriceTable::new(
            vec![d(1), d(2), d(3), d(4)],
            vec![
                col("AAA", &[Some(1.0), None, Some(3.0), Some(4.0)]),
                col("BBB", &[Some(10.0), Some(20.0), None, Some(40.0)]),
            ],
        )
        .unwrap();
        let pair = table.pair("AAA", "BBB").unwrap();
        assert_eq!(pair.dates, vec![d(1), d(4)]);
        assert_eq!(pair.y, vec![1.0, 4.0]);
        assert_eq!(pair.x, vec![10.0, 40.0]);
        assert_eq!(table.joint_observations("AAA", "BBB").unwrap(), 2);
        assert!(table.pair("AAA", "ZZZ").is_err());
    }

    #[test]
    fn test_slice_is_inclusive() {
        let table = PriceTable::new(
            vec![d(1), d(2), d(3), d(4)],
            vec![col("AAA", &[Some(1.0), Some(2.0), Some(3.0), Some(4.0)])],
        )
        .unwrap();
        assert_eq!(table.slice(d(2), Some(d(3))).dates(), &[d(2), d(3)]);
        assert_eq!(table.slice(d(3), None).dates(), &[d(3), d(4)]);
    }

    #[test]
    fn test_select_preserves_requested_order() {
        let table = PriceTable::new(
            vec![d(1)],
            vec![
                col("AAA", &[Some(1.0)]),
                col("BBB", &[Some(2.0)]),
                col("CCC", &[Some(3.0)]),
            ],
        )
        .unwrap();
        let sub = table.select(&["CCC".into(), "AAA".into()]).unwrap();
        assert_eq!(sub.tickers(), &["CCC".to_string(), "AAA".to_string()]);
        assert!(table.select(&["XXX".into()]).is_err());
    }

    #[test]
    fn test_json_roundtrip_validates() {
        let json = r#"{"dates":["2024-03-02","2024-03-01"],
                       "columns":[{"ticker":"AAA","prices":[2.0,null]}]}"#;
        let table: PriceTable = serde_json::from_str(json).unwrap();
        assert_eq!(table.dates(), &[d(1), d(2)]);
        assert_eq!(table.column("AAA").unwrap(), &[None, Some(2.0)]);

        let bad = r#"{"dates":["2024-03-01"],"columns":[{"ticker":"AAA","prices":[]}]}"#;
        assert!(serde_json::from_str::<PriceTable>(bad).is_err());
    }
}
