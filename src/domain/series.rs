// Time series domain models and period alignment
use indexmap::IndexMap;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeriesPoint {
    pub period: String,
    pub value: Option<f64>,
}

impl TimeSeriesPoint {
    pub fn new(period: impl Into<String>, value: Option<f64>) -> Self {
        Self {
            period: period.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub source_key: String,
    pub country_code: String,
    pub indicator_key: String,
    points: Vec<TimeSeriesPoint>,
}

impl TimeSeries {
    /// Sorts points by period and keeps the first point seen for each period.
    pub fn new(
        source_key: impl Into<String>,
        country_code: impl Into<String>,
        indicator_key: impl Into<String>,
        mut points: Vec<TimeSeriesPoint>,
    ) -> Self {
        points.sort_by(|a, b| a.period.cmp(&b.period));
        points.dedup_by(|later, earlier| later.period == earlier.period);

        Self {
            source_key: source_key.into(),
            country_code: country_code.into(),
            indicator_key: indicator_key.into(),
            points,
        }
    }

    pub fn empty(
        source_key: impl Into<String>,
        country_code: impl Into<String>,
        indicator_key: impl Into<String>,
    ) -> Self {
        Self::new(source_key, country_code, indicator_key, Vec::new())
    }

    pub fn points(&self) -> &[TimeSeriesPoint] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlignedSeriesSet {
    pub labels: Vec<String>,
    pub series: IndexMap<String, Vec<Option<f64>>>,
}

impl AlignedSeriesSet {
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Builds a set from categorical rows (e.g. trade partners) under one series name.
    pub fn from_rows(name: impl Into<String>, rows: Vec<(String, f64)>) -> Self {
        let (labels, values): (Vec<_>, Vec<_>) =
            rows.into_iter().map(|(label, v)| (label, Some(v))).unzip();
        let mut series = IndexMap::new();
        series.insert(name.into(), values);
        Self { labels, series }
    }
}

/// Places every series on the sorted union of their periods.
pub fn align(series: &[TimeSeries]) -> AlignedSeriesSet {
    let labels: Vec<String> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|p| p.period.clone()))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut aligned = IndexMap::with_capacity(series.len());
    for s in series {
        let by_period: HashMap<&str, Option<f64>> = s
            .points
            .iter()
            .map(|p| (p.period.as_str(), p.value))
            .collect();

        let values = labels
            .iter()
            .map(|label| by_period.get(label.as_str()).copied().flatten())
            .collect();

        aligned.insert(unique_name(&aligned, &s.indicator_key), values);
    }

    AlignedSeriesSet {
        labels,
        series: aligned,
    }
}

fn unique_name(taken: &IndexMap<String, Vec<Option<f64>>>, base: &str) -> String {
    if !taken.contains_key(base) {
        return base.to_string();
    }
    (2..)
        .map(|n| format!("{base}#{n}"))
        .find(|candidate| !taken.contains_key(candidate))
        .unwrap_or_else(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(key: &str, points: &[(&str, Option<f64>)]) -> TimeSeries {
        TimeSeries::new(
            "worldbank",
            "KR",
            key,
            points
                .iter()
                .map(|(p, v)| TimeSeriesPoint::new(*p, *v))
                .collect(),
        )
    }

    #[test]
    fn test_align_nothing() {
        let aligned = align(&[]);
        assert!(aligned.labels.is_empty());
        assert!(aligned.series.is_empty());
    }

    #[test]
    fn test_align_disjoint_years() {
        let a = series("InterestRate", &[("2020", Some(5.0))]);
        let b = series("Inflation", &[("2021", Some(7.0))]);

        let aligned = align(&[a, b]);

        assert_eq!(aligned.labels, vec!["2020", "2021"]);
        assert_eq!(aligned.series["InterestRate"], vec![Some(5.0), None]);
        assert_eq!(aligned.series["Inflation"], vec![None, Some(7.0)]);
    }

    #[test]
    fn test_align_shape_invariant() {
        let inputs = vec![
            series("CPI", &[("2015", Some(1.0)), ("2018", None), ("2016", Some(2.0))]),
            series("savings", &[]),
            series("internet", &[("2014", Some(80.5)), ("2018", Some(90.1))]),
        ];

        let aligned = align(&inputs);

        assert_eq!(aligned.labels, vec!["2014", "2015", "2016", "2018"]);
        for values in aligned.series.values() {
            assert_eq!(values.len(), aligned.labels.len());
        }
        assert_eq!(aligned.series["savings"], vec![None; 4]);
        assert_eq!(
            aligned.series["CPI"],
            vec![None, Some(1.0), Some(2.0), None]
        );
    }

    #[test]
    fn test_align_all_empty() {
        let aligned = align(&[series("CPI", &[]), series("savings", &[])]);
        assert!(aligned.is_empty());
        assert_eq!(aligned.series.len(), 2);
        assert!(aligned.series.values().all(|v| v.is_empty()));
    }

    #[test]
    fn test_align_is_deterministic_and_keeps_input_order() {
        let inputs = vec![
            series("Inflation", &[("2021", Some(2.5)), ("2019", Some(0.4))]),
            series("InterestRate", &[("2020", Some(3.1))]),
        ];
        let first = align(&inputs);
        let second = align(&inputs);
        assert_eq!(first, second);
        let names: Vec<_> = first.series.keys().cloned().collect();
        assert_eq!(names, vec!["Inflation", "InterestRate"]);
    }

    #[test]
    fn test_duplicate_indicator_names_get_suffix() {
        let aligned = align(&[
            series("CPI", &[("2020", Some(1.0))]),
            series("CPI", &[("2020", Some(2.0))]),
        ]);
        assert_eq!(aligned.series["CPI"], vec![Some(1.0)]);
        assert_eq!(aligned.series["CPI#2"], vec![Some(2.0)]);
    }

    #[test]
    fn test_time_series_sorts_and_dedups() {
        let s = series(
            "CPI",
            &[("2021", Some(3.2)), ("2020", Some(2.9)), ("2021", Some(9.9))],
        );
        let periods: Vec<_> = s.points().iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2020", "2021"]);
        assert_eq!(s.points()[1].value, Some(3.2));
    }

    #[test]
    fn test_from_rows() {
        let set = AlignedSeriesSet::from_rows(
            "Exports",
            vec![("China".to_string(), 120.0), ("USA".to_string(), 95.5)],
        );
        assert_eq!(set.labels, vec!["China", "USA"]);
        assert_eq!(set.series["Exports"], vec![Some(120.0), Some(95.5)]);
    }
}
