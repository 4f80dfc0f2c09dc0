// Source traits and the fetcher boundary that turns upstream failures into "no data"
use crate::domain::error::DataError;
use crate::domain::indicator::{self, DateRange, IndicatorDescriptor, Location, SourceKind};
use crate::domain::series::TimeSeries;
use async_trait::async_trait;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait IndicatorSource: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// Fetch one indicator for one location. Points may come back in any order.
    async fn fetch_series(
        &self,
        location: &Location,
        indicator: &IndicatorDescriptor,
        range: DateRange,
    ) -> Result<TimeSeries, DataError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeFlow {
    Exports,
    Imports,
}

impl TradeFlow {
    pub fn code(&self) -> &'static str {
        match self {
            TradeFlow::Exports => "X",
            TradeFlow::Imports => "M",
        }
    }
}

/// A reporter's largest trade partners for one year.
#[async_trait]
pub trait PartnerSource: Send + Sync {
    /// Returns `(partner, value in millions of US$)`, largest first.
    async fn top_partners(
        &self,
        location: &Location,
        flow: TradeFlow,
        year: i32,
        limit: usize,
    ) -> Result<Vec<(String, f64)>, DataError>;
}

#[derive(Clone, Default)]
pub struct RemoteFetcher {
    sources: HashMap<SourceKind, Arc<dyn IndicatorSource>>,
    partners: Option<Arc<dyn PartnerSource>>,
}

impl RemoteFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, source: Arc<dyn IndicatorSource>) -> Self {
        self.sources.insert(source.kind(), source);
        self
    }

    pub fn with_partner_source(mut self, partners: Arc<dyn PartnerSource>) -> Self {
        self.partners = Some(partners);
        self
    }

    /// Fetch a series by indicator key.
    ///
    /// Only `UnknownIndicator` is returned as an error. Every upstream failure is
    /// logged and comes back as an empty series so the caller can show "no data".
    pub async fn fetch(
        &self,
        location: &Location,
        indicator_key: &str,
        range: Option<DateRange>,
    ) -> Result<TimeSeries, DataError> {
        let descriptor = indicator::resolve(indicator_key)?;
        let kind = descriptor.source;
        let country = location.label_for(kind.code_format());
        let range = range.unwrap_or_else(|| kind.default_range(current_year()));

        let Some(source) = self.sources.get(&kind) else {
            tracing::warn!(
                "No {} source configured, {} will have no data",
                kind.key(),
                indicator_key
            );
            return Ok(TimeSeries::empty(kind.key(), country, indicator_key));
        };

        match source.fetch_series(location, descriptor, range).await {
            Ok(series) => {
                if series.is_empty() {
                    tracing::info!("No {} data for {}", indicator_key, country);
                } else {
                    tracing::debug!(
                        "Fetched {} points of {} for {}",
                        series.points().len(),
                        indicator_key,
                        country
                    );
                }
                Ok(series)
            }
            Err(e) if e.is_upstream() => {
                tracing::warn!("Error fetching {} for {}: {}", indicator_key, country, e);
                Ok(TimeSeries::empty(kind.key(), country, indicator_key))
            }
            Err(e) => Err(e),
        }
    }

    /// Top trade partners; failures are logged and yield an empty list.
    pub async fn fetch_top_partners(
        &self,
        location: &Location,
        flow: TradeFlow,
        year: Option<i32>,
        limit: usize,
    ) -> Vec<(String, f64)> {
        let Some(partners) = &self.partners else {
            tracing::warn!("No trade partner source configured");
            return Vec::new();
        };
        let year = year.unwrap_or_else(|| current_year() - 1);

        match partners.top_partners(location, flow, year, limit).await {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!("Error fetching trade partners for {}: {}", location.name, e);
                Vec::new()
            }
        }
    }
}

pub fn current_year() -> i32 {
    chrono::Utc::now().year()
}
