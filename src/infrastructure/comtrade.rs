// UN Comtrade v1 source: yearly trade totals and top partners
use crate::application::indicator_source::{IndicatorSource, PartnerSource, TradeFlow};
use crate::domain::error::DataError;
use crate::domain::indicator::{DateRange, IndicatorDescriptor, Location, SourceKind};
use crate::domain::series::{TimeSeries, TimeSeriesPoint};
use crate::infrastructure::http::UpstreamClient;
use async_trait::async_trait;
use indexmap::IndexMap;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const SOURCE_KEY: &str = "comtrade";
const KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const WORLD_PARTNER: i64 = 0;

#[derive(Debug, Deserialize)]
struct ComtradeResponse {
    data: Vec<ComtradeRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ComtradeRecord {
    period: Period,
    #[serde(default)]
    partner_code: Option<i64>,
    #[serde(default)]
    partner_desc: Option<String>,
    #[serde(default)]
    primary_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Period {
    Year(i64),
    Text(String),
}

impl Period {
    fn label(&self) -> String {
        match self {
            Period::Year(y) => y.to_string(),
            Period::Text(s) => s.clone(),
        }
    }
}

pub struct ComtradeSource {
    client: Arc<UpstreamClient>,
    base: String,
    key: Option<SecretString>,
}

impl ComtradeSource {
    pub fn new(client: Arc<UpstreamClient>, base: impl Into<String>, key: Option<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            key: key.map(SecretString::from),
        }
    }

    fn build_url(&self, reporter: &str, periods: &str, flow: &str) -> String {
        format!(
            "{}/data/v1/get/C/A/HS?reporterCode={}&period={}&flowCode={}&cmdCode=TOTAL",
            self.base,
            urlencoding::encode(reporter),
            periods,
            flow
        )
    }

    fn reporter<'a>(&self, location: &'a Location) -> Result<&'a str, DataError> {
        location
            .code(SourceKind::Comtrade.code_format())
            .ok_or_else(|| DataError::MissingLocation {
                source_key: SOURCE_KEY.to_string(),
                field: "numeric",
            })
    }

    async fn get_records(&self, url: &str) -> Result<Vec<ComtradeRecord>, DataError> {
        let body = match &self.key {
            Some(key) => {
                self.client
                    .get_text(SOURCE_KEY, url, &[(KEY_HEADER, key.expose_secret())])
                    .await?
            }
            None => self.client.get_text(SOURCE_KEY, url, &[]).await?,
        };
        parse_records(&body)
    }
}

#[async_trait]
impl IndicatorSource for ComtradeSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Comtrade
    }

    async fn fetch_series(
        &self,
        location: &Location,
        indicator: &IndicatorDescriptor,
        range: DateRange,
    ) -> Result<TimeSeries, DataError> {
        let reporter = self.reporter(location)?;
        let periods = range
            .years()
            .map(|y| y.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let url = self.build_url(reporter, &periods, indicator.upstream_id);
        let records = self.get_records(&url).await?;

        Ok(TimeSeries::new(
            SOURCE_KEY,
            reporter,
            indicator.key,
            yearly_totals(&records),
        ))
    }
}

#[async_trait]
impl PartnerSource for ComtradeSource {
    async fn top_partners(
        &self,
        location: &Location,
        flow: TradeFlow,
        year: i32,
        limit: usize,
    ) -> Result<Vec<(String, f64)>, DataError> {
        let reporter = self.reporter(location)?;
        let url = format!(
            "{}&includeDesc=true",
            self.build_url(reporter, &year.to_string(), flow.code())
        );
        let records = self.get_records(&url).await?;
        Ok(rank_partners(&records, limit))
    }
}

fn parse_records(body: &str) -> Result<Vec<ComtradeRecord>, DataError> {
    serde_json::from_str::<ComtradeResponse>(body)
        .map(|r| r.data)
        .map_err(|e| DataError::format(SOURCE_KEY, e.to_string()))
}

/// One value per period: the World partner row when present, otherwise the partner sum.
fn yearly_totals(records: &[ComtradeRecord]) -> Vec<TimeSeriesPoint> {
    #[derive(Default)]
    struct Totals {
        world: Option<f64>,
        partner_sum: Option<f64>,
    }

    let mut by_period: BTreeMap<String, Totals> = BTreeMap::new();
    for record in records {
        let totals = by_period.entry(record.period.label()).or_default();
        let Some(value) = record.primary_value else {
            continue;
        };
        if record.partner_code == Some(WORLD_PARTNER) {
            totals.world = Some(value);
        } else {
            totals.partner_sum = Some(totals.partner_sum.unwrap_or(0.0) + value);
        }
    }

    by_period
        .into_iter()
        .map(|(period, t)| TimeSeriesPoint::new(period, t.world.or(t.partner_sum)))
        .collect()
}

/// Largest partners first, values in millions of US$. The World aggregate is skipped.
fn rank_partners(records: &[ComtradeRecord], limit: usize) -> Vec<(String, f64)> {
    let mut by_partner: IndexMap<String, f64> = IndexMap::new();
    for record in records {
        if record.partner_code == Some(WORLD_PARTNER) {
            continue;
        }
        let Some(value) = record.primary_value.filter(|v| *v > 0.0) else {
            continue;
        };
        let name = record
            .partner_desc
            .clone()
            .or_else(|| record.partner_code.map(|c| c.to_string()))
            .unwrap_or_else(|| "Unknown".to_string());
        *by_partner.entry(name).or_default() += value / 1_000_000.0;
    }

    let mut ranked: Vec<(String, f64)> = by_partner.into_iter().collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
    ranked.truncate(limit);
    ranked
}
