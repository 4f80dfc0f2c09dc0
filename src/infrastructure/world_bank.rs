// World Bank Indicators API source
use crate::application::indicator_source::IndicatorSource;
use crate::domain::error::DataError;
use crate::domain::indicator::{DateRange, IndicatorDescriptor, Location, SourceKind};
use crate::domain::series::{TimeSeries, TimeSeriesPoint};
use crate::infrastructure::http::UpstreamClient;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

const SOURCE_KEY: &str = "worldbank";

#[derive(Debug, Deserialize)]
struct WorldBankRecord {
    date: String,
    value: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct WorldBankSource {
    client: Arc<UpstreamClient>,
    base: String,
}

impl WorldBankSource {
    pub fn new(client: Arc<UpstreamClient>, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    fn build_url(&self, code: &str, indicator_id: &str, range: DateRange) -> String {
        format!(
            "{}/v2/countries/{}/indicators/{}?date={}:{}&format=json",
            self.base,
            urlencoding::encode(code),
            indicator_id,
            range.start_year,
            range.end_year
        )
    }
}

#[async_trait]
impl IndicatorSource for WorldBankSource {
    fn kind(&self) -> SourceKind {
        SourceKind::WorldBank
    }

    async fn fetch_series(
        &self,
        location: &Location,
        indicator: &IndicatorDescriptor,
        range: DateRange,
    ) -> Result<TimeSeries, DataError> {
        let code = location
            .code(self.kind().code_format())
            .ok_or_else(|| DataError::MissingLocation {
                source_key: SOURCE_KEY.to_string(),
                field: "iso2",
            })?;

        let url = self.build_url(code, indicator.upstream_id, range);
        let body = self.client.get_text(SOURCE_KEY, &url, &[]).await?;
        let points = parse_world_bank(&body)?;

        Ok(TimeSeries::new(SOURCE_KEY, code, indicator.key, points))
    }
}

/// Parse the `[metadata, records]` envelope. A `null` record list means no data.
pub fn parse_world_bank(body: &str) -> Result<Vec<TimeSeriesPoint>, DataError> {
    let root: Value =
        serde_json::from_str(body).map_err(|e| DataError::format(SOURCE_KEY, e.to_string()))?;

    let Some(parts) = root.as_array() else {
        return Err(DataError::format(SOURCE_KEY, "expected a [metadata, records] array"));
    };

    match parts.as_slice() {
        [_, Value::Null, ..] => Ok(Vec::new()),
        [_, records, ..] => {
            let records: Vec<WorldBankRecord> = serde_json::from_value(records.clone())
                .map_err(|e| DataError::format(SOURCE_KEY, e.to_string()))?;
            Ok(records
                .into_iter()
                .map(|r| TimeSeriesPoint::new(r.date, r.value))
                .collect())
        }
        [meta] => {
            let message = meta
                .pointer("/message/0/value")
                .and_then(Value::as_str)
                .unwrap_or("missing records");
            Err(DataError::format(SOURCE_KEY, message))
        }
        [] => Err(DataError::format(SOURCE_KEY, "empty envelope")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicator_source::RemoteFetcher;
    use crate::domain::indicator;
    use crate::infrastructure::test_support::serve;
    use axum::{
        extract::{Path, Query},
        http::StatusCode,
        routing::get,
        Router,
    };
    use std::collections::HashMap;
    use std::time::Duration;

    fn korea() -> Location {
        Location {
            name: "Seoul".to_string(),
            iso2: Some("KR".to_string()),
            ..Default::default()
        }
    }

    fn source(base: &str) -> Arc<WorldBankSource> {
        let client = UpstreamClient::new(Duration::from_secs(5), None).unwrap();
        Arc::new(WorldBankSource::new(Arc::new(client), base))
    }

    #[test]
    fn test_parse_newest_first_records() {
        let body = r#"[{}, [{"date":"2021","value":3.2},{"date":"2020","value":2.9}]]"#;
        let series = TimeSeries::new(SOURCE_KEY, "KR", "CPI", parse_world_bank(body).unwrap());

        assert_eq!(
            series.points(),
            &[
                TimeSeriesPoint::new("2020", Some(2.9)),
                TimeSeriesPoint::new("2021", Some(3.2)),
            ]
        );
    }

    #[test]
    fn test_parse_null_records_and_values() {
        let body = r#"[{"page":1,"pages":0,"total":0}, null]"#;
        assert!(parse_world_bank(body).unwrap().is_empty());

        let body = r#"[{"page":1}, [{"date":"2023","value":null,"indicator":{"id":"FP.CPI.TOTL"}}]]"#;
        assert_eq!(
            parse_world_bank(body).unwrap(),
            vec![TimeSeriesPoint::new("2023", None)]
        );
    }

    #[test]
    fn test_parse_api_message() {
        let body = r#"[{"message":[{"id":"120","key":"Invalid value","value":"The provided parameter value is not valid"}]}]"#;
        assert_eq!(
            parse_world_bank(body).unwrap_err(),
            DataError::format(SOURCE_KEY, "The provided parameter value is not valid")
        );
    }

    #[test]
    fn test_parse_wrong_shape() {
        assert!(matches!(
            parse_world_bank(r#"{"data": []}"#),
            Err(DataError::UpstreamFormat { .. })
        ));
        assert!(matches!(
            parse_world_bank("<html>"),
            Err(DataError::UpstreamFormat { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_builds_request_and_sorts() {
        let router = Router::new().route(
            "/v2/countries/:code/indicators/:id",
            get(
                |Path((code, id)): Path<(String, String)>,
                 Query(q): Query<HashMap<String, String>>| async move {
                    assert_eq!(code, "KR");
                    assert_eq!(id, "FP.CPI.TOTL");
                    assert_eq!(q.get("date").map(String::as_str), Some("2020:2021"));
                    assert_eq!(q.get("format").map(String::as_str), Some("json"));
                    r#"[{}, [{"date":"2021","value":3.2},{"date":"2020","value":2.9}]]"#
                },
            ),
        );
        let base = serve(router).await;

        let series = source(&base)
            .fetch_series(
                &korea(),
                indicator::resolve("CPI").unwrap(),
                DateRange::new(2020, 2021),
            )
            .await
            .unwrap();

        assert_eq!(series.source_key, "worldbank");
        assert_eq!(series.country_code, "KR");
        let periods: Vec<_> = series.points().iter().map(|p| p.period.as_str()).collect();
        assert_eq!(periods, vec!["2020", "2021"]);
    }

    #[tokio::test]
    async fn test_server_error_yields_empty_series() {
        let router = Router::new().route(
            "/v2/countries/:code/indicators/:id",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "upstream down") }),
        );
        let base = serve(router).await;
        let fetcher = RemoteFetcher::new().with_source(source(&base));

        let series = fetcher.fetch(&korea(), "savings", None).await.unwrap();

        assert!(series.is_empty());
    }
}
