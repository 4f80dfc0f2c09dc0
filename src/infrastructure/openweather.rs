// OpenWeatherMap 5-day forecast, reduced to daily max/min temperatures
use crate::application::indicator_source::IndicatorSource;
use crate::domain::error::DataError;
use crate::domain::indicator::{CodeFormat, DateRange, IndicatorDescriptor, Location, SourceKind};
use crate::domain::series::{TimeSeries, TimeSeriesPoint};
use crate::infrastructure::http::UpstreamClient;
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

const SOURCE_KEY: &str = "openweather";

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    list: Vec<ForecastEntry>,
}

#[derive(Debug, Deserialize)]
struct ForecastEntry {
    dt: i64,
    main: ForecastMain,
}

#[derive(Debug, Deserialize)]
struct ForecastMain {
    temp: f64,
}

#[derive(Debug, Clone, Copy)]
enum DailyReduction {
    Max,
    Min,
}

pub struct OpenWeatherSource {
    client: Arc<UpstreamClient>,
    base: String,
    key: SecretString,
}

impl OpenWeatherSource {
    pub fn new(client: Arc<UpstreamClient>, base: impl Into<String>, key: String) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            key: SecretString::from(key),
        }
    }
}

#[async_trait]
impl IndicatorSource for OpenWeatherSource {
    fn kind(&self) -> SourceKind {
        SourceKind::OpenWeather
    }

    /// The forecast endpoint has no date filter, so `range` is ignored.
    async fn fetch_series(
        &self,
        location: &Location,
        indicator: &IndicatorDescriptor,
        _range: DateRange,
    ) -> Result<TimeSeries, DataError> {
        let (lat, lon) = location
            .coordinates()
            .ok_or_else(|| DataError::MissingLocation {
                source_key: SOURCE_KEY.to_string(),
                field: "lat/lon",
            })?;

        let reduction = match indicator.upstream_id {
            "temp_max" => DailyReduction::Max,
            "temp_min" => DailyReduction::Min,
            other => {
                return Err(DataError::format(
                    SOURCE_KEY,
                    format!("no daily reduction for `{other}`"),
                ));
            }
        };

        let url = format!(
            "{}/data/2.5/forecast?lat={}&lon={}&appid={}&units=metric",
            self.base,
            lat,
            lon,
            urlencoding::encode(self.key.expose_secret())
        );
        let body = self.client.get_text(SOURCE_KEY, &url, &[]).await?;
        let points = parse_forecast(&body, reduction)?;

        Ok(TimeSeries::new(
            SOURCE_KEY,
            location.label_for(CodeFormat::Coordinates),
            indicator.key,
            points,
        ))
    }
}

fn parse_forecast(
    body: &str,
    reduction: DailyReduction,
) -> Result<Vec<TimeSeriesPoint>, DataError> {
    let forecast: ForecastResponse =
        serde_json::from_str(body).map_err(|e| DataError::format(SOURCE_KEY, e.to_string()))?;

    let mut daily: BTreeMap<String, f64> = BTreeMap::new();
    for entry in forecast.list {
        let day = chrono::DateTime::from_timestamp(entry.dt, 0)
            .ok_or_else(|| DataError::format(SOURCE_KEY, format!("bad timestamp {}", entry.dt)))?
            .format("%Y-%m-%d")
            .to_string();

        daily
            .entry(day)
            .and_modify(|v| {
                *v = match reduction {
                    DailyReduction::Max => v.max(entry.main.temp),
                    DailyReduction::Min => v.min(entry.main.temp),
                }
            })
            .or_insert(entry.main.temp);
    }

    Ok(daily
        .into_iter()
        .map(|(day, temp)| TimeSeriesPoint::new(day, Some(temp)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator;
    use crate::infrastructure::test_support::serve;
    use axum::{extract::Query, routing::get, Router};
    use std::collections::HashMap;
    use std::time::Duration;

    // 2024-03-01T00:00Z, +3h, +24h
    const FORECAST: &str = r#"{"cod":"200","list":[
        {"dt":1709251200,"main":{"temp":4.5}},
        {"dt":1709262000,"main":{"temp":7.25}},
        {"dt":1709337600,"main":{"temp":-1.0}}
    ]}"#;

    #[test]
    fn test_daily_max_and_min() {
        assert_eq!(
            parse_forecast(FORECAST, DailyReduction::Max).unwrap(),
            vec![
                TimeSeriesPoint::new("2024-03-01", Some(7.25)),
                TimeSeriesPoint::new("2024-03-02", Some(-1.0)),
            ]
        );
        assert_eq!(
            parse_forecast(FORECAST, DailyReduction::Min).unwrap()[0],
            TimeSeriesPoint::new("2024-03-01", Some(4.5))
        );
    }

    #[test]
    fn test_missing_list() {
        assert!(matches!(
            parse_forecast(r#"{"cod":"401","message":"Invalid API key"}"#, DailyReduction::Max),
            Err(DataError::UpstreamFormat { .. })
        ));
    }

    #[tokio::test]
    async fn test_fetch_by_coordinates() {
        let router = Router::new().route(
            "/data/2.5/forecast",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("appid").map(String::as_str), Some("k3y"));
                assert_eq!(q.get("units").map(String::as_str), Some("metric"));
                assert_eq!(q.get("lat").map(String::as_str), Some("37.5"));
                FORECAST
            }),
        );
        let base = serve(router).await;
        let client = UpstreamClient::new(Duration::from_secs(5), None).unwrap();
        let source = OpenWeatherSource::new(Arc::new(client), base, "k3y".to_string());

        let location = Location {
            name: "Seoul".to_string(),
            lat: Some(37.5),
            lon: Some(127.0),
            ..Default::default()
        };
        let series = source
            .fetch_series(
                &location,
                indicator::resolve("TempMin").unwrap(),
                DateRange::new(2024, 2024),
            )
            .await
            .unwrap();

        assert_eq!(series.points().len(), 2);
        assert_eq!(series.points()[1].value, Some(-1.0));
    }
}
