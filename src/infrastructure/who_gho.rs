// WHO Global Health Observatory (Athena XML) source
use crate::application::indicator_source::IndicatorSource;
use crate::domain::error::DataError;
use crate::domain::indicator::{DateRange, IndicatorDescriptor, Location, SourceKind};
use crate::domain::series::{TimeSeries, TimeSeriesPoint};
use crate::infrastructure::http::UpstreamClient;
use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::sync::Arc;

const SOURCE_KEY: &str = "who";

#[derive(Debug, Clone)]
pub struct WhoSource {
    client: Arc<UpstreamClient>,
    base: String,
}

impl WhoSource {
    pub fn new(client: Arc<UpstreamClient>, base: impl Into<String>) -> Self {
        Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
        }
    }

    fn build_url(&self, code: &str, indicator_id: &str, range: DateRange) -> String {
        format!(
            "{}/GHO/{}?filter=COUNTRY:{}&filter=YEAR:{}:{}",
            self.base,
            indicator_id,
            urlencoding::encode(code),
            range.start_year,
            range.end_year
        )
    }
}

#[async_trait]
impl IndicatorSource for WhoSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Who
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
                field: "iso3",
            })?;

        let url = self.build_url(code, indicator.upstream_id, range);
        let body = self
            .client
            .get_text(SOURCE_KEY, &url, &[("Accept", "application/xml")])
            .await?;
        let points = parse_gho(&body)?;

        Ok(TimeSeries::new(SOURCE_KEY, code, indicator.key, points))
    }
}

#[derive(Default)]
struct Observation {
    year: Option<String>,
    value: Option<f64>,
}

impl Observation {
    fn into_point(self) -> Result<TimeSeriesPoint, DataError> {
        let year = self
            .year
            .ok_or_else(|| DataError::format(SOURCE_KEY, "observation without a YEAR dimension"))?;
        Ok(TimeSeriesPoint::new(year, self.value))
    }
}

/// Parse a `<GHO><Data><Observation>…` document into one point per observation.
pub fn parse_gho(body: &str) -> Result<Vec<TimeSeriesPoint>, DataError> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut root_seen = false;
    let mut current: Option<Observation> = None;
    let mut points = Vec::new();

    loop {
        let (element, self_closing) = match reader.read_event() {
            Ok(Event::Start(e)) => (e, false),
            Ok(Event::Empty(e)) => (e, true),
            Ok(Event::End(e)) => {
                if e.local_name().as_ref() == b"Observation" {
                    if let Some(observation) = current.take() {
                        points.push(observation.into_point()?);
                    }
                }
                continue;
            }
            Ok(Event::Eof) => break,
            Ok(_) => continue,
            Err(e) => return Err(DataError::format(SOURCE_KEY, e.to_string())),
        };

        let name = element.local_name();
        if !root_seen {
            if name.as_ref() != b"GHO" {
                return Err(DataError::format(
                    SOURCE_KEY,
                    format!("unexpected root <{}>", String::from_utf8_lossy(name.as_ref())),
                ));
            }
            root_seen = true;
            continue;
        }

        match name.as_ref() {
            b"Observation" => {
                let observation = Observation {
                    year: None,
                    value: numeric(&element)?,
                };
                if self_closing {
                    points.push(observation.into_point()?);
                } else {
                    current = Some(observation);
                }
            }
            b"Dim" => {
                if let Some(observation) = current.as_mut() {
                    if attribute(&element, b"Category")?.as_deref() == Some("YEAR") {
                        observation.year = attribute(&element, b"Code")?;
                    }
                }
            }
            b"Value" => {
                if let Some(observation) = current.as_mut() {
                    if let Some(value) = numeric(&element)? {
                        observation.value = Some(value);
                    }
                }
            }
            _ => {}
        }
    }

    if !root_seen {
        return Err(DataError::format(SOURCE_KEY, "missing <GHO> root element"));
    }
    Ok(points)
}

fn attribute(element: &BytesStart, key: &[u8]) -> Result<Option<String>, DataError> {
    for attr in element.attributes() {
        let attr = attr.map_err(|e| DataError::format(SOURCE_KEY, e.to_string()))?;
        if attr.key.as_ref() == key {
            let value = attr
                .unescape_value()
                .map_err(|e| DataError::format(SOURCE_KEY, e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn numeric(element: &BytesStart) -> Result<Option<f64>, DataError> {
    match attribute(element, b"Numeric")? {
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| DataError::format(SOURCE_KEY, format!("bad Numeric value `{raw}`"))),
        None => Ok(None),
    }
}
