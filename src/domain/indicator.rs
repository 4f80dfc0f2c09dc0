// Indicator registry and request vocabulary
use super::error::DataError;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    WorldBank,
    Who,
    Comtrade,
    OpenWeather,
}

/// How a source identifies the place it reports on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeFormat {
    Alpha2,
    Alpha3,
    Numeric,
    Coordinates,
}

impl SourceKind {
    pub fn key(&self) -> &'static str {
        match self {
            SourceKind::WorldBank => "worldbank",
            SourceKind::Who => "who",
            SourceKind::Comtrade => "comtrade",
            SourceKind::OpenWeather => "openweather",
        }
    }

    pub fn code_format(&self) -> CodeFormat {
        match self {
            SourceKind::WorldBank => CodeFormat::Alpha2,
            SourceKind::Who => CodeFormat::Alpha3,
            SourceKind::Comtrade => CodeFormat::Numeric,
            SourceKind::OpenWeather => CodeFormat::Coordinates,
        }
    }

    /// Comtrade publishes with a lag, so it only asks for last year.
    pub fn default_range(&self, current_year: i32) -> DateRange {
        match self {
            SourceKind::Comtrade => DateRange::new(current_year - 1, current_year - 1),
            _ => DateRange::new(current_year - 10, current_year),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start_year: i32,
    pub end_year: i32,
}

impl DateRange {
    pub fn new(start_year: i32, end_year: i32) -> Self {
        if start_year <= end_year {
            Self { start_year, end_year }
        } else {
            Self {
                start_year: end_year,
                end_year: start_year,
            }
        }
    }

    pub fn years(&self) -> impl Iterator<Item = i32> {
        self.start_year..=self.end_year
    }
}

/// A selected place, carrying every code format the sources understand.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Location {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub iso2: Option<String>,
    #[serde(default)]
    pub iso3: Option<String>,
    #[serde(default)]
    pub numeric: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
}

impl Location {
    /// Returns the country code in the given format, if the caller supplied it.
    pub fn code(&self, format: CodeFormat) -> Option<&str> {
        match format {
            CodeFormat::Alpha2 => self.iso2.as_deref(),
            CodeFormat::Alpha3 => self.iso3.as_deref(),
            CodeFormat::Numeric => self.numeric.as_deref(),
            CodeFormat::Coordinates => None,
        }
    }

    pub fn coordinates(&self) -> Option<(f64, f64)> {
        self.lat.zip(self.lon)
    }

    /// Label used as `country_code` on fetched series.
    pub fn label_for(&self, format: CodeFormat) -> String {
        match format {
            CodeFormat::Coordinates => match self.coordinates() {
                Some((lat, lon)) => format!("{lat:.4},{lon:.4}"),
                None => self.name.clone(),
            },
            other => self.code(other).unwrap_or_default().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IndicatorDescriptor {
    pub key: &'static str,
    pub upstream_id: &'static str,
    pub title: &'static str,
    pub unit: &'static str,
    pub source: SourceKind,
}

const fn indicator(
    key: &'static str,
    source: SourceKind,
    upstream_id: &'static str,
    title: &'static str,
    unit: &'static str,
) -> IndicatorDescriptor {
    IndicatorDescriptor {
        key,
        upstream_id,
        title,
        unit,
        source,
    }
}

static INDICATORS: &[IndicatorDescriptor] = &[
    indicator(
        "CPI",
        SourceKind::WorldBank,
        "FP.CPI.TOTL",
        "Consumer Price Index",
        "index (2010 = 100)",
    ),
    indicator(
        "savings",
        SourceKind::WorldBank,
        "NY.GNS.ICTR.ZS",
        "Gross savings (% of GDP)",
        "% of GDP",
    ),
    indicator(
        "internet",
        SourceKind::WorldBank,
        "IT.NET.USER.ZS",
        "Individuals using the Internet (%)",
        "% of population",
    ),
    indicator(
        "BirthRate",
        SourceKind::WorldBank,
        "SP.DYN.CBRT.IN",
        "Birth rate, crude (per 1,000 people)",
        "per 1,000 people",
    ),
    indicator(
        "AccessToElectricity",
        SourceKind::WorldBank,
        "EG.ELC.ACCS.ZS",
        "Access to electricity (% of population)",
        "% of population",
    ),
    indicator(
        "SafeWaterAccess",
        SourceKind::WorldBank,
        "SH.H2O.SMDW.ZS",
        "People using safely managed drinking water services (% of population)",
        "% of population",
    ),
    indicator(
        "ODAreceived",
        SourceKind::WorldBank,
        "DT.ODA.ALLD.CD",
        "Net official development assistance and official aid received (current US$)",
        "current US$",
    ),
    indicator("NetMigration", SourceKind::WorldBank, "SM.POP.NETM", "Net migration", "people"),
    indicator(
        "InterestRate",
        SourceKind::WorldBank,
        "FR.INR.LEND",
        "Benchmark Interest Rate (%)",
        "%",
    ),
    indicator("Inflation", SourceKind::WorldBank, "FP.CPI.TOTL.ZG", "Inflation Rate (%)", "%"),
    indicator(
        "PVT-D",
        SourceKind::Who,
        "CHE_PC_USD",
        "Current health expenditure per capita",
        "US$",
    ),
    indicator(
        "ROAD_TRAFFIC_DEATH",
        SourceKind::Who,
        "RTI_EST",
        "Estimated road traffic death rate",
        "per 100,000 population",
    ),
    indicator(
        "FOODBORNE_ILLNESS",
        SourceKind::Who,
        "FBI_EST",
        "Foodborne disease burden",
        "per 100,000 population",
    ),
    indicator(
        "NEONATAL_MORTALITY",
        SourceKind::Who,
        "NMR",
        "Neonatal mortality rate",
        "per 1,000 live births",
    ),
    indicator("Exports", SourceKind::Comtrade, "X", "Total exports", "US$"),
    indicator("Imports", SourceKind::Comtrade, "M", "Total imports", "US$"),
    indicator("TempMax", SourceKind::OpenWeather, "temp_max", "Max(°C)", "°C"),
    indicator("TempMin", SourceKind::OpenWeather, "temp_min", "Min(°C)", "°C"),
];

pub fn resolve(key: &str) -> Result<&'static IndicatorDescriptor, DataError> {
    INDICATORS
        .iter()
        .find(|d| d.key == key)
        .ok_or_else(|| DataError::UnknownIndicator(key.to_string()))
}

pub fn all() -> &'static [IndicatorDescriptor] {
    INDICATORS
}

pub fn for_source(source: SourceKind) -> impl Iterator<Item = &'static IndicatorDescriptor> {
    INDICATORS.iter().filter(move |d| d.source == source)
}
