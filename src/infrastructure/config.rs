use crate::application::indicator_source::TradeFlow;
use crate::domain::chart::{AxisSlot, ChartKind};
use crate::domain::indicator;
use serde::Deserialize;
use std::collections::HashSet;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub relay: Option<RelaySettings>,
    #[serde(default)]
    pub sources: SourceSettings,
    #[serde(default)]
    pub panels: Vec<PanelConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RelayMode {
    /// `relay + url`
    #[default]
    Prefix,
    /// `relay?url=<encoded url>`
    Query,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RelaySettings {
    pub url: String,
    #[serde(default)]
    pub mode: RelayMode,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceSettings {
    #[serde(default = "default_world_bank_base")]
    pub world_bank_base: String,
    #[serde(default = "default_who_base")]
    pub who_base: String,
    #[serde(default = "default_comtrade_base")]
    pub comtrade_base: String,
    pub comtrade_key: Option<String>,
    #[serde(default = "default_openweather_base")]
    pub openweather_base: String,
    pub openweather_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            world_bank_base: default_world_bank_base(),
            who_base: default_who_base(),
            comtrade_base: default_comtrade_base(),
            comtrade_key: None,
            openweather_base: default_openweather_base(),
            openweather_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PanelConfig {
    pub canvas: String,
    pub title: String,
    #[serde(default)]
    pub kind: ChartKind,
    #[serde(default = "default_x_title")]
    pub x_title: String,
    #[serde(default)]
    pub y1_title: String,
    pub y2_title: Option<String>,
    pub units: Option<String>,
    #[serde(default)]
    pub series: Vec<SeriesConfig>,
    pub partners: Option<PartnersConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SeriesConfig {
    pub indicator: String,
    pub label: Option<String>,
    pub color: Option<String>,
    #[serde(default)]
    pub axis: AxisSlot,
    #[serde(default)]
    pub fill: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PartnersConfig {
    pub flow: TradeFlow,
    #[serde(default = "default_partner_limit")]
    pub limit: usize,
    pub year: Option<i32>,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_world_bank_base() -> String {
    "https://api.worldbank.org".to_string()
}

fn default_who_base() -> String {
    "https://apps.who.int/gho/athena/api".to_string()
}

fn default_comtrade_base() -> String {
    "https://comtradeapi.un.org".to_string()
}

fn default_openweather_base() -> String {
    "https://api.openweathermap.org".to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_x_title() -> String {
    "Year".to_string()
}

fn default_partner_limit() -> usize {
    10
}

/// Load `config/app.*`, overridden by `ATLAS__SECTION__KEY` environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/app").required(false))
        .add_source(config::Environment::with_prefix("ATLAS").separator("__"))
        .build()?;

    let app: AppConfig = settings.try_deserialize()?;
    validate_panels(&app.panels)?;
    Ok(app)
}

/// Every panel needs a unique canvas and exactly one kind of content: partners,
/// or series of distinct indicators that exist.
pub fn validate_panels(panels: &[PanelConfig]) -> anyhow::Result<()> {
    let mut seen = HashSet::new();
    for panel in panels {
        if !seen.insert(panel.canvas.as_str()) {
            anyhow::bail!("canvas `{}` is configured twice", panel.canvas);
        }
        match (panel.series.is_empty(), panel.partners.is_some()) {
            (true, false) => {
                anyhow::bail!("panel `{}` has neither series nor partners", panel.canvas)
            }
            (false, true) => {
                anyhow::bail!("panel `{}` has both series and partners", panel.canvas)
            }
            _ => {}
        }

        let mut indicators = HashSet::new();
        for series in &panel.series {
            indicator::resolve(&series.indicator)
                .map_err(|e| anyhow::anyhow!("panel `{}`: {}", panel.canvas, e))?;
            if !indicators.insert(series.indicator.as_str()) {
                anyhow::bail!(
                    "panel `{}` lists indicator `{}` twice",
                    panel.canvas,
                    series.indicator
                );
            }
        }
    }
    Ok(())
}
