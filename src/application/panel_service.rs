// Panel service - Use case for turning a selection into a rendered chart
use crate::application::chart_surface::CanvasContent;
use crate::application::indicator_source::{current_year, RemoteFetcher};
use crate::application::presenter::{ChartPresenter, Rendered};
use crate::domain::chart::{AxisTitles, ChartDocument, ChartPresentation, SeriesStyle};
use crate::domain::error::DataError;
use crate::domain::indicator::{self, DateRange, Location};
use crate::domain::series::{self, AlignedSeriesSet};
use crate::infrastructure::config::{PanelConfig, SeriesConfig};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Oldest year a selection may ask for.
const MIN_YEAR: i32 = 1900;
/// Longest window a selection may ask for, in years.
const MAX_SPAN_YEARS: i32 = 100;

#[derive(Debug, Clone, Deserialize)]
pub struct SelectionRequest {
    pub location: Location,
    /// Replaces the indicator of a single-series panel.
    #[serde(default)]
    pub indicator: Option<String>,
    #[serde(default)]
    pub start_year: Option<i32>,
    #[serde(default)]
    pub end_year: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionStatus {
    Rendered,
    NoData,
    Discarded,
    TargetNotFound,
}

#[derive(Debug, Clone, Serialize)]
pub struct SelectionOutcome {
    pub sequence: u64,
    pub outcome: SelectionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<ChartDocument>,
}

#[derive(Clone)]
pub struct PanelService {
    fetcher: Arc<RemoteFetcher>,
    presenter: Arc<Mutex<ChartPresenter>>,
    panels: Vec<PanelConfig>,
}

impl PanelService {
    pub fn new(
        fetcher: Arc<RemoteFetcher>,
        presenter: Arc<Mutex<ChartPresenter>>,
        panels: Vec<PanelConfig>,
    ) -> Self {
        Self {
            fetcher,
            presenter,
            panels,
        }
    }

    pub fn panels(&self) -> &[PanelConfig] {
        &self.panels
    }

    /// Mount a canvas for every configured panel.
    pub async fn mount_all(&self) {
        let mut presenter = self.presenter.lock().await;
        for panel in &self.panels {
            presenter.mount(&panel.canvas);
        }
    }

    pub async fn mount(&self, canvas_id: &str) {
        self.presenter.lock().await.mount(canvas_id);
    }

    pub async fn release(&self, canvas_id: &str) -> bool {
        self.presenter.lock().await.release(canvas_id)
    }

    pub async fn content(&self, canvas_id: &str) -> Option<CanvasContent> {
        self.presenter.lock().await.content(canvas_id)
    }

    /// Fetch, align and render the panel bound to `canvas_id` for a new selection.
    ///
    /// Only `UnknownIndicator` (from an indicator override) and `InvalidRange` are
    /// returned as errors; both are rejected before the selection is registered.
    pub async fn select(
        &self,
        canvas_id: &str,
        request: SelectionRequest,
    ) -> Result<SelectionOutcome, DataError> {
        let Some(panel) = self.panels.iter().find(|p| p.canvas == canvas_id) else {
            tracing::warn!("No panel configured for canvas {}", canvas_id);
            return Ok(SelectionOutcome {
                sequence: 0,
                outcome: SelectionStatus::TargetNotFound,
                chart: None,
            });
        };

        let series_configs = effective_series(panel, request.indicator.as_deref())?;
        let range = requested_range(&request, current_year())?;
        let sequence = self.presenter.lock().await.begin_selection(canvas_id);

        let aligned = match &panel.partners {
            Some(partners) => {
                let rows = self
                    .fetcher
                    .fetch_top_partners(
                        &request.location,
                        partners.flow,
                        partners.year.or(request.end_year),
                        partners.limit,
                    )
                    .await;
                AlignedSeriesSet::from_rows(panel.title.clone(), rows)
            }
            None => {
                let fetches = series_configs
                    .iter()
                    .map(|s| self.fetcher.fetch(&request.location, &s.indicator, range));
                let fetched = join_all(fetches)
                    .await
                    .into_iter()
                    .collect::<Result<Vec<_>, _>>()?;
                series::align(&fetched)
            }
        };

        let presentation = presentation_for(panel, &series_configs);
        let mut presenter = self.presenter.lock().await;
        let rendered = presenter.render_current(canvas_id, sequence, &aligned, &presentation);

        let (outcome, chart) = match rendered {
            Ok(Some(Rendered::Chart(_))) => (
                SelectionStatus::Rendered,
                match presenter.content(canvas_id) {
                    Some(CanvasContent::Chart { chart, .. }) => Some(chart),
                    _ => None,
                },
            ),
            Ok(Some(Rendered::NoData)) => (SelectionStatus::NoData, None),
            Ok(None) => (SelectionStatus::Discarded, None),
            Err(DataError::TargetNotFound { .. }) => (SelectionStatus::TargetNotFound, None),
            Err(e) => return Err(e),
        };

        Ok(SelectionOutcome {
            sequence,
            outcome,
            chart,
        })
    }
}

fn effective_series(
    panel: &PanelConfig,
    override_key: Option<&str>,
) -> Result<Vec<SeriesConfig>, DataError> {
    match (override_key, panel.series.as_slice()) {
        (Some(key), [single]) => {
            indicator::resolve(key)?;
            Ok(vec![SeriesConfig {
                indicator: key.to_string(),
                label: None,
                ..single.clone()
            }])
        }
        (Some(key), _) => {
            tracing::debug!(
                "Ignoring indicator override {} for multi-series panel {}",
                key,
                panel.canvas
            );
            Ok(panel.series.clone())
        }
        (None, _) => Ok(panel.series.clone()),
    }
}

/// `None` lets each source pick its own default window.
fn requested_range(
    request: &SelectionRequest,
    current_year: i32,
) -> Result<Option<DateRange>, DataError> {
    let (start, end) = match (request.start_year, request.end_year) {
        (None, None) => return Ok(None),
        (start, end) => {
            let end = end.unwrap_or(current_year);
            (start.unwrap_or(end.saturating_sub(10)), end)
        }
    };

    let range = DateRange::new(start, end);
    let reason = if range.start_year < MIN_YEAR {
        Some("starts before 1900")
    } else if range.end_year > current_year.saturating_add(1) {
        Some("ends after next year")
    } else if range.end_year - range.start_year >= MAX_SPAN_YEARS {
        Some("spans more than 100 years")
    } else {
        None
    };

    match reason {
        Some(reason) => {
            tracing::warn!(
                "Rejecting year range {}..={}: {}",
                range.start_year,
                range.end_year,
                reason
            );
            Err(DataError::InvalidRange {
                start_year: range.start_year,
                end_year: range.end_year,
                reason,
            })
        }
        None => Ok(Some(range)),
    }
}

fn presentation_for(panel: &PanelConfig, series: &[SeriesConfig]) -> ChartPresentation {
    let mut presentation = ChartPresentation {
        kind: panel.kind,
        axis_titles: AxisTitles {
            x: panel.x_title.clone(),
            y1: panel.y1_title.clone(),
            y2: panel.y2_title.clone(),
        },
        units: panel.units.clone(),
        ..Default::default()
    };

    for s in series {
        let descriptor = indicator::resolve(&s.indicator).ok();
        presentation
            .axis_assignment
            .insert(s.indicator.clone(), s.axis);
        if let Some(color) = &s.color {
            presentation.series_style.insert(
                s.indicator.clone(),
                SeriesStyle {
                    color: color.clone(),
                    fill_area: s.fill,
                },
            );
        }
        let label = s
            .label
            .clone()
            .or_else(|| descriptor.map(|d| d.title.to_string()));
        if let Some(label) = label {
            presentation.series_labels.insert(s.indicator.clone(), label);
        }
    }

    if series.len() == 1 && presentation.units.is_none() {
        presentation.units = indicator::resolve(&series[0].indicator)
            .ok()
            .map(|d| d.unit.to_string());
    }

    presentation
}
