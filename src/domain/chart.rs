// Chart presentation models
use super::series::AlignedSeriesSet;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const NO_DATA_MESSAGE: &str = "No Data Available";

const DEFAULT_COLOR: &str = "rgba(54, 162, 235, 1)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    #[default]
    Line,
    Bar,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AxisSlot {
    #[default]
    Primary,
    Secondary,
}

impl AxisSlot {
    fn axis_id(&self) -> &'static str {
        match self {
            AxisSlot::Primary => "y1",
            AxisSlot::Secondary => "y2",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AxisTitles {
    pub x: String,
    pub y1: String,
    pub y2: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesStyle {
    pub color: String,
    #[serde(default)]
    pub fill_area: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChartPresentation {
    pub kind: ChartKind,
    pub axis_assignment: HashMap<String, AxisSlot>,
    pub axis_titles: AxisTitles,
    pub series_style: HashMap<String, SeriesStyle>,
    /// Display labels per series name; the series name is used when absent.
    pub series_labels: HashMap<String, String>,
    pub units: Option<String>,
}

/// Chart configuration handed to the rendering surface, shaped like a chart.js config.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartDocument {
    #[serde(rename = "type")]
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub datasets: Vec<Dataset>,
    pub scales: Scales,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tooltip_suffix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub data: Vec<Option<f64>>,
    #[serde(rename = "borderColor")]
    pub border_color: String,
    #[serde(rename = "backgroundColor")]
    pub background_color: String,
    pub fill: bool,
    #[serde(rename = "yAxisID")]
    pub y_axis_id: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Scales {
    pub x: AxisSpec,
    pub y1: AxisSpec,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y2: Option<AxisSpec>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AxisSpec {
    pub title: String,
    pub position: &'static str,
}

impl ChartDocument {
    pub fn compose(aligned: &AlignedSeriesSet, presentation: &ChartPresentation) -> Self {
        let datasets: Vec<Dataset> = aligned
            .series
            .iter()
            .map(|(name, values)| {
                let style = presentation.series_style.get(name);
                let color = style.map_or(DEFAULT_COLOR, |s| s.color.as_str());
                let axis = presentation
                    .axis_assignment
                    .get(name)
                    .copied()
                    .unwrap_or_default();

                Dataset {
                    label: presentation
                        .series_labels
                        .get(name)
                        .cloned()
                        .unwrap_or_else(|| name.clone()),
                    data: values.clone(),
                    border_color: color.to_string(),
                    background_color: translucent(color),
                    fill: style.is_some_and(|s| s.fill_area),
                    y_axis_id: axis.axis_id(),
                }
            })
            .collect();

        let uses_secondary = datasets.iter().any(|d| d.y_axis_id == "y2");
        let y2 = if uses_secondary || presentation.axis_titles.y2.is_some() {
            Some(AxisSpec {
                title: presentation.axis_titles.y2.clone().unwrap_or_default(),
                position: "right",
            })
        } else {
            None
        };

        Self {
            kind: presentation.kind,
            labels: aligned.labels.clone(),
            datasets,
            scales: Scales {
                x: AxisSpec {
                    title: presentation.axis_titles.x.clone(),
                    position: "bottom",
                },
                y1: AxisSpec {
                    title: presentation.axis_titles.y1.clone(),
                    position: "left",
                },
                y2,
            },
            tooltip_suffix: presentation.units.clone(),
        }
    }
}

/// Turns `rgba(r, g, b, a)` / `rgb(r, g, b)` into the same colour at 0.2 alpha.
fn translucent(color: &str) -> String {
    let inner = color
        .strip_prefix("rgba(")
        .or_else(|| color.strip_prefix("rgb("))
        .and_then(|rest| rest.strip_suffix(')'));

    match inner {
        Some(inner) => {
            let channels: Vec<&str> = inner.split(',').map(str::trim).take(3).collect();
            if channels.len() == 3 {
                format!("rgba({}, {}, {}, 0.2)", channels[0], channels[1], channels[2])
            } else {
                color.to_string()
            }
        }
        None => color.to_string(),
    }
}
