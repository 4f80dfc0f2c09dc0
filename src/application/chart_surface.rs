// Surface trait for whatever actually draws charts into canvases
use crate::domain::chart::ChartDocument;
use serde::Serialize;

/// What a mounted canvas currently shows.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CanvasContent {
    Blank,
    Chart { instance: u64, chart: ChartDocument },
    Message { text: String },
}

pub trait ChartSurface: Send + Sync {
    /// Make a canvas available for drawing. Mounting twice keeps the existing content.
    fn mount(&mut self, canvas_id: &str);

    /// Remove a canvas from the view. Returns false when it was not mounted.
    fn unmount(&mut self, canvas_id: &str) -> bool;

    fn has_canvas(&self, canvas_id: &str) -> bool;

    /// Create a chart instance bound to the canvas and return its instance id.
    fn create_chart(&mut self, canvas_id: &str, chart: ChartDocument) -> u64;

    fn destroy_chart(&mut self, canvas_id: &str, instance: u64);

    /// Clear the canvas and draw a static message.
    fn draw_message(&mut self, canvas_id: &str, text: &str);

    fn content(&self, canvas_id: &str) -> Option<CanvasContent>;

    /// Chart instances not yet destroyed, across all canvases.
    fn live_chart_count(&self) -> usize;
}
