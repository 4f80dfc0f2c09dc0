// Chart presenter - one live chart per canvas, newest selection wins
use crate::application::chart_surface::{CanvasContent, ChartSurface};
use crate::domain::chart::{ChartDocument, ChartPresentation, NO_DATA_MESSAGE};
use crate::domain::error::DataError;
use crate::domain::series::AlignedSeriesSet;
use std::collections::HashMap;

/// Reference to the chart currently rendered into a canvas.
///
/// A handle is only valid until the next render or destroy on the same canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartHandle {
    canvas_id: String,
    generation: u64,
    instance: u64,
}

impl ChartHandle {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Rendered {
    Chart(ChartHandle),
    NoData,
}

pub struct ChartPresenter {
    surface: Box<dyn ChartSurface>,
    live: HashMap<String, ChartHandle>,
    latest_intent: HashMap<String, u64>,
    next_generation: u64,
    next_sequence: u64,
}

impl ChartPresenter {
    pub fn new(surface: Box<dyn ChartSurface>) -> Self {
        Self {
            surface,
            live: HashMap::new(),
            latest_intent: HashMap::new(),
            next_generation: 0,
            next_sequence: 0,
        }
    }

    /// Record a new selection for the canvas and return its sequence number.
    /// Any earlier selection on the same canvas becomes stale.
    pub fn begin_selection(&mut self, canvas_id: &str) -> u64 {
        self.next_sequence += 1;
        self.latest_intent
            .insert(canvas_id.to_string(), self.next_sequence);
        self.next_sequence
    }

    pub fn is_current(&self, canvas_id: &str, sequence: u64) -> bool {
        self.latest_intent.get(canvas_id) == Some(&sequence)
    }

    /// Render only if `sequence` is still the latest selection for the canvas.
    /// Returns `Ok(None)` when the result is stale and was dropped.
    pub fn render_current(
        &mut self,
        canvas_id: &str,
        sequence: u64,
        aligned: &AlignedSeriesSet,
        presentation: &ChartPresentation,
    ) -> Result<Option<Rendered>, DataError> {
        if !self.is_current(canvas_id, sequence) {
            tracing::debug!(
                "Discarding stale result #{} for canvas {}",
                sequence,
                canvas_id
            );
            return Ok(None);
        }
        self.render(canvas_id, aligned, presentation).map(Some)
    }

    pub fn render(
        &mut self,
        canvas_id: &str,
        aligned: &AlignedSeriesSet,
        presentation: &ChartPresentation,
    ) -> Result<Rendered, DataError> {
        if !self.surface.has_canvas(canvas_id) {
            tracing::warn!("Canvas {} not found, skipping render", canvas_id);
            return Err(DataError::TargetNotFound {
                canvas_id: canvas_id.to_string(),
            });
        }

        // The old instance must be gone before anything new touches the canvas.
        self.destroy_live(canvas_id);

        if aligned.is_empty() {
            self.surface.draw_message(canvas_id, NO_DATA_MESSAGE);
            return Ok(Rendered::NoData);
        }

        let chart = ChartDocument::compose(aligned, presentation);
        let instance = self.surface.create_chart(canvas_id, chart);

        self.next_generation += 1;
        let handle = ChartHandle {
            canvas_id: canvas_id.to_string(),
            generation: self.next_generation,
            instance,
        };
        self.live.insert(canvas_id.to_string(), handle.clone());
        tracing::debug!(
            "Rendered chart generation {} on canvas {} ({} live)",
            handle.generation,
            canvas_id,
            self.surface.live_chart_count()
        );

        Ok(Rendered::Chart(handle))
    }

    /// Destroy the chart behind `handle`. Fails if the handle has been superseded.
    pub fn destroy(&mut self, handle: &ChartHandle) -> Result<(), DataError> {
        match self.live.get(&handle.canvas_id) {
            Some(current) if current == handle => {
                self.destroy_live(&handle.canvas_id);
                Ok(())
            }
            _ => Err(DataError::StaleHandle {
                canvas_id: handle.canvas_id.clone(),
            }),
        }
    }

    pub fn mount(&mut self, canvas_id: &str) {
        self.surface.mount(canvas_id);
    }

    /// The view navigated away: destroy the chart, forget pending selections
    /// and unmount the canvas.
    pub fn release(&mut self, canvas_id: &str) -> bool {
        if let Some(handle) = self.live.get(canvas_id).cloned() {
            if let Err(e) = self.destroy(&handle) {
                tracing::warn!("{}", e);
            }
        }
        self.latest_intent.remove(canvas_id);
        self.surface.unmount(canvas_id)
    }

    pub fn content(&self, canvas_id: &str) -> Option<CanvasContent> {
        self.surface.content(canvas_id)
    }

    #[cfg(test)]
    pub fn live_chart_count(&self) -> usize {
        self.surface.live_chart_count()
    }

    fn destroy_live(&mut self, canvas_id: &str) {
        if let Some(previous) = self.live.remove(canvas_id) {
            tracing::debug!(
                "Destroying chart generation {} on canvas {}",
                previous.generation,
                canvas_id
            );
            self.surface.destroy_chart(canvas_id, previous.instance);
        }
    }
}
