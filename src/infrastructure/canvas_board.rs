// In-memory chart surface; clients poll canvases for their chart configuration
use crate::application::chart_surface::{CanvasContent, ChartSurface};
use crate::domain::chart::ChartDocument;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Default)]
pub struct CanvasBoard {
    canvases: HashMap<String, CanvasContent>,
    live_instances: HashSet<u64>,
    next_instance: u64,
}

impl CanvasBoard {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChartSurface for CanvasBoard {
    fn mount(&mut self, canvas_id: &str) {
        self.canvases
            .entry(canvas_id.to_string())
            .or_insert(CanvasContent::Blank);
    }

    fn unmount(&mut self, canvas_id: &str) -> bool {
        match self.canvases.remove(canvas_id) {
            Some(CanvasContent::Chart { instance, .. }) => {
                self.live_instances.remove(&instance);
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    fn has_canvas(&self, canvas_id: &str) -> bool {
        self.canvases.contains_key(canvas_id)
    }

    fn create_chart(&mut self, canvas_id: &str, chart: ChartDocument) -> u64 {
        self.next_instance += 1;
        let instance = self.next_instance;

        if let Some(CanvasContent::Chart { instance: old, .. }) = self.canvases.get(canvas_id) {
            tracing::error!(
                "Canvas {} still holds chart instance {} while creating {}",
                canvas_id,
                old,
                instance
            );
        }

        self.live_instances.insert(instance);
        self.canvases
            .insert(canvas_id.to_string(), CanvasContent::Chart { instance, chart });
        instance
    }

    fn destroy_chart(&mut self, canvas_id: &str, instance: u64) {
        self.live_instances.remove(&instance);
        if let Some(content) = self.canvases.get_mut(canvas_id) {
            let is_current = match content {
                CanvasContent::Chart { instance: current, .. } => *current == instance,
                _ => false,
            };
            if is_current {
                *content = CanvasContent::Blank;
            }
        }
    }

    fn draw_message(&mut self, canvas_id: &str, text: &str) {
        if let Some(content) = self.canvases.get_mut(canvas_id) {
            *content = CanvasContent::Message {
                text: text.to_string(),
            };
        }
    }

    fn content(&self, canvas_id: &str) -> Option<CanvasContent> {
        self.canvases.get(canvas_id).cloned()
    }

    fn live_chart_count(&self) -> usize {
        self.live_instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chart::ChartPresentation;
    use crate::domain::series::AlignedSeriesSet;

    fn chart() -> ChartDocument {
        let set = AlignedSeriesSet::from_rows("Exports", vec![("China".to_string(), 1.0)]);
        ChartDocument::compose(&set, &ChartPresentation::default())
    }

    #[test]
    fn test_mount_is_idempotent() {
        let mut board = CanvasBoard::new();
        board.mount("whoChart");
        let instance = board.create_chart("whoChart", chart());
        board.mount("whoChart");

        assert!(matches!(
            board.content("whoChart"),
            Some(CanvasContent::Chart { instance: i, .. }) if i == instance
        ));
    }

    #[test]
    fn test_destroy_clears_canvas() {
        let mut board = CanvasBoard::new();
        board.mount("whoChart");
        let instance = board.create_chart("whoChart", chart());
        assert_eq!(board.live_chart_count(), 1);

        board.destroy_chart("whoChart", instance);

        assert_eq!(board.live_chart_count(), 0);
        assert_eq!(board.content("whoChart"), Some(CanvasContent::Blank));
    }

    #[test]
    fn test_unmount_unknown_canvas() {
        let mut board = CanvasBoard::new();
        assert!(!board.unmount("nowhere"));
        assert!(!board.has_canvas("nowhere"));
    }
}
