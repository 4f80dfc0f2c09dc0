// Application layer - Use cases and the seams to external collaborators
pub mod chart_surface;
pub mod indicator_source;
pub mod panel_service;
pub mod presenter;
