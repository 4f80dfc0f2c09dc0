// Domain layer - Indicators, series and chart models
pub mod chart;
pub mod error;
pub mod indicator;
pub mod series;
