// Error taxonomy shared by fetchers, normalizer and presenter
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DataError {
    #[error("unknown indicator `{0}`")]
    UnknownIndicator(String),

    #[error("{source_key} responded with HTTP {status}")]
    UpstreamHttp { source_key: String, status: u16 },

    #[error("{source_key} returned an unexpected body: {detail}")]
    UpstreamFormat { source_key: String, detail: String },

    #[error("request to {source_key} failed: {detail}")]
    UpstreamTransport { source_key: String, detail: String },

    #[error("year range {start_year}..={end_year} is not allowed: {reason}")]
    InvalidRange {
        start_year: i32,
        end_year: i32,
        reason: &'static str,
    },

    #[error("{source_key} needs `{field}` on the location")]
    MissingLocation {
        source_key: String,
        field: &'static str,
    },

    #[error("canvas `{canvas_id}` is not mounted")]
    TargetNotFound { canvas_id: String },

    #[error("chart handle for `{canvas_id}` has been superseded")]
    StaleHandle { canvas_id: String },
}

impl DataError {
    pub fn format(source_key: &str, detail: impl Into<String>) -> Self {
        Self::UpstreamFormat {
            source_key: source_key.to_string(),
            detail: detail.into(),
        }
    }

    /// Errors raised by an upstream call; these never escape the fetcher.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::UpstreamHttp { .. }
                | Self::UpstreamFormat { .. }
                | Self::UpstreamTransport { .. }
                | Self::MissingLocation { .. }
        )
    }
}
