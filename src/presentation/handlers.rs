// HTTP request handlers
use crate::application::panel_service::SelectionRequest;
use crate::domain::chart::ChartKind;
use crate::domain::error::DataError;
use crate::domain::indicator::{self, IndicatorDescriptor, SourceKind};
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Serialize)]
pub struct PanelSummary {
    pub canvas: String,
    pub title: String,
    pub kind: ChartKind,
    pub indicators: Vec<String>,
    pub partners: bool,
}

#[derive(Debug, Deserialize)]
pub struct IndicatorFilter {
    pub source: Option<SourceKind>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/indicators", get(list_indicators))
        .route("/panels", get(list_panels))
        .route(
            "/panels/:canvas_id/selection",
            axum::routing::post(select_panel),
        )
        .route(
            "/canvases/:canvas_id",
            get(get_canvas).put(mount_canvas).delete(release_canvas),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn list_indicators(
    Query(filter): Query<IndicatorFilter>,
) -> Json<Vec<&'static IndicatorDescriptor>> {
    let descriptors = match filter.source {
        Some(source) => indicator::for_source(source).collect(),
        None => indicator::all().iter().collect(),
    };
    Json(descriptors)
}

pub async fn list_panels(State(state): State<Arc<AppState>>) -> Json<Vec<PanelSummary>> {
    let panels = state
        .panel_service
        .panels()
        .iter()
        .map(|p| PanelSummary {
            canvas: p.canvas.clone(),
            title: p.title.clone(),
            kind: p.kind,
            indicators: p.series.iter().map(|s| s.indicator.clone()).collect(),
            partners: p.partners.is_some(),
        })
        .collect();
    Json(panels)
}

/// New city or indicator selected for a panel: fetch, align and render.
pub async fn select_panel(
    Path(canvas_id): Path<String>,
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectionRequest>,
) -> Response {
    match state.panel_service.select(&canvas_id, request).await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(e @ (DataError::UnknownIndicator(_) | DataError::InvalidRange { .. })) => {
            tracing::error!("Rejected selection for {}: {}", canvas_id, e);
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e) => {
            tracing::error!("Selection for {} failed: {}", canvas_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

pub async fn get_canvas(
    Path(canvas_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.panel_service.content(&canvas_id).await {
        Some(content) => Json(content).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub async fn mount_canvas(
    Path(canvas_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    state.panel_service.mount(&canvas_id).await;
    StatusCode::NO_CONTENT
}

/// Navigation away from a canvas.
pub async fn release_canvas(
    Path(canvas_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    if state.panel_service.release(&canvas_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::indicator_source::RemoteFetcher;
    use crate::application::panel_service::PanelService;
    use crate::application::presenter::ChartPresenter;
    use crate::domain::chart::AxisSlot;
    use crate::infrastructure::canvas_board::CanvasBoard;
    use crate::infrastructure::config::{PanelConfig, SeriesConfig};
    use crate::infrastructure::test_support::serve;
    use serde_json::{json, Value};
    use tokio::sync::Mutex;

    async fn app() -> String {
        let panel = PanelConfig {
            canvas: "worldbankChart".to_string(),
            title: "World Bank".to_string(),
            kind: ChartKind::Line,
            x_title: "Year".to_string(),
            y1_title: String::new(),
            y2_title: None,
            units: None,
            series: vec![SeriesConfig {
                indicator: "CPI".to_string(),
                label: None,
                color: None,
                axis: AxisSlot::Primary,
                fill: false,
            }],
            partners: None,
        };
        // No sources: every fetch comes back empty.
        let service = PanelService::new(
            Arc::new(RemoteFetcher::new()),
            Arc::new(Mutex::new(ChartPresenter::new(Box::new(CanvasBoard::new())))),
            vec![panel],
        );
        service.mount_all().await;
        serve(router(Arc::new(AppState {
            panel_service: service,
        })))
        .await
    }

    #[tokio::test]
    async fn test_listings() {
        let base = app().await;
        let client = reqwest::Client::new();

        let health = client.get(format!("{base}/healthz")).send().await.unwrap();
        assert_eq!(health.text().await.unwrap(), "ok");

        let indicators: Value = client
            .get(format!("{base}/indicators"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(indicators
            .as_array()
            .unwrap()
            .iter()
            .any(|d| d["key"] == "CPI" && d["source"] == "world_bank"));

        let who: Value = client
            .get(format!("{base}/indicators?source=who"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let who = who.as_array().unwrap();
        assert_eq!(who.len(), 4);
        assert!(who.iter().all(|d| d["source"] == "who"));

        let panels: Value = client
            .get(format!("{base}/panels"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(panels[0]["canvas"], "worldbankChart");
        assert_eq!(panels[0]["indicators"], json!(["CPI"]));
    }

    #[tokio::test]
    async fn test_selection_without_data_draws_placeholder() {
        let base = app().await;
        let client = reqwest::Client::new();

        let outcome: Value = client
            .post(format!("{base}/panels/worldbankChart/selection"))
            .json(&json!({ "location": { "name": "Seoul", "iso2": "KR" } }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(outcome["outcome"], "no_data");

        let canvas: Value = client
            .get(format!("{base}/canvases/worldbankChart"))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(canvas["state"], "message");
        assert_eq!(canvas["text"], "No Data Available");
    }

    #[tokio::test]
    async fn test_unknown_indicator_override_is_bad_request() {
        let base = app().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/panels/worldbankChart/selection"))
            .json(&json!({ "location": { "iso2": "KR" }, "indicator": "GDP" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_out_of_range_years_are_bad_request() {
        let base = app().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/panels/worldbankChart/selection"))
            .json(&json!({
                "location": { "iso2": "KR" },
                "start_year": -2_000_000_000,
                "end_year": 2_000_000_000
            }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_canvas_lifecycle() {
        let base = app().await;
        let client = reqwest::Client::new();
        let url = format!("{base}/canvases/worldbankChart");

        let deleted = client.delete(&url).send().await.unwrap();
        assert_eq!(deleted.status(), reqwest::StatusCode::NO_CONTENT);
        let missing = client.get(&url).send().await.unwrap();
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        let outcome: Value = client
            .post(format!("{base}/panels/worldbankChart/selection"))
            .json(&json!({ "location": { "iso2": "KR" } }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(outcome["outcome"], "target_not_found");

        let mounted = client.put(&url).send().await.unwrap();
        assert_eq!(mounted.status(), reqwest::StatusCode::NO_CONTENT);
        let blank: Value = client.get(&url).send().await.unwrap().json().await.unwrap();
        assert_eq!(blank["state"], "blank");
    }
}
