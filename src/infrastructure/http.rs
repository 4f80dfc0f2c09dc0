// Shared HTTP client for upstream sources, with optional relay routing
use crate::domain::error::DataError;
use crate::infrastructure::config::{RelayMode, RelaySettings};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Relay {
    url: String,
    mode: RelayMode,
}

impl Relay {
    pub fn new(url: impl Into<String>, mode: RelayMode) -> Self {
        Self {
            url: url.into(),
            mode,
        }
    }

    pub fn wrap(&self, target: &str) -> String {
        match self.mode {
            RelayMode::Prefix => format!("{}{}", self.url, target),
            RelayMode::Query => format!(
                "{}?url={}",
                self.url.trim_end_matches('?'),
                urlencoding::encode(target)
            ),
        }
    }
}

impl From<&RelaySettings> for Relay {
    fn from(settings: &RelaySettings) -> Self {
        Self::new(settings.url.clone(), settings.mode)
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamClient {
    client: reqwest::Client,
    relay: Option<Relay>,
}

impl UpstreamClient {
    pub fn new(timeout: Duration, relay: Option<Relay>) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, relay })
    }

    /// GET `url` (through the relay when one is set) and return the body of a 2xx response.
    pub async fn get_text(
        &self,
        source_key: &str,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<String, DataError> {
        let target = match &self.relay {
            Some(relay) => relay.wrap(url),
            None => url.to_string(),
        };

        // Query strings may carry API keys
        tracing::debug!(
            "{} GET {}",
            source_key,
            target.split('?').next().unwrap_or_default()
        );

        let mut request = self.client.get(&target);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| transport(source_key, e))?;

        if !response.status().is_success() {
            return Err(DataError::UpstreamHttp {
                source_key: source_key.to_string(),
                status: response.status().as_u16(),
            });
        }

        response.text().await.map_err(|e| transport(source_key, e))
    }
}

fn transport(source_key: &str, e: reqwest::Error) -> DataError {
    DataError::UpstreamTransport {
        source_key: source_key.to_string(),
        detail: e.without_url().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::test_support::serve;
    use axum::{extract::Query, http::StatusCode, routing::get, Router};
    use std::collections::HashMap;

    #[test]
    fn test_relay_prefix() {
        let relay = Relay::new("https://relay.example/", RelayMode::Prefix);
        assert_eq!(
            relay.wrap("https://api.worldbank.org/v2/x?format=json"),
            "https://relay.example/https://api.worldbank.org/v2/x?format=json"
        );
    }

    #[test]
    fn test_relay_query() {
        let relay = Relay::new("https://relay.example/fetch", RelayMode::Query);
        assert_eq!(
            relay.wrap("https://a.b/c?d=1&e=2"),
            "https://relay.example/fetch?url=https%3A%2F%2Fa.b%2Fc%3Fd%3D1%26e%3D2"
        );
    }

    #[tokio::test]
    async fn test_non_success_status() {
        let base = serve(Router::new().route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        ))
        .await;
        let client = UpstreamClient::new(Duration::from_secs(5), None).unwrap();

        let err = client
            .get_text("worldbank", &format!("{base}/broken"), &[])
            .await
            .unwrap_err();

        assert_eq!(
            err,
            DataError::UpstreamHttp {
                source_key: "worldbank".to_string(),
                status: 500
            }
        );
    }

    #[tokio::test]
    async fn test_requests_go_through_query_relay() {
        let base = serve(Router::new().route(
            "/relay",
            get(|Query(params): Query<HashMap<String, String>>| async move {
                format!("relayed {}", params.get("url").cloned().unwrap_or_default())
            }),
        ))
        .await;
        let relay = Relay::new(format!("{base}/relay"), RelayMode::Query);
        let client = UpstreamClient::new(Duration::from_secs(5), Some(relay)).unwrap();

        let body = client
            .get_text("who", "http://upstream.invalid/data?x=1", &[])
            .await
            .unwrap();

        assert_eq!(body, "relayed http://upstream.invalid/data?x=1");
    }
}
