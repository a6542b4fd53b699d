pub mod http;
pub mod types;
pub mod urls;

pub use http::HttpPredictionService;
pub use types::{PredictionRequest, PredictionResult, PredictionService, ServiceError, ServiceStatus};

use crate::config::AppConfig;

pub(crate) fn build_prediction_http_client(config: &AppConfig) -> Result<reqwest::Client, ServiceError> {
    let mut builder = reqwest::Client::builder().user_agent("floodshield/0.1");

    if let Some(raw) = config.proxy.as_deref() {
        let t = raw.trim();
        if !t.is_empty() {
            let url = if t.contains("://") {
                t.to_string()
            } else {
                format!("socks5h://{}", t)
            };
            let proxy = reqwest::Proxy::all(&url).map_err(|e| ServiceError::Http(e.to_string()))?;
            builder = builder.proxy(proxy);
        }
    }

    if let Some(timeout) = config.timeout {
        builder = builder.timeout(timeout);
    }

    builder.build().map_err(|e| ServiceError::Http(e.to_string()))
}
