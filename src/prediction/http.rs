use crate::config::AppConfig;
use crate::prediction::build_prediction_http_client;
use crate::prediction::types::{
    PredictionEnvelope, PredictionRequest, PredictionResult, PredictionService, ServiceError,
    ServiceStatus,
};
use crate::prediction::urls::{url_predict, url_root};
use async_trait::async_trait;
use log::{info, warn};

/// 远程 FastAPI 预测服务
#[derive(Clone)]
pub struct HttpPredictionService {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPredictionService {
    pub fn from_config(config: &AppConfig) -> Result<Self, ServiceError> {
        Ok(Self {
            client: build_prediction_http_client(config)?,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    #[cfg(test)]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// 读取响应体；非 2xx 直接视为失败
    async fn read_body(resp: reqwest::Response) -> Result<String, ServiceError> {
        let status = resp.status();
        let raw = resp
            .text()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        if !status.is_success() {
            return Err(ServiceError::Status(status.as_u16(), raw));
        }
        Ok(raw)
    }
}

#[async_trait]
impl PredictionService for HttpPredictionService {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn predict(&self, req: &PredictionRequest) -> Result<PredictionResult, ServiceError> {
        let url = url_predict(&self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(req)
            .send()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        let raw = Self::read_body(resp).await?;
        let env: PredictionEnvelope = serde_json::from_str(&raw)
            .map_err(|e| ServiceError::Decode(format!("json parse failed: {e}, raw={raw}")))?;

        match PredictionResult::try_from(env) {
            Ok(result) => {
                info!("{} predict(...) [prediction={}]", self, result.prediction);
                Ok(result)
            }
            Err(e) => {
                warn!("{} predict(...) [{}]", self, e);
                Err(e)
            }
        }
    }

    async fn health(&self) -> Result<ServiceStatus, ServiceError> {
        let url = url_root(&self.base_url);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ServiceError::Http(e.to_string()))?;

        let raw = Self::read_body(resp).await?;
        let status: ServiceStatus = serde_json::from_str(&raw)
            .map_err(|e| ServiceError::Decode(format!("json parse failed: {e}, raw={raw}")))?;
        info!("{} health(...) [{:?}]", self, status.status);
        Ok(status)
    }
}

impl std::fmt::Display for HttpPredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<HttpPredictionService [{}]>", self.base_url)
    }
}

impl std::fmt::Debug for HttpPredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<HttpPredictionService [{}]>", self.base_url)
    }
}
