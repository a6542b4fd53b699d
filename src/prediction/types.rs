use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// POST /predict 请求体
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PredictionRequest {
    pub rainfall: f64,
    pub river_discharge: f64,
    pub water_level: f64,
    pub temperature: f64,
    pub humidity: f64,
    pub soil_type: String,
    pub elevation: f64,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub station: Option<String>,
}

/// 服务端原始响应，error 与 prediction 二选一
///
/// 文案字段以 message 为准，旧后端返回 result；两者同时出现时取 message。
#[derive(Clone, Debug, Deserialize)]
pub struct PredictionEnvelope {
    pub prediction: Option<f64>,
    pub message: Option<String>,
    pub result: Option<String>,
    pub note: Option<String>,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PredictionResult {
    pub prediction: f64,
    pub message: String,
    pub note: Option<String>,
}

impl PredictionResult {
    /// 只有 prediction == 1 表示有洪水风险，其它值一律视为安全
    pub fn is_flood_likely(&self) -> bool {
        self.prediction == 1.0
    }
}

impl TryFrom<PredictionEnvelope> for PredictionResult {
    type Error = ServiceError;

    fn try_from(env: PredictionEnvelope) -> Result<Self, Self::Error> {
        // 空字符串的 error 视为没有错误
        if let Some(err) = env.error.filter(|e| !e.is_empty()) {
            return Err(ServiceError::Application(err));
        }
        let prediction = env
            .prediction
            .ok_or_else(|| ServiceError::Decode("missing field `prediction`".to_string()))?;
        Ok(Self {
            prediction,
            message: env.message.or(env.result).unwrap_or_default(),
            note: env.note,
        })
    }
}

/// GET / 健康检查响应
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct ServiceStatus {
    pub message: Option<String>,
    pub status: Option<String>,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    #[error("http error: {0}")]
    Http(String),
    #[error("unexpected status {0}: {1}")]
    Status(u16, String),
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("{0}")]
    Application(String),
}

impl ServiceError {
    /// 网络 / 状态码 / 解码失败统一视为连接类错误
    pub fn is_transport(&self) -> bool {
        !matches!(self, ServiceError::Application(_))
    }
}

#[async_trait]
pub trait PredictionService: Send + Sync {
    /// 服务基地址，用于错误提示
    fn base_url(&self) -> &str;

    async fn predict(&self, req: &PredictionRequest) -> Result<PredictionResult, ServiceError>;

    async fn health(&self) -> Result<ServiceStatus, ServiceError>;
}
