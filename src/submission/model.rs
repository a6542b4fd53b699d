use crate::form::FormError;
use crate::prediction::{PredictionRequest, PredictionResult, ServiceError};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum SubmissionError {
    /// 本地校验失败，未发出请求
    #[error("{0}")]
    Invalid(FormError),
    /// 网络不可达/非 2xx/响应无法解析
    #[error("Cannot reach prediction service at {endpoint}. Make sure it is running.")]
    Transport { endpoint: String, detail: String },
    /// 服务端返回 error 字段，原文展示
    #[error("{0}")]
    Application(String),
}

impl SubmissionError {
    pub fn transport(endpoint: &str, detail: impl Into<String>) -> Self {
        SubmissionError::Transport {
            endpoint: endpoint.to_string(),
            detail: detail.into(),
        }
    }

    pub fn from_service(err: ServiceError, endpoint: &str) -> Self {
        if err.is_transport() {
            return Self::transport(endpoint, err.to_string());
        }
        match err {
            ServiceError::Application(msg) => SubmissionError::Application(msg),
            other => SubmissionError::Application(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SubmissionState {
    #[default]
    Idle,
    Loading {
        seq: u64,
    },
    Succeeded(PredictionResult),
    Failed(SubmissionError),
}

impl SubmissionState {
    pub fn is_loading(&self) -> bool {
        matches!(self, SubmissionState::Loading { .. })
    }
}

/// 已通过校验、等待发送的请求
#[derive(Debug, Clone, PartialEq)]
pub struct PendingSubmission {
    pub seq: u64,
    pub request: PredictionRequest,
}

/// 一次请求的结果，按序号回填
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionOutcome {
    pub seq: u64,
    pub result: Result<PredictionResult, SubmissionError>,
}
