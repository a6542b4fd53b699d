use crate::form::{MeasurementField, MeasurementForm};
use crate::prediction::PredictionService;
use crate::submission::model::{
    PendingSubmission, SubmissionError, SubmissionOutcome, SubmissionState,
};
use log::{info, warn};
use std::sync::Arc;

/// 表单 -> 请求 -> 状态机
///
/// 提交拆成三步：`begin_submit` 同步校验并进入 Loading，`dispatch` 执行唯一一次远程调用，
/// `settle` 回填结果。只有序号等于最新一次提交的结果才会被采用，
/// 旧请求晚到的响应直接丢弃。
pub struct SubmissionController {
    form: MeasurementForm,
    state: SubmissionState,
    latest_seq: u64,
    service: Arc<dyn PredictionService>,
}

impl SubmissionController {
    pub fn new(service: Arc<dyn PredictionService>) -> Self {
        Self {
            form: MeasurementForm::new(),
            state: SubmissionState::Idle,
            latest_seq: 0,
            service,
        }
    }

    pub fn form(&self) -> &MeasurementForm {
        &self.form
    }

    pub fn state(&self) -> &SubmissionState {
        &self.state
    }

    pub fn service(&self) -> Arc<dyn PredictionService> {
        self.service.clone()
    }

    pub fn update_field(&mut self, field: MeasurementField, value: impl Into<String>) {
        self.form.update_field(field, value);
    }

    pub fn reset(&mut self) {
        self.form.clear();
        self.latest_seq += 1; // 让在途请求的结果失效
        self.state = SubmissionState::Idle;
    }

    /// 校验表单并进入 Loading；校验失败时不发请求，直接进入 Failed
    pub fn begin_submit(&mut self) -> Result<PendingSubmission, SubmissionError> {
        match self.form.to_request() {
            Ok(request) => {
                self.latest_seq += 1;
                let seq = self.latest_seq;
                self.state = SubmissionState::Loading { seq };
                info!("提交预测请求 #{}", seq);
                Ok(PendingSubmission { seq, request })
            }
            Err(e) => {
                warn!("表单校验失败: {}", e);
                let err = SubmissionError::Invalid(e);
                self.state = SubmissionState::Failed(err.clone());
                Err(err)
            }
        }
    }

    /// 执行远程调用；任何失败都折叠成 outcome，不会 panic 也不会遗留 Loading
    pub async fn dispatch(
        service: &dyn PredictionService,
        pending: PendingSubmission,
    ) -> SubmissionOutcome {
        let result = service
            .predict(&pending.request)
            .await
            .map_err(|e| {
                warn!("预测请求 #{} 失败: {}", pending.seq, e);
                SubmissionError::from_service(e, service.base_url())
            });
        SubmissionOutcome {
            seq: pending.seq,
            result,
        }
    }

    /// 回填结果；序号过期时返回 false 并忽略
    pub fn settle(&mut self, outcome: SubmissionOutcome) -> bool {
        let current = match self.state {
            SubmissionState::Loading { seq } => Some(seq),
            _ => None,
        };
        if outcome.seq != self.latest_seq || current != Some(outcome.seq) {
            info!(
                "丢弃过期的预测结果 #{} (最新 #{})",
                outcome.seq, self.latest_seq
            );
            return false;
        }

        self.state = match outcome.result {
            Ok(result) => SubmissionState::Succeeded(result),
            Err(e) => SubmissionState::Failed(e),
        };
        true
    }

    /// 完整提交流程：校验、发送、回填
    ///
    /// 界面侧把三步拆开跑在后台任务里，这里是同步等待的组合版本。
    #[cfg(test)]
    pub async fn submit(&mut self) -> &SubmissionState {
        if let Ok(pending) = self.begin_submit() {
            let service = self.service.clone();
            let outcome = Self::dispatch(service.as_ref(), pending).await;
            self.settle(outcome);
        }
        &self.state
    }
}
