use crate::app_state::{AppEvent, BackendStatus};
use crate::commands::{AppCommand, HELP_TEXT};
use crate::prediction::PredictionService;
use crate::submission::{
    PendingSubmission, SubmissionController, SubmissionError, SubmissionOutcome,
};
use log::{error, info, warn};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

/// 探测后端根路径，结果以 Backend 事件回传
pub async fn probe_backend(
    service: &Arc<dyn PredictionService>,
    tx: &mpsc::UnboundedSender<AppEvent>,
) -> BackendStatus {
    let status = match service.health().await {
        Ok(s) => BackendStatus {
            online: true,
            detail: s
                .message
                .or(s.status)
                .unwrap_or_else(|| service.base_url().to_string()),
        },
        Err(e) => {
            warn!("后端健康检查失败 [{}]: {}", service.base_url(), e);
            BackendStatus {
                online: false,
                detail: format!("{} ({})", service.base_url(), e),
            }
        }
    };
    let _ = tx.send(AppEvent::Backend(status.clone()));
    status
}

/// 在独立任务中发送预测请求，返回可用于中止请求的句柄
///
/// 外层任务负责兜底：请求任务 panic 时补发一个连接类失败，
/// 保证每个序号都有结果；被主动中止时不回传任何事件。
fn spawn_dispatch(
    service: Arc<dyn PredictionService>,
    pending: PendingSubmission,
    tx: mpsc::UnboundedSender<AppEvent>,
) -> AbortHandle {
    let seq = pending.seq;
    let endpoint = service.base_url().to_string();
    let request = tokio::spawn(async move {
        SubmissionController::dispatch(service.as_ref(), pending).await
    });
    let abort = request.abort_handle();

    tokio::spawn(async move {
        let outcome = match request.await {
            Ok(outcome) => outcome,
            Err(e) if e.is_cancelled() => return,
            Err(e) => {
                error!("预测请求 #{} 异常结束: {}", seq, e);
                SubmissionOutcome {
                    seq,
                    result: Err(SubmissionError::transport(&endpoint, e.to_string())),
                }
            }
        };
        let _ = tx.send(AppEvent::Prediction(outcome));
    });
    abort
}

/// 单后台任务模型：串行接收命令，预测请求在独立任务中执行
///
/// 同一时刻只保留一个在途预测；新的提交会中止旧任务，退出时中止全部。
pub async fn run_command_loop(
    service: Arc<dyn PredictionService>,
    mut cmd_rx: mpsc::UnboundedReceiver<AppCommand>,
    evt_tx: mpsc::UnboundedSender<AppEvent>,
) {
    let mut in_flight: Option<(u64, AbortHandle)> = None;

    while let Some(cmd) = cmd_rx.recv().await {
        match cmd {
            AppCommand::Dispatch(pending) => {
                if let Some((seq, handle)) = in_flight.take() {
                    if !handle.is_finished() {
                        handle.abort();
                        info!("中止被取代的预测请求 #{}", seq);
                    }
                }
                let seq = pending.seq;
                let handle = spawn_dispatch(service.clone(), pending, evt_tx.clone());
                in_flight = Some((seq, handle));
            }
            AppCommand::Health => {
                let _ = evt_tx.send(AppEvent::Message(format!(
                    "正在检查后端: {}",
                    service.base_url()
                )));
                let svc = service.clone();
                let tx = evt_tx.clone();
                tokio::spawn(async move {
                    probe_backend(&svc, &tx).await;
                });
            }
            AppCommand::Help => {
                let _ = evt_tx.send(AppEvent::Message(HELP_TEXT.to_string()));
            }
            AppCommand::Quit => {
                let _ = evt_tx.send(AppEvent::Message("收到退出命令".to_string()));
                break;
            }
            AppCommand::Unknown(msg) => {
                let _ = evt_tx.send(AppEvent::Error(format!("未知命令: {}", msg)));
            }
            local => {
                // 表单相关命令只应在 UI 侧处理
                let _ = evt_tx.send(AppEvent::Log(format!("忽略命令: {:?}", local)));
            }
        }
    }

    if let Some((seq, handle)) = in_flight.take() {
        if !handle.is_finished() {
            handle.abort();
            info!("退出时中止在途预测请求 #{}", seq);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prediction::{
        PredictionRequest, PredictionResult, ServiceError, ServiceStatus,
    };
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::task::JoinHandle;

    /// 按 rainfall 毫秒数延迟返回，用来制造先发后至
    struct SlowService;

    #[async_trait]
    impl PredictionService for SlowService {
        fn base_url(&self) -> &str {
            "http://slow:8000"
        }

        async fn predict(&self, req: &PredictionRequest) -> Result<PredictionResult, ServiceError> {
            tokio::time::sleep(Duration::from_millis(req.rainfall as u64)).await;
            Ok(PredictionResult {
                prediction: 0.0,
                message: format!("slept {}", req.rainfall),
                note: None,
            })
        }

        async fn health(&self) -> Result<ServiceStatus, ServiceError> {
            Err(ServiceError::Http("connection refused".to_string()))
        }
    }

    fn pending(seq: u64, delay_ms: f64) -> PendingSubmission {
        PendingSubmission {
            seq,
            request: PredictionRequest {
                rainfall: delay_ms,
                river_discharge: 1.0,
                water_level: 1.0,
                temperature: 1.0,
                humidity: 1.0,
                soil_type: "Loam".to_string(),
                elevation: 1.0,
                latitude: 1.0,
                longitude: 1.0,
                station: None,
            },
        }
    }

    /// 预测时直接 panic 的服务
    struct BrokenService;

    #[async_trait]
    impl PredictionService for BrokenService {
        fn base_url(&self) -> &str {
            "http://broken:8000"
        }

        async fn predict(&self, _req: &PredictionRequest) -> Result<PredictionResult, ServiceError> {
            panic!("model exploded")
        }

        async fn health(&self) -> Result<ServiceStatus, ServiceError> {
            Ok(ServiceStatus::default())
        }
    }

    fn spawn_loop_with(
        service: Arc<dyn PredictionService>,
    ) -> (
        mpsc::UnboundedSender<AppCommand>,
        mpsc::UnboundedReceiver<AppEvent>,
        JoinHandle<()>,
    ) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (evt_tx, evt_rx) = mpsc::unbounded_channel();
        let handle = tokio::spawn(run_command_loop(service, cmd_rx, evt_tx));
        (cmd_tx, evt_rx, handle)
    }

    fn spawn_loop() -> (
        mpsc::UnboundedSender<AppCommand>,
        mpsc::UnboundedReceiver<AppEvent>,
        JoinHandle<()>,
    ) {
        spawn_loop_with(Arc::new(SlowService))
    }

    async fn next_outcome(rx: &mut mpsc::UnboundedReceiver<AppEvent>) -> SubmissionOutcome {
        loop {
            match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
                Ok(Some(AppEvent::Prediction(o))) => return o,
                Ok(Some(_)) => continue,
                _ => panic!("no prediction event"),
            }
        }
    }

    #[tokio::test]
    async fn dispatch_reports_outcome() {
        let (cmd_tx, mut evt_rx, handle) = spawn_loop();
        cmd_tx.send(AppCommand::Dispatch(pending(1, 0.0))).unwrap();

        let outcome = next_outcome(&mut evt_rx).await;
        assert_eq!(outcome.seq, 1);
        assert!(outcome.result.is_ok());

        cmd_tx.send(AppCommand::Quit).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn panicked_request_still_reports_failure() {
        let (cmd_tx, mut evt_rx, handle) = spawn_loop_with(Arc::new(BrokenService));
        cmd_tx.send(AppCommand::Dispatch(pending(7, 0.0))).unwrap();

        let outcome = next_outcome(&mut evt_rx).await;
        assert_eq!(outcome.seq, 7);
        match outcome.result {
            Err(SubmissionError::Transport { endpoint, .. }) => {
                assert_eq!(endpoint, "http://broken:8000");
            }
            other => panic!("unexpected result {:?}", other),
        }

        cmd_tx.send(AppCommand::Quit).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn newer_submission_aborts_older_one() {
        let (cmd_tx, mut evt_rx, handle) = spawn_loop();
        cmd_tx.send(AppCommand::Dispatch(pending(1, 10_000.0))).unwrap();
        cmd_tx.send(AppCommand::Dispatch(pending(2, 0.0))).unwrap();

        let outcome = next_outcome(&mut evt_rx).await;
        assert_eq!(outcome.seq, 2);

        cmd_tx.send(AppCommand::Quit).unwrap();
        handle.await.unwrap();
        while let Ok(evt) = evt_rx.try_recv() {
            assert!(!matches!(evt, AppEvent::Prediction(_)));
        }
    }

    #[tokio::test]
    async fn quit_aborts_in_flight_request() {
        let (cmd_tx, mut evt_rx, handle) = spawn_loop();
        cmd_tx.send(AppCommand::Dispatch(pending(1, 10_000.0))).unwrap();
        cmd_tx.send(AppCommand::Quit).unwrap();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap();

        while let Ok(evt) = evt_rx.try_recv() {
            assert!(!matches!(evt, AppEvent::Prediction(_)));
        }
    }

    #[tokio::test]
    async fn health_failure_is_reported_offline() {
        let (cmd_tx, mut evt_rx, handle) = spawn_loop();
        cmd_tx.send(AppCommand::Health).unwrap();

        let status = loop {
            match tokio::time::timeout(Duration::from_secs(5), evt_rx.recv()).await {
                Ok(Some(AppEvent::Backend(s))) => break s,
                Ok(Some(_)) => continue,
                _ => panic!("no backend event"),
            }
        };
        assert!(!status.online);
        assert!(status.detail.contains("http://slow:8000"));

        cmd_tx.send(AppCommand::Quit).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn unknown_command_is_an_error_event() {
        let (cmd_tx, mut evt_rx, handle) = spawn_loop();
        cmd_tx.send(AppCommand::Unknown("dance".to_string())).unwrap();
        match evt_rx.recv().await {
            Some(AppEvent::Error(msg)) => assert_eq!(msg, "未知命令: dance"),
            other => panic!("unexpected {:?}", other),
        }
        cmd_tx.send(AppCommand::Quit).unwrap();
        handle.await.unwrap();
    }
}
