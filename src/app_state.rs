use crate::commands::{AppCommand, HELP_TEXT};
use crate::form::MeasurementField;
use crate::prediction::PredictionService;
use crate::submission::{
    SubmissionController, SubmissionError, SubmissionOutcome, SubmissionState,
};
use crossterm::event::KeyCode;
use log::error;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::mpsc;

#[derive(PartialEq, Debug, Clone)]
pub enum ViewMode {
    Home,
    Predict,
    Parameters,
}

#[derive(PartialEq, Debug, Clone)]
pub enum InputMode {
    Normal,
    Command,
    Editing, // 正在编辑表单字段
}

#[derive(PartialEq, Debug, Clone)]
pub enum FocusArea {
    Menu,     // 焦点在左侧菜单
    MainView, // 焦点在主视图
}

#[derive(Debug, Clone, PartialEq)]
pub struct BackendStatus {
    pub online: bool,
    pub detail: String,
}

#[derive(Debug)]
pub enum AppEvent {
    Log(String),
    Message(String),
    Error(String),
    Prediction(SubmissionOutcome),
    Backend(BackendStatus),
}

pub const MENU_ITEMS: [&str; 3] = ["Home", "Predict", "Parameters"];

/// 日志面板保留的最大条数
pub const MAX_LOG_MESSAGES: usize = 200;

/// 表单行数：全部字段 + 提交按钮
pub const FORM_ROWS: usize = MeasurementField::ALL.len() + 1;

pub struct App {
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub focus_area: FocusArea,
    pub menu_selected_index: usize,
    pub form_selected_index: usize,
    pub controller: SubmissionController,
    pub backend_status: Option<BackendStatus>,
    pub tick: u64,
    pub command_input: String,
    pub command_cursor: usize,
    pub command_history: Vec<String>,
    pub command_history_index: Option<usize>,
    pub log_messages: Vec<String>,
    pub cmd_tx: mpsc::UnboundedSender<AppCommand>,
    pub evt_rx: Option<mpsc::UnboundedReceiver<AppEvent>>,
}

impl App {
    pub fn new(
        startup_info: Vec<String>,
        service: Arc<dyn PredictionService>,
        cmd_tx: mpsc::UnboundedSender<AppCommand>,
        evt_rx: mpsc::UnboundedReceiver<AppEvent>,
    ) -> App {
        let mut log_messages = vec!["应用已启动".to_string()];
        log_messages.extend(startup_info);

        App {
            view_mode: ViewMode::Home,
            input_mode: InputMode::Normal,
            focus_area: FocusArea::Menu,
            menu_selected_index: 0,
            form_selected_index: 0,
            controller: SubmissionController::new(service),
            backend_status: None,
            tick: 0,
            command_input: String::new(),
            command_cursor: 0,
            command_history: Vec::new(),
            command_history_index: None,
            log_messages,
            cmd_tx,
            evt_rx: Some(evt_rx),
        }
    }

    pub fn add_log(&mut self, msg: String) {
        self.log_messages.push(msg);
        if self.log_messages.len() > MAX_LOG_MESSAGES {
            let overflow = self.log_messages.len() - MAX_LOG_MESSAGES;
            self.log_messages.drain(..overflow);
        }
    }

    pub fn selected_field(&self) -> Option<MeasurementField> {
        MeasurementField::ALL.get(self.form_selected_index).copied()
    }

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Log(msg) => self.add_log(msg),
            AppEvent::Message(msg) => self.add_log(msg),
            AppEvent::Error(msg) => self.add_log(format!("✗ {}", msg)),
            AppEvent::Prediction(outcome) => {
                if !self.controller.settle(outcome) {
                    return;
                }
                let line = match self.controller.state() {
                    SubmissionState::Succeeded(r) if r.is_flood_likely() => {
                        format!("⚠ 🚨 Flood warning detected! {}", r.message)
                    }
                    SubmissionState::Succeeded(r) => format!("✓ Area is safe. {}", r.message),
                    SubmissionState::Failed(e) => format!("✗ {}", e),
                    _ => return,
                };
                self.add_log(line);
            }
            AppEvent::Backend(status) => {
                let line = if status.online {
                    format!("✓ 后端已连接: {}", status.detail)
                } else {
                    format!("⚠ 后端不可达: {}", status.detail)
                };
                self.add_log(line);
                self.backend_status = Some(status);
            }
        }
    }

    /// 获取当前的补全建议
    pub fn get_completion_hint(&self) -> Option<String> {
        let commands = ["predict", "set", "clear", "health", "help", "quit"];
        let input = self.command_input.trim_start();

        if input.is_empty() {
            return None;
        }

        let parts: Vec<&str> = input.split_whitespace().collect();
        let typing_new_word = input.ends_with(' ');
        if parts.len() == 1 && !typing_new_word {
            for cmd in commands {
                if cmd.starts_with(parts[0]) && cmd != parts[0] {
                    return Some(cmd[parts[0].len()..].to_string());
                }
            }
            return None;
        }

        if parts[0] == "set" && parts.len() == 2 && !typing_new_word {
            let cur = parts[1];
            for f in MeasurementField::ALL {
                let name = f.name();
                if name.starts_with(cur) && name != cur {
                    return Some(name[cur.len()..].to_string());
                }
            }
        }
        None
    }

    /// 校验当前表单，通过则交给后台发送
    pub fn submit_prediction(&mut self) {
        match self.controller.begin_submit() {
            Ok(pending) => {
                let seq = pending.seq;
                self.add_log(format!("Analyzing data... (#{})", seq));
                if self.cmd_tx.send(AppCommand::Dispatch(pending)).is_err() {
                    // 后台任务已退出，就地结束本次提交，避免停在 Loading
                    error!("后台任务不可用，预测请求 #{} 未发出", seq);
                    let endpoint = self.controller.service().base_url().to_string();
                    self.handle_event(AppEvent::Prediction(SubmissionOutcome {
                        seq,
                        result: Err(SubmissionError::transport(
                            &endpoint,
                            "background worker is not running",
                        )),
                    }));
                }
            }
            Err(e) => {
                self.add_log(format!("✗ {}", e));
            }
        }
    }

    /// 执行命令行输入；本地命令直接处理，其余交给后台
    pub fn execute_command(&mut self, cmd: AppCommand) -> bool {
        match cmd {
            AppCommand::Predict => {
                self.submit_prediction();
                false
            }
            AppCommand::Set { field, value } => {
                self.add_log(format!("{} = {}", field.name(), value));
                self.controller.update_field(field, value);
                false
            }
            AppCommand::Clear => {
                self.controller.reset();
                self.form_selected_index = 0;
                self.add_log("表单已清空".to_string());
                false
            }
            AppCommand::Help => {
                self.add_log(HELP_TEXT.to_string());
                false
            }
            AppCommand::Quit => true,
            other => {
                let _ = self.cmd_tx.send(other);
                false
            }
        }
    }

    fn leave_command_mode(&mut self) {
        self.command_input.clear();
        self.command_cursor = 0;
        self.input_mode = InputMode::Normal;
    }

    fn handle_command_key(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Enter => {
                let cmd_owned = self.command_input.trim().to_string();
                if cmd_owned.is_empty() || cmd_owned == "q" {
                    self.leave_command_mode();
                    return false;
                }
                let app_cmd = AppCommand::from_str(&cmd_owned)
                    .unwrap_or_else(|_| AppCommand::Unknown(cmd_owned.clone()));

                self.command_history.push(cmd_owned);
                self.command_history_index = None;
                self.leave_command_mode();
                self.execute_command(app_cmd)
            }
            KeyCode::Esc => {
                self.leave_command_mode();
                false
            }
            KeyCode::Tab => {
                if let Some(hint) = self.get_completion_hint() {
                    let insert = format!("{} ", hint);
                    self.command_input.insert_str(self.command_cursor, &insert);
                    self.command_cursor += insert.len();
                }
                false
            }
            KeyCode::Up => {
                if self.command_history.is_empty() {
                    return false;
                }
                let next = match self.command_history_index {
                    None => self.command_history.len().saturating_sub(1),
                    Some(i) => i.saturating_sub(1),
                };
                self.command_history_index = Some(next);
                if let Some(cmd) = self.command_history.get(next) {
                    self.command_input = cmd.clone();
                    self.command_cursor = self.command_input.len();
                }
                false
            }
            KeyCode::Down => {
                let Some(i) = self.command_history_index else {
                    return false;
                };
                let n = i + 1;
                if n >= self.command_history.len() {
                    self.command_history_index = None;
                    self.command_input.clear();
                    self.command_cursor = 0;
                    return false;
                }
                self.command_history_index = Some(n);
                if let Some(cmd) = self.command_history.get(n) {
                    self.command_input = cmd.clone();
                    self.command_cursor = self.command_input.len();
                }
                false
            }
            KeyCode::Backspace => {
                if self.command_cursor > 0 {
                    let idx = prev_char_boundary(&self.command_input, self.command_cursor);
                    self.command_input.remove(idx);
                    self.command_cursor = idx;
                }
                false
            }
            KeyCode::Delete => {
                if self.command_cursor < self.command_input.len() {
                    self.command_input.remove(self.command_cursor);
                }
                false
            }
            KeyCode::Left => {
                if self.command_cursor > 0 {
                    self.command_cursor = prev_char_boundary(&self.command_input, self.command_cursor);
                }
                false
            }
            KeyCode::Right => {
                if let Some(c) = self.command_input[self.command_cursor..].chars().next() {
                    self.command_cursor += c.len_utf8();
                }
                false
            }
            KeyCode::Home => {
                self.command_cursor = 0;
                false
            }
            KeyCode::End => {
                self.command_cursor = self.command_input.len();
                false
            }
            KeyCode::Char(c) => {
                self.command_input.insert(self.command_cursor, c);
                self.command_cursor += c.len_utf8();
                false
            }
            _ => false,
        }
    }

    fn handle_editing_key(&mut self, key: KeyCode) -> bool {
        let Some(field) = self.selected_field() else {
            self.input_mode = InputMode::Normal;
            return false;
        };
        match key {
            KeyCode::Enter | KeyCode::Tab => {
                // 确认并跳到下一行
                self.input_mode = InputMode::Normal;
                if self.form_selected_index < FORM_ROWS - 1 {
                    self.form_selected_index += 1;
                }
            }
            KeyCode::Esc => {
                self.input_mode = InputMode::Normal;
            }
            KeyCode::F(5) => {
                self.input_mode = InputMode::Normal;
                self.submit_prediction();
            }
            KeyCode::Backspace => {
                let mut value = self.controller.form().value(field).to_string();
                value.pop();
                self.controller.update_field(field, value);
            }
            KeyCode::Char(c) => {
                let mut value = self.controller.form().value(field).to_string();
                value.push(c);
                self.controller.update_field(field, value);
            }
            _ => {}
        }
        false
    }

    pub fn handle_key_event(&mut self, key: KeyCode) -> bool {
        match self.input_mode {
            InputMode::Command => return self.handle_command_key(key),
            InputMode::Editing => return self.handle_editing_key(key),
            InputMode::Normal => {}
        }

        // 正常模式下的按键处理
        match key {
            KeyCode::Char('/') => {
                self.input_mode = InputMode::Command;
                self.command_input.clear();
                self.command_cursor = 0;
                false
            }
            KeyCode::Char('q') => true,
            KeyCode::F(5) => {
                self.submit_prediction();
                false
            }
            KeyCode::Left => {
                self.focus_area = FocusArea::Menu;
                false
            }
            KeyCode::Right => {
                self.focus_area = FocusArea::MainView;
                false
            }
            KeyCode::Up => {
                if self.focus_area == FocusArea::Menu {
                    self.menu_selected_index = self.menu_selected_index.saturating_sub(1);
                } else if self.view_mode == ViewMode::Predict {
                    self.form_selected_index = self.form_selected_index.saturating_sub(1);
                }
                false
            }
            KeyCode::Down => {
                if self.focus_area == FocusArea::Menu {
                    if self.menu_selected_index < MENU_ITEMS.len() - 1 {
                        self.menu_selected_index += 1;
                    }
                } else if self.view_mode == ViewMode::Predict
                    && self.form_selected_index < FORM_ROWS - 1
                {
                    self.form_selected_index += 1;
                }
                false
            }
            KeyCode::Enter | KeyCode::Char('c') => {
                if self.focus_area == FocusArea::Menu {
                    self.view_mode = match self.menu_selected_index {
                        0 => ViewMode::Home,
                        1 => ViewMode::Predict,
                        _ => ViewMode::Parameters,
                    };
                    // 确认后自动切换焦点到主视图
                    self.focus_area = FocusArea::MainView;
                } else if self.view_mode == ViewMode::Predict {
                    if self.selected_field().is_some() {
                        self.input_mode = InputMode::Editing;
                    } else {
                        self.submit_prediction();
                    }
                } else if self.view_mode == ViewMode::Home {
                    // 首页 Enter 直接进入预测页
                    self.view_mode = ViewMode::Predict;
                    self.menu_selected_index = 1;
                }
                false
            }
            KeyCode::Char('x') => {
                if self.focus_area == FocusArea::MainView && self.view_mode != ViewMode::Home {
                    self.view_mode = ViewMode::Home;
                    self.menu_selected_index = 0;
                }
                false
            }
            _ => false,
        }
    }
}

fn prev_char_boundary(s: &str, idx: usize) -> usize {
    s[..idx]
        .char_indices()
        .last()
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::tests::FILLED;
    use crate::prediction::{HttpPredictionService, PredictionResult, ServiceError};

    fn app() -> (App, mpsc::UnboundedReceiver<AppCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (_evt_tx, evt_rx) = mpsc::unbounded_channel();
        let service = Arc::new(HttpPredictionService::new("http://127.0.0.1:9"));
        (App::new(Vec::new(), service, cmd_tx, evt_rx), cmd_rx)
    }

    fn fill_form(app: &mut App) {
        for (field, value) in FILLED {
            app.controller.update_field(field, value);
        }
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.handle_key_event(KeyCode::Char(c));
        }
    }

    #[test]
    fn menu_enter_opens_predict_view() {
        let (mut app, _rx) = app();
        app.handle_key_event(KeyCode::Down);
        app.handle_key_event(KeyCode::Enter);
        assert_eq!(app.view_mode, ViewMode::Predict);
        assert_eq!(app.focus_area, FocusArea::MainView);
    }

    #[test]
    fn editing_echoes_keystrokes_into_field() {
        let (mut app, _rx) = app();
        app.view_mode = ViewMode::Predict;
        app.focus_area = FocusArea::MainView;

        app.handle_key_event(KeyCode::Enter);
        assert_eq!(app.input_mode, InputMode::Editing);
        type_str(&mut app, "120.55");
        app.handle_key_event(KeyCode::Backspace);
        assert_eq!(app.controller.form().value(MeasurementField::Rainfall), "120.5");

        // q 在编辑模式下是普通字符
        assert!(!app.handle_key_event(KeyCode::Char('q')));
        app.handle_key_event(KeyCode::Backspace);

        app.handle_key_event(KeyCode::Enter);
        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.selected_field(), Some(MeasurementField::RiverDischarge));
    }

    #[test]
    fn f5_dispatches_valid_form() {
        let (mut app, mut rx) = app();
        fill_form(&mut app);
        app.handle_key_event(KeyCode::F(5));

        assert!(app.controller.state().is_loading());
        match rx.try_recv() {
            Ok(AppCommand::Dispatch(p)) => {
                assert_eq!(p.seq, 1);
                assert_eq!(p.request.rainfall, 120.5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn invalid_form_is_not_dispatched() {
        let (mut app, mut rx) = app();
        app.handle_key_event(KeyCode::F(5));
        assert!(rx.try_recv().is_err());
        assert!(matches!(
            app.controller.state(),
            SubmissionState::Failed(SubmissionError::Invalid(_))
        ));
        assert!(app.log_messages.last().unwrap().starts_with("✗"));
    }

    #[test]
    fn submit_row_is_after_last_field() {
        let (mut app, mut rx) = app();
        fill_form(&mut app);
        app.view_mode = ViewMode::Predict;
        app.focus_area = FocusArea::MainView;
        for _ in 0..FORM_ROWS + 3 {
            app.handle_key_event(KeyCode::Down);
        }
        assert_eq!(app.form_selected_index, FORM_ROWS - 1);
        assert_eq!(app.selected_field(), None);
        app.handle_key_event(KeyCode::Enter);
        assert!(matches!(rx.try_recv(), Ok(AppCommand::Dispatch(_))));
    }

    #[test]
    fn command_line_set_and_predict() {
        let (mut app, mut rx) = app();
        fill_form(&mut app);

        app.handle_key_event(KeyCode::Char('/'));
        type_str(&mut app, "set rainfall 42");
        app.handle_key_event(KeyCode::Enter);
        assert_eq!(app.controller.form().value(MeasurementField::Rainfall), "42");

        app.handle_key_event(KeyCode::Char('/'));
        type_str(&mut app, "predict");
        app.handle_key_event(KeyCode::Enter);
        match rx.try_recv() {
            Ok(AppCommand::Dispatch(p)) => assert_eq!(p.request.rainfall, 42.0),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(app.command_history, vec!["set rainfall 42", "predict"]);
    }

    #[test]
    fn remote_commands_are_forwarded() {
        let (mut app, mut rx) = app();
        app.handle_key_event(KeyCode::Char('/'));
        type_str(&mut app, "health");
        app.handle_key_event(KeyCode::Enter);
        assert_eq!(rx.try_recv().ok(), Some(AppCommand::Health));

        app.handle_key_event(KeyCode::Char('/'));
        type_str(&mut app, "quit");
        assert!(app.handle_key_event(KeyCode::Enter));
    }

    #[test]
    fn completion_hint_for_commands_and_fields() {
        let (mut app, _rx) = app();
        app.command_input = "pre".to_string();
        assert_eq!(app.get_completion_hint().as_deref(), Some("dict"));
        app.command_input = "set river".to_string();
        assert_eq!(app.get_completion_hint().as_deref(), Some("_discharge"));
        app.command_input = "set ".to_string();
        assert_eq!(app.get_completion_hint(), None);
    }

    #[test]
    fn prediction_events_settle_controller() {
        let (mut app, mut rx) = app();
        fill_form(&mut app);
        app.submit_prediction();
        let Ok(AppCommand::Dispatch(p)) = rx.try_recv() else {
            panic!("expected dispatch");
        };

        app.handle_event(AppEvent::Prediction(SubmissionOutcome {
            seq: p.seq,
            result: Ok(PredictionResult {
                prediction: 1.0,
                message: "Flood Likely".to_string(),
                note: None,
            }),
        }));
        assert!(matches!(app.controller.state(), SubmissionState::Succeeded(_)));
        assert!(app.log_messages.last().unwrap().contains("Flood warning"));

        // 旧序号的结果不会覆盖当前状态
        app.handle_event(AppEvent::Prediction(SubmissionOutcome {
            seq: p.seq,
            result: Err(SubmissionError::from_service(
                ServiceError::Http("late".into()),
                "http://127.0.0.1:9",
            )),
        }));
        assert!(matches!(app.controller.state(), SubmissionState::Succeeded(_)));
    }

    #[test]
    fn backend_event_updates_status() {
        let (mut app, _rx) = app();
        app.handle_event(AppEvent::Backend(BackendStatus {
            online: false,
            detail: "connection refused".to_string(),
        }));
        assert_eq!(app.backend_status.as_ref().map(|s| s.online), Some(false));
        assert!(app.log_messages.last().unwrap().starts_with("⚠"));
    }

    #[test]
    fn submit_without_worker_fails_instead_of_loading() {
        let (mut app, rx) = app();
        drop(rx);
        fill_form(&mut app);
        app.submit_prediction();

        assert!(!app.controller.state().is_loading());
        match app.controller.state() {
            SubmissionState::Failed(SubmissionError::Transport { endpoint, .. }) => {
                assert_eq!(endpoint, "http://127.0.0.1:9");
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert!(app
            .log_messages
            .last()
            .unwrap()
            .contains("Cannot reach prediction service"));
    }

    #[test]
    fn log_keeps_only_recent_messages() {
        let (mut app, _rx) = app();
        for i in 0..MAX_LOG_MESSAGES + 50 {
            app.add_log(format!("line {}", i));
        }
        assert_eq!(app.log_messages.len(), MAX_LOG_MESSAGES);
        assert_eq!(
            app.log_messages.last().map(String::as_str),
            Some(format!("line {}", MAX_LOG_MESSAGES + 49).as_str())
        );
        assert_eq!(app.log_messages[0], "line 50");
    }
}
