mod app_service;
mod app_state;
mod commands;
mod config;
mod form;
mod prediction;
mod submission;
mod ui;

use anyhow::Context;
use chrono::Local;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::{error, info};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::app_service::{probe_backend, run_command_loop};
use crate::app_state::{App, AppEvent};
use crate::commands::AppCommand;
use crate::config::AppConfig;
use crate::prediction::{HttpPredictionService, PredictionService};
use crate::ui::draw;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let mut startup_info = Vec::new();

    // 加载 .env（可选），之后读取进程环境变量
    let current_dir = std::env::current_dir().unwrap_or_else(|_| std::path::PathBuf::from("."));
    match dotenv::dotenv() {
        Ok(path) => startup_info.push(format!("✓ 已加载 .env 文件: {}", path.display())),
        Err(_) => startup_info.push(format!(
            "⚠ 未找到 .env 文件 ({})，使用系统环境变量",
            current_dir.display()
        )),
    }

    let config = AppConfig::from_env().context("读取配置失败")?;
    startup_info.push(format!("预测服务地址: {}", config.api_url));
    if let Some(proxy) = &config.proxy {
        startup_info.push(format!("使用代理: {}", proxy));
    }
    info!("启动配置: {:?}", config);

    let service: Arc<dyn PredictionService> = Arc::new(
        HttpPredictionService::from_config(&config).context("创建 HTTP 客户端失败")?,
    );

    // 创建核心 Channel
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<AppCommand>();
    let (evt_tx, evt_rx) = mpsc::unbounded_channel::<AppEvent>();

    // 启动时检查一次后端连通性，不阻塞界面
    {
        let svc = service.clone();
        let tx = evt_tx.clone();
        tokio::spawn(async move {
            probe_backend(&svc, &tx).await;
        });
    }

    // 启动单后台任务模型 (Actor)
    let actor = tokio::spawn(run_command_loop(service.clone(), cmd_rx, evt_tx));

    // TUI 初始化
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(startup_info, service, cmd_tx.clone(), evt_rx);

    let res = match app.evt_rx.take() {
        Some(rx) => run_app_loop(&mut terminal, &mut app, rx).await,
        None => Ok(()),
    };

    // 恢复终端
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    // 通知后台退出并中止在途请求
    let _ = cmd_tx.send(AppCommand::Quit);
    drop(cmd_tx);
    drop(app);
    if let Err(e) = actor.await {
        error!("后台任务异常退出: {}", e);
    }

    if let Err(e) = &res {
        error!("界面循环出错: {}", e);
    }
    res.map_err(Into::into)
}

/// 日志写入 logs/app-<时间戳>.log，终端留给 TUI
fn init_logging() -> anyhow::Result<()> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    let log_dir = std::path::PathBuf::from("logs");
    std::fs::create_dir_all(&log_dir).context("无法创建日志目录")?;
    let log_path = log_dir.join(format!("app-{}.log", ts));
    let log_file = std::fs::File::create(&log_path)
        .with_context(|| format!("无法创建日志文件 {}", log_path.display()))?;
    env_logger::Builder::new()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Warn)
        .filter_module("floodshield", log::LevelFilter::Info)
        .filter_module("reqwest", log::LevelFilter::Warn)
        .parse_default_env()
        .init();
    Ok(())
}

async fn run_app_loop<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut evt_rx: mpsc::UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    loop {
        app.tick = app.tick.wrapping_add(1);
        terminal.draw(|f| draw(f, app))?;

        while let Ok(event) = evt_rx.try_recv() {
            app.handle_event(event);
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press && app.handle_key_event(key.code) {
                    return Ok(());
                }
            }
        }
    }
}
