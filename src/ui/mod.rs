use crate::app_state::{App, FocusArea, InputMode, ViewMode, MENU_ITEMS};
use crate::form::MeasurementField;
use crate::submission::{SubmissionError, SubmissionState};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

const SPINNER: [&str; 8] = ["⣾", "⣽", "⣻", "⢿", "⡿", "⣟", "⣯", "⣷"];

pub fn draw(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([
            Constraint::Length(3), // 顶部标题栏
            Constraint::Min(0),    // 中间内容区域
            Constraint::Length(10), // 底部命令/日志区域
        ])
        .split(f.size());

    render_top_bar(f, chunks[0]);

    // 中间内容区域（左侧菜单 + 主视图）
    let middle_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Horizontal)
        .constraints([Constraint::Length(20), Constraint::Min(0)])
        .split(chunks[1]);

    render_left_menu(f, middle_chunks[0], app);
    render_main_view(f, middle_chunks[1], app);
    render_bottom_bar(f, chunks[2], app);
}

fn focus_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::White)
    }
}

fn render_top_bar(f: &mut Frame, area: Rect) {
    let title = Block::default()
        .borders(Borders::ALL)
        .style(Style::default().fg(Color::Cyan));

    let title_text = Line::from(vec![
        Span::styled(
            " 🌊 FloodShield ",
            Style::default()
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" - Flood Risk Prediction"),
    ]);

    let paragraph = Paragraph::new(title_text)
        .block(title)
        .alignment(ratatui::layout::Alignment::Center);

    f.render_widget(paragraph, area);
}

fn render_left_menu(f: &mut Frame, area: Rect, app: &App) {
    let menu_items: Vec<ListItem> = MENU_ITEMS
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let is_selected = i == app.menu_selected_index;
            let is_active = matches!(
                (i, &app.view_mode),
                (0, ViewMode::Home) | (1, ViewMode::Predict) | (2, ViewMode::Parameters)
            );

            let style = if is_selected {
                if app.focus_area == FocusArea::Menu {
                    Style::default()
                        .fg(Color::Black)
                        .bg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                        .fg(Color::Magenta)
                        .add_modifier(Modifier::BOLD)
                }
            } else if is_active {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };

            let prefix = if is_active { "● " } else { "○ " };
            ListItem::new(format!("{}{}", prefix, text)).style(style)
        })
        .collect();

    let title = if app.focus_area == FocusArea::Menu {
        "菜单 (Enter/c 确认)"
    } else {
        "菜单 (← 切换)"
    };

    let menu = List::new(menu_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(focus_style(app.focus_area == FocusArea::Menu)),
    );

    f.render_widget(menu, area);
}

fn render_main_view(f: &mut Frame, area: Rect, app: &App) {
    match app.view_mode {
        ViewMode::Home => render_home(f, area, app),
        ViewMode::Predict => {
            let chunks = Layout::default()
                .direction(ratatui::layout::Direction::Horizontal)
                .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
                .split(area);
            render_form(f, chunks[0], app);
            render_result(f, chunks[1], app);
        }
        ViewMode::Parameters => render_parameters(f, area, app),
    }
}

fn render_home(f: &mut Frame, area: Rect, app: &App) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let mut lines = vec![
        Line::from(Span::styled(
            "FloodShield: AI-powered flood risk prediction",
            bold.fg(Color::Cyan),
        )),
        Line::from(""),
        Line::from(Span::styled("--- How FloodShield works ---", Style::default().fg(Color::Yellow))),
        Line::from("  1. Collect data: rainfall, river levels and geographical parameters."),
        Line::from("  2. The trained model analyses the measurements for flood patterns."),
        Line::from("  3. Get a flood-risk verdict with an actionable safety alert."),
        Line::from(""),
    ];

    let backend = match &app.backend_status {
        Some(s) if s.online => Span::styled(
            format!("✓ 已连接 {}", s.detail),
            Style::default().fg(Color::Green),
        ),
        Some(s) => Span::styled(
            format!("⚠ 不可达 {}", s.detail),
            Style::default().fg(Color::Yellow),
        ),
        None => Span::styled("检查中...", Style::default().fg(Color::Gray)),
    };
    lines.push(Line::from(vec![
        Span::styled("后端: ", bold),
        Span::raw(app.controller.service().base_url().to_string()),
    ]));
    lines.push(Line::from(vec![Span::raw("      "), backend]));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "按 Enter 开始预测, /health 重新检查后端",
        Style::default().fg(Color::Gray).add_modifier(Modifier::ITALIC),
    )));

    let title = if app.focus_area == FocusArea::MainView {
        "首页 (Enter 进入预测, ← 切换菜单)"
    } else {
        "首页"
    };
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(focus_style(app.focus_area == FocusArea::MainView)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_form(f: &mut Frame, area: Rect, app: &App) {
    let form = app.controller.form();
    let field_errors = match app.controller.state() {
        SubmissionState::Failed(SubmissionError::Invalid(e)) => Some(e),
        _ => None,
    };
    let focused = app.focus_area == FocusArea::MainView;

    let mut items: Vec<ListItem> = MeasurementField::ALL
        .iter()
        .enumerate()
        .map(|(i, field)| {
            let is_selected = focused && i == app.form_selected_index;
            let editing = is_selected && app.input_mode == InputMode::Editing;
            let label = match field.unit() {
                Some(u) => format!("{} ({})", field.label(), u),
                None if !field.is_required() => format!("{} (optional)", field.label()),
                None => field.label().to_string(),
            };

            let mut spans = vec![
                Span::styled(
                    if is_selected { ">> " } else { "   " },
                    Style::default().fg(Color::Magenta),
                ),
                Span::styled(format!("{:<24}", label), Style::default().fg(Color::White)),
                Span::styled(
                    form.value(*field).to_string(),
                    if editing {
                        Style::default().fg(Color::Black).bg(Color::Yellow)
                    } else {
                        Style::default().fg(Color::Cyan)
                    },
                ),
            ];
            if editing {
                spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
            }
            if let Some(err) = field_errors.and_then(|e| e.for_field(*field)) {
                spans.push(Span::styled(
                    format!("  ✗ {}", err),
                    Style::default().fg(Color::Red),
                ));
            }
            ListItem::new(Line::from(spans))
        })
        .collect();

    let loading = app.controller.state().is_loading();
    let submit_selected = focused && app.selected_field().is_none();
    let submit_text = if loading {
        "[ Analyzing Data... ]"
    } else if !form.is_complete() {
        "[ Predict Flood Risk ]  (fill in all required fields)"
    } else {
        "[ Predict Flood Risk ]"
    };
    items.push(ListItem::new(""));
    items.push(ListItem::new(Line::from(vec![
        Span::styled(
            if submit_selected { ">> " } else { "   " },
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(
            submit_text,
            if submit_selected {
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
            },
        ),
    ])));

    let title = if app.input_mode == InputMode::Editing {
        "环境数据 (输入中: Enter 确认, Esc 结束, F5 提交)"
    } else if focused {
        "环境数据 (↑↓ 选择, Enter 编辑, F5 提交)"
    } else {
        "环境数据"
    };
    let list = List::new(items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(title)
            .style(focus_style(focused)),
    );
    f.render_widget(list, area);
}

fn render_result(f: &mut Frame, area: Rect, app: &App) {
    let (lines, border): (Vec<Line>, Color) = match app.controller.state() {
        SubmissionState::Idle => (
            vec![
                Line::from("填写全部字段后提交，即可获得洪水风险评估。"),
                Line::from(""),
                Line::from(Span::styled(
                    "Our model predicts flood risk from rainfall, discharge, soil and elevation.",
                    Style::default().fg(Color::Gray),
                )),
            ],
            Color::White,
        ),
        SubmissionState::Loading { seq } => {
            let frame = SPINNER[(app.tick as usize) % SPINNER.len()];
            (
                vec![
                    Line::from(Span::styled(
                        format!("{} Analyzing data...", frame),
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )),
                    Line::from(Span::styled(
                        format!("请求 #{}", seq),
                        Style::default().fg(Color::Gray),
                    )),
                ],
                Color::Cyan,
            )
        }
        SubmissionState::Succeeded(r) => {
            let (headline, color) = if r.is_flood_likely() {
                (
                    "🚨 FloodShield Alert: Flood Likely. Take precautions!",
                    Color::Red,
                )
            } else {
                ("✅ Safe Conditions Detected. No flood expected.", Color::Green)
            };
            let mut lines = vec![
                Line::from(Span::styled(
                    headline,
                    Style::default().fg(color).add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(vec![
                    Span::styled("Prediction: ", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(format!("{}", r.prediction)),
                ]),
            ];
            if !r.message.is_empty() {
                lines.push(Line::from(vec![
                    Span::styled("Message: ", Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(r.message.clone()),
                ]));
            }
            if let Some(note) = &r.note {
                lines.push(Line::from(Span::styled(
                    note.clone(),
                    Style::default().fg(Color::Gray),
                )));
            }
            (lines, color)
        }
        SubmissionState::Failed(e) => {
            let mut lines = vec![Line::from(Span::styled(
                "✗ 预测失败",
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ))];
            match e {
                SubmissionError::Invalid(form_err) => {
                    for fe in &form_err.errors {
                        lines.push(Line::from(format!("  • {}", fe)));
                    }
                }
                other => lines.push(Line::from(other.to_string())),
            }
            (lines, Color::Red)
        }
    };

    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("预测结果")
                .style(Style::default().fg(border)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_parameters(f: &mut Frame, area: Rect, app: &App) {
    let mut lines = vec![
        Line::from(Span::styled(
            "--- Understanding Input Parameters ---",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
    ];
    for field in MeasurementField::ALL {
        lines.push(Line::from(vec![
            Span::styled(
                format!("{:<16}", field.label()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!("{:<6}", field.unit().unwrap_or("-")),
                Style::default().fg(Color::Magenta),
            ),
            Span::raw(field.description()),
        ]));
    }

    let title = if app.focus_area == FocusArea::MainView {
        "参数说明 (x 返回, ← 切换菜单)"
    } else {
        "参数说明"
    };
    let paragraph = Paragraph::new(lines)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(title)
                .style(focus_style(app.focus_area == FocusArea::MainView)),
        )
        .wrap(Wrap { trim: false });
    f.render_widget(paragraph, area);
}

fn render_bottom_bar(f: &mut Frame, area: Rect, app: &App) {
    let bottom_chunks = Layout::default()
        .direction(ratatui::layout::Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    let command_prompt = if app.input_mode == InputMode::Command {
        let mut spans = vec![Span::styled(
            "命令: ",
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD),
        )];
        let cur = app.command_cursor.min(app.command_input.len());
        let (left, right) = app.command_input.split_at(cur);
        spans.push(Span::raw(left));
        spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(right));

        // 补全建议以灰色幽灵文本显示
        if let Some(hint) = app.get_completion_hint() {
            spans.push(Span::styled(hint, Style::default().fg(Color::DarkGray)));
        }
        Line::from(spans)
    } else {
        Line::from(vec![
            Span::styled("命令: ", Style::default().fg(Color::Yellow)),
            Span::raw("/命令 ←→切换 ↑↓导航 Enter确认 F5提交 x返回 q退出"),
        ])
    };
    let command_paragraph = Paragraph::new(command_prompt).block(
        Block::default()
            .borders(Borders::ALL)
            .title(if app.input_mode == InputMode::Command {
                "命令输入模式 (Enter执行 Esc取消 Tab补全 ↑↓历史)"
            } else {
                "命令输入"
            })
            .style(if app.input_mode == InputMode::Command {
                Style::default().fg(Color::Green)
            } else {
                Style::default().fg(Color::White)
            }),
    );
    f.render_widget(command_paragraph, bottom_chunks[0]);

    // 日志区域，最新的在顶部
    let log_items: Vec<ListItem> = app
        .log_messages
        .iter()
        .rev()
        .take(20)
        .map(|msg| {
            let style = if msg.starts_with("✓") {
                Style::default().fg(Color::Green)
            } else if msg.starts_with("✗") {
                Style::default().fg(Color::Red)
            } else if msg.starts_with("⚠") {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default().fg(Color::White)
            };
            ListItem::new(msg.as_str()).style(style)
        })
        .collect();

    let log = List::new(log_items).block(
        Block::default()
            .borders(Borders::ALL)
            .title(format!("日志 (共 {} 条)", app.log_messages.len()))
            .style(Style::default().fg(Color::White)),
    );
    f.render_widget(log, bottom_chunks[1]);
}
