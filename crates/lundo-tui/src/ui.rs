use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
};
use lundo_core::widget::{visible_citations, ASSISTANT_NAME};
use lundo_core::{ChatMode, PanelView, Position, Role, ToolIcon, ToolPill, WidgetView};
use crate::app::App;

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

const PANEL_WIDTH: u16 = 64;

/// Parse a line of text and convert **bold** markdown to styled spans
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        let Some(len) = after.find("**").filter(|len| *len > 0) else {
            break;
        };
        if start > 0 {
            spans.push(Span::raw(rest[..start].to_string()));
        }
        spans.push(Span::styled(
            after[..len].to_string(),
            Style::default().add_modifier(Modifier::BOLD),
        ));
        rest = &after[len + 2..];
    }

    // No closing ** is kept literally
    if !rest.is_empty() {
        spans.push(Span::raw(rest.to_string()));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

fn tool_glyph(icon: ToolIcon) -> &'static str {
    match icon {
        ToolIcon::Search => "🔍",
        ToolIcon::Globe => "🌐",
        ToolIcon::User => "👤",
        ToolIcon::Clock => "🕐",
    }
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [body_area, footer_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    match app.widget.view(&app.chat) {
        WidgetView::Hidden => {
            app.chat_area = None;
        }
        WidgetView::Launcher => {
            app.chat_area = None;
            render_launcher(app, frame, body_area);
        }
        WidgetView::Panel(panel) => render_panel(app, frame, body_area, &panel),
    }

    render_footer(app, frame, footer_area);
}

/// Anchor a box of the given size to the bottom corner named by `position`
fn anchored(area: Rect, width: u16, height: u16, position: Position) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = match position {
        Position::BottomRight => area.x + area.width - width,
        Position::BottomLeft => area.x,
    };
    Rect::new(x, area.y + area.height - height, width, height)
}

fn render_launcher(app: &App, frame: &mut Frame, area: Rect) {
    let label = format!(" 💬 Chat with {} ", ASSISTANT_NAME);
    let width = label.chars().count() as u16 + 4;
    let button_area = anchored(area, width, 3, app.widget.position());

    let button = Paragraph::new(Line::from(Span::styled(
        label,
        Style::default().fg(Color::White).bold(),
    )))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    frame.render_widget(button, button_area);
}

fn render_panel(app: &mut App, frame: &mut Frame, area: Rect, panel: &PanelView) {
    let panel_area = anchored(area, PANEL_WIDTH, area.height, app.widget.position());
    frame.render_widget(Clear, panel_area);

    let citations = visible_citations(&app.chat);
    let citations_height = if citations.is_empty() {
        0
    } else {
        citations.len() as u16 + 2
    };

    let [header_area, chat_area, citations_area, input_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(citations_height),
        Constraint::Length(3),
    ])
    .areas(panel_area);

    render_header(app, frame, header_area);

    // Inner size minus borders, used for scroll calculations
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::DarkGray));

    let spinner = SPINNER[app.animation_frame % SPINNER.len()];

    let text = match panel {
        PanelView::CheckingHealth => Text::from(Line::from(vec![
            Span::styled(format!("{} ", spinner), Style::default().fg(Color::Cyan)),
            Span::styled("Connecting...", Style::default().fg(Color::DarkGray)),
        ])),
        PanelView::NotReady => not_ready_text(app),
        PanelView::Ready {
            show_welcome,
            status_message,
            tool_pills,
            show_spinner,
            error,
            ..
        } => {
            let mut lines = conversation_lines(app, *show_welcome);

            if let Some(status) = status_message {
                lines.push(Line::from(vec![
                    Span::styled(format!("{} ", spinner), Style::default().fg(Color::Cyan)),
                    Span::styled(status.clone(), Style::default().fg(Color::DarkGray).italic()),
                ]));
            }
            if !tool_pills.is_empty() {
                lines.push(tool_pill_line(tool_pills));
            }
            if *show_spinner {
                lines.push(Line::from(Span::styled(
                    format!("{} Thinking...", spinner),
                    Style::default().fg(Color::DarkGray).italic(),
                )));
            }
            if let Some(error) = error {
                lines.push(Line::from(Span::styled(
                    error.clone(),
                    Style::default().fg(Color::Red),
                )));
            }
            Text::from(lines)
        }
    };

    let chat = Paragraph::new(text)
        .block(chat_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, chat_area);

    if citations_height > 0 {
        let lines: Vec<Line> = citations
            .iter()
            .map(|citation| {
                let mut spans = vec![Span::raw(format!(" {} ", citation.title))];
                if let Some(url) = citation.url.as_deref().or(citation.filepath.as_deref()) {
                    spans.push(Span::styled(url.to_string(), Style::default().fg(Color::DarkGray)));
                }
                Line::from(spans)
            })
            .collect();

        let block = Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Magenta))
            .title(" Sources ");
        frame.render_widget(Paragraph::new(lines).block(block), citations_area);
    }

    render_input(app, frame, input_area);
}

fn not_ready_text(app: &App) -> Text<'static> {
    let mut lines = vec![
        Line::from(Span::styled(
            "Configuration Required",
            Style::default().fg(Color::Yellow).bold(),
        )),
        Line::default(),
        Line::from("The chat service is not ready yet. Please try again later."),
    ];
    if let Some(error) = &app.chat.error {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(error.clone(), Style::default().fg(Color::Red))));
    }
    lines.push(Line::default());
    lines.push(Line::from(vec![
        Span::styled(" Ctrl+R ", Style::default().bg(Color::DarkGray).fg(Color::White)),
        Span::raw(" retry"),
    ]));
    Text::from(lines)
}

fn conversation_lines(app: &App, show_welcome: bool) -> Vec<Line<'static>> {
    let assistant_label = || {
        Line::from(Span::styled(
            format!("{}:", ASSISTANT_NAME),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ))
    };

    let mut lines = Vec::new();
    if show_welcome {
        lines.push(assistant_label());
        lines.extend(app.widget.welcome().lines().map(parse_markdown_line));
        lines.push(Line::default());
    }

    for msg in &app.chat.messages {
        match msg.role {
            Role::User => {
                lines.push(Line::from(Span::styled(
                    "You:",
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                lines.extend(msg.content.lines().map(|line| Line::from(line.to_string())));
            }
            Role::Assistant => {
                lines.push(assistant_label());
                lines.extend(msg.content.lines().map(parse_markdown_line));
            }
        }
        lines.push(Line::default());
    }
    lines
}

fn tool_pill_line(pills: &[ToolPill]) -> Line<'static> {
    let mut spans = Vec::new();
    for pill in pills {
        let color = if pill.completed { Color::Green } else { Color::Blue };
        spans.push(Span::styled(
            format!(" {} {} ", tool_glyph(pill.display.icon), pill.display.label),
            Style::default().bg(color).fg(Color::Black),
        ));
        spans.push(Span::raw(" "));
    }
    Line::from(spans)
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
        Span::styled(format!(" {} ", ASSISTANT_NAME), Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("[{}]", app.chat.mode.display_name()),
            Style::default().fg(Color::Gray),
        ),
    ];
    if app.chat.agent_status.is_thinking {
        spans.push(Span::styled(" thinking...", Style::default().fg(Color::Yellow).italic()));
    } else if app.chat.is_rate_limited {
        spans.push(Span::styled(" rate limited", Style::default().fg(Color::Red)));
    }

    let header = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let enabled = app.widget.input_enabled(&app.chat);
    let border_color = if enabled { Color::Yellow } else { Color::DarkGray };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border_color));

    // Horizontal scroll keeps the cursor visible
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.widget.cursor();
    let scroll_offset = if inner_width > 0 && cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.widget.input().is_empty() {
        Paragraph::new(Span::styled(
            app.widget.placeholder(&app.chat),
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let visible: String = app
            .widget
            .input()
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        Paragraph::new(visible).style(Style::default().fg(Color::Cyan))
    };
    frame.render_widget(input.block(block), area);

    if enabled {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.widget.view(&app.chat) {
        WidgetView::Hidden => vec![
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        WidgetView::Launcher => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" open chat ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        WidgetView::Panel(panel) => {
            let mut hints = match panel {
                PanelView::NotReady => vec![
                    Span::styled(" ^R ", key_style),
                    Span::styled(" retry ", label_style),
                ],
                _ => vec![
                    Span::styled(" Enter ", key_style),
                    Span::styled(" send ", label_style),
                    Span::styled(" ↑/↓ ", key_style),
                    Span::styled(" scroll ", label_style),
                    Span::styled(" ^L ", key_style),
                    Span::styled(" clear ", label_style),
                ],
            };
            let next_mode = match app.chat.mode {
                ChatMode::Agent => ChatMode::Simple,
                ChatMode::Simple => ChatMode::Agent,
            };
            hints.extend(vec![
                Span::styled(" ^T ", key_style),
                Span::styled(format!(" {} ", next_mode.display_name()), label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" close ", label_style),
                Span::styled(" ^C ", key_style),
                Span::styled(" quit ", label_style),
            ]);
            hints
        }
    };

    let footer = Paragraph::new(Line::from(hints)).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}
