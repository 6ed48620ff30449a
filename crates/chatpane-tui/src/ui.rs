use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use chatpane_core::{Entry, Message, Role, TranslationToggle};
use crate::app::{App, InputMode};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, chat log, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if let Some(alert) = app.alert() {
        render_alert(alert, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" chatpane ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.backend.base_url().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store chat area dimensions for scroll calculations (inner size minus borders)
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    app.chat_width = area.width.saturating_sub(2);

    let focused = app.input_mode == InputMode::Normal;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(" Conversation ");

    let transcript = app.controller.transcript();

    let text = if transcript.entries().is_empty() {
        Text::from(Span::styled(
            "Type a message and press Enter...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for entry in transcript.entries() {
            match entry {
                Entry::Message(id) => {
                    let Some(msg) = transcript.message(*id) else {
                        continue;
                    };
                    let selected = focused && app.selected == Some(*id);
                    push_message_lines(app, msg, transcript.toggle(*id), selected, &mut lines);
                }
                Entry::Typing => {
                    lines.push(bot_label(false));
                    // Animated ellipsis: cycles through ".", "..", "..."
                    let dots = ".".repeat((app.animation_frame as usize) + 1);
                    lines.push(Line::from(Span::styled(
                        format!("typing{}", dots),
                        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
                    )));
                }
            }
        }

        Text::from(lines)
    };

    let chat = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.scroll, 0));

    frame.render_widget(chat, area);
}

fn bot_label(selected: bool) -> Line<'static> {
    let mut style = Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD);
    if selected {
        style = style.add_modifier(Modifier::REVERSED);
    }
    Line::from(Span::styled("Bot:", style))
}

fn push_message_lines<'a>(
    app: &App,
    msg: &'a Message,
    toggle: Option<&TranslationToggle>,
    selected: bool,
    lines: &mut Vec<Line<'a>>,
) {
    match msg.role {
        Role::User => {
            lines.push(Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )));
            for line in msg.text.lines() {
                lines.push(Line::from(line));
            }
        }
        Role::Bot => {
            lines.push(bot_label(selected));
            for line in msg.text.lines() {
                lines.push(Line::from(line));
            }

            if let Some(image) = &msg.image {
                lines.push(Line::from(vec![
                    Span::styled("[graph] ", Style::default().fg(Color::Magenta)),
                    Span::styled(
                        app.backend.resolve_url(image),
                        Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED),
                    ),
                ]));
            }

            if let Some(toggle) = toggle {
                lines.push(toggle_line(toggle, selected));
            }
        }
    }
    lines.push(Line::default());
}

/// Translate control rendered as a button; dimmed while its request is in flight
fn toggle_line(toggle: &TranslationToggle, selected: bool) -> Line<'static> {
    let style = if toggle.pending {
        Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC)
    } else if selected {
        Style::default().bg(Color::Blue).fg(Color::White).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::Green)
    };

    let mut spans = vec![Span::styled(format!("[ {} ]", toggle.label()), style)];
    if !toggle.is_translated && !toggle.pending {
        spans.push(Span::styled(
            format!(" → {}", toggle.target.code()),
            Style::default().fg(Color::DarkGray),
        ));
    }
    Line::from(spans)
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let title = if app.controller.is_sending() {
        " Message (waiting for reply) "
    } else {
        " Message "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if editing { Color::Yellow } else { Color::DarkGray }))
        .title(title);

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.cursor;

    // Calculate scroll offset to keep cursor visible
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app.input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    // Show cursor when editing
    if editing && app.alert().is_none() {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" SELECT ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" TYPE ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let mut hints = match app.input_mode {
        InputMode::Editing => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" select messages ", label_style),
            Span::styled(" Ctrl-C ", key_style),
            Span::styled(" quit ", label_style),
        ],
        InputMode::Normal => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" t ", key_style),
            Span::styled(" translate ", label_style),
            Span::styled(" c ", key_style),
            Span::styled(" copy graph ", label_style),
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    if let Some(status) = &app.status {
        hints.push(Span::styled(format!("  {}", status), Style::default().fg(Color::Yellow)));
    }

    let footer_content = Line::from(
        vec![
            Span::styled(mode_text, mode_style),
            Span::styled(" ", label_style),
        ]
        .into_iter()
        .chain(hints)
        .collect::<Vec<_>>(),
    );

    let footer = Paragraph::new(footer_content).style(Style::default().bg(Color::Black));
    frame.render_widget(footer, area);
}

fn render_alert(alert: &str, frame: &mut Frame, area: Rect) {
    // Calculate popup size and position (centered)
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = 5.min(area.height);

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Alert (Enter to dismiss) ");

    let body = Paragraph::new(alert.to_string())
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: true })
        .block(block);

    frame.render_widget(body, popup_area);
}
