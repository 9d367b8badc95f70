use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState, Wrap,
    },
};
use crate::app::{App, InputMode, Screen};
use crate::markdown::{parse_message, Segment};
use crate::session::{ChatRole, LessonSession};

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    match app.screen {
        Screen::Topics => render_topics_screen(app, frame, body_area),
        Screen::Lesson => render_lesson_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let session_indicator = match &app.session {
        Some(session) => format!(" [{}]", session.topic.title),
        None => String::new(),
    };

    let title = Line::from(vec![
        Span::styled(" SSRF Academy ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(session_indicator, Style::default().fg(Color::Black)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Black),
        ),
        Span::styled(
            "  Educational purposes only",
            Style::default().fg(Color::Yellow),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.screen {
        Screen::Topics => " TOPICS ",
        Screen::Lesson => " LAB ",
    };

    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match (app.screen, app.input_mode) {
        (Screen::Topics, _) => vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" nav ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" start module ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
        (Screen::Lesson, InputMode::Editing) => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Alt+Enter ", key_style),
            Span::styled(" newline ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" stop typing ", label_style),
        ],
        (Screen::Lesson, InputMode::Normal) => vec![
            Span::styled(" i ", key_style),
            Span::styled(" type ", label_style),
            Span::styled(" j/k ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" g/G ", key_style),
            Span::styled(" top/bottom ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" topics ", label_style),
            Span::styled(" q ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

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

fn render_topics_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let [intro_area, list_area] = Layout::vertical([
        Constraint::Length(4),
        Constraint::Min(0),
    ])
    .areas(area);

    let intro = Paragraph::new(vec![
        Line::default(),
        Line::from(Span::styled(
            "Advanced SSRF Exploitation & Defense",
            Style::default().fg(Color::Cyan).bold(),
        )),
        Line::from(Span::styled(
            "Master Server-Side Request Forgery through interactive AI-driven lessons. Select a module to begin.",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .wrap(Wrap { trim: true });
    frame.render_widget(intro, intro_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Modules ");

    let items: Vec<ListItem> = app
        .topics
        .iter()
        .map(|topic| {
            ListItem::new(vec![
                Line::from(vec![
                    Span::raw(format!(" {} ", topic.icon)),
                    Span::styled(topic.title, Style::default().fg(Color::White).bold()),
                    Span::raw("  "),
                    Span::styled(
                        format!("[{}]", topic.difficulty.as_str()),
                        Style::default().fg(topic.difficulty.color()),
                    ),
                ]),
                Line::from(Span::styled(
                    format!("   {}", topic.description),
                    Style::default().fg(Color::DarkGray),
                )),
                Line::default(),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Blue)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, list_area, &mut app.topic_state);
}

fn render_lesson_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let Some(session) = &mut app.session else {
        return;
    };

    // Input grows with embedded newlines, up to 5 rows of text
    let input_rows = session.input.split('\n').count().clamp(1, 5) as u16;
    let [chat_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(input_rows + 2),
    ])
    .areas(area);

    render_chat(session, app.animation_frame, frame, chat_area);
    render_input(session, app.input_mode, frame, input_area);
}

fn render_chat(session: &mut LessonSession, animation_frame: u8, frame: &mut Frame, area: Rect) {
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Line::from(vec![
            Span::raw(format!(" {} ", session.topic.title)),
            Span::styled(
                format!("[ENV: {}] ", session.topic.difficulty.as_str().to_uppercase()),
                Style::default().fg(session.topic.difficulty.color()),
            ),
        ]));

    let inner = chat_block.inner(area);
    session.chat_height = inner.height;
    let wrap_width = inner.width.max(1) as usize;

    let chat_text = if session.messages.is_empty() && session.loading {
        let dots = ".".repeat((animation_frame as usize) + 1);
        Text::from(vec![
            Line::default(),
            Line::from(Span::styled(
                format!("  Initializing lab environment{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )),
        ])
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &session.messages {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    // Input text is shown literally, no markup parsing
                    for line in msg.text.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                    lines.push(Line::default());
                }
                ChatRole::Model if msg.is_error => {
                    lines.push(Line::from(Span::styled(
                        "Lab:",
                        Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(Span::styled(
                        msg.text.clone(),
                        Style::default().fg(Color::Red),
                    )));
                    lines.push(Line::default());
                }
                ChatRole::Model => {
                    lines.push(Line::from(Span::styled(
                        "Lab:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    lines.extend(message_lines(&msg.text));
                    lines.push(Line::default());
                }
            }
        }

        if session.loading && !session.messages.is_empty() {
            lines.push(Line::from(Span::styled(
                "Lab:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            let dots = ".".repeat((animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Processing{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    // Estimate wrapped height so scroll-to-bottom lands on the latest message
    session.total_chat_lines = chat_text
        .lines
        .iter()
        .map(|line| {
            let chars: usize = line.spans.iter().map(|s| s.content.chars().count()).sum();
            ((chars.max(1) - 1) / wrap_width + 1) as u16
        })
        .sum();

    if session.follow_bottom {
        session.scroll = session.max_scroll();
    }

    let chat = Paragraph::new(chat_text)
        .block(chat_block)
        .wrap(Wrap { trim: false })
        .scroll((session.scroll, 0));

    frame.render_widget(chat, area);

    if session.total_chat_lines > session.chat_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));

        let mut scrollbar_state = ScrollbarState::new(session.total_chat_lines as usize)
            .position(session.scroll as usize);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(ratatui::layout::Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

/// Map a parsed model message onto styled lines. Fenced blocks become a
/// labeled monospace panel; inline code and bold become styled spans.
fn message_lines(text: &str) -> Vec<Line<'static>> {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();

    for segment in parse_message(text) {
        match segment {
            Segment::CodeBlock { text, lang } => {
                if !current.is_empty() {
                    lines.push(Line::from(std::mem::take(&mut current)));
                }
                let label = match lang {
                    Some(lang) => format!("── Terminal Output / Code ({}) ──", lang),
                    None => "── Terminal Output / Code ──".to_string(),
                };
                lines.push(Line::from(Span::styled(
                    label,
                    Style::default().fg(Color::DarkGray),
                )));
                for code_line in text.lines() {
                    lines.push(Line::from(Span::styled(
                        format!("  {}", code_line),
                        Style::default().fg(Color::Green),
                    )));
                }
                if text.is_empty() {
                    lines.push(Line::default());
                }
            }
            Segment::Plain(text) => {
                let mut parts = text.split('\n');
                if let Some(first) = parts.next() {
                    if !first.is_empty() {
                        current.push(Span::raw(first.to_string()));
                    }
                }
                for part in parts {
                    lines.push(Line::from(std::mem::take(&mut current)));
                    if !part.is_empty() {
                        current.push(Span::raw(part.to_string()));
                    }
                }
            }
            Segment::Bold(text) => {
                current.push(Span::styled(
                    text,
                    Style::default().fg(Color::White).add_modifier(Modifier::BOLD),
                ));
            }
            Segment::InlineCode(text) => {
                current.push(Span::styled(
                    text,
                    Style::default().fg(Color::Magenta),
                ));
            }
        }
    }
    if !current.is_empty() {
        lines.push(Line::from(current));
    }

    lines
}

fn render_input(session: &LessonSession, input_mode: InputMode, frame: &mut Frame, area: Rect) {
    let input_border_color = if input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(" > Enter command or answer (i to type) ");

    let inner_width = area.width.saturating_sub(2) as usize;

    // Cursor row/column from the char offset, counting embedded newlines
    let before_cursor: String = session.input.chars().take(session.input_cursor).collect();
    let cursor_row = before_cursor.matches('\n').count();
    let cursor_col = before_cursor
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count())
        .unwrap_or(0);

    // Horizontal scroll keeps the cursor visible on long single lines
    let h_scroll = if inner_width == 0 {
        0
    } else if cursor_col >= inner_width {
        cursor_col - inner_width + 1
    } else {
        0
    };

    let visible_lines: Vec<Line> = session
        .input
        .split('\n')
        .map(|l| {
            let visible: String = l.chars().skip(h_scroll).take(inner_width).collect();
            Line::from(visible)
        })
        .collect();

    let input = Paragraph::new(visible_lines)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, area);

    if input_mode == InputMode::Editing {
        frame.set_cursor_position((
            area.x + clamped_cursor_x(cursor_col, h_scroll, area.width) + 1,
            area.y + cursor_row as u16 + 1,
        ));
    }
}

/// Cursor x offset inside the input block, clamped so a degenerate terminal
/// width never places the cursor past the right border.
fn clamped_cursor_x(cursor_col: usize, h_scroll: usize, area_width: u16) -> u16 {
    let col = cursor_col.saturating_sub(h_scroll).min(u16::MAX as usize) as u16;
    col.min(area_width.saturating_sub(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_stays_inside_input_block() {
        // Normal case: cursor sits at its column
        assert_eq!(clamped_cursor_x(3, 0, 80), 3);
        // Horizontal scroll shifts it back into view
        assert_eq!(clamped_cursor_x(25, 6, 80), 19);
        // Degenerate widths clamp instead of walking past the border
        assert_eq!(clamped_cursor_x(10, 0, 5), 3);
        assert_eq!(clamped_cursor_x(10, 0, 0), 0);
        assert_eq!(clamped_cursor_x(10, 0, 1), 0);
    }
}
