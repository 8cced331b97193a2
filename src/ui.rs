use crate::app::{App, AuthField, ChatRole, FormMode, Screen};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

/// Convert `**bold**` markdown in a reply line to styled spans. Anything
/// unclosed is rendered literally.
fn parse_markdown_line(text: &str) -> Line<'static> {
    let mut spans: Vec<Span<'static>> = Vec::new();
    let mut plain = String::new();
    let mut rest = text;

    while let Some(start) = rest.find("**") {
        let after = &rest[start + 2..];
        if let Some(end) = after.find("**") {
            plain.push_str(&rest[..start]);
            if !plain.is_empty() {
                spans.push(Span::raw(std::mem::take(&mut plain)));
            }
            if end > 0 {
                spans.push(Span::styled(
                    after[..end].to_string(),
                    Style::default().add_modifier(Modifier::BOLD),
                ));
            }
            rest = &after[end + 2..];
        } else {
            break;
        }
    }
    plain.push_str(rest);
    if !plain.is_empty() {
        spans.push(Span::raw(plain));
    }

    if spans.is_empty() {
        Line::default()
    } else {
        Line::from(spans)
    }
}

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
        Screen::Auth => render_auth_screen(app, frame, body_area),
        Screen::Chat => render_chat_screen(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let account = app
        .session
        .as_ref()
        .and_then(|s| s.user.as_ref())
        .and_then(|u| u.email.clone())
        .map(|email| format!(" [{}]", email))
        .unwrap_or_default();

    let title = Line::from(vec![
        Span::styled(" charla ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(account, Style::default().fg(Color::DarkGray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = match app.screen {
        Screen::Auth => {
            let toggle_label = match app.form_mode {
                FormMode::SignIn => " sign up ",
                FormMode::SignUp => " sign in ",
            };
            vec![
                Span::styled(" Tab ", key_style),
                Span::styled(" field ", label_style),
                Span::styled(" Enter ", key_style),
                Span::styled(" submit ", label_style),
                Span::styled(" ^T ", key_style),
                Span::styled(toggle_label, label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" quit ", label_style),
            ]
        }
        Screen::Chat => vec![
            Span::styled(" Enter ", key_style),
            Span::styled(" send ", label_style),
            Span::styled(" Up/Dn ", key_style),
            Span::styled(" scroll ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" clear ", label_style),
            Span::styled(" ^C ", key_style),
            Span::styled(" quit ", label_style),
        ],
    };

    let footer = Paragraph::new(Line::from(hints));
    frame.render_widget(footer, area);
}

fn render_auth_screen(app: &App, frame: &mut Frame, area: Rect) {
    let title = match app.form_mode {
        FormMode::SignIn => " Sign In ",
        FormMode::SignUp => " Sign Up ",
    };

    // Centered form box
    let form_width = 48.min(area.width.saturating_sub(4));
    let form_height: u16 = match app.form_mode {
        FormMode::SignIn => 9,
        FormMode::SignUp => 11,
    };
    let form_x = area.x + (area.width.saturating_sub(form_width)) / 2;
    let form_y = area.y + (area.height.saturating_sub(form_height)) / 2;
    let form_area = Rect::new(form_x, form_y, form_width, form_height);

    frame.render_widget(Clear, form_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(title);
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let mut y = inner.y + 1;
    if app.form_mode == FormMode::SignUp {
        render_field(app, frame, inner, &mut y, "Name", AuthField::Name, false);
    }
    render_field(app, frame, inner, &mut y, "Email", AuthField::Email, false);
    render_field(
        app,
        frame,
        inner,
        &mut y,
        "Password",
        AuthField::Password,
        true,
    );

    // Status line: submit indicator or inline error
    let status = if app.is_submitting() {
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        let verb = match app.form_mode {
            FormMode::SignIn => "Signing in",
            FormMode::SignUp => "Signing up",
        };
        Span::styled(
            format!("{}{}", verb, dots),
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        )
    } else if let Some(error) = &app.auth_error {
        Span::styled(error.clone(), Style::default().fg(Color::Red))
    } else {
        Span::raw("")
    };

    let status_area = Rect::new(inner.x, y + 1, inner.width, 1);
    frame.render_widget(Paragraph::new(Line::from(status)), status_area);
}

fn render_field(
    app: &App,
    frame: &mut Frame,
    inner: Rect,
    y: &mut u16,
    label: &str,
    field: AuthField,
    masked: bool,
) {
    let focused = app.auth_field == field;
    let value = match field {
        AuthField::Name => &app.name_input,
        AuthField::Email => &app.email_input,
        AuthField::Password => &app.password_input,
    };

    let display: String = if masked {
        "*".repeat(value.chars().count())
    } else {
        value.clone()
    };

    let label_style = if focused {
        Style::default().fg(Color::Yellow).bold()
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let line = Line::from(vec![
        Span::styled(format!("{:>9}: ", label), label_style),
        Span::styled(display.clone(), Style::default().fg(Color::Cyan)),
    ]);

    let field_area = Rect::new(inner.x, *y, inner.width, 1);
    frame.render_widget(Paragraph::new(line), field_area);

    if focused && !app.is_submitting() {
        let cursor_x = inner.x + 11 + display.chars().count() as u16;
        frame.set_cursor_position((cursor_x.min(inner.x + inner.width), *y));
    }

    *y += 2;
}

fn render_chat_screen(app: &mut App, frame: &mut Frame, area: Rect) {
    let notice_height = if app.welcome_notice.is_some() { 1 } else { 0 };
    let [notice_area, transcript_area, input_area] = Layout::vertical([
        Constraint::Length(notice_height),
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    if let Some(notice) = &app.welcome_notice {
        let toast = Paragraph::new(Line::from(Span::styled(
            format!(" {} ", notice),
            Style::default().fg(Color::Black).bg(Color::Green).bold(),
        )));
        frame.render_widget(toast, notice_area);
    }

    // Store transcript dimensions for scroll calculations (inner, minus borders)
    app.chat_height = transcript_area.height.saturating_sub(2);
    app.chat_width = transcript_area.width.saturating_sub(2);

    let transcript_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Gemini: {} ", app.model));

    let transcript_text = if app.chat_messages.is_empty() && !app.chat_loading {
        Text::from(Span::styled(
            "Type your message...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.chat_messages {
            match msg.role {
                ChatRole::User => {
                    lines.push(Line::from(Span::styled(
                        "You:",
                        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                    )));
                    lines.push(Line::from(msg.content.as_str()));
                    lines.push(Line::default());
                }
                ChatRole::Assistant => {
                    lines.push(Line::from(Span::styled(
                        "AI:",
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    )));
                    for line in msg.content.lines() {
                        lines.push(parse_markdown_line(line));
                    }
                    lines.push(Line::default());
                }
            }
        }

        if app.chat_loading {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let transcript = Paragraph::new(transcript_text)
        .block(transcript_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(transcript, transcript_area);

    // Input line; dimmed while a generation call is outstanding
    let input_border_color = if app.chat_loading {
        Color::DarkGray
    } else {
        Color::Yellow
    };
    let input_title = if app.chat_loading {
        " Waiting for reply... "
    } else {
        " Message "
    };

    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(input_border_color))
        .title(input_title);

    // Horizontal scroll keeps the cursor visible in a single-line input
    let inner_width = input_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.chat_cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .chat_input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(input_block);

    frame.render_widget(input, input_area);

    if !app.chat_loading {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((input_area.x + cursor_x + 1, input_area.y + 1));
    }
}
