use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use crate::app::{App, InputMode};
use crate::session::ChatRole;

const TITLE: &str = " Software Consulting RAG Agent ";

/// The input box grows with its content up to this many text rows.
const MAX_INPUT_ROWS: u16 = 6;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let input_rows = (app.input.line_count() as u16).clamp(1, MAX_INPUT_ROWS);

    // Main layout: header, chat, input, footer
    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(input_rows + 2),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(TITLE, Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw("  "),
        Span::styled(
            format!("[{}]", app.models.selected().name),
            Style::default().fg(Color::Yellow),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn user_label() -> Line<'static> {
    Line::from(Span::styled(
        "You:",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    ))
}

fn assistant_label() -> Line<'static> {
    Line::from(Span::styled(
        "AI:",
        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
    ))
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    // Store area for mouse hit-testing and inner size for scroll calculations
    app.chat_area = Some(area);
    app.chat_height = area.height.saturating_sub(2);
    let inner_width = area.width.saturating_sub(2);

    let roles: Vec<ChatRole> = app.session.messages().iter().map(|m| m.role).collect();
    let mut lines: Vec<Line<'static>> = Vec::new();

    for (role, text) in roles.iter().zip(app.rendered_messages()) {
        lines.push(match role {
            ChatRole::User => user_label(),
            ChatRole::Assistant => assistant_label(),
        });
        lines.extend(text.lines.iter().cloned());
        lines.push(Line::default());
    }

    if let Some(error) = app.session.error() {
        lines.push(Line::from(vec![
            Span::styled("Error: ", Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
            Span::styled(error.to_string(), Style::default().fg(Color::Red)),
        ]));
        lines.push(Line::default());
    }

    if app.session.is_pending() {
        lines.push(assistant_label());
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("Thinking{}", dots),
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        )));
    }

    let body = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });

    // Rows after word wrapping; the scroll offset itself is capped at u16.
    let total = body.line_count(inner_width);
    app.chat_max_scroll = total
        .saturating_sub(app.chat_height as usize)
        .min(u16::MAX as usize) as u16;
    if app.follow_tail {
        app.chat_scroll = app.chat_max_scroll;
    } else {
        app.chat_scroll = app.chat_scroll.min(app.chat_max_scroll);
    }

    let border_color = if app.input_mode == InputMode::Normal {
        Color::Cyan
    } else {
        Color::DarkGray
    };
    let chat_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(" Chat ");

    let chat = body.block(chat_block).scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let pending = app.session.is_pending();
    let border_color = if app.input_mode == InputMode::Editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if pending { " Sending... " } else { " Ask " };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    // Scroll so the cursor stays inside the box in both directions
    let inner_width = area.width.saturating_sub(2) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;
    let (line, _) = app.input.cursor_line_col();
    let col = app.input.cursor_display_col();

    let col_offset = if inner_width == 0 || col < inner_width {
        0
    } else {
        col - inner_width + 1
    };
    let row_offset = if inner_height == 0 || line < inner_height {
        0
    } else {
        line - inner_height + 1
    };

    let text_style = if pending {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default().fg(Color::Cyan)
    };
    let content = if app.input.text().is_empty() {
        Text::from(Span::styled(
            "Ask about your software project...",
            Style::default().fg(Color::DarkGray),
        ))
    } else {
        Text::styled(app.input.text(), text_style)
    };
    let input = Paragraph::new(content)
        .block(input_block)
        .scroll((row_offset as u16, col_offset as u16));

    frame.render_widget(input, area);

    // Show cursor when editing
    if app.input_mode == InputMode::Editing && !app.show_model_picker {
        frame.set_cursor_position((
            area.x + (col - col_offset) as u16 + 1,
            area.y + (line - row_offset) as u16 + 1,
        ));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };

    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let hints = if app.show_model_picker {
        vec![
            Span::styled(" j/k ", key_style),
            Span::styled(" nav ", label_style),
            Span::styled(" Enter ", key_style),
            Span::styled(" select ", label_style),
            Span::styled(" Esc ", key_style),
            Span::styled(" cancel ", label_style),
        ]
    } else {
        match app.input_mode {
            InputMode::Normal => vec![
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" g/G ", key_style),
                Span::styled(" top/bottom ", label_style),
                Span::styled(" M ", key_style),
                Span::styled(" model ", label_style),
                Span::styled(" Tab ", key_style),
                Span::styled(" next model ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ],
            InputMode::Editing => vec![
                Span::styled(" Enter ", key_style),
                Span::styled(" send ", label_style),
                Span::styled(" Shift+Enter ", key_style),
                Span::styled(" newline ", label_style),
                Span::styled(" PgUp/PgDn ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" stop typing ", label_style),
            ],
        }
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

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let models = app.models.all();

    // Calculate popup size and position (centered)
    let popup_width = 50.min(area.width.saturating_sub(4));
    let popup_height = (models.len() as u16 + 2).min(area.height.saturating_sub(4));

    let popup_x = (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = (area.height.saturating_sub(popup_height)) / 2;

    let popup_area = Rect::new(popup_x, popup_y, popup_width, popup_height);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Select Model ");

    let current = app.models.selected_index();
    let items: Vec<ListItem> = models
        .iter()
        .enumerate()
        .map(|(i, model)| {
            let style = if i == current {
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };
            ListItem::new(format!(" {} ({}) ", model.name, model.id)).style(style)
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

    frame.render_stateful_widget(list, popup_area, &mut app.model_picker_state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{QueryError, FALLBACK_ERROR};
    use crate::test_support::app_for;
    use ratatui::{
        backend::{Backend, TestBackend},
        layout::Position,
        Terminal,
    };

    fn draw_terminal(app: &mut App, width: u16, height: u16) -> Terminal<TestBackend> {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        terminal
    }

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let terminal = draw_terminal(app, width, height);
        let buffer = terminal.backend().buffer();
        buffer
            .content
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn thinking_indicator_tracks_pending() {
        let mut app = app_for("http://127.0.0.1:1");
        let screen = draw(&mut app, 80, 24);
        assert!(screen.contains("Software Consulting RAG Agent"));
        assert!(screen.contains("Welcome!"));
        assert!(!screen.contains("Thinking"));
        assert!(screen.contains(" Ask "));

        app.session.begin("what now?", None).unwrap();
        let screen = draw(&mut app, 80, 24);
        assert!(screen.contains("what now?"));
        assert!(screen.contains("Thinking."));
        assert!(screen.contains("Sending..."));

        app.tick_animation();
        assert!(draw(&mut app, 80, 24).contains("Thinking.."));

        app.session.finish(Ok("Use **milestones**.".into()));
        let screen = draw(&mut app, 80, 24);
        assert!(!screen.contains("Thinking"));
        assert!(screen.contains("Use milestones."));
        assert!(!screen.contains("Sending..."));
    }

    #[test]
    fn user_markup_is_shown_literally() {
        let mut app = app_for("http://127.0.0.1:1");
        app.session.begin("**bold** and <i>tags</i>", None).unwrap();
        let screen = draw(&mut app, 80, 24);
        assert!(screen.contains("**bold** and <i>tags</i>"));
    }

    #[test]
    fn error_banner_replaces_thinking() {
        let mut app = app_for("http://127.0.0.1:1");
        app.session.begin("q", None).unwrap();
        app.session.finish(Err(QueryError::TaskFailed("boom".into())));
        let screen = draw(&mut app, 100, 24);
        assert!(screen.contains(&format!("Error: {}", FALLBACK_ERROR)));
        assert!(!screen.contains("Thinking"));
    }

    #[test]
    fn header_and_picker_show_models() {
        let mut app = app_for("http://127.0.0.1:1");
        app.models.select_id("sonar-pro");
        assert!(draw(&mut app, 80, 24).contains("[Sonar Pro]"));

        app.open_model_picker();
        let screen = draw(&mut app, 80, 24);
        assert!(screen.contains("Select Model"));
        assert!(screen.contains("R1 (r1-1776)"));
    }

    #[test]
    fn follow_tail_pins_view_to_latest_message() {
        let mut app = app_for("http://127.0.0.1:1");
        for i in 0..10 {
            app.session.begin(&format!("question {}", i), None).unwrap();
            app.session.finish(Ok(format!("answer {}", i)));
        }
        let screen = draw(&mut app, 60, 16);
        assert!(app.chat_max_scroll > 0);
        assert_eq!(app.chat_scroll, app.chat_max_scroll);
        assert!(screen.contains("answer 9"));
        assert!(!screen.contains("Welcome!"));

        app.scroll_to_top();
        assert!(draw(&mut app, 60, 16).contains("Welcome!"));
    }

    #[test]
    fn word_wrapped_answer_ends_on_screen() {
        let mut app = app_for("http://127.0.0.1:1");
        let mut answer = vec!["aaaaaa bbbbbb cccccc"; 12].join("\n\n");
        answer.push_str("\n\nTHE-END");
        app.session.begin("q", None).unwrap();
        app.session.finish(Ok(answer));

        let screen = draw(&mut app, 12, 16);
        assert_eq!(app.chat_scroll, app.chat_max_scroll);
        assert!(screen.contains("THE-END"), "newest line scrolled out:\n{}", screen);

        // The pending indicator must also land inside the view.
        app.session.begin("again", None).unwrap();
        let screen = draw(&mut app, 12, 16);
        assert!(screen.contains("Thinking"), "indicator scrolled out:\n{}", screen);
    }

    #[test]
    fn huge_answer_clamps_scroll_instead_of_overflowing() {
        let mut app = app_for("http://127.0.0.1:1");
        app.session.begin("q", None).unwrap();
        app.session.finish(Ok("x\n\n".repeat(40_000)));

        draw(&mut app, 40, 10);
        assert_eq!(app.chat_max_scroll, u16::MAX);
        assert_eq!(app.chat_scroll, u16::MAX);
    }

    #[test]
    fn cursor_sits_after_wide_characters() {
        let mut app = app_for("http://127.0.0.1:1");
        app.input.insert_str("你好");

        let mut terminal = draw_terminal(&mut app, 40, 10);
        // Input box spans rows 6..9; text starts one cell inside the border.
        assert_eq!(
            terminal.backend_mut().get_cursor_position().unwrap(),
            Position::new(5, 7)
        );
    }
}
