//! Turns message content into styled ratatui text.
//!
//! User input goes through [`render_plain`] and is never interpreted.
//! Assistant answers go through [`MarkdownRenderer::render`], which parses
//! CommonMark with pulldown-cmark and highlights code blocks with syntect.

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, Options, Parser, Tag, TagEnd};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
};
use syntect::{
    easy::HighlightLines,
    highlighting::{Theme, ThemeSet},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

const CODE_THEME: &str = "base16-ocean.dark";
const RULE_WIDTH: usize = 40;

/// Literal rendering: every character shows up exactly as typed.
pub fn render_plain(content: &str) -> Text<'static> {
    Text::from(
        content
            .split('\n')
            .map(|line| Line::raw(line.to_string()))
            .collect::<Vec<_>>(),
    )
}

pub struct MarkdownRenderer {
    syntaxes: SyntaxSet,
    theme: Theme,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MarkdownRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownRenderer")
            .field("syntaxes", &self.syntaxes.syntaxes().len())
            .field("theme", &self.theme.name)
            .finish()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut themes = ThemeSet::load_defaults();
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
            theme: themes.themes.remove(CODE_THEME).unwrap_or_default(),
        }
    }

    pub fn render(&self, markdown: &str) -> Text<'static> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);

        let mut writer = Writer::new(self);
        for event in Parser::new_ext(markdown, options) {
            writer.event(event);
        }
        writer.finish()
    }

    /// Declared language first, then the first line (shebangs, modelines),
    /// then a keyword sniff, then plain text.
    pub fn detect_syntax(&self, declared: &str, code: &str) -> &SyntaxReference {
        let token = declared
            .split(|c: char| c.is_whitespace() || c == ',' || c == '{')
            .next()
            .unwrap_or("");
        if !token.is_empty() {
            if let Some(syntax) = self.syntaxes.find_syntax_by_token(token) {
                return syntax;
            }
        }

        code.lines()
            .next()
            .and_then(|first| self.syntaxes.find_syntax_by_first_line(first))
            .or_else(|| guess_language(code).and_then(|t| self.syntaxes.find_syntax_by_token(t)))
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text())
    }

    fn highlight(&self, declared: &str, code: &str) -> Vec<Line<'static>> {
        let gutter = Span::styled("▎ ", Style::default().fg(Color::DarkGray));
        let syntax = self.detect_syntax(declared, code);
        let mut highlighter = HighlightLines::new(syntax, &self.theme);

        let mut lines = Vec::new();
        for raw in LinesWithEndings::from(code) {
            let mut spans = vec![gutter.clone()];
            match highlighter.highlight_line(raw, &self.syntaxes) {
                Ok(ranges) => {
                    for (style, piece) in ranges {
                        let piece = piece.trim_end_matches(['\n', '\r']);
                        if piece.is_empty() {
                            continue;
                        }
                        let fg = style.foreground;
                        spans.push(Span::styled(
                            piece.replace('\t', "    "),
                            Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b)),
                        ));
                    }
                }
                Err(_) => spans.push(Span::raw(raw.trim_end_matches(['\n', '\r']).to_string())),
            }
            lines.push(Line::from(spans));
        }
        lines
    }
}

/// Keyword sniffing for unlabeled code blocks.
fn guess_language(code: &str) -> Option<&'static str> {
    let trimmed = code.trim_start();
    let has = |needle: &str| code.contains(needle);

    if trimmed.starts_with("<?php") {
        Some("php")
    } else if trimmed.starts_with("<!DOCTYPE") || trimmed.starts_with("<html") {
        Some("html")
    } else if (trimmed.starts_with('{') || trimmed.starts_with('[')) && has("\":") {
        Some("json")
    } else if has("fn ") && (has("let ") || has("->") || has("impl ")) {
        Some("rs")
    } else if has("package main") || (has("func ") && has(":=")) {
        Some("go")
    } else if has("#include") {
        Some("cpp")
    } else if (has("def ") && has(":")) || (has("import ") && !has(";")) {
        Some("py")
    } else if has("function ") || has("const ") || has("=> ") || has("console.log") {
        Some("js")
    } else if has("public class ") || has("public static void") {
        Some("java")
    } else if trimmed.to_ascii_uppercase().starts_with("SELECT ")
        || trimmed.to_ascii_uppercase().starts_with("CREATE TABLE")
    {
        Some("sql")
    } else if trimmed.starts_with("$ ") || has("#!/bin/") {
        Some("sh")
    } else {
        None
    }
}

fn heading_style(level: HeadingLevel) -> Style {
    let color = match level {
        HeadingLevel::H1 => Color::Cyan,
        HeadingLevel::H2 => Color::LightBlue,
        HeadingLevel::H3 => Color::Magenta,
        _ => Color::White,
    };
    Style::default().fg(color).add_modifier(Modifier::BOLD)
}

/// Event sink that builds lines while walking the pulldown-cmark stream.
struct Writer<'r> {
    renderer: &'r MarkdownRenderer,
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
    styles: Vec<Style>,
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    code: Option<(String, String)>,
    links: Vec<String>,
}

impl<'r> Writer<'r> {
    fn new(renderer: &'r MarkdownRenderer) -> Self {
        Self {
            renderer,
            lines: Vec::new(),
            current: Vec::new(),
            styles: Vec::new(),
            lists: Vec::new(),
            quote_depth: 0,
            code: None,
            links: Vec::new(),
        }
    }

    fn style(&self) -> Style {
        self.styles
            .iter()
            .fold(Style::default(), |acc, s| acc.patch(*s))
    }

    fn push_text(&mut self, text: &str) {
        let style = self.style();
        let mut pieces = text.split('\n').peekable();
        while let Some(piece) = pieces.next() {
            if !piece.is_empty() {
                self.current.push(Span::styled(piece.to_string(), style));
            }
            if pieces.peek().is_some() {
                self.flush();
            }
        }
    }

    fn flush(&mut self) {
        let mut spans = Vec::with_capacity(self.current.len() + 1);
        if self.quote_depth > 0 {
            spans.push(Span::styled(
                "▏ ".repeat(self.quote_depth),
                Style::default().fg(Color::DarkGray),
            ));
        }
        spans.append(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    fn flush_if_started(&mut self) {
        if !self.current.is_empty() {
            self.flush();
        }
    }

    fn blank(&mut self) {
        if self.lines.last().is_some_and(|l| l.width() > 0) {
            self.lines.push(Line::default());
        }
    }

    fn event(&mut self, event: Event<'_>) {
        if let Some((_, buffer)) = self.code.as_mut() {
            match &event {
                Event::Text(text) => {
                    buffer.push_str(text);
                    return;
                }
                Event::End(TagEnd::CodeBlock) => {}
                _ => return,
            }
        }

        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.current.push(Span::styled(
                code.to_string(),
                Style::default().fg(Color::LightYellow).bg(Color::Rgb(40, 44, 52)),
            )),
            // Raw HTML is shown as written, never interpreted.
            Event::Html(html) => {
                self.push_text(html.trim_end_matches('\n'));
                self.flush();
            }
            Event::InlineHtml(html) => self.push_text(&html),
            Event::SoftBreak | Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush_if_started();
                self.lines.push(Line::styled(
                    "─".repeat(RULE_WIDTH),
                    Style::default().fg(Color::DarkGray),
                ));
                self.blank();
            }
            Event::TaskListMarker(done) => {
                self.current
                    .push(Span::raw(if done { "[x] " } else { "[ ] " }));
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { level, .. } => {
                self.flush_if_started();
                self.styles.push(heading_style(level));
            }
            Tag::BlockQuote(_) => {
                self.flush_if_started();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.flush_if_started();
                let lang = match kind {
                    CodeBlockKind::Fenced(lang) => lang.to_string(),
                    CodeBlockKind::Indented => String::new(),
                };
                self.code = Some((lang, String::new()));
            }
            Tag::List(start) => {
                self.flush_if_started();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush_if_started();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(n)) => {
                        let marker = format!("{}{}. ", indent, n);
                        *n += 1;
                        marker
                    }
                    _ => format!("{}• ", indent),
                };
                self.current
                    .push(Span::styled(marker, Style::default().fg(Color::Yellow)));
            }
            Tag::Emphasis => self.styles.push(Style::default().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.styles.push(Style::default().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self
                .styles
                .push(Style::default().add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { dest_url, .. } => {
                self.styles.push(
                    Style::default()
                        .fg(Color::LightBlue)
                        .add_modifier(Modifier::UNDERLINED),
                );
                self.links.push(dest_url.to_string());
            }
            Tag::Image { dest_url, .. } => {
                self.current.push(Span::styled(
                    "[image: ",
                    Style::default().fg(Color::DarkGray),
                ));
                self.links.push(dest_url.to_string());
            }
            Tag::TableHead | Tag::TableRow => self.flush_if_started(),
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_if_started();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Heading(_) => {
                self.styles.pop();
                self.flush_if_started();
                self.blank();
            }
            TagEnd::BlockQuote(_) => {
                self.flush_if_started();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank();
            }
            TagEnd::CodeBlock => {
                if let Some((lang, code)) = self.code.take() {
                    let highlighted = self.renderer.highlight(&lang, &code);
                    self.lines.extend(highlighted);
                }
                self.blank();
            }
            TagEnd::List(_) => {
                self.flush_if_started();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank();
                }
            }
            TagEnd::Item => self.flush_if_started(),
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => {
                self.styles.pop();
            }
            TagEnd::Link => {
                self.styles.pop();
                if let Some(url) = self.links.pop() {
                    self.current.push(Span::styled(
                        format!(" <{}>", url),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }
            TagEnd::Image => {
                if let Some(url) = self.links.pop() {
                    self.current.push(Span::styled(
                        format!("] <{}>", url),
                        Style::default().fg(Color::DarkGray),
                    ));
                }
            }
            TagEnd::TableCell => self
                .current
                .push(Span::styled(" │ ", Style::default().fg(Color::DarkGray))),
            TagEnd::TableHead => {
                self.flush_if_started();
                self.lines.push(Line::styled(
                    "─".repeat(RULE_WIDTH),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            TagEnd::TableRow => self.flush_if_started(),
            TagEnd::Table | TagEnd::HtmlBlock => self.blank(),
            _ => {}
        }
    }

    fn finish(mut self) -> Text<'static> {
        self.flush_if_started();
        while self.lines.last().is_some_and(|l| l.width() == 0) {
            self.lines.pop();
        }
        Text::from(self.lines)
    }
}
