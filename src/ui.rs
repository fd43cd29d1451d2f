use std::io::{self, Stdout};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossbeam_channel::{unbounded, Receiver, Sender};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Clear, Gauge, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::UnicodeWidthStr;

use crate::controller::{CheckOutcome, FormController, Phase, PreviewOutcome, ReportOutcome};
use crate::preview::Preview;
use crate::progress::{StageState, STAGES};
use crate::report::{ModalPhase, ReportReason};
use crate::results::{PostCard, ResultsView, NO_DUPLICATES_MESSAGE};

const COLOR_BG: Color = Color::Rgb(30, 30, 46);
const COLOR_PANEL_BG: Color = Color::Rgb(24, 24, 36);
const COLOR_PANEL_FOCUSED_BG: Color = Color::Rgb(49, 50, 68);
const COLOR_PANEL_SELECTED_BG: Color = Color::Rgb(69, 71, 90);
const COLOR_BORDER_IDLE: Color = Color::Rgb(49, 50, 68);
const COLOR_BORDER_FOCUSED: Color = Color::Rgb(137, 180, 250);
const COLOR_TEXT_PRIMARY: Color = Color::Rgb(205, 214, 244);
const COLOR_TEXT_SECONDARY: Color = Color::Rgb(166, 173, 200);
const COLOR_TEXT_DISABLED: Color = Color::Rgb(108, 112, 134);
const COLOR_ACCENT: Color = Color::Rgb(137, 180, 250);
const COLOR_SUCCESS: Color = Color::Rgb(166, 227, 161);
const COLOR_ERROR: Color = Color::Rgb(243, 139, 168);
const COLOR_ORIGINAL: Color = Color::Rgb(249, 226, 175);

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

pub struct Options {
    pub controller: FormController,
    pub status_message: String,
    pub config_path: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Subreddit,
    Tags,
    File,
    Url,
    Results,
}

impl Field {
    const ORDER: [Field; 5] = [
        Field::Subreddit,
        Field::Tags,
        Field::File,
        Field::Url,
        Field::Results,
    ];

    fn next(self) -> Self {
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(index + 1) % Self::ORDER.len()]
    }

    fn previous(self) -> Self {
        let index = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(index + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

enum AsyncResponse {
    Check(CheckOutcome),
    Preview(PreviewOutcome),
    Report(ReportOutcome),
}

struct Spinner {
    index: usize,
    last_tick: Instant,
}

impl Spinner {
    fn new() -> Self {
        Self {
            index: 0,
            last_tick: Instant::now(),
        }
    }

    fn frame(&self) -> &'static str {
        SPINNER_FRAMES[self.index % SPINNER_FRAMES.len()]
    }

    fn advance(&mut self) -> bool {
        let now = Instant::now();
        if now.duration_since(self.last_tick) >= Duration::from_millis(120) {
            self.index = (self.index + 1) % SPINNER_FRAMES.len();
            self.last_tick = now;
            true
        } else {
            false
        }
    }

    fn reset(&mut self) {
        self.index = 0;
        self.last_tick = Instant::now();
    }
}

pub struct Model {
    controller: FormController,
    status_message: String,
    config_path: String,
    focus: Field,
    subreddit_buffer: String,
    file_buffer: String,
    url_buffer: String,
    selected_tag: usize,
    selected_card: usize,
    reason_cursor: usize,
    editing_details: bool,
    help_visible: bool,
    spinner: Spinner,
    needs_redraw: bool,
    response_tx: Sender<AsyncResponse>,
    response_rx: Receiver<AsyncResponse>,
}

impl Model {
    pub fn new(options: Options) -> Self {
        let (response_tx, response_rx) = unbounded();
        Self {
            controller: options.controller,
            status_message: options.status_message,
            config_path: options.config_path,
            focus: Field::Subreddit,
            subreddit_buffer: String::new(),
            file_buffer: String::new(),
            url_buffer: String::new(),
            selected_tag: 0,
            selected_card: 0,
            reason_cursor: 0,
            editing_details: false,
            help_visible: false,
            spinner: Spinner::new(),
            needs_redraw: true,
            response_tx,
            response_rx,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode()?;
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        let mut last_tick = Instant::now();
        let tick_rate = Duration::from_millis(120);

        loop {
            if self.poll_async() {
                self.mark_dirty();
            }

            if self.needs_redraw {
                terminal.draw(|frame| self.draw(frame))?;
                self.needs_redraw = false;
            }

            let timeout = tick_rate
                .checked_sub(last_tick.elapsed())
                .unwrap_or_else(|| Duration::from_millis(16));

            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        match self.handle_key(key.code) {
                            Ok(true) => break,
                            Ok(false) => {}
                            Err(err) => {
                                self.status_message = format!("Error: {}", err);
                            }
                        }
                        self.mark_dirty();
                    }
                    Event::Resize(_, _) => self.mark_dirty(),
                    _ => {}
                }
            }

            if self.poll_async() {
                self.mark_dirty();
            }

            if last_tick.elapsed() >= tick_rate {
                last_tick = Instant::now();
                let mut ticked = self.controller.tick(last_tick);
                if self.controller.in_flight() {
                    ticked |= self.spinner.advance();
                } else {
                    self.spinner.reset();
                }
                if ticked {
                    self.mark_dirty();
                }
            }
        }

        Ok(())
    }

    fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    fn poll_async(&mut self) -> bool {
        let mut changed = false;
        while let Ok(message) = self.response_rx.try_recv() {
            self.handle_async_response(message);
            changed = true;
        }
        changed
    }

    fn handle_async_response(&mut self, message: AsyncResponse) {
        match message {
            AsyncResponse::Check(outcome) => {
                if !self.controller.finish_check(outcome) {
                    return;
                }
                self.selected_card = 0;
                self.status_message = match (self.controller.phase(), self.controller.results()) {
                    (Phase::Rendered, Some(ResultsView::NoDuplicates)) => {
                        NO_DUPLICATES_MESSAGE.to_string()
                    }
                    (Phase::Rendered, Some(ResultsView::Found { duplicates, .. })) => {
                        format!(
                            "Found the original post and {} duplicate(s).",
                            duplicates.len()
                        )
                    }
                    _ => "Duplicate check failed. See the message on the left.".to_string(),
                };
                if matches!(self.controller.phase(), Phase::Rendered) {
                    self.focus = Field::Results;
                }
            }
            AsyncResponse::Preview(outcome) => {
                self.controller.finish_preview(outcome);
            }
            AsyncResponse::Report(outcome) => {
                if self.controller.finish_report(outcome, Instant::now()) {
                    if let Some(modal) = self.controller.report() {
                        if matches!(modal.phase, ModalPhase::Succeeded { .. }) {
                            self.status_message = "Reported successfully.".to_string();
                        }
                    }
                }
            }
        }
    }

    fn spawn<F>(&self, job: F)
    where
        F: FnOnce() -> AsyncResponse + Send + 'static,
    {
        let tx = self.response_tx.clone();
        thread::spawn(move || {
            let _ = tx.send(job());
        });
    }

    fn handle_key(&mut self, code: KeyCode) -> Result<bool> {
        if self.controller.report().is_some() {
            self.handle_report_key(code);
            return Ok(false);
        }

        if self.help_visible {
            self.help_visible = false;
            return Ok(false);
        }

        match code {
            KeyCode::Esc => {
                if self.controller.banner().is_some() {
                    self.controller.dismiss_banner();
                } else {
                    return Ok(true);
                }
            }
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.previous(),
            KeyCode::F(1) => self.help_visible = true,
            KeyCode::F(2) => self.confirm(),
            KeyCode::F(4) => {
                self.controller.clear_preview();
                self.file_buffer.clear();
                self.url_buffer.clear();
            }
            KeyCode::F(5) => self.submit(),
            KeyCode::F(8) => self.reset(),
            _ => match self.focus {
                Field::Subreddit => self.handle_subreddit_key(code),
                Field::Tags => self.handle_tags_key(code),
                Field::File => self.handle_file_key(code),
                Field::Url => self.handle_url_key(code),
                Field::Results => self.handle_results_key(code),
            },
        }
        Ok(false)
    }

    fn handle_subreddit_key(&mut self, code: KeyCode) {
        if !self.controller.controls().subreddit_input {
            if matches!(code, KeyCode::Char(_) | KeyCode::Enter) {
                self.status_message =
                    "Subreddits are confirmed. Press F8 to reset the form.".to_string();
            }
            return;
        }
        match code {
            KeyCode::Char(ch) => self.subreddit_buffer.push(ch),
            KeyCode::Backspace => {
                self.subreddit_buffer.pop();
            }
            KeyCode::Enter => {
                let raw = self.subreddit_buffer.clone();
                let before = self.controller.selection().len();
                if self.controller.add_subreddit(&raw) {
                    self.subreddit_buffer.clear();
                    if self.controller.selection().len() > before {
                        self.status_message =
                            format!("Added r/{}. Press F2 to confirm.", raw.trim());
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_tags_key(&mut self, code: KeyCode) {
        let count = self.controller.selection().len();
        if count == 0 {
            return;
        }
        match code {
            KeyCode::Left | KeyCode::Char('h') => {
                self.selected_tag = self.selected_tag.saturating_sub(1);
            }
            KeyCode::Right | KeyCode::Char('l') => {
                self.selected_tag = (self.selected_tag + 1).min(count - 1);
            }
            KeyCode::Delete | KeyCode::Backspace | KeyCode::Char('x') => {
                let index = self.selected_tag.min(count - 1);
                let name = self.controller.selection().names()[index].clone();
                self.controller.remove_subreddit(&name);
                self.selected_tag = index.min(self.controller.selection().len().saturating_sub(1));
                self.status_message = if self.controller.selection().is_empty() {
                    format!("Removed r/{name}.")
                } else {
                    format!("Removed r/{name}. Press F2 to confirm again.")
                };
            }
            _ => {}
        }
    }

    fn handle_file_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(ch) => self.file_buffer.push(ch),
            KeyCode::Backspace => {
                self.file_buffer.pop();
            }
            KeyCode::Enter => {
                let path = expand_home(self.file_buffer.trim());
                if let Some(pending) = self.controller.select_file(path) {
                    self.url_buffer.clear();
                    self.status_message = "Loading preview…".to_string();
                    self.spawn(move || AsyncResponse::Preview(pending.run()));
                }
            }
            _ => {}
        }
    }

    fn handle_url_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char(ch) => self.url_buffer.push(ch),
            KeyCode::Backspace => {
                self.url_buffer.pop();
            }
            KeyCode::Enter => {
                self.submit();
                return;
            }
            _ => return,
        }
        let had_file = self.controller.input().file().is_some();
        self.controller.set_url(&self.url_buffer);
        if had_file && self.controller.input().file().is_none() {
            self.file_buffer.clear();
        }
    }

    fn handle_results_key(&mut self, code: KeyCode) {
        let cards: Vec<PostCard> = self
            .controller
            .results()
            .map(|view| view.cards().into_iter().cloned().collect())
            .unwrap_or_default();
        if cards.is_empty() {
            return;
        }
        match code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.selected_card = self.selected_card.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.selected_card = (self.selected_card + 1).min(cards.len() - 1);
            }
            KeyCode::Enter | KeyCode::Char('o') => {
                let card = &cards[self.selected_card.min(cards.len() - 1)];
                self.open_link(&card.link);
            }
            KeyCode::Char('r') => {
                let card = &cards[self.selected_card.min(cards.len() - 1)];
                if self.controller.open_report(&card.post_id) {
                    self.reason_cursor = 0;
                    self.editing_details = false;
                }
            }
            _ => {}
        }
    }

    fn handle_report_key(&mut self, code: KeyCode) {
        let Some(modal) = self.controller.report() else {
            return;
        };
        if matches!(modal.phase, ModalPhase::Succeeded { .. }) {
            if code == KeyCode::Esc {
                self.controller.close_report();
            }
            return;
        }
        if matches!(modal.phase, ModalPhase::Submitting { .. }) {
            return;
        }
        let details_visible = modal.details_visible();
        let submit_enabled = modal.submit_enabled();

        if self.editing_details {
            match code {
                KeyCode::Esc | KeyCode::Tab => self.editing_details = false,
                KeyCode::Enter => self.submit_report(),
                KeyCode::Backspace => {
                    if let Some(details) = self.controller.report_details_mut() {
                        details.pop();
                    }
                }
                KeyCode::Char(ch) => {
                    if let Some(details) = self.controller.report_details_mut() {
                        details.push(ch);
                    }
                }
                _ => {}
            }
            return;
        }

        match code {
            KeyCode::Esc => {
                self.controller.close_report();
                self.status_message = "Report cancelled.".to_string();
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.reason_cursor = self.reason_cursor.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.reason_cursor = (self.reason_cursor + 1).min(ReportReason::ALL.len() - 1);
            }
            KeyCode::Char(' ') => {
                self.controller
                    .select_report_reason(ReportReason::ALL[self.reason_cursor]);
            }
            KeyCode::Tab if details_visible => self.editing_details = true,
            KeyCode::Enter if submit_enabled => self.submit_report(),
            _ => {}
        }
    }

    fn submit_report(&mut self) {
        match self.controller.submit_report() {
            Some(pending) => {
                self.editing_details = false;
                self.spawn(move || AsyncResponse::Report(pending.run()));
            }
            None => {
                let needs_details = self
                    .controller
                    .report()
                    .map(|modal| {
                        modal.details_visible() && matches!(modal.phase, ModalPhase::Failed(_))
                    })
                    .unwrap_or(false);
                if needs_details {
                    self.editing_details = true;
                }
            }
        }
    }

    fn confirm(&mut self) {
        if self.controller.confirm_subreddits() {
            self.status_message = format!(
                "Confirmed {} subreddit(s). Add an image, then press F5.",
                self.controller.selection().len()
            );
            self.focus = Field::File;
        } else if self.controller.selection().is_empty() {
            self.status_message = "Add at least one subreddit first.".to_string();
        }
    }

    fn submit(&mut self) {
        match self.controller.submit(Instant::now()) {
            Ok(pending) => {
                self.status_message = "Checking for duplicates…".to_string();
                self.spawn(move || AsyncResponse::Check(pending.run()));
            }
            Err(err) => {
                self.status_message = err.to_string();
            }
        }
    }

    fn reset(&mut self) {
        self.controller.reset();
        self.subreddit_buffer.clear();
        self.file_buffer.clear();
        self.url_buffer.clear();
        self.selected_tag = 0;
        self.selected_card = 0;
        self.editing_details = false;
        self.focus = Field::Subreddit;
        self.status_message = "Form reset.".to_string();
    }

    fn open_link(&mut self, url: &str) {
        if url.is_empty() {
            self.status_message = "This post has no link.".to_string();
            return;
        }
        match webbrowser::open(url) {
            Ok(_) => {
                self.status_message = format!("Opened {url} in your browser.");
            }
            Err(err) => {
                self.status_message = format!("Failed to open link: {err} (URL: {url})");
            }
        }
    }

    fn draw(&mut self, frame: &mut Frame<'_>) {
        let full = frame.size();
        frame.render_widget(Block::default().style(Style::default().bg(COLOR_BG)), full);

        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(full);

        let status_text = if self.controller.in_flight() {
            format!("{} {}", self.spinner.frame(), self.status_message)
        } else {
            self.status_message.clone()
        };
        let status_line = Paragraph::new(status_text).style(
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .bg(COLOR_PANEL_FOCUSED_BG)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_widget(status_line, layout[0]);

        let main = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(layout[1]);
        self.draw_form(frame, main[0]);
        self.draw_results(frame, main[1]);

        let footer = Paragraph::new(self.footer_text())
            .style(
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .bg(COLOR_PANEL_BG)
                    .add_modifier(Modifier::ITALIC),
            )
            .alignment(Alignment::Center);
        frame.render_widget(footer, layout[2]);

        if self.controller.report().is_some() {
            self.draw_report(frame, layout[1]);
        }
        if self.help_visible {
            self.draw_help(frame, layout[1]);
        }
    }

    fn draw_form(&self, frame: &mut Frame<'_>, area: Rect) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(0),
            ])
            .split(area);
        let controls = self.controller.controls();

        self.draw_text_input(
            frame,
            rows[0],
            "Subreddit (Enter to add)",
            &self.subreddit_buffer,
            Field::Subreddit,
            controls.subreddit_input,
        );
        self.draw_tags(frame, rows[1]);
        let file_text = match self.controller.input().file() {
            Some(path) if self.file_buffer.is_empty() => path.display().to_string(),
            _ => self.file_buffer.clone(),
        };
        self.draw_text_input(
            frame,
            rows[2],
            "Image file (Enter to select)",
            &file_text,
            Field::File,
            true,
        );
        self.draw_text_input(
            frame,
            rows[3],
            "Image URL or Reddit post URL",
            &self.url_buffer,
            Field::Url,
            true,
        );
        self.draw_preview(frame, rows[4]);
        self.draw_activity(frame, rows[5]);
    }

    fn draw_text_input(
        &self,
        frame: &mut Frame<'_>,
        area: Rect,
        title: &str,
        value: &str,
        field: Field,
        enabled: bool,
    ) {
        let focused = self.focus == field && self.controller.report().is_none();
        let inner_width = area.width.saturating_sub(2) as usize;
        let shown = tail_to_width(value, inner_width.saturating_sub(1));
        let fg = if enabled {
            COLOR_TEXT_PRIMARY
        } else {
            COLOR_TEXT_DISABLED
        };
        let input = Paragraph::new(shown.clone())
            .style(Style::default().fg(fg).bg(COLOR_PANEL_BG))
            .block(panel_block(title, focused));
        frame.render_widget(input, area);
        if focused && enabled && !self.help_visible {
            let x = area.x + 1 + UnicodeWidthStr::width(shown.as_str()) as u16;
            frame.set_cursor(x.min(area.right().saturating_sub(2)), area.y + 1);
        }
    }

    fn draw_tags(&self, frame: &mut Frame<'_>, area: Rect) {
        let selection = self.controller.selection();
        let focused = self.focus == Field::Tags;
        let title = if selection.is_confirmed() {
            "Subreddits (confirmed)"
        } else if selection.is_empty() {
            "Subreddits"
        } else {
            "Subreddits (F2 to confirm)"
        };
        let mut spans: Vec<Span> = Vec::new();
        if selection.is_empty() {
            spans.push(Span::styled(
                "none yet",
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::ITALIC),
            ));
        }
        for (index, name) in selection.names().iter().enumerate() {
            let mut style = Style::default().fg(COLOR_ACCENT).bg(COLOR_PANEL_FOCUSED_BG);
            if focused && index == self.selected_tag {
                style = style.bg(COLOR_PANEL_SELECTED_BG).add_modifier(Modifier::BOLD);
            }
            spans.push(Span::styled(format!(" r/{name} × "), style));
            spans.push(Span::raw(" "));
        }
        let tags = Paragraph::new(Line::from(spans))
            .style(Style::default().bg(COLOR_PANEL_BG))
            .block(panel_block(title, focused));
        frame.render_widget(tags, area);
    }

    fn draw_preview(&self, frame: &mut Frame<'_>, area: Rect) {
        let (text, style) = match (self.controller.preview(), self.controller.input().file()) {
            (Some(Preview::File(file)), _) => {
                (file.summary(), Style::default().fg(COLOR_TEXT_PRIMARY))
            }
            (Some(Preview::Url { url, kind }), _) => {
                let label = match kind {
                    crate::source::UrlKind::RedditPost => "Reddit post",
                    crate::source::UrlKind::DirectImage => "Image link",
                };
                (
                    format!("{label}: {url}"),
                    Style::default().fg(COLOR_TEXT_PRIMARY),
                )
            }
            (None, Some(_)) => (
                "Loading preview…".to_string(),
                Style::default().fg(COLOR_TEXT_SECONDARY),
            ),
            (None, None) => (
                "No image selected".to_string(),
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::ITALIC),
            ),
        };
        let title = if self.controller.controls().clear_preview {
            "Preview (F4 to clear)"
        } else {
            "Preview"
        };
        let preview = Paragraph::new(text)
            .style(style.bg(COLOR_PANEL_BG))
            .block(panel_block(title, false));
        frame.render_widget(preview, area);
    }

    fn draw_activity(&self, frame: &mut Frame<'_>, area: Rect) {
        if let Some(progress) = self.controller.progress() {
            let rows = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(3), Constraint::Min(0)])
                .split(area);
            let gauge = Gauge::default()
                .block(panel_block(progress.headline(), true))
                .gauge_style(Style::default().fg(COLOR_ACCENT).bg(COLOR_PANEL_BG))
                .percent(progress.percent())
                .label(format!("{}%", progress.percent()));
            frame.render_widget(gauge, rows[0]);

            let lines: Vec<Line> = STAGES
                .iter()
                .enumerate()
                .map(|(index, stage)| {
                    let (marker, style) = match progress.stage_state(index) {
                        StageState::Completed => ("✓", Style::default().fg(COLOR_SUCCESS)),
                        StageState::Active => (
                            "▶",
                            Style::default()
                                .fg(COLOR_ACCENT)
                                .add_modifier(Modifier::BOLD),
                        ),
                        StageState::Pending => ("·", Style::default().fg(COLOR_TEXT_SECONDARY)),
                    };
                    Line::from(Span::styled(format!(" {marker} {stage}"), style))
                })
                .collect();
            frame.render_widget(
                Paragraph::new(lines).style(Style::default().bg(COLOR_PANEL_BG)),
                rows[1],
            );
            return;
        }

        if let Some(banner) = self.controller.banner() {
            let mut lines = vec![Line::from(Span::styled(
                banner.message.clone(),
                Style::default()
                    .fg(COLOR_ERROR)
                    .add_modifier(Modifier::BOLD),
            ))];
            if let Some(details) = &banner.details {
                lines.push(Line::from(Span::styled(
                    details.clone(),
                    Style::default().fg(COLOR_TEXT_SECONDARY),
                )));
            }
            lines.push(Line::default());
            lines.push(Line::from(Span::styled(
                "Esc to dismiss",
                Style::default()
                    .fg(COLOR_TEXT_SECONDARY)
                    .add_modifier(Modifier::ITALIC),
            )));
            let block = Block::default()
                .title(Span::styled("Error", Style::default().fg(COLOR_ERROR)))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(COLOR_ERROR))
                .style(Style::default().bg(COLOR_PANEL_BG));
            frame.render_widget(
                Paragraph::new(lines).block(block).wrap(Wrap { trim: true }),
                area,
            );
            return;
        }

        let hint = Paragraph::new(self.activity_hint())
            .style(Style::default().fg(COLOR_TEXT_SECONDARY).bg(COLOR_PANEL_BG))
            .wrap(Wrap { trim: true });
        frame.render_widget(hint, area);
    }

    fn activity_hint(&self) -> String {
        let controls = self.controller.controls();
        if controls.check {
            "Ready. Press F5 to check for duplicates.".to_string()
        } else if controls.confirm {
            "Press F2 to confirm the subreddits to search.".to_string()
        } else {
            "Add one or more subreddits to search.".to_string()
        }
    }

    fn draw_results(&self, frame: &mut Frame<'_>, area: Rect) {
        let focused = self.focus == Field::Results;
        let block = panel_block("Results", focused);

        let view = match self.controller.results() {
            Some(view) => view,
            None => {
                let text = if self.controller.in_flight() {
                    "Waiting for results…"
                } else {
                    "Results appear here after a check."
                };
                let placeholder = Paragraph::new(text)
                    .style(
                        Style::default()
                            .fg(COLOR_TEXT_SECONDARY)
                            .bg(COLOR_PANEL_BG)
                            .add_modifier(Modifier::ITALIC),
                    )
                    .block(block);
                frame.render_widget(placeholder, area);
                return;
            }
        };

        if let ResultsView::NoDuplicates = view {
            let text = Text::from(vec![
                Line::from(Span::styled(
                    "Original Post",
                    Style::default()
                        .fg(COLOR_TEXT_PRIMARY)
                        .add_modifier(Modifier::BOLD),
                )),
                Line::from(Span::styled(
                    NO_DUPLICATES_MESSAGE,
                    Style::default().fg(COLOR_SUCCESS),
                )),
            ]);
            frame.render_widget(
                Paragraph::new(text)
                    .style(Style::default().bg(COLOR_PANEL_BG))
                    .block(block),
                area,
            );
            return;
        }

        let width = area.width.saturating_sub(4) as usize;
        let items: Vec<ListItem> = view
            .cards()
            .into_iter()
            .map(|card| ListItem::new(card_lines(card, width, view.show_duplicates_section())))
            .collect();
        let list = List::new(items)
            .block(block)
            .style(Style::default().bg(COLOR_PANEL_BG))
            .highlight_style(Style::default().bg(COLOR_PANEL_SELECTED_BG));
        let mut state = ListState::default();
        if focused {
            state.select(Some(self.selected_card));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_report(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(modal) = self.controller.report() else {
            return;
        };
        let popup_area = centered_rect(60, 70, area);
        frame.render_widget(Clear, popup_area);

        let mut lines: Vec<Line> = Vec::new();
        if let ModalPhase::Succeeded { .. } = modal.phase {
            lines.push(Line::from(Span::styled(
                "✓ Reported Successfully",
                Style::default()
                    .fg(COLOR_SUCCESS)
                    .add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from("Thank you for your report."));
        } else {
            lines.push(Line::from("Please select a reason for reporting this content:"));
            lines.push(Line::default());
            for (index, reason) in ReportReason::ALL.iter().enumerate() {
                let cursor = if index == self.reason_cursor && !self.editing_details {
                    ">"
                } else {
                    " "
                };
                let radio = if modal.reason == Some(*reason) {
                    "(•)"
                } else {
                    "( )"
                };
                let style = if index == self.reason_cursor {
                    Style::default()
                        .fg(COLOR_TEXT_PRIMARY)
                        .add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(COLOR_TEXT_SECONDARY)
                };
                lines.push(Line::from(Span::styled(
                    format!("{cursor} {radio} {}", reason.label()),
                    style,
                )));
            }
            if modal.details_visible() {
                lines.push(Line::default());
                let label_style = if self.editing_details {
                    Style::default().fg(COLOR_ACCENT)
                } else {
                    Style::default().fg(COLOR_TEXT_SECONDARY)
                };
                lines.push(Line::from(Span::styled(
                    "Additional details (Tab to edit):",
                    label_style,
                )));
                let caret = if self.editing_details { "▏" } else { "" };
                lines.push(Line::from(Span::styled(
                    format!("  {}{caret}", modal.details),
                    Style::default().fg(COLOR_TEXT_PRIMARY),
                )));
            }
            lines.push(Line::default());
            let submit_style = if modal.submit_enabled() {
                Style::default()
                    .fg(COLOR_ACCENT)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(COLOR_TEXT_DISABLED)
            };
            lines.push(Line::from(Span::styled("[ Submit Report ]", submit_style)));
            match &modal.phase {
                ModalPhase::Submitting { .. } => lines.push(Line::from(Span::styled(
                    "Reporting…",
                    Style::default().fg(COLOR_ACCENT),
                ))),
                ModalPhase::Failed(message) => lines.push(Line::from(Span::styled(
                    message.clone(),
                    Style::default().fg(COLOR_ERROR),
                ))),
                _ => {}
            }
        }

        let popup = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(Span::styled(
                        "Report this content",
                        Style::default()
                            .fg(COLOR_ACCENT)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(COLOR_ACCENT))
                    .style(Style::default().bg(COLOR_PANEL_BG)),
            )
            .wrap(Wrap { trim: false });
        frame.render_widget(popup, popup_area);
    }

    fn draw_help(&self, frame: &mut Frame<'_>, area: Rect) {
        let popup_area = centered_rect(60, 60, area);
        frame.render_widget(Clear, popup_area);
        let text = format!(
            "Tab / Shift-Tab   move between fields\n\
             Enter             add subreddit · select file · submit URL\n\
             F2                confirm subreddits\n\
             F4                clear image\n\
             F5                check for duplicates\n\
             F8                reset the form\n\
             ←/→ x             pick and remove subreddit tags\n\
             j/k o r           browse results, open link, report\n\
             Esc               dismiss error · quit\n\n\
             Config: {}",
            self.config_path
        );
        let help = Paragraph::new(text)
            .style(Style::default().fg(COLOR_TEXT_PRIMARY))
            .block(
                Block::default()
                    .title(Span::styled(
                        "Keys",
                        Style::default()
                            .fg(COLOR_ACCENT)
                            .add_modifier(Modifier::BOLD),
                    ))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(COLOR_ACCENT))
                    .style(Style::default().bg(COLOR_PANEL_BG)),
            );
        frame.render_widget(help, popup_area);
    }

    fn footer_text(&self) -> String {
        if let Some(modal) = self.controller.report() {
            if self.editing_details {
                return "Type details · Enter submit · Tab/Esc back to reasons".to_string();
            }
            let mut parts = vec!["j/k choose", "Space select"];
            if modal.details_visible() {
                parts.push("Tab edit details");
            }
            if modal.submit_enabled() {
                parts.push("Enter submit");
            }
            parts.push("Esc cancel");
            return parts.join(" · ");
        }

        let mut parts: Vec<&str> = Vec::new();
        match self.focus {
            Field::Subreddit => parts.push("Enter add subreddit"),
            Field::Tags => parts.push("←/→ pick · x remove"),
            Field::File => parts.push("Enter select file"),
            Field::Url => parts.push("Enter check"),
            Field::Results => parts.push("j/k move · o open · r report"),
        }
        let controls = self.controller.controls();
        if controls.confirm {
            parts.push("F2 confirm");
        }
        if controls.check {
            parts.push("F5 check");
        }
        if controls.reset_visible {
            parts.push("F8 reset");
        }
        parts.push("F1 keys");
        parts.push("Esc quit");
        parts.join(" · ")
    }
}

fn panel_block(title: &str, focused: bool) -> Block<'static> {
    let border = if focused {
        COLOR_BORDER_FOCUSED
    } else {
        COLOR_BORDER_IDLE
    };
    Block::default()
        .title(Span::styled(
            title.to_string(),
            Style::default().fg(if focused {
                COLOR_ACCENT
            } else {
                COLOR_TEXT_SECONDARY
            }),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(COLOR_PANEL_BG))
}

fn card_lines(card: &PostCard, width: usize, has_duplicates: bool) -> Vec<Line<'static>> {
    let (badge, badge_style) = if card.original {
        (
            "ORIGINAL",
            Style::default()
                .fg(COLOR_ORIGINAL)
                .add_modifier(Modifier::BOLD),
        )
    } else {
        ("DUPLICATE", Style::default().fg(COLOR_TEXT_SECONDARY))
    };
    let mut lines = vec![Line::from(vec![
        Span::styled(format!("{badge} "), badge_style),
        Span::styled(
            truncate_to_width(&card.title, width.saturating_sub(badge.len() + 1)),
            Style::default()
                .fg(COLOR_TEXT_PRIMARY)
                .add_modifier(Modifier::BOLD),
        ),
    ])];
    let mut meta = format!("{} · {}", card.author_line, card.date_label);
    if let Some(subreddit) = &card.subreddit {
        meta.push_str(&format!(" · r/{subreddit}"));
    }
    lines.push(Line::from(Span::styled(
        truncate_to_width(&meta, width),
        Style::default().fg(COLOR_TEXT_SECONDARY),
    )));
    lines.push(Line::from(Span::styled(
        truncate_to_width(&card.link, width),
        Style::default().fg(COLOR_ACCENT),
    )));
    if card.original && has_duplicates {
        lines.push(Line::from(Span::styled(
            "Duplicates",
            Style::default()
                .fg(COLOR_TEXT_SECONDARY)
                .add_modifier(Modifier::UNDERLINED),
        )));
    } else {
        lines.push(Line::default());
    }
    lines
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let percent_x = percent_x.min(100);
    let percent_y = percent_y.min(100);
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage(100 - percent_x - (100 - percent_x) / 2),
        ])
        .split(area);
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage(100 - percent_y - (100 - percent_y) / 2),
        ])
        .split(horizontal[1]);
    vertical[1]
}

fn truncate_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    if width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Keeps the end of an input visible as it grows past the box.
fn tail_to_width(text: &str, width: usize) -> String {
    if UnicodeWidthStr::width(text) <= width {
        return text.to_string();
    }
    let mut kept: Vec<char> = Vec::new();
    let mut used = 0;
    for ch in text.chars().rev() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            break;
        }
        kept.push(ch);
        used += w;
    }
    kept.into_iter().rev().collect()
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Settings;
    use crate::data::{sample_results, MockDuplicateService, MockReportService};
    use std::sync::Arc;

    fn model() -> Model {
        let controller = FormController::new(
            Settings::default(),
            Arc::new(MockDuplicateService::with_results(sample_results())),
            Arc::new(MockReportService::default()),
        );
        Model::new(Options {
            controller,
            status_message: String::new(),
            config_path: "~/.config/repost-check/config.yaml".into(),
        })
    }

    fn type_text(model: &mut Model, text: &str) {
        for ch in text.chars() {
            model.handle_key(KeyCode::Char(ch)).unwrap();
        }
    }

    fn wait_for_async(model: &mut Model) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if model.poll_async() {
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        panic!("no async response arrived");
    }

    #[test]
    fn focus_cycles_both_ways() {
        assert_eq!(Field::Subreddit.next(), Field::Tags);
        assert_eq!(Field::Results.next(), Field::Subreddit);
        assert_eq!(Field::Subreddit.previous(), Field::Results);
    }

    #[test]
    fn typing_and_enter_adds_subreddit() {
        let mut model = model();
        type_text(&mut model, "pics");
        model.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(model.controller.selection().names(), &["pics".to_string()]);
        assert!(model.subreddit_buffer.is_empty());

        type_text(&mut model, "x");
        model.handle_key(KeyCode::Enter).unwrap();
        assert_eq!(model.subreddit_buffer, "x");
        assert!(model.controller.banner().is_some());
    }

    #[test]
    fn full_check_from_keys() {
        let mut model = model();
        type_text(&mut model, "pics");
        model.handle_key(KeyCode::Enter).unwrap();
        model.handle_key(KeyCode::F(2)).unwrap();
        assert_eq!(model.focus, Field::File);
        model.handle_key(KeyCode::Tab).unwrap();
        type_text(&mut model, "https://i.redd.it/sunset.jpg");
        assert!(model.controller.preview().is_some());
        model.handle_key(KeyCode::F(5)).unwrap();
        assert!(model.controller.in_flight());

        wait_for_async(&mut model);
        assert_eq!(model.controller.phase(), Phase::Rendered);
        assert_eq!(model.focus, Field::Results);
        let first = model.controller.results().unwrap().cards()[0].post_id.clone();
        assert_eq!(first, "t3_first");

        model.handle_key(KeyCode::Char('r')).unwrap();
        assert!(model.controller.report().is_some());
        model.handle_key(KeyCode::Char(' ')).unwrap();
        model.handle_key(KeyCode::Enter).unwrap();
        wait_for_async(&mut model);
        assert_eq!(model.status_message, "Reported successfully.");
    }

    #[test]
    fn report_submit_waits_for_a_reason() {
        let mut model = model();
        model.controller.add_subreddit("pics");
        model.controller.confirm_subreddits();
        model.controller.set_url("https://i.redd.it/sunset.jpg");
        let pending = model.controller.submit(Instant::now()).unwrap();
        model.controller.finish_check(pending.run());
        model.focus = Field::Results;

        model.handle_key(KeyCode::Char('r')).unwrap();
        assert!(!model.footer_text().contains("Enter submit"));
        model.handle_key(KeyCode::Enter).unwrap();
        let modal = model.controller.report().unwrap();
        assert_eq!(modal.phase, ModalPhase::Editing);
        assert_eq!(modal.reason, None);

        model.handle_key(KeyCode::Char(' ')).unwrap();
        assert!(model.footer_text().contains("Enter submit"));
    }

    #[test]
    fn esc_dismisses_banner_before_quitting() {
        let mut model = model();
        model.handle_key(KeyCode::F(5)).unwrap();
        assert!(model.controller.banner().is_some());
        assert!(!model.handle_key(KeyCode::Esc).unwrap());
        assert!(model.controller.banner().is_none());
        assert!(model.handle_key(KeyCode::Esc).unwrap());
    }

    #[test]
    fn truncation_respects_width() {
        assert_eq!(truncate_to_width("hello", 10), "hello");
        assert_eq!(truncate_to_width("hello world", 6), "hello…");
        assert_eq!(tail_to_width("/very/long/path.png", 8), "path.png");
    }

    #[test]
    fn centered_rect_stays_inside() {
        let area = Rect::new(0, 0, 100, 40);
        let popup = centered_rect(60, 50, area);
        assert!(popup.x >= area.x && popup.right() <= area.right());
        assert!(popup.y >= area.y && popup.bottom() <= area.bottom());
    }
}
