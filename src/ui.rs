use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::Receiver;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap};
use ratatui::{Frame, Terminal};
use unicode_width::UnicodeWidthStr;

use crate::compose::{ComposeError, Composer};
use crate::feed::{FeedView, PostRow};
use crate::linkify::Segment;
use crate::poller::{FeedEvent, Poller};
use crate::service::FeedService;

const AVATAR_PALETTE: [Color; 6] = [
    Color::Red,
    Color::Green,
    Color::Yellow,
    Color::Blue,
    Color::Magenta,
    Color::Cyan,
];

pub struct Options {
    pub status_message: String,
    pub feed_service: Arc<dyn FeedService>,
    pub composer: Composer,
    pub poller: Poller,
    pub events: Receiver<FeedEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    Compose,
    Search,
}

pub struct Model {
    feed: FeedView,
    composer: Composer,
    poller: Poller,
    events: Receiver<FeedEvent>,
    feed_service: Arc<dyn FeedService>,
    status: String,
    mode: InputMode,
    search_query: String,
    showing_search: bool,
    scroll: usize,
    should_quit: bool,
}

impl Model {
    pub fn new(options: Options) -> Self {
        Self {
            feed: FeedView::new(),
            composer: options.composer,
            poller: options.poller,
            events: options.events,
            feed_service: options.feed_service,
            status: options.status_message,
            mode: InputMode::Compose,
            search_query: String::new(),
            showing_search: false,
            scroll: 0,
            should_quit: false,
        }
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("create terminal")?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode().context("disable raw mode")?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen).context("leave alternate screen")?;
        terminal.show_cursor().context("restore cursor")?;
        result
    }

    fn event_loop<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        while !self.should_quit {
            self.drain_feed_events();
            terminal.draw(|frame| self.draw(frame))?;
            if event::poll(Duration::from_millis(200)).context("poll input")? {
                if let Event::Key(key) = event::read().context("read input")? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key);
                    }
                }
            }
        }
        Ok(())
    }

    fn drain_feed_events(&mut self) {
        while let Ok(feed_event) = self.events.try_recv() {
            match feed_event {
                FeedEvent::Posts(posts) => {
                    // search results own the table until the user leaves
                    if self.showing_search {
                        continue;
                    }
                    let rejected_before = self.feed.rejected();
                    let added = self.feed.ingest(&posts);
                    let rejected = self.feed.rejected() - rejected_before;
                    if rejected > 0 {
                        self.status =
                            format!("dropped {} post(s) with a bad hash id", rejected);
                    } else if added > 0 {
                        self.status = format!(
                            "{} new post{}",
                            added,
                            if added == 1 { "" } else { "s" }
                        );
                    }
                }
                FeedEvent::Error(err) => {
                    self.status = format!("fetch failed: {}", err);
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        match self.mode {
            InputMode::Compose => self.handle_compose_key(key),
            InputMode::Search => self.handle_search_key(key),
        }
    }

    fn handle_compose_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.should_quit = true,
            KeyCode::Enter => self.submit(),
            KeyCode::Tab => {
                self.composer.cycle_scope();
                self.status = format!("posting to {}", self.composer.scope().display_name());
            }
            KeyCode::Backspace => self.composer.pop_char(),
            KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Down => {
                if self.scroll + 1 < self.feed.rows().len() {
                    self.scroll += 1;
                }
            }
            KeyCode::Char('r') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.status = "refreshing".into();
                self.poller.refresh();
            }
            KeyCode::Char('f') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.mode = InputMode::Search;
                self.search_query.clear();
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.composer.push_char(ch)
            }
            _ => {}
        }
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.mode = InputMode::Compose;
                if self.showing_search {
                    // back to the live feed: rebuild from the next fetch
                    self.showing_search = false;
                    self.feed.clear();
                    self.scroll = 0;
                    self.poller.refresh();
                }
            }
            KeyCode::Enter => self.run_search(),
            KeyCode::Backspace => {
                self.search_query.pop();
            }
            KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.search_query.push(ch);
            }
            _ => {}
        }
    }

    fn submit(&mut self) {
        match self.composer.submit() {
            Ok(()) => {
                self.status = "posted".into();
                self.poller.refresh();
            }
            Err(ComposeError::TooLong) => {
                self.status = "Message is longer than 140 characters".into();
            }
            Err(ComposeError::Publish(err)) => {
                self.status = format!("post failed: {:#}", err);
            }
        }
    }

    fn run_search(&mut self) {
        let query = self.search_query.trim().to_string();
        if query.is_empty() {
            return;
        }
        match self.feed_service.search(&query) {
            Ok(posts) => {
                self.feed.clear();
                self.scroll = 0;
                let added = self.feed.ingest(&posts);
                self.showing_search = true;
                self.status = format!("{} result(s) for {:?}, Esc for the live feed", added, query);
            }
            Err(err) => {
                self.status = format!("search failed: {:#}", err);
            }
        }
    }

    fn draw(&self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(4),
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(frame.size());

        self.draw_header(frame, chunks[0]);
        match self.mode {
            InputMode::Compose => self.draw_compose(frame, chunks[1], chunks[2]),
            InputMode::Search => self.draw_search(frame, chunks[1], chunks[2]),
        }
        self.draw_feed(frame, chunks[3]);
        self.draw_status(frame, chunks[4]);
    }

    fn draw_header(&self, frame: &mut Frame, area: Rect) {
        let title = Line::from(vec![
            Span::styled(
                "LANblog",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" - Microblog for the LAN"),
        ]);
        frame.render_widget(Paragraph::new(title), area);
    }

    fn draw_compose(&self, frame: &mut Frame, input_area: Rect, counter_area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" What's new? ");
        let inner = block.inner(input_area);
        frame.render_widget(
            Paragraph::new(self.composer.draft())
                .block(block)
                .wrap(Wrap { trim: false }),
            input_area,
        );

        // cursor at the end of the draft, wrapped to the inner width
        if inner.width > 0 {
            let width = self.composer.draft().width() as u16;
            let x = inner.x + width % inner.width;
            let y = inner.y + (width / inner.width).min(inner.height.saturating_sub(1));
            frame.set_cursor(x, y);
        }

        let chars_left = self.composer.chars_left();
        let counter_style = if chars_left < 1 {
            Style::default().fg(Color::Red)
        } else {
            Style::default()
        };
        let counter = Line::from(vec![
            Span::styled(
                format!("{} characters left", chars_left),
                counter_style,
            ),
            Span::raw("  ·  "),
            Span::styled(
                self.composer.scope().display_name(),
                Style::default().fg(Color::Cyan),
            ),
            Span::raw("  (Tab switches scope, Enter posts, Ctrl+F searches)"),
        ]);
        frame.render_widget(
            Paragraph::new(counter).alignment(Alignment::Right),
            counter_area,
        );
    }

    fn draw_search(&self, frame: &mut Frame, input_area: Rect, hint_area: Rect) {
        let block = Block::default().borders(Borders::ALL).title(" Search ");
        let inner = block.inner(input_area);
        frame.render_widget(
            Paragraph::new(self.search_query.as_str()).block(block),
            input_area,
        );
        if inner.width > 0 {
            let width = self.search_query.width() as u16;
            frame.set_cursor(inner.x + width.min(inner.width - 1), inner.y);
        }
        frame.render_widget(
            Paragraph::new("Enter runs the search, Esc returns to the live feed")
                .alignment(Alignment::Right),
            hint_area,
        );
    }

    fn draw_feed(&self, frame: &mut Frame, area: Rect) {
        let header = Row::new(vec![
            Cell::from(""),
            Cell::from(if self.showing_search {
                "Search results"
            } else {
                "Posts"
            }),
        ])
        .style(Style::default().add_modifier(Modifier::BOLD));

        let rows: Vec<Row> = self
            .feed
            .rows()
            .iter()
            .skip(self.scroll)
            .map(render_row)
            .collect();

        let table = Table::new(
            rows,
            [Constraint::Length(4), Constraint::Percentage(100)],
        )
        .header(header)
        .block(Block::default().borders(Borders::TOP));

        frame.render_widget(table, area);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(
            Paragraph::new(self.status.as_str()).style(Style::default().fg(Color::DarkGray)),
            area,
        );
    }
}

fn render_row(row: &PostRow) -> Row<'static> {
    let avatar_color = AVATAR_PALETTE[row.avatar.color_slot % AVATAR_PALETTE.len()];
    let avatar = Cell::from(Span::styled(
        format!(" {} ", row.avatar.label),
        Style::default()
            .fg(Color::Black)
            .bg(avatar_color)
            .add_modifier(Modifier::BOLD),
    ));

    let info = Text::from(vec![
        Line::from(Span::styled(
            row.author.clone(),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        message_line(&row.message),
        Line::from(Span::styled(
            row.sent_at.clone(),
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    Row::new(vec![avatar, Cell::from(info)]).height(4)
}

fn message_line(segments: &[Segment]) -> Line<'static> {
    let mut spans = Vec::new();
    for (index, segment) in segments.iter().enumerate() {
        if index > 0 {
            spans.push(Span::raw(" "));
        }
        match segment {
            Segment::Plain(text) => spans.push(Span::raw(text.clone())),
            Segment::Link { text, .. } => spans.push(Span::styled(
                text.clone(),
                Style::default()
                    .fg(Color::Blue)
                    .add_modifier(Modifier::UNDERLINED),
            )),
        }
    }
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_line_styles_links() {
        let line = message_line(&[
            Segment::Plain("see".into()),
            Segment::Link {
                href: "http://example.com".into(),
                text: "http://example.com".into(),
            },
        ]);
        assert_eq!(line.spans.len(), 3);
        assert_eq!(line.spans[0].content, "see");
        assert_eq!(line.spans[2].content, "http://example.com");
        assert_eq!(line.spans[2].style.fg, Some(Color::Blue));
    }
}
