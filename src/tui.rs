use anyhow::Result;
use chrono::{DateTime, Utc};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};
use std::io::stdout;

use crate::db::KeyValueStore;
use crate::filter::{filter_jobs, JobFilter};
use crate::models::{JobApplication, Status};
use crate::rules::{elapsed_days, is_follow_up_due};
use crate::store::RecordStore;

struct AppState {
    filter: JobFilter,
    visible: Vec<String>,
    selected: usize,
    scroll_offset: u16,
}

impl AppState {
    fn new(filter: JobFilter) -> Self {
        Self {
            filter,
            visible: Vec::new(),
            selected: 0,
            scroll_offset: 0,
        }
    }

    /// Re-applies the filter; a status change can drop the selected job.
    fn reload(&mut self, jobs: &[JobApplication]) {
        self.visible = filter_jobs(jobs, &self.filter)
            .into_iter()
            .map(|job| job.id.clone())
            .collect();
        if self.selected >= self.visible.len() {
            self.selected = self.visible.len().saturating_sub(1);
        }
    }

    fn current_id(&self) -> Option<&str> {
        self.visible.get(self.selected).map(String::as_str)
    }

    fn next(&mut self) {
        if !self.visible.is_empty() && self.selected < self.visible.len() - 1 {
            self.selected += 1;
            self.scroll_offset = 0;
        }
    }

    fn prev(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
            self.scroll_offset = 0;
        }
    }

    fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_add(3);
    }

    fn scroll_up(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(3);
    }
}

pub fn run_browse<S: KeyValueStore>(store: &mut RecordStore<S>, filter: JobFilter) -> Result<()> {
    let mut state = AppState::new(filter);
    state.reload(store.jobs());
    if state.visible.is_empty() {
        println!("No applications found matching your criteria.");
        return Ok(());
    }

    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let result = run_loop(&mut terminal, &mut state, store);

    // Restore terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
}

fn run_loop<S: KeyValueStore>(
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    state: &mut AppState,
    store: &mut RecordStore<S>,
) -> Result<()> {
    let mut list_state = ListState::default();
    list_state.select(Some(0));

    loop {
        let now = Utc::now();
        terminal.draw(|frame| draw(frame, state, store.jobs(), now, &mut list_state))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if !handle_key(state, store, key.code, Utc::now()) {
                break;
            }
            list_state.select(state.current_id().map(|_| state.selected));
        }
    }
    Ok(())
}

/// Applies one key press. Returns false when the browser should close.
/// An emptied list keeps the browser open so the user can still quit or
/// refresh.
fn handle_key<S: KeyValueStore>(
    state: &mut AppState,
    store: &mut RecordStore<S>,
    code: KeyCode,
    now: DateTime<Utc>,
) -> bool {
    let current = state.current_id().map(String::from);
    match code {
        KeyCode::Char('q') | KeyCode::Esc => return false,
        KeyCode::Down | KeyCode::Char('j') => state.next(),
        KeyCode::Up | KeyCode::Char('k') => state.prev(),
        KeyCode::Char('J') | KeyCode::PageDown => state.scroll_down(),
        KeyCode::Char('K') | KeyCode::PageUp => state.scroll_up(),
        KeyCode::Char('s') => {
            if let Some(id) = current {
                if let Some(status) = store.job(&id).map(|job| job.status.cycle()) {
                    store.set_status(&id, status, now);
                }
            }
        }
        KeyCode::Char('e') => {
            if let Some(id) = current {
                store.mark_emailed(&id, now);
            }
        }
        KeyCode::Char('r') => {
            if let Some(id) = current {
                store.toggle_response(&id, now);
            }
        }
        KeyCode::Char('g') => {
            store.refresh(now);
        }
        _ => {}
    }
    state.reload(store.jobs());
    true
}

fn status_style(status: Status) -> Style {
    match status {
        Status::Applied => Style::default().fg(Color::Cyan),
        Status::Interviewing => Style::default().fg(Color::Yellow),
        Status::Offered => Style::default().fg(Color::Green),
        Status::Rejected => Style::default().fg(Color::Red),
        Status::Ghosted => Style::default().fg(Color::DarkGray),
        Status::Pending => Style::default().fg(Color::Magenta),
    }
}

fn draw(
    frame: &mut Frame,
    state: &AppState,
    jobs: &[JobApplication],
    now: DateTime<Utc>,
    list_state: &mut ListState,
) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(frame.area());

    let visible: Vec<&JobApplication> = state
        .visible
        .iter()
        .filter_map(|id| jobs.iter().find(|job| &job.id == id))
        .collect();

    // Left panel: application list
    let mut items: Vec<ListItem> = visible
        .iter()
        .map(|job| {
            let marker = if is_follow_up_due(job, now) { "!" } else { " " };
            ListItem::new(Line::from(vec![
                Span::raw(format!("{} ", marker)),
                Span::styled(format!("{:<12} ", job.status), status_style(job.status)),
                Span::raw(format!("{} | {}", job.role, job.company)),
            ]))
        })
        .collect();
    if items.is_empty() {
        items.push(ListItem::new(Span::styled(
            "  No applications match this filter",
            Style::default().fg(Color::DarkGray),
        )));
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(format!(
            " Applications ({}) [{}] ",
            visible.len(),
            state.filter.status
        )))
        .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, chunks[0], list_state);

    // Right panel: application detail
    let detail = visible
        .get(state.selected)
        .map(|job| build_detail(job, now))
        .unwrap_or_else(|| Text::raw("No application selected"));
    let detail_widget = Paragraph::new(detail)
        .block(Block::default().borders(Borders::ALL).title(" Detail "))
        .wrap(Wrap { trim: false })
        .scroll((state.scroll_offset, 0));

    frame.render_widget(detail_widget, chunks[1]);

    // Footer help
    let help_area = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(frame.area());

    let help = Paragraph::new(
        " j/k:navigate  J/K:scroll  s:next status  e:emailed  r:response  g:check ghosting  q:quit",
    )
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, help_area[1]);
}

fn build_detail(job: &JobApplication, now: DateTime<Utc>) -> Text<'static> {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let muted = Style::default().fg(Color::DarkGray);
    let mut lines: Vec<Line> = Vec::new();

    lines.push(Line::from(Span::styled(job.role.clone(), bold)));
    lines.push(Line::from(format!("at {}", job.company)));
    lines.push(Line::from(Span::styled(
        format!(
            "Status: {} ({} days)",
            job.status,
            elapsed_days(job.status_since(), now)
        ),
        status_style(job.status),
    )));
    lines.push(Line::from(format!("Applied: {}", job.applied_on())));
    lines.push(Line::from(format!(
        "Added: {}",
        job.date_added.format("%Y-%m-%d %H:%M")
    )));
    if let Some(link) = &job.job_link {
        lines.push(Line::from(format!("Link: {}", link)));
    }

    lines.push(Line::from(""));
    match job.last_contacted_date {
        Some(contacted) => {
            lines.push(Line::from(format!(
                "Last contacted: {} ({} days ago)",
                contacted.format("%Y-%m-%d"),
                elapsed_days(contacted, now)
            )));
            let response = if job.received_response { "yes" } else { "no" };
            lines.push(Line::from(format!("Response received: {}", response)));
            if is_follow_up_due(job, now) {
                lines.push(Line::from(Span::styled(
                    "Follow-up due",
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                )));
            }
        }
        None => lines.push(Line::from(Span::styled("(Not contacted yet)", muted))),
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Recruiters ({})", job.recruiters.len()),
        bold,
    )));
    for rec in &job.recruiters {
        let name = rec.name.as_deref().unwrap_or("Anonymous");
        lines.push(Line::from(format!("  {}", name)));
        if let Some(email) = &rec.email {
            lines.push(Line::from(format!("    {}", email)));
        }
        if let Some(linkedin) = &rec.linkedin {
            lines.push(Line::from(format!("    {}", linkedin)));
        }
    }

    Text::from(lines)
}
