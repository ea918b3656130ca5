use std::collections::VecDeque;
use std::io;
use std::time::Duration;

use chrono::Local;
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState, Wrap};

use crate::domain::{FilterModel, Sex};
use crate::error::DashError;
use crate::export::{self, ExportFormat};
use crate::flatten::FlattenedRecord;
use crate::output::summary_line;
use crate::paging::RecordSource;
use crate::session::SessionState;
use crate::store::ExportStore;

const EVENTS_MAX: usize = 4;
const HINTS: &str = "n/→ next  p/← prev  ↑/↓ row  c csv  x xlsx  m manifest  ? help  q quit";

/// Columns shown in the table; images are summarised as a count.
const TABLE_COLUMNS: [(&str, u16); 9] = [
    ("Gene", 10),
    ("Patient", 8),
    ("Sex", 7),
    ("Age", 4),
    ("Staining", 12),
    ("Intensity", 10),
    ("Quantity", 9),
    ("Location", 22),
    ("Tissue", 30),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Table,
    Help,
}

/// Interactive page browser over one [`SessionState`].
pub struct Browser<'a> {
    source: &'a dyn RecordSource,
    store: &'a ExportStore,
    session: SessionState,
    table: TableState,
    view: View,
    events: VecDeque<String>,
}

impl<'a> Browser<'a> {
    pub fn new(source: &'a dyn RecordSource, store: &'a ExportStore, session: SessionState) -> Self {
        let mut browser = Self {
            source,
            store,
            session,
            table: TableState::default(),
            view: View::Table,
            events: VecDeque::new(),
        };
        browser.reset_selection();
        browser
    }

    pub fn session(&self) -> &SessionState {
        &self.session
    }

    pub fn into_session(self) -> SessionState {
        self.session
    }

    pub fn selected(&self) -> Option<usize> {
        self.table.selected()
    }

    pub fn events(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(String::as_str)
    }

    pub fn run(&mut self) -> miette::Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().into_diagnostic()?;
        stdout.execute(EnterAlternateScreen).into_diagnostic()?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).into_diagnostic()?;
        terminal.clear().into_diagnostic()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode().into_diagnostic()?;
        let mut stdout = io::stdout();
        stdout.execute(LeaveAlternateScreen).into_diagnostic()?;
        result
    }

    fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> miette::Result<()> {
        loop {
            terminal
                .draw(|frame| draw_ui(frame, self))
                .into_diagnostic()?;

            if event::poll(Duration::from_millis(200)).into_diagnostic()?
                && let Event::Key(key) = event::read().into_diagnostic()?
                && self.handle_key(key)
            {
                return Ok(());
            }
        }
    }

    /// Applies one key press. Returns `true` when the browser should close.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if self.view == View::Help {
            self.view = View::Table;
            return matches!(key.code, KeyCode::Char('q'));
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Char('?') | KeyCode::F(1) => self.view = View::Help,
            KeyCode::Char('n') | KeyCode::Right => {
                self.session.next_page(self.source);
                self.after_load();
            }
            KeyCode::Char('p') | KeyCode::Left => {
                self.session.prev_page(self.source);
                self.after_load();
            }
            KeyCode::Up => self.move_selection(-1),
            KeyCode::Down => self.move_selection(1),
            KeyCode::Char('c') => self.export(ExportFormat::Csv),
            KeyCode::Char('x') => self.export(ExportFormat::Xlsx),
            KeyCode::Char('m') => self.export(ExportFormat::Images),
            _ => {}
        }
        false
    }

    fn after_load(&mut self) {
        self.reset_selection();
        let result = self.session.result();
        let message = match self.session.last_error() {
            Some(err) => format!("page {}: {err}", result.current_page),
            None => format!("loaded page {}", result.current_page),
        };
        self.push_event(message);
    }

    fn reset_selection(&mut self) {
        let selected = (!self.session.result().records.is_empty()).then_some(0);
        self.table.select(selected);
    }

    fn move_selection(&mut self, delta: isize) {
        let len = self.session.result().records.len();
        if len == 0 {
            self.table.select(None);
            return;
        }
        let current = self.table.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, len as isize - 1);
        self.table.select(Some(next as usize));
    }

    fn export(&mut self, format: ExportFormat) {
        let records = &self.session.result().records;
        let message = match write_local_export(self.store, records, format) {
            Ok(path) => format!("saved {} rows to {path}", records.len()),
            Err(err) => format!("export failed: {}", err.user_message()),
        };
        self.push_event(message);
    }

    fn push_event(&mut self, item: String) {
        self.events
            .push_back(format!("{} {item}", Local::now().format("%H:%M:%S")));
        while self.events.len() > EVENTS_MAX {
            self.events.pop_front();
        }
    }
}

/// Encodes the records on screen and writes them under a timestamped name.
pub fn write_local_export(
    store: &ExportStore,
    records: &[FlattenedRecord],
    format: ExportFormat,
) -> Result<camino::Utf8PathBuf, DashError> {
    let content = export::encode(records, format)?;
    store.write_export(format.file_stem(), format.extension(), &content)
}

fn draw_ui(frame: &mut ratatui::Frame, browser: &mut Browser<'_>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3 + EVENTS_MAX as u16),
        ])
        .split(frame.area());

    frame.render_widget(draw_header(browser.session()), chunks[0]);
    match browser.view {
        View::Table => draw_table(frame, browser, chunks[1]),
        View::Help => frame.render_widget(draw_help(), chunks[1]),
    }
    frame.render_widget(draw_status(browser), chunks[2]);
}

fn draw_header(session: &SessionState) -> Paragraph<'static> {
    let genes = if session.genes().is_empty() {
        "all".to_string()
    } else {
        session.genes().iter().cloned().collect::<Vec<_>>().join(", ")
    };
    let title = Line::from(vec![
        Span::styled(
            "PATHO-DASH",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(env!("CARGO_PKG_VERSION"), Style::default().fg(Color::Gray)),
        Span::raw("   Genes: "),
        Span::styled(genes, Style::default().fg(Color::Cyan)),
    ]);
    let filters = Line::from(Span::styled(
        describe_filters(session.filters()),
        Style::default().fg(Color::Gray),
    ));
    Paragraph::new(vec![title, filters])
        .alignment(Alignment::Left)
        .block(Block::default().borders(Borders::BOTTOM))
}

fn draw_table(frame: &mut ratatui::Frame, browser: &mut Browser<'_>, area: Rect) {
    let header = Row::new(
        TABLE_COLUMNS
            .iter()
            .map(|(name, _)| Cell::from(*name))
            .chain(std::iter::once(Cell::from("Images"))),
    )
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    );
    let rows = browser
        .session
        .result()
        .records
        .iter()
        .map(|record| Row::new(table_cells(record)))
        .collect::<Vec<_>>();
    let widths = TABLE_COLUMNS
        .iter()
        .map(|(_, width)| Constraint::Length(*width))
        .chain(std::iter::once(Constraint::Min(6)))
        .collect::<Vec<_>>();
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::NONE))
        .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    frame.render_stateful_widget(table, area, &mut browser.table);
}

fn table_cells(record: &FlattenedRecord) -> Vec<Cell<'static>> {
    vec![
        Cell::from(record.gene_name.clone()),
        Cell::from(record.patient_id.to_string()),
        Cell::from(record.patient_sex.clone()),
        Cell::from(record.patient_age.map(|age| age.to_string()).unwrap_or_default()),
        Cell::from(record.staining.clone()),
        Cell::from(record.intensity.clone()),
        Cell::from(record.quantity.clone()),
        Cell::from(record.location.clone()),
        Cell::from(record.tissue_description.clone()),
        Cell::from(record.image_urls().len().to_string()),
    ]
}

fn draw_help() -> Paragraph<'static> {
    let lines = vec![
        Line::from("n / →     next page"),
        Line::from("p / ←     previous page"),
        Line::from("↑ / ↓     move selection"),
        Line::from("c         export current page as CSV"),
        Line::from("x         export current page as XLSX"),
        Line::from("m         write image URL manifest"),
        Line::from("q / Esc   quit"),
        Line::from(""),
        Line::from("Press any key to return."),
    ];
    Paragraph::new(lines)
        .block(Block::default().title("Help").borders(Borders::ALL))
        .wrap(Wrap { trim: false })
}

fn draw_status(browser: &Browser<'_>) -> Paragraph<'static> {
    let session = browser.session();
    let mut lines = vec![Line::from(Span::styled(
        summary_line(session.result(), browser.source.page_size()),
        Style::default().fg(Color::White),
    ))];
    if let Some(err) = session.last_error() {
        lines.push(Line::from(Span::styled(
            err.to_string(),
            Style::default().fg(Color::Red),
        )));
    }
    lines.extend(
        browser
            .events
            .iter()
            .map(|event| Line::from(Span::styled(event.clone(), Style::default().fg(Color::DarkGray)))),
    );
    lines.push(Line::from(Span::styled(HINTS, Style::default().fg(Color::DarkGray))));
    Paragraph::new(lines).block(Block::default().borders(Borders::TOP))
}

/// One-line rendering of the active constraints, for the header.
pub fn describe_filters(filters: &FilterModel) -> String {
    let mut parts = Vec::new();
    if let Some(id) = filters.patient_id {
        parts.push(format!("patient {id}"));
    }
    if filters.sex != Sex::Any {
        parts.push(format!("sex {}", filters.sex));
    }
    parts.push(format!("age {}-{}", filters.age.lower(), filters.age.upper()));
    let sets = [
        ("staining", filters.staining.iter().cloned().collect::<Vec<_>>()),
        ("intensity", filters.intensity.iter().cloned().collect()),
        ("quantity", filters.quantity.iter().map(ToString::to_string).collect()),
    ];
    for (label, values) in sets {
        if !values.is_empty() {
            parts.push(format!("{label} {}", values.join("|")));
        }
    }
    if let Some(location) = &filters.location {
        parts.push(format!("location ~{location}"));
    }
    if let Some(tissue) = &filters.tissue_description {
        parts.push(format!("tissue ~{tissue}"));
    }
    parts.join("  ")
}
