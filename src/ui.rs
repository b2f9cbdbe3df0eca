use anyhow::Result;
use census_query::{BarChart, EntityPopulation, MunicipalityAgeTable, QueryEngine};
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{BarChart as BarChartWidget, Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;

const DEFAULT_AGE_MIN: i32 = 0;
const DEFAULT_AGE_MAX: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Entities,
    Municipalities,
    AgeTable,
    Chart,
}

impl Page {
    pub fn next(&self) -> Self {
        match self {
            Page::Entities => Page::Municipalities,
            Page::Municipalities => Page::AgeTable,
            Page::AgeTable => Page::Chart,
            Page::Chart => Page::Entities,
        }
    }

    pub fn previous(&self) -> Self {
        match self {
            Page::Entities => Page::Chart,
            Page::Municipalities => Page::Entities,
            Page::AgeTable => Page::Municipalities,
            Page::Chart => Page::AgeTable,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Page::Entities => "Entities",
            Page::Municipalities => "Municipalities",
            Page::AgeTable => "Age Table",
            Page::Chart => "Chart",
        }
    }
}

pub struct App {
    pub engine: QueryEngine,
    pub entities: Vec<String>,
    pub municipalities: Vec<String>,
    pub entity_state: TableState,
    pub municipality_state: TableState,
    pub table_state: TableState,
    pub current_page: Page,
    pub summary: Option<EntityPopulation>,
    pub chart: Option<BarChart>,
    pub selected_municipality: Option<String>,
    pub age_min: i32,
    pub age_max: i32,
    pub age_table: Option<MunicipalityAgeTable>,
    pub status: Option<String>,
}

impl App {
    pub fn new(engine: QueryEngine) -> Self {
        let entities = engine.entities();

        let mut entity_state = TableState::default();
        if !entities.is_empty() {
            entity_state.select(Some(0));
        }

        Self {
            engine,
            entities,
            municipalities: Vec::new(),
            entity_state,
            municipality_state: TableState::default(),
            table_state: TableState::default(),
            current_page: Page::Entities,
            summary: None,
            chart: None,
            selected_municipality: None,
            age_min: DEFAULT_AGE_MIN,
            age_max: DEFAULT_AGE_MAX,
            age_table: None,
            status: None,
        }
    }

    pub fn selected_entity(&self) -> Option<&str> {
        self.summary.as_ref().map(|s| s.entity.as_str())
    }

    /// Enter on the current page drills down one level
    pub fn select(&mut self) {
        match self.current_page {
            Page::Entities => self.select_entity(),
            Page::Municipalities => self.select_municipality(),
            Page::AgeTable | Page::Chart => {}
        }
    }

    pub fn select_entity(&mut self) {
        let Some(entity) = self
            .entity_state
            .selected()
            .and_then(|i| self.entities.get(i))
            .cloned()
        else {
            return;
        };

        match self.engine.entity_population(&entity) {
            Ok(summary) => {
                self.municipalities = self.engine.municipalities(&entity);
                self.chart = self.engine.chart(&entity);
                self.summary = Some(summary);
                self.selected_municipality = None;
                self.age_table = None;
                self.status = None;

                self.municipality_state
                    .select(if self.municipalities.is_empty() { None } else { Some(0) });
                self.current_page = Page::Municipalities;
            }
            Err(e) => self.status = Some(e.to_string()),
        }
    }

    pub fn select_municipality(&mut self) {
        let Some(municipality) = self
            .municipality_state
            .selected()
            .and_then(|i| self.municipalities.get(i))
            .cloned()
        else {
            return;
        };

        self.selected_municipality = Some(municipality);
        self.refresh_age_table();
        if self.age_table.is_some() {
            self.current_page = Page::AgeTable;
        }
    }

    /// Move the lower bound of the age range
    pub fn shift_age_min(&mut self, delta: i32) {
        self.age_min = self.age_min.saturating_add(delta).max(0);
        self.refresh_age_table();
    }

    /// Move the upper bound of the age range
    pub fn shift_age_max(&mut self, delta: i32) {
        self.age_max = self.age_max.saturating_add(delta).max(0);
        self.refresh_age_table();
    }

    fn refresh_age_table(&mut self) {
        let (Some(entity), Some(municipality)) = (
            self.selected_entity().map(str::to_string),
            self.selected_municipality.clone(),
        ) else {
            return;
        };

        match self
            .engine
            .municipality_table(&entity, &municipality, self.age_min, self.age_max)
        {
            Ok(table) => {
                self.table_state.select(Some(0));
                self.age_table = Some(table);
                self.status = None;
            }
            Err(e) => {
                self.age_table = None;
                self.table_state.select(None);
                self.status = Some(e.to_string());
            }
        }
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous();
    }

    fn active_list(&mut self) -> Option<(&mut TableState, usize)> {
        match self.current_page {
            Page::Entities => Some((&mut self.entity_state, self.entities.len())),
            Page::Municipalities => Some((&mut self.municipality_state, self.municipalities.len())),
            Page::AgeTable => {
                let len = self.age_table.as_ref().map_or(0, |t| t.table.len());
                Some((&mut self.table_state, len))
            }
            Page::Chart => None,
        }
    }

    pub fn next(&mut self) {
        self.step(1);
    }

    pub fn previous(&mut self) {
        self.step(-1);
    }

    pub fn page_down(&mut self) {
        self.jump(20);
    }

    pub fn page_up(&mut self) {
        self.jump(-20);
    }

    /// Move the selection by one, wrapping around at either end
    fn step(&mut self, delta: isize) {
        let Some((state, len)) = self.active_list() else {
            return;
        };
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if delta > 0 => if i >= len - 1 { 0 } else { i + 1 },
            Some(i) => if i == 0 { len - 1 } else { i - 1 },
            None => 0,
        };
        state.select(Some(i));
    }

    /// Move the selection by a page, clamping at either end
    fn jump(&mut self, delta: isize) {
        let Some((state, len)) = self.active_list() else {
            return;
        };
        if len == 0 {
            return;
        }
        let current = state.selected().unwrap_or(0) as isize;
        let target = (current + delta).clamp(0, len as isize - 1);
        state.select(Some(target as usize));
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.select(),
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::Char('-') => app.shift_age_min(-1),
                KeyCode::Char('+') | KeyCode::Char('=') => app.shift_age_min(1),
                KeyCode::Char('[') => app.shift_age_max(-1),
                KeyCode::Char(']') => app.shift_age_max(1),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                _ => {}
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with navigation
            Constraint::Min(0),    // Content area
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    match app.current_page {
        Page::Entities => render_entities(f, chunks[1], app),
        Page::Municipalities => render_municipalities(f, chunks[1], app),
        Page::AgeTable => render_age_table(f, chunks[1], app),
        Page::Chart => render_chart(f, chunks[1], app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let pages = [Page::Entities, Page::Municipalities, Page::AgeTable, Page::Chart];

    let mut tab_spans = vec![];
    for (i, page) in pages.iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if *page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(page.title(), style));
    }

    if let Some(summary) = &app.summary {
        tab_spans.push(Span::raw("  |  "));
        tab_spans.push(Span::styled(
            summary.entity.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
        tab_spans.push(Span::raw(": "));
        tab_spans.push(Span::styled(
            format!("{} people", summary.total_population),
            Style::default().fg(Color::Green),
        ));
    }

    if let Some(municipality) = &app.selected_municipality {
        tab_spans.push(Span::raw("  ›  "));
        tab_spans.push(Span::styled(municipality.clone(), Style::default().fg(Color::White)));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        format!("Ages {}–{}", app.age_min, app.age_max),
        Style::default().fg(Color::Magenta),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)])
        .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(Color::Cyan)));

    f.render_widget(header, area);
}

fn name_table<'a>(names: &'a [String], title: &'a str) -> Table<'a> {
    let header = Row::new([Cell::from("Name").style(
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD),
    )])
    .style(Style::default().bg(Color::DarkGray))
    .height(1);

    let rows = names.iter().map(|name| Row::new([Cell::from(name.as_str())]).height(1));

    Table::new(rows, [Constraint::Percentage(100)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ")
}

fn render_entities(f: &mut Frame, area: Rect, app: &mut App) {
    let table = name_table(&app.entities, " Entities ");
    f.render_stateful_widget(table, area, &mut app.entity_state);
}

fn render_municipalities(f: &mut Frame, area: Rect, app: &mut App) {
    if app.summary.is_none() {
        render_hint(f, area, "Select an entity first (Entities page, Enter)");
        return;
    }

    let table = name_table(&app.municipalities, " Municipalities ");
    f.render_stateful_widget(table, area, &mut app.municipality_state);
}

fn render_age_table(f: &mut Frame, area: Rect, app: &mut App) {
    let Some(age_table) = &app.age_table else {
        render_hint(f, area, "Select a municipality first (Municipalities page, Enter)");
        return;
    };

    let header_cells = ["Age", "Persons"].iter().map(|h| {
        Cell::from(*h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });

    let header = Row::new(header_cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1);

    let rows = age_table.table.iter().map(|bucket| {
        Row::new(vec![
            Cell::from(bucket.age.to_string()),
            Cell::from(bucket.persons.to_string()).style(Style::default().fg(Color::Green)),
        ])
        .height(1)
    });

    let title = format!(
        " {} · ages {}–{} · total {} (simulated, census {}) ",
        age_table.municipality,
        age_table.age_range.0,
        age_table.age_range.1,
        age_table.total_persons(),
        age_table.census_year
    );

    let table = Table::new(rows, [Constraint::Length(8), Constraint::Length(16)])
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(title),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_chart(f: &mut Frame, area: Rect, app: &App) {
    let Some(chart) = &app.chart else {
        render_hint(f, area, "Select an entity first (Entities page, Enter)");
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(area);

    let entity_bars: Vec<(&str, u64)> = chart
        .series
        .iter()
        .map(|point| (point.label.as_str(), point.value))
        .collect();

    let entity_chart = BarChartWidget::default()
        .block(Block::default().borders(Borders::ALL).title(" Population by entity "))
        .data(entity_bars.as_slice())
        .bar_width(20)
        .bar_style(Style::default().fg(Color::Cyan))
        .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));

    f.render_widget(entity_chart, chunks[0]);

    match &app.age_table {
        Some(age_table) => {
            let labels: Vec<String> = age_table.table.iter().map(|b| b.age.to_string()).collect();
            let age_bars: Vec<(&str, u64)> = labels
                .iter()
                .zip(&age_table.table)
                .map(|(label, bucket)| (label.as_str(), bucket.persons))
                .collect();

            let age_chart = BarChartWidget::default()
                .block(
                    Block::default()
                        .borders(Borders::ALL)
                        .title(format!(" {} by age (simulated) ", age_table.municipality)),
                )
                .data(age_bars.as_slice())
                .bar_width(3)
                .bar_gap(1)
                .bar_style(Style::default().fg(Color::Green));

            f.render_widget(age_chart, chunks[1]);
        }
        None => render_hint(f, chunks[1], "Select a municipality to chart its age table"),
    }
}

fn render_hint(f: &mut Frame, area: Rect, text: &str) {
    let hint = Paragraph::new(vec![Line::from(""), Line::from(Span::styled(
        format!("  {}", text),
        Style::default().fg(Color::DarkGray),
    ))])
    .block(Block::default().borders(Borders::ALL));

    f.render_widget(hint, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let mut status_spans = vec![];

    if let Some(message) = &app.status {
        status_spans.push(Span::styled(
            format!(" {} ", message),
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        ));
        status_spans.push(Span::raw(" | "));
    }

    status_spans.push(Span::styled("Enter", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Select | "));
    status_spans.push(Span::styled("Tab", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Page | "));
    status_spans.push(Span::styled("-/+", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Min age | "));
    status_spans.push(Span::styled("[/]", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Max age | "));
    status_spans.push(Span::styled("↑/↓", Style::default().fg(Color::Yellow)));
    status_spans.push(Span::raw(" Nav | "));
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Quit"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}
