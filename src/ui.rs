use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use jumping_standings::config::{category_label, DayDefinition, DayRole};
use jumping_standings::report::truncate;
use jumping_standings::tiebreak::has_valid_tie_break;
use jumping_standings::{DataProvider, ResultSource, RiderStanding, Team};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame, Terminal,
};
use std::io;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    /// Individual standings of the category at this index
    Category(usize),
    Teams,
}

impl Page {
    pub fn next(&self, categories: usize) -> Self {
        match self {
            Page::Category(i) if i + 1 < categories => Page::Category(i + 1),
            Page::Category(_) => Page::Teams,
            Page::Teams if categories > 0 => Page::Category(0),
            Page::Teams => Page::Teams,
        }
    }

    pub fn previous(&self, categories: usize) -> Self {
        match self {
            Page::Category(0) => Page::Teams,
            Page::Category(i) => Page::Category(i - 1),
            Page::Teams if categories > 0 => Page::Category(categories - 1),
            Page::Teams => Page::Teams,
        }
    }
}

pub struct App<S: ResultSource> {
    provider: DataProvider<S>,
    pub categories: Vec<String>,
    pub current_page: Page,
    pub riders: Vec<RiderStanding>,
    pub teams: Vec<Team>,
    pub state: TableState,
    pub show_detail: bool,

    /// Last load problem, shown in the status bar
    pub message: Option<String>,
}

impl<S: ResultSource> App<S> {
    pub fn new(provider: DataProvider<S>) -> Self {
        let categories = provider.config().categories.clone();
        let current_page = if categories.is_empty() {
            Page::Teams
        } else {
            Page::Category(0)
        };

        let mut app = Self {
            provider,
            categories,
            current_page,
            riders: Vec::new(),
            teams: Vec::new(),
            state: TableState::default(),
            show_detail: false,
            message: None,
        };
        app.refresh_page();
        app
    }

    /// Recompute the standings of the current page from the provider.
    pub fn refresh_page(&mut self) {
        let result = match self.current_page {
            Page::Category(i) => {
                let category = self.categories.get(i).cloned().unwrap_or_default();
                self.provider
                    .individual_standings(&category)
                    .map(|riders| self.riders = riders)
            }
            Page::Teams => self.provider.team_standings().map(|teams| self.teams = teams),
        };

        match result {
            Ok(()) => self.message = None,
            Err(err) => {
                warn!(error = %err, "Could not load competition data");
                self.riders.clear();
                self.teams.clear();
                self.message = Some(err.to_string());
            }
        }

        if self.row_count() > 0 {
            self.state.select(Some(0));
        } else {
            self.state.select(None);
        }
    }

    /// Discard cached data and read the sheets again.
    pub fn reload(&mut self) {
        self.provider.invalidate();
        self.riders.clear();
        self.teams.clear();
        self.refresh_page();
    }

    pub fn row_count(&self) -> usize {
        match self.current_page {
            Page::Category(_) => self.riders.len(),
            Page::Teams => self.teams.len(),
        }
    }

    pub fn title(&self) -> String {
        match self.current_page {
            Page::Category(i) => self
                .categories
                .get(i)
                .map(|c| category_label(c))
                .unwrap_or_default(),
            Page::Teams => "Equipos".to_string(),
        }
    }

    pub fn toggle_detail(&mut self) {
        self.show_detail = !self.show_detail;
    }

    pub fn selected_rider(&self) -> Option<&RiderStanding> {
        self.state.selected().and_then(|i| self.riders.get(i))
    }

    pub fn selected_team(&self) -> Option<&Team> {
        self.state.selected().and_then(|i| self.teams.get(i))
    }

    pub fn next_page(&mut self) {
        self.current_page = self.current_page.next(self.categories.len());
        self.refresh_page();
    }

    pub fn previous_page(&mut self) {
        self.current_page = self.current_page.previous(self.categories.len());
        self.refresh_page();
    }

    pub fn next(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.row_count();
        if len == 0 {
            return;
        }
        let i = match self.state.selected() {
            Some(i) => (i + 20).min(len - 1),
            None => 0,
        };
        self.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let i = match self.state.selected() {
            Some(i) => i.saturating_sub(20),
            None => 0,
        };
        self.state.select(Some(i));
    }
}

pub fn run_ui<S: ResultSource>(app: &mut App<S>) -> Result<()> {
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

fn run_app<B: ratatui::backend::Backend, S: ResultSource>(
    terminal: &mut Terminal<B>,
    app: &mut App<S>,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Enter => app.toggle_detail(),
                KeyCode::Tab => {
                    if key.modifiers.contains(KeyModifiers::SHIFT) {
                        app.previous_page();
                    } else {
                        app.next_page();
                    }
                }
                KeyCode::BackTab => app.previous_page(),
                KeyCode::Char('r') => app.reload(),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::PageDown => app.page_down(),
                KeyCode::PageUp => app.page_up(),
                KeyCode::Home => {
                    if app.row_count() > 0 {
                        app.state.select(Some(0));
                    }
                }
                KeyCode::End => {
                    if app.row_count() > 0 {
                        app.state.select(Some(app.row_count() - 1));
                    }
                }
                _ => {}
            }
        }
    }
}

fn ui<S: ResultSource>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header with category tabs
            Constraint::Min(0),    // Standings
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let content = if app.show_detail {
        let content_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(chunks[1]);
        render_detail_panel(f, content_chunks[1], app);
        content_chunks[0]
    } else {
        chunks[1]
    };

    match app.current_page {
        Page::Category(_) => render_rider_table(f, content, app),
        Page::Teams => render_team_table(f, content, app),
    }

    render_status_bar(f, chunks[2], app);
}

fn render_header<S: ResultSource>(f: &mut Frame, area: Rect, app: &App<S>) {
    let mut pages: Vec<(Page, String)> = app
        .categories
        .iter()
        .enumerate()
        .map(|(i, c)| (Page::Category(i), category_label(c)))
        .collect();
    pages.push((Page::Teams, "Equipos".to_string()));

    let mut tab_spans = vec![];
    for (i, (page, name)) in pages.into_iter().enumerate() {
        if i > 0 {
            tab_spans.push(Span::raw(" │ "));
        }

        let style = if page == app.current_page {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        tab_spans.push(Span::styled(name, style));
    }

    tab_spans.push(Span::raw("  |  "));
    tab_spans.push(Span::styled(
        app.provider.config().name.clone(),
        Style::default().fg(Color::White),
    ));

    let header = Paragraph::new(vec![Line::from(tab_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );

    f.render_widget(header, area);
}

fn header_row(titles: Vec<String>) -> Row<'static> {
    let cells = titles.into_iter().map(|h| {
        Cell::from(h).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )
    });
    Row::new(cells)
        .style(Style::default().bg(Color::DarkGray))
        .height(1)
}

fn render_rider_table<S: ResultSource>(f: &mut Frame, area: Rect, app: &mut App<S>) {
    let days = app.provider.config().days.clone();

    let mut titles = vec![
        "Cl".to_string(),
        "Jinete".to_string(),
        "Caballo".to_string(),
        "Total".to_string(),
    ];
    titles.extend(days.iter().map(|d| d.label.clone()));

    let mut widths = vec![
        Constraint::Length(4),
        Constraint::Length(28),
        Constraint::Length(22),
        Constraint::Length(7),
    ];
    widths.extend(days.iter().map(|_| Constraint::Length(14)));

    let rows = app.riders.iter().map(|rider| {
        let mut cells = vec![
            Cell::from(rider.display_rank().map(|r| r.to_string()).unwrap_or_default()),
            Cell::from(truncate(&rider.rider, 28)),
            Cell::from(truncate(&rider.mount, 22)),
            Cell::from(rider.total.to_string()).style(Style::default().fg(Color::Green)),
        ];

        for day in &days {
            let cell = match rider.day(&day.id) {
                Some(entry) if day.role == DayRole::TieBreak => {
                    let style = if has_valid_tie_break(entry.original.as_ref()) {
                        Style::default()
                            .fg(Color::Magenta)
                            .add_modifier(Modifier::BOLD)
                    } else {
                        Style::default().fg(Color::DarkGray)
                    };
                    Cell::from(entry.format_tie_break()).style(style)
                }
                Some(entry) => {
                    let color = if entry.elimination().is_some() {
                        Color::Red
                    } else {
                        Color::White
                    };
                    Cell::from(format!("{}/{}", entry.score, entry.time_or_dash()))
                        .style(Style::default().fg(color))
                }
                None => Cell::from("-"),
            };
            cells.push(cell);
        }

        Row::new(cells).height(1)
    });

    let table = Table::new(rows, widths)
        .header(header_row(titles))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::White))
                .title(format!(" Categoría {} ", app.title())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_team_table<S: ResultSource>(f: &mut Frame, area: Rect, app: &mut App<S>) {
    let titles = ["Pos", "Equipo", "Jefe de Equipo", "Total", "Tiempo (s)", "Cuentan"]
        .iter()
        .map(|t| t.to_string())
        .collect();

    let rows = app.teams.iter().map(|team| {
        let total_style = if team.eliminated {
            Style::default().fg(Color::Red)
        } else {
            Style::default().fg(Color::Green)
        };
        let counted: Vec<String> = team.counted_members().map(|m| m.rider.clone()).collect();

        let cells = vec![
            Cell::from(team.rank.to_string()),
            Cell::from(truncate(&team.name, 24)),
            Cell::from(truncate(&team.captain, 20)),
            Cell::from(team.total.to_string()).style(total_style),
            Cell::from(format!("{:.2}", team.total_time)),
            Cell::from(truncate(&counted.join(", "), 50)),
        ];
        Row::new(cells).height(1)
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(5),
            Constraint::Length(26),
            Constraint::Length(22),
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Min(20),
        ],
    )
    .header(header_row(titles))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White))
            .title(" Clasificación por equipos "),
    )
    .highlight_style(
        Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("→ ");

    f.render_stateful_widget(table, area, &mut app.state);
}

fn render_status_bar<S: ResultSource>(f: &mut Frame, area: Rect, app: &App<S>) {
    let mut status_spans = vec![];

    if let Some(message) = &app.message {
        status_spans.push(Span::styled(
            format!("❌ {} | ", message),
            Style::default().fg(Color::Red),
        ));
    } else {
        status_spans.push(Span::styled(
            format!("{} filas | ", app.row_count()),
            Style::default().fg(Color::White),
        ));
    }

    for (key, label) in [
        ("Tab", " Categoría | "),
        ("↑↓/jk", " Navegar | "),
        ("Enter", " Detalle | "),
        ("r", " Recargar | "),
    ] {
        status_spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        status_spans.push(Span::raw(label));
    }
    status_spans.push(Span::styled("q", Style::default().fg(Color::Red)));
    status_spans.push(Span::raw(" Salir"));

    let status_bar = Paragraph::new(vec![Line::from(status_spans)]).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn label(text: &str) -> Span<'static> {
    Span::styled(
        format!("  {}: ", text),
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )
}

fn section(text: &str) -> Line<'static> {
    Line::from(Span::styled(
        format!("  {}", text),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    ))
}

fn rider_detail(rider: &RiderStanding, days: &[DayDefinition]) -> Vec<Line<'static>> {
    let mut content = vec![
        Line::from(""),
        Line::from(vec![label("Jinete"), Span::raw(rider.rider.clone())]),
        Line::from(vec![label("Licencia"), Span::raw(rider.license.clone())]),
        Line::from(vec![label("Caballo"), Span::raw(rider.mount.clone())]),
        Line::from(vec![
            label("Club"),
            Span::raw(rider.club.clone().unwrap_or_else(|| "-".to_string())),
        ]),
        Line::from(vec![
            label("Total"),
            Span::styled(rider.total.to_string(), Style::default().fg(Color::Green)),
            Span::raw(format!("  ({} días, {} eliminaciones)", rider.valid_days, rider.eliminations)),
        ]),
        Line::from(""),
    ];

    for day in days {
        content.push(section(&day.label));
        match rider.day(&day.id) {
            Some(entry) => {
                content.push(Line::from(vec![label("Caballo"), Span::raw(entry.mount_or_dash().to_string())]));
                content.push(Line::from(vec![label("Puntos"), Span::raw(entry.score.to_string())]));
                content.push(Line::from(vec![label("Tiempo"), Span::raw(entry.time_or_dash().to_string())]));
                content.push(Line::from(vec![label("Cl"), Span::raw(entry.placement.clone())]));
                if day.role == DayRole::TieBreak {
                    content.push(Line::from(vec![
                        label("Desempate"),
                        Span::styled(entry.format_tie_break(), Style::default().fg(Color::Magenta)),
                    ]));
                }
            }
            None => content.push(Line::from("  -")),
        }
        content.push(Line::from(""));
    }
    content
}

fn team_detail(team: &Team) -> Vec<Line<'static>> {
    let mut content = vec![
        Line::from(""),
        Line::from(vec![label("Equipo"), Span::raw(team.name.clone())]),
        Line::from(vec![label("Jefe"), Span::raw(team.captain.clone())]),
        Line::from(vec![
            label("Total"),
            Span::raw(team.total.to_string()),
            Span::raw(format!("  ({:.2}s)", team.total_time)),
        ]),
        Line::from(""),
        section("Miembros"),
    ];

    for member in &team.members {
        let style = if member.struck {
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::CROSSED_OUT)
        } else if member.valid_for_total {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        content.push(Line::from(Span::styled(
            format!("  {} ({})", member.rider, member.category),
            style,
        )));
        content.push(Line::from(Span::styled(
            format!(
                "    {} | {} pts | {}",
                wrap_text(&member.mount, 24),
                member.score_text(),
                member.time
            ),
            style,
        )));
    }
    content
}

fn render_detail_panel<S: ResultSource>(f: &mut Frame, area: Rect, app: &App<S>) {
    let (title, content) = match app.current_page {
        Page::Category(_) => (
            " Detalle del jinete ",
            app.selected_rider()
                .map(|r| rider_detail(r, &app.provider.config().days)),
        ),
        Page::Teams => (" Detalle del equipo ", app.selected_team().map(team_detail)),
    };

    let mut content = content.unwrap_or_else(|| vec![Line::from("  Nada seleccionado")]);
    content.push(Line::from(Span::styled(
        "  Enter para cerrar",
        Style::default()
            .fg(Color::DarkGray)
            .add_modifier(Modifier::ITALIC),
    )));

    let detail_panel = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(title),
    );

    f.render_widget(detail_panel, area);
}

fn wrap_text(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut result = String::new();
        let mut current_line = String::new();

        for word in text.split_whitespace() {
            if current_line.chars().count() + word.chars().count() < width {
                if !current_line.is_empty() {
                    current_line.push(' ');
                }
                current_line.push_str(word);
            } else {
                if !result.is_empty() {
                    result.push_str("\n  ");
                }
                result.push_str(&current_line);
                current_line = word.to_string();
            }
        }

        if !current_line.is_empty() {
            if !result.is_empty() {
                result.push_str("\n  ");
            }
            result.push_str(&current_line);
        }

        result
    }
}
