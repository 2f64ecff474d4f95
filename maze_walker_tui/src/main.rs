use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use maze_walker_core::{
    environment::{Cell, GameField},
    level::load_level_file,
    search::{CancelToken, MAX_SEARCH_DEPTH, Search, SearchOutcome, SearchReport},
};
use ratatui::{
    crossterm::{
        self,
        event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
    prelude::*,
    widgets::*,
};
use std::{
    io::{self, Stdout},
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::info;

mod logging;

#[derive(Parser, Debug)]
#[command(version, about = "Solve a maze with a depth-limited backtracking search", long_about = None)]
struct Args {
    /// Level file to load, either a command list or an ASCII map
    #[arg(short, long, value_name = "LEVEL_FILE", default_value = "levels/first.lvl")]
    level: PathBuf,

    /// Deepest recursion level the search may reach
    #[arg(short = 'd', long, default_value_t = 44, value_parser = parse_depth)]
    max_depth: usize,

    /// Pause after each rendered step, in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 20)]
    delay_ms: u64,

    /// Solve without the terminal UI and print the result
    #[arg(long)]
    headless: bool,

    /// Output format of the headless result
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Write logs to this file (filtered by RUST_LOG)
    #[arg(long, value_name = "LOG_FILE")]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Parses `--max-depth`, refusing depths the search would clamp.
fn parse_depth(value: &str) -> Result<usize, String> {
    let depth: usize = value.parse().map_err(|err| format!("{err}"))?;
    if depth > MAX_SEARCH_DEPTH {
        return Err(format!("must be at most {MAX_SEARCH_DEPTH}"));
    }
    Ok(depth)
}

struct App {
    /// The maze being solved.
    field: GameField,
    /// Title shown above the maze.
    title: String,
    max_depth: usize,
    /// Pause between rendered steps.
    delay: Duration,
}

impl App {
    fn new(args: &Args) -> Result<Self> {
        let field = load_level_file(&args.level)
            .with_context(|| format!("Failed to load level {}", args.level.display()))?;
        Ok(App {
            field,
            title: format!("Maze Walker: {}", args.level.display()),
            max_depth: args.max_depth,
            delay: Duration::from_millis(args.delay_ms),
        })
    }
}

/// One-line summary of a finished search.
fn describe(report: &SearchReport, elapsed: Duration) -> String {
    match &report.outcome {
        SearchOutcome::Found { path } => format!(
            "Solved in {:.3} seconds: {} moves, {} steps",
            elapsed.as_secs_f64(),
            path.len(),
            report.steps
        ),
        SearchOutcome::Exhausted { max_depth } => format!(
            "Unsolved within depth budget of {} ({} steps, {:.3} seconds)",
            max_depth,
            report.steps,
            elapsed.as_secs_f64()
        ),
        SearchOutcome::Cancelled => format!("Search cancelled after {} steps", report.steps),
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();
    logging::init(args.log_file.as_deref(), args.headless)?;

    let app = App::new(&args)?;
    info!(level = %args.level.display(), max_depth = args.max_depth, "level loaded");

    if args.headless {
        return run_headless(app, args.format);
    }

    // Set up the terminal
    let mut terminal = setup_terminal()?;

    // Run the search and keep the result on screen, restoring the terminal even on failure
    let result = run_app(&mut terminal, app);
    restore_terminal(&mut terminal)?;

    result
}

/// Solves the level without a UI and prints the outcome.
fn run_headless(mut app: App, format: OutputFormat) -> Result<()> {
    let started = Instant::now();
    let report = Search::new(app.max_depth).run(&mut app.field, |_| {})?;
    let elapsed = started.elapsed();
    info!(found = report.is_found(), steps = report.steps, "headless search finished");

    match format {
        OutputFormat::Text => {
            println!("{}", describe(&report, elapsed));
            print!("{}", app.field);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "level": app.title,
                "elapsed_seconds": elapsed.as_secs_f64(),
                "report": report,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }
    Ok(())
}

/// Configures the terminal for TUI interaction.
fn setup_terminal() -> Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();
    enable_raw_mode()?; // Put terminal in raw mode
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?; // Use alternate screen and enable mouse capture
    let backend = CrosstermBackend::new(stdout);
    Terminal::new(backend).map_err(Into::into) // Map io::Error to anyhow::Error
}

/// Restores the terminal to its original state.
fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    Ok(())
}

/// Returns true if the user asked to quit within `timeout`.
fn quit_requested(timeout: Duration) -> io::Result<bool> {
    if crossterm::event::poll(timeout)? {
        if let Event::Key(key) = event::read()? {
            return Ok(matches!(key.code, KeyCode::Char('q') | KeyCode::Esc));
        }
    }
    Ok(false)
}

/// Animates the search, then shows the final maze until the user quits.
fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, mut app: App) -> Result<()> {
    let cancel = CancelToken::new();
    let search = Search::new(app.max_depth).with_cancel(cancel.clone());

    let started = Instant::now();
    let mut steps = 0;
    let mut failure: Option<io::Error> = None;
    let report = search.run(&mut app.field, |field| {
        if failure.is_some() {
            return;
        }
        steps += 1;
        let status = format!("Searching... {} steps", steps);
        let drawn = terminal
            .draw(|frame| ui(frame, field, &app.title, app.max_depth, &status))
            .and_then(|_| quit_requested(app.delay));
        match drawn {
            Ok(false) => {}
            Ok(true) => cancel.cancel(),
            Err(err) => {
                failure = Some(err);
                cancel.cancel();
            }
        }
    })?;
    let elapsed = started.elapsed();

    if let Some(err) = failure {
        return Err(err).context("Failed to render search step");
    }
    let status = describe(&report, elapsed);
    info!(%status, "interactive search finished");
    let tick_rate = Duration::from_millis(250);
    loop {
        // Draw the UI
        terminal.draw(|frame| ui(frame, &app.field, &app.title, app.max_depth, &status))?;

        // Exit loop if requested
        if quit_requested(tick_rate)? {
            break;
        }
    }
    Ok(())
}

/// Renders the user interface.
fn ui(frame: &mut Frame, field: &GameField, title: &str, max_depth: usize, status: &str) {
    let main_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),    // Area for the maze
            Constraint::Length(3), // Area for the search status
            Constraint::Length(2), // Area for help
        ])
        .split(frame.area());

    // Render the maze
    render_field(frame, main_layout[0], field, title);

    // Render the search status
    let status_widget = Paragraph::new(Line::from(vec![
        Span::styled(
            format!("Depth budget: {}  ", max_depth),
            Style::default().fg(Color::Gray),
        ),
        Span::raw(status.to_string()),
    ]))
    .block(Block::default().borders(Borders::ALL).title("Search"));
    frame.render_widget(status_widget, main_layout[1]);

    // Render help text
    let help_text = Paragraph::new("Press 'q' or 'Esc' to quit.")
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::TOP));
    frame.render_widget(help_text, main_layout[2]);
}

/// Styled character for one maze cell.
fn cell_span(cell: Cell) -> Span<'static> {
    match cell {
        Cell::Empty => Span::raw(" "),
        Cell::Wall => Span::styled("#", Style::default().fg(Color::DarkGray)),
        Cell::Target => Span::styled("T", Style::default().fg(Color::Blue).bold()),
        Cell::Visited => Span::styled(".", Style::default().fg(Color::Red)),
        Cell::Player => Span::styled("@", Style::default().fg(Color::LightRed).bold()),
    }
}

/// Renders the maze onto the frame.
fn render_field(frame: &mut Frame, area: Rect, field: &GameField, title: &str) {
    let lines: Vec<Line> = field
        .cells()
        .rows()
        .map(|row| Line::from(row.iter().copied().map(cell_span).collect::<Vec<_>>()))
        .collect();

    let map_paragraph = Paragraph::new(lines)
        .block(Block::default().title(title.to_string()).borders(Borders::ALL))
        .alignment(Alignment::Center);

    frame.render_widget(map_paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use maze_walker_core::Coordinate;

    #[test]
    fn args_have_sensible_defaults() {
        let args = Args::parse_from(["maze_walker_tui"]);
        assert_eq!(args.level, PathBuf::from("levels/first.lvl"));
        assert_eq!(args.max_depth, 44);
        assert!(!args.headless);
        assert_eq!(args.format, OutputFormat::Text);
    }

    #[test]
    fn args_parse_headless_json() {
        let args = Args::parse_from([
            "maze_walker_tui",
            "--level",
            "maze.txt",
            "-d",
            "12",
            "--headless",
            "--format",
            "json",
        ]);
        assert_eq!(args.max_depth, 12);
        assert!(args.headless);
        assert_eq!(args.format, OutputFormat::Json);
    }

    #[test]
    fn args_reject_depth_beyond_limit() {
        let too_deep = (MAX_SEARCH_DEPTH + 1).to_string();
        assert!(Args::try_parse_from(["maze_walker_tui", "-d", too_deep.as_str()]).is_err());
        assert!(Args::try_parse_from(["maze_walker_tui", "-d", "nope"]).is_err());

        let deepest = MAX_SEARCH_DEPTH.to_string();
        let args = Args::try_parse_from(["maze_walker_tui", "-d", deepest.as_str()]).unwrap();
        assert_eq!(args.max_depth, MAX_SEARCH_DEPTH);
    }

    #[test]
    fn describe_distinguishes_exhaustion_from_success() {
        let solved = SearchReport {
            outcome: SearchOutcome::Found {
                path: vec![Coordinate::new(1, 0)],
            },
            steps: 1,
        };
        assert!(describe(&solved, Duration::from_millis(1500)).starts_with("Solved in 1.500 seconds"));

        let unsolved = SearchReport {
            outcome: SearchOutcome::Exhausted { max_depth: 7 },
            steps: 30,
        };
        assert!(describe(&unsolved, Duration::ZERO).contains("depth budget of 7"));

        let cancelled = SearchReport {
            outcome: SearchOutcome::Cancelled,
            steps: 4,
        };
        assert_eq!(
            describe(&cancelled, Duration::ZERO),
            "Search cancelled after 4 steps"
        );
    }

    #[test]
    fn cancelled_status_is_shown_on_the_final_screen() {
        let mut field = GameField::new(3, 1);
        field.spawn_player(Coordinate::new(0, 0)).unwrap();
        let status = describe(
            &SearchReport {
                outcome: SearchOutcome::Cancelled,
                steps: 2,
            },
            Duration::ZERO,
        );

        let backend = backend::TestBackend::new(60, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| ui(frame, &field, "test", 5, &status))
            .unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("Search cancelled after 2 steps"));
    }

    #[test]
    fn rendering_draws_every_row() {
        let mut field = GameField::new(3, 2);
        field.spawn_player(Coordinate::new(0, 0)).unwrap();
        field.spawn_target(Coordinate::new(2, 1)).unwrap();

        let backend = backend::TestBackend::new(20, 12);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| ui(frame, &field, "test", 5, "Searching..."))
            .unwrap();
        let buffer = terminal.backend().buffer();
        let text: String = buffer.content().iter().map(|cell| cell.symbol()).collect();
        assert!(text.contains('@'));
        assert!(text.contains('T'));
        assert!(text.contains("Depth budget: 5"));
    }
}
