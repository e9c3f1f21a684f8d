use coffee_finder::{
    app::App,
    config::Config,
    events::{Event, EventHandler},
    logging,
    pipeline::{PipelineUpdate, RankingPipeline},
    ui,
};
use color_eyre::Result;
use crossterm::{cursor, execute, terminal};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{io, sync::Arc};
use tokio::sync::mpsc::UnboundedSender;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Instrumentation and safety
    let _log_guard = logging::initialize_logging();
    install_panic_hook();
    color_eyre::install()?;

    let config = Config::load();
    let pipeline = Arc::new(RankingPipeline::from_config(&config)?);

    // Ready terminal and state
    let mut terminal = setup_terminal()?;
    let mut app = App::new(config);
    let mut events = EventHandler::new(app.config.ui.tick_rate_ms);
    let pipeline_tx = events.pipeline_sender();

    spawn_session(&pipeline, app.begin_session(), &pipeline_tx);

    // Main loop
    while !app.should_quit {
        terminal.draw(|f| ui::render(f, &app))?;

        let Some(event) = events.next().await else {
            break;
        };
        match event {
            Event::Tick => app.on_tick(),
            Event::Input(key) => app.handle_key(key),
            Event::Pipeline(update) => app.on_pipeline(update),
        }

        if app.take_reload_request() {
            spawn_session(&pipeline, app.begin_session(), &pipeline_tx);
        }
    }

    restore_terminal(terminal)?;
    info!("Exiting.");
    Ok(())
}

/// Runs one pipeline session in the background. A superseded session keeps
/// running to completion; the app ignores what it sends.
fn spawn_session(
    pipeline: &Arc<RankingPipeline>,
    session: u64,
    tx: &UnboundedSender<PipelineUpdate>,
) {
    let pipeline = Arc::clone(pipeline);
    let tx = tx.clone();
    tokio::spawn(async move {
        pipeline.run(session, tx).await;
    });
}

type Tui = Terminal<CrosstermBackend<io::Stdout>>;

fn setup_terminal() -> Result<Tui> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen, cursor::Hide)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

/// Leaves raw mode and the alternate screen. Shared by the normal exit path
/// and the panic hook.
fn release_terminal() -> io::Result<()> {
    terminal::disable_raw_mode()?;
    execute!(io::stdout(), terminal::LeaveAlternateScreen, cursor::Show)
}

fn restore_terminal(mut tui: Tui) -> Result<()> {
    tui.flush()?;
    release_terminal()?;
    Ok(())
}

/// The panic message is only readable once the terminal is back to normal.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = release_terminal();
        previous(info);
    }));
}
