use std::{env, error::Error, io, sync::Arc, time::Duration};

use crossterm::{
    event::{self},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use ratatui_image::picker::Picker;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use socialspace::app::{App, AppEvent};
use socialspace::backend::MemoryBackend;
use socialspace::config::{Config, LazyBackend};
use socialspace::logging::{self, LoggingConfig};
use socialspace::services::Services;
use socialspace::state::TICK_MS;
use socialspace::ui;

struct Args {
    offline: bool,
    debug: bool,
}

fn parse_args() -> Args {
    let mut args = Args { offline: false, debug: false };
    for arg in env::args().skip(1) {
        match arg.as_str() {
            "--offline" => args.offline = true,
            "--debug" => args.debug = true,
            other => eprintln!("Ignoring unknown argument: {}", other),
        }
    }
    args
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = parse_args();
    let (config, config_warnings) = Config::load();
    let config = Arc::new(config);

    let log_config = if args.debug {
        LoggingConfig::development(config.log_path())
    } else {
        LoggingConfig::new(config.log_path())
    };
    if let Err(e) = logging::init(&log_config) {
        eprintln!("Logging disabled: {}", e.user_message());
    }
    for warning in &config_warnings {
        warn!("{}", warning);
    }

    let backend = if args.offline {
        info!("Starting in offline mode with demo data");
        Arc::new(LazyBackend::with_backend(config.clone(), Arc::new(MemoryBackend::demo(config.clone()))))
    } else {
        if let Err(e) = config.validate() {
            // Still start: the auth broadcaster logs this and lands on the login screen.
            warn!(error = %e, "Backend is not configured");
        }
        Arc::new(LazyBackend::new(config.clone()))
    };
    let services = Services::new(config.clone(), backend);

    // Enable terminal raw mode
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

    let picker = Picker::from_query_stdio().unwrap_or_else(|e| {
        warn!(error = %e, "Terminal graphics query failed, using default font size");
        Picker::from_fontsize((8, 16))
    });

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<AppEvent>();
    let mut app = App::new(&services, event_tx.clone(), picker);
    app.start();

    // Spawn terminal event handler
    let terminal_tx = event_tx.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(TICK_MS));
        loop {
            interval.tick().await;

            // Check for terminal events (non-blocking)
            while event::poll(Duration::from_millis(0)).unwrap_or(false) {
                match event::read() {
                    Ok(event) => {
                        if terminal_tx.send(AppEvent::Terminal(event)).is_err() {
                            return;
                        }
                    }
                    Err(_) => break,
                }
            }

            if terminal_tx.send(AppEvent::Tick).is_err() {
                break;
            }
        }
    });

    // Main application loop
    let result = run(&mut terminal, &mut app, &mut event_rx).await;

    // Cleanup
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = &result {
        error!(error = %e, "Terminal loop failed");
    }
    info!("Exiting");
    result
}

async fn run(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    events: &mut mpsc::UnboundedReceiver<AppEvent>,
) -> Result<(), Box<dyn Error>> {
    while !app.ui.should_quit {
        terminal.draw(|f| ui::ui(f, app))?;

        let Some(event) = events.recv().await else { break };
        app.handle_event(event);
        // Drain whatever else queued up before the next frame
        while let Ok(event) = events.try_recv() {
            app.handle_event(event);
        }
    }
    Ok(())
}
