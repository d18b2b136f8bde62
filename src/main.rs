//! Application entry point for the Vocal Trainer console.
//!
//! # Startup sequence
//!
//! 1. Initialise logging.
//! 2. Load [`AppConfig`] from disk (returns default on first run).
//! 3. Load the breath history from the JSON store.
//! 4. Create [`tokio`] runtime (multi-thread, 2 workers).
//! 5. Spawn the session controller with the cpal capture source.
//! 6. Spawn the console input thread.
//! 7. Loop: forward typed commands to the engine, print published state.

use std::io::{BufReader, Write};
use std::sync::Arc;

use tokio::sync::mpsc;
use vocal_trainer::{
    audio::AudioCapture,
    config::{AppConfig, AppPaths},
    console::{render_history, render_status, CommandReader, ConsoleCommand, HELP},
    engine::{Engine, EngineHandle},
    history::{HistoryStore, JsonFileStore},
};

// ---------------------------------------------------------------------------
// Console loop
// ---------------------------------------------------------------------------

async fn run_console(engine: EngineHandle) -> anyhow::Result<()> {
    let (command_tx, mut command_rx) = mpsc::channel::<ConsoleCommand>(16);
    let _reader = CommandReader::start(BufReader::new(std::io::stdin()), command_tx)?;
    let mut updates = engine.subscribe();

    println!("{HELP}");

    loop {
        tokio::select! {
            command = command_rx.recv() => match command.unwrap_or(ConsoleCommand::Quit) {
                ConsoleCommand::StartBreath => engine.start_breath_session(),
                ConsoleCommand::StartPitch => engine.start_pitch_session(),
                ConsoleCommand::Stop => engine.stop(),
                ConsoleCommand::ShowHistory => {
                    println!("\n{}", render_history(&engine.snapshot().history));
                }
                ConsoleCommand::Help => println!("\n{HELP}"),
                ConsoleCommand::Quit => break,
            },
            changed = updates.changed() => {
                if changed.is_err() {
                    log::warn!("engine stopped unexpectedly");
                    break;
                }
                let (running, line) = {
                    let state = updates.borrow_and_update();
                    (state.session.is_running(), render_status(&state))
                };
                if running {
                    // Redraw in place while a session is live.
                    print!("\r{line:<78}");
                    let _ = std::io::stdout().flush();
                } else {
                    println!("\n{line}");
                }
            }
        }
    }

    println!();
    Ok(())
}

// ---------------------------------------------------------------------------
// main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<()> {
    // 1. Logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    log::info!("Vocal Trainer starting up");

    // 2. Configuration
    let config = AppConfig::load().unwrap_or_else(|e| {
        log::warn!("Failed to load config ({e}); using defaults");
        AppConfig::default()
    });

    // 3. History
    let history_file = config.history.resolve_file(&AppPaths::new());
    let history = HistoryStore::load(Box::new(JsonFileStore::new(&history_file)));
    log::info!(
        "Loaded {} breath results from {}",
        history.len(),
        history_file.display()
    );

    // 4. Tokio runtime (2 worker threads: controller and tickers)
    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    rt.block_on(async move {
        // 5. Session controller.  The microphone is opened per session, so
        //    a missing device only surfaces as a warning on start.
        let capture = Arc::new(AudioCapture::new(config.audio.input_device.clone()));
        let (engine, task) = Engine::spawn(capture, history, &config);

        // 6 + 7. Console
        let result = run_console(engine.clone()).await;

        engine.shutdown();
        if let Err(e) = task.await {
            log::warn!("controller task ended abnormally: {e}");
        }
        result
    })
}
