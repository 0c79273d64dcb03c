use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossterm::event::{self, Event, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc;

use spanscope::RenderConfig;
use spanscope_store::TraceStore;

use crate::app::App;
use crate::ui;

/// Polling cadence for keyboard events
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// How often the trace list is re-read so expired traces disappear
const LIST_REFRESH_INTERVAL: Duration = Duration::from_secs(5);

/// Set up the terminal, run the interactive loop, and restore the terminal
/// on exit, even when the loop fails.
pub async fn run(
    store: Arc<TraceStore>,
    config: RenderConfig,
    initial_trace: Option<String>,
) -> anyhow::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.hide_cursor()?;

    let result = event_loop(&mut terminal, store, config, initial_trace).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    store: Arc<TraceStore>,
    config: RenderConfig,
    initial_trace: Option<String>,
) -> anyhow::Result<()> {
    let (mut app, mut outcomes) = App::new(store, config);
    if let Some(trace_id) = initial_trace {
        app.open_trace(trace_id);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let (key_tx, mut keys) = mpsc::unbounded_channel();
    let input = tokio::task::spawn_blocking({
        let stop = Arc::clone(&stop);
        move || read_input(key_tx, stop)
    });
    // Stops the reader on every exit, including a failed draw
    let stop_guard = StopOnDrop(stop);

    let mut refresh = tokio::time::interval(LIST_REFRESH_INTERVAL);
    let mut dirty = true;

    loop {
        if dirty {
            terminal.draw(|frame| ui::render(frame, &mut app))?;
            dirty = false;
        }
        if app.should_quit {
            break;
        }

        tokio::select! {
            Some(event) = keys.recv() => {
                match event {
                    Event::Key(key) if key.kind == KeyEventKind::Press => {
                        dirty = app.handle_key(key);
                    }
                    Event::Resize(_, _) => dirty = true,
                    _ => {}
                }
            }
            Some(outcome) = outcomes.recv() => {
                app.on_fetch(outcome);
                dirty = true;
            }
            _ = refresh.tick() => {
                app.refresh_traces();
                dirty = true;
            }
        }
    }

    drop(stop_guard);
    input.await??;
    Ok(())
}

/// Raises the reader's stop flag when dropped
struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

/// Blocking reader forwarding terminal events until asked to stop
fn read_input(tx: mpsc::UnboundedSender<Event>, stop: Arc<AtomicBool>) -> anyhow::Result<()> {
    while !stop.load(Ordering::Relaxed) {
        if event::poll(POLL_INTERVAL)? {
            let event = event::read()?;
            if tx.send(event).is_err() {
                break;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_flag_is_raised_on_early_return() {
        fn failing_loop(stop: Arc<AtomicBool>) -> anyhow::Result<()> {
            let _guard = StopOnDrop(stop);
            anyhow::bail!("draw failed")
        }

        let stop = Arc::new(AtomicBool::new(false));
        assert!(failing_loop(Arc::clone(&stop)).is_err());
        assert!(stop.load(Ordering::Relaxed));
    }

    #[test]
    fn stop_flag_stays_down_while_guard_lives() {
        let stop = Arc::new(AtomicBool::new(false));
        let guard = StopOnDrop(Arc::clone(&stop));
        assert!(!stop.load(Ordering::Relaxed));
        drop(guard);
        assert!(stop.load(Ordering::Relaxed));
    }
}
