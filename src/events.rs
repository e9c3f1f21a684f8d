//! Event types and the main event loop driver for the coffee finder.
//!
//! This module defines the [`Event`] enum (keyboard input, ticks and pipeline
//! updates) and the [`EventHandler`], which runs a background task that polls
//! crossterm for key events and emits periodic [`Event::Tick`]s. Pipeline
//! sessions post their inputs through [`EventHandler::pipeline_sender`].

use crate::pipeline::PipelineUpdate;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::error;

/// Events processed by the application event loop.
pub enum Event {
    /// Periodic tick used for the loading spinner.
    Tick,
    /// User key press from the terminal.
    Input(KeyEvent),
    /// An input (or failure) from a ranking pipeline session.
    Pipeline(PipelineUpdate),
}

/// Multiplexes terminal input, ticks and pipeline updates into one stream.
///
/// The sender ([`tx`](EventHandler::tx)) can be cloned and handed to other
/// tasks, while the receiver is consumed by [`next`](EventHandler::next) in
/// the main loop.
pub struct EventHandler {
    pub tx: mpsc::UnboundedSender<Event>,
    rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
    /// Creates a new event handler and spawns the input/tick task.
    ///
    /// The task polls crossterm with a timeout of `tick_rate_ms`; key presses
    /// become [`Event::Input`] and every elapsed interval an [`Event::Tick`].
    /// If the terminal stops answering the task logs the error and exits;
    /// [`next`](EventHandler::next) keeps serving the remaining senders.
    pub fn new(tick_rate_ms: u64) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_tx = tx.clone();

        tokio::spawn(async move {
            let tick_rate = Duration::from_millis(tick_rate_ms);
            let mut last_tick = Instant::now();
            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or(Duration::from_secs(0));
                match event::poll(timeout) {
                    Ok(true) => match event::read() {
                        Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
                            if event_tx.send(Event::Input(key)).is_err() {
                                break;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            error!("Terminal read failed: {}", e);
                            break;
                        }
                    },
                    Ok(false) => {}
                    Err(e) => {
                        error!("Terminal poll failed: {}", e);
                        break;
                    }
                }
                if last_tick.elapsed() >= tick_rate {
                    if event_tx.send(Event::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });

        Self { tx, rx }
    }

    /// A sender for pipeline sessions. Updates are forwarded into the event
    /// stream as [`Event::Pipeline`] until the event loop goes away.
    pub fn pipeline_sender(&self) -> mpsc::UnboundedSender<PipelineUpdate> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let events = self.tx.clone();
        tokio::spawn(async move {
            while let Some(update) = rx.recv().await {
                if events.send(Event::Pipeline(update)).is_err() {
                    break;
                }
            }
        });
        tx
    }

    /// Receives the next event from the channel.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}
