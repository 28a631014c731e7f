//! Acquisition worker thread.
//!
//! Runs a [`Monitor`] on its own thread, ticking it at the configured sample
//! period. The caller steers it through [`WorkerCommand`]s and receives
//! [`WorkerMessage`]s, both over crossbeam channels.
//!
//! # Rate Limiting
//!
//! The loop sleeps off whatever is left of the tick interval after polling,
//! so the tick rate holds as long as a tick costs less than the period.
//!
//! # Messages
//!
//! Messages never block the loop: when the queue is full they are dropped
//! and counted. Buffer views are sent after creation and after every
//! reset. They share storage with the worker's buffers, so a reader
//! refreshes from them without a round trip through the worker.

use crate::config::MonitorConfig;
use crate::error::{MonitorError, Result};
use crate::sampler::{BufferView, ExportSummary};
use crate::session::monitor::{Monitor, MonitorStats};
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// Commands sent to the worker
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    StartRecording,
    StopRecording,
    /// Export the recording to a path
    Save(PathBuf),
    /// Set (`Some`) or clear (`None`) the sidecar text
    SetSidecar(Option<String>),
    /// Rebuild the samplers with a new config
    Reset(MonitorConfig),
    RequestStats,
    Shutdown,
}

/// Messages sent by the worker
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    RecordingState(bool),
    Saved(ExportSummary),
    /// Fresh buffer views; earlier views no longer receive samples
    Views {
        live: Vec<BufferView>,
        record: Vec<BufferView>,
    },
    Stats(MonitorStats),
    Error(String),
    Shutdown,
}

/// Interval between periodic stats messages
const STATS_INTERVAL: Duration = Duration::from_millis(500);

/// The loop that owns the monitor
pub struct MonitorWorker {
    monitor: Monitor,
    command_rx: Receiver<WorkerCommand>,
    message_tx: Sender<WorkerMessage>,
    running: Arc<AtomicBool>,
    tick_interval: Duration,
    last_tick: Instant,
    last_stats: Instant,
    dropped_messages: u64,
}

impl MonitorWorker {
    /// Spawn a worker thread for `monitor`
    pub fn spawn(monitor: Monitor) -> Result<WorkerHandle> {
        let tick_interval = monitor.config().tick_interval()?;
        let (cmd_tx, cmd_rx) = bounded(256);
        let (msg_tx, msg_rx) = bounded(1024);
        let running = Arc::new(AtomicBool::new(true));

        let worker = MonitorWorker {
            tick_interval,
            monitor,
            command_rx: cmd_rx,
            message_tx: msg_tx,
            running: running.clone(),
            last_tick: Instant::now(),
            last_stats: Instant::now(),
            dropped_messages: 0,
        };

        let thread = std::thread::Builder::new()
            .name("datamon-worker".to_string())
            .spawn(move || worker.run())
            .map_err(|e| MonitorError::Io(e).with_context("Failed to spawn worker thread"))?;

        Ok(WorkerHandle {
            command_tx: cmd_tx,
            message_rx: msg_rx,
            running,
            thread: Some(thread),
        })
    }

    /// Run until shut down, then hand the monitor back
    fn run(mut self) -> Monitor {
        tracing::info!("Monitor worker started");
        self.send_views();

        while self.running.load(Ordering::SeqCst) {
            self.process_commands();
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            self.monitor.tick();

            if self.last_stats.elapsed() >= STATS_INTERVAL {
                self.send(WorkerMessage::Stats(self.monitor.stats().clone()));
                self.last_stats = Instant::now();
            }

            self.rate_limit();
        }

        if self.dropped_messages > 0 {
            tracing::warn!("Monitor worker dropped {} message(s)", self.dropped_messages);
        }
        let _ = self.message_tx.try_send(WorkerMessage::Shutdown);
        tracing::info!("Monitor worker stopped");
        self.monitor
    }

    fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    fn handle_command(&mut self, cmd: WorkerCommand) {
        match cmd {
            WorkerCommand::StartRecording => {
                self.monitor.start_recording();
                self.send(WorkerMessage::RecordingState(true));
            }
            WorkerCommand::StopRecording => {
                self.monitor.stop_recording();
                self.send(WorkerMessage::RecordingState(false));
            }
            WorkerCommand::Save(path) => {
                let was_recording = self.monitor.is_recording();
                match self.monitor.save(&path) {
                    Ok(summary) => self.send(WorkerMessage::Saved(summary)),
                    Err(e) => {
                        tracing::error!("Save to {:?} failed: {}", path, e);
                        self.send(WorkerMessage::Error(e.to_string()));
                    }
                }
                if was_recording {
                    self.send(WorkerMessage::RecordingState(false));
                }
            }
            WorkerCommand::SetSidecar(Some(text)) => self.monitor.set_sidecar_text(text),
            WorkerCommand::SetSidecar(None) => self.monitor.clear_sidecar_text(),
            WorkerCommand::Reset(config) => {
                match self
                    .monitor
                    .reset(config)
                    .and_then(|()| self.monitor.config().tick_interval())
                {
                    Ok(tick_interval) => {
                        self.tick_interval = tick_interval;
                        self.send(WorkerMessage::RecordingState(false));
                        self.send_views();
                    }
                    Err(e) => {
                        tracing::error!("Reset failed: {}", e);
                        self.send(WorkerMessage::Error(e.to_string()));
                    }
                }
            }
            WorkerCommand::RequestStats => {
                self.send(WorkerMessage::Stats(self.monitor.stats().clone()));
            }
            WorkerCommand::Shutdown => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    fn send_views(&mut self) {
        self.send(WorkerMessage::Views {
            live: self.monitor.live_views(),
            record: self.monitor.record_views(),
        });
    }

    /// Send a message, dropping it if the queue is full
    fn send(&mut self, msg: WorkerMessage) {
        if self.message_tx.try_send(msg).is_err() {
            self.dropped_messages += 1;
        }
    }

    fn rate_limit(&mut self) {
        let elapsed = self.last_tick.elapsed();
        if elapsed < self.tick_interval {
            std::thread::sleep(self.tick_interval - elapsed);
        }
        self.last_tick = Instant::now();
    }
}

/// Caller side of a running [`MonitorWorker`]
pub struct WorkerHandle {
    command_tx: Sender<WorkerCommand>,
    message_rx: Receiver<WorkerMessage>,
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<Monitor>>,
}

impl WorkerHandle {
    pub fn send_command(&self, cmd: WorkerCommand) -> Result<()> {
        self.command_tx
            .send(cmd)
            .map_err(|e| MonitorError::Channel(format!("worker gone: {:?}", e.0)))
    }

    pub fn start_recording(&self) -> Result<()> {
        self.send_command(WorkerCommand::StartRecording)
    }

    pub fn stop_recording(&self) -> Result<()> {
        self.send_command(WorkerCommand::StopRecording)
    }

    pub fn save(&self, path: impl Into<PathBuf>) -> Result<()> {
        self.send_command(WorkerCommand::Save(path.into()))
    }

    pub fn set_sidecar(&self, text: Option<String>) -> Result<()> {
        self.send_command(WorkerCommand::SetSidecar(text))
    }

    pub fn reset(&self, config: MonitorConfig) -> Result<()> {
        self.send_command(WorkerCommand::Reset(config))
    }

    pub fn request_stats(&self) -> Result<()> {
        self.send_command(WorkerCommand::RequestStats)
    }

    pub fn try_recv(&self) -> Option<WorkerMessage> {
        self.message_rx.try_recv().ok()
    }

    /// Wait up to `timeout` for the next message
    pub fn recv_timeout(&self, timeout: Duration) -> Option<WorkerMessage> {
        self.message_rx.recv_timeout(timeout).ok()
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<WorkerMessage> {
        self.message_rx.try_iter().collect()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Stop the worker and take the monitor back. Returns `None` if the
    /// worker thread panicked.
    pub fn shutdown(mut self) -> Option<Monitor> {
        self.stop_and_join()
    }

    fn stop_and_join(&mut self) -> Option<Monitor> {
        let thread = self.thread.take()?;
        let _ = self.command_tx.send(WorkerCommand::Shutdown);
        self.running.store(false, Ordering::SeqCst);
        match thread.join() {
            Ok(monitor) => Some(monitor),
            Err(_) => {
                tracing::error!("Monitor worker panicked");
                None
            }
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.stop_and_join();
    }
}
