use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, warn};

use crate::{
    core::{
        history::{HistoryEngine, HistoryError, HistoryStats},
        sequence::Delta,
    },
    render::Renderer,
    state::ParameterState,
};

use super::events::HistoryEvent;

/// Errors returned through a [`HistoryHandle`].
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The engine refused the command.
    #[error(transparent)]
    History(#[from] HistoryError),
    /// The runtime task has stopped.
    #[error("history runtime channel closed")]
    ChannelClosed,
}

/// Channel sizing for [`spawn_history`].
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Commands buffered before senders wait.
    pub command_queue_bound: usize,
    /// Events retained for lagging subscribers.
    pub event_buffer: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_queue_bound: 256,
            event_buffer: 1024,
        }
    }
}

/// Cloneable handle to a history engine owned by one runtime task.
///
/// Every command is processed in arrival order, so the engine's
/// log, cursor, and cache are always observed together.
pub struct HistoryHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<HistoryEvent>,
}

impl Clone for HistoryHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
        }
    }
}

enum Command {
    Save {
        delta: Delta,
        resp: oneshot::Sender<ParameterState>,
    },
    SaveChanges {
        old: ParameterState,
        new: ParameterState,
        label: String,
        resp: oneshot::Sender<bool>,
    },
    Undo {
        resp: oneshot::Sender<Result<ParameterState, RuntimeError>>,
    },
    Redo {
        resp: oneshot::Sender<Result<ParameterState, RuntimeError>>,
    },
    CurrentState {
        resp: oneshot::Sender<ParameterState>,
    },
    Stats {
        resp: oneshot::Sender<HistoryStats>,
    },
    Labels {
        resp: oneshot::Sender<Vec<String>>,
    },
    Reset {
        resp: oneshot::Sender<ParameterState>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Moves `engine` into a new task and returns a handle to it.
pub fn spawn_history(
    engine: HistoryEngine,
    renderer: Option<Box<dyn Renderer>>,
    config: RuntimeConfig,
) -> HistoryHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<HistoryEvent>(config.event_buffer.max(1));

    let events_tx_loop = events_tx.clone();

    tokio::spawn(async move {
        let mut engine = engine;
        let mut renderer = renderer;

        while let Some(cmd) = cmd_rx.recv().await {
            let done = handle_command(cmd, &mut engine, renderer.as_deref_mut(), &events_tx_loop);
            if done {
                break;
            }
        }
        debug!("history runtime stopped");
    });

    HistoryHandle { cmd_tx, events_tx }
}

impl HistoryHandle {
    /// Receives every [`HistoryEvent`] published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<HistoryEvent> {
        self.events_tx.subscribe()
    }

    /// Saves `delta` and returns the state it produced.
    pub async fn save(&self, delta: Delta) -> Result<ParameterState, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Save { delta, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Diffs and saves; resolves to false when nothing changed.
    pub async fn save_state_changes(
        &self,
        old: ParameterState,
        new: ParameterState,
        label: impl Into<String>,
    ) -> Result<bool, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SaveChanges {
                old,
                new,
                label: label.into(),
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Steps back one entry.
    pub async fn undo(&self) -> Result<ParameterState, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Undo { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Steps forward one entry.
    pub async fn redo(&self) -> Result<ParameterState, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Redo { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// State at the cursor.
    pub async fn current_state(&self) -> Result<ParameterState, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::CurrentState { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Snapshot of engine counters.
    pub async fn stats(&self) -> Result<HistoryStats, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Stats { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Whether an undo would succeed right now.
    pub async fn can_undo(&self) -> Result<bool, RuntimeError> {
        Ok(self.stats().await?.can_undo)
    }

    /// Whether a redo would succeed right now.
    pub async fn can_redo(&self) -> Result<bool, RuntimeError> {
        Ok(self.stats().await?.can_redo)
    }

    /// Entry labels, oldest first.
    pub async fn labels(&self) -> Result<Vec<String>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Labels { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Clears the log and returns the defaults.
    pub async fn reset(&self) -> Result<ParameterState, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Reset { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Stops the runtime task once queued commands are handled.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

fn handle_command(
    cmd: Command,
    engine: &mut HistoryEngine,
    renderer: Option<&mut (dyn Renderer + 'static)>,
    events_tx: &broadcast::Sender<HistoryEvent>,
) -> bool {
    match cmd {
        Command::Save { delta, resp } => {
            let merges_before = engine.stats().merge_count;
            engine.save(delta);
            let state = publish_saved(engine, merges_before, renderer, events_tx);
            let _ = resp.send(state);
        }
        Command::SaveChanges {
            old,
            new,
            label,
            resp,
        } => {
            let merges_before = engine.stats().merge_count;
            let saved = engine.save_state_changes(&old, &new, label);
            if saved {
                publish_saved(engine, merges_before, renderer, events_tx);
            } else {
                let _ = events_tx.send(HistoryEvent::Skipped);
            }
            let _ = resp.send(saved);
        }
        Command::Undo { resp } => {
            let res = engine.undo().map_err(RuntimeError::from);
            match &res {
                Ok(state) => {
                    render(renderer, state);
                    let _ = events_tx.send(HistoryEvent::UndoApplied {
                        cursor: engine.cursor(),
                    });
                }
                Err(err) => warn!(%err, "undo rejected"),
            }
            let _ = resp.send(res);
        }
        Command::Redo { resp } => {
            let res = engine.redo().map_err(RuntimeError::from);
            match &res {
                Ok(state) => {
                    render(renderer, state);
                    let _ = events_tx.send(HistoryEvent::RedoApplied {
                        cursor: engine.cursor(),
                    });
                }
                Err(err) => warn!(%err, "redo rejected"),
            }
            let _ = resp.send(res);
        }
        Command::CurrentState { resp } => {
            let _ = resp.send(engine.current_state());
        }
        Command::Stats { resp } => {
            let _ = resp.send(engine.stats());
        }
        Command::Labels { resp } => {
            let labels = engine.labels().into_iter().map(str::to_string).collect();
            let _ = resp.send(labels);
        }
        Command::Reset { resp } => {
            engine.reset();
            let state = engine.current_state();
            render(renderer, &state);
            let _ = events_tx.send(HistoryEvent::Reset);
            let _ = resp.send(state);
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(());
            return true;
        }
    }

    false
}

fn publish_saved(
    engine: &mut HistoryEngine,
    merges_before: u64,
    renderer: Option<&mut (dyn Renderer + 'static)>,
    events_tx: &broadcast::Sender<HistoryEvent>,
) -> ParameterState {
    let state = engine.current_state();
    render(renderer, &state);
    let stats = engine.stats();
    let _ = events_tx.send(HistoryEvent::Saved {
        entries: stats.entries,
        merged: stats.merge_count > merges_before,
    });
    state
}

fn render(renderer: Option<&mut (dyn Renderer + 'static)>, state: &ParameterState) {
    if let Some(renderer) = renderer {
        renderer.render(state);
    }
}
