use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use adjustlog::{
    core::history::{HistoryEngine, HistoryError},
    render::Renderer,
    runtime::{
        events::HistoryEvent,
        handle::{RuntimeConfig, RuntimeError, spawn_history},
    },
    space::ParameterSpace,
    state::ParameterState,
    types::ParameterKey,
};

struct RecordingRenderer {
    frames: Arc<Mutex<Vec<ParameterState>>>,
}

impl Renderer for RecordingRenderer {
    fn render(&mut self, state: &ParameterState) {
        self.frames.lock().expect("lock").push(*state);
    }
}

async fn next_event(sub: &mut tokio::sync::broadcast::Receiver<HistoryEvent>) -> HistoryEvent {
    tokio::time::timeout(Duration::from_secs(1), sub.recv())
        .await
        .expect("event")
        .expect("recv")
}

#[tokio::test]
async fn runtime_save_undo_redo_renders_and_emits_in_order() {
    let space = ParameterSpace::photo();
    let frames = Arc::new(Mutex::new(Vec::new()));
    let renderer = RecordingRenderer {
        frames: Arc::clone(&frames),
    };
    let handle = spawn_history(
        HistoryEngine::new(space.clone()),
        Some(Box::new(renderer)),
        RuntimeConfig::default(),
    );
    let mut sub = handle.subscribe();

    let base = space.default_state();
    let edited = base.with(ParameterKey::Exposure, 1.5);
    assert!(handle.save_state_changes(base, edited, "Exposure").await.expect("save"));
    assert!(handle.can_undo().await.expect("can_undo"));
    assert!(!handle.can_redo().await.expect("can_redo"));

    assert_eq!(handle.undo().await.expect("undo"), base);
    assert_eq!(handle.redo().await.expect("redo"), edited);
    assert_eq!(handle.current_state().await.expect("state"), edited);

    assert_eq!(next_event(&mut sub).await, HistoryEvent::Saved { entries: 1, merged: false });
    assert_eq!(next_event(&mut sub).await, HistoryEvent::UndoApplied { cursor: -1 });
    assert_eq!(next_event(&mut sub).await, HistoryEvent::RedoApplied { cursor: 0 });

    assert_eq!(*frames.lock().expect("lock"), vec![edited, base, edited]);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn runtime_reports_merges_skips_and_exhaustion() {
    let space = ParameterSpace::photo();
    let handle = spawn_history(HistoryEngine::new(space.clone()), None, RuntimeConfig::default());
    let mut sub = handle.subscribe();

    let err = handle.undo().await.expect_err("nothing to undo");
    assert!(matches!(err, RuntimeError::History(HistoryError::NothingToUndo)));

    let base = space.default_state();
    let first = base.with(ParameterKey::Brightness, 0.25);
    let second = first.with(ParameterKey::Brightness, 0.5);
    assert!(handle.save_state_changes(base, first, "Brightness").await.expect("save"));
    assert!(handle.save_state_changes(first, second, "Brightness").await.expect("save"));
    assert!(!handle.save_state_changes(second, second, "noop").await.expect("save"));

    assert_eq!(next_event(&mut sub).await, HistoryEvent::Saved { entries: 1, merged: false });
    assert_eq!(next_event(&mut sub).await, HistoryEvent::Saved { entries: 1, merged: true });
    assert_eq!(next_event(&mut sub).await, HistoryEvent::Skipped);

    let stats = handle.stats().await.expect("stats");
    assert_eq!(stats.entries, 1);
    assert_eq!(stats.merge_count, 1);
    assert_eq!(
        handle.labels().await.expect("labels"),
        vec!["병합: Brightness + Brightness".to_string()]
    );

    assert_eq!(handle.reset().await.expect("reset"), base);
    assert_eq!(next_event(&mut sub).await, HistoryEvent::Reset);
    assert!(!handle.can_undo().await.expect("can_undo"));

    handle.shutdown().await.expect("shutdown");
    assert!(matches!(handle.stats().await, Err(RuntimeError::ChannelClosed)));
}
