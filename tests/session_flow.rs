//! End-to-end session tests against a scripted engine.

mod common;

use std::time::Duration;

use assert_matches::assert_matches;
use cf_core::events::EventPayload;
use cf_core::{Error, MediaType};
use cf_feature::Configuration;
use cf_registry::Selection;
use cf_session::{ExecutionState, SessionState, StepStatus};
use common::{Outcome, ScriptedEngine, TestHarness};

fn trim(start: f64, end: f64) -> Configuration {
    let mut cfg = Configuration::new();
    cfg.set("TRIM.START", start).set("TRIM.END", end);
    cfg
}

#[tokio::test]
async fn direct_feature_runs_with_defaults() {
    let harness = TestHarness::new();
    let mut session = harness.session();

    session.select(vec![Selection::new("Features/Grayscale")]).unwrap();
    assert!(session.pending_configuration().unwrap().is_empty());
    session.submit().unwrap();

    let report = session.run(vec![harness.input("clip.mp4")]).await.unwrap();
    assert_eq!(session.state(), SessionState::Succeeded);
    assert!(report.output.path.exists());
    assert_eq!(report.output.media_type, MediaType::Video);

    let calls = harness.engine.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].feature, "Grayscale");
    assert_eq!(calls[0].args, ["-vf", "hue=s=0"]);
}

#[tokio::test]
async fn each_step_consumes_the_previous_output() {
    let harness = TestHarness::new();
    let mut session = harness.session();

    session
        .select(vec![
            Selection::new("Features/Resize"),
            Selection::new("Features/Grayscale"),
        ])
        .unwrap();
    let mut resize = Configuration::new();
    resize.set("RESIZE.WIDTH", 1280).set("RESIZE.HEIGHT", 720);
    session.configure(0, resize).unwrap();
    session.submit().unwrap();

    let input = harness.input("clip.mov");
    let report = session.run(vec![input.clone()]).await.unwrap();

    let calls = harness.engine.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].inputs, [input.path]);
    assert_eq!(calls[0].args, ["-vf", "scale=1280:720"]);
    assert_ne!(calls[1].inputs[0], calls[0].inputs[0]);
    assert_eq!(report.steps.len(), 2);
    assert_eq!(report.steps[1].feature, "Grayscale");
}

#[tokio::test]
async fn workflow_child_needs_its_own_configuration() {
    let harness = TestHarness::new();
    let mut session = harness.session();

    session
        .select(vec![Selection::new("Workflows/Web Ready/Trimmed")])
        .unwrap();
    let pending = session.pending_configuration().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].index, 2);
    assert_eq!(pending[0].entry.key(), "TRIM");

    session.configure(2, trim(1.5, 12.0)).unwrap();
    let pipeline = session.submit().unwrap();
    let names: Vec<&str> = pipeline.steps.iter().map(|s| s.name()).collect();
    assert_eq!(names, ["Compress", "Convert Format", "Trim"]);

    session.run(vec![harness.input("clip.mp4")]).await.unwrap();
    let calls = harness.engine.calls();
    assert_eq!(calls[2].args, ["-ss", "1.5", "-to", "12"]);
    // Convert switches to the mp4 container; the trim step reads that file.
    assert!(calls[2].inputs[0].to_string_lossy().ends_with("step-1.mp4"));
}

#[test]
fn invariant_violation_fails_compilation() {
    let harness = TestHarness::new();
    let mut session = harness.session();

    session.select(vec![Selection::new("Features/Trim")]).unwrap();
    session.configure(0, trim(10.0, 2.0)).unwrap();
    let err = session.submit().unwrap_err();

    assert_matches!(err, Error::InvariantViolation { ref feature, .. } if feature == "Trim");
    assert!(err.is_user_error());
    assert_eq!(session.state(), SessionState::Failed);
    assert!(harness.engine.calls().is_empty());
}

#[tokio::test]
async fn engine_failure_stops_remaining_steps() {
    let harness = TestHarness::with_engine(
        ScriptedEngine::new().at(1, Outcome::Fail("Invalid argument".into())),
    );
    let mut session = harness.session();

    session
        .select(vec![Selection::new("Workflows/Web Ready/Silent")])
        .unwrap();
    session.submit().unwrap();
    let err = session.run(vec![harness.input("clip.mp4")]).await.unwrap_err();

    assert_matches!(err, Error::EngineExecution { step: 1, .. });
    assert!(err.to_string().contains("Invalid argument"));
    assert_eq!(session.state(), SessionState::Failed);
    assert_eq!(harness.engine.calls().len(), 2);
    assert_eq!(session.execution().status(0), Some(StepStatus::Done));
    assert_eq!(session.execution().status(1), Some(StepStatus::Failed));
    assert_eq!(session.execution().status(2), Some(StepStatus::Pending));

    // Only a reset leaves Failed.
    assert_matches!(
        session.select(vec![Selection::new("Features/Grayscale")]),
        Err(Error::InvalidTransition { .. })
    );
    session.select(vec![Selection::new("Clear")]).unwrap();
    assert_eq!(session.state(), SessionState::Idle);
}

#[tokio::test]
async fn audio_into_video_pipeline_is_rejected_before_running() {
    let harness = TestHarness::new();
    let mut session = harness.session();

    session.select(vec![Selection::new("Workflows/Social Square")]).unwrap();
    let mut crop = Configuration::new();
    crop.set("CROP.WIDTH", 1080).set("CROP.HEIGHT", 1080);
    let mut resize = Configuration::new();
    resize.set("RESIZE.WIDTH", 720).set("RESIZE.HEIGHT", 720);
    session.configure(0, crop).unwrap();
    session.configure(1, resize).unwrap();
    session.submit().unwrap();

    let err = session
        .run(vec![harness.input("song.mp3")])
        .await
        .unwrap_err();
    assert_matches!(err, Error::UnsupportedInput { step: 0, ref feature, .. } if feature == "Crop");
    assert!(harness.engine.calls().is_empty());
}

#[tokio::test]
async fn reset_after_success_is_idempotent() {
    let harness = TestHarness::new();
    let mut session = harness.session();

    session.select(vec![Selection::new("Features/Remove Audio")]).unwrap();
    session.submit().unwrap();
    session.run(vec![harness.input("clip.mp4")]).await.unwrap();

    session.reset();
    let first = session.execution().clone();
    session.reset();
    assert_eq!(session.execution(), &first);
    assert_eq!(first, ExecutionState::default());
    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.pipeline().is_none());
}

#[tokio::test]
async fn abort_abandons_the_running_step() {
    let harness = TestHarness::with_engine(ScriptedEngine::new().at(0, Outcome::Hang));
    let mut session = harness.session();

    session.select(vec![Selection::new("Workflows/Web Ready")]).unwrap();
    session.submit().unwrap();

    let handle = session.abort_handle();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(25)).await;
        handle.abort();
    });

    let err = session.run(vec![harness.input("clip.mp4")]).await.unwrap_err();
    assert_matches!(err, Error::Cancelled);
    assert_eq!(session.state(), SessionState::Idle);
    assert_eq!(harness.engine.abandoned(), 1);
    assert_eq!(harness.engine.calls().len(), 1);
}

#[tokio::test]
async fn events_follow_the_run() {
    let harness = TestHarness::new();
    let mut session = harness.session();
    let mut rx = session.events().subscribe();

    session.select(vec![Selection::new("Workflows/Web Ready")]).unwrap();
    session.submit().unwrap();
    session.run(vec![harness.input("clip.mp4")]).await.unwrap();

    let mut kinds = Vec::new();
    while let Ok(event) = rx.try_recv() {
        assert_eq!(event.session, session.id());
        kinds.push(match event.payload {
            EventPayload::StateChanged { to, .. } => format!("state:{to}"),
            EventPayload::Selected { .. } => "selected".into(),
            EventPayload::Compiled { steps } => format!("compiled:{steps}"),
            EventPayload::StepStarted { index, .. } => format!("started:{index}"),
            EventPayload::StepCompleted { index, .. } => format!("completed:{index}"),
            EventPayload::Succeeded { steps } => format!("succeeded:{steps}"),
            other => format!("{other:?}"),
        });
    }
    assert_eq!(
        kinds,
        [
            "selected",
            "state:AwaitingConfiguration",
            "state:Compiling",
            "compiled:2",
            "state:Ready",
            "state:Running",
            "started:0",
            "completed:0",
            "started:1",
            "completed:1",
            "succeeded:2",
            "state:Succeeded",
        ]
    );
}

#[test]
fn sessions_share_one_registry() {
    let harness = TestHarness::new();
    let mut a = harness.session();
    let mut b = harness.session();
    assert_ne!(a.id(), b.id());

    a.select(vec![Selection::new("Features/Grayscale")]).unwrap();
    b.select(vec![Selection::new("Features/Resize")]).unwrap();
    a.submit().unwrap();
    assert_matches!(b.submit(), Err(Error::Configuration { .. }));

    assert_eq!(a.state(), SessionState::Ready);
    assert_eq!(b.state(), SessionState::Failed);
}

#[tokio::test]
async fn concurrent_sessions_keep_their_own_artifacts() {
    let harness = TestHarness::new();
    let mut a = harness.session();
    let mut b = harness.session();
    for session in [&mut a, &mut b] {
        session.select(vec![Selection::new("Workflows/Web Ready")]).unwrap();
        session.submit().unwrap();
    }

    let (ra, rb) = tokio::join!(
        a.run(vec![harness.input("a.mp4")]),
        b.run(vec![harness.input("b.mp4")]),
    );
    let (ra, rb) = (ra.unwrap(), rb.unwrap());
    assert_ne!(ra.output.path, rb.output.path);
    assert!(ra.output.path.exists() && rb.output.path.exists());

    let calls = harness.engine.calls();
    assert_eq!(calls.len(), 4);
    for id in [a.id(), b.id()] {
        let own: Vec<_> = calls.iter().filter(|c| c.session == id).collect();
        assert_eq!(own.len(), 2);
        // The second step reads the first step's output of the same session.
        assert!(own[1].inputs[0].to_string_lossy().contains(&id.to_string()));
    }
}

#[tokio::test]
async fn abort_while_idle_does_not_poison_the_next_run() {
    let harness = TestHarness::new();
    let mut session = harness.session();

    session.abort_handle().abort();
    session.select(vec![Selection::new("Features/Grayscale")]).unwrap();
    session.abort_handle().abort();
    session.submit().unwrap();
    session.abort_handle().abort();

    session.run(vec![harness.input("clip.mp4")]).await.unwrap();
    assert_eq!(session.state(), SessionState::Succeeded);
    assert_eq!(harness.engine.calls().len(), 1);
    assert_eq!(harness.engine.abandoned(), 0);
}
