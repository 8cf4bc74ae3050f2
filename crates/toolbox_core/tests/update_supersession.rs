use std::sync::Once;

use toolbox_core::{
    update, CompletedRun, Effect, Msg, ObjectUrl, OutputFormat, Phase, Preview, ProgressEvent,
    ResultSummary, SelectedFile, Stage, ToolSession, TransformParams,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(toolbox_logging::initialize_for_tests);
}

fn params() -> TransformParams {
    TransformParams::Resize {
        width: 100,
        height: 75,
        format: None,
        quality: 0.92,
    }
}

fn loaded() -> ToolSession {
    let file = SelectedFile::new("photo.png", vec![0u8; 16]);
    let preview = Preview {
        url: ObjectUrl::new("blob:t/1"),
        width: 400,
        height: 300,
    };
    update(ToolSession::new(), Msg::FileLoaded { file, preview }).0
}

fn start(session: ToolSession) -> (ToolSession, u64, Vec<Effect>) {
    let (session, effects) = update(session, Msg::StartClicked(params()));
    let generation = effects
        .iter()
        .find_map(|effect| match effect {
            Effect::StartJob { generation, .. } => Some(*generation),
            _ => None,
        })
        .expect("start effect");
    (session, generation, effects)
}

fn run(url: &str) -> CompletedRun {
    CompletedRun {
        result_url: ObjectUrl::new(url),
        summary: ResultSummary {
            file_name: "photo.png".to_string(),
            mime_type: "image/png".to_string(),
            original_size: 16,
            converted_size: 8,
            width: Some(100),
            height: Some(75),
        },
    }
}

#[test]
fn restart_while_processing_supersedes_active_job() {
    init_logging();
    let (session, first_gen, _) = start(loaded());
    let (session, _) = update(
        session,
        Msg::JobAccepted {
            generation: first_gen,
            job_id: 1,
        },
    );

    let (session, second_gen, effects) = start(session);
    assert_eq!(effects[0], Effect::SupersedeJob { job_id: 1 });
    assert!(second_gen > first_gen);

    let (session, _) = update(
        session,
        Msg::JobAccepted {
            generation: second_gen,
            job_id: 2,
        },
    );
    assert_eq!(session.active_job(), Some(2));

    // Callbacks from job 1 have no effect on the visible state.
    let (session, _) = update(
        session,
        Msg::JobProgress(ProgressEvent::new(1, 95, Stage::Finalizing, "old")),
    );
    assert_eq!(session.view().progress_percent, 0);

    let (session, effects) = update(
        session,
        Msg::JobDone {
            job_id: 1,
            outcome: Ok(run("blob:t/9")),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::RevokeObjectUrl {
            url: ObjectUrl::new("blob:t/9")
        }]
    );
    assert_eq!(session.phase(), Phase::Processing);
    assert!(!session.owns_url(&ObjectUrl::new("blob:t/9")));

    let (session, effects) = update(
        session,
        Msg::JobDone {
            job_id: 2,
            outcome: Ok(run("blob:t/10")),
        },
    );
    assert!(effects.is_empty());
    assert_eq!(session.phase(), Phase::Complete);
    assert_eq!(session.view().result_url, Some(ObjectUrl::new("blob:t/10")));
}

#[test]
fn acceptance_for_stale_generation_is_superseded() {
    init_logging();
    let (session, first_gen, _) = start(loaded());
    let (session, second_gen, effects) = start(session);
    // Nothing active yet, so nothing to supersede up front.
    assert!(matches!(effects.as_slice(), [Effect::StartJob { .. }]));

    let (session, effects) = update(
        session,
        Msg::JobAccepted {
            generation: first_gen,
            job_id: 1,
        },
    );
    assert_eq!(effects, vec![Effect::SupersedeJob { job_id: 1 }]);
    assert_eq!(session.active_job(), None);

    let (session, effects) = update(
        session,
        Msg::JobAccepted {
            generation: second_gen,
            job_id: 2,
        },
    );
    assert!(effects.is_empty());
    assert_eq!(session.active_job(), Some(2));
}

#[test]
fn reset_while_processing_supersedes_and_releases_preview() {
    init_logging();
    let (session, generation, _) = start(loaded());
    let (session, _) = update(session, Msg::JobAccepted { generation, job_id: 4 });

    let (mut session, effects) = update(session, Msg::ResetClicked);
    assert_eq!(
        effects,
        vec![
            Effect::SupersedeJob { job_id: 4 },
            Effect::RevokeObjectUrl {
                url: ObjectUrl::new("blob:t/1")
            },
        ]
    );
    assert_eq!(session.phase(), Phase::Idle);
    assert!(session.file().is_none());
    assert_eq!(session.outstanding_urls(), 0);
    assert!(session.consume_dirty());

    // Late completion of the reset job hands its URL straight back.
    let (session, effects) = update(
        session,
        Msg::JobDone {
            job_id: 4,
            outcome: Ok(run("blob:t/2")),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::RevokeObjectUrl {
            url: ObjectUrl::new("blob:t/2")
        }]
    );
    assert_eq!(session.phase(), Phase::Idle);
}

#[test]
fn reset_is_idempotent() {
    init_logging();
    let session = loaded();
    let (session, first) = update(session, Msg::ResetClicked);
    assert_eq!(first.len(), 1);

    let generation = session.generation();
    let (session, second) = update(session, Msg::ResetClicked);
    assert!(second.is_empty());
    assert_eq!(session.generation(), generation);

    let (session, third) = update(session, Msg::Unmounted);
    assert!(third.is_empty());
    assert_eq!(session.phase(), Phase::Idle);
}

#[test]
fn unmount_after_completion_releases_both_urls() {
    init_logging();
    let (session, generation, _) = start(loaded());
    let (session, _) = update(session, Msg::JobAccepted { generation, job_id: 1 });
    let (session, _) = update(
        session,
        Msg::JobDone {
            job_id: 1,
            outcome: Ok(run("blob:t/2")),
        },
    );
    assert_eq!(session.outstanding_urls(), 2);

    let (session, effects) = update(session, Msg::Unmounted);
    let mut revoked: Vec<_> = effects
        .into_iter()
        .map(|effect| match effect {
            Effect::RevokeObjectUrl { url } => url,
            other => panic!("unexpected effect {other:?}"),
        })
        .collect();
    revoked.sort();
    assert_eq!(
        revoked,
        vec![ObjectUrl::new("blob:t/1"), ObjectUrl::new("blob:t/2")]
    );
    assert_eq!(session.outstanding_urls(), 0);
}

#[test]
fn rejection_for_stale_generation_is_ignored() {
    init_logging();
    let (session, first_gen, _) = start(loaded());
    let (session, _, _) = start(session);
    let (session, _) = update(
        session,
        Msg::JobRejected {
            generation: first_gen,
            failure: toolbox_core::JobFailure::new(
                toolbox_core::ErrorKind::SizeExceeded,
                "too big",
            ),
        },
    );
    assert_eq!(session.phase(), Phase::Processing);
}

#[test]
fn jpeg_target_is_carried_in_start_effect() {
    let session = loaded();
    let params = TransformParams::Convert {
        target: OutputFormat::Jpeg,
        quality: 0.5,
    };
    let (_, effects) = update(session, Msg::StartClicked(params.clone()));
    match &effects[0] {
        Effect::StartJob { params: sent, .. } => assert_eq!(sent, &params),
        other => panic!("unexpected effect {other:?}"),
    }
}
