use crate::{Effect, Msg, ToolSession};

/// Pure update function: applies a message to the session and returns any effects.
pub fn update(mut session: ToolSession, msg: Msg) -> (ToolSession, Vec<Effect>) {
    let effects = match msg {
        Msg::FileLoaded { file, preview } => session.load_file(file, preview),
        Msg::FileLoadFailed { file_name, message } => session.fail_load(&file_name, &message),
        Msg::StartClicked(params) => session.start(params),
        Msg::JobAccepted { generation, job_id } => session.accept_job(generation, job_id),
        Msg::JobRejected {
            generation,
            failure,
        } => {
            session.reject_job(generation, failure);
            Vec::new()
        }
        Msg::JobProgress(event) => {
            session.apply_progress(event);
            Vec::new()
        }
        Msg::JobDone { job_id, outcome } => session.finish_job(job_id, outcome),
        Msg::ErrorDismissed => session.dismiss_error(),
        // Teardown behaves exactly like a reset.
        Msg::ResetClicked | Msg::Unmounted => session.reset(),
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (session, effects)
}
