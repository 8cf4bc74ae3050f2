use crate::{ObjectUrl, Phase, SessionState, Stage, ToolSession};

/// Render-ready snapshot of a tool session.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ToolViewModel {
    pub phase: Phase,
    pub file_name: Option<String>,
    pub preview_url: Option<ObjectUrl>,
    pub preview_size: Option<(u32, u32)>,
    pub result_url: Option<ObjectUrl>,
    pub download_name: Option<String>,
    pub mime_type: Option<String>,
    pub original_size: Option<u64>,
    pub converted_size: Option<u64>,
    pub output_size: Option<(u32, u32)>,
    pub progress_percent: u8,
    pub stage: Option<Stage>,
    pub status: String,
    pub error: Option<String>,
    pub can_start: bool,
    pub dirty: bool,
}

impl ToolViewModel {
    pub(crate) fn from_session(session: &ToolSession) -> Self {
        let state = session.state();
        let preview = state.preview();
        let mut view = ToolViewModel {
            phase: state.phase(),
            file_name: session.file().map(|file| file.name.clone()),
            preview_url: preview.map(|p| p.url.clone()),
            preview_size: preview.map(|p| (p.width, p.height)),
            can_start: session.file().is_some() && preview.is_some(),
            dirty: session.is_dirty(),
            ..ToolViewModel::default()
        };

        match state {
            SessionState::Idle => view.status = "Select a file".to_string(),
            SessionState::Loaded { .. } => view.status = "Ready".to_string(),
            SessionState::Processing { progress, .. } => {
                view.progress_percent = progress.percent;
                view.stage = progress.stage;
                view.status = progress.message.clone();
            }
            SessionState::Complete { run, .. } => {
                let summary = &run.summary;
                view.progress_percent = 100;
                view.result_url = Some(run.result_url.clone());
                view.download_name = Some(summary.file_name.clone());
                view.mime_type = Some(summary.mime_type.clone());
                view.original_size = Some(summary.original_size);
                view.converted_size = Some(summary.converted_size);
                view.output_size = summary.width.zip(summary.height);
                view.status = "Done".to_string();
            }
            SessionState::Error { message, .. } => {
                view.error = Some(message.clone());
                view.status = "Failed".to_string();
            }
        }
        view
    }

    /// Size change of the result relative to the input, as a percentage.
    /// Negative when the output grew.
    pub fn savings_percent(&self) -> Option<f64> {
        let original = self.original_size? as f64;
        let converted = self.converted_size? as f64;
        if original == 0.0 {
            return None;
        }
        Some((original - converted) / original * 100.0)
    }
}
