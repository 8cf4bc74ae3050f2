use std::io;
use std::sync::{mpsc, Arc};
use std::time::{Duration, Instant};

use bytes::Bytes;
use toolbox_core::{update, Msg, Phase, ToolSession, ToolSpec, ToolViewModel};
use toolbox_engine::Dispatcher;

use super::blobs::BlobStore;
use super::effects::EffectRunner;

/// Owns one tool session and feeds it every message, in order, on the
/// caller's thread.
///
/// Dropping the driver behaves as unmounting the tool.
pub struct SessionDriver {
    session: ToolSession,
    runner: EffectRunner,
    blobs: Arc<BlobStore>,
    msg_rx: mpsc::Receiver<Msg>,
}

impl SessionDriver {
    pub fn new(
        tool: ToolSpec,
        dispatcher: Arc<Dispatcher>,
        blobs: Arc<BlobStore>,
    ) -> io::Result<Self> {
        let (msg_tx, msg_rx) = mpsc::channel();
        let runner = EffectRunner::new(tool, dispatcher, Arc::clone(&blobs), msg_tx)?;
        Ok(Self {
            session: ToolSession::new(),
            runner,
            blobs,
            msg_rx,
        })
    }

    pub fn select(&mut self, name: &str, bytes: impl Into<Bytes>) {
        let msg = self.runner.load_file(name, bytes.into());
        self.dispatch(msg);
    }

    pub fn dispatch(&mut self, msg: Msg) {
        let session = std::mem::take(&mut self.session);
        let (next, effects) = update(session, msg);
        self.session = next;
        self.runner.run(effects);
    }

    /// Applies every message already waiting. Returns how many there were.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(msg) = self.msg_rx.try_recv() {
            self.dispatch(msg);
            applied += 1;
        }
        applied
    }

    /// Applies messages until the session leaves `Processing`. With no
    /// timeout this waits as long as the job takes.
    pub fn settle(&mut self, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        self.pump();
        while self.session.phase() == Phase::Processing {
            let received = match deadline {
                Some(deadline) => self
                    .msg_rx
                    .recv_timeout(deadline.saturating_duration_since(Instant::now()))
                    .ok(),
                None => self.msg_rx.recv().ok(),
            };
            let Some(msg) = received else {
                return false;
            };
            self.dispatch(msg);
        }
        self.pump();
        true
    }

    pub fn session(&self) -> &ToolSession {
        &self.session
    }

    pub fn view(&self) -> ToolViewModel {
        self.session.view()
    }

    /// Bytes behind the current result URL, if the session is complete.
    pub fn result_bytes(&self) -> Option<Bytes> {
        let url = self.view().result_url?;
        self.blobs.get(&url).map(|blob| blob.bytes)
    }
}

impl Drop for SessionDriver {
    fn drop(&mut self) {
        self.dispatch(Msg::Unmounted);
        self.runner.shutdown();
        self.pump();
    }
}
