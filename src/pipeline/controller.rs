//! Pipeline controller
//!
//! `begin(key)` opens the planner stream for a page and returns the [`DisposeHandle`] that
//! owns the session. Each stream is pumped by its own tokio task that forwards events into
//! the session core through a `Weak` reference; disposal aborts those tasks and flips the
//! core's latch so nothing arriving later can change state.

use crate::error::PipelineError;
use crate::layout::LayoutDocument;
use crate::pipeline::content::{ContentLauncher, ContentState, StreamHandle};
use crate::pipeline::session::{PipelineCore, PlannerStatus};
use crate::source::StreamSource;
use crate::stream::{ContentRequest, EventStream, StreamEvent};
use futures::StreamExt;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(1);

type SharedCore = Arc<Mutex<PipelineCore>>;
type WeakCore = Weak<Mutex<PipelineCore>>;

/// Handle to a spawned pump task; closing aborts it, which drops the underlying stream.
pub struct TaskHandle {
    task: Option<JoinHandle<()>>,
}

impl TaskHandle {
    fn new(task: JoinHandle<()>) -> Self {
        Self { task: Some(task) }
    }
}

impl StreamHandle for TaskHandle {
    fn close(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Launches content streams as tokio tasks feeding back into the session core.
struct SpawnLauncher {
    runtime: Handle,
    source: Arc<dyn StreamSource>,
    core: WeakCore,
}

impl ContentLauncher for SpawnLauncher {
    fn launch(&mut self, request: ContentRequest) -> Box<dyn StreamHandle> {
        let source = Arc::clone(&self.source);
        let core = self.core.clone();
        let task = self.runtime.spawn(async move {
            let entity_id = request.entity_id.clone();
            let opened = source.open_content(&request).await;
            pump(core, opened, move |core, event| {
                core.on_content_event(&entity_id, event)
            })
            .await;
        });
        Box::new(TaskHandle::new(task))
    }
}

fn spawn_planner(
    runtime: &Handle,
    source: Arc<dyn StreamSource>,
    core: WeakCore,
    topic: String,
) -> TaskHandle {
    let task = runtime.spawn(async move {
        let opened = source.open_planner(&topic).await;
        pump(core, opened, |core, event| core.on_planner_event(event)).await;
    });
    TaskHandle::new(task)
}

/// Forward every event of one stream into the core until a terminal event.
///
/// A stream that ends without a terminal event is treated as done. A failed open is
/// delivered as an error event.
async fn pump<F>(core: WeakCore, opened: Result<EventStream, PipelineError>, mut deliver: F)
where
    F: FnMut(&mut PipelineCore, StreamEvent) + Send,
{
    let mut stream = match opened {
        Ok(stream) => stream,
        Err(err) => {
            if let Some(strong) = core.upgrade() {
                deliver(&mut strong.lock(), StreamEvent::Error(err.to_string()));
            }
            return;
        }
    };

    loop {
        let event = stream.next().await.unwrap_or(StreamEvent::Done);
        let terminal = event.is_terminal();
        let Some(strong) = core.upgrade() else {
            return;
        };
        deliver(&mut strong.lock(), event);
        if terminal {
            return;
        }
    }
}

/// Read-only view of one session for a rendering layer.
#[derive(Clone)]
pub struct PageView {
    core: SharedCore,
}

impl PageView {
    pub fn current_layout(&self) -> Arc<LayoutDocument> {
        self.core.lock().layout()
    }

    pub fn content_state(&self, entity_id: &str) -> Option<ContentState> {
        self.core.lock().content_state(entity_id)
    }

    /// Every dispatched entity's content, in dispatch order.
    pub fn content_states(&self) -> Vec<(String, ContentState)> {
        self.core.lock().content_states()
    }

    pub fn is_pipeline_active(&self) -> bool {
        self.core.lock().is_active()
    }

    pub fn planner_status(&self) -> PlannerStatus {
        self.core.lock().planner_status()
    }

    pub fn topic(&self) -> String {
        self.core.lock().topic().to_string()
    }

    /// Revision counter, bumped on every observable change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.core.lock().subscribe()
    }

    /// Wait until the planner and every content stream reached a terminal state, or the
    /// session was disposed.
    pub async fn wait_until_settled(&self, timeout: Duration) -> Result<(), PipelineError> {
        let mut revisions = self.subscribe();
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if !self.is_pipeline_active() {
                return Ok(());
            }
            match tokio::time::timeout_at(deadline, revisions.changed()).await {
                Ok(Ok(())) => continue,
                Ok(Err(_)) => return Ok(()),
                Err(_) => return Err(PipelineError::Timeout(timeout)),
            }
        }
    }
}

/// Owner of one session. Cloning shares the session; `dispose` on any clone tears it down.
#[derive(Clone)]
pub struct DisposeHandle {
    key: Arc<str>,
    session_id: u64,
    core: SharedCore,
}

impl DisposeHandle {
    /// Close the planner and every content stream, and clear all session state.
    ///
    /// Safe to call any number of times; only the first call does anything.
    pub fn dispose(&self) {
        let released = self.core.lock().dispose();
        if released {
            info!(key = %self.key, session_id = self.session_id, "Session disposed");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.core.lock().is_disposed()
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    pub fn view(&self) -> PageView {
        PageView {
            core: Arc::clone(&self.core),
        }
    }
}

impl std::fmt::Debug for DisposeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisposeHandle")
            .field("key", &self.key)
            .field("session_id", &self.session_id)
            .finish()
    }
}

/// Starts sessions and keeps at most one live at a time.
pub struct PipelineController {
    source: Arc<dyn StreamSource>,
    active: Mutex<Option<DisposeHandle>>,
}

impl PipelineController {
    pub fn new(source: Arc<dyn StreamSource>) -> Self {
        Self {
            source,
            active: Mutex::new(None),
        }
    }

    /// Begin generating the page for `key`.
    ///
    /// Calling again for the same key while that session is live returns the same session
    /// rather than opening a second planner stream. A different key disposes the live
    /// session first. Must be called from within a tokio runtime.
    pub fn begin(&self, key: &str) -> Result<DisposeHandle, PipelineError> {
        let mut active = self.active.lock();
        if let Some(current) = active.as_ref() {
            if !current.is_disposed() {
                if current.key() == key {
                    debug!(key, session_id = current.session_id(), "Session already started");
                    return Ok(current.clone());
                }
                current.dispose();
            }
        }

        let runtime =
            Handle::try_current().map_err(|e| PipelineError::RuntimeUnavailable(e.to_string()))?;
        let session_id = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);

        let source = Arc::clone(&self.source);
        let launcher_runtime = runtime.clone();
        let core: SharedCore = Arc::new_cyclic(|weak| {
            let launcher = SpawnLauncher {
                runtime: launcher_runtime,
                source,
                core: weak.clone(),
            };
            Mutex::new(PipelineCore::new(key, Box::new(launcher)))
        });

        {
            // The planner task cannot deliver before the handle is attached.
            let mut guard = core.lock();
            let planner = spawn_planner(
                &runtime,
                Arc::clone(&self.source),
                Arc::downgrade(&core),
                key.to_string(),
            );
            guard.attach_planner(Box::new(planner));
        }

        info!(key, session_id, "Session started");
        let handle = DisposeHandle {
            key: Arc::from(key),
            session_id,
            core,
        };
        *active = Some(handle.clone());
        Ok(handle)
    }

    /// The live session, if any.
    pub fn current(&self) -> Option<DisposeHandle> {
        self.active
            .lock()
            .as_ref()
            .filter(|handle| !handle.is_disposed())
            .cloned()
    }

    /// Dispose the live session, if any.
    pub fn dispose_active(&self) {
        if let Some(handle) = self.active.lock().take() {
            handle.dispose();
        }
    }
}
