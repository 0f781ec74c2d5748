//! Automation sessions: one spawned task per workflow owns its controller.
//!
//! Callers hold a `SessionHandle` and interact only through intent messages
//! (mpsc, answered on a oneshot) and the latest published snapshot (watch).
//! Because a single task drives the controller, intents are applied strictly
//! one at a time and no two backend calls of a session are ever in flight.
//! A session left without requests for the registry's idle timeout ends its
//! task and drops out of the registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot, watch, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::orchestrator::controller::{
    AutomationSnapshot, OrchestrationController, OrchestratorError,
};
use crate::orchestrator::stage::AutomationStage;

/// Bounded so a misbehaving client cannot queue unbounded work.
const INTENT_BUFFER: usize = 32;

const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Requests a presentation layer may make of a session.
#[derive(Debug)]
pub enum Intent {
    Initialize,
    SubmitResume { filename: String, resume: Bytes },
    StartSearch,
    ToggleSelection { apply_url: String },
    SelectAll,
    ClearSelection,
    StartApply,
    Cancel,
}

impl Intent {
    /// Wording used in `InvalidTransition` errors.
    fn action(&self) -> &'static str {
        match self {
            Intent::Initialize => "check the automation backend",
            Intent::SubmitResume { .. } => "analyze a resume",
            Intent::StartSearch => "search for jobs",
            Intent::ToggleSelection { .. } | Intent::SelectAll | Intent::ClearSelection => {
                "change the selection"
            }
            Intent::StartApply => "start applying",
            Intent::Cancel => "cancel",
        }
    }
}

type Reply = oneshot::Sender<Result<AutomationSnapshot, OrchestratorError>>;

struct Envelope {
    intent: Intent,
    reply: Reply,
}

#[derive(Clone)]
pub struct SessionHandle {
    user_id: Uuid,
    intents: mpsc::Sender<Envelope>,
    snapshots: watch::Receiver<AutomationSnapshot>,
}

impl SessionHandle {
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Delivers `intent` and waits for the controller's answer. `StartApply`
    /// is answered once the batch has started, not when it finishes.
    pub async fn send(&self, intent: Intent) -> Result<AutomationSnapshot, OrchestratorError> {
        let (reply, answer) = oneshot::channel();
        self.intents
            .send(Envelope { intent, reply })
            .await
            .map_err(|_| OrchestratorError::SessionClosed)?;
        answer.await.map_err(|_| OrchestratorError::SessionClosed)?
    }

    pub fn snapshot(&self) -> AutomationSnapshot {
        self.snapshots.borrow().clone()
    }

    #[cfg(test)]
    pub fn subscribe(&self) -> watch::Receiver<AutomationSnapshot> {
        self.snapshots.clone()
    }
}

async fn dispatch(
    controller: &mut OrchestrationController,
    intent: Intent,
) -> Result<AutomationSnapshot, OrchestratorError> {
    match intent {
        Intent::Initialize => controller.initialize().await,
        Intent::SubmitResume { filename, resume } => {
            controller.submit_resume(filename, resume).await
        }
        Intent::StartSearch => controller.search().await,
        Intent::ToggleSelection { apply_url } => controller.toggle_selection(&apply_url),
        Intent::SelectAll => controller.select_all(),
        Intent::ClearSelection => controller.clear_selection(),
        Intent::StartApply => controller.begin_apply(),
        Intent::Cancel => controller.cancel(),
    }
}

/// Runs the frozen batch to completion. Intents arriving meanwhile are
/// refused immediately; none of them is valid while applying.
async fn run_batch(
    controller: &mut OrchestrationController,
    inbox: &mut mpsc::Receiver<Envelope>,
    user_id: Uuid,
) {
    let batch = controller.run_apply();
    tokio::pin!(batch);

    loop {
        tokio::select! {
            finished = &mut batch => {
                if let Err(e) = finished {
                    warn!("Application batch for user {user_id} did not run: {e}");
                }
                return;
            }
            Some(Envelope { intent, reply }) = inbox.recv() => {
                debug!(
                    "Refusing to {} for user {user_id}: batch in progress",
                    intent.action()
                );
                let refused = OrchestratorError::InvalidTransition {
                    stage: AutomationStage::Applying,
                    intent: intent.action(),
                };
                let _ = reply.send(Err(refused));
            }
        }
    }
}

async fn run_session(
    mut controller: OrchestrationController,
    mut inbox: mpsc::Receiver<Envelope>,
    user_id: Uuid,
    idle_timeout: Duration,
) {
    loop {
        let Envelope { intent, reply } =
            match tokio::time::timeout(idle_timeout, inbox.recv()).await {
                Ok(Some(envelope)) => envelope,
                Ok(None) => break,
                Err(_) => {
                    info!(
                        "Closing idle automation session for user {user_id} at stage {}",
                        controller.stage()
                    );
                    break;
                }
            };

        let starts_batch = matches!(intent, Intent::StartApply);
        let result = dispatch(&mut controller, intent).await;
        let batch_frozen = starts_batch && result.is_ok();

        if reply.send(result).is_err() {
            debug!("Caller for user {user_id} went away before the reply");
        }

        if batch_frozen {
            run_batch(&mut controller, &mut inbox, user_id).await;
        }
    }
    debug!(
        "Automation session for user {user_id} closed at stage {}",
        controller.stage()
    );
}

/// Open sessions by id.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<RwLock<HashMap<Uuid, SessionHandle>>>,
    idle_timeout: Duration,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_IDLE_TIMEOUT)
    }
}

impl SessionRegistry {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout,
        }
    }

    /// Registers a session for `controller` and starts its task. The task
    /// removes its own entry when it ends.
    pub async fn open(
        &self,
        controller: OrchestrationController,
        user_id: Uuid,
    ) -> (Uuid, SessionHandle) {
        let id = Uuid::new_v4();
        let (intents, inbox) = mpsc::channel(INTENT_BUFFER);
        let handle = SessionHandle {
            user_id,
            intents,
            snapshots: controller.subscribe(),
        };
        self.sessions.write().await.insert(id, handle.clone());

        let registry = self.clone();
        let idle_timeout = self.idle_timeout;
        tokio::spawn(async move {
            run_session(controller, inbox, user_id, idle_timeout).await;
            if registry.sessions.write().await.remove(&id).is_some() {
                debug!("Evicted automation session {id}");
            }
        });

        (id, handle)
    }

    pub async fn get(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.read().await.get(&id).cloned()
    }

    /// Dropping the last handle ends the session task once its current work
    /// (including a running batch) is done.
    pub async fn remove(&self, id: Uuid) -> Option<SessionHandle> {
        self.sessions.write().await.remove(&id)
    }
}
