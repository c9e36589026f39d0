//! Server-side sessions and the inactivity watchdog
//!
//! Every login starts a session with its own watchdog task. Each
//! authenticated request touches the watchdog; when the configured timeout
//! passes without a touch the session is removed and the expiry hook runs
//! exactly once. Logout cancels the watchdog before it can fire.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use shared::{AuditCategory, AuditEvent, Role};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

/// Countdown reset by every activity signal.
///
/// Dropping the watchdog cancels it, as does [`InactivityWatchdog::cancel`].
pub struct InactivityWatchdog {
    activity: watch::Sender<Instant>,
    cancel: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl InactivityWatchdog {
    /// Starts the countdown. `on_expire` runs once if `timeout` elapses
    /// without a [`touch`](Self::touch).
    pub fn spawn<F, Fut>(timeout: Duration, on_expire: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (activity, mut activity_rx) = watch::channel(Instant::now());
        let (cancel, mut cancel_rx) = oneshot::channel::<()>();

        let handle = tokio::spawn(async move {
            let expired = loop {
                let deadline = *activity_rx.borrow_and_update() + timeout;
                tokio::select! {
                    _ = &mut cancel_rx => break false,
                    changed = activity_rx.changed() => {
                        if changed.is_err() {
                            break false;
                        }
                    }
                    _ = tokio::time::sleep_until(deadline) => break true,
                }
            };

            if expired {
                on_expire().await;
            }
        });

        Self {
            activity,
            cancel: Some(cancel),
            handle,
        }
    }

    /// Registers activity, restarting the countdown
    pub fn touch(&self) {
        self.activity.send_replace(Instant::now());
    }

    /// Stops the countdown without running the expiry hook
    pub fn cancel(mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

/// A session that ended because of inactivity
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiredSession {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub idle_for: Duration,
}

impl ExpiredSession {
    /// The `logout` audit entry written for an inactivity expiry
    pub fn audit_event(&self) -> AuditEvent {
        AuditEvent::new(
            self.user_id,
            self.username.clone(),
            AuditCategory::Logout,
            "Logout",
            format!(
                "Session closed due to inactivity ({} minutes)",
                self.idle_for.as_secs() / 60
            ),
        )
    }
}

/// Public view of a live session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub role: Role,
    pub started_at: DateTime<Utc>,
}

struct ActiveSession {
    info: SessionInfo,
    watchdog: InactivityWatchdog,
}

type ExpiryHook = Box<dyn Fn(ExpiredSession) + Send + Sync>;

/// Live sessions keyed by session id
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, ActiveSession>>,
    timeout: Duration,
    on_expire: ExpiryHook,
}

impl SessionRegistry {
    pub fn new(
        timeout: Duration,
        on_expire: impl Fn(ExpiredSession) + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            sessions: Mutex::new(HashMap::new()),
            timeout,
            on_expire: Box::new(on_expire),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, ActiveSession>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Opens a session and starts its watchdog
    pub fn start(self: &Arc<Self>, user_id: Uuid, username: &str, role: Role) -> SessionInfo {
        let session_id = Uuid::new_v4();
        let registry: Weak<Self> = Arc::downgrade(self);

        let watchdog = InactivityWatchdog::spawn(self.timeout, move || async move {
            if let Some(registry) = registry.upgrade() {
                registry.expire(session_id);
            }
        });

        let info = SessionInfo {
            session_id,
            user_id,
            username: username.to_string(),
            role,
            started_at: Utc::now(),
        };

        self.lock().insert(
            session_id,
            ActiveSession {
                info: info.clone(),
                watchdog,
            },
        );
        tracing::debug!(%session_id, %user_id, "Session started");

        info
    }

    /// Records activity. Returns false when the session is no longer live.
    pub fn touch(&self, session_id: Uuid) -> bool {
        match self.lock().get(&session_id) {
            Some(session) => {
                session.watchdog.touch();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, session_id: Uuid) -> Option<SessionInfo> {
        self.lock().get(&session_id).map(|s| s.info.clone())
    }

    /// Ends a session explicitly, cancelling its watchdog
    pub fn end(&self, session_id: Uuid) -> Option<SessionInfo> {
        let session = self.lock().remove(&session_id)?;
        session.watchdog.cancel();
        tracing::debug!(%session_id, "Session ended");
        Some(session.info)
    }

    /// Ends every session of a user (deactivated or deleted accounts)
    pub fn end_sessions_for_user(&self, user_id: Uuid) -> usize {
        let ended: Vec<ActiveSession> = {
            let mut sessions = self.lock();
            let ids: Vec<Uuid> = sessions
                .values()
                .filter(|s| s.info.user_id == user_id)
                .map(|s| s.info.session_id)
                .collect();
            ids.iter().filter_map(|id| sessions.remove(id)).collect()
        };

        let count = ended.len();
        for session in ended {
            session.watchdog.cancel();
        }
        count
    }

    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    fn expire(&self, session_id: Uuid) {
        // Release the lock before running the hook.
        let removed = self.lock().remove(&session_id);
        let Some(session) = removed else {
            return;
        };

        tracing::info!(
            %session_id,
            user_id = %session.info.user_id,
            "Session closed due to inactivity"
        );
        (self.on_expire)(ExpiredSession {
            session_id,
            user_id: session.info.user_id,
            username: session.info.username,
            idle_for: self.timeout,
        });
    }
}
