// Transient feedback messages with per-toast auto-dismiss timers.
// Every toast lives on a shared board; the browser renders whatever the board
// currently holds.

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

pub type ToastId = u64;

/// Visual flavour of a toast
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    #[default]
    Info,
}

impl ToastKind {
    /// Icon name shown next to the message
    pub fn icon(&self) -> &'static str {
        match self {
            ToastKind::Success => "check-circle",
            ToastKind::Error => "exclamation-circle",
            ToastKind::Warning => "exclamation-triangle",
            ToastKind::Info => "info-circle",
        }
    }
}

/// Where a toast is in its short life
///
/// Toasts are inserted hidden and flipped to visible after the entrance
/// delay, so the entrance transition has something to animate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastPhase {
    Entering,
    Visible,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub id: ToastId,
    pub message: String,
    pub kind: ToastKind,
    pub icon: &'static str,
    pub phase: ToastPhase,
}

/// Timing used for every toast on a board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToastPolicy {
    /// Delay between insertion and the switch to `Visible`
    pub entrance_delay: Duration,
    /// Total lifetime measured from insertion
    pub dismiss_after: Duration,
}

impl Default for ToastPolicy {
    fn default() -> Self {
        Self {
            entrance_delay: Duration::from_millis(100),
            dismiss_after: Duration::from_secs(3),
        }
    }
}

/// Anything that can present a toast
///
/// Controllers only depend on this, which keeps them testable without a
/// runtime.
pub trait ToastSink: Send + Sync {
    fn push_toast(&self, message: &str, kind: ToastKind);
}

#[derive(Debug, Default)]
struct BoardState {
    next_id: ToastId,
    toasts: Vec<Toast>,
    timers: HashMap<ToastId, JoinHandle<()>>,
}

/// The set of toasts currently shown on one page
///
/// Cloning is cheap and every clone sees the same toasts.
#[derive(Debug, Clone, Default)]
pub struct ToastBoard {
    state: Arc<Mutex<BoardState>>,
    policy: ToastPolicy,
}

impl ToastBoard {
    pub fn new(policy: ToastPolicy) -> Self {
        Self {
            state: Arc::default(),
            policy,
        }
    }

    /// Show a toast and schedule its dismissal
    ///
    /// Outside a tokio runtime the toast is shown immediately and stays until
    /// it is dismissed by hand.
    pub fn show(&self, message: impl Into<String>, kind: ToastKind) -> ToastId {
        let mut state = self.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.toasts.push(Toast {
            id,
            message: message.into(),
            kind,
            icon: kind.icon(),
            phase: ToastPhase::Entering,
        });

        match Handle::try_current() {
            Ok(runtime) => {
                let board = self.clone();
                let policy = self.policy;
                // The lock is still held, so the timer is registered before
                // the task can try to clear it.
                let timer = runtime.spawn(async move {
                    tokio::time::sleep(policy.entrance_delay).await;
                    board.reveal(id);
                    tokio::time::sleep(policy.dismiss_after.saturating_sub(policy.entrance_delay))
                        .await;
                    board.expire(id);
                });
                state.timers.insert(id, timer);
            }
            Err(_) => {
                warn!("no async runtime, toast {} will not auto-dismiss", id);
                if let Some(toast) = state.toasts.iter_mut().find(|t| t.id == id) {
                    toast.phase = ToastPhase::Visible;
                }
            }
        }

        id
    }

    /// Dismiss a toast by hand, cancelling its pending timer
    ///
    /// Returns `false` when the toast is already gone.
    pub fn dismiss(&self, id: ToastId) -> bool {
        let mut state = self.lock();
        let Some(position) = state.toasts.iter().position(|t| t.id == id) else {
            return false;
        };
        state.toasts.remove(position);
        if let Some(timer) = state.timers.remove(&id) {
            timer.abort();
        }
        true
    }

    pub fn get(&self, id: ToastId) -> Option<Toast> {
        self.lock().toasts.iter().find(|t| t.id == id).cloned()
    }

    /// Snapshot of the live toasts, oldest first
    pub fn toasts(&self) -> Vec<Toast> {
        self.lock().toasts.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().toasts.is_empty()
    }

    #[cfg(test)]
    fn pending_timers(&self) -> usize {
        self.lock().timers.len()
    }

    fn reveal(&self, id: ToastId) {
        if let Some(toast) = self.lock().toasts.iter_mut().find(|t| t.id == id) {
            toast.phase = ToastPhase::Visible;
        }
    }

    fn expire(&self, id: ToastId) {
        let mut state = self.lock();
        state.timers.remove(&id);
        match state.toasts.iter().position(|t| t.id == id) {
            Some(position) => {
                state.toasts.remove(position);
            }
            None => debug!("toast {} was already dismissed", id),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BoardState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ToastSink for ToastBoard {
    fn push_toast(&self, message: &str, kind: ToastKind) {
        self.show(message, kind);
    }
}

/// A toast the browser shows on its own, for pages without a page session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToastNotice {
    pub message: String,
    pub kind: ToastKind,
    pub icon: &'static str,
}

/// Collects toasts so they can be returned to the browser in one reply
#[derive(Debug, Default)]
pub struct ToastLog {
    notices: Mutex<Vec<ToastNotice>>,
}

impl ToastLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_notices(self) -> Vec<ToastNotice> {
        self.notices
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl ToastSink for ToastLog {
    fn push_toast(&self, message: &str, kind: ToastKind) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ToastNotice {
                message: message.to_string(),
                kind,
                icon: kind.icon(),
            });
    }
}
