//! Per-request cancellation.
//!
//! An [`AbortController`] owns the trigger; any number of [`AbortSignal`]
//! clones observe it. A request carrying a signal is cancelled at whatever
//! stage it has reached when the signal fires.

use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
enum AbortState {
    Armed,
    Aborted(Option<String>),
}

/// Trigger side of an abort signal.
///
/// # Examples
///
/// ```
/// use sluice::AbortController;
///
/// let controller = AbortController::new();
/// let signal = controller.signal();
/// assert!(!signal.is_aborted());
///
/// controller.abort_with("user navigated away");
/// assert!(signal.is_aborted());
/// assert_eq!(signal.reason().as_deref(), Some("user navigated away"));
/// ```
#[derive(Debug)]
pub struct AbortController {
    tx: watch::Sender<AbortState>,
}

impl Default for AbortController {
    fn default() -> Self { Self::new() }
}

impl AbortController {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(AbortState::Armed);
        Self { tx }
    }

    pub fn signal(&self) -> AbortSignal { AbortSignal { rx: self.tx.subscribe() } }

    /// Fire the signal without a reason. Only the first abort takes effect.
    pub fn abort(&self) { self.fire(None); }

    pub fn abort_with(&self, reason: impl Into<String>) { self.fire(Some(reason.into())); }

    fn fire(&self, reason: Option<String>) {
        self.tx.send_if_modified(|state| match state {
            AbortState::Armed => {
                *state = AbortState::Aborted(reason);
                true
            }
            AbortState::Aborted(_) => false,
        });
    }
}

/// Observer side of an [`AbortController`].
#[derive(Debug, Clone)]
pub struct AbortSignal {
    rx: watch::Receiver<AbortState>,
}

impl AbortSignal {
    pub fn is_aborted(&self) -> bool { matches!(*self.rx.borrow(), AbortState::Aborted(_)) }

    pub fn reason(&self) -> Option<String> {
        match &*self.rx.borrow() {
            AbortState::Aborted(reason) => reason.clone(),
            AbortState::Armed => None,
        }
    }

    /// Resolve with the abort reason once the signal fires.
    ///
    /// Never resolves if the controller is dropped without aborting.
    pub async fn aborted(&self) -> Option<String> {
        let mut rx = self.rx.clone();
        let reason = match rx.wait_for(|state| matches!(state, AbortState::Aborted(_))).await {
            Ok(state) => match &*state {
                AbortState::Aborted(reason) => reason.clone(),
                AbortState::Armed => None,
            },
            Err(_) => None,
        };
        if self.is_aborted() {
            return reason;
        }
        std::future::pending().await
    }
}
