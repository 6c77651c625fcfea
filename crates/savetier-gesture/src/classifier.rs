//! Finite-state machine distinguishing short presses from long holds.
//!
//! # Design
//! - The classifier owns the session and its deadline timer; callers only feed events.
//! - The timer task re-checks the session id and classification under the lock before
//!   resolving, so an abort racing with an elapsed deadline cannot double-resolve.
//! - Observers are invoked after the lock is released.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info};

use crate::error::{GestureError, GestureResult};

/// Hold duration after which a press resolves as long.
pub const DEFAULT_LONG_PRESS: Duration = Duration::from_millis(3_000);

/// Receives the decision for each interaction.
pub trait GestureObserver<P>: Send + Sync {
    /// The trigger was released before the deadline.
    fn on_short(&self, payload: P);
    /// The deadline elapsed while the trigger was still held.
    fn on_long(&self);
}

/// Classification of the current or most recent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Armed and waiting for release or deadline.
    Pending,
    /// Released before the deadline.
    Short,
    /// Deadline elapsed first.
    Long,
}

impl Classification {
    /// Stable label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Short => "short",
            Self::Long => "long",
        }
    }
}

/// Externally visible state of the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureState {
    /// No interaction has happened yet.
    Idle,
    /// A press is in progress and the deadline has not elapsed.
    Armed,
    /// The last interaction resolved as short.
    ResolvedShort,
    /// The last interaction resolved as long.
    ResolvedLong,
}

/// What a release event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// The pending session resolved as short.
    Short,
    /// The deadline had elapsed but its timer had not run yet; the release
    /// resolved the session as long.
    LongAtRelease,
    /// The session had already resolved as long; the release only closed it.
    IgnoredAfterLong,
    /// No session was live.
    IgnoredIdle,
}

struct GestureSession {
    id: u64,
    started_at: Instant,
    timer: Option<JoinHandle<()>>,
    classified: Classification,
}

impl GestureSession {
    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

struct ClassifierState {
    session: Option<GestureSession>,
    state: GestureState,
    pressed: bool,
    next_session: u64,
}

/// Press/hold classifier for a single trigger.
///
/// `P` is the payload carried by release events and forwarded on short presses.
pub struct GestureClassifier<P> {
    inner: Arc<Mutex<ClassifierState>>,
    observer: Arc<dyn GestureObserver<P>>,
    long_press: Duration,
    runtime: Handle,
}

impl<P> fmt::Debug for GestureClassifier<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GestureClassifier")
            .field("long_press", &self.long_press)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<P: Send + 'static> GestureClassifier<P> {
    /// Build a classifier bound to the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`GestureError::RuntimeUnavailable`] when called outside a runtime.
    pub fn new(
        long_press: Duration,
        observer: Arc<dyn GestureObserver<P>>,
    ) -> GestureResult<Self> {
        let runtime =
            Handle::try_current().map_err(|source| GestureError::RuntimeUnavailable { source })?;
        Ok(Self::with_runtime(long_press, observer, runtime))
    }

    /// Build a classifier that spawns its deadline timers on `runtime`.
    #[must_use]
    pub fn with_runtime(
        long_press: Duration,
        observer: Arc<dyn GestureObserver<P>>,
        runtime: Handle,
    ) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ClassifierState {
                session: None,
                state: GestureState::Idle,
                pressed: false,
                next_session: 1,
            })),
            observer,
            long_press,
            runtime,
        }
    }

    /// Arm a new session and start its deadline timer.
    ///
    /// Returns the id of the new session.
    ///
    /// # Errors
    ///
    /// Returns [`GestureError::SessionActive`] while a session is still pending.
    pub fn on_press_down(&self) -> GestureResult<u64> {
        let mut guard = lock(&self.inner);
        if let Some(session) = guard
            .session
            .as_ref()
            .filter(|session| session.classified == Classification::Pending)
        {
            return Err(GestureError::SessionActive {
                session_id: session.id,
            });
        }

        // A long-resolved session whose release never arrived is closed here.
        if let Some(mut stale) = guard.session.take() {
            stale.cancel_timer();
        }

        let id = guard.next_session;
        guard.next_session = guard.next_session.wrapping_add(1);

        let timer = {
            let inner = Arc::clone(&self.inner);
            let observer = Arc::clone(&self.observer);
            let deadline = self.long_press;
            self.runtime.spawn(async move {
                sleep(deadline).await;
                fire_deadline(&inner, observer.as_ref(), id);
            })
        };

        guard.session = Some(GestureSession {
            id,
            started_at: Instant::now(),
            timer: Some(timer),
            classified: Classification::Pending,
        });
        guard.state = GestureState::Armed;
        guard.pressed = true;
        drop(guard);

        debug!(session_id = id, "gesture armed");
        Ok(id)
    }

    /// Resolve the pending session as short, or close a long-resolved one.
    ///
    /// A release that arrives once the deadline has elapsed never resolves
    /// short, even if the timer task has not been scheduled yet.
    pub fn on_release(&self, payload: P) -> ReleaseOutcome {
        let mut guard = lock(&self.inner);
        guard.pressed = false;
        let Some(mut session) = guard.session.take() else {
            return ReleaseOutcome::IgnoredIdle;
        };
        session.cancel_timer();

        match session.classified {
            Classification::Pending if session.started_at.elapsed() < self.long_press => {
                guard.state = GestureState::ResolvedShort;
                drop(guard);
                info!(session_id = session.id, "gesture resolved short");
                self.observer.on_short(payload);
                ReleaseOutcome::Short
            }
            Classification::Pending => {
                guard.state = GestureState::ResolvedLong;
                drop(guard);
                info!(
                    session_id = session.id,
                    "gesture resolved long at release"
                );
                self.observer.on_long();
                ReleaseOutcome::LongAtRelease
            }
            Classification::Short | Classification::Long => {
                drop(guard);
                debug!(session_id = session.id, "release after long press ignored");
                ReleaseOutcome::IgnoredAfterLong
            }
        }
    }
}

impl<P> GestureClassifier<P> {
    /// Pointer left the trigger area. Clears the pressed indicator only; the
    /// session and its timer are untouched.
    pub fn on_pointer_leave(&self) {
        lock(&self.inner).pressed = false;
    }

    /// Current machine state.
    #[must_use]
    pub fn state(&self) -> GestureState {
        lock(&self.inner).state
    }

    /// Classification of the live session, if any.
    #[must_use]
    pub fn classification(&self) -> Option<Classification> {
        lock(&self.inner)
            .session
            .as_ref()
            .map(|session| session.classified)
    }

    /// Visual feedback indicator: `true` between press-down and release/leave.
    #[must_use]
    pub fn is_pressed(&self) -> bool {
        lock(&self.inner).pressed
    }

    /// Configured hold duration.
    #[must_use]
    pub const fn long_press(&self) -> Duration {
        self.long_press
    }
}

impl<P> Drop for GestureClassifier<P> {
    fn drop(&mut self) {
        if let Some(session) = lock(&self.inner).session.as_mut() {
            session.cancel_timer();
        }
    }
}

fn fire_deadline<P>(inner: &Mutex<ClassifierState>, observer: &dyn GestureObserver<P>, id: u64) {
    let mut guard = lock(inner);
    let live = guard
        .session
        .as_mut()
        .filter(|session| session.id == id && session.classified == Classification::Pending);
    let Some(session) = live else {
        return;
    };
    session.classified = Classification::Long;
    // The handle belongs to this task; dropping it detaches without aborting.
    session.timer = None;
    guard.state = GestureState::ResolvedLong;
    drop(guard);
    info!(session_id = id, "gesture resolved long");
    observer.on_long();
}

fn lock(inner: &Mutex<ClassifierState>) -> MutexGuard<'_, ClassifierState> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}
