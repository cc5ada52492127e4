use crate::Phase;
use log::debug;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use thiserror::Error;

/// Error of the [`SharedState`] operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StateError {
    /// The approved set given at construction was empty, so there is no
    /// initial value to start from.
    #[error("the approved phase set must not be empty")]
    EmptyApproved,

    /// The requested phase is not a member of the approved set. The
    /// shared word is left untouched.
    #[error("phase `{attempted}` is not in the approved set")]
    NotApproved { attempted: Phase },
}

/// The single phase word both endpoints coordinate through.
///
/// One mutex guards one [`Phase`] value and a condition variable wakes
/// waiters whenever the value changes. The set of approved phases is
/// fixed at construction and every write is validated against it, so
/// the word can never hold a value outside the set.
///
/// # Concurrent writers
///
/// Both endpoints write the word (each side may observe, and react to,
/// the other side's stop). Writes are last-writer-wins under the lock.
/// The shutdown cascade depends on exactly that: a terminal value
/// written by either side replaces [`Phase::Running`] and every loop in
/// the protocol re-reads the word each iteration.
///
/// # Poisoning
///
/// A panicking endpoint surfaces through the coordinator's join. The
/// phase word itself is a [`Copy`] value that cannot be observed half
/// written, so lock poisoning is recovered with
/// [`PoisonError::into_inner`] rather than propagated.
#[derive(Debug)]
pub struct SharedState {
    current: Mutex<Phase>,
    changed: Condvar,
    approved: Vec<Phase>,
}

impl SharedState {
    /// Build a state word restricted to `approved`; the first element
    /// is the initial value.
    ///
    /// # Example
    ///
    /// ```
    /// use rendezvous_core::{Phase, SharedState};
    ///
    /// let state = SharedState::new(vec![Phase::Idle, Phase::Running])?;
    /// assert_eq!(state.get(), Phase::Idle);
    /// # Ok::<_, rendezvous_core::StateError>(())
    /// ```
    pub fn new(approved: Vec<Phase>) -> Result<Self, StateError> {
        let Some(first) = approved.first().copied() else {
            return Err(StateError::EmptyApproved);
        };
        Ok(Self {
            current: Mutex::new(first),
            changed: Condvar::new(),
            approved,
        })
    }

    /// The full six phase protocol word, starting at [`Phase::Idle`].
    ///
    /// This is the shape the endpoints expect: every phase of the
    /// readiness handshake and of the shutdown cascade is approved.
    pub fn protocol() -> Self {
        match Self::new(vec![
            Phase::Idle,
            Phase::TransmitterReady,
            Phase::ListenerReady,
            Phase::Running,
            Phase::TransmitterStopped,
            Phase::ListenerStopped,
        ]) {
            Ok(state) => state,
            // new() only fails on an empty set
            Err(StateError::EmptyApproved | StateError::NotApproved { .. }) => unreachable!(),
        }
    }

    /// Current phase.
    pub fn get(&self) -> Phase {
        *self.lock()
    }

    /// All phases this word accepts, initial value first.
    pub fn approved(&self) -> &[Phase] {
        &self.approved
    }

    /// Overwrite the phase with `next` and wake all waiters, returning
    /// the previous value.
    ///
    /// Fails when `next` is outside the approved set; the word is left
    /// untouched in that case.
    pub fn set(&self, next: Phase) -> Result<Phase, StateError> {
        self.check(next)?;
        let mut current = self.lock();
        let previous = std::mem::replace(&mut *current, next);
        drop(current);
        self.changed.notify_all();
        if previous != next {
            debug!("phase {previous} -> {next}");
        }
        Ok(previous)
    }

    /// Compare-and-set: assign `to` only when the current phase is
    /// `from`. Returns whether the assignment happened.
    ///
    /// This is what makes the readiness handshake race-free: when both
    /// endpoints try to claim the word from [`Phase::Idle`] at once,
    /// exactly one of them wins.
    pub fn advance(&self, from: Phase, to: Phase) -> Result<bool, StateError> {
        self.check(to)?;
        let mut current = self.lock();
        if *current != from {
            return Ok(false);
        }
        *current = to;
        drop(current);
        self.changed.notify_all();
        debug!("phase {from} -> {to}");
        Ok(true)
    }

    /// Idempotent assignment: a no-op when the phase already equals
    /// `next`, so repeating a terminal transition is never an error.
    /// Returns the previous value.
    pub fn force(&self, next: Phase) -> Result<Phase, StateError> {
        self.check(next)?;
        let mut current = self.lock();
        let previous = *current;
        if previous != next {
            *current = next;
            drop(current);
            self.changed.notify_all();
            debug!("phase {previous} -> {next}");
        }
        Ok(previous)
    }

    /// Block until `interesting(current)` holds or `timeout` elapses,
    /// returning the phase current at wake up either way.
    ///
    /// A phase change is observed immediately instead of at the next
    /// poll tick; a caller that also watches an external condition (the
    /// cancel token) keeps `timeout` as its worst case reaction
    /// latency.
    pub fn wait_for<F>(&self, timeout: Duration, mut interesting: F) -> Phase
    where
        F: FnMut(Phase) -> bool,
    {
        let guard = self.lock();
        let (guard, _timed_out) = self
            .changed
            .wait_timeout_while(guard, timeout, |phase| !interesting(*phase))
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    fn check(&self, next: Phase) -> Result<(), StateError> {
        if self.approved.contains(&next) {
            Ok(())
        } else {
            Err(StateError::NotApproved { attempted: next })
        }
    }

    fn lock(&self) -> MutexGuard<'_, Phase> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn starts_at_the_first_approved_value() {
        let state = SharedState::new(vec![Phase::Running, Phase::Idle]).unwrap();
        assert_eq!(state.get(), Phase::Running);

        assert_eq!(SharedState::protocol().get(), Phase::Idle);
    }

    #[test]
    fn an_empty_approved_set_is_rejected() {
        assert_eq!(
            SharedState::new(Vec::new()).unwrap_err(),
            StateError::EmptyApproved
        );
    }

    #[test]
    fn the_protocol_word_approves_every_phase() {
        let state = SharedState::protocol();
        for phase in [
            Phase::Idle,
            Phase::TransmitterReady,
            Phase::ListenerReady,
            Phase::Running,
            Phase::TransmitterStopped,
            Phase::ListenerStopped,
        ] {
            assert!(state.approved().contains(&phase), "{phase} missing");
        }
    }

    #[test]
    fn set_rejects_values_outside_the_approved_set() {
        let state = SharedState::new(vec![Phase::Idle, Phase::Running]).unwrap();

        let err = state.set(Phase::ListenerStopped).unwrap_err();
        assert_eq!(
            err,
            StateError::NotApproved {
                attempted: Phase::ListenerStopped
            }
        );
        // the word is untouched by the rejected write
        assert_eq!(state.get(), Phase::Idle);
    }

    #[test]
    fn set_returns_the_previous_phase() {
        let state = SharedState::protocol();

        assert_eq!(state.set(Phase::ListenerReady).unwrap(), Phase::Idle);
        assert_eq!(state.set(Phase::Running).unwrap(), Phase::ListenerReady);
        // last writer wins, even going backwards
        assert_eq!(state.set(Phase::Idle).unwrap(), Phase::Running);
    }

    #[test]
    fn advance_claims_the_word_exactly_once() {
        let state = SharedState::protocol();

        assert!(state.advance(Phase::Idle, Phase::ListenerReady).unwrap());
        // the second claim loses: the word is no longer idle
        assert!(!state.advance(Phase::Idle, Phase::TransmitterReady).unwrap());
        assert_eq!(state.get(), Phase::ListenerReady);
    }

    #[test]
    fn force_is_idempotent() {
        let state = SharedState::protocol();

        assert_eq!(state.force(Phase::ListenerStopped).unwrap(), Phase::Idle);
        assert_eq!(
            state.force(Phase::ListenerStopped).unwrap(),
            Phase::ListenerStopped
        );
        assert_eq!(state.get(), Phase::ListenerStopped);
    }

    #[test]
    fn concurrent_writers_always_leave_an_approved_value() {
        let state = Arc::new(SharedState::protocol());

        let mut writers = Vec::new();
        for phase in [
            Phase::Running,
            Phase::TransmitterStopped,
            Phase::ListenerStopped,
        ] {
            let state = Arc::clone(&state);
            writers.push(thread::spawn(move || {
                for _ in 0..500 {
                    state.set(phase).unwrap();
                }
            }));
        }
        for writer in writers {
            writer.join().unwrap();
        }

        assert!(state.approved().contains(&state.get()));
    }

    #[test]
    fn rejected_writes_do_not_disturb_concurrent_writers() {
        let state = Arc::new(SharedState::new(vec![Phase::Idle, Phase::Running]).unwrap());

        let writer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for _ in 0..200 {
                    state.set(Phase::Running).unwrap();
                }
            })
        };
        let rejected = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                for _ in 0..200 {
                    assert!(state.set(Phase::TransmitterStopped).is_err());
                }
            })
        };
        writer.join().unwrap();
        rejected.join().unwrap();

        assert!(matches!(state.get(), Phase::Idle | Phase::Running));
    }

    #[test]
    fn wait_for_wakes_on_the_phase_change() {
        let state = Arc::new(SharedState::protocol());
        let started = Instant::now();

        let waiter = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                state.wait_for(Duration::from_secs(10), |phase| phase == Phase::Running)
            })
        };

        thread::sleep(Duration::from_millis(50));
        state.set(Phase::Running).unwrap();

        assert_eq!(waiter.join().unwrap(), Phase::Running);
        // woken by the notification, not by the 10s timeout
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn wait_for_times_out_when_nothing_interesting_happens() {
        let state = SharedState::protocol();
        let started = Instant::now();

        let phase = state.wait_for(Duration::from_millis(50), Phase::is_terminal);

        assert!(started.elapsed() >= Duration::from_millis(50));
        assert_eq!(phase, Phase::Idle);
    }

    #[test]
    fn wait_for_returns_immediately_when_already_interesting() {
        let state = SharedState::protocol();
        let started = Instant::now();

        let phase = state.wait_for(Duration::from_secs(10), |phase| phase == Phase::Idle);

        assert_eq!(phase, Phase::Idle);
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
