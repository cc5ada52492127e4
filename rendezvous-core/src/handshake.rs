//! Readiness rendezvous between the two endpoints.
//!
//! The shared word only has room for one readiness announcement, so the
//! handshake is asymmetric by construction: whichever side arrives
//! first claims the word with a compare-and-set from [`Phase::Idle`]
//! and then waits; the second arriver finds the word already claimed,
//! observes the peer's readiness directly and proceeds. The second
//! side's transition to [`Phase::Running`] is what releases the first,
//! which is why the wait accepts `Running` as well as the peer's
//! readiness value.

use crate::{CancelToken, Phase, SharedState, Side};
use log::debug;
use std::time::Duration;

/// Outcome of the readiness rendezvous.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handshake {
    /// The peer was observed; the endpoint may enter its main loop.
    /// Carries the phase that triggered the release.
    Proceed { observed: Phase },
    /// Cancellation was requested while waiting.
    Cancelled,
    /// The shared word already carries a terminal phase.
    PeerStopped,
}

/// Announce `side`'s readiness and wait for the peer.
///
/// Waiting is wait/notify based but sliced by `poll` so the cancel
/// token is observed at least once per slice; `poll` is the worst case
/// cancellation latency of a lonely handshake.
///
/// `state` must approve every protocol phase (the word built by
/// [`SharedState::protocol`] does); announcing readiness on a
/// restricted word is a programming error and panics.
pub fn rendezvous(
    state: &SharedState,
    side: Side,
    cancel: &CancelToken,
    poll: Duration,
) -> Handshake {
    let announced = state
        .advance(Phase::Idle, side.ready())
        .expect("the shared word approves every readiness phase");
    if announced {
        debug!("{side} announced {ready}", ready = side.ready());
    }

    let peer_ready = side.peer().ready();
    debug!("{side} waiting for {peer_ready}");
    loop {
        if cancel.is_cancelled() {
            return Handshake::Cancelled;
        }
        let observed = state.wait_for(poll, |phase| {
            phase == peer_ready || phase == Phase::Running || phase.is_terminal()
        });
        if observed == peer_ready || observed == Phase::Running {
            return Handshake::Proceed { observed };
        }
        if observed.is_terminal() {
            return Handshake::PeerStopped;
        }
        // the slice expired without an interesting phase; loop around
        // and look at the token again
    }
}
