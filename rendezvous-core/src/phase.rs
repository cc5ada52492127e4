use std::fmt;

/// One step of the rendezvous protocol.
///
/// The two endpoints coordinate through a single shared `Phase` word
/// (see [`SharedState`]); there is no per-endpoint status. Readiness
/// and shutdown are communicated by overwriting this one value, which
/// is why each role has its own `Ready` and `Stopped` variant.
///
/// ```text
///                 Idle
///                /    \
///   TransmitterReady  ListenerReady    (whichever side arrives first)
///                \    /
///               Running
///                /    \
/// TransmitterStopped  ListenerStopped  (terminal)
/// ```
///
/// [`SharedState`]: crate::SharedState
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Initial value, neither endpoint has announced itself yet.
    Idle,
    /// The transmitter is up and waiting for the listener.
    TransmitterReady,
    /// The listener is bound and waiting for the transmitter.
    ListenerReady,
    /// Both endpoints observed each other, datagrams are flowing.
    Running,
    /// Terminal: the transmitter stopped (cancelled, out of iterations
    /// or failed).
    TransmitterStopped,
    /// Terminal: the listener stopped (cancelled, retries spent or
    /// failed).
    ListenerStopped,
}

impl Phase {
    /// `true` for the two `*Stopped` variants. Once the shared word is
    /// terminal every loop in the protocol winds down.
    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::TransmitterStopped | Phase::ListenerStopped)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Idle => "idle",
            Phase::TransmitterReady => "transmitter_ready",
            Phase::ListenerReady => "listener_ready",
            Phase::Running => "running",
            Phase::TransmitterStopped => "transmitter_stopped",
            Phase::ListenerStopped => "listener_stopped",
        };
        f.write_str(name)
    }
}

/// One of the two endpoint roles.
///
/// Maps a role to its phase values so that the handshake and the
/// shutdown bookkeeping can be written once instead of per endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Listener,
    Transmitter,
}

impl Side {
    /// The readiness value this side announces during the handshake.
    #[inline]
    pub fn ready(self) -> Phase {
        match self {
            Side::Listener => Phase::ListenerReady,
            Side::Transmitter => Phase::TransmitterReady,
        }
    }

    /// The terminal value this side settles the shared word on.
    #[inline]
    pub fn stopped(self) -> Phase {
        match self {
            Side::Listener => Phase::ListenerStopped,
            Side::Transmitter => Phase::TransmitterStopped,
        }
    }

    /// The other role.
    #[inline]
    pub fn peer(self) -> Side {
        match self {
            Side::Listener => Side::Transmitter,
            Side::Transmitter => Side::Listener,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Listener => f.write_str("listener"),
            Side::Transmitter => f.write_str("transmitter"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_the_stopped_phases_are_terminal() {
        assert!(Phase::TransmitterStopped.is_terminal());
        assert!(Phase::ListenerStopped.is_terminal());

        assert!(!Phase::Idle.is_terminal());
        assert!(!Phase::TransmitterReady.is_terminal());
        assert!(!Phase::ListenerReady.is_terminal());
        assert!(!Phase::Running.is_terminal());
    }

    #[test]
    fn sides_map_to_their_own_phases() {
        assert_eq!(Side::Listener.ready(), Phase::ListenerReady);
        assert_eq!(Side::Listener.stopped(), Phase::ListenerStopped);
        assert_eq!(Side::Transmitter.ready(), Phase::TransmitterReady);
        assert_eq!(Side::Transmitter.stopped(), Phase::TransmitterStopped);
    }

    #[test]
    fn peer_is_an_involution() {
        assert_eq!(Side::Listener.peer(), Side::Transmitter);
        assert_eq!(Side::Transmitter.peer(), Side::Listener);
        assert_eq!(Side::Listener.peer().peer(), Side::Listener);
    }

    #[test]
    fn display_uses_snake_case_names() {
        assert_eq!(Phase::Idle.to_string(), "idle");
        assert_eq!(Phase::TransmitterReady.to_string(), "transmitter_ready");
        assert_eq!(Phase::ListenerReady.to_string(), "listener_ready");
        assert_eq!(Phase::Running.to_string(), "running");
        assert_eq!(Phase::TransmitterStopped.to_string(), "transmitter_stopped");
        assert_eq!(Phase::ListenerStopped.to_string(), "listener_stopped");
        assert_eq!(Side::Listener.to_string(), "listener");
        assert_eq!(Side::Transmitter.to_string(), "transmitter");
    }
}
