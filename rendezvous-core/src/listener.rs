use crate::handshake::{self, Handshake};
use crate::report::{EndpointOutcome, StopReason};
use crate::transport::{Transport, TransportError};
use crate::{CancelToken, Phase, RendezvousConfig, SharedState, Side};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;

/// The receiving endpoint.
///
/// Owns its bound socket for the whole run. Drives the shared word
/// through `listener_ready`, `running` and finally `listener_stopped`,
/// receiving datagrams until the peer stops, cancellation is requested
/// or the receive retry budget is spent.
pub struct Listener {
    transport: Transport,
    state: Arc<SharedState>,
    cancel: Arc<CancelToken>,
    buffer_size: usize,
    retry_budget: u32,
    handshake_poll: Duration,
}

impl Listener {
    /// `transport` should come from [`Transport::listener`] so the
    /// receive timeout is in place. `state` must approve every protocol
    /// phase ([`SharedState::protocol`]); a rejected transition is a
    /// programming error and panics.
    pub fn new(
        transport: Transport,
        state: Arc<SharedState>,
        cancel: Arc<CancelToken>,
        config: &RendezvousConfig,
    ) -> Self {
        Self {
            transport,
            state,
            cancel,
            buffer_size: config.buffer_size,
            retry_budget: config.retry_budget,
            handshake_poll: config.handshake_poll,
        }
    }

    /// Run the endpoint to completion.
    ///
    /// Socket errors never panic: they end the receive loop and ride in
    /// the outcome. Whatever the exit path, the shared word is left on
    /// [`Phase::ListenerStopped`] so the peer winds down too.
    pub fn run(self) -> EndpointOutcome {
        let mut received = 0;

        let reason = match handshake::rendezvous(
            &self.state,
            Side::Listener,
            &self.cancel,
            self.handshake_poll,
        ) {
            Handshake::Proceed { observed } => {
                debug!("listener proceeding after observing {observed}");
                self.state
                    .force(Phase::Running)
                    .expect("the shared word approves running");
                self.receive_loop(&mut received)
            }
            Handshake::Cancelled => StopReason::Cancelled,
            Handshake::PeerStopped => StopReason::PeerStopped,
        };

        // taken on every exit path; the transition is idempotent
        self.state
            .force(Phase::ListenerStopped)
            .expect("the shared word approves listener_stopped");
        info!("finished listening: {reason}");

        EndpointOutcome {
            side: Side::Listener,
            reason,
            datagrams: received,
        }
    }

    fn receive_loop(&self, received: &mut u64) -> StopReason {
        let mut buf = vec![0u8; self.buffer_size];
        let mut retries_left = self.retry_budget;

        info!("starting to listen");
        loop {
            let phase = self.state.get();
            if phase != Phase::Running {
                debug!("phase moved to {phase}, leaving the receive loop");
                return StopReason::PeerStopped;
            }
            if self.cancel.is_cancelled() {
                info!("cancellation requested, listener stopping");
                return StopReason::Cancelled;
            }
            if retries_left == 0 {
                info!("receive retry budget spent");
                return StopReason::RetriesExhausted;
            }

            match self.transport.recv(&mut buf) {
                Ok(len) => {
                    *received += 1;
                    info!(
                        "packet received: {payload}",
                        payload = String::from_utf8_lossy(&buf[..len])
                    );
                }
                Err(TransportError::RecvTimeout) => {
                    // the budget spans the whole run; a successful
                    // receive does not top it back up
                    retries_left -= 1;
                    debug!("receive timed out, {retries_left} retries left");
                }
                Err(error) => {
                    error!("receive failed: {error}");
                    return StopReason::Transport(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    fn config() -> RendezvousConfig {
        RendezvousConfig {
            port: 0,
            buffer_size: 64,
            max_iterations: 4,
            recv_timeout: Duration::from_millis(100),
            retry_budget: 2,
            send_cadence: Duration::from_millis(20),
            handshake_poll: Duration::from_millis(20),
            join_timeout: Duration::from_secs(1),
        }
    }

    fn listener(config: &RendezvousConfig) -> (Listener, Arc<SharedState>, Arc<CancelToken>, u16) {
        let state = Arc::new(SharedState::protocol());
        let cancel = Arc::new(CancelToken::new());
        let transport = Transport::listener(config.port, config.recv_timeout).unwrap();
        let port = transport.local_port().unwrap();
        let listener = Listener::new(
            transport,
            Arc::clone(&state),
            Arc::clone(&cancel),
            config,
        );
        (listener, state, cancel, port)
    }

    #[test]
    fn the_retry_budget_bounds_a_run_without_traffic() {
        let config = config();
        let (listener, state, _cancel, _port) = listener(&config);

        // the peer is ready but never sends anything
        state.set(Phase::TransmitterReady).unwrap();

        let started = Instant::now();
        let outcome = listener.run();

        assert!(matches!(outcome.reason, StopReason::RetriesExhausted));
        assert_eq!(outcome.datagrams, 0);
        // two timeouts at 100ms each
        assert!(started.elapsed() >= Duration::from_millis(200));
        assert_eq!(state.get(), Phase::ListenerStopped);
    }

    #[test]
    fn counter_datagrams_are_received_until_the_peer_stops() {
        let config = config();
        let (listener, state, _cancel, port) = listener(&config);

        let peer = {
            let state = Arc::clone(&state);
            thread::spawn(move || {
                let sender = Transport::sender().unwrap();
                // behave like the transmitting side of the handshake
                state.set(Phase::TransmitterReady).unwrap();
                state
                    .wait_for(Duration::from_secs(2), |phase| phase == Phase::Running);
                for value in 0u64..3 {
                    sender.send_to(value.to_string().as_bytes(), port).unwrap();
                    thread::sleep(Duration::from_millis(20));
                }
                state.force(Phase::TransmitterStopped).unwrap();
            })
        };

        let outcome = listener.run();
        peer.join().unwrap();

        assert!(matches!(
            outcome.reason,
            StopReason::PeerStopped | StopReason::RetriesExhausted
        ));
        assert_eq!(outcome.datagrams, 3);
        assert_eq!(state.get(), Phase::ListenerStopped);
    }

    #[test]
    fn a_terminal_word_short_circuits_the_run() {
        let config = config();
        let (listener, state, _cancel, _port) = listener(&config);

        state.set(Phase::TransmitterStopped).unwrap();

        let outcome = listener.run();
        assert!(matches!(outcome.reason, StopReason::PeerStopped));
        assert_eq!(outcome.datagrams, 0);
        // the listener still marks its own stop on the way out
        assert_eq!(state.get(), Phase::ListenerStopped);
    }

    #[test]
    fn cancellation_during_the_handshake_stops_the_listener() {
        let config = config();
        let (listener, state, cancel, _port) = listener(&config);

        cancel.cancel();

        let outcome = listener.run();
        assert!(matches!(outcome.reason, StopReason::Cancelled));
        assert_eq!(state.get(), Phase::ListenerStopped);
    }
}
