use crate::handshake::{self, Handshake};
use crate::report::{EndpointOutcome, StopReason};
use crate::transport::Transport;
use crate::{CancelToken, Phase, RendezvousConfig, SharedState, Side};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration;

/// The sending endpoint.
///
/// Owns its (ephemeral) socket for the whole run. Announces
/// `transmitter_ready`, then sends one ASCII counter datagram per
/// cadence tick until the peer stops, cancellation is requested or the
/// iteration cap is reached.
pub struct Transmitter {
    transport: Transport,
    state: Arc<SharedState>,
    cancel: Arc<CancelToken>,
    target_port: u16,
    max_iterations: u64,
    send_cadence: Duration,
    handshake_poll: Duration,
}

impl Transmitter {
    /// `target_port` is where the datagrams go, normally the listener's
    /// actual bound port. `state` must approve every protocol phase
    /// ([`SharedState::protocol`]); a rejected transition is a
    /// programming error and panics.
    pub fn new(
        transport: Transport,
        state: Arc<SharedState>,
        cancel: Arc<CancelToken>,
        target_port: u16,
        config: &RendezvousConfig,
    ) -> Self {
        Self {
            transport,
            state,
            cancel,
            target_port,
            max_iterations: config.max_iterations,
            send_cadence: config.send_cadence,
            handshake_poll: config.handshake_poll,
        }
    }

    /// Run the endpoint to completion.
    ///
    /// When the stop is its own (cancellation, iteration cap, socket
    /// failure) the transmitter writes [`Phase::TransmitterStopped`]
    /// and leaves immediately rather than waiting for the peer to echo
    /// anything; when the stop is the peer's, the peer's terminal value
    /// is left in place.
    pub fn run(self) -> EndpointOutcome {
        let mut sent = 0;

        let reason = match handshake::rendezvous(
            &self.state,
            Side::Transmitter,
            &self.cancel,
            self.handshake_poll,
        ) {
            Handshake::Proceed { observed } => {
                debug!("transmitter proceeding after observing {observed}");
                self.state
                    .force(Phase::Running)
                    .expect("the shared word approves running");
                self.send_loop(&mut sent)
            }
            Handshake::Cancelled => {
                self.flag_own_stop();
                StopReason::Cancelled
            }
            Handshake::PeerStopped => StopReason::PeerStopped,
        };

        info!("finished transmitting: {reason}");

        EndpointOutcome {
            side: Side::Transmitter,
            reason,
            datagrams: sent,
        }
    }

    fn send_loop(&self, sent: &mut u64) -> StopReason {
        info!("starting to transmit");
        loop {
            let phase = self.state.get();
            if phase.is_terminal() {
                debug!("phase is {phase}, leaving the send loop");
                return StopReason::PeerStopped;
            }
            if self.cancel.is_cancelled() {
                info!("cancellation requested, transmitter stopping");
                self.flag_own_stop();
                return StopReason::Cancelled;
            }
            if *sent == self.max_iterations {
                info!("iteration cap reached after {sent} datagram(s)");
                self.flag_own_stop();
                return StopReason::IterationsExhausted;
            }

            let payload = sent.to_string();
            match self.transport.send_to(payload.as_bytes(), self.target_port) {
                Ok(_) => info!("sending value {sent}"),
                Err(error) => {
                    error!("send failed: {error}");
                    self.flag_own_stop();
                    return StopReason::Transport(error);
                }
            }

            // cadence pause; a terminal phase cuts it short
            self.state.wait_for(self.send_cadence, Phase::is_terminal);
            *sent += 1;
        }
    }

    /// Writing the terminal value is what tells the peer to wind down;
    /// the write is idempotent so racing with the peer's own stop is
    /// harmless.
    fn flag_own_stop(&self) {
        self.state
            .force(Phase::TransmitterStopped)
            .expect("the shared word approves transmitter_stopped");
    }
}
