use crate::phase::Side;
use crate::transport::TransportError;
use std::fmt;

/// Why an endpoint's main loop ended.
#[derive(Debug)]
pub enum StopReason {
    /// The cancel token fired.
    Cancelled,
    /// The shared phase left `Running`: the peer stopped first.
    PeerStopped,
    /// Listener only. The receive timeout retry budget is spent.
    RetriesExhausted,
    /// Transmitter only. The configured number of datagrams was sent.
    IterationsExhausted,
    /// A socket error ended the loop.
    Transport(TransportError),
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Cancelled => f.write_str("cancelled"),
            StopReason::PeerStopped => f.write_str("peer stopped"),
            StopReason::RetriesExhausted => f.write_str("receive retries exhausted"),
            StopReason::IterationsExhausted => f.write_str("iteration cap reached"),
            StopReason::Transport(error) => write!(f, "transport failed: {error}"),
        }
    }
}

/// What one endpoint did with its run.
#[derive(Debug)]
pub struct EndpointOutcome {
    /// The reporting endpoint.
    pub side: Side,
    /// Why the loop ended.
    pub reason: StopReason,
    /// Datagrams received (listener) or sent (transmitter).
    pub datagrams: u64,
}

impl fmt::Display for EndpointOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{side} {reason}, {count} datagram(s)",
            side = self.side,
            reason = self.reason,
            count = self.datagrams
        )
    }
}

/// Endpoint completion as seen by the coordinator's bounded join.
#[derive(Debug)]
pub enum EndpointStatus {
    /// The thread completed and reported an outcome.
    Finished(EndpointOutcome),
    /// The join budget expired first. The thread was not killed (there
    /// is no forced cancellation for a thread) so it may still be
    /// running detached.
    Incomplete,
    /// The thread panicked instead of reporting.
    Panicked,
}

impl EndpointStatus {
    /// `true` only for [`EndpointStatus::Finished`].
    pub fn is_finished(&self) -> bool {
        matches!(self, EndpointStatus::Finished(_))
    }

    /// The outcome, when the endpoint reported one.
    pub fn outcome(&self) -> Option<&EndpointOutcome> {
        match self {
            EndpointStatus::Finished(outcome) => Some(outcome),
            EndpointStatus::Incomplete | EndpointStatus::Panicked => None,
        }
    }
}

impl fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndpointStatus::Finished(outcome) => write!(f, "{outcome}"),
            EndpointStatus::Incomplete => f.write_str("did not stop in time"),
            EndpointStatus::Panicked => f.write_str("panicked"),
        }
    }
}

/// One status per endpoint, produced by [`Rendezvous::join`].
///
/// Failures are part of the result instead of disappearing into the
/// log: a caller can tell a clean shutdown from a run that left a
/// thread behind or lost one to a panic.
///
/// [`Rendezvous::join`]: crate::Rendezvous::join
#[derive(Debug)]
pub struct RendezvousReport {
    pub listener: EndpointStatus,
    pub transmitter: EndpointStatus,
}

impl RendezvousReport {
    /// Both endpoints finished and reported an outcome.
    pub fn is_clean(&self) -> bool {
        self.listener.is_finished() && self.transmitter.is_finished()
    }
}

impl fmt::Display for RendezvousReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "listener: {listener}; transmitter: {transmitter}",
            listener = self.listener,
            transmitter = self.transmitter
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn finished(side: Side, reason: StopReason, datagrams: u64) -> EndpointStatus {
        EndpointStatus::Finished(EndpointOutcome {
            side,
            reason,
            datagrams,
        })
    }

    #[test]
    fn a_report_is_clean_only_when_both_sides_finished() {
        let clean = RendezvousReport {
            listener: finished(Side::Listener, StopReason::PeerStopped, 3),
            transmitter: finished(Side::Transmitter, StopReason::IterationsExhausted, 3),
        };
        assert!(clean.is_clean());

        let late = RendezvousReport {
            listener: EndpointStatus::Incomplete,
            transmitter: finished(Side::Transmitter, StopReason::Cancelled, 1),
        };
        assert!(!late.is_clean());

        let crashed = RendezvousReport {
            listener: finished(Side::Listener, StopReason::RetriesExhausted, 0),
            transmitter: EndpointStatus::Panicked,
        };
        assert!(!crashed.is_clean());
    }

    #[test]
    fn outcome_is_only_available_when_finished() {
        let status = finished(Side::Listener, StopReason::PeerStopped, 2);
        assert_eq!(status.outcome().map(|outcome| outcome.datagrams), Some(2));

        assert!(EndpointStatus::Incomplete.outcome().is_none());
        assert!(EndpointStatus::Panicked.outcome().is_none());
    }

    #[test]
    fn display_reads_as_one_line_per_run() {
        let report = RendezvousReport {
            listener: EndpointStatus::Incomplete,
            transmitter: finished(Side::Transmitter, StopReason::IterationsExhausted, 1000),
        };
        assert_eq!(
            report.to_string(),
            "listener: did not stop in time; \
             transmitter: transmitter iteration cap reached, 1000 datagram(s)"
        );
    }
}
