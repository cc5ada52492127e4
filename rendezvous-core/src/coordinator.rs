use crate::listener::Listener;
use crate::report::{EndpointOutcome, EndpointStatus, RendezvousReport};
use crate::transmitter::Transmitter;
use crate::transport::Transport;
use crate::{CancelToken, RendezvousConfig, SharedState, Side};
use anyhow::{Context as _, Result};
use log::{debug, info, warn};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Coordinator of one rendezvous run.
///
/// [`start`] opens both sockets first, so a bind conflict aborts before
/// any thread exists, then spawns one named thread per endpoint.
/// [`join`] waits for the endpoints and produces a
/// [`RendezvousReport`]: as long as nothing has asked to stop the wait
/// is unbounded, but once a shutdown is initiated (an endpoint
/// finished, the shared word went terminal or cancellation was
/// requested) the remaining endpoints get [`join_timeout`] to stop
/// before being reported incomplete.
///
/// [`start`]: Rendezvous::start
/// [`join`]: Rendezvous::join
/// [`join_timeout`]: RendezvousConfig::join_timeout
pub struct Rendezvous {
    state: Arc<SharedState>,
    cancel: Arc<CancelToken>,
    join_timeout: Duration,
    poll: Duration,
    done: mpsc::Receiver<Side>,
    listener: JoinHandle<EndpointOutcome>,
    transmitter: JoinHandle<EndpointOutcome>,
}

impl Rendezvous {
    /// Bind both sockets and spawn both endpoint threads.
    ///
    /// The transmitter is aimed at the port the listener actually
    /// bound, so `config.port` 0 (ephemeral) works end to end. The
    /// `cancel` token is shared: latching it, from any thread, winds
    /// the whole run down.
    pub fn start(config: RendezvousConfig, cancel: Arc<CancelToken>) -> Result<Self> {
        let state = Arc::new(SharedState::protocol());

        let sender_socket = Transport::sender().context("failed to open the transmitter socket")?;
        let listener_socket = Transport::listener(config.port, config.recv_timeout)
            .with_context(|| format!("failed to bind the listener on port {}", config.port))?;
        let target_port = listener_socket
            .local_port()
            .context("failed to read back the listener port")?;

        let transmitter = Transmitter::new(
            sender_socket,
            Arc::clone(&state),
            Arc::clone(&cancel),
            target_port,
            &config,
        );
        let listener = Listener::new(
            listener_socket,
            Arc::clone(&state),
            Arc::clone(&cancel),
            &config,
        );

        debug!("starting endpoints, datagrams target port {target_port}");

        let (done_tx, done) = mpsc::channel();
        let transmitter =
            spawn_endpoint(Side::Transmitter, done_tx.clone(), move || transmitter.run())?;
        let listener = spawn_endpoint(Side::Listener, done_tx, move || listener.run())?;

        Ok(Self {
            state,
            cancel,
            join_timeout: config.join_timeout,
            poll: config.handshake_poll,
            done,
            listener,
            transmitter,
        })
    }

    /// Wait for both endpoints and report what each one did.
    pub fn join(self) -> RendezvousReport {
        let Self {
            state,
            cancel,
            join_timeout,
            poll,
            done,
            listener,
            transmitter,
        } = self;

        let mut listener_done = false;
        let mut transmitter_done = false;

        // unbounded while the run is healthy: nothing asked to stop yet
        let mut disconnected = false;
        while !cancel.is_cancelled() && !state.get().is_terminal() {
            match done.recv_timeout(poll) {
                Ok(Side::Listener) => {
                    listener_done = true;
                    break;
                }
                Ok(Side::Transmitter) => {
                    transmitter_done = true;
                    break;
                }
                Err(mpsc::RecvTimeoutError::Timeout) => (),
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    disconnected = true;
                    break;
                }
            }
        }

        // a shutdown is under way; the rest must land within the budget
        debug!("shutdown initiated, join budget is {join_timeout:?}");
        let deadline = Instant::now() + join_timeout;
        while !disconnected && !(listener_done && transmitter_done) {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                break;
            };
            match done.recv_timeout(remaining) {
                Ok(Side::Listener) => listener_done = true,
                Ok(Side::Transmitter) => transmitter_done = true,
                Err(mpsc::RecvTimeoutError::Timeout) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        let report = RendezvousReport {
            listener: reap(Side::Listener, listener, listener_done),
            transmitter: reap(Side::Transmitter, transmitter, transmitter_done),
        };
        info!("rendezvous finished, {report}");
        report
    }

    /// [`start`] and [`join`] in one call.
    ///
    /// [`start`]: Rendezvous::start
    /// [`join`]: Rendezvous::join
    pub fn run(config: RendezvousConfig, cancel: Arc<CancelToken>) -> Result<RendezvousReport> {
        Ok(Self::start(config, cancel)?.join())
    }
}

fn spawn_endpoint(
    side: Side,
    done: mpsc::Sender<Side>,
    run: impl FnOnce() -> EndpointOutcome + Send + 'static,
) -> Result<JoinHandle<EndpointOutcome>> {
    thread::Builder::new()
        .name(side.to_string())
        .spawn(move || {
            let outcome = run();
            // the receiver is gone when the join already gave up;
            // nothing left to tell it then
            let _ = done.send(side);
            outcome
        })
        .with_context(|| format!("failed to spawn the {side} thread"))
}

fn reap(side: Side, handle: JoinHandle<EndpointOutcome>, reported: bool) -> EndpointStatus {
    if !reported && !handle.is_finished() {
        warn!("{side} did not stop within the join budget");
        return EndpointStatus::Incomplete;
    }
    match handle.join() {
        Ok(outcome) => EndpointStatus::Finished(outcome),
        Err(_panic) => {
            warn!("{side} thread panicked");
            EndpointStatus::Panicked
        }
    }
}
