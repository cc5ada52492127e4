use std::time::Duration;

/// Default listener port
///
/// This is the loopback UDP port the listener binds when the
/// configuration does not say otherwise. Port `0` is also accepted by
/// [`Transport::listener`] and means "let the OS pick".
///
/// ```
/// # use rendezvous_core::defaults::*;
/// assert_eq!(DEFAULT_PORT, 11999);
/// ```
///
/// [`Transport::listener`]: crate::Transport::listener
pub const DEFAULT_PORT: u16 = 11999;

/// Default receive buffer size
///
/// Size in bytes of the buffer handed to each receive call. A datagram
/// longer than the buffer is truncated to fit, per UDP semantics.
///
/// ```
/// # use rendezvous_core::defaults::*;
/// assert_eq!(DEFAULT_BUFFER_SIZE, 1024);
/// ```
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default iteration cap
///
/// Number of counter datagrams the transmitter sends before stopping on
/// its own. Together with [`SEND_CADENCE`] this bounds the duration of
/// an unattended run.
pub const DEFAULT_MAX_ITERATIONS: u64 = 1000;

/// Receive timeout
///
/// Upper bound on one blocking receive. This is also the worst case
/// latency for the listener to notice a phase change or a cancellation
/// request while no traffic arrives.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// Receive retry budget
///
/// How many receive timeouts the listener tolerates before giving up.
/// The budget covers the whole run; a successful receive does not
/// replenish it.
pub const RETRY_BUDGET: u32 = 2;

/// Send cadence
///
/// Pause between two transmitted datagrams.
pub const SEND_CADENCE: Duration = Duration::from_millis(500);

/// Handshake poll interval
///
/// While waiting on a phase change the endpoints wake at least this
/// often to look at the cancel token, so this is the worst case
/// cancellation latency during the handshake.
pub const HANDSHAKE_POLL: Duration = Duration::from_millis(500);

/// Join budget
///
/// Once a shutdown is initiated (an endpoint finished, a terminal phase
/// was observed or cancellation was requested), the coordinator grants
/// the remaining endpoint threads this much time to stop before
/// reporting them incomplete.
pub const JOIN_TIMEOUT: Duration = Duration::from_secs(5);
