use std::time::Duration;

/// Cadence of the joystick polling loop (~60Hz)
pub const POLL_INTERVAL: Duration = Duration::from_millis(16);

/// Stick/trigger deflections below this magnitude are treated as rest
/// position noise and forced to zero.
pub const DEADZONE: f64 = 0.05;

/// Minimum normalized change in a stick/trigger value that counts as a
/// real change when computing deltas. 16-bit ADC jitter sits below this.
pub const ANALOG_TOLERANCE: f64 = 0.01;

/// Capacity of the reader -> broadcaster change channel. The reader
/// drops samples instead of blocking when the channel is full.
pub const CHANGES_BUFFER: usize = 64;

/// Capacity of each client's outbound message queue. Clients that fall
/// this far behind are evicted.
pub const CLIENT_BUFFER: usize = 256;

/// Capacity of the hub command channel
pub const HUB_BUFFER: usize = 256;

/// Capacity of the broadcaster's client registration channel
pub const SYNC_BUFFER: usize = 16;

/// Interval for unconditional full-state resync while a device is
/// connected
pub const FULL_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Number of consecutive delta emissions after which the next emission
/// is forced to be a full snapshot
pub const DELTA_FULL_SYNC_COUNT: u32 = 100;

/// Default HTTP listen address
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
