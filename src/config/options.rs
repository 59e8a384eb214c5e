//! Tuning knobs for the config actors.

/// Mailbox sizes of the internal tasks.
#[derive(Debug, Clone)]
pub struct ConfigOptions {
    /// Pending `set`/`reset` requests before callers wait for room.
    pub request_capacity: usize,
    /// Pending `register`/`unregister` commands before callers wait for room.
    pub command_capacity: usize,
}

impl Default for ConfigOptions {
    fn default() -> Self {
        Self {
            request_capacity: 16,
            command_capacity: 16,
        }
    }
}
