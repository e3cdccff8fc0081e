/// Reasons an acquisition can fail.
///
/// Neither variant leaves the gate in an inconsistent state: a failed
/// acquisition never consumes a permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    /// The gate has been shut down, either before the call or while it was waiting.
    #[error("admission gate has been shut down")]
    Shutdown,

    /// The caller cancelled the acquisition while it was waiting for a permit.
    #[error("acquisition cancelled while waiting for a permit")]
    Cancelled,
}

/// Errors produced when validating a [`crate::RateWindow`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum WindowError {
    #[error("window period must be greater than zero")]
    ZeroPeriod,

    #[error("window limit must not exceed {max}")]
    LimitTooLarge { max: usize },

    #[error("window durations must not exceed {max:?}")]
    DurationTooLarge { max: std::time::Duration },
}
