//! Result output port.

use crate::domain::EstimateResult;

/// Port for writing estimation results.
pub trait ResultOutput: Send + Sync {
    /// Writes a single estimation result.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    fn write(&self, result: &EstimateResult) -> anyhow::Result<()>;

    /// Flushes any buffered output.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails.
    fn flush(&self) -> anyhow::Result<()>;
}
