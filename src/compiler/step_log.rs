//! Per-resource step logging on top of `tracing`
//!
//! Each processor invocation reports a start event, then either completion or
//! an error. Without an installed subscriber these are no-ops.

use std::fmt::Display;
use uuid::Uuid;

/// Step logger bound to one resource of one run
#[derive(Debug, Clone, Copy)]
pub struct StepLogger<'a> {
    run_id: Uuid,
    resource: &'a str,
    resource_type: &'a str,
}

impl<'a> StepLogger<'a> {
    /// Create a logger for `resource` of type `resource_type`
    pub fn new(run_id: Uuid, resource: &'a str, resource_type: &'a str) -> Self {
        Self {
            run_id,
            resource,
            resource_type,
        }
    }

    /// Report the start of the step
    pub fn start(&self, message: impl Display) {
        tracing::info!(
            run_id = %self.run_id,
            resource = self.resource,
            resource_type = self.resource_type,
            "{}",
            message
        );
    }

    /// Report an intermediate step
    pub fn progress(&self, message: impl Display) {
        tracing::debug!(
            run_id = %self.run_id,
            resource = self.resource,
            resource_type = self.resource_type,
            "{}",
            message
        );
    }

    /// Report successful completion
    pub fn done(&self) {
        tracing::debug!(
            run_id = %self.run_id,
            resource = self.resource,
            resource_type = self.resource_type,
            "done"
        );
    }

    /// Report a failure
    pub fn error(&self, error: &dyn std::error::Error) {
        tracing::error!(
            run_id = %self.run_id,
            resource = self.resource,
            resource_type = self.resource_type,
            "{}",
            error
        );
    }
}
