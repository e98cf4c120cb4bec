//! Logging and observability
//!
//! Structured logging through `tracing`: a console layer, plus an optional
//! JSON file layer with rotation. The macros below keep the fields of
//! recurring events consistent across engines.
//!
//! # Example
//!
//! ```no_run
//! use profile_sync::config::LoggingConfig;
//! use profile_sync::logging::init_logging;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(system = "LDAP", "Synchronization requested");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log the start of a process step
///
/// # Example
///
/// ```no_run
/// use profile_sync::log_step_start;
/// use profile_sync::domain::process::{Step, StepKind, SyncOperations};
/// use profile_sync::domain::entity::ObjectType;
///
/// let step = Step::new(0, StepKind::Entities(ObjectType::User), SyncOperations::ALL);
/// log_step_start!("LDAP", &step);
/// ```
#[macro_export]
macro_rules! log_step_start {
    ($system:expr, $step:expr) => {
        tracing::info!(
            system = %$system,
            step = $step.index,
            kind = %$step.kind,
            operations = %$step.operations,
            "Starting step"
        );
    };
}

/// Log the outcome of a process step
///
/// # Example
///
/// ```no_run
/// use profile_sync::log_step_complete;
/// use profile_sync::domain::process::{Step, StepKind, SyncOperations};
/// use profile_sync::domain::entity::ObjectType;
///
/// let step = Step::new(0, StepKind::Entities(ObjectType::User), SyncOperations::ALL);
/// log_step_complete!("LDAP", &step);
/// ```
#[macro_export]
macro_rules! log_step_complete {
    ($system:expr, $step:expr) => {
        tracing::info!(
            system = %$system,
            step = $step.index,
            kind = %$step.kind,
            status = ?$step.status,
            analyzed = $step.temporary.analyzed,
            created = $step.final_counts.create,
            updated = $step.final_counts.update,
            deleted = $step.final_counts.delete,
            relations_added = $step.final_counts.relations_added,
            relations_removed = $step.final_counts.relations_removed,
            hints = $step.hints.len(),
            errors = $step.errors.len(),
            "Step finished"
        );
    };
}

/// Log an error with context
///
/// # Example
///
/// ```no_run
/// use profile_sync::log_error_with_context;
/// use profile_sync::domain::SyncError;
///
/// let error = SyncError::Configuration("Invalid config".to_string());
/// log_error_with_context!(&error, "Failed to load configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = %$context,
            "Error occurred"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use profile_sync::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}

#[cfg(test)]
mod tests {
    use crate::domain::entity::ObjectType;
    use crate::domain::process::{Step, StepKind, SyncOperations};
    use crate::domain::SyncError;

    #[test]
    fn test_macros_expand_without_subscriber() {
        let mut step = Step::new(3, StepKind::Relations(ObjectType::Group), SyncOperations::ADD);
        log_step_start!("LDAP", &step);
        step.mark_completed();
        log_step_complete!("LDAP", &step);
        log_error_with_context!(SyncError::Cancelled, "shutdown");
        log_retry_attempt!(1, 3, "timeout");
    }
}
