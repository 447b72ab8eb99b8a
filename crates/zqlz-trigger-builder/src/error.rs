//! Error types for trigger generation

use thiserror::Error;

use crate::dialect::Dialect;
use crate::models::TriggerTiming;

/// Errors raised while describing or generating a trigger
#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("unsupported dialect: {0}")]
    UnsupportedDialect(String),

    #[error("invalid timing: {0}")]
    InvalidTiming(String),

    #[error("invalid security value: {0:?}")]
    InvalidSecurityValue(String),

    #[error("invalid granularity: {0:?} (expected row or statement)")]
    InvalidGranularity(String),

    #[error("a trigger node cannot have both an action and nested triggers")]
    MixedNodeKind,

    #[error("nested trigger groups are not supported for {dialect} (depth {depth}, max {max})")]
    NestedGroupsNotSupported {
        dialect: Dialect,
        depth: usize,
        max: usize,
    },

    #[error("trigger timing and event(s) must be specified")]
    MissingTiming,

    #[error("{timing} triggers are not supported for {dialect}")]
    TimingNotSupported {
        dialect: Dialect,
        timing: TriggerTiming,
    },

    #[error("multiple events in a single trigger are not supported for {dialect}")]
    MultipleTimingsNotSupported { dialect: Dialect },

    #[error("security {security} is not supported for {dialect}")]
    SecurityNotSupported { dialect: Dialect, security: String },

    #[error("arbitrary user security ({user}) is not supported for {dialect}")]
    ArbitraryUserSecurityNotSupported { dialect: Dialect, user: String },

    #[error("FOR EACH STATEMENT triggers are not supported for {dialect}")]
    StatementGranularityNotSupported { dialect: Dialect },

    #[error("trigger name {name:?} is longer than {max} {unit}")]
    IdentifierTooLong {
        name: String,
        max: usize,
        unit: &'static str,
    },

    #[error("trigger name {0:?} is used more than once")]
    DuplicateTriggerName(String),

    #[error("trigger table must be specified")]
    MissingTable,

    #[error("trigger has no action")]
    MissingAction,

    #[error("grouped triggers for {dialect} may only vary the condition and action ({detail})")]
    GroupedTriggerMismatch {
        dialect: Dialect,
        detail: &'static str,
    },

    #[error("UPDATE OF columns is not supported for {dialect}")]
    UpdateColumnsNotSupported { dialect: Dialect },

    #[error("trigger is not portable to {dialect}: {message}")]
    NotPortable { dialect: Dialect, message: String },

    #[error("configuration error: {0}")]
    Configuration(#[from] serde_json::Error),
}

/// Result type for trigger operations
pub type TriggerResult<T> = Result<T, TriggerError>;
