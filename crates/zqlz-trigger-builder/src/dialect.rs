//! Dialect capability table
//!
//! Every dialect-specific decision made by the validator, the expansion engine
//! and the renderer is driven by the fields of a [`DialectCapabilities`]
//! record. Supporting another engine means adding one record.

use serde::{Deserialize, Serialize};

use crate::error::{TriggerError, TriggerResult};
use crate::models::{SecurityKind, TriggerTiming};

/// Database dialect for trigger generation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    MySql,
    PostgreSql,
    Sqlite,
}

impl Dialect {
    /// All supported dialects
    pub const ALL: [Dialect; 3] = [Dialect::MySql, Dialect::PostgreSql, Dialect::Sqlite];

    /// Resolve a dialect from an adapter or driver name by family substring
    pub fn from_identifier(identifier: &str) -> TriggerResult<Self> {
        let name_lower = identifier.to_lowercase();
        if name_lower.contains("postgres") {
            Ok(Self::PostgreSql)
        } else if name_lower.contains("mysql") || name_lower.contains("mariadb") {
            Ok(Self::MySql)
        } else if name_lower.contains("sqlite") {
            Ok(Self::Sqlite)
        } else {
            Err(TriggerError::UnsupportedDialect(identifier.to_string()))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::PostgreSql => "postgresql",
            Self::Sqlite => "sqlite",
        }
    }

    pub fn capabilities(&self) -> &'static DialectCapabilities {
        match self {
            Self::MySql => &MYSQL,
            Self::PostgreSql => &POSTGRESQL,
            Self::Sqlite => &SQLITE,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Look up the capability record for a dialect identifier such as `"mysql2"`
/// or `"PostgreSQL"`.
pub fn capabilities_for(identifier: &str) -> TriggerResult<&'static DialectCapabilities> {
    Dialect::from_identifier(identifier).map(|dialect| dialect.capabilities())
}

/// How nested trigger intents map onto physical statements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerGrouping {
    /// Every leaf becomes its own statement(s)
    PerEvent,
    /// A group of conditional branches becomes one statement
    PerTimingBundle,
}

/// How the trigger action is wrapped in the emitted DDL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyStyle {
    /// `BEGIN ... END` directly inside CREATE TRIGGER
    Inline,
    /// A trigger function created first, then referenced by the trigger
    FunctionWrapper,
}

/// Where the condition of a trigger is expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStyle {
    /// `WHEN (<condition>)` clause on the trigger
    WhenClause,
    /// `IF <condition> THEN ... END IF;` inside the body
    IfBlock,
}

/// What the identifier length limit counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierUnit {
    Characters,
    /// Encoded UTF-8 bytes (PostgreSQL's NAMEDATALEN)
    Bytes,
}

impl IdentifierUnit {
    pub fn measure(&self, identifier: &str) -> usize {
        match self {
            Self::Characters => identifier.chars().count(),
            Self::Bytes => identifier.len(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Characters => "characters",
            Self::Bytes => "bytes",
        }
    }
}

/// How an explicit, non-default security mode is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityClause {
    /// No trigger-level security concept
    Unsupported,
    /// `CREATE DEFINER = <user> TRIGGER`
    DefinerAssignment,
    /// `SECURITY <mode>` on the trigger function
    FunctionAttribute,
}

/// Static trigger facts for one database engine
#[derive(Debug)]
pub struct DialectCapabilities {
    pub dialect: Dialect,
    pub allowed_timings: &'static [TriggerTiming],
    /// Several events can share one statement (`UPDATE OR DELETE`)
    pub supports_multi_timing: bool,
    /// Several events on one leaf are rejected rather than expanded
    pub rejects_multiple_events: bool,
    pub supports_statement_granularity: bool,
    pub supports_update_columns: bool,
    pub allowed_security_modes: &'static [SecurityKind],
    /// None when the engine has no trigger-level security concept
    pub default_security_mode: Option<SecurityKind>,
    pub max_identifier_length: usize,
    pub identifier_unit: IdentifierUnit,
    /// Deepest chain of nested groups accepted
    pub max_group_depth: usize,
    pub groups_triggers_by: TriggerGrouping,
    pub body_style: BodyStyle,
    pub condition_style: ConditionStyle,
    pub security_clause: SecurityClause,
    pub event_separator: &'static str,
}

impl DialectCapabilities {
    pub fn allows_timing(&self, timing: TriggerTiming) -> bool {
        self.allowed_timings.contains(&timing)
    }

    pub fn allows_security(&self, kind: SecurityKind) -> bool {
        self.allowed_security_modes.contains(&kind)
    }

    pub fn is_default_security(&self, kind: SecurityKind) -> bool {
        self.default_security_mode == Some(kind)
    }
}

static MYSQL: DialectCapabilities = DialectCapabilities {
    dialect: Dialect::MySql,
    // no INSTEAD OF triggers
    allowed_timings: &[TriggerTiming::Before, TriggerTiming::After],
    supports_multi_timing: false,
    rejects_multiple_events: true,
    supports_statement_granularity: false,
    supports_update_columns: false,
    allowed_security_modes: &[SecurityKind::Definer, SecurityKind::NamedUser],
    default_security_mode: Some(SecurityKind::Definer),
    max_identifier_length: 64,
    identifier_unit: IdentifierUnit::Characters,
    max_group_depth: 1,
    groups_triggers_by: TriggerGrouping::PerTimingBundle,
    body_style: BodyStyle::Inline,
    condition_style: ConditionStyle::IfBlock,
    security_clause: SecurityClause::DefinerAssignment,
    event_separator: " OR ",
};

static POSTGRESQL: DialectCapabilities = DialectCapabilities {
    dialect: Dialect::PostgreSql,
    allowed_timings: &[TriggerTiming::Before, TriggerTiming::After, TriggerTiming::InsteadOf],
    supports_multi_timing: true,
    rejects_multiple_events: false,
    supports_statement_granularity: true,
    supports_update_columns: true,
    allowed_security_modes: &[SecurityKind::Invoker, SecurityKind::Definer],
    default_security_mode: Some(SecurityKind::Invoker),
    max_identifier_length: 63,
    identifier_unit: IdentifierUnit::Bytes,
    max_group_depth: 2,
    groups_triggers_by: TriggerGrouping::PerEvent,
    body_style: BodyStyle::FunctionWrapper,
    condition_style: ConditionStyle::WhenClause,
    security_clause: SecurityClause::FunctionAttribute,
    event_separator: " OR ",
};

static SQLITE: DialectCapabilities = DialectCapabilities {
    dialect: Dialect::Sqlite,
    allowed_timings: &[TriggerTiming::Before, TriggerTiming::After, TriggerTiming::InsteadOf],
    supports_multi_timing: false,
    rejects_multiple_events: false,
    supports_statement_granularity: false,
    supports_update_columns: true,
    allowed_security_modes: &[],
    default_security_mode: None,
    // no limit
    max_identifier_length: usize::MAX,
    identifier_unit: IdentifierUnit::Characters,
    max_group_depth: 2,
    groups_triggers_by: TriggerGrouping::PerEvent,
    body_style: BodyStyle::Inline,
    condition_style: ConditionStyle::WhenClause,
    security_clause: SecurityClause::Unsupported,
    event_separator: " OR ",
};
