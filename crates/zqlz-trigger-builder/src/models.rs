//! Trigger intent primitives

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{TriggerError, TriggerResult};

/// When the trigger fires relative to the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerTiming {
    Before,
    After,
    InsteadOf,
}

impl TriggerTiming {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Before => "BEFORE",
            Self::After => "AFTER",
            Self::InsteadOf => "INSTEAD OF",
        }
    }

    /// Fragment used when deriving trigger names
    pub fn name_fragment(&self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
            Self::InsteadOf => "instead_of",
        }
    }
}

impl std::fmt::Display for TriggerTiming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The DML event that fires the trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl TriggerEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }

    pub fn name_fragment(&self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }

    /// All events in canonical order
    pub fn all() -> [Self; 3] {
        [Self::Insert, Self::Update, Self::Delete]
    }

    fn bit(&self) -> u8 {
        match self {
            Self::Insert => 0b001,
            Self::Update => 0b010,
            Self::Delete => 0b100,
        }
    }
}

impl std::fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TriggerEvent {
    type Err = TriggerError;

    fn from_str(s: &str) -> TriggerResult<Self> {
        match s.trim().trim_start_matches(':').to_ascii_lowercase().as_str() {
            "insert" => Ok(Self::Insert),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(TriggerError::InvalidTiming(format!("unknown event {:?}", s))),
        }
    }
}

/// A set of trigger events, iterated in canonical order (insert, update, delete)
/// regardless of the order they were supplied in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct EventSet {
    bits: u8,
}

impl EventSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(event: TriggerEvent) -> Self {
        Self { bits: event.bit() }
    }

    pub fn insert(&mut self, event: TriggerEvent) {
        self.bits |= event.bit();
    }

    pub fn contains(&self, event: TriggerEvent) -> bool {
        self.bits & event.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    pub fn iter(&self) -> impl Iterator<Item = TriggerEvent> + '_ {
        TriggerEvent::all()
            .into_iter()
            .filter(move |event| self.contains(*event))
    }
}

impl FromIterator<TriggerEvent> for EventSet {
    fn from_iter<I: IntoIterator<Item = TriggerEvent>>(iter: I) -> Self {
        let mut set = Self::new();
        for event in iter {
            set.insert(event);
        }
        set
    }
}

/// Shape of a security mode, used by dialect capability records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityKind {
    Definer,
    Invoker,
    NamedUser,
}

/// Privilege context the trigger body executes under
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecurityMode {
    Definer,
    Invoker,
    /// A verbatim account reference such as `'user'@'host'` or `CURRENT_USER`
    NamedUser(String),
}

impl SecurityMode {
    pub fn kind(&self) -> SecurityKind {
        match self {
            Self::Definer => SecurityKind::Definer,
            Self::Invoker => SecurityKind::Invoker,
            Self::NamedUser(_) => SecurityKind::NamedUser,
        }
    }

    /// Build a named-user security mode, checking that the text looks like an account
    pub fn named_user(user: impl Into<String>) -> TriggerResult<Self> {
        let user = user.into();
        if is_account_reference(&user) {
            Ok(Self::NamedUser(user))
        } else {
            Err(TriggerError::InvalidSecurityValue(user))
        }
    }
}

impl std::fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Definer => write!(f, "DEFINER"),
            Self::Invoker => write!(f, "INVOKER"),
            Self::NamedUser(user) => write!(f, "{}", user),
        }
    }
}

impl FromStr for SecurityMode {
    type Err = TriggerError;

    fn from_str(s: &str) -> TriggerResult<Self> {
        match s.trim().trim_start_matches(':').to_ascii_lowercase().as_str() {
            "definer" => Ok(Self::Definer),
            "invoker" => Ok(Self::Invoker),
            _ => Self::named_user(s.trim()),
        }
    }
}

/// `CURRENT_USER`, `CURRENT_USER()` or `user@host` with both sides present
fn is_account_reference(value: &str) -> bool {
    let value = value.trim();
    if value.eq_ignore_ascii_case("current_user") || value.eq_ignore_ascii_case("current_user()") {
        return true;
    }
    match value.split_once('@') {
        Some((user, host)) => !user.trim().is_empty() && !host.trim().is_empty(),
        None => false,
    }
}

/// FOR EACH ROW vs FOR EACH STATEMENT
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Row,
    Statement,
}

impl Granularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Row => "ROW",
            Self::Statement => "STATEMENT",
        }
    }

    pub fn name_fragment(&self) -> &'static str {
        match self {
            Self::Row => "row",
            Self::Statement => "statement",
        }
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Granularity {
    type Err = TriggerError;

    fn from_str(s: &str) -> TriggerResult<Self> {
        match s.trim().trim_start_matches(':').to_ascii_lowercase().as_str() {
            "row" => Ok(Self::Row),
            "statement" => Ok(Self::Statement),
            _ => Err(TriggerError::InvalidGranularity(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_set_iterates_in_canonical_order() {
        let set: EventSet = [TriggerEvent::Delete, TriggerEvent::Insert, TriggerEvent::Delete]
            .into_iter()
            .collect();

        assert_eq!(set.len(), 2);
        assert_eq!(
            set.iter().collect::<Vec<_>>(),
            vec![TriggerEvent::Insert, TriggerEvent::Delete]
        );
    }

    #[test]
    fn test_parse_security_modes() {
        assert_eq!("definer".parse::<SecurityMode>().unwrap(), SecurityMode::Definer);
        assert_eq!(":invoker".parse::<SecurityMode>().unwrap(), SecurityMode::Invoker);
        assert_eq!(
            "'user'@'host'".parse::<SecurityMode>().unwrap(),
            SecurityMode::NamedUser("'user'@'host'".to_string())
        );
        assert_eq!(
            "CURRENT_USER".parse::<SecurityMode>().unwrap(),
            SecurityMode::NamedUser("CURRENT_USER".to_string())
        );
    }

    #[test]
    fn test_reject_malformed_security() {
        for value in ["", "nobody", "@host", "user@"] {
            assert!(
                matches!(
                    value.parse::<SecurityMode>(),
                    Err(TriggerError::InvalidSecurityValue(_))
                ),
                "{value:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_parse_granularity() {
        assert_eq!("ROW".parse::<Granularity>().unwrap(), Granularity::Row);
        assert_eq!(
            ":statement".parse::<Granularity>().unwrap(),
            Granularity::Statement
        );
        assert!(matches!(
            "column".parse::<Granularity>(),
            Err(TriggerError::InvalidGranularity(_))
        ));
    }

    #[test]
    fn test_parse_event() {
        assert_eq!("Update".parse::<TriggerEvent>().unwrap(), TriggerEvent::Update);
        assert!(matches!(
            "truncate".parse::<TriggerEvent>(),
            Err(TriggerError::InvalidTiming(_))
        ));
    }
}
