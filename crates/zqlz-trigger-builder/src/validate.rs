//! Dialect validation of trigger intent trees
//!
//! Rules run top-down and stop at the first violation:
//!
//! 1. explicit names must fit the dialect's identifier length
//! 2. group nesting must not exceed the dialect's depth
//! 3. every leaf needs an action (bundled groups may only vary condition/action)
//! 4. per trigger: timing, multiple events, security, granularity, inherited
//!    name length, table, update columns
//! 5. the final (derived or expanded) names: length and uniqueness

use crate::dialect::{Dialect, DialectCapabilities};
use crate::error::{TriggerError, TriggerResult};
use crate::models::{Granularity, SecurityMode};
use crate::expand::{PlannedTrigger, plan_triggers};
use crate::node::TriggerNode;
use crate::options::BuilderOptions;
use crate::resolve::{TriggerUnit, resolve_units};

/// A rule the tree satisfies for the active dialect but would break on another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortabilityWarning {
    pub dialect: Dialect,
    pub message: String,
}

impl std::fmt::Display for PortabilityWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.dialect, self.message)
    }
}

/// Validate `root` for a dialect and return its resolved trigger units
pub(crate) fn validate_tree<'a>(
    root: &'a TriggerNode,
    caps: &DialectCapabilities,
) -> TriggerResult<Vec<TriggerUnit<'a>>> {
    check_explicit_names(root, caps)?;

    let depth = root.group_depth();
    if depth > caps.max_group_depth {
        return Err(TriggerError::NestedGroupsNotSupported {
            dialect: caps.dialect,
            depth,
            max: caps.max_group_depth,
        });
    }

    let units = resolve_units(root, caps)?;
    for unit in &units {
        check_unit(unit, caps)?;
    }
    Ok(units)
}

/// Validate `root` together with the names its triggers will be created under
pub(crate) fn check_tree<'a>(
    root: &'a TriggerNode,
    caps: &DialectCapabilities,
    options: &BuilderOptions,
) -> TriggerResult<(Vec<TriggerUnit<'a>>, Vec<PlannedTrigger>)> {
    let units = validate_tree(root, caps)?;
    let planned = plan_triggers(&units, caps, options)?;
    Ok((units, planned))
}

/// Run the rules of every other dialect against `root`
pub(crate) fn portability_warnings(
    root: &TriggerNode,
    active: Dialect,
    options: &BuilderOptions,
) -> Vec<PortabilityWarning> {
    Dialect::ALL
        .into_iter()
        .filter(|dialect| *dialect != active)
        .filter_map(|dialect| {
            check_tree(root, dialect.capabilities(), options)
                .err()
                .map(|err| PortabilityWarning {
                    dialect,
                    message: err.to_string(),
                })
        })
        .collect()
}

fn check_explicit_names(node: &TriggerNode, caps: &DialectCapabilities) -> TriggerResult<()> {
    if let Some(name) = &node.name {
        check_identifier(name, caps)?;
    }
    node.children()
        .iter()
        .try_for_each(|child| check_explicit_names(child, caps))
}

pub(crate) fn check_identifier(name: &str, caps: &DialectCapabilities) -> TriggerResult<()> {
    if caps.identifier_unit.measure(name) > caps.max_identifier_length {
        return Err(TriggerError::IdentifierTooLong {
            name: name.to_string(),
            max: caps.max_identifier_length,
            unit: caps.identifier_unit.as_str(),
        });
    }
    Ok(())
}

fn check_unit(unit: &TriggerUnit<'_>, caps: &DialectCapabilities) -> TriggerResult<()> {
    let settings = &unit.settings;

    let Some(timing) = settings.timing.filter(|_| !settings.events.is_empty()) else {
        return Err(TriggerError::MissingTiming);
    };

    if !caps.allows_timing(timing) {
        return Err(TriggerError::TimingNotSupported {
            dialect: caps.dialect,
            timing,
        });
    }

    if settings.events.len() > 1 && caps.rejects_multiple_events {
        return Err(TriggerError::MultipleTimingsNotSupported {
            dialect: caps.dialect,
        });
    }

    if let Some(mode) = settings.security {
        check_security(mode, caps)?;
    }

    if settings.granularity == Some(Granularity::Statement) && !caps.supports_statement_granularity {
        return Err(TriggerError::StatementGranularityNotSupported {
            dialect: caps.dialect,
        });
    }

    if let Some(name) = &settings.name {
        check_identifier(name, caps)?;
    }

    if settings.table.is_none_or(|table| table.trim().is_empty()) {
        return Err(TriggerError::MissingTable);
    }

    if !settings.update_columns.is_empty() && !caps.supports_update_columns {
        return Err(TriggerError::UpdateColumnsNotSupported {
            dialect: caps.dialect,
        });
    }

    Ok(())
}

fn check_security(mode: &SecurityMode, caps: &DialectCapabilities) -> TriggerResult<()> {
    let kind = mode.kind();
    if caps.allows_security(kind) {
        return Ok(());
    }
    match mode {
        SecurityMode::NamedUser(user) if !caps.allowed_security_modes.is_empty() => {
            Err(TriggerError::ArbitraryUserSecurityNotSupported {
                dialect: caps.dialect,
                user: user.clone(),
            })
        }
        _ => Err(TriggerError::SecurityNotSupported {
            dialect: caps.dialect,
            security: mode.to_string(),
        }),
    }
}

/// Security that ends up in the DDL: an explicit mode that differs from the
/// dialect default. Defaults are implicit and never rendered.
pub(crate) fn rendered_security(
    mode: Option<&SecurityMode>,
    caps: &DialectCapabilities,
) -> Option<SecurityMode> {
    mode.filter(|mode| !caps.is_default_security(mode.kind()))
        .cloned()
}
