//! Settings inheritance across the intent tree
//!
//! Walks a tree and flattens it into [`TriggerUnit`]s: the pieces that each
//! turn into one or more physical statements. Group nodes pass their settings
//! down to children; on per-timing-bundle dialects a group of conditional
//! branches is kept together as one unit.

use crate::dialect::{DialectCapabilities, TriggerGrouping};
use crate::error::{TriggerError, TriggerResult};
use crate::models::{EventSet, Granularity, SecurityMode, TriggerTiming};
use crate::node::{Action, NodeBody, TriggerNode};

/// Settings in effect at a node after inheritance
#[derive(Debug, Clone, Default)]
pub(crate) struct Inherited<'a> {
    pub name: Option<String>,
    pub table: Option<&'a str>,
    pub timing: Option<TriggerTiming>,
    pub events: EventSet,
    pub update_columns: &'a [String],
    pub security: Option<&'a SecurityMode>,
    pub granularity: Option<Granularity>,
    pub condition: Option<String>,
}

impl<'a> Inherited<'a> {
    /// Settings for `node`, the `position`-th (1-based) child of the scope
    /// described by `self`. The root uses position 0.
    fn apply(&self, node: &'a TriggerNode, position: usize) -> Self {
        let name = match (&node.name, &self.name) {
            (Some(own), _) => Some(own.clone()),
            (None, Some(prefix)) if position > 0 => Some(format!("{}_{}", prefix, position)),
            _ => None,
        };
        let (timing, events) = match node.timing {
            Some(timing) => (Some(timing), node.events),
            None => (self.timing, self.events),
        };
        Self {
            name,
            table: node.table.as_deref().or(self.table),
            timing,
            events,
            update_columns: if node.update_columns.is_empty() {
                self.update_columns
            } else {
                node.update_columns.as_slice()
            },
            security: node.security.as_ref().or(self.security),
            granularity: node.granularity.or(self.granularity),
            condition: combine_conditions(self.condition.as_deref(), node.condition.as_deref()),
        }
    }
}

fn combine_conditions(outer: Option<&str>, inner: Option<&str>) -> Option<String> {
    match (outer, inner) {
        (Some(outer), Some(inner)) => Some(format!("({}) AND ({})", outer, inner)),
        (Some(only), None) | (None, Some(only)) => Some(only.to_string()),
        (None, None) => None,
    }
}

/// A conditional branch of a bundled trigger
#[derive(Debug)]
pub(crate) struct Branch<'a> {
    pub condition: Option<String>,
    pub action: &'a Action,
}

#[derive(Debug)]
pub(crate) enum UnitBody<'a> {
    Action(&'a Action),
    Branches(Vec<Branch<'a>>),
}

/// A leaf, or a bundled group, with its inherited settings
#[derive(Debug)]
pub(crate) struct TriggerUnit<'a> {
    pub settings: Inherited<'a>,
    pub body: UnitBody<'a>,
}

/// Flatten `root` into units in declaration order.
///
/// Expects the tree to have passed the depth check already.
pub(crate) fn resolve_units<'a>(
    root: &'a TriggerNode,
    caps: &DialectCapabilities,
) -> TriggerResult<Vec<TriggerUnit<'a>>> {
    let mut units = Vec::new();
    collect(root, &Inherited::default(), 0, caps, &mut units)?;
    Ok(units)
}

fn collect<'a>(
    node: &'a TriggerNode,
    parent: &Inherited<'a>,
    position: usize,
    caps: &DialectCapabilities,
    units: &mut Vec<TriggerUnit<'a>>,
) -> TriggerResult<()> {
    let settings = parent.apply(node, position);
    match &node.body {
        NodeBody::Pending => Err(TriggerError::MissingAction),
        NodeBody::Action(action) => {
            units.push(TriggerUnit {
                settings,
                body: UnitBody::Action(action),
            });
            Ok(())
        }
        NodeBody::Children(children) => {
            if caps.groups_triggers_by == TriggerGrouping::PerTimingBundle {
                let unit = bundle(children, settings, caps)?;
                units.push(unit);
                return Ok(());
            }
            for (index, child) in children.iter().enumerate() {
                collect(child, &settings, index + 1, caps, units)?;
            }
            Ok(())
        }
    }
}

fn bundle<'a>(
    children: &'a [TriggerNode],
    settings: Inherited<'a>,
    caps: &DialectCapabilities,
) -> TriggerResult<TriggerUnit<'a>> {
    let mismatch = |detail| TriggerError::GroupedTriggerMismatch {
        dialect: caps.dialect,
        detail,
    };
    let mut branches = Vec::with_capacity(children.len());
    for child in children {
        if child.name.is_some() {
            return Err(mismatch("name"));
        }
        if child.table.is_some() {
            return Err(mismatch("table"));
        }
        if child.timing.is_some() {
            return Err(mismatch("timing"));
        }
        if !child.update_columns.is_empty() {
            return Err(mismatch("update columns"));
        }
        if child.security.is_some() {
            return Err(mismatch("security"));
        }
        if child.granularity.is_some() {
            return Err(mismatch("granularity"));
        }
        match &child.body {
            NodeBody::Action(action) => branches.push(Branch {
                condition: child.condition.clone(),
                action,
            }),
            NodeBody::Pending => return Err(TriggerError::MissingAction),
            NodeBody::Children(_) => {
                return Err(TriggerError::NestedGroupsNotSupported {
                    dialect: caps.dialect,
                    depth: 2,
                    max: caps.max_group_depth,
                });
            }
        }
    }
    Ok(TriggerUnit {
        settings,
        body: UnitBody::Branches(branches),
    })
}
