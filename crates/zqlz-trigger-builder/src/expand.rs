//! Expansion of validated trigger units into physical triggers

use std::collections::{HashMap, HashSet};

use itertools::Itertools;

use crate::dialect::DialectCapabilities;
use crate::error::{TriggerError, TriggerResult};
use crate::models::{EventSet, Granularity, SecurityMode, TriggerTiming};
use crate::options::BuilderOptions;
use crate::resolve::{TriggerUnit, UnitBody};
use crate::validate::{check_identifier, rendered_security};

/// One conditional branch inside a bundled trigger body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionalAction {
    pub condition: Option<String>,
    pub action: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerBody {
    Action(String),
    Branches(Vec<ConditionalAction>),
}

/// A fully resolved trigger that maps onto exactly one DDL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalTrigger {
    pub name: String,
    pub table: String,
    pub timing: TriggerTiming,
    pub events: EventSet,
    pub update_columns: Vec<String>,
    /// Security to render; `None` when the dialect default applies
    pub security: Option<SecurityMode>,
    pub granularity: Granularity,
    pub condition: Option<String>,
    pub body: TriggerBody,
}

/// Name and events of one physical trigger, before its action is evaluated
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PlannedTrigger {
    /// Index of the unit it comes from
    pub unit: usize,
    pub name: String,
    pub events: EventSet,
}

/// Split units into physical triggers and assign their names.
///
/// Explicit names are reserved first, so derived names step around them.
/// Every final name is checked against the dialect's identifier limit.
pub(crate) fn plan_triggers(
    units: &[TriggerUnit<'_>],
    caps: &DialectCapabilities,
    options: &BuilderOptions,
) -> TriggerResult<Vec<PlannedTrigger>> {
    let mut pending = Vec::new();
    for (index, unit) in units.iter().enumerate() {
        let settings = &unit.settings;
        let event_sets: Vec<EventSet> = if caps.supports_multi_timing || settings.events.len() == 1 {
            vec![settings.events]
        } else {
            settings.events.iter().map(EventSet::single).collect()
        };
        let split = event_sets.len() > 1;

        for events in event_sets {
            let name = settings.name.as_ref().map(|name| {
                if split {
                    let event = events.iter().map(|e| e.name_fragment()).join("_");
                    format!("{}_{}", name, event)
                } else {
                    name.clone()
                }
            });
            pending.push((index, events, name));
        }
    }

    let mut names = NameAllocator::default();
    for (_, _, name) in &pending {
        if let Some(name) = name {
            if !names.reserve(name) {
                return Err(TriggerError::DuplicateTriggerName(name.clone()));
            }
        }
    }

    let mut planned = Vec::with_capacity(pending.len());
    for (index, events, name) in pending {
        let settings = &units[index].settings;
        let name = match (name, settings.table, settings.timing) {
            (Some(name), _, _) => name,
            (None, Some(table), Some(timing)) => names.derive(
                table,
                timing,
                events,
                settings.granularity.unwrap_or_default(),
                options,
            ),
            // validated units always carry a table and a timing
            (None, _, _) => continue,
        };
        check_identifier(&name, caps)?;
        planned.push(PlannedTrigger {
            unit: index,
            name,
            events,
        });
    }

    Ok(planned)
}

/// Turn validated units into physical triggers, in declaration order.
///
/// Each action is evaluated exactly once, even when its unit expands into
/// one statement per event.
pub(crate) fn expand_units(
    units: &[TriggerUnit<'_>],
    planned: &[PlannedTrigger],
    caps: &DialectCapabilities,
) -> Vec<PhysicalTrigger> {
    let mut bodies: HashMap<usize, TriggerBody> = HashMap::new();
    let mut triggers = Vec::with_capacity(planned.len());

    for plan in planned {
        let unit = &units[plan.unit];
        let settings = &unit.settings;
        let (Some(timing), Some(table)) = (settings.timing, settings.table) else {
            continue;
        };
        let body = bodies
            .entry(plan.unit)
            .or_insert_with(|| evaluate_body(&unit.body))
            .clone();

        tracing::trace!(name = %plan.name, table, "expanded trigger");
        triggers.push(PhysicalTrigger {
            name: plan.name.clone(),
            table: table.to_string(),
            timing,
            events: plan.events,
            update_columns: settings.update_columns.to_vec(),
            security: rendered_security(settings.security, caps),
            granularity: settings.granularity.unwrap_or_default(),
            condition: settings.condition.clone(),
            body,
        });
    }

    triggers
}

fn evaluate_body(body: &UnitBody<'_>) -> TriggerBody {
    match body {
        UnitBody::Action(action) => TriggerBody::Action(action.evaluate()),
        UnitBody::Branches(branches) => TriggerBody::Branches(
            branches
                .iter()
                .map(|branch| ConditionalAction {
                    condition: branch.condition.clone(),
                    action: branch.action.evaluate(),
                })
                .collect(),
        ),
    }
}

/// Hands out trigger names, disambiguating repeats with `_2`, `_3`, ...
#[derive(Debug, Default)]
struct NameAllocator {
    taken: HashSet<String>,
}

impl NameAllocator {
    /// Claim an explicit name; false if it is already taken
    fn reserve(&mut self, name: &str) -> bool {
        self.taken.insert(name.to_string())
    }

    fn derive(
        &mut self,
        table: &str,
        timing: TriggerTiming,
        events: EventSet,
        granularity: Granularity,
        options: &BuilderOptions,
    ) -> String {
        let base = format!(
            "{}_{}_{}_{}{}",
            sanitize(table),
            timing.name_fragment(),
            events.iter().map(|e| e.name_fragment()).join("_"),
            granularity.name_fragment(),
            options.name_suffix
        );
        if self.reserve(&base) {
            return base;
        }
        let mut n = 2;
        loop {
            let candidate = format!("{}_{}", base, n);
            if self.reserve(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }
}

/// Lowercase, with anything outside `[a-z0-9_]` replaced by `_`
fn sanitize(table: &str) -> String {
    table
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::dialect::Dialect;
    use crate::models::TriggerEvent::{self, *};
    use crate::node::TriggerNode;
    use crate::validate::validate_tree;

    fn expand(node: &TriggerNode, dialect: Dialect) -> Vec<PhysicalTrigger> {
        let caps = dialect.capabilities();
        let units = validate_tree(node, caps).unwrap();
        let planned = plan_triggers(&units, caps, &BuilderOptions::default()).unwrap();
        expand_units(&units, &planned, caps)
    }

    fn names(node: &TriggerNode, dialect: Dialect) -> TriggerResult<Vec<String>> {
        let caps = dialect.capabilities();
        let units = validate_tree(node, caps)?;
        let planned = plan_triggers(&units, caps, &BuilderOptions::default())?;
        Ok(planned.into_iter().map(|p| p.name).collect())
    }

    fn events_of(trigger: &PhysicalTrigger) -> Vec<TriggerEvent> {
        trigger.events.iter().collect()
    }

    #[test]
    fn test_bundling_dialect_keeps_one_trigger() {
        let mut node = TriggerNode::new();
        node.on("foos").after(&[Update, Delete]).unwrap().action("FOO").unwrap();

        let triggers = expand(&node, Dialect::PostgreSql);
        assert_eq!(triggers.len(), 1);
        assert_eq!(events_of(&triggers[0]), vec![Update, Delete]);
        assert_eq!(triggers[0].name, "foos_after_update_delete_row_tr");
    }

    #[test]
    fn test_per_event_expansion() {
        let mut node = TriggerNode::new();
        node.on("foos").after(&[Delete, Update]).unwrap().action("FOO").unwrap();

        let triggers = expand(&node, Dialect::Sqlite);
        assert_eq!(triggers.len(), 2);
        assert_eq!(events_of(&triggers[0]), vec![Update]);
        assert_eq!(events_of(&triggers[1]), vec![Delete]);
        assert_eq!(triggers[0].name, "foos_after_update_row_tr");
        assert_eq!(triggers[1].name, "foos_after_delete_row_tr");
    }

    #[test]
    fn test_explicit_name_gets_event_suffix_when_split() {
        let mut node = TriggerNode::new();
        node.name("audit")
            .on("foos")
            .after(&[Insert, Delete])
            .unwrap()
            .action("FOO")
            .unwrap();

        let names: Vec<_> = expand(&node, Dialect::Sqlite)
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(names, vec!["audit_insert", "audit_delete"]);
    }

    #[test]
    fn test_duplicate_derived_names_are_numbered() {
        let mut node = TriggerNode::new();
        node.on("public.Foos")
            .after(&[Update])
            .unwrap()
            .group(|t| {
                t.when("BAR").action("BAR")?;
                t.when("BAZ").action("BAZ")?;
                Ok(())
            })
            .unwrap();

        let names: Vec<_> = expand(&node, Dialect::PostgreSql)
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(
            names,
            vec!["public_foos_after_update_row_tr", "public_foos_after_update_row_tr_2"]
        );
    }

    #[test]
    fn test_deferred_action_evaluated_once_per_generation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut node = TriggerNode::new();
        node.on("foos")
            .after(&[Insert, Update, Delete])
            .unwrap()
            .action_with(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                "FOO".to_string()
            })
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let triggers = expand(&node, Dialect::Sqlite);
        assert_eq!(triggers.len(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(
            triggers
                .iter()
                .all(|t| t.body == TriggerBody::Action("FOO".to_string()))
        );
    }

    #[test]
    fn test_derived_name_too_long() {
        let mut node = TriggerNode::new();
        node.on("t".repeat(60)).after(&[Update]).unwrap().action("FOO").unwrap();

        let err = names(&node, Dialect::MySql).unwrap_err();
        assert!(matches!(err, TriggerError::IdentifierTooLong { max: 64, .. }));
    }

    #[test]
    fn test_derived_names_step_around_explicit_names() {
        let mut node = TriggerNode::new();
        node.on("foos")
            .after(&[Update])
            .unwrap()
            .group(|t| {
                t.when("BAR").action("BAR")?;
                t.name("foos_after_update_row_tr").when("BAZ").action("BAZ")?;
                Ok(())
            })
            .unwrap();

        assert_eq!(
            names(&node, Dialect::PostgreSql).unwrap(),
            vec!["foos_after_update_row_tr_2", "foos_after_update_row_tr"]
        );
    }

    #[test]
    fn test_duplicate_explicit_names() {
        let mut node = TriggerNode::new();
        node.on("foos")
            .after(&[Update])
            .unwrap()
            .group(|t| {
                t.name("audit").when("BAR").action("BAR")?;
                t.name("audit").when("BAZ").action("BAZ")?;
                Ok(())
            })
            .unwrap();

        let err = names(&node, Dialect::Sqlite).unwrap_err();
        assert!(matches!(err, TriggerError::DuplicateTriggerName(ref name) if name == "audit"));
    }

    #[test]
    fn test_postgres_limit_counts_bytes() {
        // 32 characters, 64 bytes
        let name = "\u{e9}".repeat(32);
        let mut node = TriggerNode::new();
        node.name(name.as_str())
            .on("foos")
            .after(&[Update])
            .unwrap()
            .action("FOO")
            .unwrap();

        assert!(matches!(
            names(&node, Dialect::PostgreSql),
            Err(TriggerError::IdentifierTooLong { max: 63, unit: "bytes", .. })
        ));
        assert_eq!(names(&node, Dialect::MySql).unwrap(), vec![name]);
    }
}
