//! DDL rendering for physical triggers
//!
//! Caller-supplied table names, identifiers, conditions and actions are
//! emitted verbatim: nothing is quoted or escaped.

use std::sync::LazyLock;

use itertools::Itertools;
use regex::Regex;

use crate::dialect::{BodyStyle, ConditionStyle, DialectCapabilities, SecurityClause};
use crate::expand::{PhysicalTrigger, TriggerBody};
use crate::models::{SecurityMode, TriggerEvent, TriggerTiming};

static RETURN_STATEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\breturn\s+(null|new|old)\s*;").expect("valid regex"));

/// Generate the CREATE TRIGGER DDL for one physical trigger
pub fn render_trigger(trigger: &PhysicalTrigger, caps: &DialectCapabilities) -> String {
    match caps.body_style {
        BodyStyle::Inline => render_inline(trigger, caps),
        BodyStyle::FunctionWrapper => render_function_wrapper(trigger, caps),
    }
}

/// Generate the DDL that removes what [`render_trigger`] creates
pub fn render_drop(trigger: &PhysicalTrigger, caps: &DialectCapabilities) -> String {
    match caps.body_style {
        BodyStyle::Inline => format!("DROP TRIGGER IF EXISTS {}", trigger.name),
        BodyStyle::FunctionWrapper => format!(
            "DROP TRIGGER IF EXISTS {name} ON {table};\nDROP FUNCTION IF EXISTS {name}();",
            name = trigger.name,
            table = trigger.table
        ),
    }
}

fn render_inline(trigger: &PhysicalTrigger, caps: &DialectCapabilities) -> String {
    let mut ddl = trigger_header(trigger, caps);

    ddl.push_str("\nFOR EACH ");
    ddl.push_str(trigger.granularity.as_str());

    if caps.condition_style == ConditionStyle::WhenClause {
        push_when(&mut ddl, trigger);
    }

    ddl.push_str("\nBEGIN\n");
    push_body(&mut ddl, trigger, caps);
    ddl.push_str("END");

    ddl
}

fn render_function_wrapper(trigger: &PhysicalTrigger, caps: &DialectCapabilities) -> String {
    let mut ddl = String::new();

    // Trigger function
    ddl.push_str("CREATE FUNCTION ");
    ddl.push_str(&trigger.name);
    ddl.push_str("()\nRETURNS TRIGGER AS $$\nBEGIN\n");
    push_body(&mut ddl, trigger, caps);
    if trigger.timing == TriggerTiming::After && !body_returns(&trigger.body) {
        ddl.push_str("    RETURN NULL;\n");
    }
    ddl.push_str("END;\n$$ LANGUAGE plpgsql");
    if caps.security_clause == SecurityClause::FunctionAttribute {
        if let Some(mode @ (SecurityMode::Definer | SecurityMode::Invoker)) = &trigger.security {
            ddl.push_str(" SECURITY ");
            ddl.push_str(&mode.to_string());
        }
    }
    ddl.push_str(";\n\n");

    // Trigger
    ddl.push_str(&trigger_header(trigger, caps));
    ddl.push_str("\nFOR EACH ");
    ddl.push_str(trigger.granularity.as_str());
    if caps.condition_style == ConditionStyle::WhenClause {
        push_when(&mut ddl, trigger);
    }
    ddl.push_str("\nEXECUTE PROCEDURE ");
    ddl.push_str(&trigger.name);
    ddl.push_str("();");

    ddl
}

fn body_returns(body: &TriggerBody) -> bool {
    match body {
        TriggerBody::Action(action) => RETURN_STATEMENT.is_match(action),
        TriggerBody::Branches(branches) => branches
            .iter()
            .any(|branch| RETURN_STATEMENT.is_match(&branch.action)),
    }
}

/// `CREATE [DEFINER = ...] TRIGGER <name> <timing> <events> ON <table>`
fn trigger_header(trigger: &PhysicalTrigger, caps: &DialectCapabilities) -> String {
    let mut ddl = String::from("CREATE ");

    if caps.security_clause == SecurityClause::DefinerAssignment {
        if let Some(definer) = trigger.security.as_ref().and_then(definer_value) {
            ddl.push_str("DEFINER = ");
            ddl.push_str(definer);
            ddl.push(' ');
        }
    }

    ddl.push_str("TRIGGER ");
    ddl.push_str(&trigger.name);
    ddl.push(' ');
    ddl.push_str(trigger.timing.as_str());
    ddl.push(' ');
    ddl.push_str(
        &trigger
            .events
            .iter()
            .map(|event| event_clause(event, &trigger.update_columns))
            .join(caps.event_separator),
    );
    ddl.push_str(" ON ");
    ddl.push_str(&trigger.table);

    ddl
}

fn definer_value(mode: &SecurityMode) -> Option<&str> {
    match mode {
        SecurityMode::NamedUser(user) => Some(user.as_str()),
        SecurityMode::Definer => Some("CURRENT_USER"),
        SecurityMode::Invoker => None,
    }
}

fn event_clause(event: TriggerEvent, update_columns: &[String]) -> String {
    if event == TriggerEvent::Update && !update_columns.is_empty() {
        format!("{} OF {}", event.as_str(), update_columns.join(", "))
    } else {
        event.as_str().to_string()
    }
}

fn push_when(ddl: &mut String, trigger: &PhysicalTrigger) {
    if let Some(condition) = trigger.condition.as_deref().filter(|c| !c.trim().is_empty()) {
        ddl.push_str("\nWHEN (");
        ddl.push_str(condition);
        ddl.push(')');
    }
}

/// The statements inside `BEGIN ... END`. Conditions that are not expressed
/// as a WHEN clause become IF blocks.
fn push_body(ddl: &mut String, trigger: &PhysicalTrigger, caps: &DialectCapabilities) {
    let outer = match caps.condition_style {
        ConditionStyle::IfBlock => trigger.condition.as_deref().filter(|c| !c.trim().is_empty()),
        ConditionStyle::WhenClause => None,
    };
    let indent = if outer.is_some() { "    " } else { "" };

    if let Some(condition) = outer {
        push_if(ddl, "", condition);
    }
    match &trigger.body {
        TriggerBody::Action(action) => push_action(ddl, action),
        TriggerBody::Branches(branches) => {
            for branch in branches {
                match branch.condition.as_deref() {
                    Some(condition) => {
                        push_if(ddl, indent, condition);
                        push_action(ddl, &branch.action);
                        push_end_if(ddl, indent);
                    }
                    None => push_action(ddl, &branch.action),
                }
            }
        }
    }
    if outer.is_some() {
        push_end_if(ddl, "");
    }
}

fn push_if(ddl: &mut String, indent: &str, condition: &str) {
    ddl.push_str(indent);
    ddl.push_str("    IF ");
    ddl.push_str(condition);
    ddl.push_str(" THEN\n");
}

fn push_end_if(ddl: &mut String, indent: &str) {
    ddl.push_str(indent);
    ddl.push_str("    END IF;\n");
}

fn push_action(ddl: &mut String, action: &str) {
    ddl.push_str(action);
    if !action.ends_with('\n') {
        ddl.push('\n');
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::dialect::Dialect;
    use crate::expand::ConditionalAction;
    use crate::models::{EventSet, Granularity};

    fn trigger(events: &[TriggerEvent]) -> PhysicalTrigger {
        PhysicalTrigger {
            name: "foos_tr".to_string(),
            table: "foos".to_string(),
            timing: TriggerTiming::After,
            events: events.iter().copied().collect::<EventSet>(),
            update_columns: Vec::new(),
            security: None,
            granularity: Granularity::Row,
            condition: None,
            body: TriggerBody::Action("    DELETE FROM bars;".to_string()),
        }
    }

    #[test]
    fn test_render_sqlite() {
        let mut t = trigger(&[TriggerEvent::Update]);
        t.update_columns = vec!["name".to_string(), "email".to_string()];
        t.condition = Some("NEW.name <> OLD.name".to_string());

        assert_eq!(
            render_trigger(&t, Dialect::Sqlite.capabilities()),
            indoc! {"
                CREATE TRIGGER foos_tr AFTER UPDATE OF name, email ON foos
                FOR EACH ROW
                WHEN (NEW.name <> OLD.name)
                BEGIN
                    DELETE FROM bars;
                END"}
        );
    }

    #[test]
    fn test_render_postgres() {
        let mut t = trigger(&[TriggerEvent::Update, TriggerEvent::Delete]);
        t.security = Some(SecurityMode::Definer);
        t.granularity = Granularity::Statement;

        assert_eq!(
            render_trigger(&t, Dialect::PostgreSql.capabilities()),
            indoc! {"
                CREATE FUNCTION foos_tr()
                RETURNS TRIGGER AS $$
                BEGIN
                    DELETE FROM bars;
                    RETURN NULL;
                END;
                $$ LANGUAGE plpgsql SECURITY DEFINER;

                CREATE TRIGGER foos_tr AFTER UPDATE OR DELETE ON foos
                FOR EACH STATEMENT
                EXECUTE PROCEDURE foos_tr();"}
        );
    }

    #[test]
    fn test_function_keeps_existing_return() {
        let mut t = trigger(&[TriggerEvent::Insert]);
        t.body = TriggerBody::Action("    PERFORM pg_notify('foos', 'x');\n    return new;".to_string());

        let ddl = render_trigger(&t, Dialect::PostgreSql.capabilities());
        assert!(!ddl.contains("RETURN NULL"));
        assert!(ddl.contains("    return new;\nEND;\n$$ LANGUAGE plpgsql;"));

        t.body = TriggerBody::Action("    RETURN NULL;".to_string());
        let ddl = render_trigger(&t, Dialect::PostgreSql.capabilities());
        assert_eq!(ddl.matches("RETURN NULL;").count(), 1);
    }

    #[test]
    fn test_render_mysql_bundle() {
        let mut t = trigger(&[TriggerEvent::Update]);
        t.security = Some(SecurityMode::NamedUser("'user'@'host'".to_string()));
        t.body = TriggerBody::Branches(vec![
            ConditionalAction {
                condition: Some("NEW.a > 0".to_string()),
                action: "        SET @a = 1;".to_string(),
            },
            ConditionalAction {
                condition: None,
                action: "    SET @b = 1;".to_string(),
            },
        ]);

        assert_eq!(
            render_trigger(&t, Dialect::MySql.capabilities()),
            indoc! {"
                CREATE DEFINER = 'user'@'host' TRIGGER foos_tr AFTER UPDATE ON foos
                FOR EACH ROW
                BEGIN
                    IF NEW.a > 0 THEN
                        SET @a = 1;
                    END IF;
                    SET @b = 1;
                END"}
        );
    }

    #[test]
    fn test_mysql_condition_becomes_if_block() {
        let mut t = trigger(&[TriggerEvent::Insert]);
        t.condition = Some("NEW.a > 0".to_string());

        let ddl = render_trigger(&t, Dialect::MySql.capabilities());
        assert!(!ddl.contains("WHEN"));
        assert!(ddl.contains("    IF NEW.a > 0 THEN\n"));
        assert!(ddl.contains("    END IF;\nEND"));
    }

    #[test]
    fn test_render_drop() {
        let t = trigger(&[TriggerEvent::Insert]);

        assert_eq!(
            render_drop(&t, Dialect::Sqlite.capabilities()),
            "DROP TRIGGER IF EXISTS foos_tr"
        );
        assert_eq!(
            render_drop(&t, Dialect::PostgreSql.capabilities()),
            "DROP TRIGGER IF EXISTS foos_tr ON foos;\nDROP FUNCTION IF EXISTS foos_tr();"
        );
    }
}
