//! Trigger Builder for ZQLZ
//!
//! Describes a database trigger once and lowers it into the CREATE TRIGGER
//! statements a specific dialect needs.
//!
//! ## Features
//!
//! - Nested trigger groups that share table, timing, events and conditions
//! - Per-dialect validation (security modes, granularity, nesting, name length)
//! - Expansion into one statement per event where the dialect requires it
//! - Portability warnings for the other supported dialects
//! - Support for SQLite, PostgreSQL, and MySQL dialects
//!
//! ## Usage
//!
//! ```rust
//! use zqlz_trigger_builder::{TriggerBuilder, TriggerEvent::*, TriggerResult};
//!
//! fn audit_triggers() -> TriggerResult<Vec<String>> {
//!     let mut builder = TriggerBuilder::new("postgresql")?;
//!     builder.on("accounts").group(|t| {
//!         t.after(&[Update])?.group(|t| {
//!             t.when("NEW.balance < 0").action("PERFORM notify_overdrawn(NEW.id);")?;
//!             t.when("NEW.closed").action("PERFORM archive_account(NEW.id);")?;
//!             Ok(())
//!         })?;
//!         t.after(&[Insert])?.action("PERFORM welcome(NEW.id);")?;
//!         Ok(())
//!     })?;
//!     builder.generate()
//! }
//!
//! assert_eq!(audit_triggers().unwrap().len(), 3);
//! ```

pub mod builder;
pub mod dialect;
pub mod error;
pub mod expand;
pub mod models;
pub mod node;
pub mod options;
pub mod render;
pub mod validate;

mod resolve;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use builder::TriggerBuilder;
pub use dialect::{Dialect, DialectCapabilities, IdentifierUnit, TriggerGrouping, capabilities_for};
pub use error::{TriggerError, TriggerResult};
pub use expand::{ConditionalAction, PhysicalTrigger, TriggerBody};
pub use models::{EventSet, Granularity, SecurityKind, SecurityMode, TriggerEvent, TriggerTiming};
pub use node::{Action, GroupScope, TriggerNode};
pub use options::BuilderOptions;
pub use render::{render_drop, render_trigger};
pub use validate::PortabilityWarning;
