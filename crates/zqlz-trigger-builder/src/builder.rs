//! Trigger builder: validate, expand and render an intent tree

use std::ops::{Deref, DerefMut};

use crate::dialect::Dialect;
use crate::error::{TriggerError, TriggerResult};
use crate::expand::{PhysicalTrigger, expand_units};
use crate::node::TriggerNode;
use crate::options::BuilderOptions;
use crate::render::{render_drop, render_trigger};
use crate::validate::{PortabilityWarning, check_tree, portability_warnings};

/// Builds CREATE TRIGGER statements for one dialect.
///
/// The builder dereferences to its root [`TriggerNode`], so the intent is
/// described with the node's chaining methods directly on the builder.
#[derive(Debug)]
pub struct TriggerBuilder {
    dialect: Dialect,
    options: BuilderOptions,
    root: TriggerNode,
}

impl TriggerBuilder {
    /// Create a builder for a dialect identifier such as `"mysql"` or `"postgresql"`
    pub fn new(dialect: &str) -> TriggerResult<Self> {
        Self::with_options(dialect, BuilderOptions::default())
    }

    pub fn with_options(dialect: &str, options: BuilderOptions) -> TriggerResult<Self> {
        Ok(Self::for_dialect(Dialect::from_identifier(dialect)?, options))
    }

    pub fn for_dialect(dialect: Dialect, options: BuilderOptions) -> Self {
        Self {
            dialect,
            options,
            root: TriggerNode::new(),
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    pub fn options(&self) -> &BuilderOptions {
        &self.options
    }

    /// Check the tree against the active dialect.
    ///
    /// On success, returns the rules the tree would break on other dialects.
    /// With `strict_portability` the first of those is returned as an error.
    pub fn validate(&self) -> TriggerResult<Vec<PortabilityWarning>> {
        check_tree(&self.root, self.dialect.capabilities(), &self.options)?;
        self.portability()
    }

    fn portability(&self) -> TriggerResult<Vec<PortabilityWarning>> {
        let warnings = portability_warnings(&self.root, self.dialect, &self.options);
        if self.options.strict_portability {
            if let Some(warning) = warnings.first() {
                return Err(TriggerError::NotPortable {
                    dialect: warning.dialect,
                    message: warning.message.clone(),
                });
            }
        }
        Ok(warnings)
    }

    /// Validate and expand the tree into the physical triggers to create
    pub fn physical_triggers(&self) -> TriggerResult<Vec<PhysicalTrigger>> {
        let caps = self.dialect.capabilities();
        let (units, planned) = check_tree(&self.root, caps, &self.options)?;

        let warnings = self.portability()?;
        if self.options.show_warnings {
            for warning in &warnings {
                tracing::warn!("trigger is not portable to {}", warning);
            }
        }

        Ok(expand_units(&units, &planned, caps))
    }

    /// Generate the CREATE TRIGGER statements, in declaration order
    pub fn generate(&self) -> TriggerResult<Vec<String>> {
        let caps = self.dialect.capabilities();
        let statements: Vec<String> = self
            .physical_triggers()?
            .iter()
            .map(|trigger| render_trigger(trigger, caps))
            .collect();

        tracing::debug!(
            dialect = %self.dialect,
            statements = statements.len(),
            "generated trigger DDL"
        );
        Ok(statements)
    }

    /// Generate the statements that drop every trigger [`generate`](Self::generate) creates
    pub fn generate_drop(&self) -> TriggerResult<Vec<String>> {
        let caps = self.dialect.capabilities();
        Ok(self
            .physical_triggers()?
            .iter()
            .map(|trigger| render_drop(trigger, caps))
            .collect())
    }
}

impl Deref for TriggerBuilder {
    type Target = TriggerNode;

    fn deref(&self) -> &TriggerNode {
        &self.root
    }
}

impl DerefMut for TriggerBuilder {
    fn deref_mut(&mut self) -> &mut TriggerNode {
        &mut self.root
    }
}
