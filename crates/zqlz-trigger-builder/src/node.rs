//! Trigger intent tree
//!
//! A [`TriggerNode`] records what the caller asked for. Nothing here knows
//! about dialects: the only checks made while building are the ones that do
//! not depend on the target engine (empty event lists, malformed security or
//! granularity values, mixing an action with nested triggers). Structural
//! rules such as nesting depth are left to the validator.

use crate::error::{TriggerError, TriggerResult};
use crate::models::{EventSet, Granularity, SecurityMode, TriggerEvent, TriggerTiming};

/// The body of a leaf trigger
pub enum Action {
    Text(String),
    /// Evaluated once per generation, so it may refer to state that is only
    /// complete after the whole tree has been described.
    Deferred(Box<dyn Fn() -> String + Send + Sync>),
}

impl Action {
    pub fn deferred<F>(f: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self::Deferred(Box::new(f))
    }

    pub(crate) fn evaluate(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::Deferred(f) => f(),
        }
    }
}

impl std::fmt::Debug for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(text) => f.debug_tuple("Text").field(text).finish(),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<&str> for Action {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Action {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

#[derive(Debug, Default)]
pub(crate) enum NodeBody {
    #[default]
    Pending,
    Action(Action),
    Children(Vec<TriggerNode>),
}

/// One node of a trigger intent tree: either a leaf with an action or a group
/// of child nodes that inherit its settings.
#[derive(Debug, Default)]
pub struct TriggerNode {
    pub(crate) name: Option<String>,
    pub(crate) table: Option<String>,
    pub(crate) timing: Option<TriggerTiming>,
    pub(crate) events: EventSet,
    pub(crate) update_columns: Vec<String>,
    pub(crate) security: Option<SecurityMode>,
    pub(crate) granularity: Option<Granularity>,
    pub(crate) condition: Option<String>,
    pub(crate) body: NodeBody,
}

impl TriggerNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trigger name
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Set the table the trigger is attached to
    pub fn on(&mut self, table: impl Into<String>) -> &mut Self {
        self.table = Some(table.into());
        self
    }

    /// Set timing and events together, replacing any previous pair
    pub fn timing(&mut self, timing: TriggerTiming, events: &[TriggerEvent]) -> TriggerResult<&mut Self> {
        if events.is_empty() {
            return Err(TriggerError::InvalidTiming(format!(
                "{} requires at least one event",
                timing
            )));
        }
        self.timing = Some(timing);
        self.events = events.iter().copied().collect();
        Ok(self)
    }

    pub fn before(&mut self, events: &[TriggerEvent]) -> TriggerResult<&mut Self> {
        self.timing(TriggerTiming::Before, events)
    }

    pub fn after(&mut self, events: &[TriggerEvent]) -> TriggerResult<&mut Self> {
        self.timing(TriggerTiming::After, events)
    }

    pub fn instead_of(&mut self, events: &[TriggerEvent]) -> TriggerResult<&mut Self> {
        self.timing(TriggerTiming::InsteadOf, events)
    }

    /// Restrict an UPDATE trigger to the given columns (`UPDATE OF a, b`)
    pub fn of<I, S>(&mut self, columns: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.update_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set the trigger condition (`WHEN (...)`)
    pub fn when(&mut self, condition: impl Into<String>) -> &mut Self {
        self.condition = Some(condition.into());
        self
    }

    /// Set the security mode from its textual form: `definer`, `invoker`, or
    /// an account such as `'user'@'host'` / `CURRENT_USER`.
    pub fn security(&mut self, mode: &str) -> TriggerResult<&mut Self> {
        let mode = mode.parse::<SecurityMode>()?;
        Ok(self.security_mode(mode))
    }

    pub fn security_mode(&mut self, mode: SecurityMode) -> &mut Self {
        self.security = Some(mode);
        self
    }

    /// Set the granularity from its textual form (`row` or `statement`)
    pub fn for_each(&mut self, granularity: &str) -> TriggerResult<&mut Self> {
        let granularity = granularity.parse::<Granularity>()?;
        Ok(self.granularity(granularity))
    }

    pub fn granularity(&mut self, granularity: Granularity) -> &mut Self {
        self.granularity = Some(granularity);
        self
    }

    /// Make this node a leaf with the given action
    pub fn action(&mut self, action: impl Into<Action>) -> TriggerResult<&mut Self> {
        if matches!(self.body, NodeBody::Children(_)) {
            return Err(TriggerError::MixedNodeKind);
        }
        self.body = NodeBody::Action(action.into());
        Ok(self)
    }

    /// Make this node a leaf whose action is computed at generation time
    pub fn action_with<F>(&mut self, f: F) -> TriggerResult<&mut Self>
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.action(Action::deferred(f))
    }

    /// Describe nested triggers. Every call made on the scope creates a new
    /// child node that inherits this node's settings.
    pub fn group<F>(&mut self, f: F) -> TriggerResult<&mut Self>
    where
        F: FnOnce(&mut GroupScope<'_>) -> TriggerResult<()>,
    {
        if matches!(self.body, NodeBody::Action(_)) {
            return Err(TriggerError::MixedNodeKind);
        }
        let mut children = match std::mem::take(&mut self.body) {
            NodeBody::Children(children) => children,
            _ => Vec::new(),
        };
        let result = f(&mut GroupScope {
            children: &mut children,
        });
        if !children.is_empty() {
            self.body = NodeBody::Children(children);
        }
        result.map(|()| self)
    }

    pub fn is_group(&self) -> bool {
        matches!(self.body, NodeBody::Children(_))
    }

    pub fn children(&self) -> &[TriggerNode] {
        match &self.body {
            NodeBody::Children(children) => children,
            _ => &[],
        }
    }

    /// Number of nested group levels at and below this node (a leaf is 0)
    pub fn group_depth(&self) -> usize {
        match &self.body {
            NodeBody::Children(children) => {
                1 + children.iter().map(TriggerNode::group_depth).max().unwrap_or(0)
            }
            _ => 0,
        }
    }
}

/// Cursor handed to [`TriggerNode::group`] for declaring child triggers
pub struct GroupScope<'a> {
    children: &'a mut Vec<TriggerNode>,
}

impl GroupScope<'_> {
    /// Append an empty child node
    pub fn child(&mut self) -> &mut TriggerNode {
        self.children.push(TriggerNode::new());
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    pub fn name(&mut self, name: impl Into<String>) -> &mut TriggerNode {
        self.child().name(name)
    }

    pub fn on(&mut self, table: impl Into<String>) -> &mut TriggerNode {
        self.child().on(table)
    }

    pub fn before(&mut self, events: &[TriggerEvent]) -> TriggerResult<&mut TriggerNode> {
        self.child().before(events)
    }

    pub fn after(&mut self, events: &[TriggerEvent]) -> TriggerResult<&mut TriggerNode> {
        self.child().after(events)
    }

    pub fn instead_of(&mut self, events: &[TriggerEvent]) -> TriggerResult<&mut TriggerNode> {
        self.child().instead_of(events)
    }

    pub fn of<I, S>(&mut self, columns: I) -> &mut TriggerNode
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.child().of(columns)
    }

    pub fn when(&mut self, condition: impl Into<String>) -> &mut TriggerNode {
        self.child().when(condition)
    }

    pub fn security(&mut self, mode: &str) -> TriggerResult<&mut TriggerNode> {
        self.child().security(mode)
    }

    pub fn for_each(&mut self, granularity: &str) -> TriggerResult<&mut TriggerNode> {
        self.child().for_each(granularity)
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
