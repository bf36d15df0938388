//! Action registry
//!
//! An ordered, id-keyed collection of [`ActionSpec`]s built once at startup
//! with a fluent `add` chain and read-only afterwards.

use std::collections::HashMap;
use std::sync::Arc;

use crate::action::{ActionSpec, Surface};
use crate::error::SpecError;

/// Anything that can hand out an ordered list of actions
///
/// Manifest generation and the binders accept any source, so a plain
/// `Vec<Arc<ActionSpec>>` works as well as a registry.
pub trait ActionSource {
    fn actions(&self) -> &[Arc<ActionSpec>];

    /// Actions exposed on `surface`, in order.
    fn actions_for(&self, surface: Surface) -> Vec<Arc<ActionSpec>> {
        self.actions()
            .iter()
            .filter(|action| action.supports(surface))
            .cloned()
            .collect()
    }
}

impl ActionSource for [Arc<ActionSpec>] {
    fn actions(&self) -> &[Arc<ActionSpec>] {
        self
    }
}

impl ActionSource for Vec<Arc<ActionSpec>> {
    fn actions(&self) -> &[Arc<ActionSpec>] {
        self
    }
}

/// Registry of actions keyed by id, in insertion order
///
/// # Example
///
/// ```
/// use outfitter_contracts::{ActionSpec, HandlerContext, InputSchema, create_action_registry};
/// use serde_json::{Value, json};
///
/// let ping = ActionSpec::new("ping", "Ping", InputSchema::empty(), |_: Value, _ctx: HandlerContext| async move {
///     Ok(json!({"pong": true}))
/// });
///
/// let registry = create_action_registry().add(ping).unwrap();
/// assert!(registry.get("ping").is_some());
/// assert_eq!(registry.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ActionRegistry {
    actions: Vec<Arc<ActionSpec>>,
    index: HashMap<String, usize>,
}

/// An empty registry.
pub fn create_action_registry() -> ActionRegistry {
    ActionRegistry::new()
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action.
    ///
    /// Fails on a duplicate id or a malformed CLI projection; both are
    /// startup configuration bugs.
    pub fn add(mut self, action: ActionSpec) -> Result<Self, SpecError> {
        if self.index.contains_key(action.id()) {
            return Err(SpecError::DuplicateAction {
                id: action.id().to_string(),
            });
        }
        action.resolve_cli()?;

        tracing::trace!(id = action.id(), "Registered action");
        self.index.insert(action.id().to_string(), self.actions.len());
        self.actions.push(Arc::new(action));
        Ok(self)
    }

    /// Register several actions in order.
    pub fn extend(self, actions: impl IntoIterator<Item = ActionSpec>) -> Result<Self, SpecError> {
        actions.into_iter().try_fold(self, Self::add)
    }

    pub fn get(&self, id: &str) -> Option<&Arc<ActionSpec>> {
        self.index.get(id).map(|&i| &self.actions[i])
    }

    pub fn list(&self) -> &[Arc<ActionSpec>] {
        &self.actions
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|a| a.id())
    }

    /// Actions exposed on `surface`, in insertion order.
    pub fn for_surface(&self, surface: Surface) -> Vec<Arc<ActionSpec>> {
        self.actions_for(surface)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl ActionSource for ActionRegistry {
    fn actions(&self) -> &[Arc<ActionSpec>] {
        &self.actions
    }
}
