//! Built-in actions for Outfitter.
//!
//! These are the actions the `outfitter` and `outfitter-mcp` binaries expose
//! out of the box. The introspection actions (`actions.list`, `surface.*`)
//! see the registry they are registered in through a [`Catalog`].

pub mod catalog;
pub mod math;
pub mod surface;
pub mod system;
pub mod tasks;

use outfitter_contracts::{ActionRegistry, ActionSpec, SpecError};

pub use catalog::Catalog;

/// Every built-in action, with introspection bound to `catalog`.
pub fn builtin_actions(catalog: &Catalog) -> Result<Vec<ActionSpec>, SpecError> {
    Ok(vec![
        math::add_action()?,
        catalog::list_action(catalog.clone())?,
        surface::show_action(catalog.clone())?,
        surface::generate_action(catalog.clone())?,
        surface::diff_action(catalog.clone())?,
        tasks::countdown_action()?,
        system::health_action(),
    ])
}

/// Registry holding the built-in actions.
pub fn builtin_registry() -> Result<ActionRegistry, SpecError> {
    builtin_registry_with(Vec::new())
}

/// Registry holding the built-in actions followed by `extra`.
///
/// Introspection actions see the extra actions as well, for as long as the
/// returned registry is alive.
pub fn builtin_registry_with(
    extra: impl IntoIterator<Item = ActionSpec>,
) -> Result<ActionRegistry, SpecError> {
    let catalog = Catalog::new();
    let registry = ActionRegistry::new()
        .extend(builtin_actions(&catalog)?)?
        .extend(extra)?;
    catalog.bind(registry.list());
    Ok(registry)
}
