//! Workspace mutation operations for dice variables.
//!
//! All operations take the workspace and event bus explicitly — there is no
//! ambient global state. Mutation happens in place; every state change is
//! published synchronously on the bus by the operation that caused it.
//!
//! Lookups never fail: a missing variable or an empty block set degrades to
//! a no-op, and deletes are idempotent.

use crate::events::{DiceEvent, EditorEvent, EventBus};
use crate::field::DiceField;
use crate::model::{Block, DICE_KIND, Variable, Workspace, resolved_name};

/// Toolbox category of blocks that contain dice-dependent children.
pub const DICE_BLOCK_CATEGORY: &str = "Let's Chance";

/// Field names under which a block stores its dice variable reference.
pub const DICE_FIELD_NAMES: [&str; 2] = ["diceMenu", "DICEDROPDOWN"];

/// The dice variable name a block references, if it has a dice field.
pub fn dice_reference(block: &Block) -> Option<&str> {
    DICE_FIELD_NAMES.iter().find_map(|name| block.field(name))
}

// ────────────────────────────────────────────────────────────────────────────
// Create
// ────────────────────────────────────────────────────────────────────────────

/// Create a dice variable and publish the create event.
///
/// Returns false without firing anything if the name is already taken
/// (variable names are unique per workspace).
pub fn create_dice_variable(name: &str, workspace: &mut Workspace, bus: &mut EventBus) -> bool {
    if !workspace.registry.insert(Variable::dice(name)) {
        tracing::debug!(dice = name, "create skipped, name taken");
        return false;
    }
    bus.fire(EditorEvent::Dice(DiceEvent::create(
        name,
        DICE_KIND,
        &workspace.id,
    )));
    true
}

// ────────────────────────────────────────────────────────────────────────────
// Rename
// ────────────────────────────────────────────────────────────────────────────

/// Rename a dice variable, rewriting every block field that references it.
///
/// The registry record keeps its position in the insertion order. Field
/// values keep any `"||"` payload suffix. A change event naming the new
/// name is published. If an originating field is given and it references
/// `old`, its value and display are updated too. No-op (returning false) if
/// `old` is absent or `new` already exists.
pub fn rename_dice_variable(
    old: &str,
    new: &str,
    workspace: &mut Workspace,
    bus: &mut EventBus,
    field: Option<&mut DiceField>,
) -> bool {
    if !workspace.registry.rename(old, new) {
        return false;
    }
    for block in &mut workspace.blocks {
        rewrite_references(block, old, new);
    }
    bus.fire(EditorEvent::Dice(DiceEvent::change(new, &workspace.id)));
    if let Some(field) = field {
        if field.current_name() == old {
            let suffix = field.get_value()[old.len()..].to_string();
            field.set_value(&format!("{new}{suffix}"), workspace, bus);
        }
    }
    true
}

fn rewrite_references(block: &mut Block, old: &str, new: &str) {
    for name in DICE_FIELD_NAMES {
        if let Some(value) = block.fields.get_mut(name) {
            if resolved_name(value) == old {
                let suffix = value[old.len()..].to_string();
                *value = format!("{new}{suffix}");
            }
        }
    }
    for child in &mut block.children {
        rewrite_references(child, old, new);
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Cascade delete
// ────────────────────────────────────────────────────────────────────────────

/// Delete a dice variable together with every dependent block subtree, then
/// select a fallback.
///
/// Order of effects:
/// 1. In every block of category [`DICE_BLOCK_CATEGORY`], dispose each
///    immediate child whose dice field resolves to `name` (the whole child
///    subtree, not just the field).
/// 2. Publish the delete event — *before* the registry removal, so
///    listeners may still query the about-to-vanish variable.
/// 3. Remove the variable from the registry (no-op if absent; the block
///    cascade above still ran).
/// 4. If a dice variable remains, publish a change event for the first one
///    in registry insertion order and set the originating field to it.
///    Otherwise leave the field empty with no change event — a valid
///    terminal state, not an error.
pub fn remove_dice_variable(
    name: &str,
    workspace: &mut Workspace,
    bus: &mut EventBus,
    field: &mut DiceField,
) {
    let mut disposed = 0;
    for block in &mut workspace.blocks {
        disposed += dispose_dependents(block, name);
    }

    bus.fire(EditorEvent::Dice(DiceEvent::delete(name, &workspace.id)));
    let removed = workspace.registry.delete(name);
    tracing::debug!(dice = name, removed, disposed, "cascade delete");

    let fallback = workspace
        .registry
        .first_of_kind(DICE_KIND)
        .map(|v| v.name.clone());
    match fallback {
        Some(fallback) => {
            bus.fire(EditorEvent::Dice(DiceEvent::change(
                &fallback,
                &workspace.id,
            )));
            field.set_value(&fallback, workspace, bus);
        }
        None => field.clear(),
    }
}

/// Dispose every immediate child of a dependent-category block whose dice
/// field resolves to `name`, recursing into surviving children. Returns the
/// number of subtrees disposed.
fn dispose_dependents(block: &mut Block, name: &str) -> usize {
    let mut disposed = 0;
    if block.category == DICE_BLOCK_CATEGORY {
        let before = block.children.len();
        block
            .children
            .retain(|child| dice_reference(child).map(resolved_name) != Some(name));
        disposed += before - block.children.len();
    }
    for child in &mut block.children {
        disposed += dispose_dependents(child, name);
    }
    disposed
}
