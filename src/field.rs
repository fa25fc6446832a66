//! The dice dropdown field.
//!
//! [`DiceField`] is the stateful dropdown component: it owns the current
//! value and display text, derives its option list from the variable
//! registry on every open, and routes a selection to either a plain value
//! change or the cascade delete in [`crate::operations`].
//!
//! Pure state transitions only — the visual layer observes
//! [`DiceField::take_needs_render`] and draws; nothing here touches
//! rendering.

use crate::events::{EditorEvent, EventBus, FieldChange, now_millis};
use crate::model::{DICE_KIND, Workspace, resolved_name};
use crate::operations;

/// Synthetic option value that triggers the cascade delete.
pub const DELETE_OPTION_VALUE: &str = "DELETE";

// ────────────────────────────────────────────────────────────────────────────
// Dropdown state machine
// ────────────────────────────────────────────────────────────────────────────

/// Dropdown visibility state: `Closed → Open → Closed`.
///
/// Entered `Open` on explicit activation; returns to `Closed` on selection
/// or on external dismissal (blur/escape) with no mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DropdownState {
    #[default]
    Closed,
    Open,
}

/// One selectable dropdown entry: human-readable label, language-neutral
/// value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropdownOption {
    pub label: String,
    pub value: String,
}

// ────────────────────────────────────────────────────────────────────────────
// DiceField
// ────────────────────────────────────────────────────────────────────────────

/// A dice variable dropdown field on a block.
///
/// The stored value is either an existing variable name (optionally carrying
/// a `"||"` payload suffix) or the explicit empty string — never a null-like
/// state.
#[derive(Debug, Clone)]
pub struct DiceField {
    /// Id of the block owning this field (for field-change events).
    block_id: String,
    /// Field name on the owning block, e.g. `"diceMenu"`.
    name: String,
    raw_value: String,
    display_text: String,
    /// Option cache, valid only for the current open. Rebuilt on every open.
    options: Vec<DropdownOption>,
    /// Index into `options` of the checked entry, if the current value
    /// matches one.
    selected: Option<usize>,
    state: DropdownState,
    needs_render: bool,
}

impl DiceField {
    /// Create a field in the empty/unresolved state.
    pub fn new(block_id: &str, name: &str) -> Self {
        Self {
            block_id: block_id.to_string(),
            name: name.to_string(),
            raw_value: String::new(),
            display_text: String::new(),
            options: Vec::new(),
            selected: None,
            state: DropdownState::Closed,
            needs_render: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn block_id(&self) -> &str {
        &self.block_id
    }

    /// The stored raw value (may carry a `"||"` payload suffix; empty when
    /// unresolved).
    pub fn get_value(&self) -> &str {
        &self.raw_value
    }

    /// The dice variable name the stored value resolves to.
    pub fn current_name(&self) -> &str {
        resolved_name(&self.raw_value)
    }

    pub fn display_text(&self) -> &str {
        &self.display_text
    }

    pub fn state(&self) -> DropdownState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == DropdownState::Open
    }

    /// Index of the checked option, if any.
    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    /// Build the current option list from the registry.
    ///
    /// All dice variables in insertion order as `(name, name)` pairs, plus
    /// one trailing synthetic `Delete` entry. Recomputed on every call —
    /// the cache is never trusted stale across opens.
    pub fn get_options(&mut self, workspace: &Workspace) -> &[DropdownOption] {
        self.rebuild_options(workspace);
        &self.options
    }

    fn rebuild_options(&mut self, workspace: &Workspace) {
        let current = resolved_name(&self.raw_value).to_string();
        self.options = workspace
            .registry
            .variables_of_kind(DICE_KIND)
            .map(|v| DropdownOption {
                label: v.name.clone(),
                value: v.name.clone(),
            })
            .collect();
        self.options.push(DropdownOption {
            label: format!("Delete {}", current),
            value: DELETE_OPTION_VALUE.to_string(),
        });
        self.selected = self.options.iter().position(|o| o.value == current);
    }

    /// Open the dropdown: rebuild the option list and enter `Open`.
    pub fn open(&mut self, workspace: &Workspace) -> &[DropdownOption] {
        self.rebuild_options(workspace);
        self.state = DropdownState::Open;
        &self.options
    }

    /// Dismiss the dropdown without a selection. Pure no-op otherwise: no
    /// events, no state change beyond closing.
    pub fn close(&mut self) {
        self.state = DropdownState::Closed;
    }

    /// Handle the selection of a dropdown entry.
    ///
    /// The dropdown is closed *before* any side effect runs, so a second
    /// user action cannot interleave with an in-flight cascade. `"DELETE"`
    /// routes to the cascade delete (its several events grouped into one
    /// undo unit); any other value becomes the new field value with a
    /// change event.
    pub fn on_item_selected(&mut self, value: &str, workspace: &mut Workspace, bus: &mut EventBus) {
        self.close();
        if value == DELETE_OPTION_VALUE {
            let doomed = self.current_name().to_string();
            bus.set_group(true);
            operations::remove_dice_variable(&doomed, workspace, bus, self);
            bus.set_group(false);
            return;
        }
        bus.fire(EditorEvent::Dice(crate::events::DiceEvent::change(
            resolved_name(value),
            &workspace.id,
        )));
        self.set_value(value, workspace, bus);
    }

    /// Set the field value.
    ///
    /// No-op if `new_value` is empty or equal to the stored value.
    /// Otherwise a field-change event carrying old/new values is fired (for
    /// undo history), the value is stored, and the display text is resolved
    /// by scanning a freshly built option list. A value with no matching
    /// option is displayed verbatim — it may become valid later, e.g. a
    /// variable created after this field was deserialized.
    pub fn set_value(&mut self, new_value: &str, workspace: &Workspace, bus: &mut EventBus) {
        if new_value.is_empty() || new_value == self.raw_value {
            return;
        }
        if bus.is_enabled() {
            bus.fire(EditorEvent::FieldChange(FieldChange {
                block_id: self.block_id.clone(),
                field: self.name.clone(),
                old_value: self.raw_value.clone(),
                new_value: new_value.to_string(),
                workspace_id: workspace.id.clone(),
                timestamp_ms: now_millis(),
            }));
        }
        self.raw_value = new_value.to_string();
        self.rebuild_options(workspace);
        let current = resolved_name(&self.raw_value);
        match self.selected {
            Some(index) => self.display_text = self.options[index].label.clone(),
            None => self.display_text = current.to_string(),
        }
        self.needs_render = true;
    }

    /// Reset to the empty/unresolved state. No events; used when the last
    /// dice variable is removed and no fallback exists.
    pub(crate) fn clear(&mut self) {
        self.raw_value.clear();
        self.display_text.clear();
        self.selected = None;
        self.needs_render = true;
    }

    /// True if the field changed since the visual layer last drew it.
    pub fn needs_render(&self) -> bool {
        self.needs_render
    }

    /// Consume the re-render request.
    pub fn take_needs_render(&mut self) -> bool {
        std::mem::replace(&mut self.needs_render, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EditorEvent;
    use crate::model::Variable;

    fn make_test_workspace(names: &[&str]) -> Workspace {
        let mut ws = Workspace::new("ws-test");
        for name in names {
            ws.registry.insert(Variable::dice(name));
        }
        ws
    }

    #[test]
    fn test_options_are_registry_plus_delete_entry() {
        let ws = make_test_workspace(&["d1", "d2"]);
        let mut field = DiceField::new("b1", "diceMenu");
        let mut bus = EventBus::new();
        field.set_value("d1", &ws, &mut bus);

        let options = field.open(&ws).to_vec();
        assert_eq!(options.len(), 3);
        assert_eq!(options[0].value, "d1");
        assert_eq!(options[1].value, "d2");
        assert_eq!(options[2].label, "Delete d1");
        assert_eq!(options[2].value, DELETE_OPTION_VALUE);
        assert_eq!(field.selected_index(), Some(0));
        assert!(field.is_open());
    }

    #[test]
    fn test_options_rebuilt_on_every_open() {
        let mut ws = make_test_workspace(&["d1"]);
        let mut field = DiceField::new("b1", "diceMenu");
        assert_eq!(field.open(&ws).len(), 2);
        field.close();

        ws.registry.insert(Variable::dice("d2"));
        assert_eq!(field.open(&ws).len(), 3);
    }

    #[test]
    fn test_dismissal_is_pure_noop() {
        let ws = make_test_workspace(&["d1"]);
        let mut field = DiceField::new("b1", "diceMenu");
        let mut bus = EventBus::new();
        field.set_value("d1", &ws, &mut bus);
        bus.clear();
        field.take_needs_render();

        field.open(&ws);
        field.close();
        assert!(!field.is_open());
        assert_eq!(field.get_value(), "d1");
        assert!(bus.log().is_empty());
        assert!(!field.needs_render());
    }

    #[test]
    fn test_select_variable_fires_change_then_sets_value() {
        let mut ws = make_test_workspace(&["d1", "d2"]);
        let mut field = DiceField::new("b1", "diceMenu");
        let mut bus = EventBus::new();
        field.set_value("d1", &ws, &mut bus);
        bus.clear();

        field.open(&ws);
        field.on_item_selected("d2", &mut ws, &mut bus);

        assert!(!field.is_open());
        assert_eq!(field.get_value(), "d2");
        assert_eq!(field.display_text(), "d2");
        let dice: Vec<&str> = bus.dice_events().map(|e| e.name()).collect();
        assert_eq!(dice, vec!["d2"]);
        // The dice change precedes the generic field change in the log.
        assert!(matches!(bus.log()[0].event, EditorEvent::Dice(_)));
        assert!(matches!(bus.log()[1].event, EditorEvent::FieldChange(_)));
    }

    #[test]
    fn test_set_value_same_value_fires_once() {
        let ws = make_test_workspace(&["d1"]);
        let mut field = DiceField::new("b1", "diceMenu");
        let mut bus = EventBus::new();
        field.set_value("d1", &ws, &mut bus);
        field.set_value("d1", &ws, &mut bus);
        let field_changes = bus
            .log()
            .iter()
            .filter(|f| matches!(f.event, EditorEvent::FieldChange(_)))
            .count();
        assert_eq!(field_changes, 1);
    }

    #[test]
    fn test_set_value_empty_is_noop() {
        let ws = make_test_workspace(&["d1"]);
        let mut field = DiceField::new("b1", "diceMenu");
        let mut bus = EventBus::new();
        field.set_value("d1", &ws, &mut bus);
        field.set_value("", &ws, &mut bus);
        assert_eq!(field.get_value(), "d1");
    }

    #[test]
    fn test_forward_reference_displays_verbatim() {
        let mut ws = make_test_workspace(&[]);
        let mut field = DiceField::new("b1", "diceMenu");
        let mut bus = EventBus::new();
        // Value restored from a save file before its variable exists.
        field.set_value("d9", &ws, &mut bus);
        assert_eq!(field.display_text(), "d9");
        assert_eq!(field.selected_index(), None);

        // Once the variable exists the same value resolves to an option.
        ws.registry.insert(Variable::dice("d9"));
        field.open(&ws);
        assert_eq!(field.selected_index(), Some(0));
    }

    #[test]
    fn test_payload_suffix_resolves_to_prefix() {
        let ws = make_test_workspace(&["d6"]);
        let mut field = DiceField::new("b1", "diceMenu");
        let mut bus = EventBus::new();
        field.set_value("d6||weighted", &ws, &mut bus);
        assert_eq!(field.get_value(), "d6||weighted");
        assert_eq!(field.current_name(), "d6");
        assert_eq!(field.display_text(), "d6");
    }

    #[test]
    fn test_set_value_disabled_bus_still_updates() {
        let ws = make_test_workspace(&["d1"]);
        let mut field = DiceField::new("b1", "diceMenu");
        let mut bus = EventBus::new();
        bus.set_enabled(false);
        field.set_value("d1", &ws, &mut bus);
        assert_eq!(field.get_value(), "d1");
        assert!(bus.log().is_empty());
    }

    #[test]
    fn test_needs_render_consumed() {
        let ws = make_test_workspace(&["d1"]);
        let mut field = DiceField::new("b1", "diceMenu");
        let mut bus = EventBus::new();
        field.set_value("d1", &ws, &mut bus);
        assert!(field.take_needs_render());
        assert!(!field.take_needs_render());
    }
}
