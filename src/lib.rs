//! Dice variable dropdown field for a block-based visual programming editor.
//!
//! This crate implements the dropdown's state machine ([`field::DiceField`]),
//! the cascading-delete/fallback-selection algorithm
//! ([`operations::remove_dice_variable`]), and the three-event
//! change-notification model ([`events::DiceEvent`]) used for undo/redo and
//! persistence.
//!
//! The binary `diceblocks` loads a workspace file and prints it (or the dice
//! events a cascade delete produces) as JSON.

pub mod events;
pub mod field;
pub mod model;
pub mod operations;
