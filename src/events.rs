//! Dice change-notification events and the synchronous event bus.
//!
//! Three dice event kinds — create, change, delete — expressed as a single
//! tagged enum (no shared base class). Each record is immutable after
//! construction and carries a millisecond timestamp for ordering in undo/redo
//! and persisted logs. [`DiceEvent::encode`] / [`DiceEvent::decode`] convert
//! to/from the wire form ([`EventRecord`]) such that
//! `decode(encode(e)) == e` in every field.
//!
//! The bus is synchronous: [`EventBus::fire`] is called in-line by the
//! operation that causes the state change, never deferred.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Current wall-clock time in milliseconds since the Unix epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

// ────────────────────────────────────────────────────────────────────────────
// DiceEvent – the three-kind change-notification model
// ────────────────────────────────────────────────────────────────────────────

/// A dice variable lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiceEvent {
    /// A dice variable was created.
    Create {
        name: String,
        kind: String,
        workspace_id: String,
        timestamp_ms: u64,
    },
    /// The selected/current dice variable changed (selection or rename).
    Change {
        name: String,
        workspace_id: String,
        timestamp_ms: u64,
    },
    /// A dice variable was deleted.
    Delete {
        name: String,
        workspace_id: String,
        timestamp_ms: u64,
    },
}

impl DiceEvent {
    pub fn create(name: &str, kind: &str, workspace_id: &str) -> Self {
        Self::Create {
            name: name.to_string(),
            kind: kind.to_string(),
            workspace_id: workspace_id.to_string(),
            timestamp_ms: now_millis(),
        }
    }

    pub fn change(name: &str, workspace_id: &str) -> Self {
        Self::Change {
            name: name.to_string(),
            workspace_id: workspace_id.to_string(),
            timestamp_ms: now_millis(),
        }
    }

    pub fn delete(name: &str, workspace_id: &str) -> Self {
        Self::Delete {
            name: name.to_string(),
            workspace_id: workspace_id.to_string(),
            timestamp_ms: now_millis(),
        }
    }

    /// The dice name this event is about.
    pub fn name(&self) -> &str {
        match self {
            Self::Create { name, .. } | Self::Change { name, .. } | Self::Delete { name, .. } => {
                name
            }
        }
    }

    pub fn workspace_id(&self) -> &str {
        match self {
            Self::Create { workspace_id, .. }
            | Self::Change { workspace_id, .. }
            | Self::Delete { workspace_id, .. } => workspace_id,
        }
    }

    pub fn timestamp_ms(&self) -> u64 {
        match self {
            Self::Create { timestamp_ms, .. }
            | Self::Change { timestamp_ms, .. }
            | Self::Delete { timestamp_ms, .. } => *timestamp_ms,
        }
    }

    /// Encode the event as a wire record with explicit keys per kind.
    pub fn encode(&self) -> EventRecord {
        match self {
            Self::Create {
                name,
                kind,
                workspace_id,
                timestamp_ms,
            } => EventRecord {
                event_type: "create".to_string(),
                dicename: name.clone(),
                dicetype: Some(kind.clone()),
                workspace_id: workspace_id.clone(),
                timestamp: *timestamp_ms,
            },
            Self::Change {
                name,
                workspace_id,
                timestamp_ms,
            } => EventRecord {
                event_type: "change".to_string(),
                dicename: name.clone(),
                dicetype: None,
                workspace_id: workspace_id.clone(),
                timestamp: *timestamp_ms,
            },
            Self::Delete {
                name,
                workspace_id,
                timestamp_ms,
            } => EventRecord {
                event_type: "delete".to_string(),
                dicename: name.clone(),
                dicetype: None,
                workspace_id: workspace_id.clone(),
                timestamp: *timestamp_ms,
            },
        }
    }

    /// Decode a wire record back into an event equal in all fields to the
    /// original. Returns None for an unknown `type` tag.
    pub fn decode(record: &EventRecord) -> Option<Self> {
        match record.event_type.as_str() {
            "create" => Some(Self::Create {
                name: record.dicename.clone(),
                kind: record.dicetype.clone().unwrap_or_default(),
                workspace_id: record.workspace_id.clone(),
                timestamp_ms: record.timestamp,
            }),
            "change" => Some(Self::Change {
                name: record.dicename.clone(),
                workspace_id: record.workspace_id.clone(),
                timestamp_ms: record.timestamp,
            }),
            "delete" => Some(Self::Delete {
                name: record.dicename.clone(),
                workspace_id: record.workspace_id.clone(),
                timestamp_ms: record.timestamp,
            }),
            _ => None,
        }
    }
}

/// Persisted/wire representation of a [`DiceEvent`].
///
/// `dicetype` is present for create events only and omitted from the
/// serialized form otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    #[serde(rename = "type")]
    pub event_type: String,
    pub dicename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dicetype: Option<String>,
    #[serde(rename = "workspaceId")]
    pub workspace_id: String,
    pub timestamp: u64,
}

// ────────────────────────────────────────────────────────────────────────────
// FieldChange – generic field value change (undo history)
// ────────────────────────────────────────────────────────────────────────────

/// A generic field value change on a block, fired by
/// [`DiceField::set_value`](crate::field::DiceField::set_value) so that undo
/// history can restore the previous field value. Not part of the dice wire
/// model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub block_id: String,
    pub field: String,
    pub old_value: String,
    pub new_value: String,
    pub workspace_id: String,
    pub timestamp_ms: u64,
}

// ────────────────────────────────────────────────────────────────────────────
// EventBus – synchronous publication with grouping
// ────────────────────────────────────────────────────────────────────────────

/// Anything publishable on the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorEvent {
    Dice(DiceEvent),
    FieldChange(FieldChange),
}

/// A published event plus its grouping flag at fire time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FiredEvent {
    pub event: EditorEvent,
    /// True if this event was fired inside a group: all grouped events of one
    /// user gesture form a single undo unit.
    pub grouped: bool,
}

/// Synchronous publish mechanism with an enable flag and a grouping toggle.
///
/// The bus keeps an in-order log of everything fired while enabled; undo/redo
/// and persistence consume that log. Firing while disabled is a no-op.
#[derive(Debug, Clone)]
pub struct EventBus {
    enabled: bool,
    grouping: bool,
    log: Vec<FiredEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self {
            enabled: true,
            grouping: false,
            log: Vec::new(),
        }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish an event. In-line, synchronous; dropped if the bus is disabled.
    pub fn fire(&mut self, event: EditorEvent) {
        if !self.enabled {
            return;
        }
        if let EditorEvent::Dice(dice) = &event {
            tracing::debug!(name = dice.name(), grouped = self.grouping, "fire dice event");
        }
        self.log.push(FiredEvent {
            event,
            grouped: self.grouping,
        });
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Toggle grouping: while on, fired events are marked as one undo unit.
    pub fn set_group(&mut self, grouping: bool) {
        self.grouping = grouping;
    }

    pub fn is_grouping(&self) -> bool {
        self.grouping
    }

    /// Everything fired so far, in publication order.
    pub fn log(&self) -> &[FiredEvent] {
        &self.log
    }

    /// The dice events fired so far, in publication order.
    pub fn dice_events(&self) -> impl Iterator<Item = &DiceEvent> {
        self.log.iter().filter_map(|f| match &f.event {
            EditorEvent::Dice(d) => Some(d),
            EditorEvent::FieldChange(_) => None,
        })
    }

    pub fn clear(&mut self) {
        self.log.clear();
    }
}
