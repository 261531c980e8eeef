use std::fmt;
use std::str::FromStr;

use crate::error::TraceError;

// ---------------------------------------------------------------------------
// Tick fields
// ---------------------------------------------------------------------------

/// Number of numeric fields in every tick, in both backends.
pub const TICK_FIELD_COUNT: usize = 8;

/// Canonical tick field names, in storage order.
pub const TICK_FIELDS: [&str; TICK_FIELD_COUNT] = [
    "pos_x", "pos_y", "move_dir", "target_x", "target_y", "jump", "fire", "hook",
];

/// How a tick field is encoded when written to a typed column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Whole-number game units (positions, cursor target, move direction).
    Integer,
    /// Held / not held.
    Flag,
}

/// One of the eight per-tick fields. The discriminant is the field's offset
/// in a [`Tick`](super::model::Tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TickField {
    PosX = 0,
    PosY = 1,
    /// left = -1, none = 0, right = +1
    MoveDir = 2,
    TargetX = 3,
    TargetY = 4,
    Jump = 5,
    Fire = 6,
    Hook = 7,
}

impl TickField {
    pub const ALL: [TickField; TICK_FIELD_COUNT] = [
        TickField::PosX,
        TickField::PosY,
        TickField::MoveDir,
        TickField::TargetX,
        TickField::TargetY,
        TickField::Jump,
        TickField::Fire,
        TickField::Hook,
    ];

    pub const fn index(self) -> usize {
        self as usize
    }

    pub const fn name(self) -> &'static str {
        TICK_FIELDS[self as usize]
    }

    pub const fn kind(self) -> FieldKind {
        match self {
            TickField::Jump | TickField::Fire | TickField::Hook => FieldKind::Flag,
            _ => FieldKind::Integer,
        }
    }

    /// Look a field up by its column name.
    pub fn from_name(name: &str) -> Result<Self, TraceError> {
        TickField::ALL
            .into_iter()
            .find(|f| f.name() == name)
            .ok_or_else(|| TraceError::UnknownField {
                name: name.to_string(),
            })
    }
}

impl FromStr for TickField {
    type Err = TraceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TickField::from_name(s)
    }
}

impl fmt::Display for TickField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Sequence fields
// ---------------------------------------------------------------------------

/// Attributes of a sequence record. The first three exist in both backends;
/// the rest only in the columnar metadata table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceField {
    StartTick,
    Ticks,
    PlayerName,
    SequenceId,
    MapName,
    TickCount,
}

/// Fields of a binary-packed sequence tuple, in tuple order.
pub const SEQUENCE_FIELDS: [SequenceField; 3] = [
    SequenceField::StartTick,
    SequenceField::Ticks,
    SequenceField::PlayerName,
];

/// Extra fields carried by the columnar metadata table.
pub const COLUMNAR_SEQUENCE_FIELDS: [SequenceField; 3] = [
    SequenceField::SequenceId,
    SequenceField::MapName,
    SequenceField::TickCount,
];

impl SequenceField {
    pub const fn name(self) -> &'static str {
        match self {
            SequenceField::StartTick => "start_tick",
            SequenceField::Ticks => "ticks",
            SequenceField::PlayerName => "player_name",
            SequenceField::SequenceId => "sequence_id",
            SequenceField::MapName => "map_name",
            SequenceField::TickCount => "tick_count",
        }
    }

    /// Position inside a packed `(start_tick, ticks, player_name)` tuple.
    pub fn packed_position(self) -> Option<usize> {
        SEQUENCE_FIELDS.iter().position(|f| *f == self)
    }

    pub fn from_name(name: &str) -> Result<Self, TraceError> {
        SEQUENCE_FIELDS
            .into_iter()
            .chain(COLUMNAR_SEQUENCE_FIELDS)
            .find(|f| f.name() == name)
            .ok_or_else(|| TraceError::UnknownField {
                name: name.to_string(),
            })
    }
}

impl fmt::Display for SequenceField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Join key shared by the metadata and per-tick tables.
pub const SEQUENCE_ID_COLUMN: &str = "sequence_id";

/// Optional per-tick ordering column.
pub const TICK_INDEX_COLUMN: &str = "tick";
