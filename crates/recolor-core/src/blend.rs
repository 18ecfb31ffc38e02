//! Blend mode encoded as a pair of integer fields.

use serde::Serialize;

use crate::document::{Document, NodeId};
use crate::util::parse_i32;

/// Field names of the pair, in order.
pub const BLEND_FIELDS: [&str; 2] = ["Unk16", "Unk17"];

const ADD: (i32, i32) = (-1, -1);
const SUBTRACT: (i32, i32) = (-2, -2);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    Add,
    Subtract,
    /// Any pair that is neither of the known sentinels.
    #[default]
    Unset,
}

impl BlendMode {
    pub fn label(self) -> &'static str {
        match self {
            BlendMode::Add => "Add",
            BlendMode::Subtract => "Subtract",
            BlendMode::Unset => "Unset",
        }
    }

    pub fn from_pair(pair: (i32, i32)) -> Self {
        match pair {
            ADD => BlendMode::Add,
            SUBTRACT => BlendMode::Subtract,
            _ => BlendMode::Unset,
        }
    }

    /// Maps the text of both fields. Unparsable text reads as `Unset`.
    pub fn read(first: &str, second: &str) -> Self {
        match (parse_i32(first), parse_i32(second)) {
            (Some(a), Some(b)) => Self::from_pair((a, b)),
            _ => BlendMode::Unset,
        }
    }

    /// The pair to store, or `None` when the fields should be left alone.
    pub fn write(self) -> Option<(i32, i32)> {
        match self {
            BlendMode::Add => Some(ADD),
            BlendMode::Subtract => Some(SUBTRACT),
            BlendMode::Unset => None,
        }
    }
}

impl std::fmt::Display for BlendMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// The two blend elements of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlendFields {
    pub first: NodeId,
    pub second: NodeId,
}

impl BlendFields {
    /// Finds both fields among the children of `owner`.
    pub fn find(doc: &Document, owner: NodeId) -> Option<Self> {
        Some(Self {
            first: doc.child(owner, BLEND_FIELDS[0])?,
            second: doc.child(owner, BLEND_FIELDS[1])?,
        })
    }

    pub fn read(&self, doc: &Document) -> BlendMode {
        BlendMode::read(&doc.text(self.first), &doc.text(self.second))
    }

    /// Stores `mode`; `Unset` leaves both fields untouched.
    pub fn write(&self, doc: &mut Document, mode: BlendMode) {
        if let Some((a, b)) = mode.write() {
            doc.set_text(self.first, &a.to_string());
            doc.set_text(self.second, &b.to_string());
        }
    }
}
