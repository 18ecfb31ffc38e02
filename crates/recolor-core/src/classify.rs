//! Finds the color-carrying elements of a document.
//!
//! Two kinds of element hold a base color: `ActionData` elements whose
//! discriminator is one of [`ACTION_SHAPES`], and `FXNode` elements whose
//! discriminator starts with [`COLOR_SEQUENCE_NODE_PREFIX`]. Candidates with
//! missing color fields are skipped, not reported.

use std::collections::HashSet;

use crate::blend::BlendFields;
use crate::document::{Document, NodeId};

pub const ACTION_DATA: &str = "ActionData";
pub const FX_NODE: &str = "FXNode";
pub const COLOR_SEQUENCE_NODE_PREFIX: &str = "ColorSequenceNode";

/// Block carrying tint, alpha and power.
pub const TINT_BLOCK: &str = "DS1RData";
/// Tint R, G and B fields inside [`TINT_BLOCK`].
pub const TINT_FIELDS: [&str; 3] = ["Unk1", "Unk2", "Unk3"];
pub const ALPHA_FIELD: &str = "Unk4";
pub const POWER_FIELD: &str = "Unk5";

/// An action-data discriminator and the names of its R, G and B fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionShape {
    pub discriminator: &'static str,
    pub fields: [&'static str; 3],
}

pub const ACTION_SHAPES: [ActionShape; 4] = [
    ActionShape {
        discriminator: "Particle2DActionData71",
        fields: ["Color2R", "Color2G", "Color2B"],
    },
    ActionShape {
        discriminator: "FXActionData40",
        fields: ["Unk11_1", "Unk11_2", "Unk11_3"],
    },
    ActionShape {
        discriminator: "FXActionData59",
        fields: ["Unk7_5", "Unk7_6", "Unk7_7"],
    },
    ActionShape {
        discriminator: "Particle3DActionData108",
        fields: ["Color2R", "Color2G", "Color2B"],
    },
];

impl ActionShape {
    pub fn lookup(discriminator: &str) -> Option<&'static ActionShape> {
        ACTION_SHAPES
            .iter()
            .find(|shape| shape.discriminator == discriminator)
    }
}

/// Where a candidate's base color lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateKind {
    /// Three scalar fields.
    Action {
        shape: &'static ActionShape,
        fields: [NodeId; 3],
    },
    /// `ColorTick` descendants of the element itself.
    ColorSequence,
}

/// Field elements of a tint block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TintFields {
    pub rgb: [NodeId; 3],
    pub alpha: Option<NodeId>,
    pub power: Option<NodeId>,
}

/// A recognized color element, before any channel is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub element: NodeId,
    /// Discriminator, shown to the user.
    pub label: String,
    pub line: u32,
    pub kind: CandidateKind,
    pub tint: Option<TintFields>,
    pub blend: Option<BlendFields>,
}

/// Scans the whole document. Action-data candidates come first, then color
/// sequence nodes, each in document order.
pub fn scan(doc: &Document) -> Vec<Candidate> {
    let mut candidates = Vec::new();
    let mut seen = HashSet::new();

    for element in doc.elements_named(ACTION_DATA) {
        if let Some(candidate) = classify_action(doc, element) {
            if seen.insert(candidate.element) {
                candidates.push(candidate);
            }
        }
    }

    for element in doc.elements_named(FX_NODE) {
        if let Some(candidate) = classify_color_sequence(doc, element) {
            if seen.insert(candidate.element) {
                candidates.push(candidate);
            }
        }
    }

    candidates
}

/// Recognizes an `ActionData` element with all three color fields.
pub fn classify_action(doc: &Document, element: NodeId) -> Option<Candidate> {
    let discriminator = doc.type_discriminator(element)?;
    let shape = ActionShape::lookup(discriminator)?;

    let [r, g, b] = shape.fields;
    let fields = match (doc.child(element, r), doc.child(element, g), doc.child(element, b)) {
        (Some(r), Some(g), Some(b)) => [r, g, b],
        _ => {
            tracing::debug!(
                line = doc.line(element),
                shape = discriminator,
                "Skipping action data with missing color fields"
            );
            return None;
        }
    };

    Some(Candidate {
        element,
        label: discriminator.to_owned(),
        line: doc.line(element),
        kind: CandidateKind::Action { shape, fields },
        tint: find_tint(doc, element),
        blend: BlendFields::find(doc, element),
    })
}

/// Recognizes an `FXNode` whose discriminator marks a color sequence.
pub fn classify_color_sequence(doc: &Document, element: NodeId) -> Option<Candidate> {
    let discriminator = doc.type_discriminator(element)?;
    if !discriminator.starts_with(COLOR_SEQUENCE_NODE_PREFIX) {
        return None;
    }

    Some(Candidate {
        element,
        label: discriminator.to_owned(),
        line: doc.line(element),
        kind: CandidateKind::ColorSequence,
        tint: find_tint(doc, element),
        blend: BlendFields::find(doc, element),
    })
}

/// The tint block of `owner`. Requires tint R, G and B; alpha and power are
/// optional.
fn find_tint(doc: &Document, owner: NodeId) -> Option<TintFields> {
    let block = doc.child(owner, TINT_BLOCK)?;
    let [r, g, b] = TINT_FIELDS;
    let rgb = match (doc.child(block, r), doc.child(block, g), doc.child(block, b)) {
        (Some(r), Some(g), Some(b)) => [r, g, b],
        _ => {
            tracing::debug!(line = doc.line(block), "Ignoring tint block without R, G and B");
            return None;
        }
    };
    Some(TintFields {
        rgb,
        alpha: doc.child(block, ALPHA_FIELD),
        power: doc.child(block, POWER_FIELD),
    })
}
