//! FFX Recolor Core Library
//!
//! Color data model for DS1 FFX particle effect documents: finds every
//! editable color, merges its keyframes into one timeline, evaluates it at any
//! point on that timeline and writes edits back into the original document
//! without disturbing anything else in it.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]

pub mod binding;
pub mod blend;
pub mod channel;
pub mod classify;
pub mod document;
pub mod group;
pub mod interpolate;
pub mod preview;
pub mod reader;
pub mod session;
pub mod timeline;
pub mod util;

pub use binding::{BoundChannel, BoundColorSequence};
pub use blend::{BlendFields, BlendMode};
pub use channel::{Channel, ColorSequence, ColorTick, Sample, Tick};
pub use classify::{ACTION_SHAPES, ActionShape, Candidate, CandidateKind};
pub use document::{Document, LoadError, NodeId};
pub use group::{BaseColor, ColorGroup, Field, GroupId, Snapshot, TintData, TintSnapshot};
pub use preview::{GradientStop, ParseColorError, Rgb8, color_swatch, gradient_stops, tint_swatch};
pub use session::{EditError, SerializeError, Session};
pub use timeline::{Step, Timeline};
