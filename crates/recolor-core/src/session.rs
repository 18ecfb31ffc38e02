//! Editing session over one loaded document.
//!
//! A session owns the document and the color groups found in it. Every
//! operation runs to completion before returning; failed loads and saves
//! leave the session as it was.

use std::path::{Path, PathBuf};

use crate::blend::BlendMode;
use crate::classify::scan;
use crate::document::{Document, LoadError, NodeId};
use crate::group::{ColorGroup, Field, GroupId, Snapshot};
use crate::timeline::Step;
use crate::util::parse_f32;

/// Element holding the effect's numeric identifier.
pub const EFFECT_ID: &str = "EffectID";

/// Error raised when an edit is refused. Nothing is written.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("No color group {0}")]
    UnknownGroup(GroupId),

    #[error("'{0}' is not a number")]
    InvalidNumber(String),

    #[error("This color group has no {0} field")]
    FieldUnavailable(Field),

    #[error("{field} is interpolated at {time}s, only keyframed values can be edited")]
    NotKeyframed { field: Field, time: f32 },

    #[error("{field} has no keyframe at {time}s to write to")]
    NoKeyframe { field: Field, time: f32 },

    #[error("Color group {0} has no blend fields")]
    NoBlendFields(GroupId),

    #[error("Document has no EffectID element")]
    NoEffectId,
}

/// Error raised when the document cannot be written out.
#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to write {}", path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A loaded document and its color groups.
#[derive(Debug, Clone)]
pub struct Session {
    document: Document,
    groups: Vec<ColorGroup>,
    effect_id: Option<NodeId>,
}

impl Session {
    /// Parses a document and discovers its color groups, ordered by source
    /// line and titled `Color #1`, `Color #2`, ...
    pub fn load(bytes: &[u8]) -> Result<Self, LoadError> {
        let document = Document::parse(bytes)?;

        let mut groups: Vec<ColorGroup> = scan(&document)
            .into_iter()
            .map(|candidate| ColorGroup::from_candidate(&document, candidate))
            .collect();
        groups.sort_by_key(ColorGroup::line);
        for (position, group) in groups.iter_mut().enumerate() {
            group.assign_position(GroupId(position));
        }

        let effect_id = document.elements_named(EFFECT_ID).first().copied();

        tracing::info!(
            groups = groups.len(),
            effect_id = ?effect_id.map(|id| document.text(id)),
            "Loaded effect document"
        );

        Ok(Self {
            document,
            groups,
            effect_id,
        })
    }

    /// Replaces this session with a freshly loaded document. On error the
    /// current document and its edits stay as they were.
    pub fn reload(&mut self, bytes: &[u8]) -> Result<(), LoadError> {
        *self = Self::load(bytes)?;
        Ok(())
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn groups(&self) -> &[ColorGroup] {
        &self.groups
    }

    pub fn group(&self, id: GroupId) -> Result<&ColorGroup, EditError> {
        self.groups.get(id.0).ok_or(EditError::UnknownGroup(id))
    }

    /// Borrows a group mutably together with the document.
    fn group_mut(&mut self, id: GroupId) -> Result<(&mut ColorGroup, &mut Document), EditError> {
        let group = self
            .groups
            .get_mut(id.0)
            .ok_or(EditError::UnknownGroup(id))?;
        Ok((group, &mut self.document))
    }

    /// Snapshot at the group's current timeline position.
    pub fn evaluate(&self, id: GroupId) -> Result<Snapshot, EditError> {
        Ok(self.group(id)?.snapshot(&self.document))
    }

    /// Snapshot at a timeline index, clamped to the timeline. Does not move
    /// the current position.
    pub fn evaluate_at(&self, id: GroupId, index: usize) -> Result<Snapshot, EditError> {
        Ok(self.group(id)?.evaluate_at(&self.document, index))
    }

    /// Moves the current position to `index` (clamped) and returns it.
    pub fn seek(&mut self, id: GroupId, index: usize) -> Result<usize, EditError> {
        let (group, _) = self.group_mut(id)?;
        Ok(group.seek(index))
    }

    /// Moves the current position one step, clamped, and returns it.
    pub fn step_time(&mut self, id: GroupId, step: Step) -> Result<usize, EditError> {
        let (group, _) = self.group_mut(id)?;
        Ok(group.step(step))
    }

    /// Parses user text and commits it to `field` at the current time.
    pub fn commit_edit(
        &mut self,
        id: GroupId,
        field: Field,
        text: &str,
    ) -> Result<Snapshot, EditError> {
        let value = parse_f32(text).ok_or_else(|| EditError::InvalidNumber(text.to_owned()))?;
        self.commit_value(id, field, value)
    }

    /// Commits `value` to `field` at the current time, clamped to the field's
    /// domain, and returns the refreshed snapshot.
    pub fn commit_value(
        &mut self,
        id: GroupId,
        field: Field,
        value: f32,
    ) -> Result<Snapshot, EditError> {
        let (group, document) = self.group_mut(id)?;
        group.commit_value(document, field, value)?;
        Ok(group.snapshot(document))
    }

    /// Commits a whole base color at the current time.
    pub fn commit_base_color(&mut self, id: GroupId, rgb: [f32; 3]) -> Result<Snapshot, EditError> {
        let (group, document) = self.group_mut(id)?;
        group.commit_base_color(document, rgb)?;
        Ok(group.snapshot(document))
    }

    /// Commits tint R, G and B at the current time.
    pub fn commit_tint_color(&mut self, id: GroupId, rgb: [f32; 3]) -> Result<Snapshot, EditError> {
        let (group, document) = self.group_mut(id)?;
        group.commit_tint_color(document, rgb)?;
        Ok(group.snapshot(document))
    }

    pub fn blend_mode(&self, id: GroupId) -> Result<BlendMode, EditError> {
        Ok(self.group(id)?.blend_mode(&self.document))
    }

    /// Stores a blend mode. `Unset` leaves the fields untouched.
    pub fn set_blend_mode(&mut self, id: GroupId, mode: BlendMode) -> Result<(), EditError> {
        let (group, document) = self.group_mut(id)?;
        group.set_blend_mode(document, mode)?;
        tracing::debug!(group = %id, %mode, "Set blend mode");
        Ok(())
    }

    /// Text of the first `EffectID` element, if the document has one.
    pub fn effect_id(&self) -> Option<String> {
        self.effect_id.map(|id| self.document.text(id))
    }

    pub fn set_effect_id(&mut self, value: &str) -> Result<(), EditError> {
        let id = self.effect_id.ok_or(EditError::NoEffectId)?;
        self.document.set_text(id, value);
        tracing::debug!(effect_id = value, "Set effect id");
        Ok(())
    }

    /// The whole document, including edits.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.document.serialize().into_bytes()
    }

    pub fn write_to(&self, writer: &mut impl std::io::Write) -> Result<(), SerializeError> {
        writer.write_all(self.document.serialize().as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Writes the document to `path`, replacing any existing file.
    pub fn save(&self, path: &Path) -> Result<(), SerializeError> {
        std::fs::write(path, self.to_bytes()).map_err(|source| SerializeError::File {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "Saved effect document");
        Ok(())
    }
}
