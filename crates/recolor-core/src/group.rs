//! Color groups: one editable color entity with its own timeline.

use serde::Serialize;

use crate::binding::{BoundChannel, BoundColorSequence};
use crate::blend::{BlendFields, BlendMode};
use crate::channel::Sample;
use crate::classify::{Candidate, CandidateKind, TintFields};
use crate::document::{Document, NodeId};
use crate::reader::{read_channel, read_color_sequence};
use crate::session::EditError;
use crate::timeline::{Step, Timeline};

/// Upper bound of base color and alpha values.
pub const UNIT_MAX: f32 = 1.0;
/// Upper bound of tint and power values.
pub const TINT_MAX: f32 = 10.0;

/// Position of a group in source order, stable for the life of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupId(pub usize);

impl std::fmt::Display for GroupId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0 + 1)
    }
}

/// An editable scalar of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Field {
    BaseR,
    BaseG,
    BaseB,
    TintR,
    TintG,
    TintB,
    Alpha,
    Power,
}

impl Field {
    pub const ALL: [Field; 8] = [
        Field::BaseR,
        Field::BaseG,
        Field::BaseB,
        Field::TintR,
        Field::TintG,
        Field::TintB,
        Field::Alpha,
        Field::Power,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::BaseR => "base-r",
            Field::BaseG => "base-g",
            Field::BaseB => "base-b",
            Field::TintR => "tint-r",
            Field::TintG => "tint-g",
            Field::TintB => "tint-b",
            Field::Alpha => "alpha",
            Field::Power => "power",
        }
    }

    /// Upper bound of the field's domain. The lower bound is always `0`.
    pub fn max(self) -> f32 {
        match self {
            Field::BaseR | Field::BaseG | Field::BaseB | Field::Alpha => UNIT_MAX,
            Field::TintR | Field::TintG | Field::TintB | Field::Power => TINT_MAX,
        }
    }

    pub fn clamp(self, value: f32) -> f32 {
        value.clamp(0.0, self.max())
    }

    /// Component index for the color fields.
    fn component(self) -> Option<usize> {
        match self {
            Field::BaseR | Field::TintR => Some(0),
            Field::BaseG | Field::TintG => Some(1),
            Field::BaseB | Field::TintB => Some(2),
            Field::Alpha | Field::Power => None,
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Base color in whichever shape the document stores it.
#[derive(Debug, Clone)]
pub enum BaseColor {
    /// Three independent scalar channels.
    Channels([BoundChannel; 3]),
    /// One sequence of RGB ticks.
    Sequence(BoundColorSequence),
}

impl BaseColor {
    pub fn evaluate(&self, time: f32) -> [Sample<f32>; 3] {
        match self {
            BaseColor::Channels(channels) => channels.each_ref().map(|c| c.evaluate(time)),
            BaseColor::Sequence(sequence) => {
                let sample = sequence.evaluate(time);
                sample.value.map(|value| Sample::new(value, sample.exact))
            }
        }
    }

    fn tick_times(&self) -> Vec<f32> {
        match self {
            BaseColor::Channels(channels) => channels
                .iter()
                .flat_map(|c| c.channel().tick_times())
                .collect(),
            BaseColor::Sequence(sequence) => sequence.sequence().tick_times(),
        }
    }

    pub fn shape(&self) -> &'static str {
        match self {
            BaseColor::Channels(_) => "channels",
            BaseColor::Sequence(_) => "color-sequence",
        }
    }
}

/// Tint, alpha and power of a group.
#[derive(Debug, Clone)]
pub struct TintData {
    pub rgb: [BoundChannel; 3],
    pub alpha: Option<BoundChannel>,
    pub power: Option<BoundChannel>,
}

impl TintData {
    fn read(doc: &Document, fields: &TintFields) -> Self {
        Self {
            rgb: fields.rgb.map(|field| read_channel(doc, field)),
            alpha: fields.alpha.map(|field| read_channel(doc, field)),
            power: fields.power.map(|field| read_channel(doc, field)),
        }
    }

    fn channels(&self) -> impl Iterator<Item = &BoundChannel> {
        self.rgb
            .iter()
            .chain(self.alpha.as_ref())
            .chain(self.power.as_ref())
    }
}

/// Tint part of a [`Snapshot`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TintSnapshot {
    pub rgb: [Sample<f32>; 3],
    pub alpha: Option<Sample<f32>>,
    pub power: Option<Sample<f32>>,
}

/// Every field of a group evaluated at one timeline position.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub group: GroupId,
    pub title: String,
    pub label: String,
    pub line: u32,
    pub time_index: usize,
    pub timeline_len: usize,
    pub time: f32,
    pub base: [Sample<f32>; 3],
    pub tint: Option<TintSnapshot>,
    pub blend_mode: BlendMode,
}

impl Snapshot {
    /// Value of `field`, or `None` when the group has no such field.
    pub fn field(&self, field: Field) -> Option<Sample<f32>> {
        match field {
            Field::BaseR | Field::BaseG | Field::BaseB => {
                field.component().map(|i| self.base[i])
            }
            Field::TintR | Field::TintG | Field::TintB => {
                let tint = self.tint.as_ref()?;
                field.component().map(|i| tint.rgb[i])
            }
            Field::Alpha => self.tint.as_ref()?.alpha,
            Field::Power => self.tint.as_ref()?.power,
        }
    }

    /// `Time: 0.50s`
    pub fn time_label(&self) -> String {
        format!("Time: {:.2}s", self.time)
    }

    /// 1-based position, e.g. `2/5`.
    pub fn position_label(&self) -> String {
        format!("{}/{}", self.time_index + 1, self.timeline_len)
    }
}

/// One editable color entity.
#[derive(Debug, Clone)]
pub struct ColorGroup {
    id: GroupId,
    title: String,
    label: String,
    element: NodeId,
    line: u32,
    base: BaseColor,
    tint: Option<TintData>,
    blend: Option<BlendFields>,
    timeline: Timeline,
    current: usize,
}

impl ColorGroup {
    /// Reads every channel of a candidate. The title is assigned later, once
    /// groups are put in source order.
    pub fn from_candidate(doc: &Document, candidate: Candidate) -> Self {
        let base = match candidate.kind {
            CandidateKind::Action { fields, .. } => {
                BaseColor::Channels(fields.map(|field| read_channel(doc, field)))
            }
            CandidateKind::ColorSequence => {
                BaseColor::Sequence(read_color_sequence(doc, candidate.element))
            }
        };
        let tint = candidate.tint.as_ref().map(|fields| TintData::read(doc, fields));

        let mut times = base.tick_times();
        if let Some(tint) = &tint {
            times.extend(tint.channels().flat_map(|c| c.channel().tick_times()));
        }

        Self {
            id: GroupId(0),
            title: String::new(),
            label: candidate.label,
            element: candidate.element,
            line: candidate.line,
            base,
            tint,
            blend: candidate.blend,
            timeline: Timeline::merge(times),
            current: 0,
        }
    }

    pub(crate) fn assign_position(&mut self, id: GroupId) {
        self.title = format!("Color {id}");
        self.id = id;
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    /// `Color #n`
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Discriminator of the source element.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn base(&self) -> &BaseColor {
        &self.base
    }

    pub fn tint(&self) -> Option<&TintData> {
        self.tint.as_ref()
    }

    pub fn has_blend_fields(&self) -> bool {
        self.blend.is_some()
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_time(&self) -> f32 {
        self.timeline.time_at(self.current)
    }

    /// Moves the current position to `index`, clamped to the timeline.
    pub fn seek(&mut self, index: usize) -> usize {
        self.current = self.timeline.clamp_index(index);
        self.current
    }

    pub fn step(&mut self, step: Step) -> usize {
        self.current = self.timeline.step(self.current, step);
        self.current
    }

    pub fn blend_mode(&self, doc: &Document) -> BlendMode {
        self.blend
            .as_ref()
            .map_or(BlendMode::Unset, |fields| fields.read(doc))
    }

    /// Stores `mode` in the blend fields. `Unset` changes nothing.
    pub fn set_blend_mode(&self, doc: &mut Document, mode: BlendMode) -> Result<(), EditError> {
        let fields = self.blend.as_ref().ok_or(EditError::NoBlendFields(self.id))?;
        fields.write(doc, mode);
        Ok(())
    }

    /// Evaluates every field at the given timeline index (clamped).
    pub fn evaluate_at(&self, doc: &Document, index: usize) -> Snapshot {
        let time_index = self.timeline.clamp_index(index);
        let time = self.timeline.time_at(time_index);
        let tint = self.tint.as_ref().map(|tint| TintSnapshot {
            rgb: tint.rgb.each_ref().map(|c| c.evaluate(time)),
            alpha: tint.alpha.as_ref().map(|c| c.evaluate(time)),
            power: tint.power.as_ref().map(|c| c.evaluate(time)),
        });

        Snapshot {
            group: self.id,
            title: self.title.clone(),
            label: self.label.clone(),
            line: self.line,
            time_index,
            timeline_len: self.timeline.len(),
            time,
            base: self.base.evaluate(time),
            tint,
            blend_mode: self.blend_mode(doc),
        }
    }

    /// Evaluates every field at the current position.
    pub fn snapshot(&self, doc: &Document) -> Snapshot {
        self.evaluate_at(doc, self.current)
    }

    fn sample(&self, field: Field, time: f32) -> Option<Sample<f32>> {
        match field {
            Field::BaseR | Field::BaseG | Field::BaseB => {
                field.component().map(|i| self.base.evaluate(time)[i])
            }
            _ => self.tint_channel(field).map(|c| c.evaluate(time)),
        }
    }

    fn tint_channel(&self, field: Field) -> Option<&BoundChannel> {
        let tint = self.tint.as_ref()?;
        match field {
            Field::TintR | Field::TintG | Field::TintB => field.component().map(|i| &tint.rgb[i]),
            Field::Alpha => tint.alpha.as_ref(),
            Field::Power => tint.power.as_ref(),
            Field::BaseR | Field::BaseG | Field::BaseB => None,
        }
    }

    fn tint_channel_mut(&mut self, field: Field) -> Option<&mut BoundChannel> {
        let tint = self.tint.as_mut()?;
        match field {
            Field::TintR | Field::TintG | Field::TintB => {
                field.component().map(|i| &mut tint.rgb[i])
            }
            Field::Alpha => tint.alpha.as_mut(),
            Field::Power => tint.power.as_mut(),
            Field::BaseR | Field::BaseG | Field::BaseB => None,
        }
    }

    /// Whether a stored value of `field` belongs to `time`.
    fn writable(&self, field: Field, time: f32) -> bool {
        match (&self.base, field.component()) {
            (BaseColor::Channels(channels), Some(i)) if is_base(field) => {
                channels[i].accepts(time)
            }
            // Exact color samples always come from a tick.
            (BaseColor::Sequence(_), _) if is_base(field) => true,
            _ => self.tint_channel(field).is_some_and(|c| c.accepts(time)),
        }
    }

    /// Checks that `field` exists, is keyframed at the current time and has
    /// a stored value there to overwrite.
    fn editable(&self, field: Field) -> Result<Sample<f32>, EditError> {
        let time = self.current_time();
        let sample = self
            .sample(field, time)
            .ok_or(EditError::FieldUnavailable(field))?;
        if !sample.exact {
            return Err(EditError::NotKeyframed { field, time });
        }
        if !self.writable(field, time) {
            return Err(EditError::NoKeyframe { field, time });
        }
        Ok(sample)
    }

    /// Writes one field at the current time. The value is clamped to the
    /// field's domain.
    pub fn commit_value(
        &mut self,
        doc: &mut Document,
        field: Field,
        value: f32,
    ) -> Result<(), EditError> {
        if !value.is_finite() {
            return Err(EditError::InvalidNumber(value.to_string()));
        }
        self.editable(field)?;
        let time = self.current_time();
        let value = field.clamp(value);

        let written = if let (true, Some(i)) = (is_base(field), field.component()) {
            match &mut self.base {
                BaseColor::Channels(channels) => channels[i].commit(doc, time, value),
                BaseColor::Sequence(sequence) => {
                    // The other two components keep their keyframed values.
                    let mut rgb = sequence.evaluate(time).value;
                    rgb[i] = value;
                    sequence.commit(doc, time, rgb)
                }
            }
        } else {
            let channel = self
                .tint_channel_mut(field)
                .ok_or(EditError::FieldUnavailable(field))?;
            channel.commit(doc, time, value)
        };
        if !written {
            return Err(EditError::NoKeyframe { field, time });
        }

        tracing::debug!(group = %self.id, %field, time, value, "Committed field");
        Ok(())
    }

    /// Writes the whole base color at the current time.
    pub fn commit_base_color(&mut self, doc: &mut Document, rgb: [f32; 3]) -> Result<(), EditError> {
        let rgb = validate_triple(rgb, UNIT_MAX)?;
        for field in [Field::BaseR, Field::BaseG, Field::BaseB] {
            self.editable(field)?;
        }
        let time = self.current_time();

        let written = match &mut self.base {
            BaseColor::Channels(channels) => channels
                .iter_mut()
                .zip(rgb)
                .all(|(channel, value)| channel.commit(doc, time, value)),
            BaseColor::Sequence(sequence) => sequence.commit(doc, time, rgb),
        };
        if !written {
            return Err(EditError::NoKeyframe { field: Field::BaseR, time });
        }
        tracing::debug!(group = %self.id, time, ?rgb, "Committed base color");
        Ok(())
    }

    /// Writes tint R, G and B at the current time.
    pub fn commit_tint_color(&mut self, doc: &mut Document, rgb: [f32; 3]) -> Result<(), EditError> {
        let rgb = validate_triple(rgb, TINT_MAX)?;
        for field in [Field::TintR, Field::TintG, Field::TintB] {
            self.editable(field)?;
        }
        let time = self.current_time();
        let tint = self
            .tint
            .as_mut()
            .ok_or(EditError::FieldUnavailable(Field::TintR))?;
        let written = tint
            .rgb
            .iter_mut()
            .zip(rgb)
            .all(|(channel, value)| channel.commit(doc, time, value));
        if !written {
            return Err(EditError::NoKeyframe { field: Field::TintR, time });
        }
        tracing::debug!(group = %self.id, time, ?rgb, "Committed tint color");
        Ok(())
    }
}

fn is_base(field: Field) -> bool {
    matches!(field, Field::BaseR | Field::BaseG | Field::BaseB)
}

fn validate_triple(rgb: [f32; 3], max: f32) -> Result<[f32; 3], EditError> {
    if let Some(bad) = rgb.iter().find(|value| !value.is_finite()) {
        return Err(EditError::InvalidNumber(bad.to_string()));
    }
    Ok(rgb.map(|value| value.clamp(0.0, max)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::scan;

    const FIXTURE: &str = include_str!("../fixtures/sample_ffx.xml");

    fn groups(doc: &Document) -> Vec<ColorGroup> {
        scan(doc)
            .into_iter()
            .map(|candidate| ColorGroup::from_candidate(doc, candidate))
            .collect()
    }

    fn by_label<'a>(groups: &'a mut [ColorGroup], label: &str) -> &'a mut ColorGroup {
        groups.iter_mut().find(|g| g.label() == label).unwrap()
    }

    #[test]
    fn test_timelines() {
        let doc = Document::parse_str(FIXTURE).unwrap();
        let mut groups = groups(&doc);
        assert_eq!(
            by_label(&mut groups, "Particle2DActionData71").timeline().times(),
            &[0.0, 0.5, 1.0]
        );
        assert_eq!(
            by_label(&mut groups, "FXActionData40").timeline().times(),
            &[0.0, 1.0, 2.0]
        );
        assert_eq!(
            by_label(&mut groups, "ColorSequenceNode3").timeline().times(),
            &[0.0, 0.25, 0.75]
        );
        assert_eq!(
            by_label(&mut groups, "Particle3DActionData108").timeline().times(),
            &[0.0]
        );
    }

    #[test]
    fn test_snapshot_values() {
        let doc = Document::parse_str(FIXTURE).unwrap();
        let mut groups = groups(&doc);
        let group = by_label(&mut groups, "Particle2DActionData71");
        let snapshot = group.evaluate_at(&doc, 1);

        assert_eq!(snapshot.time, 0.5);
        assert_eq!(snapshot.field(Field::BaseR), Some(Sample::new(0.25, true)));
        assert_eq!(snapshot.field(Field::TintR), Some(Sample::new(2.5, true)));
        assert_eq!(snapshot.field(Field::Alpha), Some(Sample::new(1.0, true)));
        assert_eq!(snapshot.field(Field::Power), Some(Sample::new(3.0, true)));
        assert_eq!(snapshot.blend_mode, BlendMode::Add);
        assert_eq!(snapshot.time_label(), "Time: 0.50s");
        assert_eq!(snapshot.position_label(), "2/3");
    }

    #[test]
    fn test_interpolated_base_channels() {
        let doc = Document::parse_str(FIXTURE).unwrap();
        let mut groups = groups(&doc);
        let group = by_label(&mut groups, "FXActionData40");

        // t = 1: R is keyed, G lies between (0, 0) and (2, 1).
        let snapshot = group.evaluate_at(&doc, 1);
        assert_eq!(snapshot.base[0], Sample::new(0.0, true));
        assert!((snapshot.base[1].value - 0.5).abs() < 0.001);
        assert!(!snapshot.base[1].exact);
        assert_eq!(snapshot.base[2], Sample::new(0.75, true));

        // t = 2: R clamps to its last tick.
        let snapshot = group.evaluate_at(&doc, 2);
        assert_eq!(snapshot.base[0], Sample::new(0.0, false));
        assert_eq!(snapshot.blend_mode, BlendMode::Subtract);
        assert!(snapshot.tint.is_none());
        assert_eq!(snapshot.field(Field::Alpha), None);
    }

    #[test]
    fn test_color_sequence_before_first_tick_is_black() {
        let doc = Document::parse_str(FIXTURE).unwrap();
        let mut groups = groups(&doc);
        let group = by_label(&mut groups, "ColorSequenceNode3");

        let snapshot = group.evaluate_at(&doc, 0);
        assert_eq!(snapshot.base, [Sample::new(0.0, false); 3]);
        // Power is a scalar sequence and is keyed at 0.
        assert_eq!(snapshot.field(Field::Power), Some(Sample::new(2.0, true)));

        let snapshot = group.evaluate_at(&doc, 1);
        assert_eq!(
            snapshot.base,
            [
                Sample::new(1.0, true),
                Sample::new(0.0, true),
                Sample::new(0.0, true)
            ]
        );
        // Between (0, 2) and (0.75, 4).
        let power = snapshot.field(Field::Power).unwrap();
        assert!((power.value - 8.0 / 3.0).abs() < 0.001);
        assert!(!power.exact);
        assert_eq!(snapshot.blend_mode, BlendMode::Unset);
    }

    #[test]
    fn test_commit_rejects_interpolated_field() {
        let mut doc = Document::parse_str(FIXTURE).unwrap();
        let mut groups = groups(&doc);
        let group = by_label(&mut groups, "FXActionData40");
        group.seek(1);
        let err = group.commit_value(&mut doc, Field::BaseG, 0.4).unwrap_err();
        assert!(matches!(err, EditError::NotKeyframed { field: Field::BaseG, .. }));
        assert_eq!(doc.serialize(), FIXTURE);
    }

    #[test]
    fn test_commit_color_sequence_component_keeps_others() {
        let mut doc = Document::parse_str(FIXTURE).unwrap();
        let mut groups = groups(&doc);
        let group = by_label(&mut groups, "ColorSequenceNode3");
        group.seek(2);
        group.commit_value(&mut doc, Field::BaseG, 0.5).unwrap();
        assert_eq!(
            group.snapshot(&doc).base,
            [
                Sample::new(0.0, true),
                Sample::new(0.5, true),
                Sample::new(1.0, true)
            ]
        );
        assert!(doc.serialize().contains(
            r#"<ColorTick Time="0.75" R="0.0000" G="0.5000" B="1.0000" />"#
        ));
    }

    #[test]
    fn test_commit_clamps_to_domain() {
        let mut doc = Document::parse_str(FIXTURE).unwrap();
        let mut groups = groups(&doc);
        let group = by_label(&mut groups, "Particle2DActionData71");
        group.commit_value(&mut doc, Field::BaseR, 4.0).unwrap();
        group.commit_value(&mut doc, Field::TintG, 42.0).unwrap();
        group.commit_value(&mut doc, Field::Power, -1.0).unwrap();
        let snapshot = group.snapshot(&doc);
        assert_eq!(snapshot.field(Field::BaseR).unwrap().value, 1.0);
        assert_eq!(snapshot.field(Field::TintG).unwrap().value, 10.0);
        assert_eq!(snapshot.field(Field::Power).unwrap().value, 0.0);
    }

    #[test]
    fn test_commit_tint_requires_tint_block() {
        let mut doc = Document::parse_str(FIXTURE).unwrap();
        let mut groups = groups(&doc);
        let group = by_label(&mut groups, "FXActionData40");
        assert!(matches!(
            group.commit_value(&mut doc, Field::Alpha, 0.5),
            Err(EditError::FieldUnavailable(Field::Alpha))
        ));
        assert!(matches!(
            group.commit_tint_color(&mut doc, [1.0; 3]),
            Err(EditError::FieldUnavailable(Field::TintR))
        ));
    }

    #[test]
    fn test_commit_base_color_on_channels() {
        let mut doc = Document::parse_str(FIXTURE).unwrap();
        let mut groups = groups(&doc);
        let group = by_label(&mut groups, "Particle3DActionData108");
        group
            .commit_base_color(&mut doc, [0.5, 2.0, -1.0])
            .unwrap();
        let text = doc.serialize();
        assert!(text.contains(r#"<Color2R xsi:type="ConstFloat" Value="0.5000" />"#));
        assert!(text.contains(r#"<Color2G xsi:type="ConstFloat" Value="1.0000" />"#));
        assert!(text.contains(r#"<Color2B xsi:type="ConstFloat" Value="0.0000" />"#));
    }

    #[test]
    fn test_set_blend_mode_without_fields() {
        let mut doc = Document::parse_str(FIXTURE).unwrap();
        let mut groups = groups(&doc);
        let group = by_label(&mut groups, "Particle3DActionData108");
        assert!(matches!(
            group.set_blend_mode(&mut doc, BlendMode::Add),
            Err(EditError::NoBlendFields(_))
        ));
        assert_eq!(group.blend_mode(&doc), BlendMode::Unset);
    }

    #[test]
    fn test_field_domains() {
        assert_eq!(Field::Alpha.clamp(1.5), 1.0);
        assert_eq!(Field::TintB.clamp(9.5), 9.5);
        assert_eq!(Field::Power.clamp(11.0), 10.0);
        assert_eq!(Field::BaseG.clamp(-0.2), 0.0);
        assert_eq!(Field::ALL.len(), 8);
        assert_eq!(Field::TintR.to_string(), "tint-r");
    }
}
