//! Channels tied to the document elements they were read from.
//!
//! Every commit updates the in-memory model and the matching attribute
//! together, so the model always equals what a reload of the serialized
//! document would read.

use crate::channel::{Channel, ColorSequence, Sample, Slot};
use crate::document::{Document, NodeId};
use crate::reader::{BLUE, GREEN, RED, VALUE};
use crate::util::quantize;

/// A scalar channel and the elements holding its values.
#[derive(Debug, Clone)]
pub struct BoundChannel {
    element: NodeId,
    channel: Channel,
    /// Tick elements, parallel to the sequence ticks.
    tick_nodes: Vec<NodeId>,
}

impl BoundChannel {
    pub fn new(element: NodeId, channel: Channel, tick_nodes: Vec<NodeId>) -> Self {
        Self {
            element,
            channel,
            tick_nodes,
        }
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn evaluate(&self, time: f32) -> Sample<f32> {
        self.channel.evaluate(time)
    }

    /// Whether a commit at `time` would write anything.
    pub fn accepts(&self, time: f32) -> bool {
        self.channel.slot_at(time).is_some()
    }

    /// Writes `value` for `time`, rounded to the precision the document
    /// stores. Returns `false` when no stored value belongs to `time`.
    pub fn commit(&mut self, doc: &mut Document, time: f32, value: f32) -> bool {
        let (text, stored) = quantize(value);
        let target = match self.channel.commit(time, stored) {
            Some(Slot::Constant) => self.element,
            Some(Slot::Tick(index)) => match self.tick_nodes.get(index) {
                Some(node) => *node,
                None => return false,
            },
            None => {
                tracing::debug!(
                    line = doc.line(self.element),
                    time,
                    "No keyframe at this time, nothing written"
                );
                return false;
            }
        };
        doc.set_attribute(target, VALUE, &text);
        true
    }
}

/// A color sequence and its tick elements.
#[derive(Debug, Clone)]
pub struct BoundColorSequence {
    element: NodeId,
    sequence: ColorSequence,
    tick_nodes: Vec<NodeId>,
}

impl BoundColorSequence {
    pub fn new(element: NodeId, sequence: ColorSequence, tick_nodes: Vec<NodeId>) -> Self {
        Self {
            element,
            sequence,
            tick_nodes,
        }
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn sequence(&self) -> &ColorSequence {
        &self.sequence
    }

    pub fn evaluate(&self, time: f32) -> Sample<[f32; 3]> {
        self.sequence.evaluate(time)
    }

    /// Overwrites `R`, `G` and `B` of the tick at `time` in one step.
    pub fn commit(&mut self, doc: &mut Document, time: f32, rgb: [f32; 3]) -> bool {
        let components = rgb.map(quantize);
        let stored = [components[0].1, components[1].1, components[2].1];
        let Some(index) = self.sequence.commit(time, stored) else {
            tracing::debug!(
                line = doc.line(self.element),
                time,
                "No color tick at this time, nothing written"
            );
            return false;
        };
        let Some(&node) = self.tick_nodes.get(index) else {
            return false;
        };
        for (name, (text, _)) in [RED, GREEN, BLUE].into_iter().zip(&components) {
            doc.set_attribute(node, name, text);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::{read_channel, read_color_sequence};

    fn field(doc: &Document, name: &str) -> NodeId {
        doc.descendants_named(doc.root(), name)[0]
    }

    #[test]
    fn test_constant_commit_writes_value_attribute() {
        let mut doc = Document::parse_str(r#"<r><F Kind="c" Value="0.1" /></r>"#).unwrap();
        let mut bound = read_channel(&doc, field(&doc, "F"));
        assert!(bound.commit(&mut doc, 7.0, 0.333_333));
        assert_eq!(doc.serialize(), r#"<r><F Kind="c" Value="0.3333" /></r>"#);
        assert_eq!(bound.evaluate(0.0).value, 0.3333);
    }

    #[test]
    fn test_constant_commit_adds_missing_value() {
        let mut doc = Document::parse_str("<r><F/></r>").unwrap();
        let mut bound = read_channel(&doc, field(&doc, "F"));
        assert!(bound.commit(&mut doc, 0.0, 1.0));
        assert_eq!(doc.serialize(), r#"<r><F Value="1.0000"/></r>"#);
    }

    #[test]
    fn test_sequence_commit_touches_only_matching_tick() {
        let source = r#"<r xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"><F xsi:type="FloatSequence"><FloatTick Time="0" Value="0" /><FloatTick Time="0.5" Value="1" /></F></r>"#;
        let mut doc = Document::parse_str(source).unwrap();
        let mut bound = read_channel(&doc, field(&doc, "F"));

        assert!(!bound.commit(&mut doc, 0.25, 0.5));
        assert_eq!(doc.serialize(), source);

        assert!(bound.commit(&mut doc, 0.5, 0.25));
        assert_eq!(
            doc.serialize(),
            source.replace(r#"Time="0.5" Value="1""#, r#"Time="0.5" Value="0.2500""#)
        );
    }

    #[test]
    fn test_color_commit_writes_three_attributes() {
        let mut doc = Document::parse_str(
            r#"<N><ColorTick Time="0" R="1" G="1" B="1" /><ColorTick Time="1" R="0" G="0" B="0" /></N>"#,
        )
        .unwrap();
        let mut bound = read_color_sequence(&doc, doc.root());
        assert!(!bound.commit(&mut doc, 0.5, [0.5; 3]));
        assert!(bound.commit(&mut doc, 1.0, [0.25, 0.5, 0.75]));
        assert_eq!(
            doc.serialize(),
            r#"<N><ColorTick Time="0" R="1" G="1" B="1" /><ColorTick Time="1" R="0.2500" G="0.5000" B="0.7500" /></N>"#
        );
        assert_eq!(bound.evaluate(1.0), Sample::new([0.25, 0.5, 0.75], true));
    }
}
