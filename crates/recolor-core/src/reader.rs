//! Reads channel elements from a document into bound channels.

use crate::binding::{BoundChannel, BoundColorSequence};
use crate::channel::{Channel, ColorSequence, ColorTick, Tick};
use crate::document::{Document, NodeId};
use crate::util::parse_f32;

/// Discriminator of a keyframed scalar field.
pub const FLOAT_SEQUENCE: &str = "FloatSequence";
pub const FLOAT_TICK: &str = "FloatTick";
pub const COLOR_TICK: &str = "ColorTick";

pub const TIME: &str = "Time";
pub const VALUE: &str = "Value";
pub const RED: &str = "R";
pub const GREEN: &str = "G";
pub const BLUE: &str = "B";

/// Reads a numeric attribute, falling back to `0` when missing or unparsable.
fn number_or_zero(doc: &Document, element: NodeId, attribute: &str) -> f32 {
    doc.attribute(element, attribute)
        .and_then(parse_f32)
        .unwrap_or(0.0)
}

/// Time of a tick element; `None` drops the tick.
fn tick_time(doc: &Document, tick: NodeId) -> Option<f32> {
    let time = doc.attribute(tick, TIME).and_then(parse_f32);
    if time.is_none() {
        tracing::warn!(
            line = doc.line(tick),
            time = ?doc.attribute(tick, TIME),
            "Dropping tick without a readable time"
        );
    }
    time
}

/// Reads one scalar field element.
///
/// A `FloatSequence` collects its `FloatTick` descendants in document order;
/// any other element is a constant read from its `Value` attribute.
pub fn read_channel(doc: &Document, field: NodeId) -> BoundChannel {
    if doc.type_discriminator(field) != Some(FLOAT_SEQUENCE) {
        let value = number_or_zero(doc, field, VALUE);
        return BoundChannel::new(field, Channel::Constant(value), Vec::new());
    }

    let mut ticks = Vec::new();
    let mut nodes = Vec::new();
    for tick in doc.descendants_named(field, FLOAT_TICK) {
        let Some(time) = tick_time(doc, tick) else {
            continue;
        };
        ticks.push(Tick {
            time,
            value: number_or_zero(doc, tick, VALUE),
        });
        nodes.push(tick);
    }
    BoundChannel::new(field, Channel::Sequence(ticks), nodes)
}

/// Reads the `ColorTick` descendants of a color-sequence node.
pub fn read_color_sequence(doc: &Document, node: NodeId) -> BoundColorSequence {
    let mut sequence = ColorSequence::default();
    let mut nodes = Vec::new();
    for tick in doc.descendants_named(node, COLOR_TICK) {
        let Some(time) = tick_time(doc, tick) else {
            continue;
        };
        sequence.ticks.push(ColorTick {
            time,
            rgb: [
                number_or_zero(doc, tick, RED),
                number_or_zero(doc, tick, GREEN),
                number_or_zero(doc, tick, BLUE),
            ],
        });
        nodes.push(tick);
    }
    BoundColorSequence::new(node, sequence, nodes)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = r#"xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance""#;

    fn first_child(doc: &Document) -> NodeId {
        doc.child_elements(doc.root()).next().unwrap()
    }

    #[test]
    fn test_constant_field() {
        let doc = Document::parse_str(&format!(
            r#"<r {NS}><F xsi:type="ConstFloat" Value="0.75" /></r>"#
        ))
        .unwrap();
        let bound = read_channel(&doc, first_child(&doc));
        assert_eq!(bound.channel(), &Channel::Constant(0.75));
    }

    #[test]
    fn test_constant_missing_value_reads_zero() {
        let doc = Document::parse_str(&format!(r#"<r {NS}><F /><G Value="x"/></r>"#)).unwrap();
        for field in doc.child_elements(doc.root()) {
            assert_eq!(read_channel(&doc, field).channel(), &Channel::Constant(0.0));
        }
    }

    #[test]
    fn test_sequence_keeps_document_order() {
        let doc = Document::parse_str(&format!(
            r#"<r {NS}><F xsi:type="FloatSequence"><Ticks>
                 <FloatTick Time="1" Value="0.5" />
                 <FloatTick Time="0" Value="0.25" />
               </Ticks></F></r>"#
        ))
        .unwrap();
        let bound = read_channel(&doc, first_child(&doc));
        assert_eq!(bound.channel().tick_times(), vec![1.0, 0.0]);
    }

    #[test]
    fn test_sequence_drops_bad_time_and_zeroes_bad_value() {
        let doc = Document::parse_str(&format!(
            r#"<r {NS}><F xsi:type="FloatSequence"><Ticks>
                 <FloatTick Time="0" Value="oops" />
                 <FloatTick Time="later" Value="0.5" />
                 <FloatTick Value="0.5" />
                 <FloatTick Time="2" Value="0.9" />
               </Ticks></F></r>"#
        ))
        .unwrap();
        let bound = read_channel(&doc, first_child(&doc));
        assert_eq!(
            bound.channel(),
            &Channel::Sequence(vec![
                Tick {
                    time: 0.0,
                    value: 0.0
                },
                Tick {
                    time: 2.0,
                    value: 0.9
                },
            ])
        );
    }

    #[test]
    fn test_color_sequence() {
        let doc = Document::parse_str(
            r#"<N><Colors><ColorTick Time="0.5" R="1" G="0.5" /></Colors></N>"#,
        )
        .unwrap();
        let bound = read_color_sequence(&doc, doc.root());
        assert_eq!(
            bound.sequence().ticks,
            vec![ColorTick {
                time: 0.5,
                rgb: [1.0, 0.5, 0.0]
            }]
        );
    }
}
