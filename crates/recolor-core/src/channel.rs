//! In-memory channel representations.

use serde::Serialize;

use crate::interpolate::{self, Keyed};

/// One scalar keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tick {
    pub time: f32,
    pub value: f32,
}

impl Keyed for Tick {
    fn time(&self) -> f32 {
        self.time
    }
}

/// Value of a field at a query time, and whether that time is keyframed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Sample<T> {
    pub value: T,
    pub exact: bool,
}

impl<T> Sample<T> {
    pub fn new(value: T, exact: bool) -> Self {
        Self { value, exact }
    }
}

/// Which stored value a commit overwrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Constant,
    Tick(usize),
}

/// A scalar value over time.
#[derive(Debug, Clone, PartialEq)]
pub enum Channel {
    /// Same value at every time.
    Constant(f32),
    /// Keyframes in stored order.
    Sequence(Vec<Tick>),
}

impl Channel {
    pub fn evaluate(&self, time: f32) -> Sample<f32> {
        match self {
            Channel::Constant(value) => Sample::new(*value, true),
            Channel::Sequence(ticks) => {
                let (value, exact) = interpolate::evaluate_scalar(ticks, time, |tick| tick.value);
                Sample::new(value, exact)
            }
        }
    }

    /// The stored value a commit at `time` would overwrite.
    ///
    /// A single-tick sequence reads as exact everywhere but only owns a slot
    /// at its own time.
    pub fn slot_at(&self, time: f32) -> Option<Slot> {
        match self {
            Channel::Constant(_) => Some(Slot::Constant),
            Channel::Sequence(ticks) => interpolate::find_exact(ticks, time).map(Slot::Tick),
        }
    }

    /// Overwrites the value stored for `time`.
    ///
    /// Constants always accept the write. Sequences only accept it when a
    /// tick sits exactly at `time`; otherwise nothing changes and `None` is
    /// returned.
    pub fn commit(&mut self, time: f32, value: f32) -> Option<Slot> {
        let slot = self.slot_at(time)?;
        match (self, slot) {
            (Channel::Constant(stored), _) => *stored = value,
            (Channel::Sequence(ticks), Slot::Tick(index)) => ticks[index].value = value,
            (Channel::Sequence(_), Slot::Constant) => return None,
        }
        Some(slot)
    }

    /// Tick times in stored order. Constants have none.
    pub fn tick_times(&self) -> Vec<f32> {
        match self {
            Channel::Constant(_) => Vec::new(),
            Channel::Sequence(ticks) => ticks.iter().map(|tick| tick.time).collect(),
        }
    }

    pub fn is_constant(&self) -> bool {
        matches!(self, Channel::Constant(_))
    }
}

/// One RGB keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorTick {
    pub time: f32,
    pub rgb: [f32; 3],
}

impl Keyed for ColorTick {
    fn time(&self) -> f32 {
        self.time
    }
}

/// RGB keyframes stored together, one triple per tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColorSequence {
    pub ticks: Vec<ColorTick>,
}

impl ColorSequence {
    pub fn evaluate(&self, time: f32) -> Sample<[f32; 3]> {
        let (rgb, exact) = interpolate::evaluate_color(&self.ticks, time, |tick| tick.rgb);
        Sample::new(rgb, exact)
    }

    /// Overwrites all three components of the tick at `time`, if there is one.
    pub fn commit(&mut self, time: f32, rgb: [f32; 3]) -> Option<usize> {
        let index = interpolate::find_exact(&self.ticks, time)?;
        self.ticks[index].rgb = rgb;
        Some(index)
    }

    pub fn tick_times(&self) -> Vec<f32> {
        self.ticks.iter().map(|tick| tick.time).collect()
    }
}
