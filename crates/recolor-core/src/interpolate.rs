//! Keyframe lookup and linear interpolation.
//!
//! Tick times are compared exactly: a time only counts as keyframed when a
//! tick stores the same `f32` bits the timeline was built from.

/// A keyframe with a time on the effect timeline.
pub trait Keyed {
    fn time(&self) -> f32;
}

/// First tick whose time equals `time` exactly.
#[allow(clippy::float_cmp)]
pub fn find_exact<K: Keyed>(ticks: &[K], time: f32) -> Option<usize> {
    ticks.iter().position(|tick| tick.time() == time)
}

/// Neighbours of `time`: the last tick (in stored order) strictly before it
/// and the first tick strictly after it.
pub fn bracket<K: Keyed>(ticks: &[K], time: f32) -> (Option<&K>, Option<&K>) {
    let before = ticks.iter().rev().find(|tick| tick.time() < time);
    let after = ticks.iter().find(|tick| tick.time() > time);
    (before, after)
}

pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Fraction of the way from `from` to `to` that `time` lies at.
fn fraction(from: f32, to: f32, time: f32) -> f32 {
    (time - from) / (to - from)
}

/// Evaluates a scalar keyframe list at `time`.
///
/// Returns the value and whether a tick sits exactly at `time`. A lone tick is
/// treated as exact everywhere. Outside the keyed range the nearest tick's
/// value holds.
pub fn evaluate_scalar<K: Keyed>(ticks: &[K], time: f32, value: impl Fn(&K) -> f32) -> (f32, bool) {
    match ticks {
        [] => (0.0, false),
        [only] => (value(only), true),
        _ => {
            if let Some(index) = find_exact(ticks, time) {
                return (value(&ticks[index]), true);
            }
            match bracket(ticks, time) {
                (Some(before), Some(after)) => {
                    let t = fraction(before.time(), after.time(), time);
                    (lerp(value(before), value(after), t), false)
                }
                (Some(edge), None) | (None, Some(edge)) => (value(edge), false),
                (None, None) => (0.0, false),
            }
        }
    }
}

/// Evaluates an RGB keyframe list at `time`.
///
/// Unlike [`evaluate_scalar`], a time before the first tick yields black
/// rather than the first tick's color, and a lone tick only matches its own
/// time.
pub fn evaluate_color<K: Keyed>(
    ticks: &[K],
    time: f32,
    rgb: impl Fn(&K) -> [f32; 3],
) -> ([f32; 3], bool) {
    if let Some(index) = find_exact(ticks, time) {
        return (rgb(&ticks[index]), true);
    }
    match bracket(ticks, time) {
        (Some(before), Some(after)) => {
            let t = fraction(before.time(), after.time(), time);
            let (from, to) = (rgb(before), rgb(after));
            (
                [
                    lerp(from[0], to[0], t),
                    lerp(from[1], to[1], t),
                    lerp(from[2], to[2], t),
                ],
                false,
            )
        }
        (Some(before), None) => (rgb(before), false),
        (None, _) => ([0.0; 3], false),
    }
}
