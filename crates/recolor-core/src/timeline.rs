//! The merged scrub axis of a color group.

/// Direction of a timeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Previous,
    Next,
}

/// Ascending, duplicate-free keyframe times. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    times: Vec<f32>,
}

impl Timeline {
    /// Pools tick times from every channel of a group.
    ///
    /// Input order does not matter. NaN times are ignored. Without any time
    /// the timeline is the single point `0`.
    pub fn merge(times: impl IntoIterator<Item = f32>) -> Self {
        let mut times: Vec<f32> = times.into_iter().filter(|time| !time.is_nan()).collect();
        times.sort_by(f32::total_cmp);
        times.dedup();
        if times.is_empty() {
            times.push(0.0);
        }
        Self { times }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f32] {
        &self.times
    }

    pub fn get(&self, index: usize) -> Option<f32> {
        self.times.get(index).copied()
    }

    /// Clamps `index` into `[0, len - 1]`.
    pub fn clamp_index(&self, index: usize) -> usize {
        index.min(self.times.len().saturating_sub(1))
    }

    /// Time at a clamped index.
    pub fn time_at(&self, index: usize) -> f32 {
        self.times[self.clamp_index(index)]
    }

    /// Moves one position, staying inside the timeline.
    pub fn step(&self, index: usize, step: Step) -> usize {
        let index = self.clamp_index(index);
        match step {
            Step::Previous => index.saturating_sub(1),
            Step::Next => self.clamp_index(index + 1),
        }
    }
}
