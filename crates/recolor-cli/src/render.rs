//! Plain-text rendering of groups and snapshots.

use recolor_core::{ColorGroup, Sample, Session, Snapshot, color_swatch, tint_swatch};

/// Marks values that are interpolated and therefore read-only.
const INTERPOLATED: char = '*';

fn sample(sample: Sample<f32>) -> String {
    if sample.exact {
        format!("{:>8.4} ", sample.value)
    } else {
        format!("{:>8.4}{INTERPOLATED}", sample.value)
    }
}

pub fn group_summary(session: &Session, group: &ColorGroup) -> String {
    let blend = session
        .blend_mode(group.id())
        .map(|mode| mode.label())
        .unwrap_or_default();
    format!(
        "{:<10} {:<26} line {:<5} {:>3} keys  {:<15} {:<8} {}",
        group.title(),
        group.label(),
        group.line(),
        group.timeline().len(),
        group.base().shape(),
        if group.tint().is_some() { "tint" } else { "-" },
        blend,
    )
}

pub fn snapshot(snapshot: &Snapshot) -> String {
    let base = snapshot.base.map(|s| s.value);
    let mut lines = vec![
        format!(
            "{} ({}, line {})",
            snapshot.title, snapshot.label, snapshot.line
        ),
        format!(
            "  {}  {}",
            snapshot.time_label(),
            snapshot.position_label()
        ),
        format!(
            "  base  {}{}{} {}",
            sample(snapshot.base[0]),
            sample(snapshot.base[1]),
            sample(snapshot.base[2]),
            color_swatch(base)
        ),
    ];

    if let Some(tint) = &snapshot.tint {
        let rgb = tint.rgb.map(|s| s.value);
        lines.push(format!(
            "  tint  {}{}{} {}",
            sample(tint.rgb[0]),
            sample(tint.rgb[1]),
            sample(tint.rgb[2]),
            tint_swatch(rgb)
        ));
        if let Some(alpha) = tint.alpha {
            lines.push(format!("  alpha {}", sample(alpha)));
        }
        if let Some(power) = tint.power {
            lines.push(format!("  power {}", sample(power)));
        }
    }
    lines.push(format!("  blend {}", snapshot.blend_mode));
    lines.join("\n")
}
