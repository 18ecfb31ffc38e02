use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use recolor_core::{
    BlendMode, Field, GradientStop, GroupId, Rgb8, Session, Snapshot, gradient_stops,
};
use serde::Serialize;

use crate::render;

fn open(path: &Path) -> Result<Session> {
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    tracing::debug!(path = %path.display(), bytes = bytes.len(), "Read document");
    Session::load(&bytes).with_context(|| format!("failed to load {}", path.display()))
}

/// Maps a 1-based group number to a group of the session.
fn group_id(session: &Session, number: usize) -> Result<GroupId> {
    if number == 0 || number > session.groups().len() {
        bail!(
            "group {number} does not exist (document has {} groups)",
            session.groups().len()
        );
    }
    Ok(GroupId(number - 1))
}

fn save(session: &Session, output: &Path) -> Result<()> {
    session.save(output)?;
    println!("Wrote {}", output.display());
    Ok(())
}

pub fn groups(file: &Path) -> Result<()> {
    let session = open(file)?;
    if session.groups().is_empty() {
        println!("No color groups found");
    }
    for group in session.groups() {
        println!("{}", render::group_summary(&session, group));
    }
    Ok(())
}

/// A snapshot plus the group's base color gradient, for `show --json`.
#[derive(Debug, Serialize)]
struct GroupReport {
    #[serde(flatten)]
    snapshot: Snapshot,
    gradient: Vec<GradientStop>,
}

pub fn show(file: &Path, group: Option<usize>, index: usize, json: bool) -> Result<()> {
    let session = open(file)?;
    let ids = match group {
        Some(number) => vec![group_id(&session, number)?],
        None => session.groups().iter().map(|g| g.id()).collect(),
    };

    let mut reports = Vec::with_capacity(ids.len());
    for id in ids {
        reports.push(GroupReport {
            snapshot: session.evaluate_at(id, index)?,
            gradient: gradient_stops(session.group(id)?),
        });
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    } else {
        for report in &reports {
            println!("{}", render::snapshot(&report.snapshot));
        }
    }
    Ok(())
}

pub fn set(
    file: &Path,
    group: usize,
    field: Field,
    value: &str,
    index: usize,
    output: &Path,
) -> Result<()> {
    let mut session = open(file)?;
    let id = group_id(&session, group)?;
    session.seek(id, index)?;
    let snapshot = session
        .commit_edit(id, field, value)
        .with_context(|| format!("cannot set {field} of {}", session.groups()[id.0].title()))?;
    println!("{}", render::snapshot(&snapshot));
    save(&session, output)
}

pub fn color(
    file: &Path,
    group: usize,
    base: Option<Rgb8>,
    tint: Option<Rgb8>,
    index: usize,
    output: &Path,
) -> Result<()> {
    let mut session = open(file)?;
    let id = group_id(&session, group)?;
    session.seek(id, index)?;
    let title = session.groups()[id.0].title().to_owned();
    let snapshot = match (base, tint) {
        (Some(color), _) => session.commit_base_color(id, color.to_unit()),
        (None, Some(color)) => session.commit_tint_color(id, color.to_tint()),
        (None, None) => bail!("either --base or --tint is required"),
    }
    .with_context(|| format!("cannot recolor {title}"))?;
    println!("{}", render::snapshot(&snapshot));
    save(&session, output)
}

pub fn blend(file: &Path, group: usize, mode: BlendMode, output: &Path) -> Result<()> {
    let mut session = open(file)?;
    let id = group_id(&session, group)?;
    session.set_blend_mode(id, mode)?;
    println!("{}: blend {mode}", session.groups()[id.0].title());
    save(&session, output)
}

pub fn effect_id(file: &Path, set: Option<&str>, output: Option<&Path>) -> Result<()> {
    let mut session = open(file)?;
    match (set, output) {
        (Some(value), Some(output)) => {
            session.set_effect_id(value)?;
            println!("EffectID: {value}");
            save(&session, output)
        }
        _ => {
            match session.effect_id() {
                Some(id) => println!("EffectID: {}", id.trim()),
                None => println!("No EffectID element"),
            }
            Ok(())
        }
    }
}
