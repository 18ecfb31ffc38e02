//! FFX Recolor
//!
//! Lists, inspects and edits the colors of a DS1 FFX effect document. Edits
//! are written to a separate output file; the input is never modified.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use recolor_core::{BlendMode, Field, Rgb8};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod render;

#[derive(Debug, Parser)]
#[command(name = "ffx-recolor")]
#[command(about = "Edit particle colors in DS1 FFX effect documents")]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List every color group.
    Groups { file: PathBuf },

    /// Print field values at a timeline position.
    Show {
        file: PathBuf,
        /// 1-based group number; all groups when omitted.
        #[arg(short, long)]
        group: Option<usize>,
        /// 0-based timeline index, clamped to the group's timeline.
        #[arg(short, long, default_value_t = 0)]
        index: usize,
        #[arg(long)]
        json: bool,
    },

    /// Change one field at a keyframed timeline position.
    Set {
        file: PathBuf,
        #[arg(short, long)]
        group: usize,
        #[arg(short, long, value_enum)]
        field: FieldArg,
        /// New value; clamped to the field's range.
        #[arg(long, allow_hyphen_values = true)]
        value: String,
        #[arg(short, long, default_value_t = 0)]
        index: usize,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },

    /// Replace the base or tint color at a keyframed timeline position.
    Color {
        file: PathBuf,
        #[arg(short, long)]
        group: usize,
        /// Base color as #rrggbb.
        #[arg(long, conflicts_with = "tint", required_unless_present = "tint")]
        base: Option<Rgb8>,
        /// Tint as #rrggbb; full intensity maps to the brightest tint.
        #[arg(long)]
        tint: Option<Rgb8>,
        #[arg(short, long, default_value_t = 0)]
        index: usize,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },

    /// Change the blend mode of a group.
    Blend {
        file: PathBuf,
        #[arg(short, long)]
        group: usize,
        #[arg(short, long, value_enum)]
        mode: BlendArg,
        #[arg(short = 'o', long = "output")]
        output: PathBuf,
    },

    /// Print or replace the effect identifier.
    EffectId {
        file: PathBuf,
        #[arg(long, requires = "output", allow_hyphen_values = true)]
        set: Option<String>,
        #[arg(short = 'o', long = "output", requires = "set")]
        output: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FieldArg {
    BaseR,
    BaseG,
    BaseB,
    TintR,
    TintG,
    TintB,
    Alpha,
    Power,
}

impl From<FieldArg> for Field {
    fn from(arg: FieldArg) -> Self {
        match arg {
            FieldArg::BaseR => Field::BaseR,
            FieldArg::BaseG => Field::BaseG,
            FieldArg::BaseB => Field::BaseB,
            FieldArg::TintR => Field::TintR,
            FieldArg::TintG => Field::TintG,
            FieldArg::TintB => Field::TintB,
            FieldArg::Alpha => Field::Alpha,
            FieldArg::Power => Field::Power,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BlendArg {
    Add,
    Subtract,
}

impl From<BlendArg> for BlendMode {
    fn from(arg: BlendArg) -> Self {
        match arg {
            BlendArg::Add => BlendMode::Add,
            BlendArg::Subtract => BlendMode::Subtract,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    match cli.command {
        Commands::Groups { file } => commands::groups(&file),
        Commands::Show {
            file,
            group,
            index,
            json,
        } => commands::show(&file, group, index, json),
        Commands::Set {
            file,
            group,
            field,
            value,
            index,
            output,
        } => commands::set(&file, group, field.into(), &value, index, &output),
        Commands::Color {
            file,
            group,
            base,
            tint,
            index,
            output,
        } => commands::color(&file, group, base, tint, index, &output),
        Commands::Blend {
            file,
            group,
            mode,
            output,
        } => commands::blend(&file, group, mode.into(), &output),
        Commands::EffectId { file, set, output } => {
            commands::effect_id(&file, set.as_deref(), output.as_deref())
        }
    }
}
