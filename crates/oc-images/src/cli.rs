//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{ArgGroup, Args, Parser, Subcommand};

/// oc images - Generate reports of imagestreams or payloads
#[derive(Parser, Debug)]
#[command(name = "oc-images")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress and log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Show what is happening (same as -v)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Path to config.yaml (replaces the discovered config file)
    #[arg(long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Platform to inspect when an image is a manifest list (e.g. linux/amd64)
    #[arg(long, global = true)]
    pub filter_by_os: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Verbosity level with `--debug` counted as one `-v`
    pub fn verbosity(&self) -> u8 {
        self.verbose.saturating_add(u8::from(self.debug))
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List contents of an imagestream or payload
    ///
    /// Example: oc-images list --filter ironic 4.18-art-latest
    List(ListArgs),

    /// Show differences between two payloads or imagestreams
    Diff(DiffArgs),
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("source")
        .args(["collection", "assembly"])
        .required(true)
        .multiple(false)
))]
pub struct ListArgs {
    /// Payload pullspec or imagestream ([namespace/]name)
    pub collection: Option<String>,

    /// Resolve the imagestream of an assembly (e.g. 4.17.3, 4.18-rc.2, 4.18-stream)
    #[arg(short, long)]
    pub assembly: Option<String>,

    /// Only images whose name contains this substring
    #[arg(short, long, conflicts_with = "name")]
    pub filter: Option<String>,

    /// Only images with exactly this name (repeatable)
    #[arg(short, long)]
    pub name: Vec<String>,

    /// Print name and pullspec instead of resolving the NVR
    #[arg(short, long)]
    pub pullspec: bool,

    /// Only images labelled as release operators
    #[arg(long)]
    pub operators: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct DiffArgs {
    /// First payload or imagestream
    pub first: String,

    /// Second payload or imagestream
    pub second: String,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}
