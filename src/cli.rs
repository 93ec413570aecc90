//! CLI struct definitions for the shotdeck command-line interface.
//!
//! All clap-derived types live here. Dispatch logic lives in `lib.rs`.

use crate::core::media::AssetSlot;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

pub(crate) fn parse_slot(s: &str) -> Result<AssetSlot, String> {
    AssetSlot::from_str(s).map_err(|e| e.to_string())
}

#[derive(Parser, Debug)]
#[clap(
    name = "shotdeck",
    version = env!("CARGO_PKG_VERSION"),
    about = "Local-first shot pipeline manager: versioned media slots, per-version prompts, and stable shot ordering."
)]
pub(crate) struct Cli {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// Open, create, and inspect projects
    Project(ProjectCli),

    /// List all shots (active partition first, then archived)
    List {
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create a new shot, at the head or directly after an anchor
    Create {
        /// Insert the new shot directly after this one.
        #[clap(long)]
        after: Option<String>,
    },

    /// Upload a media file as the next version of a slot
    Upload {
        shot: String,
        #[clap(value_parser = parse_slot)]
        slot: AssetSlot,
        file: PathBuf,
    },

    /// Create a new shot and upload a file to it in one step
    UploadNew {
        file: PathBuf,
        /// Insert the new shot directly after this one.
        #[clap(long)]
        after: Option<String>,
    },

    /// Repoint a slot's current version
    Promote {
        shot: String,
        #[clap(value_parser = parse_slot)]
        slot: AssetSlot,
        version: i64,
    },

    /// Advance a slot's current version, wrapping past the newest
    Cycle {
        shot: String,
        #[clap(value_parser = parse_slot)]
        slot: AssetSlot,
    },

    /// Show storage locations for a version (current when omitted)
    Resolve {
        shot: String,
        #[clap(value_parser = parse_slot)]
        slot: AssetSlot,
        #[clap(long)]
        version: Option<i64>,
    },

    /// Per-version prompt text
    Prompt(PromptCli),

    /// Per-slot caption text
    Caption(CaptionCli),

    /// Free-text notes on a shot
    Notes(NotesCli),

    /// Set or clear a shot's human-readable label
    DisplayName {
        shot: String,
        /// New label; omit to clear.
        name: Option<String>,
    },

    /// Rename a shot across all stores and media files
    Rename {
        old_name: String,
        new_name: String,
    },

    /// Move a shot into the archived partition
    Archive { shot: String },

    /// Bring a shot back into the active ordering
    Unarchive { shot: String },

    /// Replace the active ordering with the given sequence
    Reorder {
        #[clap(required = true)]
        names: Vec<String>,
    },

    /// Reveal a slot's current file in the OS file manager
    Reveal {
        shot: String,
        #[clap(value_parser = parse_slot)]
        slot: AssetSlot,
    },

    /// Open the project's shots folder in the OS file manager
    OpenFolder,

    /// Print version
    Version,
}

#[derive(clap::Args, Debug)]
pub(crate) struct ProjectCli {
    #[clap(subcommand)]
    pub command: ProjectCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum ProjectCommand {
    /// Create a new project directory and make it current
    Create {
        /// Parent directory for the new project.
        dir: PathBuf,
        name: String,
    },
    /// Open an existing project and make it current
    Open { path: PathBuf },
    /// Show the current project
    Current,
    /// List recently opened projects
    Recent,
    /// Show project info
    Info {
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Update project info fields
    SetInfo {
        #[clap(long)]
        title: Option<String>,
        #[clap(long)]
        description: Option<String>,
        /// Comma-separated tag list; replaces the existing tags.
        #[clap(long)]
        tags: Option<String>,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct PromptCli {
    #[clap(subcommand)]
    pub command: PromptCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum PromptCommand {
    /// Read the prompt for a specific version
    Get {
        shot: String,
        #[clap(value_parser = parse_slot)]
        slot: AssetSlot,
        version: i64,
        /// Include the copy-previous suggestion for editors.
        #[clap(long)]
        for_editing: bool,
        #[clap(long, value_enum, default_value = "text")]
        format: OutputFormat,
    },
    /// Write the prompt for a specific version (empty text clears)
    Set {
        shot: String,
        #[clap(value_parser = parse_slot)]
        slot: AssetSlot,
        version: i64,
        text: String,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct CaptionCli {
    #[clap(subcommand)]
    pub command: CaptionCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum CaptionCommand {
    /// Read a slot's caption
    Get {
        shot: String,
        #[clap(value_parser = parse_slot)]
        slot: AssetSlot,
    },
    /// Write a slot's caption (empty text clears); allowed before any upload
    Set {
        shot: String,
        #[clap(value_parser = parse_slot)]
        slot: AssetSlot,
        text: String,
    },
}

#[derive(clap::Args, Debug)]
pub(crate) struct NotesCli {
    #[clap(subcommand)]
    pub command: NotesCommand,
}

#[derive(Subcommand, Debug)]
pub(crate) enum NotesCommand {
    /// Read a shot's notes
    Get { shot: String },
    /// Write a shot's notes
    Set { shot: String, text: String },
}
