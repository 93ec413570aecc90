//! Shotdeck: a local-first shot pipeline manager.
//!
//! A project is a plain directory holding an ordered list of shots. Each
//! shot owns three versioned media slots (first-frame image, last-frame
//! image, video) plus free-text notes, per-slot captions, and per-version
//! prompts. Shotdeck names, stores, increments, and promotes asset
//! versions; keeps the shot ordering stable and user-reorderable with an
//! archive partition; and keeps the side metadata consistent as assets are
//! added, promoted, renamed, or archived.
//!
//! # Invariants
//!
//! - Slot versions are contiguous integers from 1, append-only, never
//!   reassigned — metadata keyed by version number stays valid forever.
//! - A freshly uploaded version always becomes current ("latest wins").
//! - Reorder and rename are all-or-nothing: they either apply across every
//!   store or not at all.
//! - Archiving is a partition flag; it never renumbers anything.
//!
//! # Architecture
//!
//! All state for a project lives in one SQLite ledger next to the media
//! tree. Every mutation routes through the [`core::broker::LedgerBroker`],
//! which serializes writers and appends a JSONL audit event per operation.
//! [`core::service::ShotService`] is the caller-facing surface; the CLI in
//! this crate is a thin presentation wrapper over it.
//!
//! # Crate structure
//!
//! - [`core::registry`]: shot identity, naming, ordering, archive
//! - [`core::version_store`]: per-(shot, slot) version ledger
//! - [`core::metadata`]: prompts, captions, notes, display names
//! - [`core::service`]: orchestration and snapshot assembly
//! - [`core::project`]: open/create lifecycle and recent-projects config

pub mod core;

mod cli;

use crate::core::error::ShotdeckError;
use crate::core::media::AssetSlot;
use crate::core::output;
use crate::core::project::{ProjectSession, ProjectsConfig};
use crate::core::reveal;
use crate::core::service::{Shot, ShotService};
use crate::core::thumbs::DiskThumbnailer;
use cli::{
    CaptionCommand, Cli, Command, NotesCommand, OutputFormat, ProjectCli, ProjectCommand,
    PromptCommand,
};

use clap::Parser;
use colored::Colorize;
use serde::Serialize;

pub fn run() -> Result<(), ShotdeckError> {
    let cli = Cli::parse();
    match cli.command {
        Command::Version => {
            println!("v{}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Command::Project(project) => run_project(project),
        Command::List { format } => {
            let service = open_current()?;
            let shots = service.list()?;
            match format {
                OutputFormat::Json => println!("{}", to_json(&shots)?),
                OutputFormat::Text => render_shot_list(&shots),
            }
            Ok(())
        }
        Command::Create { after } => {
            let service = open_current()?;
            let shot = service.create_shot(after.as_deref())?;
            println!("Created {}", shot.name.bright_cyan().bold());
            Ok(())
        }
        Command::Upload { shot, slot, file } => {
            let service = open_current()?;
            let snapshot = service.upload(&shot, slot, &file)?;
            let view = slot_view(&snapshot, slot);
            println!(
                "Uploaded {} {} v{:03} ({})",
                snapshot.name.bright_cyan().bold(),
                slot,
                view.version,
                file.display()
            );
            Ok(())
        }
        Command::UploadNew { file, after } => {
            let service = open_current()?;
            let snapshot = service.upload_to_new_shot(after.as_deref(), &file)?;
            println!(
                "Created {} and uploaded {}",
                snapshot.name.bright_cyan().bold(),
                file.display()
            );
            Ok(())
        }
        Command::Promote {
            shot,
            slot,
            version,
        } => {
            let service = open_current()?;
            let snapshot = service.promote(&shot, slot, version)?;
            let view = slot_view(&snapshot, slot);
            println!(
                "{} {} now at v{:03} of {:03}",
                snapshot.name.bright_cyan().bold(),
                slot,
                view.version,
                view.max_version
            );
            Ok(())
        }
        Command::Cycle { shot, slot } => {
            let service = open_current()?;
            let snapshot = service.cycle(&shot, slot)?;
            let view = slot_view(&snapshot, slot);
            if view.max_version == 0 {
                println!("{} {} has no versions yet", snapshot.name, slot);
            } else {
                println!(
                    "{} {} now at v{:03} of {:03}",
                    snapshot.name.bright_cyan().bold(),
                    slot,
                    view.version,
                    view.max_version
                );
            }
            Ok(())
        }
        Command::Resolve {
            shot,
            slot,
            version,
        } => {
            let service = open_current()?;
            let record = service.session().versions.resolve(&shot, slot, version)?;
            println!("file:      {}", record.file.display());
            match &record.thumbnail {
                Some(thumb) => println!("thumbnail: {}", thumb.display()),
                None => println!("thumbnail: (none)"),
            }
            Ok(())
        }
        Command::Prompt(prompt) => run_prompt(prompt.command),
        Command::Caption(caption) => run_caption(caption.command),
        Command::Notes(notes) => run_notes(notes.command),
        Command::DisplayName { shot, name } => {
            let service = open_current()?;
            service
                .session()
                .metadata
                .set_display_name(&shot, name.as_deref())?;
            match name {
                Some(name) => println!("{} labeled '{}'", shot.bright_cyan().bold(), name),
                None => println!("{} label cleared", shot.bright_cyan().bold()),
            }
            Ok(())
        }
        Command::Rename { old_name, new_name } => {
            let service = open_current()?;
            let snapshot = service.rename(&old_name, &new_name)?;
            println!(
                "Renamed {} -> {}",
                old_name.dimmed(),
                snapshot.name.bright_cyan().bold()
            );
            Ok(())
        }
        Command::Archive { shot } => {
            let service = open_current()?;
            let snapshot = service.set_archived(&shot, true)?;
            println!("Archived {}", snapshot.name.yellow());
            Ok(())
        }
        Command::Unarchive { shot } => {
            let service = open_current()?;
            let snapshot = service.set_archived(&shot, false)?;
            println!("Restored {}", snapshot.name.bright_cyan().bold());
            Ok(())
        }
        Command::Reorder { names } => {
            let service = open_current()?;
            let shots = service.reorder(&names)?;
            render_shot_list(&shots);
            Ok(())
        }
        Command::Reveal { shot, slot } => {
            let service = open_current()?;
            let record = service.session().versions.resolve(&shot, slot, None)?;
            reveal::reveal_in_file_manager(&record.file)
        }
        Command::OpenFolder => {
            let service = open_current()?;
            reveal::open_folder(&service.layout().shots_dir())
        }
    }
}

fn run_project(project: ProjectCli) -> Result<(), ShotdeckError> {
    match project.command {
        ProjectCommand::Create { dir, name } => {
            let session = ProjectSession::create(&dir, &name)?;
            let mut config = ProjectsConfig::load();
            config.set_current(session.root())?;
            println!(
                "Created project {} at {}",
                name.bright_cyan().bold(),
                session.root().display()
            );
            Ok(())
        }
        ProjectCommand::Open { path } => {
            let session = ProjectSession::open(&path)?;
            let mut config = ProjectsConfig::load();
            config.set_current(session.root())?;

            // The cache only ever holds thumbnails for this project, but
            // resolutions or matte settings may have changed since they
            // were written; start fresh.
            DiskThumbnailer::new(session.layout().thumbnails_dir()).clear_cache()?;
            let service = ShotService::new(session);
            let refreshed = service.refresh_thumbnails()?;
            println!(
                "Opened project {} ({} thumbnails refreshed)",
                service.session().name().bright_cyan().bold(),
                refreshed
            );
            Ok(())
        }
        ProjectCommand::Current => {
            let mut config = ProjectsConfig::load();
            match config.resolve_current() {
                Some(root) => println!("{}", root.display()),
                None => println!("No project open"),
            }
            Ok(())
        }
        ProjectCommand::Recent => {
            let config = ProjectsConfig::load();
            for path in &config.recent_projects {
                if path.join("shots").exists() {
                    println!("{}", path.display());
                }
            }
            Ok(())
        }
        ProjectCommand::Info { format } => {
            let service = open_current()?;
            let info = service.session().info()?;
            match format {
                OutputFormat::Json => println!("{}", to_json(&info)?),
                OutputFormat::Text => {
                    println!("{} ({})", info.name.bright_cyan().bold(), info.path.display());
                    if !info.title.is_empty() {
                        println!("title:       {}", info.title);
                    }
                    if !info.description.is_empty() {
                        println!("description: {}", info.description);
                    }
                    if !info.tags.is_empty() {
                        println!("tags:        {}", info.tags.join(", "));
                    }
                    println!("created:     {}", info.created);
                }
            }
            Ok(())
        }
        ProjectCommand::SetInfo {
            title,
            description,
            tags,
        } => {
            let service = open_current()?;
            let tags: Option<Vec<String>> = tags.map(|raw| {
                raw.split(',')
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect()
            });
            service.session().set_info(
                title.as_deref(),
                description.as_deref(),
                tags.as_deref(),
            )?;
            println!("Project info updated");
            Ok(())
        }
    }
}

fn run_prompt(command: PromptCommand) -> Result<(), ShotdeckError> {
    let service = open_current()?;
    match command {
        PromptCommand::Get {
            shot,
            slot,
            version,
            for_editing,
            format,
        } => {
            if for_editing {
                let editing = service.get_prompt_for_editing(&shot, slot, version)?;
                match format {
                    OutputFormat::Json => println!("{}", to_json(&editing)?),
                    OutputFormat::Text => {
                        println!("{}", editing.text);
                        if let Some(suggested) = editing.suggested_copy_from {
                            println!(
                                "{} {}",
                                "suggested (previous version):".dimmed(),
                                output::compact_line(&suggested, 120)
                            );
                        }
                    }
                }
            } else {
                let text = service.session().metadata.get_prompt(&shot, slot, version)?;
                match format {
                    OutputFormat::Json => println!("{}", to_json(&text)?),
                    OutputFormat::Text => println!("{}", text),
                }
            }
            Ok(())
        }
        PromptCommand::Set {
            shot,
            slot,
            version,
            text,
        } => {
            service.session().metadata.set_prompt(&shot, slot, version, &text)?;
            Ok(())
        }
    }
}

fn run_caption(command: CaptionCommand) -> Result<(), ShotdeckError> {
    let service = open_current()?;
    match command {
        CaptionCommand::Get { shot, slot } => {
            println!("{}", service.session().metadata.get_caption(&shot, slot)?);
            Ok(())
        }
        CaptionCommand::Set { shot, slot, text } => {
            service.session().metadata.set_caption(&shot, slot, &text)?;
            Ok(())
        }
    }
}

fn run_notes(command: NotesCommand) -> Result<(), ShotdeckError> {
    let service = open_current()?;
    match command {
        NotesCommand::Get { shot } => {
            println!("{}", service.session().metadata.get_notes(&shot)?);
            Ok(())
        }
        NotesCommand::Set { shot, text } => {
            service.session().metadata.set_notes(&shot, &text)?;
            Ok(())
        }
    }
}

fn open_current() -> Result<ShotService, ShotdeckError> {
    let mut config = ProjectsConfig::load();
    let root = config.resolve_current().ok_or_else(|| {
        ShotdeckError::NoProject(
            "no project open; run 'shotdeck project open <path>' first".to_string(),
        )
    })?;
    let session = ProjectSession::open(&root)?;
    Ok(ShotService::new(session))
}

fn slot_view(shot: &Shot, slot: AssetSlot) -> &crate::core::service::SlotView {
    match slot {
        AssetSlot::FirstImage => &shot.first_image,
        AssetSlot::LastImage => &shot.last_image,
        _ => &shot.video,
    }
}

fn render_shot_list(shots: &[Shot]) {
    let (active, archived): (Vec<&Shot>, Vec<&Shot>) =
        shots.iter().partition(|s| !s.archived);

    for shot in active {
        render_shot_line(shot);
    }
    if !archived.is_empty() {
        println!("{}", "archived".yellow().bold());
        for shot in archived {
            render_shot_line(shot);
        }
    }
}

fn render_shot_line(shot: &Shot) {
    let label = shot
        .display_name
        .as_deref()
        .map(|d| format!(" ({})", d))
        .unwrap_or_default();
    let slots = format!(
        "first v{}/{}  last v{}/{}  video v{}/{}",
        shot.first_image.version,
        shot.first_image.max_version,
        shot.last_image.version,
        shot.last_image.max_version,
        shot.video.version,
        shot.video.max_version
    );
    let notes = if shot.notes.is_empty() {
        String::new()
    } else {
        format!("  {}", output::compact_line(&shot.notes, 60).dimmed())
    };
    println!(
        "{}{}  {}{}",
        shot.name.bright_cyan().bold(),
        label.dimmed(),
        slots,
        notes
    );
}

fn to_json<T: Serialize>(value: &T) -> Result<String, ShotdeckError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ShotdeckError::Validation(format!("JSON output: {}", e)))
}
