use shotdeck::core::error::ShotdeckError;
use shotdeck::core::media::AssetSlot;
use shotdeck::core::project::ProjectSession;
use std::fs;
use std::path::PathBuf;
use tempfile::tempdir;

fn open_project(root: &std::path::Path) -> ProjectSession {
    ProjectSession::create(root, "demo").expect("project create")
}

fn media_file(dir: &std::path::Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, b"media payload").expect("write media file");
    path
}

#[test]
fn first_shot_gets_the_first_code_at_the_head() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());

    let shot = session.registry.create(None).expect("create");
    assert_eq!(shot.name, "SH010");
    assert_eq!(shot.order_index, 0);
    assert!(!shot.archived);
    assert!(session.layout().shot_dir("SH010").join("images").is_dir());
}

#[test]
fn create_inserts_at_head_without_anchor_and_after_anchor_otherwise() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());

    let first = session.registry.create(None).expect("create 1");
    let second = session.registry.create(None).expect("create 2");
    // No anchor means head: the newest shot sits at position 0.
    assert_eq!(second.order_index, 0);
    assert_eq!(session.registry.get(&first.name).expect("get").order_index, 1);

    let third = session
        .registry
        .create(Some(&second.name))
        .expect("create 3");
    assert_eq!(third.order_index, 1);

    let order: Vec<String> = session
        .registry
        .list()
        .expect("list")
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(order, vec![second.name, third.name, first.name]);
}

#[test]
fn shot_codes_are_never_reused() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());

    session.registry.create(None).expect("create SH010");
    session.registry.create(None).expect("create SH020");
    session.registry.rename("SH020", "SH030").expect("rename");

    let next = session.registry.create(None).expect("create next");
    // SH020 is retired; generation steps past the highest code ever seen.
    assert_eq!(next.name, "SH040");
}

#[test]
fn versions_are_contiguous_and_latest_wins() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create");
    let png = media_file(tmp.path(), "frame.png");

    for expected in 1..=3i64 {
        let record = session
            .versions
            .add_version("SH010", AssetSlot::FirstImage, &png)
            .expect("add version");
        assert_eq!(record.version, expected);
        let (current, max) = session
            .versions
            .slot_state("SH010", AssetSlot::FirstImage)
            .expect("slot state");
        assert_eq!(current, expected);
        assert_eq!(max, expected);
    }

    // Every intermediate version still resolves.
    for v in 1..=3i64 {
        let record = session
            .versions
            .resolve("SH010", AssetSlot::FirstImage, Some(v))
            .expect("resolve");
        assert!(record.file.exists(), "v{} file should exist", v);
    }
}

#[test]
fn slots_version_independently() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create");
    let png = media_file(tmp.path(), "frame.png");
    let mp4 = media_file(tmp.path(), "clip.mp4");

    session
        .versions
        .add_version("SH010", AssetSlot::FirstImage, &png)
        .expect("first image v1");
    session
        .versions
        .add_version("SH010", AssetSlot::FirstImage, &png)
        .expect("first image v2");
    session
        .versions
        .add_version("SH010", AssetSlot::Video, &mp4)
        .expect("video v1");

    let (_, first_max) = session
        .versions
        .slot_state("SH010", AssetSlot::FirstImage)
        .expect("state");
    let (_, last_max) = session
        .versions
        .slot_state("SH010", AssetSlot::LastImage)
        .expect("state");
    let (_, video_max) = session
        .versions
        .slot_state("SH010", AssetSlot::Video)
        .expect("state");
    assert_eq!((first_max, last_max, video_max), (2, 0, 1));
}

#[test]
fn media_kind_is_validated_per_slot() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create");
    let mp4 = media_file(tmp.path(), "clip.mp4");
    let png = media_file(tmp.path(), "frame.png");
    let gif = media_file(tmp.path(), "anim.gif");

    let err = session
        .versions
        .add_version("SH010", AssetSlot::FirstImage, &mp4)
        .unwrap_err();
    assert!(matches!(err, ShotdeckError::UnsupportedMediaKind(_)));

    let err = session
        .versions
        .add_version("SH010", AssetSlot::Video, &png)
        .unwrap_err();
    assert!(matches!(err, ShotdeckError::UnsupportedMediaKind(_)));

    let err = session
        .versions
        .add_version("SH010", AssetSlot::FirstImage, &gif)
        .unwrap_err();
    assert!(matches!(err, ShotdeckError::UnsupportedMediaKind(_)));

    let err = session
        .versions
        .add_version("SH999", AssetSlot::FirstImage, &png)
        .unwrap_err();
    assert!(matches!(err, ShotdeckError::ShotNotFound(_)));
}

#[test]
fn promote_agrees_with_resolve_and_rejects_unknown_versions() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create");
    let png = media_file(tmp.path(), "frame.png");

    session
        .versions
        .add_version("SH010", AssetSlot::FirstImage, &png)
        .expect("v1");
    session
        .versions
        .add_version("SH010", AssetSlot::FirstImage, &png)
        .expect("v2");

    let promoted = session
        .versions
        .promote("SH010", AssetSlot::FirstImage, 1)
        .expect("promote v1");
    let current = session
        .versions
        .resolve("SH010", AssetSlot::FirstImage, None)
        .expect("resolve current");
    let explicit = session
        .versions
        .resolve("SH010", AssetSlot::FirstImage, Some(1))
        .expect("resolve v1");
    assert_eq!(current.file, explicit.file);
    assert_eq!(promoted.file, explicit.file);

    // Promoting the already-current version is a no-op success.
    session
        .versions
        .promote("SH010", AssetSlot::FirstImage, 1)
        .expect("idempotent promote");

    let err = session
        .versions
        .promote("SH010", AssetSlot::FirstImage, 3)
        .unwrap_err();
    assert!(matches!(err, ShotdeckError::VersionNotFound { version: 3, .. }));
    let err = session
        .versions
        .promote("SH010", AssetSlot::FirstImage, 0)
        .unwrap_err();
    assert!(matches!(err, ShotdeckError::VersionNotFound { version: 0, .. }));
}

#[test]
fn cycle_visits_every_version_and_returns_home() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create");
    let png = media_file(tmp.path(), "frame.png");

    for _ in 0..3 {
        session
            .versions
            .add_version("SH010", AssetSlot::FirstImage, &png)
            .expect("add");
    }
    let (start, max) = session
        .versions
        .slot_state("SH010", AssetSlot::FirstImage)
        .expect("state");
    assert_eq!((start, max), (3, 3));

    let mut visited = Vec::new();
    for _ in 0..max {
        let record = session
            .versions
            .cycle("SH010", AssetSlot::FirstImage)
            .expect("cycle")
            .expect("slot not empty");
        visited.push(record.version);
    }
    visited.sort_unstable();
    assert_eq!(visited, vec![1, 2, 3]);

    let (after, _) = session
        .versions
        .slot_state("SH010", AssetSlot::FirstImage)
        .expect("state");
    assert_eq!(after, start);
}

#[test]
fn cycle_on_an_empty_slot_is_a_no_op() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create");

    let cycled = session
        .versions
        .cycle("SH010", AssetSlot::Video)
        .expect("cycle");
    assert!(cycled.is_none());
}

#[test]
fn lipsync_slots_are_rejected() {
    use shotdeck::core::media::LipsyncTrack;

    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create");
    let mp4 = media_file(tmp.path(), "clip.mp4");

    let err = session
        .versions
        .add_version("SH010", AssetSlot::Lipsync(LipsyncTrack::Driver), &mp4)
        .unwrap_err();
    assert!(matches!(err, ShotdeckError::UnsupportedMediaKind(_)));
}

#[test]
fn reorder_is_idempotent_and_all_or_nothing() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    for _ in 0..3 {
        session.registry.create(None).expect("create");
    }
    let names = |session: &ProjectSession| -> Vec<String> {
        session
            .registry
            .list()
            .expect("list")
            .into_iter()
            .filter(|s| !s.archived)
            .map(|s| s.name)
            .collect()
    };

    let permutation = vec![
        "SH020".to_string(),
        "SH010".to_string(),
        "SH030".to_string(),
    ];
    session.registry.reorder(&permutation).expect("reorder");
    assert_eq!(names(&session), permutation);
    session.registry.reorder(&permutation).expect("reorder again");
    assert_eq!(names(&session), permutation);

    // Missing one active shot: rejected, registry unchanged.
    let missing = vec!["SH020".to_string(), "SH010".to_string()];
    let err = session.registry.reorder(&missing).unwrap_err();
    assert!(matches!(err, ShotdeckError::OrderMismatch(_)));
    assert_eq!(names(&session), permutation);

    let duplicated = vec![
        "SH020".to_string(),
        "SH020".to_string(),
        "SH010".to_string(),
    ];
    let err = session.registry.reorder(&duplicated).unwrap_err();
    assert!(matches!(err, ShotdeckError::OrderMismatch(_)));

    let unknown = vec![
        "SH020".to_string(),
        "SH010".to_string(),
        "SH999".to_string(),
    ];
    let err = session.registry.reorder(&unknown).unwrap_err();
    assert!(matches!(err, ShotdeckError::OrderMismatch(_)));
    assert_eq!(names(&session), permutation);
}

#[test]
fn archive_partitions_without_renumbering() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    for _ in 0..3 {
        session.registry.create(None).expect("create");
    }
    // Head inserts put the registry at SH030, SH020, SH010.
    let middle = session.registry.get("SH020").expect("get");
    let retained_index = middle.order_index;

    let archived = session.registry.set_archived("SH020", true).expect("archive");
    assert!(archived.archived);
    assert_eq!(archived.order_index, retained_index);

    let rows = session.registry.list().expect("list");
    let active: Vec<&str> = rows
        .iter()
        .filter(|s| !s.archived)
        .map(|s| s.name.as_str())
        .collect();
    let parked: Vec<&str> = rows
        .iter()
        .filter(|s| s.archived)
        .map(|s| s.name.as_str())
        .collect();
    assert_eq!(active, vec!["SH030", "SH010"]);
    assert_eq!(parked, vec!["SH020"]);

    // Trailing archived names in a reorder sequence are accepted as no-ops.
    let sequence = vec![
        "SH010".to_string(),
        "SH030".to_string(),
        "SH020".to_string(),
    ];
    session.registry.reorder(&sequence).expect("reorder");

    let restored = session
        .registry
        .set_archived("SH020", false)
        .expect("unarchive");
    assert!(!restored.archived);
    assert_eq!(restored.order_index, retained_index);
}

#[test]
fn captions_attach_before_any_upload() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create");

    session
        .metadata
        .set_caption("SH010", AssetSlot::Video, "night exterior")
        .expect("caption on empty slot");
    assert_eq!(
        session
            .metadata
            .get_caption("SH010", AssetSlot::Video)
            .expect("get"),
        "night exterior"
    );

    let mp4 = media_file(tmp.path(), "clip.mp4");
    session
        .versions
        .add_version("SH010", AssetSlot::Video, &mp4)
        .expect("upload");
    assert_eq!(
        session
            .metadata
            .get_caption("SH010", AssetSlot::Video)
            .expect("get after upload"),
        "night exterior"
    );
}

#[test]
fn prompts_survive_promotion_and_newer_uploads() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create");
    let png = media_file(tmp.path(), "frame.png");

    session
        .versions
        .add_version("SH010", AssetSlot::FirstImage, &png)
        .expect("v1");
    session
        .metadata
        .set_prompt("SH010", AssetSlot::FirstImage, 1, "wide establishing shot")
        .expect("set prompt");

    session
        .versions
        .add_version("SH010", AssetSlot::FirstImage, &png)
        .expect("v2");
    session
        .versions
        .promote("SH010", AssetSlot::FirstImage, 2)
        .expect("promote");

    assert_eq!(
        session
            .metadata
            .get_prompt("SH010", AssetSlot::FirstImage, 1)
            .expect("get"),
        "wide establishing shot"
    );
    // Absent prompt reads back as empty, not an error.
    assert_eq!(
        session
            .metadata
            .get_prompt("SH010", AssetSlot::FirstImage, 2)
            .expect("get"),
        ""
    );
}

#[test]
fn clearing_a_prompt_writes_the_empty_string() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create");

    session
        .metadata
        .set_prompt("SH010", AssetSlot::Video, 1, "dolly in slowly")
        .expect("set");
    session
        .metadata
        .set_prompt("SH010", AssetSlot::Video, 1, "")
        .expect("clear");
    assert_eq!(
        session
            .metadata
            .get_prompt("SH010", AssetSlot::Video, 1)
            .expect("get"),
        ""
    );
}

#[test]
fn rename_carries_every_store_and_the_media_tree() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create");
    let png = media_file(tmp.path(), "frame.png");

    session
        .versions
        .add_version("SH010", AssetSlot::FirstImage, &png)
        .expect("upload");
    session
        .metadata
        .set_prompt("SH010", AssetSlot::FirstImage, 1, "hero close-up")
        .expect("prompt");
    session
        .metadata
        .set_caption("SH010", AssetSlot::FirstImage, "opening frame")
        .expect("caption");
    session
        .metadata
        .set_notes("SH010", "color pass pending")
        .expect("notes");

    let renamed = session.registry.rename("SH010", "SH011").expect("rename");
    assert_eq!(renamed.name, "SH011");

    assert_eq!(
        session
            .metadata
            .get_prompt("SH011", AssetSlot::FirstImage, 1)
            .expect("prompt moved"),
        "hero close-up"
    );
    assert_eq!(
        session
            .metadata
            .get_caption("SH011", AssetSlot::FirstImage)
            .expect("caption moved"),
        "opening frame"
    );
    assert_eq!(
        session.metadata.get_notes("SH011").expect("notes moved"),
        "color pass pending"
    );

    // The old identity is gone everywhere.
    assert!(matches!(
        session.registry.get("SH010").unwrap_err(),
        ShotdeckError::ShotNotFound(_)
    ));
    assert_eq!(
        session
            .metadata
            .get_prompt("SH010", AssetSlot::FirstImage, 1)
            .expect("old prompt empty"),
        ""
    );
    assert!(!session.layout().shot_dir("SH010").exists());

    let record = session
        .versions
        .resolve("SH011", AssetSlot::FirstImage, None)
        .expect("resolve under new name");
    assert!(record.file.exists());
    assert!(
        record
            .file
            .to_string_lossy()
            .contains("SH011"),
        "media path should carry the new name: {}",
        record.file.display()
    );
}

#[test]
fn rename_guards_identity() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create SH010");
    session.registry.create(None).expect("create SH020");

    assert!(matches!(
        session.registry.rename("SH030", "SH040").unwrap_err(),
        ShotdeckError::ShotNotFound(_)
    ));
    assert!(matches!(
        session.registry.rename("SH010", "SH020").unwrap_err(),
        ShotdeckError::NameConflict(_)
    ));
    assert!(session.registry.rename("SH010", "SH1").is_err());
    assert!(session.registry.rename("SH010", "SH000").is_err());
}

#[test]
fn archived_anchor_still_places_by_retained_position() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    for _ in 0..2 {
        session.registry.create(None).expect("create");
    }
    // Ordering is SH020, SH010. Archive SH020 and anchor on it.
    session.registry.set_archived("SH020", true).expect("archive");

    let created = session
        .registry
        .create(Some("SH020"))
        .expect("create after archived anchor");
    let active: Vec<String> = session
        .registry
        .list()
        .expect("list")
        .into_iter()
        .filter(|s| !s.archived)
        .map(|s| s.name)
        .collect();
    assert_eq!(active, vec![created.name, "SH010".to_string()]);
}

#[test]
fn rename_leaves_subshot_files_alone() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create SH010");
    session.registry.create(None).expect("create SH020");
    session
        .registry
        .rename("SH020", "SH010_050")
        .expect("rename to sub-shot");
    let png = media_file(tmp.path(), "frame.png");
    session
        .versions
        .add_version("SH010", AssetSlot::FirstImage, &png)
        .expect("upload to base shot");
    session
        .versions
        .add_version("SH010_050", AssetSlot::FirstImage, &png)
        .expect("upload to sub-shot");

    session.registry.rename("SH010", "SH030").expect("rename base shot");

    // The sub-shot shares the SH010_ filename prefix but is its own shot;
    // none of its stores or files may move.
    let record = session
        .versions
        .resolve("SH010_050", AssetSlot::FirstImage, None)
        .expect("sub-shot still resolves");
    assert!(record.file.exists());
    let mirrors = session.layout().latest_images_dir();
    assert!(mirrors.join("SH010_050_first.png").exists());
    assert!(mirrors.join("SH030_first.png").exists());
    assert!(!mirrors.join("SH030_050_first.png").exists());
}

#[test]
fn latest_mirror_tracks_the_current_version() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create");
    let v1 = tmp.path().join("one.png");
    let v2 = tmp.path().join("two.png");
    fs::write(&v1, b"frame one").expect("write v1");
    fs::write(&v2, b"frame two").expect("write v2");

    session
        .versions
        .add_version("SH010", AssetSlot::FirstImage, &v1)
        .expect("v1");
    session
        .versions
        .add_version("SH010", AssetSlot::FirstImage, &v2)
        .expect("v2");

    let mirror = session.layout().latest_images_dir().join("SH010_first.png");
    assert_eq!(fs::read(&mirror).expect("mirror"), b"frame two");

    session
        .versions
        .promote("SH010", AssetSlot::FirstImage, 1)
        .expect("promote");
    assert_eq!(fs::read(&mirror).expect("mirror"), b"frame one");

    session
        .versions
        .cycle("SH010", AssetSlot::FirstImage)
        .expect("cycle");
    assert_eq!(fs::read(&mirror).expect("mirror"), b"frame two");
}

#[test]
fn audit_append_failure_does_not_discard_the_result() {
    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());

    // Occupy the audit log path with a directory so appends fail.
    let audit = session.root().join("ledger.events.jsonl");
    let _ = fs::remove_file(&audit);
    fs::create_dir(&audit).expect("occupy audit path");

    let shot = session.registry.create(None).expect("create still succeeds");
    assert_eq!(shot.name, "SH010");
    assert!(session.registry.exists("SH010").expect("exists"));
}

#[test]
fn ledger_audit_trail_records_mutations() {
    use shotdeck::core::broker::LedgerEvent;

    let tmp = tempdir().expect("tempdir");
    let session = open_project(tmp.path());
    session.registry.create(None).expect("create");
    let png = media_file(tmp.path(), "frame.png");
    session
        .versions
        .add_version("SH010", AssetSlot::FirstImage, &png)
        .expect("upload");
    let _ = session
        .versions
        .promote("SH010", AssetSlot::FirstImage, 5)
        .unwrap_err();

    let audit = session.root().join("ledger.events.jsonl");
    assert!(audit.exists());
    let events: Vec<LedgerEvent> = fs::read_to_string(&audit)
        .expect("read audit")
        .lines()
        .map(|line| serde_json::from_str(line).expect("valid ledger event json"))
        .collect();
    assert!(events.iter().any(|ev| ev.op == "registry.create" && ev.status == "success"));
    assert!(events.iter().any(|ev| ev.op == "version.add" && ev.status == "success"));
    assert!(events.iter().any(|ev| ev.op == "version.promote" && ev.status == "error"));
}
