use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use tempfile::TempDir;

use super::classifier::{ChangeRules, correct_by_existence};
use super::debouncer::{DEBOUNCE_MS, Debouncer, REBUILD_COOLDOWN_MS, is_temp_file};
use super::types::{Change, ChangeKind, RawChanges};
use crate::actor::messages::TransformMsg;
use crate::config::{HmrConfig, normalize_path};
use crate::hmr::ArtifactKind;

fn make_config() -> (TempDir, HmrConfig) {
    let temp = TempDir::new().unwrap();
    let root = normalize_path(temp.path());

    let config = HmrConfig {
        config_path: root.join("hmr.toml"),
        root: root.clone(),
        ..HmrConfig::default()
    };
    for dir in ["src/server", "src/client", "node_modules/fw"] {
        std::fs::create_dir_all(root.join(dir)).unwrap();
    }
    (temp, config)
}

fn rules(config: &HmrConfig) -> ChangeRules {
    ChangeRules::from_config(config)
}

fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

fn batch(entries: &[(&Path, ChangeKind)]) -> RawChanges {
    entries.iter().map(|(p, k)| (p.to_path_buf(), *k)).collect()
}

// =============================================================================
// Debouncer
// =============================================================================

#[test]
fn test_debouncer_empty() {
    let debouncer = Debouncer::new();
    assert!(!debouncer.is_ready());
    assert!(debouncer.sleep_duration() >= Duration::from_secs(60));
}

#[test]
fn test_debouncer_event_kinds() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.css"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/b.css"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/c.css"], remove_kind()));

    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/a.css")], ChangeKind::Created);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/b.css")], ChangeKind::Modified);
    assert_eq!(debouncer.changes[&PathBuf::from("/tmp/c.css")], ChangeKind::Removed);
}

#[test]
fn test_debouncer_ignores_metadata_and_temp_files() {
    let mut debouncer = Debouncer::new();
    let metadata = notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
        notify::event::MetadataKind::WriteTime,
    ));
    debouncer.add_event(&make_event(vec!["/tmp/a.css"], metadata));
    debouncer.add_event(&make_event(vec!["/tmp/a.css~", "/tmp/.a.css.swp"], modify_kind()));
    assert!(debouncer.changes.is_empty());
    assert!(debouncer.last_event.is_none());
}

#[test]
fn test_debouncer_merge_rules() {
    let mut debouncer = Debouncer::new();
    let path = PathBuf::from("/tmp/x.css");

    // Removed then re-created: atomic save
    debouncer.add(path.clone(), ChangeKind::Removed);
    debouncer.add(path.clone(), ChangeKind::Created);
    assert_eq!(debouncer.changes[&path], ChangeKind::Created);

    // Created then removed within one window: nothing happened
    debouncer.add(path.clone(), ChangeKind::Removed);
    assert!(!debouncer.changes.contains_key(&path));

    // Modified then removed: removed
    debouncer.add(path.clone(), ChangeKind::Modified);
    debouncer.add(path.clone(), ChangeKind::Removed);
    assert_eq!(debouncer.changes[&path], ChangeKind::Removed);

    // Modified twice: first wins
    let other = PathBuf::from("/tmp/y.css");
    debouncer.add(other.clone(), ChangeKind::Modified);
    debouncer.add(other.clone(), ChangeKind::Modified);
    assert_eq!(debouncer.changes[&other], ChangeKind::Modified);
}

#[test]
fn test_debouncer_waits_for_quiet_window() {
    let mut debouncer = Debouncer::new();
    debouncer.add(PathBuf::from("/tmp/a.css"), ChangeKind::Modified);
    assert!(!debouncer.is_ready());
    assert!(debouncer.take_if_ready().is_none());

    debouncer.last_event = Some(Instant::now() - Duration::from_millis(DEBOUNCE_MS + 10));
    let taken = debouncer.take_if_ready().unwrap();
    assert_eq!(taken.len(), 1);
    assert!(debouncer.changes.is_empty());
}

#[test]
fn test_debouncer_cooldown_between_batches() {
    let mut debouncer = Debouncer::new();
    debouncer.add(PathBuf::from("/tmp/a.css"), ChangeKind::Modified);
    debouncer.last_event = Some(Instant::now() - Duration::from_millis(DEBOUNCE_MS + 10));
    assert!(debouncer.take_if_ready().is_some());

    debouncer.add(PathBuf::from("/tmp/b.css"), ChangeKind::Modified);
    debouncer.last_event = Some(Instant::now() - Duration::from_millis(DEBOUNCE_MS + 10));
    assert!(!debouncer.is_ready());
    assert!(debouncer.sleep_duration() > Duration::ZERO);

    debouncer.last_flush = Some(Instant::now() - Duration::from_millis(REBUILD_COOLDOWN_MS + 10));
    assert!(debouncer.is_ready());
}

#[test]
fn test_is_temp_file() {
    assert!(is_temp_file(Path::new("/a/file.swp")));
    assert!(is_temp_file(Path::new("/a/file.css~")));
    assert!(is_temp_file(Path::new("/a/.hidden")));
    assert!(!is_temp_file(Path::new("/a/app.css")));
}

// =============================================================================
// Classification
// =============================================================================

#[test]
fn test_classify_by_location_and_kind() {
    let (_temp, config) = make_config();
    let rules = rules(&config);
    let root = config.watch_root();

    assert_eq!(rules.classify(&config.config_path, ChangeKind::Modified), Some(Change::Config));
    assert_eq!(
        rules.classify(&root.join("src/app.css"), ChangeKind::Modified),
        Some(Change::Style(ArtifactKind::Stylesheet))
    );
    assert_eq!(
        rules.classify(&root.join("src/server/card.module.css"), ChangeKind::Created),
        Some(Change::Style(ArtifactKind::CssModuleScript))
    );
    assert_eq!(
        rules.classify(&root.join("src/app.css"), ChangeKind::Removed),
        Some(Change::StyleRemoved)
    );
    assert_eq!(
        rules.classify(&root.join("src/server/page.tsx"), ChangeKind::Modified),
        Some(Change::Server)
    );
    assert_eq!(
        rules.classify(&root.join("src/server/page.tsx"), ChangeKind::Removed),
        Some(Change::Server)
    );
    assert_eq!(
        rules.classify(&root.join("src/client/counter.tsx"), ChangeKind::Modified),
        Some(Change::ClientScript)
    );
    assert_eq!(rules.classify(&root.join("src/client/counter.tsx"), ChangeKind::Removed), None);
    assert_eq!(rules.classify(&root.join("README.md"), ChangeKind::Modified), None);
}

#[test]
fn test_reconfigure_adopts_new_watch_dirs() {
    let (_temp, config) = make_config();
    let mut rules = rules(&config);
    let root = config.watch_root();
    let page = root.join("app/rsc/page.tsx");
    assert_eq!(rules.classify(&page, ChangeKind::Modified), None);

    let mut next = config.clone();
    next.watch.server = vec![PathBuf::from("app/rsc")];
    rules.reconfigure(&next);
    assert_eq!(rules.classify(&page, ChangeKind::Modified), Some(Change::Server));

    // A new root needs a new watcher: keep the current rules
    let mut moved = next.clone();
    moved.watch.root = PathBuf::from("elsewhere");
    moved.watch.server = vec![PathBuf::from("src/server")];
    rules.reconfigure(&moved);
    assert_eq!(rules.classify(&page, ChangeKind::Modified), Some(Change::Server));
}

#[test]
fn test_classify_ignores_configured_dirs_and_outside_root() {
    let (_temp, config) = make_config();
    let rules = rules(&config);
    let root = config.watch_root();

    assert_eq!(rules.classify(&root.join("node_modules/fw/x.css"), ChangeKind::Modified), None);
    assert_eq!(rules.classify(Path::new("/elsewhere/a.css"), ChangeKind::Modified), None);
}

#[test]
fn test_route_orders_rsc_reload_before_imports() {
    let (_temp, config) = make_config();
    let rules = rules(&config);
    let root = config.watch_root();

    let css = root.join("src/app.css");
    let page = root.join("src/server/page.tsx");
    let widget = root.join("src/client/widget.ts");
    let messages = rules.route(batch(&[
        (&css, ChangeKind::Modified),
        (&page, ChangeKind::Modified),
        (&widget, ChangeKind::Modified),
    ]));

    assert_eq!(
        messages,
        vec![
            TransformMsg::RscReload {
                reason: "src/server/page.tsx".into()
            },
            TransformMsg::Import {
                path: css,
                kind: ArtifactKind::Stylesheet
            },
            TransformMsg::HotImport(widget),
        ]
    );
}

#[test]
fn test_route_single_rsc_reload_for_many_server_files() {
    let (_temp, config) = make_config();
    let rules = rules(&config);
    let root = config.watch_root();

    let a = root.join("src/server/a.tsx");
    let b = root.join("src/server/b.tsx");
    let messages = rules.route(batch(&[(&a, ChangeKind::Modified), (&b, ChangeKind::Created)]));
    assert_eq!(
        messages,
        vec![TransformMsg::RscReload {
            reason: "src/server/a.tsx and 1 more".into()
        }]
    );
}

#[test]
fn test_route_config_change_wins() {
    let (_temp, config) = make_config();
    let rules = rules(&config);
    let css = config.watch_root().join("src/app.css");
    let messages = rules.route(batch(&[
        (&css, ChangeKind::Modified),
        (&config.config_path, ChangeKind::Modified),
    ]));
    assert_eq!(messages, vec![TransformMsg::ConfigChanged]);
}

#[test]
fn test_route_removed_style_reloads_page() {
    let (_temp, config) = make_config();
    let rules = rules(&config);
    let root = config.watch_root();
    let gone = root.join("src/old.css");
    let page = root.join("src/server/page.tsx");

    let messages = rules.route(batch(&[(&gone, ChangeKind::Removed), (&page, ChangeKind::Modified)]));
    assert_eq!(
        messages,
        vec![TransformMsg::FullReload {
            reason: "removed src/old.css".into(),
            invalidate: vec![gone],
        }]
    );
}

#[test]
fn test_correct_by_existence() {
    let (_temp, config) = make_config();
    let root = config.watch_root();
    let present = root.join("src/app.css");
    std::fs::write(&present, "a{}").unwrap();
    let missing = root.join("src/gone.css");
    let created_missing = root.join("src/flash.css");
    let dir = root.join("src/server");

    let mut changes = batch(&[
        (&present, ChangeKind::Removed),
        (&missing, ChangeKind::Modified),
        (&created_missing, ChangeKind::Created),
        (&dir, ChangeKind::Modified),
    ]);
    correct_by_existence(&mut changes);

    assert_eq!(changes[&present], ChangeKind::Modified);
    assert_eq!(changes[&missing], ChangeKind::Removed);
    assert!(!changes.contains_key(&created_missing));
    assert!(!changes.contains_key(&dir));
}
