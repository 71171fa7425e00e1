//! Integration tests for profile loading, updating and aggregation.
//!
//! Lists live in temporary directories; downloads go through an in-memory
//! transport.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use cb_core::types::{CheckResult, ResourceType};
use cb_profile::{
    ContentBlockingInformation, ContentBlockingProfile, ProfileError, ProfileEvent, ProfileManager, ProfileOption,
    ProfileState, Transport, TransportError,
};
use tempfile::TempDir;
use tokio::sync::broadcast::error::TryRecvError;

const PAGE: &str = "https://site.org/article";

/// Transport answering every request the same way.
#[derive(Clone)]
enum FakeTransport {
    Body(Vec<u8>),
    Status(u16),
    Pending,
}

impl FakeTransport {
    fn text(text: &str) -> Self {
        Self::Body(text.as_bytes().to_vec())
    }
}

impl Transport for FakeTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        match self {
            Self::Body(body) => Ok(body.clone()),
            Self::Status(status) => Err(TransportError::HttpStatus {
                url: url.to_string(),
                status: *status,
            }),
            Self::Pending => std::future::pending().await,
        }
    }
}

fn write_list(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

fn profile(name: &str, path: &Path) -> Arc<ContentBlockingProfile> {
    let information = ContentBlockingInformation::new(name, path).with_update_url("https://lists.example/list.txt");
    Arc::new(ContentBlockingProfile::new(information))
}

fn script(profile: &ContentBlockingProfile, url: &str) -> CheckResult {
    profile.check_url(PAGE, url, ResourceType::Script)
}

#[test]
fn should_load_full_list() {
    let dir = TempDir::new().unwrap();
    let path = write_list(&dir, "list.txt", "[Adblock Plus 2.0]\n! Title: Test List\n||ads.com^\n##.ad\n");
    let profile = profile("test", &path);

    profile.load(false).unwrap();

    assert_eq!(profile.state(), ProfileState::FullyLoaded);
    assert_eq!(profile.title(), "Test List");
    assert!(!profile.is_empty());
    assert_eq!(script(&profile, "https://ads.com/x.js"), CheckResult::Block);
    assert_eq!(profile.hidden_selectors("site.org"), vec![".ad"]);
}

#[test]
fn should_load_header_without_rules() {
    let dir = TempDir::new().unwrap();
    let path = write_list(&dir, "list.txt", "! Title: Header Only\n! Expires: 2 days\n||ads.com^\n");
    let profile = profile("test", &path);

    profile.load(true).unwrap();

    assert_eq!(profile.state(), ProfileState::HeaderLoaded);
    assert_eq!(profile.title(), "Header Only");
    assert_eq!(profile.header().expires, Some(Duration::from_secs(2 * 24 * 3600)));
    assert!(profile.is_empty());
    assert_eq!(script(&profile, "https://ads.com/x.js"), CheckResult::NoMatch);
}

#[test]
fn should_keep_configured_title() {
    let dir = TempDir::new().unwrap();
    let path = write_list(&dir, "list.txt", "! Title: From Header\n||ads.com^\n");
    let information = ContentBlockingInformation::new("test", &path).with_title("Configured");
    let profile = ContentBlockingProfile::new(information);

    profile.load(false).unwrap();

    assert_eq!(profile.title(), "Configured");
    assert_eq!(profile.header().title.as_deref(), Some("From Header"));
}

#[test]
fn should_clear_rules() {
    let dir = TempDir::new().unwrap();
    let path = write_list(&dir, "list.txt", "||ads.com^\n");
    let profile = profile("test", &path);
    profile.load(false).unwrap();

    profile.clear();

    assert!(profile.is_empty());
    assert!(!profile.was_loaded());
    assert_eq!(script(&profile, "https://ads.com/x.js"), CheckResult::NoMatch);
}

#[test]
fn should_recompile_from_memory_on_option_change() {
    let dir = TempDir::new().unwrap();
    let path = write_list(&dir, "list.txt", "/ads/*/banner\n");
    let profile = profile("test", &path);
    profile.load(false).unwrap();
    let url = "https://cdn.net/ads/2024/banner.png";
    assert_eq!(profile.check_url(PAGE, url, ResourceType::Image), CheckResult::Block);

    // Recompilation must not need the file
    std::fs::remove_file(&path).unwrap();

    profile.option_changed(ProfileOption::EnableWildcards(false));
    assert!(!profile.enable_wildcards());
    assert_eq!(profile.check_url(PAGE, url, ResourceType::Image), CheckResult::NoMatch);

    profile.option_changed(ProfileOption::EnableWildcards(true));
    assert_eq!(profile.check_url(PAGE, url, ResourceType::Image), CheckResult::Block);
}

#[test]
fn should_report_staleness_from_expires() {
    let dir = TempDir::new().unwrap();
    let path = write_list(&dir, "list.txt", "! Expires: 1 hours\n||ads.com^\n");
    let profile = profile("test", &path);
    profile.load(false).unwrap();

    let now = SystemTime::now();
    assert!(!profile.is_stale(now));
    assert!(profile.is_stale(now + Duration::from_secs(2 * 3600)));

    let missing = self::profile("missing", &dir.path().join("missing.txt"));
    assert!(missing.is_stale(now));
}

#[tokio::test]
async fn should_publish_downloaded_rules_and_notify() {
    let dir = TempDir::new().unwrap();
    let path = write_list(&dir, "list.txt", "||old.com^\n");
    let profile = profile("easylist", &path);
    profile.load(false).unwrap();
    let mut events = profile.subscribe();

    let new_list = "! Title: Fresh\n||new.com^\n";
    let handle = profile
        .download_rules(&FakeTransport::text(new_list))
        .expect("download should start");
    handle.wait().await.unwrap();

    assert_eq!(
        events.try_recv().unwrap(),
        ProfileEvent::Modified {
            name: "easylist".into()
        }
    );
    assert!(!profile.is_updating());
    assert_eq!(script(&profile, "https://old.com/x.js"), CheckResult::NoMatch);
    assert_eq!(script(&profile, "https://new.com/x.js"), CheckResult::Block);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), new_list);
    assert!(!dir.path().join(".list.txt.download").exists());
}

#[tokio::test]
async fn should_keep_rules_when_download_fails() {
    let dir = TempDir::new().unwrap();
    let path = write_list(&dir, "list.txt", "||old.com^\n");
    let profile = profile("test", &path);
    profile.load(false).unwrap();
    let mut events = profile.subscribe();

    let handle = profile.download_rules(&FakeTransport::Status(503)).unwrap();
    let err = handle.wait().await.unwrap_err();

    assert!(matches!(
        err,
        ProfileError::Transport(TransportError::HttpStatus { status: 503, .. })
    ));
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert!(!profile.is_updating());
    assert_eq!(script(&profile, "https://old.com/x.js"), CheckResult::Block);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "||old.com^\n");
}

#[tokio::test]
async fn should_reject_invalid_downloads() {
    let dir = TempDir::new().unwrap();
    let path = write_list(&dir, "list.txt", "||old.com^\n");
    let profile = profile("test", &path);
    profile.load(false).unwrap();

    for transport in [
        FakeTransport::Body(vec![0xff, 0xfe, 0x00]),
        FakeTransport::text("! Title: Empty\n! nothing else\n"),
    ] {
        let err = profile.download_rules(&transport).unwrap().wait().await.unwrap_err();
        assert!(matches!(err, ProfileError::InvalidList(_)), "unexpected error: {err}");
    }

    assert_eq!(script(&profile, "https://old.com/x.js"), CheckResult::Block);
}

#[tokio::test]
async fn should_publish_nothing_when_list_cannot_be_saved() {
    let dir = TempDir::new().unwrap();
    let blocker = write_list(&dir, "not-a-dir", "");
    let profile = profile("test", &blocker.join("list.txt"));
    let mut events = profile.subscribe();

    let err = profile
        .download_rules(&FakeTransport::text("||new.com^\n"))
        .unwrap()
        .wait()
        .await
        .unwrap_err();

    assert!(matches!(err, ProfileError::Persist { .. }), "unexpected error: {err}");
    assert!(matches!(events.try_recv(), Err(TryRecvError::Empty)));
    assert!(!profile.was_loaded());
    assert_eq!(script(&profile, "https://new.com/x.js"), CheckResult::NoMatch);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn should_keep_file_and_rules_in_step_when_aborted() {
    let dir = TempDir::new().unwrap();
    let path = write_list(&dir, "list.txt", "||old.com^\n");
    let profile = profile("test", &path);
    profile.load(false).unwrap();
    let mut events = profile.subscribe();

    let new_list = "||new.com^\n";
    let handle = profile.download_rules(&FakeTransport::text(new_list)).unwrap();
    while !handle.is_finished() && std::fs::read_to_string(&path).unwrap() != new_list {
        tokio::task::yield_now().await;
    }
    handle.abort();
    let _ = handle.wait().await;
    while profile.is_updating() {
        tokio::task::yield_now().await;
    }

    let saved = std::fs::read_to_string(&path).unwrap() == new_list;
    let published = script(&profile, "https://new.com/x.js") == CheckResult::Block;
    assert_eq!(saved, published);
    assert_eq!(saved, events.try_recv().is_ok());
    assert_eq!(saved, script(&profile, "https://old.com/x.js") == CheckResult::NoMatch);
}

#[tokio::test]
async fn should_allow_one_download_at_a_time() {
    let dir = TempDir::new().unwrap();
    let path = write_list(&dir, "list.txt", "||old.com^\n");
    let profile = profile("test", &path);
    profile.load(false).unwrap();

    let handle = profile.download_rules(&FakeTransport::Pending).unwrap();
    assert!(profile.is_updating());
    assert!(profile.download_rules(&FakeTransport::Pending).is_none());

    handle.abort();
    let err = handle.wait().await.unwrap_err();

    assert!(matches!(err, ProfileError::Cancelled));
    assert!(!profile.is_updating());
    assert_eq!(script(&profile, "https://old.com/x.js"), CheckResult::Block);
}

#[test]
fn should_let_any_exception_win_across_profiles() {
    let dir = TempDir::new().unwrap();
    let block = profile("a", &write_list(&dir, "a.txt", "||ads.com^\n##.banner\n"));
    let allow = profile("b", &write_list(&dir, "b.txt", "@@||ads.com/ok\n##.sponsor\n"));

    let mut manager = ProfileManager::new();
    manager.insert(block);
    manager.insert(allow);
    assert!(manager.load_all(false).is_empty());

    assert_eq!(
        manager.explain_url(PAGE, "https://ads.com/ok.js", ResourceType::Script),
        (CheckResult::Allow, Some(("b".into(), "@@||ads.com/ok".into())))
    );
    assert_eq!(
        manager.explain_url(PAGE, "https://ads.com/x.js", ResourceType::Script),
        (CheckResult::Block, Some(("a".into(), "||ads.com^".into())))
    );
    assert_eq!(
        manager.check_url(PAGE, "https://cdn.net/x.js", ResourceType::Script),
        CheckResult::NoMatch
    );
    assert_eq!(manager.hidden_selectors("site.org"), vec![".banner", ".sponsor"]);
}

#[test]
fn should_report_profiles_that_fail_to_load() {
    let dir = TempDir::new().unwrap();
    let mut manager = ProfileManager::new();
    manager.insert(profile("ok", &write_list(&dir, "ok.txt", "||ads.com^\n")));
    manager.insert(profile("missing", &dir.path().join("missing.txt")));

    let failures = manager.load_all(false);

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].0, "missing");
    assert!(matches!(failures[0].1, ProfileError::Io { .. }));
    assert!(manager.get("missing").unwrap().is_empty());
}

#[tokio::test]
async fn should_update_stale_profiles() {
    let dir = TempDir::new().unwrap();
    let fresh_path = write_list(&dir, "fresh.txt", "||fresh.com^\n");
    let mut manager = ProfileManager::new();
    manager.insert(profile("fresh", &fresh_path));
    manager.insert(profile("remote", &dir.path().join("remote.txt")));
    manager.load_all(false);

    let now = SystemTime::now();
    let handles = manager.update_stale(&FakeTransport::text("||remote.com^\n"), now);
    assert_eq!(handles.len(), 1);
    assert_eq!(handles[0].0, "remote");
    for (_, handle) in handles {
        handle.wait().await.unwrap();
    }

    let remote = manager.get("remote").unwrap();
    assert!(remote.was_loaded());
    assert!(!remote.is_stale(now));
    assert_eq!(script(remote, "https://remote.com/x.js"), CheckResult::Block);
    assert_eq!(std::fs::read_to_string(&fresh_path).unwrap(), "||fresh.com^\n");
}
