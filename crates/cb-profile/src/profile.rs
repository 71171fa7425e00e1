//! A single filter list and its compiled rules.
//!
//! Readers get the current [`Snapshot`] through an [`ArcSwap`], so matching
//! never takes a lock and never sees a partially built rule set. Writers
//! (load, update, recompile, clear) serialize on one mutex, which also holds
//! the list text used for recompilation after an option change.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwap;
use cb_compiler::{compile_filter_list, parse_list_header, CompiledList, ListHeader, ParseOptions};
use cb_core::matcher::Matcher;
use cb_core::snapshot::Snapshot;
use cb_core::types::{CheckResult, ResourceType};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::error::ProfileError;
use crate::event::{ProfileEvent, ProfileOption, ProfileState};
use crate::transport::Transport;

const EVENT_CHANNEL_CAPACITY: usize = 16;

/// Identity of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentBlockingInformation {
    pub name: String,
    /// Display title; filled from the list header when empty
    pub title: String,
    /// Local copy of the filter list
    pub path: PathBuf,
    pub update_url: Option<String>,
}

impl ContentBlockingInformation {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            title: String::new(),
            path: path.into(),
            update_url: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_update_url(mut self, url: impl Into<String>) -> Self {
        self.update_url = Some(url.into());
        self
    }
}

/// A filter list profile with live reload.
pub struct ContentBlockingProfile {
    information: RwLock<ContentBlockingInformation>,
    header: RwLock<ListHeader>,
    snapshot: ArcSwap<Snapshot>,
    /// Writer lock; holds the text of the published list
    source: Mutex<Option<Arc<str>>>,
    was_loaded: AtomicBool,
    header_loaded: AtomicBool,
    needs_recompile: AtomicBool,
    enable_wildcards: AtomicBool,
    is_updating: AtomicBool,
    events: broadcast::Sender<ProfileEvent>,
}

impl std::fmt::Debug for ContentBlockingProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentBlockingProfile")
            .field("information", &*self.information.read())
            .field("state", &self.state())
            .field("is_updating", &self.is_updating())
            .finish_non_exhaustive()
    }
}

impl ContentBlockingProfile {
    pub fn new(information: ContentBlockingInformation) -> Self {
        Self::with_wildcards(information, true)
    }

    pub fn with_wildcards(information: ContentBlockingInformation, enable_wildcards: bool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            information: RwLock::new(information),
            header: RwLock::new(ListHeader::default()),
            snapshot: ArcSwap::from_pointee(Snapshot::empty()),
            source: Mutex::new(None),
            was_loaded: AtomicBool::new(false),
            header_loaded: AtomicBool::new(false),
            needs_recompile: AtomicBool::new(false),
            enable_wildcards: AtomicBool::new(enable_wildcards),
            is_updating: AtomicBool::new(false),
            events,
        }
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn information(&self) -> ContentBlockingInformation {
        self.information.read().clone()
    }

    pub fn name(&self) -> String {
        self.information.read().name.clone()
    }

    pub fn title(&self) -> String {
        self.information.read().title.clone()
    }

    pub fn path(&self) -> PathBuf {
        self.information.read().path.clone()
    }

    /// Metadata from the list's comment header.
    pub fn header(&self) -> ListHeader {
        self.header.read().clone()
    }

    pub fn state(&self) -> ProfileState {
        if self.was_loaded.load(Ordering::Acquire) {
            ProfileState::FullyLoaded
        } else if self.header_loaded.load(Ordering::Acquire) {
            ProfileState::HeaderLoaded
        } else {
            ProfileState::Unloaded
        }
    }

    /// True when no rules or selectors are published.
    pub fn is_empty(&self) -> bool {
        self.snapshot.load().is_empty()
    }

    pub fn was_loaded(&self) -> bool {
        self.was_loaded.load(Ordering::Acquire)
    }

    pub fn is_updating(&self) -> bool {
        self.is_updating.load(Ordering::Acquire)
    }

    pub fn enable_wildcards(&self) -> bool {
        self.enable_wildcards.load(Ordering::Acquire)
    }

    /// Receive [`ProfileEvent`]s from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ProfileEvent> {
        self.events.subscribe()
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Read the list file.
    ///
    /// With `only_header` only the metadata is parsed and no rules are
    /// compiled. Otherwise the list is compiled and published in one swap.
    /// An unreadable file leaves the profile as it was.
    pub fn load(&self, only_header: bool) -> Result<(), ProfileError> {
        let path = self.path();
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(source) => {
                log::warn!("Cannot read filter list {:?}: {}", path, source);
                return Err(ProfileError::Io { path, source });
            }
        };

        if only_header {
            self.set_header(parse_list_header(&text));
            return Ok(());
        }

        let mut source = self.source.lock();
        self.needs_recompile.store(false, Ordering::Release);
        let compiled = compile_filter_list(&text, &self.parse_options());
        self.publish(compiled);
        *source = Some(Arc::from(text));
        self.was_loaded.store(true, Ordering::Release);
        Ok(())
    }

    /// Publish an empty rule set and forget the list text.
    pub fn clear(&self) {
        let mut source = self.source.lock();
        self.snapshot.store(Arc::new(Snapshot::empty()));
        *source = None;
        self.needs_recompile.store(false, Ordering::Release);
        self.was_loaded.store(false, Ordering::Release);
    }

    pub fn option_changed(&self, option: ProfileOption) {
        match option {
            ProfileOption::EnableWildcards(enabled) => {
                let previous = self.enable_wildcards.swap(enabled, Ordering::AcqRel);
                if previous != enabled && self.was_loaded() {
                    self.needs_recompile.store(true, Ordering::Release);
                }
            }
        }
    }

    /// Whether the list file is older than its `Expires` interval.
    ///
    /// A missing file is always stale.
    pub fn is_stale(&self, now: SystemTime) -> bool {
        let modified = match fs::metadata(self.path()).and_then(|meta| meta.modified()) {
            Ok(modified) => modified,
            Err(_) => return true,
        };

        let expires = self.header.read().expires_or_default();
        modified
            .checked_add(expires)
            .is_some_and(|deadline| now >= deadline)
    }

    // =========================================================================
    // Matching
    // =========================================================================

    /// The published snapshot, recompiled first if an option changed.
    pub fn snapshot(&self) -> Arc<Snapshot> {
        if self.needs_recompile.load(Ordering::Acquire) {
            self.recompile();
        }
        self.snapshot.load_full()
    }

    /// Verdict for one request. An unloaded profile matches nothing.
    pub fn check_url(&self, base_url: &str, request_url: &str, resource_type: ResourceType) -> CheckResult {
        let snapshot = self.snapshot();
        Matcher::new(&snapshot).check_url(base_url, request_url, resource_type)
    }

    /// Verdict plus the text of the deciding rule.
    pub fn explain_url(
        &self,
        base_url: &str,
        request_url: &str,
        resource_type: ResourceType,
    ) -> (CheckResult, Option<String>) {
        let snapshot = self.snapshot();
        let (result, filter) = Matcher::new(&snapshot).explain_url(base_url, request_url, resource_type);
        (result, filter.map(str::to_string))
    }

    pub fn style_sheet(&self) -> Vec<String> {
        self.snapshot().style_sheets().style_sheet().to_vec()
    }

    pub fn style_sheet_black_list(&self, domain: &str) -> Vec<String> {
        owned(self.snapshot().style_sheets().style_sheet_black_list(domain))
    }

    pub fn style_sheet_white_list(&self, domain: &str) -> Vec<String> {
        owned(self.snapshot().style_sheets().style_sheet_white_list(domain))
    }

    /// Selectors to hide on `domain` after whitelist suppression.
    pub fn hidden_selectors(&self, domain: &str) -> Vec<String> {
        owned(self.snapshot().style_sheets().hidden_selectors(domain))
    }

    // =========================================================================
    // Updating
    // =========================================================================

    /// Start downloading a fresh copy of the list.
    ///
    /// Returns `None` when an update is already running or the profile has
    /// no update URL. Must be called from within a tokio runtime.
    pub fn download_rules<T: Transport>(self: &Arc<Self>, transport: &T) -> Option<DownloadHandle> {
        let url = self.information.read().update_url.clone()?;

        if self
            .is_updating
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }

        let guard = UpdatingGuard(Arc::clone(self));
        let transport = transport.clone();
        let handle = tokio::spawn(async move { guard.update_from(&transport, &url).await });

        Some(DownloadHandle { handle })
    }

    async fn fetch_and_publish<T: Transport>(
        guard: UpdatingGuard,
        transport: &T,
        url: &str,
    ) -> Result<(), ProfileError> {
        let bytes = transport.fetch(url).await?;
        let text = String::from_utf8(bytes)
            .map_err(|_| ProfileError::InvalidList("response is not valid UTF-8".into()))?;

        let options = guard.0.parse_options();
        let (text, compiled) = tokio::task::spawn_blocking(move || {
            let compiled = compile_filter_list(&text, &options);
            (text, compiled)
        })
        .await?;

        if compiled.stats.rules == 0 && compiled.stats.selectors == 0 {
            return Err(ProfileError::InvalidList("list contains no rules".into()));
        }

        // Runs to the end even if the download task is aborted meanwhile;
        // the guard keeps `is_updating` set until it does
        tokio::task::spawn_blocking(move || {
            let result = guard.0.commit(compiled, text);
            drop(guard);
            result
        })
        .await?
    }

    /// Save the list, publish it and notify, or do none of it.
    fn commit(&self, compiled: CompiledList, text: String) -> Result<(), ProfileError> {
        persist(&self.path(), &text)?;
        self.install(compiled, text);
        let _ = self.events.send(ProfileEvent::Modified { name: self.name() });
        Ok(())
    }

    // =========================================================================
    // Publication
    // =========================================================================

    fn install(&self, compiled: CompiledList, text: String) {
        let mut source = self.source.lock();
        self.publish(compiled);
        *source = Some(Arc::from(text));
        self.was_loaded.store(true, Ordering::Release);
    }

    fn recompile(&self) {
        // A writer is active; keep serving the current snapshot
        let Some(source) = self.source.try_lock() else {
            return;
        };
        if !self.needs_recompile.swap(false, Ordering::AcqRel) {
            return;
        }

        if let Some(text) = source.as_deref() {
            let compiled = compile_filter_list(text, &self.parse_options());
            self.publish(compiled);
        }
    }

    /// Caller must hold the writer lock.
    fn publish(&self, compiled: CompiledList) {
        let CompiledList {
            snapshot,
            header,
            stats,
        } = compiled;

        log::info!(
            "Profile {}: {} rules, {} selectors ({} lines dropped)",
            self.name(),
            stats.rules,
            stats.selectors,
            stats.parse.dropped
        );

        self.snapshot.store(Arc::new(snapshot));
        self.set_header(header);
    }

    fn set_header(&self, header: ListHeader) {
        {
            let mut information = self.information.write();
            if information.title.is_empty() {
                if let Some(title) = &header.title {
                    information.title = title.clone();
                }
            }
        }
        *self.header.write() = header;
        self.header_loaded.store(true, Ordering::Release);
    }

    fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            enable_wildcards: self.enable_wildcards(),
        }
    }
}

/// A running list download.
///
/// Dropping the handle detaches the download; it still completes.
#[derive(Debug)]
pub struct DownloadHandle {
    handle: JoinHandle<Result<(), ProfileError>>,
}

impl DownloadHandle {
    /// Cancel the download.
    ///
    /// Published rules are not affected. Once the new list is being saved
    /// it is still published, and [`DownloadHandle::wait`] reports
    /// [`ProfileError::Cancelled`].
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the download to finish.
    pub async fn wait(self) -> Result<(), ProfileError> {
        self.handle.await?
    }
}

/// Clears `is_updating` however the download task ends.
struct UpdatingGuard(Arc<ContentBlockingProfile>);

impl UpdatingGuard {
    async fn update_from<T: Transport>(self, transport: &T, url: &str) -> Result<(), ProfileError> {
        let name = self.0.name();
        log::debug!("Updating profile {} from {}", name, url);

        match ContentBlockingProfile::fetch_and_publish(self, transport, url).await {
            Ok(()) => {
                log::info!("Updated profile {} from {}", name, url);
                Ok(())
            }
            Err(err) => {
                log::warn!("Failed to update profile {} from {}: {}", name, url, err);
                Err(err)
            }
        }
    }
}

impl Drop for UpdatingGuard {
    fn drop(&mut self) {
        self.0.is_updating.store(false, Ordering::Release);
    }
}

fn owned(selectors: Vec<&str>) -> Vec<String> {
    selectors.into_iter().map(str::to_string).collect()
}

/// Write `text` next to `path` and rename it into place.
fn persist(path: &Path, text: &str) -> Result<(), ProfileError> {
    let tmp = download_path(path);
    let result = write_then_rename(&tmp, path, text);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result.map_err(|source| ProfileError::Persist {
        path: path.to_path_buf(),
        source,
    })
}

fn write_then_rename(tmp: &Path, path: &Path, text: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut file = File::create(tmp)?;
    file.write_all(text.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(tmp, path)
}

fn download_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "list".to_string());
    path.with_file_name(format!(".{file_name}.download"))
}
