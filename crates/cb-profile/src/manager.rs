//! Several profiles behind one verdict.
//!
//! An exception in any profile allows the request; otherwise a block in any
//! profile blocks it.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::SystemTime;

use cb_core::types::{CheckResult, ResourceType};

use crate::config::ContentBlockingConfig;
use crate::error::ProfileError;
use crate::event::ProfileOption;
use crate::profile::{ContentBlockingInformation, ContentBlockingProfile, DownloadHandle};
use crate::transport::Transport;

/// Profiles keyed by name.
#[derive(Debug, Default)]
pub struct ProfileManager {
    profiles: BTreeMap<String, Arc<ContentBlockingProfile>>,
}

impl ProfileManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create (but do not load) every enabled profile of `config`.
    pub fn from_config(config: &ContentBlockingConfig) -> Self {
        let mut manager = Self::new();

        for profile in config.enabled_profiles() {
            let mut information = ContentBlockingInformation::new(&profile.name, config.resolve_path(profile));
            if let Some(title) = &profile.title {
                information = information.with_title(title);
            }
            if let Some(url) = &profile.update_url {
                information = information.with_update_url(url);
            }
            manager.insert(Arc::new(ContentBlockingProfile::with_wildcards(
                information,
                config.enable_wildcards,
            )));
        }

        manager
    }

    /// Add a profile, replacing any profile with the same name.
    pub fn insert(&mut self, profile: Arc<ContentBlockingProfile>) -> Option<Arc<ContentBlockingProfile>> {
        self.profiles.insert(profile.name(), profile)
    }

    pub fn remove(&mut self, name: &str) -> Option<Arc<ContentBlockingProfile>> {
        self.profiles.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&Arc<ContentBlockingProfile>> {
        self.profiles.get(name)
    }

    pub fn profiles(&self) -> impl Iterator<Item = &Arc<ContentBlockingProfile>> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Load every profile. Profiles that fail stay empty and are reported.
    pub fn load_all(&self, only_header: bool) -> Vec<(String, ProfileError)> {
        self.profiles
            .iter()
            .filter_map(|(name, profile)| profile.load(only_header).err().map(|err| (name.clone(), err)))
            .collect()
    }

    pub fn check_url(&self, base_url: &str, request_url: &str, resource_type: ResourceType) -> CheckResult {
        self.explain_url(base_url, request_url, resource_type).0
    }

    /// Aggregated verdict with the deciding profile and rule text.
    pub fn explain_url(
        &self,
        base_url: &str,
        request_url: &str,
        resource_type: ResourceType,
    ) -> (CheckResult, Option<(String, String)>) {
        let mut blocked = None;

        for (name, profile) in &self.profiles {
            let (result, filter) = profile.explain_url(base_url, request_url, resource_type);
            let decided_by = filter.map(|filter| (name.clone(), filter));
            match result {
                CheckResult::Allow => return (CheckResult::Allow, decided_by),
                CheckResult::Block if blocked.is_none() => blocked = Some(decided_by),
                _ => {}
            }
        }

        match blocked {
            Some(decided_by) => (CheckResult::Block, decided_by),
            None => (CheckResult::NoMatch, None),
        }
    }

    /// Union of every profile's hidden selectors for `domain`.
    pub fn hidden_selectors(&self, domain: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.profiles
            .values()
            .flat_map(|profile| profile.hidden_selectors(domain))
            .filter(|selector| seen.insert(selector.clone()))
            .collect()
    }

    pub fn option_changed(&self, option: ProfileOption) {
        for profile in self.profiles.values() {
            profile.option_changed(option);
        }
    }

    /// Profiles whose list file is missing or past its expiry.
    pub fn stale_profiles(&self, now: SystemTime) -> Vec<Arc<ContentBlockingProfile>> {
        self.profiles
            .values()
            .filter(|profile| profile.is_stale(now))
            .cloned()
            .collect()
    }

    /// Start downloads for stale profiles that have an update URL.
    pub fn update_stale<T: Transport>(&self, transport: &T, now: SystemTime) -> Vec<(String, DownloadHandle)> {
        self.stale_profiles(now)
            .iter()
            .filter_map(|profile| profile.download_rules(transport).map(|handle| (profile.name(), handle)))
            .collect()
    }

    /// Start downloads for every profile that has an update URL.
    pub fn update_all<T: Transport>(&self, transport: &T) -> Vec<(String, DownloadHandle)> {
        self.profiles
            .iter()
            .filter_map(|(name, profile)| profile.download_rules(transport).map(|handle| (name.clone(), handle)))
            .collect()
    }
}
