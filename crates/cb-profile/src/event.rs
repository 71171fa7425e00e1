//! Profile notifications and options.

/// Broadcast to subscribers of a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEvent {
    /// The published rules were replaced after a successful update.
    Modified { name: String },
}

/// Options that affect how a profile compiles its list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileOption {
    EnableWildcards(bool),
}

/// Load state of a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileState {
    Unloaded,
    /// Title and list metadata known; no rules compiled
    HeaderLoaded,
    FullyLoaded,
}
