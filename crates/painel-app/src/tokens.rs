// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RequestKind {
    Indicators,
    Dashboard,
    Structure,
    Upload,
    Save,
}

impl RequestKind {
    pub const ALL: [Self; 5] = [
        Self::Indicators,
        Self::Dashboard,
        Self::Structure,
        Self::Upload,
        Self::Save,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Indicators => "indicators",
            Self::Dashboard => "dashboard",
            Self::Structure => "structure",
            Self::Upload => "upload",
            Self::Save => "save",
        }
    }

    const fn slot(self) -> usize {
        match self {
            Self::Indicators => 0,
            Self::Dashboard => 1,
            Self::Structure => 2,
            Self::Upload => 3,
            Self::Save => 4,
        }
    }
}

/// Identifies one issued request. A completion is applied only while its
/// token is still the latest one issued for the same kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestToken {
    kind: RequestKind,
    seq: u64,
}

impl RequestToken {
    pub const fn new(kind: RequestKind, seq: u64) -> Self {
        Self { kind, seq }
    }

    pub const fn kind(self) -> RequestKind {
        self.kind
    }

    pub const fn seq(self) -> u64 {
        self.seq
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestTokens {
    latest: [u64; 5],
}

impl RequestTokens {
    pub fn issue(&mut self, kind: RequestKind) -> RequestToken {
        let slot = &mut self.latest[kind.slot()];
        *slot = slot.saturating_add(1);
        RequestToken::new(kind, *slot)
    }

    pub fn latest(&self, kind: RequestKind) -> Option<RequestToken> {
        match self.latest[kind.slot()] {
            0 => None,
            seq => Some(RequestToken::new(kind, seq)),
        }
    }

    pub fn is_current(&self, token: RequestToken) -> bool {
        self.latest[token.kind.slot()] == token.seq
    }
}

#[cfg(test)]
mod tests {
    use super::{RequestKind, RequestTokens};

    #[test]
    fn newer_token_supersedes_older_one_of_same_kind() {
        let mut tokens = RequestTokens::default();
        let first = tokens.issue(RequestKind::Indicators);
        let second = tokens.issue(RequestKind::Indicators);

        assert!(!tokens.is_current(first));
        assert!(tokens.is_current(second));
        assert_eq!(tokens.latest(RequestKind::Indicators), Some(second));
    }

    #[test]
    fn kinds_are_tracked_independently() {
        let mut tokens = RequestTokens::default();
        let indicators = tokens.issue(RequestKind::Indicators);
        let dashboard = tokens.issue(RequestKind::Dashboard);

        assert!(tokens.is_current(indicators));
        assert!(tokens.is_current(dashboard));
        assert_eq!(tokens.latest(RequestKind::Save), None);
        assert_eq!(RequestKind::ALL.len(), 5);
    }
}
