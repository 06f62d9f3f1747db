//! Beat envelope: the `{hostname, name, version}` object attached to
//! every shipped document.
//!
//! Grounded in `utils/beat.cpp`, which exposes this through a process-wide
//! singleton (`beat::Instance()`); re-architected per the Design Note on
//! global configuration as a plain value constructed once in `main` and
//! threaded through to the indexer stage by reference.

use serde::Serialize;

/// `beat.{hostname, name, version}`, identical values for `hostname` and
/// `name` (matching the original's `name = hostname`).
#[derive(Debug, Clone, Serialize)]
pub struct BeatInfo {
    pub hostname: String,
    pub name: String,
    pub version: String,
}

impl BeatInfo {
    /// Resolves the local hostname once, at startup.
    pub fn current(version: &str) -> BeatInfo {
        let hostname = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .unwrap_or_else(|| "unknown".to_string());
        BeatInfo {
            name: hostname.clone(),
            hostname,
            version: version.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_matches_hostname() {
        let beat = BeatInfo::current("1.2.3");
        assert_eq!(beat.name, beat.hostname);
        assert_eq!(beat.version, "1.2.3");
    }
}
