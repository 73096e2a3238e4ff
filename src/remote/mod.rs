//! Remote knowledge sources
//!
//! The authoritative knowledge lives behind a remote service. The sync engine
//! only sees it through [`RemoteSource`]; [`HttpRemote`] is the blocking HTTP
//! adapter used by the CLI.

pub mod http;

pub use http::HttpRemote;

use crate::Result;
use crate::knowledge::Payload;

/// A remote supplier of connectivity knowledge.
///
/// Calls are blocking and made in order; implementations own any rate
/// limiting or retry policy. Failures to reach or authenticate against the
/// remote are reported as [`crate::Error::RemoteUnavailable`].
pub trait RemoteSource {
    /// Resolve the effective knowledge source id, optionally pinned to a release version
    fn resolve_source(&mut self, version: Option<&str>) -> Result<String>;

    /// Entity ids of every connectivity path in the resolved source, in remote order
    fn connectivity_paths(&mut self) -> Result<Vec<String>>;

    /// Knowledge payload for one entity
    fn entity_knowledge(&mut self, entity: &str) -> Result<Payload>;
}
