//! Blocking HTTP adapter for a remote knowledge service
//!
//! Endpoints, relative to the configured base URL:
//! - `GET release[?version=V]` -> `{"source": "..."}`
//! - `GET paths?source=S` -> `["path-id", ...]`
//! - `GET knowledge?source=S&entity=ID` -> knowledge payload object
//!
//! Every request carries the credential as the `api_key` query parameter.

use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use crate::knowledge::Payload;
use crate::{Error, Result};
use super::RemoteSource;

#[derive(Debug, Deserialize)]
struct ReleaseResponse {
    source: String,
}

pub struct HttpRemote {
    client: Client,
    base_url: String,
    api_key: String,
    source: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("kbsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(unavailable)?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            source: None,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn resolved_source(&self) -> Result<&str> {
        self.source.as_deref().ok_or_else(|| {
            Error::RemoteUnavailable("knowledge source has not been resolved".to_string())
        })
    }

    fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let url = self.endpoint(path);
        tracing::debug!("GET {}", url);

        let response = self.client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(query)
            .send()
            .map_err(unavailable)?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::RemoteUnavailable(format!("{} returned {}", url, status)));
        }
        response.json::<T>().map_err(unavailable)
    }
}

impl RemoteSource for HttpRemote {
    fn resolve_source(&mut self, version: Option<&str>) -> Result<String> {
        let query: Vec<(&str, &str)> = version.map(|v| ("version", v)).into_iter().collect();
        let release: ReleaseResponse = self.get_json("release", &query)?;
        self.source = Some(release.source.clone());
        Ok(release.source)
    }

    fn connectivity_paths(&mut self) -> Result<Vec<String>> {
        let source = self.resolved_source()?;
        self.get_json("paths", &[("source", source)])
    }

    fn entity_knowledge(&mut self, entity: &str) -> Result<Payload> {
        let source = self.resolved_source()?;
        self.get_json("knowledge", &[("source", source), ("entity", entity)])
    }
}

// reqwest errors carry the request URL, which includes the credential
fn unavailable(err: reqwest::Error) -> Error {
    Error::RemoteUnavailable(err.without_url().to_string())
}
