use std::path::PathBuf;
use std::time::Duration;

use reqwest::header::{ACCEPT, USER_AGENT};
use url::Url;

use crate::error::ScheduleError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Where the schedule page comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Url(Url),
    File(PathBuf),
}

impl Source {
    /// `http://` and `https://` locations are fetched; anything else is a path.
    pub fn parse(location: &str) -> Self {
        match Url::parse(location) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => Source::Url(url),
            _ => Source::File(PathBuf::from(location)),
        }
    }

    pub async fn read(&self) -> Result<String, ScheduleError> {
        match self {
            Source::Url(url) => fetch_html(url).await,
            Source::File(path) => {
                std::fs::read_to_string(path).map_err(|source| ScheduleError::ReadSource {
                    path: path.clone(),
                    source,
                })
            }
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Source::Url(url) => write!(f, "{url}"),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

async fn fetch_html(url: &Url) -> Result<String, ScheduleError> {
    let fetch_err = |source| ScheduleError::Fetch {
        url: url.to_string(),
        source,
    };

    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(fetch_err)?;

    let response = client
        .get(url.clone())
        .header(USER_AGENT, concat!("skedcal/", env!("CARGO_PKG_VERSION")))
        .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
        .send()
        .await
        .map_err(fetch_err)?;

    let status = response.status();
    if !status.is_success() {
        return Err(ScheduleError::HttpStatus {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let html = response.text().await.map_err(fetch_err)?;
    tracing::debug!(%url, bytes = html.len(), "fetched schedule page");
    Ok(html)
}
