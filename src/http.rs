use std::io::Read;
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};

use crate::error::HcpError;

/// An open response body plus the advertised size, if any.
pub struct Download {
    pub content_length: Option<u64>,
    pub body: Box<dyn Read + Send>,
}

pub trait ArchiveClient: Send + Sync {
    /// Issues the request. A non-success status is an error, never an empty
    /// body.
    fn open(&self, url: &str) -> Result<Download, HcpError>;
}

impl<T: ArchiveClient + ?Sized> ArchiveClient for &T {
    fn open(&self, url: &str) -> Result<Download, HcpError> {
        (**self).open(url)
    }
}

#[derive(Clone)]
pub struct HttpArchiveClient {
    client: Client,
}

impl HttpArchiveClient {
    /// No overall deadline: the archives run to several hundred megabytes.
    pub fn new() -> Result<Self, HcpError> {
        Self::with_timeout(None)
    }

    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self, HcpError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("hcp-nma/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| HcpError::Http(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .connect_timeout(Duration::from_secs(30))
            .timeout(timeout)
            .build()
            .map_err(|err| HcpError::Http(err.to_string()))?;
        Ok(Self { client })
    }
}

impl ArchiveClient for HttpArchiveClient {
    fn open(&self, url: &str) -> Result<Download, HcpError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| HcpError::Http(err.to_string()))?;
        let response = handle_status(response)?;
        Ok(Download {
            content_length: response.content_length(),
            body: Box::new(response),
        })
    }
}

fn handle_status(
    response: reqwest::blocking::Response,
) -> Result<reqwest::blocking::Response, HcpError> {
    check_status(response.status(), response.url().as_str())?;
    Ok(response)
}

/// Any non-2xx status is a `RemoteStatus` error.
pub fn check_status(status: StatusCode, url: &str) -> Result<(), HcpError> {
    if status.is_success() {
        return Ok(());
    }
    Err(HcpError::RemoteStatus {
        status: status.as_u16(),
        url: url.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn success_statuses_pass() {
        assert!(check_status(StatusCode::OK, "https://osf.io/bqp7m/download/").is_ok());
        assert!(check_status(StatusCode::NO_CONTENT, "https://osf.io/x").is_ok());
    }

    #[test]
    fn other_statuses_are_remote_errors() {
        for status in [
            StatusCode::NOT_FOUND,
            StatusCode::INTERNAL_SERVER_ERROR,
            StatusCode::FOUND,
        ] {
            let err = check_status(status, "https://osf.io/s4h8j/download/").unwrap_err();
            assert!(err.is_network());
            assert!(!matches!(err, HcpError::Http(_)));
            assert_matches!(
                err,
                HcpError::RemoteStatus { status: code, url }
                    if code == status.as_u16() && url == "https://osf.io/s4h8j/download/"
            );
        }
    }
}
