use std::path::PathBuf;
use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::USER_AGENT;
use serde::Deserialize;
use url::Url;

use crate::preview;
use crate::report::ReportRequest;
use crate::results::ResultPost;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";
pub const CHECK_PATH: &str = "/api/check-duplicates";
pub const REPORT_PATH: &str = "/api/report";

const CHECK_FALLBACK: &str = "Failed to check duplicates";
const REPORT_FALLBACK: &str = "Failed to report post";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        details: Option<String>,
    },
    #[error("{0}")]
    Rejected(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("could not read {}: {source}", path.display())]
    File {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl ApiError {
    pub fn details(&self) -> Option<&str> {
        match self {
            ApiError::Server { details, .. } => details.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImagePayload {
    File(PathBuf),
    Url(String),
}

/// Everything sent with one duplicate check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub image: ImagePayload,
    pub subreddits: Vec<String>,
}

impl Submission {
    fn into_form(self) -> Result<Form, ApiError> {
        let mut form = match self.image {
            ImagePayload::Url(url) => Form::new().text("image_url", url),
            ImagePayload::File(path) => {
                let bytes = std::fs::read(&path).map_err(|source| ApiError::File {
                    path: path.clone(),
                    source,
                })?;
                let mime = tree_magic_mini::from_u8(&bytes);
                let part = Part::bytes(bytes)
                    .file_name(preview::file_name(&path))
                    .mime_str(mime)?;
                Form::new().part("image", part)
            }
        };
        for name in self.subreddits {
            form = form.text("subreddit[]", name);
        }
        Ok(form)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Option<Duration>,
    pub http_client: Option<HttpClient>,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    results: Vec<ResultPost>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    details: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReportAck {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Blocking client for the duplicate-check backend.
pub struct Client {
    http: HttpClient,
    user_agent: String,
    base_url: Url,
}

impl Client {
    pub fn new(config: ClientConfig) -> anyhow::Result<Self> {
        if config.user_agent.trim().is_empty() {
            anyhow::bail!("api client user agent required");
        }
        let base = if config.base_url.trim().is_empty() {
            DEFAULT_BASE_URL.to_string()
        } else {
            config.base_url
        };
        let base_url = Url::parse(&base)?;
        let http = match config.http_client {
            Some(client) => client,
            None => HttpClient::builder()
                .timeout(config.timeout.unwrap_or(Duration::from_secs(60)))
                .build()?,
        };
        Ok(Client {
            http,
            user_agent: config.user_agent,
            base_url,
        })
    }

    pub fn check_duplicates(&self, submission: Submission) -> Result<Vec<ResultPost>, ApiError> {
        let form = submission.into_form()?;
        let url = self.endpoint(CHECK_PATH);
        tracing::debug!(%url, "posting duplicate check");
        let resp = self
            .http
            .post(url)
            .header(USER_AGENT, &self.user_agent)
            .multipart(form)
            .send()?;
        let body = success_body(resp, CHECK_FALLBACK)?;
        let payload: CheckResponse = serde_json::from_str(&body)?;
        Ok(payload.results)
    }

    pub fn report(&self, request: &ReportRequest) -> Result<ReportAck, ApiError> {
        let url = self.endpoint(REPORT_PATH);
        tracing::debug!(%url, post_id = %request.post_id, "posting report");
        let resp = self
            .http
            .post(url)
            .header(USER_AGENT, &self.user_agent)
            .form(request)
            .send()?;
        let body = success_body(resp, REPORT_FALLBACK)?;
        let ack: ReportAck = if body.trim().is_empty() {
            ReportAck::default()
        } else {
            serde_json::from_str(&body)?
        };
        if ack.success == Some(false) {
            return Err(ApiError::Rejected(
                ack.error.unwrap_or_else(|| REPORT_FALLBACK.to_string()),
            ));
        }
        Ok(ack)
    }

    fn endpoint(&self, path: &str) -> Url {
        let mut url = self.base_url.clone();
        let joined = format!("{}{}", self.base_url.path().trim_end_matches('/'), path);
        url.set_path(&joined);
        url
    }
}

fn success_body(resp: Response, fallback: &str) -> Result<String, ApiError> {
    let status = resp.status();
    let body = resp.text()?;
    if status.is_success() {
        return Ok(body);
    }
    let parsed: ErrorBody = serde_json::from_str(&body).unwrap_or_default();
    tracing::warn!(status = status.as_u16(), error = ?parsed.error, "backend returned failure");
    Err(ApiError::Server {
        status: status.as_u16(),
        message: parsed.error.unwrap_or_else(|| fallback.to_string()),
        details: parsed.details.filter(|details| !details.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> Client {
        Client::new(ClientConfig {
            base_url: base.into(),
            user_agent: "repost-check-test".into(),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn endpoints_keep_base_path() {
        assert_eq!(
            client("http://localhost:5000").endpoint(CHECK_PATH).as_str(),
            "http://localhost:5000/api/check-duplicates"
        );
        assert_eq!(
            client("https://example.com/dupes/").endpoint(REPORT_PATH).as_str(),
            "https://example.com/dupes/api/report"
        );
    }

    #[test]
    fn user_agent_is_required() {
        let result = Client::new(ClientConfig {
            base_url: DEFAULT_BASE_URL.into(),
            user_agent: " ".into(),
            ..ClientConfig::default()
        });
        assert!(result.is_err());
    }

    #[test]
    fn missing_upload_is_a_file_error() {
        let submission = Submission {
            image: ImagePayload::File(PathBuf::from("/definitely/missing.png")),
            subreddits: vec!["pics".into()],
        };
        let err = submission.into_form().unwrap_err();
        assert!(matches!(err, ApiError::File { .. }));
    }
}
