use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::api::{self, ApiError, Submission};
use crate::report::ReportRequest;
use crate::results::ResultPost;

pub trait DuplicateService: Send + Sync {
    fn check_duplicates(&self, submission: Submission) -> Result<Vec<ResultPost>, ApiError>;
}

pub trait ReportService: Send + Sync {
    fn report(&self, request: &ReportRequest) -> Result<(), ApiError>;
}

pub struct HttpDuplicateService {
    client: Arc<api::Client>,
}

impl HttpDuplicateService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl DuplicateService for HttpDuplicateService {
    fn check_duplicates(&self, submission: Submission) -> Result<Vec<ResultPost>, ApiError> {
        self.client.check_duplicates(submission)
    }
}

pub struct HttpReportService {
    client: Arc<api::Client>,
}

impl HttpReportService {
    pub fn new(client: Arc<api::Client>) -> Self {
        Self { client }
    }
}

impl ReportService for HttpReportService {
    fn report(&self, request: &ReportRequest) -> Result<(), ApiError> {
        let ack = self.client.report(request)?;
        if let Some(message) = ack.message {
            tracing::info!(post_id = %request.post_id, %message, "report accepted");
        }
        Ok(())
    }
}

/// Canned backend used when no server is reachable and in tests.
#[derive(Default)]
pub struct MockDuplicateService {
    results: Vec<ResultPost>,
    failure: Option<(u16, String)>,
    calls: AtomicUsize,
}

impl MockDuplicateService {
    pub fn with_results(results: Vec<ResultPost>) -> Self {
        Self {
            results,
            ..Self::default()
        }
    }

    pub fn failing(status: u16, message: impl Into<String>) -> Self {
        Self {
            failure: Some((status, message.into())),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DuplicateService for MockDuplicateService {
    fn check_duplicates(&self, _submission: Submission) -> Result<Vec<ResultPost>, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.failure {
            Some((status, message)) => Err(ApiError::Server {
                status: *status,
                message: message.clone(),
                details: None,
            }),
            None => Ok(self.results.clone()),
        }
    }
}

#[derive(Default)]
pub struct MockReportService {
    calls: AtomicUsize,
}

impl MockReportService {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ReportService for MockReportService {
    fn report(&self, _request: &ReportRequest) -> Result<(), ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub fn sample_results() -> Vec<ResultPost> {
    vec![
        ResultPost {
            id: "t3_later".into(),
            title: "Sunset over the bay (OC)".into(),
            date: "2024-02-11T18:04:00".into(),
            author: "reposter".into(),
            image_url: "https://i.redd.it/sunset.jpg".into(),
            reddit_url: "https://reddit.com/r/pics/comments/later/".into(),
            subreddit: Some("pics".into()),
        },
        ResultPost {
            id: "t3_first".into(),
            title: "Sunset over the bay".into(),
            date: "2024-01-03T07:45:00".into(),
            author: "photographer".into(),
            image_url: "https://i.redd.it/sunset.jpg".into(),
            reddit_url: "https://reddit.com/r/EarthPorn/comments/first/".into(),
            subreddit: Some("EarthPorn".into()),
        },
    ]
}
