//! The form controller: every piece of state behind the duplicate-check
//! form, independent of how it is drawn.
//!
//! Front-ends call the operations in response to input, hand the returned
//! tickets (`PendingCheck`, `PendingPreview`, `PendingReport`) to a worker,
//! and feed the outcomes back through the matching `finish_*` call. Each
//! ticket carries a generation so outcomes that arrive after a reset or a
//! newer request are dropped.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;

use crate::api::{ApiError, ImagePayload, Submission};
use crate::data::{DuplicateService, ReportService};
use crate::preview::{self, FilePreview, Preview};
use crate::progress::Simulation;
use crate::report::{ModalPhase, ReportModal, ReportReason};
use crate::results::{ResultPost, ResultsView, RENDER_ERROR_MESSAGE};
use crate::source::{self, ImageInput, SourceError, UrlKind};
use crate::subreddits::{AddOutcome, Selection, SelectionError};

#[derive(Debug, Clone)]
pub struct Settings {
    pub image_step_delay: Duration,
    pub reddit_step_delay: Duration,
    pub report_dismiss_after: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_step_delay: Duration::from_secs(1),
            reddit_step_delay: Duration::from_secs(2),
            report_dismiss_after: Duration::from_millis(1500),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("A duplicate check is already running")]
    Busy,
    #[error("Please add and confirm at least one subreddit")]
    NoSubreddits,
    #[error("Please confirm your subreddits before checking")]
    NotConfirmed,
    #[error("Please provide an image file, image URL, or Reddit post URL")]
    NoImage,
    #[error(transparent)]
    Source(#[from] SourceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Submitting { generation: u64 },
    Rendered,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub message: String,
    pub details: Option<String>,
}

impl Banner {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
        }
    }

    fn with_details(message: impl Into<String>, details: Option<String>) -> Self {
        Self {
            message: message.into(),
            details,
        }
    }
}

/// Which controls accept input right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Controls {
    pub subreddit_input: bool,
    pub add: bool,
    pub confirm: bool,
    pub check: bool,
    pub reset_visible: bool,
    pub clear_preview: bool,
}

pub struct PendingCheck {
    pub generation: u64,
    pub submission: Submission,
    service: Arc<dyn DuplicateService>,
}

impl PendingCheck {
    pub fn run(self) -> CheckOutcome {
        let result = self.service.check_duplicates(self.submission);
        CheckOutcome {
            generation: self.generation,
            result,
        }
    }
}

pub struct CheckOutcome {
    pub generation: u64,
    pub result: Result<Vec<ResultPost>, ApiError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingPreview {
    pub generation: u64,
    pub path: PathBuf,
}

impl PendingPreview {
    pub fn run(self) -> PreviewOutcome {
        PreviewOutcome {
            generation: self.generation,
            result: preview::load_file(&self.path),
        }
    }
}

pub struct PreviewOutcome {
    pub generation: u64,
    pub result: Result<FilePreview>,
}

pub struct PendingReport {
    pub generation: u64,
    pub request: crate::report::ReportRequest,
    service: Arc<dyn ReportService>,
}

impl PendingReport {
    pub fn run(self) -> ReportOutcome {
        let result = self.service.report(&self.request);
        ReportOutcome {
            generation: self.generation,
            result,
        }
    }
}

pub struct ReportOutcome {
    pub generation: u64,
    pub result: Result<(), ApiError>,
}

pub struct FormController {
    settings: Settings,
    selection: Selection,
    input: ImageInput,
    preview: Option<Preview>,
    preview_generation: u64,
    banner: Option<Banner>,
    results: Option<ResultsView>,
    progress: Option<Simulation>,
    phase: Phase,
    generation: u64,
    report: Option<ReportModal>,
    report_generation: u64,
    duplicates: Arc<dyn DuplicateService>,
    reports: Arc<dyn ReportService>,
}

impl FormController {
    pub fn new(
        settings: Settings,
        duplicates: Arc<dyn DuplicateService>,
        reports: Arc<dyn ReportService>,
    ) -> Self {
        Self {
            settings,
            selection: Selection::new(),
            input: ImageInput::Empty,
            preview: None,
            preview_generation: 0,
            banner: None,
            results: None,
            progress: None,
            phase: Phase::Idle,
            generation: 0,
            report: None,
            report_generation: 0,
            duplicates,
            reports,
        }
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn input(&self) -> &ImageInput {
        &self.input
    }

    pub fn preview(&self) -> Option<&Preview> {
        self.preview.as_ref()
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    pub fn results(&self) -> Option<&ResultsView> {
        self.results.as_ref()
    }

    pub fn progress(&self) -> Option<&Simulation> {
        self.progress.as_ref()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn report(&self) -> Option<&ReportModal> {
        self.report.as_ref()
    }

    pub fn in_flight(&self) -> bool {
        matches!(self.phase, Phase::Submitting { .. })
    }

    pub fn controls(&self) -> Controls {
        Controls {
            subreddit_input: self.selection.input_enabled(),
            add: self.selection.input_enabled(),
            confirm: self.selection.confirm_enabled(),
            check: self.selection.is_confirmed() && !self.in_flight(),
            reset_visible: self.selection.is_locked(),
            clear_preview: self.preview.is_some() || !self.input.is_empty(),
        }
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    /// Returns true when the name is now part of the selection.
    pub fn add_subreddit(&mut self, raw: &str) -> bool {
        match self.selection.add(raw) {
            Ok(AddOutcome::Added) => {
                tracing::debug!(name = raw.trim(), "subreddit added");
                true
            }
            Ok(AddOutcome::AlreadySelected) => true,
            Err(err @ SelectionError::InvalidName(_)) => {
                self.banner = Some(Banner::new(err.to_string()));
                false
            }
            Err(SelectionError::Locked) => false,
        }
    }

    pub fn remove_subreddit(&mut self, name: &str) {
        if self.selection.remove(name) {
            tracing::debug!(name, "subreddit removed");
        }
    }

    pub fn confirm_subreddits(&mut self) -> bool {
        let confirmed = self.selection.confirm();
        if confirmed {
            tracing::info!(subreddits = ?self.selection.names(), "subreddits confirmed");
        }
        confirmed
    }

    /// A non-empty URL replaces any selected file. The preview only shows
    /// for text that passes the direct-image check.
    pub fn set_url(&mut self, text: &str) {
        let url = text.trim();
        self.preview_generation += 1;
        if url.is_empty() {
            if self.input.url().is_some() {
                self.input = ImageInput::Empty;
                self.preview = None;
            }
            return;
        }
        self.input = ImageInput::Url(url.to_string());
        self.preview = source::previews_as_image(url).then(|| Preview::Url {
            url: url.to_string(),
            kind: source::classify(url).unwrap_or(UrlKind::DirectImage),
        });
    }

    /// Selecting a file clears the URL; the preview is filled in by
    /// `finish_preview` once the returned ticket has run.
    pub fn select_file(&mut self, path: impl Into<PathBuf>) -> Option<PendingPreview> {
        let path = path.into();
        if let Err(err) = source::check_file(&path) {
            self.banner = Some(Banner::with_details(err.to_string(), err.details()));
            return None;
        }
        self.preview_generation += 1;
        self.input = ImageInput::File(path.clone());
        self.preview = None;
        Some(PendingPreview {
            generation: self.preview_generation,
            path,
        })
    }

    pub fn finish_preview(&mut self, outcome: PreviewOutcome) -> bool {
        if outcome.generation != self.preview_generation || self.input.file().is_none() {
            tracing::debug!(generation = outcome.generation, "dropping stale preview");
            return false;
        }
        match outcome.result {
            Ok(file) => self.preview = Some(Preview::File(file)),
            Err(err) => {
                self.preview = None;
                self.banner = Some(Banner::with_details(
                    "Could not read the selected image",
                    Some(format!("{err:#}")),
                ));
            }
        }
        true
    }

    pub fn clear_preview(&mut self) {
        self.preview_generation += 1;
        self.input = ImageInput::Empty;
        self.preview = None;
    }

    fn validate(&self) -> Result<(ImagePayload, bool), ValidationError> {
        if self.selection.is_empty() {
            return Err(ValidationError::NoSubreddits);
        }
        if !self.selection.is_confirmed() {
            return Err(ValidationError::NotConfirmed);
        }
        match &self.input {
            ImageInput::Empty => Err(ValidationError::NoImage),
            ImageInput::File(path) => Ok((ImagePayload::File(path.clone()), false)),
            ImageInput::Url(url) => {
                let kind = source::classify(url)?;
                Ok((ImagePayload::Url(url.clone()), kind == UrlKind::RedditPost))
            }
        }
    }

    pub fn submit(&mut self, now: Instant) -> Result<PendingCheck, ValidationError> {
        if self.in_flight() {
            tracing::info!("submission refused while a check is in flight");
            return Err(ValidationError::Busy);
        }
        self.banner = None;
        let (image, reddit_url) = match self.validate() {
            Ok(valid) => valid,
            Err(err) => {
                tracing::info!(error = %err, "submission rejected");
                self.banner = Some(Banner::new(err.to_string()));
                return Err(err);
            }
        };

        self.generation += 1;
        self.phase = Phase::Submitting {
            generation: self.generation,
        };
        self.results = None;
        let delay = if reddit_url {
            self.settings.reddit_step_delay
        } else {
            self.settings.image_step_delay
        };
        self.progress = Some(Simulation::start(reddit_url, delay, now));
        tracing::info!(
            generation = self.generation,
            reddit_url,
            subreddits = self.selection.len(),
            "submitting duplicate check"
        );

        Ok(PendingCheck {
            generation: self.generation,
            submission: Submission {
                image,
                subreddits: self.selection.names().to_vec(),
            },
            service: self.duplicates.clone(),
        })
    }

    /// Applies a finished check. Returns false when the outcome belongs to
    /// a request that is no longer current.
    pub fn finish_check(&mut self, outcome: CheckOutcome) -> bool {
        if self.phase != (Phase::Submitting {
            generation: outcome.generation,
        }) {
            tracing::debug!(generation = outcome.generation, "dropping stale check result");
            return false;
        }
        self.progress = None;

        let posts = match outcome.result {
            Ok(posts) => posts,
            Err(err) => {
                tracing::warn!(error = %err, "duplicate check failed");
                self.banner = Some(Banner::with_details(
                    err.to_string(),
                    err.details().map(str::to_string),
                ));
                self.results = None;
                self.phase = Phase::Failed;
                return true;
            }
        };

        match ResultsView::build(posts) {
            Ok(view) => {
                tracing::info!(cards = view.cards().len(), "results rendered");
                self.results = Some(view);
                self.phase = Phase::Rendered;
            }
            Err(err) => {
                tracing::warn!(error = %err, "could not render results");
                self.banner = Some(Banner::with_details(
                    RENDER_ERROR_MESSAGE,
                    Some(err.to_string()),
                ));
                self.results = None;
                self.phase = Phase::Failed;
            }
        }
        true
    }

    /// Advances timers. Returns true when anything visible changed.
    pub fn tick(&mut self, now: Instant) -> bool {
        let mut changed = false;
        if let Some(progress) = self.progress.as_mut() {
            changed |= progress.tick(now);
        }
        let dismiss = self
            .report
            .as_ref()
            .map(|modal| modal.should_dismiss(now, self.settings.report_dismiss_after))
            .unwrap_or(false);
        if dismiss {
            self.report = None;
            changed = true;
        }
        changed
    }

    pub fn reset(&mut self) {
        self.selection.reset();
        self.input = ImageInput::Empty;
        self.preview = None;
        self.preview_generation += 1;
        self.banner = None;
        self.results = None;
        self.progress = None;
        self.report = None;
        self.report_generation += 1;
        if let Phase::Submitting { generation } = self.phase {
            tracing::info!(generation, "reset while a check was in flight");
        }
        self.generation += 1;
        self.phase = Phase::Idle;
    }

    pub fn open_report(&mut self, post_id: &str) -> bool {
        let known = self
            .results
            .as_ref()
            .map(|view| view.cards().iter().any(|card| card.post_id == post_id))
            .unwrap_or(false);
        if known {
            self.report = Some(ReportModal::open(post_id));
        }
        known
    }

    pub fn select_report_reason(&mut self, reason: ReportReason) {
        if let Some(modal) = self.report.as_mut() {
            modal.select(reason);
        }
    }

    pub fn report_details_mut(&mut self) -> Option<&mut String> {
        self.report
            .as_mut()
            .filter(|modal| modal.details_visible())
            .map(|modal| &mut modal.details)
    }

    pub fn close_report(&mut self) {
        self.report = None;
        self.report_generation += 1;
    }

    pub fn submit_report(&mut self) -> Option<PendingReport> {
        let modal = self.report.as_mut()?;
        if matches!(
            modal.phase,
            ModalPhase::Submitting { .. } | ModalPhase::Succeeded { .. }
        ) {
            return None;
        }
        let request = match modal.request() {
            Ok(request) => request,
            Err(err) => {
                modal.phase = ModalPhase::Failed(err.to_string());
                return None;
            }
        };
        self.report_generation += 1;
        modal.phase = ModalPhase::Submitting {
            generation: self.report_generation,
        };
        tracing::info!(post_id = %request.post_id, reason = request.reason.as_str(), "reporting post");
        Some(PendingReport {
            generation: self.report_generation,
            request,
            service: self.reports.clone(),
        })
    }

    pub fn finish_report(&mut self, outcome: ReportOutcome, now: Instant) -> bool {
        let Some(modal) = self.report.as_mut() else {
            return false;
        };
        if modal.phase != (ModalPhase::Submitting {
            generation: outcome.generation,
        }) {
            return false;
        }
        modal.phase = match outcome.result {
            Ok(()) => ModalPhase::Succeeded { at: now },
            Err(err) => {
                tracing::warn!(error = %err, "report failed");
                ModalPhase::Failed(err.to_string())
            }
        };
        true
    }
}
