use std::time::{Duration, Instant};

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportReason {
    Spam,
    Rules,
    Harassment,
    Sharing,
    Copyright,
    Other,
}

impl ReportReason {
    pub const ALL: [ReportReason; 6] = [
        ReportReason::Spam,
        ReportReason::Rules,
        ReportReason::Harassment,
        ReportReason::Sharing,
        ReportReason::Copyright,
        ReportReason::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReportReason::Spam => "spam",
            ReportReason::Rules => "rules",
            ReportReason::Harassment => "harassment",
            ReportReason::Sharing => "sharing",
            ReportReason::Copyright => "copyright",
            ReportReason::Other => "other",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ReportReason::Spam => "Spam",
            ReportReason::Rules => "Breaks community rules",
            ReportReason::Harassment => "Harassment",
            ReportReason::Sharing => "Sharing personal information",
            ReportReason::Copyright => "Copyright violation",
            ReportReason::Other => "Other issues",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    #[error("Please select a reason for reporting")]
    MissingReason,
    #[error("Please describe the issue")]
    MissingDetails,
}

/// Body of `POST /api/report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRequest {
    pub post_id: String,
    pub reason: ReportReason,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalPhase {
    Editing,
    Submitting { generation: u64 },
    Succeeded { at: Instant },
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct ReportModal {
    pub post_id: String,
    pub reason: Option<ReportReason>,
    pub details: String,
    pub phase: ModalPhase,
}

impl ReportModal {
    pub fn open(post_id: impl Into<String>) -> Self {
        Self {
            post_id: post_id.into(),
            reason: None,
            details: String::new(),
            phase: ModalPhase::Editing,
        }
    }

    pub fn select(&mut self, reason: ReportReason) {
        self.reason = Some(reason);
        if matches!(self.phase, ModalPhase::Failed(_)) {
            self.phase = ModalPhase::Editing;
        }
    }

    pub fn details_visible(&self) -> bool {
        self.reason == Some(ReportReason::Other)
    }

    pub fn submit_enabled(&self) -> bool {
        self.reason.is_some() && matches!(self.phase, ModalPhase::Editing | ModalPhase::Failed(_))
    }

    pub fn request(&self) -> Result<ReportRequest, ReportError> {
        let reason = self.reason.ok_or(ReportError::MissingReason)?;
        let details = self.details.trim();
        if reason == ReportReason::Other && details.is_empty() {
            return Err(ReportError::MissingDetails);
        }
        Ok(ReportRequest {
            post_id: self.post_id.clone(),
            reason,
            details: (reason == ReportReason::Other).then(|| details.to_string()),
        })
    }

    pub fn should_dismiss(&self, now: Instant, dismiss_after: Duration) -> bool {
        match self.phase {
            ModalPhase::Succeeded { at } => now.saturating_duration_since(at) >= dismiss_after,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_is_required() {
        let modal = ReportModal::open("abc");
        assert!(!modal.submit_enabled());
        assert_eq!(modal.request(), Err(ReportError::MissingReason));
    }

    #[test]
    fn details_only_required_for_other() {
        let mut modal = ReportModal::open("abc");
        modal.select(ReportReason::Spam);
        modal.details = "ignored".into();
        assert!(!modal.details_visible());
        let request = modal.request().unwrap();
        assert_eq!(request.reason, ReportReason::Spam);
        assert_eq!(request.details, None);

        modal.select(ReportReason::Other);
        modal.details = "   ".into();
        assert!(modal.details_visible());
        assert_eq!(modal.request(), Err(ReportError::MissingDetails));

        modal.details = " stolen from my feed ".into();
        let request = modal.request().unwrap();
        assert_eq!(request.details.as_deref(), Some("stolen from my feed"));
    }

    #[test]
    fn success_dismisses_after_delay() {
        let now = Instant::now();
        let mut modal = ReportModal::open("abc");
        modal.phase = ModalPhase::Succeeded { at: now };
        let delay = Duration::from_millis(1500);
        assert!(!modal.should_dismiss(now + Duration::from_millis(1000), delay));
        assert!(modal.should_dismiss(now + delay, delay));
    }
}
