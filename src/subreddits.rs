use once_cell::sync::Lazy;
use regex::Regex;

static SUBREDDIT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_]{2,20}$").expect("valid subreddit regex"));

pub const INVALID_NAME_MESSAGE: &str =
    "Invalid subreddit name. Must be 3-21 characters and contain only letters, numbers, and underscores.";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("{}", INVALID_NAME_MESSAGE)]
    InvalidName(String),
    #[error("subreddit input is locked until the form is reset")]
    Locked,
}

pub fn is_valid_name(name: &str) -> bool {
    SUBREDDIT_NAME.is_match(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    Added,
    AlreadySelected,
}

/// Subreddits picked for a duplicate check, plus the confirm gate that
/// unlocks submission.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    names: Vec<String>,
    locked: bool,
    confirmed: bool,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, raw: &str) -> Result<AddOutcome, SelectionError> {
        if self.locked {
            return Err(SelectionError::Locked);
        }
        let name = raw.trim();
        if !is_valid_name(name) {
            return Err(SelectionError::InvalidName(name.to_string()));
        }
        if self.contains(name) {
            return Ok(AddOutcome::AlreadySelected);
        }
        self.names.push(name.to_string());
        Ok(AddOutcome::Added)
    }

    /// Removing always drops the confirmation, so the check stays disabled
    /// until the user confirms again.
    pub fn remove(&mut self, name: &str) -> bool {
        let before = self.names.len();
        self.names.retain(|existing| existing != name);
        self.confirmed = false;
        self.names.len() != before
    }

    pub fn confirm(&mut self) -> bool {
        if self.names.is_empty() {
            return false;
        }
        self.locked = true;
        self.confirmed = true;
        true
    }

    pub fn reset(&mut self) {
        self.names.clear();
        self.locked = false;
        self.confirmed = false;
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|existing| existing == name)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn is_confirmed(&self) -> bool {
        self.confirmed
    }

    pub fn input_enabled(&self) -> bool {
        !self.locked
    }

    pub fn confirm_enabled(&self) -> bool {
        !self.confirmed && !self.names.is_empty()
    }
}
