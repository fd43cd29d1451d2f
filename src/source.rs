use std::path::{Path, PathBuf};

use url::Url;

pub const IMAGE_EXTENSIONS: [&str; 5] = [".jpg", ".jpeg", ".gif", ".png", ".webp"];

pub const SUPPORTED_DOMAINS: [&str; 9] = [
    "reddit.com",
    "i.redd.it",
    "preview.redd.it",
    "imgur.com",
    "i.imgur.com",
    "gfycat.com",
    "media.discordapp.net",
    "cdn.discordapp.com",
    "pbs.twimg.com",
];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("Please provide a valid image URL (.jpg, .jpeg, .png, .gif, .webp) or Reddit post URL")]
    UnsupportedUrl(String),
    #[error("Invalid file type")]
    UnsupportedFile { path: PathBuf },
}

impl SourceError {
    pub fn details(&self) -> Option<String> {
        match self {
            SourceError::UnsupportedUrl(_) => None,
            SourceError::UnsupportedFile { .. } => Some(format!(
                "Allowed file types are: {}",
                IMAGE_EXTENSIONS.join(", ")
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    RedditPost,
    DirectImage,
}

pub fn classify(raw: &str) -> Result<UrlKind, SourceError> {
    let unsupported = || SourceError::UnsupportedUrl(raw.to_string());
    let url = Url::parse(raw.trim()).map_err(|_| unsupported())?;
    if is_reddit_post(&url) {
        return Ok(UrlKind::RedditPost);
    }
    if is_direct_image(&url) {
        return Ok(UrlKind::DirectImage);
    }
    Err(unsupported())
}

/// Check used for the live URL preview: only direct image links preview.
pub fn previews_as_image(raw: &str) -> bool {
    Url::parse(raw.trim())
        .map(|url| is_direct_image(&url))
        .unwrap_or(false)
}

fn is_reddit_post(url: &Url) -> bool {
    let host = url.host_str().unwrap_or_default();
    host.contains("reddit.com") && url.path().contains("/comments/")
}

fn is_direct_image(url: &Url) -> bool {
    let Some(host) = url.host_str() else {
        return false;
    };
    let host = host.to_ascii_lowercase();
    let allowed = SUPPORTED_DOMAINS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{domain}")));
    allowed || has_image_extension(url.path())
}

pub fn has_image_extension(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

pub fn check_file(path: &Path) -> Result<(), SourceError> {
    let name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    if has_image_extension(&name) {
        Ok(())
    } else {
        Err(SourceError::UnsupportedFile {
            path: path.to_path_buf(),
        })
    }
}

/// The single image source driving the preview. File and URL replace each
/// other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ImageInput {
    #[default]
    Empty,
    File(PathBuf),
    Url(String),
}

impl ImageInput {
    pub fn file(&self) -> Option<&Path> {
        match self {
            ImageInput::File(path) => Some(path.as_path()),
            _ => None,
        }
    }

    pub fn url(&self) -> Option<&str> {
        match self {
            ImageInput::Url(url) => Some(url.as_str()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ImageInput::Empty)
    }
}
