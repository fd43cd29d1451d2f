use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::ImageReader;

use crate::source::UrlKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    File(FilePreview),
    Url { url: String, kind: UrlKind },
}

impl Preview {
    pub fn label(&self) -> String {
        match self {
            Preview::File(file) => file.summary(),
            Preview::Url { url, .. } => url.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePreview {
    pub path: PathBuf,
    pub file_name: String,
    pub mime: String,
    pub size_bytes: u64,
    pub dimensions: Option<(u32, u32)>,
}

impl FilePreview {
    pub fn summary(&self) -> String {
        let dims = self
            .dimensions
            .map(|(w, h)| format!("{w}x{h}, "))
            .unwrap_or_default();
        format!(
            "{} ({}{}, {})",
            self.file_name,
            dims,
            self.mime,
            human_size(self.size_bytes)
        )
    }
}

/// Reads the file and probes it. Called off the UI thread.
pub fn load_file(path: &Path) -> Result<FilePreview> {
    let bytes =
        fs::read(path).with_context(|| format!("preview: read {}", path.display()))?;
    let mime = tree_magic_mini::from_u8(&bytes).to_string();
    let dimensions = ImageReader::new(Cursor::new(&bytes))
        .with_guessed_format()
        .ok()
        .and_then(|reader| reader.into_dimensions().ok());
    Ok(FilePreview {
        path: path.to_path_buf(),
        file_name: file_name(path),
        mime,
        size_bytes: bytes.len() as u64,
        dimensions,
    })
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string())
}

fn human_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let value = bytes as f64;
    if value >= KIB * KIB {
        format!("{:.1} MiB", value / (KIB * KIB))
    } else if value >= KIB {
        format!("{:.1} KiB", value / KIB)
    } else {
        format!("{bytes} B")
    }
}
