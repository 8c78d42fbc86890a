//! Images picked from disk or dropped onto the editor. Reading the file is
//! the one asynchronous step; insertion goes back through `image.insert`.

use std::io;
use std::path::{Path, PathBuf};

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde_json::json;

use crate::core::Selection;
use crate::editor::Editor;
use crate::plugin::CommandError;

#[derive(Debug, thiserror::Error)]
pub enum ImageLoadError {
    #[error("image file not found: {0}")]
    NotFound(PathBuf),
    #[error("{path} is not an image ({mime})")]
    NotAnImage { path: PathBuf, mime: String },
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Read `path` into a `data:` URL usable as an image `src`.
pub async fn read_image_data_url(path: impl AsRef<Path>) -> Result<String, ImageLoadError> {
    let path = path.as_ref();
    let mime = mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string();
    if !mime.starts_with("image/") {
        return Err(ImageLoadError::NotAnImage {
            path: path.to_path_buf(),
            mime,
        });
    }

    let bytes = smol::fs::read(path).await.map_err(|err| match err.kind() {
        io::ErrorKind::NotFound => ImageLoadError::NotFound(path.to_path_buf()),
        _ => ImageLoadError::Io {
            path: path.to_path_buf(),
            source: err,
        },
    })?;
    tracing::debug!(path = %path.display(), %mime, len = bytes.len(), "image file read");
    Ok(format!("data:{mime};base64,{}", STANDARD.encode(bytes)))
}

/// Where an image should land, captured before the file read starts.
#[derive(Debug, Clone)]
pub struct PendingImage {
    revision: u64,
    selection: Selection,
}

impl PendingImage {
    pub fn new(editor: &Editor) -> Self {
        Self {
            revision: editor.revision(),
            selection: editor.selection().clone(),
        }
    }

    /// Insert the loaded image. The captured selection is restored only when
    /// the document is still at the revision it was taken from; otherwise the
    /// image goes wherever the caret is now.
    pub fn finish(
        self,
        editor: &mut Editor,
        src: String,
        alt: Option<String>,
    ) -> Result<(), CommandError> {
        if editor.revision() == self.revision {
            if *editor.selection() != self.selection {
                editor.set_selection(self.selection);
            }
        } else {
            tracing::debug!(
                captured = self.revision,
                current = editor.revision(),
                "document changed while loading image, using current selection"
            );
        }
        editor.run_command("image.insert", Some(json!({ "src": src, "alt": alt })))
    }
}

/// Load `path` and insert it, the way a file picker does.
pub async fn insert_image_file(
    editor: &mut Editor,
    path: impl AsRef<Path>,
) -> Result<(), CommandError> {
    let pending = PendingImage::new(editor);
    let path = path.as_ref();
    let src = match read_image_data_url(path).await {
        Ok(src) => src,
        Err(err) => {
            tracing::warn!(%err, "image file could not be loaded");
            editor.notify(format!("Resim yüklenemedi: {}", path.display()));
            return Err(CommandError::invalid_args(err.to_string()));
        }
    };
    let alt = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .map(str::to_string);
    pending.finish(editor, src, alt)
}
