//! Getting a rendered frame out: PNG on disk, system clipboard, share URL.

use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use tracing::{debug, warn};

use crate::compose::FrameRgba;
use crate::error::HaloResult;
use crate::theme::Theme;

const SHARE_INTENT_BASE: &str = "https://x.com/intent/tweet?text=";

/// Write `frame` as a PNG. The renderer's premultiplied pixels are converted
/// back to straight alpha first; PNG stores straight alpha.
pub fn write_png(frame: &FrameRgba, path: &Path) -> HaloResult<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }

    let data = frame.unpremultiplied();
    image::save_buffer_with_format(
        path,
        &data,
        frame.width,
        frame.height,
        image::ColorType::Rgba8,
        image::ImageFormat::Png,
    )
    .with_context(|| format!("write png '{}'", path.display()))?;
    Ok(())
}

/// The output path for `theme` under `dir`. The filename comes from the
/// theme, never from the source photo's name.
pub fn output_path(dir: &Path, theme: &Theme) -> PathBuf {
    dir.join(&theme.export.file_name)
}

/// Best-effort clipboard copy. Returns whether it landed; a missing or
/// uncooperative clipboard is an expected outcome, not an error.
pub fn copy_to_clipboard(frame: &FrameRgba) -> bool {
    let mut clipboard = match arboard::Clipboard::new() {
        Ok(c) => c,
        Err(err) => {
            warn!(%err, "clipboard unavailable");
            return false;
        }
    };

    let data = arboard::ImageData {
        width: frame.width as usize,
        height: frame.height as usize,
        bytes: Cow::Owned(frame.unpremultiplied()),
    };
    match clipboard.set_image(data) {
        Ok(()) => {
            debug!("copied frame to clipboard");
            true
        }
        Err(err) => {
            warn!(%err, "clipboard copy failed");
            false
        }
    }
}

/// Pre-filled tweet intent URL for `theme`'s share text and tags.
pub fn share_url(theme: &Theme) -> String {
    let text = format!("{} {}", theme.export.share_text, theme.export.share_tags);
    let encoded = utf8_percent_encode(&text, NON_ALPHANUMERIC);
    format!("{SHARE_INTENT_BASE}{encoded}")
}

/// The share flow: copy the frame (when one exists), then hand back the
/// intent URL for the caller to open. Returns the URL and whether the copy
/// landed.
pub fn share(theme: &Theme, frame: Option<&FrameRgba>) -> (String, bool) {
    let copied = frame.is_some_and(copy_to_clipboard);
    (share_url(theme), copied)
}
