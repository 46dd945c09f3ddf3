//! Session state: one loaded photo, at most one rendered frame, and the
//! bookkeeping around re-upload, stale results, and clipboard outcome.

use std::path::Path;

use tracing::{debug, warn};

use crate::assets::{self, SourceImage};
use crate::compose::{self, FrameRgba};
use crate::error::HaloResult;
use crate::theme::Theme;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    /// No photo loaded.
    #[default]
    Empty,
    /// Photo loaded, no frame rendered for it yet.
    Loaded,
    /// A render is in flight for the current photo.
    Processing,
    /// A frame matching the current photo is available.
    Ready,
}

/// Ticket handed out by [`Session::begin_process`]; a finished render only
/// lands if its ticket still matches the session's generation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProcessToken {
    generation: u64,
}

#[derive(Debug, Default)]
pub struct Session {
    source: Option<SourceImage>,
    output: Option<FrameRgba>,
    state: SessionState,
    /// Bumped on every successful load; stale renders carry an older value.
    generation: u64,
    copied: bool,
    show_instructions: bool,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn source(&self) -> Option<&SourceImage> {
        self.source.as_ref()
    }

    pub fn output(&self) -> Option<&FrameRgba> {
        self.output.as_ref()
    }

    pub fn copied(&self) -> bool {
        self.copied
    }

    /// Set when a clipboard copy failed, so the caller can surface manual
    /// copy instructions instead.
    pub fn show_instructions(&self) -> bool {
        self.show_instructions
    }

    /// Load a photo from `path`.
    ///
    /// A path whose declared format is not an image is a silent no-op, not an
    /// error. A decode failure is an error and leaves the previous photo and
    /// frame untouched. On success any previous frame is invalidated.
    pub fn load(&mut self, path: &Path) -> HaloResult<()> {
        if !assets::is_image_path(path) {
            warn!(path = %path.display(), "ignoring non-image selection");
            return Ok(());
        }

        let source = assets::load_source(path)?;
        debug!(
            width = source.width,
            height = source.height,
            "loaded source photo"
        );
        self.source = Some(source);
        self.output = None;
        self.copied = false;
        self.show_instructions = false;
        self.generation += 1;
        self.state = SessionState::Loaded;
        Ok(())
    }

    /// Start a render for the current photo. Returns `None` when no photo is
    /// loaded.
    pub fn begin_process(&mut self) -> Option<ProcessToken> {
        self.source.as_ref()?;
        self.state = SessionState::Processing;
        Some(ProcessToken {
            generation: self.generation,
        })
    }

    /// Land a finished render. A frame whose token predates the latest load
    /// is dropped; the photo it was rendered from is no longer current.
    pub fn finish_process(&mut self, token: ProcessToken, frame: FrameRgba) {
        if token.generation != self.generation {
            debug!(
                token = token.generation,
                current = self.generation,
                "discarding stale render"
            );
            return;
        }
        self.output = Some(frame);
        self.state = SessionState::Ready;
    }

    /// Synchronous render path: begin, compose, finish.
    pub fn process(&mut self, theme: &Theme, seed: u64) -> HaloResult<()> {
        let Some(source) = self.source.clone() else {
            warn!("process requested with no photo loaded");
            return Ok(());
        };
        let Some(token) = self.begin_process() else {
            return Ok(());
        };
        match compose::compose(&source, theme, seed) {
            Ok(frame) => {
                self.finish_process(token, frame);
                Ok(())
            }
            Err(err) => {
                self.state = SessionState::Loaded;
                Err(err)
            }
        }
    }

    /// Record the outcome of a clipboard copy attempt. Failure is not an
    /// error; it flips the manual-instructions flag instead.
    pub fn note_copy_result(&mut self, ok: bool) {
        if ok {
            self.copied = true;
        } else {
            self.show_instructions = true;
        }
    }

    /// Back to a fresh session: no photo, no frame, no flags. The generation
    /// bump also invalidates any render still in flight.
    pub fn reset(&mut self) {
        *self = Self {
            generation: self.generation + 1,
            ..Self::default()
        };
    }
}
