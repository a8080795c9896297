use rand::Rng;
use ratatui_image::protocol::StatefulProtocol;

use super::ms_to_ticks;
use crate::services::upload::FileUpload;

/// Progress bar shown while the upload and post creation are awaited.
///
/// Purely cosmetic: it creeps up in random steps, never passes 90% on its
/// own and only reaches 100% when both calls have succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedProgress {
    pub percent: f64,
    pub complete: bool,
    last_step_tick: u64,
}

impl SimulatedProgress {
    pub const STEP_MS: u64 = 200;
    pub const CAP: f64 = 90.0;

    pub fn start(tick: u64) -> Self {
        Self { percent: 0.0, complete: false, last_step_tick: tick }
    }

    pub fn advance<R: Rng>(&mut self, tick: u64, rng: &mut R) {
        if self.complete || tick < self.last_step_tick + ms_to_ticks(Self::STEP_MS) {
            return;
        }
        self.percent = (self.percent + rng.gen_range(0.0..30.0)).min(Self::CAP);
        self.last_step_tick = tick;
    }

    pub fn finish(&mut self) {
        self.percent = 100.0;
        self.complete = true;
    }

    pub fn label(&self) -> String {
        if self.complete {
            "Upload complete!".to_string()
        } else {
            format!("Uploading... {}%", self.percent.round() as u32)
        }
    }

    pub fn ratio(&self) -> f64 {
        (self.percent / 100.0).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadFocus {
    Path,
    Caption,
    Submit,
    Cancel,
}

impl UploadFocus {
    const ORDER: [UploadFocus; 4] = [UploadFocus::Path, UploadFocus::Caption, UploadFocus::Submit, UploadFocus::Cancel];

    pub fn next(self) -> Self {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        let idx = Self::ORDER.iter().position(|f| *f == self).unwrap_or(0);
        Self::ORDER[(idx + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

/// State of the create-post modal
pub struct UploadState {
    pub path_input: String,
    pub caption: String,
    pub file: Option<FileUpload>,
    pub preview: Option<StatefulProtocol>,
    pub focus: UploadFocus,
    pub submitting: bool,
    pub progress: Option<SimulatedProgress>,
    /// Tick at which a completed upload closes the modal.
    pub close_at_tick: Option<u64>,
}

impl Default for UploadState {
    fn default() -> Self {
        Self {
            path_input: String::new(),
            caption: String::new(),
            file: None,
            preview: None,
            focus: UploadFocus::Path,
            submitting: false,
            progress: None,
            close_at_tick: None,
        }
    }
}

impl UploadState {
    pub fn submit_enabled(&self) -> bool {
        self.file.is_some() && !self.submitting
    }

    pub fn select_file(&mut self, file: FileUpload, preview: Option<StatefulProtocol>) {
        self.file = Some(file);
        self.preview = preview;
        self.focus = UploadFocus::Caption;
    }

    /// Caption to store; blank means none.
    pub fn caption_value(&self) -> Option<String> {
        Some(self.caption.trim().to_string()).filter(|c| !c.is_empty())
    }

    pub fn begin_submit(&mut self, tick: u64) {
        self.submitting = true;
        self.progress = Some(SimulatedProgress::start(tick));
    }

    pub fn fail(&mut self) {
        self.submitting = false;
        self.progress = None;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
