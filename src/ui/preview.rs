//! Local image preview for the upload modal.

use image::{DynamicImage, GenericImageView};
use ratatui_image::picker::Picker;
use ratatui_image::protocol::StatefulProtocol;

use crate::error::{AppError, AppResult};

/// Longest edge kept for the preview; the terminal can't show more anyway.
const PREVIEW_MAX_EDGE: u32 = 512;

/// Decodes `bytes` and shrinks the image to fit the preview box.
pub fn decode_preview(bytes: &[u8]) -> AppResult<DynamicImage> {
    let img = image::load_from_memory(bytes).map_err(|e| AppError::Image(e.to_string()))?;
    let (w, h) = img.dimensions();
    if w > PREVIEW_MAX_EDGE || h > PREVIEW_MAX_EDGE {
        Ok(img.thumbnail(PREVIEW_MAX_EDGE, PREVIEW_MAX_EDGE))
    } else {
        Ok(img)
    }
}

pub fn build_preview(picker: &mut Picker, bytes: &[u8]) -> AppResult<StatefulProtocol> {
    let img = decode_preview(bytes)?;
    Ok(picker.new_resize_protocol(img))
}
