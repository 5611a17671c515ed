use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct UiSettings {
    pub ui_scale: f32,

    /// Fade the story while a segment is still streaming in.
    pub dim_story_while_generating: bool,

    /// Font with CJK glyphs; common system locations are tried when unset.
    pub cjk_font_path: Option<PathBuf>,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            ui_scale: 1.0,
            dim_story_while_generating: true,
            cjk_font_path: None,
        }
    }
}

impl UiSettings {
    pub const MIN_SCALE: f32 = 0.75;
    pub const MAX_SCALE: f32 = 2.0;

    /// Scale clamped to the slider range, so a hand-edited file can't make
    /// the window unusable.
    pub fn effective_scale(&self) -> f32 {
        if self.ui_scale.is_finite() {
            self.ui_scale.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
        } else {
            1.0
        }
    }
}
