//! On-screen frame timing readout.

use serde::{Deserialize, Serialize};

use crate::frame::FrameStats;
use crate::pixel::{Color, DrawTarget};
use crate::surface::Overlay;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebugLevel {
    None,
    #[default]
    Light,
    Heavy,
}

impl DebugLevel {
    /// None -> Light -> Heavy -> None.
    pub fn cycle(self) -> Self {
        match self {
            DebugLevel::None => DebugLevel::Light,
            DebugLevel::Light => DebugLevel::Heavy,
            DebugLevel::Heavy => DebugLevel::None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DebugLevel::None => "none",
            DebugLevel::Light => "light",
            DebugLevel::Heavy => "heavy",
        }
    }
}

/// 4x5 glyphs, MSB-left within each byte (top 4 bits used).
const GLYPHS: &[(u8, [u8; 5])] = &[
    (b'0', [0x60, 0x90, 0x90, 0x90, 0x60]),
    (b'1', [0x20, 0x60, 0x20, 0x20, 0x70]),
    (b'2', [0x60, 0x90, 0x20, 0x40, 0xF0]),
    (b'3', [0x60, 0x90, 0x20, 0x90, 0x60]),
    (b'4', [0x90, 0x90, 0xF0, 0x10, 0x10]),
    (b'5', [0xF0, 0x80, 0xE0, 0x10, 0xE0]),
    (b'6', [0x60, 0x80, 0xE0, 0x90, 0x60]),
    (b'7', [0xF0, 0x10, 0x20, 0x40, 0x40]),
    (b'8', [0x60, 0x90, 0x60, 0x90, 0x60]),
    (b'9', [0x60, 0x90, 0x70, 0x10, 0x60]),
    (b'.', [0x00, 0x00, 0x00, 0x00, 0x40]),
    (b'/', [0x10, 0x20, 0x20, 0x40, 0x80]),
    (b' ', [0x00, 0x00, 0x00, 0x00, 0x00]),
    (b'A', [0x60, 0x90, 0xF0, 0x90, 0x90]),
    (b'D', [0xE0, 0x90, 0x90, 0x90, 0xE0]),
    (b'E', [0xF0, 0x80, 0xE0, 0x80, 0xF0]),
    (b'F', [0xF0, 0x80, 0xE0, 0x80, 0x80]),
    (b'G', [0x70, 0x80, 0xB0, 0x90, 0x70]),
    (b'L', [0x80, 0x80, 0x80, 0x80, 0xF0]),
    (b'M', [0x90, 0xF0, 0xF0, 0x90, 0x90]),
    (b'P', [0xE0, 0x90, 0xE0, 0x80, 0x80]),
    (b'R', [0xE0, 0x90, 0xE0, 0xA0, 0x90]),
    (b'S', [0x70, 0x80, 0x60, 0x10, 0xE0]),
    (b'U', [0x90, 0x90, 0x90, 0x90, 0x60]),
];

const GLYPH_W: u32 = 4;
const GLYPH_H: u32 = 5;
const PIXEL: u32 = 3;
const ADVANCE: u32 = (GLYPH_W + 1) * PIXEL;
const LINE: u32 = (GLYPH_H + 1) * PIXEL;
const MARGIN: u32 = 6;

const BACKDROP: Color = Color::argb(0x90, 0, 0, 0);

fn glyph_for(ch: u8) -> &'static [u8; 5] {
    let ch = ch.to_ascii_uppercase();
    GLYPHS
        .iter()
        .find(|(c, _)| *c == ch)
        .map(|(_, g)| g)
        .unwrap_or(&[0; 5])
}

fn text_width(text: &str) -> u32 {
    (text.len() as u32 * ADVANCE).saturating_sub(PIXEL)
}

fn draw_text(target: &mut DrawTarget<'_>, x: i32, y: i32, text: &str, color: Color) {
    for (i, ch) in text.bytes().enumerate() {
        let gx = x + (i as u32 * ADVANCE) as i32;
        for (row, bits) in glyph_for(ch).iter().enumerate() {
            for col in 0..GLYPH_W {
                if bits & (0x80 >> col) != 0 {
                    target.fill_rect(
                        gx + (col * PIXEL) as i32,
                        y + (row as u32 * PIXEL) as i32,
                        PIXEL,
                        PIXEL,
                        color,
                    );
                }
            }
        }
    }
}

/// Timing readout for one frame, drawn in the top-right corner.
#[derive(Debug, Clone, Copy)]
pub struct DiagnosticsOverlay {
    pub level: DebugLevel,
    pub stats: FrameStats,
    pub fps: f64,
    pub lagged_ticks: u64,
}

impl DiagnosticsOverlay {
    /// Text rows and their colors for the current level.
    pub fn lines(&self) -> Vec<(String, Color)> {
        let s = &self.stats;
        let mut lines = Vec::new();
        if self.level == DebugLevel::None {
            return lines;
        }

        let timing_color = if s.is_lagging() { Color::RED } else { Color::WHITE };
        lines.push((
            format!("{:.2}/{:.2} MS", s.raw_frame_time_ms, s.cooked_frame_time_ms),
            timing_color,
        ));

        if self.level == DebugLevel::Heavy {
            lines.push((format!("FPS {:.1}", self.fps), Color::WHITE));
            lines.push((format!("GUARD {} MS", s.over_sleep_guard_ms as u64), Color::WHITE));
            lines.push((format!("FRAMES {}", s.total_frames_rendered), Color::WHITE));
            lines.push((format!("LAG {}", self.lagged_ticks), Color::WHITE));
        }
        lines
    }
}

impl Overlay for DiagnosticsOverlay {
    fn draw(&self, target: &mut DrawTarget<'_>) {
        let lines = self.lines();
        if lines.is_empty() {
            return;
        }

        let widest = lines.iter().map(|(t, _)| text_width(t)).max().unwrap_or(0);
        let right = target.width() as i32 - MARGIN as i32;
        let box_x = right - widest as i32 - PIXEL as i32;
        let box_h = lines.len() as u32 * LINE + PIXEL;
        target.fill_rect(box_x, MARGIN as i32 - PIXEL as i32, widest + 2 * PIXEL, box_h, BACKDROP);

        for (i, (text, color)) in lines.iter().enumerate() {
            let x = right - text_width(text) as i32;
            let y = MARGIN as i32 + (i as u32 * LINE) as i32;
            draw_text(target, x, y, text, *color);
        }
    }
}
