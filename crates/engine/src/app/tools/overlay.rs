use crate::app::LoopMetricsSnapshot;
use crate::world::{DrawTarget, PixelRect, RenderState};

const GLYPH_WIDTH: i32 = 3;
const GLYPH_HEIGHT: i32 = 5;
const TEXT_SCALE: i32 = 2;
const GLYPH_ADVANCE: i32 = (GLYPH_WIDTH + 1) * TEXT_SCALE;
const LINE_ADVANCE: i32 = (GLYPH_HEIGHT + 2) * TEXT_SCALE;
const PADDING: i32 = 4 * TEXT_SCALE;
const PANEL_INSET: i32 = 2 * TEXT_SCALE;
const TEXT_COLOR: [u8; 4] = [244, 248, 252, 255];
const PANEL_COLOR: [u8; 4] = [10, 12, 16, 190];

#[derive(Debug, Clone, Default)]
pub(crate) struct OverlayData {
    pub metrics: LoopMetricsSnapshot,
    pub render_fps_cap: Option<u32>,
    pub scene_lines: Vec<String>,
}

pub(crate) fn overlay_lines(data: &OverlayData) -> Vec<String> {
    let cap = data
        .render_fps_cap
        .map_or_else(|| "off".to_string(), |cap| cap.to_string());
    let mut lines = vec![
        format!(
            "fps {:.1} tps {:.1} cap {cap}",
            data.metrics.fps, data.metrics.tps
        ),
        format!(
            "frame {:.2}ms worst {:.2}ms",
            data.metrics.frame_time_ms, data.metrics.worst_frame_ms
        ),
    ];
    lines.extend(data.scene_lines.iter().cloned());
    lines
}

/// Top-left debug panel drawn with the built-in bitmap font.
pub(crate) fn draw_overlay(target: &mut dyn DrawTarget, data: &OverlayData) {
    let (width, height) = target.size();
    if width == 0 || height == 0 {
        return;
    }
    let state = RenderState::screen(width, height);
    let lines = overlay_lines(data);
    let longest = lines
        .iter()
        .map(|line| line.chars().count() as i32)
        .max()
        .unwrap_or(0);
    let panel = PixelRect::new(
        PADDING - PANEL_INSET,
        PADDING - PANEL_INSET,
        (longest * GLYPH_ADVANCE + PANEL_INSET * 2) as u32,
        (lines.len() as i32 * LINE_ADVANCE + PANEL_INSET * 2) as u32,
    );
    target.fill_rect(&state, panel, PANEL_COLOR);

    let mut y = PADDING;
    for line in &lines {
        draw_text(target, &state, PADDING, y, line, TEXT_COLOR);
        y += LINE_ADVANCE;
    }
}

pub(crate) fn draw_text(
    target: &mut dyn DrawTarget,
    state: &RenderState,
    mut x: i32,
    y: i32,
    text: &str,
    rgba: [u8; 4],
) {
    for ch in text.chars() {
        let bits = glyph_bits(ch);
        for row in 0..GLYPH_HEIGHT {
            for col in 0..GLYPH_WIDTH {
                let shift = (GLYPH_HEIGHT - 1 - row) * GLYPH_WIDTH + (GLYPH_WIDTH - 1 - col);
                if bits & (1 << shift) == 0 {
                    continue;
                }
                target.fill_rect(
                    state,
                    PixelRect::new(
                        x + col * TEXT_SCALE,
                        y + row * TEXT_SCALE,
                        TEXT_SCALE as u32,
                        TEXT_SCALE as u32,
                    ),
                    rgba,
                );
            }
        }
        x += GLYPH_ADVANCE;
    }
}

/// 3x5 glyph packed row-major from the top, three bits per row. Lowercase shares
/// the uppercase shapes; anything unknown draws as `?`.
fn glyph_bits(ch: char) -> u16 {
    match ch.to_ascii_uppercase() {
        ' ' => 0x0000,
        '!' => 0x2482,
        '\'' => 0x2400,
        '(' => 0x1491,
        ')' => 0x4494,
        '+' => 0x05d0,
        ',' => 0x0014,
        '-' => 0x01c0,
        '.' => 0x0002,
        '/' => 0x12a4,
        '0' => 0x7b6f,
        '1' => 0x2c97,
        '2' => 0x73e7,
        '3' => 0x73cf,
        '4' => 0x5bc9,
        '5' => 0x79cf,
        '6' => 0x79ef,
        '7' => 0x7292,
        '8' => 0x7bef,
        '9' => 0x7bcf,
        ':' => 0x0410,
        '<' => 0x1511,
        '=' => 0x0e38,
        '>' => 0x4454,
        'A' => 0x2bed,
        'B' => 0x6bae,
        'C' => 0x7927,
        'D' => 0x6b6e,
        'E' => 0x79a7,
        'F' => 0x79a4,
        'G' => 0x796f,
        'H' => 0x5bed,
        'I' => 0x7497,
        'J' => 0x726f,
        'K' => 0x5bad,
        'L' => 0x4927,
        'M' => 0x5fed,
        'N' => 0x5ffd,
        'O' => 0x7b6f,
        'P' => 0x6ba4,
        'Q' => 0x7b79,
        'R' => 0x6bad,
        'S' => 0x79cf,
        'T' => 0x7492,
        'U' => 0x5b6f,
        'V' => 0x5b6a,
        'W' => 0x5bfd,
        'X' => 0x5aad,
        'Y' => 0x5a92,
        'Z' => 0x72a7,
        '[' => 0x6926,
        ']' => 0x324b,
        '_' => 0x0007,
        _ => 0x72c2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pixels {
        size: (u32, u32),
        fills: Vec<(PixelRect, [u8; 4])>,
    }

    impl DrawTarget for Pixels {
        fn size(&self) -> (u32, u32) {
            self.size
        }

        fn draw_image(&mut self, _: &RenderState, _: &str, _: PixelRect, _: (i32, i32)) {}

        fn fill_rect(&mut self, _: &RenderState, rect: PixelRect, rgba: [u8; 4]) {
            self.fills.push((rect, rgba));
        }
    }

    #[test]
    fn lowercase_and_unknown_characters_have_glyphs() {
        assert_eq!(glyph_bits('a'), glyph_bits('A'));
        assert_eq!(glyph_bits('~'), glyph_bits('?'));
        assert_eq!(glyph_bits(' '), 0);
    }

    #[test]
    fn dot_lights_one_scaled_cell_on_the_bottom_row() {
        let mut target = Pixels {
            size: (100, 100),
            fills: Vec::new(),
        };
        draw_text(&mut target, &RenderState::screen(100, 100), 10, 20, ".", TEXT_COLOR);
        assert_eq!(
            target.fills,
            vec![(PixelRect::new(10 + TEXT_SCALE, 20 + 4 * TEXT_SCALE, 2, 2), TEXT_COLOR)]
        );
    }

    #[test]
    fn overlay_lists_metrics_then_scene_lines() {
        let data = OverlayData {
            metrics: LoopMetricsSnapshot {
                fps: 59.94,
                tps: 60.0,
                frame_time_ms: 16.68,
                worst_frame_ms: 22.0,
                dropped_backlog_ms: 0,
            },
            render_fps_cap: None,
            scene_lines: vec!["map path_a".to_string()],
        };
        assert_eq!(
            overlay_lines(&data),
            vec![
                "fps 59.9 tps 60.0 cap off".to_string(),
                "frame 16.68ms worst 22.00ms".to_string(),
                "map path_a".to_string(),
            ]
        );
    }

    #[test]
    fn overlay_draws_backing_panel_first() {
        let mut target = Pixels {
            size: (320, 240),
            fills: Vec::new(),
        };
        draw_overlay(&mut target, &OverlayData::default());
        let (panel, color) = target.fills.first().copied().expect("panel");
        assert_eq!(color, PANEL_COLOR);
        assert_eq!((panel.x, panel.y), (PADDING - PANEL_INSET, PADDING - PANEL_INSET));
        assert!(target.fills.len() > 1);
    }
}
