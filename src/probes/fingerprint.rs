//! Canvas fingerprint and fingerprinting-resistance probes

use crate::host::{blank_baseline, Canvas2d, HostEnvironment, Rgba};

pub const FINGERPRINT_TEXT: &str = "Hello, World!";
pub const RESISTANCE_TEXT: &str = "abcdefghijklmnopqrstuvwxyz";

pub const CANVAS_NOT_SUPPORTED: &str = "Canvas not supported";
pub const RESISTANCE_HIGH: &str = "High (Canvas Blocked)";
pub const RESISTANCE_LOW: &str = "Low";

const CANVAS_WIDTH: u32 = 300;
const CANVAS_HEIGHT: u32 = 150;

/// Fixed scene: an orange bar, then the text twice in two colors with a 2px offset
fn draw_scene(canvas: &mut dyn Canvas2d, text: &str) {
    canvas.set_font("14px 'Arial'");
    canvas.set_fill_style(Rgba::opaque(255, 102, 0));
    canvas.fill_rect(125, 1, 62, 20);
    canvas.set_fill_style(Rgba::opaque(0, 102, 153));
    canvas.fill_text(text, 2, 15);
    canvas.set_fill_style(Rgba::with_alpha(102, 204, 0, 0.7));
    canvas.fill_text(text, 4, 17);
}

/// Content-addressed serialization of the fingerprint scene
pub fn canvas_fingerprint(host: &dyn HostEnvironment) -> String {
    let Some(mut canvas) = host.create_canvas(CANVAS_WIDTH, CANVAS_HEIGHT) else {
        return CANVAS_NOT_SUPPORTED.to_string();
    };
    draw_scene(canvas.as_mut(), FINGERPRINT_TEXT);
    canvas.serialize()
}

/// A host whose readback equals the blank 1x1 baseline is blanking canvases
pub fn fingerprinting_resistance(host: &dyn HostEnvironment) -> String {
    let Some(mut canvas) = host.create_canvas(CANVAS_WIDTH, CANVAS_HEIGHT) else {
        return CANVAS_NOT_SUPPORTED.to_string();
    };
    draw_scene(canvas.as_mut(), RESISTANCE_TEXT);

    if canvas.serialize() == blank_baseline() {
        RESISTANCE_HIGH.to_string()
    } else {
        RESISTANCE_LOW.to_string()
    }
}
