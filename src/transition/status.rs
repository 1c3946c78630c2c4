//! Console-style status text for the quantum jump.
//!
//! Each phase of the quantum-jump table narrates itself with a few glowing
//! terminal lines anchored to the bottom-left of the view. A
//! [`StatusScript`] turns phase progress into the lines to show this frame;
//! [`draw_status`] lays them out with any [`GlyphSource`].

use glam::Vec2;

use crate::assets::GlyphSource;
use crate::draw2d::{Canvas, Color};

/// Left inset of every status line, in reference units.
pub const STATUS_LEFT: f32 = 20.0;
/// Glow passes drawn behind each line, outermost first.
pub const GLOW_LAYERS: u32 = 3;

/// Check lines printed one by one while the drive boots.
const BOOT_CHECKS: [&str; 4] = [
    "> spacetime_calibrators.check() ... [OK]",
    "> quantum_flux_stabilizers.status() ... [OK]",
    "> navigation_systems.verify() ... [OK]",
    "> reality_anchors.test() ... [OK]",
];
/// Boot progress between two check lines appearing.
const BOOT_CHECK_STEP: f32 = 0.1;
/// Boot progress at which the checks give way to the target lock.
const BOOT_LOCK_AT: f32 = 3.0 / 7.0;

const GREEN: Color = Color::rgb8(0, 255, 0);
const CYAN: Color = Color::rgb8(0, 255, 255);
const GOLD: Color = Color::rgb8(255, 215, 0);
const PURPLE: Color = Color::rgb8(128, 0, 128);
const ORANGE: Color = Color::rgb8(255, 165, 0);
const RED: Color = Color::rgb8(255, 0, 0);
const PINK: Color = Color::rgb8(255, 20, 147);

/// Nominal text sizes, in reference pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextSize {
    Title,
    Large,
    Medium,
    Small,
}

impl TextSize {
    pub fn px(self) -> f32 {
        match self {
            TextSize::Title => 48.0,
            TextSize::Large => 36.0,
            TextSize::Medium => 28.0,
            TextSize::Small => 20.0,
        }
    }
}

/// One line of status text.
#[derive(Clone, Debug, PartialEq)]
pub struct StatusLine {
    pub text: String,
    pub size: TextSize,
    /// Distance of the line's top edge above the bottom of the view.
    pub from_bottom: f32,
    pub color: Color,
    pub glow: Color,
    /// Brightness factor around 1.0; below 1 dims the line, above 1 only
    /// strengthens the glow.
    pub pulse: f32,
}

impl StatusLine {
    fn new(text: impl Into<String>, size: TextSize, from_bottom: f32, color: Color) -> Self {
        Self {
            text: text.into(),
            size,
            from_bottom,
            color,
            glow: color,
            pulse: 1.0,
        }
    }

    fn glow(mut self, glow: Color) -> Self {
        self.glow = glow;
        self
    }

    fn pulse(mut self, pulse: f32) -> Self {
        self.pulse = pulse;
        self
    }
}

/// Which narration a phase shows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusScript {
    #[default]
    None,
    /// Drive boot with staggered system checks, then the target lock.
    Boot,
    /// Field calibration with a strength readout.
    Calibrate,
    /// Capacitor charge with an energy readout.
    Charge,
    /// Engage, fold, breach warning.
    Engage,
    /// Arrival confirmation, then the next-scene notice.
    Arrive,
}

impl StatusScript {
    /// Lines to show at `progress` through the phase. `time` is animation
    /// time in seconds and drives the free-running pulses.
    pub fn lines(self, progress: f32, time: f32) -> Vec<StatusLine> {
        let progress = progress.clamp(0.0, 1.0);
        let percent = (progress * 100.0) as u32;
        match self {
            StatusScript::None => Vec::new(),
            StatusScript::Boot if progress < BOOT_LOCK_AT => {
                let pulse = 1.0 + (time * 10.0).sin() * 0.1;
                let mut lines = vec![
                    StatusLine::new("> QUANTUM_DRIVE.init()", TextSize::Large, 200.0, GREEN)
                        .pulse(pulse),
                ];
                let shown = BOOT_CHECKS
                    .iter()
                    .enumerate()
                    .filter(|&(i, _)| progress > i as f32 * BOOT_CHECK_STEP);
                for (i, check) in shown {
                    let from_bottom = 160.0 - i as f32 * 25.0;
                    lines.push(
                        StatusLine::new(*check, TextSize::Small, from_bottom, GREEN)
                            .glow(Color::rgb8(0, 150, 0))
                            .pulse(0.8),
                    );
                }
                lines
            }
            StatusScript::Boot => vec![
                StatusLine::new("> COORDINATES_LOCKED", TextSize::Large, 200.0, CYAN).pulse(1.2),
                StatusLine::new("> target: earth.global_view", TextSize::Medium, 160.0, GOLD)
                    .glow(Color::rgb8(255, 200, 0)),
            ],
            StatusScript::Calibrate => vec![
                StatusLine::new("> quantum_field.calibrate()", TextSize::Large, 200.0, PURPLE)
                    .glow(Color::rgb8(255, 0, 255))
                    .pulse(1.0 + progress * 0.3),
                StatusLine::new(
                    format!("> field_strength: {percent}%"),
                    TextSize::Medium,
                    160.0,
                    CYAN,
                ),
            ],
            StatusScript::Charge => vec![
                StatusLine::new(
                    "> hyperdrive.charge_capacitors()",
                    TextSize::Large,
                    200.0,
                    ORANGE,
                )
                .glow(Color::rgb8(255, 100, 0))
                .pulse(1.0 + (progress * 16.0).sin() * 0.3),
                StatusLine::new(
                    format!("> energy_level: {percent}%"),
                    TextSize::Medium,
                    160.0,
                    CYAN,
                ),
                StatusLine::new("> status: CHARGING...", TextSize::Small, 120.0, Color::WHITE)
                    .glow(Color::rgb8(200, 200, 200)),
            ],
            StatusScript::Engage if progress < 0.3 => vec![
                StatusLine::new("> hyperdrive.engage()", TextSize::Title, 240.0, Color::WHITE)
                    .pulse(1.5),
                StatusLine::new("> status: ENGAGED", TextSize::Medium, 200.0, GREEN).pulse(1.2),
            ],
            StatusScript::Engage if progress < 0.6 => vec![
                StatusLine::new("> spacetime.fold()", TextSize::Large, 200.0, GOLD).pulse(1.3),
                StatusLine::new("> reality.bend()", TextSize::Medium, 160.0, ORANGE).pulse(1.1),
            ],
            StatusScript::Engage if progress < 0.9 => {
                let flicker = 1.0 + (progress * 30.0).sin() * 0.5;
                vec![
                    StatusLine::new(
                        "> dimensional.breach_detected()",
                        TextSize::Large,
                        200.0,
                        RED,
                    )
                    .pulse(flicker),
                    StatusLine::new("> WARNING: REALITY_UNSTABLE", TextSize::Medium, 160.0, PINK)
                        .pulse(flicker),
                ]
            }
            StatusScript::Engage => Vec::new(),
            StatusScript::Arrive if progress < 0.4 => vec![
                StatusLine::new("> jump.status: SUCCESS", TextSize::Title, 240.0, GREEN)
                    .pulse(1.2),
                StatusLine::new("> coordinates.reached: TRUE", TextSize::Medium, 200.0, CYAN)
                    .pulse(1.1),
            ],
            StatusScript::Arrive if progress < 0.8 => vec![
                StatusLine::new("> global_view.launch()", TextSize::Large, 200.0, CYAN)
                    .pulse(1.1),
                StatusLine::new("> please_wait...", TextSize::Medium, 160.0, Color::WHITE)
                    .glow(Color::rgb8(200, 200, 200))
                    .pulse(0.9),
                StatusLine::new(
                    "> initializing_globe_interface",
                    TextSize::Small,
                    120.0,
                    GREEN,
                )
                .glow(Color::rgb8(0, 200, 0))
                .pulse(0.8),
            ],
            StatusScript::Arrive => Vec::new(),
        }
    }
}

/// Draw `lines` with their left edge [`STATUS_LEFT`] right of `bottom_left`,
/// the bottom-left corner of the visible view in reference coordinates.
pub fn draw_status(
    canvas: &mut Canvas,
    font: &impl GlyphSource,
    bottom_left: Vec2,
    lines: &[StatusLine],
) {
    for line in lines {
        let scale = line.size.px() / font.size();
        let origin = bottom_left + Vec2::new(STATUS_LEFT, -line.from_bottom);

        for layer in (1..=GLOW_LAYERS).rev() {
            let step = layer as f32;
            let alpha = (90.0 - step * 12.0).max(15.0) / 255.0 * line.pulse;
            let glow = line
                .glow
                .brightened(step * 8.0, step * 5.0, step * 3.0)
                .with_alpha(alpha);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let offset = Vec2::new(dx as f32, dy as f32) * step;
                    canvas.text_scaled(font, origin + offset, &line.text, scale, glow);
                }
            }
        }

        let main = line.color.with_alpha(line.pulse.min(1.0));
        canvas.text_scaled(font, origin, &line.text, scale, main);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::BlockFont;

    fn texts(lines: &[StatusLine]) -> Vec<&str> {
        lines.iter().map(|l| l.text.as_str()).collect()
    }

    #[test]
    fn boot_checks_appear_one_by_one() {
        let early = StatusScript::Boot.lines(0.05, 0.0);
        assert_eq!(early.len(), 2);
        assert_eq!(early[0].text, "> QUANTUM_DRIVE.init()");

        let later = StatusScript::Boot.lines(0.35, 0.0);
        assert_eq!(later.len(), 1 + BOOT_CHECKS.len());
        assert!(later[1..].iter().all(|l| l.text.ends_with("[OK]")));
        // each check sits one row below the previous one
        assert!(later[2].from_bottom < later[1].from_bottom);
    }

    #[test]
    fn boot_ends_on_target_lock() {
        let lines = StatusScript::Boot.lines(0.8, 0.0);
        assert_eq!(
            texts(&lines),
            ["> COORDINATES_LOCKED", "> target: earth.global_view"]
        );
    }

    #[test]
    fn readouts_follow_progress() {
        let lines = StatusScript::Calibrate.lines(0.25, 0.0);
        assert_eq!(lines[1].text, "> field_strength: 25%");
        assert!((lines[0].pulse - 1.075).abs() < 1e-5);

        let lines = StatusScript::Charge.lines(1.0, 0.0);
        assert_eq!(lines[1].text, "> energy_level: 100%");
    }

    #[test]
    fn engage_steps_through_its_messages() {
        assert_eq!(StatusScript::Engage.lines(0.1, 0.0)[0].text, "> hyperdrive.engage()");
        assert_eq!(StatusScript::Engage.lines(0.5, 0.0)[0].text, "> spacetime.fold()");
        assert_eq!(
            StatusScript::Engage.lines(0.7, 0.0)[0].text,
            "> dimensional.breach_detected()"
        );
        assert!(StatusScript::Engage.lines(0.95, 0.0).is_empty());
    }

    #[test]
    fn arrival_announces_success_then_launch() {
        assert_eq!(StatusScript::Arrive.lines(0.1, 0.0)[0].text, "> jump.status: SUCCESS");
        assert_eq!(StatusScript::Arrive.lines(0.6, 0.0).len(), 3);
        assert!(StatusScript::Arrive.lines(0.9, 0.0).is_empty());
        assert!(StatusScript::None.lines(0.5, 0.0).is_empty());
    }

    #[test]
    fn line_draws_glow_copies_behind_main_text() {
        let font = BlockFont::new(20.0);
        let line = StatusLine::new("> ok", TextSize::Small, 100.0, GREEN);
        let mut canvas = Canvas::new();
        draw_status(&mut canvas, &font, Vec2::new(0.0, 1080.0), &[line]);

        // three visible glyphs, eight offsets per glow layer, plus the main pass
        let copies = GLOW_LAYERS as usize * 8 + 1;
        assert_eq!(canvas.glyphs().len(), copies * 3 * 6);

        let main = &canvas.glyphs()[canvas.glyphs().len() - 18..];
        assert_eq!(main[0].position, [STATUS_LEFT, 980.0]);
        assert_eq!(main[0].color, [0.0, 1.0, 0.0, 1.0]);
        // glow passes are translucent
        assert!(canvas.glyphs()[0].color[3] < 0.5);
    }

    #[test]
    fn dim_pulse_lowers_main_alpha() {
        let font = BlockFont::new(20.0);
        let line = StatusLine::new("x", TextSize::Small, 50.0, GREEN).pulse(0.5);
        let mut canvas = Canvas::new();
        draw_status(&mut canvas, &font, Vec2::ZERO, &[line]);
        let last = canvas.glyphs().last().unwrap();
        assert!((last.color[3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn sizes_scale_from_font_size() {
        let font = BlockFont::new(24.0);
        let line = StatusLine::new("x", TextSize::Title, 0.0, GREEN);
        let mut canvas = Canvas::new();
        draw_status(&mut canvas, &font, Vec2::ZERO, &[line]);
        let quad = &canvas.glyphs()[canvas.glyphs().len() - 6..];
        let height = quad[4].position[1] - quad[0].position[1];
        assert!((height - 48.0).abs() < 1e-4);
    }
}
