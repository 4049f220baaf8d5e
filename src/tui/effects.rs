//! Decorative overlays: celebration bursts and the pointer glow.
//!
//! Pure presentation; nothing here feeds back into the workflow.

use crate::model::Celebration;
use rand::Rng;
use ratatui::{buffer::Buffer, layout::Rect, style::Color, style::Style};
use std::time::{Duration, Instant};

/// Pointer is considered idle after this long without a mouse event.
const POINTER_IDLE: Duration = Duration::from_secs(2);
/// While idle, the glow drifts to a random spot at this interval.
const DRIFT_INTERVAL: Duration = Duration::from_secs(4);

const BURST_GLYPHS: &[char] = &['*', '+', '·', '✦', '✧'];
const BURST_COLORS: &[Color] = &[Color::Yellow, Color::LightYellow, Color::White];

struct Particle {
    x: f32,
    y: f32,
    vx: f32,
    vy: f32,
    ttl: u16,
    glyph: char,
    color: Color,
}

pub struct Effects {
    particles: Vec<Particle>,
    pointer: Option<(u16, u16)>,
    last_pointer_move: Instant,
    last_drift: Instant,
}

impl Effects {
    pub fn new() -> Self {
        Self {
            particles: Vec::new(),
            pointer: None,
            last_pointer_move: Instant::now(),
            last_drift: Instant::now(),
        }
    }

    pub fn pointer_moved(&mut self, x: u16, y: u16) {
        self.pointer = Some((x, y));
        self.last_pointer_move = Instant::now();
    }

    /// Spawn a burst: ~100 particles for the reveal, ~300 for the jackpot,
    /// launched from the lower-center like the page confetti.
    pub fn burst(&mut self, area: Rect, celebration: Celebration) {
        let count = match celebration {
            Celebration::Reveal => 100,
            Celebration::Jackpot => 300,
        };
        let origin_x = f32::from(area.x) + f32::from(area.width) / 2.0;
        let origin_y = f32::from(area.y) + f32::from(area.height) * 0.6;

        let mut rng = rand::thread_rng();
        for _ in 0..count {
            let angle = rng.gen_range(-std::f32::consts::PI..0.0);
            let speed = rng.gen_range(0.4..2.2);
            self.particles.push(Particle {
                x: origin_x,
                y: origin_y,
                vx: angle.cos() * speed * 1.8,
                vy: angle.sin() * speed,
                ttl: rng.gen_range(15..35),
                glyph: BURST_GLYPHS[rng.gen_range(0..BURST_GLYPHS.len())],
                color: BURST_COLORS[rng.gen_range(0..BURST_COLORS.len())],
            });
        }
    }

    /// Advance particles one frame and drift the idle pointer.
    pub fn tick(&mut self, area: Rect) {
        for p in &mut self.particles {
            p.x += p.vx;
            p.y += p.vy;
            // Terminal cells are taller than wide; gravity stays gentle.
            p.vy += 0.12;
            p.ttl = p.ttl.saturating_sub(1);
        }
        self.particles.retain(|p| {
            p.ttl > 0
                && p.x >= f32::from(area.x)
                && p.y >= f32::from(area.y)
                && p.x < f32::from(area.right())
                && p.y < f32::from(area.bottom())
        });

        if self.last_pointer_move.elapsed() >= POINTER_IDLE
            && self.last_drift.elapsed() >= DRIFT_INTERVAL
            && area.width > 0
            && area.height > 0
        {
            let mut rng = rand::thread_rng();
            self.pointer = Some((
                rng.gen_range(area.x..area.right()),
                rng.gen_range(area.y..area.bottom()),
            ));
            self.last_drift = Instant::now();
        }
    }

    /// Paint the overlay on top of the already-rendered widgets.
    pub fn render(&self, buf: &mut Buffer, area: Rect) {
        for p in &self.particles {
            let (x, y) = (p.x as u16, p.y as u16);
            if area.contains(ratatui::layout::Position { x, y }) {
                buf[(x, y)]
                    .set_char(p.glyph)
                    .set_style(Style::default().fg(p.color));
            }
        }

        if let Some((x, y)) = self.pointer {
            if area.contains(ratatui::layout::Position { x, y }) {
                buf[(x, y)].set_style(Style::default().bg(Color::Rgb(120, 84, 10)));
            }
        }
    }

    #[cfg(test)]
    fn particle_count(&self) -> usize {
        self.particles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jackpot_burst_is_larger_than_reveal() {
        let area = Rect::new(0, 0, 80, 24);
        let mut fx = Effects::new();
        fx.burst(area, Celebration::Reveal);
        let reveal = fx.particle_count();
        fx.burst(area, Celebration::Jackpot);
        assert_eq!(fx.particle_count(), reveal + 300);
        assert_eq!(reveal, 100);
    }

    #[test]
    fn particles_die_out() {
        let area = Rect::new(0, 0, 80, 24);
        let mut fx = Effects::new();
        fx.burst(area, Celebration::Reveal);
        for _ in 0..120 {
            fx.tick(area);
        }
        assert_eq!(fx.particle_count(), 0);
    }

    #[test]
    fn pointer_tracks_moves() {
        let mut fx = Effects::new();
        fx.pointer_moved(10, 5);
        assert_eq!(fx.pointer, Some((10, 5)));
    }
}
