//! Debug overlay hook.

use glam::Vec2;

/// Immediate-mode line drawing implemented by the host renderer.
///
/// Colors are `0xRRGGBB`. Coordinates are screen pixels.
pub trait DebugPrimitives {
    /// Color used by the following draw calls.
    fn set_color(&mut self, color: u32);

    /// Closed polygon outline.
    fn draw_poly(&mut self, points: &[Vec2]);

    fn draw_line(&mut self, from: Vec2, to: Vec2);

    /// Axis-aligned rectangle outline.
    fn draw_rect(&mut self, min: Vec2, max: Vec2);
}

/// Recorded draw call, for hosts that replay the overlay later.
#[derive(Debug, Clone, PartialEq)]
pub enum DebugCommand {
    Poly { color: u32, points: Vec<Vec2> },
    Line { color: u32, from: Vec2, to: Vec2 },
    Rect { color: u32, min: Vec2, max: Vec2 },
}

/// [`DebugPrimitives`] that stores every call.
#[derive(Debug, Default)]
pub struct DebugRecorder {
    color: u32,
    pub commands: Vec<DebugCommand>,
}

impl DebugRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded calls drawn with `color`.
    pub fn with_color(&self, color: u32) -> impl Iterator<Item = &DebugCommand> {
        self.commands.iter().filter(move |c| match c {
            DebugCommand::Poly { color: c, .. }
            | DebugCommand::Line { color: c, .. }
            | DebugCommand::Rect { color: c, .. } => *c == color,
        })
    }
}

impl DebugPrimitives for DebugRecorder {
    fn set_color(&mut self, color: u32) {
        self.color = color;
    }

    fn draw_poly(&mut self, points: &[Vec2]) {
        self.commands.push(DebugCommand::Poly {
            color: self.color,
            points: points.to_vec(),
        });
    }

    fn draw_line(&mut self, from: Vec2, to: Vec2) {
        self.commands.push(DebugCommand::Line {
            color: self.color,
            from,
            to,
        });
    }

    fn draw_rect(&mut self, min: Vec2, max: Vec2) {
        self.commands.push(DebugCommand::Rect {
            color: self.color,
            min,
            max,
        });
    }
}
