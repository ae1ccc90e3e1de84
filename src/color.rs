//! Traffic-light colors and per-face color smoothing.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

/// A display color in BGR channel order.
///
/// Histories and the smoothing math work in BGR; payloads convert to RGB at
/// assembly via [`Color::to_rgb`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Color {
    pub b: u8,
    pub g: u8,
    pub r: u8,
}

impl Color {
    pub const GREEN: Color = Color { b: 0, g: 255, r: 0 };
    pub const YELLOW: Color = Color {
        b: 0,
        g: 255,
        r: 255,
    };
    pub const RED: Color = Color { b: 0, g: 0, r: 255 };

    /// Channels in RGB order, the order payloads carry.
    pub fn to_rgb(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }
}

/// Rolling average over each face slot's recent colors.
///
/// One bounded history per face index; a push appends the raw color and
/// returns the component-wise mean of the retained history, rounded to
/// integer channels. Histories are keyed by the face's position in the
/// detector output and are never reset while a loop runs, so a reordering of
/// detector output silently restarts the blend for the affected slots.
pub struct ColorSmoother {
    window: usize,
    histories: HashMap<usize, VecDeque<Color>>,
}

impl ColorSmoother {
    /// Creates a smoother averaging the last `window` colors per face.
    pub fn new(window: usize) -> Self {
        assert!(window > 0);
        Self {
            window,
            histories: HashMap::new(),
        }
    }

    /// Records `color` for the face at `index` and returns the smoothed color.
    pub fn push(&mut self, index: usize, color: Color) -> Color {
        let history = self
            .histories
            .entry(index)
            .or_insert_with(|| VecDeque::with_capacity(self.window));
        history.push_back(color);
        if history.len() > self.window {
            history.pop_front();
        }

        let len = history.len() as f32;
        let mut sums = [0u32; 3];
        for c in history.iter() {
            sums[0] += u32::from(c.b);
            sums[1] += u32::from(c.g);
            sums[2] += u32::from(c.r);
        }
        Color {
            b: (sums[0] as f32 / len).round() as u8,
            g: (sums[1] as f32 / len).round() as u8,
            r: (sums[2] as f32 / len).round() as u8,
        }
    }

    /// Number of face slots with a recorded history.
    pub fn tracked_faces(&self) -> usize {
        self.histories.len()
    }
}
