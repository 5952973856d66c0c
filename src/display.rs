use std::fmt;

use crate::constants::{
    DISPLAY_HEIGHT,
    DISPLAY_WIDTH,
};

/// 64x32 monochrome framebuffer, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct Display {
    pixels: [bool; DISPLAY_WIDTH * DISPLAY_HEIGHT],
}

impl Default for Display {
    fn default() -> Self {
        Self {
            pixels: [false; DISPLAY_WIDTH * DISPLAY_HEIGHT],
        }
    }
}

impl Display {
    pub fn clear(&mut self) {
        self.pixels.fill(false);
    }

    /// XORs `sprite` onto the grid with its top-left corner at
    /// `(x mod 64, y mod 32)`. Every pixel wraps individually. Returns true
    /// if any lit pixel was turned off.
    pub fn draw(&mut self, x: u8, y: u8, sprite: &[u8]) -> bool {
        let start_x = x as usize % DISPLAY_WIDTH;
        let start_y = y as usize % DISPLAY_HEIGHT;
        let mut collision = false;

        for (row, byte) in sprite.iter().enumerate() {
            let screen_y = (start_y + row) % DISPLAY_HEIGHT;
            for bit in 0..8 {
                if (byte >> (7 - bit)) & 1 == 0 {
                    continue;
                }
                let screen_x = (start_x + bit) % DISPLAY_WIDTH;
                let pixel = &mut self.pixels[screen_y * DISPLAY_WIDTH + screen_x];
                collision |= *pixel;
                *pixel = !*pixel;
            }
        }

        collision
    }

    pub fn pixel(&self, x: usize, y: usize) -> bool {
        self.pixels[(y % DISPLAY_HEIGHT) * DISPLAY_WIDTH + (x % DISPLAY_WIDTH)]
    }

    pub fn pixels(&self) -> &[bool] {
        &self.pixels
    }

    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks(DISPLAY_WIDTH)
    }

    pub fn lit_count(&self) -> usize {
        self.pixels.iter().filter(|&&p| p).count()
    }
}

impl fmt::Display for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            let line: String = row.iter().map(|&p| if p { '#' } else { '.' }).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Display {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Display")
            .field("lit", &self.lit_count())
            .finish()
    }
}
