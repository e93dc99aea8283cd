use super::sprites::BASE_WIDTH;

/// The scrolling ground: two tiles that leapfrog each other
#[derive(Debug, Clone, PartialEq)]
pub struct Base {
    pub y: f64,
    pub x1: f64,
    pub x2: f64,
    width: f64,
    velocity: f64,
}

impl Base {
    pub fn new(y: f64, velocity: f64) -> Self {
        Self::with_tile_width(y, velocity, BASE_WIDTH as f64)
    }

    pub fn with_tile_width(y: f64, velocity: f64, width: f64) -> Self {
        Self {
            y,
            x1: 0.0,
            x2: width,
            width,
            velocity,
        }
    }

    /// Scroll one frame; a tile fully past the left edge jumps behind the other
    pub fn advance(&mut self) {
        self.x1 -= self.velocity;
        self.x2 -= self.velocity;

        // Tiles narrower than one frame of scroll may need several hops
        while self.width > 0.0 && self.x1.min(self.x2) < -self.width {
            if self.x1 < self.x2 {
                self.x1 = self.x2 + self.width;
            } else {
                self.x2 = self.x1 + self.width;
            }
        }
    }

    pub fn tile_width(&self) -> f64 {
        self.width
    }

    /// Left edges of both tiles, leftmost first
    pub fn tiles(&self) -> [f64; 2] {
        if self.x1 <= self.x2 {
            [self.x1, self.x2]
        } else {
            [self.x2, self.x1]
        }
    }
}
