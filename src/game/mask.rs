//! Opacity masks for pixel-exact collision tests
//!
//! A [`Mask`] records which pixels of a sprite are opaque. Two masks collide at a
//! given relative offset when at least one opaque pixel of each lands on the same
//! spot. Nothing here knows about rendering; sprites are built from masks, not the
//! other way round.

/// Per-pixel opacity bitmap, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: usize,
    height: usize,
    bits: Vec<bool>,
}

impl Mask {
    /// Create a fully transparent mask
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bits: vec![false; width * height],
        }
    }

    /// Create a fully opaque mask
    pub fn filled(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            bits: vec![true; width * height],
        }
    }

    /// Build a mask by asking `opaque(x, y)` for every pixel
    pub fn from_fn(width: usize, height: usize, mut opaque: impl FnMut(usize, usize) -> bool) -> Self {
        let mut bits = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                bits.push(opaque(x, y));
            }
        }
        Self {
            width,
            height,
            bits,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Whether the pixel at (x, y) is opaque. Out-of-range pixels are transparent.
    pub fn get(&self, x: usize, y: usize) -> bool {
        x < self.width && y < self.height && self.bits[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, opaque: bool) {
        if x < self.width && y < self.height {
            self.bits[y * self.width + x] = opaque;
        }
    }

    /// Number of opaque pixels
    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b).count()
    }

    /// Mirror the mask top to bottom
    pub fn flipped_vertically(&self) -> Self {
        Self::from_fn(self.width, self.height, |x, y| {
            self.get(x, self.height - 1 - y)
        })
    }

    /// First opaque pixel shared with `other` when `other`'s top-left corner sits at
    /// `offset` relative to this mask's top-left corner.
    ///
    /// The returned point is in this mask's coordinates. Rows are scanned top to
    /// bottom, left to right.
    pub fn overlap(&self, other: &Mask, offset: (i32, i32)) -> Option<(usize, usize)> {
        let (ox, oy) = (i64::from(offset.0), i64::from(offset.1));

        // Intersection of the two rectangles in self coordinates
        let x_start = ox.max(0);
        let y_start = oy.max(0);
        let x_end = (ox + other.width as i64).min(self.width as i64);
        let y_end = (oy + other.height as i64).min(self.height as i64);

        if x_start >= x_end || y_start >= y_end {
            return None;
        }

        for y in y_start..y_end {
            for x in x_start..x_end {
                let (x, y) = (x as usize, y as usize);
                let (other_x, other_y) = ((x as i64 - ox) as usize, (y as i64 - oy) as usize);
                if self.get(x, y) && other.get(other_x, other_y) {
                    return Some((x, y));
                }
            }
        }

        None
    }

    /// Whether any opaque pixels coincide at the given offset
    pub fn overlaps(&self, other: &Mask, offset: (i32, i32)) -> bool {
        self.overlap(other, offset).is_some()
    }
}
