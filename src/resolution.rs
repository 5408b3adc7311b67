//! Frame resolutions, display viewports and aspect ratios.

use std::fmt;

/// Resolution (`width x height`) of a camera frame, in pixels.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    width: u32,
    height: u32,
}

impl Resolution {
    /// Creates a new [`Resolution`] of `width x height`.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Computes the [`AspectRatio`] of this [`Resolution`].
    ///
    /// If `self` has a width or height of 0, `None` is returned.
    pub fn aspect_ratio(&self) -> Option<AspectRatio> {
        AspectRatio::new(self.width(), self.height())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Size of the display layer the overlay is drawn on, in display points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    width: f32,
    height: f32,
}

impl Viewport {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    fn ratio(&self) -> Option<f32> {
        if self.width > 0.0 && self.height > 0.0 {
            Some(self.width / self.height)
        } else {
            None
        }
    }

    /// Computes the centered rectangle that a content of aspect ratio `ratio` occupies when scaled
    /// to *cover* the whole viewport.
    ///
    /// The rectangle is at least as large as the viewport; parts outside of it are cropped away.
    pub fn fill_rect(&self, ratio: AspectRatio) -> LayerRect {
        self.place(ratio, |content, target| content > target)
    }

    /// Computes the centered, maximally sized rectangle inside the viewport that has aspect ratio
    /// `ratio` (letterboxing or pillarboxing the rest).
    pub fn fit_rect(&self, ratio: AspectRatio) -> LayerRect {
        self.place(ratio, |content, target| content < target)
    }

    fn place(&self, ratio: AspectRatio, limit_by_height: impl Fn(f32, f32) -> bool) -> LayerRect {
        let target = match self.ratio() {
            Some(target) => target,
            None => return LayerRect::new(0.0, 0.0, self.width, self.height),
        };

        let content = ratio.as_f32();
        let (w, h) = if limit_by_height(content, target) {
            (self.height * content, self.height)
        } else {
            (self.width, self.width / content)
        };

        let rect = LayerRect::new((self.width - w) / 2.0, (self.height - h) / 2.0, w, h);
        log::trace!("place aspect ratio {} in viewport {:?} -> {:?}", ratio, self, rect);
        rect
    }
}

/// An axis-aligned rectangle in display coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerRect {
    x: f32,
    y: f32,
    width: f32,
    height: f32,
}

impl LayerRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[inline]
    pub fn x(&self) -> f32 {
        self.x
    }

    #[inline]
    pub fn y(&self) -> f32 {
        self.y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Maps a point in the unit square to the corresponding point inside this rectangle.
    #[inline]
    pub fn transform_out(&self, u: f32, v: f32) -> [f32; 2] {
        [self.x + u * self.width, self.y + v * self.height]
    }
}

/// Ratio of a width to a height of an image.
#[derive(PartialEq, Eq, Clone, Copy)]
pub struct AspectRatio {
    // Invariant: `width` and `height` are nonzero and as small as possible (ie. their GCD is 1).
    width: u32,
    height: u32,
}

impl AspectRatio {
    /// Creates the aspect ratio representing `width:height`.
    ///
    /// If either `width` or `height` is `0`, returns `None`.
    pub fn new(width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 {
            return None;
        }

        let gcd = gcd(width, height);
        Some(Self {
            width: width / gcd,
            height: height / gcd,
        })
    }

    /// Returns the `f32` corresponding to this ratio.
    #[inline]
    pub fn as_f32(&self) -> f32 {
        self.width as f32 / self.height as f32
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.width, self.height)
    }
}

impl fmt::Debug for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

const fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b > 0 {
        let t = b;
        b = a % b;
        a = t;
    }

    a
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcd() {
        assert_eq!(gcd(6, 9), 3);
        assert_eq!(gcd(7, 13), 1);
        assert_eq!(1920 / gcd(1920, 1080), 16);
        assert_eq!(1080 / gcd(1920, 1080), 9);

        // degenerate case where one of the arguments is 0 - the other one will be returned
        assert_eq!(gcd(0, 7), 7);
        assert_eq!(gcd(7, 0), 7);
    }

    #[test]
    fn test_aspect_ratio() {
        let ratio1 = Resolution::new(1920, 1080).aspect_ratio().unwrap();
        let ratio2 = Resolution::new(1280, 720).aspect_ratio().unwrap();
        assert_eq!(ratio1, ratio2);
        assert_eq!(ratio1.to_string(), "16:9");
        assert_eq!(Resolution::new(0, 10).aspect_ratio(), None);
    }

    #[test]
    fn test_fill_rect() {
        let viewport = Viewport::new(16.0, 16.0);
        // Wider content overflows left and right.
        assert_eq!(
            viewport.fill_rect(AspectRatio::new(2, 1).unwrap()),
            LayerRect::new(-8.0, 0.0, 32.0, 16.0)
        );
        // Taller content overflows top and bottom.
        assert_eq!(
            viewport.fill_rect(AspectRatio::new(1, 2).unwrap()),
            LayerRect::new(0.0, -8.0, 16.0, 32.0)
        );
        assert_eq!(
            viewport.fill_rect(AspectRatio::new(3, 3).unwrap()),
            LayerRect::new(0.0, 0.0, 16.0, 16.0)
        );
    }

    #[test]
    fn test_fit_rect() {
        let viewport = Viewport::new(16.0, 16.0);
        assert_eq!(
            viewport.fit_rect(AspectRatio::new(16, 8).unwrap()),
            LayerRect::new(0.0, 4.0, 16.0, 8.0)
        );
        assert_eq!(
            viewport.fit_rect(AspectRatio::new(8, 16).unwrap()),
            LayerRect::new(4.0, 0.0, 8.0, 16.0)
        );
    }
}
