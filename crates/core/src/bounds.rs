//! Axis-aligned bounding boxes

use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle in the common planar coordinate space.
///
/// Used for grid extents, zone bounding boxes and individual cell
/// rectangles. Degenerate (zero width or height) boxes are permitted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Bounds {
    /// Create a new box. `xmin <= xmax` and `ymin <= ymax` are required.
    pub fn new(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Self {
        debug_assert!(xmin <= xmax, "xmin ({xmin}) must not exceed xmax ({xmax})");
        debug_assert!(ymin <= ymax, "ymin ({ymin}) must not exceed ymax ({ymax})");
        Self {
            xmin,
            ymin,
            xmax,
            ymax,
        }
    }

    pub fn width(&self) -> f64 {
        self.xmax - self.xmin
    }

    pub fn height(&self) -> f64 {
        self.ymax - self.ymin
    }

    pub fn area(&self) -> f64 {
        self.width() * self.height()
    }

    /// Whether the point lies inside or on the edge of the box.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.xmin && x <= self.xmax && y >= self.ymin && y <= self.ymax
    }

    /// Whether the other box is entirely inside this one (edges may touch).
    pub fn contains_box(&self, other: &Bounds) -> bool {
        other.xmin >= self.xmin
            && other.xmax <= self.xmax
            && other.ymin >= self.ymin
            && other.ymax <= self.ymax
    }

    /// Whether the two boxes share any point (edge contact counts).
    pub fn intersects(&self, other: &Bounds) -> bool {
        self.xmin <= other.xmax
            && self.xmax >= other.xmin
            && self.ymin <= other.ymax
            && self.ymax >= other.ymin
    }

    /// The shared region of two boxes, or `None` when they are disjoint.
    pub fn intersection(&self, other: &Bounds) -> Option<Bounds> {
        if !self.intersects(other) {
            return None;
        }
        Some(Bounds::new(
            self.xmin.max(other.xmin),
            self.ymin.max(other.ymin),
            self.xmax.min(other.xmax),
            self.ymax.min(other.ymax),
        ))
    }

    /// The smallest box covering both inputs.
    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds::new(
            self.xmin.min(other.xmin),
            self.ymin.min(other.ymin),
            self.xmax.max(other.xmax),
            self.ymax.max(other.ymax),
        )
    }
}

impl From<geo_types::Rect<f64>> for Bounds {
    fn from(rect: geo_types::Rect<f64>) -> Self {
        Bounds::new(rect.min().x, rect.min().y, rect.max().x, rect.max().y)
    }
}
