//! Geometry exchanged with the privileged context: [`Offset`] and [`BoundingRect`].
//!
//! Coordinates are absolute pixels from the host's viewport origin.

use std::ops::Add;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Offset
// ---------------------------------------------------------------------------

/// A 2D position or displacement.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Offset {
    pub x: f64,
    pub y: f64,
}

impl Offset {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Add for Offset {
    type Output = Offset;
    #[inline]
    fn add(self, rhs: Offset) -> Offset {
        Offset {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

// ---------------------------------------------------------------------------
// BoundingRect
// ---------------------------------------------------------------------------

/// A measured box, carrying both origin/size and edge coordinates.
///
/// The edge fields are redundant with `x`/`y`/`width`/`height`; they travel
/// on the wire so consumers can read whichever form they need.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundingRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl BoundingRect {
    /// Create a rectangle from its origin and size.
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            top: y,
            right: x + width,
            bottom: y + height,
            left: x,
        }
    }

    /// Top-left corner.
    pub fn origin(&self) -> Offset {
        Offset::new(self.x, self.y)
    }

    /// Shift by `offset`, keeping the size.
    pub fn translate(&self, offset: Offset) -> Self {
        Self::new(self.x + offset.x, self.y + offset.y, self.width, self.height)
    }

    /// Whether `point` lies inside (right/bottom edges exclusive).
    pub fn contains(&self, point: Offset) -> bool {
        point.x >= self.left && point.x < self.right && point.y >= self.top && point.y < self.bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn edges_follow_origin_and_size() {
        let rect = BoundingRect::new(10.0, 20.0, 100.0, 30.0);
        assert_eq!(rect.left, 10.0);
        assert_eq!(rect.top, 20.0);
        assert_eq!(rect.right, 110.0);
        assert_eq!(rect.bottom, 50.0);
    }

    #[test]
    fn translate_moves_edges() {
        let rect = BoundingRect::new(0.0, 0.0, 5.0, 5.0).translate(Offset::new(2.0, 3.0));
        assert_eq!(rect, BoundingRect::new(2.0, 3.0, 5.0, 5.0));
        assert_eq!(rect.origin() + Offset::new(1.0, 1.0), Offset::new(3.0, 4.0));
    }

    #[test]
    fn contains_excludes_far_edges() {
        let rect = BoundingRect::new(0.0, 0.0, 10.0, 10.0);
        assert!(rect.contains(Offset::new(0.0, 9.5)));
        assert!(!rect.contains(Offset::new(10.0, 5.0)));
    }

    #[test]
    fn wire_shape() {
        let json = serde_json::to_string(&BoundingRect::new(1.0, 2.0, 3.0, 4.0)).unwrap();
        insta::assert_snapshot!(
            json,
            @r#"{"x":1.0,"y":2.0,"width":3.0,"height":4.0,"top":2.0,"right":4.0,"bottom":6.0,"left":1.0}"#
        );
    }
}
