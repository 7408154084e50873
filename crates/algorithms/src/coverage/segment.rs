//! Directed boundary segments

use geo_types::Coord;

/// Orientation of a directed boundary segment.
///
/// Axis-aligned segments are common in practice (polygons that follow
/// administrative or grid-like features) and need deterministic handling
/// when they run exactly along a grid line: a segment never generates
/// crossing events on its own axis, so the cell it is recorded in is fixed
/// by the boundary-coordinate snap of the index lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SegmentOrientation {
    HorizontalRight,
    HorizontalLeft,
    VerticalUp,
    VerticalDown,
    Angled,
}

impl SegmentOrientation {
    /// Classify the segment from `start` to `end`. The segment must not be
    /// degenerate.
    pub(crate) fn of(start: &Coord<f64>, end: &Coord<f64>) -> Self {
        if start.y == end.y {
            if end.x > start.x {
                SegmentOrientation::HorizontalRight
            } else {
                SegmentOrientation::HorizontalLeft
            }
        } else if start.x == end.x {
            if end.y > start.y {
                SegmentOrientation::VerticalUp
            } else {
                SegmentOrientation::VerticalDown
            }
        } else {
            SegmentOrientation::Angled
        }
    }

    pub(crate) fn is_horizontal(&self) -> bool {
        matches!(
            self,
            SegmentOrientation::HorizontalRight | SegmentOrientation::HorizontalLeft
        )
    }

    pub(crate) fn is_vertical(&self) -> bool {
        matches!(
            self,
            SegmentOrientation::VerticalUp | SegmentOrientation::VerticalDown
        )
    }
}
