use std::fmt;
use thiserror::Error;

/// Added to the IoU denominator and to the precision/recall denominators so that
/// degenerate inputs never divide by zero.
pub const EPSILON: f64 = 1e-6;

/// Reasons a bounding box can be rejected at construction time.
#[derive(Debug, Error, PartialEq)]
pub enum BoundingBoxError {
    #[error("Failed to create BoundingBox, value for {name} is not a finite number ({value}).")]
    NonFiniteCoordinate { name: &'static str, value: f64 },
    #[error("Failed to create BoundingBox, value for left > value for right ({left} > {right}).")]
    InvertedHorizontal { left: f64, right: f64 },
    #[error("Failed to create BoundingBox, value for top > value for bottom ({top} > {bottom}).")]
    InvertedVertical { top: f64, bottom: f64 },
}

/// A struct representing a bounding box.
///
/// A bounding box is a rectangle used to annotate objects in images. For this project the
/// objects are tree crowns seen from above, and the category says whether the tree is
/// "Alive" or "Dead". Ground truth annotations are plain bounding boxes; detector output
/// wraps them in a [`Detection`](crate::annotations::detection::Detection) along with a
/// confidence score.
///
/// This project uses the standard convention of the left side of the image being x=0 and the
/// top of the image being y=0.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundingBox {
    left: f64,
    top: f64,
    right: f64,
    bottom: f64,
    category: String,
}

impl BoundingBox {
    /// Checks if a box has valid parameters before constructing.
    ///
    /// Zero width or zero height boxes are allowed.
    pub fn new(
        left: f64,
        top: f64,
        right: f64,
        bottom: f64,
        category: String,
    ) -> Result<Self, BoundingBoxError> {
        for (name, value) in [("left", left), ("top", top), ("right", right), ("bottom", bottom)] {
            if !value.is_finite() {
                return Err(BoundingBoxError::NonFiniteCoordinate { name, value });
            }
        }
        if left > right {
            Err(BoundingBoxError::InvertedHorizontal { left, right })
        } else if top > bottom {
            Err(BoundingBoxError::InvertedVertical { top, bottom })
        } else {
            Ok(BoundingBox { left, top, right, bottom, category })
        }
    }

    /// Builds a box from `[xmin, ymin, xmax, ymax]`.
    pub fn from_xyxy(xyxy: [f64; 4], category: String) -> Result<Self, BoundingBoxError> {
        let [left, top, right, bottom] = xyxy;
        BoundingBox::new(left, top, right, bottom, category)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BoundingBox {{ left: {}, top: {}, right: {}, bottom: {}, category: {} }}",
            self.left, self.top, self.right, self.bottom, self.category
        )
    }
}

/// Geometry shared by everything that can be compared with intersection over union.
pub trait BoundingBoxGeometry {
    fn left(&self) -> f64;
    fn top(&self) -> f64;
    fn right(&self) -> f64;
    fn bottom(&self) -> f64;
    fn category(&self) -> &str;

    fn width(&self) -> f64 {
        self.right() - self.left()
    }

    fn height(&self) -> f64 {
        self.bottom() - self.top()
    }

    fn area(&self) -> f64 {
        self.width() * self.height()
    }

    fn center(&self) -> (f64, f64) {
        (
            (self.left() + self.right()) / 2.0,
            (self.top() + self.bottom()) / 2.0,
        )
    }

    fn as_xyxy(&self) -> (f64, f64, f64, f64) {
        (self.left(), self.top(), self.right(), self.bottom())
    }

    fn intersection_over_union<U: BoundingBoxGeometry + ?Sized>(&self, other: &U) -> f64
    where
        Self: Sized,
    {
        intersection_over_union(self, other)
    }
}

impl BoundingBoxGeometry for BoundingBox {
    fn left(&self) -> f64 {
        self.left
    }

    fn top(&self) -> f64 {
        self.top
    }

    fn right(&self) -> f64 {
        self.right
    }

    fn bottom(&self) -> f64 {
        self.bottom
    }

    fn category(&self) -> &str {
        &self.category
    }
}

/// Intersection area divided by union area.
///
/// Boxes that do not overlap produce a negative raw extent on at least one axis, which is
/// clamped to zero. [`EPSILON`] keeps the division finite when both boxes have zero area, so
/// the result can exceed 1.0 only by rounding noise well below `EPSILON`.
pub fn intersection_over_union<A, B>(a: &A, b: &B) -> f64
where
    A: BoundingBoxGeometry + ?Sized,
    B: BoundingBoxGeometry + ?Sized,
{
    let x_a = a.left().max(b.left());
    let y_a = a.top().max(b.top());
    let x_b = a.right().min(b.right());
    let y_b = a.bottom().min(b.bottom());

    let intersection = (x_b - x_a).max(0.0) * (y_b - y_a).max(0.0);
    let union = a.area() + b.area() - intersection;
    intersection / (union + EPSILON)
}
