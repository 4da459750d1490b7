//! Page boxes and transformation matrices

use lopdf::{Document, Object, ObjectId};
use serde::{Deserialize, Serialize};

use crate::resources::{inherited_attribute, number};

/// US Letter, used when a page declares no usable box.
const DEFAULT_BOX: PageBox = PageBox {
    x0: 0.0,
    y0: 0.0,
    x1: 612.0,
    y1: 792.0,
};

/// Affine matrix `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix(pub [f64; 6]);

impl Matrix {
    pub const IDENTITY: Matrix = Matrix([1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);

    pub fn translate(tx: f64, ty: f64) -> Self {
        Matrix([1.0, 0.0, 0.0, 1.0, tx, ty])
    }

    /// `self × other`: transform by `self` first, then by `other`.
    pub fn concat(&self, other: &Matrix) -> Matrix {
        let [a1, b1, c1, d1, e1, f1] = self.0;
        let [a2, b2, c2, d2, e2, f2] = other.0;
        Matrix([
            a1 * a2 + b1 * c2,
            a1 * b2 + b1 * d2,
            c1 * a2 + d1 * c2,
            c1 * b2 + d1 * d2,
            e1 * a2 + f1 * c2 + e2,
            e1 * b2 + f1 * d2 + f2,
        ])
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        let [a, b, c, d, e, f] = self.0;
        (a * x + c * y + e, b * x + d * y + f)
    }

    /// Length of the transformed unit vertical vector.
    pub fn vertical_scale(&self) -> f64 {
        let [_, _, c, d, _, _] = self.0;
        (c * c + d * d).sqrt()
    }

    /// Build from six numeric operands (`cm`, `Tm`, form `/Matrix`).
    pub fn from_objects(operands: &[Object]) -> Option<Matrix> {
        if operands.len() < 6 {
            return None;
        }
        let mut m = [0.0; 6];
        for (slot, obj) in m.iter_mut().zip(operands) {
            *slot = number(obj)?;
        }
        Some(Matrix(m))
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Matrix::IDENTITY
    }
}

/// Visible page rectangle in PDF user space (origin bottom-left).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl PageBox {
    /// Normalised box from a four-number PDF rectangle array.
    pub fn from_object(obj: &Object) -> Option<PageBox> {
        let arr = obj.as_array().ok()?;
        if arr.len() < 4 {
            return None;
        }
        let (a, b, c, d) = (
            number(&arr[0])?,
            number(&arr[1])?,
            number(&arr[2])?,
            number(&arr[3])?,
        );
        let bbox = PageBox {
            x0: a.min(c),
            y0: b.min(d),
            x1: a.max(c),
            y1: b.max(d),
        };
        (bbox.width() > 0.0 && bbox.height() > 0.0).then_some(bbox)
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }

    /// User-space point to top-left page coordinates.
    pub fn to_top_left(&self, x: f64, y: f64) -> (f64, f64) {
        (x - self.x0, self.y1 - y)
    }

    /// Top-left page coordinates to a user-space point.
    pub fn from_top_left(&self, x: f64, y: f64) -> (f64, f64) {
        (self.x0 + x, self.y1 - y)
    }

    pub fn to_object(&self) -> Object {
        Object::Array(vec![
            Object::Real(self.x0 as f32),
            Object::Real(self.y0 as f32),
            Object::Real(self.x1 as f32),
            Object::Real(self.y1 as f32),
        ])
    }
}

/// Effective page box: CropBox if present, otherwise MediaBox.
pub fn page_box(doc: &Document, page_id: ObjectId) -> PageBox {
    let media = inherited_attribute(doc, page_id, b"MediaBox")
        .and_then(PageBox::from_object)
        .unwrap_or(DEFAULT_BOX);
    inherited_attribute(doc, page_id, b"CropBox")
        .and_then(PageBox::from_object)
        .unwrap_or(media)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_applies_left_operand_first() {
        let scale = Matrix([2.0, 0.0, 0.0, 2.0, 0.0, 0.0]);
        let shift = Matrix::translate(10.0, 20.0);
        assert_eq!(scale.concat(&shift).apply(1.0, 1.0), (12.0, 22.0));
        assert_eq!(shift.concat(&scale).apply(1.0, 1.0), (22.0, 42.0));
    }

    #[test]
    fn test_vertical_scale_of_rotation_is_one() {
        let rot = Matrix([0.0, 1.0, -1.0, 0.0, 0.0, 0.0]);
        assert!((rot.vertical_scale() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_page_box_normalises_inverted_rect() {
        let obj = Object::Array(vec![612.into(), 792.into(), 0.into(), 0.into()]);
        let bbox = PageBox::from_object(&obj).unwrap();
        assert_eq!(bbox.width(), 612.0);
        assert_eq!(bbox.height(), 792.0);
        assert_eq!(bbox.x0, 0.0);
    }

    #[test]
    fn test_page_box_rejects_degenerate_rect() {
        let obj = Object::Array(vec![0.into(), 0.into(), 0.into(), 792.into()]);
        assert!(PageBox::from_object(&obj).is_none());
    }

    #[test]
    fn test_top_left_conversion_roundtrip() {
        let bbox = PageBox {
            x0: 10.0,
            y0: 20.0,
            x1: 610.0,
            y1: 820.0,
        };
        let (x, y) = bbox.to_top_left(110.0, 720.0);
        assert_eq!((x, y), (100.0, 100.0));
        assert_eq!(bbox.from_top_left(x, y), (110.0, 720.0));
    }
}
