//! Shapes produced by the construction built‑ins.
//!
//! To the evaluator a shape is an opaque, first‑class value.  Geometry and
//! rendering live in the host; this module only records what was asked for,
//! in a form the host can consume (`Display` for humans, `serde` for the
//! renderer).

use std::fmt;

use serde::Serialize;

use crate::value::{fmt_number, Color, Vector};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name", rename_all = "lowercase")]
pub enum Shape {
    Square {
        size: f64,
        color: Color,
        rotation: f64,
    },

    Parallelogram {
        base: f64,
        height: f64,
        /// Horizontal shift of the top edge relative to the base.
        offset: f64,
        color: Color,
        rotation: f64,
    },

    /// `shape2` placed relative to `shape1` at `anchor`, the pair rotated by
    /// `rotation`.
    Composite {
        shape1: Box<Shape>,
        shape2: Box<Shape>,
        anchor: Vector,
        rotation: f64,
    },
}

impl Shape {
    pub fn name(&self) -> &'static str {
        match self {
            Shape::Square { .. } => "square",
            Shape::Parallelogram { .. } => "parallelogram",
            Shape::Composite { .. } => "composite",
        }
    }

    pub fn rotation(&self) -> f64 {
        match self {
            Shape::Square { rotation, .. }
            | Shape::Parallelogram { rotation, .. }
            | Shape::Composite { rotation, .. } => *rotation,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Square {
                size,
                color,
                rotation,
            } => {
                write!(f, "square(")?;
                fmt_number(*size, f)?;
                write!(f, " {} ", color)?;
                fmt_number(*rotation, f)?;
                write!(f, ")")
            }

            Shape::Parallelogram {
                base,
                height,
                offset,
                color,
                rotation,
            } => {
                write!(f, "parallelogram(")?;
                for n in [base, height, offset] {
                    fmt_number(*n, f)?;
                    write!(f, " ")?;
                }
                write!(f, "{} ", color)?;
                fmt_number(*rotation, f)?;
                write!(f, ")")
            }

            Shape::Composite {
                shape1,
                shape2,
                anchor,
                rotation,
            } => {
                write!(f, "merge({} {} {} ", shape1, shape2, anchor)?;
                fmt_number(*rotation, f)?;
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn square_serializes_with_its_name() {
        let square = Shape::Square {
            size: 3.0,
            color: Color::Green,
            rotation: 0.0,
        };
        let json = serde_json::to_value(&square).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"name": "square", "size": 3.0, "color": "green", "rotation": 0.0})
        );
    }

    #[test]
    fn composite_display_nests_its_parts() {
        let shape = Shape::Composite {
            shape1: Box::new(Shape::Square {
                size: 58.0,
                color: Color::Red,
                rotation: 0.0,
            }),
            shape2: Box::new(Shape::Square {
                size: 40.0,
                color: Color::Green,
                rotation: 45.0,
            }),
            anchor: Vector { x: 58.0, y: 0.0 },
            rotation: 0.0,
        };
        assert_eq!(
            shape.to_string(),
            "merge(square(58 red 0) square(40 green 45) (x:58 y:0) 0)"
        );
        assert_eq!(shape.name(), "composite");
    }
}
