//! Axis-aligned bounding boxes

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Axis-aligned extent `(min_x, min_y, max_x, max_y)`.
///
/// Used both for user clip requests (WGS84 decimal degrees) and for
/// source raster bounds after they are transformed to the same system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Build from a `(min_x, min_y, max_x, max_y)` tuple
    pub fn from_tuple(b: (f64, f64, f64, f64)) -> Self {
        Self::new(b.0, b.1, b.2, b.3)
    }

    pub fn to_tuple(&self) -> (f64, f64, f64, f64) {
        (self.min_x, self.min_y, self.max_x, self.max_y)
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Whether every coordinate is finite and min <= max on both axes
    pub fn is_valid(&self) -> bool {
        [self.min_x, self.min_y, self.max_x, self.max_y]
            .iter()
            .all(|v| v.is_finite())
            && self.min_x <= self.max_x
            && self.min_y <= self.max_y
    }

    /// True when the boxes share no area along the x axis
    pub fn disjoint_x(&self, other: &BoundingBox) -> bool {
        other.max_x < self.min_x || other.min_x > self.max_x
    }

    /// True when the boxes share no area along the y axis
    pub fn disjoint_y(&self, other: &BoundingBox) -> bool {
        other.max_y < self.min_y || other.min_y > self.max_y
    }

    pub fn contains(&self, other: &BoundingBox) -> bool {
        other.min_x >= self.min_x
            && other.max_x <= self.max_x
            && other.min_y >= self.min_y
            && other.max_y <= self.max_y
    }
}

impl FromStr for BoundingBox {
    type Err = Error;

    /// Parse `xmin,ymin,xmax,ymax`
    fn from_str(s: &str) -> Result<Self> {
        let values = s
            .split(',')
            .map(|part| {
                part.trim()
                    .parse::<f64>()
                    .map_err(|e| Error::InvalidBoundingBox(format!("'{}': {}", part.trim(), e)))
            })
            .collect::<Result<Vec<f64>>>()?;

        if values.len() != 4 {
            return Err(Error::InvalidBoundingBox(format!(
                "expected 4 comma-separated values, got {}",
                values.len()
            )));
        }

        let bbox = Self::new(values[0], values[1], values[2], values[3]);
        if !bbox.is_valid() {
            return Err(Error::InvalidBoundingBox(format!(
                "{} is not a valid xmin,ymin,xmax,ymax extent",
                bbox
            )));
        }
        Ok(bbox)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_x, self.min_y, self.max_x, self.max_y
        )
    }
}
