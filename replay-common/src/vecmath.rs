use serde::{Deserialize, Serialize};
use std::ops::{Add, Mul, Sub};

/// A simple 2D vector struct.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    /// Creates a new Vec2.
    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    /// Creates a zero vector.
    pub fn zero() -> Self {
        Vec2 { x: 0.0, y: 0.0 }
    }

    /// Calculates the length (magnitude) of the vector.
    pub fn length(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns a normalized version of the vector (unit vector).
    /// Returns a zero vector if the original vector's length is zero.
    pub fn normalize_or_zero(&self) -> Self {
        let len = self.length();
        if len > 1e-6 {
            Vec2 { x: self.x / len, y: self.y / len }
        } else {
            Vec2::zero()
        }
    }

    /// The vector rotated a quarter turn counter-clockwise.
    pub fn perpendicular(&self) -> Self {
        Vec2 { x: -self.y, y: self.x }
    }

    /// Mirrors a bottom-origin point into top-origin coordinates for a surface of `height`.
    pub fn flip_y(&self, height: f32) -> Self {
        Vec2 { x: self.x, y: height - self.y }
    }
}

impl Add for Vec2 {
    type Output = Self;
    fn add(self, other: Self) -> Self {
        Self { x: self.x + other.x, y: self.y + other.y }
    }
}

impl Sub for Vec2 {
    type Output = Self;
    fn sub(self, other: Self) -> Self {
        Self { x: self.x - other.x, y: self.y - other.y }
    }
}

impl Mul<f32> for Vec2 {
    type Output = Self;
    fn mul(self, scalar: f32) -> Self {
        Self { x: self.x * scalar, y: self.y * scalar }
    }
}

/// Converts a heading in math degrees (0 = +x, 90 = +y) to a unit vector.
pub fn heading_to_vec(angle_deg: f32) -> Vec2 {
    let rad = angle_deg.to_radians();
    Vec2::new(rad.cos(), rad.sin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flip_y_mirrors_around_height() {
        let p = Vec2::new(12.0, 150.0).flip_y(600.0);
        assert_eq!(p, Vec2::new(12.0, 450.0));
    }

    #[test]
    fn heading_ninety_points_up() {
        let v = heading_to_vec(90.0);
        assert!(v.x.abs() < 1e-6);
        assert!((v.y - 1.0).abs() < 1e-6);
    }
}
