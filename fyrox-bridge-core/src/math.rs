// Copyright (c) 2019-present Dmitry Stepanov and Fyrox Engine contributors.
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! Native layouts of math primitives and their fixed conversion to and from `nalgebra` types.
//!
//! The native engine stores vectors as three packed floats and rigid transforms as a rotation
//! quaternion (`x, y, z, w`) followed by a position. These layouts are plain values; they never
//! borrow from native memory.

use crate::algebra::{Isometry3, Quaternion, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// Native three-component vector.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct NativeVec3 {
    /// X component.
    pub x: f32,
    /// Y component.
    pub y: f32,
    /// Z component.
    pub z: f32,
}

impl NativeVec3 {
    /// All components set to zero.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0);
    /// All components set to one.
    pub const ONE: Self = Self::new(1.0, 1.0, 1.0);

    /// Creates a new vector.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Returns `true` if every component is finite.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Component-wise product.
    pub fn component_mul(&self, other: &Self) -> Self {
        Self::new(self.x * other.x, self.y * other.y, self.z * other.z)
    }
}

impl From<Vector3<f32>> for NativeVec3 {
    fn from(v: Vector3<f32>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

impl From<NativeVec3> for Vector3<f32> {
    fn from(v: NativeVec3) -> Self {
        Vector3::new(v.x, v.y, v.z)
    }
}

impl From<[f32; 3]> for NativeVec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Native quaternion, imaginary part first.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct NativeQuat {
    /// First imaginary component.
    pub x: f32,
    /// Second imaginary component.
    pub y: f32,
    /// Third imaginary component.
    pub z: f32,
    /// Real component.
    pub w: f32,
}

impl NativeQuat {
    /// Identity rotation.
    pub const IDENTITY: Self = Self {
        x: 0.0,
        y: 0.0,
        z: 0.0,
        w: 1.0,
    };
}

impl Default for NativeQuat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<UnitQuaternion<f32>> for NativeQuat {
    fn from(q: UnitQuaternion<f32>) -> Self {
        let c = &q.coords;
        Self {
            x: c.x,
            y: c.y,
            z: c.z,
            w: c.w,
        }
    }
}

impl From<NativeQuat> for UnitQuaternion<f32> {
    fn from(q: NativeQuat) -> Self {
        UnitQuaternion::new_normalize(Quaternion::new(q.w, q.x, q.y, q.z))
    }
}

/// Native rigid transform.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct NativeTransform {
    /// Rotation.
    pub q: NativeQuat,
    /// Position.
    pub p: NativeVec3,
}

impl NativeTransform {
    /// Transform that does nothing.
    pub const IDENTITY: Self = Self {
        q: NativeQuat::IDENTITY,
        p: NativeVec3::ZERO,
    };

    /// Returns `true` if both rotation and position are finite.
    pub fn is_finite(&self) -> bool {
        self.p.is_finite()
            && self.q.x.is_finite()
            && self.q.y.is_finite()
            && self.q.z.is_finite()
            && self.q.w.is_finite()
    }
}

impl From<Isometry3<f32>> for NativeTransform {
    fn from(iso: Isometry3<f32>) -> Self {
        Self {
            q: iso.rotation.into(),
            p: iso.translation.vector.into(),
        }
    }
}

impl From<&Isometry3<f32>> for NativeTransform {
    fn from(iso: &Isometry3<f32>) -> Self {
        (*iso).into()
    }
}

impl From<NativeTransform> for Isometry3<f32> {
    fn from(t: NativeTransform) -> Self {
        Isometry3::from_parts(
            Translation3::new(t.p.x, t.p.y, t.p.z),
            UnitQuaternion::from(t.q),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transform_round_trip() {
        let iso = Isometry3::new(
            Vector3::new(1.0, -2.0, 3.5),
            Vector3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0),
        );
        let native = NativeTransform::from(iso);
        let back = Isometry3::from(native);

        assert!((back.translation.vector - iso.translation.vector).norm() < 1.0e-6);
        assert!(back.rotation.angle_to(&iso.rotation) < 1.0e-5);
    }

    #[test]
    fn identity_matches_nalgebra_identity() {
        assert_eq!(
            NativeTransform::from(Isometry3::<f32>::identity()),
            NativeTransform::IDENTITY
        );
    }

    #[test]
    fn vec3_finite() {
        assert!(NativeVec3::ONE.is_finite());
        assert!(!NativeVec3::new(f32::NAN, 0.0, 0.0).is_finite());
    }
}
