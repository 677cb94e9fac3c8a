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

//! Geometry variants.
//!
//! Geometries are plain values describing the form of a shape. They hold no native objects of
//! their own: primitives carry only numbers, mesh-backed variants share the mesh wrapper through
//! an `Arc`. A geometry becomes a native descriptor only when a shape is created from it.

use crate::{
    core::algebra::Vector3,
    error::BridgeError,
    mesh::{ConvexMesh, HeightField, TriangleMesh},
    native::{
        NativeBoxGeometry, NativeCapsuleGeometry, NativeConvexMeshGeometry, NativeGeometry,
        NativeHeightFieldGeometry, NativePlaneGeometry, NativeSphereGeometry,
        NativeTriangleMeshGeometry, NativeVec3,
    },
    physics::PhysicsId,
};
use bitflags::bitflags;
use std::sync::Arc;
use strum_macros::{AsRefStr, EnumString, VariantNames};

fn non_negative(value: f32) -> f32 {
    // `max` returns the other operand for NaN.
    value.max(0.0)
}

fn is_valid_extent(value: f32) -> bool {
    value.is_finite() && value >= 0.0
}

/// Kind of a geometry.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, AsRefStr, EnumString, VariantNames)]
pub enum GeometryType {
    Box,
    Sphere,
    Capsule,
    Plane,
    ConvexMesh,
    TriangleMesh,
    HeightField,
}

bitflags! {
    /// Flags of mesh-backed geometry.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MeshGeometryFlags: u32 {
        /// Use tighter, but more expensive to compute, bounds.
        const TIGHT_BOUNDS = 1;
        /// Triangles collide from both sides.
        const DOUBLE_SIDED = 1 << 1;
    }
}

/// Non-uniform scale applied to a mesh in its local frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MeshScale {
    pub scale: Vector3<f32>,
}

impl Default for MeshScale {
    fn default() -> Self {
        Self::identity()
    }
}

impl MeshScale {
    pub fn identity() -> Self {
        Self::uniform(1.0)
    }

    pub fn uniform(scale: f32) -> Self {
        Self {
            scale: Vector3::repeat(scale),
        }
    }

    pub fn new(scale: Vector3<f32>) -> Self {
        Self { scale }
    }

    pub fn is_valid(&self) -> bool {
        self.scale.iter().all(|s| s.is_finite() && *s > 0.0)
    }
}

/// Box given by its half-extents.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BoxGeometry {
    pub half_extents: Vector3<f32>,
}

impl BoxGeometry {
    /// Negative or NaN extents become zero. A zero extent is a flat box, not an error.
    pub fn new(hx: f32, hy: f32, hz: f32) -> Self {
        Self {
            half_extents: Vector3::new(non_negative(hx), non_negative(hy), non_negative(hz)),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.half_extents.iter().all(|e| is_valid_extent(*e))
    }

    pub fn to_native_descriptor(&self) -> NativeBoxGeometry {
        NativeBoxGeometry {
            half_extents: NativeVec3::from(self.half_extents),
        }
    }
}

impl From<Vector3<f32>> for BoxGeometry {
    fn from(half_extents: Vector3<f32>) -> Self {
        Self::new(half_extents.x, half_extents.y, half_extents.z)
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SphereGeometry {
    pub radius: f32,
}

impl SphereGeometry {
    pub fn new(radius: f32) -> Self {
        Self {
            radius: non_negative(radius),
        }
    }

    pub fn is_valid(&self) -> bool {
        is_valid_extent(self.radius)
    }

    pub fn to_native_descriptor(&self) -> NativeSphereGeometry {
        NativeSphereGeometry {
            radius: self.radius,
        }
    }
}

/// Capsule along the local X axis: a cylinder of length `2 * half_height` capped by two
/// hemispheres of `radius`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CapsuleGeometry {
    pub radius: f32,
    pub half_height: f32,
}

impl CapsuleGeometry {
    pub fn new(radius: f32, half_height: f32) -> Self {
        Self {
            radius: non_negative(radius),
            half_height: non_negative(half_height),
        }
    }

    pub fn is_valid(&self) -> bool {
        is_valid_extent(self.radius) && is_valid_extent(self.half_height)
    }

    pub fn to_native_descriptor(&self) -> NativeCapsuleGeometry {
        NativeCapsuleGeometry {
            radius: self.radius,
            half_height: self.half_height,
        }
    }
}

/// Half-space `x <= 0` in the shape's local frame. Orient it with the shape's local pose.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct PlaneGeometry;

impl PlaneGeometry {
    pub fn to_native_descriptor(&self) -> NativePlaneGeometry {
        NativePlaneGeometry
    }
}

#[derive(Clone, Debug)]
pub struct ConvexMeshGeometry {
    pub mesh: Arc<ConvexMesh>,
    pub scale: MeshScale,
}

impl PartialEq for ConvexMeshGeometry {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.mesh, &other.mesh) && self.scale == other.scale
    }
}

impl ConvexMeshGeometry {
    pub fn new(mesh: Arc<ConvexMesh>) -> Self {
        Self {
            mesh,
            scale: Default::default(),
        }
    }

    pub fn with_scale(mut self, scale: MeshScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.scale.is_valid()
    }

    /// Fails with [`BridgeError::InvalidOperation`] if the mesh was disposed.
    pub fn to_native_descriptor(&self) -> Result<NativeConvexMeshGeometry, BridgeError> {
        Ok(NativeConvexMeshGeometry {
            scale: NativeVec3::from(self.scale.scale),
            mesh: self.mesh.native()?,
        })
    }
}

#[derive(Clone, Debug)]
pub struct TriangleMeshGeometry {
    pub mesh: Arc<TriangleMesh>,
    pub scale: MeshScale,
    pub flags: MeshGeometryFlags,
}

impl PartialEq for TriangleMeshGeometry {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.mesh, &other.mesh)
            && self.scale == other.scale
            && self.flags == other.flags
    }
}

impl TriangleMeshGeometry {
    pub fn new(mesh: Arc<TriangleMesh>) -> Self {
        Self {
            mesh,
            scale: Default::default(),
            flags: Default::default(),
        }
    }

    pub fn with_scale(mut self, scale: MeshScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_flags(mut self, flags: MeshGeometryFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.scale.is_valid()
    }

    /// Fails with [`BridgeError::InvalidOperation`] if the mesh was disposed.
    pub fn to_native_descriptor(&self) -> Result<NativeTriangleMeshGeometry, BridgeError> {
        Ok(NativeTriangleMeshGeometry {
            scale: NativeVec3::from(self.scale.scale),
            flags: self.flags.bits(),
            mesh: self.mesh.native()?,
        })
    }
}

/// Height field placed in the XZ plane. Sample heights are multiplied by `height_scale`, rows
/// are `row_scale` apart along Z and columns `column_scale` apart along X.
#[derive(Clone, Debug)]
pub struct HeightFieldGeometry {
    pub height_field: Arc<HeightField>,
    pub height_scale: f32,
    pub row_scale: f32,
    pub column_scale: f32,
    pub flags: MeshGeometryFlags,
}

impl PartialEq for HeightFieldGeometry {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.height_field, &other.height_field)
            && self.height_scale == other.height_scale
            && self.row_scale == other.row_scale
            && self.column_scale == other.column_scale
            && self.flags == other.flags
    }
}

impl HeightFieldGeometry {
    pub fn new(
        height_field: Arc<HeightField>,
        height_scale: f32,
        row_scale: f32,
        column_scale: f32,
    ) -> Self {
        Self {
            height_field,
            height_scale,
            row_scale: non_negative(row_scale),
            column_scale: non_negative(column_scale),
            flags: Default::default(),
        }
    }

    pub fn with_flags(mut self, flags: MeshGeometryFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn is_valid(&self) -> bool {
        self.height_scale.is_finite()
            && self.height_scale != 0.0
            && is_valid_extent(self.row_scale)
            && is_valid_extent(self.column_scale)
    }

    /// Fails with [`BridgeError::InvalidOperation`] if the height field was disposed.
    pub fn to_native_descriptor(&self) -> Result<NativeHeightFieldGeometry, BridgeError> {
        Ok(NativeHeightFieldGeometry {
            height_field: self.height_field.native()?,
            height_scale: self.height_scale,
            row_scale: self.row_scale,
            column_scale: self.column_scale,
            flags: self.flags.bits(),
        })
    }
}

/// Closed set of geometries a shape can be made of.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Box(BoxGeometry),
    Sphere(SphereGeometry),
    Capsule(CapsuleGeometry),
    Plane(PlaneGeometry),
    ConvexMesh(ConvexMeshGeometry),
    TriangleMesh(TriangleMeshGeometry),
    HeightField(HeightFieldGeometry),
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Box(_) => GeometryType::Box,
            Geometry::Sphere(_) => GeometryType::Sphere,
            Geometry::Capsule(_) => GeometryType::Capsule,
            Geometry::Plane(_) => GeometryType::Plane,
            Geometry::ConvexMesh(_) => GeometryType::ConvexMesh,
            Geometry::TriangleMesh(_) => GeometryType::TriangleMesh,
            Geometry::HeightField(_) => GeometryType::HeightField,
        }
    }

    pub fn is_valid(&self) -> bool {
        match self {
            Geometry::Box(g) => g.is_valid(),
            Geometry::Sphere(g) => g.is_valid(),
            Geometry::Capsule(g) => g.is_valid(),
            Geometry::Plane(_) => true,
            Geometry::ConvexMesh(g) => g.is_valid(),
            Geometry::TriangleMesh(g) => g.is_valid(),
            Geometry::HeightField(g) => g.is_valid(),
        }
    }

    /// Triangle meshes, height fields and planes can only take part in simulation on static
    /// actors.
    pub fn is_simulatable_on_dynamic(&self) -> bool {
        !matches!(
            self,
            Geometry::TriangleMesh(_) | Geometry::HeightField(_) | Geometry::Plane(_)
        )
    }

    /// Context of the mesh behind a mesh-backed geometry. `None` for primitives and for
    /// disposed meshes.
    pub fn physics(&self) -> Option<PhysicsId> {
        match self {
            Geometry::ConvexMesh(g) => g.mesh.physics(),
            Geometry::TriangleMesh(g) => g.mesh.physics(),
            Geometry::HeightField(g) => g.height_field.physics(),
            Geometry::Box(_) | Geometry::Sphere(_) | Geometry::Capsule(_) | Geometry::Plane(_) => {
                None
            }
        }
    }

    pub fn to_native_descriptor(&self) -> Result<NativeGeometry, BridgeError> {
        Ok(match self {
            Geometry::Box(g) => NativeGeometry::Box(g.to_native_descriptor()),
            Geometry::Sphere(g) => NativeGeometry::Sphere(g.to_native_descriptor()),
            Geometry::Capsule(g) => NativeGeometry::Capsule(g.to_native_descriptor()),
            Geometry::Plane(g) => NativeGeometry::Plane(g.to_native_descriptor()),
            Geometry::ConvexMesh(g) => NativeGeometry::ConvexMesh(g.to_native_descriptor()?),
            Geometry::TriangleMesh(g) => NativeGeometry::TriangleMesh(g.to_native_descriptor()?),
            Geometry::HeightField(g) => NativeGeometry::HeightField(g.to_native_descriptor()?),
        })
    }
}

macro_rules! impl_from_geometry {
    ($($variant:ident($ty:ty)),*) => {
        $(
            impl From<$ty> for Geometry {
                fn from(geometry: $ty) -> Self {
                    Geometry::$variant(geometry)
                }
            }
        )*
    };
}

impl_from_geometry!(
    Box(BoxGeometry),
    Sphere(SphereGeometry),
    Capsule(CapsuleGeometry),
    Plane(PlaneGeometry),
    ConvexMesh(ConvexMeshGeometry),
    TriangleMesh(TriangleMeshGeometry),
    HeightField(HeightFieldGeometry)
);

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        cooking::TriangleMeshDesc, native::rapier::RapierPhysics, physics::Physics,
    };
    use proptest::prelude::*;
    use std::str::FromStr;
    use strum::VariantNames;

    #[test]
    fn box_constructors_are_equivalent() {
        let a = BoxGeometry::new(1.0, 2.0, 3.0);
        let b = BoxGeometry::from(Vector3::new(1.0, 2.0, 3.0));
        assert_eq!(a, b);
        assert_eq!(a.to_native_descriptor(), b.to_native_descriptor());
        assert_eq!(
            a.to_native_descriptor().half_extents,
            NativeVec3::new(1.0, 2.0, 3.0)
        );
    }

    #[test]
    fn negative_and_nan_extents_become_zero() {
        let b = BoxGeometry::new(-1.0, f32::NAN, 2.0);
        assert_eq!(b.half_extents, Vector3::new(0.0, 0.0, 2.0));
        assert!(b.is_valid());
        assert_eq!(SphereGeometry::new(-3.0).radius, 0.0);
        assert_eq!(CapsuleGeometry::new(f32::NAN, -1.0), CapsuleGeometry::new(0.0, 0.0));
        assert!(!BoxGeometry::new(f32::INFINITY, 1.0, 1.0).is_valid());
    }

    #[test]
    fn equal_fields_give_equal_descriptors() {
        let geometries = [
            Geometry::from(BoxGeometry::new(0.5, 0.5, 0.5)),
            Geometry::from(SphereGeometry::new(2.0)),
            Geometry::from(CapsuleGeometry::new(0.3, 1.0)),
            Geometry::from(PlaneGeometry),
        ];
        for geometry in geometries.iter() {
            let copy = geometry.clone();
            assert_eq!(
                geometry.to_native_descriptor().unwrap(),
                copy.to_native_descriptor().unwrap()
            );
        }
    }

    #[test]
    fn geometry_types() {
        assert_eq!(
            Geometry::from(SphereGeometry::new(1.0)).geometry_type(),
            GeometryType::Sphere
        );
        assert_eq!(GeometryType::HeightField.as_ref(), "HeightField");
        assert_eq!(
            GeometryType::from_str("Capsule").unwrap(),
            GeometryType::Capsule
        );
        assert_eq!(GeometryType::VARIANTS.len(), 7);
    }

    #[test]
    fn mesh_geometry_follows_mesh_lifetime() {
        let physics = Physics::new(Arc::new(RapierPhysics::new()));
        let mesh = physics
            .create_triangle_mesh(&TriangleMeshDesc::new(
                vec![
                    Vector3::new(0.0, 0.0, 0.0),
                    Vector3::new(1.0, 0.0, 0.0),
                    Vector3::new(0.0, 0.0, 1.0),
                ],
                vec![[0, 1, 2]],
            ))
            .unwrap();
        let geometry = Geometry::from(
            TriangleMeshGeometry::new(mesh.clone())
                .with_scale(MeshScale::uniform(2.0))
                .with_flags(MeshGeometryFlags::DOUBLE_SIDED),
        );
        assert!(!geometry.is_simulatable_on_dynamic());
        assert_eq!(geometry.physics(), Some(physics.id()));

        match geometry.to_native_descriptor().unwrap() {
            NativeGeometry::TriangleMesh(native) => {
                assert_eq!(native.scale, NativeVec3::new(2.0, 2.0, 2.0));
                assert_eq!(native.flags, MeshGeometryFlags::DOUBLE_SIDED.bits());
                assert_eq!(native.mesh, mesh.native().unwrap());
            }
            other => panic!("unexpected descriptor {other:?}"),
        }

        mesh.dispose().unwrap();
        assert!(matches!(
            geometry.to_native_descriptor(),
            Err(BridgeError::InvalidOperation(_))
        ));
    }

    #[test]
    fn simulatable_kinds() {
        assert!(Geometry::from(BoxGeometry::new(1.0, 1.0, 1.0)).is_simulatable_on_dynamic());
        assert!(!Geometry::from(PlaneGeometry).is_simulatable_on_dynamic());
    }

    proptest! {
        #[test]
        fn primitive_descriptors_depend_only_on_fields(
            x in any::<f32>(),
            y in any::<f32>(),
            z in any::<f32>()
        ) {
            let a = BoxGeometry::new(x, y, z);
            let b = BoxGeometry::from(Vector3::new(x, y, z));
            prop_assert_eq!(a, b);
            prop_assert_eq!(a.to_native_descriptor(), b.to_native_descriptor());
            prop_assert_eq!(a.to_native_descriptor(), a.to_native_descriptor());
            prop_assert!(a.half_extents.iter().all(|e| *e >= 0.0));

            let sphere = SphereGeometry::new(x);
            prop_assert_eq!(sphere, SphereGeometry::new(x));
            prop_assert_eq!(
                sphere.to_native_descriptor(),
                SphereGeometry::new(x).to_native_descriptor()
            );
            prop_assert!(sphere.radius >= 0.0);

            let capsule = CapsuleGeometry::new(y, z);
            prop_assert_eq!(capsule, CapsuleGeometry::new(y, z));
            prop_assert_eq!(
                capsule.to_native_descriptor(),
                CapsuleGeometry::new(y, z).to_native_descriptor()
            );
            prop_assert_eq!(
                Geometry::from(capsule).to_native_descriptor().ok(),
                Geometry::from(CapsuleGeometry::new(y, z)).to_native_descriptor().ok()
            );
        }
    }
}
