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

//! The narrow interface to the external rigid-body engine.
//!
//! Everything the bridge knows about the engine goes through [`NativePhysics`]. Objects living
//! inside the engine are referred to by opaque, typed [`NativePtr`] addresses, and every value
//! crossing the boundary uses one of the `#[repr(C)]` layouts defined here. The engine owns the
//! memory behind an address; the bridge owns the right to release it (see
//! [`crate::handle::NativeHandle`]).
//!
//! # Threading
//!
//! The engine drives contact-modification callbacks and applies shape/actor mutations on a
//! single simulation thread. Mutating actors or shapes while a simulation step is running is
//! unsupported and may corrupt native state; the bridge does not try to detect it.

pub mod rapier;

use crate::error::NativeError;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Debug, Display, Formatter},
    hash::{Hash, Hasher},
    marker::PhantomData,
    num::NonZeroU64,
    sync::Arc,
};

pub use crate::core::math::{NativeQuat, NativeTransform, NativeVec3};

/// Shared reference to a native engine instance.
pub type SharedNative = Arc<dyn NativePhysics>;

/// Opaque address of an object of type `T` that lives inside the native engine. Addresses are
/// never null; whether the object behind one is still alive is tracked by whoever owns it, not
/// by the address.
#[repr(transparent)]
pub struct NativePtr<T> {
    address: NonZeroU64,
    phantom: PhantomData<fn() -> T>,
}

impl<T> NativePtr<T> {
    /// Wraps a raw non-zero address.
    pub fn from_raw(address: NonZeroU64) -> Self {
        Self {
            address,
            phantom: PhantomData,
        }
    }

    /// Wraps a raw address, returning `None` for zero (the native "null").
    pub fn new(address: u64) -> Option<Self> {
        NonZeroU64::new(address).map(Self::from_raw)
    }

    /// Raw address value.
    pub fn address(self) -> u64 {
        self.address.get()
    }
}

impl<T> Copy for NativePtr<T> {}

impl<T> Clone for NativePtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> PartialEq for NativePtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl<T> Eq for NativePtr<T> {}

impl<T> Hash for NativePtr<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.address.hash(state)
    }
}

impl<T: NativeObject> Debug for NativePtr<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{:#x}", T::TYPE_NAME, self.address)
    }
}

impl<T: NativeObject> Display for NativePtr<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

/// A kind of object that lives in the native engine and is released through it.
pub trait NativeObject: Sized + 'static {
    /// Human-readable type name used in diagnostics.
    const TYPE_NAME: &'static str;

    /// Issues the native release call for the object at `ptr`.
    fn release(native: &dyn NativePhysics, ptr: NativePtr<Self>) -> Result<(), NativeError>;
}

macro_rules! define_native_object {
    ($(#[$meta:meta])* $name:ident, $type_name:literal, $release:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub enum $name {}

        impl NativeObject for $name {
            const TYPE_NAME: &'static str = $type_name;

            fn release(native: &dyn NativePhysics, ptr: NativePtr<Self>) -> Result<(), NativeError> {
                native.$release(ptr)
            }
        }
    };
}

define_native_object!(
    /// Native rigid actor (static or dynamic body).
    NativeActor,
    "RigidActor",
    release_actor
);
define_native_object!(
    /// Native shape attached to an actor.
    NativeShape,
    "Shape",
    release_shape
);
define_native_object!(
    /// Native material.
    NativeMaterial,
    "Material",
    release_material
);
define_native_object!(
    /// Native cooked triangle mesh.
    NativeTriangleMesh,
    "TriangleMesh",
    release_triangle_mesh
);
define_native_object!(
    /// Native cooked convex mesh.
    NativeConvexMesh,
    "ConvexMesh",
    release_convex_mesh
);
define_native_object!(
    /// Native height field.
    NativeHeightField,
    "HeightField",
    release_height_field
);

/// Kind of a native rigid actor.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum NativeActorKind {
    /// Never moves, participates in simulation as an immovable obstacle.
    Static = 0,
    /// Simulated body.
    Dynamic = 1,
}

bitflags! {
    /// Per-shape flags understood by the native engine.
    #[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ShapeFlags: u32 {
        /// The shape takes part in contact generation and response.
        const SIMULATION_SHAPE = 1 << 0;
        /// The shape is visible to scene queries (ray casts, overlaps, sweeps).
        const SCENE_QUERY_SHAPE = 1 << 1;
        /// The shape is a trigger volume. Mutually exclusive with `SIMULATION_SHAPE`.
        const TRIGGER_SHAPE = 1 << 2;
        /// The shape is included in debug visualization.
        const VISUALIZATION = 1 << 3;
    }
}

impl Default for ShapeFlags {
    fn default() -> Self {
        Self::VISUALIZATION | Self::SIMULATION_SHAPE | Self::SCENE_QUERY_SHAPE
    }
}

/// Native box layout.
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C)]
pub struct NativeBoxGeometry {
    pub half_extents: NativeVec3,
}

/// Native sphere layout.
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C)]
pub struct NativeSphereGeometry {
    pub radius: f32,
}

/// Native capsule layout. The capsule axis is the local X axis.
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C)]
pub struct NativeCapsuleGeometry {
    pub radius: f32,
    pub half_height: f32,
}

/// Native plane layout: the half-space `x <= 0` in shape space. Carries no data.
#[derive(Copy, Clone, Debug, PartialEq, Default)]
pub struct NativePlaneGeometry;

/// Native convex mesh instance layout.
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C)]
pub struct NativeConvexMeshGeometry {
    pub scale: NativeVec3,
    pub mesh: NativePtr<NativeConvexMesh>,
}

/// Native triangle mesh instance layout.
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C)]
pub struct NativeTriangleMeshGeometry {
    pub scale: NativeVec3,
    pub flags: u32,
    pub mesh: NativePtr<NativeTriangleMesh>,
}

/// Native height field instance layout.
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C)]
pub struct NativeHeightFieldGeometry {
    pub height_field: NativePtr<NativeHeightField>,
    pub height_scale: f32,
    pub row_scale: f32,
    pub column_scale: f32,
    pub flags: u32,
}

/// A geometry descriptor in the layout the native engine consumes when allocating a shape.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NativeGeometry {
    Box(NativeBoxGeometry),
    Sphere(NativeSphereGeometry),
    Capsule(NativeCapsuleGeometry),
    Plane(NativePlaneGeometry),
    ConvexMesh(NativeConvexMeshGeometry),
    TriangleMesh(NativeTriangleMeshGeometry),
    HeightField(NativeHeightFieldGeometry),
}

/// Everything the engine needs to allocate a shape on an actor.
#[derive(Copy, Clone, Debug)]
pub struct NativeShapeDesc {
    pub actor: NativePtr<NativeActor>,
    pub geometry: NativeGeometry,
    pub material: NativePtr<NativeMaterial>,
    pub local_pose: NativeTransform,
    pub flags: ShapeFlags,
}

/// Surface properties of a native material.
#[derive(Copy, Clone, Debug, PartialEq)]
#[repr(C)]
pub struct NativeMaterialDesc {
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub restitution: f32,
}

/// Input for triangle mesh cooking.
#[derive(Copy, Clone, Debug)]
pub struct NativeTriangleMeshDesc<'a> {
    pub points: &'a [NativeVec3],
    pub triangles: &'a [[u32; 3]],
    /// Either empty or one material index per triangle.
    pub materials: &'a [u16],
    /// Keep 32-bit indices even if every vertex index fits into 16 bits.
    pub force_32bit_indices: bool,
}

/// Input for convex mesh cooking.
#[derive(Copy, Clone, Debug)]
pub struct NativeConvexMeshDesc<'a> {
    pub points: &'a [NativeVec3],
}

/// One height field sample.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(C)]
pub struct NativeHeightFieldSample {
    pub height: i16,
    pub material_index0: u8,
    pub material_index1: u8,
}

/// Input for height field creation. Samples are stored row by row.
#[derive(Copy, Clone, Debug)]
pub struct NativeHeightFieldDesc<'a> {
    pub rows: u32,
    pub columns: u32,
    pub samples: &'a [NativeHeightFieldSample],
}

/// Triangle index storage of a cooked mesh, in its native width.
#[derive(Copy, Clone, Debug)]
pub enum NativeTriangleIndices<'a> {
    U16(&'a [[u16; 3]]),
    U32(&'a [[u32; 3]]),
}

impl NativeTriangleIndices<'_> {
    /// Number of triangles.
    pub fn len(&self) -> usize {
        match self {
            NativeTriangleIndices::U16(t) => t.len(),
            NativeTriangleIndices::U32(t) => t.len(),
        }
    }

    /// Returns `true` if there are no triangles.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Borrowed view of native triangle mesh memory. Only valid inside the visitor it was handed to.
#[derive(Copy, Clone, Debug)]
pub struct NativeTriangleMeshView<'a> {
    pub vertices: &'a [NativeVec3],
    pub triangles: NativeTriangleIndices<'a>,
    /// For every cooked triangle, the index of the source triangle it came from.
    pub remap: &'a [u32],
    /// One material index per cooked triangle.
    pub materials: &'a [u16],
    pub reference_count: u32,
}

/// Borrowed view of native convex mesh memory.
#[derive(Copy, Clone, Debug)]
pub struct NativeConvexMeshView<'a> {
    pub vertices: &'a [NativeVec3],
    pub reference_count: u32,
}

/// Borrowed view of native height field memory.
#[derive(Copy, Clone, Debug)]
pub struct NativeHeightFieldView<'a> {
    pub rows: u32,
    pub columns: u32,
    pub samples: &'a [NativeHeightFieldSample],
    pub reference_count: u32,
}

/// Native contact point layout.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[repr(C)]
pub struct NativeContact {
    pub point: NativeVec3,
    pub separation: f32,
}

/// Native contact point with the ids of the internal features that generated it.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[repr(C)]
pub struct NativeFeatureContact {
    pub contact: NativeContact,
    pub internal_face_index0: u32,
    pub internal_face_index1: u32,
}

/// Per-contact layout the engine hands to contact-modification callbacks.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
#[repr(C)]
pub struct NativeModifiableContact {
    pub feature: NativeFeatureContact,
    pub normal: NativeVec3,
    pub target_velocity: NativeVec3,
    pub max_impulse: f32,
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub restitution: f32,
    pub material_index0: u16,
    pub material_index1: u16,
    pub flags: u32,
}

/// A pair of shapes in contact, as passed by the engine to the contact-modification callback.
/// The contact buffer is reused by the engine once the callback returns.
#[derive(Debug)]
pub struct NativeContactModifyPair<'a> {
    pub actors: [NativePtr<NativeActor>; 2],
    pub shapes: [NativePtr<NativeShape>; 2],
    pub contacts: &'a mut [NativeModifiableContact],
}

/// Allocation, release and query entry points of the native engine.
///
/// Allocation methods return `None` when the engine refuses to create an object; the bridge
/// surfaces that as [`crate::error::BridgeError::NativeAllocationFailure`]. Every other method
/// fails with [`NativeError`] when given an address the engine does not know.
pub trait NativePhysics: Send + Sync {
    /// Allocates a rigid actor at the given world pose.
    fn create_actor(
        &self,
        kind: NativeActorKind,
        pose: &NativeTransform,
    ) -> Option<NativePtr<NativeActor>>;

    /// Releases an actor together with any shapes still attached to it.
    fn release_actor(&self, actor: NativePtr<NativeActor>) -> Result<(), NativeError>;

    /// Kind the actor was created with.
    fn actor_kind(&self, actor: NativePtr<NativeActor>) -> Result<NativeActorKind, NativeError>;

    /// World transform of the actor.
    fn actor_global_pose(&self, actor: NativePtr<NativeActor>)
        -> Result<NativeTransform, NativeError>;

    /// Teleports the actor. Does not wake it up.
    fn set_actor_global_pose(
        &self,
        actor: NativePtr<NativeActor>,
        pose: &NativeTransform,
    ) -> Result<(), NativeError>;

    /// Shapes currently attached to the actor, in attachment order.
    fn actor_shapes(
        &self,
        actor: NativePtr<NativeActor>,
    ) -> Result<Vec<NativePtr<NativeShape>>, NativeError>;

    /// Mass of a dynamic actor.
    fn body_mass(&self, actor: NativePtr<NativeActor>) -> Result<f32, NativeError>;

    /// Extension call: assigns `density` to every simulation shape of a dynamic actor and
    /// recomputes its mass and inertia from them.
    fn update_mass_and_inertia(
        &self,
        actor: NativePtr<NativeActor>,
        density: f32,
    ) -> Result<(), NativeError>;

    /// Linear velocity of a dynamic actor.
    fn linear_velocity(&self, actor: NativePtr<NativeActor>) -> Result<NativeVec3, NativeError>;

    /// Sets linear velocity of a dynamic actor.
    fn set_linear_velocity(
        &self,
        actor: NativePtr<NativeActor>,
        velocity: &NativeVec3,
    ) -> Result<(), NativeError>;

    /// Angular velocity of a dynamic actor.
    fn angular_velocity(&self, actor: NativePtr<NativeActor>) -> Result<NativeVec3, NativeError>;

    /// Sets angular velocity of a dynamic actor.
    fn set_angular_velocity(
        &self,
        actor: NativePtr<NativeActor>,
        velocity: &NativeVec3,
    ) -> Result<(), NativeError>;

    /// Whether a dynamic actor is asleep.
    fn is_sleeping(&self, actor: NativePtr<NativeActor>) -> Result<bool, NativeError>;

    /// Wakes a dynamic actor up.
    fn wake_up(&self, actor: NativePtr<NativeActor>) -> Result<(), NativeError>;

    /// Forces a dynamic actor to sleep.
    fn put_to_sleep(&self, actor: NativePtr<NativeActor>) -> Result<(), NativeError>;

    /// Allocates a shape and attaches it to `desc.actor`. Must not change the actor's mass
    /// properties nor wake it up.
    fn create_shape(&self, desc: &NativeShapeDesc) -> Option<NativePtr<NativeShape>>;

    /// Detaches and releases a shape.
    fn release_shape(&self, shape: NativePtr<NativeShape>) -> Result<(), NativeError>;

    /// Actor the shape is attached to.
    fn shape_actor(
        &self,
        shape: NativePtr<NativeShape>,
    ) -> Result<NativePtr<NativeActor>, NativeError>;

    /// Current flags of the shape.
    fn shape_flags(&self, shape: NativePtr<NativeShape>) -> Result<ShapeFlags, NativeError>;

    /// Replaces flags of the shape.
    fn set_shape_flags(
        &self,
        shape: NativePtr<NativeShape>,
        flags: ShapeFlags,
    ) -> Result<(), NativeError>;

    /// Actor-relative pose of the shape.
    fn shape_local_pose(&self, shape: NativePtr<NativeShape>)
        -> Result<NativeTransform, NativeError>;

    /// Sets actor-relative pose of the shape.
    fn set_shape_local_pose(
        &self,
        shape: NativePtr<NativeShape>,
        pose: &NativeTransform,
    ) -> Result<(), NativeError>;

    /// Allocates a material.
    fn create_material(&self, desc: &NativeMaterialDesc) -> Option<NativePtr<NativeMaterial>>;

    /// Drops the caller's reference to a material.
    fn release_material(&self, material: NativePtr<NativeMaterial>) -> Result<(), NativeError>;

    /// Surface properties of a material.
    fn material_desc(
        &self,
        material: NativePtr<NativeMaterial>,
    ) -> Result<NativeMaterialDesc, NativeError>;

    /// Replaces surface properties of a material. Shapes already using it pick up the new
    /// values.
    fn set_material_desc(
        &self,
        material: NativePtr<NativeMaterial>,
        desc: &NativeMaterialDesc,
    ) -> Result<(), NativeError>;

    /// Cooks a triangle mesh.
    fn create_triangle_mesh(
        &self,
        desc: &NativeTriangleMeshDesc<'_>,
    ) -> Option<NativePtr<NativeTriangleMesh>>;

    /// Drops the caller's reference to a triangle mesh. The mesh itself lives on while shapes
    /// still use it.
    fn release_triangle_mesh(&self, mesh: NativePtr<NativeTriangleMesh>)
        -> Result<(), NativeError>;

    /// Hands a borrowed view of the mesh memory to `visitor`.
    fn visit_triangle_mesh(
        &self,
        mesh: NativePtr<NativeTriangleMesh>,
        visitor: &mut dyn FnMut(&NativeTriangleMeshView<'_>),
    ) -> Result<(), NativeError>;

    /// Cooks a convex mesh.
    fn create_convex_mesh(
        &self,
        desc: &NativeConvexMeshDesc<'_>,
    ) -> Option<NativePtr<NativeConvexMesh>>;

    /// Drops the caller's reference to a convex mesh.
    fn release_convex_mesh(&self, mesh: NativePtr<NativeConvexMesh>) -> Result<(), NativeError>;

    /// Hands a borrowed view of the convex mesh memory to `visitor`.
    fn visit_convex_mesh(
        &self,
        mesh: NativePtr<NativeConvexMesh>,
        visitor: &mut dyn FnMut(&NativeConvexMeshView<'_>),
    ) -> Result<(), NativeError>;

    /// Creates a height field.
    fn create_height_field(
        &self,
        desc: &NativeHeightFieldDesc<'_>,
    ) -> Option<NativePtr<NativeHeightField>>;

    /// Drops the caller's reference to a height field.
    fn release_height_field(
        &self,
        height_field: NativePtr<NativeHeightField>,
    ) -> Result<(), NativeError>;

    /// Hands a borrowed view of the height field memory to `visitor`.
    fn visit_height_field(
        &self,
        height_field: NativePtr<NativeHeightField>,
        visitor: &mut dyn FnMut(&NativeHeightFieldView<'_>),
    ) -> Result<(), NativeError>;
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn null_address_is_rejected() {
        assert!(NativePtr::<NativeShape>::new(0).is_none());
        assert_eq!(NativePtr::<NativeShape>::new(7).map(|p| p.address()), Some(7));
    }

    #[test]
    fn pointers_compare_by_address() {
        let a = NativePtr::<NativeActor>::new(1).unwrap();
        let b = NativePtr::<NativeActor>::new(1).unwrap();
        let c = NativePtr::<NativeActor>::new(2).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(format!("{a:?}"), "RigidActor@0x1");
    }

    #[test]
    fn default_shape_flags() {
        let flags = ShapeFlags::default();
        assert!(flags.contains(ShapeFlags::VISUALIZATION));
        assert!(flags.contains(ShapeFlags::SIMULATION_SHAPE));
        assert!(flags.contains(ShapeFlags::SCENE_QUERY_SHAPE));
        assert!(!flags.contains(ShapeFlags::TRIGGER_SHAPE));
    }
}
