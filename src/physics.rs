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

//! Physics context: the entry point that creates actors, materials and meshes.

use crate::{
    actor::{RigidActor, RigidDynamic, RigidStatic},
    cooking::{ConvexMeshDesc, HeightFieldDesc, TriangleMeshDesc},
    core::{algebra::Isometry3, log::Log},
    error::BridgeError,
    handle::NativeHandle,
    material::Material,
    mesh::{ConvexMesh, HeightField, TriangleMesh},
    native::{
        NativeActorKind, NativeMaterialDesc, NativePtr, NativeTransform, NativeTriangleMesh,
        SharedNative,
    },
    settings::BridgeSettings,
};
use std::{
    fmt::{Debug, Display, Formatter},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

/// Identity of a [`Physics`] context. Resources keep it as a non-owning back-reference, so
/// their lifetime is independent of the context.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PhysicsId(u64);

impl Display for PhysicsId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Physics#{}", self.0)
    }
}

impl PhysicsId {
    fn next() -> Self {
        static LAST: AtomicU64 = AtomicU64::new(0);
        Self(LAST.fetch_add(1, Ordering::Relaxed) + 1)
    }
}

/// Wraps one native engine instance. Everything created through a context is tagged with its
/// [`PhysicsId`]; actors refuse shapes built from materials or meshes of another context.
pub struct Physics {
    id: PhysicsId,
    native: SharedNative,
    settings: Arc<BridgeSettings>,
}

impl Debug for Physics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Physics")
            .field("id", &self.id)
            .field("settings", &self.settings)
            .finish()
    }
}

impl Physics {
    /// Creates a context with default settings.
    pub fn new(native: SharedNative) -> Self {
        Self {
            id: PhysicsId::next(),
            native,
            settings: Default::default(),
        }
    }

    /// Creates a context and applies the log verbosity from `settings`.
    pub fn with_settings(native: SharedNative, settings: BridgeSettings) -> Self {
        Log::set_verbosity(settings.log_verbosity);
        Self {
            id: PhysicsId::next(),
            native,
            settings: Arc::new(settings),
        }
    }

    pub fn id(&self) -> PhysicsId {
        self.id
    }

    /// Returns `true` if an object tagged with `id` was created by this context.
    pub fn owns(&self, id: PhysicsId) -> bool {
        self.id == id
    }

    pub fn settings(&self) -> &BridgeSettings {
        &self.settings
    }

    pub fn native(&self) -> &SharedNative {
        &self.native
    }

    fn create_actor(
        &self,
        kind: NativeActorKind,
        pose: &Isometry3<f32>,
    ) -> Result<RigidActor, BridgeError> {
        let pose = NativeTransform::from(pose);
        if !pose.is_finite() {
            return Err(BridgeError::InvalidArgument(
                "actor pose must be finite".to_string(),
            ));
        }
        let ptr = self
            .native
            .create_actor(kind, &pose)
            .ok_or(BridgeError::NativeAllocationFailure("rigid actor"))?;
        Ok(RigidActor::new(
            NativeHandle::new(self.native.clone(), ptr),
            kind,
            self.id,
            self.settings.clone(),
        ))
    }

    /// Creates an actor that never moves.
    pub fn create_rigid_static(&self, pose: Isometry3<f32>) -> Result<RigidStatic, BridgeError> {
        self.create_actor(NativeActorKind::Static, &pose)
            .map(RigidStatic::new)
    }

    /// Creates a simulated actor. The actor has no mass until
    /// [`crate::ext::RigidBodyExt::update_mass_and_inertia`] is called.
    pub fn create_rigid_dynamic(&self, pose: Isometry3<f32>) -> Result<RigidDynamic, BridgeError> {
        self.create_actor(NativeActorKind::Dynamic, &pose)
            .map(RigidDynamic::new)
    }

    pub fn create_material(
        &self,
        static_friction: f32,
        dynamic_friction: f32,
        restitution: f32,
    ) -> Result<Arc<Material>, BridgeError> {
        let desc = NativeMaterialDesc {
            static_friction,
            dynamic_friction,
            restitution,
        };
        Material::validate(&desc)?;
        let ptr = self
            .native
            .create_material(&desc)
            .ok_or(BridgeError::NativeAllocationFailure("material"))?;
        Ok(Arc::new(Material::new(
            NativeHandle::new(self.native.clone(), ptr),
            self.id,
        )))
    }

    /// Cooks a triangle mesh.
    pub fn create_triangle_mesh(
        &self,
        desc: &TriangleMeshDesc,
    ) -> Result<Arc<TriangleMesh>, BridgeError> {
        let ptr = desc.cook(&*self.native)?;
        Ok(Arc::new(TriangleMesh::new(
            self.native.clone(),
            ptr,
            self.id,
        )))
    }

    /// Wraps a triangle mesh produced by an external loader. The context takes over the
    /// reference the loader holds.
    pub fn wrap_triangle_mesh(
        &self,
        ptr: Option<NativePtr<NativeTriangleMesh>>,
    ) -> Result<Arc<TriangleMesh>, BridgeError> {
        let ptr = ptr.ok_or(BridgeError::NullArgument("triangle mesh"))?;
        Ok(Arc::new(TriangleMesh::new(
            self.native.clone(),
            ptr,
            self.id,
        )))
    }

    /// Cooks a convex hull of the given points.
    pub fn create_convex_mesh(&self, desc: &ConvexMeshDesc) -> Result<Arc<ConvexMesh>, BridgeError> {
        let ptr = desc.cook(&*self.native)?;
        Ok(Arc::new(ConvexMesh::new(self.native.clone(), ptr, self.id)))
    }

    pub fn create_height_field(
        &self,
        desc: &HeightFieldDesc,
    ) -> Result<Arc<HeightField>, BridgeError> {
        let ptr = desc.cook(&*self.native)?;
        Ok(Arc::new(HeightField::new(self.native.clone(), ptr, self.id)))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::native::{rapier::RapierPhysics, NativePhysics, NativeTriangleMeshDesc, NativeVec3};

    fn physics() -> (Arc<RapierPhysics>, Physics) {
        let rapier = Arc::new(RapierPhysics::new());
        let physics = Physics::new(rapier.clone());
        (rapier, physics)
    }

    #[test]
    fn contexts_have_unique_ids() {
        let (_, a) = physics();
        let (_, b) = physics();
        assert_ne!(a.id(), b.id());
        assert!(a.owns(a.id()));
        assert!(!a.owns(b.id()));
    }

    #[test]
    fn wrapping_null_mesh_fails() {
        let (_, physics) = physics();
        assert!(matches!(
            physics.wrap_triangle_mesh(None),
            Err(BridgeError::NullArgument(_))
        ));
    }

    #[test]
    fn wrapped_mesh_is_released_by_wrapper() {
        let (rapier, physics) = physics();
        let points = [
            NativeVec3::new(0.0, 0.0, 0.0),
            NativeVec3::new(1.0, 0.0, 0.0),
            NativeVec3::new(0.0, 0.0, 1.0),
        ];
        let ptr = rapier.create_triangle_mesh(&NativeTriangleMeshDesc {
            points: &points,
            triangles: &[[0, 1, 2]],
            materials: &[],
            force_32bit_indices: false,
        });
        let mesh = physics.wrap_triangle_mesh(ptr).unwrap();
        assert_eq!(mesh.number_of_triangles().unwrap(), 1);
        assert_eq!(mesh.physics(), Some(physics.id()));
        drop(mesh);
        assert_eq!(rapier.live_objects().triangle_meshes, 0);
    }

    #[test]
    fn non_finite_actor_pose_is_refused() {
        let (rapier, physics) = physics();
        let mut pose = Isometry3::identity();
        pose.translation.vector.y = f32::NAN;
        assert!(matches!(
            physics.create_rigid_dynamic(pose),
            Err(BridgeError::InvalidArgument(_))
        ));
        assert_eq!(rapier.statistics().actors.allocated, 0);
    }
}
