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

//! Rigid actors and the shapes they own.

use crate::{
    core::{
        algebra::{Isometry3, Vector3},
        log::Log,
    },
    error::BridgeError,
    geometry::Geometry,
    handle::NativeHandle,
    material::Material,
    native::{NativeActor, NativePtr, NativeShapeDesc, NativeTransform, NativeVec3, ShapeFlags},
    physics::PhysicsId,
    settings::BridgeSettings,
    shape::Shape,
};
use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

pub use crate::native::NativeActorKind as ActorKind;

/// A body in the simulation that owns an ordered set of [`Shape`]s.
///
/// Shapes are kept in creation order, and that order never changes except by removal. Read
/// access ([`Self::shapes`]) borrows the actor, so shapes cannot be created or removed while
/// they are being enumerated.
///
/// Mutating an actor while the engine runs a simulation step is unsupported and may corrupt
/// native state.
#[derive(Debug)]
pub struct RigidActor {
    // Shapes must be released before the actor, so they are declared (and dropped) first.
    shapes: Vec<Shape>,
    handle: NativeHandle<NativeActor>,
    kind: ActorKind,
    physics: PhysicsId,
    settings: Arc<BridgeSettings>,
}

impl RigidActor {
    pub(crate) fn new(
        handle: NativeHandle<NativeActor>,
        kind: ActorKind,
        physics: PhysicsId,
        settings: Arc<BridgeSettings>,
    ) -> Self {
        Self {
            shapes: Default::default(),
            handle,
            kind,
            physics,
            settings,
        }
    }

    pub fn kind(&self) -> ActorKind {
        self.kind
    }

    pub fn is_static(&self) -> bool {
        self.kind == ActorKind::Static
    }

    pub fn physics(&self) -> PhysicsId {
        self.physics
    }

    pub fn native(&self) -> Result<NativePtr<NativeActor>, BridgeError> {
        self.handle.get()
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_live()
    }

    /// Creates a shape and appends it to the actor. The local pose is identity when `None`.
    ///
    /// The shape gets the default flags from the settings, except that triangle meshes, height
    /// fields and planes on a dynamic actor do not take part in simulation. Neither mass nor
    /// inertia is recomputed and a sleeping actor is not woken up; see
    /// [`crate::ext::RigidBodyExt::update_mass_and_inertia`].
    pub fn create_shape(
        &mut self,
        geometry: &Geometry,
        material: &Arc<Material>,
        local_pose: Option<Isometry3<f32>>,
    ) -> Result<&Shape, BridgeError> {
        self.attach_shape(geometry.clone(), material.clone(), local_pose, None)
    }

    pub(crate) fn attach_shape(
        &mut self,
        geometry: Geometry,
        material: Arc<Material>,
        local_pose: Option<Isometry3<f32>>,
        flags: Option<ShapeFlags>,
    ) -> Result<&Shape, BridgeError> {
        let actor = self.handle.get()?;

        if material.physics() != self.physics {
            return Err(BridgeError::InvalidOperation(format!(
                "material of {} cannot be used by an actor of {}",
                material.physics(),
                self.physics
            )));
        }
        if let Some(owner) = geometry.physics() {
            if owner != self.physics {
                return Err(BridgeError::InvalidOperation(format!(
                    "mesh of {owner} cannot be used by an actor of {}",
                    self.physics
                )));
            }
        }
        if !geometry.is_valid() {
            return Err(BridgeError::InvalidArgument(format!(
                "{} geometry has non-finite or negative dimensions",
                geometry.geometry_type().as_ref()
            )));
        }

        let simulatable = self.is_static() || geometry.is_simulatable_on_dynamic();
        let flags = match flags {
            Some(flags) => {
                if flags.contains(ShapeFlags::SIMULATION_SHAPE) && !simulatable {
                    return Err(BridgeError::InvalidOperation(format!(
                        "{} geometry cannot take part in simulation on a dynamic actor",
                        geometry.geometry_type().as_ref()
                    )));
                }
                flags
            }
            None => {
                let mut flags = self.settings.default_shape_flags;
                if !simulatable {
                    flags.remove(ShapeFlags::SIMULATION_SHAPE);
                }
                flags
            }
        };
        if flags.contains(ShapeFlags::TRIGGER_SHAPE | ShapeFlags::SIMULATION_SHAPE) {
            return Err(BridgeError::InvalidArgument(
                "a trigger shape cannot take part in simulation".to_string(),
            ));
        }

        let local_pose = local_pose
            .as_ref()
            .map(NativeTransform::from)
            .unwrap_or(NativeTransform::IDENTITY);
        if !local_pose.is_finite() {
            return Err(BridgeError::InvalidArgument(
                "shape pose must be finite".to_string(),
            ));
        }

        let desc = NativeShapeDesc {
            actor,
            geometry: geometry.to_native_descriptor()?,
            material: material.native()?,
            local_pose,
            flags,
        };
        let native = self.handle.native().clone();
        let ptr = native
            .create_shape(&desc)
            .ok_or(BridgeError::NativeAllocationFailure("shape"))?;
        self.shapes
            .push(Shape::new(NativeHandle::new(native, ptr), geometry, material));
        debug_assert!(self.native_shape_order_matches());

        if self.shapes.len() > self.settings.compound_shape_warning {
            Log::warn_once(
                actor.address(),
                format!(
                    "Actor {actor} has {} shapes, which exceeds the configured limit of {}",
                    self.shapes.len(),
                    self.settings.compound_shape_warning
                ),
            );
        }

        Ok(&self.shapes[self.shapes.len() - 1])
    }

    /// Shapes in creation order.
    pub fn shapes(&self) -> &[Shape] {
        &self.shapes
    }

    pub fn shape(&self, index: usize) -> Result<&Shape, BridgeError> {
        BridgeError::check_index(index, self.shapes.len())?;
        Ok(&self.shapes[index])
    }

    pub fn shape_mut(&mut self, index: usize) -> Result<&mut Shape, BridgeError> {
        BridgeError::check_index(index, self.shapes.len())?;
        Ok(&mut self.shapes[index])
    }

    /// Detaches and releases a shape. Remaining shapes keep their relative order.
    pub fn remove_shape(&mut self, index: usize) -> Result<(), BridgeError> {
        self.handle.get()?;
        BridgeError::check_index(index, self.shapes.len())?;
        let shape = self.shapes.remove(index);
        shape.release()?;
        debug_assert!(self.native_shape_order_matches());
        Ok(())
    }

    // The engine must list the same shapes in the same order as `shapes`.
    fn native_shape_order_matches(&self) -> bool {
        let Ok(actor) = self.handle.get() else {
            return self.shapes.is_empty();
        };
        let Ok(native) = self.handle.native().actor_shapes(actor) else {
            return false;
        };
        native.len() == self.shapes.len()
            && native
                .iter()
                .zip(self.shapes.iter())
                .all(|(ptr, shape)| shape.native().is_ok_and(|own| own == *ptr))
    }

    /// World transform, read directly from the engine.
    pub fn global_pose(&self) -> Result<Isometry3<f32>, BridgeError> {
        let pose = self.handle.native().actor_global_pose(self.handle.get()?)?;
        Ok(pose.into())
    }

    pub fn set_global_pose(&mut self, pose: &Isometry3<f32>) -> Result<(), BridgeError> {
        let ptr = self.handle.get()?;
        let pose = NativeTransform::from(pose);
        if !pose.is_finite() {
            return Err(BridgeError::InvalidArgument(
                "actor pose must be finite".to_string(),
            ));
        }
        Ok(self.handle.native().set_actor_global_pose(ptr, &pose)?)
    }

    /// Releases every shape, in order, and then the actor itself. Returns `Ok(false)` if the
    /// actor was already released. Dropping the actor does the same.
    pub fn release(&mut self) -> Result<bool, BridgeError> {
        if !self.handle.is_live() {
            return Ok(false);
        }
        for shape in self.shapes.drain(..) {
            shape.release()?;
        }
        self.handle.release()
    }
}

/// Actor that never moves.
#[derive(Debug)]
pub struct RigidStatic(RigidActor);

impl RigidStatic {
    pub(crate) fn new(actor: RigidActor) -> Self {
        Self(actor)
    }

    pub fn into_inner(self) -> RigidActor {
        self.0
    }
}

impl Deref for RigidStatic {
    type Target = RigidActor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for RigidStatic {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

/// Simulated actor with mass and velocities.
#[derive(Debug)]
pub struct RigidDynamic(RigidActor);

impl RigidDynamic {
    pub(crate) fn new(actor: RigidActor) -> Self {
        Self(actor)
    }

    pub fn into_inner(self) -> RigidActor {
        self.0
    }

    pub(crate) fn handle(&self) -> &NativeHandle<NativeActor> {
        &self.0.handle
    }

    /// Current mass. Zero until mass properties are computed explicitly.
    pub fn mass(&self) -> Result<f32, BridgeError> {
        let handle = self.handle();
        Ok(handle.native().body_mass(handle.get()?)?)
    }

    pub fn linear_velocity(&self) -> Result<Vector3<f32>, BridgeError> {
        let handle = self.handle();
        Ok(handle.native().linear_velocity(handle.get()?)?.into())
    }

    pub fn set_linear_velocity(&mut self, velocity: Vector3<f32>) -> Result<(), BridgeError> {
        let handle = self.handle();
        let ptr = handle.get()?;
        let velocity = finite_vector(velocity, "linear velocity")?;
        Ok(handle.native().set_linear_velocity(ptr, &velocity)?)
    }

    pub fn angular_velocity(&self) -> Result<Vector3<f32>, BridgeError> {
        let handle = self.handle();
        Ok(handle.native().angular_velocity(handle.get()?)?.into())
    }

    pub fn set_angular_velocity(&mut self, velocity: Vector3<f32>) -> Result<(), BridgeError> {
        let handle = self.handle();
        let ptr = handle.get()?;
        let velocity = finite_vector(velocity, "angular velocity")?;
        Ok(handle.native().set_angular_velocity(ptr, &velocity)?)
    }

    pub fn is_sleeping(&self) -> Result<bool, BridgeError> {
        let handle = self.handle();
        Ok(handle.native().is_sleeping(handle.get()?)?)
    }

    pub fn wake_up(&mut self) -> Result<(), BridgeError> {
        let handle = self.handle();
        Ok(handle.native().wake_up(handle.get()?)?)
    }

    pub fn put_to_sleep(&mut self) -> Result<(), BridgeError> {
        let handle = self.handle();
        Ok(handle.native().put_to_sleep(handle.get()?)?)
    }
}

fn finite_vector(v: Vector3<f32>, name: &str) -> Result<NativeVec3, BridgeError> {
    let v = NativeVec3::from(v);
    if v.is_finite() {
        Ok(v)
    } else {
        Err(BridgeError::InvalidArgument(format!("{name} must be finite")))
    }
}

impl Deref for RigidDynamic {
    type Target = RigidActor;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for RigidDynamic {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
