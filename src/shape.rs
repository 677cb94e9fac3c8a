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

//! Shapes attached to rigid actors.

use crate::{
    actor::RigidActor,
    core::algebra::Isometry3,
    error::BridgeError,
    geometry::Geometry,
    handle::NativeHandle,
    material::Material,
    native::{NativeActor, NativeActorKind, NativePtr, NativeShape, NativeTransform, ShapeFlags},
};
use std::sync::Arc;

/// Native shape owned by exactly one [`RigidActor`]. Keeps the geometry it was created from and
/// a shared reference to its material.
///
/// Changing a shape while the engine runs a simulation step is unsupported and may corrupt
/// native state.
#[derive(Debug)]
pub struct Shape {
    handle: NativeHandle<NativeShape>,
    geometry: Geometry,
    material: Arc<Material>,
}

impl Shape {
    pub(crate) fn new(
        handle: NativeHandle<NativeShape>,
        geometry: Geometry,
        material: Arc<Material>,
    ) -> Self {
        Self {
            handle,
            geometry,
            material,
        }
    }

    /// Copy of the geometry the shape was created from.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn native(&self) -> Result<NativePtr<NativeShape>, BridgeError> {
        self.handle.get()
    }

    /// Native actor the engine reports as the owner of this shape.
    pub fn actor(&self) -> Result<NativePtr<NativeActor>, BridgeError> {
        Ok(self.handle.native().shape_actor(self.handle.get()?)?)
    }

    pub fn flags(&self) -> Result<ShapeFlags, BridgeError> {
        Ok(self.handle.native().shape_flags(self.handle.get()?)?)
    }

    /// Replaces the flags. Triangle meshes, height fields and planes cannot become simulation
    /// shapes while attached to a dynamic actor.
    pub fn set_flags(&mut self, flags: ShapeFlags) -> Result<(), BridgeError> {
        let ptr = self.handle.get()?;
        if flags.contains(ShapeFlags::TRIGGER_SHAPE | ShapeFlags::SIMULATION_SHAPE) {
            return Err(BridgeError::InvalidArgument(
                "a trigger shape cannot take part in simulation".to_string(),
            ));
        }
        let native = self.handle.native();
        if flags.contains(ShapeFlags::SIMULATION_SHAPE)
            && !self.geometry.is_simulatable_on_dynamic()
            && native.actor_kind(native.shape_actor(ptr)?)? != NativeActorKind::Static
        {
            return Err(BridgeError::InvalidOperation(format!(
                "{} geometry cannot take part in simulation on a dynamic actor",
                self.geometry.geometry_type().as_ref()
            )));
        }
        Ok(native.set_shape_flags(ptr, flags)?)
    }

    /// Pose relative to the owning actor.
    pub fn local_pose(&self) -> Result<Isometry3<f32>, BridgeError> {
        let pose = self.handle.native().shape_local_pose(self.handle.get()?)?;
        Ok(pose.into())
    }

    pub fn set_local_pose(&mut self, pose: &Isometry3<f32>) -> Result<(), BridgeError> {
        let ptr = self.handle.get()?;
        let pose = NativeTransform::from(pose);
        if !pose.is_finite() {
            return Err(BridgeError::InvalidArgument(
                "shape pose must be finite".to_string(),
            ));
        }
        Ok(self.handle.native().set_shape_local_pose(ptr, &pose)?)
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_live()
    }

    pub(crate) fn release(&self) -> Result<bool, BridgeError> {
        self.handle.release()
    }
}

/// Builds a shape on an actor. Geometry and material are required, everything else has
/// defaults: identity local pose and the actor's default shape flags.
#[derive(Clone, Debug, Default)]
pub struct ShapeBuilder {
    geometry: Option<Geometry>,
    material: Option<Arc<Material>>,
    local_pose: Option<Isometry3<f32>>,
    flags: Option<ShapeFlags>,
}

impl ShapeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_geometry(mut self, geometry: impl Into<Geometry>) -> Self {
        self.geometry = Some(geometry.into());
        self
    }

    pub fn with_material(mut self, material: Arc<Material>) -> Self {
        self.material = Some(material);
        self
    }

    pub fn with_local_pose(mut self, pose: Isometry3<f32>) -> Self {
        self.local_pose = Some(pose);
        self
    }

    /// Explicit flags. Requesting [`ShapeFlags::SIMULATION_SHAPE`] for geometry that cannot be
    /// simulated on a dynamic actor makes [`Self::build`] fail on such an actor.
    pub fn with_flags(mut self, flags: ShapeFlags) -> Self {
        self.flags = Some(flags);
        self
    }

    pub fn build(self, actor: &mut RigidActor) -> Result<&Shape, BridgeError> {
        let geometry = self.geometry.ok_or(BridgeError::NullArgument("geometry"))?;
        let material = self.material.ok_or(BridgeError::NullArgument("material"))?;
        actor.attach_shape(geometry, material, self.local_pose, self.flags)
    }
}
