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

//! Native-backed surface materials.

use crate::{
    error::BridgeError,
    handle::NativeHandle,
    native::{NativeMaterial, NativeMaterialDesc, NativePtr},
    physics::PhysicsId,
};
use std::fmt::{Debug, Formatter};

/// Friction and restitution of a surface. Materials are shared between shapes through
/// `Arc<Material>`; the native engine keeps the material alive while any shape uses it.
pub struct Material {
    handle: NativeHandle<NativeMaterial>,
    physics: PhysicsId,
}

impl Debug for Material {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Material")
            .field("handle", &self.handle)
            .field("physics", &self.physics)
            .finish()
    }
}

fn check_coefficient(name: &str, value: f32) -> Result<(), BridgeError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(BridgeError::InvalidArgument(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

impl Material {
    pub(crate) fn new(handle: NativeHandle<NativeMaterial>, physics: PhysicsId) -> Self {
        Self { handle, physics }
    }

    pub(crate) fn validate(desc: &NativeMaterialDesc) -> Result<(), BridgeError> {
        check_coefficient("static friction", desc.static_friction)?;
        check_coefficient("dynamic friction", desc.dynamic_friction)?;
        check_coefficient("restitution", desc.restitution)
    }

    /// Physics context that created the material.
    pub fn physics(&self) -> PhysicsId {
        self.physics
    }

    /// Native address of the material.
    pub fn native(&self) -> Result<NativePtr<NativeMaterial>, BridgeError> {
        self.handle.get()
    }

    fn desc(&self) -> Result<NativeMaterialDesc, BridgeError> {
        Ok(self.handle.native().material_desc(self.handle.get()?)?)
    }

    fn modify<F>(&self, name: &str, value: f32, func: F) -> Result<(), BridgeError>
    where
        F: FnOnce(&mut NativeMaterialDesc),
    {
        check_coefficient(name, value)?;
        let ptr = self.handle.get()?;
        let mut desc = self.handle.native().material_desc(ptr)?;
        func(&mut desc);
        Ok(self.handle.native().set_material_desc(ptr, &desc)?)
    }

    /// Friction coefficient applied while surfaces are at rest relative to each other.
    pub fn static_friction(&self) -> Result<f32, BridgeError> {
        Ok(self.desc()?.static_friction)
    }

    /// Friction coefficient applied while surfaces slide.
    pub fn dynamic_friction(&self) -> Result<f32, BridgeError> {
        Ok(self.desc()?.dynamic_friction)
    }

    /// Bounciness of the surface.
    pub fn restitution(&self) -> Result<f32, BridgeError> {
        Ok(self.desc()?.restitution)
    }

    pub fn set_static_friction(&self, value: f32) -> Result<(), BridgeError> {
        self.modify("static friction", value, |d| d.static_friction = value)
    }

    pub fn set_dynamic_friction(&self, value: f32) -> Result<(), BridgeError> {
        self.modify("dynamic friction", value, |d| d.dynamic_friction = value)
    }

    pub fn set_restitution(&self, value: f32) -> Result<(), BridgeError> {
        self.modify("restitution", value, |d| d.restitution = value)
    }

    /// Gives up this wrapper's reference to the native material. Shapes using the material keep
    /// working.
    pub fn release(&self) -> Result<bool, BridgeError> {
        self.handle.release()
    }

    pub fn is_live(&self) -> bool {
        self.handle.is_live()
    }
}

#[cfg(test)]
mod test {
    use crate::{
        core::algebra::Isometry3, error::BridgeError, geometry::BoxGeometry,
        native::rapier::RapierPhysics, physics::Physics,
    };
    use std::sync::Arc;

    #[test]
    fn material_coefficients() {
        let physics = Physics::new(Arc::new(RapierPhysics::new()));
        let material = physics.create_material(0.6, 0.4, 0.2).unwrap();
        assert_eq!(material.static_friction().unwrap(), 0.6);
        assert_eq!(material.dynamic_friction().unwrap(), 0.4);
        assert_eq!(material.restitution().unwrap(), 0.2);
        assert_eq!(material.physics(), physics.id());

        material.set_restitution(0.9).unwrap();
        assert_eq!(material.restitution().unwrap(), 0.9);
        assert!(matches!(
            material.set_static_friction(f32::NAN),
            Err(BridgeError::InvalidArgument(_))
        ));
    }

    #[test]
    fn setters_update_shapes_using_material() {
        let rapier = Arc::new(RapierPhysics::new());
        let physics = Physics::new(rapier.clone());
        let material = physics.create_material(0.5, 0.5, 0.1).unwrap();
        let mut actor = physics.create_rigid_dynamic(Isometry3::identity()).unwrap();
        let shape = actor
            .create_shape(&BoxGeometry::new(0.5, 0.5, 0.5).into(), &material, None)
            .unwrap()
            .native()
            .unwrap();

        material.set_restitution(0.9).unwrap();
        material.set_dynamic_friction(0.0).unwrap();

        let (friction, restitution) = rapier
            .with_collider(shape, |c| (c.friction(), c.restitution()))
            .unwrap();
        assert_eq!(friction, 0.0);
        assert_eq!(restitution, 0.9);
    }

    #[test]
    fn released_material_is_unusable() {
        let physics = Physics::new(Arc::new(RapierPhysics::new()));
        let material = physics.create_material(0.5, 0.5, 0.5).unwrap();
        assert_eq!(material.release(), Ok(true));
        assert!(!material.is_live());
        assert!(matches!(
            material.static_friction(),
            Err(BridgeError::InvalidOperation(_))
        ));
    }

    #[test]
    fn invalid_coefficients_are_refused() {
        let physics = Physics::new(Arc::new(RapierPhysics::new()));
        assert!(matches!(
            physics.create_material(-1.0, 0.5, 0.5),
            Err(BridgeError::InvalidArgument(_))
        ));
    }
}
