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

//! Extension calls that the engine performs only on request.

use crate::{actor::RigidDynamic, error::BridgeError};

/// Mass-related extension of dynamic actors.
pub trait RigidBodyExt {
    /// Sets `density` on every simulation shape of the actor and recomputes mass, center of
    /// mass and inertia from them. Shapes that do not take part in simulation contribute
    /// nothing.
    ///
    /// Shape creation never does this on its own, so an actor has no mass until this is called.
    fn update_mass_and_inertia(&mut self, density: f32) -> Result<(), BridgeError>;
}

impl RigidBodyExt for RigidDynamic {
    fn update_mass_and_inertia(&mut self, density: f32) -> Result<(), BridgeError> {
        if !density.is_finite() || density <= 0.0 {
            return Err(BridgeError::InvalidArgument(format!(
                "density must be finite and positive, got {density}"
            )));
        }
        let handle = self.handle();
        Ok(handle
            .native()
            .update_mass_and_inertia(handle.get()?, density)?)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        core::algebra::Isometry3,
        geometry::{BoxGeometry, Geometry, PlaneGeometry, SphereGeometry},
        native::rapier::RapierPhysics,
        physics::Physics,
    };
    use std::sync::Arc;

    #[test]
    fn mass_is_computed_only_on_request() {
        let physics = Physics::new(Arc::new(RapierPhysics::new()));
        let material = physics.create_material(0.5, 0.5, 0.0).unwrap();
        let mut actor = physics.create_rigid_dynamic(Isometry3::identity()).unwrap();
        actor
            .create_shape(
                &Geometry::from(BoxGeometry::new(0.5, 0.5, 0.5)),
                &material,
                None,
            )
            .unwrap();
        assert_eq!(actor.mass().unwrap(), 0.0);

        actor.update_mass_and_inertia(2.0).unwrap();
        assert!((actor.mass().unwrap() - 2.0).abs() < 1.0e-4);
    }

    #[test]
    fn non_simulation_shapes_add_no_mass() {
        let physics = Physics::new(Arc::new(RapierPhysics::new()));
        let material = physics.create_material(0.5, 0.5, 0.0).unwrap();
        let mut actor = physics.create_rigid_dynamic(Isometry3::identity()).unwrap();
        actor
            .create_shape(&Geometry::from(PlaneGeometry), &material, None)
            .unwrap();
        actor
            .create_shape(&Geometry::from(SphereGeometry::new(1.0)), &material, None)
            .unwrap();

        actor.update_mass_and_inertia(1.0).unwrap();
        let sphere = 4.0 / 3.0 * std::f32::consts::PI;
        assert!((actor.mass().unwrap() - sphere).abs() < 1.0e-3);
    }

    #[test]
    fn bad_density_is_rejected() {
        let physics = Physics::new(Arc::new(RapierPhysics::new()));
        let mut actor = physics.create_rigid_dynamic(Isometry3::identity()).unwrap();
        for density in [0.0, -1.0, f32::NAN] {
            assert!(matches!(
                actor.update_mass_and_inertia(density),
                Err(BridgeError::InvalidArgument(_))
            ));
        }
    }
}
