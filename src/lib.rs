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

//! Lifetime-safe wrappers over a native rigid-body engine.
//!
//! The engine owns actors, shapes, materials and cooked meshes; this crate owns the right to
//! release them. Every native object is wrapped in a [`handle::NativeHandle`] that releases it
//! exactly once, either explicitly or on drop. Geometries and contact records are plain values
//! that are converted to the engine's layouts on demand.
//!
//! ```no_run
//! use fyrox_bridge::prelude::*;
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), BridgeError> {
//! let physics = Physics::new(Arc::new(RapierPhysics::new()));
//! let material = physics.create_material(0.5, 0.5, 0.1)?;
//! let mut body = physics.create_rigid_dynamic(Isometry3::translation(0.0, 5.0, 0.0))?;
//! body.create_shape(&BoxGeometry::new(0.5, 0.5, 0.5).into(), &material, None)?;
//! body.update_mass_and_inertia(10.0)?;
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod contact;
pub mod cooking;
pub mod error;
pub mod event;
pub mod ext;
pub mod geometry;
pub mod handle;
pub mod material;
pub mod mesh;
pub mod native;
pub mod physics;
pub mod settings;
pub mod shape;

#[doc(inline)]
pub use fyrox_bridge_core as core;

/// Most commonly used types.
pub mod prelude {
    pub use crate::{
        actor::{ActorKind, RigidActor, RigidDynamic, RigidStatic},
        contact::{
            dispatch_contact_modification, ContactFlags, ContactModifyCallback,
            ContactModifyPair, ContactRecord, ContactSet, FeatureContact, ModifiableContact,
        },
        cooking::{ConvexMeshDesc, HeightFieldDesc, HeightFieldSample, TriangleMeshDesc},
        core::algebra::{Isometry3, UnitQuaternion, Vector3},
        error::BridgeError,
        event::DisposeEvent,
        ext::RigidBodyExt,
        geometry::{
            BoxGeometry, CapsuleGeometry, ConvexMeshGeometry, Geometry, GeometryType,
            HeightFieldGeometry, MeshGeometryFlags, MeshScale, PlaneGeometry, SphereGeometry,
            TriangleMeshGeometry,
        },
        material::Material,
        mesh::{ConvexMesh, HeightField, TriangleIndexBuffer, TriangleMesh},
        native::{rapier::RapierPhysics, ShapeFlags},
        physics::{Physics, PhysicsId},
        settings::BridgeSettings,
        shape::{Shape, ShapeBuilder},
    };
}
