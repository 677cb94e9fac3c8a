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

use fyrox_bridge::prelude::*;
use std::sync::{mpsc::channel, Arc};

fn quad_mesh(physics: &Physics) -> Arc<TriangleMesh> {
    physics
        .create_triangle_mesh(
            &TriangleMeshDesc::new(
                vec![
                    Vector3::new(-1.0, 0.0, -1.0),
                    Vector3::new(1.0, 0.0, -1.0),
                    Vector3::new(1.0, 0.0, 1.0),
                    Vector3::new(-1.0, 0.0, 1.0),
                ],
                vec![[0, 1, 2], [0, 2, 3]],
            )
            .with_materials(vec![1, 2]),
        )
        .unwrap()
}

#[test]
fn static_ground_and_dynamic_crate() {
    let rapier = Arc::new(RapierPhysics::new());
    let physics = Physics::new(rapier.clone());
    let material = physics.create_material(0.6, 0.5, 0.1).unwrap();
    let mesh = quad_mesh(&physics);

    let mut ground = physics.create_rigid_static(Isometry3::identity()).unwrap();
    let ground_shape = ground
        .create_shape(
            &TriangleMeshGeometry::new(mesh.clone()).into(),
            &material,
            None,
        )
        .unwrap();
    assert!(ground_shape
        .flags()
        .unwrap()
        .contains(ShapeFlags::SIMULATION_SHAPE));

    let mut body = physics
        .create_rigid_dynamic(Isometry3::translation(0.0, 3.0, 0.0))
        .unwrap();
    ShapeBuilder::new()
        .with_geometry(BoxGeometry::new(0.5, 0.5, 0.5))
        .with_material(material.clone())
        .build(&mut body)
        .unwrap();
    ShapeBuilder::new()
        .with_geometry(TriangleMeshGeometry::new(mesh.clone()))
        .with_material(material.clone())
        .with_local_pose(Isometry3::translation(0.0, -0.5, 0.0))
        .build(&mut body)
        .unwrap();

    assert_eq!(body.shapes().len(), 2);
    for shape in body.shapes() {
        assert_eq!(shape.actor().unwrap(), body.native().unwrap());
    }
    assert!(!body.shapes()[1]
        .flags()
        .unwrap()
        .contains(ShapeFlags::SIMULATION_SHAPE));

    // Box of volume 1, the mesh does not take part in simulation.
    assert_eq!(body.mass().unwrap(), 0.0);
    body.update_mass_and_inertia(3.0).unwrap();
    assert!((body.mass().unwrap() - 3.0).abs() < 1.0e-4);

    // The wrapper, the ground shape and the body's mesh shape.
    assert_eq!(mesh.reference_count().unwrap(), 3);

    let (sender, receiver) = channel();
    mesh.add_dispose_sender(sender);
    mesh.dispose().unwrap();
    assert_eq!(
        receiver.try_iter().collect::<Vec<_>>(),
        vec![DisposeEvent::Disposing, DisposeEvent::Disposed]
    );
    assert!(matches!(
        mesh.vertices(),
        Err(BridgeError::InvalidOperation(_))
    ));
    // Shapes still hold the native mesh.
    assert_eq!(rapier.live_objects().triangle_meshes, 1);

    drop(body);
    drop(ground);
    drop(material);
    drop(mesh);

    let live = rapier.live_objects();
    assert_eq!(live.actors, 0);
    assert_eq!(live.shapes, 0);
    assert_eq!(live.materials, 0);
    assert_eq!(live.triangle_meshes, 0);

    let stats = rapier.statistics();
    assert_eq!(stats.actors.allocated, stats.actors.released);
    assert_eq!(stats.shapes.allocated, stats.shapes.released);
    assert_eq!(stats.triangle_meshes.released, 1);
}

#[test]
fn every_native_object_is_released_once() {
    let rapier = Arc::new(RapierPhysics::new());
    let physics = Physics::new(rapier.clone());
    let material = physics.create_material(0.5, 0.5, 0.5).unwrap();
    let hull = physics
        .create_convex_mesh(&ConvexMeshDesc::new(vec![
            Vector3::new(0.0, 0.0, 0.0),
            Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            Vector3::new(0.0, 0.0, 1.0),
        ]))
        .unwrap();
    let field = physics
        .create_height_field(&HeightFieldDesc::from_heights(3, 3, &[0, 1, 0, 1, 2, 1, 0, 1, 0]))
        .unwrap();

    let mut body = physics.create_rigid_dynamic(Isometry3::identity()).unwrap();
    for geometry in [
        Geometry::from(SphereGeometry::new(0.5)),
        Geometry::from(CapsuleGeometry::new(0.25, 1.0)),
        Geometry::from(ConvexMeshGeometry::new(hull.clone()).with_scale(MeshScale::uniform(2.0))),
        Geometry::from(HeightFieldGeometry::new(field.clone(), 0.1, 1.0, 1.0)),
        Geometry::from(PlaneGeometry),
    ] {
        body.create_shape(&geometry, &material, None).unwrap();
    }
    assert_eq!(body.shapes().len(), 5);

    // Explicit releases followed by drops.
    assert_eq!(body.release(), Ok(true));
    assert_eq!(hull.dispose(), Ok(true));
    assert_eq!(field.dispose(), Ok(true));
    assert_eq!(material.release(), Ok(true));
    drop(body);
    drop(hull);
    drop(field);
    drop(material);

    let stats = rapier.statistics();
    assert_eq!(stats.actors.released, 1);
    assert_eq!(stats.shapes.released, 5);
    assert_eq!(stats.convex_meshes.released, 1);
    assert_eq!(stats.height_fields.released, 1);
    assert_eq!(stats.materials.released, 1);
    assert_eq!(rapier.live_objects(), Default::default());
}

struct PushAlongX {
    modified: usize,
}

impl ContactModifyCallback for PushAlongX {
    fn on_contact_modify(&mut self, pairs: &mut [ContactModifyPair<'_>]) {
        for pair in pairs.iter_mut() {
            for i in 0..pair.contacts.len() {
                let Ok(mut contact) = pair.contacts.get(i) else {
                    continue;
                };
                contact.target_velocity = Vector3::new(1.0, 0.0, 0.0);
                contact.flags |= ContactFlags::HAS_TARGET_VELOCITY;
                if pair.contacts.set(i, &contact).is_ok() {
                    self.modified += 1;
                }
            }
        }
    }
}

#[test]
fn contact_modification_round_trip() {
    let mut buffer = [ModifiableContact {
        normal: Vector3::new(0.0, 1.0, 0.0),
        max_impulse: 10.0,
        static_friction: 0.5,
        dynamic_friction: 0.4,
        material_index0: 1,
        material_index1: 2,
        ..Default::default()
    }
    .to_native_descriptor(); 4];

    let rapier = Arc::new(RapierPhysics::new());
    let physics = Physics::new(rapier);
    let material = physics.create_material(0.5, 0.5, 0.5).unwrap();
    let mut body = physics.create_rigid_dynamic(Isometry3::identity()).unwrap();
    let shape = body
        .create_shape(&SphereGeometry::new(1.0).into(), &material, None)
        .unwrap()
        .native()
        .unwrap();
    let actor = body.native().unwrap();

    let pair = fyrox_bridge::native::NativeContactModifyPair {
        actors: [actor, actor],
        shapes: [shape, shape],
        contacts: &mut buffer,
    };
    let mut callback = PushAlongX { modified: 0 };
    dispatch_contact_modification(&mut callback, [pair]);
    assert_eq!(callback.modified, 4);

    for native in buffer.iter() {
        let contact = ModifiableContact::from_native(native);
        assert_eq!(contact.target_velocity, Vector3::new(1.0, 0.0, 0.0));
        assert!(contact.flags.contains(ContactFlags::HAS_TARGET_VELOCITY));
        assert_eq!(contact.material_index1, 2);
    }
}
