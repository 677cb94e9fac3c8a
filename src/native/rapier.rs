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

//! Reference native engine built on top of Rapier.
//!
//! Rapier has no notion of raw addresses, so every object gets a monotonically increasing
//! address that is never reused. Meshes and materials are reference counted the same way a
//! pointer-based engine counts them: the creator holds one reference and every shape using the
//! object holds another.

use crate::{
    core::{fxhash::FxHashMap, parking_lot::Mutex},
    error::NativeError,
    native::{
        NativeActor, NativeActorKind, NativeConvexMesh, NativeConvexMeshDesc,
        NativeConvexMeshView, NativeGeometry, NativeHeightField, NativeHeightFieldDesc,
        NativeHeightFieldSample, NativeHeightFieldView, NativeMaterial, NativeMaterialDesc,
        NativeObject, NativePhysics, NativePtr, NativeQuat, NativeShape, NativeShapeDesc,
        NativeTransform, NativeTriangleIndices, NativeTriangleMesh, NativeTriangleMeshDesc,
        NativeTriangleMeshView, NativeVec3, ShapeFlags,
    },
};
use rapier3d::{
    dynamics::{
        ImpulseJointSet, IslandManager, MultibodyJointSet, RigidBody, RigidBodyBuilder,
        RigidBodyHandle, RigidBodySet,
    },
    geometry::{Collider, ColliderBuilder, ColliderHandle, ColliderSet, InteractionGroups, SharedShape},
    na::{DMatrix, Isometry3, Point3, Quaternion, Translation3, UnitQuaternion, Vector3},
    parry::shape::HeightField,
};
use std::fmt::{Debug, Formatter};

/// Number of allocations and accepted release calls for one kind of native object.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ObjectCounters {
    pub allocated: usize,
    pub released: usize,
}

/// Allocation statistics of the engine. `released` counts release calls made through
/// [`NativePhysics`]; shapes detached implicitly by releasing their actor are not included.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct NativeStatistics {
    pub actors: ObjectCounters,
    pub shapes: ObjectCounters,
    pub materials: ObjectCounters,
    pub triangle_meshes: ObjectCounters,
    pub convex_meshes: ObjectCounters,
    pub height_fields: ObjectCounters,
}

/// Number of objects the engine currently keeps alive.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LiveObjects {
    pub actors: usize,
    pub shapes: usize,
    pub materials: usize,
    pub triangle_meshes: usize,
    pub convex_meshes: usize,
    pub height_fields: usize,
}

struct ActorEntry {
    body: RigidBodyHandle,
    kind: NativeActorKind,
    shapes: Vec<u64>,
}

#[derive(Copy, Clone)]
enum MeshRef {
    Triangle(u64),
    Convex(u64),
    HeightField(u64),
}

struct ShapeEntry {
    collider: ColliderHandle,
    actor: u64,
    material: u64,
    mesh: Option<MeshRef>,
    flags: ShapeFlags,
    local_pose: NativeTransform,
}

struct Counted<T> {
    data: T,
    reference_count: u32,
}

impl<T> Counted<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            reference_count: 1,
        }
    }
}

enum CookedIndices {
    U16(Vec<[u16; 3]>),
    U32(Vec<[u32; 3]>),
}

impl CookedIndices {
    fn as_native(&self) -> NativeTriangleIndices<'_> {
        match self {
            CookedIndices::U16(t) => NativeTriangleIndices::U16(t),
            CookedIndices::U32(t) => NativeTriangleIndices::U32(t),
        }
    }

    fn to_u32(&self) -> Vec<[u32; 3]> {
        match self {
            CookedIndices::U16(t) => t
                .iter()
                .map(|t| [t[0] as u32, t[1] as u32, t[2] as u32])
                .collect(),
            CookedIndices::U32(t) => t.clone(),
        }
    }
}

struct CookedTriangleMesh {
    vertices: Vec<NativeVec3>,
    triangles: CookedIndices,
    remap: Vec<u32>,
    materials: Vec<u16>,
}

struct CookedConvexMesh {
    vertices: Vec<NativeVec3>,
}

struct HeightFieldData {
    rows: u32,
    columns: u32,
    samples: Vec<NativeHeightFieldSample>,
}

#[derive(Default)]
struct RapierState {
    bodies: RigidBodySet,
    colliders: ColliderSet,
    islands: IslandManager,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    actors: FxHashMap<u64, ActorEntry>,
    shapes: FxHashMap<u64, ShapeEntry>,
    materials: FxHashMap<u64, Counted<NativeMaterialDesc>>,
    triangle_meshes: FxHashMap<u64, Counted<CookedTriangleMesh>>,
    convex_meshes: FxHashMap<u64, Counted<CookedConvexMesh>>,
    height_fields: FxHashMap<u64, Counted<HeightFieldData>>,
    last_address: u64,
    statistics: NativeStatistics,
}

fn invalid<T: NativeObject>(ptr: NativePtr<T>) -> NativeError {
    NativeError::InvalidPointer {
        type_name: T::TYPE_NAME,
        address: ptr.address(),
    }
}

fn to_isometry(t: &NativeTransform) -> Isometry3<f32> {
    Isometry3::from_parts(
        Translation3::new(t.p.x, t.p.y, t.p.z),
        UnitQuaternion::new_normalize(Quaternion::new(t.q.w, t.q.x, t.q.y, t.q.z)),
    )
}

fn from_isometry(iso: &Isometry3<f32>) -> NativeTransform {
    let q = &iso.rotation.coords;
    let p = &iso.translation.vector;
    NativeTransform {
        q: NativeQuat {
            x: q.x,
            y: q.y,
            z: q.z,
            w: q.w,
        },
        p: NativeVec3::new(p.x, p.y, p.z),
    }
}

fn to_vector(v: &NativeVec3) -> Vector3<f32> {
    Vector3::new(v.x, v.y, v.z)
}

fn from_vector(v: &Vector3<f32>) -> NativeVec3 {
    NativeVec3::new(v.x, v.y, v.z)
}

fn scaled_points(vertices: &[NativeVec3], scale: &NativeVec3) -> Vec<Point3<f32>> {
    vertices
        .iter()
        .map(|v| {
            let s = v.component_mul(scale);
            Point3::new(s.x, s.y, s.z)
        })
        .collect()
}

fn apply_shape_flags(collider: &mut Collider, flags: ShapeFlags) {
    collider.set_sensor(flags.contains(ShapeFlags::TRIGGER_SHAPE));
    collider.set_solver_groups(if flags.contains(ShapeFlags::SIMULATION_SHAPE) {
        InteractionGroups::all()
    } else {
        InteractionGroups::none()
    });
}

fn flags_are_consistent(flags: ShapeFlags) -> bool {
    !flags.contains(ShapeFlags::TRIGGER_SHAPE | ShapeFlags::SIMULATION_SHAPE)
}

fn cook_triangle_mesh(desc: &NativeTriangleMeshDesc<'_>) -> Option<CookedTriangleMesh> {
    let vertex_count = desc.points.len();
    if vertex_count == 0 || desc.points.iter().any(|p| !p.is_finite()) {
        return None;
    }
    if !desc.materials.is_empty() && desc.materials.len() != desc.triangles.len() {
        return None;
    }

    let mut triangles = Vec::with_capacity(desc.triangles.len());
    let mut remap = Vec::with_capacity(desc.triangles.len());
    let mut materials = Vec::with_capacity(desc.triangles.len());
    for (index, triangle) in desc.triangles.iter().enumerate() {
        if triangle.iter().any(|&i| i as usize >= vertex_count) {
            return None;
        }
        // Degenerate triangles are dropped, the remap table keeps track of the survivors.
        if triangle[0] == triangle[1] || triangle[1] == triangle[2] || triangle[0] == triangle[2]
        {
            continue;
        }
        triangles.push(*triangle);
        remap.push(index as u32);
        materials.push(desc.materials.get(index).copied().unwrap_or_default());
    }

    if triangles.is_empty() {
        return None;
    }

    let triangles = if !desc.force_32bit_indices && vertex_count <= u16::MAX as usize + 1 {
        CookedIndices::U16(
            triangles
                .iter()
                .map(|t| [t[0] as u16, t[1] as u16, t[2] as u16])
                .collect(),
        )
    } else {
        CookedIndices::U32(triangles)
    };

    Some(CookedTriangleMesh {
        vertices: desc.points.to_vec(),
        triangles,
        remap,
        materials,
    })
}

impl RapierState {
    fn allocate_address(&mut self) -> u64 {
        self.last_address += 1;
        self.last_address
    }

    fn actor(&self, ptr: NativePtr<NativeActor>) -> Result<&ActorEntry, NativeError> {
        self.actors.get(&ptr.address()).ok_or_else(|| invalid(ptr))
    }

    fn body(&self, ptr: NativePtr<NativeActor>) -> Result<&RigidBody, NativeError> {
        let handle = self.actor(ptr)?.body;
        self.bodies.get(handle).ok_or_else(|| invalid(ptr))
    }

    fn body_mut(&mut self, ptr: NativePtr<NativeActor>) -> Result<&mut RigidBody, NativeError> {
        let handle = self.actor(ptr)?.body;
        self.bodies.get_mut(handle).ok_or_else(|| invalid(ptr))
    }

    fn dynamic_body(&self, ptr: NativePtr<NativeActor>) -> Result<&RigidBody, NativeError> {
        if self.actor(ptr)?.kind != NativeActorKind::Dynamic {
            return Err(NativeError::Unsupported("operation requires a dynamic actor"));
        }
        self.body(ptr)
    }

    fn dynamic_body_mut(
        &mut self,
        ptr: NativePtr<NativeActor>,
    ) -> Result<&mut RigidBody, NativeError> {
        if self.actor(ptr)?.kind != NativeActorKind::Dynamic {
            return Err(NativeError::Unsupported("operation requires a dynamic actor"));
        }
        self.body_mut(ptr)
    }

    fn shape(&self, ptr: NativePtr<NativeShape>) -> Result<&ShapeEntry, NativeError> {
        self.shapes.get(&ptr.address()).ok_or_else(|| invalid(ptr))
    }

    fn collider_mut(&mut self, ptr: NativePtr<NativeShape>) -> Result<&mut Collider, NativeError> {
        let handle = self.shape(ptr)?.collider;
        self.colliders.get_mut(handle).ok_or_else(|| invalid(ptr))
    }

    fn create_actor(&mut self, kind: NativeActorKind, pose: &NativeTransform) -> Option<u64> {
        if !pose.is_finite() {
            return None;
        }

        let builder = match kind {
            NativeActorKind::Static => RigidBodyBuilder::fixed(),
            NativeActorKind::Dynamic => RigidBodyBuilder::dynamic(),
        };
        let body = self.bodies.insert(builder.position(to_isometry(pose)).build());

        let address = self.allocate_address();
        self.actors.insert(
            address,
            ActorEntry {
                body,
                kind,
                shapes: Default::default(),
            },
        );
        self.statistics.actors.allocated += 1;
        Some(address)
    }

    fn release_actor(&mut self, ptr: NativePtr<NativeActor>) -> Result<(), NativeError> {
        let entry = self
            .actors
            .remove(&ptr.address())
            .ok_or_else(|| invalid(ptr))?;

        for shape in entry.shapes {
            self.detach_shape(shape);
        }

        self.bodies.remove(
            entry.body,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        self.statistics.actors.released += 1;
        Ok(())
    }

    fn retain(&mut self, mesh: MeshRef) {
        let count = match mesh {
            MeshRef::Triangle(a) => self.triangle_meshes.get_mut(&a).map(|m| &mut m.reference_count),
            MeshRef::Convex(a) => self.convex_meshes.get_mut(&a).map(|m| &mut m.reference_count),
            MeshRef::HeightField(a) => self.height_fields.get_mut(&a).map(|m| &mut m.reference_count),
        };
        if let Some(count) = count {
            *count += 1;
        }
    }

    fn unref<T>(map: &mut FxHashMap<u64, Counted<T>>, address: u64) -> bool {
        let Some(entry) = map.get_mut(&address) else {
            return false;
        };
        entry.reference_count -= 1;
        if entry.reference_count == 0 {
            map.remove(&address);
        }
        true
    }

    fn release_mesh(&mut self, mesh: MeshRef) {
        match mesh {
            MeshRef::Triangle(a) => Self::unref(&mut self.triangle_meshes, a),
            MeshRef::Convex(a) => Self::unref(&mut self.convex_meshes, a),
            MeshRef::HeightField(a) => Self::unref(&mut self.height_fields, a),
        };
    }

    // Removes the collider and drops references the shape holds. Does not touch the actor's
    // shape list.
    fn detach_shape(&mut self, address: u64) -> Option<ShapeEntry> {
        let entry = self.shapes.remove(&address)?;
        self.colliders
            .remove(entry.collider, &mut self.islands, &mut self.bodies, false);
        Self::unref(&mut self.materials, entry.material);
        if let Some(mesh) = entry.mesh {
            self.release_mesh(mesh);
        }
        Some(entry)
    }

    fn release_shape(&mut self, ptr: NativePtr<NativeShape>) -> Result<(), NativeError> {
        let entry = self
            .detach_shape(ptr.address())
            .ok_or_else(|| invalid(ptr))?;
        if let Some(actor) = self.actors.get_mut(&entry.actor) {
            actor.shapes.retain(|s| *s != ptr.address());
        }
        self.statistics.shapes.released += 1;
        Ok(())
    }

    fn build_shape(&self, geometry: &NativeGeometry) -> Option<(SharedShape, Option<MeshRef>)> {
        let finite = |v: f32| v.is_finite() && v >= 0.0;
        match geometry {
            NativeGeometry::Box(b) => {
                let h = &b.half_extents;
                (finite(h.x) && finite(h.y) && finite(h.z))
                    .then(|| (SharedShape::cuboid(h.x, h.y, h.z), None))
            }
            NativeGeometry::Sphere(s) => {
                finite(s.radius).then(|| (SharedShape::ball(s.radius), None))
            }
            NativeGeometry::Capsule(c) => (finite(c.radius) && finite(c.half_height))
                .then(|| (SharedShape::capsule_x(c.half_height, c.radius), None)),
            NativeGeometry::Plane(_) => Some((SharedShape::halfspace(Vector3::x_axis()), None)),
            NativeGeometry::ConvexMesh(c) => {
                if !c.scale.is_finite() {
                    return None;
                }
                let mesh = self.convex_meshes.get(&c.mesh.address())?;
                let points = scaled_points(&mesh.data.vertices, &c.scale);
                let shape = SharedShape::convex_hull(&points)?;
                Some((shape, Some(MeshRef::Convex(c.mesh.address()))))
            }
            NativeGeometry::TriangleMesh(t) => {
                if !t.scale.is_finite() {
                    return None;
                }
                let mesh = self.triangle_meshes.get(&t.mesh.address())?;
                let points = scaled_points(&mesh.data.vertices, &t.scale);
                let shape = SharedShape::trimesh(points, mesh.data.triangles.to_u32()).ok()?;
                Some((shape, Some(MeshRef::Triangle(t.mesh.address()))))
            }
            NativeGeometry::HeightField(h) => {
                if !(h.height_scale.is_finite() && finite(h.row_scale) && finite(h.column_scale)) {
                    return None;
                }
                let address = h.height_field.address();
                let field = &self.height_fields.get(&address)?.data;
                let (rows, columns) = (field.rows as usize, field.columns as usize);
                let heights = DMatrix::from_fn(rows, columns, |r, c| {
                    field.samples[r * columns + c].height as f32 * h.height_scale
                });
                let scale = Vector3::new(
                    h.column_scale * (columns - 1) as f32,
                    1.0,
                    h.row_scale * (rows - 1) as f32,
                );
                Some((
                    SharedShape::new(HeightField::new(heights, scale)),
                    Some(MeshRef::HeightField(address)),
                ))
            }
        }
    }

    fn create_shape(&mut self, desc: &NativeShapeDesc) -> Option<u64> {
        if !desc.local_pose.is_finite() || !flags_are_consistent(desc.flags) {
            return None;
        }
        let actor = desc.actor.address();
        let body = self.actors.get(&actor)?.body;
        let material = self.materials.get(&desc.material.address())?.data;
        let (shape, mesh) = self.build_shape(&desc.geometry)?;

        // Shapes start massless: mass properties change only through the explicit
        // `update_mass_and_inertia` call.
        let mut collider = ColliderBuilder::new(shape)
            .position(to_isometry(&desc.local_pose))
            .friction(material.dynamic_friction)
            .restitution(material.restitution)
            .density(0.0)
            .build();
        apply_shape_flags(&mut collider, desc.flags);
        let collider = self
            .colliders
            .insert_with_parent(collider, body, &mut self.bodies);

        let address = self.allocate_address();
        if let Some(material) = self.materials.get_mut(&desc.material.address()) {
            material.reference_count += 1;
        }
        if let Some(mesh) = mesh {
            self.retain(mesh);
        }
        if let Some(actor) = self.actors.get_mut(&actor) {
            actor.shapes.push(address);
        }
        self.shapes.insert(
            address,
            ShapeEntry {
                collider,
                actor,
                material: desc.material.address(),
                mesh,
                flags: desc.flags,
                local_pose: desc.local_pose,
            },
        );
        self.statistics.shapes.allocated += 1;
        Some(address)
    }

    fn shape_actor(&self, ptr: NativePtr<NativeShape>) -> Result<u64, NativeError> {
        let entry = self.shape(ptr)?;
        let actor = self.actors.get(&entry.actor).ok_or_else(|| invalid(ptr))?;
        let parent = self
            .colliders
            .get(entry.collider)
            .and_then(|collider| collider.parent());
        if parent == Some(actor.body) {
            Ok(entry.actor)
        } else {
            Err(invalid(ptr))
        }
    }

    fn update_mass_and_inertia(
        &mut self,
        ptr: NativePtr<NativeActor>,
        density: f32,
    ) -> Result<(), NativeError> {
        if !density.is_finite() || density < 0.0 {
            return Err(NativeError::Unsupported(
                "density must be finite and non-negative",
            ));
        }
        self.dynamic_body(ptr)?;

        let shapes = self.actor(ptr)?.shapes.clone();
        for shape in shapes {
            let Some(entry) = self.shapes.get(&shape) else {
                continue;
            };
            if !entry.flags.contains(ShapeFlags::SIMULATION_SHAPE) {
                continue;
            }
            if let Some(collider) = self.colliders.get_mut(entry.collider) {
                collider.set_density(density);
            }
        }

        let handle = self.actor(ptr)?.body;
        let body = self.bodies.get_mut(handle).ok_or_else(|| invalid(ptr))?;
        body.recompute_mass_properties_from_colliders(&self.colliders);
        Ok(())
    }

    fn create_material(&mut self, desc: &NativeMaterialDesc) -> Option<u64> {
        let valid = |v: f32| v.is_finite() && v >= 0.0;
        if !(valid(desc.static_friction) && valid(desc.dynamic_friction) && valid(desc.restitution))
        {
            return None;
        }
        let address = self.allocate_address();
        self.materials.insert(address, Counted::new(*desc));
        self.statistics.materials.allocated += 1;
        Some(address)
    }

    fn create_convex_mesh(&mut self, desc: &NativeConvexMeshDesc<'_>) -> Option<u64> {
        if desc.points.iter().any(|p| !p.is_finite()) {
            return None;
        }
        let points = scaled_points(desc.points, &NativeVec3::ONE);
        let hull = SharedShape::convex_hull(&points)?;
        let vertices = hull
            .as_convex_polyhedron()
            .map(|polyhedron| {
                polyhedron
                    .points()
                    .iter()
                    .map(|p| NativeVec3::new(p.x, p.y, p.z))
                    .collect()
            })
            .unwrap_or_else(|| desc.points.to_vec());

        let address = self.allocate_address();
        self.convex_meshes
            .insert(address, Counted::new(CookedConvexMesh { vertices }));
        self.statistics.convex_meshes.allocated += 1;
        Some(address)
    }

    fn create_height_field(&mut self, desc: &NativeHeightFieldDesc<'_>) -> Option<u64> {
        if desc.rows < 2
            || desc.columns < 2
            || desc.samples.len() != desc.rows as usize * desc.columns as usize
        {
            return None;
        }
        let address = self.allocate_address();
        self.height_fields.insert(
            address,
            Counted::new(HeightFieldData {
                rows: desc.rows,
                columns: desc.columns,
                samples: desc.samples.to_vec(),
            }),
        );
        self.statistics.height_fields.allocated += 1;
        Some(address)
    }
}

/// Native engine implemented on Rapier. All calls are serialized by an internal mutex; visitors
/// passed to `visit_*` methods run while it is held and must not call back into the engine.
#[derive(Default)]
pub struct RapierPhysics {
    state: Mutex<RapierState>,
}

impl Debug for RapierPhysics {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "RapierPhysics")
    }
}

impl RapierPhysics {
    /// Creates an empty engine instance.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocation statistics since the engine was created.
    pub fn statistics(&self) -> NativeStatistics {
        self.state.lock().statistics
    }

    /// Counts of objects currently alive inside the engine.
    pub fn live_objects(&self) -> LiveObjects {
        let state = self.state.lock();
        LiveObjects {
            actors: state.actors.len(),
            shapes: state.shapes.len(),
            materials: state.materials.len(),
            triangle_meshes: state.triangle_meshes.len(),
            convex_meshes: state.convex_meshes.len(),
            height_fields: state.height_fields.len(),
        }
    }

    /// Returns the collider backing a shape, for inspection.
    pub fn with_collider<R>(
        &self,
        shape: NativePtr<NativeShape>,
        func: impl FnOnce(&Collider) -> R,
    ) -> Result<R, NativeError> {
        let state = self.state.lock();
        let handle = state.shape(shape)?.collider;
        state
            .colliders
            .get(handle)
            .map(func)
            .ok_or_else(|| invalid(shape))
    }
}

impl NativePhysics for RapierPhysics {
    fn create_actor(
        &self,
        kind: NativeActorKind,
        pose: &NativeTransform,
    ) -> Option<NativePtr<NativeActor>> {
        self.state
            .lock()
            .create_actor(kind, pose)
            .and_then(NativePtr::new)
    }

    fn release_actor(&self, actor: NativePtr<NativeActor>) -> Result<(), NativeError> {
        self.state.lock().release_actor(actor)
    }

    fn actor_kind(&self, actor: NativePtr<NativeActor>) -> Result<NativeActorKind, NativeError> {
        Ok(self.state.lock().actor(actor)?.kind)
    }

    fn actor_global_pose(
        &self,
        actor: NativePtr<NativeActor>,
    ) -> Result<NativeTransform, NativeError> {
        Ok(from_isometry(self.state.lock().body(actor)?.position()))
    }

    fn set_actor_global_pose(
        &self,
        actor: NativePtr<NativeActor>,
        pose: &NativeTransform,
    ) -> Result<(), NativeError> {
        if !pose.is_finite() {
            return Err(NativeError::Unsupported("pose must be finite"));
        }
        self.state
            .lock()
            .body_mut(actor)?
            .set_position(to_isometry(pose), false);
        Ok(())
    }

    fn actor_shapes(
        &self,
        actor: NativePtr<NativeActor>,
    ) -> Result<Vec<NativePtr<NativeShape>>, NativeError> {
        Ok(self
            .state
            .lock()
            .actor(actor)?
            .shapes
            .iter()
            .filter_map(|a| NativePtr::new(*a))
            .collect())
    }

    fn body_mass(&self, actor: NativePtr<NativeActor>) -> Result<f32, NativeError> {
        Ok(self.state.lock().dynamic_body(actor)?.mass())
    }

    fn update_mass_and_inertia(
        &self,
        actor: NativePtr<NativeActor>,
        density: f32,
    ) -> Result<(), NativeError> {
        self.state.lock().update_mass_and_inertia(actor, density)
    }

    fn linear_velocity(&self, actor: NativePtr<NativeActor>) -> Result<NativeVec3, NativeError> {
        Ok(from_vector(self.state.lock().dynamic_body(actor)?.linvel()))
    }

    fn set_linear_velocity(
        &self,
        actor: NativePtr<NativeActor>,
        velocity: &NativeVec3,
    ) -> Result<(), NativeError> {
        self.state
            .lock()
            .dynamic_body_mut(actor)?
            .set_linvel(to_vector(velocity), false);
        Ok(())
    }

    fn angular_velocity(&self, actor: NativePtr<NativeActor>) -> Result<NativeVec3, NativeError> {
        Ok(from_vector(self.state.lock().dynamic_body(actor)?.angvel()))
    }

    fn set_angular_velocity(
        &self,
        actor: NativePtr<NativeActor>,
        velocity: &NativeVec3,
    ) -> Result<(), NativeError> {
        self.state
            .lock()
            .dynamic_body_mut(actor)?
            .set_angvel(to_vector(velocity), false);
        Ok(())
    }

    fn is_sleeping(&self, actor: NativePtr<NativeActor>) -> Result<bool, NativeError> {
        Ok(self.state.lock().dynamic_body(actor)?.is_sleeping())
    }

    fn wake_up(&self, actor: NativePtr<NativeActor>) -> Result<(), NativeError> {
        self.state.lock().dynamic_body_mut(actor)?.wake_up(true);
        Ok(())
    }

    fn put_to_sleep(&self, actor: NativePtr<NativeActor>) -> Result<(), NativeError> {
        self.state.lock().dynamic_body_mut(actor)?.sleep();
        Ok(())
    }

    fn create_shape(&self, desc: &NativeShapeDesc) -> Option<NativePtr<NativeShape>> {
        self.state.lock().create_shape(desc).and_then(NativePtr::new)
    }

    fn release_shape(&self, shape: NativePtr<NativeShape>) -> Result<(), NativeError> {
        self.state.lock().release_shape(shape)
    }

    fn shape_actor(
        &self,
        shape: NativePtr<NativeShape>,
    ) -> Result<NativePtr<NativeActor>, NativeError> {
        let address = self.state.lock().shape_actor(shape)?;
        NativePtr::new(address).ok_or_else(|| invalid(shape))
    }

    fn shape_flags(&self, shape: NativePtr<NativeShape>) -> Result<ShapeFlags, NativeError> {
        Ok(self.state.lock().shape(shape)?.flags)
    }

    fn set_shape_flags(
        &self,
        shape: NativePtr<NativeShape>,
        flags: ShapeFlags,
    ) -> Result<(), NativeError> {
        if !flags_are_consistent(flags) {
            return Err(NativeError::Unsupported(
                "trigger shapes cannot take part in simulation",
            ));
        }
        let mut state = self.state.lock();
        apply_shape_flags(state.collider_mut(shape)?, flags);
        if let Some(entry) = state.shapes.get_mut(&shape.address()) {
            entry.flags = flags;
        }
        Ok(())
    }

    fn shape_local_pose(
        &self,
        shape: NativePtr<NativeShape>,
    ) -> Result<NativeTransform, NativeError> {
        Ok(self.state.lock().shape(shape)?.local_pose)
    }

    fn set_shape_local_pose(
        &self,
        shape: NativePtr<NativeShape>,
        pose: &NativeTransform,
    ) -> Result<(), NativeError> {
        if !pose.is_finite() {
            return Err(NativeError::Unsupported("pose must be finite"));
        }
        let mut state = self.state.lock();
        state
            .collider_mut(shape)?
            .set_position_wrt_parent(to_isometry(pose));
        if let Some(entry) = state.shapes.get_mut(&shape.address()) {
            entry.local_pose = *pose;
        }
        Ok(())
    }

    fn create_material(&self, desc: &NativeMaterialDesc) -> Option<NativePtr<NativeMaterial>> {
        self.state
            .lock()
            .create_material(desc)
            .and_then(NativePtr::new)
    }

    fn release_material(&self, material: NativePtr<NativeMaterial>) -> Result<(), NativeError> {
        let mut state = self.state.lock();
        if !RapierState::unref(&mut state.materials, material.address()) {
            return Err(invalid(material));
        }
        state.statistics.materials.released += 1;
        Ok(())
    }

    fn material_desc(
        &self,
        material: NativePtr<NativeMaterial>,
    ) -> Result<NativeMaterialDesc, NativeError> {
        self.state
            .lock()
            .materials
            .get(&material.address())
            .map(|m| m.data)
            .ok_or_else(|| invalid(material))
    }

    fn set_material_desc(
        &self,
        material: NativePtr<NativeMaterial>,
        desc: &NativeMaterialDesc,
    ) -> Result<(), NativeError> {
        let mut state = self.state.lock();
        let state = &mut *state;
        let entry = state
            .materials
            .get_mut(&material.address())
            .ok_or_else(|| invalid(material))?;
        entry.data = *desc;

        // Colliders copy friction and restitution, push the new values to every user.
        for shape in state.shapes.values() {
            if shape.material != material.address() {
                continue;
            }
            if let Some(collider) = state.colliders.get_mut(shape.collider) {
                collider.set_friction(desc.dynamic_friction);
                collider.set_restitution(desc.restitution);
            }
        }
        Ok(())
    }

    fn create_triangle_mesh(
        &self,
        desc: &NativeTriangleMeshDesc<'_>,
    ) -> Option<NativePtr<NativeTriangleMesh>> {
        let cooked = cook_triangle_mesh(desc)?;
        let mut state = self.state.lock();
        let address = state.allocate_address();
        state.triangle_meshes.insert(address, Counted::new(cooked));
        state.statistics.triangle_meshes.allocated += 1;
        NativePtr::new(address)
    }

    fn release_triangle_mesh(
        &self,
        mesh: NativePtr<NativeTriangleMesh>,
    ) -> Result<(), NativeError> {
        let mut state = self.state.lock();
        if !RapierState::unref(&mut state.triangle_meshes, mesh.address()) {
            return Err(invalid(mesh));
        }
        state.statistics.triangle_meshes.released += 1;
        Ok(())
    }

    fn visit_triangle_mesh(
        &self,
        mesh: NativePtr<NativeTriangleMesh>,
        visitor: &mut dyn FnMut(&NativeTriangleMeshView<'_>),
    ) -> Result<(), NativeError> {
        let state = self.state.lock();
        let entry = state
            .triangle_meshes
            .get(&mesh.address())
            .ok_or_else(|| invalid(mesh))?;
        visitor(&NativeTriangleMeshView {
            vertices: &entry.data.vertices,
            triangles: entry.data.triangles.as_native(),
            remap: &entry.data.remap,
            materials: &entry.data.materials,
            reference_count: entry.reference_count,
        });
        Ok(())
    }

    fn create_convex_mesh(
        &self,
        desc: &NativeConvexMeshDesc<'_>,
    ) -> Option<NativePtr<NativeConvexMesh>> {
        self.state
            .lock()
            .create_convex_mesh(desc)
            .and_then(NativePtr::new)
    }

    fn release_convex_mesh(&self, mesh: NativePtr<NativeConvexMesh>) -> Result<(), NativeError> {
        let mut state = self.state.lock();
        if !RapierState::unref(&mut state.convex_meshes, mesh.address()) {
            return Err(invalid(mesh));
        }
        state.statistics.convex_meshes.released += 1;
        Ok(())
    }

    fn visit_convex_mesh(
        &self,
        mesh: NativePtr<NativeConvexMesh>,
        visitor: &mut dyn FnMut(&NativeConvexMeshView<'_>),
    ) -> Result<(), NativeError> {
        let state = self.state.lock();
        let entry = state
            .convex_meshes
            .get(&mesh.address())
            .ok_or_else(|| invalid(mesh))?;
        visitor(&NativeConvexMeshView {
            vertices: &entry.data.vertices,
            reference_count: entry.reference_count,
        });
        Ok(())
    }

    fn create_height_field(
        &self,
        desc: &NativeHeightFieldDesc<'_>,
    ) -> Option<NativePtr<NativeHeightField>> {
        self.state
            .lock()
            .create_height_field(desc)
            .and_then(NativePtr::new)
    }

    fn release_height_field(
        &self,
        height_field: NativePtr<NativeHeightField>,
    ) -> Result<(), NativeError> {
        let mut state = self.state.lock();
        if !RapierState::unref(&mut state.height_fields, height_field.address()) {
            return Err(invalid(height_field));
        }
        state.statistics.height_fields.released += 1;
        Ok(())
    }

    fn visit_height_field(
        &self,
        height_field: NativePtr<NativeHeightField>,
        visitor: &mut dyn FnMut(&NativeHeightFieldView<'_>),
    ) -> Result<(), NativeError> {
        let state = self.state.lock();
        let entry = state
            .height_fields
            .get(&height_field.address())
            .ok_or_else(|| invalid(height_field))?;
        visitor(&NativeHeightFieldView {
            rows: entry.data.rows,
            columns: entry.data.columns,
            samples: &entry.data.samples,
            reference_count: entry.reference_count,
        });
        Ok(())
    }
}
