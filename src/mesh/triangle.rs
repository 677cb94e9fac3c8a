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

use crate::{
    core::algebra::Vector3,
    error::BridgeError,
    mesh::{impl_mesh_lifecycle, visit_mesh, MeshResource},
    native::{NativePtr, NativeTriangleIndices, NativeTriangleMesh, SharedNative},
    physics::PhysicsId,
};

/// Raw triangle indices in the width the engine stores them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TriangleIndexBuffer {
    U16(Vec<[u16; 3]>),
    U32(Vec<[u32; 3]>),
}

impl TriangleIndexBuffer {
    /// Number of triangles.
    pub fn len(&self) -> usize {
        match self {
            TriangleIndexBuffer::U16(t) => t.len(),
            TriangleIndexBuffer::U32(t) => t.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Widens indices to 32 bits.
    pub fn to_u32(&self) -> Vec<[u32; 3]> {
        match self {
            TriangleIndexBuffer::U16(t) => t
                .iter()
                .map(|t| [t[0] as u32, t[1] as u32, t[2] as u32])
                .collect(),
            TriangleIndexBuffer::U32(t) => t.clone(),
        }
    }
}

impl From<NativeTriangleIndices<'_>> for TriangleIndexBuffer {
    fn from(indices: NativeTriangleIndices<'_>) -> Self {
        match indices {
            NativeTriangleIndices::U16(t) => Self::U16(t.to_vec()),
            NativeTriangleIndices::U32(t) => Self::U32(t.to_vec()),
        }
    }
}

/// Cooked triangle mesh. Cooking may drop degenerate triangles, so [`Self::triangle_remap`]
/// maps every triangle back to its index in the source descriptor.
///
/// All accessors copy data out of the engine and fail with [`BridgeError::InvalidOperation`]
/// after disposal.
pub struct TriangleMesh {
    resource: MeshResource<NativeTriangleMesh>,
}

impl_mesh_lifecycle!(TriangleMesh, NativeTriangleMesh);

impl TriangleMesh {
    pub(crate) fn new(
        native: SharedNative,
        ptr: NativePtr<NativeTriangleMesh>,
        physics: PhysicsId,
    ) -> Self {
        Self {
            resource: MeshResource::new(native, ptr, physics),
        }
    }

    pub fn number_of_vertices(&self) -> Result<usize, BridgeError> {
        visit_mesh!(self.resource, visit_triangle_mesh, |view| view.vertices.len())
    }

    pub fn number_of_triangles(&self) -> Result<usize, BridgeError> {
        visit_mesh!(self.resource, visit_triangle_mesh, |view| view.triangles.len())
    }

    pub fn vertices(&self) -> Result<Vec<Vector3<f32>>, BridgeError> {
        visit_mesh!(self.resource, visit_triangle_mesh, |view| view
            .vertices
            .iter()
            .map(|v| Vector3::from(*v))
            .collect())
    }

    /// Triangles with indices widened to 32 bits, one entry per triangle.
    pub fn triangles(&self) -> Result<Vec<[u32; 3]>, BridgeError> {
        Ok(self.triangle_index_buffer()?.to_u32())
    }

    /// Triangles in their native index width; see [`Self::has_16bit_triangle_indices`].
    pub fn triangle_index_buffer(&self) -> Result<TriangleIndexBuffer, BridgeError> {
        visit_mesh!(self.resource, visit_triangle_mesh, |view| {
            TriangleIndexBuffer::from(view.triangles)
        })
    }

    pub fn has_16bit_triangle_indices(&self) -> Result<bool, BridgeError> {
        visit_mesh!(self.resource, visit_triangle_mesh, |view| matches!(
            view.triangles,
            NativeTriangleIndices::U16(_)
        ))
    }

    /// Source index of every cooked triangle.
    pub fn triangle_remap(&self) -> Result<Vec<u32>, BridgeError> {
        visit_mesh!(self.resource, visit_triangle_mesh, |view| view.remap.to_vec())
    }

    /// Material index of the `index`-th triangle.
    pub fn triangle_material_index(&self, index: usize) -> Result<u16, BridgeError> {
        visit_mesh!(self.resource, visit_triangle_mesh, |view| {
            BridgeError::check_index(index, view.triangles.len())
                .map(|_| view.materials.get(index).copied().unwrap_or_default())
        })?
    }

    /// Reference count kept by the engine: this wrapper plus every shape using the mesh.
    pub fn reference_count(&self) -> Result<u32, BridgeError> {
        visit_mesh!(self.resource, visit_triangle_mesh, |view| view.reference_count)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        cooking::TriangleMeshDesc,
        core::algebra::Vector3,
        error::BridgeError,
        event::DisposeEvent,
        mesh::{TriangleIndexBuffer, TriangleMesh},
        native::rapier::RapierPhysics,
        physics::Physics,
    };
    use std::sync::{mpsc::channel, Arc, Mutex};

    fn quad(physics: &Physics) -> Arc<TriangleMesh> {
        let desc = TriangleMeshDesc::new(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 1.0),
                Vector3::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .with_materials(vec![3, 7]);
        physics.create_triangle_mesh(&desc).unwrap()
    }

    #[test]
    fn accessors_match_counts() {
        let physics = Physics::new(Arc::new(RapierPhysics::new()));
        let mesh = quad(&physics);

        assert_eq!(mesh.vertices().unwrap().len(), mesh.number_of_vertices().unwrap());
        assert_eq!(mesh.triangles().unwrap().len(), mesh.number_of_triangles().unwrap());
        assert_eq!(mesh.triangles().unwrap(), vec![[0, 1, 2], [0, 2, 3]]);
        assert_eq!(mesh.triangle_remap().unwrap(), vec![0, 1]);
        assert!(mesh.has_16bit_triangle_indices().unwrap());
        assert!(matches!(
            mesh.triangle_index_buffer().unwrap(),
            TriangleIndexBuffer::U16(_)
        ));
        assert_eq!(mesh.reference_count().unwrap(), 1);
    }

    #[test]
    fn triangle_material_index_bounds() {
        let physics = Physics::new(Arc::new(RapierPhysics::new()));
        let mesh = quad(&physics);
        assert_eq!(mesh.triangle_material_index(1).unwrap(), 7);
        assert_eq!(mesh.triangle_material_index(1).unwrap(), 7);
        assert_eq!(
            mesh.triangle_material_index(2),
            Err(BridgeError::IndexOutOfRange { index: 2, len: 2 })
        );
    }

    #[test]
    fn accessors_fail_after_disposal() {
        let physics = Physics::new(Arc::new(RapierPhysics::new()));
        let mesh = quad(&physics);
        assert_eq!(mesh.dispose(), Ok(true));
        assert_eq!(mesh.dispose(), Ok(false));
        assert!(mesh.is_disposed());
        assert_eq!(mesh.physics(), None);

        let invalid = |r: Result<(), BridgeError>| matches!(r, Err(BridgeError::InvalidOperation(_)));
        assert!(invalid(mesh.vertices().map(|_| ())));
        assert!(invalid(mesh.triangles().map(|_| ())));
        assert!(invalid(mesh.triangle_remap().map(|_| ())));
        assert!(invalid(mesh.triangle_material_index(0).map(|_| ())));
        assert!(invalid(mesh.native().map(|_| ())));
    }

    #[test]
    fn dispose_events_are_ordered_and_sent_once() {
        let rapier = Arc::new(RapierPhysics::new());
        let physics = Physics::new(rapier.clone());
        let mesh = quad(&physics);

        let seen = Arc::new(Mutex::new(Vec::new()));
        let listener_seen = seen.clone();
        let listener_rapier = rapier.clone();
        mesh.add_dispose_listener(move |event| {
            let alive = listener_rapier.live_objects().triangle_meshes;
            listener_seen.lock().unwrap().push((event, alive));
        });
        let (sender, receiver) = channel();
        mesh.add_dispose_sender(sender);

        mesh.dispose().unwrap();
        mesh.dispose().unwrap();
        drop(mesh);

        assert_eq!(
            *seen.lock().unwrap(),
            vec![(DisposeEvent::Disposing, 1), (DisposeEvent::Disposed, 0)]
        );
        assert_eq!(
            receiver.try_iter().collect::<Vec<_>>(),
            vec![DisposeEvent::Disposing, DisposeEvent::Disposed]
        );
        assert_eq!(rapier.statistics().triangle_meshes.released, 1);
    }

    #[test]
    fn drop_disposes_and_notifies() {
        let rapier = Arc::new(RapierPhysics::new());
        let physics = Physics::new(rapier.clone());
        let mesh = quad(&physics);
        let (sender, receiver) = channel();
        mesh.add_dispose_sender(sender);

        drop(mesh);
        assert_eq!(
            receiver.try_iter().collect::<Vec<_>>(),
            vec![DisposeEvent::Disposing, DisposeEvent::Disposed]
        );
        assert_eq!(rapier.statistics().triangle_meshes.released, 1);
    }

    #[test]
    fn wide_indices_when_forced() {
        let physics = Physics::new(Arc::new(RapierPhysics::new()));
        let desc = TriangleMeshDesc::new(
            vec![
                Vector3::new(0.0, 0.0, 0.0),
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 0.0, 1.0),
            ],
            vec![[0, 1, 2]],
        )
        .with_32bit_indices(true);
        let mesh = physics.create_triangle_mesh(&desc).unwrap();
        assert!(!mesh.has_16bit_triangle_indices().unwrap());
        assert_eq!(
            mesh.triangle_index_buffer().unwrap(),
            TriangleIndexBuffer::U32(vec![[0, 1, 2]])
        );
    }
}
