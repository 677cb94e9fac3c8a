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
    native::{NativeConvexMesh, NativePtr, SharedNative},
    physics::PhysicsId,
};

/// Cooked convex hull.
pub struct ConvexMesh {
    resource: MeshResource<NativeConvexMesh>,
}

impl_mesh_lifecycle!(ConvexMesh, NativeConvexMesh);

impl ConvexMesh {
    pub(crate) fn new(
        native: SharedNative,
        ptr: NativePtr<NativeConvexMesh>,
        physics: PhysicsId,
    ) -> Self {
        Self {
            resource: MeshResource::new(native, ptr, physics),
        }
    }

    pub fn number_of_vertices(&self) -> Result<usize, BridgeError> {
        visit_mesh!(self.resource, visit_convex_mesh, |view| view.vertices.len())
    }

    /// Hull vertices. Interior source points are not part of the hull.
    pub fn vertices(&self) -> Result<Vec<Vector3<f32>>, BridgeError> {
        visit_mesh!(self.resource, visit_convex_mesh, |view| view
            .vertices
            .iter()
            .map(|v| Vector3::from(*v))
            .collect())
    }

    pub fn reference_count(&self) -> Result<u32, BridgeError> {
        visit_mesh!(self.resource, visit_convex_mesh, |view| view.reference_count)
    }
}
