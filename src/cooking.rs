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

//! Mesh descriptors handed to the native engine for cooking.
//!
//! Descriptors are validated on the bridge side first, so malformed data never reaches the
//! engine. The engine may still refuse a valid descriptor (for example when every triangle is
//! degenerate), which is reported as [`BridgeError::NativeAllocationFailure`].

use crate::{
    core::algebra::Vector3,
    error::BridgeError,
    native::{
        NativeConvexMesh, NativeConvexMeshDesc, NativeHeightField, NativeHeightFieldDesc,
        NativeHeightFieldSample, NativePhysics, NativePtr, NativeTriangleMesh,
        NativeTriangleMeshDesc, NativeVec3,
    },
};

/// One height field sample: a height and the material indices of the two triangles of the cell.
pub type HeightFieldSample = NativeHeightFieldSample;

fn to_native_points(points: &[Vector3<f32>]) -> Result<Vec<NativeVec3>, BridgeError> {
    let points = points
        .iter()
        .map(|p| NativeVec3::from(*p))
        .collect::<Vec<_>>();
    if let Some(index) = points.iter().position(|p| !p.is_finite()) {
        return Err(BridgeError::InvalidArgument(format!(
            "point {index} is not finite"
        )));
    }
    Ok(points)
}

/// Source data of a triangle mesh.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TriangleMeshDesc {
    pub points: Vec<Vector3<f32>>,
    pub triangles: Vec<[u32; 3]>,
    /// Per-triangle material indices. Either empty or one entry per triangle.
    pub materials: Vec<u16>,
    /// Keeps 32-bit indices even when 16 bits would be enough.
    pub force_32bit_indices: bool,
}

impl TriangleMeshDesc {
    pub fn new(points: Vec<Vector3<f32>>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            points,
            triangles,
            ..Default::default()
        }
    }

    pub fn with_materials(mut self, materials: Vec<u16>) -> Self {
        self.materials = materials;
        self
    }

    pub fn with_32bit_indices(mut self, force: bool) -> Self {
        self.force_32bit_indices = force;
        self
    }

    /// Checks the descriptor without touching the engine.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.points.is_empty() {
            return Err(BridgeError::InvalidArgument(
                "triangle mesh has no points".to_string(),
            ));
        }
        if self.triangles.is_empty() {
            return Err(BridgeError::InvalidArgument(
                "triangle mesh has no triangles".to_string(),
            ));
        }
        for triangle in self.triangles.iter() {
            for &index in triangle {
                BridgeError::check_index(index as usize, self.points.len())?;
            }
        }
        if !self.materials.is_empty() && self.materials.len() != self.triangles.len() {
            return Err(BridgeError::InvalidArgument(format!(
                "expected {} triangle materials, got {}",
                self.triangles.len(),
                self.materials.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn cook(
        &self,
        native: &dyn NativePhysics,
    ) -> Result<NativePtr<NativeTriangleMesh>, BridgeError> {
        self.validate()?;
        let points = to_native_points(&self.points)?;
        native
            .create_triangle_mesh(&NativeTriangleMeshDesc {
                points: &points,
                triangles: &self.triangles,
                materials: &self.materials,
                force_32bit_indices: self.force_32bit_indices,
            })
            .ok_or(BridgeError::NativeAllocationFailure("triangle mesh"))
    }
}

/// Source points of a convex mesh. The engine computes the hull.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvexMeshDesc {
    pub points: Vec<Vector3<f32>>,
}

impl ConvexMeshDesc {
    pub fn new(points: Vec<Vector3<f32>>) -> Self {
        Self { points }
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.points.len() < 4 {
            return Err(BridgeError::InvalidArgument(format!(
                "convex mesh needs at least 4 points, got {}",
                self.points.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn cook(
        &self,
        native: &dyn NativePhysics,
    ) -> Result<NativePtr<NativeConvexMesh>, BridgeError> {
        self.validate()?;
        let points = to_native_points(&self.points)?;
        native
            .create_convex_mesh(&NativeConvexMeshDesc { points: &points })
            .ok_or(BridgeError::NativeAllocationFailure("convex mesh"))
    }
}

/// Row-major grid of height samples.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeightFieldDesc {
    pub rows: u32,
    pub columns: u32,
    pub samples: Vec<HeightFieldSample>,
}

impl HeightFieldDesc {
    /// Creates a descriptor from raw heights, all cells use material 0.
    pub fn from_heights(rows: u32, columns: u32, heights: &[i16]) -> Self {
        Self {
            rows,
            columns,
            samples: heights
                .iter()
                .map(|&height| HeightFieldSample {
                    height,
                    ..Default::default()
                })
                .collect(),
        }
    }

    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.rows < 2 || self.columns < 2 {
            return Err(BridgeError::InvalidArgument(format!(
                "height field must be at least 2x2, got {}x{}",
                self.rows, self.columns
            )));
        }
        let expected = self.rows as usize * self.columns as usize;
        if self.samples.len() != expected {
            return Err(BridgeError::InvalidArgument(format!(
                "expected {expected} height field samples, got {}",
                self.samples.len()
            )));
        }
        Ok(())
    }

    pub(crate) fn cook(
        &self,
        native: &dyn NativePhysics,
    ) -> Result<NativePtr<NativeHeightField>, BridgeError> {
        self.validate()?;
        native
            .create_height_field(&NativeHeightFieldDesc {
                rows: self.rows,
                columns: self.columns,
                samples: &self.samples,
            })
            .ok_or(BridgeError::NativeAllocationFailure("height field"))
    }
}
