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
    cooking::HeightFieldSample,
    error::BridgeError,
    mesh::{impl_mesh_lifecycle, visit_mesh, MeshResource},
    native::{NativeHeightField, NativePtr, SharedNative},
    physics::PhysicsId,
};

/// Regular grid of height samples stored by the engine.
pub struct HeightField {
    resource: MeshResource<NativeHeightField>,
}

impl_mesh_lifecycle!(HeightField, NativeHeightField);

impl HeightField {
    pub(crate) fn new(
        native: SharedNative,
        ptr: NativePtr<NativeHeightField>,
        physics: PhysicsId,
    ) -> Self {
        Self {
            resource: MeshResource::new(native, ptr, physics),
        }
    }

    pub fn rows(&self) -> Result<u32, BridgeError> {
        visit_mesh!(self.resource, visit_height_field, |view| view.rows)
    }

    pub fn columns(&self) -> Result<u32, BridgeError> {
        visit_mesh!(self.resource, visit_height_field, |view| view.columns)
    }

    /// All samples, row-major.
    pub fn samples(&self) -> Result<Vec<HeightFieldSample>, BridgeError> {
        visit_mesh!(self.resource, visit_height_field, |view| view.samples.to_vec())
    }

    pub fn sample(&self, row: u32, column: u32) -> Result<HeightFieldSample, BridgeError> {
        visit_mesh!(self.resource, visit_height_field, |view| {
            BridgeError::check_index(row as usize, view.rows as usize)
                .and_then(|_| BridgeError::check_index(column as usize, view.columns as usize))
                .map(|_| view.samples[(row * view.columns + column) as usize])
        })?
    }

    pub fn height(&self, row: u32, column: u32) -> Result<i16, BridgeError> {
        Ok(self.sample(row, column)?.height)
    }

    pub fn reference_count(&self) -> Result<u32, BridgeError> {
        visit_mesh!(self.resource, visit_height_field, |view| view.reference_count)
    }
}

#[cfg(test)]
mod test {
    use crate::{
        cooking::HeightFieldDesc, error::BridgeError, native::rapier::RapierPhysics,
        physics::Physics,
    };
    use std::sync::Arc;

    #[test]
    fn samples_are_row_major() {
        let physics = Physics::new(Arc::new(RapierPhysics::new()));
        let field = physics
            .create_height_field(&HeightFieldDesc::from_heights(2, 3, &[0, 1, 2, 3, 4, 5]))
            .unwrap();
        assert_eq!(field.rows().unwrap(), 2);
        assert_eq!(field.columns().unwrap(), 3);
        assert_eq!(field.height(1, 0).unwrap(), 3);
        assert_eq!(field.samples().unwrap().len(), 6);
        assert_eq!(
            field.height(0, 3),
            Err(BridgeError::IndexOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn disposal_clears_back_reference() {
        let physics = Physics::new(Arc::new(RapierPhysics::new()));
        let field = physics
            .create_height_field(&HeightFieldDesc::from_heights(2, 2, &[0; 4]))
            .unwrap();
        assert_eq!(field.physics(), Some(physics.id()));
        field.dispose().unwrap();
        assert_eq!(field.physics(), None);
        assert!(matches!(field.rows(), Err(BridgeError::InvalidOperation(_))));
    }
}
