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

//! Disposable wrappers around cooked native mesh assets.
//!
//! Every mesh owns one reference to its native asset. Shapes built from the mesh hold their own
//! native references, so the asset may outlive the wrapper; the wrapper still releases exactly
//! its one reference, either on [`TriangleMesh::dispose`] (and friends) or on drop.
//!
//! Disposal notifies listeners synchronously: [`DisposeEvent::Disposing`] while the data is
//! still readable, then the native release, then [`DisposeEvent::Disposed`]. Events are sent only
//! by the call that actually performs the release.

mod convex;
mod heightfield;
mod triangle;

pub use convex::ConvexMesh;
pub use heightfield::HeightField;
pub use triangle::{TriangleIndexBuffer, TriangleMesh};

use crate::{
    core::{log::Log, parking_lot::Mutex},
    error::{BridgeError, NativeError},
    event::{DisposeEvent, DisposeEventBroadcaster},
    handle::NativeHandle,
    native::{NativeObject, NativePtr, SharedNative},
    physics::PhysicsId,
};

pub(crate) struct MeshResource<T: NativeObject> {
    handle: NativeHandle<T>,
    physics: Mutex<Option<PhysicsId>>,
    events: DisposeEventBroadcaster,
}

impl<T: NativeObject> MeshResource<T> {
    pub(crate) fn new(native: SharedNative, ptr: NativePtr<T>, physics: PhysicsId) -> Self {
        Self {
            handle: NativeHandle::new(native, ptr),
            physics: Mutex::new(Some(physics)),
            events: Default::default(),
        }
    }

    pub(crate) fn get(&self) -> Result<NativePtr<T>, BridgeError> {
        self.handle.get()
    }

    pub(crate) fn native(&self) -> &SharedNative {
        self.handle.native()
    }

    pub(crate) fn physics(&self) -> Option<PhysicsId> {
        *self.physics.lock()
    }

    pub(crate) fn is_disposed(&self) -> bool {
        !self.handle.is_live()
    }

    pub(crate) fn events(&self) -> &DisposeEventBroadcaster {
        &self.events
    }

    pub(crate) fn dispose(&self) -> Result<bool, BridgeError> {
        self.handle.release_with(|event| {
            if event == DisposeEvent::Disposed {
                *self.physics.lock() = None;
            }
            self.events.broadcast(event);
        })
    }

    /// Error for a visitor that was never called back.
    pub(crate) fn missing_data(&self) -> BridgeError {
        BridgeError::Native(NativeError::InvalidPointer {
            type_name: T::TYPE_NAME,
            address: self.handle.address().address(),
        })
    }
}

impl<T: NativeObject> Drop for MeshResource<T> {
    fn drop(&mut self) {
        Log::verify_message(
            self.dispose(),
            format!("Failed to dispose {} on drop", T::TYPE_NAME),
        );
    }
}

// Runs `visit` with the native view of a live mesh and returns what the closure produced.
macro_rules! visit_mesh {
    ($resource:expr, $visit:ident, |$view:ident| $body:expr) => {{
        let resource = &$resource;
        let ptr = resource.get()?;
        let mut result = None;
        resource
            .native()
            .$visit(ptr, &mut |$view| result = Some($body))?;
        result.ok_or_else(|| resource.missing_data())
    }};
}

pub(crate) use visit_mesh;

// Lifecycle methods shared by every mesh wrapper.
macro_rules! impl_mesh_lifecycle {
    ($ty:ty, $native:ty) => {
        impl $ty {
            /// Native address of the mesh, or [`BridgeError::InvalidOperation`] once disposed.
            pub fn native(
                &self,
            ) -> Result<$crate::native::NativePtr<$native>, $crate::error::BridgeError> {
                self.resource.get()
            }

            /// Context that cooked or wrapped the mesh; `None` after disposal.
            pub fn physics(&self) -> Option<$crate::physics::PhysicsId> {
                self.resource.physics()
            }

            pub fn is_disposed(&self) -> bool {
                self.resource.is_disposed()
            }

            /// Releases this wrapper's native reference. Returns `Ok(false)` if the mesh was
            /// already disposed, in which case no events are sent.
            pub fn dispose(&self) -> Result<bool, $crate::error::BridgeError> {
                self.resource.dispose()
            }

            /// Adds a synchronous disposal listener.
            pub fn add_dispose_listener<F>(&self, listener: F) -> $crate::event::ListenerId
            where
                F: FnMut($crate::event::DisposeEvent) + Send + 'static,
            {
                self.resource.events().add(listener)
            }

            pub fn add_dispose_sender(
                &self,
                sender: std::sync::mpsc::Sender<$crate::event::DisposeEvent>,
            ) -> $crate::event::ListenerId {
                self.resource.events().add_sender(sender)
            }

            pub fn remove_dispose_listener(&self, id: $crate::event::ListenerId) -> bool {
                self.resource.events().remove(id)
            }
        }

        impl std::fmt::Debug for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($ty))
                    .field("handle", &self.resource.handle)
                    .field("physics", &self.resource.physics())
                    .finish()
            }
        }
    };
}

pub(crate) use impl_mesh_lifecycle;
