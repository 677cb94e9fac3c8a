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

//! Release-once ownership of native objects.

use crate::{
    core::log::Log,
    error::BridgeError,
    event::DisposeEvent,
    native::{NativeObject, NativePtr, SharedNative},
};
use std::{
    fmt::{Debug, Formatter},
    sync::atomic::{AtomicU8, Ordering},
};

const LIVE: u8 = 0;
const RELEASING: u8 = 1;
const RELEASED: u8 = 2;

/// Owns one native object and guarantees it is released exactly once.
///
/// Release happens either explicitly, through [`Self::release`] / [`Self::release_with`], or
/// implicitly when the handle is dropped. A single atomic state decides which path performs the
/// native call: the first transition out of the live state wins and every other attempt is a
/// no-op. The drop path never panics; a failure reported by the engine at that point is written
/// to the log.
pub struct NativeHandle<T: NativeObject> {
    ptr: NativePtr<T>,
    native: SharedNative,
    state: AtomicU8,
}

impl<T: NativeObject> Debug for NativeHandle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NativeHandle")
            .field("ptr", &self.ptr)
            .field("live", &self.is_live())
            .finish()
    }
}

impl<T: NativeObject> NativeHandle<T> {
    /// Takes ownership of a native object. The caller must not release `ptr` by other means.
    pub fn new(native: SharedNative, ptr: NativePtr<T>) -> Self {
        Self {
            ptr,
            native,
            state: AtomicU8::new(LIVE),
        }
    }

    /// Returns `true` until the native object is released. Disposal listeners that run before
    /// the native call still observe a live handle.
    pub fn is_live(&self) -> bool {
        self.state.load(Ordering::Acquire) != RELEASED
    }

    /// Returns the native address, or [`BridgeError::InvalidOperation`] once released.
    pub fn get(&self) -> Result<NativePtr<T>, BridgeError> {
        if self.is_live() {
            Ok(self.ptr)
        } else {
            Err(BridgeError::released(T::TYPE_NAME))
        }
    }

    /// Native address regardless of the state, for diagnostics only.
    pub fn address(&self) -> NativePtr<T> {
        self.ptr
    }

    /// Native engine the object lives in.
    pub fn native(&self) -> &SharedNative {
        &self.native
    }

    /// Releases the native object. Returns `Ok(true)` if this call performed the release and
    /// `Ok(false)` if the handle was already released.
    pub fn release(&self) -> Result<bool, BridgeError> {
        self.release_with(|_| ())
    }

    /// Same as [`Self::release`], but calls `notify` with [`DisposeEvent::Disposing`] right before
    /// the native call and with [`DisposeEvent::Disposed`] right after it. `notify` is called
    /// only by the invocation that performs the release.
    pub fn release_with<F>(&self, mut notify: F) -> Result<bool, BridgeError>
    where
        F: FnMut(DisposeEvent),
    {
        if self
            .state
            .compare_exchange(LIVE, RELEASING, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(false);
        }

        notify(DisposeEvent::Disposing);
        let result = T::release(&*self.native, self.ptr);
        self.state.store(RELEASED, Ordering::Release);
        notify(DisposeEvent::Disposed);

        result.map(|_| true).map_err(BridgeError::from)
    }
}

impl<T: NativeObject> Drop for NativeHandle<T> {
    fn drop(&mut self) {
        Log::verify_message(
            self.release(),
            format!("Failed to release native {} on drop", self.ptr),
        );
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::native::{
        rapier::RapierPhysics, NativeActorKind, NativeActor, NativePhysics, NativeTransform,
    };
    use proptest::prelude::*;
    use std::sync::Arc;

    fn actor_handle() -> (Arc<RapierPhysics>, NativeHandle<NativeActor>) {
        let physics = Arc::new(RapierPhysics::new());
        let ptr = physics
            .create_actor(NativeActorKind::Static, &NativeTransform::IDENTITY)
            .unwrap();
        let native: SharedNative = physics.clone();
        (physics, NativeHandle::new(native, ptr))
    }

    #[test]
    fn release_is_idempotent() {
        let (physics, handle) = actor_handle();
        assert!(handle.is_live());
        assert_eq!(handle.release(), Ok(true));
        for _ in 0..5 {
            assert_eq!(handle.release(), Ok(false));
        }
        assert!(!handle.is_live());
        assert!(matches!(handle.get(), Err(BridgeError::InvalidOperation(_))));

        drop(handle);
        assert_eq!(physics.statistics().actors.released, 1);
    }

    #[test]
    fn drop_releases_once() {
        let (physics, handle) = actor_handle();
        drop(handle);
        assert_eq!(physics.statistics().actors.released, 1);
        assert_eq!(physics.live_objects().actors, 0);
    }

    #[test]
    fn notifications_surround_release() {
        let (physics, handle) = actor_handle();
        let mut events = Vec::new();
        handle
            .release_with(|e| events.push((e, physics.live_objects().actors)))
            .unwrap();
        assert_eq!(
            events,
            vec![(DisposeEvent::Disposing, 1), (DisposeEvent::Disposed, 0)]
        );

        let mut called = false;
        assert_eq!(handle.release_with(|_| called = true), Ok(false));
        assert!(!called);
    }

    #[test]
    fn native_failure_is_surfaced_on_explicit_release() {
        let (physics, handle) = actor_handle();
        physics.release_actor(handle.address()).unwrap();
        assert!(matches!(handle.release(), Err(BridgeError::Native(_))));
        assert!(!handle.is_live());
    }

    proptest! {
        #[test]
        fn repeated_release_reaches_engine_once(calls in 1usize..32) {
            let (physics, handle) = actor_handle();
            let mut notifications = 0;
            let mut released = 0;
            for _ in 0..calls {
                if handle.release_with(|_| notifications += 1) == Ok(true) {
                    released += 1;
                }
            }
            prop_assert_eq!(released, 1);
            prop_assert_eq!(notifications, 2);
            prop_assert!(!handle.is_live());

            drop(handle);
            prop_assert_eq!(physics.statistics().actors.released, 1);
        }
    }
}
