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

//! Disposal notifications.

use crate::core::parking_lot::Mutex;
use std::sync::mpsc::Sender;

/// Stage of a native-backed object's disposal.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum DisposeEvent {
    /// The object is about to be released. Its native data is still readable.
    Disposing,
    /// The native object was released. Any further access fails.
    Disposed,
}

/// Identifier of a listener added to a [`DisposeEventBroadcaster`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

enum Listener {
    Callback(Box<dyn FnMut(DisposeEvent) + Send>),
    Sender(Sender<DisposeEvent>),
}

impl Listener {
    fn notify(&mut self, event: DisposeEvent) {
        match self {
            Listener::Callback(callback) => callback(event),
            Listener::Sender(sender) => {
                let _ = sender.send(event);
            }
        }
    }
}

#[derive(Default)]
struct Listeners {
    entries: Vec<(ListenerId, Listener)>,
    // Listeners taken out by a running broadcast.
    dispatching: Vec<ListenerId>,
    // Listeners removed while they were taken out.
    removed: Vec<ListenerId>,
    last_id: u64,
}

/// Delivers [`DisposeEvent`]s to subscribers. Callbacks run synchronously on the thread that
/// performs the disposal, in the order they were added.
#[derive(Default)]
pub struct DisposeEventBroadcaster {
    listeners: Mutex<Listeners>,
}

impl DisposeEventBroadcaster {
    /// Creates new empty event broadcaster.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, listener: Listener) -> ListenerId {
        let mut listeners = self.listeners.lock();
        listeners.last_id += 1;
        let id = ListenerId(listeners.last_id);
        listeners.entries.push((id, listener));
        id
    }

    /// Adds a callback that is invoked for every event.
    pub fn add<F>(&self, callback: F) -> ListenerId
    where
        F: FnMut(DisposeEvent) + Send + 'static,
    {
        self.push(Listener::Callback(Box::new(callback)))
    }

    /// Adds an event sender. Send errors (dropped receiver) are ignored.
    pub fn add_sender(&self, sender: Sender<DisposeEvent>) -> ListenerId {
        self.push(Listener::Sender(sender))
    }

    /// Removes a listener. Returns `false` if there was no such listener. May be called from a
    /// listener; a listener removed during a broadcast is not invoked again, even by that
    /// broadcast.
    pub fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let len = listeners.entries.len();
        listeners.entries.retain(|(listener_id, _)| *listener_id != id);
        if listeners.entries.len() != len {
            return true;
        }
        if listeners.dispatching.contains(&id) && !listeners.removed.contains(&id) {
            listeners.removed.push(id);
            return true;
        }
        false
    }

    /// Returns the amount of listeners.
    pub fn len(&self) -> usize {
        let listeners = self.listeners.lock();
        listeners.entries.len() + listeners.dispatching.len() - listeners.removed.len()
    }

    /// Returns `true` if there are no listeners.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sends an event to all subscribers.
    pub fn broadcast(&self, event: DisposeEvent) {
        // Listeners run unlocked, so they are free to add or remove listeners themselves.
        let mut taken = {
            let mut listeners = self.listeners.lock();
            let taken = std::mem::take(&mut listeners.entries);
            listeners.dispatching.extend(taken.iter().map(|(id, _)| *id));
            taken
        };

        for (id, listener) in taken.iter_mut() {
            if self.listeners.lock().removed.contains(id) {
                continue;
            }
            listener.notify(event);
        }

        let mut listeners = self.listeners.lock();
        let listeners = &mut *listeners;
        let is_taken = |id: &ListenerId| taken.iter().any(|(taken_id, _)| taken_id == id);
        listeners.dispatching.retain(|id| !is_taken(id));
        let mut removed = Vec::new();
        listeners.removed.retain(|id| {
            if is_taken(id) {
                removed.push(*id);
                false
            } else {
                true
            }
        });
        taken.retain(|(id, _)| !removed.contains(id));
        taken.append(&mut listeners.entries);
        listeners.entries = taken;
    }

    /// Drops every listener.
    pub fn clear(&self) {
        let mut listeners = self.listeners.lock();
        listeners.entries.clear();
        listeners.removed = listeners.dispatching.clone();
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::{mpsc::channel, Arc};

    #[test]
    fn callbacks_receive_events_in_order() {
        let broadcaster = DisposeEventBroadcaster::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let first = log.clone();
        broadcaster.add(move |e| first.lock().push((1, e)));
        let second = log.clone();
        broadcaster.add(move |e| second.lock().push((2, e)));

        broadcaster.broadcast(DisposeEvent::Disposing);
        broadcaster.broadcast(DisposeEvent::Disposed);

        assert_eq!(
            *log.lock(),
            vec![
                (1, DisposeEvent::Disposing),
                (2, DisposeEvent::Disposing),
                (1, DisposeEvent::Disposed),
                (2, DisposeEvent::Disposed),
            ]
        );
    }

    #[test]
    fn add_and_remove_sender() {
        let broadcaster = DisposeEventBroadcaster::new();
        let (sender, receiver) = channel();

        let id = broadcaster.add_sender(sender);
        broadcaster.broadcast(DisposeEvent::Disposing);
        assert_eq!(receiver.recv(), Ok(DisposeEvent::Disposing));

        assert!(broadcaster.remove(id));
        assert!(!broadcaster.remove(id));
        assert!(broadcaster.is_empty());
        broadcaster.broadcast(DisposeEvent::Disposed);
        assert!(receiver.recv().is_err());
    }

    #[test]
    fn listener_can_remove_itself() {
        let broadcaster = Arc::new(DisposeEventBroadcaster::new());
        let calls = Arc::new(Mutex::new(0));
        let removed = Arc::new(Mutex::new(None));
        let own_id = Arc::new(Mutex::new(None));

        let id = {
            let inner = broadcaster.clone();
            let calls = calls.clone();
            let removed = removed.clone();
            let own_id = own_id.clone();
            broadcaster.add(move |_| {
                *calls.lock() += 1;
                if let Some(id) = *own_id.lock() {
                    *removed.lock() = Some(inner.remove(id));
                }
            })
        };
        *own_id.lock() = Some(id);

        broadcaster.broadcast(DisposeEvent::Disposing);
        assert_eq!(*removed.lock(), Some(true));
        assert!(broadcaster.is_empty());

        broadcaster.broadcast(DisposeEvent::Disposed);
        assert_eq!(*calls.lock(), 1);
        assert!(!broadcaster.remove(id));
    }

    #[test]
    fn listener_removed_mid_broadcast_is_skipped() {
        let broadcaster = Arc::new(DisposeEventBroadcaster::new());
        let (sender, receiver) = channel();
        let later = Arc::new(Mutex::new(None));

        {
            let inner = broadcaster.clone();
            let later = later.clone();
            broadcaster.add(move |_| {
                if let Some(id) = later.lock().take() {
                    assert!(inner.remove(id));
                }
            });
        }
        let kept = broadcaster.add_sender(sender.clone());
        *later.lock() = Some(broadcaster.add_sender(sender));
        assert_eq!(broadcaster.len(), 3);

        broadcaster.broadcast(DisposeEvent::Disposing);
        assert_eq!(receiver.try_iter().count(), 1);
        assert_eq!(broadcaster.len(), 2);

        broadcaster.broadcast(DisposeEvent::Disposed);
        assert_eq!(receiver.try_iter().count(), 1);
        assert!(broadcaster.remove(kept));
    }
}
