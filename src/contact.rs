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

//! Contact points exchanged with the engine's contact-modification callback.
//!
//! During a simulation step the engine hands the bridge a buffer of native contacts for every
//! touching shape pair. The buffer is valid only for the duration of that callback, and every
//! view in this module borrows it, so a contact can be read or changed there but never kept.
//! Conversion to and from the native layout copies the fields one by one, with no reordering
//! and no unit conversion.

use crate::{
    core::algebra::Vector3,
    error::BridgeError,
    native::{
        NativeActor, NativeContact, NativeContactModifyPair, NativeFeatureContact,
        NativeModifiableContact, NativePtr, NativeShape, NativeVec3,
    },
};
use bitflags::bitflags;

bitflags! {
    /// Per-contact modification flags.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ContactFlags: u32 {
        /// The target velocity of the contact was set.
        const HAS_TARGET_VELOCITY = 1;
        /// The maximum impulse of the contact was set.
        const HAS_MAX_IMPULSE = 1 << 1;
        /// Contact patches must be regenerated after modification.
        const REGENERATE_PATCHES = 1 << 2;
        /// Mass ratios of the pair were modified.
        const HAS_MODIFIED_MASS_RATIOS = 1 << 3;
    }
}

/// Contact point with the features (faces) of both shapes it was generated from.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct FeatureContact {
    pub point: Vector3<f32>,
    /// Negative values are penetration depth.
    pub separation: f32,
    pub internal_face_index0: u32,
    pub internal_face_index1: u32,
}

impl FeatureContact {
    pub fn to_native_descriptor(&self) -> NativeFeatureContact {
        NativeFeatureContact {
            contact: NativeContact {
                point: NativeVec3::from(self.point),
                separation: self.separation,
            },
            internal_face_index0: self.internal_face_index0,
            internal_face_index1: self.internal_face_index1,
        }
    }

    pub fn from_native(native: &NativeFeatureContact) -> Self {
        Self {
            point: native.contact.point.into(),
            separation: native.contact.separation,
            internal_face_index0: native.internal_face_index0,
            internal_face_index1: native.internal_face_index1,
        }
    }
}

/// Contact point that a contact-modification callback may change before the solver sees it.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct ModifiableContact {
    pub feature: FeatureContact,
    pub normal: Vector3<f32>,
    pub target_velocity: Vector3<f32>,
    /// Upper bound of the impulse the solver may apply. Zero disables the contact.
    pub max_impulse: f32,
    pub static_friction: f32,
    pub dynamic_friction: f32,
    pub restitution: f32,
    pub material_index0: u16,
    pub material_index1: u16,
    pub flags: ContactFlags,
}

impl ModifiableContact {
    pub fn to_native_descriptor(&self) -> NativeModifiableContact {
        NativeModifiableContact {
            feature: self.feature.to_native_descriptor(),
            normal: NativeVec3::from(self.normal),
            target_velocity: NativeVec3::from(self.target_velocity),
            max_impulse: self.max_impulse,
            static_friction: self.static_friction,
            dynamic_friction: self.dynamic_friction,
            restitution: self.restitution,
            material_index0: self.material_index0,
            material_index1: self.material_index1,
            flags: self.flags.bits(),
        }
    }

    /// Unknown flag bits are kept as they are.
    pub fn from_native(native: &NativeModifiableContact) -> Self {
        Self {
            feature: FeatureContact::from_native(&native.feature),
            normal: native.normal.into(),
            target_velocity: native.target_velocity.into(),
            max_impulse: native.max_impulse,
            static_friction: native.static_friction,
            dynamic_friction: native.dynamic_friction,
            restitution: native.restitution,
            material_index0: native.material_index0,
            material_index1: native.material_index1,
            flags: ContactFlags::from_bits_retain(native.flags),
        }
    }
}

/// Closed set of contact records.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ContactRecord {
    Feature(FeatureContact),
    Modifiable(ModifiableContact),
}

/// Native layout of a [`ContactRecord`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum NativeContactRecord {
    Feature(NativeFeatureContact),
    Modifiable(NativeModifiableContact),
}

impl ContactRecord {
    pub fn to_native_descriptor(&self) -> NativeContactRecord {
        match self {
            ContactRecord::Feature(c) => NativeContactRecord::Feature(c.to_native_descriptor()),
            ContactRecord::Modifiable(c) => {
                NativeContactRecord::Modifiable(c.to_native_descriptor())
            }
        }
    }

    pub fn from_native(native: &NativeContactRecord) -> Self {
        match native {
            NativeContactRecord::Feature(c) => ContactRecord::Feature(FeatureContact::from_native(c)),
            NativeContactRecord::Modifiable(c) => {
                ContactRecord::Modifiable(ModifiableContact::from_native(c))
            }
        }
    }

    pub fn feature(&self) -> &FeatureContact {
        match self {
            ContactRecord::Feature(c) => c,
            ContactRecord::Modifiable(c) => &c.feature,
        }
    }
}

impl From<FeatureContact> for ContactRecord {
    fn from(contact: FeatureContact) -> Self {
        Self::Feature(contact)
    }
}

impl From<ModifiableContact> for ContactRecord {
    fn from(contact: ModifiableContact) -> Self {
        Self::Modifiable(contact)
    }
}

/// Contacts of one shape pair, borrowed from the engine for the duration of a callback.
#[derive(Debug)]
pub struct ContactSet<'a> {
    contacts: &'a mut [NativeModifiableContact],
}

impl<'a> ContactSet<'a> {
    pub fn new(contacts: &'a mut [NativeModifiableContact]) -> Self {
        Self { contacts }
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<ModifiableContact, BridgeError> {
        BridgeError::check_index(index, self.contacts.len())?;
        Ok(ModifiableContact::from_native(&self.contacts[index]))
    }

    /// Writes a contact back into the engine's buffer.
    pub fn set(&mut self, index: usize, contact: &ModifiableContact) -> Result<(), BridgeError> {
        BridgeError::check_index(index, self.contacts.len())?;
        self.contacts[index] = contact.to_native_descriptor();
        Ok(())
    }

    /// Makes the solver ignore a contact by zeroing its maximum impulse.
    pub fn ignore(&mut self, index: usize) -> Result<(), BridgeError> {
        BridgeError::check_index(index, self.contacts.len())?;
        let contact = &mut self.contacts[index];
        contact.max_impulse = 0.0;
        contact.flags |= ContactFlags::HAS_MAX_IMPULSE.bits();
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = ModifiableContact> + '_ {
        self.contacts.iter().map(ModifiableContact::from_native)
    }
}

/// Shape pair in contact, as passed to a [`ContactModifyCallback`].
#[derive(Debug)]
pub struct ContactModifyPair<'a> {
    pub actors: [NativePtr<NativeActor>; 2],
    pub shapes: [NativePtr<NativeShape>; 2],
    pub contacts: ContactSet<'a>,
}

impl<'a> From<NativeContactModifyPair<'a>> for ContactModifyPair<'a> {
    fn from(pair: NativeContactModifyPair<'a>) -> Self {
        Self {
            actors: pair.actors,
            shapes: pair.shapes,
            contacts: ContactSet::new(pair.contacts),
        }
    }
}

/// User code run by the engine on its simulation thread before contacts are solved.
pub trait ContactModifyCallback: Send {
    fn on_contact_modify(&mut self, pairs: &mut [ContactModifyPair<'_>]);
}

impl<F> ContactModifyCallback for F
where
    F: FnMut(&mut [ContactModifyPair<'_>]) + Send,
{
    fn on_contact_modify(&mut self, pairs: &mut [ContactModifyPair<'_>]) {
        self(pairs)
    }
}

/// Entry point for the engine glue: wraps the native pairs and runs the callback over them.
/// Changes are written straight into the native buffers.
pub fn dispatch_contact_modification<'a, C>(
    callback: &mut C,
    pairs: impl IntoIterator<Item = NativeContactModifyPair<'a>>,
) where
    C: ContactModifyCallback + ?Sized,
{
    let mut pairs = pairs
        .into_iter()
        .map(ContactModifyPair::from)
        .collect::<Vec<_>>();
    callback.on_contact_modify(&mut pairs);
}

#[cfg(test)]
mod test {
    use super::*;
    use proptest::prelude::*;

    fn contact() -> ModifiableContact {
        ModifiableContact {
            feature: FeatureContact {
                point: Vector3::new(1.0, -2.5, 3.25),
                separation: -0.01,
                internal_face_index0: 7,
                internal_face_index1: u32::MAX,
            },
            normal: Vector3::new(0.0, 1.0, 0.0),
            target_velocity: Vector3::new(0.5, 0.0, -0.5),
            max_impulse: 1.0e6,
            static_friction: 0.8,
            dynamic_friction: 12.5,
            restitution: 0.0,
            material_index0: 3,
            material_index1: u16::MAX,
            flags: ContactFlags::HAS_TARGET_VELOCITY | ContactFlags::from_bits_retain(1 << 20),
        }
    }

    #[test]
    fn modifiable_contact_round_trip_is_exact() {
        let contact = contact();
        let native = contact.to_native_descriptor();
        assert_eq!(native.normal, NativeVec3::new(0.0, 1.0, 0.0));
        assert_eq!(native.feature.contact.separation, -0.01);
        assert_eq!(native.material_index1, u16::MAX);
        assert_eq!(native.flags, 1 | 1 << 20);
        assert_eq!(ModifiableContact::from_native(&native), contact);

        let record = ContactRecord::from(contact);
        assert_eq!(ContactRecord::from_native(&record.to_native_descriptor()), record);
        assert_eq!(record.feature().internal_face_index0, 7);
    }

    #[test]
    fn feature_contact_round_trip() {
        let feature = contact().feature;
        assert_eq!(
            FeatureContact::from_native(&feature.to_native_descriptor()),
            feature
        );
    }

    #[test]
    fn contact_set_edits_native_buffer() {
        let mut buffer = [contact().to_native_descriptor(); 2];
        {
            let mut set = ContactSet::new(&mut buffer);
            assert_eq!(set.len(), 2);

            let mut first = set.get(0).unwrap();
            first.restitution = 0.5;
            set.set(0, &first).unwrap();
            set.ignore(1).unwrap();

            assert_eq!(
                set.get(2),
                Err(BridgeError::IndexOutOfRange { index: 2, len: 2 })
            );
            assert_eq!(set.iter().count(), 2);
        }
        assert_eq!(buffer[0].restitution, 0.5);
        assert_eq!(buffer[1].max_impulse, 0.0);
        assert!(ContactFlags::from_bits_retain(buffer[1].flags)
            .contains(ContactFlags::HAS_MAX_IMPULSE));
    }

    #[test]
    fn closure_callback_receives_pairs() {
        let mut first = [contact().to_native_descriptor()];
        let mut second = [contact().to_native_descriptor(); 3];
        let actor = NativePtr::new(1).unwrap();
        let shape = NativePtr::new(2).unwrap();
        let pairs = vec![
            NativeContactModifyPair {
                actors: [actor, actor],
                shapes: [shape, shape],
                contacts: &mut first,
            },
            NativeContactModifyPair {
                actors: [actor, actor],
                shapes: [shape, shape],
                contacts: &mut second,
            },
        ];

        let mut seen = 0;
        let mut callback = |pairs: &mut [ContactModifyPair<'_>]| {
            for pair in pairs.iter_mut() {
                seen += pair.contacts.len();
                for i in 0..pair.contacts.len() {
                    pair.contacts.ignore(i).unwrap();
                }
            }
        };
        dispatch_contact_modification(&mut callback, pairs);
        assert_eq!(seen, 4);
        assert!(first
            .iter()
            .chain(second.iter())
            .all(|c| c.max_impulse == 0.0));
    }

    prop_compose! {
        fn vector_strategy()(
            x in -1.0e6f32..1.0e6,
            y in -1.0e6f32..1.0e6,
            z in -1.0e6f32..1.0e6,
        ) -> Vector3<f32> {
            Vector3::new(x, y, z)
        }
    }

    prop_compose! {
        fn contact_strategy()(
            point in vector_strategy(),
            normal in vector_strategy(),
            target_velocity in vector_strategy(),
            separation in -1.0e3f32..1.0e3,
            faces in any::<(u32, u32)>(),
            max_impulse in 0.0f32..1.0e9,
            coefficients in (0.0f32..1.0e3, 0.0f32..1.0e3, 0.0f32..1.0e3),
            materials in any::<(u16, u16)>(),
            flags in any::<u32>(),
        ) -> ModifiableContact {
            ModifiableContact {
                feature: FeatureContact {
                    point,
                    separation,
                    internal_face_index0: faces.0,
                    internal_face_index1: faces.1,
                },
                normal,
                target_velocity,
                max_impulse,
                static_friction: coefficients.0,
                dynamic_friction: coefficients.1,
                restitution: coefficients.2,
                material_index0: materials.0,
                material_index1: materials.1,
                flags: ContactFlags::from_bits_retain(flags),
            }
        }
    }

    proptest! {
        #[test]
        fn any_contact_survives_native_round_trip(contact in contact_strategy()) {
            let native = contact.to_native_descriptor();
            prop_assert_eq!(native.flags, contact.flags.bits());
            prop_assert_eq!(ModifiableContact::from_native(&native), contact);

            let record = ContactRecord::from(contact);
            prop_assert_eq!(ContactRecord::from_native(&record.to_native_descriptor()), record);
        }
    }
}
