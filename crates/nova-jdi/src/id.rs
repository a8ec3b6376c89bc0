//! Remote identifiers.
//!
//! JDWP names every remote entity with a fixed-width, big-endian integer whose
//! width is negotiated per connection (`VirtualMachine.IDSizes`). The all-zero
//! value is reserved and means "no entity".

use std::fmt;

use crate::codec::{JdwpReader, JdwpWriter};
use crate::error::{JdiError, Result};

/// Identifier widths (in bytes) reported by `VirtualMachine.IDSizes (1, 7)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSizes {
    pub field_id: usize,
    pub method_id: usize,
    pub object_id: usize,
    pub reference_type_id: usize,
    pub frame_id: usize,
}

impl Default for IdSizes {
    fn default() -> Self {
        Self {
            field_id: 8,
            method_id: 8,
            object_id: 8,
            reference_type_id: 8,
            frame_id: 8,
        }
    }
}

impl IdSizes {
    /// Every identifier `size` bytes wide.
    pub fn uniform(size: usize) -> Self {
        Self {
            field_id: size,
            method_id: size,
            object_id: size,
            reference_type_id: size,
            frame_id: size,
        }
    }

    /// Checks that every width fits a `u64`, i.e. lies in `1..=8`.
    pub fn validate(&self) -> Result<()> {
        for (name, width) in [
            ("fieldID", self.field_id),
            ("methodID", self.method_id),
            ("objectID", self.object_id),
            ("referenceTypeID", self.reference_type_id),
            ("frameID", self.frame_id),
        ] {
            if !(1..=8).contains(&width) {
                return Err(JdiError::Protocol(format!(
                    "unsupported {name} size: {width}"
                )));
            }
        }
        Ok(())
    }

    pub fn width_of(&self, kind: IdKind) -> usize {
        match kind {
            IdKind::Object
            | IdKind::String
            | IdKind::Thread
            | IdKind::ThreadGroup
            | IdKind::ClassLoader
            | IdKind::ClassObject
            | IdKind::Array => self.object_id,
            IdKind::ReferenceType => self.reference_type_id,
            IdKind::Field => self.field_id,
            IdKind::Method => self.method_id,
            IdKind::Frame => self.frame_id,
        }
    }
}

/// The entity family an identifier belongs to.
///
/// Two ids with the same raw value but different kinds never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdKind {
    Object,
    String,
    Thread,
    ThreadGroup,
    ClassLoader,
    ClassObject,
    Array,
    ReferenceType,
    Field,
    Method,
    Frame,
}

impl IdKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IdKind::Object => "objectID",
            IdKind::String => "stringID",
            IdKind::Thread => "threadID",
            IdKind::ThreadGroup => "threadGroupID",
            IdKind::ClassLoader => "classLoaderID",
            IdKind::ClassObject => "classObjectID",
            IdKind::Array => "arrayID",
            IdKind::ReferenceType => "referenceTypeID",
            IdKind::Field => "fieldID",
            IdKind::Method => "methodID",
            IdKind::Frame => "frameID",
        }
    }
}

/// An opaque handle naming one remote entity.
///
/// The id never owns remote memory; the target runtime decides how long the
/// entity lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JdwpId {
    kind: IdKind,
    value: u64,
}

impl JdwpId {
    pub const NULL_VALUE: u64 = 0;

    pub fn new(kind: IdKind, value: u64) -> Self {
        Self { kind, value }
    }

    pub fn null(kind: IdKind) -> Self {
        Self::new(kind, Self::NULL_VALUE)
    }

    pub fn kind(&self) -> IdKind {
        self.kind
    }

    pub fn value(&self) -> u64 {
        self.value
    }

    pub fn is_null(&self) -> bool {
        self.value == Self::NULL_VALUE
    }

    /// Reads an id of `kind` using the width negotiated for that kind.
    pub fn read(kind: IdKind, r: &mut JdwpReader<'_>, sizes: &IdSizes) -> Result<Self> {
        let value = r.read_id(sizes.width_of(kind))?;
        Ok(Self::new(kind, value))
    }

    pub fn write(&self, w: &mut JdwpWriter, sizes: &IdSizes) {
        w.write_id(self.value, sizes.width_of(self.kind));
    }
}

impl fmt::Display for JdwpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:#x}", self.kind.as_str(), self.value)
    }
}
