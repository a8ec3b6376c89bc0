//! The mirror contract and tag-dispatched value decoding.

use std::fmt;

use crate::class_loader::ClassLoaderReference;
use crate::codec::{JdwpReader, JdwpWriter};
use crate::error::{JdiError, Result};
use crate::object::{
    ArrayReference, ClassObjectReference, ObjectReference, StringReference, ThreadGroupReference,
    ThreadReference,
};
use crate::value::{Primitive, PrimitiveValue, Type, VoidValue};
use crate::vm::VirtualMachine;

/// A local handle onto an entity in the target runtime.
pub trait Mirror {
    fn virtual_machine(&self) -> &VirtualMachine;

    /// Short label naming the concrete kind (`"ClassLoaderReference"`, ...).
    fn kind_label(&self) -> &'static str;
}

/// JDWP value tag: the one-byte discriminator in front of a tagged value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Tag {
    Array = b'[',
    Byte = b'B',
    Char = b'C',
    Object = b'L',
    Float = b'F',
    Double = b'D',
    Int = b'I',
    Long = b'J',
    Short = b'S',
    Void = b'V',
    Boolean = b'Z',
    String = b's',
    Thread = b't',
    ThreadGroup = b'g',
    ClassLoader = b'l',
    ClassObject = b'c',
}

impl Tag {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Tags whose payload is an object id.
    pub fn is_object(self) -> bool {
        matches!(
            self,
            Tag::Array
                | Tag::Object
                | Tag::String
                | Tag::Thread
                | Tag::ThreadGroup
                | Tag::ClassLoader
                | Tag::ClassObject
        )
    }
}

impl TryFrom<u8> for Tag {
    type Error = JdiError;

    fn try_from(tag: u8) -> Result<Self> {
        Ok(match tag {
            b'[' => Tag::Array,
            b'B' => Tag::Byte,
            b'C' => Tag::Char,
            b'L' => Tag::Object,
            b'F' => Tag::Float,
            b'D' => Tag::Double,
            b'I' => Tag::Int,
            b'J' => Tag::Long,
            b'S' => Tag::Short,
            b'V' => Tag::Void,
            b'Z' => Tag::Boolean,
            b's' => Tag::String,
            b't' => Tag::Thread,
            b'g' => Tag::ThreadGroup,
            b'l' => Tag::ClassLoader,
            b'c' => Tag::ClassObject,
            _ => {
                return Err(JdiError::UnknownTag {
                    tag,
                    context: "value",
                })
            }
        })
    }
}

/// A value in the target runtime.
///
/// Java `null` has no mirror: decoding a null object id yields `None`.
#[derive(Clone, PartialEq)]
pub enum Value {
    Void(VoidValue),
    Primitive(PrimitiveValue),
    Object(ObjectReference),
    String(StringReference),
    Thread(ThreadReference),
    ThreadGroup(ThreadGroupReference),
    ClassLoader(ClassLoaderReference),
    ClassObject(ClassObjectReference),
    Array(ArrayReference),
}

impl Value {
    /// Reads a tag byte and dispatches to the decoder registered for it.
    pub fn read_tagged(vm: &VirtualMachine, r: &mut JdwpReader<'_>) -> Result<Option<Value>> {
        let tag = Tag::try_from(r.read_u8()?)?;
        Self::read_untagged(vm, tag, r)
    }

    /// Decodes the payload of a value whose tag is already known.
    pub fn read_untagged(
        vm: &VirtualMachine,
        tag: Tag,
        r: &mut JdwpReader<'_>,
    ) -> Result<Option<Value>> {
        Ok(match tag {
            Tag::Void => Some(Value::Void(VoidValue::new(vm))),
            Tag::Boolean
            | Tag::Byte
            | Tag::Char
            | Tag::Short
            | Tag::Int
            | Tag::Long
            | Tag::Float
            | Tag::Double => Some(Value::Primitive(PrimitiveValue::read(vm, tag, r)?)),
            Tag::Object => ObjectReference::read(vm, r)?.map(Value::Object),
            Tag::String => StringReference::read(vm, r)?.map(Value::String),
            Tag::Thread => ThreadReference::read(vm, r)?.map(Value::Thread),
            Tag::ThreadGroup => ThreadGroupReference::read(vm, r)?.map(Value::ThreadGroup),
            Tag::ClassLoader => ClassLoaderReference::read(vm, r)?.map(Value::ClassLoader),
            Tag::ClassObject => ClassObjectReference::read(vm, r)?.map(Value::ClassObject),
            Tag::Array => ArrayReference::read(vm, r)?.map(Value::Array),
        })
    }

    pub fn tag(&self) -> Tag {
        match self {
            Value::Void(v) => v.tag(),
            Value::Primitive(v) => v.tag(),
            Value::Object(v) => v.tag(),
            Value::String(v) => v.tag(),
            Value::Thread(v) => v.tag(),
            Value::ThreadGroup(v) => v.tag(),
            Value::ClassLoader(v) => v.tag(),
            Value::ClassObject(v) => v.tag(),
            Value::Array(v) => v.tag(),
        }
    }

    /// Writes the payload only; tag-prefixing is the caller's job.
    pub fn write(&self, w: &mut JdwpWriter) {
        match self {
            Value::Void(v) => v.write(w),
            Value::Primitive(v) => v.write(w),
            Value::Object(v) => v.write(w),
            Value::String(v) => v.write(w),
            Value::Thread(v) => v.write(w),
            Value::ThreadGroup(v) => v.write(w),
            Value::ClassLoader(v) => v.write(w),
            Value::ClassObject(v) => v.write(w),
            Value::Array(v) => v.write(w),
        }
    }

    pub fn write_tagged(&self, w: &mut JdwpWriter) {
        w.write_u8(self.tag().as_u8());
        self.write(w);
    }

    pub fn as_object(&self) -> Option<ObjectReference> {
        match self {
            Value::Void(_) | Value::Primitive(_) => None,
            Value::Object(v) => Some(v.clone()),
            Value::String(v) => Some(v.as_object()),
            Value::Thread(v) => Some(v.as_object()),
            Value::ThreadGroup(v) => Some(v.as_object()),
            Value::ClassLoader(v) => Some(v.as_object()),
            Value::ClassObject(v) => Some(v.as_object()),
            Value::Array(v) => Some(v.as_object()),
        }
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Value::Primitive(v) => Some(v.value()),
            _ => None,
        }
    }

    /// The runtime type of this value.
    ///
    /// Void and primitive types are known locally; object values ask the
    /// target runtime.
    pub async fn value_type(&self) -> Result<Type> {
        match self {
            Value::Void(v) => Ok(v.value_type()),
            Value::Primitive(v) => Ok(v.value_type()),
            _ => match self.as_object() {
                Some(object) => Ok(Type::Reference(object.reference_type().await?)),
                None => Err(JdiError::Protocol(format!(
                    "{} has no object identity",
                    self.kind_label()
                ))),
            },
        }
    }
}

impl Mirror for Value {
    fn virtual_machine(&self) -> &VirtualMachine {
        match self {
            Value::Void(v) => v.virtual_machine(),
            Value::Primitive(v) => v.virtual_machine(),
            Value::Object(v) => v.virtual_machine(),
            Value::String(v) => v.virtual_machine(),
            Value::Thread(v) => v.virtual_machine(),
            Value::ThreadGroup(v) => v.virtual_machine(),
            Value::ClassLoader(v) => v.virtual_machine(),
            Value::ClassObject(v) => v.virtual_machine(),
            Value::Array(v) => v.virtual_machine(),
        }
    }

    fn kind_label(&self) -> &'static str {
        match self {
            Value::Void(v) => v.kind_label(),
            Value::Primitive(v) => v.kind_label(),
            Value::Object(v) => v.kind_label(),
            Value::String(v) => v.kind_label(),
            Value::Thread(v) => v.kind_label(),
            Value::ThreadGroup(v) => v.kind_label(),
            Value::ClassLoader(v) => v.kind_label(),
            Value::ClassObject(v) => v.kind_label(),
            Value::Array(v) => v.kind_label(),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Void(v) => fmt::Display::fmt(v, f),
            Value::Primitive(v) => fmt::Display::fmt(v, f),
            Value::Object(v) => fmt::Display::fmt(v, f),
            Value::String(v) => fmt::Display::fmt(v, f),
            Value::Thread(v) => fmt::Display::fmt(v, f),
            Value::ThreadGroup(v) => fmt::Display::fmt(v, f),
            Value::ClassLoader(v) => fmt::Display::fmt(v, f),
            Value::ClassObject(v) => fmt::Display::fmt(v, f),
            Value::Array(v) => fmt::Display::fmt(v, f),
        }
    }
}

impl From<VoidValue> for Value {
    fn from(v: VoidValue) -> Self {
        Value::Void(v)
    }
}

impl From<PrimitiveValue> for Value {
    fn from(v: PrimitiveValue) -> Self {
        Value::Primitive(v)
    }
}

impl From<ClassLoaderReference> for Value {
    fn from(v: ClassLoaderReference) -> Self {
        Value::ClassLoader(v)
    }
}

impl From<ObjectReference> for Value {
    fn from(v: ObjectReference) -> Self {
        Value::Object(v)
    }
}
