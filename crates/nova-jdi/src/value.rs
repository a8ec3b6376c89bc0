use std::fmt;
use std::hash::{Hash, Hasher};

use crate::codec::{JdwpReader, JdwpWriter};
use crate::error::{JdiError, Result};
use crate::mirror::{Mirror, Tag};
use crate::reference_type::ReferenceType;
use crate::vm::VirtualMachine;

/// Static type descriptor of a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    Void,
    Boolean,
    Byte,
    Char,
    Short,
    Int,
    Long,
    Float,
    Double,
    Reference(ReferenceType),
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Void => f.write_str("void"),
            Type::Boolean => f.write_str("boolean"),
            Type::Byte => f.write_str("byte"),
            Type::Char => f.write_str("char"),
            Type::Short => f.write_str("short"),
            Type::Int => f.write_str("int"),
            Type::Long => f.write_str("long"),
            Type::Float => f.write_str("float"),
            Type::Double => f.write_str("double"),
            Type::Reference(ty) => write!(f, "{ty}"),
        }
    }
}

/// The value of a call that returned nothing.
///
/// Carries no state: any two `VoidValue`s are equal, even across connections.
#[derive(Clone)]
pub struct VoidValue {
    vm: VirtualMachine,
}

impl VoidValue {
    pub const TAG: Tag = Tag::Void;

    pub fn new(vm: &VirtualMachine) -> Self {
        Self { vm: vm.clone() }
    }

    pub fn tag(&self) -> Tag {
        Self::TAG
    }

    pub fn value_type(&self) -> Type {
        Type::Void
    }

    /// Void has no payload; only the tag written by the enclosing context
    /// identifies it on the wire.
    pub fn write(&self, _w: &mut JdwpWriter) {}
}

impl Mirror for VoidValue {
    fn virtual_machine(&self) -> &VirtualMachine {
        &self.vm
    }

    fn kind_label(&self) -> &'static str {
        "VoidValue"
    }
}

impl PartialEq for VoidValue {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for VoidValue {}

impl Hash for VoidValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        0u8.hash(state);
    }
}

impl fmt::Debug for VoidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(void)")
    }
}

impl fmt::Display for VoidValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(void)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Primitive {
    Boolean(bool),
    Byte(i8),
    /// UTF-16 code unit.
    Char(u16),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
}

impl Primitive {
    pub fn tag(self) -> Tag {
        match self {
            Primitive::Boolean(_) => Tag::Boolean,
            Primitive::Byte(_) => Tag::Byte,
            Primitive::Char(_) => Tag::Char,
            Primitive::Short(_) => Tag::Short,
            Primitive::Int(_) => Tag::Int,
            Primitive::Long(_) => Tag::Long,
            Primitive::Float(_) => Tag::Float,
            Primitive::Double(_) => Tag::Double,
        }
    }
}

/// A primitive value mirrored from (or destined for) the target runtime.
#[derive(Clone)]
pub struct PrimitiveValue {
    vm: VirtualMachine,
    value: Primitive,
}

impl PrimitiveValue {
    pub fn new(vm: &VirtualMachine, value: Primitive) -> Self {
        Self {
            vm: vm.clone(),
            value,
        }
    }

    pub fn read(vm: &VirtualMachine, tag: Tag, r: &mut JdwpReader<'_>) -> Result<Self> {
        let value = match tag {
            Tag::Boolean => Primitive::Boolean(r.read_bool()?),
            Tag::Byte => Primitive::Byte(r.read_u8()? as i8),
            Tag::Char => Primitive::Char(r.read_u16()?),
            Tag::Short => Primitive::Short(r.read_i16()?),
            Tag::Int => Primitive::Int(r.read_i32()?),
            Tag::Long => Primitive::Long(r.read_i64()?),
            Tag::Float => Primitive::Float(r.read_f32()?),
            Tag::Double => Primitive::Double(r.read_f64()?),
            other => {
                return Err(JdiError::Protocol(format!(
                    "tag {:?} does not denote a primitive value",
                    other
                )))
            }
        };
        Ok(Self::new(vm, value))
    }

    pub fn value(&self) -> Primitive {
        self.value
    }

    pub fn tag(&self) -> Tag {
        self.value.tag()
    }

    pub fn value_type(&self) -> Type {
        match self.value {
            Primitive::Boolean(_) => Type::Boolean,
            Primitive::Byte(_) => Type::Byte,
            Primitive::Char(_) => Type::Char,
            Primitive::Short(_) => Type::Short,
            Primitive::Int(_) => Type::Int,
            Primitive::Long(_) => Type::Long,
            Primitive::Float(_) => Type::Float,
            Primitive::Double(_) => Type::Double,
        }
    }

    pub fn write(&self, w: &mut JdwpWriter) {
        match self.value {
            Primitive::Boolean(v) => w.write_bool(v),
            Primitive::Byte(v) => w.write_u8(v as u8),
            Primitive::Char(v) => w.write_u16(v),
            Primitive::Short(v) => w.write_i16(v),
            Primitive::Int(v) => w.write_i32(v),
            Primitive::Long(v) => w.write_i64(v),
            Primitive::Float(v) => w.write_f32(v),
            Primitive::Double(v) => w.write_f64(v),
        }
    }
}

impl Mirror for PrimitiveValue {
    fn virtual_machine(&self) -> &VirtualMachine {
        &self.vm
    }

    fn kind_label(&self) -> &'static str {
        match self.value {
            Primitive::Boolean(_) => "BooleanValue",
            Primitive::Byte(_) => "ByteValue",
            Primitive::Char(_) => "CharValue",
            Primitive::Short(_) => "ShortValue",
            Primitive::Int(_) => "IntegerValue",
            Primitive::Long(_) => "LongValue",
            Primitive::Float(_) => "FloatValue",
            Primitive::Double(_) => "DoubleValue",
        }
    }
}

impl PartialEq for PrimitiveValue {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value && self.vm == other.vm
    }
}

impl fmt::Debug for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for PrimitiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.value {
            Primitive::Boolean(v) => write!(f, "{v}"),
            Primitive::Byte(v) => write!(f, "{v}"),
            Primitive::Char(v) => match char::from_u32(u32::from(v)) {
                Some(c) => write!(f, "'{c}'"),
                None => write!(f, "'\\u{v:04x}'"),
            },
            Primitive::Short(v) => write!(f, "{v}"),
            Primitive::Int(v) => write!(f, "{v}"),
            Primitive::Long(v) => write!(f, "{v}L"),
            Primitive::Float(v) => write!(f, "{v}f"),
            Primitive::Double(v) => write!(f, "{v}"),
        }
    }
}
