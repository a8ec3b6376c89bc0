//! Reference type mirrors: classes, interfaces and array types.

use std::fmt;
use std::hash::{Hash, Hasher};

use crate::class_loader::ClassLoaderReference;
use crate::codec::{JdwpReader, JdwpWriter};
use crate::commands;
use crate::error::{JdiError, Result};
use crate::id::{IdKind, JdwpId};
use crate::mirror::Mirror;
use crate::object::ClassObjectReference;
use crate::vm::VirtualMachine;

/// JDWP `TypeTag`: the byte preceding a reference type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TypeTag {
    Class = 1,
    Interface = 2,
    Array = 3,
}

impl TypeTag {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TypeTag {
    type Error = JdiError;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            1 => Ok(TypeTag::Class),
            2 => Ok(TypeTag::Interface),
            3 => Ok(TypeTag::Array),
            _ => Err(JdiError::UnknownTag {
                tag,
                context: "type",
            }),
        }
    }
}

/// `ClassStatus` bit set reported by `ReferenceType.Status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ClassStatus(i32);

impl ClassStatus {
    pub const VERIFIED: i32 = 1;
    pub const PREPARED: i32 = 2;
    pub const INITIALIZED: i32 = 4;
    pub const ERROR: i32 = 8;

    pub fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> i32 {
        self.0
    }

    pub fn is_verified(self) -> bool {
        self.0 & Self::VERIFIED != 0
    }

    pub fn is_prepared(self) -> bool {
        self.0 & Self::PREPARED != 0
    }

    pub fn is_initialized(self) -> bool {
        self.0 & Self::INITIALIZED != 0
    }

    pub fn is_error(self) -> bool {
        self.0 & Self::ERROR != 0
    }
}

/// A class, interface or array type loaded in the target runtime.
///
/// Nothing about the type is cached locally; every query is a round trip.
#[derive(Clone)]
pub struct ReferenceType {
    vm: VirtualMachine,
    tag: TypeTag,
    id: JdwpId,
}

impl ReferenceType {
    /// Wraps a raw reference type id; the null id yields `None`.
    pub fn from_raw(vm: &VirtualMachine, tag: TypeTag, raw: u64) -> Option<Self> {
        let id = JdwpId::new(IdKind::ReferenceType, raw);
        (!id.is_null()).then(|| Self {
            vm: vm.clone(),
            tag,
            id,
        })
    }

    /// Reads a `(typeTag, referenceTypeID)` pair.
    ///
    /// The tag byte is consumed and validated even when the id turns out to
    /// be null.
    pub fn read_with_type_tag(vm: &VirtualMachine, r: &mut JdwpReader<'_>) -> Result<Option<Self>> {
        let tag = TypeTag::try_from(r.read_u8()?)?;
        Self::read(vm, tag, r)
    }

    /// Reads an untagged reference type id of a known kind.
    pub fn read(vm: &VirtualMachine, tag: TypeTag, r: &mut JdwpReader<'_>) -> Result<Option<Self>> {
        let id = JdwpId::read(IdKind::ReferenceType, r, &vm.id_sizes())?;
        vm.verbose("referenceType", id.value());
        Ok(Self::from_raw(vm, tag, id.value()))
    }

    pub fn id(&self) -> JdwpId {
        self.id
    }

    pub fn type_tag(&self) -> TypeTag {
        self.tag
    }

    pub fn write(&self, w: &mut JdwpWriter) {
        self.id.write(w, &self.vm.id_sizes());
    }

    pub fn write_with_type_tag(&self, w: &mut JdwpWriter) {
        w.write_u8(self.tag.as_u8());
        self.write(w);
    }

    fn id_payload(&self) -> Vec<u8> {
        let mut w = JdwpWriter::new();
        self.write(&mut w);
        w.into_vec()
    }

    /// `ReferenceType.Signature (2, 1)`
    pub async fn signature(&self) -> Result<String> {
        self.vm
            .request_with(commands::reference_type::SIGNATURE, self.id_payload(), |r| {
                r.read_string()
            })
            .await
    }

    /// Fully qualified source-level name, e.g. `java.lang.String[]`.
    pub async fn name(&self) -> Result<String> {
        Ok(signature_to_type_name(&self.signature().await?))
    }

    /// `ReferenceType.ClassLoader (2, 2)`
    ///
    /// `None` means the type was defined by the bootstrap loader. Asking an
    /// unprepared type fails with [`JdiError::ClassNotPrepared`].
    pub async fn class_loader(&self) -> Result<Option<ClassLoaderReference>> {
        self.vm
            .request_with(
                commands::reference_type::CLASS_LOADER,
                self.id_payload(),
                |r| ClassLoaderReference::read(&self.vm, r),
            )
            .await
    }

    /// `ReferenceType.Status (2, 9)`
    pub async fn status(&self) -> Result<ClassStatus> {
        self.vm
            .request_with(commands::reference_type::STATUS, self.id_payload(), |r| {
                Ok(ClassStatus::from_bits(r.read_i32()?))
            })
            .await
    }

    /// `ReferenceType.ClassObject (2, 11)`
    pub async fn class_object(&self) -> Result<ClassObjectReference> {
        self.vm
            .request_with(
                commands::reference_type::CLASS_OBJECT,
                self.id_payload(),
                |r| {
                    ClassObjectReference::read(&self.vm, r)?.ok_or_else(|| {
                        JdiError::Protocol(format!("{self} has a null class object"))
                    })
                },
            )
            .await
    }
}

impl Mirror for ReferenceType {
    fn virtual_machine(&self) -> &VirtualMachine {
        &self.vm
    }

    fn kind_label(&self) -> &'static str {
        match self.tag {
            TypeTag::Class => "ClassType",
            TypeTag::Interface => "InterfaceType",
            TypeTag::Array => "ArrayType",
        }
    }
}

impl PartialEq for ReferenceType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.vm == other.vm
    }
}

impl Eq for ReferenceType {}

impl Hash for ReferenceType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.vm.hash(state);
    }
}

impl fmt::Debug for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(id={:#x})", self.kind_label(), self.id.value())
    }
}

/// Converts a binary class name (`java.lang.String`, `int[]`) to a JNI
/// signature. Input that already looks like a signature is returned as is.
pub fn class_name_to_signature(name: &str) -> String {
    if name.starts_with('[') || (name.starts_with('L') && name.ends_with(';')) {
        return name.to_string();
    }

    let mut base = name;
    let mut dims = 0usize;
    while let Some(rest) = base.strip_suffix("[]") {
        dims += 1;
        base = rest;
    }

    let mut out = "[".repeat(dims);
    match base {
        "boolean" => out.push('Z'),
        "byte" => out.push('B'),
        "char" => out.push('C'),
        "short" => out.push('S'),
        "int" => out.push('I'),
        "long" => out.push('J'),
        "float" => out.push('F'),
        "double" => out.push('D'),
        "void" => out.push('V'),
        class => {
            out.push('L');
            out.push_str(&class.replace('.', "/"));
            out.push(';');
        }
    }
    out
}

fn signature_to_type_name(signature: &str) -> String {
    let mut sig = signature;
    let mut dims = 0usize;
    while let Some(rest) = sig.strip_prefix('[') {
        dims += 1;
        sig = rest;
    }

    let mut out = if let Some(class) = sig.strip_prefix('L').and_then(|s| s.strip_suffix(';')) {
        class.replace('/', ".")
    } else {
        match sig.as_bytes().first().copied() {
            Some(b'B') => "byte",
            Some(b'C') => "char",
            Some(b'D') => "double",
            Some(b'F') => "float",
            Some(b'I') => "int",
            Some(b'J') => "long",
            Some(b'S') => "short",
            Some(b'Z') => "boolean",
            Some(b'V') => "void",
            _ => "<unknown>",
        }
        .to_string()
    };

    for _ in 0..dims {
        out.push_str("[]");
    }
    out
}
