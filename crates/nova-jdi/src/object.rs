//! Object reference mirrors.
//!
//! Each object-derived kind is a thin wrapper around a non-null identifier
//! plus the connection it came from. Factories return `None` for the null id,
//! so a mirror never holds a null identifier.

use crate::codec::JdwpWriter;
use crate::commands;
use crate::error::{JdiError, Result};
use crate::id::{IdKind, JdwpId};
use crate::mirror::Tag;
use crate::reference_type::ReferenceType;

macro_rules! object_mirror {
    (
        $(#[$meta:meta])*
        $name:ident, tag: $tag:expr, id_kind: $id_kind:expr, label: $label:literal
    ) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            vm: $crate::vm::VirtualMachine,
            id: $crate::id::JdwpId,
        }

        impl $name {
            pub const TAG: $crate::mirror::Tag = $tag;

            fn from_id(
                vm: &$crate::vm::VirtualMachine,
                id: $crate::id::JdwpId,
            ) -> Option<Self> {
                if id.is_null() {
                    None
                } else {
                    Some(Self { vm: vm.clone(), id })
                }
            }

            /// Wraps a raw id; the null id yields `None`.
            pub fn from_raw(vm: &$crate::vm::VirtualMachine, raw: u64) -> Option<Self> {
                Self::from_id(vm, $crate::id::JdwpId::new($id_kind, raw))
            }

            /// Reads an untagged identifier; the null id yields `None`.
            pub fn read(
                vm: &$crate::vm::VirtualMachine,
                r: &mut $crate::codec::JdwpReader<'_>,
            ) -> $crate::error::Result<Option<Self>> {
                let id = $crate::id::JdwpId::read($id_kind, r, &vm.id_sizes())?;
                vm.verbose($label, id.value());
                Ok(Self::from_id(vm, id))
            }

            pub fn id(&self) -> $crate::id::JdwpId {
                self.id
            }

            pub fn tag(&self) -> $crate::mirror::Tag {
                Self::TAG
            }

            /// Writes the identifier without a tag.
            pub fn write(&self, w: &mut $crate::codec::JdwpWriter) {
                self.id.write(w, &self.vm.id_sizes());
            }

            /// The same remote entity viewed as a plain object reference.
            pub fn as_object(&self) -> $crate::object::ObjectReference {
                $crate::object::ObjectReference::from_existing(&self.vm, self.id.value())
            }
        }

        impl $crate::mirror::Mirror for $name {
            fn virtual_machine(&self) -> &$crate::vm::VirtualMachine {
                &self.vm
            }

            fn kind_label(&self) -> &'static str {
                stringify!($name)
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.id == other.id && self.vm == other.vm
            }
        }

        impl Eq for $name {}

        impl std::hash::Hash for $name {
            fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
                std::hash::Hash::hash(&self.id, state);
                std::hash::Hash::hash(&self.vm, state);
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}(id={:#x})", stringify!($name), self.id.value())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}(id={:#x})", stringify!($name), self.id.value())
            }
        }
    };
}

pub(crate) use object_mirror;

object_mirror! {
    /// Any object in the target runtime.
    ObjectReference, tag: Tag::Object, id_kind: IdKind::Object, label: "objectReference"
}

object_mirror! {
    /// A `java.lang.String` instance.
    StringReference, tag: Tag::String, id_kind: IdKind::String, label: "stringReference"
}

object_mirror! {
    ThreadReference, tag: Tag::Thread, id_kind: IdKind::Thread, label: "threadReference"
}

object_mirror! {
    ThreadGroupReference,
    tag: Tag::ThreadGroup,
    id_kind: IdKind::ThreadGroup,
    label: "threadGroupReference"
}

object_mirror! {
    /// The `java.lang.Class` object of a reference type.
    ClassObjectReference,
    tag: Tag::ClassObject,
    id_kind: IdKind::ClassObject,
    label: "classObjectReference"
}

object_mirror! {
    ArrayReference, tag: Tag::Array, id_kind: IdKind::Array, label: "arrayReference"
}

impl ObjectReference {
    /// Object view of an id already known to be non-null.
    pub(crate) fn from_existing(vm: &crate::vm::VirtualMachine, raw: u64) -> Self {
        Self {
            vm: vm.clone(),
            id: JdwpId::new(IdKind::Object, raw),
        }
    }

    fn id_payload(&self) -> Vec<u8> {
        let mut w = JdwpWriter::new();
        self.write(&mut w);
        w.into_vec()
    }

    /// `ObjectReference.ReferenceType (9, 1)`
    pub async fn reference_type(&self) -> Result<ReferenceType> {
        self.vm
            .request_with(
                commands::object_reference::REFERENCE_TYPE,
                self.id_payload(),
                |r| {
                    ReferenceType::read_with_type_tag(&self.vm, r)?.ok_or_else(|| {
                        JdiError::Protocol(format!("{self} reported a null reference type"))
                    })
                },
            )
            .await
    }

    /// `ObjectReference.DisableCollection (9, 7)`
    pub async fn disable_collection(&self) -> Result<()> {
        self.vm
            .request(commands::object_reference::DISABLE_COLLECTION, self.id_payload())
            .await
    }

    /// `ObjectReference.EnableCollection (9, 8)`
    pub async fn enable_collection(&self) -> Result<()> {
        self.vm
            .request(commands::object_reference::ENABLE_COLLECTION, self.id_payload())
            .await
    }

    /// `ObjectReference.IsCollected (9, 9)`
    pub async fn is_collected(&self) -> Result<bool> {
        self.vm
            .request_with(commands::object_reference::IS_COLLECTED, self.id_payload(), |r| {
                r.read_bool()
            })
            .await
    }
}

impl StringReference {
    /// `StringReference.Value (10, 1)`
    pub async fn value(&self) -> Result<String> {
        let mut w = JdwpWriter::new();
        self.write(&mut w);
        self.vm
            .request_with(commands::string_reference::VALUE, w.into_vec(), |r| {
                r.read_string()
            })
            .await
    }
}

impl ThreadReference {
    /// `ThreadReference.Name (11, 1)`
    pub async fn name(&self) -> Result<String> {
        let mut w = JdwpWriter::new();
        self.write(&mut w);
        self.vm
            .request_with(commands::thread_reference::NAME, w.into_vec(), |r| {
                r.read_string()
            })
            .await
    }
}

impl ThreadGroupReference {
    /// `ThreadGroupReference.Name (12, 1)`
    pub async fn name(&self) -> Result<String> {
        let mut w = JdwpWriter::new();
        self.write(&mut w);
        self.vm
            .request_with(commands::thread_group_reference::NAME, w.into_vec(), |r| {
                r.read_string()
            })
            .await
    }
}

impl ClassObjectReference {
    /// `ClassObjectReference.ReflectedType (17, 1)`
    pub async fn reflected_type(&self) -> Result<ReferenceType> {
        let mut w = JdwpWriter::new();
        self.write(&mut w);
        self.vm
            .request_with(
                commands::class_object_reference::REFLECTED_TYPE,
                w.into_vec(),
                |r| {
                    ReferenceType::read_with_type_tag(&self.vm, r)?.ok_or_else(|| {
                        JdiError::Protocol(format!("{self} reflects a null reference type"))
                    })
                },
            )
            .await
    }
}

impl ArrayReference {
    /// `ArrayReference.Length (13, 1)`
    pub async fn length(&self) -> Result<usize> {
        let mut w = JdwpWriter::new();
        self.write(&mut w);
        self.vm
            .request_with(commands::array_reference::LENGTH, w.into_vec(), |r| {
                r.read_count()
            })
            .await
    }
}
