//! Debugger-side mirrors of a running JVM, spoken over JDWP.
//!
//! Remote entities (objects, class loaders, reference types, values) are
//! represented by immutable local handles that carry their identifier and the
//! [`VirtualMachine`] connection they belong to. Tagged reply payloads are
//! decoded through a single dispatch point ([`Value::read_tagged`]), every
//! remote call goes through the request driver in [`vm`], and nothing derived
//! from the target runtime is cached: each query is a fresh round trip.
//!
//! Packet framing and the socket live behind the [`Transport`] trait.

mod class_loader;
pub mod codec;
pub mod commands;
mod driver;
pub mod error;
pub mod id;
pub mod mirror;
mod object;
mod poison;
mod reference_type;
pub mod transport;
pub mod value;
pub mod vm;

// The in-process mock runtime is only needed for tests and downstream integration suites.
#[cfg(any(test, feature = "test-support"))]
pub mod mock;

pub use class_loader::ClassLoaderReference;
pub use error::{JdiError, RemoteErrorKind, Result};
pub use id::{IdKind, IdSizes, JdwpId};
pub use mirror::{Mirror, Tag, Value};
pub use object::{
    ArrayReference, ClassObjectReference, ObjectReference, StringReference, ThreadGroupReference,
    ThreadReference,
};
pub use reference_type::{class_name_to_signature, ClassStatus, ReferenceType, TypeTag};
pub use transport::{CommandPacket, ReplyPacket, Transport, TransportError};
pub use value::{Primitive, PrimitiveValue, Type, VoidValue};
pub use vm::{LoadedClass, VirtualMachine, VirtualMachineConfig};
