use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, OnceLock};

use tokio_util::sync::CancellationToken;

use crate::class_loader::ClassLoaderReference;
use crate::codec::{JdwpReader, JdwpWriter};
use crate::commands::{self, Command};
use crate::driver::PendingRequests;
use crate::error::{JdiError, Result};
use crate::id::IdSizes;
use crate::reference_type::{class_name_to_signature, ClassStatus, ReferenceType, TypeTag};
use crate::transport::{CommandPacket, Transport, TransportError};
use crate::value::VoidValue;

#[derive(Debug, Clone)]
pub struct VirtualMachineConfig {
    /// Identifier widths to use instead of querying `VirtualMachine.IDSizes`.
    pub id_sizes: Option<IdSizes>,
    /// Emit a `nova.jdi.verbose` trace event for every decoded identifier.
    pub verbose: bool,
    pub pending_capacity: usize,
}

impl Default for VirtualMachineConfig {
    fn default() -> Self {
        Self {
            id_sizes: None,
            verbose: false,
            pending_capacity: 256,
        }
    }
}

struct Inner {
    transport: Arc<dyn Transport>,
    pending: Arc<PendingRequests>,
    id_sizes: OnceLock<IdSizes>,
    disposed: CancellationToken,
    config: VirtualMachineConfig,
}

/// One attached target runtime.
///
/// Cloning is cheap and yields a handle to the same connection. Every mirror
/// keeps a handle; mirrors from different connections never compare equal.
#[derive(Clone)]
pub struct VirtualMachine {
    inner: Arc<Inner>,
}

/// Entry from `VirtualMachine.AllClasses`.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedClass {
    pub reference_type: ReferenceType,
    pub signature: String,
    pub status: ClassStatus,
}

impl VirtualMachine {
    /// Creates the connection handle, negotiating id sizes unless configured.
    ///
    /// Configured and negotiated widths alike must lie in `1..=8`.
    pub async fn attach(
        transport: Arc<dyn Transport>,
        config: VirtualMachineConfig,
    ) -> Result<Self> {
        let id_sizes = OnceLock::new();
        if let Some(sizes) = config.id_sizes {
            sizes.validate()?;
            let _ = id_sizes.set(sizes);
        }
        let vm = Self {
            inner: Arc::new(Inner {
                transport,
                pending: Arc::new(PendingRequests::new(config.pending_capacity)),
                id_sizes,
                disposed: CancellationToken::new(),
                config,
            }),
        };

        if vm.inner.id_sizes.get().is_none() {
            let sizes = vm.query_id_sizes().await?;
            let _ = vm.inner.id_sizes.set(sizes);
        }
        tracing::debug!(target: "nova.jdi", id_sizes = ?vm.id_sizes(), "attached to target VM");
        Ok(vm)
    }

    /// Tears the connection down; every mirror created under it becomes unusable.
    pub fn dispose(&self) {
        if !self.inner.disposed.is_cancelled() {
            tracing::debug!(target: "nova.jdi", "disposing target VM connection");
        }
        self.inner.disposed.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.is_cancelled()
    }

    /// Identifier widths of this connection. Defaults apply only while the
    /// `IDSizes` query itself is in flight.
    pub fn id_sizes(&self) -> IdSizes {
        self.inner.id_sizes.get().copied().unwrap_or_default()
    }

    pub fn is_verbose(&self) -> bool {
        self.inner.config.verbose
    }

    /// Number of requests currently registered and not yet closed out.
    pub fn outstanding_requests(&self) -> usize {
        self.inner.pending.len()
    }

    /// Commands of the outstanding requests, oldest correlation id first.
    pub fn outstanding_commands(&self) -> Vec<Command> {
        self.inner
            .pending
            .snapshot()
            .into_iter()
            .map(|(_, req)| req.command)
            .collect()
    }

    /// Issues a command whose reply carries no data of interest.
    pub async fn request(&self, command: Command, data: Vec<u8>) -> Result<()> {
        self.request_with(command, data, |_| Ok(())).await
    }

    /// Issues `command`, waits for its reply and decodes it with `decode`.
    ///
    /// A nonzero reply error code is mapped to [`JdiError`] before the payload
    /// is looked at. The request stays registered until decoding finishes and
    /// is unregistered on every exit path.
    pub async fn request_with<T>(
        &self,
        command: Command,
        data: Vec<u8>,
        decode: impl FnOnce(&mut JdwpReader<'_>) -> Result<T>,
    ) -> Result<T> {
        if self.is_disposed() {
            return Err(JdiError::VmDisconnected);
        }

        let guard = self.inner.pending.register(command);
        let id = guard.id();
        let packet = CommandPacket {
            id,
            command_set: command.set,
            command: command.command,
            data,
        };
        tracing::debug!(
            target: "nova.jdi",
            id = packet.id,
            command = command.name,
            "sending command"
        );

        let reply = tokio::select! {
            _ = self.inner.disposed.cancelled() => return Err(JdiError::VmDisconnected),
            res = self.inner.transport.send_command(packet) => res,
        }
        .and_then(|reply| {
            if reply.id == id {
                Ok(reply)
            } else {
                Err(TransportError::MismatchedReply {
                    expected: id,
                    actual: reply.id,
                })
            }
        })
        .map_err(|err| {
            tracing::debug!(
                target: "nova.jdi",
                command = command.name,
                error = %err,
                "transport failure"
            );
            JdiError::from(err)
        })?;

        if reply.error_code != 0 {
            tracing::debug!(
                target: "nova.jdi",
                command = command.name,
                error_code = reply.error_code,
                "command failed"
            );
            return Err(JdiError::from_reply_code(reply.error_code));
        }

        let mut r = JdwpReader::new(&reply.data);
        let value = decode(&mut r).map_err(|err| {
            tracing::debug!(
                target: "nova.jdi",
                command = command.name,
                error = %err,
                "failed to decode reply"
            );
            err
        })?;
        drop(guard);
        Ok(value)
    }

    pub(crate) fn verbose(&self, label: &'static str, value: u64) {
        if self.inner.config.verbose {
            tracing::trace!(target: "nova.jdi.verbose", label, value);
        }
    }

    async fn query_id_sizes(&self) -> Result<IdSizes> {
        self.request_with(commands::virtual_machine::ID_SIZES, Vec::new(), |r| {
            let sizes = IdSizes {
                field_id: read_width(r)?,
                method_id: read_width(r)?,
                object_id: read_width(r)?,
                reference_type_id: read_width(r)?,
                frame_id: read_width(r)?,
            };
            sizes.validate()?;
            Ok(sizes)
        })
        .await
    }

    /// `VirtualMachine.AllClasses (1, 3)`
    pub async fn all_classes(&self) -> Result<Vec<LoadedClass>> {
        self.request_with(commands::virtual_machine::ALL_CLASSES, Vec::new(), |r| {
            let count = r.read_count()?;
            let mut classes = Vec::with_capacity(count.min(r.remaining()));
            for _ in 0..count {
                let Some(reference_type) = ReferenceType::read_with_type_tag(self, r)? else {
                    let _signature = r.read_string()?;
                    let _status = r.read_i32()?;
                    continue;
                };
                classes.push(LoadedClass {
                    reference_type,
                    signature: r.read_string()?,
                    status: ClassStatus::from_bits(r.read_i32()?),
                });
            }
            Ok(classes)
        })
        .await
    }

    /// `VirtualMachine.ClassesBySignature (1, 2)`
    ///
    /// `signature` is a JNI signature such as `Ljava/lang/String;`.
    pub async fn classes_by_signature(&self, signature: &str) -> Result<Vec<ReferenceType>> {
        let mut w = JdwpWriter::new();
        w.write_string(signature);
        self.request_with(
            commands::virtual_machine::CLASSES_BY_SIGNATURE,
            w.into_vec(),
            |r| {
                let count = r.read_count()?;
                let mut types = Vec::with_capacity(count.min(r.remaining()));
                for _ in 0..count {
                    let ty = ReferenceType::read_with_type_tag(self, r)?;
                    let _status = r.read_i32()?;
                    types.extend(ty);
                }
                Ok(types)
            },
        )
        .await
    }

    /// Like [`classes_by_signature`](Self::classes_by_signature) but also
    /// accepts binary names (`java.lang.String`, `int[]`).
    pub async fn classes_by_name(&self, name: &str) -> Result<Vec<ReferenceType>> {
        self.classes_by_signature(&class_name_to_signature(name)).await
    }

    pub fn mirror_of_void(&self) -> VoidValue {
        VoidValue::new(self)
    }

    /// Builds a class loader mirror for a raw id obtained out of band.
    ///
    /// Returns `None` for the null id (the bootstrap loader).
    pub fn class_loader(&self, raw_id: u64) -> Option<ClassLoaderReference> {
        ClassLoaderReference::from_raw(self, raw_id)
    }

    pub fn reference_type(&self, tag: TypeTag, raw_id: u64) -> Option<ReferenceType> {
        ReferenceType::from_raw(self, tag, raw_id)
    }
}

fn read_width(r: &mut JdwpReader<'_>) -> Result<usize> {
    let width = r.read_i32()?;
    usize::try_from(width).map_err(|_| JdiError::Protocol(format!("negative id size: {width}")))
}

impl PartialEq for VirtualMachine {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for VirtualMachine {}

impl Hash for VirtualMachine {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.inner) as *const () as usize).hash(state);
    }
}

impl fmt::Debug for VirtualMachine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualMachine")
            .field("id", &(Arc::as_ptr(&self.inner) as *const ()))
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;

    use super::*;
    use crate::transport::ReplyPacket;

    /// Answers every command with a reply for some other packet.
    struct Misrouted;

    #[async_trait]
    impl Transport for Misrouted {
        async fn send_command(&self, packet: CommandPacket) -> Result<ReplyPacket, TransportError> {
            Ok(ReplyPacket::ok(packet.id.wrapping_add(1), Vec::new()))
        }
    }

    #[tokio::test]
    async fn mismatched_reply_id_is_a_transport_failure() {
        let vm = VirtualMachine::attach(
            Arc::new(Misrouted),
            VirtualMachineConfig {
                id_sizes: Some(IdSizes::default()),
                ..VirtualMachineConfig::default()
            },
        )
        .await
        .unwrap();

        let err = vm.all_classes().await.unwrap_err();
        assert!(matches!(err, JdiError::TransportFailure(_)), "{err:?}");
        assert_eq!(vm.outstanding_requests(), 0);
    }

    #[test]
    fn negative_width_is_rejected() {
        let bytes = (-4i32).to_be_bytes();
        let mut r = JdwpReader::new(&bytes);
        assert!(matches!(read_width(&mut r), Err(JdiError::Protocol(_))));
    }

    #[tokio::test]
    async fn configured_widths_outside_one_to_eight_fail_attach() {
        for width in [0, 9, 12] {
            let err = VirtualMachine::attach(
                Arc::new(Misrouted),
                VirtualMachineConfig {
                    id_sizes: Some(IdSizes::uniform(width)),
                    ..VirtualMachineConfig::default()
                },
            )
            .await
            .unwrap_err();
            assert!(matches!(err, JdiError::Protocol(_)), "width {width}: {err:?}");
        }
    }
}
