//! An in-process target runtime used by unit and integration tests.
//!
//! [`MockVm`] implements [`Transport`] directly, so tests exercise the full
//! request path (correlation ids, error codes, decoding) without a socket or
//! a JDK. The object model is deliberately small: classes, loaders, strings,
//! threads, thread groups, arrays and plain objects, each keyed by raw id.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::codec::{JdwpReader, JdwpWriter};
use crate::commands::Command;
use crate::error::{error_code, JdiError};
use crate::id::IdSizes;
use crate::poison::lock;
use crate::reference_type::{ClassStatus, TypeTag};
use crate::transport::{CommandPacket, ReplyPacket, Transport, TransportError};

/// Class object ids are derived from the reflected type id.
const CLASS_OBJECT_BASE: u64 = 0x4000_0000;

#[derive(Debug, Clone)]
pub struct MockVmConfig {
    /// Widths reported by `VirtualMachine.IDSizes` and used for every id the
    /// mock reads or writes.
    pub id_sizes: IdSizes,
    /// Delay applied before every reply.
    pub reply_delay: Duration,
}

impl Default for MockVmConfig {
    fn default() -> Self {
        Self {
            id_sizes: IdSizes::default(),
            reply_delay: Duration::ZERO,
        }
    }
}

/// A reference type known to the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct MockClass {
    pub id: u64,
    pub tag: TypeTag,
    pub signature: String,
    /// Defining loader; `None` is the bootstrap loader.
    pub loader: Option<u64>,
    pub status: ClassStatus,
}

impl MockClass {
    fn new(id: u64, tag: TypeTag, signature: &str) -> Self {
        Self {
            id,
            tag,
            signature: signature.to_string(),
            loader: None,
            status: ClassStatus::from_bits(
                ClassStatus::VERIFIED | ClassStatus::PREPARED | ClassStatus::INITIALIZED,
            ),
        }
    }

    pub fn class(id: u64, signature: &str) -> Self {
        Self::new(id, TypeTag::Class, signature)
    }

    pub fn interface(id: u64, signature: &str) -> Self {
        Self::new(id, TypeTag::Interface, signature)
    }

    pub fn array(id: u64, signature: &str) -> Self {
        Self::new(id, TypeTag::Array, signature)
    }

    pub fn loader(mut self, loader: u64) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Loaded but not prepared: `ReferenceType.ClassLoader` answers
    /// `CLASS_NOT_PREPARED`.
    pub fn unprepared(mut self) -> Self {
        self.status = ClassStatus::from_bits(ClassStatus::VERIFIED);
        self
    }

    pub fn status(mut self, status: ClassStatus) -> Self {
        self.status = status;
        self
    }
}

#[derive(Default)]
struct State {
    classes: BTreeMap<u64, MockClass>,
    loaders: HashMap<u64, Vec<u64>>,
    strings: HashMap<u64, String>,
    threads: HashMap<u64, String>,
    thread_groups: HashMap<u64, String>,
    arrays: HashMap<u64, (u64, usize)>,
    objects: HashMap<u64, u64>,
    pinned: HashSet<u64>,
    collected: HashSet<u64>,
}

impl State {
    fn is_live(&self, id: u64) -> bool {
        self.objects.contains_key(&id)
            || self.strings.contains_key(&id)
            || self.threads.contains_key(&id)
            || self.thread_groups.contains_key(&id)
            || self.arrays.contains_key(&id)
            || self.loaders.contains_key(&id)
            || self.reflected_class(id).is_some()
    }

    fn reflected_class(&self, class_object: u64) -> Option<&MockClass> {
        class_object
            .checked_sub(CLASS_OBJECT_BASE)
            .and_then(|id| self.classes.get(&id))
    }

    fn class_of(&self, object: u64) -> Option<&MockClass> {
        let class_id = self
            .objects
            .get(&object)
            .or_else(|| self.arrays.get(&object).map(|(class_id, _)| class_id))?;
        self.classes.get(class_id)
    }
}

#[derive(Default)]
struct Overrides {
    errors: HashMap<(u8, u8), u16>,
    raw_replies: HashMap<(u8, u8), Vec<u8>>,
    hangs: HashSet<(u8, u8)>,
}

/// In-process mock target runtime.
pub struct MockVm {
    config: MockVmConfig,
    state: Mutex<State>,
    overrides: Mutex<Overrides>,
    calls: Mutex<HashMap<(u8, u8), usize>>,
    sent: Mutex<Vec<(u8, u8)>>,
    closed: AtomicBool,
}

impl Default for MockVm {
    fn default() -> Self {
        Self::with_config(MockVmConfig::default())
    }
}

impl MockVm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id_sizes(id_sizes: IdSizes) -> Self {
        Self::with_config(MockVmConfig {
            id_sizes,
            ..MockVmConfig::default()
        })
    }

    pub fn with_config(config: MockVmConfig) -> Self {
        Self {
            config,
            state: Mutex::new(State::default()),
            overrides: Mutex::new(Overrides::default()),
            calls: Mutex::new(HashMap::new()),
            sent: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
        }
    }

    pub fn id_sizes(&self) -> IdSizes {
        self.config.id_sizes
    }

    pub fn add_class(&self, class: MockClass) {
        lock(&self.state, "MockVm.add_class")
            .classes
            .insert(class.id, class);
    }

    /// Registers (or replaces) a loader and the type ids it reports as
    /// visible, in reply order. Zero ids are reported verbatim.
    pub fn add_loader(&self, id: u64, visible: impl IntoIterator<Item = u64>) {
        lock(&self.state, "MockVm.add_loader")
            .loaders
            .insert(id, visible.into_iter().collect());
    }

    pub fn add_string(&self, id: u64, value: &str) {
        lock(&self.state, "MockVm.add_string")
            .strings
            .insert(id, value.to_string());
    }

    pub fn add_thread(&self, id: u64, name: &str) {
        lock(&self.state, "MockVm.add_thread")
            .threads
            .insert(id, name.to_string());
    }

    pub fn add_thread_group(&self, id: u64, name: &str) {
        lock(&self.state, "MockVm.add_thread_group")
            .thread_groups
            .insert(id, name.to_string());
    }

    pub fn add_array(&self, id: u64, class_id: u64, length: usize) {
        lock(&self.state, "MockVm.add_array")
            .arrays
            .insert(id, (class_id, length));
    }

    pub fn add_object(&self, id: u64, class_id: u64) {
        lock(&self.state, "MockVm.add_object")
            .objects
            .insert(id, class_id);
    }

    /// Simulates garbage collection of `id`: later queries answer
    /// `INVALID_OBJECT` and `IsCollected` answers `true`.
    pub fn collect(&self, id: u64) {
        let mut state = lock(&self.state, "MockVm.collect");
        if state.pinned.contains(&id) {
            return;
        }
        state.objects.remove(&id);
        state.strings.remove(&id);
        state.threads.remove(&id);
        state.thread_groups.remove(&id);
        state.arrays.remove(&id);
        state.collected.insert(id);
    }

    pub fn is_pinned(&self, id: u64) -> bool {
        lock(&self.state, "MockVm.is_pinned").pinned.contains(&id)
    }

    /// Every future `command` is answered with `code` and an empty payload.
    pub fn set_error(&self, command: Command, code: u16) {
        lock(&self.overrides, "MockVm.set_error")
            .errors
            .insert((command.set, command.command), code);
    }

    /// Every future `command` is answered successfully with `data`.
    pub fn set_raw_reply(&self, command: Command, data: Vec<u8>) {
        lock(&self.overrides, "MockVm.set_raw_reply")
            .raw_replies
            .insert((command.set, command.command), data);
    }

    /// Every future `command` is accepted but never answered.
    pub fn hang_on(&self, command: Command) {
        lock(&self.overrides, "MockVm.hang_on")
            .hangs
            .insert((command.set, command.command));
    }

    /// Later sends fail as if the socket had been closed.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self, command: Command) -> usize {
        lock(&self.calls, "MockVm.calls")
            .get(&(command.set, command.command))
            .copied()
            .unwrap_or(0)
    }

    /// `(command set, command)` of every packet received, in arrival order.
    pub fn sent_commands(&self) -> Vec<(u8, u8)> {
        lock(&self.sent, "MockVm.sent_commands").clone()
    }

    fn handle(&self, packet: &CommandPacket) -> Result<Vec<u8>, u16> {
        let key = (packet.command_set, packet.command);
        {
            let overrides = lock(&self.overrides, "MockVm.handle");
            if let Some(code) = overrides.errors.get(&key) {
                return Err(*code);
            }
            if let Some(data) = overrides.raw_replies.get(&key) {
                return Ok(data.clone());
            }
        }

        let sizes = &self.config.id_sizes;
        let mut r = JdwpReader::new(&packet.data);
        let mut w = JdwpWriter::new();
        let mut state = lock(&self.state, "MockVm.handle");

        match key {
            // VirtualMachine.ClassesBySignature
            (1, 2) => {
                let signature = r.read_string().map_err(malformed)?;
                let matches: Vec<_> = state
                    .classes
                    .values()
                    .filter(|class| class.signature == signature)
                    .collect();
                w.write_u32(matches.len() as u32);
                for class in matches {
                    w.write_u8(class.tag.as_u8());
                    w.write_id(class.id, sizes.reference_type_id);
                    w.write_i32(class.status.bits());
                }
            }
            // VirtualMachine.AllClasses
            (1, 3) => {
                w.write_u32(state.classes.len() as u32);
                for class in state.classes.values() {
                    w.write_u8(class.tag.as_u8());
                    w.write_id(class.id, sizes.reference_type_id);
                    w.write_string(&class.signature);
                    w.write_i32(class.status.bits());
                }
            }
            // VirtualMachine.IDSizes
            (1, 7) => {
                w.write_u32(sizes.field_id as u32);
                w.write_u32(sizes.method_id as u32);
                w.write_u32(sizes.object_id as u32);
                w.write_u32(sizes.reference_type_id as u32);
                w.write_u32(sizes.frame_id as u32);
            }
            // ReferenceType.Signature
            (2, 1) => {
                let class = read_class(&state, &mut r, sizes)?;
                w.write_string(&class.signature);
            }
            // ReferenceType.ClassLoader
            (2, 2) => {
                let class = read_class(&state, &mut r, sizes)?;
                if !class.status.is_prepared() {
                    return Err(error_code::CLASS_NOT_PREPARED);
                }
                w.write_id(class.loader.unwrap_or(0), sizes.object_id);
            }
            // ReferenceType.Status
            (2, 9) => {
                let class = read_class(&state, &mut r, sizes)?;
                w.write_i32(class.status.bits());
            }
            // ReferenceType.ClassObject
            (2, 11) => {
                let class = read_class(&state, &mut r, sizes)?;
                w.write_id(CLASS_OBJECT_BASE + class.id, sizes.object_id);
            }
            // ObjectReference.ReferenceType
            (9, 1) => {
                let object = r.read_id(sizes.object_id).map_err(malformed)?;
                let class = state.class_of(object).ok_or(error_code::INVALID_OBJECT)?;
                w.write_u8(class.tag.as_u8());
                w.write_id(class.id, sizes.reference_type_id);
            }
            // ObjectReference.DisableCollection / EnableCollection
            (9, 7) | (9, 8) => {
                let object = r.read_id(sizes.object_id).map_err(malformed)?;
                if !state.is_live(object) {
                    return Err(error_code::INVALID_OBJECT);
                }
                if key.1 == 7 {
                    state.pinned.insert(object);
                } else {
                    state.pinned.remove(&object);
                }
            }
            // ObjectReference.IsCollected
            (9, 9) => {
                let object = r.read_id(sizes.object_id).map_err(malformed)?;
                if state.collected.contains(&object) {
                    w.write_bool(true);
                } else if state.is_live(object) {
                    w.write_bool(false);
                } else {
                    return Err(error_code::INVALID_OBJECT);
                }
            }
            // StringReference.Value
            (10, 1) => {
                let object = r.read_id(sizes.object_id).map_err(malformed)?;
                let value = state.strings.get(&object).ok_or(error_code::INVALID_OBJECT)?;
                w.write_string(value);
            }
            // ThreadReference.Name
            (11, 1) => {
                let thread = r.read_id(sizes.object_id).map_err(malformed)?;
                let name = state.threads.get(&thread).ok_or(error_code::INVALID_THREAD)?;
                w.write_string(name);
            }
            // ThreadGroupReference.Name
            (12, 1) => {
                let group = r.read_id(sizes.object_id).map_err(malformed)?;
                let name = state
                    .thread_groups
                    .get(&group)
                    .ok_or(error_code::INVALID_THREAD_GROUP)?;
                w.write_string(name);
            }
            // ArrayReference.Length
            (13, 1) => {
                let array = r.read_id(sizes.object_id).map_err(malformed)?;
                let (_, length) = state.arrays.get(&array).ok_or(error_code::INVALID_ARRAY)?;
                w.write_i32(*length as i32);
            }
            // ClassLoaderReference.VisibleClasses
            (14, 1) => {
                let loader = r.read_id(sizes.object_id).map_err(malformed)?;
                let visible = state
                    .loaders
                    .get(&loader)
                    .ok_or(error_code::INVALID_CLASS_LOADER)?;
                w.write_u32(visible.len() as u32);
                for id in visible {
                    let tag = state
                        .classes
                        .get(id)
                        .map_or(TypeTag::Class, |class| class.tag);
                    w.write_u8(tag.as_u8());
                    w.write_id(*id, sizes.reference_type_id);
                }
            }
            // ClassObjectReference.ReflectedType
            (17, 1) => {
                let object = r.read_id(sizes.object_id).map_err(malformed)?;
                let class = state
                    .reflected_class(object)
                    .ok_or(error_code::INVALID_OBJECT)?;
                w.write_u8(class.tag.as_u8());
                w.write_id(class.id, sizes.reference_type_id);
            }
            _ => return Err(error_code::NOT_IMPLEMENTED),
        }

        Ok(w.into_vec())
    }
}

fn read_class<'s>(
    state: &'s State,
    r: &mut JdwpReader<'_>,
    sizes: &IdSizes,
) -> Result<&'s MockClass, u16> {
    let id = r.read_id(sizes.reference_type_id).map_err(malformed)?;
    state.classes.get(&id).ok_or(error_code::INVALID_CLASS)
}

fn malformed(err: JdiError) -> u16 {
    tracing::debug!(target: "nova.jdi", error = %err, "mock VM received a malformed command");
    error_code::ILLEGAL_ARGUMENT
}

#[async_trait]
impl Transport for MockVm {
    async fn send_command(&self, packet: CommandPacket) -> Result<ReplyPacket, TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::ConnectionClosed);
        }

        let key = (packet.command_set, packet.command);
        *lock(&self.calls, "MockVm.send_command").entry(key).or_default() += 1;
        lock(&self.sent, "MockVm.send_command").push(key);

        let hang = lock(&self.overrides, "MockVm.send_command")
            .hangs
            .contains(&key);
        if hang {
            std::future::pending::<()>().await;
        }

        if !self.config.reply_delay.is_zero() {
            tokio::time::sleep(self.config.reply_delay).await;
        }

        Ok(match self.handle(&packet) {
            Ok(data) => ReplyPacket::ok(packet.id, data),
            Err(code) => ReplyPacket::error(packet.id, code),
        })
    }
}
