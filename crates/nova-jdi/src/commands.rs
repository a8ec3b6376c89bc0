//! JDWP command sets and commands issued by the mirror layer.

/// A `(command set, command)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Command {
    pub set: u8,
    pub command: u8,
    pub name: &'static str,
}

impl Command {
    const fn new(set: u8, command: u8, name: &'static str) -> Self {
        Self { set, command, name }
    }
}

pub mod virtual_machine {
    use super::Command;

    pub const CLASSES_BY_SIGNATURE: Command =
        Command::new(1, 2, "VirtualMachine.ClassesBySignature");
    pub const ALL_CLASSES: Command = Command::new(1, 3, "VirtualMachine.AllClasses");
    pub const ID_SIZES: Command = Command::new(1, 7, "VirtualMachine.IDSizes");
}

pub mod reference_type {
    use super::Command;

    pub const SIGNATURE: Command = Command::new(2, 1, "ReferenceType.Signature");
    pub const CLASS_LOADER: Command = Command::new(2, 2, "ReferenceType.ClassLoader");
    pub const STATUS: Command = Command::new(2, 9, "ReferenceType.Status");
    pub const CLASS_OBJECT: Command = Command::new(2, 11, "ReferenceType.ClassObject");
}

pub mod object_reference {
    use super::Command;

    pub const REFERENCE_TYPE: Command = Command::new(9, 1, "ObjectReference.ReferenceType");
    pub const DISABLE_COLLECTION: Command = Command::new(9, 7, "ObjectReference.DisableCollection");
    pub const ENABLE_COLLECTION: Command = Command::new(9, 8, "ObjectReference.EnableCollection");
    pub const IS_COLLECTED: Command = Command::new(9, 9, "ObjectReference.IsCollected");
}

pub mod string_reference {
    use super::Command;

    pub const VALUE: Command = Command::new(10, 1, "StringReference.Value");
}

pub mod thread_reference {
    use super::Command;

    pub const NAME: Command = Command::new(11, 1, "ThreadReference.Name");
}

pub mod thread_group_reference {
    use super::Command;

    pub const NAME: Command = Command::new(12, 1, "ThreadGroupReference.Name");
}

pub mod array_reference {
    use super::Command;

    pub const LENGTH: Command = Command::new(13, 1, "ArrayReference.Length");
}

pub mod class_loader_reference {
    use super::Command;

    pub const VISIBLE_CLASSES: Command = Command::new(14, 1, "ClassLoaderReference.VisibleClasses");
}

pub mod class_object_reference {
    use super::Command;

    pub const REFLECTED_TYPE: Command = Command::new(17, 1, "ClassObjectReference.ReflectedType");
}
