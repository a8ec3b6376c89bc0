use std::collections::HashSet;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use nova_jdi::codec::{JdwpReader, JdwpWriter};
use nova_jdi::mock::{MockClass, MockVm};
use nova_jdi::{
    JdiError, Mirror, Primitive, PrimitiveValue, Tag, Type, Value, VirtualMachine,
    VirtualMachineConfig, VoidValue,
};

async fn attach() -> (Arc<MockVm>, VirtualMachine) {
    let mock = Arc::new(MockVm::new());
    let vm = VirtualMachine::attach(mock.clone(), VirtualMachineConfig::default())
        .await
        .unwrap();
    (mock, vm)
}

#[tokio::test]
async fn void_values_are_equal_across_connections() {
    let (_, a) = attach().await;
    let (_, b) = attach().await;
    let void_a = a.mirror_of_void();
    let void_b = VoidValue::new(&b);

    assert_eq!(void_a, void_b);
    assert_ne!(void_a.virtual_machine(), void_b.virtual_machine());

    let set: HashSet<VoidValue> = [void_a.clone(), void_b].into_iter().collect();
    assert_eq!(set.len(), 1);

    assert_eq!(void_a.value_type(), Type::Void);
    assert_eq!(void_a.tag().as_u8(), b'V');
    assert_eq!(void_a.to_string(), "(void)");
}

#[tokio::test]
async fn void_value_writes_no_payload() {
    let (_, vm) = attach().await;
    let value = Value::from(vm.mirror_of_void());

    let mut w = JdwpWriter::new();
    value.write(&mut w);
    assert!(w.is_empty());

    let mut w = JdwpWriter::new();
    value.write_tagged(&mut w);
    assert_eq!(w.into_vec(), vec![b'V']);
}

#[tokio::test]
async fn void_is_not_equal_to_other_kinds() {
    let (_, vm) = attach().await;
    let void = Value::from(vm.mirror_of_void());
    let int = Value::from(PrimitiveValue::new(&vm, Primitive::Int(0)));
    let object = Value::Object(nova_jdi::ObjectReference::from_raw(&vm, 1).unwrap());

    assert_ne!(void, int);
    assert_ne!(void, object);
    assert_eq!(void, Value::from(vm.mirror_of_void()));
}

#[tokio::test]
async fn tagged_values_decode_through_the_dispatch() {
    let (_, vm) = attach().await;
    let mut bytes = Vec::new();
    bytes.push(b'I');
    bytes.extend_from_slice(&42i32.to_be_bytes());
    bytes.push(b'V');
    bytes.push(b's');
    bytes.extend_from_slice(&0x5003u64.to_be_bytes());
    bytes.push(b'L');
    bytes.extend_from_slice(&0u64.to_be_bytes());
    bytes.push(b'Z');
    bytes.push(1);

    let mut r = JdwpReader::new(&bytes);
    let int = Value::read_tagged(&vm, &mut r).unwrap().unwrap();
    assert_eq!(int.as_primitive(), Some(Primitive::Int(42)));
    assert_eq!(int.kind_label(), "IntegerValue");

    let void = Value::read_tagged(&vm, &mut r).unwrap().unwrap();
    assert_eq!(void.tag(), Tag::Void);

    let string = Value::read_tagged(&vm, &mut r).unwrap().unwrap();
    assert_eq!(string.tag(), Tag::String);
    assert_eq!(string.as_object().unwrap().id().value(), 0x5003);

    assert!(Value::read_tagged(&vm, &mut r).unwrap().is_none());

    let boolean = Value::read_tagged(&vm, &mut r).unwrap().unwrap();
    assert_eq!(boolean.as_primitive(), Some(Primitive::Boolean(true)));
    assert_eq!(r.remaining(), 0);
}

const ALL_TAGS: [Tag; 16] = [
    Tag::Array,
    Tag::Byte,
    Tag::Char,
    Tag::Object,
    Tag::Float,
    Tag::Double,
    Tag::Int,
    Tag::Long,
    Tag::Short,
    Tag::Void,
    Tag::Boolean,
    Tag::String,
    Tag::Thread,
    Tag::ThreadGroup,
    Tag::ClassLoader,
    Tag::ClassObject,
];

#[tokio::test]
async fn every_tag_decodes_through_the_dispatch() {
    let (_, vm) = attach().await;

    for tag in ALL_TAGS {
        let mut bytes = vec![tag.as_u8()];
        let expected_label = match tag {
            Tag::Void => "VoidValue",
            Tag::Boolean => {
                bytes.push(1);
                "BooleanValue"
            }
            Tag::Byte => {
                bytes.push(0x80);
                "ByteValue"
            }
            Tag::Char => {
                bytes.extend_from_slice(&0x41u16.to_be_bytes());
                "CharValue"
            }
            Tag::Short => {
                bytes.extend_from_slice(&7i16.to_be_bytes());
                "ShortValue"
            }
            Tag::Int => {
                bytes.extend_from_slice(&7i32.to_be_bytes());
                "IntegerValue"
            }
            Tag::Long => {
                bytes.extend_from_slice(&(-7i64).to_be_bytes());
                "LongValue"
            }
            Tag::Float => {
                bytes.extend_from_slice(&1.5f32.to_be_bytes());
                "FloatValue"
            }
            Tag::Double => {
                bytes.extend_from_slice(&2.5f64.to_be_bytes());
                "DoubleValue"
            }
            Tag::Object => "ObjectReference",
            Tag::String => "StringReference",
            Tag::Thread => "ThreadReference",
            Tag::ThreadGroup => "ThreadGroupReference",
            Tag::ClassLoader => "ClassLoaderReference",
            Tag::ClassObject => "ClassObjectReference",
            Tag::Array => "ArrayReference",
        };
        if tag.is_object() {
            bytes.extend_from_slice(&0x1234u64.to_be_bytes());
        }

        let mut r = JdwpReader::new(&bytes);
        let value = Value::read_tagged(&vm, &mut r)
            .unwrap()
            .unwrap_or_else(|| panic!("{tag:?} decoded to null"));
        assert_eq!(value.tag(), tag);
        assert_eq!(value.kind_label(), expected_label, "{tag:?}");
        assert_eq!(r.remaining(), 0, "{tag:?}");
        assert_eq!(value.as_object().is_some(), tag.is_object(), "{tag:?}");

        let mut w = JdwpWriter::new();
        value.write_tagged(&mut w);
        assert_eq!(w.into_vec(), bytes, "{tag:?}");
    }
}

#[tokio::test]
async fn null_ids_decode_to_no_mirror_for_every_object_tag() {
    let (_, vm) = attach().await;

    for tag in ALL_TAGS.into_iter().filter(|tag| tag.is_object()) {
        let mut bytes = vec![tag.as_u8()];
        bytes.extend_from_slice(&[0u8; 8]);
        let mut r = JdwpReader::new(&bytes);
        assert!(Value::read_tagged(&vm, &mut r).unwrap().is_none(), "{tag:?}");
        assert_eq!(r.remaining(), 0, "{tag:?}");
    }
}

#[tokio::test]
async fn tagged_class_loader_value_is_a_loader_mirror() {
    let (_, vm) = attach().await;
    let mut bytes = vec![b'l'];
    bytes.extend_from_slice(&0x8001u64.to_be_bytes());

    let mut r = JdwpReader::new(&bytes);
    match Value::read_tagged(&vm, &mut r).unwrap() {
        Some(Value::ClassLoader(loader)) => {
            assert_eq!(Some(loader), vm.class_loader(0x8001));
        }
        other => panic!("expected a class loader, got {other:?}"),
    }
}

#[tokio::test]
async fn unknown_value_tag_is_a_protocol_error() {
    let (_, vm) = attach().await;
    let mut r = JdwpReader::new(&[b'X', 0, 0]);
    let err = Value::read_tagged(&vm, &mut r).unwrap_err();
    assert!(
        matches!(
            err,
            JdiError::UnknownTag {
                tag: b'X',
                context: "value"
            }
        ),
        "{err:?}"
    );
}

#[tokio::test]
async fn write_omits_the_tag_and_write_tagged_adds_it() {
    let (_, vm) = attach().await;
    let value = Value::from(PrimitiveValue::new(&vm, Primitive::Short(-2)));

    let mut w = JdwpWriter::new();
    value.write(&mut w);
    assert_eq!(w.into_vec(), vec![0xff, 0xfe]);

    let mut w = JdwpWriter::new();
    value.write_tagged(&mut w);
    let bytes = w.into_vec();
    assert_eq!(bytes, vec![b'S', 0xff, 0xfe]);

    let mut r = JdwpReader::new(&bytes);
    assert_eq!(Value::read_tagged(&vm, &mut r).unwrap(), Some(value));
}

#[tokio::test]
async fn value_types() {
    let (mock, vm) = attach().await;
    mock.add_class(MockClass::class(0x10, "Ljava/lang/String;"));
    mock.add_object(0x5003, 0x10);

    let long = Value::from(PrimitiveValue::new(&vm, Primitive::Long(1)));
    assert_eq!(long.value_type().await.unwrap(), Type::Long);
    assert_eq!(long.to_string(), "1L");

    let string = Value::String(nova_jdi::StringReference::from_raw(&vm, 0x5003).unwrap());
    match string.value_type().await.unwrap() {
        Type::Reference(ty) => {
            assert_eq!(ty.signature().await.unwrap(), "Ljava/lang/String;")
        }
        other => panic!("expected a reference type, got {other}"),
    }
}
