use std::sync::Arc;
use std::time::Duration;

use nova_jdi::commands::{class_loader_reference, reference_type, virtual_machine};
use nova_jdi::error::error_code;
use nova_jdi::mock::{MockClass, MockVm, MockVmConfig};
use nova_jdi::{JdiError, RemoteErrorKind, VirtualMachine, VirtualMachineConfig};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn attach(mock: &Arc<MockVm>) -> VirtualMachine {
    VirtualMachine::attach(mock.clone(), VirtualMachineConfig::default())
        .await
        .unwrap()
}

/// `VisibleClasses` reply with a single entry whose type tag is `tag`.
fn one_entry_with_type_tag(tag: u8) -> Vec<u8> {
    let mut payload = 1i32.to_be_bytes().to_vec();
    payload.push(tag);
    payload.extend_from_slice(&0x10u64.to_be_bytes());
    payload
}

#[tokio::test]
async fn unknown_tag_fails_each_request_and_leaks_nothing() {
    init_tracing();
    let mock = Arc::new(MockVm::new());
    mock.add_loader(0x8001, []);
    mock.set_raw_reply(
        class_loader_reference::VISIBLE_CLASSES,
        one_entry_with_type_tag(0x7f),
    );
    let vm = attach(&mock).await;
    let loader = vm.class_loader(0x8001).unwrap();
    let before = vm.outstanding_requests();

    for _ in 0..16 {
        let err = loader.visible_classes().await.unwrap_err();
        assert!(
            matches!(err, JdiError::UnknownTag { tag: 0x7f, .. }),
            "{err:?}"
        );
    }

    assert_eq!(vm.outstanding_requests(), before);
    assert_eq!(mock.calls(class_loader_reference::VISIBLE_CLASSES), 16);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_decode_failures_leave_the_table_empty() {
    let mock = Arc::new(MockVm::with_config(MockVmConfig {
        reply_delay: Duration::from_millis(5),
        ..MockVmConfig::default()
    }));
    mock.set_raw_reply(
        class_loader_reference::VISIBLE_CLASSES,
        one_entry_with_type_tag(0),
    );
    let vm = attach(&mock).await;

    let mut tasks = Vec::new();
    for i in 1..=32u64 {
        let loader = vm.class_loader(i).unwrap();
        tasks.push(tokio::spawn(async move { loader.visible_classes().await }));
    }
    for task in tasks {
        assert!(task.await.unwrap().is_err());
    }

    assert_eq!(vm.outstanding_requests(), 0);
}

#[tokio::test]
async fn truncated_reply_is_a_protocol_error() {
    let mock = Arc::new(MockVm::new());
    let mut payload = one_entry_with_type_tag(1);
    payload.truncate(payload.len() - 3);
    mock.set_raw_reply(class_loader_reference::VISIBLE_CLASSES, payload);
    let vm = attach(&mock).await;

    let err = vm.class_loader(1).unwrap().visible_classes().await.unwrap_err();
    assert!(matches!(err, JdiError::Protocol(_)), "{err:?}");
    assert_eq!(vm.outstanding_requests(), 0);
}

#[tokio::test]
async fn error_code_is_checked_before_the_payload() {
    let mock = Arc::new(MockVm::new());
    // Garbage that would fail to decode if anyone looked at it.
    mock.set_raw_reply(class_loader_reference::VISIBLE_CLASSES, vec![0xff; 3]);
    mock.set_error(class_loader_reference::VISIBLE_CLASSES, error_code::INVALID_OBJECT);
    let vm = attach(&mock).await;

    let err = vm.class_loader(1).unwrap().visible_classes().await.unwrap_err();
    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::InvalidObject));
    assert_eq!(err.error_code(), Some(error_code::INVALID_OBJECT));
    assert_eq!(vm.outstanding_requests(), 0);
}

#[tokio::test]
async fn class_not_prepared_is_only_produced_for_its_code() {
    let mock = Arc::new(MockVm::new());
    mock.add_class(MockClass::class(0x10, "LA;"));
    let vm = attach(&mock).await;
    let ty = vm
        .reference_type(nova_jdi::TypeTag::Class, 0x10)
        .unwrap();

    mock.set_error(reference_type::CLASS_LOADER, error_code::CLASS_NOT_PREPARED);
    let err = ty.class_loader().await.unwrap_err();
    assert!(matches!(err, JdiError::ClassNotPrepared { code: 22 }));

    mock.set_error(reference_type::CLASS_LOADER, error_code::VM_DEAD);
    let err = ty.class_loader().await.unwrap_err();
    assert!(!err.is_class_not_prepared());
    assert_eq!(err.remote_kind(), Some(RemoteErrorKind::VmDead));
}

#[tokio::test]
async fn dispose_wakes_a_hanging_request() {
    let mock = Arc::new(MockVm::new());
    mock.hang_on(class_loader_reference::VISIBLE_CLASSES);
    let vm = attach(&mock).await;
    let loader = vm.class_loader(0x8001).unwrap();

    let pending = tokio::spawn(async move { loader.visible_classes().await });
    while vm.outstanding_requests() == 0 {
        tokio::task::yield_now().await;
    }
    assert_eq!(
        vm.outstanding_commands(),
        vec![class_loader_reference::VISIBLE_CLASSES]
    );

    vm.dispose();
    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, JdiError::VmDisconnected), "{err:?}");
    assert_eq!(vm.outstanding_requests(), 0);
    assert!(vm.is_disposed());
}

#[tokio::test]
async fn requests_after_dispose_fail_without_sending() {
    let mock = Arc::new(MockVm::new());
    let vm = attach(&mock).await;
    vm.dispose();
    vm.dispose();

    let err = vm.all_classes().await.unwrap_err();
    assert!(matches!(err, JdiError::VmDisconnected));
    assert_eq!(mock.calls(virtual_machine::ALL_CLASSES), 0);
}

#[tokio::test]
async fn closed_transport_is_reported_as_an_internal_error() {
    let mock = Arc::new(MockVm::new());
    let vm = attach(&mock).await;
    mock.close();

    let err = vm.all_classes().await.unwrap_err();
    assert!(matches!(err, JdiError::TransportFailure(_)), "{err:?}");
    assert!(err.to_string().starts_with("internal error"));
    assert_eq!(vm.outstanding_requests(), 0);
}
