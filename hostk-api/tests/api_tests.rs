//! API tests

use hostk_api::hypercall::{Hypercall, HypercallError};
use hostk_api::types::{ClockKind, ExitStatus, HostTime};
use hostk_api::{BootHowto, Error};
use mockall::mock;
use mockall::predicate::eq;

mock! {
    pub Host {}

    impl Hypercall for Host {
        fn clock_gettime(&self, kind: ClockKind) -> Result<HostTime, HypercallError>;
        fn clock_sleep(&self, kind: ClockKind, sec: u64, nsec: u32) -> Result<(), HypercallError>;
        fn write_char(&self, c: u8);
        fn terminate(&self, status: ExitStatus);
    }
}

#[test]
fn test_hypercall_is_object_safe() {
    let mut host = MockHost::new();
    host.expect_clock_gettime()
        .with(eq(ClockKind::Monotonic))
        .times(1)
        .returning(|_| Ok(HostTime::new(3, 500)));
    host.expect_terminate()
        .with(eq(ExitStatus::Panic))
        .times(1)
        .return_const(());

    let host: Box<dyn Hypercall> = Box::new(host);
    assert_eq!(host.clock_gettime(ClockKind::Monotonic), Ok(HostTime::new(3, 500)));
    host.terminate(ExitStatus::Panic);
}

#[test]
fn test_hypercall_error_into_error() {
    let err: Error = HypercallError::Unsupported.into();
    assert_eq!(err.to_string(), "Hypercall error: unsupported");
}

#[test]
fn test_boot_flags_roundtrip_bits() {
    let how = BootHowto::from_bits_truncate(0x0002_0108);
    assert!(how.contains(BootHowto::AB_SILENT));
    assert!(how.wants_halt());
    assert!(how.wants_dump());
}
