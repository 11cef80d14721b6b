//! Bootflow iterator: ordering, end of medium, faults and the per-medium cap

mod common;

use bootstd::bootflow::BootflowState;
use bootstd::config::BootstdConfig;
use bootstd::error::{BootError, Discovery};
use bootstd::iter::{read_candidate, ScanFlags, ScanOptions, MAX_BOOTFLOWS_PER_MEDIUM};
use bootstd::medium::BlockMedium;
use bootstd::method::MethodRegistry;
use bootstd::Bootstd;
use bootstd_core::disk::PartitionKind;
use common::{gpt_disk, MemoryBlockDevice, SeqMedium, StubMethod};

fn context(methods: Vec<StubMethod>) -> Bootstd {
    let mut registry = MethodRegistry::new();
    for m in methods {
        registry.register(Box::new(m)).expect("register");
    }
    Bootstd::with_methods(BootstdConfig::default(), registry)
}

fn names(std: &mut Bootstd, opts: ScanOptions) -> Vec<String> {
    std.scan(opts)
        .map(|item| match item {
            Ok(b) => b.name,
            Err(e) => format!("error: {}", e.kind.name()),
        })
        .collect()
}

#[test]
fn test_n_candidates_then_one_end_of_medium() {
    let mut std = context(vec![StubMethod::always_ok("stub")]);
    let eth = std.add_medium("eth0", SeqMedium::boxed(Some(3)), None).unwrap();

    for seq in 0..3 {
        let (bflow, found) = read_candidate(&mut std, 0, Some(eth), seq);
        assert_eq!(found, Discovery::Found);
        assert_eq!(bflow.state(), BootflowState::Ready);
    }
    let (_, found) = read_candidate(&mut std, 0, Some(eth), 3);
    assert_eq!(found, Discovery::EndOfMedium);

    let found: Vec<_> = std.scan(ScanOptions::default()).collect();
    assert_eq!(found.len(), 3);
    assert!(found.iter().all(|item| item.is_ok()));
}

#[test]
fn test_methods_outer_media_inner() {
    let mut std = context(vec![
        StubMethod::always_ok("first"),
        StubMethod::always_ok("second"),
    ]);
    std.add_medium("eth0", SeqMedium::boxed(Some(1)), None).unwrap();
    std.add_medium("eth1", SeqMedium::boxed(Some(2)), None).unwrap();

    let order: Vec<(usize, Option<usize>, u32)> = std
        .scan(ScanOptions::default())
        .map(|item| item.map(|b| (b.method, b.medium, b.part)).unwrap())
        .collect();
    assert_eq!(
        order,
        [
            (0, Some(0), 0),
            (0, Some(1), 0),
            (0, Some(1), 1),
            (1, Some(0), 0),
            (1, Some(1), 0),
            (1, Some(1), 1),
        ]
    );
}

#[test]
fn test_rescan_is_identical() {
    let mut std = context(vec![StubMethod {
        name: "odd",
        outcome: |seq| {
            if seq % 2 == 0 {
                Ok(())
            } else {
                Err(bootstd::BootError::NotFound)
            }
        },
        boot_error: None,
    }]);
    std.add_medium("eth0", SeqMedium::boxed(Some(5)), None).unwrap();
    std.add_medium("eth1", SeqMedium::boxed(Some(2)), None).unwrap();

    let opts = ScanOptions::new(ScanFlags::ALL);
    let first = names(&mut std, opts);
    let second = names(&mut std, opts);
    assert_eq!(first, second);
    assert_eq!(
        first,
        ["eth0", "error: nofile", "eth0", "error: nofile", "eth0", "eth1", "error: nofile"]
    );
}

#[test]
fn test_failed_candidate_keeps_progress() {
    let mut std = context(vec![StubMethod::always("bad", BootError::Invalid)]);
    let eth = std.add_medium("eth0", SeqMedium::boxed(Some(1)), None).unwrap();

    let (bflow, found) = read_candidate(&mut std, 0, Some(eth), 0);
    assert_eq!(found, Discovery::Fault(BootError::Invalid));
    assert_eq!(bflow.state(), BootflowState::File);
    assert_eq!(bflow.err(), Some(BootError::Invalid));
    assert!(!bflow.is_valid());

    // Hidden by default, reported with ALL
    assert_eq!(std.scan(ScanOptions::default()).count(), 0);
    let all: Vec<_> = std.scan(ScanOptions::new(ScanFlags::ALL)).collect();
    assert_eq!(all.len(), 1);
    let err = all[0].as_ref().unwrap_err();
    assert_eq!(err.kind, BootError::Invalid);
    assert_eq!(
        err.bootflow.as_ref().map(|b| b.state()),
        Some(BootflowState::File)
    );
}

#[test]
fn test_cap_reports_exhaustion_and_moves_on() {
    let mut std = context(vec![StubMethod::always("broken", BootError::IoFault)]);
    std.add_medium("loop0", SeqMedium::boxed(None), None).unwrap();
    std.add_medium("loop1", SeqMedium::boxed(Some(1)), None).unwrap();

    let items: Vec<_> = std.scan(ScanOptions::new(ScanFlags::ALL)).collect();
    // Every sequence number on loop0 fails, then the cap, then loop1's single fault
    assert_eq!(items.len(), MAX_BOOTFLOWS_PER_MEDIUM as usize + 2);

    let cap = items[MAX_BOOTFLOWS_PER_MEDIUM as usize].as_ref().unwrap_err();
    assert_eq!(cap.kind, BootError::ResourceExhausted);
    assert_eq!(cap.medium.as_deref(), Some("loop0"));
    assert!(cap.bootflow.is_none());

    let last = items.last().unwrap().as_ref().unwrap_err();
    assert_eq!(last.medium.as_deref(), Some("loop1"));
    assert_eq!(last.kind, BootError::IoFault);
}

#[test]
fn test_fixed_and_filters() {
    let mut std = context(vec![
        StubMethod::always_ok("first"),
        StubMethod::always_ok("second"),
    ]);
    std.add_medium("usb0", Box::new(SeqMedium { limit: Some(1), removable: true }), None)
        .unwrap();
    std.add_medium("eth0", SeqMedium::boxed(Some(1)), None).unwrap();

    assert_eq!(names(&mut std, ScanOptions::new(ScanFlags::FIXED)), ["eth0", "eth0"]);

    let opts = ScanOptions {
        flags: ScanFlags::empty(),
        medium: Some(0),
        method: Some(1),
    };
    let only: Vec<_> = std.scan(opts).map(|b| b.unwrap()).collect();
    assert_eq!(only.len(), 1);
    assert_eq!((only[0].method, only[0].medium), (1, Some(0)));
}

#[test]
fn test_unreadable_medium_reported_with_all() {
    let mut std = context(vec![StubMethod::always_ok("stub")]);
    // Too short to hold a GPT header
    let bad = std
        .add_medium("mmc0", Box::new(BlockMedium::new(MemoryBlockDevice::zeroed(1))), None)
        .unwrap();
    std.add_medium("eth0", SeqMedium::boxed(Some(1)), None).unwrap();

    assert_eq!(names(&mut std, ScanOptions::default()), ["eth0"]);

    let items: Vec<_> = std.scan(ScanOptions::new(ScanFlags::ALL)).collect();
    assert_eq!(items.len(), 2);
    let err = items[0].as_ref().unwrap_err();
    assert_eq!(err.kind, BootError::IoFault);
    assert_eq!(err.medium.as_deref(), Some("mmc0"));
    assert_eq!(err.method, "stub");
    assert!(err.bootflow.is_none());
    assert_eq!(items[1].as_ref().map(|b| b.name.as_str()).ok(), Some("eth0"));
    assert_eq!(std.media.get(bad).and_then(|m| m.last_error()), Some(BootError::IoFault));
}

#[test]
fn test_corrupt_partition_table_is_invalid() {
    let mut std = context(vec![StubMethod::always_ok("stub")]);
    let mut dev = gpt_disk(&[(PartitionKind::EfiSystem, None)]);
    // Flip a bit in entry 0's starting LBA
    dev.data[2 * 512 + 32] ^= 0x01;
    std.add_medium("mmc0", Box::new(BlockMedium::new(dev)), None).unwrap();

    let items: Vec<_> = std.scan(ScanOptions::new(ScanFlags::ALL)).collect();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].as_ref().unwrap_err().kind, BootError::Invalid);
}
