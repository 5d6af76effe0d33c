//! Integration tests for keyboard device queries.
//!
//! These tests require a real keyboard to be connected.
//! Run with: cargo test -p keyleds-keyboard --test device_queries -- --ignored --nocapture

use std::time::{Duration, Instant};

use keyleds_keyboard::{BlockId, Keyboard, LedDevice};
use keyleds_transport::list_devices;

/// Open the first HID++ node found.
///
/// Mirrors the daemon's auto-discovery: list_devices → Keyboard::open
fn open_keyboard() -> Keyboard {
    let devices = list_devices().expect("HID enumeration failed");
    let device = devices
        .first()
        .expect("No keyboard found: plug in a supported device");
    Keyboard::open(&device.path).expect("Failed to open keyboard")
}

/// Everything `info` prints must be readable within a few seconds.
#[test]
#[ignore] // requires hardware
fn identity_and_features_resolve() {
    let start = Instant::now();
    let mut kb = open_keyboard();

    assert!(!kb.name().is_empty(), "device name should not be empty");
    assert_eq!(kb.model().len(), 12, "model is 6 bytes of hex");
    assert_eq!(kb.serial().len(), 8, "serial is 4 bytes of hex");
    assert!(kb.protocol_version() >= 2);

    let features = kb.features().expect("feature table failed");
    assert!(features.len() >= 2, "root and feature set are always present");

    assert!(
        start.elapsed() < Duration::from_secs(5),
        "open and feature table took {:?}",
        start.elapsed()
    );

    eprintln!("=== {} ===", kb.path());
    eprintln!("  Name:      {}", kb.name());
    eprintln!("  Type:      {}", kb.device_type().name());
    eprintln!("  Model:     {}", kb.model());
    eprintln!("  Serial:    {}", kb.serial());
    eprintln!("  Firmware:  {}", kb.firmware());
    eprintln!("  Layout:    {:?}", kb.layout());
    for f in &features {
        eprintln!("  Feature:   {:2} {:04x}", f.index, f.id);
    }
}

/// Read back every block and write the same colors again.
///
/// Leaves the keyboard exactly as it was.
#[test]
#[ignore] // requires hardware
fn led_roundtrip_keeps_state() {
    let mut kb = open_keyboard();
    let blocks: Vec<BlockId> = kb.blocks().iter().map(|b| b.id()).collect();
    assert!(!blocks.is_empty(), "keyboard should expose key blocks");

    for id in blocks {
        let before = kb.get_colors(id).expect("get_colors failed");
        if before.is_empty() {
            continue;
        }
        kb.set_colors(id, &before).expect("set_colors failed");
        kb.commit_colors().expect("commit_colors failed");
        let after = kb.get_colors(id).expect("get_colors failed");
        assert_eq!(before, after, "block {id} changed");
    }
}

#[test]
#[ignore] // requires hardware
fn resync_succeeds_on_idle_device() {
    let mut kb = open_keyboard();
    assert!(LedDevice::resync(&mut kb));
}
