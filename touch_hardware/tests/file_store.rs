use rstest::rstest;
use tempfile::tempdir;
use touch_hardware::{FileStore, HwError, MemoryStore};
use touch_traits::ByteStore;

#[rstest]
fn missing_image_starts_erased_and_flush_creates_it() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("eeprom.bin");

    let mut store = FileStore::open(&path, 64).unwrap();
    assert_eq!(store.read(0), 0xFF);
    assert!(!store.is_dirty());
    store.flush().unwrap();
    assert!(!path.exists(), "clean store must not write");

    store.update(3, 0xC7);
    assert!(store.is_dirty());
    store.flush().unwrap();
    assert!(!store.is_dirty());

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(bytes.len(), 64);
    assert_eq!(bytes[3], 0xC7);
    assert!(!path.with_extension("new").exists());

    let reopened = FileStore::open(&path, 64).unwrap();
    assert_eq!(reopened.read(3), 0xC7);
}

#[rstest]
fn update_with_same_value_stays_clean() {
    let dir = tempdir().unwrap();
    let mut store = FileStore::open(dir.path().join("e.bin"), 8).unwrap();
    store.update(0, 0xFF);
    assert!(!store.is_dirty());
}

#[rstest]
fn size_mismatch_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("eeprom.bin");
    std::fs::write(&path, [0u8; 10]).unwrap();
    let err = FileStore::open(&path, 64).unwrap_err();
    assert!(matches!(
        err,
        HwError::ImageSize {
            expected: 64,
            found: 10,
            ..
        }
    ));
}

#[rstest]
fn zero_capacity_is_rejected() {
    let dir = tempdir().unwrap();
    assert!(matches!(
        FileStore::open(dir.path().join("e.bin"), 0),
        Err(HwError::ZeroCapacity)
    ));
}

#[rstest]
fn memory_store_ignores_out_of_range_access() {
    let mut m = MemoryStore::erased(4);
    m.write(9, 1);
    assert_eq!(m.read(9), 0xFF);
    m.write(2, 7);
    assert_eq!(m.as_bytes(), &[0xFF, 0xFF, 7, 0xFF]);
}
