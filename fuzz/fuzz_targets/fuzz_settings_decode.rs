#![no_main]
use libfuzzer_sys::arbitrary::{self, Arbitrary};
use libfuzzer_sys::fuzz_target;
use touch_core::mocks::RamStore;
use touch_core::persist::{inspect, read_settings};
use touch_traits::ByteStore;

#[derive(Debug, Arbitrary)]
struct Input {
    image: Vec<u8>,
    offset: u8,
    sensors: u8,
}

fuzz_target!(|input: Input| {
    let mut store = RamStore::erased(input.image.len());
    for (addr, b) in input.image.iter().enumerate() {
        store.write(addr, *b);
    }
    let offset = usize::from(input.offset);
    let sensors = usize::from(input.sensors % 40);

    // Decoding never panics, and a record that reads back must pass inspection.
    if let Ok(Some(settings)) = read_settings(&store, offset, sensors) {
        assert_eq!(settings.thresholds.len(), sensors);
        let info = inspect(&store, offset).unwrap().unwrap();
        assert!(info.crc_ok());
    }
    let _ = inspect(&store, offset);
});
