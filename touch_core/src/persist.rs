//! Checksummed settings record in a byte store.
//!
//! Layout, all multi-byte fields big-endian:
//!
//! ```text
//! [key 0xC7][descriptor][config][thresholds: sensors x 4 x f32][crc16]
//! ```
//!
//! - descriptor: format version in bits 7..5, `sensors - 1` in bits 4..0
//! - config: bit 7 is the slew-limiter flag
//! - crc16: polynomial 0x1021, initial value 0, MSB first, covering every
//!   byte before it
//!
//! Reads verify the checksum in a first pass before any value is decoded, so a
//! corrupt record never replaces settings in memory.

use touch_traits::ByteStore;

use crate::error::TouchError;
use crate::sensor::Thresholds;

pub const KEY: u8 = 0xC7;
/// Value of an erased store cell.
pub const ERASED: u8 = 0xFF;
pub const FORMAT_VERSION: u8 = 0;
pub const MAX_SENSORS: usize = 32;
/// Key, descriptor, config and checksum bytes.
pub const OVERHEAD: usize = 5;
const BYTES_PER_SENSOR: usize = 16;
const CRC_POLY: u16 = 0x1021;

/// Total record length for `sensors` sensors.
pub const fn record_len(sensors: usize) -> usize {
    OVERHEAD + sensors * BYTES_PER_SENSOR
}

/// Feed one byte into a CRC-16/XMODEM style checksum.
pub fn crc16_update(mut crc: u16, byte: u8) -> u16 {
    for i in (0..8).rev() {
        let mut bit = crc & 0x8000 != 0;
        if byte & (1 << i) != 0 {
            bit = !bit;
        }
        crc <<= 1;
        if bit {
            crc ^= CRC_POLY;
        }
    }
    crc
}

pub fn crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0, |crc, &b| crc16_update(crc, b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Descriptor(u8);

impl Descriptor {
    const VERSION_SHIFT: u8 = 5;
    const VERSION_MASK: u8 = 0x07;
    const COUNT_MASK: u8 = 0x1F;

    pub fn new(version: u8, sensors: usize) -> Result<Self, TouchError> {
        let field = sensors
            .checked_sub(1)
            .and_then(|n| u8::try_from(n).ok())
            .filter(|n| n & Self::COUNT_MASK == *n)
            .ok_or(TouchError::CountOutOfRange(sensors))?;
        Ok(Self(
            ((version & Self::VERSION_MASK) << Self::VERSION_SHIFT) | field,
        ))
    }

    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    pub const fn byte(self) -> u8 {
        self.0
    }

    pub const fn version(self) -> u8 {
        (self.0 >> Self::VERSION_SHIFT) & Self::VERSION_MASK
    }

    pub const fn sensor_count(self) -> usize {
        (self.0 & Self::COUNT_MASK) as usize + 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConfigFlags(u8);

impl ConfigFlags {
    const SLEW_LIMITER: u8 = 0x80;

    pub const fn new(slew_limiter: bool) -> Self {
        Self(if slew_limiter { Self::SLEW_LIMITER } else { 0 })
    }

    pub const fn from_byte(byte: u8) -> Self {
        Self(byte)
    }

    pub const fn byte(self) -> u8 {
        self.0
    }

    pub const fn slew_limiter(self) -> bool {
        self.0 & Self::SLEW_LIMITER != 0
    }
}

/// The persisted subset of the array's configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub slew_limiter: bool,
    pub thresholds: Vec<Thresholds>,
}

/// Header and checksum status of a record, decoded without knowing the
/// configured sensor count.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordInfo {
    pub version: u8,
    pub sensors: usize,
    pub slew_limiter: bool,
    pub stored_crc: u16,
    pub computed_crc: u16,
    /// Decoded only when the checksum matches.
    pub thresholds: Option<Vec<Thresholds>>,
}

impl RecordInfo {
    pub fn crc_ok(&self) -> bool {
        self.stored_crc == self.computed_crc
    }
}

fn check_capacity(store: &dyn ByteStore, offset: usize, sensors: usize) -> Result<(), TouchError> {
    if sensors == 0 || sensors > MAX_SENSORS {
        return Err(TouchError::CountOutOfRange(sensors));
    }
    let required = record_len(sensors);
    let capacity = store.capacity();
    if offset.checked_add(required).is_none_or(|end| end > capacity) {
        return Err(TouchError::NoSpace {
            offset,
            required,
            capacity,
        });
    }
    Ok(())
}

struct Writer<'a> {
    store: &'a mut dyn ByteStore,
    addr: usize,
    crc: u16,
}

impl Writer<'_> {
    fn put(&mut self, byte: u8) {
        self.store.update(self.addr, byte);
        self.crc = crc16_update(self.crc, byte);
        self.addr += 1;
    }

    fn put_f32(&mut self, v: f32) {
        for b in v.to_bits().to_be_bytes() {
            self.put(b);
        }
    }
}

/// Byte reader that folds everything it reads into the running checksum.
struct Reader<'a> {
    store: &'a dyn ByteStore,
    addr: usize,
    crc: u16,
}

impl<'a> Reader<'a> {
    const fn new(store: &'a dyn ByteStore, addr: usize) -> Self {
        Self {
            store,
            addr,
            crc: 0,
        }
    }

    fn byte(&mut self) -> u8 {
        let b = self.store.read(self.addr);
        self.crc = crc16_update(self.crc, b);
        self.addr += 1;
        b
    }

    fn f32(&mut self) -> f32 {
        let bytes = [self.byte(), self.byte(), self.byte(), self.byte()];
        f32::from_bits(u32::from_be_bytes(bytes))
    }

    fn thresholds(&mut self) -> Thresholds {
        Thresholds::from_array([self.f32(), self.f32(), self.f32(), self.f32()])
    }

    /// Trailing checksum; not folded into the running value.
    fn stored_crc(&self) -> u16 {
        u16::from_be_bytes([self.store.read(self.addr), self.store.read(self.addr + 1)])
    }
}

/// Write `settings` at `offset`, touching only bytes that change.
///
/// Refuses to overwrite a region whose first byte is neither the key nor
/// erased.
pub fn write_settings(
    store: &mut dyn ByteStore,
    offset: usize,
    settings: &Settings,
) -> Result<(), TouchError> {
    let sensors = settings.thresholds.len();
    check_capacity(store, offset, sensors)?;
    let descriptor = Descriptor::new(FORMAT_VERSION, sensors)?;

    let first = store.read(offset);
    if first != KEY && first != ERASED {
        return Err(TouchError::ForeignData { found: first });
    }

    let mut w = Writer {
        store,
        addr: offset,
        crc: 0,
    };
    w.put(KEY);
    w.put(descriptor.byte());
    w.put(ConfigFlags::new(settings.slew_limiter).byte());
    for t in &settings.thresholds {
        for v in t.as_array() {
            w.put_f32(v);
        }
    }
    let [hi, lo] = w.crc.to_be_bytes();
    w.store.update(w.addr, hi);
    w.store.update(w.addr + 1, lo);
    Ok(())
}

/// Read settings for `sensors` sensors from `offset`.
///
/// Returns `Ok(None)` for an erased region (nothing saved yet).
pub fn read_settings(
    store: &dyn ByteStore,
    offset: usize,
    sensors: usize,
) -> Result<Option<Settings>, TouchError> {
    check_capacity(store, offset, sensors)?;

    let key = store.read(offset);
    if key == ERASED {
        return Ok(None);
    }
    if key != KEY {
        return Err(TouchError::KeyMissing { found: key });
    }
    let descriptor = Descriptor::from_byte(store.read(offset + 1));
    if descriptor.version() != FORMAT_VERSION {
        return Err(TouchError::FormatVersion(descriptor.version()));
    }
    if descriptor.sensor_count() != sensors {
        return Err(TouchError::SensorCount {
            stored: descriptor.sensor_count(),
            configured: sensors,
        });
    }

    // Pass 1: checksum only.
    let mut r = Reader::new(store, offset);
    for _ in 0..record_len(sensors) - 2 {
        r.byte();
    }
    let (stored, computed) = (r.stored_crc(), r.crc);
    if stored != computed {
        return Err(TouchError::Checksum { stored, computed });
    }

    // Pass 2: decode.
    let mut r = Reader::new(store, offset);
    r.byte();
    r.byte();
    let flags = ConfigFlags::from_byte(r.byte());
    let thresholds = (0..sensors).map(|_| r.thresholds()).collect();
    Ok(Some(Settings {
        slew_limiter: flags.slew_limiter(),
        thresholds,
    }))
}

/// Decode whatever record sits at `offset`, trusting its own descriptor.
///
/// Returns `Ok(None)` for an erased region.
pub fn inspect(store: &dyn ByteStore, offset: usize) -> Result<Option<RecordInfo>, TouchError> {
    let capacity = store.capacity();
    if offset.checked_add(OVERHEAD).is_none_or(|end| end > capacity) {
        return Err(TouchError::NoSpace {
            offset,
            required: OVERHEAD,
            capacity,
        });
    }
    let key = store.read(offset);
    if key == ERASED {
        return Ok(None);
    }
    if key != KEY {
        return Err(TouchError::KeyMissing { found: key });
    }
    let descriptor = Descriptor::from_byte(store.read(offset + 1));
    let sensors = descriptor.sensor_count();
    check_capacity(store, offset, sensors)?;

    let mut r = Reader::new(store, offset);
    r.byte();
    r.byte();
    let flags = ConfigFlags::from_byte(r.byte());
    let decoded: Vec<Thresholds> = (0..sensors).map(|_| r.thresholds()).collect();
    let (stored_crc, computed_crc) = (r.stored_crc(), r.crc);
    Ok(Some(RecordInfo {
        version: descriptor.version(),
        sensors,
        slew_limiter: flags.slew_limiter(),
        stored_crc,
        computed_crc,
        thresholds: (stored_crc == computed_crc).then_some(decoded),
    }))
}
