//! Test and helper mocks for touch_core

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use touch_traits::{ByteStore, RandomSource, SampleMethod};

use crate::machine::{StateControl, StateObserver};
use crate::persist::ERASED;
use crate::state::StateChange;

/// Shared level read by a [`LevelSample`]; cloned handles move together.
#[derive(Debug, Clone, Default)]
pub struct Level(Rc<Cell<i32>>);

impl Level {
    pub fn new(v: i32) -> Self {
        Self(Rc::new(Cell::new(v)))
    }

    pub fn set(&self, v: i32) {
        self.0.set(v);
    }

    pub fn get(&self) -> i32 {
        self.0.get()
    }
}

/// Sample method returning the current [`Level`] for both polarities.
///
/// Every sample type therefore yields `2 * level` per scan visit.
#[derive(Debug, Clone)]
pub struct LevelSample {
    level: Level,
}

impl LevelSample {
    pub fn new(level: &Level) -> Self {
        Self {
            level: level.clone(),
        }
    }
}

impl SampleMethod for LevelSample {
    fn sample(&mut self, _inverted: bool) -> i32 {
        self.level.get()
    }
}

/// Returns `normal` or `inverted` depending on the requested polarity.
#[derive(Debug, Clone, Copy)]
pub struct SplitSample {
    pub normal: i32,
    pub inverted: i32,
}

impl SampleMethod for SplitSample {
    fn sample(&mut self, inverted: bool) -> i32 {
        if inverted { self.inverted } else { self.normal }
    }
}

/// In-memory byte store that starts erased and counts physical writes.
#[derive(Debug, Clone)]
pub struct RamStore {
    bytes: Vec<u8>,
    writes: usize,
}

impl RamStore {
    pub fn erased(capacity: usize) -> Self {
        Self {
            bytes: vec![ERASED; capacity],
            writes: 0,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl ByteStore for RamStore {
    fn read(&self, addr: usize) -> u8 {
        self.bytes.get(addr).copied().unwrap_or(ERASED)
    }

    fn write(&mut self, addr: usize, value: u8) {
        if let Some(b) = self.bytes.get_mut(addr) {
            *b = value;
            self.writes += 1;
        }
    }

    fn capacity(&self) -> usize {
        self.bytes.len()
    }
}

/// Byte store shared between a controller and the test that inspects it.
#[derive(Debug, Clone)]
pub struct SharedStore(pub Rc<RefCell<RamStore>>);

impl SharedStore {
    pub fn erased(capacity: usize) -> Self {
        Self(Rc::new(RefCell::new(RamStore::erased(capacity))))
    }
}

impl ByteStore for SharedStore {
    fn read(&self, addr: usize) -> u8 {
        self.0.borrow().read(addr)
    }

    fn write(&mut self, addr: usize, value: u8) {
        self.0.borrow_mut().write(addr, value);
    }

    fn capacity(&self) -> usize {
        self.0.borrow().capacity()
    }
}

/// Random source replaying a fixed list of draws (each reduced modulo the
/// bound) and remembering the last seed.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    draws: Vec<u32>,
    next: usize,
    seed: Option<u32>,
}

impl ScriptedRandom {
    pub fn new(draws: Vec<u32>) -> Self {
        Self {
            draws,
            next: 0,
            seed: None,
        }
    }

    pub fn repeating(v: u32) -> Self {
        Self::new(vec![v])
    }

    pub fn seeded_with(&self) -> Option<u32> {
        self.seed
    }
}

impl RandomSource for ScriptedRandom {
    fn seed(&mut self, seed: u32) {
        self.seed = Some(seed);
    }

    fn below(&mut self, bound: u32) -> u32 {
        if self.draws.is_empty() || bound == 0 {
            return 0;
        }
        let v = self.draws[self.next % self.draws.len()];
        self.next += 1;
        v % bound
    }
}

/// Observer that records every change it is told about.
#[derive(Debug, Clone, Default)]
pub struct Recorder(pub Rc<RefCell<Vec<StateChange>>>);

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn changes(&self) -> Vec<StateChange> {
        self.0.borrow().clone()
    }

    pub fn clear(&self) {
        self.0.borrow_mut().clear();
    }
}

impl StateObserver for Recorder {
    fn on_major_state_change(&mut self, change: StateChange, _control: &mut dyn StateControl) {
        self.0.borrow_mut().push(change);
    }
}
