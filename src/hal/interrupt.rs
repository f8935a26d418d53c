//! # Emulated GPIO Interrupts
//!
//! The platform facility reports pin edges through a per-pin alert callback
//! with its own argument shape, while radio drivers expect an Arduino-style
//! `attach_interrupt(pin, callback, mode)` contract with zero-argument
//! callbacks. This module bridges the two:
//!
//! 1. **Interrupt table** - one entry per user GPIO holding
//!    `{enabled, mode, callback}`
//! 2. **Attach/detach** - populate or clear an entry and (un)register the
//!    alert with the facility, passing the table itself as the alert context
//! 3. **Dispatch** - [`alert_dispatch`] runs on the facility's notification
//!    context, validates the event against the table and calls the driver's
//!    callback synchronously
//!
//! ## Entry State Machine
//!
//! ```text
//! Empty ──attach──► Armed ──detach──► Empty
//!                     │ ▲
//!                     └─┘ attach (overwrite)
//! ```
//!
//! Each entry sits behind its own lock and is replaced as a whole record, so
//! the dispatcher never observes a half-written entry even when the driver
//! re-attaches a pin while an alert is in flight. The callback is copied out
//! and invoked after the lock is released; a callback may therefore call
//! attach/detach itself.

use crate::constants::{INTERRUPT_TABLE_SIZE, MAX_USER_GPIO, NC};
use crate::error::HalError;
use crate::platform::{Alert, Level, Platform, Trigger};
use std::sync::{Arc, Mutex, PoisonError};

/// Zero-argument interrupt service routine supplied by the radio driver
pub type InterruptCallback = fn();

/// Edge that fires an emulated interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeMode {
    /// Low to high transition
    Rising,
    /// High to low transition
    Falling,
    /// Any transition
    Either,
}

/// One row of the edge translation table
struct EdgeTranslation {
    /// Edge requested from the facility
    trigger: Trigger,
    /// Level the facility reports for this edge (`None` accepts both)
    level: Option<Level>,
}

/// Edge translation between the driver's modes and the facility's encoding
///
/// The facility names edges by code (`RISING_EDGE = 0`, `FALLING_EDGE = 1`,
/// `EITHER_EDGE = 2`) but reports every alert with the level *after* the
/// transition, so a rising edge arrives as level 1. Drivers compare the mode
/// they attached with the reported level, which puts their RISING constant
/// on the facility's FALLING_EDGE code and vice versa. This table is the only
/// place that swap is expressed: each mode maps to the edge the facility must
/// watch and the level its alerts must report.
///
/// Rows follow [`EdgeMode`] declaration order.
const EDGE_TRANSLATION: [EdgeTranslation; 3] = [
    // Rising
    EdgeTranslation {
        trigger: Trigger::RisingEdge,
        level: Some(Level::High),
    },
    // Falling
    EdgeTranslation {
        trigger: Trigger::FallingEdge,
        level: Some(Level::Low),
    },
    // Either
    EdgeTranslation {
        trigger: Trigger::Both,
        level: None,
    },
];

impl EdgeMode {
    fn translation(self) -> &'static EdgeTranslation {
        match self {
            EdgeMode::Rising => &EDGE_TRANSLATION[0],
            EdgeMode::Falling => &EDGE_TRANSLATION[1],
            EdgeMode::Either => &EDGE_TRANSLATION[2],
        }
    }

    /// Edge selection requested from the facility
    pub fn trigger(self) -> Trigger {
        self.translation().trigger
    }

    /// Whether an alert reporting `level` belongs to this mode
    #[inline]
    pub fn accepts(self, level: Level) -> bool {
        match self.translation().level {
            Some(expected) => expected == level,
            None => true,
        }
    }
}

/// Snapshot of one interrupt table entry
///
/// Outside of tests an entry is either empty (disabled, no mode, no callback)
/// or fully armed; attach and detach are its only writers.
#[derive(Debug, Clone, Copy)]
pub struct InterruptEntry {
    enabled: bool,
    mode: Option<EdgeMode>,
    callback: Option<InterruptCallback>,
}

impl InterruptEntry {
    /// Cleared entry
    pub const EMPTY: Self = Self {
        enabled: false,
        mode: None,
        callback: None,
    };

    fn armed(mode: EdgeMode, callback: InterruptCallback) -> Self {
        Self {
            enabled: true,
            mode: Some(mode),
            callback: Some(callback),
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    pub fn mode(&self) -> Option<EdgeMode> {
        self.mode
    }

    pub fn callback(&self) -> Option<InterruptCallback> {
        self.callback
    }

    /// True for the cleared state
    pub fn is_empty(&self) -> bool {
        !self.enabled && self.mode.is_none() && self.callback.is_none()
    }
}

impl Default for InterruptEntry {
    fn default() -> Self {
        Self::EMPTY
    }
}

/// Map a pin number to its table slot
///
/// `None` for the not-connected sentinel and for pins above
/// [`MAX_USER_GPIO`]; attach/detach/dispatch treat both as silent no-ops.
#[inline]
pub fn table_index(pin: u32) -> Option<usize> {
    if pin == NC || pin > MAX_USER_GPIO {
        None
    } else {
        Some(pin as usize)
    }
}

/// Fixed-size interrupt emulation table, indexed by BCM pin number
///
/// Owned by one HAL instance and shared (via `Arc`) with the facility as the
/// context of every alert it registers.
#[derive(Debug)]
pub struct InterruptTable {
    entries: [Mutex<InterruptEntry>; INTERRUPT_TABLE_SIZE],
}

impl Default for InterruptTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptTable {
    /// Create a table with every entry empty
    pub fn new() -> Self {
        Self {
            entries: std::array::from_fn(|_| Mutex::new(InterruptEntry::EMPTY)),
        }
    }

    /// Snapshot of the entry for `pin`, `None` when the pin has no slot
    #[inline]
    pub fn entry(&self, pin: u32) -> Option<InterruptEntry> {
        let index = table_index(pin)?;
        Some(*self.entries[index].lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn store(&self, index: usize, entry: InterruptEntry) {
        *self.entries[index]
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = entry;
    }

    /// Pins whose entry is currently enabled
    pub fn armed_pins(&self) -> Vec<u32> {
        (0..=MAX_USER_GPIO)
            .filter(|&pin| self.entry(pin).is_some_and(|entry| entry.enabled))
            .collect()
    }

    /// Arm `pin` and register the dispatcher with the facility
    ///
    /// Sentinel and out-of-range pins are ignored. Re-attaching an armed pin
    /// overwrites its entry. If the facility refuses the registration the
    /// entry is cleared again and the error is returned.
    pub fn attach<P: Platform + ?Sized>(
        self: &Arc<Self>,
        platform: &mut P,
        pin: u32,
        callback: InterruptCallback,
        mode: EdgeMode,
    ) -> Result<(), HalError> {
        let Some(index) = table_index(pin) else {
            return Ok(());
        };

        self.store(index, InterruptEntry::armed(mode, callback));

        let alert = Alert {
            trigger: mode.trigger(),
            handler: alert_dispatch,
            context: Some(Arc::clone(self)),
        };
        if let Err(e) = platform.set_alert(pin, Some(alert)) {
            self.store(index, InterruptEntry::EMPTY);
            return Err(e);
        }

        log::debug!("Interrupt attached on GPIO {} ({:?})", pin, mode);
        Ok(())
    }

    /// Clear `pin` and cancel its facility alert
    ///
    /// Sentinel and out-of-range pins are ignored; detaching an empty entry
    /// is a no-op apart from the (idempotent) facility call.
    pub fn detach<P: Platform + ?Sized>(
        self: &Arc<Self>,
        platform: &mut P,
        pin: u32,
    ) -> Result<(), HalError> {
        let Some(index) = table_index(pin) else {
            return Ok(());
        };

        self.store(index, InterruptEntry::EMPTY);
        platform.set_alert(pin, None)?;

        log::debug!("Interrupt detached from GPIO {}", pin);
        Ok(())
    }
}

/// Alert handler registered with the facility for every attached pin
///
/// Validation order, each failure returning silently: context present, pin
/// within the table, entry enabled, reported level accepted by the entry's
/// mode, callback present. Only then is the callback invoked, synchronously
/// and on the caller's thread. Allocation-free and lock-hold bounded by a
/// single entry copy.
pub fn alert_dispatch(pin: u32, level: Level, _tick: u64, context: Option<&InterruptTable>) {
    let Some(table) = context else {
        return;
    };
    let Some(entry) = table.entry(pin) else {
        return;
    };
    if !entry.enabled {
        return;
    }
    if !entry.mode.is_some_and(|mode| mode.accepts(level)) {
        return;
    }
    let Some(callback) = entry.callback else {
        return;
    };

    callback();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::{MockPlatform, PlatformCall};
    use std::sync::atomic::{AtomicUsize, Ordering};

    static TRUTH_TABLE_HITS: AtomicUsize = AtomicUsize::new(0);

    fn truth_table_isr() {
        TRUTH_TABLE_HITS.fetch_add(1, Ordering::SeqCst);
    }

    static OVERWRITE_FIRST: AtomicUsize = AtomicUsize::new(0);
    static OVERWRITE_SECOND: AtomicUsize = AtomicUsize::new(0);

    fn overwrite_first() {
        OVERWRITE_FIRST.fetch_add(1, Ordering::SeqCst);
    }

    fn overwrite_second() {
        OVERWRITE_SECOND.fetch_add(1, Ordering::SeqCst);
    }

    static EMPTY_MODE_HITS: AtomicUsize = AtomicUsize::new(0);

    fn empty_mode_isr() {
        EMPTY_MODE_HITS.fetch_add(1, Ordering::SeqCst);
    }

    fn noop() {}

    #[test]
    fn test_edge_translation_table() {
        assert_eq!(EdgeMode::Rising.trigger(), Trigger::RisingEdge);
        assert_eq!(EdgeMode::Falling.trigger(), Trigger::FallingEdge);
        assert_eq!(EdgeMode::Either.trigger(), Trigger::Both);
    }

    #[test]
    fn test_edge_acceptance() {
        assert!(EdgeMode::Rising.accepts(Level::High));
        assert!(!EdgeMode::Rising.accepts(Level::Low));
        assert!(EdgeMode::Falling.accepts(Level::Low));
        assert!(!EdgeMode::Falling.accepts(Level::High));
        assert!(EdgeMode::Either.accepts(Level::Low));
        assert!(EdgeMode::Either.accepts(Level::High));
    }

    #[test]
    fn test_table_index_bounds() {
        assert_eq!(table_index(0), Some(0));
        assert_eq!(table_index(MAX_USER_GPIO), Some(INTERRUPT_TABLE_SIZE - 1));
        assert_eq!(table_index(MAX_USER_GPIO + 1), None);
        assert_eq!(table_index(NC), None);
    }

    #[test]
    fn test_new_table_is_empty() {
        let table = InterruptTable::new();
        for pin in 0..=MAX_USER_GPIO {
            assert!(table.entry(pin).unwrap().is_empty());
        }
        assert!(table.entry(NC).is_none());
        assert!(table.armed_pins().is_empty());
    }

    /// Every combination of the five dispatch preconditions; the callback
    /// must run only when all of them hold.
    #[test]
    fn test_dispatch_truth_table() {
        const PIN: u32 = 17;
        const OUT_OF_RANGE: u32 = MAX_USER_GPIO + 9;

        for bits in 0u32..32 {
            let has_context = bits & 0b00001 != 0;
            let in_range = bits & 0b00010 != 0;
            let enabled = bits & 0b00100 != 0;
            let level_matches = bits & 0b01000 != 0;
            let has_callback = bits & 0b10000 != 0;

            let table = InterruptTable::new();
            table.store(
                PIN as usize,
                InterruptEntry {
                    enabled,
                    mode: Some(EdgeMode::Rising),
                    callback: if has_callback {
                        Some(truth_table_isr as InterruptCallback)
                    } else {
                        None
                    },
                },
            );

            let pin = if in_range { PIN } else { OUT_OF_RANGE };
            let level = if level_matches { Level::High } else { Level::Low };
            let context = if has_context { Some(&table) } else { None };

            let before = TRUTH_TABLE_HITS.load(Ordering::SeqCst);
            alert_dispatch(pin, level, 0, context);
            let fired = TRUTH_TABLE_HITS.load(Ordering::SeqCst) - before;

            let expected = usize::from(bits == 0b11111);
            assert_eq!(fired, expected, "combination {:05b}", bits);
        }
    }

    #[test]
    fn test_dispatch_ignores_empty_mode() {
        let table = InterruptTable::new();
        table.store(
            3,
            InterruptEntry {
                enabled: true,
                mode: None,
                callback: Some(empty_mode_isr as InterruptCallback),
            },
        );

        alert_dispatch(3, Level::High, 0, Some(&table));
        alert_dispatch(3, Level::Low, 0, Some(&table));
        assert_eq!(EMPTY_MODE_HITS.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_attach_populates_and_registers() {
        let table = Arc::new(InterruptTable::new());
        let mut platform = MockPlatform::initialised();

        table
            .attach(&mut platform, 24, noop, EdgeMode::Falling)
            .unwrap();

        let entry = table.entry(24).unwrap();
        assert!(entry.enabled());
        assert_eq!(entry.mode(), Some(EdgeMode::Falling));
        assert!(entry.callback().is_some());
        assert_eq!(platform.alert_trigger(24), Some(Trigger::FallingEdge));
        assert!(platform.alert_has_context(24));
        assert_eq!(table.armed_pins(), vec![24]);
    }

    #[test]
    fn test_attach_overwrites_existing_entry() {
        let table = Arc::new(InterruptTable::new());
        let mut platform = MockPlatform::initialised();

        table
            .attach(&mut platform, 5, overwrite_first, EdgeMode::Rising)
            .unwrap();
        table
            .attach(&mut platform, 5, overwrite_second, EdgeMode::Falling)
            .unwrap();

        platform.fire_alert(5, Level::Low);
        platform.fire_alert(5, Level::High);

        assert_eq!(OVERWRITE_FIRST.load(Ordering::SeqCst), 0);
        assert_eq!(OVERWRITE_SECOND.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_attach_rolls_back_on_facility_error() {
        let table = Arc::new(InterruptTable::new());
        let mut platform = MockPlatform::initialised();
        platform.fail_next_alert("no edge detection");

        let result = table.attach(&mut platform, 6, noop, EdgeMode::Rising);
        assert!(matches!(result, Err(HalError::Alert { pin: 6, .. })));
        assert!(table.entry(6).unwrap().is_empty());
    }

    #[test]
    fn test_detach_clears_and_unregisters() {
        let table = Arc::new(InterruptTable::new());
        let mut platform = MockPlatform::initialised();

        table.attach(&mut platform, 8, noop, EdgeMode::Either).unwrap();
        table.detach(&mut platform, 8).unwrap();

        assert!(table.entry(8).unwrap().is_empty());
        assert_eq!(platform.alert_trigger(8), None);

        platform.clear_calls();
        table.detach(&mut platform, 8).unwrap();
        assert!(table.entry(8).unwrap().is_empty());
        assert_eq!(
            platform.calls(),
            vec![PlatformCall::SetAlert {
                pin: 8,
                trigger: None
            }]
        );
    }

    #[test]
    fn test_out_of_range_pins_are_ignored() {
        let table = Arc::new(InterruptTable::new());
        let mut platform = MockPlatform::initialised();

        for pin in [NC, MAX_USER_GPIO + 1, 1000] {
            table.attach(&mut platform, pin, noop, EdgeMode::Rising).unwrap();
            table.detach(&mut platform, pin).unwrap();
        }

        assert!(platform.calls().is_empty());
        assert!(table.armed_pins().is_empty());
    }
}
