//! # Radio HAL Lifecycle Tests
//!
//! Covers init/term ordering, the GPIO pass-through layer, timing primitives
//! and SPI transfers through the `RadioHal` trait, using the simulated
//! facility in place of a Raspberry Pi.

use pihal_rs::constants::{ENABLE_PIN, NC};
use pihal_rs::hal::{EdgeMode, Level, PiHal, PinMode, RadioHal};
use pihal_rs::platform::mock::{MockPlatform, PlatformCall};
use pihal_rs::platform::{Platform, SpiHandle};
use pihal_rs::HalError;
use proptest::prelude::*;

fn new_hal() -> (PiHal<MockPlatform>, MockPlatform) {
    let mock = MockPlatform::new();
    let hal = PiHal::new(mock.clone(), 0, 2_000_000);
    (hal, mock)
}

fn noop() {}

/// Adapter on a facility that is already up, SPI still closed
fn running_hal() -> (PiHal<MockPlatform>, MockPlatform) {
    let mock = MockPlatform::initialised();
    let hal = PiHal::new(mock.clone(), 0, 2_000_000);
    (hal, mock)
}

#[test]
fn test_init_order() {
    let (mut hal, mock) = new_hal();
    hal.init().unwrap();

    assert_eq!(
        mock.calls(),
        vec![
            PlatformCall::Initialise,
            PlatformCall::SpiOpen {
                channel: 0,
                speed: 2_000_000,
                flags: 0
            },
            PlatformCall::SetMode {
                pin: ENABLE_PIN,
                mode: PinMode::Output
            },
            PlatformCall::Write {
                pin: ENABLE_PIN,
                level: Level::High
            },
        ]
    );
    assert!(hal.is_spi_open());
    assert_eq!(mock.level(ENABLE_PIN), Level::High);
}

#[test]
fn test_term_is_exact_reverse() {
    let (mut hal, mock) = new_hal();
    hal.init().unwrap();
    mock.clear_calls();

    hal.term().unwrap();

    assert_eq!(
        mock.calls(),
        vec![
            PlatformCall::SpiClose {
                handle: SpiHandle(0)
            },
            PlatformCall::SetMode {
                pin: ENABLE_PIN,
                mode: PinMode::Output
            },
            PlatformCall::Write {
                pin: ENABLE_PIN,
                level: Level::Low
            },
            PlatformCall::Terminate,
        ]
    );
}

/// init followed by term leaves SPI closed and the radio unpowered,
/// whatever state the board was in beforehand.
#[test]
fn test_init_term_cycle_from_any_state() {
    for pre_open in [false, true] {
        for pre_level in [Level::Low, Level::High] {
            let (mut hal, mock) = new_hal();
            mock.set_level(ENABLE_PIN, pre_level);
            if pre_open {
                hal.platform_mut().initialise().unwrap();
                hal.spi_begin().unwrap();
            }

            hal.init().unwrap();
            hal.term().unwrap();

            assert!(!hal.is_spi_open());
            assert_eq!(mock.open_spi_handles(), 0);
            assert_eq!(mock.level(ENABLE_PIN), Level::Low);
            assert!(!mock.is_initialised());
        }
    }
}

#[test]
fn test_init_propagates_facility_failure() {
    let (mut hal, mock) = new_hal();
    mock.fail_next_init("no /dev/gpiomem");

    let err = hal.init().unwrap_err();
    assert_eq!(err, HalError::Initialisation("no /dev/gpiomem".to_string()));
    assert!(!hal.is_spi_open());
    assert_eq!(mock.calls(), vec![PlatformCall::Initialise]);
}

#[test]
fn test_init_stops_at_spi_failure() {
    let (mut hal, mock) = new_hal();
    mock.fail_next_spi_open("spidev missing");

    assert!(matches!(hal.init(), Err(HalError::SpiOpen { channel: 0, .. })));
    assert_eq!(mock.level(ENABLE_PIN), Level::Low);
    assert!(!mock
        .calls()
        .iter()
        .any(|call| matches!(call, PlatformCall::Write { .. })));
}

#[test]
fn test_term_without_init_reports_facility_down() {
    let (mut hal, mock) = new_hal();

    assert_eq!(hal.term(), Err(HalError::NotInitialised));
    assert_eq!(hal.term(), Err(HalError::NotInitialised));

    let calls = mock.calls();
    assert!(!calls
        .iter()
        .any(|call| matches!(call, PlatformCall::SpiClose { .. })));
    assert_eq!(calls.last(), Some(&PlatformCall::Terminate));
    assert_eq!(mock.level(ENABLE_PIN), Level::Low);
}

#[test]
fn test_operations_before_init_propagate_facility_error() {
    let (mut hal, _mock) = new_hal();

    assert_eq!(
        hal.pin_mode(22, PinMode::Output),
        Err(HalError::NotInitialised)
    );
    assert_eq!(
        hal.digital_write(22, Level::High),
        Err(HalError::NotInitialised)
    );
    assert_eq!(hal.digital_read(22), Err(HalError::NotInitialised));
    assert_eq!(
        hal.pulse_in(22, Level::High, 100),
        Err(HalError::NotInitialised)
    );
    assert_eq!(hal.spi_begin(), Err(HalError::NotInitialised));
    assert!(!hal.is_spi_open());

    assert_eq!(
        hal.attach_interrupt(24, noop, EdgeMode::Rising),
        Err(HalError::NotInitialised)
    );
    assert!(hal.interrupt_entry(24).unwrap().is_empty());
}

#[test]
fn test_operations_after_term_propagate_facility_error() {
    let (mut hal, _mock) = new_hal();
    hal.init().unwrap();
    hal.term().unwrap();

    assert_eq!(hal.digital_read(25), Err(HalError::NotInitialised));
    assert_eq!(hal.spi_begin(), Err(HalError::NotInitialised));
}

#[test]
fn test_gpio_pass_through() {
    let (mut hal, mock) = running_hal();

    hal.pin_mode(25, PinMode::Input).unwrap();
    mock.set_level(25, Level::High);
    assert_eq!(hal.digital_read(25).unwrap(), Level::High);

    hal.pin_mode(22, PinMode::Output).unwrap();
    hal.digital_write(22, Level::High).unwrap();
    assert_eq!(mock.level(22), Level::High);
    assert_eq!(mock.mode(22), Some(PinMode::Output));
}

#[test]
fn test_sentinel_gpio_and_pulse() {
    let (mut hal, mock) = new_hal();
    mock.set_auto_advance(1);

    hal.pin_mode(NC, PinMode::Output).unwrap();
    hal.digital_write(NC, Level::High).unwrap();
    assert_eq!(hal.digital_read(NC).unwrap(), Level::Low);
    assert_eq!(hal.pulse_in(NC, Level::High, 1_000).unwrap(), 0);

    assert!(mock.calls().is_empty());
}

#[test]
fn test_pulse_in_timeout() {
    let (mut hal, mock) = running_hal();
    mock.set_level(24, Level::High);
    mock.set_auto_advance(2);

    assert_eq!(hal.pulse_in(24, Level::High, 400).unwrap(), 0);
    assert_eq!(mock.mode(24), Some(PinMode::Input));
}

#[test]
fn test_pulse_in_measures_width() {
    let (mut hal, mock) = running_hal();
    mock.set_tick(10_000);
    mock.set_level(24, Level::Low);
    mock.schedule_level(24, 10_300, Level::High);
    mock.set_auto_advance(1);

    let width = hal.pulse_in(24, Level::Low, 5_000).unwrap();
    assert!((298..=305).contains(&width), "width {}", width);
}

#[test]
fn test_delays_advance_clock() {
    let (hal, mock) = new_hal();

    hal.delay_ms(5);
    hal.delay_us(250);

    assert_eq!(hal.micros(), 5_250);
    assert_eq!(hal.millis(), 5);
    assert_eq!(
        mock.calls(),
        vec![
            PlatformCall::Delay { micros: 5_000 },
            PlatformCall::Delay { micros: 250 },
        ]
    );
}

#[test]
fn test_spi_transfer_through_hal() {
    let (mut hal, mock) = new_hal();
    hal.init().unwrap();

    mock.queue_spi_response(&[0x00, 0x24]);
    let mut input = [0u8; 2];
    hal.spi_begin_transaction();
    hal.spi_transfer(&[0x42, 0x00], 2, &mut input).unwrap();
    hal.spi_end_transaction();

    assert_eq!(input, [0x00, 0x24]);
}

#[test]
fn test_spi_transfer_after_end_fails() {
    let (mut hal, _mock) = running_hal();
    hal.spi_begin().unwrap();
    hal.spi_end().unwrap();

    let mut input = [0u8; 1];
    assert_eq!(
        hal.spi_transfer(&[0x01], 1, &mut input),
        Err(HalError::SpiClosed)
    );
}

#[test]
fn test_spi_transfer_error_propagates() {
    let (mut hal, mock) = running_hal();
    hal.spi_begin().unwrap();
    mock.fail_next_spi_xfer("bus fault");

    let mut input = [0u8; 1];
    assert_eq!(
        hal.spi_transfer(&[0x01], 1, &mut input),
        Err(HalError::SpiTransfer("bus fault".to_string()))
    );
    // No retry
    assert_eq!(
        mock.calls()
            .iter()
            .filter(|call| matches!(call, PlatformCall::SpiXfer { .. }))
            .count(),
        1
    );
}

#[test]
fn test_platform_accessors() {
    let (mut hal, mock) = new_hal();
    hal.platform_mut().set_tick(42);
    assert_eq!(hal.platform().tick(), 42);
    assert_eq!(mock.level(3), Level::Low);
}

proptest! {
    #[test]
    fn prop_millis_is_micros_div_1000(tick in any::<u64>()) {
        let (hal, mock) = new_hal();
        mock.set_tick(tick);
        let micros = hal.micros();
        prop_assert_eq!(hal.millis(), micros / 1000);
    }

    #[test]
    fn prop_pulse_width_tracks_scheduled_edge(
        width in 10u64..2_000,
        timeout_slack in 10u64..500,
    ) {
        let (mut hal, mock) = running_hal();
        mock.set_level(17, Level::High);
        mock.schedule_level(17, width, Level::Low);
        mock.set_auto_advance(1);

        let measured = hal.pulse_in(17, Level::High, width + timeout_slack).unwrap();
        prop_assert!(
            measured >= width && measured <= width + 2,
            "measured {} for {}",
            measured,
            width
        );
    }
}
