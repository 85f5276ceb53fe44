mod common;

use common::{new_log, take, Event, FakeAdc, FakeDelay, FakeGpio, FakePeripheral};
use embassy_futures::block_on;
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
use embedded_hal::digital::PinState;
use volley_core::utils::{
    board::{
        adc::{
            regular_buffer_index, setup_adc_channels, Adc, AdcChannel, Rank, SampleTime, Sequence,
        },
        gpio::{Pad, PadMode, Port},
        identity::{
            hw_id_from_pins, init_app_config, init_mc_config, AppConfiguration, BoardId,
            McConfiguration, MotorPosition,
        },
        pins::{
            init_gpio, AF_TIM1, DCCAL, FAULT, GATE_ENABLE, HALL_1, HALL_2, HALL_3, ID_STRAPS,
            LED_GREEN, LED_RED, VOLLEY_PAD_TABLE,
        },
        BoardError,
    },
    controllers::{
        i2c::{I2cBus, VOLLEY_BUS_LINES},
        BoardSupport,
    },
};

fn strapped(
    log: &common::Log,
    low: bool,
    high: bool,
) -> FakeGpio {
    let gpio = FakeGpio::new(log);
    let level = |b: bool| if b { PinState::High } else { PinState::Low };
    gpio.drive_input(ID_STRAPS[0], level(low));
    gpio.drive_input(ID_STRAPS[1], level(high));
    gpio
}

fn first(
    events: &[Event],
    pred: impl Fn(&Event) -> bool,
) -> usize {
    events.iter().position(pred).expect("event not logged")
}

#[test]
fn id_truth_table() {
    let cases = [
        (false, false, 10),
        (true, false, 11),
        (false, true, 12),
        (true, true, 13),
    ];
    for (low, high, expected) in cases {
        let log = new_log();
        let mut gpio = strapped(&log, low, high);
        assert_eq!(hw_id_from_pins(&mut gpio).get(), expected, "straps ({low}, {high})");
    }
}

#[test]
fn straps_switch_to_input_before_read() {
    let log = new_log();
    let mut gpio = strapped(&log, false, false);

    hw_id_from_pins(&mut gpio);

    assert_eq!(
        take(&log),
        vec![
            Event::Mode(ID_STRAPS[0], PadMode::Input),
            Event::Read(ID_STRAPS[0]),
            Event::Mode(ID_STRAPS[1], PadMode::Input),
            Event::Read(ID_STRAPS[1]),
        ]
    );
}

#[test]
fn id_is_not_cached() {
    let log = new_log();
    let mut gpio = strapped(&log, false, false);
    assert_eq!(hw_id_from_pins(&mut gpio), BoardId::TOP);

    gpio.drive_input(ID_STRAPS[1], PinState::High);
    assert_eq!(hw_id_from_pins(&mut gpio), BoardId::RIGHT);
}

#[test]
fn motor_positions() {
    assert_eq!(MotorPosition::try_from(BoardId::TOP), Ok(MotorPosition::Top));
    assert_eq!(MotorPosition::try_from(BoardId::LEFT), Ok(MotorPosition::Left));
    assert_eq!(MotorPosition::try_from(BoardId::RIGHT), Ok(MotorPosition::Right));
    assert_eq!(
        MotorPosition::try_from(BoardId::RESERVED),
        Err(BoardError::ReservedId(13))
    );
}

#[test]
fn app_config_gets_controller_id() {
    let log = new_log();
    let mut gpio = strapped(&log, true, false);
    let mut conf = AppConfiguration { controller_id: 0 };

    init_app_config(&mut gpio, &mut conf);

    assert_eq!(conf.controller_id, 11);
}

#[test]
fn only_left_motor_is_not_inverted() {
    let cases = [
        (false, false, true),
        (true, false, false),
        (false, true, true),
        (true, true, true),
    ];
    for (low, high, inverted) in cases {
        let log = new_log();
        let mut gpio = strapped(&log, low, high);
        let mut conf = McConfiguration {
            m_invert_direction: !inverted,
        };
        init_mc_config(&mut gpio, &mut conf);
        assert_eq!(conf.m_invert_direction, inverted, "straps ({low}, {high})");
    }
}

#[test]
fn patched_config_in_static_cell() {
    let log = new_log();
    let mut gpio = strapped(&log, true, false);
    let conf: &'static mut McConfiguration =
        volley_core::mk_static!(McConfiguration, McConfiguration::default());

    init_mc_config(&mut gpio, conf);
    assert!(!conf.m_invert_direction);
}

#[test]
fn gpio_init_enables_clocks_then_pads() {
    let log = new_log();
    let mut gpio = FakeGpio::new(&log);

    init_gpio(&mut gpio);

    let pad = |port, pin| Pad::new(port, pin);
    let tim1 = PadMode::alternate_pushpull(AF_TIM1);
    let mut expected = vec![
        Event::Clock(Port::A),
        Event::Clock(Port::B),
        Event::Clock(Port::C),
        Event::Mode(LED_GREEN, PadMode::OUTPUT_PUSHPULL),
        Event::Mode(LED_RED, PadMode::OUTPUT_PUSHPULL),
        Event::Mode(GATE_ENABLE, PadMode::OUTPUT_PUSHPULL),
        Event::Write(GATE_ENABLE, PinState::Low),
        Event::Mode(DCCAL, PadMode::OUTPUT_PUSHPULL),
        Event::Mode(pad(Port::A, 8), tim1),
        Event::Mode(pad(Port::A, 9), tim1),
        Event::Mode(pad(Port::A, 10), tim1),
        Event::Mode(pad(Port::B, 13), tim1),
        Event::Mode(pad(Port::B, 14), tim1),
        Event::Mode(pad(Port::B, 15), tim1),
        Event::Mode(HALL_1, PadMode::INPUT_PULLUP),
        Event::Mode(HALL_2, PadMode::INPUT_PULLUP),
        Event::Mode(HALL_3, PadMode::INPUT_PULLUP),
        Event::Mode(FAULT, PadMode::INPUT_PULLUP),
    ];
    let analog = (0..=6)
        .map(|pin| pad(Port::A, pin))
        .chain([pad(Port::B, 0), pad(Port::B, 1)])
        .chain((0..=3).map(|pin| pad(Port::C, pin)));
    expected.extend(analog.map(|p| Event::Mode(p, PadMode::Analog)));

    assert_eq!(take(&log), expected);
    assert_eq!(expected.len(), 3 + VOLLEY_PAD_TABLE.len() + 1);
}

#[test]
fn gate_disabled_before_pwm_pads_are_routed() {
    let log = new_log();
    let mut gpio = FakeGpio::new(&log);

    init_gpio(&mut gpio);
    let events = take(&log);

    let gate_low = first(&events, |e| *e == Event::Write(GATE_ENABLE, PinState::Low));
    let gate_mode = first(&events, |e| matches!(e, Event::Mode(p, _) if *p == GATE_ENABLE));
    let dccal = first(&events, |e| matches!(e, Event::Mode(p, _) if *p == DCCAL));
    let pwm = first(&events, |e| {
        matches!(e, Event::Mode(_, m) if *m == PadMode::alternate_pushpull(AF_TIM1))
    });
    assert_eq!(gate_low, gate_mode + 1);
    assert!(gate_low < dccal);
    assert!(gate_low < pwm);
}

#[test]
fn pad_table_has_no_duplicates() {
    for (i, a) in VOLLEY_PAD_TABLE.iter().enumerate() {
        for b in &VOLLEY_PAD_TABLE[i + 1..] {
            assert_ne!(a.pad, b.pad, "{} listed twice", a.pad);
        }
    }
}

#[test]
fn adc_maps_in_table_order() {
    let log = new_log();
    let mut adc = FakeAdc::new(&log);

    setup_adc_channels(&mut adc);

    let programmed: Vec<(Adc, Sequence, u8, u8)> = take(&log)
        .into_iter()
        .map(|e| match e {
            Event::Adc(adc, seq, slot) => {
                assert_eq!(slot.sample_time, SampleTime::Cycles15);
                (adc, seq, slot.channel.0, slot.rank.get())
            }
            other => panic!("unexpected {other:?}"),
        })
        .collect();

    use Adc::*;
    use Sequence::*;
    assert_eq!(
        programmed,
        vec![
            (Adc1, Regular, 0, 1),
            (Adc1, Regular, 8, 2),
            (Adc1, Regular, 17, 3),
            (Adc1, Regular, 4, 4),
            (Adc2, Regular, 1, 1),
            (Adc2, Regular, 9, 2),
            (Adc2, Regular, 6, 3),
            (Adc2, Regular, 5, 4),
            (Adc3, Regular, 2, 1),
            (Adc3, Regular, 3, 2),
            (Adc3, Regular, 12, 3),
            (Adc3, Regular, 10, 4),
            (Adc1, Injected, 9, 1),
            (Adc1, Injected, 8, 2),
            (Adc2, Injected, 8, 1),
            (Adc2, Injected, 9, 2),
        ]
    );
}

#[test]
fn interleaved_buffer_positions() {
    assert_eq!(regular_buffer_index(Adc::Adc1, AdcChannel(0)), Some(0));
    assert_eq!(regular_buffer_index(Adc::Adc2, AdcChannel(1)), Some(1));
    assert_eq!(regular_buffer_index(Adc::Adc1, AdcChannel::VREFINT), Some(6));
    assert_eq!(regular_buffer_index(Adc::Adc3, AdcChannel(10)), Some(11));
    assert_eq!(regular_buffer_index(Adc::Adc2, AdcChannel(8)), None);
}

#[test]
fn rank_bounds() {
    assert_eq!(Rank::new(Sequence::Regular, 16).map(Rank::get), Ok(16));
    assert_eq!(
        Rank::new(Sequence::Injected, 5),
        Err(BoardError::InvalidRank {
            sequence: Sequence::Injected,
            rank: 5
        })
    );
    assert!(Rank::new(Sequence::Regular, 0).is_err());
}

#[test]
fn board_support_startup_order() {
    let log = new_log();
    let gpio = strapped(&log, false, true);
    let bus: I2cBus<NoopRawMutex, _, _, _> = I2cBus::new(
        VOLLEY_BUS_LINES,
        FakeGpio::new(&log),
        FakePeripheral::new(&log),
        FakeDelay::new(&log),
    );
    let mut board = BoardSupport::new(gpio, FakeAdc::new(&log));
    let mut app = AppConfiguration::default();
    let mut mc = McConfiguration::default();

    let id = block_on(board.init(&mut app, &mut mc, &bus));

    assert_eq!(id, BoardId::RIGHT);
    assert_eq!(app.controller_id, 12);
    assert!(mc.m_invert_direction);
    assert!(block_on(bus.is_running()));

    let events = take(&log);
    let clocks = first(&events, |e| matches!(e, Event::Clock(_)));
    let adc = first(&events, |e| matches!(e, Event::Adc(..)));
    let strap_read = first(&events, |e| matches!(e, Event::Read(_)));
    let bus_start = first(&events, |e| matches!(e, Event::PeriphStart(_)));
    assert!(clocks < adc && adc < strap_read && strap_read < bus_start);
}
