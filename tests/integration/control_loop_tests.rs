//! Control loop behaviour: transfer, hysteresis, alarm sub-loop and
//! fault tolerance, observed through the mock board's write history.

use std::sync::Arc;
use std::time::Duration;

use dimled::app::events::LoopEvent;
use dimled::config::LoopConfig;
use dimled::control::lifecycle::{Controller, Wiring};
use dimled::error::{HardwareError, SensorError};

use crate::mock_hw::{MockBoard, MockSensor, RecordingSink, approx, flash_writes, wait_for};

const FAST: embassy_time::Duration = embassy_time::Duration::from_millis(20);
const PATIENCE: Duration = Duration::from_secs(5);

struct Rig {
    controller: Controller<MockBoard, MockSensor>,
    board: MockBoard,
    sensor: Arc<MockSensor>,
    sink: Arc<RecordingSink>,
}

fn rig(board: MockBoard, sensor: MockSensor) -> Rig {
    let sink = Arc::new(RecordingSink::new());
    let sensor = Arc::new(sensor);
    let controller = Controller::new(sink.clone());
    controller.wire(Wiring {
        board: Arc::new(board.clone()),
        sensor: Arc::clone(&sensor),
        led_pin: "led".into(),
        config: LoopConfig::default().with_sample_period(FAST),
    });
    Rig {
        controller,
        board,
        sensor,
        sink,
    }
}

// ── Scenario A: fade, alarm, fade again ──────────────────────

#[test]
fn fade_then_alarm_then_fade() {
    let r = rig(MockBoard::new(), MockSensor::distances(&[0.8, 0.5, 0.05, 0.9]));
    assert_eq!(r.controller.start(), Ok(true));

    assert!(wait_for(PATIENCE, || r.board.write_count() >= 9));
    std::thread::sleep(Duration::from_millis(100));
    assert!(r.controller.stop());

    let duties = r.board.duties();
    assert_eq!(duties.len(), 9, "unexpected writes: {duties:?}");
    assert!(approx(duties[0], 0.05));
    assert!(approx(duties[1], 0.25));
    let flash: Vec<f64> = flash_writes().iter().map(|w| w.duty).collect();
    assert_eq!(duties[2..8], flash[..]);
    assert!(approx(duties[8], 0.05), "fade resumes after alarm");
    assert!(r.board.writes().iter().all(|w| w.frequency_hz == 1000));

    assert_eq!(
        r.sink.count(|e| matches!(e, LoopEvent::AlarmEntered { .. })),
        1
    );
    assert_eq!(
        r.sink.count(|e| matches!(e, LoopEvent::AlarmCleared { .. })),
        1
    );
    assert_eq!(
        r.sink.count(|e| matches!(e, LoopEvent::DutyApplied { .. })),
        3
    );
}

// ── Hysteresis ───────────────────────────────────────────────

#[test]
fn jitter_within_hysteresis_writes_once() {
    // 0.5 → 0.25, 0.505 → 0.245 (Δ 0.005), 0.3 → 0.49
    let r = rig(MockBoard::new(), MockSensor::distances(&[0.5, 0.505, 0.3]));
    r.controller.start().unwrap();

    assert!(wait_for(PATIENCE, || r.sensor.reads() >= 6));
    r.controller.stop();

    let duties = r.board.duties();
    assert_eq!(duties.len(), 2, "unexpected writes: {duties:?}");
    assert!(approx(duties[0], 0.25));
    assert!(approx(duties[1], 0.49));
}

#[test]
fn steady_reading_writes_only_once() {
    let r = rig(MockBoard::new(), MockSensor::fixed(0.6));
    r.controller.start().unwrap();

    assert!(wait_for(PATIENCE, || r.sensor.reads() >= 10));
    r.controller.stop();
    assert_eq!(r.board.write_count(), 1);
}

// ── Scenario D: sensor fault skips one iteration ─────────────

#[test]
fn sensor_fault_skips_iteration_and_loop_continues() {
    let sensor = MockSensor::scripted([
        Ok(0.5),
        Err(SensorError::ReadFailed("timeout".into())),
        Ok(0.2),
    ]);
    let r = rig(MockBoard::new(), sensor);
    r.controller.start().unwrap();

    assert!(wait_for(PATIENCE, || r.board.write_count() >= 2));
    assert!(r.controller.is_running());
    r.controller.stop();

    let duties = r.board.duties();
    assert_eq!(duties.len(), 2);
    assert!(approx(duties[0], 0.25));
    assert!(approx(duties[1], 0.64));
    assert_eq!(
        r.sink.count(|e| matches!(e, LoopEvent::SensorFault(SensorError::ReadFailed(_)))),
        1
    );
}

#[test]
fn nan_reading_is_a_sensor_fault() {
    let r = rig(MockBoard::new(), MockSensor::distances(&[f64::NAN, 0.5]));
    r.controller.start().unwrap();

    assert!(wait_for(PATIENCE, || r.board.write_count() >= 1));
    r.controller.stop();

    assert!(approx(r.board.duties()[0], 0.25));
    assert_eq!(
        r.sink.count(|e| *e == LoopEvent::SensorFault(SensorError::NotANumber)),
        1
    );
}

// ── Hardware faults ──────────────────────────────────────────

#[test]
fn failed_write_is_retried_with_same_duty() {
    let board = MockBoard::new();
    board.fail_next_writes(1);
    let r = rig(board, MockSensor::fixed(0.5));
    r.controller.start().unwrap();

    assert!(wait_for(PATIENCE, || r.board.write_count() >= 1));
    r.controller.stop();

    assert_eq!(r.board.attempts(), 2);
    assert_eq!(r.board.duties(), vec![0.25]);
    assert_eq!(
        r.sink.count(|e| matches!(e, LoopEvent::HardwareFault(HardwareError::WriteFailed(_)))),
        1
    );
}

#[test]
fn missing_pin_is_retried_without_ending_the_loop() {
    let r = rig(MockBoard::without_pins(), MockSensor::fixed(0.5));
    r.controller.start().unwrap();

    assert!(wait_for(PATIENCE, || {
        r.sink
            .count(|e| matches!(e, LoopEvent::HardwareFault(HardwareError::PinNotFound(_))))
            >= 3
    }));
    assert!(r.controller.is_running());
    assert!(r.controller.stop());

    assert_eq!(r.sensor.reads(), 0);
    assert_eq!(r.sink.count(|e| matches!(e, LoopEvent::PinAcquired { .. })), 0);
    assert_eq!(r.sink.events().last(), Some(&LoopEvent::Stopped));
}

// ── Alarm sub-loop ───────────────────────────────────────────

#[test]
fn alarm_keeps_flashing_while_close() {
    let r = rig(MockBoard::new(), MockSensor::fixed(0.05));
    r.controller.start().unwrap();

    // Two full flash sequences, no fading writes in between.
    assert!(wait_for(PATIENCE, || r.board.write_count() >= 12));
    r.controller.stop();

    let duties = r.board.duties();
    assert!(duties.iter().all(|&d| d == 1.0 || d == 0.0), "{duties:?}");
    assert_eq!(
        r.sink.count(|e| matches!(e, LoopEvent::AlarmEntered { .. })),
        1
    );
    assert_eq!(
        r.sink.count(|e| matches!(e, LoopEvent::AlarmCleared { .. })),
        0
    );
}
