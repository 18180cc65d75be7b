//! Lifecycle controller: idempotent start/stop, prompt cancellation,
//! self-test and restart semantics.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dimled::app::events::LoopEvent;
use dimled::config::LoopConfig;
use dimled::control::lifecycle::{Controller, Wiring};
use dimled::error::LifecycleError;
use futures_lite::future::block_on;

use crate::mock_hw::{MockBoard, MockSensor, RecordingSink, flash_writes, wait_for};

const PATIENCE: Duration = Duration::from_secs(5);

fn controller(
    board: &MockBoard,
    sensor: MockSensor,
) -> (Controller<MockBoard, MockSensor>, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let c = Controller::new(sink.clone());
    c.wire(Wiring {
        board: Arc::new(board.clone()),
        sensor: Arc::new(sensor),
        led_pin: "led".into(),
        config: LoopConfig::default(),
    });
    (c, sink)
}

#[test]
fn double_start_runs_one_loop() {
    let board = MockBoard::new();
    let (c, sink) = controller(&board, MockSensor::fixed(0.5));

    assert_eq!(c.start(), Ok(true));
    assert_eq!(c.start(), Ok(false));
    assert!(wait_for(PATIENCE, || board.write_count() >= 1));
    std::thread::sleep(Duration::from_millis(300));
    assert!(c.stop());

    assert_eq!(sink.count(|e| *e == LoopEvent::Started), 1);
    assert_eq!(sink.count(|e| *e == LoopEvent::Stopped), 1);
    assert_eq!(board.write_count(), 1);
}

#[test]
fn double_stop_is_safe() {
    let board = MockBoard::new();
    let (c, _) = controller(&board, MockSensor::fixed(0.5));
    c.start().unwrap();
    assert!(c.stop());
    assert!(!c.stop());
    assert!(!c.is_running());
}

#[test]
fn stop_interrupts_cadence_sleep_promptly() {
    let board = MockBoard::new();
    let (c, _) = controller(&board, MockSensor::fixed(0.5));
    c.start().unwrap();
    assert!(wait_for(PATIENCE, || board.write_count() >= 1));

    let begin = Instant::now();
    c.stop();
    assert!(begin.elapsed() < Duration::from_millis(150), "{:?}", begin.elapsed());
}

#[test]
fn stop_mid_flash_leaves_no_trailing_writes() {
    let board = MockBoard::new();
    let (c, _) = controller(&board, MockSensor::fixed(0.02));
    c.start().unwrap();
    assert!(wait_for(PATIENCE, || board.write_count() >= 1));

    let begin = Instant::now();
    c.stop();
    assert!(begin.elapsed() < Duration::from_millis(150));

    let after_stop = board.write_count();
    std::thread::sleep(Duration::from_millis(500));
    assert_eq!(board.write_count(), after_stop);
    assert!(after_stop < 6, "flash sequence should have been cut short");
}

#[test]
fn restart_resets_actuator_state() {
    let board = MockBoard::new();
    let (c, sink) = controller(&board, MockSensor::fixed(0.5));

    c.start().unwrap();
    assert!(wait_for(PATIENCE, || board.write_count() >= 1));
    c.stop();
    c.start().unwrap();
    assert!(wait_for(PATIENCE, || board.write_count() >= 2));
    c.stop();

    // Same duty, rewritten because the new run starts from Idle.
    assert_eq!(board.duties(), vec![0.25, 0.25]);
    assert_eq!(sink.count(|e| *e == LoopEvent::Started), 2);
}

#[test]
fn test_flash_while_stopped() {
    let board = MockBoard::new();
    let (c, _) = controller(&board, MockSensor::fixed(0.5));

    let begin = Instant::now();
    assert_eq!(block_on(c.test()), Ok(()));
    assert!(begin.elapsed() >= Duration::from_millis(1100));
    assert_eq!(board.writes(), flash_writes());
    assert!(!c.is_running());
}

#[test]
fn test_is_not_interrupted_by_stop() {
    let board = MockBoard::new();
    let (c, _) = controller(&board, MockSensor::fixed(0.5));
    let c = Arc::new(c);

    let tester = {
        let c = Arc::clone(&c);
        std::thread::spawn(move || block_on(c.test()))
    };
    std::thread::sleep(Duration::from_millis(100));
    c.stop();
    assert_eq!(tester.join().unwrap(), Ok(()));
    assert_eq!(board.write_count(), 6);
}

#[test]
fn shutdown_cancels_a_running_test() {
    let board = MockBoard::new();
    let (c, _) = controller(&board, MockSensor::fixed(0.5));
    let c = Arc::new(c);

    let tester = {
        let c = Arc::clone(&c);
        std::thread::spawn(move || block_on(c.test()))
    };
    std::thread::sleep(Duration::from_millis(100));
    c.shutdown();
    assert!(matches!(
        tester.join().unwrap(),
        Err(LifecycleError::Cancelled(_))
    ));
    assert!(board.write_count() < 6);
}

#[test]
fn rewiring_stops_the_running_loop() {
    let board = MockBoard::new();
    let (c, _) = controller(&board, MockSensor::fixed(0.5));
    c.start().unwrap();
    assert!(c.is_running());

    c.wire(Wiring {
        board: Arc::new(board.clone()),
        sensor: Arc::new(MockSensor::fixed(0.3)),
        led_pin: "led".into(),
        config: LoopConfig::default(),
    });
    assert!(!c.is_running());
}

// ── Concurrent callers ───────────────────────────────────────

fn fast_wiring(board: &MockBoard, sensor: &Arc<MockSensor>) -> Wiring<MockBoard, MockSensor> {
    Wiring {
        board: Arc::new(board.clone()),
        sensor: Arc::clone(sensor),
        led_pin: "led".into(),
        config: LoopConfig::default()
            .with_sample_period(embassy_time::Duration::from_millis(10)),
    }
}

fn live_loops(sink: &RecordingSink) -> usize {
    let started = sink.count(|e| *e == LoopEvent::Started);
    let stopped = sink.count(|e| *e == LoopEvent::Stopped);
    started.saturating_sub(stopped)
}

#[test]
fn concurrent_start_stop_and_rewire_leave_one_loop_on_latest_wiring() {
    let board = MockBoard::new();
    let old = Arc::new(MockSensor::fixed(0.5));
    let new = Arc::new(MockSensor::fixed(0.3));
    let sink = Arc::new(RecordingSink::new());
    let c = Arc::new(Controller::new(sink.clone()));
    c.wire(fast_wiring(&board, &old));
    c.start().unwrap();

    let starter = {
        let c = Arc::clone(&c);
        std::thread::spawn(move || {
            for _ in 0..300 {
                let _ = c.start();
            }
        })
    };
    let stopper = {
        let c = Arc::clone(&c);
        std::thread::spawn(move || {
            for _ in 0..100 {
                c.stop();
                std::thread::yield_now();
            }
        })
    };
    for round in 0..40 {
        let sensor = if round % 2 == 0 { &new } else { &old };
        c.wire(fast_wiring(&board, sensor));
        let _ = c.start();
        assert!(live_loops(&sink) <= 1, "more than one loop alive");
    }
    c.wire(fast_wiring(&board, &new));
    starter.join().unwrap();
    stopper.join().unwrap();
    c.start().unwrap();

    assert!(wait_for(PATIENCE, || live_loops(&sink) == 1));
    let old_reads = old.reads();
    let new_reads = new.reads();
    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(old.reads(), old_reads, "a loop is still reading the old sensor");
    assert!(new.reads() > new_reads);

    assert!(c.stop());
    assert_eq!(live_loops(&sink), 0);
}

#[test]
fn start_from_many_threads_spawns_one_loop() {
    let board = MockBoard::new();
    let sensor = Arc::new(MockSensor::fixed(0.5));
    let sink = Arc::new(RecordingSink::new());
    let c = Arc::new(Controller::new(sink.clone()));
    c.wire(fast_wiring(&board, &sensor));

    let started: usize = (0..8)
        .map(|_| {
            let c = Arc::clone(&c);
            std::thread::spawn(move || c.start() == Ok(true))
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|h| usize::from(h.join().unwrap()))
        .sum();
    assert_eq!(started, 1);

    assert!(wait_for(PATIENCE, || live_loops(&sink) == 1));
    c.stop();
    assert_eq!(sink.count(|e| *e == LoopEvent::Started), 1);
}
