use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::error::SinkError;
use crate::layout::{CENTER, ElectronSlot, Point, ShellSpec};

/// Delay between two full passes over the electrons.
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

/// Where the driver publishes electron positions.
///
/// Implementations must be idempotent: moving an electron to the same place
/// twice is harmless. A torn-down surface answers `SinkError::Unavailable`.
pub trait DisplaySink: Send + 'static {
    /// Move electron `index` (and its label) to `position`.
    fn move_electron(&mut self, index: usize, position: Point) -> Result<(), SinkError>;

    /// Called once after every full pass. Default is a no-op.
    fn end_tick(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Accumulated rotation per electron, zeroed on every start.
#[derive(Debug, Clone, PartialEq)]
pub struct RotationState {
    angles: Vec<f64>,
}

impl RotationState {
    pub fn new(electrons: usize) -> Self {
        RotationState {
            angles: vec![0.0; electrons],
        }
    }

    #[cfg(test)]
    pub fn angles(&self) -> &[f64] {
        &self.angles
    }

    /// Advance electron `i` by its shell's per-tick speed and return where it is now.
    pub fn step(&mut self, i: usize, slot: &ElectronSlot, shells: &[ShellSpec]) -> Point {
        let angle = &mut self.angles[i];
        *angle += shells[slot.shell_index].speed;
        slot.position(CENTER, shells, *angle)
    }

    /// One full pass: step every electron in order and publish it.
    pub fn tick<S: DisplaySink + ?Sized>(
        &mut self,
        slots: &[ElectronSlot],
        shells: &[ShellSpec],
        sink: &mut S,
    ) -> Result<(), SinkError> {
        for (i, slot) in slots.iter().enumerate() {
            let position = self.step(i, slot, shells);
            sink.move_electron(slot.index, position)?;
        }
        sink.end_tick()
    }
}

/// Lifecycle of the background rotation task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running,
    Stopping,
}

/// Sends the stop acknowledgement when the worker exits, including on unwind.
struct StopAck(Sender<()>);

impl Drop for StopAck {
    fn drop(&mut self) {
        let _ = self.0.send(());
    }
}

struct Worker {
    cancel: Arc<AtomicBool>,
    stopped: Receiver<()>,
    handle: JoinHandle<()>,
}

/// Owns at most one rotation worker thread.
///
/// `start`, `request_stop` and `await_stopped` are the whole control surface.
/// `start` on a live instance stops and joins it first, so two workers never
/// publish at the same time.
pub struct RotationDriver {
    shells: Vec<ShellSpec>,
    interval: Duration,
    worker: Option<Worker>,
}

impl RotationDriver {
    pub fn new(shells: &[ShellSpec]) -> Self {
        Self::with_interval(shells, TICK_INTERVAL)
    }

    pub fn with_interval(shells: &[ShellSpec], interval: Duration) -> Self {
        RotationDriver {
            shells: shells.to_vec(),
            interval,
            worker: None,
        }
    }

    pub fn state(&self) -> DriverState {
        match &self.worker {
            None => DriverState::Idle,
            Some(w) if w.handle.is_finished() => DriverState::Idle,
            Some(w) if w.cancel.load(Ordering::Acquire) => DriverState::Stopping,
            Some(_) => DriverState::Running,
        }
    }

    /// Begin rotating `slots` from zero, publishing to `sink`.
    pub fn start<S: DisplaySink>(&mut self, slots: Vec<ElectronSlot>, sink: S) {
        if self.worker.is_some() {
            self.request_stop();
            self.join_worker();
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let (ack_tx, ack_rx) = mpsc::channel();
        let shells = self.shells.clone();
        let interval = self.interval;
        let flag = Arc::clone(&cancel);
        let handle = thread::spawn(move || {
            let _ack = StopAck(ack_tx);
            run(slots, shells, sink, flag, interval);
        });

        self.worker = Some(Worker {
            cancel,
            stopped: ack_rx,
            handle,
        });
    }

    /// Ask the worker to exit after its current tick. Never blocks.
    pub fn request_stop(&self) {
        if let Some(w) = &self.worker {
            w.cancel.store(true, Ordering::Release);
        }
    }

    /// Wait up to `timeout` for the worker to acknowledge it has exited.
    /// Returns true when no worker is left running.
    pub fn await_stopped(&mut self, timeout: Duration) -> bool {
        let Some(worker) = self.worker.take() else {
            return true;
        };
        match worker.stopped.recv_timeout(timeout) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                if worker.handle.join().is_err() {
                    warn!("event=driver_join module=rotation status=error reason=worker_panicked");
                }
                true
            }
            Err(RecvTimeoutError::Timeout) => {
                self.worker = Some(worker);
                false
            }
        }
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take()
            && worker.handle.join().is_err()
        {
            warn!("event=driver_join module=rotation status=error reason=worker_panicked");
        }
    }
}

impl Drop for RotationDriver {
    fn drop(&mut self) {
        self.request_stop();
        self.join_worker();
    }
}

fn run<S: DisplaySink>(
    slots: Vec<ElectronSlot>,
    shells: Vec<ShellSpec>,
    mut sink: S,
    cancel: Arc<AtomicBool>,
    interval: Duration,
) {
    let mut state = RotationState::new(slots.len());
    let mut ticks: u64 = 0;
    info!(
        "event=driver_start module=rotation status=ok electrons={} interval_ms={}",
        slots.len(),
        interval.as_millis()
    );

    while !cancel.load(Ordering::Acquire) {
        let outcome =
            panic::catch_unwind(AssertUnwindSafe(|| state.tick(&slots, &shells, &mut sink)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(SinkError::Unavailable)) => {
                debug!("event=driver_stop module=rotation status=ok reason=sink_closed ticks={ticks}");
                return;
            }
            Ok(Err(err)) => {
                error!("event=driver_stop module=rotation status=error ticks={ticks} error={err}");
                return;
            }
            Err(payload) => {
                error!(
                    "event=driver_stop module=rotation status=error ticks={ticks} panic={}",
                    panic_message(payload.as_ref())
                );
                return;
            }
        }
        ticks += 1;
        thread::sleep(interval);
    }

    info!("event=driver_stop module=rotation status=ok reason=cancelled ticks={ticks}");
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{SHELLS, compute_layout};
    use parking_lot::Mutex;
    use std::f64::consts::TAU;
    use std::time::Instant;

    const FAST: Duration = Duration::from_millis(1);

    type Log = Arc<Mutex<Vec<(u32, usize)>>>;

    /// Records which writer touched which electron, in order.
    struct RecordingSink {
        writer: u32,
        log: Log,
        ticks: Arc<Mutex<u32>>,
    }

    impl DisplaySink for RecordingSink {
        fn move_electron(&mut self, index: usize, _position: Point) -> Result<(), SinkError> {
            self.log.lock().push((self.writer, index));
            Ok(())
        }

        fn end_tick(&mut self) -> Result<(), SinkError> {
            *self.ticks.lock() += 1;
            Ok(())
        }
    }

    fn recording(writer: u32, log: &Log) -> RecordingSink {
        RecordingSink {
            writer,
            log: Arc::clone(log),
            ticks: Arc::new(Mutex::new(0)),
        }
    }

    fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(1));
        }
        false
    }

    /// Fails after a fixed number of moves.
    struct FailingSink {
        moves_left: usize,
        error: SinkError,
    }

    impl DisplaySink for FailingSink {
        fn move_electron(&mut self, _index: usize, _position: Point) -> Result<(), SinkError> {
            if self.moves_left == 0 {
                return Err(self.error.clone());
            }
            self.moves_left -= 1;
            Ok(())
        }
    }

    /// Takes `delay` inside every move; `entered` flips on the first one.
    struct SlowSink {
        delay: Duration,
        entered: Arc<AtomicBool>,
    }

    impl DisplaySink for SlowSink {
        fn move_electron(&mut self, _index: usize, _position: Point) -> Result<(), SinkError> {
            self.entered.store(true, Ordering::Release);
            thread::sleep(self.delay);
            Ok(())
        }
    }

    struct PanickingSink;

    impl DisplaySink for PanickingSink {
        fn move_electron(&mut self, _index: usize, _position: Point) -> Result<(), SinkError> {
            panic!("surface exploded");
        }
    }

    #[test]
    fn rotation_returns_near_start_after_full_turn() {
        let slots = compute_layout(28, &SHELLS).unwrap();
        for shell_index in 0..SHELLS.len() {
            let slot = slots.iter().find(|s| s.shell_index == shell_index).unwrap();
            let speed = SHELLS[shell_index].speed;
            let ticks = (TAU / speed).round() as usize;

            let mut state = RotationState::new(1);
            let mut previous = 0.0;
            for _ in 0..ticks {
                state.step(0, slot, &SHELLS);
                assert!(state.angles()[0] > previous);
                previous = state.angles()[0];
            }
            let drift = (state.angles()[0] - TAU).abs();
            assert!(drift <= speed, "shell {shell_index} drifted {drift}");

            let start = slot.position(CENTER, &SHELLS, 0.0);
            let end = slot.position(CENTER, &SHELLS, state.angles()[0]);
            let arc = SHELLS[shell_index].radius * speed;
            assert!((start.x - end.x).hypot(start.y - end.y) <= arc);
        }
    }

    #[test]
    fn tick_publishes_every_slot_in_order() {
        let slots = compute_layout(5, &SHELLS).unwrap();
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut sink = recording(1, &log);
        let mut state = RotationState::new(slots.len());

        state.tick(&slots, &SHELLS, &mut sink).unwrap();

        let indices: Vec<usize> = log.lock().iter().map(|&(_, i)| i).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert_eq!(*sink.ticks.lock(), 1);
        assert!((state.angles()[0] - 0.05).abs() < 1e-12);
        assert!((state.angles()[4] - 0.03).abs() < 1e-12);
    }

    #[test]
    fn driver_moves_through_its_states() {
        let slots = compute_layout(3, &SHELLS).unwrap();
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut driver = RotationDriver::with_interval(&SHELLS, FAST);
        assert_eq!(driver.state(), DriverState::Idle);

        driver.start(slots, recording(1, &log));
        assert!(wait_until(|| !log.lock().is_empty()));
        assert_eq!(driver.state(), DriverState::Running);

        driver.request_stop();
        assert_ne!(driver.state(), DriverState::Running);
        assert!(driver.await_stopped(Duration::from_secs(2)));
        assert_eq!(driver.state(), DriverState::Idle);

        let written = log.lock().len();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(log.lock().len(), written);
    }

    #[test]
    fn await_stopped_without_worker_is_immediate() {
        let mut driver = RotationDriver::new(&SHELLS);
        driver.request_stop();
        assert!(driver.await_stopped(Duration::ZERO));
    }

    #[test]
    fn await_stopped_times_out_while_a_tick_is_in_flight() {
        let entered = Arc::new(AtomicBool::new(false));
        let mut driver = RotationDriver::with_interval(&SHELLS, FAST);
        driver.start(
            compute_layout(1, &SHELLS).unwrap(),
            SlowSink {
                delay: Duration::from_millis(300),
                entered: Arc::clone(&entered),
            },
        );
        assert!(wait_until(|| entered.load(Ordering::Acquire)));

        driver.request_stop();
        assert!(!driver.await_stopped(Duration::from_millis(50)));
        assert_eq!(driver.state(), DriverState::Stopping);

        assert!(driver.await_stopped(Duration::from_secs(2)));
        assert_eq!(driver.state(), DriverState::Idle);
    }

    #[test]
    fn restart_never_interleaves_two_writers() {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut driver = RotationDriver::with_interval(&SHELLS, FAST);

        driver.start(compute_layout(10, &SHELLS).unwrap(), recording(1, &log));
        assert!(wait_until(|| log.lock().len() >= 30));

        driver.start(compute_layout(10, &SHELLS).unwrap(), recording(2, &log));
        assert!(wait_until(|| log.lock().iter().filter(|&&(w, _)| w == 2).count() >= 30));

        driver.request_stop();
        assert!(driver.await_stopped(Duration::from_secs(2)));

        let log = log.lock();
        let first_second = log.iter().position(|&(w, _)| w == 2).unwrap();
        assert!(first_second > 0);
        assert!(log[..first_second].iter().all(|&(w, _)| w == 1));
        assert!(log[first_second..].iter().all(|&(w, _)| w == 2));
    }

    #[test]
    fn unavailable_sink_ends_the_driver_quietly() {
        let mut driver = RotationDriver::with_interval(&SHELLS, FAST);
        driver.start(
            compute_layout(4, &SHELLS).unwrap(),
            FailingSink {
                moves_left: 10,
                error: SinkError::Unavailable,
            },
        );
        assert!(driver.await_stopped(Duration::from_secs(2)));
        assert_eq!(driver.state(), DriverState::Idle);
    }

    #[test]
    fn sink_fault_ends_the_driver() {
        let mut driver = RotationDriver::with_interval(&SHELLS, FAST);
        driver.start(
            compute_layout(4, &SHELLS).unwrap(),
            FailingSink {
                moves_left: 2,
                error: SinkError::Fault("boom".into()),
            },
        );
        assert!(wait_until(|| driver.state() == DriverState::Idle));
        assert!(driver.await_stopped(Duration::from_secs(2)));
    }

    #[test]
    fn panic_inside_a_tick_is_contained() {
        let mut driver = RotationDriver::with_interval(&SHELLS, FAST);
        driver.start(compute_layout(1, &SHELLS).unwrap(), PanickingSink);
        assert!(driver.await_stopped(Duration::from_secs(2)));
        assert_eq!(driver.state(), DriverState::Idle);

        // A fresh start still works after a faulted run.
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        driver.start(compute_layout(1, &SHELLS).unwrap(), recording(7, &log));
        assert!(wait_until(|| !log.lock().is_empty()));
        driver.request_stop();
        assert!(driver.await_stopped(Duration::from_secs(2)));
    }
}
