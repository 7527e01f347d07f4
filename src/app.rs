//! Host-side controller tying layout, rotation and names together.
//!
//! Restarting on a new count always runs in this order: request stop, wait
//! for the acknowledgement, redraw and reset, then start the next worker.

use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};

use crate::error::AtomError;
use crate::layout::{ElectronSlot, ShellSpec, compute_layout, parse_count, shell_occupancy};
use crate::names::NameBinding;
use crate::rotation::{DriverState, RotationDriver};
use crate::scene::{Scene, SceneSink, SharedScene};

/// How long a restart waits for the previous worker before logging it as slow.
pub const STOP_GRACE: Duration = Duration::from_millis(100);

pub struct AtomApp {
    shells: Vec<ShellSpec>,
    scene: SharedScene,
    driver: RotationDriver,
    names: NameBinding,
    slots: Vec<ElectronSlot>,
}

impl AtomApp {
    pub fn new(shells: &[ShellSpec]) -> Self {
        Self::with_driver(shells, RotationDriver::new(shells))
    }

    pub fn with_driver(shells: &[ShellSpec], driver: RotationDriver) -> Self {
        AtomApp {
            shells: shells.to_vec(),
            scene: Scene::shared(shells),
            driver,
            names: NameBinding::new(0),
            slots: Vec::new(),
        }
    }

    /// Validate `raw` and rebuild the atom with that many electrons.
    /// Invalid input leaves the running animation untouched.
    pub fn confirm_count(&mut self, raw: &str) -> Result<usize, AtomError> {
        let count = parse_count(raw)?;
        let slots = compute_layout(count, &self.shells)?;

        self.halt_rotation();

        self.names.reset(count);
        self.scene.lock().draw_atom(&slots, &self.names);
        self.slots = slots.clone();
        self.driver.start(slots, SceneSink::new(Arc::clone(&self.scene)));

        info!(
            "event=count_confirmed module=app status=ok count={} shells={:?}",
            count,
            shell_occupancy(&self.slots, self.shells.len())
        );
        Ok(count)
    }

    /// Stop the current worker and block until it has exited.
    ///
    /// Waits `STOP_GRACE` first; a worker stuck in a slow tick is then waited
    /// on until it acknowledges, so nothing it publishes can land after return.
    fn halt_rotation(&mut self) {
        self.driver.request_stop();
        if self.driver.await_stopped(STOP_GRACE) {
            return;
        }
        warn!(
            "event=driver_restart module=app status=slow grace_ms={}",
            STOP_GRACE.as_millis()
        );
        while !self.driver.await_stopped(STOP_GRACE) {}
    }

    /// Confirm every electron's name at once and refresh the labels in place.
    pub fn confirm_names(&mut self, raw: &[String]) -> Result<(), AtomError> {
        if self.slots.is_empty() {
            return Err(AtomError::InvalidNames);
        }
        if let Err(err) = self.names.confirm(raw, self.slots.len()) {
            info!(
                "event=names_rejected module=app status=invalid expected={} given={}",
                self.slots.len(),
                raw.len()
            );
            return Err(err);
        }
        self.scene.lock().relabel(&self.names);
        info!("event=names_confirmed module=app status=ok count={}", self.names.len());
        Ok(())
    }

    pub fn electron_count(&self) -> usize {
        self.slots.len()
    }

    pub fn names(&self) -> &NameBinding {
        &self.names
    }

    pub fn scene(&self) -> &SharedScene {
        &self.scene
    }

    pub fn driver_state(&self) -> DriverState {
        self.driver.state()
    }

    /// Electrons per shell for the current atom.
    pub fn occupancy(&self) -> Vec<usize> {
        shell_occupancy(&self.slots, self.shells.len())
    }

    /// Tear down the surface and wait for the worker to notice.
    pub fn shutdown(&mut self) {
        self.scene.lock().close();
        self.driver.request_stop();
        if !self.driver.await_stopped(Duration::from_secs(1)) {
            warn!("event=shutdown module=app status=timeout");
        }
    }
}
