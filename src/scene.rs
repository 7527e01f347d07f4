use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::SinkError;
use crate::layout::{
    CENTER, ELECTRON_RADIUS, ElectronSlot, NUCLEUS_RADIUS, Point, SCENE_SIZE, ShellSpec,
};
use crate::names::NameBinding;
use crate::render::Canvas;
use crate::rotation::DisplaySink;

const NUCLEUS_RGB: (u8, u8, u8) = (230, 40, 40);
const SHELL_RGB: (u8, u8, u8) = (150, 150, 150);
const ELECTRON_RGB: (u8, u8, u8) = (40, 90, 240);
const LABEL_RGB: (u8, u8, u8) = (255, 255, 255);

/// One drawn electron: where it is and what it says.
#[derive(Debug, Clone, PartialEq)]
pub struct ElectronShape {
    pub position: Point,
    pub label: String,
}

/// Everything currently on the atom surface, in scene coordinates.
///
/// The UI thread owns the structure (which electrons exist, their labels);
/// the rotation worker only moves existing electrons.
#[derive(Debug, Clone)]
pub struct Scene {
    shells: Vec<ShellSpec>,
    electrons: Vec<ElectronShape>,
    closed: bool,
}

pub type SharedScene = Arc<Mutex<Scene>>;

impl Scene {
    pub fn new(shells: &[ShellSpec]) -> Self {
        Scene {
            shells: shells.to_vec(),
            electrons: Vec::new(),
            closed: false,
        }
    }

    pub fn shared(shells: &[ShellSpec]) -> SharedScene {
        Arc::new(Mutex::new(Self::new(shells)))
    }

    /// Replace all electrons with the unrotated placement of `slots`.
    pub fn draw_atom(&mut self, slots: &[ElectronSlot], names: &NameBinding) {
        self.electrons = slots
            .iter()
            .map(|slot| ElectronShape {
                position: slot.position(CENTER, &self.shells, 0.0),
                label: names.label(slot.index),
            })
            .collect();
    }

    /// Update label text only; positions stay where the driver last put them.
    pub fn relabel(&mut self, names: &NameBinding) {
        for (i, electron) in self.electrons.iter_mut().enumerate() {
            electron.label = names.label(i);
        }
    }

    pub fn move_electron(&mut self, index: usize, position: Point) -> Result<(), SinkError> {
        if self.closed {
            return Err(SinkError::Unavailable);
        }
        match self.electrons.get_mut(index) {
            Some(e) => {
                e.position = position;
                Ok(())
            }
            None => Err(SinkError::Fault(format!("no electron at index {index}"))),
        }
    }

    /// Tear down the surface; further moves report `SinkError::Unavailable`.
    pub fn close(&mut self) {
        self.closed = true;
    }

    #[cfg(test)]
    pub fn electrons(&self) -> &[ElectronShape] {
        &self.electrons
    }

    /// Rasterize nucleus, shell guides, electrons and labels onto `canvas`,
    /// scaling the square scene to fit and correcting for pixel aspect.
    pub fn paint(&self, canvas: &mut Canvas) {
        canvas.clear();
        let aspect = canvas.pixel_aspect();
        let scale = (canvas.width as f64 / SCENE_SIZE).min(canvas.height as f64 * aspect / SCENE_SIZE);
        let cx = canvas.width as f64 * 0.5;
        let cy = canvas.height as f64 * 0.5;
        let to_canvas = |p: Point| {
            (
                cx + (p.x - CENTER.x) * scale,
                cy + (p.y - CENTER.y) * scale / aspect,
            )
        };

        for shell in &self.shells {
            let r = shell.radius * scale;
            canvas.stroke_ellipse(cx, cy, r, r / aspect, 0.35, SHELL_RGB);
        }

        let nr = NUCLEUS_RADIUS * scale;
        canvas.fill_ellipse(cx, cy, nr, nr / aspect, NUCLEUS_RGB);

        let er = ELECTRON_RADIUS * scale;
        for electron in &self.electrons {
            let (x, y) = to_canvas(electron.position);
            canvas.fill_ellipse(x, y, er, er / aspect, ELECTRON_RGB);
        }
        for electron in &self.electrons {
            let (x, y) = to_canvas(electron.position);
            canvas.put_label(x, y, &electron.label, LABEL_RGB);
        }
    }
}

/// Display sink handed to the rotation worker.
///
/// Positions from one pass are staged and committed under a single lock in
/// `end_tick`, so a painted frame never mixes two ticks.
pub struct SceneSink {
    scene: SharedScene,
    staged: Vec<(usize, Point)>,
}

impl SceneSink {
    pub fn new(scene: SharedScene) -> Self {
        SceneSink {
            scene,
            staged: Vec::new(),
        }
    }
}

impl DisplaySink for SceneSink {
    fn move_electron(&mut self, index: usize, position: Point) -> Result<(), SinkError> {
        self.staged.push((index, position));
        Ok(())
    }

    fn end_tick(&mut self) -> Result<(), SinkError> {
        let mut scene = self.scene.lock();
        let result = self
            .staged
            .drain(..)
            .try_for_each(|(index, position)| scene.move_electron(index, position));
        self.staged.clear();
        result
    }
}
