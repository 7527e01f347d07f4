use std::f64::consts::TAU;

use crate::error::AtomError;

/// Highest electron count the shell table can hold (2 + 8 + 18).
pub const MAX_ELECTRONS: usize = 28;

/// One concentric ring of the atom.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShellSpec {
    /// Maximum electrons this shell holds
    pub capacity: usize,
    /// Ring radius in scene units
    pub radius: f64,
    /// Radians added to each electron's angle per tick
    pub speed: f64,
}

/// Fixed shell table, innermost first. Capacities sum to `MAX_ELECTRONS`.
pub const SHELLS: [ShellSpec; 3] = [
    ShellSpec { capacity: 2, radius: 80.0, speed: 0.05 },
    ShellSpec { capacity: 8, radius: 120.0, speed: 0.03 },
    ShellSpec { capacity: 18, radius: 160.0, speed: 0.02 },
];

/// Scene is a fixed 400x400 square; everything is drawn around its center.
pub const SCENE_SIZE: f64 = 400.0;
pub const CENTER: Point = Point { x: 200.0, y: 200.0 };
pub const NUCLEUS_RADIUS: f64 = 20.0;
pub const ELECTRON_RADIUS: f64 = 10.0;

/// A position in scene coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

/// Where one electron sits before any rotation is applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElectronSlot {
    /// Global 0-based electron index
    pub index: usize,
    pub shell_index: usize,
    pub index_within_shell: usize,
    /// Even-spacing angle within the shell, radians
    pub base_angle: f64,
}

impl ElectronSlot {
    /// Screen position after `rotation` radians of accumulated spin.
    pub fn position(&self, center: Point, shells: &[ShellSpec], rotation: f64) -> Point {
        let radius = shells[self.shell_index].radius;
        let angle = self.base_angle + rotation;
        Point {
            x: center.x + radius * angle.cos(),
            y: center.y + radius * angle.sin(),
        }
    }
}

/// Place `count` electrons on `shells`, filling each shell completely before
/// the next one receives any.
pub fn compute_layout(count: usize, shells: &[ShellSpec]) -> Result<Vec<ElectronSlot>, AtomError> {
    let total_capacity: usize = shells.iter().map(|s| s.capacity).sum();
    if count == 0 || count > MAX_ELECTRONS || count > total_capacity {
        return Err(count_out_of_range());
    }

    let mut slots = Vec::with_capacity(count);
    let mut remaining = count;
    for (shell_index, shell) in shells.iter().enumerate() {
        if remaining == 0 {
            break;
        }
        let in_shell = remaining.min(shell.capacity);
        if in_shell == 0 {
            continue;
        }
        for j in 0..in_shell {
            slots.push(ElectronSlot {
                index: slots.len(),
                shell_index,
                index_within_shell: j,
                base_angle: TAU * j as f64 / in_shell as f64,
            });
        }
        remaining -= in_shell;
    }
    Ok(slots)
}

/// Parse the text typed into the count field.
pub fn parse_count(raw: &str) -> Result<usize, AtomError> {
    let count: i64 = raw
        .trim()
        .parse()
        .map_err(|_| AtomError::InvalidCount("Please enter a valid number".into()))?;
    if !(1..=MAX_ELECTRONS as i64).contains(&count) {
        return Err(count_out_of_range());
    }
    Ok(count as usize)
}

/// Electrons per shell for a computed layout.
pub fn shell_occupancy(slots: &[ElectronSlot], shell_count: usize) -> Vec<usize> {
    let mut counts = vec![0; shell_count];
    for slot in slots {
        if let Some(c) = counts.get_mut(slot.shell_index) {
            *c += 1;
        }
    }
    counts
}

fn count_out_of_range() -> AtomError {
    AtomError::InvalidCount(format!("Electron count must be between 1 and {MAX_ELECTRONS}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    const EPS: f64 = 1e-9;

    #[test]
    fn every_valid_count_yields_that_many_slots() {
        for count in 1..=MAX_ELECTRONS {
            let slots = compute_layout(count, &SHELLS).unwrap();
            assert_eq!(slots.len(), count);
            for (i, slot) in slots.iter().enumerate() {
                assert_eq!(slot.index, i);
            }
        }
    }

    #[test]
    fn out_of_range_counts_are_rejected() {
        for count in [0, 29, 100] {
            let err = compute_layout(count, &SHELLS).unwrap_err();
            assert!(matches!(err, AtomError::InvalidCount(_)));
            assert!(err.to_string().contains("between 1 and 28"));
        }
    }

    #[test]
    fn shells_fill_in_capacity_order() {
        let five = compute_layout(5, &SHELLS).unwrap();
        assert_eq!(shell_occupancy(&five, SHELLS.len()), vec![2, 3, 0]);

        let twelve = compute_layout(12, &SHELLS).unwrap();
        assert_eq!(shell_occupancy(&twelve, SHELLS.len()), vec![2, 8, 2]);

        for count in 1..=MAX_ELECTRONS {
            let occ = shell_occupancy(&compute_layout(count, &SHELLS).unwrap(), SHELLS.len());
            for (i, shell) in SHELLS.iter().enumerate() {
                assert!(occ[i] <= shell.capacity);
                if i + 1 < SHELLS.len() && occ[i + 1] > 0 {
                    assert_eq!(occ[i], shell.capacity, "count {count}: shell {i} not full");
                }
            }
        }
    }

    #[test]
    fn base_angles_are_evenly_spaced() {
        let slots = compute_layout(2, &SHELLS).unwrap();
        assert!((slots[0].base_angle - 0.0).abs() < EPS);
        assert!((slots[1].base_angle - PI).abs() < EPS);

        let slots = compute_layout(10, &SHELLS).unwrap();
        let second: Vec<_> = slots.iter().filter(|s| s.shell_index == 1).collect();
        assert_eq!(second.len(), 8);
        for (j, slot) in second.iter().enumerate() {
            assert_eq!(slot.index_within_shell, j);
            assert!((slot.base_angle - j as f64 * PI / 4.0).abs() < EPS);
        }
    }

    #[test]
    fn single_electron_sits_on_inner_shell_at_zero() {
        let slots = compute_layout(1, &SHELLS).unwrap();
        assert_eq!(slots.len(), 1);
        let slot = slots[0];
        assert_eq!(slot.shell_index, 0);
        assert_eq!(slot.base_angle, 0.0);

        let p = slot.position(CENTER, &SHELLS, 0.0);
        assert!((p.x - 280.0).abs() < EPS);
        assert!((p.y - 200.0).abs() < EPS);

        let p = slot.position(CENTER, &SHELLS, PI / 2.0);
        assert!((p.x - 200.0).abs() < EPS);
        assert!((p.y - 280.0).abs() < EPS);
    }

    #[test]
    fn parse_count_trims_and_validates() {
        assert_eq!(parse_count(" 12 ").unwrap(), 12);
        assert_eq!(
            parse_count("abc").unwrap_err(),
            AtomError::InvalidCount("Please enter a valid number".into())
        );
        assert!(parse_count("").is_err());
        assert!(parse_count("-3").unwrap_err().to_string().contains("between"));
        assert!(parse_count("29").is_err());
    }

    #[test]
    fn shell_table_holds_max_electrons() {
        let total: usize = SHELLS.iter().map(|s| s.capacity).sum();
        assert_eq!(total, MAX_ELECTRONS);
    }
}
