/***
STEP'LTON: discrete-time simulation of polysome translation
    Copyright (C) 2026 Andrew T. Martens

    This program is free software: you can redistribute it and/or modify
    it under the terms of the GNU Affero General Public License, version 3,
    as published by the Free Software Foundation.

    This program is distributed in the hope that it will be useful,
    but WITHOUT ANY WARRANTY; without even the implied warranty of
    MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
    GNU Affero General Public License for more details.

    You should have received a copy of the GNU Affero General Public License
    along with this program.  If not, see <https://www.gnu.org/licenses/>.

e-mail: steplton@logical.bio
***/

/* rates.rs: piecewise-linear rate ramps for initiation & elongation. */

use anyhow::{Result, bail};

/// A ramp window, both bounds in timesteps. `start == critical` collapses the
/// ramp into an instantaneous jump at the boundary tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: u64,
    pub critical: u64,
}

impl Window {
    /// A window that never opens. Used as the default ramp-down so a rate
    /// holds its target for the whole run.
    pub const NEVER: Window = Window {
        start: u64::MAX,
        critical: u64::MAX,
    };
}

/// One rate schedule: floor until the rise window, linear up to `target`
/// across it, hold, then linear back down to the floor across the fall window.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateRamp {
    pub target: f64, // attempts per second
    pub rise: Window,
    pub fall: Window,
}

impl RateRamp {
    /// A rate that snaps to `target` at tick 0 and never ramps down.
    pub fn flat(target: f64) -> RateRamp {
        RateRamp {
            target,
            rise: Window { start: 0, critical: 0 },
            fall: Window::NEVER,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.target.is_finite() || self.target < 0.0 {
            bail!("target rate must be a finite non-negative number, got {}", self.target);
        }
        if self.rise.start > self.rise.critical {
            bail!(
                "ramp-up window ends before it starts ({} > {})",
                self.rise.start, self.rise.critical
            );
        }
        if self.fall.start > self.fall.critical {
            bail!(
                "ramp-down window ends before it starts ({} > {})",
                self.fall.start, self.fall.critical
            );
        }

        Ok(())
    }

    /* Effective rate at a timestep. Any computed value of exactly zero --
       including the first tick of a rise window -- is replaced by the floor,
       so the rate can always be converted to a tick interval. */
    pub fn rate_at(&self, t_step: u64, floor: f64) -> f64 {
        let value = if t_step < self.rise.start {
            floor
        } else if t_step < self.rise.critical {
            let slope = self.target / (self.rise.critical - self.rise.start) as f64;
            slope * (t_step - self.rise.start) as f64
        } else if t_step < self.fall.start {
            self.target
        } else if t_step < self.fall.critical {
            let slope = self.target / (self.fall.critical - self.fall.start) as f64;
            self.target - slope * (t_step - self.fall.start) as f64
        } else {
            floor
        };

        if value <= 0.0 { floor } else { value.max(floor) }
    }
}

/// Smallest representable rate: resolution^(-codon_size). Stands in for zero
/// wherever a rate of exactly zero would make the interval conversion divide
/// by zero.
pub fn rate_floor(resolution: u32, codon_size: usize) -> f64 {
    (resolution as f64).powi(-(codon_size as i32))
}

/// Ticks between offered attempt windows: floor(resolution / rate), never
/// less than one tick. Rates above `resolution` saturate at a window every
/// tick; rates at the floor push the next window past any practical run.
pub fn gate_interval(rate: f64, resolution: u32) -> u64 {
    let ticks = (resolution as f64 / rate).floor();

    if ticks <= 1.0 {
        1
    } else if ticks >= u64::MAX as f64 {
        u64::MAX
    } else {
        ticks as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn floor_is_resolution_to_the_minus_codon_size() {
        let floor = rate_floor(100, 3);
        assert!((floor - 1e-6).abs() < 1e-12);
    }

    #[test]
    fn rise_start_yields_floor_not_zero() {
        // A ramp from 0 to 10 over ticks 0..10 computes 0.0 at its first tick.
        let ramp = RateRamp {
            target: 10.0,
            rise: Window { start: 0, critical: 10 },
            fall: Window::NEVER,
        };
        let floor = rate_floor(100, 3);

        let rate = ramp.rate_at(0, floor);
        assert_eq!(rate, floor);
        assert!(gate_interval(rate, 100) > 0);
    }

    #[test]
    fn rise_is_linear_then_holds_at_target() {
        let ramp = RateRamp {
            target: 10.0,
            rise: Window { start: 10, critical: 20 },
            fall: Window::NEVER,
        };
        let floor = rate_floor(100, 3);

        assert_eq!(ramp.rate_at(9, floor), floor);
        assert!((ramp.rate_at(15, floor) - 5.0).abs() < 1e-9);
        assert!((ramp.rate_at(19, floor) - 9.0).abs() < 1e-9);
        assert_eq!(ramp.rate_at(20, floor), 10.0);
        assert_eq!(ramp.rate_at(10_000, floor), 10.0);
    }

    #[test]
    fn fall_ramps_back_down_to_the_floor() {
        let ramp = RateRamp {
            target: 8.0,
            rise: Window { start: 0, critical: 0 },
            fall: Window { start: 100, critical: 108 },
        };
        let floor = rate_floor(100, 3);

        assert_eq!(ramp.rate_at(99, floor), 8.0);
        assert!((ramp.rate_at(104, floor) - 4.0).abs() < 1e-9);
        assert_eq!(ramp.rate_at(108, floor), floor);
        assert_eq!(ramp.rate_at(10_000, floor), floor);
    }

    #[test]
    fn zero_duration_windows_snap() {
        let ramp = RateRamp {
            target: 5.0,
            rise: Window { start: 30, critical: 30 },
            fall: Window { start: 60, critical: 60 },
        };
        let floor = rate_floor(100, 3);

        assert_eq!(ramp.rate_at(29, floor), floor);
        assert_eq!(ramp.rate_at(30, floor), 5.0);
        assert_eq!(ramp.rate_at(59, floor), 5.0);
        assert_eq!(ramp.rate_at(60, floor), floor);
    }

    #[test]
    fn rate_stays_between_floor_and_target_everywhere() {
        let ramp = RateRamp {
            target: 12.0,
            rise: Window { start: 5, critical: 40 },
            fall: Window { start: 200, critical: 260 },
        };
        let floor = rate_floor(100, 3);

        for t_step in 0..500 {
            let rate = ramp.rate_at(t_step, floor);
            assert!(rate >= floor, "rate {} below floor at tick {}", rate, t_step);
            assert!(rate <= ramp.target, "rate {} above target at tick {}", rate, t_step);
        }
    }

    #[test]
    fn zero_target_pins_the_rate_to_the_floor() {
        let ramp = RateRamp::flat(0.0);
        let floor = rate_floor(100, 3);

        assert_eq!(ramp.rate_at(0, floor), floor);
        assert_eq!(ramp.rate_at(1_000, floor), floor);
    }

    #[test]
    fn gate_interval_never_divides_by_zero_and_never_returns_zero() {
        let floor = rate_floor(100, 3);

        assert_eq!(gate_interval(floor, 100), 100_000_000);
        assert_eq!(gate_interval(100.0, 100), 1);
        assert_eq!(gate_interval(250.0, 100), 1); // saturates above resolution
        assert_eq!(gate_interval(25.0, 100), 4);
        assert_eq!(gate_interval(3.0, 100), 33);
    }
}
