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

/* config.rs: the tunable parameter set for one ensemble run. */

use anyhow::{Context, Result, bail};

use crate::rates::{self, RateRamp};

/// Every tunable parameter of one simulation invocation. Built from the
/// command line, validated once, then passed read-only into each transcript
/// job.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub ribosome_count: usize,
    pub time_seconds: u32,
    pub ribo_size_nt: usize,
    pub transcript_count: u16,
    pub move_probability: f64,
    pub kI: RateRamp,
    pub kE: RateRamp,
    pub resolution: u32, // ticks per simulated second
    pub codon_size: usize,
    pub seed: Option<u64>,
}

impl SimulationConfig {
    /* Reject anything outside its declared domain before simulating. The only
       deliberate substitution is the rate floor (see rates.rs), which is a
       defined fallback rather than a clamp. */
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.move_probability) {
            bail!(
                "move probability must lie in [0, 1], got {}",
                self.move_probability
            );
        }
        if self.resolution == 0 {
            bail!("resolution must be at least 1 tick per second");
        }
        if self.codon_size == 0 {
            bail!("codon size must be a positive number of nucleotides");
        }
        if self.ribo_size_nt == 0 {
            bail!("ribosome footprint must be a positive number of nucleotides");
        }
        // Snapshot columns store the ribosome index as u16
        if self.ribosome_count > u16::MAX as usize {
            bail!("ribosome count per transcript cannot exceed {}", u16::MAX);
        }

        self.kI.validate().context("invalid initiation rate")?;
        self.kE.validate().context("invalid elongation rate")?;

        Ok(())
    }

    pub fn total_steps(&self) -> u64 {
        self.time_seconds as u64 * self.resolution as u64
    }

    /// Footprint in codon units. Rounds up: a partially covered codon still
    /// excludes a neighboring ribosome.
    pub fn footprint_codons(&self) -> i64 {
        self.ribo_size_nt.div_ceil(self.codon_size) as i64
    }

    pub fn rate_floor(&self) -> f64 {
        rates::rate_floor(self.resolution, self.codon_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rates::Window;

    fn base_config() -> SimulationConfig {
        SimulationConfig {
            ribosome_count: 10,
            time_seconds: 60,
            ribo_size_nt: 30,
            transcript_count: 100,
            move_probability: 0.5,
            kI: RateRamp::flat(1.0),
            kE: RateRamp::flat(10.0),
            resolution: 100,
            codon_size: 3,
            seed: None,
        }
    }

    #[test]
    fn accepts_a_sane_configuration() {
        assert!(base_config().validate().is_ok());
    }

    #[test]
    fn rejects_probability_outside_the_unit_interval() {
        let mut config = base_config();

        config.move_probability = -0.1;
        assert!(config.validate().is_err());

        config.move_probability = 1.5;
        assert!(config.validate().is_err());

        config.move_probability = f64::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_resolution_and_zero_codon_size() {
        let mut config = base_config();
        config.resolution = 0;
        assert!(config.validate().is_err());

        let mut config = base_config();
        config.codon_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_footprint() {
        let mut config = base_config();
        config.ribo_size_nt = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_negative_target_rates() {
        let mut config = base_config();
        config.kI = RateRamp::flat(-1.0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_reversed_ramp_windows() {
        let mut config = base_config();
        config.kE = RateRamp {
            target: 10.0,
            rise: Window { start: 50, critical: 20 },
            fall: Window::NEVER,
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn footprint_rounds_up_to_whole_codons() {
        let mut config = base_config();
        assert_eq!(config.footprint_codons(), 10);

        config.ribo_size_nt = 31;
        assert_eq!(config.footprint_codons(), 11);

        config.ribo_size_nt = 1;
        assert_eq!(config.footprint_codons(), 1);
    }

    #[test]
    fn total_steps_is_seconds_times_resolution() {
        let config = base_config();
        assert_eq!(config.total_steps(), 6_000);
    }
}
