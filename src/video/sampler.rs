//! Cadence-controlled frame selection.

use crate::error::{NarratorError, Result};

/// Interval, in raw frames, between frames selected for description.
///
/// Always at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence(u64);

impl Cadence {
    /// Validate a directly supplied cycle. Zero and negative values are
    /// configuration errors, never coerced.
    pub fn new(cycle: i64) -> Result<Self> {
        if cycle <= 0 {
            return Err(NarratorError::InvalidCadence { cycle });
        }
        Ok(Self(cycle as u64))
    }

    /// Resolve the effective cadence.
    ///
    /// With a target output rate and a known positive source rate the cycle is
    /// `max(1, round(source_fps / target_fps))`. Otherwise the supplied cycle
    /// is used unchanged. The supplied cycle is validated either way.
    pub fn derive(cycle: i64, source_fps: Option<f64>, target_fps: Option<f64>) -> Result<Self> {
        let direct = Self::new(cycle)?;

        let Some(target) = target_fps else {
            return Ok(direct);
        };
        if !target.is_finite() || target <= 0.0 {
            return Err(NarratorError::InvalidTargetRate { fps: target });
        }

        match source_fps {
            Some(fps) if fps.is_finite() && fps > 0.0 => {
                let derived = (fps / target).round().max(1.0);
                Ok(Self(derived as u64))
            }
            _ => Ok(direct),
        }
    }

    pub fn frames(&self) -> u64 {
        self.0
    }

    /// A raw frame is eligible iff `index mod cycle == 0`.
    pub fn is_eligible(&self, index: u64) -> bool {
        index % self.0 == 0
    }
}

impl std::fmt::Display for Cadence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "every {} frame{}", self.0, if self.0 == 1 { "" } else { "s" })
    }
}

/// Selects eligible frames and numbers them in sampling order.
#[derive(Debug, Clone)]
pub struct FrameSampler {
    cadence: Cadence,
    sampled: u64,
}

impl FrameSampler {
    pub fn new(cadence: Cadence) -> Self {
        Self {
            cadence,
            sampled: 0,
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    /// Returns the sampled-sequence position if the raw frame is eligible.
    pub fn admit(&mut self, index: u64) -> Option<u64> {
        if !self.cadence.is_eligible(index) {
            return None;
        }
        let position = self.sampled;
        self.sampled += 1;
        Some(position)
    }

    /// Number of frames admitted so far.
    pub fn sampled(&self) -> u64 {
        self.sampled
    }
}
