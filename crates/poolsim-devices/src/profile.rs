//! Per-stage service-time distributions.

use poolsim_types::StageKind;
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::Serialize;
use std::time::Duration;

/// Service-time distribution for one stage kind: a normal draw clipped
/// to the equipment's physical bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ServiceProfile {
    /// Mean service time, seconds.
    pub mean: f64,

    /// Standard deviation, seconds.
    pub std_dev: f64,

    /// Lower clip, seconds. Keeps pathological draws above the
    /// equipment's minimum cycle.
    pub min: f64,

    /// Upper clip, seconds.
    pub max: f64,

    /// Batches one unit can service concurrently.
    pub slots: usize,
}

impl ServiceProfile {
    /// Reference-line profile for `kind`.
    ///
    /// Separation covers the full centrifuge cycle: spin-up and
    /// spin-down allowances are folded into the mean and bounds.
    pub fn for_stage(kind: StageKind) -> Self {
        let (mean, std_dev, min, max, slots) = match kind {
            StageKind::Scan => (5.0, 0.5, 1.0, 10.0, 1),
            StageKind::Separate => (215.0, 10.0, 155.0, 295.0, 4),
            StageKind::Extract => (90.0, 5.0, 60.0, 120.0, 2),
            StageKind::Express => (120.0, 8.0, 90.0, 180.0, 1),
            StageKind::Agitate => (3600.0, 180.0, 3000.0, 4500.0, 8),
            StageKind::Connect => (45.0, 5.0, 30.0, 90.0, 1),
            StageKind::Pool => (300.0, 20.0, 240.0, 420.0, 1),
            StageKind::QualityControl => (240.0, 15.0, 180.0, 330.0, 2),
            StageKind::Label => (60.0, 5.0, 45.0, 90.0, 1),
            StageKind::Store => (7200.0, 600.0, 3600.0, 10800.0, 20),
            StageKind::Verify => (8.0, 1.0, 5.0, 12.0, 1),
            StageKind::Ship => (180.0, 15.0, 120.0, 270.0, 2),
        };
        Self {
            mean,
            std_dev,
            min,
            max,
            slots,
        }
    }

    /// Draw one service time.
    pub fn sample(&self, rng: &mut impl Rng) -> Duration {
        let normal =
            Normal::new(self.mean, self.std_dev).expect("service profile std_dev is finite");
        let secs = normal.sample(rng).clamp(self.min, self.max);
        Duration::from_secs_f64(secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poolsim_types::STAGE_ORDER;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_samples_respect_clip_bounds() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for kind in STAGE_ORDER {
            let profile = ServiceProfile::for_stage(kind);
            for _ in 0..200 {
                let t = profile.sample(&mut rng).as_secs_f64();
                assert!(t >= profile.min, "{kind}: {t} below {}", profile.min);
                assert!(t <= profile.max, "{kind}: {t} above {}", profile.max);
            }
        }
    }

    #[test]
    fn test_profiles_have_sane_bounds() {
        for kind in STAGE_ORDER {
            let p = ServiceProfile::for_stage(kind);
            assert!(p.min > 0.0);
            assert!(p.min < p.mean && p.mean < p.max);
            assert!(p.slots >= 1);
        }
    }

    #[test]
    fn test_agitation_dominates_service_time() {
        // The agitator is the slowest serial step on the line.
        let agitate = ServiceProfile::for_stage(StageKind::Agitate);
        for kind in STAGE_ORDER {
            if kind != StageKind::Agitate && kind != StageKind::Store {
                assert!(ServiceProfile::for_stage(kind).mean < agitate.mean);
            }
        }
    }
}
