//! The twelve processing stages of the pooling line, in routing order.

use serde::Serialize;
use std::fmt;

/// Number of stages a batch passes through from arrival to shipment.
pub const STAGE_COUNT: usize = 12;

/// All stages in routing order. A batch that passes every gate visits
/// each element of this array exactly once, in order.
pub const STAGE_ORDER: [StageKind; STAGE_COUNT] = [
    StageKind::Scan,
    StageKind::Separate,
    StageKind::Extract,
    StageKind::Express,
    StageKind::Agitate,
    StageKind::Connect,
    StageKind::Pool,
    StageKind::QualityControl,
    StageKind::Label,
    StageKind::Store,
    StageKind::Verify,
    StageKind::Ship,
];

/// One kind of processing stage on the line.
///
/// The declaration order here is the routing order and also the
/// tie-break order for bottleneck reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum StageKind {
    /// Barcode scan registering the incoming donation.
    Scan,

    /// Centrifugation separating whole blood into components.
    Separate,

    /// Automated extraction of the buffy coat layer.
    Extract,

    /// Plasma expression into the transfer bag.
    Express,

    /// Continuous agitation storage prior to pooling.
    Agitate,

    /// Sterile tube connection of the units to be pooled.
    Connect,

    /// Pooling of buffy coats into a single product.
    Pool,

    /// Quality control sampling. The only gate stage: a failed check
    /// terminates the batch.
    QualityControl,

    /// Product labeling.
    Label,

    /// Temperature-controlled storage pending verification.
    Store,

    /// Final visual and data verification.
    Verify,

    /// Packing and dispatch.
    Ship,
}

impl StageKind {
    /// Position of this stage in the routing order.
    pub fn index(self) -> usize {
        self as usize
    }

    /// The stage a batch routes to after completing this one, or `None`
    /// after the final stage.
    pub fn next(self) -> Option<StageKind> {
        STAGE_ORDER.get(self.index() + 1).copied()
    }

    /// Whether a failed outcome at this stage terminates the batch.
    pub fn is_quality_gate(self) -> bool {
        self == StageKind::QualityControl
    }

    /// Human-readable stage name, as used in logs and reports.
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Scan => "scan",
            StageKind::Separate => "separate",
            StageKind::Extract => "extract",
            StageKind::Express => "express",
            StageKind::Agitate => "agitate",
            StageKind::Connect => "connect",
            StageKind::Pool => "pool",
            StageKind::QualityControl => "quality-control",
            StageKind::Label => "label",
            StageKind::Store => "store",
            StageKind::Verify => "verify",
            StageKind::Ship => "ship",
        }
    }

    /// Label prefix for device units of this stage, e.g. `centrifuge-1`.
    pub fn device_label(self) -> &'static str {
        match self {
            StageKind::Scan => "scanner",
            StageKind::Separate => "centrifuge",
            StageKind::Extract => "extractor",
            StageKind::Express => "expressor",
            StageKind::Agitate => "agitator",
            StageKind::Connect => "tube-connector",
            StageKind::Pool => "pooler",
            StageKind::QualityControl => "qc-analyzer",
            StageKind::Label => "labeler",
            StageKind::Store => "storage-unit",
            StageKind::Verify => "verifier",
            StageKind::Ship => "shipping-station",
        }
    }

    /// Parse a stage from its report name. Used by the CLI for
    /// per-stage overrides.
    pub fn from_name(name: &str) -> Option<StageKind> {
        STAGE_ORDER.iter().copied().find(|s| s.name() == name)
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_order_covers_all_stages_once() {
        for (i, stage) in STAGE_ORDER.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
        assert_eq!(STAGE_ORDER.len(), STAGE_COUNT);
    }

    #[test]
    fn test_next_walks_the_full_line() {
        let mut stage = STAGE_ORDER[0];
        let mut visited = vec![stage];
        while let Some(next) = stage.next() {
            visited.push(next);
            stage = next;
        }
        assert_eq!(visited, STAGE_ORDER);
        assert_eq!(stage, StageKind::Ship);
    }

    #[test]
    fn test_only_quality_control_gates() {
        let gates: Vec<_> = STAGE_ORDER
            .iter()
            .filter(|s| s.is_quality_gate())
            .collect();
        assert_eq!(gates, vec![&StageKind::QualityControl]);
    }

    #[test]
    fn test_name_round_trip() {
        for stage in STAGE_ORDER {
            assert_eq!(StageKind::from_name(stage.name()), Some(stage));
        }
        assert_eq!(StageKind::from_name("bogus"), None);
    }
}
