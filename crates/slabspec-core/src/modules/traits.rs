use super::slab::{SlabResult, SlabSynthesizer};
use crate::domain::{ComputeResult, SlabParameters};
use crate::providers::{LineListProvider, PartitionFunctionProvider, ThermalVelocityEstimator};

pub trait SpectrumSynthesizer {
    fn synthesize(&self, parameters: &SlabParameters) -> ComputeResult<SlabResult>;
}

impl<L, P, V> SpectrumSynthesizer for SlabSynthesizer<L, P, V>
where
    L: LineListProvider,
    P: PartitionFunctionProvider,
    V: ThermalVelocityEstimator,
{
    fn synthesize(&self, parameters: &SlabParameters) -> ComputeResult<SlabResult> {
        SlabSynthesizer::synthesize(self, parameters)
    }
}
