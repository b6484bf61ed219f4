pub mod rotation;
pub mod serialization;
pub mod slab;

mod traits;

pub use rotation::{RotationDiagram, RotationFit, RotationPoint, rotation_diagram};
pub use slab::{SlabResult, SlabSynthesizer};
pub use traits::SpectrumSynthesizer;
