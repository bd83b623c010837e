//! The keyframed animation document and everything that produces or persists it.

/// Timeline assembly from timed frames.
pub mod assemble;
/// Serde model of the Lottie document.
pub mod model;
/// Declarative shape-layer patterns and single-image spins.
pub mod shapes;
/// Atomic persistence.
pub mod store;
