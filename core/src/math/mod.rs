pub mod kinematics;
pub mod stats;

pub use kinematics::{derive, DerivedTable, DerivedVectors, PlanarVector};
pub use stats::{Bounds, StatsHelper};
