pub mod aging;
pub mod controller;

pub use aging::{AgingPolicy, ShrinkOutcome, should_shrink, shrink_target};
pub use controller::LifecycleController;
