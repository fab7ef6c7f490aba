pub mod descriptor;
pub mod resolver;
pub mod tuning;

pub use descriptor::{DescriptorBuilder, InstanceDescriptor, ReplicationSource};
pub use resolver::ShardResolver;
pub use tuning::TuningOptions;
