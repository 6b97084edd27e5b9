pub mod audio;
pub mod manifest;
pub mod pipeline;
pub mod queue;
pub mod relay;
pub mod shared;
pub mod sources;
pub mod submission;
pub mod worker;
