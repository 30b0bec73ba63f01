pub mod broadcaster;
pub mod registry;
pub mod score;
pub mod task;
