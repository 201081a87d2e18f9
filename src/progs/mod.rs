pub mod docker;
pub mod mirror;
