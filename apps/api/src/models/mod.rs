pub mod application;
pub mod automation;
