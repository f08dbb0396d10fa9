pub mod device;
pub mod registry;
