pub mod interrupt;
pub mod logging;
pub mod report;
