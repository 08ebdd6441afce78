pub mod logging;
pub mod number;
pub mod persistence;
pub mod version;
