pub mod daemon;
pub mod device;
pub mod sync;
