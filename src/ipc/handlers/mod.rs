pub mod core;
pub mod export;
pub mod group;
pub mod review;
pub mod session;
