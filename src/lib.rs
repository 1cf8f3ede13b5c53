pub mod cloud;
pub mod config;
pub mod error;
pub mod geometry;
pub mod imu;
pub mod io;
pub mod map;
pub mod mapping;
pub mod registration;
pub mod system;

#[cfg(test)]
pub mod test_utils;
