//! Geometry utilities: SO3 maps and SE3 transforms.

pub mod se3;
pub mod so3;

pub use se3::SE3;
pub use so3::boxplus;
