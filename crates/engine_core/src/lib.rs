//! Core types shared by every cityscape crate.
//!
//! This crate provides the foundational pieces used across the viewer:
//! - Transform and pose math for instanced scene objects
//! - Frame timing and the simulated time-of-day clock

pub mod time;
pub mod transform;

pub use time::*;
pub use transform::*;

// Re-export commonly used math types
pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
