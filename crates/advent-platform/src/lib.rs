//! Platform abstraction traits so `advent-core` stays host-agnostic.

use std::time::Duration;

use serde::{Deserialize, Serialize};

mod fs_store;
pub use fs_store::FileStore;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Logical area of a drawable surface plus its device pixel scale factor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub scale_factor: f32,
}

impl SurfaceRect {
    pub fn new(width: f32, height: f32, scale_factor: f32) -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width,
            height,
            scale_factor,
        }
    }

    /// Size in physical pixels, rounded up.
    pub fn physical_size(&self) -> (u32, u32) {
        let scale = self.scale_factor.max(f32::EPSILON);
        (
            (self.width * scale).ceil().max(0.0) as u32,
            (self.height * scale).ceil().max(0.0) as u32,
        )
    }

    /// True when `(px, py)` lies inside the rect grown by `margin` on every side.
    pub fn contains_with_margin(&self, px: f32, py: f32, margin: f32) -> bool {
        px >= self.x - margin
            && px <= self.x + self.width + margin
            && py >= self.y - margin
            && py <= self.y + self.height + margin
    }
}

/// Opaque handle returned by a [`Scheduler`]; used to cancel a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskHandle(pub u64);

/// Cooperative task scheduling on the host's single logical thread.
///
/// Tasks are plain values handed back to the owner when they come due, so
/// the owner dispatches them with full `&mut` access to its own state.
pub trait Scheduler<T> {
    /// Fires `task` every `interval` until cancelled.
    fn schedule_repeating(&mut self, interval: Duration, task: T) -> TaskHandle;
    /// Fires `task` once, on the next display frame.
    fn schedule_frame(&mut self, task: T) -> TaskHandle;
    /// Returns `false` when the handle was unknown or already fired.
    fn cancel(&mut self, handle: TaskHandle) -> bool;
}

/// Durable string key-value storage that survives reloads.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// A drawable target owned by the particle engine.
pub trait RenderSurface {
    /// Applies a new logical size and device scale factor.
    fn resize(&mut self, rect: SurfaceRect) -> Result<()>;
    fn clear(&mut self) -> Result<()>;
    /// Fills a convex polygon given in logical coordinates; `rgba` is unpremultiplied.
    fn fill_convex(&mut self, points: &[[f32; 2]], rgba: [f32; 4]) -> Result<()>;
}

/// Creates render surfaces over a target area of the host window.
pub trait SurfaceHost {
    fn create_surface(&mut self, area: SurfaceRect) -> Result<Box<dyn RenderSurface>>;
}
