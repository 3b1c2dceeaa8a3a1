//! primitive-scene
//!
//! A small wgpu scene demo that runs natively and in the browser. It locates a
//! drawable surface, creates an engine on it, and fills a scene with an orbit
//! camera, a hemispheric and a point light and five primitive meshes before
//! handing the scene to a render loop.
//!
//! High-level modules
//! - `surface`: finds the window or `<canvas>` to draw on
//! - `engine`: GPU context, render targets, resize handling and read back
//! - `scene`: the node container (cameras, lights, meshes)
//! - `camera`: orbit camera, its input controls and uniform
//! - `light`: hemispheric and point lights and their uniform
//! - `mesh_builder`: vertex data for sphere, box, plane, ground and lines
//! - `data_structures`: vertex layouts, instances, planes and textures
//! - `pipelines`: the lit triangle and unlit line pipelines
//! - `render`: per-scene GPU buffers and draw calls
//! - `events`: subscription lists with unsubscribe handles
//! - `app`: the winit event loop, resize and frame-tick dispatch
//! - `demo`: the demo scene table and the context the handlers drive
//!

pub mod app;
pub mod camera;
pub mod data_structures;
pub mod demo;
pub mod engine;
pub mod events;
pub mod light;
pub mod mesh_builder;
pub mod pipelines;
pub mod render;
pub mod scene;
pub mod surface;

// Re-exports commonly used types for convenience in downstream code.
pub use app::{DemoConfig, run};
pub use engine::{Engine, EngineOptions};
pub use scene::{NodeId, Scene};
pub use cgmath;
pub use wgpu;
pub use winit;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    run(DemoConfig::default()).map_err(|e| JsValue::from_str(&format!("{:#}", e)))
}
