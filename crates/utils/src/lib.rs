pub mod frame;
pub mod rng;

#[cfg(not(target_arch = "wasm32"))]
pub mod logs;
