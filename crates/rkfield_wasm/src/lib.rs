//! WASM bindings for the rkfield core library.

mod system;

pub use system::{TrajectoryPayload, WasmPlanarSystem};
