//! Default CPU backend.

use burn_ndarray::{NdArray, NdArrayDevice};

/// CPU backend used by the CLI and the tests.
pub type CpuBackend = NdArray<f32>;

/// Returns the CPU device.
#[must_use]
pub fn cpu_device() -> NdArrayDevice {
    NdArrayDevice::Cpu
}
