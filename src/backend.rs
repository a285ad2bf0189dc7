//! Backend aliases for training and evaluation.
//!
//! The CPU `NdArray` backend is the default so the full pipeline (and the
//! test suite) runs anywhere; the `wgpu` feature switches training onto a
//! GPU device selected by index.

use burn::backend::Autodiff;

#[cfg(feature = "wgpu")]
pub type DefaultBackend = burn::backend::Wgpu<f32, i32>;

#[cfg(not(feature = "wgpu"))]
pub type DefaultBackend = burn::backend::ndarray::NdArray<f32>;

/// The autodiff backend used for parameter updates.
pub type TrainingBackend = Autodiff<DefaultBackend>;

/// Device for the configured GPU index. The index is ignored on the CPU
/// backend.
pub fn device(gpu_index: usize) -> <DefaultBackend as burn::tensor::backend::Backend>::Device {
    #[cfg(feature = "wgpu")]
    {
        burn::backend::wgpu::WgpuDevice::DiscreteGpu(gpu_index)
    }
    #[cfg(not(feature = "wgpu"))]
    {
        let _ = gpu_index;
        burn::backend::ndarray::NdArrayDevice::Cpu
    }
}

/// Human-readable name of the active backend.
pub fn backend_name() -> &'static str {
    #[cfg(feature = "wgpu")]
    {
        "wgpu (GPU)"
    }
    #[cfg(not(feature = "wgpu"))]
    {
        "ndarray (CPU)"
    }
}
