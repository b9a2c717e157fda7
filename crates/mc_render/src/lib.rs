pub mod camera;
pub mod gpu_context;

pub use camera::Camera3D;
pub use gpu_context::GpuContext;
