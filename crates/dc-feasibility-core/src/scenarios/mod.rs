#[cfg(feature = "scenarios")]
pub mod scenario;
#[cfg(feature = "sensitivity")]
pub mod sensitivity;
