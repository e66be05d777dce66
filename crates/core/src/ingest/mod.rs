pub mod frame;
pub mod loader;
pub mod provider;
