pub mod renderer;

pub use renderer::{Overlay, Renderer, Scene};
