pub mod feature;
pub mod preprocess;
pub mod surface;

pub use feature::FeatureVector;
pub use preprocess::CanvasPreprocessor;
pub use surface::{RawSurface, SurfaceFormat};
