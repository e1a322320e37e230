// Core modules: image primitives, the detection pipeline, and error modeling.
pub mod bearing;
pub mod camera;
pub mod code;
pub mod code_grid;
pub mod contour;
pub mod detector;
pub mod error;
pub mod integral;
pub mod labelling;
pub mod linalg;
pub mod marker;
pub mod pca;
pub mod points;
pub mod pose;
pub mod quad;
pub mod render;
pub mod rotation;
pub mod threshold;
pub mod unwarp;
