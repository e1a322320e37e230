//! Purpose: Library crate behind the `koki` and `koki-markergen` binaries and the Node binding.
//! Exports: `api` (stable detection surface), `core` (pipeline stages, errors), `notice`.
//! Role: Finds square fiducial markers in greyscale frames and estimates their pose.
//! Invariants: Library code returns `Result<_, Error>`; malformed input never panics.
//! Invariants: Detection is stateless between frames; `Detector` is `Send + Sync`.
pub mod api;
pub mod core;
pub mod notice;
