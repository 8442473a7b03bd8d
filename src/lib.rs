// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Smooth playback core for periodic molecular dynamics trajectories.
//!
//! A recorded trajectory holds atom positions at discrete timesteps inside
//! a periodic box. Trajview removes the box-crossing jumps, fits a natural
//! cubic spline through every atom coordinate, and evaluates the splines at
//! an arbitrary playback phase so a renderer can animate at any frame rate.
//!
//! # Key entry points
//!
//! - [`trajectory::load_file`] - parse binary or text trajectory files
//! - [`trajectory::unwrap()`] - cyclic correction across periodic boundaries
//! - [`spline::SplineBuilder`] - one-time coefficient construction
//! - [`spline::AtomMotion`] - per-frame position evaluation
//! - [`playback::PlaybackClock`] - pause, reverse, step and loop the phase
//! - [`loader::TrajectoryLoader`] - background loading with ordered uploads
//! - [`options::Options`] - runtime configuration with TOML presets
//!
//! # Architecture
//!
//! Loading runs on a background [`loader::TrajectoryLoader`] thread: parse,
//! close the loop, unwrap, then build splines in parallel with rayon. The
//! result reaches the main thread as an ordered run of
//! [`loader::PendingUpload`]s that the host drains one per frame into an
//! [`loader::UploadSink`] (CPU memory, or wgpu buffers with the `gpu`
//! feature). Once the final upload is applied the motion is published and
//! evaluated every frame at the phase supplied by the playback clock.

pub mod error;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod loader;
pub mod options;
pub mod playback;
pub mod spline;
pub mod trajectory;
pub mod util;

pub use error::TrajviewError;
