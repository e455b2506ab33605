#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Move lifecycle engine for a three-axis beam scanner (hardware-agnostic).
//!
//! All hardware interaction goes through `scanner_traits::MotionController`.
//!
//! ## Architecture
//!
//! - **Configuration**: workspace bounds, speeds, polling (`config` module)
//! - **Lifecycle**: validate, start, poll and classify moves (`engine` module)
//! - **Construction**: type-state builder and `build_engine` (`builder` module)
//! - **Errors**: typed `MotionError` / `BuildError` inside `eyre` reports
//!
//! ## Move lifecycle
//!
//! `set_next_pos` → `start_move` → `get_move_status` / `wait_for_move` until one
//! of success, stop, power failure or timeout. The engine then folds the final
//! pose into the current position and is idle again.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod engine;
pub mod error;
pub mod hw_error;
pub mod util;

pub use builder::{Missing, Scanner, ScannerBuilder, Set, build_engine};
pub use config::{Bounds, MotionCfg, WaitCfg};
pub use engine::{MoveEngine, parse_axis};
pub use error::{BuildError, MotionError, Report, Result};
pub use scanner_traits::{Axis, MotorStatus, MoveOutcome, MoveStatus, Position};
