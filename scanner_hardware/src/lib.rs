//! Scanner backends: a clock-driven simulator and a DMC-style controller
//! adapter speaking over a [`scanner_traits::Transport`].

pub mod dmc;
pub mod error;
pub mod sim;
pub mod tcp;

pub use dmc::{DmcController, DmcScale};
pub use error::HwError;
pub use sim::SimulatedController;
pub use tcp::TcpTransport;
