#![no_std]

//! Hardware-independent core of the electronic load.
//!
//! Everything in here is plain logic over small collaborator traits so it can
//! be exercised by host-side tests; the firmware crate only supplies the
//! peripheral glue and the two tasks that drive [`regulator::Regulator`] and
//! [`panel::FrontPanel`].

pub mod menu;
pub mod panel;
pub mod pid;
pub mod regulator;
pub mod sense;
pub mod state;
pub mod status;
pub mod task;

#[cfg(test)]
extern crate std;
