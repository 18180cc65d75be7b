//! Application layer: ports, commands, events and the resource service.
//!
//! Domain code in [`crate::control`] talks to hardware only through the
//! traits in [`ports`]; [`service`] wires named dependencies into a
//! controller and exposes the command surface.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
