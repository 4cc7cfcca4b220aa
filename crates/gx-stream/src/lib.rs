//! Display-list byte codec (component B): tokenizes and assembles the
//! GameCube/Wii GX FIFO command stream (§4.2, §6.1).
//!
//! The codec never decodes vertex data itself — draw payloads are handed to
//! a caller-supplied [`VertexSizer`] since their length depends on the
//! currently installed vertex attribute descriptor, which lives outside
//! this crate's scope (§1).

mod command;
mod error;
mod reader;
mod writer;

pub use command::{Command, IndexedLoadTarget, Primitive};
pub use error::StreamError;
pub use reader::{Reader, VertexSizer};
pub use writer::Writer;

/// Streams are padded with `NOP` (0x00) bytes to this boundary at
/// defined points (end of a material register block, end of a display
/// list).
pub const ALIGNMENT: usize = 32;

/// BP address of the sticky write-mask register (`gx_regs::bp::Reg::WriteMask`).
/// A BP write to this register's value becomes the mask applied to the
/// *next* BP write only (§4.1, §6.1).
pub const BP_MASK_REGISTER: u8 = 0xFE;
