//! Bridges the raw `gx-regs` register shadows to the semantic `gx-material`
//! record (§4.3, §4.4): [`lift`]/[`Lifter`] go registers-to-material,
//! [`lower`]/[`Lowerer`] go material-to-registers.

mod error;
mod lift;
mod lower;

pub use error::{Error, Warning};
pub use lift::{Lifter, LiftContext, lift};
pub use lower::{Lowerer, lower};
