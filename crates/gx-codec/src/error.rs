//! Error and warning types shared by the lifter and lowerer (§7).

use easyerr::Error;

/// Non-fatal conditions the lifter recovers from locally, per §7's recovery
/// policy. Collected in a side channel alongside the lifted material rather
/// than aborting the lift.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A BP/XF/CP write targeted a register this crate does not model.
    InvalidRegister { register: String },
    /// A TEV stage's `IND_CMD` bookkeeping bit was never set; the lifter
    /// substituted the indirect sub-stage from slot `fallback` instead.
    UndefinedIndCmdSlot { stage: usize, fallback: usize },
}

impl std::fmt::Display for Warning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRegister { register } => write!(f, "write to unmodeled register {register}"),
            Self::UndefinedIndCmdSlot { stage, fallback } => {
                write!(f, "stage {stage} has no IND_CMD slot, falling back to slot {fallback}")
            }
        }
    }
}

/// Fatal lift/lower failures (§7). The lifter only ever produces
/// [`InvalidEnum`](Error::InvalidEnum) for the two open questions
/// spec.md §9 declares unsupported; everything else it downgrades to a
/// [`Warning`]. The lowerer never recovers: any of these indicates
/// corrupted or invalid input.
#[derive(Debug, Error)]
pub enum Error {
    #[error("BP/XF/CP write to unmodeled register {register}")]
    InvalidRegister { register: String },
    #[error("field {field} has unsupported value {value}")]
    InvalidEnum { field: &'static str, value: String },
    #[error(transparent)]
    Invariant { source: gx_material::InvariantError },
    #[error(transparent)]
    Quantizer { source: gx_indirect::QuantizerMismatch },
}
