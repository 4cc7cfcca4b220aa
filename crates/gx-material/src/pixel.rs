//! Back-end pixel pipeline: alpha test, depth test, blending.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    #[default]
    Never,
    Less,
    Equal,
    LEqual,
    Greater,
    NEqual,
    GEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaLogic {
    #[default]
    And,
    Or,
    Xor,
    Xnor,
}

/// `(a comp_left ref_left) logic (a comp_right ref_right)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AlphaCompare {
    pub comp_left: CompareFunction,
    pub ref_left: u8,
    pub op: AlphaLogic,
    pub comp_right: CompareFunction,
    pub ref_right: u8,
}

impl AlphaCompare {
    /// True when the test can never discard a fragment. Conservative for
    /// `Xor`/`Xnor` (always `false` there, even though `Xnor(Always, Always)`
    /// is technically pass-through too) since a false negative only costs an
    /// early-Z opportunity, not correctness.
    pub fn is_pass_through(&self) -> bool {
        use AlphaLogic::{And, Or, Xnor, Xor};
        use CompareFunction::Always;
        let left_always = self.comp_left == Always;
        let right_always = self.comp_right == Always;
        match self.op {
            And => left_always && right_always,
            Or => left_always || right_always,
            Xor | Xnor => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ZMode {
    pub compare: bool,
    pub function: CompareFunction,
    pub update: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendType {
    #[default]
    None,
    Blend,
    Logic,
    Subtract,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendFactor {
    #[default]
    Zero,
    One,
    SrcColor,
    InvSrcColor,
    SrcAlpha,
    InvSrcAlpha,
    DstAlpha,
    InvDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogicOp {
    #[default]
    Clear,
    And,
    AndReverse,
    Copy,
    AndInverted,
    NoOp,
    Xor,
    Or,
    Nor,
    Equiv,
    Invert,
    OrReverse,
    CopyInverted,
    OrInverted,
    Nand,
    Set,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlendMode {
    pub ty: BlendType,
    pub source: BlendFactor,
    pub dest: BlendFactor,
    pub logic: LogicOp,
}

/// Destination-alpha override applied after the TEV pipeline runs, when
/// the hardware's const-alpha unit is enabled independent of blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DstAlpha {
    pub enabled: bool,
    pub alpha: u8,
}
