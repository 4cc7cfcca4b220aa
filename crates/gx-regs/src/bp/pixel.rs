//! Pixel engine registers: `ZMODE`, `BLENDMODE`, `CONSTANTALPHA`.
use bitos::bitos;

#[bitos(3)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    #[default]
    Never = 0,
    Less = 1,
    Equal = 2,
    LEqual = 3,
    Greater = 4,
    NEqual = 5,
    GEqual = 6,
    Always = 7,
}

/// `ZMODE`.
#[bitos(5)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DepthMode {
    #[bits(0)]
    pub compare: bool,
    #[bits(1..4)]
    pub function: CompareFunction,
    #[bits(4)]
    pub update: bool,
}

#[bitos(3)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendFactor {
    #[default]
    Zero = 0,
    One = 1,
    SrcColor = 2,
    InvSrcColor = 3,
    SrcAlpha = 4,
    InvSrcAlpha = 5,
    DstAlpha = 6,
    InvDstAlpha = 7,
}

#[bitos(4)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LogicOp {
    #[default]
    Clear = 0x0,
    And = 0x1,
    AndReverse = 0x2,
    Copy = 0x3,
    AndInverted = 0x4,
    NoOp = 0x5,
    Xor = 0x6,
    Or = 0x7,
    Nor = 0x8,
    Equiv = 0x9,
    Invert = 0xA,
    OrReverse = 0xB,
    CopyInverted = 0xC,
    OrInverted = 0xD,
    Nand = 0xE,
    Set = 0xF,
}

/// `BLENDMODE`. `blend_enable`/`logic_enable`/`subtract` together select the
/// high-level `blendMode.type`; the lifter derives that enum, this shadow
/// only keeps the raw flags.
#[bitos(16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BlendMode {
    #[bits(0)]
    pub blend_enable: bool,
    #[bits(1)]
    pub logic_enable: bool,
    #[bits(2)]
    pub dither: bool,
    #[bits(3)]
    pub color_update: bool,
    #[bits(4)]
    pub alpha_update: bool,
    #[bits(5..8)]
    pub dst_factor: BlendFactor,
    #[bits(8..11)]
    pub src_factor: BlendFactor,
    #[bits(11)]
    pub subtract: bool,
    #[bits(12..16)]
    pub logic_op: LogicOp,
}

/// `CONSTANTALPHA`: the destination-alpha override applied after the TEV
/// pipeline, independent of any stage's own alpha output.
#[bitos(9)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConstantAlpha {
    #[bits(0..8)]
    pub alpha: u8,
    #[bits(8)]
    pub enable: bool,
}

