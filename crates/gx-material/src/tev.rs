//! TEV stages: the programmable texture/color combiner pipeline.

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorInput {
    #[default]
    PrevColor,
    PrevAlpha,
    Reg0Color,
    Reg0Alpha,
    Reg1Color,
    Reg1Alpha,
    Reg2Color,
    Reg2Alpha,
    TexColor,
    TexAlpha,
    RasColor,
    RasAlpha,
    One,
    Half,
    Konst,
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaInput {
    #[default]
    PrevAlpha,
    Reg0Alpha,
    Reg1Alpha,
    Reg2Alpha,
    TexAlpha,
    RasAlpha,
    Konst,
    Zero,
}

/// Konst color/alpha selection (`TEV_KSEL`'s `kcsel`/`kasel` fields):
/// either a fixed fraction or one component of `tev_konst_colors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Konst {
    #[default]
    One,
    SevenEighths,
    ThreeQuarters,
    FiveEighths,
    Half,
    ThreeEighths,
    OneQuarter,
    OneEighth,
    Const0Rgb,
    Const1Rgb,
    Const2Rgb,
    Const3Rgb,
    Const0R,
    Const1R,
    Const2R,
    Const3R,
    Const0G,
    Const1G,
    Const2G,
    Const3G,
    Const0B,
    Const1B,
    Const2B,
    Const3B,
    Const0A,
    Const1A,
    Const2A,
    Const3A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TevBias {
    #[default]
    Zero,
    AddHalf,
    SubHalf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TevScale {
    #[default]
    One,
    Two,
    Four,
    Half,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TevOutput {
    #[default]
    Prev,
    Reg0,
    Reg1,
    Reg2,
}

/// The stage's combiner formula: either the regular
/// `mix(a, b, c) {+,-} d` blend, or one of the comparison formulas that
/// replace the bias/scale fields with a comparison op/width (§4.6, §4.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TevFormula {
    #[default]
    Add,
    Sub,
    CompR8Gt,
    CompR8Eq,
    CompGr16Gt,
    CompGr16Eq,
    CompBgr24Gt,
    CompBgr24Eq,
    CompRgb8Gt,
    CompRgb8Eq,
    CompA8Gt,
    CompA8Eq,
}

impl TevFormula {
    pub fn is_comparative(self) -> bool {
        !matches!(self, Self::Add | Self::Sub)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorStage {
    pub a: ColorInput,
    pub b: ColorInput,
    pub c: ColorInput,
    pub d: ColorInput,
    pub formula: TevFormula,
    pub bias: TevBias,
    pub scale: TevScale,
    pub clamp: bool,
    pub output: TevOutput,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AlphaStage {
    pub a: AlphaInput,
    pub b: AlphaInput,
    pub c: AlphaInput,
    pub d: AlphaInput,
    pub formula: TevFormula,
    pub bias: TevBias,
    pub scale: TevScale,
    pub clamp: bool,
    pub output: TevOutput,
}

/// Indirect texture formats this crate supports; hardware also defines
/// 5/6/7-bit variants but no teacher or example container emits them
/// (Open Question in spec.md §9 — treated as unsupported here).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndirectFormat {
    #[default]
    Bits8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndirectBias {
    #[default]
    None,
    S,
    T,
    U,
    St,
    Su,
    Tu,
    Stu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndirectAlphaSelect {
    #[default]
    Off,
    S,
    T,
    U,
}

/// Which of the three indirect matrices (if any) a stage applies to its
/// indirect texture coordinate. The texcoord-scale variants
/// (`s0`/`s1`/`s2`/`t0`/`t1`/`t2` in hardware) have no consumer in any
/// example container and are treated as an unsupported `InvalidEnum` by
/// the lifter (Open Question, spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndirectMatrixSelect {
    #[default]
    Off,
    Matrix0,
    Matrix1,
    Matrix2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndirectWrap {
    #[default]
    Off,
    Zero,
    W16,
    W32,
    W64,
    W128,
    W256,
}

/// A stage's use of the indirect texture pipeline stage `stage_sel`
/// produced (§4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IndirectStageRef {
    pub stage_sel: u8,
    pub format: IndirectFormat,
    pub bias: IndirectBias,
    pub alpha: IndirectAlphaSelect,
    pub matrix: IndirectMatrixSelect,
    pub wrap_u: IndirectWrap,
    pub wrap_v: IndirectWrap,
    pub add_prev: bool,
    pub utc_lod: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RasChannel {
    #[default]
    Channel0,
    Channel1,
    AlphaBump,
    AlphaBumpNormalized,
    Zero,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SwapChannel {
    #[default]
    R,
    G,
    B,
    A,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SwapTableEntry {
    pub r: SwapChannel,
    pub g: SwapChannel,
    pub b: SwapChannel,
    pub a: SwapChannel,
}

/// `tevColors`: signed 11-bit registers, clamped to `[-1024, 1023]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TevColorReg {
    pub r: i16,
    pub g: i16,
    pub b: i16,
    pub a: i16,
}

/// One full TEV stage: a color and alpha combiner sharing one texture
/// sample, rasterized color sample, konst selection and optional indirect
/// texture lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TevStage {
    pub color: ColorStage,
    pub alpha: AlphaStage,
    pub konst_color: Konst,
    pub konst_alpha: Konst,
    /// `None` means "no texture" (hardware's `0xff` sentinel).
    pub tex_coord: Option<u8>,
    pub tex_map: Option<u8>,
    pub ras_order: RasChannel,
    /// Index into `Material::swap_table` for the rasterizer sample.
    pub ras_swap: u8,
    /// Index into `Material::swap_table` for the texture sample.
    pub tex_swap: u8,
    pub indirect: IndirectStageRef,
}
