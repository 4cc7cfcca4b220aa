//! Texture Environment (TEV) register layouts.
use bitos::{
    BitUtils, bitos,
    integer::{u2, u3},
};

/// Which rasterized color channel a TEV stage reads from.
#[bitos(3)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorChannel {
    Channel0 = 0x0,
    Channel1 = 0x1,
    Reserved0 = 0x2,
    Reserved1 = 0x3,
    Reserved2 = 0x4,
    AlphaBump = 0x5,
    AlphaBumpNormalized = 0x6,
    Zero = 0x7,
}

/// One half of a `RAS1_TREF` pair: texCoord, texMap and rasterizer order for
/// a single stage.
#[bitos(10)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StageRefs {
    #[bits(0..3)]
    pub map: u3,
    #[bits(3..6)]
    pub coord: u3,
    #[bits(6)]
    pub map_enable: bool,
    #[bits(7..10)]
    pub color: ColorChannel,
}

/// `RAS1_TREF`: packs two stages' [`StageRefs`] (even stage in `a`, odd in
/// `b`).
#[bitos(32)]
#[derive(Debug, Clone, Copy, Default)]
pub struct StageRefsPair {
    #[bits(0..10)]
    pub a: StageRefs,
    #[bits(12..22)]
    pub b: StageRefs,
}

/// Selects a konst color/alpha, or a fixed fraction, as a TEV operand.
#[bitos(5)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constant {
    One = 0x00,
    SevenEights = 0x01,
    SixEights = 0x02,
    FiveEights = 0x03,
    FourEights = 0x04,
    ThreeEights = 0x05,
    TwoEights = 0x06,
    OneEight = 0x07,
    Reserved0 = 0x08,
    Reserved1 = 0x09,
    Reserved2 = 0x0A,
    Reserved3 = 0x0B,
    Const0 = 0x0C,
    Const1 = 0x0D,
    Const2 = 0x0E,
    Const3 = 0x0F,
    Const0R = 0x10,
    Const1R = 0x11,
    Const2R = 0x12,
    Const3R = 0x13,
    Const0G = 0x14,
    Const1G = 0x15,
    Const2G = 0x16,
    Const3G = 0x17,
    Const0B = 0x18,
    Const1B = 0x19,
    Const2B = 0x1A,
    Const3B = 0x1B,
    Const0A = 0x1C,
    Const1A = 0x1D,
    Const2A = 0x1E,
    Const3A = 0x1F,
}

/// `TEV_KSEL`: packs two stages' konst selections plus, on its even member,
/// a swap-table row.
#[bitos(32)]
#[derive(Debug, Clone, Copy, Default)]
pub struct StageConstsPair {
    #[bits(0..2)]
    pub swap_rg: u2,
    #[bits(2..4)]
    pub swap_ba: u2,
    #[bits(4..9)]
    pub color_a: Constant,
    #[bits(9..14)]
    pub alpha_a: Constant,
    #[bits(14..19)]
    pub color_b: Constant,
    #[bits(19..24)]
    pub alpha_b: Constant,
}

#[bitos(4)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorInputSrc {
    R3Color = 0x0,
    R3Alpha = 0x1,
    R0Color = 0x2,
    R0Alpha = 0x3,
    R1Color = 0x4,
    R1Alpha = 0x5,
    R2Color = 0x6,
    R2Alpha = 0x7,
    TexColor = 0x8,
    TexAlpha = 0x9,
    ChanColor = 0xA,
    ChanAlpha = 0xB,
    One = 0xC,
    Half = 0xD,
    Constant = 0xE,
    Zero = 0xF,
}

impl std::fmt::Display for ColorInputSrc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::R3Color => "R3.C",
            Self::R3Alpha => "R3.A",
            Self::R0Color => "R0.C",
            Self::R0Alpha => "R0.A",
            Self::R1Color => "R1.C",
            Self::R1Alpha => "R1.A",
            Self::R2Color => "R2.C",
            Self::R2Alpha => "R2.A",
            Self::TexColor => "Tex.C",
            Self::TexAlpha => "Tex.A",
            Self::ChanColor => "Channel.C",
            Self::ChanAlpha => "Channel.A",
            Self::One => "1",
            Self::Half => "0.5",
            Self::Constant => "Constant",
            Self::Zero => "0",
        })
    }
}

#[bitos(3)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlphaInputSrc {
    R3Alpha = 0x0,
    R0Alpha = 0x1,
    R1Alpha = 0x2,
    R2Alpha = 0x3,
    TexAlpha = 0x4,
    ChanAlpha = 0x5,
    Constant = 0x6,
    Zero = 0x7,
}

impl std::fmt::Display for AlphaInputSrc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::R3Alpha => "R3.A",
            Self::R0Alpha => "R0.A",
            Self::R1Alpha => "R1.A",
            Self::R2Alpha => "R2.A",
            Self::TexAlpha => "Tex.A",
            Self::ChanAlpha => "Channel.A",
            Self::Constant => "Constant",
            Self::Zero => "0",
        })
    }
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bias {
    Zero = 0b00,
    PositiveHalf = 0b01,
    NegativeHalf = 0b10,
    /// Escape value: the stage is a comparison, not `bias(scale * f(...))`.
    Comparative = 0b11,
}

impl Bias {
    /// Panics on [`Bias::Comparative`]; check [`StageColor::is_comparative`]
    /// (or [`StageAlpha::is_comparative`]) first.
    pub fn value(self) -> f32 {
        match self {
            Self::Zero => 0.0,
            Self::PositiveHalf => 0.5,
            Self::NegativeHalf => -0.5,
            Self::Comparative => panic!("comparative tev stage has no bias value"),
        }
    }
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    One = 0b00,
    Two = 0b01,
    Four = 0b10,
    Half = 0b11,
}

impl Scale {
    pub fn value(self) -> f32 {
        match self {
            Self::One => 1.0,
            Self::Two => 2.0,
            Self::Four => 4.0,
            Self::Half => 0.5,
        }
    }
}

#[bitos(1)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    GreaterThan,
    Equal,
}

impl std::fmt::Display for CompareOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::GreaterThan => f.write_str(">"),
            Self::Equal => f.write_str("=="),
        }
    }
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareTarget {
    R8 = 0b00,
    GR16 = 0b01,
    BGR16 = 0b10,
    Component = 0b11,
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputDst {
    R3 = 0b00,
    R0 = 0b01,
    R1 = 0b10,
    R2 = 0b11,
}

/// `TEV_COLOR_ENV[i]`: the color sub-stage of combiner stage `i`. `bias` and
/// `scale` double as `compare_op`/`compare_target` when `bias ==
/// Comparative` (same bits, different interpretation).
#[bitos(32)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StageColor {
    #[bits(0..4)]
    pub input_d: ColorInputSrc,
    #[bits(4..8)]
    pub input_c: ColorInputSrc,
    #[bits(8..12)]
    pub input_b: ColorInputSrc,
    #[bits(12..16)]
    pub input_a: ColorInputSrc,
    #[bits(16..18)]
    pub bias: Bias,
    #[bits(18)]
    pub negate: bool,
    #[bits(18)]
    pub compare_op: CompareOp,
    #[bits(19)]
    pub clamp: bool,
    #[bits(20..22)]
    pub scale: Scale,
    #[bits(20..22)]
    pub compare_target: CompareTarget,
    #[bits(22..24)]
    pub output: OutputDst,
}

impl StageColor {
    pub fn is_comparative(&self) -> bool {
        self.bias() == Bias::Comparative
    }
}

impl std::fmt::Debug for StageColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let a = self.input_a();
        let b = self.input_b();
        let c = self.input_c();
        let d = self.input_d();
        let output = self.output();

        if self.is_comparative() {
            let op = self.compare_op();
            let target = self.compare_target();
            write!(
                f,
                "{output:?}.C = ({a}.{target:?} {op} {b}.{target:?}) ? {c} : {d}"
            )
        } else {
            let sign = if self.negate() { "-" } else { "+" };
            write!(
                f,
                "{output:?}.C = {} * ({sign}mix({a}, {b}, {c}) + {d} + {})",
                self.scale().value(),
                self.bias().value()
            )
        }
    }
}

/// `TEV_ALPHA_ENV[i]`: the alpha sub-stage, plus the swap-table indices used
/// by texture/rasterizer reads in this stage.
#[bitos(32)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StageAlpha {
    #[bits(0..2)]
    pub rasterizer_swap: u2,
    #[bits(2..4)]
    pub texture_swap: u2,
    #[bits(4..7)]
    pub input_d: AlphaInputSrc,
    #[bits(7..10)]
    pub input_c: AlphaInputSrc,
    #[bits(10..13)]
    pub input_b: AlphaInputSrc,
    #[bits(13..16)]
    pub input_a: AlphaInputSrc,
    #[bits(16..18)]
    pub bias: Bias,
    #[bits(18)]
    pub negate: bool,
    #[bits(18)]
    pub compare_op: CompareOp,
    #[bits(19)]
    pub clamp: bool,
    #[bits(20..22)]
    pub scale: Scale,
    #[bits(20..22)]
    pub compare_target: CompareTarget,
    #[bits(22..24)]
    pub output: OutputDst,
}

impl StageAlpha {
    pub fn is_comparative(&self) -> bool {
        self.bias() == Bias::Comparative
    }
}

impl std::fmt::Debug for StageAlpha {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let a = self.input_a();
        let b = self.input_b();
        let c = self.input_c();
        let d = self.input_d();
        let output = self.output();

        if self.is_comparative() {
            let op = self.compare_op();
            let target = self.compare_target();
            write!(
                f,
                "{output:?}.A = ({a}.{target:?} {op} {b}.{target:?}) ? {c} : {d}"
            )
        } else {
            let sign = if self.negate() { "-" } else { "+" };
            write!(
                f,
                "{output:?}.A = {} * ({sign}mix({a}, {b}, {c}) + {d} + {})",
                self.scale().value(),
                self.bias().value()
            )
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StageOps {
    pub color: StageColor,
    pub alpha: StageAlpha,
}

#[bitos(3)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaCompare {
    #[default]
    Never = 0x0,
    Less = 0x1,
    Equal = 0x2,
    LessOrEqual = 0x3,
    Greater = 0x4,
    NotEqual = 0x5,
    GreaterOrEqual = 0x6,
    Always = 0x7,
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AlphaLogic {
    #[default]
    And = 0b00,
    Or = 0b01,
    Xor = 0b10,
    Xnor = 0b11,
}

/// `ALPHACOMPARE`.
#[bitos(32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AlphaFunction {
    #[bits(0..16)]
    pub refs: [u8; 2],
    #[bits(16..22)]
    pub comparison: [AlphaCompare; 2],
    #[bits(22..24)]
    pub logic: AlphaLogic,
}

/// The low half (even address) of a TEV register-file entry: `R,A`, plus
/// its own copy of the discriminator bit (hardware sets `type_ra` and
/// `type_bg` together; each half's write is routed independently by its
/// own bit).
#[bitos(32)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TevRegisterRa {
    #[bits(0..11)]
    pub r: u16,
    #[bits(12..23)]
    pub a: u16,
    #[bits(23)]
    pub konst: bool,
}

/// The high half (odd address) of a TEV register-file entry: `B,G`, plus
/// the discriminator bit that turns the whole pair into a konst color.
#[bitos(32)]
#[derive(Debug, Clone, Copy, Default)]
pub struct TevRegisterBg {
    #[bits(0..11)]
    pub b: u16,
    #[bits(12..23)]
    pub g: u16,
    #[bits(23)]
    pub konst: bool,
}

fn sign_extend_11(value: u16) -> i16 {
    ((value as i16) << 5) >> 5
}

/// Decoded contents of a [`TevRegisterRa`]/[`TevRegisterBg`] pair: a runtime
/// sum type over the raw 64-bit word, discriminated by `TevRegisterBg::konst`
/// (see the design note on runtime-typed GPU registers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TevRegisterValue {
    /// Signed, clamped to `[-1024, 1023]`.
    Color { r: i16, g: i16, b: i16, a: i16 },
    /// Unsigned 8-bit RGBA.
    Konst {
        r: u8,
        g: u8,
        b: u8,
        a: u8,
    },
}

/// One TEV register-file slot (there are four: `Previous`, `Reg0`, `Reg1`,
/// `Reg2`), assembled from its RA and BG register halves.
#[derive(Debug, Clone, Copy, Default)]
pub struct TevRegisterPair {
    pub ra: TevRegisterRa,
    pub bg: TevRegisterBg,
}

impl TevRegisterPair {
    pub fn decode(&self) -> TevRegisterValue {
        if self.bg.konst() {
            TevRegisterValue::Konst {
                r: (self.ra.r() >> 3) as u8,
                g: (self.bg.g() >> 3) as u8,
                b: (self.bg.b() >> 3) as u8,
                a: (self.ra.a() >> 3) as u8,
            }
        } else {
            TevRegisterValue::Color {
                r: sign_extend_11(self.ra.r()),
                g: sign_extend_11(self.bg.g()),
                b: sign_extend_11(self.bg.b()),
                a: sign_extend_11(self.ra.a()),
            }
        }
    }

    pub fn encode_color(r: i16, g: i16, b: i16, a: i16) -> Self {
        let clamp = |v: i16| v.clamp(-1024, 1023) as u16 & 0x7FF;
        Self {
            ra: TevRegisterRa::default()
                .with_r(clamp(r))
                .with_a(clamp(a))
                .with_konst(false),
            bg: TevRegisterBg::default()
                .with_b(clamp(b))
                .with_g(clamp(g))
                .with_konst(false),
        }
    }

    pub fn encode_konst(r: u8, g: u8, b: u8, a: u8) -> Self {
        let widen = |v: u8| (v as u16) << 3;
        Self {
            ra: TevRegisterRa::default()
                .with_r(widen(r))
                .with_a(widen(a))
                .with_konst(true),
            bg: TevRegisterBg::default()
                .with_b(widen(b))
                .with_g(widen(g))
                .with_konst(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn konst_round_trips_through_register_pair() {
        let pair = TevRegisterPair::encode_konst(10, 20, 30, 255);
        assert_eq!(
            pair.decode(),
            TevRegisterValue::Konst {
                r: 10,
                g: 20,
                b: 30,
                a: 255
            }
        );
    }

    #[test]
    fn color_sign_extends_negative_components() {
        let pair = TevRegisterPair::encode_color(-1024, 1023, -1, 0);
        assert_eq!(
            pair.decode(),
            TevRegisterValue::Color {
                r: -1024,
                g: 1023,
                b: -1,
                a: 0
            }
        );
    }

    #[test]
    fn stage_refs_pair_packs_both_halves() {
        let a = StageRefs::default().with_map(u3::new(3)).with_coord(u3::new(5));
        let b = StageRefs::default().with_map(u3::new(1)).with_coord(u3::new(2));
        let pair = StageRefsPair::default().with_a(a).with_b(b);
        assert_eq!(pair.a().map().value(), 3);
        assert_eq!(pair.b().coord().value(), 2);
    }
}
