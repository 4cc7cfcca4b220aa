//! Indirect texture matrix registers: `IND_MTXA/B/C`, and the texture-coord
//! scale/order registers that feed indirect lookups.
use bitos::{
    bitos,
    integer::{u2, u3, u11},
};

/// One third of a quantized indirect matrix: two signed 11-bit mantissas and
/// a 2-bit slice of the shared 6-bit exponent. Three of these (`a`, `b`, `c`)
/// make up one matrix; see `gx-indirect` for the quantize/dequantize math.
#[bitos(24)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IndMtxPart {
    #[bits(0..11)]
    pub m0: u11,
    #[bits(11..22)]
    pub m1: u11,
    #[bits(22..24)]
    pub exponent_bits: u2,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IndMtxRegister {
    pub a: IndMtxPart,
    pub b: IndMtxPart,
    pub c: IndMtxPart,
}

impl IndMtxRegister {
    /// The 6-bit shared exponent, reassembled from the three 2-bit slices.
    pub fn exponent(&self) -> u8 {
        u8::from(self.a.exponent_bits().value())
            | (u8::from(self.b.exponent_bits().value()) << 2)
            | (u8::from(self.c.exponent_bits().value()) << 4)
    }

    /// Raw signed mantissas, row-major as `[[m00, m01, m02], [m10, m11, m12]]`.
    pub fn mantissas(&self) -> [[i16; 3]; 2] {
        let sext = |v: u11| {
            let raw = v.value();
            ((raw as i16) << 5) >> 5
        };
        [
            [sext(self.a.m0()), sext(self.b.m0()), sext(self.c.m0())],
            [sext(self.a.m1()), sext(self.b.m1()), sext(self.c.m1())],
        ]
    }

    pub fn from_parts(exponent: u8, mantissas: [[i16; 3]; 2]) -> Self {
        let mask11 = |v: i16| (v as u16) & 0x7FF;
        let exp = |shift: u8| u2::new((exponent >> shift) & 0b11);
        Self {
            a: IndMtxPart::default()
                .with_m0(u11::new(mask11(mantissas[0][0])))
                .with_m1(u11::new(mask11(mantissas[1][0])))
                .with_exponent_bits(exp(0)),
            b: IndMtxPart::default()
                .with_m0(u11::new(mask11(mantissas[0][1])))
                .with_m1(u11::new(mask11(mantissas[1][1])))
                .with_exponent_bits(exp(2)),
            c: IndMtxPart::default()
                .with_m0(u11::new(mask11(mantissas[0][2])))
                .with_m1(u11::new(mask11(mantissas[1][2])))
                .with_exponent_bits(exp(4)),
        }
    }
}

/// `RAS1_IREF`: per-indirect-stage texCoord/texMap references, 3 bits each.
#[bitos(32)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IndirectRef {
    #[bits(0..3)]
    pub coord_0: u3,
    #[bits(3..6)]
    pub map_0: u3,
    #[bits(6..9)]
    pub coord_1: u3,
    #[bits(9..12)]
    pub map_1: u3,
    #[bits(12..15)]
    pub coord_2: u3,
    #[bits(15..18)]
    pub map_2: u3,
    #[bits(18..21)]
    pub coord_3: u3,
    #[bits(21..24)]
    pub map_3: u3,
}

#[bitos(3)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndirectScale {
    #[default]
    X1 = 0,
    X2 = 1,
    X4 = 2,
    X8 = 3,
    X16 = 4,
    X32 = 5,
    X64 = 6,
    X128 = 7,
}

/// `RAS1_SS0`/`RAS1_SS1`: the U/V texcoord scale for two indirect stages.
#[bitos(32)]
#[derive(Debug, Clone, Copy, Default)]
pub struct IndirectScalePair {
    #[bits(0..3)]
    pub u0: IndirectScale,
    #[bits(3..6)]
    pub v0: IndirectScale,
    #[bits(8..11)]
    pub u1: IndirectScale,
    #[bits(11..14)]
    pub v1: IndirectScale,
}

#[bitos(3)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndirectBiasSelect {
    #[default]
    None = 0,
    S = 1,
    T = 2,
    St = 3,
    U = 4,
    Su = 5,
    Tu = 6,
    Stu = 7,
}

#[bitos(4)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndirectMatrixSelect {
    #[default]
    Off = 0,
    Matrix0 = 1,
    Matrix1 = 2,
    Matrix2 = 3,
    ScaleS0 = 5,
    ScaleS1 = 6,
    ScaleS2 = 7,
    ScaleT0 = 9,
    ScaleT1 = 10,
    ScaleT2 = 11,
}

#[bitos(3)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndirectWrap {
    #[default]
    Off = 0,
    W0 = 1,
    W16 = 2,
    W32 = 3,
    W64 = 4,
    W128 = 5,
    W256 = 6,
}

#[bitos(2)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndirectAlphaSelect {
    #[default]
    Off = 0,
    S = 1,
    T = 2,
    U = 3,
}

/// `TEV_IND_CMD[i]`: the indirect sub-stage attached to TEV stage `i`.
#[bitos(21)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IndirectCommand {
    #[bits(0..2)]
    pub stage_sel: u2,
    #[bits(2..4)]
    pub format: u2,
    #[bits(4..7)]
    pub bias: IndirectBiasSelect,
    #[bits(7..9)]
    pub alpha: IndirectAlphaSelect,
    #[bits(9..13)]
    pub matrix: IndirectMatrixSelect,
    #[bits(13..16)]
    pub wrap_u: IndirectWrap,
    #[bits(16..19)]
    pub wrap_v: IndirectWrap,
    #[bits(19)]
    pub add_prev: bool,
    #[bits(20)]
    pub utc_lod: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exponent_round_trips_through_three_parts() {
        let reg = IndMtxRegister::from_parts(0x2A, [[100, -200, 300], [-400, 500, -600]]);
        assert_eq!(reg.exponent(), 0x2A);
        assert_eq!(reg.mantissas(), [[100, -200, 300], [-400, 500, -600]]);
    }
}
