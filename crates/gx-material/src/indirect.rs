//! Indirect texture matrices and the stages that sample through them.
//!
//! The decoded floating-point form lives here; quantizing it back to the
//! hardware's mantissa+exponent encoding is `gx-indirect`'s job (§4.5).

use ordered_float::OrderedFloat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum IndirectScale {
    #[default]
    X1,
    X2,
    X4,
    X8,
    X16,
    X32,
    X64,
    X128,
    X256,
}

/// One of the (at most three) indirect texture transform matrices, decoded
/// to floats. Row-major: `rows[0]` and `rows[1]` are the two output rows,
/// each holding the `s`, `t`, `1` coefficients.
#[derive(Debug, Clone, Copy)]
pub struct IndirectMatrix {
    pub rows: [[f32; 3]; 2],
}

impl Default for IndirectMatrix {
    fn default() -> Self {
        Self {
            rows: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        }
    }
}

impl PartialEq for IndirectMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.rows.map(|row| row.map(OrderedFloat)) == other.rows.map(|row| row.map(OrderedFloat))
    }
}

impl Eq for IndirectMatrix {}

/// `indTexOrder`/`indTexScale`: one of the four indirect-coordinate setup
/// slots a `TevStage::indirect.stage_sel` can refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IndirectStage {
    pub scale_s: IndirectScale,
    pub scale_t: IndirectScale,
    pub ref_map: u8,
    pub ref_coord: u8,
}
