//! Indirect-texture-matrix quantizer (component E, §4.5).
//!
//! On hardware an indirect matrix is six signed 11-bit mantissas sharing
//! one signed exponent. [`encode`] turns a high-level [`IndirectMatrix`]
//! into that representation; [`decode`] recovers the float matrix and a
//! best-effort `{scale, rotate, translate}` decomposition, flagging when
//! the decomposition doesn't reproduce the original within tolerance.

use gx_material::IndirectMatrix;

/// Exponent bias applied before quantization (§4.5).
pub const EXPONENT_BIAS: i32 = 0x11;
/// Hardware exponent range, post-bias-subtraction.
pub const EXPONENT_MIN: i32 = -17;
pub const EXPONENT_MAX: i32 = 46;

const MANTISSA_SCALE: f32 = 1024.0;

/// The quantized hardware encoding: one shared exponent and six signed
/// 11-bit mantissas (two rows of three).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuantizedMatrix {
    /// Already biased by [`EXPONENT_BIAS`] (this is the raw register field).
    pub exponent: u8,
    pub mantissas: [[i16; 3]; 2],
}

/// Encodes a floating-point indirect matrix into its hardware form
/// (§4.5's "Encoding" procedure).
pub fn encode(matrix: &IndirectMatrix) -> QuantizedMatrix {
    let max_abs = matrix
        .rows
        .iter()
        .flatten()
        .fold(0.0f32, |acc, &x| acc.max(x.abs()));

    let mut exponent = 0i32;
    let mut scale = 1.0f32;

    if max_abs >= 1.0 {
        while max_abs * scale >= 1.0 {
            scale *= 0.5;
            exponent += 1;
        }
    } else if max_abs > 0.0 {
        while max_abs * scale < 0.5 && exponent > EXPONENT_MIN {
            scale *= 2.0;
            exponent -= 1;
        }
    }

    let biased_exponent = (exponent + EXPONENT_BIAS).clamp(0, 0x3F) as u8;

    let mut mantissas = [[0i16; 3]; 2];
    for (row_idx, row) in matrix.rows.iter().enumerate() {
        for (col_idx, &value) in row.iter().enumerate() {
            let quantized = (value * scale * MANTISSA_SCALE) as i32;
            let masked = (quantized & 0x7FF) as i16;
            // sign-extend from 11 bits so `mantissas` always matches what
            // `IndMtxRegister::mantissas()` returns.
            mantissas[row_idx][col_idx] = (masked << 5) >> 5;
        }
    }

    QuantizedMatrix {
        exponent: biased_exponent,
        mantissas,
    }
}

/// Decodes a hardware-form matrix back to floats (§4.5's "Decoding"
/// procedure). Mantissas are expected already sign-extended from their
/// 11-bit storage (see `gx_regs::bp::indirect::IndMtxRegister::mantissas`).
pub fn decode(quantized: &QuantizedMatrix) -> IndirectMatrix {
    let scale = 2f32.powi(i32::from(quantized.exponent) - EXPONENT_BIAS);
    let mut rows = [[0.0f32; 3]; 2];
    for (row_idx, row) in quantized.mantissas.iter().enumerate() {
        for (col_idx, &mantissa) in row.iter().enumerate() {
            rows[row_idx][col_idx] = scale * f32::from(mantissa) / MANTISSA_SCALE;
        }
    }
    IndirectMatrix { rows }
}

/// Closed-form SRT decomposition of a decoded 3x2 affine matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decomposition {
    pub scale: [f32; 2],
    /// Radians.
    pub rotate: f32,
    pub translate: [f32; 2],
}

/// Recovers `{scale, rotate, translate}` from a decoded matrix and checks
/// that re-composing it reproduces the matrix within tolerance (§4.5,
/// §8 Scenario C). `Err` carries the mismatched matrix unchanged, per
/// §7's `QuantizerMismatch` recovery policy (the caller keeps the
/// original matrix rather than the disagreeing decomposition).
pub fn decompose(matrix: &IndirectMatrix) -> Result<Decomposition, QuantizerMismatch> {
    let [[m00, m01, m02], [m10, m11, m12]] = matrix.rows;

    let scale_x = (m00 * m00 + m10 * m10).sqrt();
    let scale_y = (m01 * m01 + m11 * m11).sqrt();
    let rotate = m10.atan2(m00);
    let decomposition = Decomposition {
        scale: [scale_x, scale_y],
        rotate,
        translate: [m02, m12],
    };

    let recomposed = recompose(&decomposition);
    let divergence = jensen_shannon_divergence(&matrix.rows, &recomposed.rows);
    if round_2(divergence) > 0.01 {
        tracing::warn!("indirect matrix decomposition mismatch, divergence={divergence}");
        return Err(QuantizerMismatch::Diverged { divergence });
    }

    Ok(decomposition)
}

fn recompose(decomposition: &Decomposition) -> IndirectMatrix {
    let cos = decomposition.rotate.cos();
    let sin = decomposition.rotate.sin();
    let [sx, sy] = decomposition.scale;
    let [tx, ty] = decomposition.translate;
    IndirectMatrix {
        rows: [[sx * cos, -sy * sin, tx], [sx * sin, sy * cos, ty]],
    }
}

fn round_2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// A crude Jensen-Shannon-style divergence between two 3x2 matrices: both
/// are treated as unnormalized weight vectors over 6 bins of their
/// absolute values (§7).
fn jensen_shannon_divergence(a: &[[f32; 3]; 2], b: &[[f32; 3]; 2]) -> f32 {
    let flat_a: Vec<f32> = a.iter().flatten().map(|v| v.abs()).collect();
    let flat_b: Vec<f32> = b.iter().flatten().map(|v| v.abs()).collect();
    let sum_a: f32 = flat_a.iter().sum::<f32>().max(f32::EPSILON);
    let sum_b: f32 = flat_b.iter().sum::<f32>().max(f32::EPSILON);

    let mut divergence = 0.0f32;
    for (pa, pb) in flat_a.iter().zip(flat_b.iter()) {
        let pa = pa / sum_a;
        let pb = pb / sum_b;
        let m = 0.5 * (pa + pb);
        if m > 0.0 {
            if pa > 0.0 {
                divergence += 0.5 * pa * (pa / m).ln();
            }
            if pb > 0.0 {
                divergence += 0.5 * pb * (pb / m).ln();
            }
        }
    }
    divergence.max(0.0)
}

/// §7: indirect-matrix lift/lower disagreement after rounding.
#[derive(Debug, Clone, Copy, PartialEq, easyerr::Error)]
pub enum QuantizerMismatch {
    #[error("indirect matrix decomposition diverges from the original by {divergence}")]
    Diverged { divergence: f32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_c_indirect_matrix_round_trip() {
        let decomposition = Decomposition {
            scale: [2.0, 0.5],
            rotate: std::f32::consts::FRAC_PI_4,
            translate: [0.125, -0.25],
        };
        let matrix = recompose(&decomposition);

        let quantized = encode(&matrix);
        assert_eq!(quantized.exponent as i32 - EXPONENT_BIAS, 1);

        let decoded = decode(&quantized);
        for (row_a, row_b) in matrix.rows.iter().zip(decoded.rows.iter()) {
            for (a, b) in row_a.iter().zip(row_b.iter()) {
                assert!((a - b).abs() < 0.01, "{a} vs {b}");
            }
        }
    }

    #[test]
    fn identity_matrix_quantizes_to_exponent_zero() {
        let matrix = IndirectMatrix::default();
        let quantized = encode(&matrix);
        assert_eq!(i32::from(quantized.exponent) - EXPONENT_BIAS, 0);
        let decoded = decode(&quantized);
        assert_eq!(decoded, matrix);
    }

    #[test]
    fn decompose_recovers_original_srt_parameters() {
        let decomposition = Decomposition {
            scale: [2.0, 0.5],
            rotate: std::f32::consts::FRAC_PI_4,
            translate: [0.125, -0.25],
        };
        let matrix = recompose(&decomposition);
        let recovered = decompose(&matrix).unwrap();
        assert!((recovered.scale[0] - decomposition.scale[0]).abs() < 0.01);
        assert!((recovered.scale[1] - decomposition.scale[1]).abs() < 0.01);
        assert!((recovered.rotate - decomposition.rotate).abs() < 0.01);
    }
}
