//! Texture matrices: the SRT parameters and effect matrix a texgen's
//! `TexMatrixSelect` can point at.

use glam::{Mat4, Vec2};
use ordered_float::OrderedFloat;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TexMatrixProjection {
    #[default]
    Matrix2x4,
    Matrix3x4,
}

/// Which modelling package's convention the SRT decomposition assumes
/// (affects how `scale`/`rotate`/`translate` combine into `effect_matrix`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TransformModel {
    #[default]
    Default,
    Maya,
    Max,
    Xsi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TexMatrixMethod {
    #[default]
    Standard,
    Env,
    ViewProj,
    Proj,
    EnvLight,
    EnvSpec,
    ManualEnv,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TexMatrixOption {
    #[default]
    Standard,
    DontRemap,
    KeepTranslation,
}

/// One of the ten texture matrices. `cam_idx`/`light_idx` are `None` unless
/// `method` is one of the camera- or light-relative env-mapping variants.
#[derive(Debug, Clone, Copy)]
pub struct TexMatrix {
    pub projection: TexMatrixProjection,
    pub scale: Vec2,
    /// Radians.
    pub rotate: f32,
    pub translate: Vec2,
    pub effect_matrix: Mat4,
    pub transform_model: TransformModel,
    pub method: TexMatrixMethod,
    pub option: TexMatrixOption,
    pub cam_idx: Option<u8>,
    pub light_idx: Option<u8>,
}

impl Default for TexMatrix {
    fn default() -> Self {
        Self {
            projection: TexMatrixProjection::default(),
            scale: Vec2::ONE,
            rotate: 0.0,
            translate: Vec2::ZERO,
            effect_matrix: Mat4::IDENTITY,
            transform_model: TransformModel::default(),
            method: TexMatrixMethod::default(),
            option: TexMatrixOption::default(),
            cam_idx: None,
            light_idx: None,
        }
    }
}

impl PartialEq for TexMatrix {
    fn eq(&self, other: &Self) -> bool {
        self.projection == other.projection
            && OrderedFloat(self.scale.x) == OrderedFloat(other.scale.x)
            && OrderedFloat(self.scale.y) == OrderedFloat(other.scale.y)
            && OrderedFloat(self.rotate) == OrderedFloat(other.rotate)
            && OrderedFloat(self.translate.x) == OrderedFloat(other.translate.x)
            && OrderedFloat(self.translate.y) == OrderedFloat(other.translate.y)
            && self.effect_matrix.to_cols_array().map(OrderedFloat)
                == other.effect_matrix.to_cols_array().map(OrderedFloat)
            && self.transform_model == other.transform_model
            && self.method == other.method
            && self.option == other.option
            && self.cam_idx == other.cam_idx
            && self.light_idx == other.light_idx
    }
}

impl Eq for TexMatrix {}
