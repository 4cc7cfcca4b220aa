//! Failures the generator can hit while turning a [`gx_material::Material`]
//! into GLSL text. Per §4.7 the generator is total over every *valid*
//! material: it never emits silently-wrong code, it returns `Err` instead.

use easyerr::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("stage {stage}'s {sub} formula is a comparison ({formula:?}) but has a nonzero bias/scale ({bias:?}/{scale:?})")]
    ComparisonWithBiasScale {
        stage: usize,
        sub: &'static str,
        formula: gx_material::TevFormula,
        bias: gx_material::TevBias,
        scale: gx_material::TevScale,
    },
    #[error("stage {stage}'s indirect matrix selection {selection:?} (texcoord-scale variant) is unsupported")]
    UnsupportedIndirectMatrixSelect {
        stage: usize,
        selection: gx_material::tev::IndirectMatrixSelect,
    },
    #[error("material has {tex_gens} texgens but {samplers} samplers")]
    TexGenSamplerMismatch { tex_gens: usize, samplers: usize },
    #[error("material has no TEV stages")]
    NoStages,
    #[error(transparent)]
    Format { source: std::fmt::Error },
}

impl From<std::fmt::Error> for Error {
    fn from(source: std::fmt::Error) -> Self {
        Self::Format { source }
    }
}
