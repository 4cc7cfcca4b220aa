//! Texture coordinate generators (the static XF side of texture mapping).

/// Which vertex attribute feeds a texgen before any matrix is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TexGenSource {
    #[default]
    Position,
    Normal,
    Binormal,
    Tangent,
    Tex0,
    Tex1,
    Tex2,
    Tex3,
    Tex4,
    Tex5,
    Tex6,
    Tex7,
    Color0,
    Color1,
}

/// How many rows of the source vector the generator consumes and whether
/// it runs the emboss-bump formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TexGenFunc {
    #[default]
    Matrix2x4,
    Matrix3x4,
    /// "Srtg": the raw source row is used directly, untransformed.
    Srtg,
    Bump0,
    Bump1,
    Bump2,
    Bump3,
    Bump4,
    Bump5,
    Bump6,
    Bump7,
}

/// `matrix` selection: `Identity` or one of the ten texture matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TexMatrixSelect {
    #[default]
    Identity,
    TexMatrix(u8),
}

/// `postMatrix` selection: `Identity` or one of the twenty post-transform
/// matrices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PostMatrixSelect {
    #[default]
    Identity,
    Matrix(u8),
}

/// One texgen: source, function, matrix selection and whether the result
/// is renormalized (emboss bump and some env-mapping setups need this).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TexGen {
    pub func: TexGenFunc,
    pub source: TexGenSource,
    pub matrix: TexMatrixSelect,
    pub normalize: bool,
    pub post_matrix: PostMatrixSelect,
}
