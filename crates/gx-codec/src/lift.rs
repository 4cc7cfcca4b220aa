//! Register-to-state lifter (component C, §4.3).
//!
//! [`Lifter`] replays a stream of decoded [`Command`]s into the `gx_regs`
//! shadows, then [`Lifter::finish`] runs the post-stream derivation pass
//! that builds a [`Material`]. Everything the register files can express is
//! recovered this way; the handful of fields no BP/XF/CP register carries
//! (sampler texture/palette names, the translucency sort bit, the early-Z
//! authoring bit) are supplied by the caller via [`LiftContext`].

use color::Rgba8;
use gx_material::{
    CullMode, Material,
    channel as mchannel, indirect as mindirect, pixel as mpixel, sampler as msampler, texgen as mtexgen,
    tev as mtev,
};
use gx_regs::bp::{self, indirect as bind, pixel as bpixel, tev as btev, tex as btex};
use gx_regs::xf as bxf;
use gx_regs::{Bp, Cp, Xf};
use gx_stream::Command;

use crate::error::{Error, Warning};

/// Facts about a material that no BP/XF/CP register carries: samplers name
/// their textures only by string (§3.4), the opaque/translucent pass split
/// is a content-authoring decision rather than hardware state, and
/// `earlyZComparison` is a persisted authoring bit with no register behind
/// it at all.
#[derive(Debug, Clone, Default)]
pub struct LiftContext {
    /// `(texture, palette)` name pairs, indexed the same as `texGens`/
    /// `samplers`. Missing entries lift as empty strings.
    pub sampler_names: Vec<(String, String)>,
    pub xlu: bool,
    /// No BP/XF/CP register backs this: it's a persisted authoring bit
    /// (MAT3's `earlyZComparison`), not derived hardware state.
    pub early_z_comparison: bool,
}

/// Stateful visitor over a command stream: owns the register shadows and
/// accumulates them until [`finish`](Self::finish) runs the derivation pass.
#[derive(Debug, Default)]
pub struct Lifter {
    bp: Bp,
    xf: Xf,
    cp: Cp,
    warnings: Vec<Warning>,
}

impl Lifter {
    pub fn new() -> Self {
        Self {
            bp: Bp::new(),
            ..Default::default()
        }
    }

    /// Applies one decoded command to the register shadows. `Draw` carries
    /// no material state and `IndexedLoad` targets vertex-transform memory
    /// this crate does not shadow (§1's position/normal matrix and lighting
    /// scope exclusion), so both are no-ops here.
    pub fn feed(&mut self, command: &Command) {
        match command {
            Command::Nop | Command::Draw { .. } | Command::IndexedLoad { .. } => {}
            Command::Cp { register, value } => self.cp.write(*register, *value),
            Command::Xf { register, values } => self.xf.write_run(*register, values),
            Command::Bp { register, value } => match bp::Reg::from_repr(*register) {
                Some(reg) => self.bp.write_masked(reg, *value),
                None => {
                    let warning = Warning::InvalidRegister {
                        register: format!("BP 0x{register:02X}"),
                    };
                    tracing::warn!("{warning}");
                    self.warnings.push(warning);
                }
            },
        }
    }

    pub fn feed_all<'a>(&mut self, commands: impl IntoIterator<Item = &'a Command>) {
        for command in commands {
            self.feed(command);
        }
    }

    /// Runs §4.3's derivation pass over the accumulated register state,
    /// producing the high-level material plus any warnings recorded along
    /// the way. Fails only for the two cases spec.md §9 declares
    /// unsupported (comparative stages with stray bias/scale bits, and
    /// texcoord-scale indirect matrix selections) and malformed indirect
    /// texture formats.
    pub fn finish(mut self, ctx: &LiftContext) -> Result<(Material, Vec<Warning>), Error> {
        let mut material = Material::default();

        material.cull_mode = map_cull_mode(self.bp.mode.culling_mode());
        material.xlu = ctx.xlu;

        for i in 0..2 {
            material.chan_data[i] = mchannel::ChanData {
                mat_color: self.xf.mat_colors[i],
                amb_color: self.xf.amb_colors[i],
            };
            material.chan[i] = mchannel::LightingChannelControl {
                color: map_channel_control(self.xf.color_channels[i]),
                alpha: map_channel_control(self.xf.alpha_channels[i]),
            };
        }

        let tex_coords_count = usize::from(self.bp.mode.tex_coords_count().value()).min(8);
        for i in 0..tex_coords_count {
            material
                .tex_gens
                .push(decode_texgen(self.xf.tex_coord_gens[i], self.xf.dual_tex[i]));
            let (texture, palette) = ctx.sampler_names.get(i).cloned().unwrap_or_default();
            material
                .samplers
                .push(decode_sampler(self.bp.tex_mode0[i], texture, palette));
        }

        material.swap_table = decode_swap_table(&self.bp);
        let (tev_colors, tev_konst_colors) = decode_tev_registers(&self.bp);
        material.tev_colors = tev_colors;
        material.tev_konst_colors = tev_konst_colors;

        let num_stages = usize::from(self.bp.mode.tev_stages_minus_one().value()) + 1;
        for i in 0..num_stages {
            material.stages.push(decode_stage(&self.bp, i, &mut self.warnings)?);
        }

        let all_indirect_stages = decode_indirect_stages(&self.bp);
        let mut max_indirect_stage: Option<u8> = None;
        let mut max_indirect_matrix: Option<u8> = None;
        for stage in &material.stages {
            let indirect_active = stage.indirect.matrix != mtev::IndirectMatrixSelect::Off
                || stage.indirect.bias != mtev::IndirectBias::None
                || stage.indirect.alpha != mtev::IndirectAlphaSelect::Off;
            if indirect_active {
                max_indirect_stage =
                    Some(max_indirect_stage.map_or(stage.indirect.stage_sel, |m| m.max(stage.indirect.stage_sel)));
            }
            let matrix_index = match stage.indirect.matrix {
                mtev::IndirectMatrixSelect::Off => None,
                mtev::IndirectMatrixSelect::Matrix0 => Some(0u8),
                mtev::IndirectMatrixSelect::Matrix1 => Some(1),
                mtev::IndirectMatrixSelect::Matrix2 => Some(2),
            };
            if let Some(index) = matrix_index {
                max_indirect_matrix = Some(max_indirect_matrix.map_or(index, |m| m.max(index)));
            }
        }

        for k in 0..max_indirect_stage.map_or(0, |m| usize::from(m) + 1) {
            material.indirect_stages.push(all_indirect_stages[k]);
        }
        for k in 0..max_indirect_matrix.map_or(0, |m| usize::from(m) + 1) {
            let reg = self.bp.ind_mtx[k];
            let quantized = gx_indirect::QuantizedMatrix {
                exponent: reg.exponent(),
                mantissas: reg.mantissas(),
            };
            material.ind_matrices.push(gx_indirect::decode(&quantized));
        }

        material.alpha_compare = derive_alpha_compare(self.bp.alpha_function);
        material.z_mode = derive_z_mode(self.bp.depth_mode);
        material.blend_mode = derive_blend_mode(self.bp.blend_mode);
        material.dst_alpha = derive_dst_alpha(self.bp.constant_alpha);
        material.early_z_comparison = ctx.early_z_comparison;

        Ok((material, self.warnings))
    }
}

/// One-shot convenience wrapper: replays every command in `commands` through
/// a fresh [`Lifter`] and finishes it immediately.
pub fn lift<'a>(commands: impl IntoIterator<Item = &'a Command>, ctx: &LiftContext) -> Result<(Material, Vec<Warning>), Error> {
    let mut lifter = Lifter::new();
    lifter.feed_all(commands);
    lifter.finish(ctx)
}

fn map_cull_mode(c: bp::CullingMode) -> CullMode {
    match c {
        bp::CullingMode::None => CullMode::None,
        bp::CullingMode::Negative => CullMode::Front,
        bp::CullingMode::Positive => CullMode::Back,
        bp::CullingMode::All => CullMode::All,
    }
}

fn map_color_source(s: bxf::ColorSrc) -> mchannel::ColorSource {
    match s {
        bxf::ColorSrc::Register => mchannel::ColorSource::Register,
        bxf::ColorSrc::Vertex => mchannel::ColorSource::Vertex,
    }
}

fn map_diffuse_fn(d: bxf::DiffuseFn) -> mchannel::DiffuseFn {
    match d {
        bxf::DiffuseFn::None => mchannel::DiffuseFn::None,
        bxf::DiffuseFn::Sign => mchannel::DiffuseFn::Sign,
        bxf::DiffuseFn::Clamp => mchannel::DiffuseFn::Clamp,
    }
}

/// Derives the attenuation function from the two raw `LitChannel` bits the
/// hardware actually stores: `if (!attnSelect) Spec; else if (!attnEnable)
/// None; else Spot`.
fn map_attenuation_fn(attn_enable: bool, attn_select: bool) -> mchannel::AttenuationFn {
    if !attn_select {
        mchannel::AttenuationFn::Spec
    } else if !attn_enable {
        mchannel::AttenuationFn::None
    } else {
        mchannel::AttenuationFn::Spot
    }
}

fn map_channel_control(c: bxf::ChannelControl) -> mchannel::ChannelControl {
    mchannel::ChannelControl {
        enabled: c.enabled(),
        mat_source: map_color_source(c.mat_source()),
        amb_source: map_color_source(c.amb_source()),
        light_mask: c.light_mask(),
        diffuse_fn: map_diffuse_fn(c.diffuse_fn()),
        attenuation_fn: map_attenuation_fn(c.attn_enable(), c.attn_select()),
    }
}

fn map_source_row(row: bxf::SourceRow) -> mtexgen::TexGenSource {
    use bxf::SourceRow as B;
    use mtexgen::TexGenSource as M;
    match row {
        B::Geometry => M::Position,
        B::Normal => M::Normal,
        B::Binormal => M::Binormal,
        B::Tangent => M::Tangent,
        B::Tex0 => M::Tex0,
        B::Tex1 => M::Tex1,
        B::Tex2 => M::Tex2,
        B::Tex3 => M::Tex3,
        B::Tex4 => M::Tex4,
        B::Tex5 => M::Tex5,
        B::Tex6 => M::Tex6,
        B::Tex7 => M::Tex7,
        B::Color0 => M::Color0,
        B::Color1 => M::Color1,
    }
}

fn tex_source_from_shift(shift: u8) -> mtexgen::TexGenSource {
    use mtexgen::TexGenSource::{Tex0, Tex1, Tex2, Tex3, Tex4, Tex5, Tex6, Tex7};
    match shift {
        0 => Tex0,
        1 => Tex1,
        2 => Tex2,
        3 => Tex3,
        4 => Tex4,
        5 => Tex5,
        6 => Tex6,
        _ => Tex7,
    }
}

fn bump_func_from_shift(shift: u8) -> mtexgen::TexGenFunc {
    use mtexgen::TexGenFunc::{Bump0, Bump1, Bump2, Bump3, Bump4, Bump5, Bump6, Bump7};
    match shift {
        0 => Bump0,
        1 => Bump1,
        2 => Bump2,
        3 => Bump3,
        4 => Bump4,
        5 => Bump5,
        6 => Bump6,
        _ => Bump7,
    }
}

/// Decoding cases from §4.3: `REGULAR` picks `Matrix2x4`/`Matrix3x4` by
/// projection; `COLOR0`/`COLOR1` are SRTG directly (the bitfield already
/// separates them from the emboss case, unlike the original encoding's
/// combined emboss-kind + source-row check); any other `EMBOSS_MAP` is a
/// bump texgen sourced from `UV{source_shift}`.
fn decode_texgen(tcg: bxf::TexCoordGen, dti: bxf::DualTexInfo) -> mtexgen::TexGen {
    let (func, source) = match tcg.kind() {
        bxf::TexGenType::Regular => {
            let func = if tcg.projection() == bxf::Projection::Stq {
                mtexgen::TexGenFunc::Matrix3x4
            } else {
                mtexgen::TexGenFunc::Matrix2x4
            };
            (func, map_source_row(tcg.source_row()))
        }
        bxf::TexGenType::Color0 => (mtexgen::TexGenFunc::Srtg, mtexgen::TexGenSource::Color0),
        bxf::TexGenType::Color1 => (mtexgen::TexGenFunc::Srtg, mtexgen::TexGenSource::Color1),
        bxf::TexGenType::EmbossMap => (
            bump_func_from_shift(tcg.emboss_light_shift().value()),
            tex_source_from_shift(tcg.emboss_source_shift().value()),
        ),
    };

    let matrix = match dti.tex_matrix().value() {
        0 => mtexgen::TexMatrixSelect::Identity,
        n => mtexgen::TexMatrixSelect::TexMatrix(n - 1),
    };
    let post_matrix = match dti.post_matrix().value() {
        0 => mtexgen::PostMatrixSelect::Identity,
        n => mtexgen::PostMatrixSelect::Matrix(n - 1),
    };

    mtexgen::TexGen {
        func,
        source,
        matrix,
        normalize: dti.normalize(),
        post_matrix,
    }
}

fn map_wrap_mode(w: btex::WrapMode) -> msampler::WrapMode {
    match w {
        btex::WrapMode::Clamp => msampler::WrapMode::Clamp,
        btex::WrapMode::Repeat => msampler::WrapMode::Repeat,
        btex::WrapMode::Mirror => msampler::WrapMode::Mirror,
    }
}

fn map_min_filter(f: btex::MinFilter) -> msampler::MinFilter {
    use btex::MinFilter as B;
    use msampler::MinFilter as M;
    match f {
        B::Near => M::Near,
        B::Linear => M::Linear,
        B::NearMipNear => M::NearMipNear,
        B::LinMipNear => M::LinMipNear,
        B::NearMipLin => M::NearMipLin,
        B::LinMipLin => M::LinMipLin,
    }
}

fn map_mag_filter(f: btex::MagFilter) -> msampler::MagFilter {
    match f {
        btex::MagFilter::Near => msampler::MagFilter::Near,
        btex::MagFilter::Linear => msampler::MagFilter::Linear,
    }
}

fn map_max_aniso(a: btex::MaxAniso) -> msampler::MaxAniso {
    match a {
        btex::MaxAniso::X1 => msampler::MaxAniso::X1,
        btex::MaxAniso::X2 => msampler::MaxAniso::X2,
        btex::MaxAniso::X4 => msampler::MaxAniso::X4,
    }
}

/// `TEXMODE1`'s LOD clamp range has no counterpart in [`Sampler`]
/// (spec.md §3.1's sampler record does not carry one either), so it is
/// read back from the shadow but not surfaced; the lowerer re-emits it at
/// its hardware reset value.
fn decode_sampler(mode0: btex::TexMode0, texture: String, palette: String) -> msampler::Sampler {
    msampler::Sampler {
        texture,
        palette,
        wrap_u: map_wrap_mode(mode0.wrap_s()),
        wrap_v: map_wrap_mode(mode0.wrap_t()),
        min_filter: map_min_filter(mode0.min_filter()),
        mag_filter: map_mag_filter(mode0.mag_filter()),
        max_aniso: map_max_aniso(mode0.max_aniso()),
        lod_bias_bits: mode0.lod_bias(),
        bias_clamp: mode0.bias_clamp(),
        edge_lod: mode0.edge_lod(),
    }
}

fn map_ras_channel(c: btev::ColorChannel) -> Result<mtev::RasChannel, Error> {
    use btev::ColorChannel::{AlphaBump, AlphaBumpNormalized, Channel0, Channel1, Reserved0, Reserved1, Reserved2, Zero};
    match c {
        Channel0 => Ok(mtev::RasChannel::Channel0),
        Channel1 => Ok(mtev::RasChannel::Channel1),
        AlphaBump => Ok(mtev::RasChannel::AlphaBump),
        AlphaBumpNormalized => Ok(mtev::RasChannel::AlphaBumpNormalized),
        Zero => Ok(mtev::RasChannel::Zero),
        Reserved0 | Reserved1 | Reserved2 => Err(Error::InvalidEnum {
            field: "tev stage rasterizer channel",
            value: format!("{c:?}"),
        }),
    }
}

fn map_konst(c: btev::Constant) -> Result<mtev::Konst, Error> {
    use btev::Constant as B;
    use mtev::Konst as M;
    Ok(match c {
        B::One => M::One,
        B::SevenEights => M::SevenEighths,
        B::SixEights => M::ThreeQuarters,
        B::FiveEights => M::FiveEighths,
        B::FourEights => M::Half,
        B::ThreeEights => M::ThreeEighths,
        B::TwoEights => M::OneQuarter,
        B::OneEight => M::OneEighth,
        B::Const0 => M::Const0Rgb,
        B::Const1 => M::Const1Rgb,
        B::Const2 => M::Const2Rgb,
        B::Const3 => M::Const3Rgb,
        B::Const0R => M::Const0R,
        B::Const1R => M::Const1R,
        B::Const2R => M::Const2R,
        B::Const3R => M::Const3R,
        B::Const0G => M::Const0G,
        B::Const1G => M::Const1G,
        B::Const2G => M::Const2G,
        B::Const3G => M::Const3G,
        B::Const0B => M::Const0B,
        B::Const1B => M::Const1B,
        B::Const2B => M::Const2B,
        B::Const3B => M::Const3B,
        B::Const0A => M::Const0A,
        B::Const1A => M::Const1A,
        B::Const2A => M::Const2A,
        B::Const3A => M::Const3A,
        B::Reserved0 | B::Reserved1 | B::Reserved2 | B::Reserved3 => {
            return Err(Error::InvalidEnum {
                field: "tev stage konst selection",
                value: format!("{c:?}"),
            });
        }
    })
}

fn map_color_input(src: btev::ColorInputSrc) -> mtev::ColorInput {
    use btev::ColorInputSrc as B;
    use mtev::ColorInput as M;
    match src {
        B::R3Color => M::PrevColor,
        B::R3Alpha => M::PrevAlpha,
        B::R0Color => M::Reg0Color,
        B::R0Alpha => M::Reg0Alpha,
        B::R1Color => M::Reg1Color,
        B::R1Alpha => M::Reg1Alpha,
        B::R2Color => M::Reg2Color,
        B::R2Alpha => M::Reg2Alpha,
        B::TexColor => M::TexColor,
        B::TexAlpha => M::TexAlpha,
        B::ChanColor => M::RasColor,
        B::ChanAlpha => M::RasAlpha,
        B::One => M::One,
        B::Half => M::Half,
        B::Constant => M::Konst,
        B::Zero => M::Zero,
    }
}

fn map_alpha_input(src: btev::AlphaInputSrc) -> mtev::AlphaInput {
    use btev::AlphaInputSrc as B;
    use mtev::AlphaInput as M;
    match src {
        B::R3Alpha => M::PrevAlpha,
        B::R0Alpha => M::Reg0Alpha,
        B::R1Alpha => M::Reg1Alpha,
        B::R2Alpha => M::Reg2Alpha,
        B::TexAlpha => M::TexAlpha,
        B::ChanAlpha => M::RasAlpha,
        B::Constant => M::Konst,
        B::Zero => M::Zero,
    }
}

fn map_output(o: btev::OutputDst) -> mtev::TevOutput {
    match o {
        btev::OutputDst::R3 => mtev::TevOutput::Prev,
        btev::OutputDst::R0 => mtev::TevOutput::Reg0,
        btev::OutputDst::R1 => mtev::TevOutput::Reg1,
        btev::OutputDst::R2 => mtev::TevOutput::Reg2,
    }
}

fn map_bias(b: btev::Bias) -> mtev::TevBias {
    match b {
        btev::Bias::Zero => mtev::TevBias::Zero,
        btev::Bias::PositiveHalf => mtev::TevBias::AddHalf,
        btev::Bias::NegativeHalf => mtev::TevBias::SubHalf,
        btev::Bias::Comparative => unreachable!("caller must check is_comparative before mapping bias"),
    }
}

fn map_scale(s: btev::Scale) -> mtev::TevScale {
    match s {
        btev::Scale::One => mtev::TevScale::One,
        btev::Scale::Two => mtev::TevScale::Two,
        btev::Scale::Four => mtev::TevScale::Four,
        btev::Scale::Half => mtev::TevScale::Half,
    }
}

/// §9's resolved open question: a comparative sub-stage always forces
/// `bias=Zero, scale=One`, so `op`/`scale` never need decoding there. The
/// `Component` target means `Rgb8` for a color sub-stage but `A8` for an
/// alpha sub-stage, since alpha has no G/B channels to compare.
fn map_comparative_formula(op: btev::CompareOp, target: btev::CompareTarget, is_alpha: bool) -> mtev::TevFormula {
    use btev::CompareOp::{Equal, GreaterThan};
    use btev::CompareTarget::{BGR16, Component, GR16, R8};
    use mtev::TevFormula::{CompA8Eq, CompA8Gt, CompBgr24Eq, CompBgr24Gt, CompGr16Eq, CompGr16Gt, CompR8Eq, CompR8Gt, CompRgb8Eq, CompRgb8Gt};
    match (target, op) {
        (R8, GreaterThan) => CompR8Gt,
        (R8, Equal) => CompR8Eq,
        (GR16, GreaterThan) => CompGr16Gt,
        (GR16, Equal) => CompGr16Eq,
        (BGR16, GreaterThan) => CompBgr24Gt,
        (BGR16, Equal) => CompBgr24Eq,
        (Component, GreaterThan) if is_alpha => CompA8Gt,
        (Component, Equal) if is_alpha => CompA8Eq,
        (Component, GreaterThan) => CompRgb8Gt,
        (Component, Equal) => CompRgb8Eq,
    }
}

fn decode_color_stage(s: btev::StageColor) -> mtev::ColorStage {
    let a = map_color_input(s.input_a());
    let b = map_color_input(s.input_b());
    let c = map_color_input(s.input_c());
    let d = map_color_input(s.input_d());
    let output = map_output(s.output());
    if s.is_comparative() {
        mtev::ColorStage {
            a,
            b,
            c,
            d,
            formula: map_comparative_formula(s.compare_op(), s.compare_target(), false),
            bias: mtev::TevBias::Zero,
            scale: mtev::TevScale::One,
            clamp: s.clamp(),
            output,
        }
    } else {
        mtev::ColorStage {
            a,
            b,
            c,
            d,
            formula: if s.negate() { mtev::TevFormula::Sub } else { mtev::TevFormula::Add },
            bias: map_bias(s.bias()),
            scale: map_scale(s.scale()),
            clamp: s.clamp(),
            output,
        }
    }
}

fn decode_alpha_stage(s: btev::StageAlpha) -> mtev::AlphaStage {
    let a = map_alpha_input(s.input_a());
    let b = map_alpha_input(s.input_b());
    let c = map_alpha_input(s.input_c());
    let d = map_alpha_input(s.input_d());
    let output = map_output(s.output());
    if s.is_comparative() {
        mtev::AlphaStage {
            a,
            b,
            c,
            d,
            formula: map_comparative_formula(s.compare_op(), s.compare_target(), true),
            bias: mtev::TevBias::Zero,
            scale: mtev::TevScale::One,
            clamp: s.clamp(),
            output,
        }
    } else {
        mtev::AlphaStage {
            a,
            b,
            c,
            d,
            formula: if s.negate() { mtev::TevFormula::Sub } else { mtev::TevFormula::Add },
            bias: map_bias(s.bias()),
            scale: map_scale(s.scale()),
            clamp: s.clamp(),
            output,
        }
    }
}

fn map_indirect_bias(b: bind::IndirectBiasSelect) -> mtev::IndirectBias {
    use bind::IndirectBiasSelect as B;
    use mtev::IndirectBias as M;
    match b {
        B::None => M::None,
        B::S => M::S,
        B::T => M::T,
        B::St => M::St,
        B::U => M::U,
        B::Su => M::Su,
        B::Tu => M::Tu,
        B::Stu => M::Stu,
    }
}

fn map_indirect_alpha(a: bind::IndirectAlphaSelect) -> mtev::IndirectAlphaSelect {
    match a {
        bind::IndirectAlphaSelect::Off => mtev::IndirectAlphaSelect::Off,
        bind::IndirectAlphaSelect::S => mtev::IndirectAlphaSelect::S,
        bind::IndirectAlphaSelect::T => mtev::IndirectAlphaSelect::T,
        bind::IndirectAlphaSelect::U => mtev::IndirectAlphaSelect::U,
    }
}

fn map_indirect_wrap(w: bind::IndirectWrap) -> mtev::IndirectWrap {
    use bind::IndirectWrap as B;
    use mtev::IndirectWrap as M;
    match w {
        B::Off => M::Off,
        B::W0 => M::Zero,
        B::W16 => M::W16,
        B::W32 => M::W32,
        B::W64 => M::W64,
        B::W128 => M::W128,
        B::W256 => M::W256,
    }
}

/// §9's other resolved open question: the texcoord-scale matrix selections
/// (`s0..s2`, `t0..t2`) are unsupported, so they error rather than silently
/// mapping to `Off`.
fn map_indirect_matrix(m: bind::IndirectMatrixSelect) -> Result<mtev::IndirectMatrixSelect, Error> {
    use bind::IndirectMatrixSelect as B;
    use mtev::IndirectMatrixSelect as M;
    match m {
        B::Off => Ok(M::Off),
        B::Matrix0 => Ok(M::Matrix0),
        B::Matrix1 => Ok(M::Matrix1),
        B::Matrix2 => Ok(M::Matrix2),
        other @ (B::ScaleS0 | B::ScaleS1 | B::ScaleS2 | B::ScaleT0 | B::ScaleT1 | B::ScaleT2) => Err(Error::InvalidEnum {
            field: "indirect matrix select",
            value: format!("{other:?}"),
        }),
    }
}

fn map_indirect_scale(s: bind::IndirectScale) -> mindirect::IndirectScale {
    use bind::IndirectScale as B;
    use mindirect::IndirectScale as M;
    match s {
        B::X1 => M::X1,
        B::X2 => M::X2,
        B::X4 => M::X4,
        B::X8 => M::X8,
        B::X16 => M::X16,
        B::X32 => M::X32,
        B::X64 => M::X64,
        B::X128 => M::X128,
    }
}

fn decode_indirect_stages(bp: &Bp) -> [mindirect::IndirectStage; 4] {
    let r = bp.ind_ref;
    let refs = [
        (r.coord_0().value(), r.map_0().value()),
        (r.coord_1().value(), r.map_1().value()),
        (r.coord_2().value(), r.map_2().value()),
        (r.coord_3().value(), r.map_3().value()),
    ];
    let scales = [
        (bp.ind_scale[0].u0(), bp.ind_scale[0].v0()),
        (bp.ind_scale[0].u1(), bp.ind_scale[0].v1()),
        (bp.ind_scale[1].u0(), bp.ind_scale[1].v0()),
        (bp.ind_scale[1].u1(), bp.ind_scale[1].v1()),
    ];
    std::array::from_fn(|k| {
        let (coord, map) = refs[k];
        let (scale_s, scale_t) = scales[k];
        mindirect::IndirectStage {
            scale_s: map_indirect_scale(scale_s),
            scale_t: map_indirect_scale(scale_t),
            ref_map: map,
            ref_coord: coord,
        }
    })
}

fn decode_indirect_command(bp: &Bp, stage: usize, warnings: &mut Vec<Warning>) -> Result<mtev::IndirectStageRef, Error> {
    let fallback = stage / 2;
    let slot = if bp.ind_cmd_written & (1 << stage) != 0 {
        stage
    } else {
        let warning = Warning::UndefinedIndCmdSlot { stage, fallback };
        tracing::warn!("{warning}");
        warnings.push(warning);
        fallback
    };
    let cmd = bp.ind_cmd[slot];

    if cmd.format().value() != 0 {
        return Err(Error::InvalidEnum {
            field: "indirect format",
            value: cmd.format().value().to_string(),
        });
    }

    Ok(mtev::IndirectStageRef {
        stage_sel: cmd.stage_sel().value(),
        format: mtev::IndirectFormat::Bits8,
        bias: map_indirect_bias(cmd.bias()),
        alpha: map_indirect_alpha(cmd.alpha()),
        matrix: map_indirect_matrix(cmd.matrix())?,
        wrap_u: map_indirect_wrap(cmd.wrap_u()),
        wrap_v: map_indirect_wrap(cmd.wrap_v()),
        add_prev: cmd.add_prev(),
        utc_lod: cmd.utc_lod(),
    })
}

fn decode_stage(bp: &Bp, index: usize, warnings: &mut Vec<Warning>) -> Result<mtev::TevStage, Error> {
    let refs_pair = bp.tev_refs[index / 2];
    let refs = if index % 2 == 0 { refs_pair.a() } else { refs_pair.b() };
    let (tex_coord, tex_map) = if refs.map_enable() {
        (Some(refs.coord().value()), Some(refs.map().value()))
    } else {
        (None, None)
    };
    let ras_order = map_ras_channel(refs.color())?;

    let consts_pair = bp.tev_consts[index / 2];
    let (raw_konst_color, raw_konst_alpha) = if index % 2 == 0 {
        (consts_pair.color_a(), consts_pair.alpha_a())
    } else {
        (consts_pair.color_b(), consts_pair.alpha_b())
    };
    let konst_color = map_konst(raw_konst_color)?;
    let konst_alpha = map_konst(raw_konst_alpha)?;

    let ops = bp.tev_ops[index];
    let color = decode_color_stage(ops.color);
    let alpha = decode_alpha_stage(ops.alpha);
    let indirect = decode_indirect_command(bp, index, warnings)?;

    Ok(mtev::TevStage {
        color,
        alpha,
        konst_color,
        konst_alpha,
        tex_coord,
        tex_map,
        ras_order,
        ras_swap: ops.alpha.rasterizer_swap().value(),
        tex_swap: ops.alpha.texture_swap().value(),
        indirect,
    })
}

fn map_swap_channel(v: u8) -> mtev::SwapChannel {
    match v & 0b11 {
        0 => mtev::SwapChannel::R,
        1 => mtev::SwapChannel::G,
        2 => mtev::SwapChannel::B,
        _ => mtev::SwapChannel::A,
    }
}

/// §4.3: even-`i` `TEV_KSEL` supplies the R/G swap of table `i/2`, odd-`i`
/// the B/A swap.
fn decode_swap_table(bp: &Bp) -> [mtev::SwapTableEntry; 4] {
    let mut table = [mtev::SwapTableEntry::default(); 4];
    for (i, pair) in bp.tev_consts.iter().enumerate() {
        let table_idx = i / 2;
        let rg = map_swap_channel(pair.swap_rg().value());
        let ba = map_swap_channel(pair.swap_ba().value());
        if i % 2 == 0 {
            table[table_idx].r = rg;
            table[table_idx].g = ba;
        } else {
            table[table_idx].b = rg;
            table[table_idx].a = ba;
        }
    }
    table
}

fn decode_tev_registers(bp: &Bp) -> ([mtev::TevColorReg; 4], [Rgba8; 4]) {
    let mut colors = [mtev::TevColorReg::default(); 4];
    let mut konsts = [Rgba8::default(); 4];
    for (i, pair) in bp.tev_registers.iter().enumerate() {
        if let btev::TevRegisterValue::Color { r, g, b, a } = pair.decode() {
            colors[i] = mtev::TevColorReg { r, g, b, a };
        }
    }
    for (i, pair) in bp.tev_konsts.iter().enumerate() {
        if let btev::TevRegisterValue::Konst { r, g, b, a } = pair.decode() {
            konsts[i] = Rgba8 { r, g, b, a };
        }
    }
    (colors, konsts)
}

fn map_compare_function_tev(c: btev::AlphaCompare) -> mpixel::CompareFunction {
    use btev::AlphaCompare as B;
    use mpixel::CompareFunction as M;
    match c {
        B::Never => M::Never,
        B::Less => M::Less,
        B::Equal => M::Equal,
        B::LessOrEqual => M::LEqual,
        B::Greater => M::Greater,
        B::NotEqual => M::NEqual,
        B::GreaterOrEqual => M::GEqual,
        B::Always => M::Always,
    }
}

fn map_alpha_logic(l: btev::AlphaLogic) -> mpixel::AlphaLogic {
    use btev::AlphaLogic as B;
    use mpixel::AlphaLogic as M;
    match l {
        B::And => M::And,
        B::Or => M::Or,
        B::Xor => M::Xor,
        B::Xnor => M::Xnor,
    }
}

fn derive_alpha_compare(af: btev::AlphaFunction) -> mpixel::AlphaCompare {
    let refs = af.refs();
    let comparison = af.comparison();
    mpixel::AlphaCompare {
        comp_left: map_compare_function_tev(comparison[0]),
        ref_left: refs[0],
        op: map_alpha_logic(af.logic()),
        comp_right: map_compare_function_tev(comparison[1]),
        ref_right: refs[1],
    }
}

fn map_compare_function_pixel(c: bpixel::CompareFunction) -> mpixel::CompareFunction {
    use bpixel::CompareFunction as B;
    use mpixel::CompareFunction as M;
    match c {
        B::Never => M::Never,
        B::Less => M::Less,
        B::Equal => M::Equal,
        B::LEqual => M::LEqual,
        B::Greater => M::Greater,
        B::NEqual => M::NEqual,
        B::GEqual => M::GEqual,
        B::Always => M::Always,
    }
}

fn derive_z_mode(dm: bpixel::DepthMode) -> mpixel::ZMode {
    mpixel::ZMode {
        compare: dm.compare(),
        function: map_compare_function_pixel(dm.function()),
        update: dm.update(),
    }
}

fn map_blend_factor(f: bpixel::BlendFactor) -> mpixel::BlendFactor {
    use bpixel::BlendFactor as B;
    use mpixel::BlendFactor as M;
    match f {
        B::Zero => M::Zero,
        B::One => M::One,
        B::SrcColor => M::SrcColor,
        B::InvSrcColor => M::InvSrcColor,
        B::SrcAlpha => M::SrcAlpha,
        B::InvSrcAlpha => M::InvSrcAlpha,
        B::DstAlpha => M::DstAlpha,
        B::InvDstAlpha => M::InvDstAlpha,
    }
}

fn map_logic_op(l: bpixel::LogicOp) -> mpixel::LogicOp {
    use bpixel::LogicOp as B;
    use mpixel::LogicOp as M;
    match l {
        B::Clear => M::Clear,
        B::And => M::And,
        B::AndReverse => M::AndReverse,
        B::Copy => M::Copy,
        B::AndInverted => M::AndInverted,
        B::NoOp => M::NoOp,
        B::Xor => M::Xor,
        B::Or => M::Or,
        B::Nor => M::Nor,
        B::Equiv => M::Equiv,
        B::Invert => M::Invert,
        B::OrReverse => M::OrReverse,
        B::CopyInverted => M::CopyInverted,
        B::OrInverted => M::OrInverted,
        B::Nand => M::Nand,
        B::Set => M::Set,
    }
}

/// `blendMode.type` is derived, not stored, on hardware: `logic_enable`
/// takes priority over `blend_enable`, whose `subtract` bit then picks
/// `Subtract` vs `Blend` (§4.3).
fn derive_blend_mode(bm: bpixel::BlendMode) -> mpixel::BlendMode {
    let ty = if bm.logic_enable() {
        mpixel::BlendType::Logic
    } else if bm.blend_enable() {
        if bm.subtract() {
            mpixel::BlendType::Subtract
        } else {
            mpixel::BlendType::Blend
        }
    } else {
        mpixel::BlendType::None
    };
    mpixel::BlendMode {
        ty,
        source: map_blend_factor(bm.src_factor()),
        dest: map_blend_factor(bm.dst_factor()),
        logic: map_logic_op(bm.logic_op()),
    }
}

fn derive_dst_alpha(ca: bpixel::ConstantAlpha) -> mpixel::DstAlpha {
    mpixel::DstAlpha {
        enabled: ca.enable(),
        alpha: ca.alpha(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gx_stream::Command;

    fn bp(register: u8, value: u32) -> Command {
        Command::Bp { register, value }
    }

    fn xf(register: u16, values: Vec<u32>) -> Command {
        Command::Xf { register, values }
    }

    /// Scenario A (spec.md §8): one TEV stage, `A=texColor, B=zero, C=zero,
    /// D=zero, op=add, bias=zero, scale=1, clamp=true`, no indirect, one
    /// sampler. `ColorInputSrc::TexColor = 0x8` goes in the `a` (bits
    /// 12..16) slot of `TEV_COLOR_ENV0`.
    #[test]
    fn scenario_a_identity_stage_lifts_a_single_clamped_tex_color_stage() {
        let mut lifter = Lifter::new();
        lifter.feed_all(&[
            bp(bp::Reg::GenMode as u8, 0x0000_0001), // 1 texcoord, 1 stage (minus-one=0)
            bp(bp::Reg::TevRefs01 as u8, 0b0_0_000_000_1_000_000), // stage 0: map_enable, map=0, coord=0
            bp(bp::Reg::TevColor0 as u8, (0x8 << 12) | (0xF << 8) | (1 << 19)), // a=TexColor, d=Zero, clamp
            xf(0x10, vec![0]),                       // XF_TEX0_ID: REGULAR, STQ=0 -> Matrix2x4
            xf(0x18, vec![0]),                       // XF_DUALTEX0_ID: identity matrices
        ]);

        let (material, warnings) = lifter
            .finish(&LiftContext {
                sampler_names: vec![("tex0".into(), String::new())],
                ..Default::default()
            })
            .unwrap();

        assert!(warnings.is_empty());
        assert_eq!(material.stages.len(), 1);
        let stage = &material.stages[0];
        assert_eq!(stage.color.a, mtev::ColorInput::TexColor);
        assert_eq!(stage.color.d, mtev::ColorInput::Zero);
        assert_eq!(stage.color.formula, mtev::TevFormula::Add);
        assert_eq!(stage.color.bias, mtev::TevBias::Zero);
        assert_eq!(stage.color.scale, mtev::TevScale::One);
        assert!(stage.color.clamp);
        assert_eq!(stage.tex_coord, Some(0));
        assert_eq!(stage.tex_map, Some(0));
        assert_eq!(material.tex_gens.len(), 1);
        assert_eq!(material.samplers.len(), 1);
        assert_eq!(material.samplers[0].texture, "tex0");
    }

    /// `early_z_comparison` has no register backing (like `xlu`); it must
    /// pass through `LiftContext` unchanged rather than being guessed from
    /// unrelated pixel-engine state.
    #[test]
    fn early_z_comparison_passes_through_lift_context() {
        let lifter = Lifter::new();
        let (material, _warnings) = lifter
            .finish(&LiftContext {
                early_z_comparison: true,
                ..Default::default()
            })
            .unwrap();
        assert!(material.early_z_comparison);

        let lifter = Lifter::new();
        let (material, _warnings) = lifter.finish(&LiftContext::default()).unwrap();
        assert!(!material.early_z_comparison);
    }

    #[test]
    fn undefined_ind_cmd_slot_falls_back_and_warns() {
        let mut lifter = Lifter::new();
        // two stages, but only IND_CMD0 is ever written.
        lifter.feed_all(&[
            bp(bp::Reg::GenMode as u8, 0x0000_0401), // 2 stages (tev_stages_minus_one=1 at bits 10..14)
            bp(bp::Reg::IndCmd0 as u8, 0),
        ]);
        let (_material, warnings) = lifter.finish(&LiftContext::default()).unwrap();
        assert_eq!(
            warnings,
            vec![Warning::UndefinedIndCmdSlot { stage: 1, fallback: 0 }]
        );
    }

    #[test]
    fn unmodeled_bp_register_is_a_warning_not_a_failure() {
        let mut lifter = Lifter::new();
        lifter.feed(&bp(0x01, 0xDEAD_BE));
        let (_material, warnings) = lifter.finish(&LiftContext::default()).unwrap();
        assert_eq!(
            warnings,
            vec![Warning::InvalidRegister {
                register: "BP 0x01".into()
            }]
        );
    }
}
