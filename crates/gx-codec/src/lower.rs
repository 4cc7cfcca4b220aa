//! State-to-register lowerer (component D, §4.4, §6.2).
//!
//! [`Lowerer`] walks a [`Material`] once and emits the canonical BP/XF
//! register writes that reproduce it, in the fixed order §6.2 lays out:
//! material header (BP sampler state, XF channel/color), the TEV KSEL/TREF/
//! IREF blocks, the per-stage COLOR_ENV/ALPHA_ENV/IND_CMD loop, indirect
//! scales and matrices, the TEV register file, the pixel engine registers,
//! and finally the XF texgens. It never recovers from an invalid material:
//! [`Material::validate`] runs first, and any failure there or in indirect
//! matrix quantization aborts the whole lower.

use bitos::integer::{u2, u3, u4, u5};
use color::Rgba8;
use gx_material::{CullMode, Material, channel as mchannel, indirect as mindirect, pixel as mpixel, sampler as msampler, texgen as mtexgen, tev as mtev};
use gx_regs::bp::{self, indirect as bind, pixel as bpixel, tev as btev, tex as btex};
use gx_regs::xf as bxf;
use gx_stream::{Command, Writer};

use crate::error::Error;

/// Stateful visitor that accumulates register writes into a [`Writer`].
/// One [`Lowerer`] lowers exactly one material; call [`finish`](Self::finish)
/// to get the padded byte stream.
#[derive(Debug, Default)]
pub struct Lowerer {
    writer: Writer,
}

impl Lowerer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `material`, then emits every register write §6.2's order
    /// calls for. Fails closed: on error, whatever was already written to
    /// the internal buffer is discarded along with `self`.
    pub fn lower(&mut self, material: &Material) -> Result<(), Error> {
        material.validate().map_err(|source| Error::Invariant { source })?;

        self.emit_header(material);
        self.emit_ksel_tref_iref(material);
        self.emit_stages(material)?;
        self.emit_indirect_scales_and_matrices(material)?;
        self.emit_tev_registers(material);
        self.emit_pixel_engine(material);
        self.emit_texgens(material);

        Ok(())
    }

    /// Consumes the lowerer and returns the final, 32-byte-aligned stream.
    pub fn finish(mut self) -> Vec<u8> {
        self.writer.pad_to_alignment();
        self.writer.into_bytes()
    }

    fn bp(&mut self, reg: bp::Reg, value: u32) {
        self.writer.write(&Command::Bp {
            register: reg as u8,
            value,
        });
    }

    /// Two-phase pair write (§4.4's mask semantics): the even half is
    /// written under a mask covering only its bits, then the combined value
    /// is written unmasked as the last write of the run.
    fn bp_pair(&mut self, reg: bp::Reg, even_bits: u32, odd_bits: u32, even_mask: u32) {
        self.writer.write_bp_mask(even_mask);
        self.bp(reg, even_bits);
        self.bp(reg, even_bits | odd_bits);
    }

    fn xf(&mut self, register: u16, values: Vec<u32>) {
        self.writer.write(&Command::Xf { register, values });
    }

    fn emit_header(&mut self, material: &Material) {
        let mode = bp::GenMode::default()
            .with_tex_coords_count(u4::new(material.tex_gens.len().min(8) as u8))
            .with_color_channels_count(u4::new(2))
            .with_tev_stages_minus_one(u4::new((material.stages.len().max(1) - 1) as u8))
            .with_culling_mode(encode_cull_mode(material.cull_mode));
        self.bp(bp::Reg::GenMode, mode.to_bits());

        for (i, sampler) in material.samplers.iter().enumerate() {
            let mode0 = encode_sampler(sampler);
            self.bp(tex_mode0_reg(i), u32::from(mode0.to_bits()));
            self.bp(tex_mode1_reg(i), u32::from(btex::TexMode1::default().to_bits()));
        }

        let mut xf_shadow = bxf::Xf::new();
        xf_shadow.mat_colors = material.chan_data.map(|c| c.mat_color);
        xf_shadow.amb_colors = material.chan_data.map(|c| c.amb_color);
        let color_chans: Vec<u32> = (0..2)
            .map(|i| u32::from(encode_channel_control(material.chan[i].color).to_bits()))
            .collect();
        let alpha_chans: Vec<u32> = (0..2)
            .map(|i| u32::from(encode_channel_control(material.chan[i].alpha).to_bits()))
            .collect();
        self.xf(
            0x00,
            vec![
                xf_shadow.mat_color_word(0),
                xf_shadow.mat_color_word(1),
                xf_shadow.amb_color_word(0),
                xf_shadow.amb_color_word(1),
                color_chans[0],
                color_chans[1],
                alpha_chans[0],
                alpha_chans[1],
            ],
        );
    }

    /// §6.2: TEV KSEL (8 words), TREF (8 words), IREF (1 word) — always the
    /// full fixed-size block, independent of how many stages are active.
    fn emit_ksel_tref_iref(&mut self, material: &Material) {
        for r in 0..8usize {
            let refs_even = stage_refs(material, 2 * r);
            let refs_odd = stage_refs(material, 2 * r + 1);
            let even_bits = u32::from(refs_even.to_bits());
            let odd_bits = u32::from(refs_odd.to_bits()) << 12;
            self.bp_pair(tev_refs_reg(r), even_bits, odd_bits, 0x3FF);
        }

        for r in 0..8usize {
            let table = material.swap_table[r / 2];
            let (swap_rg, swap_ba) = if r % 2 == 0 {
                (table.r, table.g)
            } else {
                (table.b, table.a)
            };
            let (color_a, alpha_a) = stage_konst(material, 2 * r);
            let (color_b, alpha_b) = stage_konst(material, 2 * r + 1);

            let even = btev::StageConstsPair::default()
                .with_swap_rg(u2::new(encode_swap_channel(swap_rg)))
                .with_swap_ba(u2::new(encode_swap_channel(swap_ba)))
                .with_color_a(encode_konst(color_a))
                .with_alpha_a(encode_konst(alpha_a));
            let odd = btev::StageConstsPair::default()
                .with_color_b(encode_konst(color_b))
                .with_alpha_b(encode_konst(alpha_b));
            self.bp_pair(tev_ksel_reg(r), even.to_bits(), odd.to_bits(), 0x3FFF);
        }

        let mut iref = bind::IndirectRef::default();
        for (k, stage) in material.indirect_stages.iter().enumerate().take(4) {
            iref = set_indirect_ref_slot(iref, k, stage.ref_coord, stage.ref_map);
        }
        self.bp(bp::Reg::RasIRef, iref.to_bits());
    }

    fn emit_stages(&mut self, material: &Material) -> Result<(), Error> {
        for (i, stage) in material.stages.iter().enumerate() {
            let color = encode_color_stage(&stage.color);
            self.bp(tev_color_reg(i), color.to_bits());

            let alpha = encode_alpha_stage(stage);
            self.bp(tev_alpha_reg(i), alpha.to_bits());

            let cmd = encode_indirect_command(&stage.indirect)?;
            self.bp(ind_cmd_reg(i), u32::from(cmd.to_bits()));
        }
        Ok(())
    }

    fn emit_indirect_scales_and_matrices(&mut self, material: &Material) -> Result<(), Error> {
        let mut scales = [u32::from(bind::IndirectScalePair::default().to_bits()); 2];
        for (k, stage) in material.indirect_stages.iter().enumerate().take(4) {
            let pair_index = k / 2;
            let mut pair = bind::IndirectScalePair::from_bits(scales[pair_index]);
            let scale_s = encode_indirect_scale(stage.scale_s)?;
            let scale_t = encode_indirect_scale(stage.scale_t)?;
            pair = if k % 2 == 0 {
                pair.with_u0(scale_s).with_v0(scale_t)
            } else {
                pair.with_u1(scale_s).with_v1(scale_t)
            };
            scales[pair_index] = u32::from(pair.to_bits());
        }
        self.bp(bp::Reg::RasSs0, scales[0]);
        self.bp(bp::Reg::RasSs1, scales[1]);

        for (k, matrix) in material.ind_matrices.iter().enumerate().take(3) {
            let decomposition = gx_indirect::decompose(matrix);
            if let Err(source) = decomposition {
                return Err(Error::Quantizer { source });
            }
            let quantized = gx_indirect::encode(matrix);
            let reg = bind::IndMtxRegister::from_parts(quantized.exponent, quantized.mantissas);
            let (a_reg, b_reg, c_reg) = ind_mtx_regs(k);
            self.bp(a_reg, u32::from(reg.a.to_bits()));
            self.bp(b_reg, u32::from(reg.b.to_bits()));
            self.bp(c_reg, u32::from(reg.c.to_bits()));
        }
        Ok(())
    }

    /// Hardware keeps the color (`Registers`) and konst (`Konstants`) banks
    /// independent even though they share one BP address per slot (§4.3):
    /// every slot's color value and konst value are both written, picked
    /// apart on read by the discriminator bit each half carries. Konst
    /// writes repeat their `BG` word three times (the discriminator latches
    /// on the final write; the repetition matches the hardware quirk real
    /// display lists rely on). Color writes touch each half once.
    fn emit_tev_registers(&mut self, material: &Material) {
        for i in 0..4 {
            let (ra_reg, bg_reg) = tev_const_regs(i);

            let c = material.tev_colors[i];
            let color_pair = btev::TevRegisterPair::encode_color(c.r, c.g, c.b, c.a);
            self.bp(ra_reg, u32::from(color_pair.ra.to_bits()));
            self.bp(bg_reg, u32::from(color_pair.bg.to_bits()));

            let k = material.tev_konst_colors[i];
            let konst_pair = btev::TevRegisterPair::encode_konst(k.r, k.g, k.b, k.a);
            self.bp(ra_reg, u32::from(konst_pair.ra.to_bits()));
            for _ in 0..3 {
                self.bp(bg_reg, u32::from(konst_pair.bg.to_bits()));
            }
        }
    }

    fn emit_pixel_engine(&mut self, material: &Material) {
        let ac = material.alpha_compare;
        let func = btev::AlphaFunction::default()
            .with_refs([ac.ref_left, ac.ref_right])
            .with_comparison([encode_compare_function_tev(ac.comp_left), encode_compare_function_tev(ac.comp_right)])
            .with_logic(encode_alpha_logic(ac.op));
        self.bp(bp::Reg::TevAlphaFunc, func.to_bits());

        let z = material.z_mode;
        let depth_mode = bpixel::DepthMode::default()
            .with_compare(z.compare)
            .with_function(encode_compare_function_pixel(z.function))
            .with_update(z.update);
        self.bp(bp::Reg::PixelZMode, u32::from(depth_mode.to_bits()));

        let bm = material.blend_mode;
        let (blend_enable, logic_enable, subtract) = match bm.ty {
            mpixel::BlendType::None => (false, false, false),
            mpixel::BlendType::Blend => (true, false, false),
            mpixel::BlendType::Subtract => (true, false, true),
            mpixel::BlendType::Logic => (false, true, false),
        };
        let blend = bpixel::BlendMode::default()
            .with_blend_enable(blend_enable)
            .with_logic_enable(logic_enable)
            .with_subtract(subtract)
            .with_src_factor(encode_blend_factor(bm.source))
            .with_dst_factor(encode_blend_factor(bm.dest))
            .with_logic_op(encode_logic_op(bm.logic));
        self.bp(bp::Reg::PixelBlendMode, u32::from(blend.to_bits()));

        let ca = bpixel::ConstantAlpha::default()
            .with_enable(material.dst_alpha.enabled)
            .with_alpha(material.dst_alpha.alpha);
        self.bp(bp::Reg::PixelConstantAlpha, u32::from(ca.to_bits()));
    }

    fn emit_texgens(&mut self, material: &Material) {
        for (i, texgen) in material.tex_gens.iter().enumerate() {
            let (tcg, dti) = encode_texgen(texgen);
            self.xf(0x10 + i as u16, vec![u32::from(tcg.to_bits())]);
            self.xf(0x18 + i as u16, vec![u32::from(dti.to_bits())]);
        }
    }
}

/// One-shot convenience wrapper mirroring [`crate::lift`]: lowers `material`
/// and returns its canonical, padded byte stream.
pub fn lower(material: &Material) -> Result<Vec<u8>, Error> {
    let mut lowerer = Lowerer::new();
    lowerer.lower(material)?;
    Ok(lowerer.finish())
}

fn stage_refs(material: &Material, index: usize) -> btev::StageRefs {
    let Some(stage) = material.stages.get(index) else {
        return btev::StageRefs::default();
    };
    btev::StageRefs::default()
        .with_map(u3::new(stage.tex_map.unwrap_or(0) & 0b111))
        .with_coord(u3::new(stage.tex_coord.unwrap_or(0) & 0b111))
        .with_map_enable(stage.tex_coord.is_some())
        .with_color(encode_ras_channel(stage.ras_order))
}

fn stage_konst(material: &Material, index: usize) -> (mtev::Konst, mtev::Konst) {
    match material.stages.get(index) {
        Some(stage) => (stage.konst_color, stage.konst_alpha),
        None => (mtev::Konst::default(), mtev::Konst::default()),
    }
}

fn tex_mode0_reg(i: usize) -> bp::Reg {
    [
        bp::Reg::TexMode0_0,
        bp::Reg::TexMode0_1,
        bp::Reg::TexMode0_2,
        bp::Reg::TexMode0_3,
        bp::Reg::TexMode0_4,
        bp::Reg::TexMode0_5,
        bp::Reg::TexMode0_6,
        bp::Reg::TexMode0_7,
    ][i]
}

fn tex_mode1_reg(i: usize) -> bp::Reg {
    [
        bp::Reg::TexMode1_0,
        bp::Reg::TexMode1_1,
        bp::Reg::TexMode1_2,
        bp::Reg::TexMode1_3,
        bp::Reg::TexMode1_4,
        bp::Reg::TexMode1_5,
        bp::Reg::TexMode1_6,
        bp::Reg::TexMode1_7,
    ][i]
}

fn tev_refs_reg(r: usize) -> bp::Reg {
    [
        bp::Reg::TevRefs01,
        bp::Reg::TevRefs23,
        bp::Reg::TevRefs45,
        bp::Reg::TevRefs67,
        bp::Reg::TevRefs89,
        bp::Reg::TevRefsAB,
        bp::Reg::TevRefsCD,
        bp::Reg::TevRefsEF,
    ][r]
}

fn tev_ksel_reg(r: usize) -> bp::Reg {
    [
        bp::Reg::TevKSel0,
        bp::Reg::TevKSel1,
        bp::Reg::TevKSel2,
        bp::Reg::TevKSel3,
        bp::Reg::TevKSel4,
        bp::Reg::TevKSel5,
        bp::Reg::TevKSel6,
        bp::Reg::TevKSel7,
    ][r]
}

fn tev_color_reg(i: usize) -> bp::Reg {
    const REGS: [bp::Reg; 16] = [
        bp::Reg::TevColor0,
        bp::Reg::TevColor1,
        bp::Reg::TevColor2,
        bp::Reg::TevColor3,
        bp::Reg::TevColor4,
        bp::Reg::TevColor5,
        bp::Reg::TevColor6,
        bp::Reg::TevColor7,
        bp::Reg::TevColor8,
        bp::Reg::TevColor9,
        bp::Reg::TevColor10,
        bp::Reg::TevColor11,
        bp::Reg::TevColor12,
        bp::Reg::TevColor13,
        bp::Reg::TevColor14,
        bp::Reg::TevColor15,
    ];
    REGS[i]
}

fn tev_alpha_reg(i: usize) -> bp::Reg {
    const REGS: [bp::Reg; 16] = [
        bp::Reg::TevAlpha0,
        bp::Reg::TevAlpha1,
        bp::Reg::TevAlpha2,
        bp::Reg::TevAlpha3,
        bp::Reg::TevAlpha4,
        bp::Reg::TevAlpha5,
        bp::Reg::TevAlpha6,
        bp::Reg::TevAlpha7,
        bp::Reg::TevAlpha8,
        bp::Reg::TevAlpha9,
        bp::Reg::TevAlpha10,
        bp::Reg::TevAlpha11,
        bp::Reg::TevAlpha12,
        bp::Reg::TevAlpha13,
        bp::Reg::TevAlpha14,
        bp::Reg::TevAlpha15,
    ];
    REGS[i]
}

fn ind_cmd_reg(i: usize) -> bp::Reg {
    const REGS: [bp::Reg; 16] = [
        bp::Reg::IndCmd0,
        bp::Reg::IndCmd1,
        bp::Reg::IndCmd2,
        bp::Reg::IndCmd3,
        bp::Reg::IndCmd4,
        bp::Reg::IndCmd5,
        bp::Reg::IndCmd6,
        bp::Reg::IndCmd7,
        bp::Reg::IndCmd8,
        bp::Reg::IndCmd9,
        bp::Reg::IndCmd10,
        bp::Reg::IndCmd11,
        bp::Reg::IndCmd12,
        bp::Reg::IndCmd13,
        bp::Reg::IndCmd14,
        bp::Reg::IndCmd15,
    ];
    REGS[i]
}

fn ind_mtx_regs(k: usize) -> (bp::Reg, bp::Reg, bp::Reg) {
    [
        (bp::Reg::IndMatxA0, bp::Reg::IndMatxB0, bp::Reg::IndMatxC0),
        (bp::Reg::IndMatxA1, bp::Reg::IndMatxB1, bp::Reg::IndMatxC1),
        (bp::Reg::IndMatxA2, bp::Reg::IndMatxB2, bp::Reg::IndMatxC2),
    ][k]
}

fn tev_const_regs(i: usize) -> (bp::Reg, bp::Reg) {
    [
        (bp::Reg::TevConstant0AR, bp::Reg::TevConstant0GB),
        (bp::Reg::TevConstant1AR, bp::Reg::TevConstant1GB),
        (bp::Reg::TevConstant2AR, bp::Reg::TevConstant2GB),
        (bp::Reg::TevConstant3AR, bp::Reg::TevConstant3GB),
    ][i]
}

fn set_indirect_ref_slot(iref: bind::IndirectRef, slot: usize, coord: u8, map: u8) -> bind::IndirectRef {
    let coord = u3::new(coord & 0b111);
    let map = u3::new(map & 0b111);
    match slot {
        0 => iref.with_coord_0(coord).with_map_0(map),
        1 => iref.with_coord_1(coord).with_map_1(map),
        2 => iref.with_coord_2(coord).with_map_2(map),
        _ => iref.with_coord_3(coord).with_map_3(map),
    }
}

fn encode_cull_mode(c: CullMode) -> bp::CullingMode {
    match c {
        CullMode::None => bp::CullingMode::None,
        CullMode::Front => bp::CullingMode::Negative,
        CullMode::Back => bp::CullingMode::Positive,
        CullMode::All => bp::CullingMode::All,
    }
}

fn encode_color_source(s: mchannel::ColorSource) -> bxf::ColorSrc {
    match s {
        mchannel::ColorSource::Register => bxf::ColorSrc::Register,
        mchannel::ColorSource::Vertex => bxf::ColorSrc::Vertex,
    }
}

fn encode_diffuse_fn(d: mchannel::DiffuseFn) -> bxf::DiffuseFn {
    match d {
        mchannel::DiffuseFn::None => bxf::DiffuseFn::None,
        mchannel::DiffuseFn::Sign => bxf::DiffuseFn::Sign,
        mchannel::DiffuseFn::Clamp => bxf::DiffuseFn::Clamp,
    }
}

/// Inverse of `gx_codec::lift::map_attenuation_fn`: picks the canonical
/// `(attn_enable, attn_select)` bit pair hardware would need to decode back
/// to `a`. `Spec` doesn't depend on `attn_enable` (`attn_select` alone
/// selects it), so a fixed `false` is used to keep lowering canonical.
fn encode_attenuation_fn(a: mchannel::AttenuationFn) -> (bool, bool) {
    match a {
        mchannel::AttenuationFn::Spec => (false, false),
        mchannel::AttenuationFn::None => (false, true),
        mchannel::AttenuationFn::Spot => (true, true),
    }
}

fn encode_channel_control(c: mchannel::ChannelControl) -> bxf::ChannelControl {
    let (attn_enable, attn_select) = encode_attenuation_fn(c.attenuation_fn);
    bxf::ChannelControl::default()
        .with_enabled(c.enabled)
        .with_mat_source(encode_color_source(c.mat_source))
        .with_amb_source(encode_color_source(c.amb_source))
        .with_light_mask(c.light_mask)
        .with_diffuse_fn(encode_diffuse_fn(c.diffuse_fn))
        .with_attn_enable(attn_enable)
        .with_attn_select(attn_select)
}

fn encode_source_row(source: mtexgen::TexGenSource) -> bxf::SourceRow {
    use bxf::SourceRow as B;
    use mtexgen::TexGenSource as M;
    match source {
        M::Position => B::Geometry,
        M::Normal => B::Normal,
        M::Binormal => B::Binormal,
        M::Tangent => B::Tangent,
        M::Tex0 => B::Tex0,
        M::Tex1 => B::Tex1,
        M::Tex2 => B::Tex2,
        M::Tex3 => B::Tex3,
        M::Tex4 => B::Tex4,
        M::Tex5 => B::Tex5,
        M::Tex6 => B::Tex6,
        M::Tex7 => B::Tex7,
        M::Color0 => B::Color0,
        M::Color1 => B::Color1,
    }
}

fn shift_from_tex_source(source: mtexgen::TexGenSource) -> u8 {
    use mtexgen::TexGenSource::{Tex0, Tex1, Tex2, Tex3, Tex4, Tex5, Tex6, Tex7};
    match source {
        Tex0 => 0,
        Tex1 => 1,
        Tex2 => 2,
        Tex3 => 3,
        Tex4 => 4,
        Tex5 => 5,
        Tex6 => 6,
        Tex7 => 7,
        _ => 0,
    }
}

fn shift_from_bump_func(func: mtexgen::TexGenFunc) -> u8 {
    use mtexgen::TexGenFunc::{Bump0, Bump1, Bump2, Bump3, Bump4, Bump5, Bump6, Bump7};
    match func {
        Bump0 => 0,
        Bump1 => 1,
        Bump2 => 2,
        Bump3 => 3,
        Bump4 => 4,
        Bump5 => 5,
        Bump6 => 6,
        Bump7 => 7,
        _ => 0,
    }
}

/// Reverse of the lifter's `decode_texgen`. `Srtg` functions are expected
/// to pair with a `Color0`/`Color1` source per §4.3; a mismatched source is
/// not something `Material::validate` currently rejects, so this falls
/// back to `Color0` rather than panicking.
fn encode_texgen(tg: &mtexgen::TexGen) -> (bxf::TexCoordGen, bxf::DualTexInfo) {
    let tcg = match tg.func {
        mtexgen::TexGenFunc::Matrix2x4 => bxf::TexCoordGen::default()
            .with_kind(bxf::TexGenType::Regular)
            .with_projection(bxf::Projection::St)
            .with_source_row(encode_source_row(tg.source)),
        mtexgen::TexGenFunc::Matrix3x4 => bxf::TexCoordGen::default()
            .with_kind(bxf::TexGenType::Regular)
            .with_projection(bxf::Projection::Stq)
            .with_source_row(encode_source_row(tg.source)),
        mtexgen::TexGenFunc::Srtg => {
            let kind = if tg.source == mtexgen::TexGenSource::Color1 {
                bxf::TexGenType::Color1
            } else {
                bxf::TexGenType::Color0
            };
            bxf::TexCoordGen::default().with_kind(kind)
        }
        func => bxf::TexCoordGen::default()
            .with_kind(bxf::TexGenType::EmbossMap)
            .with_emboss_light_shift(u3::new(shift_from_bump_func(func)))
            .with_emboss_source_shift(u3::new(shift_from_tex_source(tg.source))),
    };

    let tex_matrix = match tg.matrix {
        mtexgen::TexMatrixSelect::Identity => 0,
        mtexgen::TexMatrixSelect::TexMatrix(n) => n + 1,
    };
    let post_matrix = match tg.post_matrix {
        mtexgen::PostMatrixSelect::Identity => 0,
        mtexgen::PostMatrixSelect::Matrix(n) => n + 1,
    };
    let dti = bxf::DualTexInfo::default()
        .with_tex_matrix(u4::new(tex_matrix))
        .with_post_matrix(u5::new(post_matrix))
        .with_normalize(tg.normalize);

    (tcg, dti)
}

fn encode_wrap_mode(w: msampler::WrapMode) -> btex::WrapMode {
    match w {
        msampler::WrapMode::Clamp => btex::WrapMode::Clamp,
        msampler::WrapMode::Repeat => btex::WrapMode::Repeat,
        msampler::WrapMode::Mirror => btex::WrapMode::Mirror,
    }
}

fn encode_min_filter(f: msampler::MinFilter) -> btex::MinFilter {
    use btex::MinFilter as B;
    use msampler::MinFilter as M;
    match f {
        M::Near => B::Near,
        M::Linear => B::Linear,
        M::NearMipNear => B::NearMipNear,
        M::LinMipNear => B::LinMipNear,
        M::NearMipLin => B::NearMipLin,
        M::LinMipLin => B::LinMipLin,
    }
}

fn encode_mag_filter(f: msampler::MagFilter) -> btex::MagFilter {
    match f {
        msampler::MagFilter::Near => btex::MagFilter::Near,
        msampler::MagFilter::Linear => btex::MagFilter::Linear,
    }
}

fn encode_max_aniso(a: msampler::MaxAniso) -> btex::MaxAniso {
    match a {
        msampler::MaxAniso::X1 => btex::MaxAniso::X1,
        msampler::MaxAniso::X2 => btex::MaxAniso::X2,
        msampler::MaxAniso::X4 => btex::MaxAniso::X4,
    }
}

/// `TEXMODE1` has no counterpart in [`msampler::Sampler`] (see `lift`'s
/// matching doc comment), so its register is always re-emitted at its
/// hardware reset value rather than read from `sampler`.
fn encode_sampler(sampler: &msampler::Sampler) -> btex::TexMode0 {
    btex::TexMode0::default()
        .with_wrap_s(encode_wrap_mode(sampler.wrap_u))
        .with_wrap_t(encode_wrap_mode(sampler.wrap_v))
        .with_min_filter(encode_min_filter(sampler.min_filter))
        .with_mag_filter(encode_mag_filter(sampler.mag_filter))
        .with_max_aniso(encode_max_aniso(sampler.max_aniso))
        .with_lod_bias(sampler.lod_bias_bits)
        .with_bias_clamp(sampler.bias_clamp)
        .with_edge_lod(sampler.edge_lod)
}

fn encode_ras_channel(c: mtev::RasChannel) -> btev::ColorChannel {
    match c {
        mtev::RasChannel::Channel0 => btev::ColorChannel::Channel0,
        mtev::RasChannel::Channel1 => btev::ColorChannel::Channel1,
        mtev::RasChannel::AlphaBump => btev::ColorChannel::AlphaBump,
        mtev::RasChannel::AlphaBumpNormalized => btev::ColorChannel::AlphaBumpNormalized,
        mtev::RasChannel::Zero => btev::ColorChannel::Zero,
    }
}

fn encode_konst(k: mtev::Konst) -> btev::Constant {
    use btev::Constant as B;
    use mtev::Konst as M;
    match k {
        M::One => B::One,
        M::SevenEighths => B::SevenEights,
        M::ThreeQuarters => B::SixEights,
        M::FiveEighths => B::FiveEights,
        M::Half => B::FourEights,
        M::ThreeEighths => B::ThreeEights,
        M::OneQuarter => B::TwoEights,
        M::OneEighth => B::OneEight,
        M::Const0Rgb => B::Const0,
        M::Const1Rgb => B::Const1,
        M::Const2Rgb => B::Const2,
        M::Const3Rgb => B::Const3,
        M::Const0R => B::Const0R,
        M::Const1R => B::Const1R,
        M::Const2R => B::Const2R,
        M::Const3R => B::Const3R,
        M::Const0G => B::Const0G,
        M::Const1G => B::Const1G,
        M::Const2G => B::Const2G,
        M::Const3G => B::Const3G,
        M::Const0B => B::Const0B,
        M::Const1B => B::Const1B,
        M::Const2B => B::Const2B,
        M::Const3B => B::Const3B,
        M::Const0A => B::Const0A,
        M::Const1A => B::Const1A,
        M::Const2A => B::Const2A,
        M::Const3A => B::Const3A,
    }
}

fn encode_color_input(i: mtev::ColorInput) -> btev::ColorInputSrc {
    use btev::ColorInputSrc as B;
    use mtev::ColorInput as M;
    match i {
        M::PrevColor => B::R3Color,
        M::PrevAlpha => B::R3Alpha,
        M::Reg0Color => B::R0Color,
        M::Reg0Alpha => B::R0Alpha,
        M::Reg1Color => B::R1Color,
        M::Reg1Alpha => B::R1Alpha,
        M::Reg2Color => B::R2Color,
        M::Reg2Alpha => B::R2Alpha,
        M::TexColor => B::TexColor,
        M::TexAlpha => B::TexAlpha,
        M::RasColor => B::ChanColor,
        M::RasAlpha => B::ChanAlpha,
        M::One => B::One,
        M::Half => B::Half,
        M::Konst => B::Constant,
        M::Zero => B::Zero,
    }
}

fn encode_alpha_input(i: mtev::AlphaInput) -> btev::AlphaInputSrc {
    use btev::AlphaInputSrc as B;
    use mtev::AlphaInput as M;
    match i {
        M::PrevAlpha => B::R3Alpha,
        M::Reg0Alpha => B::R0Alpha,
        M::Reg1Alpha => B::R1Alpha,
        M::Reg2Alpha => B::R2Alpha,
        M::TexAlpha => B::TexAlpha,
        M::RasAlpha => B::ChanAlpha,
        M::Konst => B::Constant,
        M::Zero => B::Zero,
    }
}

fn encode_output(o: mtev::TevOutput) -> btev::OutputDst {
    match o {
        mtev::TevOutput::Prev => btev::OutputDst::R3,
        mtev::TevOutput::Reg0 => btev::OutputDst::R0,
        mtev::TevOutput::Reg1 => btev::OutputDst::R1,
        mtev::TevOutput::Reg2 => btev::OutputDst::R2,
    }
}

fn encode_bias(b: mtev::TevBias) -> btev::Bias {
    match b {
        mtev::TevBias::Zero => btev::Bias::Zero,
        mtev::TevBias::AddHalf => btev::Bias::PositiveHalf,
        mtev::TevBias::SubHalf => btev::Bias::NegativeHalf,
    }
}

fn encode_scale(s: mtev::TevScale) -> btev::Scale {
    match s {
        mtev::TevScale::One => btev::Scale::One,
        mtev::TevScale::Two => btev::Scale::Two,
        mtev::TevScale::Four => btev::Scale::Four,
        mtev::TevScale::Half => btev::Scale::Half,
    }
}

/// Reverse of the lifter's `map_comparative_formula`; `None` for the two
/// non-comparative formulas.
fn decode_comparative(formula: mtev::TevFormula) -> Option<(btev::CompareTarget, btev::CompareOp)> {
    use btev::CompareOp::{Equal, GreaterThan};
    use btev::CompareTarget::{BGR16, Component, GR16, R8};
    use mtev::TevFormula as F;
    Some(match formula {
        F::CompR8Gt => (R8, GreaterThan),
        F::CompR8Eq => (R8, Equal),
        F::CompGr16Gt => (GR16, GreaterThan),
        F::CompGr16Eq => (GR16, Equal),
        F::CompBgr24Gt => (BGR16, GreaterThan),
        F::CompBgr24Eq => (BGR16, Equal),
        F::CompRgb8Gt | F::CompA8Gt => (Component, GreaterThan),
        F::CompRgb8Eq | F::CompA8Eq => (Component, Equal),
        F::Add | F::Sub => return None,
    })
}

fn encode_color_stage(s: &mtev::ColorStage) -> btev::StageColor {
    let base = btev::StageColor::default()
        .with_input_a(encode_color_input(s.a))
        .with_input_b(encode_color_input(s.b))
        .with_input_c(encode_color_input(s.c))
        .with_input_d(encode_color_input(s.d))
        .with_clamp(s.clamp)
        .with_output(encode_output(s.output));
    match decode_comparative(s.formula) {
        Some((target, op)) => base.with_bias(btev::Bias::Comparative).with_compare_op(op).with_compare_target(target),
        None => base
            .with_bias(encode_bias(s.bias))
            .with_negate(s.formula == mtev::TevFormula::Sub)
            .with_scale(encode_scale(s.scale)),
    }
}

fn encode_alpha_stage(stage: &mtev::TevStage) -> btev::StageAlpha {
    let s = &stage.alpha;
    let base = btev::StageAlpha::default()
        .with_rasterizer_swap(u2::new(stage.ras_swap & 0b11))
        .with_texture_swap(u2::new(stage.tex_swap & 0b11))
        .with_input_a(encode_alpha_input(s.a))
        .with_input_b(encode_alpha_input(s.b))
        .with_input_c(encode_alpha_input(s.c))
        .with_input_d(encode_alpha_input(s.d))
        .with_clamp(s.clamp)
        .with_output(encode_output(s.output));
    match decode_comparative(s.formula) {
        Some((target, op)) => base.with_bias(btev::Bias::Comparative).with_compare_op(op).with_compare_target(target),
        None => base
            .with_bias(encode_bias(s.bias))
            .with_negate(s.formula == mtev::TevFormula::Sub)
            .with_scale(encode_scale(s.scale)),
    }
}

fn encode_indirect_bias(b: mtev::IndirectBias) -> bind::IndirectBiasSelect {
    use bind::IndirectBiasSelect as B;
    use mtev::IndirectBias as M;
    match b {
        M::None => B::None,
        M::S => B::S,
        M::T => B::T,
        M::St => B::St,
        M::U => B::U,
        M::Su => B::Su,
        M::Tu => B::Tu,
        M::Stu => B::Stu,
    }
}

fn encode_indirect_alpha(a: mtev::IndirectAlphaSelect) -> bind::IndirectAlphaSelect {
    match a {
        mtev::IndirectAlphaSelect::Off => bind::IndirectAlphaSelect::Off,
        mtev::IndirectAlphaSelect::S => bind::IndirectAlphaSelect::S,
        mtev::IndirectAlphaSelect::T => bind::IndirectAlphaSelect::T,
        mtev::IndirectAlphaSelect::U => bind::IndirectAlphaSelect::U,
    }
}

fn encode_indirect_wrap(w: mtev::IndirectWrap) -> bind::IndirectWrap {
    use bind::IndirectWrap as B;
    use mtev::IndirectWrap as M;
    match w {
        M::Off => B::Off,
        M::Zero => B::W0,
        M::W16 => B::W16,
        M::W32 => B::W32,
        M::W64 => B::W64,
        M::W128 => B::W128,
        M::W256 => B::W256,
    }
}

fn encode_indirect_matrix(m: mtev::IndirectMatrixSelect) -> bind::IndirectMatrixSelect {
    match m {
        mtev::IndirectMatrixSelect::Off => bind::IndirectMatrixSelect::Off,
        mtev::IndirectMatrixSelect::Matrix0 => bind::IndirectMatrixSelect::Matrix0,
        mtev::IndirectMatrixSelect::Matrix1 => bind::IndirectMatrixSelect::Matrix1,
        mtev::IndirectMatrixSelect::Matrix2 => bind::IndirectMatrixSelect::Matrix2,
    }
}

/// `Material::indirect::IndirectScale` carries a `X256` step the 3-bit
/// hardware scale field cannot represent; that's the one indirect field
/// this lowerer can't always encode (see DESIGN.md).
fn encode_indirect_scale(s: mindirect::IndirectScale) -> Result<bind::IndirectScale, Error> {
    use bind::IndirectScale as B;
    use mindirect::IndirectScale as M;
    Ok(match s {
        M::X1 => B::X1,
        M::X2 => B::X2,
        M::X4 => B::X4,
        M::X8 => B::X8,
        M::X16 => B::X16,
        M::X32 => B::X32,
        M::X64 => B::X64,
        M::X128 => B::X128,
        M::X256 => {
            return Err(Error::InvalidEnum {
                field: "indirect texcoord scale",
                value: "X256".to_string(),
            });
        }
    })
}

fn encode_swap_channel(c: mtev::SwapChannel) -> u8 {
    match c {
        mtev::SwapChannel::R => 0,
        mtev::SwapChannel::G => 1,
        mtev::SwapChannel::B => 2,
        mtev::SwapChannel::A => 3,
    }
}

fn encode_indirect_command(stage: &mtev::IndirectStageRef) -> Result<bind::IndirectCommand, Error> {
    Ok(bind::IndirectCommand::default()
        .with_stage_sel(u2::new(stage.stage_sel & 0b11))
        .with_bias(encode_indirect_bias(stage.bias))
        .with_alpha(encode_indirect_alpha(stage.alpha))
        .with_matrix(encode_indirect_matrix(stage.matrix))
        .with_wrap_u(encode_indirect_wrap(stage.wrap_u))
        .with_wrap_v(encode_indirect_wrap(stage.wrap_v))
        .with_add_prev(stage.add_prev)
        .with_utc_lod(stage.utc_lod))
}

fn encode_compare_function_tev(c: mpixel::CompareFunction) -> btev::AlphaCompare {
    use btev::AlphaCompare as B;
    use mpixel::CompareFunction as M;
    match c {
        M::Never => B::Never,
        M::Less => B::Less,
        M::Equal => B::Equal,
        M::LEqual => B::LessOrEqual,
        M::Greater => B::Greater,
        M::NEqual => B::NotEqual,
        M::GEqual => B::GreaterOrEqual,
        M::Always => B::Always,
    }
}

fn encode_alpha_logic(l: mpixel::AlphaLogic) -> btev::AlphaLogic {
    use btev::AlphaLogic as B;
    use mpixel::AlphaLogic as M;
    match l {
        M::And => B::And,
        M::Or => B::Or,
        M::Xor => B::Xor,
        M::Xnor => B::Xnor,
    }
}

fn encode_compare_function_pixel(c: mpixel::CompareFunction) -> bpixel::CompareFunction {
    use bpixel::CompareFunction as B;
    use mpixel::CompareFunction as M;
    match c {
        M::Never => B::Never,
        M::Less => B::Less,
        M::Equal => B::Equal,
        M::LEqual => B::LEqual,
        M::Greater => B::Greater,
        M::NEqual => B::NEqual,
        M::GEqual => B::GEqual,
        M::Always => B::Always,
    }
}

fn encode_blend_factor(f: mpixel::BlendFactor) -> bpixel::BlendFactor {
    use bpixel::BlendFactor as B;
    use mpixel::BlendFactor as M;
    match f {
        M::Zero => B::Zero,
        M::One => B::One,
        M::SrcColor => B::SrcColor,
        M::InvSrcColor => B::InvSrcColor,
        M::SrcAlpha => B::SrcAlpha,
        M::InvSrcAlpha => B::InvSrcAlpha,
        M::DstAlpha => B::DstAlpha,
        M::InvDstAlpha => B::InvDstAlpha,
    }
}

fn encode_logic_op(l: mpixel::LogicOp) -> bpixel::LogicOp {
    use bpixel::LogicOp as B;
    use mpixel::LogicOp as M;
    match l {
        M::Clear => B::Clear,
        M::And => B::And,
        M::AndReverse => B::AndReverse,
        M::Copy => B::Copy,
        M::AndInverted => B::AndInverted,
        M::NoOp => B::NoOp,
        M::Xor => B::Xor,
        M::Or => B::Or,
        M::Nor => B::Nor,
        M::Equiv => B::Equiv,
        M::Invert => B::Invert,
        M::OrReverse => B::OrReverse,
        M::CopyInverted => B::CopyInverted,
        M::OrInverted => B::OrInverted,
        M::Nand => B::Nand,
        M::Set => B::Set,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lift::{LiftContext, lift};
    use gx_material::tev::{ColorInput, ColorStage, TevFormula, TevStage};

    /// Scenario A in reverse: a single clamped tex-color stage lowers to the
    /// same `TEV_COLOR_ENV0` bit pattern the lift test expects.
    #[test]
    fn scenario_a_round_trips_through_lower_and_lift() {
        let mut material = Material::default();
        material.tex_gens.push(mtexgen::TexGen::default());
        material.samplers.push(msampler::Sampler {
            texture: "tex0".into(),
            ..Default::default()
        });
        material.stages.push(TevStage {
            color: ColorStage {
                a: ColorInput::TexColor,
                d: ColorInput::Zero,
                formula: TevFormula::Add,
                clamp: true,
                ..Default::default()
            },
            ..Default::default()
        });

        let bytes = lower(&material).unwrap();
        assert_eq!(bytes.len() % 32, 0);

        let commands = read_all(&bytes);
        let (relifted, warnings) = lift(&commands, &LiftContext::default()).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(relifted.stages.len(), 1);
        assert_eq!(relifted.stages[0].color.a, ColorInput::TexColor);
        assert_eq!(relifted.stages[0].color.d, ColorInput::Zero);
        assert!(relifted.stages[0].color.clamp);
    }

    #[test]
    fn lower_then_lift_then_lower_again_is_byte_stable() {
        let mut material = Material::default();
        material.stages.push(TevStage::default());
        let first = lower(&material).unwrap();
        let commands = read_all(&first);
        let (relifted, _warnings) = lift(&commands, &LiftContext::default()).unwrap();
        let second = lower(&relifted).unwrap();
        assert_eq!(first, second);
    }

    /// The `attnEnable`/`attnSelect` derivation in `map_attenuation_fn`
    /// (lift) and `encode_attenuation_fn` (lower) must be exact inverses
    /// for all three attenuation functions, along with the split
    /// light-mask bits they share a register word with.
    #[test]
    fn channel_control_attenuation_fn_and_light_mask_round_trip() {
        for attenuation_fn in [
            mchannel::AttenuationFn::None,
            mchannel::AttenuationFn::Spec,
            mchannel::AttenuationFn::Spot,
        ] {
            let mut material = Material::default();
            material.stages.push(TevStage::default());
            material.chan[0].color = mchannel::ChannelControl {
                enabled: true,
                light_mask: 0b1010_0101,
                attenuation_fn,
                ..Default::default()
            };

            let bytes = lower(&material).unwrap();
            let commands = read_all(&bytes);
            let (relifted, warnings) = lift(&commands, &LiftContext::default()).unwrap();
            assert!(warnings.is_empty(), "{warnings:?}");
            assert_eq!(relifted.chan[0].color.attenuation_fn, attenuation_fn);
            assert_eq!(relifted.chan[0].color.light_mask, 0b1010_0101);
        }
    }

    /// §8 property 2: a slot's color and konst value are independent
    /// hardware banks and must both survive a round trip even when both
    /// are simultaneously non-default.
    #[test]
    fn color_and_konst_at_the_same_slot_both_round_trip() {
        let mut material = Material::default();
        material.stages.push(TevStage::default());
        material.tev_colors[1] = mtev::TevColorReg { r: -512, g: 256, b: -1, a: 1023 };
        material.tev_konst_colors[1] = Rgba8 { r: 1, g: 2, b: 3, a: 4 };

        let bytes = lower(&material).unwrap();
        let commands = read_all(&bytes);
        let (relifted, warnings) = lift(&commands, &LiftContext::default()).unwrap();
        assert!(warnings.is_empty(), "{warnings:?}");
        assert_eq!(relifted.tev_colors[1], material.tev_colors[1]);
        assert_eq!(relifted.tev_konst_colors[1], material.tev_konst_colors[1]);
    }

    #[test]
    fn konst_register_writes_bg_three_times() {
        let mut material = Material::default();
        material.stages.push(TevStage::default());
        material.tev_konst_colors[0] = Rgba8 {
            r: 10,
            g: 20,
            b: 30,
            a: 255,
        };
        let mut lowerer = Lowerer::new();
        lowerer.lower(&material).unwrap();
        let bytes = lowerer.finish();
        let bg_values: Vec<u32> = bytes
            .chunks(5)
            .filter(|chunk| chunk.first() == Some(&0x61) && chunk.get(1) == Some(&(bp::Reg::TevConstant0GB as u8)))
            .map(|chunk| u32::from(chunk[2]) << 16 | u32::from(chunk[3]) << 8 | u32::from(chunk[4]))
            .collect();
        let konst_writes = bg_values.iter().filter(|v| (*v >> 23) & 1 != 0).count();
        let color_writes = bg_values.iter().filter(|v| (*v >> 23) & 1 == 0).count();
        assert_eq!(konst_writes, 3, "konst BG half must be written three times");
        assert_eq!(color_writes, 1, "color BG half must still be written once");
    }

    #[test]
    fn invalid_material_fails_before_any_register_write() {
        let mut material = Material::default();
        material.tex_gens.push(mtexgen::TexGen::default());
        let err = lower(&material).unwrap_err();
        assert!(matches!(err, Error::Invariant { .. }));
    }

    struct NoVertexPayload;
    impl gx_stream::VertexSizer for NoVertexPayload {
        fn vertex_size(&self, _primitive: gx_stream::Primitive, _vat_fmt: u8) -> usize {
            0
        }
    }

    fn read_all(bytes: &[u8]) -> Vec<Command> {
        let mut reader = gx_stream::Reader::new(bytes, bytes.len());
        let sizer = NoVertexPayload;
        let mut commands = Vec::new();
        while let Some(command) = reader.read_command(&sizer).unwrap() {
            commands.push(command);
        }
        commands
    }
}
