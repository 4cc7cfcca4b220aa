//! Per-channel lighting control (component H's mirror of the XF channel
//! control registers, in plain enums rather than raw bitfields).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ColorSource {
    #[default]
    Register,
    Vertex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DiffuseFn {
    #[default]
    None,
    Sign,
    Clamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AttenuationFn {
    #[default]
    None,
    Spec,
    Spot,
}

/// One color or alpha channel's lighting equation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChannelControl {
    pub enabled: bool,
    pub mat_source: ColorSource,
    pub amb_source: ColorSource,
    /// Bit `i` selects light `i` as a contributor.
    pub light_mask: u8,
    pub diffuse_fn: DiffuseFn,
    pub attenuation_fn: AttenuationFn,
}

/// `LightingChannelControl` from the original source: one color channel
/// paired with its alpha channel. `chan[0]` is channel 0, `chan[1]` is
/// channel 1; each pair is what spec.md's flat `{color0, alpha0, color1,
/// alpha1}` enumeration actually models on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct LightingChannelControl {
    pub color: ChannelControl,
    pub alpha: ChannelControl,
}

/// `chanData`: the material/ambient color pair feeding one lighting channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ChanData {
    pub mat_color: color::Rgba8,
    pub amb_color: color::Rgba8,
}
