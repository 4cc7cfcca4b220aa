use crate::command::{
    Command, IndexedLoadTarget, Primitive, DRAW_BIT, DRAW_PRIMITIVE_MASK, DRAW_VAT_MASK, TAG_BP, TAG_CP,
    TAG_LOAD_INDX_A, TAG_LOAD_INDX_B, TAG_LOAD_INDX_C, TAG_LOAD_INDX_D, TAG_NOP, TAG_XF,
};
use crate::error::StreamError;

/// Computes how many bytes of inline vertex data a `DRAW` command's payload
/// occupies, given its primitive, VAT format and vertex count. Vertex
/// attribute decoding is out of this crate's scope (§4.2), so the caller —
/// which owns the current vertex attribute descriptor — supplies this.
pub trait VertexSizer {
    fn vertex_size(&self, primitive: Primitive, vat_fmt: u8) -> usize;
}

/// Reads commands from a byte-addressed display-list stream, one at a time,
/// up to a caller-supplied byte limit (§4.2: "not self-synchronizing").
pub struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
    limit: usize,
}

impl<'a> Reader<'a> {
    /// `limit` must not exceed `bytes.len()`.
    pub fn new(bytes: &'a [u8], limit: usize) -> Self {
        assert!(limit <= bytes.len());
        Self {
            bytes,
            offset: 0,
            limit,
        }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn at_end(&self) -> bool {
        self.offset >= self.limit
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], StreamError> {
        let start = self.offset;
        let end = start + len;
        if end > self.limit {
            return Err(StreamError::TruncatedStream { offset: start });
        }
        self.offset = end;
        Ok(&self.bytes[start..end])
    }

    fn u8(&mut self) -> Result<u8, StreamError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, StreamError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32(&mut self) -> Result<u32, StreamError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads exactly one command. Returns `Ok(None)` only at a clean
    /// boundary (`offset == limit`); any attempt to read a command that
    /// would cross `limit` fails with `TruncatedStream`.
    pub fn read_command(&mut self, sizer: &impl VertexSizer) -> Result<Option<Command>, StreamError> {
        if self.at_end() {
            return Ok(None);
        }

        let start = self.offset;
        let tag = self.u8()?;

        if tag & DRAW_BIT != 0 {
            let primitive_bits = tag & DRAW_PRIMITIVE_MASK;
            let vat_fmt = tag & DRAW_VAT_MASK;
            let primitive = Primitive::from_tag_bits(primitive_bits)
                .ok_or(StreamError::UnknownCommand { tag, offset: start })?;
            let vertex_count = self.u16()?;
            let payload_len = sizer.vertex_size(primitive, vat_fmt) * usize::from(vertex_count);
            let data = self.take(payload_len)?.to_vec();
            return Ok(Some(Command::Draw {
                primitive,
                vat_fmt,
                vertex_count,
                data,
            }));
        }

        let command = match tag {
            TAG_NOP => Command::Nop,
            TAG_CP => {
                let register = self.u8()?;
                let value = self.u32()?;
                Command::Cp { register, value }
            }
            TAG_XF => {
                let extra_count = self.u16()?;
                let register = self.u16()?;
                let mut values = Vec::with_capacity(usize::from(extra_count) + 1);
                for _ in 0..=extra_count {
                    values.push(self.u32()?);
                }
                Command::Xf { register, values }
            }
            TAG_LOAD_INDX_A | TAG_LOAD_INDX_B | TAG_LOAD_INDX_C | TAG_LOAD_INDX_D => {
                let target = match tag {
                    TAG_LOAD_INDX_A => IndexedLoadTarget::PositionMatrices,
                    TAG_LOAD_INDX_B => IndexedLoadTarget::NormalMatrices,
                    TAG_LOAD_INDX_C => IndexedLoadTarget::PostMatrices,
                    _ => IndexedLoadTarget::Lights,
                };
                let packed = self.u32()?;
                let index = (packed >> 16) as u16;
                let len = (((packed >> 12) & 0xF) + 1) as u8;
                let address = (packed & 0xFFF) as u16;
                Command::IndexedLoad {
                    target,
                    index,
                    address,
                    len,
                }
            }
            TAG_BP => {
                let packed = self.u32()?;
                let register = (packed >> 24) as u8;
                let value = packed & 0x00FF_FFFF;
                Command::Bp { register, value }
            }
            _ => return Err(StreamError::UnknownCommand { tag, offset: start }),
        };

        Ok(Some(command))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSizer(usize);
    impl VertexSizer for FixedSizer {
        fn vertex_size(&self, _primitive: Primitive, _vat_fmt: u8) -> usize {
            self.0
        }
    }

    #[test]
    fn reads_bp_command() {
        let bytes = [0x61, 0x40, 0x00, 0x00, 0x01];
        let mut reader = Reader::new(&bytes, bytes.len());
        let command = reader.read_command(&FixedSizer(0)).unwrap().unwrap();
        assert_eq!(
            command,
            Command::Bp {
                register: 0x40,
                value: 0x000001
            }
        );
        assert!(reader.read_command(&FixedSizer(0)).unwrap().is_none());
    }

    #[test]
    fn reads_xf_run() {
        let mut bytes = vec![0x10, 0x00, 0x01, 0x00, 0x04];
        bytes.extend(0xAAAA_BBBBu32.to_be_bytes());
        bytes.extend(0xCCCC_DDDDu32.to_be_bytes());
        let mut reader = Reader::new(&bytes, bytes.len());
        let command = reader.read_command(&FixedSizer(0)).unwrap().unwrap();
        assert_eq!(
            command,
            Command::Xf {
                register: 0x0004,
                values: vec![0xAAAA_BBBB, 0xCCCC_DDDD],
            }
        );
    }

    #[test]
    fn truncated_stream_errors() {
        let bytes = [0x61, 0x40, 0x00];
        let mut reader = Reader::new(&bytes, bytes.len());
        assert!(matches!(
            reader.read_command(&FixedSizer(0)),
            Err(StreamError::TruncatedStream { offset: 0 })
        ));
    }

    #[test]
    fn unknown_tag_errors() {
        let bytes = [0x7F];
        let mut reader = Reader::new(&bytes, bytes.len());
        assert!(matches!(
            reader.read_command(&FixedSizer(0)),
            Err(StreamError::UnknownCommand { tag: 0x7F, offset: 0 })
        ));
    }

    #[test]
    fn reads_draw_payload_using_sizer() {
        let mut bytes = vec![0x80, 0x00, 0x02];
        bytes.extend([1, 2, 3, 4, 5, 6]);
        let mut reader = Reader::new(&bytes, bytes.len());
        let command = reader.read_command(&FixedSizer(3)).unwrap().unwrap();
        assert_eq!(
            command,
            Command::Draw {
                primitive: Primitive::Quads,
                vat_fmt: 0,
                vertex_count: 2,
                data: vec![1, 2, 3, 4, 5, 6],
            }
        );
    }
}
