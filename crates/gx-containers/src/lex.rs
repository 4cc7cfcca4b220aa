//! `LEX` container: a flat chain of magic-tagged sections (§6.4). Used to
//! carry feature-flag tables and similar auxiliary data alongside the main
//! asset payload; this crate only partitions the chain, it does not know
//! what any individual section's bytes mean.

use binrw::{BinRead, BinWrite};
use easyerr::{Error, ResultExt};
use std::io::Cursor;

const REV_MAJOR: u16 = 1;
const REV_MINOR: u16 = 0;

#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
#[brw(big, magic = b"LE-X")]
struct Header {
    rev_major: u16,
    rev_minor: u16,
    filesize: u32,
    first_section: u32,
}

/// One `{magic, bytes}` section of a LEX chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub magic: u32,
    pub data: Vec<u8>,
}

/// A parsed LEX container: an ordered chain of sections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Lex {
    pub sections: Vec<Section>,
}

#[derive(Debug, Error)]
pub enum LexError {
    #[error(transparent)]
    Io { source: binrw::Error },
    #[error("lex file reports version {major}.{minor}, only {REV_MAJOR}.{REV_MINOR} is supported")]
    UnsupportedVersion { major: u16, minor: u16 },
    #[error("lex filesize/first_section not 4-byte aligned")]
    Misaligned,
    #[error("header claims filesize {filesize} but only {available} bytes were given")]
    TruncatedFile { filesize: u32, available: usize },
    #[error("section with magic 0x{magic:08X} at offset {offset} claims size {size} but only {available} bytes remain")]
    TruncatedSection { magic: u32, offset: usize, size: u32, available: usize },
    #[error("section with magic 0x{magic:08X} at offset {offset} has size {size} which is not 4-byte aligned")]
    MisalignedSection { magic: u32, offset: usize, size: u32 },
}

impl Lex {
    /// Parses every section out of `bytes`, stopping at a zero magic word or
    /// the end of the declared file size, whichever comes first (§6.4, and
    /// §7's recovery policy doesn't apply here: a malformed chain is always
    /// a hard error).
    pub fn read(bytes: &[u8]) -> Result<Self, LexError> {
        let mut reader = Cursor::new(bytes);
        let header = Header::read(&mut reader).context(LexErrorCtx::Io)?;

        if header.rev_major != REV_MAJOR {
            return Err(LexError::UnsupportedVersion {
                major: header.rev_major,
                minor: header.rev_minor,
            });
        }
        if header.filesize % 4 != 0 || header.first_section % 4 != 0 {
            return Err(LexError::Misaligned);
        }
        if header.filesize as usize > bytes.len() {
            return Err(LexError::TruncatedFile {
                filesize: header.filesize,
                available: bytes.len(),
            });
        }

        let chain_start = header.first_section as usize;
        let chain = &bytes[chain_start..header.filesize as usize];

        let mut sections = Vec::new();
        let mut offset = 0usize;
        while offset < chain.len() {
            if chain.len() - offset < 8 {
                break;
            }
            let magic = u32::from_be_bytes(chain[offset..offset + 4].try_into().unwrap());
            if magic == 0 {
                break;
            }
            let size = u32::from_be_bytes(chain[offset + 4..offset + 8].try_into().unwrap());
            if size % 4 != 0 {
                return Err(LexError::MisalignedSection { magic, offset, size });
            }
            let data_start = offset + 8;
            let data_end = data_start + size as usize;
            if data_end > chain.len() {
                return Err(LexError::TruncatedSection {
                    magic,
                    offset,
                    size,
                    available: chain.len() - data_start,
                });
            }
            sections.push(Section {
                magic,
                data: chain[data_start..data_end].to_vec(),
            });
            offset = data_end;
        }

        Ok(Self { sections })
    }

    /// Serializes the chain back to bytes. Section sizes must already be a
    /// multiple of 4, matching what [`Self::read`] would accept; no padding
    /// is inserted since the caller owns section byte layout.
    pub fn write(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; std::mem::size_of::<Header>()];

        for section in &self.sections {
            bytes.extend_from_slice(&section.magic.to_be_bytes());
            bytes.extend_from_slice(&(section.data.len() as u32).to_be_bytes());
            bytes.extend_from_slice(&section.data);
        }

        let header = Header {
            rev_major: REV_MAJOR,
            rev_minor: REV_MINOR,
            filesize: bytes.len() as u32,
            first_section: std::mem::size_of::<Header>() as u32,
        };
        let mut cursor = Cursor::new(&mut bytes[..]);
        header.write(&mut cursor).expect("header fits in the reserved prefix");

        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Lex {
        Lex {
            sections: vec![
                Section {
                    magic: 0x4645_4154,
                    data: vec![1, 2, 3, 4],
                },
                Section {
                    magic: 0x5345_5431,
                    data: vec![],
                },
            ],
        }
    }

    #[test]
    fn round_trips_a_section_chain() {
        let lex = sample();
        let bytes = lex.write();
        let back = Lex::read(&bytes).unwrap();
        assert_eq!(lex, back);
    }

    #[test]
    fn empty_chain_round_trips() {
        let lex = Lex::default();
        let bytes = lex.write();
        assert_eq!(bytes.len(), std::mem::size_of::<Header>());
        let back = Lex::read(&bytes).unwrap();
        assert!(back.sections.is_empty());
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = sample().write();
        bytes[0] = b'X';
        assert!(matches!(Lex::read(&bytes), Err(LexError::Io { .. })));
    }

    #[test]
    fn rejects_misaligned_section_size() {
        let mut bytes = sample().write();
        // First section's size field, just after the 16-byte header + 4-byte magic.
        bytes[std::mem::size_of::<Header>() + 4..][..4].copy_from_slice(&5u32.to_be_bytes());
        assert!(matches!(Lex::read(&bytes), Err(LexError::MisalignedSection { .. })));
    }
}
