//! RARC archive codec (§6.3). A RARC is a filesystem-shaped archive used to
//! carry the resource tree the core ingests (models, textures, layout
//! chunks) inside one file: each directory's own files and subdirectories
//! laid out contiguously, breadth-first across the tree, a shared string
//! table, and one contiguous file-data blob. Only reading and
//! writing the container are in scope here; archive-editing operations
//! (import, delete, replace) belong to tooling that builds on this crate,
//! not to the codec itself.
//!
//! On-disk layout follows the 32-byte meta header / 32-byte nodes header
//! / 16-byte directory nodes / 20-byte filesystem nodes structure real RARC
//! files use, all sections 32-byte aligned.

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;

use binrw::{BinRead, BinWrite};
use easyerr::{Error, ResultExt};

fn round_up(x: usize, align: usize) -> usize {
    x.div_ceil(align) * align
}

const ALIGN: usize = 32;
const DIRECTORY_BIT: u16 = 1 << 1;

/// On-disk size of [`MetaHeader`], including its 4-byte magic (which isn't
/// a struct field, so `size_of::<MetaHeader>()` undercounts it).
const META_HEADER_SIZE: usize = 32;
/// On-disk size of [`NodesHeader`], including the 5-byte tail `pad_after`
/// (which `size_of::<NodesHeader>()` doesn't know about either).
const NODES_HEADER_SIZE: usize = 32;

#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
#[brw(big, magic = b"RARC")]
struct MetaHeader {
    filesize: u32,
    nodes_offset: u32,
    files_offset: u32,
    files_size: u32,
    mram_size: u32,
    aram_size: u32,
    dvd_size: u32,
}

#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
struct NodesHeader {
    dir_node_count: u32,
    dir_node_offset: u32,
    fs_node_count: u32,
    fs_node_offset: u32,
    string_table_size: u32,
    strings_offset: u32,
    id_max: u16,
    #[brw(pad_after = 5)]
    ids_synced: u8,
}

#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
struct RawDirNode {
    magic: u32,
    name_offset: u32,
    hash: u16,
    child_count: u16,
    children_offset: u32,
}

#[derive(Debug, Clone, Copy, BinRead, BinWrite)]
struct RawFsNode {
    id: u16,
    hash: u16,
    /// Attribute flags in the high byte, per real RARC files (the low byte
    /// is unused).
    kind: u16,
    name_offset: u16,
    a: u32,
    b: u32,
    _pad: u32,
}

impl RawFsNode {
    fn is_folder(self) -> bool {
        self.kind & (DIRECTORY_BIT << 8) != 0
    }
}

/// Where a file's bytes are staged for loading. Only affects which meta
/// header size counter the file's bytes are attributed to; has no bearing
/// on the byte layout of the archive itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Storage {
    #[default]
    Mram,
    Aram,
    Dvd,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct File {
    pub name: String,
    pub data: Vec<u8>,
    pub storage: Storage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub name: String,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Directory(Directory),
    File(File),
}

/// A parsed RARC archive. The synthetic `"."`/`".."` entries every real
/// directory carries on disk are elided on read and reinserted on write
/// (§6.3); callers never see them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    pub root: Directory,
}

#[derive(Debug, Error)]
pub enum RarcError {
    #[error(transparent)]
    Io { source: binrw::Error },
    #[error("nodes offset {offset} is before the end of the meta header")]
    NodesOffsetTooSmall { offset: u32 },
    #[error("directory node index {index} out of range ({count} directory nodes present)")]
    DirNodeOutOfRange { index: u32, count: usize },
    #[error("string table offset {offset} out of range ({len} bytes of strings present)")]
    StringOffsetOutOfRange { offset: usize, len: usize },
    #[error("string at offset {offset} is not null-terminated")]
    UnterminatedString { offset: usize },
    #[error("file data range {start}..{end} out of range ({len} bytes of file data present)")]
    FileDataOutOfRange { start: usize, end: usize, len: usize },
    #[error("root node (index 0) is not a directory")]
    RootIsNotADirectory,
}

/// Quick sniff for RARC's magic, without committing to a full parse.
pub fn is_rarc(bytes: &[u8]) -> bool {
    bytes.len() >= 4 && &bytes[..4] == b"RARC"
}

fn key_code(name: &str) -> u16 {
    let mut code = 0u32;
    for c in name.chars() {
        code = (c as u32).wrapping_add(code.wrapping_mul(3));
    }
    code as u16
}

fn dir_magic(name: &str, is_root: bool) -> u32 {
    if is_root {
        return u32::from_be_bytes(*b"ROOT");
    }
    let mut padded = name.to_ascii_uppercase();
    padded.truncate(4);
    while padded.len() < 4 {
        padded.push(' ');
    }
    u32::from_be_bytes(padded.as_bytes()[..4].try_into().unwrap())
}

fn read_c_string(bytes: &[u8], offset: usize) -> Result<String, RarcError> {
    if offset > bytes.len() {
        return Err(RarcError::StringOffsetOutOfRange { offset, len: bytes.len() });
    }
    let end = bytes[offset..]
        .iter()
        .position(|&b| b == 0)
        .ok_or(RarcError::UnterminatedString { offset })?;
    Ok(String::from_utf8_lossy(&bytes[offset..offset + end]).into_owned())
}

impl Archive {
    /// Parses a complete RARC container.
    pub fn read(bytes: &[u8]) -> Result<Self, RarcError> {
        let mut reader = Cursor::new(bytes);
        let meta = MetaHeader::read(&mut reader).context(RarcErrorCtx::Io)?;

        if (meta.nodes_offset as usize) < META_HEADER_SIZE {
            return Err(RarcError::NodesOffsetTooSmall { offset: meta.nodes_offset });
        }
        let nodes_base = meta.nodes_offset as usize;
        let mut reader = Cursor::new(&bytes[nodes_base..]);
        let nodes_header = NodesHeader::read(&mut reader).context(RarcErrorCtx::Io)?;

        let dir_nodes = {
            let mut reader = Cursor::new(&bytes[nodes_base + nodes_header.dir_node_offset as usize..]);
            (0..nodes_header.dir_node_count)
                .map(|_| RawDirNode::read(&mut reader).context(RarcErrorCtx::Io))
                .collect::<Result<Vec<_>, _>>()?
        };
        let fs_nodes = {
            let mut reader = Cursor::new(&bytes[nodes_base + nodes_header.fs_node_offset as usize..]);
            (0..nodes_header.fs_node_count)
                .map(|_| RawFsNode::read(&mut reader).context(RarcErrorCtx::Io))
                .collect::<Result<Vec<_>, _>>()?
        };
        let strings_base = nodes_base + nodes_header.strings_offset as usize;
        let strings = &bytes[strings_base..strings_base + nodes_header.string_table_size as usize];

        let file_data_base = meta.nodes_offset as usize + meta.files_offset as usize;
        let file_data = &bytes[file_data_base..];

        if dir_nodes.is_empty() {
            return Err(RarcError::RootIsNotADirectory);
        }

        let root = read_directory(&dir_nodes, &fs_nodes, strings, file_data, 0)?;

        Ok(Self { root })
    }

    /// Serializes the archive back to bytes.
    ///
    /// `make_matching` controls two dedup behaviors real RARC-writing
    /// tools disable when trying to match an original byte-for-byte
    /// output: with it off, identical file contents share one data
    /// region and identical names share one string-table entry (§8
    /// Scenario F).
    pub fn write(&self, make_matching: bool) -> Vec<u8> {
        let mut dir_nodes = Vec::new();
        let mut fs_nodes = Vec::new();
        let mut strings = Vec::new();
        let mut string_offsets: HashMap<String, u32> = HashMap::new();
        let mut file_data = Vec::new();
        let mut data_offsets: HashMap<Vec<u8>, u32> = HashMap::new();
        let mut mram_size = 0usize;
        let mut aram_size = 0usize;
        let mut dvd_size = 0usize;

        struct Pending<'a> {
            dir: &'a Directory,
            dir_id: u32,
            parent_dir_id: i32,
            name_offset: u32,
        }

        let root_name_offset = intern(&mut strings, &mut string_offsets, &self.root.name, make_matching);
        let mut queue: VecDeque<Pending> = VecDeque::new();
        queue.push_back(Pending {
            dir: &self.root,
            dir_id: 0,
            parent_dir_id: -1,
            name_offset: root_name_offset,
        });
        let mut next_dir_id = 1u32;
        let mut next_file_id = 0u16;
        // Reserve the root's directory-node slot; filled in once its
        // children block is known below.
        dir_nodes.push(None::<RawDirNode>);

        while let Some(pending) = queue.pop_front() {
            let children_offset = fs_nodes.len() as u32;
            let mut subdirs = Vec::new();

            for child in &pending.dir.children {
                match child {
                    Node::File(file) => {
                        let name_offset = intern(&mut strings, &mut string_offsets, &file.name, make_matching);
                        let padded_size = round_up(file.data.len(), ALIGN);
                        let offset = if make_matching {
                            None
                        } else {
                            data_offsets.get(&file.data).copied()
                        };
                        let offset = offset.unwrap_or_else(|| {
                            let at = file_data.len() as u32;
                            file_data.extend_from_slice(&file.data);
                            file_data.extend(std::iter::repeat_n(0u8, padded_size - file.data.len()));
                            match file.storage {
                                Storage::Mram => mram_size += padded_size,
                                Storage::Aram => aram_size += padded_size,
                                Storage::Dvd => dvd_size += padded_size,
                            }
                            data_offsets.insert(file.data.clone(), at);
                            at
                        });
                        fs_nodes.push(RawFsNode {
                            id: next_file_id,
                            hash: key_code(&file.name),
                            kind: 1 << 8,
                            name_offset: name_offset as u16,
                            a: offset,
                            b: file.data.len() as u32,
                            _pad: 0,
                        });
                        next_file_id += 1;
                    }
                    Node::Directory(dir) => {
                        let name_offset = intern(&mut strings, &mut string_offsets, &dir.name, make_matching);
                        let dir_id = next_dir_id;
                        next_dir_id += 1;
                        fs_nodes.push(RawFsNode {
                            id: 0xFFFF,
                            hash: key_code(&dir.name),
                            kind: (DIRECTORY_BIT) << 8,
                            name_offset: name_offset as u16,
                            a: dir_id,
                            b: 0x10,
                            _pad: 0,
                        });
                        subdirs.push((dir, dir_id, name_offset));
                    }
                }
            }

            let self_offset = intern(&mut strings, &mut string_offsets, ".", make_matching);
            let parent_offset = intern(&mut strings, &mut string_offsets, "..", make_matching);
            fs_nodes.push(RawFsNode {
                id: 0xFFFF,
                hash: key_code("."),
                kind: DIRECTORY_BIT << 8,
                name_offset: self_offset as u16,
                a: pending.dir_id,
                b: 0x10,
                _pad: 0,
            });
            fs_nodes.push(RawFsNode {
                id: 0xFFFF,
                hash: key_code(".."),
                kind: DIRECTORY_BIT << 8,
                name_offset: parent_offset as u16,
                a: pending.parent_dir_id as u32,
                b: 0x10,
                _pad: 0,
            });

            let child_count = (fs_nodes.len() as u32 - children_offset) as u16;
            let is_root = pending.dir_id == 0;
            let raw = RawDirNode {
                magic: dir_magic(&pending.dir.name, is_root),
                name_offset: pending.name_offset,
                hash: key_code(&pending.dir.name),
                child_count,
                children_offset,
            };
            if dir_nodes.len() as u32 <= pending.dir_id {
                dir_nodes.resize(pending.dir_id as usize + 1, None);
            }
            dir_nodes[pending.dir_id as usize] = Some(raw);

            for (dir, dir_id, name_offset) in subdirs {
                queue.push_back(Pending {
                    dir,
                    dir_id,
                    parent_dir_id: pending.dir_id as i32,
                    name_offset,
                });
            }
        }

        let dir_nodes: Vec<RawDirNode> = dir_nodes.into_iter().map(|n| n.expect("every dir id assigned")).collect();

        let dir_node_offset = NODES_HEADER_SIZE as u32;
        let dir_table_bytes = round_up(dir_nodes.len() * std::mem::size_of::<RawDirNode>(), ALIGN);
        let fs_node_offset = dir_node_offset + dir_table_bytes as u32;
        let fs_table_bytes = round_up(fs_nodes.len() * std::mem::size_of::<RawFsNode>(), ALIGN);
        let string_table_size = round_up(strings.len(), ALIGN) as u32;
        let strings_offset = fs_node_offset + fs_table_bytes as u32;

        let nodes_header = NodesHeader {
            dir_node_count: dir_nodes.len() as u32,
            dir_node_offset,
            fs_node_count: fs_nodes.len() as u32,
            fs_node_offset,
            string_table_size,
            strings_offset,
            id_max: next_file_id,
            ids_synced: 1,
        };

        let nodes_section_size = round_up((strings_offset + string_table_size) as usize, ALIGN);
        let meta = MetaHeader {
            filesize: (META_HEADER_SIZE + nodes_section_size + file_data.len()) as u32,
            nodes_offset: META_HEADER_SIZE as u32,
            files_offset: nodes_section_size as u32,
            files_size: file_data.len() as u32,
            mram_size: mram_size as u32,
            aram_size: aram_size as u32,
            dvd_size: dvd_size as u32,
        };

        let mut out = Vec::with_capacity(meta.filesize as usize);
        let mut cursor = Cursor::new(&mut out);
        meta.write(&mut cursor).expect("meta header fits");
        drop(cursor);

        out.resize(meta.nodes_offset as usize, 0);
        let mut cursor = Cursor::new(Vec::new());
        nodes_header.write(&mut cursor).expect("nodes header fits");
        out.extend_from_slice(cursor.get_ref());
        out.resize((meta.nodes_offset + dir_node_offset) as usize, 0);

        for node in &dir_nodes {
            let mut cursor = Cursor::new(Vec::new());
            node.write(&mut cursor).expect("dir node fits");
            out.extend_from_slice(cursor.get_ref());
        }
        out.resize((meta.nodes_offset + fs_node_offset) as usize, 0);

        for node in &fs_nodes {
            let mut cursor = Cursor::new(Vec::new());
            node.write(&mut cursor).expect("fs node fits");
            out.extend_from_slice(cursor.get_ref());
        }
        out.resize((meta.nodes_offset + strings_offset) as usize, 0);
        out.extend_from_slice(&strings);
        out.resize((meta.nodes_offset as usize + nodes_section_size), 0);

        out.extend_from_slice(&file_data);
        out
    }
}

fn intern(strings: &mut Vec<u8>, offsets: &mut HashMap<String, u32>, name: &str, make_matching: bool) -> u32 {
    if !make_matching {
        if let Some(&offset) = offsets.get(name) {
            return offset;
        }
    }
    let offset = strings.len() as u32;
    strings.extend_from_slice(name.as_bytes());
    strings.push(0);
    offsets.insert(name.to_string(), offset);
    offset
}

fn read_directory(
    dir_nodes: &[RawDirNode],
    fs_nodes: &[RawFsNode],
    strings: &[u8],
    file_data: &[u8],
    dir_index: u32,
) -> Result<Directory, RarcError> {
    let dir = dir_nodes.get(dir_index as usize).ok_or(RarcError::DirNodeOutOfRange {
        index: dir_index,
        count: dir_nodes.len(),
    })?;
    let name = read_c_string(strings, dir.name_offset as usize)?;

    let start = dir.children_offset as usize;
    let end = start + dir.child_count as usize;
    let mut children = Vec::with_capacity(dir.child_count as usize);

    for fs in &fs_nodes[start.min(fs_nodes.len())..end.min(fs_nodes.len())] {
        let child_name = read_c_string(strings, fs.name_offset as usize)?;
        if fs.is_folder() {
            if child_name == "." || child_name == ".." {
                continue;
            }
            let child = read_directory(dir_nodes, fs_nodes, strings, file_data, fs.a)?;
            children.push(Node::Directory(child));
        } else {
            let start = fs.a as usize;
            let size = fs.b as usize;
            let end = start + size;
            let data = file_data
                .get(start..end)
                .ok_or(RarcError::FileDataOutOfRange { start, end, len: file_data.len() })?
                .to_vec();
            children.push(Node::File(File {
                name: child_name,
                data,
                storage: Storage::Mram,
            }));
        }
    }

    Ok(Directory { name, children })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Archive {
        Archive {
            root: Directory {
                name: "archive".to_string(),
                children: vec![Node::Directory(Directory {
                    name: "f".to_string(),
                    children: vec![Node::File(File {
                        name: "g.bin".to_string(),
                        data: vec![0x01, 0x02, 0x03, 0x04],
                        storage: Storage::Mram,
                    })],
                })],
            },
        }
    }

    #[test]
    fn scenario_f_matching_mode_round_trips_byte_identically() {
        let archive = sample();
        let first = archive.write(true);
        assert!(is_rarc(&first));
        let loaded = Archive::read(&first).unwrap();
        assert_eq!(loaded, archive);
        let second = loaded.write(true);
        assert_eq!(first, second);
    }

    #[test]
    fn compact_mode_shares_identical_file_data() {
        let archive = Archive {
            root: Directory {
                name: "archive".to_string(),
                children: vec![
                    Node::File(File {
                        name: "a.bin".to_string(),
                        data: vec![9, 9, 9, 9],
                        storage: Storage::Mram,
                    }),
                    Node::File(File {
                        name: "b.bin".to_string(),
                        data: vec![9, 9, 9, 9],
                        storage: Storage::Mram,
                    }),
                ],
            },
        };
        let matching = archive.write(true);
        let compact = archive.write(false);
        assert!(compact.len() < matching.len());

        let loaded = Archive::read(&compact).unwrap();
        assert_eq!(loaded, archive);
    }

    #[test]
    fn rejects_truncated_header() {
        assert!(matches!(Archive::read(&[b'R', b'A', b'R', b'C']), Err(RarcError::Io { .. })));
    }

    #[test]
    fn nested_directories_round_trip() {
        let archive = Archive {
            root: Directory {
                name: "root".to_string(),
                children: vec![Node::Directory(Directory {
                    name: "a".to_string(),
                    children: vec![Node::Directory(Directory {
                        name: "b".to_string(),
                        children: vec![Node::File(File {
                            name: "deep.bin".to_string(),
                            data: vec![1, 2, 3],
                            storage: Storage::Dvd,
                        })],
                    })],
                })],
            },
        };
        let bytes = archive.write(true);
        let loaded = Archive::read(&bytes).unwrap();
        assert_eq!(loaded.root.children.len(), 1);
        let Node::Directory(a) = &loaded.root.children[0] else {
            panic!("expected directory a");
        };
        assert_eq!(a.name, "a");
    }
}
