//! HDF5 writer.
//!
//! Files use the library's default (earliest) format: a version 0
//! superblock, version 1 object headers, groups indexed by a symbol table
//! B-tree over a local heap, and chunked datasets indexed by a version 1
//! chunk B-tree. Every reader since HDF5 1.4 opens them.

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian};

use super::chunks::{chunk_bytes, gather, grid, next_index};
use super::filters::deflate_pipeline;
use super::format::*;
use crate::core::compress;
use crate::store::tree::{ArrayBuf, DatasetNode, NodeData, NodeId, NodeKind, Tree};
use crate::util::{ElementType, Error, Result, Value};

/// Growable file image with position tracking and in-place patching.
pub(crate) struct OStream {
    buf: Vec<u8>,
}

impl OStream {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Get the current write position.
    #[inline]
    pub fn pos(&self) -> u64 {
        self.buf.len() as u64
    }

    /// Pad with zeros up to the next multiple of 8.
    pub fn align(&mut self) {
        let len = pad8(self.buf.len());
        self.buf.resize(len, 0);
    }

    pub fn zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    /// Overwrite bytes that were written earlier.
    pub fn patch(&mut self, at: usize, data: &[u8]) {
        self.buf[at..at + data.len()].copy_from_slice(data);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Write a whole tree to `path`, replacing any existing file.
pub(crate) fn write_file(path: &Path, tree: &Tree) -> Result<()> {
    let image = encode(tree)?;
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    let mut out = BufWriter::with_capacity(1024 * 1024, file);
    out.write_all(&image)?;
    out.flush()?;
    Ok(())
}

/// Serialize a tree into a complete file image.
pub(crate) fn encode(tree: &Tree) -> Result<Vec<u8>> {
    let mut writer = Writer { stream: OStream::new() };
    writer.stream.zeros(SUPERBLOCK_V0_SIZE);
    let root = writer.group(tree, Tree::ROOT)?;
    writer.superblock(&root);
    Ok(writer.stream.into_inner())
}

/// Where a written group's structures landed.
struct GroupAddrs {
    header: u64,
    btree: u64,
    heap: u64,
}

/// One child link of a group being written.
struct Entry<'t> {
    name: &'t str,
    header: u64,
    /// B-tree and heap addresses cached for child groups
    scratch: Option<(u64, u64)>,
}

/// One child pointer of a B-tree node with its bounding keys.
struct BTreeEntry {
    left: Vec<u8>,
    child: u64,
    right: Vec<u8>,
}

/// One object header message.
struct Message {
    kind: u16,
    flags: u8,
    data: Vec<u8>,
}

impl Message {
    fn new(kind: u16, data: Vec<u8>) -> Self {
        Self { kind, flags: 0, data }
    }

    fn constant(kind: u16, data: Vec<u8>) -> Self {
        Self { kind, flags: msg::FLAG_CONSTANT, data }
    }
}

struct Writer {
    stream: OStream,
}

impl Writer {
    fn superblock(&mut self, root: &GroupAddrs) {
        let eof = self.stream.pos();
        let mut sb = Vec::with_capacity(SUPERBLOCK_V0_SIZE);
        sb.extend_from_slice(SIGNATURE);
        // superblock, free-space, root entry versions; reserved; shared header version
        sb.extend_from_slice(&[0, 0, 0, 0, 0, SIZE_OF_OFFSETS, SIZE_OF_LENGTHS, 0]);
        sb.extend_from_slice(&(GROUP_LEAF_K as u16).to_le_bytes());
        sb.extend_from_slice(&(GROUP_INTERNAL_K as u16).to_le_bytes());
        sb.extend_from_slice(&0u32.to_le_bytes()); // consistency flags
        for addr in [0, UNDEF_ADDR, eof, UNDEF_ADDR] {
            sb.extend_from_slice(&addr.to_le_bytes());
        }
        // root group symbol table entry
        sb.extend_from_slice(&0u64.to_le_bytes());
        sb.extend_from_slice(&root.header.to_le_bytes());
        sb.extend_from_slice(&1u32.to_le_bytes());
        sb.extend_from_slice(&0u32.to_le_bytes());
        sb.extend_from_slice(&root.btree.to_le_bytes());
        sb.extend_from_slice(&root.heap.to_le_bytes());
        debug_assert_eq!(sb.len(), SUPERBLOCK_V0_SIZE);
        self.stream.patch(0, &sb);
    }

    fn group(&mut self, tree: &Tree, id: NodeId) -> Result<GroupAddrs> {
        let mut children: Vec<(&str, NodeId)> =
            tree.children(id).iter().map(|(name, child)| (name.as_str(), *child)).collect();
        children.sort_unstable_by(|a, b| a.0.cmp(b.0));

        let mut entries = Vec::with_capacity(children.len());
        for (name, child) in children {
            check_name(name)?;
            let node = tree.node(child);
            let entry = match &node.kind {
                NodeKind::Group { .. } => {
                    let g = self.group(tree, child)?;
                    Entry { name, header: g.header, scratch: Some((g.btree, g.heap)) }
                }
                NodeKind::Dataset(dataset) => {
                    Entry { name, header: self.dataset(node, dataset)?, scratch: None }
                }
            };
            entries.push(entry);
        }

        // heap offset 0 holds the empty string
        let mut names = vec![0u8; 8];
        let mut offsets = Vec::with_capacity(entries.len());
        for entry in &entries {
            offsets.push(names.len() as u64);
            names.extend_from_slice(entry.name.as_bytes());
            names.resize(pad8(names.len() + 1), 0);
        }
        let heap = self.local_heap(&names);

        let mut leaves = Vec::new();
        let mut left = 0u64;
        for (batch, batch_offsets) in entries.chunks(SNOD_CAPACITY).zip(offsets.chunks(SNOD_CAPACITY)) {
            let child = self.symbol_node(batch, batch_offsets);
            let right = batch_offsets.last().copied().unwrap_or(0);
            leaves.push(BTreeEntry {
                left: left.to_le_bytes().to_vec(),
                child,
                right: right.to_le_bytes().to_vec(),
            });
            left = right;
        }
        let btree = self.btree(BTREE_GROUP, GROUP_INTERNAL_K, 8, leaves, &0u64.to_le_bytes());

        let mut symbol_table = Vec::with_capacity(16);
        symbol_table.extend_from_slice(&btree.to_le_bytes());
        symbol_table.extend_from_slice(&heap.to_le_bytes());
        let mut messages = vec![Message::new(msg::SYMBOL_TABLE, symbol_table)];
        messages.extend(attribute_messages(&tree.node(id).attrs)?);
        let header = self.object_header(&messages)?;
        Ok(GroupAddrs { header, btree, heap })
    }

    fn local_heap(&mut self, names: &[u8]) -> u64 {
        self.stream.align();
        let addr = self.stream.pos();
        self.stream.write_bytes(SIG_HEAP);
        self.stream.write_u8(0);
        self.stream.zeros(3);
        self.stream.write_u64(names.len() as u64);
        self.stream.write_u64(HEAP_FREE_NULL);
        self.stream.write_u64(addr + 32);
        self.stream.write_bytes(names);
        addr
    }

    fn symbol_node(&mut self, entries: &[Entry<'_>], offsets: &[u64]) -> u64 {
        self.stream.align();
        let addr = self.stream.pos();
        self.stream.write_bytes(SIG_SNOD);
        self.stream.write_u8(1);
        self.stream.write_u8(0);
        self.stream.write_u16(entries.len() as u16);
        for (entry, &offset) in entries.iter().zip(offsets) {
            self.stream.write_u64(offset);
            self.stream.write_u64(entry.header);
            match entry.scratch {
                Some((btree, heap)) => {
                    self.stream.write_u32(1);
                    self.stream.write_u32(0);
                    self.stream.write_u64(btree);
                    self.stream.write_u64(heap);
                }
                None => self.stream.zeros(24),
            }
        }
        self.stream.zeros((SNOD_CAPACITY - entries.len()) * SYMBOL_ENTRY_SIZE);
        debug_assert_eq!(self.stream.pos() - addr, snod_size() as u64);
        addr
    }

    /// Write a version 1 B-tree bottom-up and return the root address.
    fn btree(&mut self, node_type: u8, k: usize, key_size: usize, mut entries: Vec<BTreeEntry>, empty_key: &[u8]) -> u64 {
        let node_size = btree_node_size(k, key_size);
        let mut level = 0u8;
        loop {
            self.stream.align();
            let first = self.stream.pos();
            let count = entries.len().div_ceil(2 * k).max(1);
            let mut parents = Vec::with_capacity(count);

            for i in 0..count {
                let node = entries.get(i * 2 * k..entries.len().min((i + 1) * 2 * k)).unwrap_or(&[]);
                let addr = first + (i * node_size) as u64;
                let left = if i == 0 { UNDEF_ADDR } else { addr - node_size as u64 };
                let right = if i + 1 == count { UNDEF_ADDR } else { addr + node_size as u64 };

                let start = self.stream.pos();
                self.stream.write_bytes(SIG_TREE);
                self.stream.write_u8(node_type);
                self.stream.write_u8(level);
                self.stream.write_u16(node.len() as u16);
                self.stream.write_u64(left);
                self.stream.write_u64(right);
                for e in node {
                    self.stream.write_bytes(&e.left);
                    self.stream.write_u64(e.child);
                }
                self.stream.write_bytes(node.last().map_or(empty_key, |e| &e.right));
                let used = (self.stream.pos() - start) as usize;
                self.stream.zeros(node_size - used);

                if let (Some(head), Some(tail)) = (node.first(), node.last()) {
                    parents.push(BTreeEntry { left: head.left.clone(), child: addr, right: tail.right.clone() });
                }
            }

            if count == 1 {
                return first;
            }
            entries = parents;
            level += 1;
        }
    }

    fn dataset(&mut self, node: &NodeData, dataset: &DatasetNode) -> Result<u64> {
        let layout = &dataset.layout;
        let dims = layout.dims.sizes();
        let elem = layout.element.num_bytes();
        let raw = encode_buf(&dataset.buf);

        let mut messages = vec![
            Message::new(msg::DATASPACE, dataspace(dims)),
            Message::constant(msg::DATATYPE, element_datatype(layout.element)),
        ];

        let chunk = match (&layout.chunk, layout.compression) {
            (Some(chunk), _) => Some(chunk.sizes().to_vec()),
            (None, Some(_)) => Some(dims.to_vec()),
            (None, None) => None,
        };
        match chunk {
            Some(chunk) if !dims.is_empty() => {
                if chunk.len() != dims.len() || chunk.iter().any(|&c| c == 0 || c > u32::MAX as usize) {
                    return Err(Error::invalid(format!("chunk shape {chunk:?} does not fit extent {dims:?}")));
                }
                let btree = self.chunks(&raw, dims, &chunk, elem, layout.compression)?;

                let mut storage = vec![3u8, LAYOUT_CHUNKED, (dims.len() + 1) as u8];
                storage.extend_from_slice(&btree.to_le_bytes());
                for &c in &chunk {
                    storage.extend_from_slice(&(c as u32).to_le_bytes());
                }
                storage.extend_from_slice(&(elem as u32).to_le_bytes());

                messages.push(Message::constant(msg::FILL_VALUE, fill_value(ALLOC_INCREMENTAL)));
                if let Some(level) = layout.compression {
                    messages.push(Message::constant(msg::FILTER_PIPELINE, deflate_pipeline(level)));
                }
                messages.push(Message::constant(msg::LAYOUT, storage));
            }
            _ => {
                let addr = if raw.is_empty() {
                    UNDEF_ADDR
                } else {
                    self.stream.align();
                    let addr = self.stream.pos();
                    self.stream.write_bytes(&raw);
                    addr
                };
                let mut storage = vec![3u8, LAYOUT_CONTIGUOUS];
                storage.extend_from_slice(&addr.to_le_bytes());
                storage.extend_from_slice(&(raw.len() as u64).to_le_bytes());

                messages.push(Message::constant(msg::FILL_VALUE, fill_value(ALLOC_LATE)));
                messages.push(Message::constant(msg::LAYOUT, storage));
            }
        }

        messages.extend(attribute_messages(&node.attrs)?);
        self.object_header(&messages)
    }

    /// Write all chunks in row-major order and index them.
    fn chunks(&mut self, raw: &[u8], dims: &[usize], chunk: &[usize], elem: usize, level: Option<u32>) -> Result<u64> {
        if dims.iter().any(|&d| d == 0) {
            return Ok(UNDEF_ADDR);
        }
        let bounds = grid(dims, chunk);
        let mut image = vec![0u8; chunk_bytes(chunk, elem)?];
        let mut index = vec![0usize; dims.len()];
        let mut entries = Vec::new();

        loop {
            let offset: Vec<usize> = index.iter().zip(chunk).map(|(i, c)| i * c).collect();
            gather(raw, dims, chunk, &offset, elem, &mut image);
            let compressed;
            let stored = match level {
                Some(level) => {
                    compressed = compress(&image, level)?;
                    &compressed
                }
                None => &image,
            };
            let size = u32::try_from(stored.len())
                .map_err(|_| Error::invalid("chunk larger than 4 GiB"))?;

            self.stream.align();
            let addr = self.stream.pos();
            self.stream.write_bytes(stored);

            let end: Vec<usize> = offset.iter().zip(chunk).map(|(o, c)| o + c).collect();
            entries.push(BTreeEntry { left: chunk_key(size, &offset), child: addr, right: chunk_key(0, &end) });
            if !next_index(&mut index, &bounds) {
                break;
            }
        }

        let empty = chunk_key(0, &vec![0; dims.len()]);
        Ok(self.btree(BTREE_CHUNK, CHUNK_K, chunk_key_size(dims.len()), entries, &empty))
    }

    fn object_header(&mut self, messages: &[Message]) -> Result<u64> {
        let count = u16::try_from(messages.len())
            .map_err(|_| Error::invalid("too many attributes on one object"))?;
        let mut size = 0usize;
        for m in messages {
            if pad8(m.data.len()) > u16::MAX as usize {
                return Err(Error::invalid(format!("header message of {} bytes", m.data.len())));
            }
            size += 8 + pad8(m.data.len());
        }
        let size = u32::try_from(size).map_err(|_| Error::invalid("object header too large"))?;

        self.stream.align();
        let addr = self.stream.pos();
        self.stream.write_u8(1);
        self.stream.write_u8(0);
        self.stream.write_u16(count);
        self.stream.write_u32(1); // reference count
        self.stream.write_u32(size);
        self.stream.zeros(OBJECT_HEADER_V1_PREFIX - 12);
        for m in messages {
            let padded = pad8(m.data.len());
            self.stream.write_u16(m.kind);
            self.stream.write_u16(padded as u16);
            self.stream.write_u8(m.flags);
            self.stream.zeros(3);
            self.stream.write_bytes(&m.data);
            self.stream.zeros(padded - m.data.len());
        }
        Ok(addr)
    }
}

/// Link names become heap strings and path components.
fn check_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name.contains(['/', '\0']) {
        return Err(Error::invalid(format!("invalid object name {name:?}")));
    }
    Ok(())
}

fn chunk_key(size: u32, offset: &[usize]) -> Vec<u8> {
    let mut key = Vec::with_capacity(chunk_key_size(offset.len()));
    key.extend_from_slice(&size.to_le_bytes());
    key.extend_from_slice(&0u32.to_le_bytes()); // filter mask
    for &o in offset {
        key.extend_from_slice(&(o as u64).to_le_bytes());
    }
    key.extend_from_slice(&0u64.to_le_bytes());
    key
}

/// Version 1 dataspace; rank 0 is a scalar.
fn dataspace(dims: &[usize]) -> Vec<u8> {
    let mut out = vec![1u8, dims.len() as u8, 0, 0, 0, 0, 0, 0];
    for &d in dims {
        out.extend_from_slice(&(d as u64).to_le_bytes());
    }
    out
}

fn fill_value(alloc_time: u8) -> Vec<u8> {
    vec![2, alloc_time, FILL_TIME_IFSET, 0]
}

fn integer_datatype(size: usize, signed: bool) -> Vec<u8> {
    let mut out = vec![0x10 | CLASS_FIXED, if signed { 0x08 } else { 0 }, 0, 0];
    out.extend_from_slice(&(size as u32).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&((size * 8) as u16).to_le_bytes());
    out
}

/// Little-endian IEEE 754 layout.
fn float_datatype(size: usize) -> Vec<u8> {
    let (sign, exp_loc, exp_size, mant_size, bias): (u8, u8, u8, u8, u32) = if size == 4 {
        (31, 23, 8, 23, 127)
    } else {
        (63, 52, 11, 52, 1023)
    };
    let mut out = vec![0x10 | CLASS_FLOAT, 0x20, sign, 0];
    out.extend_from_slice(&(size as u32).to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(&((size * 8) as u16).to_le_bytes());
    out.extend_from_slice(&[exp_loc, exp_size, 0, mant_size]);
    out.extend_from_slice(&bias.to_le_bytes());
    out
}

/// Null-terminated fixed-length string.
fn string_datatype(size: usize, utf8: bool) -> Vec<u8> {
    let mut out = vec![0x10 | CLASS_STRING, if utf8 { 0x10 } else { 0 }, 0, 0];
    out.extend_from_slice(&(size as u32).to_le_bytes());
    out
}

fn element_datatype(element: ElementType) -> Vec<u8> {
    match element {
        ElementType::Uint8 => integer_datatype(1, false),
        ElementType::Uint16 => integer_datatype(2, false),
        ElementType::Int32 => integer_datatype(4, true),
        ElementType::Float32 => float_datatype(4),
        ElementType::Float64 => float_datatype(8),
    }
}

fn attribute_messages(attrs: &[(String, Value)]) -> Result<Vec<Message>> {
    attrs.iter().map(|(name, value)| attribute_message(name, value)).collect()
}

/// Version 1 attribute message.
fn attribute_message(name: &str, value: &Value) -> Result<Message> {
    if name.is_empty() || name.contains('\0') {
        return Err(Error::invalid(format!("invalid attribute name {name:?}")));
    }
    let (datatype, space, data) = match value {
        Value::String(s) => {
            let mut bytes = s.as_bytes().to_vec();
            bytes.push(0);
            (string_datatype(bytes.len(), !s.is_ascii()), dataspace(&[]), bytes)
        }
        Value::Int(v) => (integer_datatype(8, true), dataspace(&[]), v.to_le_bytes().to_vec()),
        Value::Float(v) => (float_datatype(8), dataspace(&[]), v.to_le_bytes().to_vec()),
        Value::IntArray(vals) => {
            let mut bytes = vec![0u8; vals.len() * 8];
            LittleEndian::write_i64_into(vals, &mut bytes);
            (integer_datatype(8, true), dataspace(&[vals.len()]), bytes)
        }
        Value::FloatArray(vals) => {
            let mut bytes = vec![0u8; vals.len() * 8];
            LittleEndian::write_f64_into(vals, &mut bytes);
            (float_datatype(8), dataspace(&[vals.len()]), bytes)
        }
    };

    let name_len = name.len() + 1;
    let mut out = Vec::with_capacity(8 + pad8(name_len) + pad8(datatype.len()) + pad8(space.len()) + data.len());
    out.extend_from_slice(&[1, 0]);
    for len in [name_len, datatype.len(), space.len()] {
        let len = u16::try_from(len).map_err(|_| Error::invalid(format!("attribute name {name:?} too long")))?;
        out.extend_from_slice(&len.to_le_bytes());
    }
    // name keeps its terminator inside the padding
    for (part, len) in [(name.as_bytes(), name_len), (datatype.as_slice(), datatype.len()), (space.as_slice(), space.len())] {
        let start = out.len();
        out.extend_from_slice(part);
        out.resize(start + pad8(len), 0);
    }
    out.extend_from_slice(&data);
    Ok(Message::new(msg::ATTRIBUTE, out))
}

/// Little-endian byte image of an array payload.
fn encode_buf(buf: &ArrayBuf) -> Vec<u8> {
    match buf {
        ArrayBuf::Uint8(v) => v.clone(),
        ArrayBuf::Uint16(v) => {
            let mut out = vec![0u8; v.len() * 2];
            LittleEndian::write_u16_into(v, &mut out);
            out
        }
        ArrayBuf::Int32(v) => {
            let mut out = vec![0u8; v.len() * 4];
            LittleEndian::write_i32_into(v, &mut out);
            out
        }
        ArrayBuf::Float32(v) => {
            let mut out = vec![0u8; v.len() * 4];
            LittleEndian::write_f32_into(v, &mut out);
            out
        }
        ArrayBuf::Float64(v) => {
            let mut out = vec![0u8; v.len() * 8];
            LittleEndian::write_f64_into(v, &mut out);
            out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u64(bytes: &[u8], at: usize) -> u64 {
        LittleEndian::read_u64(&bytes[at..at + 8])
    }

    #[test]
    fn test_empty_file_layout() -> Result<()> {
        let bytes = encode(&Tree::new())?;
        assert_eq!(&bytes[..8], SIGNATURE);
        assert_eq!(bytes[8], 0, "superblock version");
        assert_eq!(bytes[13], SIZE_OF_OFFSETS);
        assert_eq!(bytes[14], SIZE_OF_LENGTHS);
        // end of file address
        assert_eq!(read_u64(&bytes, 40), bytes.len() as u64);

        // root entry: header, then cached B-tree and heap addresses
        let header = read_u64(&bytes, 64) as usize;
        let btree = read_u64(&bytes, 80) as usize;
        let heap = read_u64(&bytes, 88) as usize;
        assert_eq!(bytes[header], 1, "object header version");
        assert_eq!(&bytes[btree..btree + 4], SIG_TREE);
        assert_eq!(&bytes[heap..heap + 4], SIG_HEAP);
        assert_eq!(bytes.len() % 8, 0);
        Ok(())
    }

    #[test]
    fn test_btree_nodes_full_size() -> Result<()> {
        let mut tree = Tree::new();
        for i in 0..20 {
            tree.add_child(Tree::ROOT, &format!("dataset{i}"), NodeData::group());
        }
        let bytes = encode(&tree)?;
        let btree = read_u64(&bytes, 80) as usize;
        assert_eq!(bytes[btree + 5], 0, "single leaf level");
        // 20 children need three symbol nodes
        assert_eq!(LittleEndian::read_u16(&bytes[btree + 6..]), 3);
        assert!(bytes.len() >= btree + btree_node_size(GROUP_INTERNAL_K, 8));
        Ok(())
    }

    #[test]
    fn test_attribute_message_layout() -> Result<()> {
        let m = attribute_message("object", &Value::from("PVOL"))?;
        assert_eq!(m.kind, msg::ATTRIBUTE);
        assert_eq!(m.data[0], 1);
        assert_eq!(LittleEndian::read_u16(&m.data[2..]), 7); // "object\0"
        assert_eq!(LittleEndian::read_u16(&m.data[4..]), 8); // string datatype
        assert_eq!(LittleEndian::read_u16(&m.data[6..]), 8); // scalar dataspace
        assert_eq!(&m.data[8..14], b"object");
        assert_eq!(&m.data[m.data.len() - 5..], b"PVOL\0");
        Ok(())
    }

    #[test]
    fn test_bad_names_rejected() {
        let mut tree = Tree::new();
        tree.add_child(Tree::ROOT, "a/b", NodeData::group());
        assert!(matches!(encode(&tree), Err(Error::InvalidStructure(_))));
        assert!(attribute_message("", &Value::Int(1)).is_err());
    }

    #[test]
    fn test_encode_little_endian() {
        let bytes = encode_buf(&ArrayBuf::Uint16(vec![0x0102, 0x0304]));
        assert_eq!(bytes, vec![0x02, 0x01, 0x04, 0x03]);

        let bytes = encode_buf(&ArrayBuf::Float32(vec![1.0]));
        assert_eq!(bytes, 1.0f32.to_le_bytes().to_vec());
    }

    #[test]
    fn test_float_datatype_matches_native() {
        assert_eq!(float_datatype(4)[..4], [0x11, 0x20, 31, 0]);
        assert_eq!(float_datatype(8).len(), 20);
        assert_eq!(integer_datatype(1, false)[..8], [0x10, 0, 0, 0, 1, 0, 0, 0]);
    }
}
