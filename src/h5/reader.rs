//! HDF5 reader.
//!
//! Loads a whole file into a node tree. Understands version 0 to 3
//! superblocks, version 1 and 2 object headers, groups stored either as
//! symbol tables or as compact link messages, and contiguous, compact or
//! chunked datasets with deflate, shuffle and fletcher32 filters.
//!
//! Dense (fractal heap) link and attribute storage, shared messages and
//! the newer chunk indexes are reported as [`Error::Unsupported`].

use std::fs::File;
use std::io::Read;
use std::path::Path;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use tracing::{debug, warn};

use super::chunks::{chunk_bytes, grid, next_index, scatter};
use super::cursor::{to_usize, Bytes};
use super::filters::{decode_pipeline, deflate_level, unfilter, Filter};
use super::format::*;
use crate::core::{DatasetLayout, MAX_DEFLATE_RATIO};
use crate::store::tree::{ArrayBuf, NodeData, NodeId, Tree};
use crate::util::{Dimensions, Error, Result, Value};

/// Load a whole HDF5 file into memory.
pub(crate) fn read_file(path: &Path, use_mmap: bool) -> Result<Tree> {
    let mut file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::FileNotFound(path.to_path_buf())
        } else {
            Error::Io(e)
        }
    })?;

    #[cfg(feature = "mmap")]
    if use_mmap && file.metadata()?.len() > 0 {
        // Safety: the map is only read during parsing and dropped before return
        let mmap = unsafe { memmap2::Mmap::map(&file) }?;
        return parse(&mmap);
    }
    #[cfg(not(feature = "mmap"))]
    let _ = use_mmap;

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    parse(&bytes)
}

/// Parse a complete file image.
pub(crate) fn parse(data: &[u8]) -> Result<Tree> {
    let at = find_superblock(data)?;
    let sb = superblock(data, at)?;
    let mut reader = Reader {
        data,
        base: sb.base,
        offset_size: sb.offset_size,
        length_size: sb.length_size,
        tree: Tree::new(),
        path: Vec::new(),
    };

    let header = reader.header(sb.root)?;
    if !header.is_group() {
        return Err(Error::invalid("root object is not a group"));
    }
    reader.group(Tree::ROOT, sb.root, &header, 0)?;

    let mut tree = reader.tree;
    tree.mark_clean();
    Ok(tree)
}

/// The superblock sits at 0, 512, 1024, 2048, ... to allow a user block.
fn find_superblock(data: &[u8]) -> Result<usize> {
    let mut at = 0usize;
    while at + SIGNATURE.len() <= data.len() {
        if &data[at..at + SIGNATURE.len()] == SIGNATURE {
            return Ok(at);
        }
        at = if at == 0 { 512 } else { at * 2 };
    }
    Err(Error::InvalidMagic)
}

struct Superblock {
    base: u64,
    offset_size: usize,
    length_size: usize,
    root: u64,
}

fn superblock(data: &[u8], at: usize) -> Result<Superblock> {
    let mut cur = Bytes::at(data, at + SIGNATURE.len())?;
    let version = cur.u8()?;
    let (offset_size, length_size) = match version {
        0 | 1 => {
            cur.skip(4)?; // free-space, root entry, reserved, shared header versions
            let sizes = (cur.u8()? as usize, cur.u8()? as usize);
            cur.skip(1 + 4 + 4)?; // reserved, group K values, flags
            if version == 1 {
                cur.skip(4)?; // indexed storage K, reserved
            }
            sizes
        }
        2 | 3 => {
            let sizes = (cur.u8()? as usize, cur.u8()? as usize);
            cur.skip(1)?; // flags
            sizes
        }
        v => return Err(Error::UnsupportedVersion(v as u16)),
    };
    for size in [offset_size, length_size] {
        if !matches!(size, 2 | 4 | 8) {
            return Err(Error::invalid(format!("bad offset or length size {size}")));
        }
    }

    // addresses are relative to where the superblock was found
    let stored_base = cur.uint(offset_size)?;
    let base = at as u64;
    if stored_base != base {
        debug!(stored_base, base, "superblock base address adjusted");
    }
    let root = if version < 2 {
        cur.skip(3 * offset_size)?; // free space, end of file, driver info
        cur.skip(offset_size)?; // root entry name offset
        cur.uint(offset_size)?
    } else {
        cur.skip(2 * offset_size)?; // extension, end of file
        cur.uint(offset_size)?
    };
    debug!(version, offset_size, length_size, "read superblock");
    Ok(Superblock { base, offset_size, length_size, root })
}

/// One message of an object header.
struct RawMessage<'a> {
    kind: u16,
    flags: u8,
    data: &'a [u8],
}

/// All messages of one object, continuation blocks included.
struct Header<'a> {
    messages: Vec<RawMessage<'a>>,
}

impl<'a> Header<'a> {
    fn find(&self, kind: u16) -> Option<&RawMessage<'a>> {
        self.messages.iter().find(|m| m.kind == kind)
    }

    fn all(&self, kind: u16) -> impl Iterator<Item = &RawMessage<'a>> {
        self.messages.iter().filter(move |m| m.kind == kind)
    }

    fn is_group(&self) -> bool {
        [msg::SYMBOL_TABLE, msg::LINK, msg::LINK_INFO].iter().any(|&k| self.find(k).is_some())
    }

    fn is_dataset(&self) -> bool {
        self.find(msg::LAYOUT).is_some()
    }

    /// Body of a required message that must not live in the shared heap.
    fn body(&self, kind: u16, what: &str) -> Result<&'a [u8]> {
        let m = self
            .find(kind)
            .ok_or_else(|| Error::invalid(format!("dataset has no {what} message")))?;
        if m.flags & msg::FLAG_SHARED != 0 {
            return Err(Error::unsupported(format!("shared {what} message")));
        }
        Ok(m.data)
    }
}

/// Decoded datatype message, reduced to what the tree can hold.
#[derive(Clone, Debug, PartialEq)]
enum Datatype {
    Integer { size: usize, signed: bool, big_endian: bool },
    Float { size: usize, big_endian: bool },
    FixedString { size: usize, space_padded: bool },
    VarString,
    Other(u8),
}

impl Datatype {
    fn size(&self) -> usize {
        match *self {
            Self::Integer { size, .. } | Self::Float { size, .. } | Self::FixedString { size, .. } => size,
            Self::VarString | Self::Other(_) => 0,
        }
    }
}

fn datatype(data: &[u8]) -> Result<Datatype> {
    let mut cur = Bytes::new(data);
    let class_version = cur.u8()?;
    let bits = cur.u8()?;
    cur.skip(2)?;
    let size = cur.u32()? as usize;
    let big_endian = bits & 0x01 != 0;

    Ok(match class_version & 0x0f {
        CLASS_FIXED if matches!(size, 1 | 2 | 4 | 8) => {
            Datatype::Integer { size, signed: bits & 0x08 != 0, big_endian }
        }
        // bit 6 set means VAX byte order
        CLASS_FLOAT if matches!(size, 4 | 8) && bits & 0x40 == 0 => Datatype::Float { size, big_endian },
        CLASS_STRING => Datatype::FixedString { size, space_padded: bits & 0x0f == 2 },
        CLASS_VLEN if bits & 0x0f == 1 => Datatype::VarString,
        class => Datatype::Other(class),
    })
}

/// Reader state for one file image.
struct Reader<'a> {
    data: &'a [u8],
    base: u64,
    offset_size: usize,
    length_size: usize,
    tree: Tree,
    /// Object headers of the groups being read, root first
    path: Vec<u64>,
}

impl<'a> Reader<'a> {
    fn is_undef(&self, addr: u64) -> bool {
        addr == u64::MAX >> (64 - 8 * self.offset_size)
    }

    fn cursor(&self, addr: u64) -> Result<Bytes<'a>> {
        if self.is_undef(addr) {
            return Err(Error::invalid("dereferenced an undefined address"));
        }
        let at = self
            .base
            .checked_add(addr)
            .ok_or_else(|| Error::invalid(format!("address {addr:#x} out of range")))?;
        Bytes::at(self.data, to_usize(at)?)
    }

    fn slice(&self, addr: u64, len: usize) -> Result<&'a [u8]> {
        self.cursor(addr)?.take(len)
    }

    fn offset(&self, cur: &mut Bytes<'_>) -> Result<u64> {
        cur.uint(self.offset_size)
    }

    fn length(&self, cur: &mut Bytes<'_>) -> Result<u64> {
        cur.uint(self.length_size)
    }

    // ---- object headers ----

    fn header(&self, addr: u64) -> Result<Header<'a>> {
        let mut cur = self.cursor(addr)?;
        let mut messages = Vec::new();
        let mut pending = Vec::new();

        let version = if cur.peek(4) == Some(SIG_OHDR.as_slice()) {
            cur.skip(4)?;
            let version = cur.u8()?;
            if version != 2 {
                return Err(Error::UnsupportedVersion(version as u16));
            }
            let flags = cur.u8()?;
            if flags & 0x20 != 0 {
                cur.skip(16)?; // access, modification, change, birth times
            }
            if flags & 0x10 != 0 {
                cur.skip(4)?; // attribute phase change values
            }
            let size = to_usize(cur.uint(1 << (flags & 0x03))?)?;
            let block = cur.take(size)?;
            self.messages_v2(block, flags & 0x04 != 0, &mut messages, &mut pending)?;
            Some(flags)
        } else {
            let version = cur.u8()?;
            if version != 1 {
                return Err(Error::UnsupportedVersion(version as u16));
            }
            cur.skip(1 + 2 + 4)?; // reserved, message count, reference count
            let size = cur.u32()? as usize;
            cur.skip(OBJECT_HEADER_V1_PREFIX - 12)?;
            let block = cur.take(size)?;
            self.messages_v1(block, &mut messages, &mut pending)?;
            None
        };

        let mut followed = 0usize;
        while let Some((addr, len)) = pending.pop() {
            followed += 1;
            if followed > MAX_CONTINUATIONS {
                return Err(Error::invalid("too many object header continuations"));
            }
            let block = self.slice(addr, to_usize(len)?)?;
            match version {
                Some(flags) => {
                    let mut cur = Bytes::new(block);
                    cur.expect(SIG_OCHK, "continuation block")?;
                    let body = cur.take(cur.remaining().saturating_sub(4))?;
                    self.messages_v2(body, flags & 0x04 != 0, &mut messages, &mut pending)?;
                }
                None => self.messages_v1(block, &mut messages, &mut pending)?,
            }
        }
        Ok(Header { messages })
    }

    fn continuation(&self, data: &[u8]) -> Result<(u64, u64)> {
        let mut cur = Bytes::new(data);
        Ok((self.offset(&mut cur)?, self.length(&mut cur)?))
    }

    fn messages_v1(&self, block: &'a [u8], out: &mut Vec<RawMessage<'a>>, pending: &mut Vec<(u64, u64)>) -> Result<()> {
        let mut cur = Bytes::new(block);
        while cur.remaining() >= 8 {
            let kind = cur.u16()?;
            let size = cur.u16()? as usize;
            let flags = cur.u8()?;
            cur.skip(3)?;
            let data = cur.take(size)?;
            self.push_message(RawMessage { kind, flags, data }, out, pending)?;
        }
        Ok(())
    }

    fn messages_v2(&self, block: &'a [u8], ordered: bool, out: &mut Vec<RawMessage<'a>>, pending: &mut Vec<(u64, u64)>) -> Result<()> {
        let prefix = if ordered { 6 } else { 4 };
        let mut cur = Bytes::new(block);
        // a gap shorter than a message prefix may end the block
        while cur.remaining() >= prefix {
            let kind = cur.u8()? as u16;
            let size = cur.u16()? as usize;
            let flags = cur.u8()?;
            if ordered {
                cur.skip(2)?;
            }
            let data = cur.take(size)?;
            self.push_message(RawMessage { kind, flags, data }, out, pending)?;
        }
        Ok(())
    }

    fn push_message(&self, m: RawMessage<'a>, out: &mut Vec<RawMessage<'a>>, pending: &mut Vec<(u64, u64)>) -> Result<()> {
        match m.kind {
            msg::NIL => {}
            msg::CONTINUATION => pending.push(self.continuation(m.data)?),
            _ => out.push(m),
        }
        Ok(())
    }

    // ---- groups ----

    fn group(&mut self, id: NodeId, addr: u64, header: &Header<'a>, depth: usize) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::invalid("group nesting too deep"));
        }
        if self.path.contains(&addr) {
            return Err(Error::invalid("group contains itself"));
        }
        self.path.push(addr);

        let attrs = self.attributes(header)?;
        self.tree.node_mut(id).attrs = attrs;

        for (name, child) in self.links(header)? {
            if self.tree.child(id, &name).is_some() {
                return Err(Error::invalid(format!("duplicate link '{name}'")));
            }
            let child_header = self.header(child)?;
            if child_header.is_group() {
                let child_id = self.tree.add_child(id, &name, NodeData::group());
                self.group(child_id, child, &child_header, depth + 1)?;
            } else if child_header.is_dataset() {
                if let Some(node) = self.dataset(&name, &child_header)? {
                    self.tree.add_child(id, &name, node);
                }
            } else {
                debug!(name = %name, "skipping object that is neither group nor dataset");
            }
        }

        self.path.pop();
        Ok(())
    }

    /// Hard links of a group, from its symbol table or link messages.
    fn links(&self, header: &Header<'a>) -> Result<Vec<(String, u64)>> {
        let mut links = Vec::new();
        if let Some(m) = header.find(msg::SYMBOL_TABLE) {
            let mut cur = Bytes::new(m.data);
            let btree = self.offset(&mut cur)?;
            let heap = self.local_heap(self.offset(&mut cur)?)?;
            self.group_btree(btree, heap, 0, &mut links)?;
            return Ok(links);
        }

        if let Some(m) = header.find(msg::LINK_INFO) {
            let mut cur = Bytes::new(m.data);
            cur.skip(1)?;
            let flags = cur.u8()?;
            if flags & 0x01 != 0 {
                cur.skip(8)?; // maximum creation index
            }
            if !self.is_undef(self.offset(&mut cur)?) {
                return Err(Error::unsupported("dense link storage"));
            }
        }
        for m in header.all(msg::LINK) {
            if let Some(link) = self.link(m.data)? {
                links.push(link);
            }
        }
        Ok(links)
    }

    /// Decode a link message; soft and external links yield `None`.
    fn link(&self, data: &[u8]) -> Result<Option<(String, u64)>> {
        let mut cur = Bytes::new(data);
        let version = cur.u8()?;
        if version != 1 {
            return Err(Error::UnsupportedVersion(version as u16));
        }
        let flags = cur.u8()?;
        let link_type = if flags & 0x08 != 0 { cur.u8()? } else { 0 };
        if flags & 0x04 != 0 {
            cur.skip(8)?; // creation order
        }
        if flags & 0x10 != 0 {
            cur.skip(1)?; // name character set
        }
        let name_len = to_usize(cur.uint(1 << (flags & 0x03))?)?;
        let name = String::from_utf8(cur.take(name_len)?.to_vec())?;
        if link_type != 0 {
            debug!(name = %name, link_type, "skipping non-hard link");
            return Ok(None);
        }
        Ok(Some((name, self.offset(&mut cur)?)))
    }

    /// Data segment of a local heap.
    fn local_heap(&self, addr: u64) -> Result<&'a [u8]> {
        let mut cur = self.cursor(addr)?;
        cur.expect(SIG_HEAP, "local heap")?;
        cur.skip(4)?; // version, reserved
        let size = to_usize(self.length(&mut cur)?)?;
        self.length(&mut cur)?; // free list head
        let data = self.offset(&mut cur)?;
        self.slice(data, size)
    }

    fn group_btree(&self, addr: u64, heap: &'a [u8], depth: usize, out: &mut Vec<(String, u64)>) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::invalid("group B-tree too deep"));
        }
        let mut cur = self.cursor(addr)?;
        cur.expect(SIG_TREE, "B-tree")?;
        if cur.u8()? != BTREE_GROUP {
            return Err(Error::invalid("group B-tree has wrong node type"));
        }
        let level = cur.u8()?;
        let entries = cur.u16()? as usize;
        cur.skip(2 * self.offset_size)?; // siblings

        for _ in 0..entries {
            self.length(&mut cur)?; // key
            let child = self.offset(&mut cur)?;
            if level > 0 {
                self.group_btree(child, heap, depth + 1, out)?;
            } else {
                self.symbol_node(child, heap, out)?;
            }
        }
        Ok(())
    }

    fn symbol_node(&self, addr: u64, heap: &'a [u8], out: &mut Vec<(String, u64)>) -> Result<()> {
        let mut cur = self.cursor(addr)?;
        cur.expect(SIG_SNOD, "symbol table node")?;
        cur.skip(2)?; // version, reserved
        let count = cur.u16()? as usize;
        for _ in 0..count {
            let name = heap_string(heap, to_usize(self.length(&mut cur)?)?)?;
            let header = self.offset(&mut cur)?;
            cur.skip(4 + 4 + 16)?; // cache type, reserved, scratch pad
            out.push((name, header));
        }
        Ok(())
    }

    // ---- attributes ----

    fn attributes(&self, header: &Header<'a>) -> Result<Vec<(String, Value)>> {
        if let Some(m) = header.find(msg::ATTRIBUTE_INFO) {
            let mut cur = Bytes::new(m.data);
            cur.skip(1)?;
            if cur.u8()? & 0x01 != 0 {
                cur.skip(2)?; // maximum creation index
            }
            if !self.is_undef(self.offset(&mut cur)?) {
                return Err(Error::unsupported("dense attribute storage"));
            }
        }

        let mut attrs = Vec::new();
        for m in header.all(msg::ATTRIBUTE) {
            if m.flags & msg::FLAG_SHARED != 0 {
                return Err(Error::unsupported("shared attribute message"));
            }
            if let Some((name, value)) = self.attribute(m.data)? {
                if attrs.iter().any(|(n, _)| *n == name) {
                    return Err(Error::invalid(format!("duplicate attribute '{name}'")));
                }
                attrs.push((name, value));
            }
        }
        Ok(attrs)
    }

    fn attribute(&self, data: &'a [u8]) -> Result<Option<(String, Value)>> {
        let mut cur = Bytes::new(data);
        let version = cur.u8()?;
        let flags = cur.u8()?;
        let name_len = cur.u16()? as usize;
        let type_len = cur.u16()? as usize;
        let space_len = cur.u16()? as usize;
        let pad = |n: usize| if version == 1 { pad8(n) } else { n };
        match version {
            1 => {}
            2 | 3 => {
                if flags & 0x03 != 0 {
                    return Err(Error::unsupported("shared attribute datatype"));
                }
                if version == 3 {
                    cur.skip(1)?; // name character set
                }
            }
            v => return Err(Error::UnsupportedVersion(v as u16)),
        }

        let raw_name = cur.take(pad(name_len))?;
        let name = c_string(&raw_name[..name_len.min(raw_name.len())])?;
        let dt = datatype(&cur.take(pad(type_len))?[..type_len])?;
        let Some(dims) = self.dataspace(&cur.take(pad(space_len))?[..space_len])? else {
            warn!(name = %name, "skipping attribute with null dataspace");
            return Ok(None);
        };
        let count = checked_points(&dims)?;

        let value = match dt {
            Datatype::FixedString { size, space_padded } if count == 1 => {
                let s = c_string(cur.take(size)?)?;
                Value::String(if space_padded { s.trim_end_matches(' ').to_string() } else { s })
            }
            Datatype::VarString if count == 1 => {
                cur.skip(4)?; // length
                let heap = self.offset(&mut cur)?;
                let index = cur.u32()?;
                Value::String(c_string(self.global_object(heap, index)?)?)
            }
            Datatype::Integer { size, signed, big_endian } => {
                let raw = cur.take(count.checked_mul(size).ok_or_else(|| Error::invalid("attribute too large"))?)?;
                let vals: Vec<i64> = raw.chunks_exact(size).map(|b| int_value(b, signed, big_endian)).collect();
                if dims.is_empty() { Value::Int(vals[0]) } else { Value::IntArray(vals) }
            }
            Datatype::Float { size, big_endian } => {
                let raw = cur.take(count.checked_mul(size).ok_or_else(|| Error::invalid("attribute too large"))?)?;
                let vals: Vec<f64> = raw.chunks_exact(size).map(|b| float_value(b, big_endian)).collect();
                if dims.is_empty() { Value::Float(vals[0]) } else { Value::FloatArray(vals) }
            }
            other => {
                warn!(name = %name, datatype = ?other, count, "skipping attribute of unsupported type");
                return Ok(None);
            }
        };
        Ok(Some((name, value)))
    }

    /// Dataspace extent; `None` for a null dataspace, empty for a scalar.
    fn dataspace(&self, data: &[u8]) -> Result<Option<Vec<u64>>> {
        let mut cur = Bytes::new(data);
        let version = cur.u8()?;
        let rank = cur.u8()? as usize;
        cur.skip(1)?; // flags
        match version {
            1 => cur.skip(5)?,
            2 => {
                if cur.u8()? == 2 {
                    return Ok(None);
                }
            }
            v => return Err(Error::UnsupportedVersion(v as u16)),
        }
        (0..rank).map(|_| self.length(&mut cur)).collect::<Result<Vec<_>>>().map(Some)
    }

    /// Object `index` of the global heap collection at `addr`.
    fn global_object(&self, addr: u64, index: u32) -> Result<&'a [u8]> {
        let mut head = self.cursor(addr)?;
        head.expect(SIG_GCOL, "global heap")?;
        head.skip(4)?; // version, reserved
        let size = to_usize(self.length(&mut head)?)?;
        let mut cur = Bytes::new(self.slice(addr, size)?);
        cur.skip(8 + self.length_size)?;

        while cur.remaining() >= 8 + self.length_size {
            let id = cur.u16()?;
            cur.skip(2 + 4)?; // reference count, reserved
            let len = to_usize(self.length(&mut cur)?)?;
            if id == 0 {
                break;
            }
            let object = cur.take(len)?;
            if id as u32 == index {
                return Ok(object);
            }
            cur.skip(pad8(len) - len)?;
        }
        Err(Error::invalid(format!("global heap object {index} missing")))
    }

    // ---- datasets ----

    /// Read one dataset, or `None` when its element type has no tree form.
    fn dataset(&self, name: &str, header: &Header<'a>) -> Result<Option<NodeData>> {
        let dims = self
            .dataspace(header.body(msg::DATASPACE, "dataspace")?)?
            .unwrap_or_default()
            .into_iter()
            .map(to_usize)
            .collect::<Result<Vec<_>>>()?;
        let dt = datatype(header.body(msg::DATATYPE, "datatype")?)?;
        let elem = dt.size();
        let Some(decode) = element_decoder(&dt) else {
            warn!(name, datatype = ?dt, "skipping dataset of unsupported type");
            return Ok(None);
        };

        let points = checked_points(&dims)?;
        let nbytes = points
            .checked_mul(elem)
            .ok_or_else(|| Error::invalid(format!("dataset '{name}' extent {dims:?} overflows")))?;
        if nbytes > self.data.len().saturating_mul(MAX_DEFLATE_RATIO) {
            return Err(Error::invalid(format!("dataset '{name}' extent {dims:?} exceeds file contents")));
        }

        let filters = match header.find(msg::FILTER_PIPELINE) {
            Some(m) => decode_pipeline(m.data)?,
            None => Vec::new(),
        };
        let storage = self.layout(header.body(msg::LAYOUT, "layout")?, dims.len())?;
        let chunk = storage.chunk().map(|c| c.to_vec());
        let raw = self.dataset_bytes(&storage, &filters, &dims, elem, nbytes)?;

        let buf = decode(&raw);
        let layout = DatasetLayout {
            element: buf.element_type(),
            dims: Dimensions::from_slice(&dims),
            chunk: chunk.map(|c| Dimensions::from_slice(&c)),
            compression: deflate_level(&filters),
        };
        let mut node = NodeData::dataset(layout, buf);
        node.attrs = self.attributes(header)?;
        Ok(Some(node))
    }

    fn layout(&self, data: &'a [u8], rank: usize) -> Result<Storage<'a>> {
        let mut cur = Bytes::new(data);
        let version = cur.u8()?;
        if !matches!(version, 3 | 4) {
            return Err(Error::UnsupportedVersion(version as u16));
        }
        match cur.u8()? {
            LAYOUT_COMPACT => {
                let size = cur.u16()? as usize;
                Ok(Storage::Compact(cur.take(size)?))
            }
            LAYOUT_CONTIGUOUS => {
                let addr = self.offset(&mut cur)?;
                self.length(&mut cur)?;
                Ok(Storage::Contiguous(addr))
            }
            LAYOUT_CHUNKED if version == 3 => {
                let ndims = cur.u8()? as usize;
                let addr = self.offset(&mut cur)?;
                let chunk = (0..ndims).map(|_| cur.u32().map(|v| v as usize)).collect::<Result<Vec<_>>>()?;
                Ok(Storage::BTree { addr, chunk: chunk_shape(chunk, rank)? })
            }
            LAYOUT_CHUNKED => {
                let flags = cur.u8()?;
                let ndims = cur.u8()? as usize;
                let width = cur.u8()? as usize;
                let chunk = (0..ndims)
                    .map(|_| cur.uint(width).and_then(to_usize))
                    .collect::<Result<Vec<_>>>()?;
                let chunk = chunk_shape(chunk, rank)?;
                match cur.u8()? {
                    CHUNK_INDEX_SINGLE => {
                        let filtered = if flags & 0x02 != 0 {
                            Some((to_usize(self.length(&mut cur)?)?, cur.u32()?))
                        } else {
                            None
                        };
                        Ok(Storage::Single { addr: self.offset(&mut cur)?, filtered, chunk })
                    }
                    CHUNK_INDEX_IMPLICIT => Ok(Storage::Implicit { addr: self.offset(&mut cur)?, chunk }),
                    index => Err(Error::unsupported(format!("chunk index type {index}"))),
                }
            }
            class => Err(Error::invalid(format!("unknown layout class {class}"))),
        }
    }

    fn dataset_bytes(&self, storage: &Storage<'a>, filters: &[Filter], dims: &[usize], elem: usize, nbytes: usize) -> Result<Vec<u8>> {
        let mut raw = match storage {
            Storage::Compact(data) => {
                if data.len() < nbytes {
                    return Err(Error::invalid("compact dataset shorter than its extent"));
                }
                return Ok(data[..nbytes].to_vec());
            }
            Storage::Contiguous(addr) => {
                if self.is_undef(*addr) {
                    return Ok(vec![0; nbytes]);
                }
                return Ok(self.slice(*addr, nbytes)?.to_vec());
            }
            _ => vec![0u8; nbytes],
        };

        match storage {
            Storage::BTree { addr, chunk } if !self.is_undef(*addr) => {
                self.chunk_btree(*addr, filters, dims, chunk, elem, 0, &mut raw)?;
            }
            Storage::Single { addr, filtered, chunk } if !self.is_undef(*addr) => {
                let expected = chunk_bytes(chunk, elem)?;
                let (size, mask) = filtered.unwrap_or((expected, 0));
                let decoded = unfilter(filters, self.slice(*addr, size)?, mask, expected)?;
                scatter(&mut raw, dims, chunk, &vec![0; dims.len()], elem, &decoded)?;
            }
            Storage::Implicit { addr, chunk } if !self.is_undef(*addr) => {
                let size = chunk_bytes(chunk, elem)?;
                let bounds = grid(dims, chunk);
                let mut index = vec![0usize; dims.len()];
                let mut at = *addr;
                loop {
                    let offset: Vec<usize> = index.iter().zip(chunk).map(|(i, c)| i * c).collect();
                    scatter(&mut raw, dims, chunk, &offset, elem, self.slice(at, size)?)?;
                    at = at.saturating_add(size as u64);
                    if !next_index(&mut index, &bounds) {
                        break;
                    }
                }
            }
            _ => {}
        }
        Ok(raw)
    }

    #[allow(clippy::too_many_arguments)]
    fn chunk_btree(&self, addr: u64, filters: &[Filter], dims: &[usize], chunk: &[usize], elem: usize, depth: usize, out: &mut [u8]) -> Result<()> {
        if depth > MAX_DEPTH {
            return Err(Error::invalid("chunk B-tree too deep"));
        }
        let mut cur = self.cursor(addr)?;
        cur.expect(SIG_TREE, "B-tree")?;
        if cur.u8()? != BTREE_CHUNK {
            return Err(Error::invalid("chunk B-tree has wrong node type"));
        }
        let level = cur.u8()?;
        let entries = cur.u16()? as usize;
        cur.skip(2 * self.offset_size)?; // siblings

        let expected = chunk_bytes(chunk, elem)?;
        for _ in 0..entries {
            let size = cur.u32()? as usize;
            let mask = cur.u32()?;
            let offset = (0..=dims.len())
                .map(|_| cur.u64().and_then(to_usize))
                .collect::<Result<Vec<_>>>()?;
            let child = self.offset(&mut cur)?;
            if level > 0 {
                self.chunk_btree(child, filters, dims, chunk, elem, depth + 1, out)?;
            } else {
                let decoded = unfilter(filters, self.slice(child, size)?, mask, expected)?;
                scatter(out, dims, chunk, &offset[..dims.len()], elem, &decoded)?;
            }
        }
        Ok(())
    }
}

/// Where a dataset's elements live.
enum Storage<'a> {
    Compact(&'a [u8]),
    Contiguous(u64),
    BTree { addr: u64, chunk: Vec<usize> },
    Single { addr: u64, filtered: Option<(usize, u32)>, chunk: Vec<usize> },
    Implicit { addr: u64, chunk: Vec<usize> },
}

impl Storage<'_> {
    fn chunk(&self) -> Option<&[usize]> {
        match self {
            Self::BTree { chunk, .. } | Self::Single { chunk, .. } | Self::Implicit { chunk, .. } => Some(chunk),
            Self::Compact(_) | Self::Contiguous(_) => None,
        }
    }
}

/// Drop the trailing element-size entry and check the chunk fits the rank.
fn chunk_shape(mut chunk: Vec<usize>, rank: usize) -> Result<Vec<usize>> {
    chunk.pop();
    if chunk.len() != rank || chunk.iter().any(|&c| c == 0) {
        return Err(Error::invalid(format!("chunk shape {chunk:?} does not fit rank {rank}")));
    }
    Ok(chunk)
}

fn checked_points(dims: &[impl Copy + TryInto<usize>]) -> Result<usize> {
    let sizes = dims
        .iter()
        .map(|&d| d.try_into().map_err(|_| Error::invalid("extent does not fit in memory")))
        .collect::<Result<Vec<usize>>>()?;
    Dimensions::from_slice(&sizes)
        .checked_num_points()
        .ok_or_else(|| Error::invalid(format!("extent {sizes:?} overflows")))
}

/// NUL-terminated string from a local heap.
fn heap_string(heap: &[u8], offset: usize) -> Result<String> {
    let bytes = heap
        .get(offset..)
        .ok_or_else(|| Error::invalid(format!("heap offset {offset} out of range")))?;
    c_string(bytes)
}

fn c_string(bytes: &[u8]) -> Result<String> {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    Ok(String::from_utf8(bytes[..end].to_vec())?)
}

fn int_value(bytes: &[u8], signed: bool, big_endian: bool) -> i64 {
    let n = bytes.len();
    match (signed, big_endian) {
        (true, false) => LittleEndian::read_int(bytes, n),
        (true, true) => BigEndian::read_int(bytes, n),
        (false, false) => LittleEndian::read_uint(bytes, n) as i64,
        (false, true) => BigEndian::read_uint(bytes, n) as i64,
    }
}

fn float_value(bytes: &[u8], big_endian: bool) -> f64 {
    match (bytes.len(), big_endian) {
        (4, false) => LittleEndian::read_f32(bytes) as f64,
        (4, true) => BigEndian::read_f32(bytes) as f64,
        (_, false) => LittleEndian::read_f64(bytes),
        (_, true) => BigEndian::read_f64(bytes),
    }
}

/// Decoder from stored bytes to a typed buffer for the datatypes the tree holds.
///
/// Narrow signed integers widen to `i32` and `u32` widens to `f64`.
fn element_decoder(dt: &Datatype) -> Option<fn(&[u8]) -> ArrayBuf> {
    match *dt {
        Datatype::Integer { size, signed, big_endian: false } => int_decoder::<LittleEndian>(size, signed),
        Datatype::Integer { size, signed, big_endian: true } => int_decoder::<BigEndian>(size, signed),
        Datatype::Float { size, big_endian: false } => Some(float_decoder::<LittleEndian>(size)),
        Datatype::Float { size, big_endian: true } => Some(float_decoder::<BigEndian>(size)),
        _ => None,
    }
}

fn int_decoder<B: ByteOrder>(size: usize, signed: bool) -> Option<fn(&[u8]) -> ArrayBuf> {
    let decode: fn(&[u8]) -> ArrayBuf = match (size, signed) {
        (1, false) => |raw: &[u8]| ArrayBuf::Uint8(raw.to_vec()),
        (1, true) => |raw: &[u8]| ArrayBuf::Int32(raw.iter().map(|&b| b as i8 as i32).collect()),
        (2, false) => |raw: &[u8]| {
            let mut out = vec![0u16; raw.len() / 2];
            B::read_u16_into(raw, &mut out);
            ArrayBuf::Uint16(out)
        },
        (2, true) => |raw: &[u8]| {
            let mut out = vec![0i16; raw.len() / 2];
            B::read_i16_into(raw, &mut out);
            ArrayBuf::Int32(out.into_iter().map(i32::from).collect())
        },
        (4, true) => |raw: &[u8]| {
            let mut out = vec![0i32; raw.len() / 4];
            B::read_i32_into(raw, &mut out);
            ArrayBuf::Int32(out)
        },
        (4, false) => |raw: &[u8]| {
            let mut out = vec![0u32; raw.len() / 4];
            B::read_u32_into(raw, &mut out);
            ArrayBuf::Float64(out.into_iter().map(f64::from).collect())
        },
        _ => return None,
    };
    Some(decode)
}

fn float_decoder<B: ByteOrder>(size: usize) -> fn(&[u8]) -> ArrayBuf {
    if size == 4 {
        |raw: &[u8]| {
            let mut out = vec![0f32; raw.len() / 4];
            B::read_f32_into(raw, &mut out);
            ArrayBuf::Float32(out)
        }
    } else {
        |raw: &[u8]| {
            let mut out = vec![0f64; raw.len() / 8];
            B::read_f64_into(raw, &mut out);
            ArrayBuf::Float64(out)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::h5::writer::encode;
    use crate::store::tree::NodeKind;
    use crate::util::ElementType;

    fn dataset(tree: &Tree, id: NodeId) -> (&DatasetLayout, &ArrayBuf) {
        match &tree.node(id).kind {
            NodeKind::Dataset(d) => (&d.layout, &d.buf),
            NodeKind::Group { .. } => panic!("expected dataset"),
        }
    }

    #[test]
    fn test_tree_survives_encoding() -> Result<()> {
        let mut tree = Tree::new();
        tree.node_mut(Tree::ROOT).attrs.push(("Conventions".into(), Value::from("ODIM_H5/V2_0")));
        let what = tree.add_child(Tree::ROOT, "what", NodeData::group());
        tree.node_mut(what).attrs.extend([
            ("lat".to_string(), Value::Float(-37.85)),
            ("nbins".to_string(), Value::Int(480)),
            ("angles".to_string(), Value::FloatArray(vec![0.5, 1.3])),
            ("levels".to_string(), Value::IntArray(vec![-1, 2, 3])),
            ("source".to_string(), Value::from("WMO:94866,NOD:aumel")),
        ]);
        let layout = DatasetLayout::new(ElementType::Int32, Dimensions::d2(2, 3))
            .with_chunk(Dimensions::d2(2, 3))
            .with_compression(6);
        let mut data = NodeData::dataset(layout.clone(), ArrayBuf::Int32(vec![1, 2, 3, 4, 5, -6]));
        data.attrs.push(("CLASS".into(), Value::from("IMAGE")));
        tree.add_child(what, "data", data);

        let parsed = parse(&encode(&tree)?)?;
        assert!(!parsed.is_dirty());
        assert_eq!(
            parsed.node(Tree::ROOT).attr("Conventions"),
            Some(&Value::from("ODIM_H5/V2_0"))
        );
        let what = parsed.child(Tree::ROOT, "what").unwrap();
        assert_eq!(parsed.node(what).attrs, tree.node(1).attrs);

        let data = parsed.child(what, "data").unwrap();
        assert_eq!(parsed.node(data).attr("CLASS"), Some(&Value::from("IMAGE")));
        let (read_layout, buf) = dataset(&parsed, data);
        assert_eq!(*read_layout, layout);
        assert_eq!(*buf, ArrayBuf::Int32(vec![1, 2, 3, 4, 5, -6]));
        Ok(())
    }

    #[test]
    fn test_multi_chunk_datasets() -> Result<()> {
        let mut tree = Tree::new();
        let values: Vec<u16> = (0..7 * 9).collect();
        let compressed = DatasetLayout::new(ElementType::Uint16, Dimensions::d2(7, 9))
            .with_chunk(Dimensions::d2(3, 4))
            .with_compression(4);
        tree.add_child(Tree::ROOT, "packed", NodeData::dataset(compressed.clone(), ArrayBuf::Uint16(values.clone())));

        let plain = DatasetLayout::new(ElementType::Float64, Dimensions::d1(5)).with_chunk(Dimensions::d1(2));
        let floats = vec![0.5, -1.0, 2.25, 1e300, -0.0];
        tree.add_child(Tree::ROOT, "plain", NodeData::dataset(plain.clone(), ArrayBuf::Float64(floats.clone())));

        let contiguous = DatasetLayout::new(ElementType::Uint8, Dimensions::d2(2, 2));
        tree.add_child(Tree::ROOT, "raw", NodeData::dataset(contiguous.clone(), ArrayBuf::Uint8(vec![9, 8, 7, 6])));

        let parsed = parse(&encode(&tree)?)?;
        for (name, layout, buf) in [
            ("packed", compressed, ArrayBuf::Uint16(values)),
            ("plain", plain, ArrayBuf::Float64(floats)),
            ("raw", contiguous, ArrayBuf::Uint8(vec![9, 8, 7, 6])),
        ] {
            let id = parsed.child(Tree::ROOT, name).unwrap();
            let (read_layout, read_buf) = dataset(&parsed, id);
            assert_eq!(*read_layout, layout, "{name}");
            assert_eq!(*read_buf, buf, "{name}");
        }
        Ok(())
    }

    #[test]
    fn test_many_children() -> Result<()> {
        // enough links for several symbol table nodes
        let mut tree = Tree::new();
        for i in (1..=30).rev() {
            let g = tree.add_child(Tree::ROOT, &format!("dataset{i}"), NodeData::group());
            tree.node_mut(g).attrs.push(("index".into(), Value::Int(i)));
        }
        let parsed = parse(&encode(&tree)?)?;
        assert_eq!(parsed.children(Tree::ROOT).len(), 30);
        for i in 1..=30 {
            let id = parsed.child(Tree::ROOT, &format!("dataset{i}")).unwrap();
            assert_eq!(parsed.node(id).attr("index"), Some(&Value::Int(i)));
        }
        Ok(())
    }

    #[test]
    fn test_superblock_after_user_block() -> Result<()> {
        let mut tree = Tree::new();
        tree.node_mut(Tree::ROOT).attrs.push(("object".into(), Value::from("PVOL")));
        let mut shifted = vec![0u8; 512];
        shifted.extend_from_slice(&encode(&tree)?);
        assert_eq!(find_superblock(&shifted)?, 512);

        let parsed = parse(&shifted)?;
        assert_eq!(parsed.node(Tree::ROOT).attr("object"), Some(&Value::from("PVOL")));
        Ok(())
    }

    #[test]
    fn test_foreign_bytes_rejected() {
        assert!(matches!(parse(b"\x89PNG\r\n\x1a\n0000000000"), Err(Error::InvalidMagic)));
        assert!(matches!(parse(&[]), Err(Error::InvalidMagic)));

        let mut bad = SIGNATURE.to_vec();
        bad.push(7);
        assert!(matches!(parse(&bad), Err(Error::UnsupportedVersion(7))));
    }

    #[test]
    fn test_truncated_rejected() -> Result<()> {
        let mut tree = Tree::new();
        let what = tree.add_child(Tree::ROOT, "what", NodeData::group());
        tree.node_mut(what).attrs.push(("date".into(), Value::from("20240101")));
        let bytes = encode(&tree)?;
        let result = parse(&bytes[..bytes.len() - 40]);
        assert!(matches!(result, Err(Error::InvalidStructure(_))));
        Ok(())
    }

    /// Version 2 superblock, version 2 object headers and link messages,
    /// as newer libraries write with the latest format bounds.
    struct LatestFormat {
        bytes: Vec<u8>,
    }

    impl LatestFormat {
        fn new() -> Self {
            let mut bytes = SIGNATURE.to_vec();
            bytes.extend_from_slice(&[2, 8, 8, 0]);
            bytes.extend_from_slice(&0u64.to_le_bytes()); // base
            bytes.extend_from_slice(&UNDEF_ADDR.to_le_bytes()); // extension
            bytes.extend_from_slice(&0u64.to_le_bytes()); // end of file
            bytes.extend_from_slice(&0u64.to_le_bytes()); // root, patched later
            bytes.extend_from_slice(&[0; 4]); // checksum
            Self { bytes }
        }

        /// Append an OHDR with the given (type, body) messages.
        fn object(&mut self, messages: &[(u8, Vec<u8>)]) -> u64 {
            let addr = self.bytes.len() as u64;
            let body: usize = messages.iter().map(|(_, m)| 4 + m.len()).sum();
            self.bytes.extend_from_slice(SIG_OHDR);
            self.bytes.extend_from_slice(&[2, 0x02]); // version, 4-byte chunk size
            self.bytes.extend_from_slice(&(body as u32).to_le_bytes());
            for (kind, m) in messages {
                self.bytes.push(*kind);
                self.bytes.extend_from_slice(&(m.len() as u16).to_le_bytes());
                self.bytes.push(0);
                self.bytes.extend_from_slice(m);
            }
            self.bytes.extend_from_slice(&[0; 4]); // checksum
            addr
        }

        fn finish(mut self, root: u64) -> Vec<u8> {
            self.bytes[36..44].copy_from_slice(&root.to_le_bytes());
            self.bytes
        }
    }

    fn link(name: &str, addr: u64) -> (u8, Vec<u8>) {
        let mut m = vec![1u8, 0, name.len() as u8];
        m.extend_from_slice(name.as_bytes());
        m.extend_from_slice(&addr.to_le_bytes());
        (msg::LINK as u8, m)
    }

    fn dataspace_v2(dims: &[u64]) -> (u8, Vec<u8>) {
        let mut m = vec![2u8, dims.len() as u8, 0, 1];
        for d in dims {
            m.extend_from_slice(&d.to_le_bytes());
        }
        (msg::DATASPACE as u8, m)
    }

    fn float32_type() -> (u8, Vec<u8>) {
        let mut m = vec![0x11, 0x20, 31, 0];
        m.extend_from_slice(&4u32.to_le_bytes());
        m.extend_from_slice(&[0, 0, 32, 0, 23, 8, 0, 23]);
        m.extend_from_slice(&127u32.to_le_bytes());
        (msg::DATATYPE as u8, m)
    }

    fn contiguous(addr: u64, size: u64) -> (u8, Vec<u8>) {
        let mut m = vec![3u8, LAYOUT_CONTIGUOUS];
        m.extend_from_slice(&addr.to_le_bytes());
        m.extend_from_slice(&size.to_le_bytes());
        (msg::LAYOUT as u8, m)
    }

    fn big_endian_attr(name: &str, value: i32) -> (u8, Vec<u8>) {
        let mut m = vec![3u8, 0];
        m.extend_from_slice(&((name.len() + 1) as u16).to_le_bytes());
        m.extend_from_slice(&8u16.to_le_bytes());
        m.extend_from_slice(&4u16.to_le_bytes());
        m.push(0); // ASCII
        m.extend_from_slice(name.as_bytes());
        m.push(0);
        m.extend_from_slice(&[0x10, 0x09, 0, 0, 4, 0, 0, 0]); // signed big-endian i32
        m.extend_from_slice(&[2, 0, 0, 0]); // scalar
        m.extend_from_slice(&value.to_be_bytes());
        (msg::ATTRIBUTE as u8, m)
    }

    #[test]
    fn test_latest_format_objects() -> Result<()> {
        let mut file = LatestFormat::new();
        let values = [1.5f32, -2.0, 0.25];
        let data_addr = file.bytes.len() as u64;
        for v in values {
            file.bytes.extend_from_slice(&v.to_le_bytes());
        }
        let ds = file.object(&[dataspace_v2(&[3]), float32_type(), contiguous(data_addr, 12)]);
        let group = file.object(&[big_endian_attr("nbins", -480), link("data", ds)]);
        let root = file.object(&[link("dataset1", group)]);
        let tree = parse(&file.finish(root))?;

        let group = tree.child(Tree::ROOT, "dataset1").unwrap();
        assert_eq!(tree.node(group).attr("nbins"), Some(&Value::Int(-480)));
        let data = tree.child(group, "data").unwrap();
        let (layout, buf) = dataset(&tree, data);
        assert_eq!(layout.dims, Dimensions::d1(3));
        assert_eq!(layout.chunk, None);
        assert_eq!(*buf, ArrayBuf::Float32(values.to_vec()));
        Ok(())
    }

    #[test]
    fn test_corrupt_extent_rejected() {
        // 2^33 x 2^33 elements overflow any byte count
        let mut file = LatestFormat::new();
        let ds = file.object(&[dataspace_v2(&[1 << 33, 1 << 33]), float32_type(), contiguous(UNDEF_ADDR, 0)]);
        let root = file.object(&[link("data", ds)]);
        let result = parse(&file.finish(root));
        assert!(matches!(result, Err(Error::InvalidStructure(_))), "{result:?}");

        // fits in usize but not in what the file could hold
        let mut file = LatestFormat::new();
        let ds = file.object(&[dataspace_v2(&[1 << 20, 1 << 20]), float32_type(), contiguous(UNDEF_ADDR, 0)]);
        let root = file.object(&[link("data", ds)]);
        let result = parse(&file.finish(root));
        assert!(matches!(result, Err(Error::InvalidStructure(_))), "{result:?}");
    }

    #[test]
    fn test_dense_links_unsupported() {
        let mut file = LatestFormat::new();
        let mut info = vec![0u8, 0];
        info.extend_from_slice(&4096u64.to_le_bytes()); // fractal heap
        info.extend_from_slice(&UNDEF_ADDR.to_le_bytes());
        let root = file.object(&[(msg::LINK_INFO as u8, info)]);
        assert!(matches!(parse(&file.finish(root)), Err(Error::Unsupported(_))));
    }

    #[test]
    fn test_cyclic_group_rejected() {
        let mut file = LatestFormat::new();
        // the root links to itself
        let root_addr = file.bytes.len() as u64;
        let root = file.object(&[link("loop", root_addr)]);
        assert_eq!(root, root_addr);
        assert!(matches!(parse(&file.finish(root)), Err(Error::InvalidStructure(_))));
    }

    #[test]
    fn test_element_decoders() {
        let be = element_decoder(&Datatype::Integer { size: 2, signed: false, big_endian: true }).unwrap();
        assert_eq!(be(&[0x01, 0x02]), ArrayBuf::Uint16(vec![0x0102]));
        let narrow = element_decoder(&Datatype::Integer { size: 1, signed: true, big_endian: false }).unwrap();
        assert_eq!(narrow(&[0xff]), ArrayBuf::Int32(vec![-1]));
        assert!(element_decoder(&Datatype::Integer { size: 8, signed: true, big_endian: false }).is_none());
        assert!(element_decoder(&Datatype::FixedString { size: 4, space_padded: false }).is_none());
    }
}
