//! PDF document model.
//!
//! A [`Document`] owns the file bytes and the object index built from the
//! xref chain. Indirect objects are parsed on first access and cached;
//! decoded stream payloads are memoized separately, keyed by object id.
//! Both caches sit behind `RefCell`: the model is single-threaded, and a
//! `&Document` is all that page iteration and stream decoding need.

use crate::error::{Error, Result};
use crate::object::{Object, ObjectRef};
use crate::parser::parse_indirect_object;
use crate::xref::{XrefEntry, XrefTable, find_startxref, parse_xref_chain};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// The PDF header must start within this many leading bytes.
const HEADER_SCAN_LIMIT: usize = 1024;

/// Page-tree depth cap against degenerate or hostile trees.
const MAX_TREE_DEPTH: usize = 50;

/// Attributes a page inherits from ancestor Pages nodes.
const INHERITABLE_ATTRS: [&str; 4] = ["Resources", "MediaBox", "CropBox", "Rotate"];

/// Parse a PDF document from raw bytes.
///
/// Convenience wrapper around [`Document::parse`].
pub fn parse_document(bytes: impl Into<Vec<u8>>) -> Result<Document> {
    Document::parse(bytes)
}

/// An open PDF document.
pub struct Document {
    data: Vec<u8>,
    version: (u8, u8),
    xref: XrefTable,
    trailer: HashMap<String, Object>,
    /// Parsed indirect objects
    object_cache: RefCell<HashMap<ObjectRef, Object>>,
    /// Decoded stream payloads
    stream_cache: RefCell<HashMap<ObjectRef, bytes::Bytes>>,
    /// Objects currently being loaded (reference-cycle detection)
    resolving: RefCell<HashSet<ObjectRef>>,
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("version", &self.version)
            .field("xref_entries", &self.xref.len())
            .field("cached_objects", &self.object_cache.borrow().len())
            .finish_non_exhaustive()
    }
}

impl Document {
    /// Parse a document from its raw bytes.
    ///
    /// Validates the `%PDF-` header, locates the final `startxref`, walks
    /// the xref chain (classic tables and xref streams, `/Prev` links
    /// included) and checks the trailer for `/Root`.
    pub fn parse(bytes: impl Into<Vec<u8>>) -> Result<Self> {
        let data = bytes.into();

        let version = parse_header(&data)?;
        let xref_offset = find_startxref(&data)?;
        let xref = parse_xref_chain(&data, xref_offset)?;

        let trailer = xref
            .trailer()
            .cloned()
            .ok_or_else(|| Error::InvalidXref("no trailer dictionary found".to_string()))?;

        if !trailer.contains_key("Root") {
            return Err(Error::MissingRoot);
        }

        Ok(Self {
            data,
            version,
            xref,
            trailer,
            object_cache: RefCell::new(HashMap::new()),
            stream_cache: RefCell::new(HashMap::new()),
            resolving: RefCell::new(HashSet::new()),
        })
    }

    /// Open and parse a document from a file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(std::fs::read(path)?)
    }

    /// The PDF version from the header, as (major, minor).
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// The trailer dictionary (for xref-stream files, the stream dict).
    pub fn trailer(&self) -> &HashMap<String, Object> {
        &self.trailer
    }

    /// Get an indirect object at generation 0.
    pub fn get_object(&self, id: u32) -> Option<Object> {
        self.get_object_with_gen(id, 0)
    }

    /// Get an indirect object by number and generation.
    pub fn get_object_with_gen(&self, id: u32, gen: u16) -> Option<Object> {
        self.load_object(ObjectRef::new(id, gen)).ok()
    }

    /// Dereference `obj` once if it is a Reference.
    ///
    /// Idempotent on non-references. A reference that cannot be resolved
    /// degrades to Null, never to an error.
    pub fn resolve(&self, obj: &Object) -> Object {
        match obj {
            Object::Reference(r) => match self.load_object(*r) {
                Ok(resolved) => resolved,
                Err(e) => {
                    log::warn!("reference {} failed to resolve: {}", r, e);
                    Object::Null
                },
            },
            other => other.clone(),
        }
    }

    /// Load an indirect object through the xref index.
    ///
    /// Objects come from the file directly (uncompressed entries) or out
    /// of an object stream (compressed entries). Results are cached; a
    /// reference cycle during loading degrades to Null.
    pub fn load_object(&self, obj_ref: ObjectRef) -> Result<Object> {
        if let Some(cached) = self.object_cache.borrow().get(&obj_ref) {
            return Ok(cached.clone());
        }

        if !self.resolving.borrow_mut().insert(obj_ref) {
            log::warn!("reference cycle while loading {}", obj_ref);
            return Ok(Object::Null);
        }
        let result = self.load_object_uncached(obj_ref);
        self.resolving.borrow_mut().remove(&obj_ref);

        let obj = result?;
        self.object_cache
            .borrow_mut()
            .insert(obj_ref, obj.clone());
        Ok(obj)
    }

    fn load_object_uncached(&self, obj_ref: ObjectRef) -> Result<Object> {
        let entry = *self
            .xref
            .get(obj_ref.id)
            .ok_or(Error::ObjectNotFound(obj_ref.id, obj_ref.gen))?;

        match entry {
            XrefEntry::Free { .. } => Err(Error::ObjectNotFound(obj_ref.id, obj_ref.gen)),
            XrefEntry::Uncompressed { offset, gen } => {
                if gen != obj_ref.gen {
                    log::warn!(
                        "object {} generation mismatch: xref has {}, requested {}",
                        obj_ref.id,
                        gen,
                        obj_ref.gen
                    );
                }
                let resolver = |r: ObjectRef| self.lookup_stream_length(r);
                let (header_ref, obj, _) =
                    parse_indirect_object(&self.data, offset as usize, Some(&resolver))?;
                if header_ref.id != obj_ref.id {
                    log::warn!(
                        "object header at offset {} says {}, xref says {}",
                        offset,
                        header_ref,
                        obj_ref
                    );
                }
                Ok(obj)
            },
            XrefEntry::Compressed { container, index: _ } => {
                self.load_from_object_stream(obj_ref, container)
            },
        }
    }

    /// Load an object stored in an /ObjStm container, caching all of the
    /// stream's objects while it is open.
    fn load_from_object_stream(&self, obj_ref: ObjectRef, container: u32) -> Result<Object> {
        let container_ref = ObjectRef::new(container, 0);
        let container_obj = self.load_object(container_ref)?;

        let objects = crate::objstm::parse_object_stream(&container_obj)?;
        let wanted = objects
            .get(&obj_ref.id)
            .cloned()
            .ok_or(Error::ObjectNotFound(obj_ref.id, obj_ref.gen))?;

        let mut cache = self.object_cache.borrow_mut();
        for (num, obj) in objects {
            cache.entry(ObjectRef::new(num, 0)).or_insert(obj);
        }

        Ok(wanted)
    }

    /// Resolve an indirect /Length value while parsing a stream object.
    ///
    /// Length objects are plain integers, so a direct uncompressed read
    /// suffices; anything else reports as unresolvable and the stream
    /// parser falls back to its endstream scan.
    fn lookup_stream_length(&self, r: ObjectRef) -> Option<i64> {
        match self.xref.get(r.id)? {
            XrefEntry::Uncompressed { offset, .. } => {
                let (_, obj, _) = parse_indirect_object(&self.data, *offset as usize, None).ok()?;
                obj.as_integer()
            },
            _ => None,
        }
    }

    /// Decode a stream object's payload, memoized by object id.
    ///
    /// The first access runs the filter chain; later accesses return the
    /// same bytes. Failures are not cached, so a caller may retry.
    pub fn stream_data(&self, obj_ref: ObjectRef) -> Result<bytes::Bytes> {
        if let Some(cached) = self.stream_cache.borrow().get(&obj_ref) {
            return Ok(cached.clone());
        }

        let obj = self.load_object(obj_ref)?;
        let decoded = bytes::Bytes::from(obj.decode_stream_data()?);
        self.stream_cache
            .borrow_mut()
            .insert(obj_ref, decoded.clone());
        Ok(decoded)
    }

    /// The catalog dictionary (trailer /Root, resolved).
    pub fn catalog(&self) -> Result<Object> {
        let root = self.trailer.get("Root").ok_or(Error::MissingRoot)?;
        let catalog = self.resolve(root);
        if catalog.as_dict().is_none() {
            return Err(Error::MissingRoot);
        }
        Ok(catalog)
    }

    /// Number of pages.
    ///
    /// Uses the page-tree root's /Count when it is sane, falling back to
    /// a full traversal otherwise.
    pub fn page_count(&self) -> Result<usize> {
        let catalog = self.catalog()?;
        let pages_root = catalog
            .as_dict()
            .and_then(|d| d.get("Pages"))
            .map(|o| self.resolve(o));

        if let Some(root) = &pages_root {
            if let Some(count) = root
                .as_dict()
                .and_then(|d| d.get("Count"))
                .and_then(|o| o.as_integer())
            {
                if count >= 0 {
                    return Ok(count as usize);
                }
            }
        }

        log::warn!("page tree root has no usable /Count, counting by traversal");
        Ok(self.pages()?.len())
    }

    /// All pages, in depth-first /Kids order.
    ///
    /// Malformed nodes (missing /Kids, wrong /Type, unresolvable kids)
    /// are skipped with a warning rather than failing the walk.
    pub fn pages(&self) -> Result<Vec<Page<'_>>> {
        let catalog = self.catalog()?;
        let root = catalog
            .as_dict()
            .and_then(|d| d.get("Pages"))
            .ok_or_else(|| Error::ParseError {
                offset: 0,
                reason: "catalog has no /Pages entry".to_string(),
            })?
            .clone();

        let mut leaves = Vec::new();
        let mut visited = HashSet::new();
        self.collect_pages(&root, &HashMap::new(), &mut visited, &mut leaves, 0);

        Ok(leaves
            .into_iter()
            .enumerate()
            .map(|(i, dict)| Page {
                doc: self,
                number: i + 1,
                dict,
            })
            .collect())
    }

    /// Get a page by 1-based index.
    pub fn get_page(&self, number: usize) -> Option<Page<'_>> {
        if number == 0 {
            return None;
        }
        self.pages().ok()?.into_iter().nth(number - 1)
    }

    /// Extract the text shown by a page's content streams.
    pub fn extract_text(&self, page_number: usize) -> Result<String> {
        let page = self
            .get_page(page_number)
            .ok_or(Error::ObjectNotFound(page_number as u32, 0))?;
        page.extract_text()
    }

    /// Depth-first page-tree walk with attribute inheritance.
    fn collect_pages(
        &self,
        node: &Object,
        inherited: &HashMap<String, Object>,
        visited: &mut HashSet<ObjectRef>,
        leaves: &mut Vec<HashMap<String, Object>>,
        depth: usize,
    ) {
        if depth > MAX_TREE_DEPTH {
            log::warn!("page tree deeper than {} levels, pruning", MAX_TREE_DEPTH);
            return;
        }

        // guard against reference cycles in /Kids
        if let Some(r) = node.as_reference() {
            if !visited.insert(r) {
                log::warn!("page tree cycle at {}, skipping", r);
                return;
            }
        }

        let resolved = self.resolve(node);
        let dict = match resolved.as_dict() {
            Some(d) => d,
            None => {
                log::warn!("page tree node is not a dictionary, skipping");
                return;
            },
        };

        match dict.get("Type").and_then(|t| t.as_name()) {
            Some("Pages") => {
                // fold this node's inheritable attributes over the ones
                // from further up; nearer nodes win
                let mut passed = inherited.clone();
                for attr in INHERITABLE_ATTRS {
                    if let Some(value) = dict.get(attr) {
                        passed.insert(attr.to_string(), value.clone());
                    }
                }

                let kids = match dict.get("Kids").and_then(|k| k.as_array()) {
                    Some(kids) => kids.clone(),
                    None => {
                        log::warn!("Pages node has no /Kids array, skipping");
                        return;
                    },
                };
                for kid in &kids {
                    self.collect_pages(kid, &passed, visited, leaves, depth + 1);
                }
            },
            Some("Page") => {
                let mut page_dict = dict.clone();
                for attr in INHERITABLE_ATTRS {
                    if !page_dict.contains_key(attr) {
                        if let Some(value) = inherited.get(attr) {
                            page_dict.insert(attr.to_string(), value.clone());
                        }
                    }
                }
                leaves.push(page_dict);
            },
            other => {
                log::warn!("page tree node with /Type {:?}, skipping", other);
            },
        }
    }
}

/// One page of a document.
pub struct Page<'a> {
    doc: &'a Document,
    /// 1-based page number
    number: usize,
    /// Page dictionary with inherited attributes merged in
    dict: HashMap<String, Object>,
}

impl<'a> Page<'a> {
    /// The 1-based page number.
    pub fn number(&self) -> usize {
        self.number
    }

    /// The page dictionary (inherited attributes included).
    pub fn dict(&self) -> &HashMap<String, Object> {
        &self.dict
    }

    /// The MediaBox rectangle as [llx, lly, urx, ury].
    pub fn media_box(&self) -> Option<[f64; 4]> {
        let arr = self.doc.resolve(self.dict.get("MediaBox")?);
        let arr = arr.as_array()?;
        if arr.len() != 4 {
            return None;
        }
        let mut rect = [0.0; 4];
        for (slot, obj) in rect.iter_mut().zip(arr.iter()) {
            *slot = self.doc.resolve(obj).as_number()?;
        }
        Some(rect)
    }

    /// Clockwise page rotation in degrees.
    pub fn rotate(&self) -> i64 {
        self.dict
            .get("Rotate")
            .map(|o| self.doc.resolve(o))
            .and_then(|o| o.as_integer())
            .unwrap_or(0)
    }

    /// The page's decoded content bytes.
    ///
    /// /Contents may be one stream, a reference to a stream or array, or
    /// an array of references; multiple streams concatenate with a
    /// single newline between them, so the result is identical however
    /// the entry is spelled.
    pub fn contents_stream_bytes(&self) -> Result<Vec<u8>> {
        let contents = match self.dict.get("Contents") {
            Some(c) => c.clone(),
            None => return Ok(Vec::new()),
        };

        let mut parts: Vec<Vec<u8>> = Vec::new();
        self.collect_content_parts(&contents, &mut parts)?;

        Ok(parts.join(&b'\n'))
    }

    fn collect_content_parts(&self, entry: &Object, parts: &mut Vec<Vec<u8>>) -> Result<()> {
        match entry {
            Object::Reference(r) => {
                match self.doc.resolve(entry) {
                    // an indirect array of streams: recurse into it
                    arr @ Object::Array(_) => self.collect_content_parts(&arr, parts),
                    Object::Stream { .. } => {
                        parts.push(self.doc.stream_data(*r)?.to_vec());
                        Ok(())
                    },
                    Object::Null => {
                        log::warn!("contents reference {} resolves to null, skipping", r);
                        Ok(())
                    },
                    other => {
                        log::warn!(
                            "contents reference {} resolves to {}, skipping",
                            r,
                            other.type_name()
                        );
                        Ok(())
                    },
                }
            },
            Object::Array(items) => {
                for item in items {
                    self.collect_content_parts(item, parts)?;
                }
                Ok(())
            },
            stream @ Object::Stream { .. } => {
                parts.push(stream.decode_stream_data()?);
                Ok(())
            },
            other => {
                log::warn!("unusable /Contents entry of type {}", other.type_name());
                Ok(())
            },
        }
    }

    /// Extract the text shown by this page.
    pub fn extract_text(&self) -> Result<String> {
        let content = self.contents_stream_bytes()?;
        crate::content::extract_text(&content)
    }
}

/// Locate and parse the `%PDF-M.m` header.
///
/// The marker must begin within the first 1024 bytes; anything before it
/// is ignored (some files carry a preamble).
fn parse_header(data: &[u8]) -> Result<(u8, u8)> {
    let scan = &data[..data.len().min(HEADER_SCAN_LIMIT)];
    let pos = scan
        .windows(5)
        .position(|w| w == b"%PDF-")
        .ok_or_else(|| {
            Error::InvalidHeader("no %PDF- marker in the first 1024 bytes".to_string())
        })?;

    let rest = &data[pos + 5..];
    if rest.len() < 3 || rest[1] != b'.' || !rest[0].is_ascii_digit() || !rest[2].is_ascii_digit() {
        return Err(Error::InvalidHeader("malformed version number".to_string()));
    }

    let major = rest[0] - b'0';
    let minor = rest[2] - b'0';
    if major == 0 || major > 2 {
        return Err(Error::InvalidHeader(format!(
            "unsupported version {}.{}",
            major, minor
        )));
    }

    Ok((major, minor))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::StringFormat;

    /// Build a classic-xref PDF from object bodies; object i+1 gets body
    /// `bodies[i]`. Offsets and the xref table are computed, not typed.
    fn build_pdf(bodies: &[String]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(b"%PDF-1.4\n");

        let mut offsets = Vec::new();
        for (i, body) in bodies.iter().enumerate() {
            offsets.push(data.len());
            data.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }

        let xref_offset = data.len();
        data.extend_from_slice(format!("xref\n0 {}\n", bodies.len() + 1).as_bytes());
        data.extend_from_slice(b"0000000000 65535 f \n");
        for off in &offsets {
            data.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
        }
        data.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                bodies.len() + 1,
                xref_offset
            )
            .as_bytes(),
        );
        data
    }

    fn single_page_pdf(content: &str) -> Vec<u8> {
        build_pdf(&[
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 4 0 R \
             /Resources << >> >>"
                .to_string(),
            format!("<< /Length {} >>\nstream\n{}\nendstream", content.len(), content),
        ])
    }

    #[test]
    fn test_parse_minimal_document() {
        let doc = Document::parse(single_page_pdf("BT (Hi) Tj ET")).unwrap();
        assert_eq!(doc.version(), (1, 4));
        assert_eq!(doc.page_count().unwrap(), 1);
    }

    #[test]
    fn test_hello_world_end_to_end() {
        let content = "BT /F1 12 Tf 100 700 Td (Hello World) Tj ET";
        assert_eq!(content.len(), 44);
        let doc = Document::parse(single_page_pdf(content)).unwrap();

        assert_eq!(doc.page_count().unwrap(), 1);
        let page = doc.get_page(1).unwrap();
        let bytes = page.contents_stream_bytes().unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("Hello World"));

        assert_eq!(page.extract_text().unwrap(), "Hello World");
        assert_eq!(page.media_box(), Some([0.0, 0.0, 612.0, 792.0]));
    }

    #[test]
    fn test_not_a_pdf() {
        assert!(matches!(
            Document::parse(b"GIF89a not a pdf".to_vec()),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_header_with_preamble() {
        let mut data = b"junk before the marker\n".to_vec();
        data.extend_from_slice(&single_page_pdf("BT (x) Tj ET"));
        // offsets in the xref are now shifted; header parsing alone must
        // still find the version
        assert_eq!(parse_header(&data).unwrap(), (1, 4));
    }

    #[test]
    fn test_missing_root_detected() {
        let mut bodies = vec!["<< /Type /Catalog >>".to_string()];
        let mut data = Vec::new();
        data.extend_from_slice(b"%PDF-1.4\n");
        let off = data.len();
        data.extend_from_slice(format!("1 0 obj\n{}\nendobj\n", bodies.remove(0)).as_bytes());
        let xref_offset = data.len();
        data.extend_from_slice(b"xref\n0 2\n0000000000 65535 f \n");
        data.extend_from_slice(format!("{:010} 00000 n \n", off).as_bytes());
        data.extend_from_slice(
            format!("trailer\n<< /Size 2 >>\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes(),
        );

        assert!(matches!(Document::parse(data), Err(Error::MissingRoot)));
    }

    #[test]
    fn test_get_object() {
        let doc = Document::parse(single_page_pdf("BT (x) Tj ET")).unwrap();
        let catalog = doc.get_object(1).unwrap();
        assert_eq!(
            catalog.as_dict().unwrap().get("Type").unwrap().as_name(),
            Some("Catalog")
        );
        assert!(doc.get_object(99).is_none());
    }

    #[test]
    fn test_resolve_is_idempotent_and_degrades_to_null() {
        let doc = Document::parse(single_page_pdf("BT (x) Tj ET")).unwrap();

        let reference = Object::Reference(ObjectRef::new(2, 0));
        let once = doc.resolve(&reference);
        let twice = doc.resolve(&once);
        assert_eq!(once, twice);

        // unresolvable reference becomes Null
        let dangling = Object::Reference(ObjectRef::new(98, 0));
        assert!(doc.resolve(&dangling).is_null());
    }

    #[test]
    fn test_stream_data_memoized() {
        let doc = Document::parse(single_page_pdf("BT (memo) Tj ET")).unwrap();
        let first = doc.stream_data(ObjectRef::new(4, 0)).unwrap();
        let second = doc.stream_data(ObjectRef::new(4, 0)).unwrap();
        assert_eq!(first, second);
        // decode(decode(s)) == decode(s): the cache returns identical bytes
        assert_eq!(doc.stream_cache.borrow().len(), 1);
    }

    #[test]
    fn test_contents_variants_yield_identical_bytes() {
        let content = "BT (same bytes) Tj ET";
        let len = content.len();

        // variant 1: /Contents is a direct reference to the stream
        let direct = Document::parse(single_page_pdf(content)).unwrap();

        // variant 2: /Contents is an array of one reference
        let array_one = build_pdf(&[
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents [4 0 R] >>"
                .to_string(),
            format!("<< /Length {} >>\nstream\n{}\nendstream", len, content),
        ]);
        let array_one = Document::parse(array_one).unwrap();

        // variant 3: /Contents is a reference to an array of references
        let indirect_array = build_pdf(&[
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents 5 0 R >>".to_string(),
            format!("<< /Length {} >>\nstream\n{}\nendstream", len, content),
            "[4 0 R]".to_string(),
        ]);
        let indirect_array = Document::parse(indirect_array).unwrap();

        let a = direct.get_page(1).unwrap().contents_stream_bytes().unwrap();
        let b = array_one.get_page(1).unwrap().contents_stream_bytes().unwrap();
        let c = indirect_array
            .get_page(1)
            .unwrap()
            .contents_stream_bytes()
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a, content.as_bytes());
    }

    #[test]
    fn test_two_content_streams_concatenate() {
        let s1 = "BT (A) Tj ET ";
        let s2 = "BT (B) Tj ET";
        let data = build_pdf(&[
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents [5 0 R 6 0 R] >>"
                .to_string(),
            "null".to_string(),
            format!("<< /Length {} >>\nstream\n{}\nendstream", s1.len(), s1),
            format!("<< /Length {} >>\nstream\n{}\nendstream", s2.len(), s2),
        ]);
        let doc = Document::parse(data).unwrap();
        let page = doc.get_page(1).unwrap();

        let combined = page.contents_stream_bytes().unwrap();
        let text = String::from_utf8_lossy(&combined);
        assert!(text.contains("(A)"));
        assert!(text.contains("(B)"));
        assert_eq!(combined, b"BT (A) Tj ET \nBT (B) Tj ET");

        let extracted = page.extract_text().unwrap();
        assert!(extracted.contains('A'));
        assert!(extracted.contains('B'));
    }

    #[test]
    fn test_nested_page_tree_order_and_inheritance() {
        let data = build_pdf(&[
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            // root with MediaBox that leaves inherit
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 3 /MediaBox [0 0 100 200] >>".to_string(),
            "<< /Type /Pages /Parent 2 0 R /Kids [5 0 R 6 0 R] /Count 2 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 300 400] >>".to_string(),
            "<< /Type /Page /Parent 3 0 R >>".to_string(),
            "<< /Type /Page /Parent 3 0 R >>".to_string(),
        ]);
        let doc = Document::parse(data).unwrap();

        let pages = doc.pages().unwrap();
        assert_eq!(pages.len(), 3);
        assert_eq!(doc.page_count().unwrap(), 3);

        // depth-first /Kids order: 5, 6 (under node 3), then leaf 4
        assert_eq!(pages[0].media_box(), Some([0.0, 0.0, 100.0, 200.0]));
        assert_eq!(pages[1].media_box(), Some([0.0, 0.0, 100.0, 200.0]));
        // leaf 4 has its own MediaBox which wins over the inherited one
        assert_eq!(pages[2].media_box(), Some([0.0, 0.0, 300.0, 400.0]));
        assert_eq!(pages[2].number(), 3);
    }

    #[test]
    fn test_page_tree_cycle_is_skipped() {
        let data = build_pdf(&[
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            // node 2 lists itself as a kid alongside a real page
            "<< /Type /Pages /Kids [2 0 R 3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 10 10] >>".to_string(),
        ]);
        let doc = Document::parse(data).unwrap();
        let pages = doc.pages().unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[test]
    fn test_page_tree_bad_node_skipped() {
        let data = build_pdf(&[
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 2 >>".to_string(),
            "<< /Type /Font /Subtype /Type1 >>".to_string(), // wrong type
            "<< /Type /Page /Parent 2 0 R >>".to_string(),
        ]);
        let doc = Document::parse(data).unwrap();
        let pages = doc.pages().unwrap();
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].number(), 1);
    }

    #[test]
    fn test_get_page_out_of_range() {
        let doc = Document::parse(single_page_pdf("BT (x) Tj ET")).unwrap();
        assert!(doc.get_page(0).is_none());
        assert!(doc.get_page(2).is_none());
        assert!(doc.get_page(1).is_some());
    }

    #[test]
    fn test_indirect_stream_length_resolved() {
        let content = "BT (indirect length) Tj ET";
        let data = build_pdf(&[
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /Contents 4 0 R >>".to_string(),
            format!("<< /Length 5 0 R >>\nstream\n{}\nendstream", content),
            format!("{}", content.len()),
        ]);
        let doc = Document::parse(data).unwrap();
        let bytes = doc.get_page(1).unwrap().contents_stream_bytes().unwrap();
        assert_eq!(bytes, content.as_bytes());
    }

    #[test]
    fn test_hex_string_object_roundtrip() {
        let data = build_pdf(&[
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [] /Count 0 >>".to_string(),
            "<48656C6C6F>".to_string(),
        ]);
        let doc = Document::parse(data).unwrap();
        let obj = doc.get_object(3).unwrap();
        assert_eq!(obj, Object::String(b"Hello".to_vec(), StringFormat::Hexadecimal));
        assert_eq!(obj.serialize(), b"<48656c6c6f>");
    }

    #[test]
    fn test_compressed_objects_via_xref_stream() {
        // layout: header, objstm (obj 4), content objects inside it
        // (objects 1..3: catalog, pages, page), xref stream (obj 5)
        let mut data = Vec::new();
        data.extend_from_slice(b"%PDF-1.5\n");

        // object stream payload holding the three document objects
        let inner = concat!(
            "<< /Type /Catalog /Pages 2 0 R >> ",
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >> ",
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 9 9] >>"
        );
        let off1 = 0;
        let off2 = "<< /Type /Catalog /Pages 2 0 R >> ".len();
        let off3 = off2 + "<< /Type /Pages /Kids [3 0 R] /Count 1 >> ".len();
        let pairs = format!("1 {} 2 {} 3 {} ", off1, off2, off3);
        let payload = format!("{}{}", pairs, inner);

        let objstm_offset = data.len();
        data.extend_from_slice(
            format!(
                "4 0 obj\n<< /Type /ObjStm /N 3 /First {} /Length {} >>\nstream\n{}\nendstream\nendobj\n",
                pairs.len(),
                payload.len(),
                payload
            )
            .as_bytes(),
        );

        // xref stream: W [1 2 1], entries for objects 0-5
        let xref_offset = data.len();
        let mut rows: Vec<u8> = Vec::new();
        rows.extend_from_slice(&[0, 0, 0, 255]); // 0: free
        for i in 1..=3u8 {
            rows.extend_from_slice(&[2, 0, 4, i - 1]); // 1-3: in objstm 4
        }
        let ob = objstm_offset as u16;
        rows.extend_from_slice(&[1, (ob >> 8) as u8, ob as u8, 0]); // 4
        let xb = xref_offset as u16;
        rows.extend_from_slice(&[1, (xb >> 8) as u8, xb as u8, 0]); // 5

        data.extend_from_slice(
            format!(
                "5 0 obj\n<< /Type /XRef /Size 6 /W [1 2 1] /Root 1 0 R /Length {} >>\nstream\n",
                rows.len()
            )
            .as_bytes(),
        );
        data.extend_from_slice(&rows);
        data.extend_from_slice(b"\nendstream\nendobj\n");
        data.extend_from_slice(format!("startxref\n{}\n%%EOF\n", xref_offset).as_bytes());

        let doc = Document::parse(data).unwrap();
        assert_eq!(doc.page_count().unwrap(), 1);
        let page = doc.get_page(1).unwrap();
        assert_eq!(page.media_box(), Some([0.0, 0.0, 9.0, 9.0]));
    }

    #[test]
    fn test_parse_header_variants() {
        assert_eq!(parse_header(b"%PDF-1.7\n").unwrap(), (1, 7));
        assert_eq!(parse_header(b"%PDF-2.0\n").unwrap(), (2, 0));
        assert!(parse_header(b"%PDF-9.9\n").is_err());
        assert!(parse_header(b"%PDF-x.y\n").is_err());
        assert!(parse_header(b"no marker").is_err());
    }
}
