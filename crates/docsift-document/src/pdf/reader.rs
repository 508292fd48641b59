// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF document handle: opens a file with `lopdf` and answers the page-level
// queries the extraction phases make (geometry, text, images, ruling lines).

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use tracing::{debug, info, instrument, warn};

use docsift_core::error::{DocsiftError, Result};
use docsift_core::traits::{DocumentHandle, DocumentSource};
use docsift_core::types::{
    ImageBox, ImageEncoding, ImageRef, PageGeometry, PageImage, PixelLayout, RawImage,
    RulingLine, TextBlock,
};

use super::content::{PageFrame, PageScan, number, scan_operations};

/// Guards against cyclic `Parent` chains and reference loops.
const MAX_TREE_DEPTH: usize = 32;

/// An opened PDF.
///
/// Page content is interpreted on demand; nothing beyond the parsed object
/// graph is cached, so each query walks the page's content stream again.
pub struct PdfDocument {
    document: Document,
    /// Page object ids in page order.
    pages: Vec<ObjectId>,
    /// Source path, if opened from a file (useful for diagnostics).
    source_path: Option<String>,
    closed: AtomicBool,
}

/// An image XObject registered in a page's resources.
struct XObjectImage<'a> {
    name: Vec<u8>,
    id: ObjectId,
    stream: &'a Stream,
}

impl PdfDocument {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        let document = Document::load(path_ref).map_err(|err| DocsiftError::DocumentOpen {
            path: path_ref.display().to_string(),
            reason: err.to_string(),
        })?;

        let handle = Self::from_document(document, Some(path_ref.display().to_string()));
        debug!(pages = handle.pages.len(), "PDF loaded");
        Ok(handle)
    }

    /// Parse a PDF already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data).map_err(|err| {
            DocsiftError::Pdf(format!("failed to load PDF from memory: {}", err))
        })?;

        let handle = Self::from_document(document, None);
        debug!(pages = handle.pages.len(), "PDF loaded from bytes");
        Ok(handle)
    }

    fn from_document(document: Document, source_path: Option<String>) -> Self {
        // `get_pages` is keyed by 1-based page number, so values come out in order.
        let pages = document.get_pages().into_values().collect();
        Self {
            document,
            pages,
            source_path,
            closed: AtomicBool::new(false),
        }
    }

    /// Return the source path if the handle was created via [`PdfDocument::open`].
    pub fn source_path(&self) -> Option<&str> {
        self.source_path.as_deref()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    // -- Object graph helpers -------------------------------------------------

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        page.checked_sub(1)
            .and_then(|index| self.pages.get(index as usize))
            .copied()
            .ok_or_else(|| {
                DocsiftError::Pdf(format!(
                    "page {} out of range (document has {} pages)",
                    page,
                    self.pages.len()
                ))
            })
    }

    /// Follow indirect references until a direct object is reached.
    fn resolve<'a>(&'a self, object: &'a Object) -> Option<&'a Object> {
        let mut current = object;
        for _ in 0..MAX_TREE_DEPTH {
            match current {
                Object::Reference(id) => current = self.document.get_object(*id).ok()?,
                direct => return Some(direct),
            }
        }
        None
    }

    /// Look `key` up on the page, then on its ancestors in the page tree.
    fn inherited(&self, page_id: ObjectId, key: &[u8]) -> Option<&Object> {
        let mut node = self.document.get_dictionary(page_id).ok()?;
        for _ in 0..MAX_TREE_DEPTH {
            if let Ok(value) = node.get(key) {
                return self.resolve(value);
            }
            let parent = match node.get(b"Parent") {
                Ok(Object::Reference(id)) => *id,
                _ => return None,
            };
            node = self.document.get_dictionary(parent).ok()?;
        }
        None
    }

    /// Lower-left corner and size of the page's media box.
    fn media_box(&self, page_id: ObjectId) -> ((f32, f32), PageGeometry) {
        let corners = match self.inherited(page_id, b"MediaBox") {
            Some(Object::Array(items)) if items.len() == 4 => items
                .iter()
                .map(|item| self.resolve(item).and_then(number))
                .collect::<Option<Vec<f32>>>(),
            _ => None,
        };

        match corners {
            Some(c) if (c[2] - c[0]).abs() > 0.0 && (c[3] - c[1]).abs() > 0.0 => (
                (c[0].min(c[2]), c[1].min(c[3])),
                PageGeometry {
                    width: (c[2] - c[0]).abs(),
                    height: (c[3] - c[1]).abs(),
                },
            ),
            _ => ((0.0, 0.0), PageGeometry::US_LETTER),
        }
    }

    /// Image XObjects in the page's resource dictionary, in declaration order.
    fn xobject_images(&self, page_id: ObjectId) -> Vec<XObjectImage<'_>> {
        let xobjects = self
            .inherited(page_id, b"Resources")
            .and_then(|resources| resources.as_dict().ok())
            .and_then(|resources| resources.get(b"XObject").ok())
            .and_then(|xobjects| self.resolve(xobjects))
            .and_then(|xobjects| xobjects.as_dict().ok());

        let Some(xobjects) = xobjects else {
            return Vec::new();
        };

        xobjects
            .iter()
            .filter_map(|(name, value)| {
                let Object::Reference(id) = value else {
                    debug!(name = %String::from_utf8_lossy(name), "Skipping direct XObject");
                    return None;
                };
                let stream = self.document.get_object(*id).ok()?.as_stream().ok()?;
                is_image_stream(stream).then(|| XObjectImage {
                    name: name.clone(),
                    id: *id,
                    stream,
                })
            })
            .collect()
    }

    fn scan_page(&self, page: u32) -> Result<PageScan> {
        let page_id = self.page_id(page)?;
        let (origin, geometry) = self.media_box(page_id);

        let data = self.document.get_page_content(page_id).map_err(|err| {
            DocsiftError::Pdf(format!("cannot read content of page {}: {}", page, err))
        })?;
        let content = Content::decode(&data).map_err(|err| {
            DocsiftError::Pdf(format!("cannot parse content of page {}: {}", page, err))
        })?;

        let image_names: HashSet<Vec<u8>> = self
            .xobject_images(page_id)
            .into_iter()
            .map(|image| image.name)
            .collect();

        Ok(scan_operations(
            &content.operations,
            PageFrame::new(origin, geometry),
            |name| image_names.contains(name),
        ))
    }

    fn stream_filters(&self, dict: &Dictionary) -> Vec<Vec<u8>> {
        match dict.get(b"Filter").ok().and_then(|f| self.resolve(f)) {
            Some(Object::Name(name)) => vec![name.clone()],
            Some(Object::Array(items)) => items
                .iter()
                .filter_map(|item| match self.resolve(item) {
                    Some(Object::Name(name)) => Some(name.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    fn pixel_layout(&self, dict: &Dictionary) -> PixelLayout {
        let space = dict.get(b"ColorSpace").ok().and_then(|s| self.resolve(s));
        match space {
            Some(Object::Name(name)) => layout_for_name(name),
            Some(Object::Array(items)) => match items.first() {
                Some(Object::Name(family)) if family.as_slice() == b"ICCBased" => {
                    let components = items
                        .get(1)
                        .and_then(|profile| self.resolve(profile))
                        .and_then(|profile| profile.as_stream().ok())
                        .and_then(|profile| profile.dict.get(b"N").ok())
                        .and_then(|n| n.as_i64().ok());
                    match components {
                        Some(1) => PixelLayout::Gray,
                        Some(3) => PixelLayout::Rgb,
                        Some(4) => PixelLayout::Cmyk,
                        _ => PixelLayout::Other("ICCBased".to_string()),
                    }
                }
                Some(Object::Name(family)) => layout_for_name(family),
                _ => PixelLayout::Other("unknown".to_string()),
            },
            _ => PixelLayout::Other("none".to_string()),
        }
    }

    fn image_dimension(&self, dict: &Dictionary, key: &[u8]) -> u32 {
        dict.get(key)
            .ok()
            .and_then(|value| self.resolve(value))
            .and_then(|value| value.as_i64().ok())
            .and_then(|value| u32::try_from(value).ok())
            .unwrap_or(0)
    }
}

impl DocumentHandle for PdfDocument {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_geometry(&self, page: u32) -> Result<PageGeometry> {
        let page_id = self.page_id(page)?;
        Ok(self.media_box(page_id).1)
    }

    fn text_blocks(&self, page: u32) -> Result<Vec<TextBlock>> {
        Ok(self.scan_page(page)?.blocks)
    }

    fn page_images(&self, page: u32) -> Result<Vec<PageImage>> {
        let page_id = self.page_id(page)?;
        Ok(self
            .xobject_images(page_id)
            .into_iter()
            .enumerate()
            .map(|(i, image)| PageImage {
                page,
                index: i as u32 + 1,
                width: self.image_dimension(&image.stream.dict, b"Width"),
                height: self.image_dimension(&image.stream.dict, b"Height"),
                reference: pack_ref(image.id),
            })
            .collect())
    }

    fn image_boxes(&self, page: u32) -> Result<Vec<ImageBox>> {
        Ok(self.scan_page(page)?.image_boxes)
    }

    fn ruling_lines(&self, page: u32) -> Result<Vec<RulingLine>> {
        Ok(self.scan_page(page)?.lines)
    }

    fn raw_image(&self, image: &PageImage) -> Result<RawImage> {
        let id = unpack_ref(image.reference);
        let stream = self
            .document
            .get_object(id)
            .and_then(Object::as_stream)
            .map_err(|err| {
                DocsiftError::Image(format!("image object {:?} unavailable: {}", id, err))
            })?;
        if !is_image_stream(stream) {
            return Err(DocsiftError::Image(format!(
                "object {:?} is not an image",
                id
            )));
        }

        let filters = self.stream_filters(&stream.dict);
        let last = filters.last().map(Vec::as_slice);
        let encoding = match last {
            Some(b"DCTDecode") | Some(b"JPXDecode") if filters.len() > 1 => {
                return Err(DocsiftError::Image(format!(
                    "chained filters {:?} are not supported",
                    filters
                        .iter()
                        .map(|f| String::from_utf8_lossy(f).into_owned())
                        .collect::<Vec<_>>()
                )));
            }
            Some(b"DCTDecode") => ImageEncoding::Jpeg,
            Some(b"JPXDecode") => ImageEncoding::Jpeg2000,
            _ => {
                let mask = matches!(stream.dict.get(b"ImageMask"), Ok(Object::Boolean(true)));
                let bits = stream
                    .dict
                    .get(b"BitsPerComponent")
                    .ok()
                    .and_then(|b| b.as_i64().ok())
                    .and_then(|b| u8::try_from(b).ok())
                    .unwrap_or(if mask { 1 } else { 8 });
                ImageEncoding::Raw {
                    layout: if mask {
                        PixelLayout::Gray
                    } else {
                        self.pixel_layout(&stream.dict)
                    },
                    bits_per_component: bits,
                }
            }
        };

        let data = match (&encoding, filters.is_empty()) {
            (ImageEncoding::Raw { .. }, false) => stream.decompressed_content().map_err(|err| {
                DocsiftError::Image(format!("cannot decompress image {:?}: {}", id, err))
            })?,
            _ => stream.content.clone(),
        };

        Ok(RawImage {
            width: image.width,
            height: image.height,
            encoding,
            data,
        })
    }

    fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            warn!(path = ?self.source_path, "Document closed twice");
        } else {
            debug!(path = ?self.source_path, "Document closed");
        }
    }
}

/// Opens documents as [`PdfDocument`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfSource;

impl DocumentSource for PdfSource {
    fn open(&self, path: &Path) -> Result<Arc<dyn DocumentHandle>> {
        let document = PdfDocument::open(path)?;
        info!(path = %path.display(), pages = document.page_count(), "Document opened");
        Ok(Arc::new(document))
    }
}

fn is_image_stream(stream: &Stream) -> bool {
    matches!(stream.dict.get(b"Subtype"), Ok(Object::Name(name)) if name.as_slice() == b"Image")
}

fn layout_for_name(name: &[u8]) -> PixelLayout {
    match name {
        b"DeviceGray" | b"CalGray" | b"G" => PixelLayout::Gray,
        b"DeviceRGB" | b"CalRGB" | b"RGB" => PixelLayout::Rgb,
        b"DeviceCMYK" | b"CMYK" => PixelLayout::Cmyk,
        other => PixelLayout::Other(String::from_utf8_lossy(other).into_owned()),
    }
}

fn pack_ref(id: ObjectId) -> ImageRef {
    ImageRef((u64::from(id.0) << 16) | u64::from(id.1))
}

fn unpack_ref(reference: ImageRef) -> ObjectId {
    ((reference.0 >> 16) as u32, (reference.0 & 0xFFFF) as u16)
}
