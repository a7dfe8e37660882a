use image::{ImageBuffer, Rgba};
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub type RgbaImage = ImageBuffer<Rgba<u8>, Vec<u8>>;

const OVERLAY_FONT_KEY: &str = "FsHelv";

const PAGE_TREE_PARENT_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageMetrics {
    pub width_pt: f32,
    pub height_pt: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLayout {
    pub pixel_width: u32,
    pub pixel_height: u32,
    pub total_page_count: u32,
}

#[derive(Debug, Clone)]
pub struct RenderedPage {
    pub image: RgbaImage,
    pub layout: PageLayout,
}

/// Fill color, channels in 0.0..=1.0.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgb {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb { r: 0.0, g: 0.0, b: 0.0 };
    pub const WHITE: Rgb = Rgb { r: 1.0, g: 1.0, b: 1.0 };

    pub fn new(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<PathBuf> for OpenSource {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl From<Vec<u8>> for OpenSource {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported in the default backend")]
    EncryptedUnsupported,
    #[error("backend error: {0}")]
    Backend(String),
}

/// Mutable view over a loaded document. Pages are numbered from 1; draw
/// coordinates are document space (origin bottom-left, y up, points).
pub trait DocumentMutator {
    fn load(&mut self, source: OpenSource) -> Result<DocumentHandle, EngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, EngineError>;
    fn page_metrics(&self, handle: DocumentHandle, page: u32) -> Result<PageMetrics, EngineError>;
    #[allow(clippy::too_many_arguments)]
    fn draw_rect(
        &mut self,
        handle: DocumentHandle,
        page: u32,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    ) -> Result<(), EngineError>;
    #[allow(clippy::too_many_arguments)]
    fn draw_text(
        &mut self,
        handle: DocumentHandle,
        page: u32,
        x: f32,
        y: f32,
        text: &str,
        font_size: f32,
        color: Rgb,
    ) -> Result<(), EngineError>;
    fn save(&mut self, handle: DocumentHandle) -> Result<Vec<u8>, EngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), EngineError>;
}

/// Lays out a page for display. Pages render at a pixel width equal to
/// their native point width (scale 1.0), so one rendered pixel equals one
/// PDF point; screen-space coordinate math relies on that equivalence.
pub trait PageRenderer {
    fn render_page(&self, handle: DocumentHandle, page: u32) -> Result<RenderedPage, EngineError>;
}

struct DocumentRecord {
    doc: Document,
    page_ids: Vec<ObjectId>,
    page_metrics: Vec<PageMetrics>,
}

impl DocumentRecord {
    fn index(&self, page: u32) -> Result<usize, EngineError> {
        let page_count = self.page_ids.len() as u32;
        if page == 0 || page > page_count {
            return Err(EngineError::PageOutOfRange { page, page_count });
        }
        Ok(page as usize - 1)
    }

    fn page_id(&self, page: u32) -> Result<ObjectId, EngineError> {
        Ok(self.page_ids[self.index(page)?])
    }

    fn metrics_for(&self, page: u32) -> Result<PageMetrics, EngineError> {
        Ok(self.page_metrics[self.index(page)?])
    }
}

#[derive(Default)]
pub struct LopdfBackend {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl LopdfBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_document(bytes: &[u8]) -> Result<DocumentRecord, EngineError> {
        let doc = Document::load_mem(bytes)?;
        if doc.trailer.has(b"Encrypt") {
            return Err(EngineError::EncryptedUnsupported);
        }

        let pages = doc.get_pages();
        let mut page_ids = Vec::with_capacity(pages.len());
        let mut page_metrics = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            page_metrics.push(metrics_for_page(&doc, object_id));
            page_ids.push(object_id);
        }

        if page_ids.is_empty() {
            return Err(EngineError::Backend("document has no pages".to_owned()));
        }

        Ok(DocumentRecord { doc, page_ids, page_metrics })
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, EngineError> {
        self.docs.get(&handle).ok_or(EngineError::InvalidHandle(handle.raw()))
    }

    fn record_mut(&mut self, handle: DocumentHandle) -> Result<&mut DocumentRecord, EngineError> {
        self.docs.get_mut(&handle).ok_or(EngineError::InvalidHandle(handle.raw()))
    }
}

impl DocumentMutator for LopdfBackend {
    fn load(&mut self, source: OpenSource) -> Result<DocumentHandle, EngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let record = Self::parse_document(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        self.docs.insert(handle, record);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, EngineError> {
        Ok(self.record(handle)?.page_ids.len() as u32)
    }

    fn page_metrics(&self, handle: DocumentHandle, page: u32) -> Result<PageMetrics, EngineError> {
        self.record(handle)?.metrics_for(page)
    }

    fn draw_rect(
        &mut self,
        handle: DocumentHandle,
        page: u32,
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Rgb,
    ) -> Result<(), EngineError> {
        let record = self.record_mut(handle)?;
        let page_id = record.page_id(page)?;

        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("rg", vec![color.r.into(), color.g.into(), color.b.into()]),
            Operation::new("re", vec![x.into(), y.into(), width.into(), height.into()]),
            Operation::new("f", vec![]),
            Operation::new("Q", vec![]),
        ];

        append_operations(&mut record.doc, page_id, operations)
    }

    fn draw_text(
        &mut self,
        handle: DocumentHandle,
        page: u32,
        x: f32,
        y: f32,
        text: &str,
        font_size: f32,
        color: Rgb,
    ) -> Result<(), EngineError> {
        let record = self.record_mut(handle)?;
        let page_id = record.page_id(page)?;

        ensure_overlay_font(&mut record.doc, page_id)?;

        let operations = vec![
            Operation::new("q", vec![]),
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![OVERLAY_FONT_KEY.into(), font_size.into()]),
            Operation::new("rg", vec![color.r.into(), color.g.into(), color.b.into()]),
            Operation::new("Td", vec![x.into(), y.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
            Operation::new("Q", vec![]),
        ];

        append_operations(&mut record.doc, page_id, operations)
    }

    fn save(&mut self, handle: DocumentHandle) -> Result<Vec<u8>, EngineError> {
        let record = self.record_mut(handle)?;
        let mut bytes = Vec::new();
        record.doc.save_to(&mut bytes)?;
        Ok(bytes)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), EngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(EngineError::InvalidHandle(handle.raw()))
    }
}

impl PageRenderer for LopdfBackend {
    fn render_page(&self, handle: DocumentHandle, page: u32) -> Result<RenderedPage, EngineError> {
        let record = self.record(handle)?;
        let metrics = record.metrics_for(page)?;

        let width = metrics.width_pt.round().max(1.0) as u32;
        let height = metrics.height_pt.round().max(1.0) as u32;

        let mut image = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let border = Rgba([220, 220, 220, 255]);

        if width >= 4 && height >= 4 {
            for x in 0..width {
                image.put_pixel(x, 0, border);
                image.put_pixel(x, height - 1, border);
            }
            for y in 0..height {
                image.put_pixel(0, y, border);
                image.put_pixel(width - 1, y, border);
            }
        }

        Ok(RenderedPage {
            image,
            layout: PageLayout {
                pixel_width: width,
                pixel_height: height,
                total_page_count: record.page_ids.len() as u32,
            },
        })
    }
}

fn metrics_for_page(doc: &Document, page_id: ObjectId) -> PageMetrics {
    resolve_media_box(doc, page_id)
        .map(|[x0, y0, x1, y1]| PageMetrics {
            width_pt: (x1 - x0).abs(),
            height_pt: (y1 - y0).abs(),
        })
        .unwrap_or(PageMetrics { width_pt: 612.0, height_pt: 792.0 })
}

fn resolve_media_box(doc: &Document, page_id: ObjectId) -> Option<[f32; 4]> {
    let mut dict = doc.get_dictionary(page_id).ok()?;

    for _ in 0..PAGE_TREE_PARENT_LIMIT {
        if let Ok(entry) = dict.get(b"MediaBox") {
            let array = match entry {
                Object::Reference(id) => doc.get_object(*id).ok()?.as_array().ok()?,
                direct => direct.as_array().ok()?,
            };
            if array.len() != 4 {
                return None;
            }
            let x0 = array[0].as_float().ok()?;
            let y0 = array[1].as_float().ok()?;
            let x1 = array[2].as_float().ok()?;
            let y1 = array[3].as_float().ok()?;
            return Some([x0, y0, x1, y1]);
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => dict = doc.get_dictionary(*parent_id).ok()?,
            _ => return None,
        }
    }

    None
}

fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<Dictionary> {
    let mut dict = doc.get_dictionary(page_id).ok()?;

    for _ in 0..PAGE_TREE_PARENT_LIMIT {
        if let Ok(entry) = dict.get(b"Resources") {
            let resources = match entry {
                Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok()?,
                direct => direct.as_dict().ok()?,
            };
            return Some(resources.clone());
        }

        match dict.get(b"Parent") {
            Ok(Object::Reference(parent_id)) => dict = doc.get_dictionary(*parent_id).ok()?,
            _ => return None,
        }
    }

    None
}

fn append_operations(
    doc: &mut Document,
    page_id: ObjectId,
    operations: Vec<Operation>,
) -> Result<(), EngineError> {
    let encoded = Content { operations }.encode()?;
    let stream_id = doc.add_object(Stream::new(Dictionary::new(), encoded));

    let contents = match doc.get_object(page_id)? {
        Object::Dictionary(dict) => dict.get(b"Contents").ok().cloned(),
        _ => return Err(EngineError::Backend("page object is not a dictionary".to_owned())),
    };

    // A Contents reference may point at an array of stream references
    // rather than a stream; appending into that array keeps the shape legal.
    if let Some(Object::Reference(existing)) = &contents {
        if let Ok(Object::Array(items)) = doc.get_object_mut(*existing) {
            items.push(Object::Reference(stream_id));
            return Ok(());
        }
    }

    let page = doc.get_object_mut(page_id)?;
    let Object::Dictionary(dict) = page else {
        return Err(EngineError::Backend("page object is not a dictionary".to_owned()));
    };

    match contents {
        Some(Object::Reference(existing)) => {
            dict.set(
                "Contents",
                Object::Array(vec![Object::Reference(existing), Object::Reference(stream_id)]),
            );
        }
        Some(Object::Array(mut items)) => {
            items.push(Object::Reference(stream_id));
            dict.set("Contents", Object::Array(items));
        }
        _ => dict.set("Contents", Object::Reference(stream_id)),
    }

    Ok(())
}

enum ResourcesSlot {
    Missing,
    Inline(FontSlot),
    Referenced(ObjectId, FontSlot),
}

enum FontSlot {
    Missing,
    Inline,
    Referenced(ObjectId),
}

fn font_slot(resources: &Dictionary) -> FontSlot {
    match resources.get(b"Font") {
        Ok(Object::Dictionary(_)) => FontSlot::Inline,
        Ok(Object::Reference(id)) => FontSlot::Referenced(*id),
        _ => FontSlot::Missing,
    }
}

fn overlay_font_registered(doc: &Document, resources: &Dictionary) -> bool {
    match resources.get(b"Font") {
        Ok(Object::Dictionary(fonts)) => fonts.has(OVERLAY_FONT_KEY.as_bytes()),
        Ok(Object::Reference(id)) => doc
            .get_dictionary(*id)
            .map(|fonts| fonts.has(OVERLAY_FONT_KEY.as_bytes()))
            .unwrap_or(false),
        _ => false,
    }
}

fn ensure_overlay_font(doc: &mut Document, page_id: ObjectId) -> Result<(), EngineError> {
    let slot = {
        let page = doc.get_dictionary(page_id)?;
        match page.get(b"Resources") {
            Ok(Object::Dictionary(resources)) => {
                if overlay_font_registered(doc, resources) {
                    return Ok(());
                }
                ResourcesSlot::Inline(font_slot(resources))
            }
            Ok(Object::Reference(resources_id)) => {
                let resources = doc.get_dictionary(*resources_id)?;
                if overlay_font_registered(doc, resources) {
                    return Ok(());
                }
                ResourcesSlot::Referenced(*resources_id, font_slot(resources))
            }
            _ => ResourcesSlot::Missing,
        }
    };

    let font_id = doc.add_object(Dictionary::from_iter([
        ("Type", Object::Name(b"Font".to_vec())),
        ("Subtype", Object::Name(b"Type1".to_vec())),
        ("BaseFont", Object::Name(b"Helvetica".to_vec())),
    ]));
    let font_entry = Object::Reference(font_id);
    let new_fonts =
        || Object::Dictionary(Dictionary::from_iter([(OVERLAY_FONT_KEY, Object::Reference(font_id))]));

    match slot {
        ResourcesSlot::Missing => {
            // Page-level Resources replaces the inherited dictionary, so the
            // inherited entries are carried into the new one.
            let mut resources = inherited_resources(doc, page_id).unwrap_or_default();
            let mut fonts = match resources.get(b"Font") {
                Ok(Object::Dictionary(existing)) => existing.clone(),
                Ok(Object::Reference(id)) => {
                    doc.get_dictionary(*id).ok().cloned().unwrap_or_default()
                }
                _ => Dictionary::new(),
            };
            fonts.set(OVERLAY_FONT_KEY, font_entry);
            resources.set("Font", Object::Dictionary(fonts));

            if let Object::Dictionary(page) = doc.get_object_mut(page_id)? {
                page.set("Resources", Object::Dictionary(resources));
            }
        }
        ResourcesSlot::Inline(FontSlot::Missing) => {
            if let Object::Dictionary(page) = doc.get_object_mut(page_id)? {
                if let Ok(Object::Dictionary(resources)) = page.get_mut(b"Resources") {
                    resources.set("Font", new_fonts());
                }
            }
        }
        ResourcesSlot::Inline(FontSlot::Inline) => {
            if let Object::Dictionary(page) = doc.get_object_mut(page_id)? {
                if let Ok(Object::Dictionary(resources)) = page.get_mut(b"Resources") {
                    if let Ok(Object::Dictionary(fonts)) = resources.get_mut(b"Font") {
                        fonts.set(OVERLAY_FONT_KEY, font_entry);
                    }
                }
            }
        }
        ResourcesSlot::Referenced(resources_id, FontSlot::Missing) => {
            if let Object::Dictionary(resources) = doc.get_object_mut(resources_id)? {
                resources.set("Font", new_fonts());
            }
        }
        ResourcesSlot::Referenced(resources_id, FontSlot::Inline) => {
            if let Object::Dictionary(resources) = doc.get_object_mut(resources_id)? {
                if let Ok(Object::Dictionary(fonts)) = resources.get_mut(b"Font") {
                    fonts.set(OVERLAY_FONT_KEY, font_entry);
                }
            }
        }
        ResourcesSlot::Inline(FontSlot::Referenced(fonts_id))
        | ResourcesSlot::Referenced(_, FontSlot::Referenced(fonts_id)) => {
            if let Object::Dictionary(fonts) = doc.get_object_mut(fonts_id)? {
                fonts.set(OVERLAY_FONT_KEY, font_entry);
            }
        }
    }

    Ok(())
}

pub fn default_backend() -> LopdfBackend {
    LopdfBackend::new()
}
