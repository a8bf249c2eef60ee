use crate::config::Settings;
use crate::error::{AppError, StageError};
use ab_glyph::{Font, FontArc};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Well-known locations of a Latin label font.
const SYSTEM_LABEL_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Well-known locations of fonts carrying Arabic glyphs.
const SYSTEM_UNICODE_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/noto/NotoSansArabic-Regular.ttf",
    "/usr/share/fonts/noto/NotoSansArabic-Regular.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// DejaVu Sans, shipped with the crate so labels and Arabic text never depend
/// on what the host has installed. Covers Latin and Arabic.
const BUNDLED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
const BUNDLED_FONT_NAME: &str = "bundled/DejaVuSans.ttf";

/// Sample character for right-to-left support (ARABIC LETTER TEH).
const ARABIC_SAMPLE: char = '\u{062A}';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CapabilityKind {
    Graphics,
    Document,
}

impl fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CapabilityKind::Graphics => f.write_str("graphics"),
            CapabilityKind::Document => f.write_str("document"),
        }
    }
}

/// Outcome of probing one optional capability.
#[derive(Debug, Clone)]
pub enum Capability<T> {
    Available(T),
    Unavailable { reason: String },
}

impl<T> Capability<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Capability::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }

    /// Borrow the backend, or explain why the stage cannot run.
    pub fn get(&self, kind: CapabilityKind) -> Result<&T, StageError> {
        match self {
            Capability::Available(backend) => Ok(backend),
            Capability::Unavailable { reason } => {
                Err(StageError::Unavailable(kind, reason.clone()))
            }
        }
    }
}

/// A TrueType/OpenType font loaded once at startup.
#[derive(Clone)]
pub struct LoadedFont {
    font: FontArc,
    bytes: Arc<[u8]>,
    path: PathBuf,
}

impl LoadedFont {
    pub fn from_bytes(bytes: Vec<u8>, path: impl Into<PathBuf>) -> Option<Self> {
        let shared: Arc<[u8]> = Arc::from(bytes.clone());
        let font = FontArc::try_from_vec(bytes).ok()?;
        Some(Self {
            font,
            bytes: shared,
            path: path.into(),
        })
    }

    /// The font compiled into the binary.
    pub fn bundled() -> Option<Self> {
        Self::from_bytes(BUNDLED_FONT.to_vec(), BUNDLED_FONT_NAME)
    }

    pub fn load(path: &Path) -> Option<Self> {
        match std::fs::read(path) {
            Ok(bytes) => {
                let loaded = Self::from_bytes(bytes, path);
                if loaded.is_none() {
                    warn!("Ignoring unparsable font {}", path.display());
                }
                loaded
            }
            Err(e) => {
                debug!("Font {} not readable: {}", path.display(), e);
                None
            }
        }
    }

    pub fn font(&self) -> &FontArc {
        &self.font
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn covers(&self, c: char) -> bool {
        self.font.glyph_id(c).0 != 0
    }
}

impl fmt::Debug for LoadedFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedFont")
            .field("path", &self.path)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Raster drawing support.
#[derive(Debug, Clone)]
pub struct GraphicsBackend {
    pub label_font: LoadedFont,
    pub max_canvas_pixels: u64,
}

impl GraphicsBackend {
    pub fn new(label_font: LoadedFont) -> Self {
        Self {
            label_font,
            max_canvas_pixels: 100_000_000,
        }
    }

    pub fn with_max_canvas_pixels(mut self, max_canvas_pixels: u64) -> Self {
        self.max_canvas_pixels = max_canvas_pixels;
        self
    }
}

/// PDF report support.
#[derive(Debug, Clone)]
pub struct DocumentBackend {
    pub output_dir: PathBuf,
    /// Used for right-to-left pages when present.
    pub unicode_font: Option<LoadedFont>,
}

impl DocumentBackend {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            unicode_font: None,
        }
    }

    pub fn with_unicode_font(mut self, font: Option<LoadedFont>) -> Self {
        self.unicode_font = font;
        self
    }
}

/// The startup probe result. Computed once and shared read-only by every
/// request for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct Capabilities {
    pub graphics: Capability<GraphicsBackend>,
    pub document: Capability<DocumentBackend>,
}

impl Capabilities {
    pub fn new(
        graphics: Capability<GraphicsBackend>,
        document: Capability<DocumentBackend>,
    ) -> Self {
        Self { graphics, document }
    }

    /// Probe the environment.
    ///
    /// A missing capability is reported as `Unavailable` unless the settings
    /// mark it as required, in which case startup fails.
    pub fn probe(settings: &Settings) -> Result<Self, AppError> {
        let graphics = probe_graphics(settings);
        let document = probe_document(settings);

        if let Capability::Unavailable { reason } = &graphics {
            if settings.graphics.require {
                return Err(AppError::CapabilityRequired(
                    CapabilityKind::Graphics,
                    reason.clone(),
                ));
            }
            warn!("Graphics capability unavailable: {}", reason);
        }

        if let Capability::Unavailable { reason } = &document {
            if settings.document.require {
                return Err(AppError::CapabilityRequired(
                    CapabilityKind::Document,
                    reason.clone(),
                ));
            }
            warn!("Document capability unavailable: {}", reason);
        }

        info!(
            "Capabilities probed: graphics={}, document={}",
            graphics.is_available(),
            document.is_available()
        );
        Ok(Self { graphics, document })
    }
}

fn probe_graphics(settings: &Settings) -> Capability<GraphicsBackend> {
    if !settings.graphics.enabled {
        return Capability::unavailable("disabled by configuration");
    }

    let label_font = find_font(
        &settings.graphics.font_paths,
        SYSTEM_LABEL_FONTS,
        |font| font.covers('A'),
    );
    match label_font {
        Some(font) => {
            info!("Using label font {}", font.path().display());
            Capability::Available(
                GraphicsBackend::new(font)
                    .with_max_canvas_pixels(settings.graphics.max_canvas_pixels),
            )
        }
        None => Capability::unavailable("no usable label font"),
    }
}

fn probe_document(settings: &Settings) -> Capability<DocumentBackend> {
    if !settings.document.enabled {
        return Capability::unavailable("disabled by configuration");
    }

    let output_dir = &settings.document.output_dir;
    if let Err(e) = std::fs::create_dir_all(output_dir) {
        return Capability::unavailable(format!(
            "cannot create output directory {}: {}",
            output_dir.display(),
            e
        ));
    }
    if let Err(e) = tempfile::tempfile_in(output_dir) {
        return Capability::unavailable(format!(
            "output directory {} is not writable: {}",
            output_dir.display(),
            e
        ));
    }

    let unicode_font = find_font(
        &settings.document.unicode_font_paths,
        SYSTEM_UNICODE_FONTS,
        |font| font.covers(ARABIC_SAMPLE),
    );
    match &unicode_font {
        Some(font) => info!("Using right-to-left font {}", font.path().display()),
        None => warn!("No Arabic-capable font found; Arabic text will be written as '?'"),
    }

    Capability::Available(DocumentBackend::new(output_dir.clone()).with_unicode_font(unicode_font))
}

/// Configured paths first, then well-known system paths, then the bundled font.
fn find_font(
    configured: &[PathBuf],
    system: &[&str],
    accept: impl Fn(&LoadedFont) -> bool,
) -> Option<LoadedFont> {
    configured
        .iter()
        .cloned()
        .chain(system.iter().map(PathBuf::from))
        .filter_map(|path| LoadedFont::load(&path))
        .chain(LoadedFont::bundled())
        .find(|font| accept(font))
}
