//! htmlshot
//!
//! An authenticated HTTP API that renders HTML markup or a URL into a PDF,
//! PNG, or JPEG using headless Chrome as the rendering engine.
//!
//! # Features
//!
//! - **CDP Backend** (default): renders via Chrome DevTools Protocol using
//!   headless Chrome
//! - **Trait Seam**: the [`Renderer`] trait lets tests substitute a mock
//!   backend without a browser install
//! - **No Residue**: every render goes through a scratch file that is
//!   removed on every exit path, success or failure
//!
//! # Example
//!
//! ```
//! use htmlshot::{validate, RenderJob};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let payload = serde_json::json!({ "html": "<h1>hi</h1>" });
//!
//! let errors = validate(&payload);
//! assert!(errors.is_empty());
//!
//! let job = RenderJob::from_payload(&payload)?;
//! assert_eq!(job.output_kind.mime_type(), "image/png");
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

pub mod error;
pub use error::{Error, Result};

// Request validation and canonicalization
pub mod request;
pub mod validate;
pub use request::RenderJob;
pub use validate::validate;

// Scratch-file lifecycle and the save/read/delete pipeline
pub mod scratch;
pub use scratch::{produce, ScratchFile};

// HTTP surface (router, auth, envelopes)
pub mod config;
pub mod http;

#[cfg(feature = "cdp")]
pub mod chrome;

#[cfg(feature = "cdp")]
pub use chrome::ChromeRenderer;

/// Whether the render source is inline HTML or a remote URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentKind {
    Html,
    Url,
}

/// Target artifact format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputKind {
    Pdf,
    Png,
    Jpeg,
}

impl OutputKind {
    /// Parse the request's `type` token. `None` (absent field) means PNG.
    pub fn from_token(token: Option<&str>) -> Option<Self> {
        match token {
            None => Some(OutputKind::Png),
            Some("pdf") => Some(OutputKind::Pdf),
            Some("png") => Some(OutputKind::Png),
            Some("jpeg") | Some("jpg") => Some(OutputKind::Jpeg),
            Some(_) => None,
        }
    }

    /// File extension used for the scratch artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputKind::Pdf => "pdf",
            OutputKind::Png => "png",
            OutputKind::Jpeg => "jpg",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputKind::Pdf => "application/pdf",
            OutputKind::Png => "image/png",
            OutputKind::Jpeg => "image/jpeg",
        }
    }
}

/// Paper size token for PDF output.
///
/// The accepted tokens are the fixed set understood by Chrome's print
/// pipeline; anything else is rejected during validation rather than being
/// passed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaperFormat {
    A0,
    A1,
    A2,
    A3,
    A4,
    A5,
    A6,
    A7,
    A8,
    A9,
    A10,
    Letter,
    Legal,
    Tabloid,
    Ledger,
}

impl PaperFormat {
    /// Every accepted token, in the order used for validation messages.
    pub const ALL: [&'static str; 15] = [
        "A0", "A1", "A2", "A3", "A4", "A5", "A6", "A7", "A8", "A9", "A10", "Letter", "Legal",
        "Tabloid", "Ledger",
    ];

    /// Paper dimensions in inches (width, height), portrait orientation.
    pub fn size_inches(&self) -> (f64, f64) {
        match self {
            PaperFormat::A0 => (33.1, 46.8),
            PaperFormat::A1 => (23.4, 33.1),
            PaperFormat::A2 => (16.54, 23.4),
            PaperFormat::A3 => (11.7, 16.54),
            PaperFormat::A4 => (8.27, 11.7),
            PaperFormat::A5 => (5.83, 8.27),
            PaperFormat::A6 => (4.13, 5.83),
            PaperFormat::A7 => (2.91, 4.13),
            PaperFormat::A8 => (2.05, 2.91),
            PaperFormat::A9 => (1.46, 2.05),
            PaperFormat::A10 => (1.02, 1.46),
            PaperFormat::Letter => (8.5, 11.0),
            PaperFormat::Legal => (8.5, 14.0),
            PaperFormat::Tabloid => (11.0, 17.0),
            PaperFormat::Ledger => (17.0, 11.0),
        }
    }
}

impl FromStr for PaperFormat {
    type Err = ();

    // Tokens are matched exactly; "a4" is not a paper size.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "A0" => Ok(PaperFormat::A0),
            "A1" => Ok(PaperFormat::A1),
            "A2" => Ok(PaperFormat::A2),
            "A3" => Ok(PaperFormat::A3),
            "A4" => Ok(PaperFormat::A4),
            "A5" => Ok(PaperFormat::A5),
            "A6" => Ok(PaperFormat::A6),
            "A7" => Ok(PaperFormat::A7),
            "A8" => Ok(PaperFormat::A8),
            "A9" => Ok(PaperFormat::A9),
            "A10" => Ok(PaperFormat::A10),
            "Letter" => Ok(PaperFormat::Letter),
            "Legal" => Ok(PaperFormat::Legal),
            "Tabloid" => Ok(PaperFormat::Tabloid),
            "Ledger" => Ok(PaperFormat::Ledger),
            _ => Err(()),
        }
    }
}

/// Page margins in millimetres. Applied to PDF output only.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Margins {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Canonical rendering options for one request.
///
/// Built once by [`RenderJob::from_payload`] after validation and never
/// mutated afterwards; the whole job is passed by value into the render
/// call so concurrent requests share nothing.
///
/// # Examples
///
/// ```
/// let opts = htmlshot::RenderOptions::default();
/// assert_eq!(opts.format, htmlshot::PaperFormat::A4);
/// assert_eq!(opts.timeout.as_secs(), 60);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    /// Paper size used when printing to PDF
    pub format: PaperFormat,
    /// Landscape page orientation (PDF)
    pub landscape: bool,
    /// Capture the whole scrollable page rather than the viewport (images)
    pub full_page: bool,
    /// Page margins in millimetres; absent margins print as zero (PDF)
    pub margins: Option<Margins>,
    /// Hard ceiling on how long the render may take
    pub timeout: Duration,
    /// Device scale factor applied to screenshots
    pub device_scale_factor: f64,
    /// JPEG compression quality, 0-100
    pub quality: u32,
    /// Viewport width in pixels
    pub width: Option<u32>,
    /// Viewport height in pixels
    pub height: Option<u32>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: PaperFormat::A4,
            landscape: false,
            full_page: false,
            margins: None,
            timeout: Duration::from_secs(60),
            device_scale_factor: 1.0,
            quality: 90,
            width: None,
            height: None,
        }
    }
}

/// Default viewport when the request sets no explicit dimensions.
pub const DEFAULT_VIEWPORT: (u32, u32) = (1280, 720);

/// One finished render: the artifact bytes read back from the scratch file.
#[derive(Debug, Clone)]
pub struct RenderResult {
    /// Raw artifact bytes
    pub bytes: Vec<u8>,
    /// MIME type matching the requested output kind
    pub mime_type: &'static str,
    /// Artifact size in bytes
    pub size: u64,
}

/// Core trait for render backends.
///
/// Implementations receive the canonical job and a destination path inside
/// the scratch directory, and must either write the finished artifact to
/// that exact path or fail. The call is synchronous; the artifact pipeline
/// runs it on a blocking worker and enforces the job's timeout from outside.
pub trait Renderer: Send + Sync {
    /// Render the job and save the artifact to `dest`.
    fn render_to_file(&self, job: &RenderJob, dest: &Path) -> Result<()>;
}
