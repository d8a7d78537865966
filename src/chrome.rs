//! Chrome DevTools Protocol renderer implementation

use std::path::{Path, PathBuf};
use std::time::Duration;

use headless_chrome::browser::tab::Tab;
use headless_chrome::protocol::cdp::Page;
use headless_chrome::types::PrintToPdfOptions;
use headless_chrome::{Browser, LaunchOptions};

use crate::{
    ContentKind, Error, OutputKind, RenderJob, RenderOptions, Renderer, Result, ScratchFile,
    DEFAULT_VIEWPORT,
};

const MM_PER_INCH: f64 = 25.4;

/// CDP-based renderer (uses the `headless_chrome` crate)
///
/// Launches a fresh headless Chrome per job so concurrent requests never
/// share browser state, renders the job's content into PDF or image bytes,
/// and saves them to the destination path the artifact pipeline owns.
pub struct ChromeRenderer {
    executable: Option<PathBuf>,
}

impl ChromeRenderer {
    /// Create a renderer, optionally pinned to a specific Chrome/Chromium
    /// executable (otherwise the crate's autodetection applies).
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }

    fn launch(&self, options: &RenderOptions) -> Result<Browser> {
        let (width, height) = viewport(options);

        let mut builder = LaunchOptions::default_builder();
        builder
            .headless(true)
            .sandbox(false)
            .window_size(Some((width, height)))
            .idle_browser_timeout(options.timeout + Duration::from_secs(5));
        if let Some(path) = &self.executable {
            builder.path(Some(path.clone()));
        }

        let launch_options = builder
            .build()
            .map_err(|e| Error::Launch(format!("Failed to build launch options: {}", e)))?;

        Browser::new(launch_options)
            .map_err(|e| Error::Launch(format!("Failed to launch browser: {}", e)))
    }
}

impl Renderer for ChromeRenderer {
    fn render_to_file(&self, job: &RenderJob, dest: &Path) -> Result<()> {
        let browser = self.launch(&job.options)?;
        let tab = browser
            .new_tab()
            .map_err(|e| Error::Launch(format!("Failed to create tab: {}", e)))?;
        tab.set_default_timeout(job.options.timeout);

        // Inline HTML is materialized next to the artifact and loaded over
        // file://; its guard removes it once the render is done.
        let mut _page_file: Option<ScratchFile> = None;
        let source = match job.content_kind {
            ContentKind::Url => job.content.clone(),
            ContentKind::Html => {
                let scratch_dir = dest.parent().unwrap_or_else(|| Path::new("."));
                let page = ScratchFile::allocate(scratch_dir, "html")?;
                std::fs::write(page.path(), &job.content)?;
                let url = format!("file://{}", page.path().display());
                _page_file = Some(page);
                url
            }
        };

        tab.navigate_to(&source)
            .map_err(|e| Error::Navigation(format!("Navigation failed: {}", e)))?;
        tab.wait_until_navigated()
            .map_err(|e| Error::Navigation(format!("Wait for navigation failed: {}", e)))?;

        let bytes = match job.output_kind {
            OutputKind::Pdf => print_pdf(&tab, &job.options)?,
            OutputKind::Png => screenshot(
                &tab,
                &job.options,
                Page::CaptureScreenshotFormatOption::Png,
                None,
            )?,
            OutputKind::Jpeg => screenshot(
                &tab,
                &job.options,
                Page::CaptureScreenshotFormatOption::Jpeg,
                Some(job.options.quality),
            )?,
        };

        std::fs::write(dest, &bytes)?;

        // Drop the tab and browser explicitly so the child process is
        // terminated promptly.
        drop(tab);
        drop(browser);
        Ok(())
    }
}

fn viewport(options: &RenderOptions) -> (u32, u32) {
    (
        options.width.unwrap_or(DEFAULT_VIEWPORT.0),
        options.height.unwrap_or(DEFAULT_VIEWPORT.1),
    )
}

fn mm_to_inches(mm: f64) -> f64 {
    mm / MM_PER_INCH
}

fn print_pdf(tab: &Tab, options: &RenderOptions) -> Result<Vec<u8>> {
    let (paper_width, paper_height) = options.format.size_inches();
    let margins = options.margins.unwrap_or_default();

    let pdf_options = PrintToPdfOptions {
        landscape: Some(options.landscape),
        print_background: Some(true),
        paper_width: Some(paper_width),
        paper_height: Some(paper_height),
        margin_top: Some(mm_to_inches(margins.top)),
        margin_right: Some(mm_to_inches(margins.right)),
        margin_bottom: Some(mm_to_inches(margins.bottom)),
        margin_left: Some(mm_to_inches(margins.left)),
        ..Default::default()
    };

    tab.print_to_pdf(Some(pdf_options))
        .map_err(|e| Error::Render(format!("PDF generation failed: {}", e)))
}

fn screenshot(
    tab: &Tab,
    options: &RenderOptions,
    format: Page::CaptureScreenshotFormatOption,
    quality: Option<u32>,
) -> Result<Vec<u8>> {
    let clip = capture_clip(tab, options)?;
    tab.capture_screenshot(format, quality, clip, true)
        .map_err(|e| Error::Render(format!("Screenshot failed: {}", e)))
}

// No clip means Chrome captures the bare viewport, which covers the common
// case. Full-page capture and scale factors need an explicit clip sized
// from the live page.
fn capture_clip(tab: &Tab, options: &RenderOptions) -> Result<Option<Page::Viewport>> {
    if !options.full_page && options.device_scale_factor == 1.0 {
        return Ok(None);
    }

    let (view_width, view_height) = viewport(options);
    let (width, height) = if options.full_page {
        (
            page_dimension(tab, "Width")?.max(view_width as f64),
            page_dimension(tab, "Height")?.max(view_height as f64),
        )
    } else {
        (view_width as f64, view_height as f64)
    };

    Ok(Some(Page::Viewport {
        x: 0.0,
        y: 0.0,
        width,
        height,
        scale: options.device_scale_factor,
    }))
}

fn page_dimension(tab: &Tab, axis: &str) -> Result<f64> {
    let expr = format!(
        "Math.max(document.body ? document.body.scroll{axis} : 0, document.documentElement.scroll{axis})"
    );

    let result = tab
        .evaluate(&expr, false)
        .map_err(|e| Error::Render(format!("Page metrics evaluation failed: {}", e)))?;

    result
        .value
        .and_then(|v| v.as_f64())
        .ok_or_else(|| Error::Render("Page metrics evaluation returned no number".to_string()))
}
