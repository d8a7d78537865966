//! Canonical render-job construction
//!
//! Maps a validated payload onto a [`RenderJob`]: resolves the content
//! kind, the output kind, and every option with its documented default.
//! Validation has already run by the time this is called; a coercion that
//! still fails surfaces as an ordinary validation error.

use std::time::Duration;

use serde_json::Value;

use crate::validate::as_numeric;
use crate::{ContentKind, Error, Margins, OutputKind, RenderOptions, Result};

/// A fully-resolved render request, consumed once by the pipeline.
#[derive(Debug, Clone)]
pub struct RenderJob {
    /// Inline HTML markup or an absolute URL, depending on `content_kind`
    pub content: String,
    pub content_kind: ContentKind,
    pub output_kind: OutputKind,
    pub options: RenderOptions,
}

impl RenderJob {
    /// Build the canonical job from a validated payload.
    ///
    /// Inline HTML wins when both `html` and `url` are supplied, matching
    /// the upstream API's precedence.
    pub fn from_payload(payload: &Value) -> Result<Self> {
        let html = payload.get("html").and_then(Value::as_str).unwrap_or("");
        let (content, content_kind) = if !html.is_empty() {
            (html.to_string(), ContentKind::Html)
        } else {
            let url = payload.get("url").and_then(Value::as_str).unwrap_or("");
            if url.is_empty() {
                return Err(invalid("param html or url must be provided"));
            }
            (url.to_string(), ContentKind::Url)
        };

        let output_kind = match present(payload, "type") {
            None => OutputKind::Png,
            Some(value) => value
                .as_str()
                .and_then(|t| OutputKind::from_token(Some(t)))
                .ok_or_else(|| invalid("type must be one of: pdf, png, jpeg, jpg"))?,
        };

        let defaults = RenderOptions::default();

        let format = match present(payload, "format").and_then(Value::as_str) {
            None => defaults.format,
            Some(token) => token
                .parse()
                .map_err(|_| invalid("format must be a valid paper size"))?,
        };

        let timeout = match numeric_field(payload, "timeout")? {
            None => defaults.timeout,
            Some(secs) => Duration::from_secs_f64(secs.max(0.0)),
        };

        let quality = match numeric_field(payload, "quality")? {
            None => defaults.quality,
            Some(q) => q.clamp(0.0, 100.0) as u32,
        };

        let device_scale_factor = numeric_field(payload, "deviceScaleFactor")?
            .unwrap_or(defaults.device_scale_factor);

        let options = RenderOptions {
            format,
            landscape: bool_field(payload, "landscape").unwrap_or(defaults.landscape),
            full_page: bool_field(payload, "fullPage").unwrap_or(defaults.full_page),
            margins: margins_field(payload)?,
            timeout,
            device_scale_factor,
            quality,
            width: dimension_field(payload, "width")?,
            height: dimension_field(payload, "height")?,
        };

        Ok(Self {
            content,
            content_kind,
            output_kind,
            options,
        })
    }
}

fn present<'a>(payload: &'a Value, key: &str) -> Option<&'a Value> {
    payload.get(key).filter(|v| !v.is_null())
}

fn invalid(message: &str) -> Error {
    Error::Validation(vec![message.to_string()])
}

fn numeric_field(payload: &Value, key: &str) -> Result<Option<f64>> {
    match present(payload, key) {
        None => Ok(None),
        Some(value) => as_numeric(value)
            .map(Some)
            .ok_or_else(|| invalid(&format!("{key} must be a number"))),
    }
}

fn bool_field(payload: &Value, key: &str) -> Option<bool> {
    present(payload, key).and_then(Value::as_bool)
}

// Viewport dimensions must be whole positive pixel counts; anything else
// falls back to the default viewport.
fn dimension_field(payload: &Value, key: &str) -> Result<Option<u32>> {
    Ok(numeric_field(payload, key)?.filter(|v| *v >= 1.0).map(|v| v as u32))
}

fn margins_field(payload: &Value) -> Result<Option<Margins>> {
    let sides = match present(payload, "margin").and_then(Value::as_object) {
        None => return Ok(None),
        Some(sides) => sides,
    };

    let side = |name: &str| -> Result<f64> {
        match sides.get(name).filter(|v| !v.is_null()) {
            // Absent sides print as zero, as the upstream API did
            None => Ok(0.0),
            Some(value) => as_numeric(value)
                .ok_or_else(|| invalid(&format!("margin.{name} must be a number"))),
        }
    };

    Ok(Some(Margins {
        top: side("top")?,
        right: side("right")?,
        bottom: side("bottom")?,
        left: side("left")?,
    }))
}
