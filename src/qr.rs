//! QR code rendering for the pairing screen.
//!
//! The desktop shows a QR code that points the phone at the mobile upload
//! page for its session.

use std::io::Cursor;

use anyhow::{Context, Result};
use base64::Engine;
use image::{DynamicImage, ImageFormat, Rgba};
use qrcode::QrCode;
use url::Url;

/// Smallest edge of the rendered image in pixels
const MIN_SIZE: u32 = 300;

/// Mobile upload page for a session: `<base>/mobile.html?session=<id>`
pub fn mobile_url(base: &Url, session_id: &str) -> Result<Url> {
    let mut url = base
        .join("mobile.html")
        .with_context(|| format!("invalid base url {base}"))?;
    url.query_pairs_mut().clear().append_pair("session", session_id);
    Ok(url)
}

/// Render `text` as a PNG QR code and return it as a `data:` URI.
///
/// Modules are white on a transparent background so the code sits on the
/// desktop's dark theme.
pub fn render_data_uri(text: &str) -> Result<String> {
    let code = QrCode::new(text.as_bytes()).context("Failed to encode QR code")?;
    let image = code
        .render::<Rgba<u8>>()
        .dark_color(Rgba([255, 255, 255, 255]))
        .light_color(Rgba([0, 0, 0, 0]))
        .quiet_zone(true)
        .min_dimensions(MIN_SIZE, MIN_SIZE)
        .build();

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .context("Failed to encode QR code as PNG")?;

    Ok(format!(
        "data:image/png;base64,{}",
        base64::engine::general_purpose::STANDARD.encode(png)
    ))
}
