use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine};
use image::{DynamicImage, ImageFormat, Luma};
use qrcode::QrCode;
use std::io::Cursor;

/// Encodes check-in links as QR codes for ticket emails.
#[derive(Debug, Clone)]
pub struct QrService {
    app_url: String,
}

impl QrService {
    pub fn new(app_url: impl Into<String>) -> Self {
        Self {
            app_url: app_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// URL a door scanner opens to redeem the ticket.
    pub fn check_in_url(&self, order_id: &str) -> String {
        format!("{}/api/v1/checkin/{}", self.app_url, order_id)
    }

    /// PNG bytes for the inline ticket image.
    pub fn render_png(&self, order_id: &str) -> Result<Vec<u8>> {
        let code = QrCode::new(self.check_in_url(order_id).as_bytes())
            .map_err(|e| anyhow!("Failed to generate QR code: {}", e))?;

        let image = code.render::<Luma<u8>>().min_dimensions(240, 240).build();

        let mut png = Vec::new();
        DynamicImage::ImageLuma8(image)
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .map_err(|e| anyhow!("Failed to encode QR code: {}", e))?;

        Ok(png)
    }

    pub fn data_uri(&self, order_id: &str) -> Result<String> {
        let png = self.render_png(order_id)?;
        Ok(format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(png)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G'];

    #[test]
    fn check_in_url_uses_order_id() {
        let qr = QrService::new("https://fasttix.id/");
        assert_eq!(
            qr.check_in_url("order_id-AbCdEfGhIj"),
            "https://fasttix.id/api/v1/checkin/order_id-AbCdEfGhIj"
        );
    }

    #[test]
    fn renders_png_and_data_uri() {
        let qr = QrService::new("http://localhost:8080");
        let png = qr.render_png("order_id-AbCdEfGhIj").unwrap();
        assert!(png.starts_with(PNG_MAGIC));

        let uri = qr.data_uri("order_id-AbCdEfGhIj").unwrap();
        assert!(uri.starts_with("data:image/png;base64,"));
    }
}
