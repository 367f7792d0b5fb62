//! Station image rendering.
//!
//! The fetched background is decoded, a band coloured by the station's
//! temperature is painted along its bottom edge, and the result is encoded
//! as PNG.

use std::io::Cursor;

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};

use stationcast_core::error::AppError;
use stationcast_core::result::AppResult;

/// Content type of rendered artifacts.
pub const ARTIFACT_CONTENT_TYPE: &str = "image/png";

/// Temperature mapped to pure blue.
const COLD_CELSIUS: f64 = -10.0;
/// Temperature mapped to pure red.
const HOT_CELSIUS: f64 = 35.0;
/// Band colour for records without a temperature.
const NO_READING: Rgba<u8> = Rgba([128, 128, 128, 255]);
/// Fraction of the image height covered by the band.
const BAND_FRACTION: u32 = 6;

/// Band colour for a temperature reading.
pub fn temperature_color(celsius: Option<f64>) -> Rgba<u8> {
    let Some(celsius) = celsius.filter(|c| c.is_finite()) else {
        return NO_READING;
    };
    let t = ((celsius - COLD_CELSIUS) / (HOT_CELSIUS - COLD_CELSIUS)).clamp(0.0, 1.0);
    let red = (255.0 * t).round() as u8;
    let blue = (255.0 * (1.0 - t)).round() as u8;
    Rgba([red, 64, blue, 255])
}

/// Temperature of a snapshot record, accepting numbers and numeric strings.
pub fn record_temperature(item: &serde_json::Value) -> Option<f64> {
    match item.get("temperature")? {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Render the artifact for one record.
///
/// Fails with `ExternalService` when the fetched bytes are not a decodable
/// image.
pub fn render_station_image(background: &[u8], item: &serde_json::Value) -> AppResult<Bytes> {
    let decoded = image::load_from_memory(background)
        .map_err(|e| AppError::external_service(format!("Failed to decode image: {e}")))?;
    let mut canvas: RgbaImage = decoded.to_rgba8();

    let (width, height) = canvas.dimensions();
    let band_height = (height / BAND_FRACTION).max(1).min(height);
    let color = temperature_color(record_temperature(item));
    for y in height - band_height..height {
        for x in 0..width {
            canvas.put_pixel(x, y, color);
        }
    }

    let mut buf = Vec::new();
    DynamicImage::ImageRgba8(canvas)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| AppError::internal(format!("Failed to encode image: {e}")))?;
    Ok(Bytes::from(buf))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stationcast_core::error::ErrorKind;

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_color_scale_endpoints() {
        assert_eq!(temperature_color(Some(-40.0)), Rgba([0, 64, 255, 255]));
        assert_eq!(temperature_color(Some(50.0)), Rgba([255, 64, 0, 255]));
        assert_eq!(temperature_color(None), NO_READING);
        assert_eq!(temperature_color(Some(f64::NAN)), NO_READING);
    }

    #[test]
    fn test_record_temperature_forms() {
        assert_eq!(record_temperature(&json!({"temperature": 4.5})), Some(4.5));
        assert_eq!(record_temperature(&json!({"temperature": "7"})), Some(7.0));
        assert_eq!(record_temperature(&json!({"temperature": null})), None);
        assert_eq!(record_temperature(&json!({})), None);
    }

    #[test]
    fn test_renders_band_into_png() {
        let out = render_station_image(&png(12, 12), &json!({"temperature": 35})).unwrap();
        let img = image::load_from_memory(&out).unwrap().to_rgba8();
        assert_eq!(img.dimensions(), (12, 12));
        assert_eq!(*img.get_pixel(0, 11), Rgba([255, 64, 0, 255]));
        assert_eq!(*img.get_pixel(0, 0), Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_undecodable_background_is_external_failure() {
        let err = render_station_image(b"<html>", &json!({})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExternalService);
    }
}
