//! 写真の読み込みとアップロード用の整形
//!
//! 長辺が上限を超える画像は縮小してJPEGに再エンコードする。
//! 上限以内ならファイルの内容をそのまま送る。

use crate::error::{MoodPostError, Result};
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::path::Path;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "JPG", "JPEG", "PNG"];

/// 分類サービスへ送る画像
#[derive(Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for ImagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImagePayload")
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl ImagePayload {
    /// メモリ上の画像データから作成
    pub fn from_bytes(file_name: &str, bytes: Vec<u8>, max_size: u32) -> Result<Self> {
        let format = image::guess_format(&bytes)
            .map_err(|e| MoodPostError::ImageLoad(format!("{}: {}", file_name, e)))?;
        let img = image::load_from_memory_with_format(&bytes, format)
            .map_err(|e| MoodPostError::ImageLoad(format!("{}: {}", file_name, e)))?;

        let (width, height) = img.dimensions();
        if width.max(height) <= max_size {
            return Ok(Self {
                file_name: file_name.to_string(),
                mime_type: format.to_mime_type().to_string(),
                bytes,
            });
        }

        let resized = img.resize(max_size, max_size, image::imageops::FilterType::Lanczos3);
        tracing::debug!(
            file = %file_name,
            from = ?(width, height),
            to = ?resized.dimensions(),
            "画像を縮小"
        );

        // JPEGはアルファを持てないのでRGBに落とす
        let rgb = DynamicImage::ImageRgb8(resized.to_rgb8());
        let mut buf = Vec::new();
        rgb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
            .map_err(|e| MoodPostError::ImageLoad(format!("{}: {}", file_name, e)))?;

        Ok(Self {
            file_name: jpeg_file_name(file_name),
            mime_type: ImageFormat::Jpeg.to_mime_type().to_string(),
            bytes: buf,
        })
    }
}

/// 画像ファイルを読み込む
pub fn load_image(path: &Path, max_size: u32) -> Result<ImagePayload> {
    if !path.is_file() {
        return Err(MoodPostError::FileNotFound(path.display().to_string()));
    }

    let ext_ok = path
        .extension()
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|&e| e == ext.to_string_lossy()))
        .unwrap_or(false);
    if !ext_ok {
        return Err(MoodPostError::ImageLoad(format!(
            "対応していない形式です: {}",
            path.display()
        )));
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "image.jpg".to_string());
    let bytes = std::fs::read(path)?;

    ImagePayload::from_bytes(&file_name, bytes, max_size)
}

fn jpeg_file_name(file_name: &str) -> String {
    let stem = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "image".to_string());
    format!("{}.jpg", stem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([200, 120, 40]));
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_small_image_kept_as_is() {
        let bytes = png_bytes(64, 32);
        let payload = ImagePayload::from_bytes("face.png", bytes.clone(), 1024).unwrap();
        assert_eq!(payload.file_name, "face.png");
        assert_eq!(payload.mime_type, "image/png");
        assert_eq!(payload.bytes, bytes);
    }

    #[test]
    fn test_large_image_downscaled_to_jpeg() {
        let payload = ImagePayload::from_bytes("big.png", png_bytes(400, 200), 100).unwrap();
        assert_eq!(payload.file_name, "big.jpg");
        assert_eq!(payload.mime_type, "image/jpeg");

        let decoded = image::load_from_memory(&payload.bytes).unwrap();
        let (w, h) = decoded.dimensions();
        assert!(w <= 100 && h <= 100);
        assert_eq!(w, 100);
    }

    #[test]
    fn test_undecodable_bytes_rejected() {
        let result = ImagePayload::from_bytes("broken.jpg", b"not an image".to_vec(), 1024);
        assert!(matches!(result, Err(MoodPostError::ImageLoad(_))));
    }

    #[test]
    fn test_load_image_missing_file() {
        let result = load_image(Path::new("/nonexistent/photo.jpg"), 1024);
        assert!(matches!(result, Err(MoodPostError::FileNotFound(_))));
    }

    #[test]
    fn test_load_image_rejects_extension() {
        let dir = std::env::temp_dir().join("moodpost-test-capture");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("notes.txt");
        std::fs::write(&path, "hello").unwrap();

        let result = load_image(&path, 1024);
        assert!(matches!(result, Err(MoodPostError::ImageLoad(_))));

        std::fs::remove_dir_all(&dir).ok();
    }
}
