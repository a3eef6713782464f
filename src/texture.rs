use std::borrow::Cow;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TextureError {
    #[error("failed to decode texture {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(
        "texture {} has {channels} channel(s); only RGB and RGBA images are supported",
        path.display()
    )]
    UnsupportedChannelCount { path: PathBuf, channels: u8 },
}

/// 8-bit RGB or RGBA pixels stored bottom row first, matching texture
/// coordinates with `v = 0` at the bottom edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureImage {
    width: u32,
    height: u32,
    channels: u8,
    pixels: Vec<u8>,
}

impl TextureImage {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel data expanded to four channels for upload.
    pub fn to_rgba(&self) -> Cow<'_, [u8]> {
        if self.channels == 4 {
            return Cow::Borrowed(&self.pixels);
        }
        let mut rgba = Vec::with_capacity(self.pixels.len() / 3 * 4);
        for rgb in self.pixels.chunks_exact(3) {
            rgba.extend_from_slice(rgb);
            rgba.push(u8::MAX);
        }
        Cow::Owned(rgba)
    }

    pub fn flip_vertically(&mut self) {
        let row = self.width as usize * self.channels as usize;
        let rows = self.height as usize;
        for top in 0..rows / 2 {
            let bottom = rows - 1 - top;
            let (upper, lower) = self.pixels.split_at_mut(bottom * row);
            upper[top * row..(top + 1) * row].swap_with_slice(&mut lower[..row]);
        }
    }

    fn from_dynamic(image: DynamicImage, path: &Path) -> Result<Self, TextureError> {
        let (width, height) = (image.width(), image.height());
        let channels = image.color().channel_count();
        let pixels = match channels {
            3 => image.into_rgb8().into_raw(),
            4 => image.into_rgba8().into_raw(),
            _ => {
                return Err(TextureError::UnsupportedChannelCount {
                    path: path.to_path_buf(),
                    channels,
                })
            }
        };
        let mut texture = Self {
            width,
            height,
            channels,
            pixels,
        };
        texture.flip_vertically();
        Ok(texture)
    }
}

/// Decodes an image file; 3-channel files stay RGB and 4-channel files
/// stay RGBA. Rows are flipped so the first row is the bottom of the image.
pub fn load_texture(path: impl AsRef<Path>) -> Result<TextureImage, TextureError> {
    let path = path.as_ref();
    let image = image::open(path).map_err(|source| TextureError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    let texture = TextureImage::from_dynamic(image, path)?;
    log::debug!(
        "loaded texture {} ({}x{}, {} channels)",
        path.display(),
        texture.width,
        texture.height,
        texture.channels
    );
    Ok(texture)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage, Rgba, RgbaImage};
    use tempfile::tempdir;

    #[test]
    fn rgb_image_is_flipped_and_kept_rgb() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("stripes.png");
        let mut image = RgbImage::new(2, 3);
        for x in 0..2 {
            image.put_pixel(x, 0, Rgb([255, 0, 0]));
            image.put_pixel(x, 1, Rgb([0, 255, 0]));
            image.put_pixel(x, 2, Rgb([0, 0, 255]));
        }
        image.save(&path).unwrap();

        let texture = load_texture(&path).unwrap();
        assert_eq!((texture.width(), texture.height()), (2, 3));
        assert_eq!(texture.channels(), 3);
        assert_eq!(&texture.pixels()[..6], &[0, 0, 255, 0, 0, 255]);
        assert_eq!(&texture.pixels()[6..12], &[0, 255, 0, 0, 255, 0]);
        assert_eq!(&texture.pixels()[12..], &[255, 0, 0, 255, 0, 0]);
    }

    #[test]
    fn rgba_image_keeps_alpha() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("glass.png");
        RgbaImage::from_pixel(1, 1, Rgba([10, 20, 30, 40]))
            .save(&path)
            .unwrap();

        let texture = load_texture(&path).unwrap();
        assert_eq!(texture.channels(), 4);
        assert_eq!(texture.to_rgba().as_ref(), &[10, 20, 30, 40]);
    }

    #[test]
    fn rgb_expands_to_opaque_rgba() {
        let texture = TextureImage {
            width: 2,
            height: 1,
            channels: 3,
            pixels: vec![1, 2, 3, 4, 5, 6],
        };
        assert_eq!(texture.to_rgba().as_ref(), &[1, 2, 3, 255, 4, 5, 6, 255]);
    }

    #[test]
    fn grayscale_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("gray.png");
        GrayImage::from_pixel(4, 4, Luma([128])).save(&path).unwrap();

        match load_texture(&path) {
            Err(TextureError::UnsupportedChannelCount { channels, .. }) => assert_eq!(channels, 1),
            other => panic!("expected channel count error, got {other:?}"),
        }
    }

    #[test]
    fn missing_or_corrupt_files_fail_to_decode() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_texture(dir.path().join("missing.png")),
            Err(TextureError::Decode { .. })
        ));

        let corrupt = dir.path().join("corrupt.png");
        std::fs::write(&corrupt, b"not a png").unwrap();
        assert!(matches!(
            load_texture(&corrupt),
            Err(TextureError::Decode { .. })
        ));
    }

    #[test]
    fn flipping_twice_restores_rows() {
        let mut texture = TextureImage {
            width: 1,
            height: 4,
            channels: 3,
            pixels: (0..12).collect(),
        };
        texture.flip_vertically();
        assert_eq!(&texture.pixels()[..3], &[9, 10, 11]);
        texture.flip_vertically();
        assert_eq!(texture.pixels(), (0..12).collect::<Vec<u8>>().as_slice());
    }
}
