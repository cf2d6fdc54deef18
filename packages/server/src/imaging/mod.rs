//! Decoding, thumbnailing and fingerprinting of uploaded pics.

mod dct;

use std::io::Cursor;

use common::Status;
use image::codecs::gif::GifDecoder;
use image::imageops::FilterType;
use image::{AnimationDecoder, DynamicImage, ImageFormat};

pub use dct::{hamming_distance, perceptual_hash0};

use crate::schema::{AnimationInfo, Mime};

/// Thumbnails are square with this edge length.
pub const THUMBNAIL_SIZE: u32 = 192;

/// A decoded upload.
pub struct DecodedPic {
    pub mime: Mime,
    pub width: u32,
    pub height: u32,
    pub animation: Option<AnimationInfo>,
    /// First frame.
    pub image: DynamicImage,
}

/// Turns uploaded bytes into pixels.
pub trait PicDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<DecodedPic, Status>;
}

/// [`PicDecoder`] for JPEG, PNG and GIF on the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageDecoder;

impl PicDecoder for ImageDecoder {
    fn decode(&self, data: &[u8]) -> Result<DecodedPic, Status> {
        let format = image::guess_format(data)
            .map_err(|e| Status::invalid_argument("Can't decode image").with_cause(e))?;
        let mime = match format {
            ImageFormat::Jpeg => Mime::Jpeg,
            ImageFormat::Png => Mime::Png,
            ImageFormat::Gif => Mime::Gif,
            other => {
                return Err(Status::invalid_argument(format!(
                    "Can't decode image, unsupported format {other:?}"
                )));
            }
        };
        let image = image::load_from_memory_with_format(data, format)
            .map_err(|e| Status::invalid_argument("Can't decode image").with_cause(e))?;
        let animation = match mime {
            Mime::Gif => gif_animation(data)?,
            _ => None,
        };
        Ok(DecodedPic {
            mime,
            width: image.width(),
            height: image.height(),
            animation,
            image,
        })
    }
}

/// Total loop time of a GIF with more than one frame.
fn gif_animation(data: &[u8]) -> Result<Option<AnimationInfo>, Status> {
    let decoder = GifDecoder::new(Cursor::new(data))
        .map_err(|e| Status::invalid_argument("Can't decode image").with_cause(e))?;
    let mut frames = 0u32;
    let mut duration_ms = 0f64;
    for frame in decoder.into_frames() {
        let frame = frame.map_err(|e| Status::invalid_argument("Can't decode image").with_cause(e))?;
        let (num, den) = frame.delay().numer_denom_ms();
        if den != 0 {
            duration_ms += f64::from(num) / f64::from(den);
        }
        frames += 1;
    }
    if frames <= 1 {
        return Ok(None);
    }
    Ok(Some(AnimationInfo {
        duration_ms: duration_ms.round() as i64,
    }))
}

/// Encode a centre-cropped square thumbnail in the format `mime` thumbnails use.
pub fn thumbnail(img: &DynamicImage, mime: Mime) -> Result<Vec<u8>, Status> {
    let thumb = img.resize_to_fill(THUMBNAIL_SIZE, THUMBNAIL_SIZE, FilterType::CatmullRom);
    let mut out = Cursor::new(Vec::new());
    let written = match mime.thumbnail_ext() {
        "jpg" => DynamicImage::ImageRgb8(thumb.to_rgb8()).write_to(&mut out, ImageFormat::Jpeg),
        _ => thumb.write_to(&mut out, ImageFormat::Png),
    };
    written.map_err(|e| Status::internal("Can't save thumbnail").with_cause(e))?;
    Ok(out.into_inner())
}

#[cfg(test)]
pub(crate) mod tests {
    use std::time::Duration;

    use image::codecs::gif::GifEncoder;
    use image::{Delay, Frame, Rgba, RgbaImage};

    use super::*;

    pub fn png_bytes(w: u32, h: u32, seed: u8) -> Vec<u8> {
        let img = RgbaImage::from_fn(w, h, |x, y| {
            Rgba([seed, (x * 20) as u8, (y * 20) as u8, 255])
        });
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    fn gif_bytes(frames: usize) -> Vec<u8> {
        let mut out = Vec::new();
        {
            let mut enc = GifEncoder::new(&mut out);
            for i in 0..frames {
                let img = RgbaImage::from_pixel(4, 4, Rgba([i as u8 * 40, 0, 0, 255]));
                let delay = Delay::from_saturating_duration(Duration::from_millis(100));
                enc.encode_frame(Frame::from_parts(img, 0, 0, delay)).unwrap();
            }
        }
        out
    }

    #[test]
    fn decodes_png_bounds() {
        let pic = ImageDecoder.decode(&png_bytes(5, 10, 1)).unwrap();
        assert_eq!(pic.mime, Mime::Png);
        assert_eq!((pic.width, pic.height), (5, 10));
        assert!(pic.animation.is_none());
    }

    #[test]
    fn animated_gif_reports_duration() {
        let pic = ImageDecoder.decode(&gif_bytes(3)).unwrap();
        assert_eq!(pic.mime, Mime::Gif);
        assert_eq!(pic.animation.map(|a| a.duration_ms), Some(300));

        let still = ImageDecoder.decode(&gif_bytes(1)).unwrap();
        assert!(still.animation.is_none());
    }

    #[test]
    fn garbage_is_invalid_argument() {
        let err = ImageDecoder.decode(b"definitely not a pic").err().unwrap();
        assert_eq!(err.code(), common::Code::InvalidArgument);
    }

    #[test]
    fn thumbnails_are_square() {
        let img = ImageDecoder.decode(&png_bytes(50, 20, 3)).unwrap().image;
        let png = thumbnail(&img, Mime::Png).unwrap();
        let back = image::load_from_memory(&png).unwrap();
        assert_eq!((back.width(), back.height()), (THUMBNAIL_SIZE, THUMBNAIL_SIZE));

        let jpg = thumbnail(&img, Mime::Jpeg).unwrap();
        assert_eq!(image::guess_format(&jpg).unwrap(), ImageFormat::Jpeg);
    }
}
