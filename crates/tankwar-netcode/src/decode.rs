//! Observation payload decoding
//!
//! Turns wire observations into component values. Failures here mean the
//! server speaks a payload format this client does not understand; callers
//! treat them as fatal for the stream.

use crate::message::{ImagePayload, Observation};
use crate::{Error, Result};
use tankwar_core::{ComponentValue, Image, Vec2};

/// Decode an observation into the value stored for its component
pub fn decode_observation(observation: Observation) -> Result<ComponentValue> {
    let value = match observation {
        Observation::Image(payload) => ComponentValue::Image(decode_image(payload)?),
        Observation::Reward(reward) => ComponentValue::Reward(f64::from(reward)),
        Observation::Position { x, y } => ComponentValue::Position(Vec2::new(x, y)),
        Observation::Rotation(radians) => ComponentValue::Rotation(radians),
        Observation::TankControls(controls) => ComponentValue::TankControls(controls),
        Observation::TurretControls(controls) => ComponentValue::TurretControls(controls),
    };
    Ok(value)
}

/// Decode an image payload to RGBA8
pub fn decode_image(payload: ImagePayload) -> Result<Image> {
    match payload {
        ImagePayload::Raw {
            width,
            height,
            data,
        } => Ok(Image::from_rgba(width, height, data)?),
        ImagePayload::Png { data } => {
            let decoded = image::load_from_memory_with_format(&data, image::ImageFormat::Png)
                .map_err(|e| Error::ImageDecode(e.to_string()))?
                .to_rgba8();
            let (width, height) = decoded.dimensions();
            Ok(Image::from_rgba(width, height, decoded.into_raw())?)
        }
        other => Err(Error::UnsupportedImage(other.encoding())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, rgba: [u8; 4]) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba(rgba));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, image::ImageFormat::Png).unwrap();
        out.into_inner()
    }

    #[test]
    fn test_decode_raw_image() {
        let value = decode_observation(Observation::Image(ImagePayload::Raw {
            width: 2,
            height: 1,
            data: vec![255, 0, 0, 255, 0, 255, 0, 255],
        }))
        .unwrap();

        let image = value.as_image().unwrap();
        assert_eq!((image.width(), image.height()), (2, 1));
        assert_eq!(image.pixel(1, 0), Some([0, 255, 0, 255]));
    }

    #[test]
    fn test_raw_image_wrong_size() {
        let err = decode_image(ImagePayload::Raw {
            width: 4,
            height: 4,
            data: vec![0; 10],
        })
        .unwrap_err();
        assert!(matches!(err, Error::Core(_)));
    }

    #[test]
    fn test_decode_png_image() {
        let image = decode_image(ImagePayload::Png {
            data: png_bytes(3, 2, [10, 20, 30, 255]),
        })
        .unwrap();
        assert_eq!((image.width(), image.height()), (3, 2));
        assert_eq!(image.pixel(2, 1), Some([10, 20, 30, 255]));
    }

    #[test]
    fn test_corrupt_png() {
        let err = decode_image(ImagePayload::Png {
            data: vec![1, 2, 3],
        })
        .unwrap_err();
        assert!(matches!(err, Error::ImageDecode(_)));
    }

    #[test]
    fn test_jpeg_unsupported() {
        let err = decode_image(ImagePayload::Jpeg { data: vec![0xFF, 0xD8] }).unwrap_err();
        assert!(matches!(err, Error::UnsupportedImage("jpeg")));
    }

    #[test]
    fn test_scalar_observations() {
        assert_eq!(
            decode_observation(Observation::Reward(1.5)).unwrap(),
            ComponentValue::Reward(1.5)
        );
        assert_eq!(
            decode_observation(Observation::Position { x: 3.0, y: -1.0 }).unwrap(),
            ComponentValue::Position(Vec2::new(3.0, -1.0))
        );
        assert_eq!(
            decode_observation(Observation::Rotation(0.5)).unwrap(),
            ComponentValue::Rotation(0.5)
        );
    }
}
