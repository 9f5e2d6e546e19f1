//! Images and configuration generated in memory.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use imghost_core::config::ImageHostConfig;
use imghost_core::Config;
use std::collections::HashMap;
use std::io::Cursor;

pub const JWT_SECRET: &str = "test-secret-that-is-at-least-32-characters";
pub const ADMIN: &str = "root";
pub const ADMIN_PASSWORD: &str = "correct horse battery staple";

/// Textured pixels so encoders cannot collapse the image to nothing.
pub fn textured(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let n = (x.wrapping_mul(7919) ^ y.wrapping_mul(104_729)).wrapping_mul(2_654_435_761);
        Rgb([(n >> 24) as u8, (x % 256) as u8, (y % 256) as u8])
    })
}

/// A smooth gradient with one noisy 8×8 block in every `noisy_every` blocks.
///
/// The share of noisy blocks steers how large a JPEG of the image gets.
pub fn patchy(width: u32, height: u32, noisy_every: u32) -> RgbImage {
    let noise = textured(width, height);
    RgbImage::from_fn(width, height, |x, y| {
        let (bx, by) = (x / 8, y / 8);
        if (bx + by * 7) % noisy_every == 0 {
            *noise.get_pixel(x, y)
        } else {
            Rgb([
                (x * 255 / width.max(1)) as u8,
                (y * 255 / height.max(1)) as u8,
                128,
            ])
        }
    })
}

fn encode_jpeg(image: &RgbImage, quality: u8) -> Vec<u8> {
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality)
        .encode_image(image)
        .unwrap();
    out
}

pub fn jpeg(width: u32, height: u32, quality: u8) -> Vec<u8> {
    encode_jpeg(&textured(width, height), quality)
}

/// A JPEG whose encoded length falls in `min_len..=max_len`.
///
/// Varies the noisy share at high quality until one fits.
pub fn jpeg_sized(width: u32, height: u32, min_len: usize, max_len: usize) -> Vec<u8> {
    for noisy_every in [16, 8, 32, 64, 4, 128, 2] {
        let image = patchy(width, height, noisy_every);
        for quality in [92, 88] {
            let data = encode_jpeg(&image, quality);
            if (min_len..=max_len).contains(&data.len()) {
                return data;
            }
        }
    }
    panic!(
        "no {}x{} JPEG between {} and {} bytes",
        width, height, min_len, max_len
    );
}

pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    DynamicImage::ImageRgb8(textured(width, height))
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .unwrap();
    out
}

/// A valid config, with `overrides` applied on top of the test defaults.
pub fn test_config(overrides: &[(&str, &str)]) -> Config {
    let mut vars: HashMap<String, String> = [
        ("DATABASE_URL", "postgres://localhost/imghost_test"),
        ("JWT_SECRET", JWT_SECRET),
        ("DEFAULT_ADMIN", ADMIN),
        ("ADMIN_PASSWORD", ADMIN_PASSWORD),
        ("STORAGE_BACKEND", "local"),
        ("RATE_LIMIT_PER_MINUTE", "1000"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }

    let config = ImageHostConfig::from_lookup(|key| vars.get(key).cloned()).unwrap();
    Config(Box::new(config))
}
