use image::imageops::FilterType;

use crate::error::{Result, StoreError};

/// 64-bit average hash (aHash) of the decoded pixels (spec §4.1: "perceptual
/// hash of the decoded pixels" — robust to the re-encoding that defeats a
/// plain byte-level sha256 comparison, which is the whole point of the
/// duplicate-upload middleware).
///
/// Algorithm: downscale to 8x8 grayscale, threshold each pixel against the
/// block's mean, pack the 64 bits in row-major order.
pub fn compute(bytes: &[u8]) -> Result<u64> {
    let img = image::load_from_memory(bytes).map_err(|e| StoreError::Decode(e.to_string()))?;
    let small = img.resize_exact(8, 8, FilterType::Triangle).to_luma8();
    let pixels: Vec<u32> = small.pixels().map(|p| p.0[0] as u32).collect();
    let avg = pixels.iter().sum::<u32>() / pixels.len() as u32;

    let mut hash: u64 = 0;
    for (i, &p) in pixels.iter().enumerate() {
        if p >= avg {
            hash |= 1 << i;
        }
    }
    Ok(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_jpeg(size: u32, value: u8) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(size, size, image::Rgb([value, value, value]));
        let mut buf = std::io::Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Jpeg)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn identical_images_hash_identically() {
        let a = compute(&solid_jpeg(32, 128)).unwrap();
        let b = compute(&solid_jpeg(32, 128)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn corrupt_bytes_fail_to_decode() {
        assert!(compute(b"not an image").is_err());
    }
}
