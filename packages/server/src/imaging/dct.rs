//! 64-bit perceptual hash over the low DCT frequencies of a 32x32 gray image.

use image::DynamicImage;
use image::imageops::FilterType;

const DCT_SIZE: usize = 32;

/// Hash as 8 big-endian bytes, plus the 64 coefficients it was derived from.
pub fn perceptual_hash0(img: &DynamicImage) -> ([u8; 8], Vec<f32>) {
    let gray = img
        .resize_exact(DCT_SIZE as u32, DCT_SIZE as u32, FilterType::Lanczos3)
        .to_luma8();

    let mut rows: Vec<Vec<f64>> = (0..DCT_SIZE)
        .map(|y| {
            (0..DCT_SIZE)
                .map(|x| f64::from(gray.get_pixel(x as u32, y as u32).0[0]) - 128.0)
                .collect()
        })
        .collect();
    dct2d(&mut rows);

    let (hash, inputs) = phash0(&rows);
    (hash.to_be_bytes(), inputs.into_iter().map(|v| v as f32).collect())
}

fn phash0(vals: &[Vec<f64>]) -> (u64, Vec<f64>) {
    let mut inputs = Vec::with_capacity(64);
    for row in &vals[1..9] {
        inputs.extend_from_slice(&row[1..9]);
    }

    let mut sorted = inputs.clone();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    let median = (sorted[mid - 1] + sorted[mid]) / 2.0;

    let hash = inputs
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > median)
        .fold(0u64, |h, (i, _)| h | (1 << i));
    (hash, inputs)
}

fn dct2d(s: &mut [Vec<f64>]) {
    for row in s.iter_mut() {
        *row = dct(row);
    }
    transpose(s);
    for row in s.iter_mut() {
        *row = dct(row);
    }
    transpose(s);
}

fn transpose(s: &mut [Vec<f64>]) {
    for i in 0..s.len() {
        for k in i + 1..s.len() {
            let tmp = s[i][k];
            s[i][k] = s[k][i];
            s[k][i] = tmp;
        }
    }
}

fn dct(s: &[f64]) -> Vec<f64> {
    let n = s.len() as f64;
    (0..s.len())
        .map(|k| {
            let sum: f64 = s
                .iter()
                .enumerate()
                .map(|(i, v)| {
                    v * ((2.0 * i as f64 + 1.0) * k as f64 * std::f64::consts::PI / (2.0 * n)).cos()
                })
                .sum();
            let c = if k == 0 { std::f64::consts::FRAC_1_SQRT_2 } else { 1.0 };
            sum * (2.0 / n).sqrt() * c
        })
        .collect()
}

/// Number of differing bits between two hashes.
pub fn hamming_distance(a: u64, b: u64) -> u32 {
    (a ^ b).count_ones()
}
