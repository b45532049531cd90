//! Vector similarity kernels
//!
//! Loops are unrolled by 4; the corpus vectors are 384-wide.

pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let mut sum = 0.0;
    let mut i = 0;

    while i + 3 < n {
        sum += a[i] * b[i] + a[i + 1] * b[i + 1] + a[i + 2] * b[i + 2] + a[i + 3] * b[i + 3];
        i += 4;
    }

    while i < n {
        sum += a[i] * b[i];
        i += 1;
    }

    sum
}

pub fn magnitude(v: &[f32]) -> f32 {
    dot(v, v).sqrt()
}

/// `dot(a, b) / (|a| * |b|)`, with precomputed magnitudes when the caller has
/// them.
///
/// Vectors of different length, or with a zero magnitude, score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32], mag_a: Option<f32>, mag_b: Option<f32>) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let ma = mag_a.unwrap_or_else(|| magnitude(a));
    let mb = mag_b.unwrap_or_else(|| magnitude(b));
    if ma == 0.0 || mb == 0.0 {
        return 0.0;
    }

    let score = dot(a, b) / (ma * mb);
    if score.is_finite() {
        score
    } else {
        0.0
    }
}
