/// L2 norm of `v`, with an all-zero vector reported as 1.0 so callers can
/// divide unconditionally.
pub fn l2_norm(v: &[f32]) -> f32 {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 && norm.is_finite() { norm } else { 1.0 }
}

/// Scale `v` in place to unit length. The zero vector stays zero.
pub fn l2_normalize(v: &mut [f32]) {
    let norm = l2_norm(v);
    for x in v.iter_mut() { *x /= norm; }
}

pub fn normalized(mut v: Vec<f32>) -> Vec<f32> {
    l2_normalize(&mut v);
    v
}

/// Inner product; equals cosine similarity for unit vectors.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
