#[derive(Clone, Copy, Debug)]
pub(crate) struct Fnv1a64(u64);

impl Fnv1a64 {
    pub(crate) const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01B3;

    pub(crate) fn new(seed: u64) -> Self {
        Self(seed)
    }

    pub(crate) fn write_u64(&mut self, v: u64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h ^= u64::from(b);
            h = h.wrapping_mul(Self::PRIME);
        }
        self.0 = h;
    }

    pub(crate) fn finish(self) -> u64 {
        self.0
    }
}

/// Stateless per-cell hash, stable across runs and dispatch modes.
pub(crate) fn hash_u32(seed: u64, x: u32, y: u32) -> u32 {
    let mut h = Fnv1a64::new(seed ^ Fnv1a64::OFFSET_BASIS);
    h.write_u64(u64::from(x));
    h.write_u64(u64::from(y));
    (h.finish() & 0xFFFF_FFFF) as u32
}

/// Per-cell value in `[0, 1)`.
pub(crate) fn hash_unit(seed: u64, x: u32, y: u32) -> f32 {
    // 24 bits fit the f32 mantissa exactly.
    (hash_u32(seed, x, y) >> 8) as f32 / (1u32 << 24) as f32
}

/// `⌈log2(n)⌉`, with `ceil_log2(0) == ceil_log2(1) == 0`.
pub(crate) fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        u32::BITS - (n - 1).leading_zeros()
    }
}

/// Clamp `value` into `[lo, hi]`; non-finite values fall back to `default`. Warns on change.
pub(crate) fn clamp_param(name: &'static str, value: f32, default: f32, lo: f32, hi: f32) -> f32 {
    if !value.is_finite() {
        tracing::warn!(
            param = name,
            value,
            fallback = default,
            "non-finite parameter, using default"
        );
        return default;
    }
    let clamped = value.clamp(lo, hi);
    if clamped != value {
        tracing::warn!(param = name, value, clamped, "parameter out of range, clamped");
    }
    clamped
}

pub(crate) fn clamp_scale(value: f32) -> f32 {
    clamp_param("distance_scale", value, 1.0, 1e-6, 1e6)
}

/// Mask threshold in `[0, 1]`; NaN becomes `0.5`.
pub(crate) fn unit_threshold(threshold: f32) -> f32 {
    if threshold.is_nan() {
        0.5
    } else {
        threshold.clamp(0.0, 1.0)
    }
}
