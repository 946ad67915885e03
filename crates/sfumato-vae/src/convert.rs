//! Latent and pixel conversions at the decoder boundary.

use sfumato_core::{Tensor, TensorError, TensorView};

/// Factor the VAE encoder multiplies latents by.
pub const VAE_SCALING_FACTOR: f32 = 0.18215;

/// Undoes the encoder scaling so the decoder sees raw latents.
pub fn unscale_latent(latent: &mut Tensor) {
    latent.scale(1.0 / VAE_SCALING_FACTOR);
    latent.quantize();
}

/// Maps a decoder value in `[-1, 1]` to a byte, clamping out-of-range values.
#[inline]
pub fn to_byte(v: f32) -> u8 {
    if v.is_nan() {
        return 0;
    }
    (((v + 1.0) * 0.5).clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Converts a `[1, C ≥ 3, H, W]` image to interleaved RGBA bytes.
///
/// Channels past the third are ignored; alpha is opaque.
pub fn to_rgba8(image: &Tensor) -> Result<Vec<u8>, TensorError> {
    let v = TensorView::new(image)?;
    let s = v.shape();
    if s.n != 1 || s.c < 3 {
        return Err(TensorError::invalid_shape(
            &s.dims(),
            "expected a single image with at least 3 channels",
        ));
    }

    let mut out = Vec::with_capacity(s.h * s.w * 4);
    for y in 0..s.h {
        let (r, g, b) = (v.row(0, 0, y, 0, s.w), v.row(0, 1, y, 0, s.w), v.row(0, 2, y, 0, s.w));
        for x in 0..s.w {
            out.extend_from_slice(&[to_byte(r[x]), to_byte(g[x]), to_byte(b[x]), u8::MAX]);
        }
    }
    Ok(out)
}
