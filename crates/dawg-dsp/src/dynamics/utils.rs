//! Shared utilities for dynamics processors

/// Convert linear amplitude to decibels
#[inline]
pub(crate) fn amplitude_to_db(amp: f32) -> f32 {
    if amp <= 0.0 {
        -96.0 // Floor
    } else {
        20.0 * amp.log10()
    }
}

/// Calculate smoothing coefficient from time constant
#[inline]
pub(crate) fn time_to_coeff(time_seconds: f32, sample_rate: f64) -> f32 {
    if time_seconds <= 0.0 || sample_rate <= 0.0 {
        0.0
    } else {
        (-1.0 / (time_seconds * sample_rate as f32)).exp()
    }
}
