//! Audio format encoders

#[cfg(feature = "wav")]
pub mod wav;
