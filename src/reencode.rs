//! Linear quality descent against a size ceiling.
//!
//! Encoded size is not strictly monotonic in quality for every codec and
//! every image, so this is a plain walk downwards in fixed steps rather than
//! a bisection. The result is the first attempt under the ceiling, or the
//! last attempt made before the quality floor.

use anyhow::Result;
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::codec::Encoder;

/// Size ceiling and quality range for [`reencode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizePolicy {
    /// Output must be strictly smaller than this many bytes.
    pub max_size_bytes: u64,
    /// Quality of the first attempt.
    pub initial_quality: u8,
    /// No attempt is made below this quality.
    pub quality_floor: u8,
    /// Quality decrease between attempts.
    pub quality_step: u8,
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: 2 * 1024 * 1024,
            initial_quality: 85,
            quality_floor: 20,
            quality_step: 5,
        }
    }
}

impl SizePolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_size_bytes == 0 {
            anyhow::bail!("max_size_bytes must be greater than zero");
        }
        if self.quality_step == 0 {
            anyhow::bail!("quality_step must be greater than zero");
        }
        for (name, q) in [
            ("initial_quality", self.initial_quality),
            ("quality_floor", self.quality_floor),
        ] {
            if !(1..=100).contains(&q) {
                anyhow::bail!("{name} must be between 1 and 100, got {q}");
            }
        }
        Ok(())
    }
}

/// Whether the size ceiling was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SizeOutcome {
    Met,
    /// Best effort: the floor was reached with the output still too large.
    Unmet { target: u64 },
}

/// One encode of the descent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Attempt {
    pub quality: u8,
    pub size: u64,
}

/// Final bytes of a re-encode and how they were reached.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub format: ImageFormat,
    pub quality: u8,
    pub outcome: SizeOutcome,
    pub attempts: Vec<Attempt>,
}

impl EncodedImage {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn size_met(&self) -> bool {
        self.outcome == SizeOutcome::Met
    }
}

/// States of the quality descent.
#[derive(Debug)]
pub enum Descent {
    Trying(u8),
    Success(EncodedImage),
    FloorExhausted(EncodedImage),
}

/// Drives one [`Encoder`] through the [`Descent`] states.
pub struct Reencoder<'a, E: Encoder + ?Sized> {
    encoder: &'a E,
    exif: Option<&'a [u8]>,
    policy: &'a SizePolicy,
    attempts: Vec<Attempt>,
}

impl<'a, E: Encoder + ?Sized> Reencoder<'a, E> {
    pub fn new(encoder: &'a E, exif: Option<&'a [u8]>, policy: &'a SizePolicy) -> Self {
        Self {
            encoder,
            exif,
            policy,
            attempts: Vec::new(),
        }
    }

    pub fn start(&self) -> Descent {
        Descent::Trying(self.policy.initial_quality)
    }

    /// Advance one state. Terminal states are returned unchanged.
    pub fn step(&mut self, state: Descent) -> Result<Descent> {
        let quality = match state {
            Descent::Trying(q) => q,
            done => return Ok(done),
        };

        let bytes = self.encoder.encode(quality, self.exif)?;
        let size = bytes.len() as u64;
        self.attempts.push(Attempt { quality, size });
        log::debug!("Quality {quality}: {size} bytes");

        if size < self.policy.max_size_bytes {
            return Ok(Descent::Success(self.finish(bytes, quality, SizeOutcome::Met)));
        }

        match quality.checked_sub(self.policy.quality_step) {
            Some(next) if next >= self.policy.quality_floor => Ok(Descent::Trying(next)),
            _ => {
                let outcome = SizeOutcome::Unmet {
                    target: self.policy.max_size_bytes,
                };
                Ok(Descent::FloorExhausted(self.finish(bytes, quality, outcome)))
            }
        }
    }

    fn finish(&mut self, bytes: Vec<u8>, quality: u8, outcome: SizeOutcome) -> EncodedImage {
        EncodedImage {
            bytes,
            format: self.encoder.format(),
            quality,
            outcome,
            attempts: std::mem::take(&mut self.attempts),
        }
    }
}

/// Encode at decreasing quality until the output fits `policy`.
///
/// The first attempt is always made at `initial_quality`, even if that is
/// already below the floor. An unmet ceiling is not an error; check
/// [`EncodedImage::outcome`].
pub fn reencode<E: Encoder + ?Sized>(
    encoder: &E,
    exif: Option<&[u8]>,
    policy: &SizePolicy,
) -> Result<EncodedImage> {
    policy.validate()?;

    let mut machine = Reencoder::new(encoder, exif, policy);
    let mut state = machine.start();
    loop {
        state = match machine.step(state)? {
            Descent::Success(image) | Descent::FloorExhausted(image) => return Ok(image),
            next => next,
        };
    }
}
