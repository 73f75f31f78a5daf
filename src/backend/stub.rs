// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Stub engine.
//!
//! Does not compress anything: every frame produces the same short payload, and keyframes are
//! flagged according to a [`KeyframePolicy`]. Useful to exercise a pipeline without the native
//! LCEVC SDK.

use rand::rngs::StdRng;
use rand::Rng;
use rand::SeedableRng;

use crate::encoder::EncodedResult;
use crate::encoder::EncoderEngine;
use crate::encoder::EncodingConfiguration;
use crate::encoder::EngineError;
use crate::encoder::EngineFactory;
use crate::encoder::EngineResult;
use crate::encoder::RawFrame;
use crate::format::ImageDescriptor;

/// Payload returned for every frame.
pub const STUB_PAYLOAD: &[u8] = b"LCEVC";

/// How the stub engine flags keyframes.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum KeyframePolicy {
    /// Each frame is a keyframe with probability `1 / one_in`.
    Random { one_in: u32 },
    /// Every `n`th frame is a keyframe, starting with the first one.
    Interval(u32),
}

impl Default for KeyframePolicy {
    fn default() -> Self {
        KeyframePolicy::Random { one_in: 30 }
    }
}

pub struct StubEngine {
    policy: KeyframePolicy,
    rng: StdRng,
    /// Number of frames encoded so far
    frames: u64,
    keyframes: u64,
}

impl StubEngine {
    fn is_keyframe(&mut self) -> bool {
        match self.policy {
            KeyframePolicy::Random { one_in } => self.rng.gen_range(0..one_in) == 0,
            KeyframePolicy::Interval(n) => self.frames % u64::from(n) == 0,
        }
    }
}

impl EncoderEngine for StubEngine {
    fn encode(&mut self, frame: &RawFrame) -> EngineResult<EncodedResult> {
        log::trace!("stub: encoding frame timestamp={}", frame.timestamp);

        let is_keyframe = self.is_keyframe();
        self.frames += 1;
        if is_keyframe {
            self.keyframes += 1;
        }

        Ok(EncodedResult {
            payload: STUB_PAYLOAD.to_vec(),
            is_keyframe,
        })
    }
}

impl Drop for StubEngine {
    fn drop(&mut self) {
        log::debug!(
            "stub: cleaning up encoder after {} frames ({} keyframes)",
            self.frames,
            self.keyframes
        );
    }
}

/// Creates [`StubEngine`]s.
#[derive(Clone, Debug, Default)]
pub struct StubFactory {
    policy: KeyframePolicy,
    /// Seed of the keyframe draws. Taken from the OS when `None`.
    seed: Option<u64>,
}

impl StubFactory {
    pub fn new() -> Self {
        Default::default()
    }

    /// Creates a factory whose engines all draw keyframes from the same reproducible sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..Default::default()
        }
    }

    pub fn with_policy(mut self, policy: KeyframePolicy) -> Self {
        self.policy = policy;
        self
    }
}

impl EngineFactory for StubFactory {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn create_engine(
        &mut self,
        descriptor: &ImageDescriptor,
        config: &EncodingConfiguration,
    ) -> EngineResult<Box<dyn EncoderEngine>> {
        let period = match self.policy {
            KeyframePolicy::Random { one_in } => one_in,
            KeyframePolicy::Interval(n) => n,
        };
        if period == 0 {
            return Err(EngineError::InvalidConfiguration(format!(
                "invalid keyframe policy {:?}",
                self.policy
            )));
        }

        log::debug!(
            "stub: initializing encoder with bitrate={}, quality={:.2}, two-pass={}",
            config.bitrate,
            config.quality,
            config.two_pass
        );
        log::debug!(
            "stub: configuring encoder: {}x{}, format={}, layers={}",
            descriptor.resolution().width,
            descriptor.resolution().height,
            descriptor.format(),
            config.enhancement_layers
        );

        let rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        Ok(Box::new(StubEngine {
            policy: self.policy,
            rng,
            frames: 0,
            keyframes: 0,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::HostVideoFormat;
    use crate::format::VideoInfo;
    use crate::Fraction;

    fn descriptor() -> ImageDescriptor {
        let info = VideoInfo::new(HostVideoFormat::I420, 1920, 1080, Fraction::new(30, 1));
        ImageDescriptor::try_from(&info).unwrap()
    }

    fn frame(descriptor: &ImageDescriptor, timestamp: u64) -> RawFrame {
        RawFrame::packed(descriptor, timestamp, vec![0u8; descriptor.packed_size()])
    }

    #[test]
    fn random_keyframes() {
        let _ = env_logger::try_init();

        let descriptor = descriptor();
        let mut factory = StubFactory::with_seed(0x4c43_4556);
        let mut engine = factory
            .create_engine(&descriptor, &Default::default())
            .unwrap();
        let frame = frame(&descriptor, 0);

        let mut keyframes = 0;
        for _ in 0..3000 {
            let result = engine.encode(&frame).unwrap();
            assert_eq!(result.payload, STUB_PAYLOAD);
            if result.is_keyframe {
                keyframes += 1;
            }
        }

        // 100 expected, the bounds are four standard deviations away.
        assert!((60..=140).contains(&keyframes), "{keyframes} keyframes");
    }

    #[test]
    fn seeded_engines_agree() {
        let descriptor = descriptor();
        let mut factory = StubFactory::with_seed(7);
        let mut a = factory
            .create_engine(&descriptor, &Default::default())
            .unwrap();
        let mut b = factory
            .create_engine(&descriptor, &Default::default())
            .unwrap();
        let frame = frame(&descriptor, 0);

        for _ in 0..300 {
            assert_eq!(
                a.encode(&frame).unwrap().is_keyframe,
                b.encode(&frame).unwrap().is_keyframe
            );
        }
    }

    #[test]
    fn interval_keyframes() {
        let descriptor = descriptor();
        let mut factory = StubFactory::new().with_policy(KeyframePolicy::Interval(10));
        let mut engine = factory
            .create_engine(&descriptor, &Default::default())
            .unwrap();

        let keyframes: Vec<u64> = (0..35)
            .filter(|&ts| engine.encode(&frame(&descriptor, ts)).unwrap().is_keyframe)
            .collect();
        assert_eq!(keyframes, vec![0, 10, 20, 30]);
    }

    #[test]
    fn zero_period_is_refused() {
        let descriptor = descriptor();

        for policy in [
            KeyframePolicy::Interval(0),
            KeyframePolicy::Random { one_in: 0 },
        ] {
            let mut factory = StubFactory::new().with_policy(policy);
            assert!(matches!(
                factory.create_engine(&descriptor, &Default::default()),
                Err(EngineError::InvalidConfiguration(_))
            ));
        }
    }
}
