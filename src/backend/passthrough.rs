// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Passthrough engine.
//!
//! Takes the place of the native LCEVC SDK binding: the engine is built from the same parameter
//! list the SDK expects, checks each frame against the image description and hands back the
//! input bytes unchanged.

use crate::encoder::EncodedResult;
use crate::encoder::EncoderEngine;
use crate::encoder::EncodingConfiguration;
use crate::encoder::EngineError;
use crate::encoder::EngineFactory;
use crate::encoder::EngineResult;
use crate::encoder::RawFrame;
use crate::format::ImageDescriptor;
use crate::params::ParamValue;

/// Builds the parameter list of an SDK encoder instance for `descriptor` and `config`.
///
/// The SDK counts levels of quality from the top, so its LOQ0 is our second step width.
pub fn sdk_parameters(
    descriptor: &ImageDescriptor,
    config: &EncodingConfiguration,
) -> Vec<(&'static str, ParamValue)> {
    let resolution = descriptor.resolution();

    vec![
        ("qp", config.qp.into()),
        ("base_encoder", config.base_codec.to_string().into()),
        ("encoding_transform_type", config.transform_type.to_string().into()),
        ("priority_mode", config.priority_mode.to_string().into()),
        ("temporal_enabled", config.temporal_enabled.into()),
        ("enhancement", config.enhancement_enabled.into()),
        ("base_depth", config.base_depth.into()),
        ("cq_step_width_loq_1", config.step_widths[0].into()),
        ("cq_step_width_loq_0", config.step_widths[1].into()),
        ("fps", config.fps.into()),
        ("width", resolution.width.into()),
        ("height", resolution.height.into()),
    ]
}

pub struct PassthroughEngine {
    descriptor: ImageDescriptor,
    parameters: Vec<(&'static str, ParamValue)>,
}

impl PassthroughEngine {
    /// Creates an engine for `descriptor`. The enhancement depth of `config` must be able to
    /// carry the input samples.
    pub fn new(descriptor: &ImageDescriptor, config: &EncodingConfiguration) -> EngineResult<Self> {
        let input_depth = descriptor
            .format()
            .bit_depth()
            .ok_or(EngineError::UnsupportedFormat)?;

        if config.enhancement_depth < input_depth {
            return Err(EngineError::InvalidConfiguration(format!(
                "enhancement depth {} is lower than the input depth {}",
                config.enhancement_depth, input_depth
            )));
        }

        let parameters = sdk_parameters(descriptor, config);
        log::debug!("passthrough: creating encoder with {:?}", parameters);

        Ok(Self {
            descriptor: *descriptor,
            parameters,
        })
    }

    /// Parameters the engine was built with.
    pub fn parameters(&self) -> &[(&'static str, ParamValue)] {
        &self.parameters
    }
}

impl EncoderEngine for PassthroughEngine {
    fn encode(&mut self, frame: &RawFrame) -> EngineResult<EncodedResult> {
        self.descriptor
            .validate_frame(&frame.data, &frame.layout)
            .map_err(EngineError::InvalidFrame)?;

        // A raw copy never references other frames.
        Ok(EncodedResult {
            payload: frame.data.to_vec(),
            is_keyframe: true,
        })
    }
}

/// Creates [`PassthroughEngine`]s.
#[derive(Clone, Debug, Default)]
pub struct PassthroughFactory;

impl EngineFactory for PassthroughFactory {
    fn name(&self) -> &'static str {
        "passthrough"
    }

    fn create_engine(
        &mut self,
        descriptor: &ImageDescriptor,
        config: &EncodingConfiguration,
    ) -> EngineResult<Box<dyn EncoderEngine>> {
        Ok(Box::new(PassthroughEngine::new(descriptor, config)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::tests::gen_test_frame;
    use crate::format::HostVideoFormat;
    use crate::format::VideoInfo;
    use crate::params::Settings;
    use crate::Fraction;

    fn descriptor(format: HostVideoFormat) -> ImageDescriptor {
        let info = VideoInfo::new(format, 320, 240, Fraction::new(25, 1));
        ImageDescriptor::try_from(&info).unwrap()
    }

    #[test]
    fn parameter_keys() {
        let mut settings = Settings::default();
        settings.set("step-width-loq1", 4000u32).unwrap();
        settings.set("step-width-loq2", 800u32).unwrap();
        settings.set("transform-type", "dd").unwrap();
        let config = EncodingConfiguration::from(&settings);

        let params = sdk_parameters(&descriptor(HostVideoFormat::I420), &config);
        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(params.len(), 12);
        assert_eq!(get("cq_step_width_loq_1"), ParamValue::UInt(4000));
        assert_eq!(get("cq_step_width_loq_0"), ParamValue::UInt(800));
        assert_eq!(get("encoding_transform_type"), ParamValue::Str("dd".into()));
        assert_eq!(get("base_encoder"), ParamValue::Str("hevc".into()));
        assert_eq!(get("priority_mode"), ParamValue::Str("mode_2_0".into()));
        assert_eq!(get("enhancement"), ParamValue::Bool(true));
        assert_eq!(get("width"), ParamValue::UInt(320));
        assert_eq!(get("height"), ParamValue::UInt(240));
    }

    #[test]
    fn engine_keeps_its_parameters() {
        let mut settings = Settings::default();
        settings.set("qp", 17u32).unwrap();
        settings.set("base-encoder", "avc").unwrap();
        let config = EncodingConfiguration::from(&settings);
        let descriptor = descriptor(HostVideoFormat::Y444);

        let engine = PassthroughEngine::new(&descriptor, &config).unwrap();
        assert_eq!(engine.parameters(), &sdk_parameters(&descriptor, &config)[..]);
        assert!(engine
            .parameters()
            .contains(&("base_encoder", ParamValue::Str("avc".into()))));
        assert!(engine.parameters().contains(&("qp", ParamValue::UInt(17))));
    }

    #[test]
    fn copies_frames() {
        let _ = env_logger::try_init();

        for format in [HostVideoFormat::Y42B, HostVideoFormat::I422_10LE] {
            let descriptor = descriptor(format);
            let mut engine = PassthroughFactory
                .create_engine(&descriptor, &Default::default())
                .unwrap();

            let data = gen_test_frame(&descriptor, 3);
            let frame = RawFrame::packed(&descriptor, 0, data.clone());
            let result = engine.encode(&frame).unwrap();

            assert_eq!(result.payload, data);
            assert!(result.is_keyframe);
        }
    }

    #[test]
    fn rejects_short_frame() {
        let descriptor = descriptor(HostVideoFormat::Y444);
        let mut engine = PassthroughFactory
            .create_engine(&descriptor, &Default::default())
            .unwrap();

        let frame = RawFrame::packed(&descriptor, 0, vec![0u8; 16]);
        assert!(matches!(
            engine.encode(&frame),
            Err(EngineError::InvalidFrame(_))
        ));
    }

    #[test]
    fn enhancement_depth_must_cover_input() {
        let mut settings = Settings::default();
        settings.set("enhancement-depth", 8u32).unwrap();
        let config = EncodingConfiguration::from(&settings);

        assert!(PassthroughFactory
            .create_engine(&descriptor(HostVideoFormat::I420), &config)
            .is_ok());
        assert!(matches!(
            PassthroughFactory.create_engine(&descriptor(HostVideoFormat::I420_10LE), &config),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }
}
