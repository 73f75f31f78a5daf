// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Tunable parameters of the encoder element.
//!
//! Parameters are addressed by name, carry their range in a [`ParamSpec`] and are validated when
//! set. A value outside of its range is refused and the previously stored value is kept.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_QP: u32 = 28;
pub const DEFAULT_BASE_QP: u32 = 28;
pub const DEFAULT_STEP_WIDTH_LOQ1: u32 = 32767;
pub const DEFAULT_STEP_WIDTH_LOQ2: u32 = 1500;
pub const DEFAULT_BASE_ENCODER: BaseCodec = BaseCodec::Hevc;
pub const DEFAULT_TRANSFORM_TYPE: TransformType = TransformType::Dds;
pub const DEFAULT_PRIORITY_MODE: PriorityMode = PriorityMode { major: 2, minor: 0 };
pub const DEFAULT_TEMPORAL_ENABLED: bool = true;
pub const DEFAULT_ENHANCEMENT_ENABLED: bool = true;
pub const DEFAULT_BASE_DEPTH: u32 = 10;
pub const DEFAULT_ENHANCEMENT_DEPTH: u32 = 10;
pub const DEFAULT_FPS: u32 = 30;
pub const DEFAULT_BITRATE: i32 = 2000;
pub const DEFAULT_QUALITY: f32 = 0.8;
pub const DEFAULT_ENHANCEMENT_LAYERS: i32 = 2;
pub const DEFAULT_TWO_PASS: bool = false;

/// Codec of the base layer the enhancement is applied on top of.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BaseCodec {
    Avc,
    Hevc,
    Vvc,
    Evc,
}

impl FromStr for BaseCodec {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "avc" | "h264" => Ok(Self::Avc),
            "hevc" | "h265" => Ok(Self::Hevc),
            "vvc" | "h266" => Ok(Self::Vvc),
            "evc" => Ok(Self::Evc),
            _ => Err("unrecognized base codec. Valid values: avc, hevc, vvc, evc"),
        }
    }
}

impl fmt::Display for BaseCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Avc => "avc",
            Self::Hevc => "hevc",
            Self::Vvc => "vvc",
            Self::Evc => "evc",
        })
    }
}

/// Residual transform of the enhancement layer: 2x2 directional decomposition (`dd`) or 4x4
/// directional decomposition squared (`dds`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum TransformType {
    Dd,
    Dds,
}

impl FromStr for TransformType {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dd" => Ok(Self::Dd),
            "dds" => Ok(Self::Dds),
            _ => Err("unrecognized transform type. Valid values: dd, dds"),
        }
    }
}

impl fmt::Display for TransformType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Dd => "dd",
            Self::Dds => "dds",
        })
    }
}

/// Priority map mode, written `mode_<major>_<minor>`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct PriorityMode {
    pub major: u8,
    pub minor: u8,
}

impl FromStr for PriorityMode {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const ERR: &str = "unrecognized priority mode. Expected mode_<major>_<minor>";

        let digit = |part: &str| match part.as_bytes() {
            [d @ b'0'..=b'9'] => Ok(d - b'0'),
            _ => Err(ERR),
        };

        let mut parts = s.strip_prefix("mode_").ok_or(ERR)?.split('_');
        let (Some(major), Some(minor), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ERR);
        };

        Ok(Self {
            major: digit(major)?,
            minor: digit(minor)?,
        })
    }
}

impl fmt::Display for PriorityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mode_{}_{}", self.major, self.minor)
    }
}

/// A parameter value as exchanged with the host.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamValue {
    UInt(u32),
    Int(i32),
    Float(f32),
    Bool(bool),
    Str(String),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UInt(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Bool(v) => write!(f, "{v}"),
            Self::Str(v) => write!(f, "\"{v}\""),
        }
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::UInt(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

/// Type and range of a parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum ParamKind {
    UInt { min: u32, max: u32, default: u32 },
    Int { min: i32, max: i32, default: i32 },
    Float { min: f32, max: f32, default: f32 },
    Bool { default: bool },
    /// Free form string, validated by the parameter's parser.
    Str { default: &'static str },
}

impl ParamKind {
    fn type_name(&self) -> &'static str {
        match self {
            Self::UInt { .. } => "uint",
            Self::Int { .. } => "int",
            Self::Float { .. } => "float",
            Self::Bool { .. } => "bool",
            Self::Str { .. } => "string",
        }
    }
}

/// Description of a parameter, as advertised to the host.
#[derive(Clone, Debug, PartialEq)]
pub struct ParamSpec {
    pub name: &'static str,
    pub nick: &'static str,
    pub blurb: &'static str,
    pub kind: ParamKind,
}

#[derive(Debug, Error, PartialEq)]
pub enum ParamError {
    #[error("unknown parameter {0}")]
    UnknownParameter(String),
    #[error("parameter {name} expects a {expected} value, got {value}")]
    TypeMismatch {
        name: &'static str,
        expected: &'static str,
        value: ParamValue,
    },
    #[error("value {value} of parameter {name} is out of range [{min}, {max}]")]
    OutOfRange {
        name: &'static str,
        value: String,
        min: String,
        max: String,
    },
    #[error("invalid value {value} for parameter {name}: {reason}")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: &'static str,
    },
}

impl ParamSpec {
    pub fn default_value(&self) -> ParamValue {
        match self.kind {
            ParamKind::UInt { default, .. } => ParamValue::UInt(default),
            ParamKind::Int { default, .. } => ParamValue::Int(default),
            ParamKind::Float { default, .. } => ParamValue::Float(default),
            ParamKind::Bool { default } => ParamValue::Bool(default),
            ParamKind::Str { default } => ParamValue::Str(default.to_string()),
        }
    }

    /// Checks `value` against the type and range of the parameter. Integer values are accepted
    /// for both signed and unsigned parameters as long as they fit in the range. Returns the
    /// value converted to the parameter's own type.
    pub fn check(&self, value: ParamValue) -> Result<ParamValue, ParamError> {
        let out_of_range = |value: &dyn fmt::Display, min: &dyn fmt::Display, max: &dyn fmt::Display| {
            ParamError::OutOfRange {
                name: self.name,
                value: value.to_string(),
                min: min.to_string(),
                max: max.to_string(),
            }
        };

        let integer = match &value {
            ParamValue::UInt(v) => Some(i64::from(*v)),
            ParamValue::Int(v) => Some(i64::from(*v)),
            _ => None,
        };

        match (&self.kind, integer, value) {
            (ParamKind::UInt { min, max, .. }, Some(v), _) => {
                if v < i64::from(*min) || v > i64::from(*max) {
                    return Err(out_of_range(&v, min, max));
                }
                Ok(ParamValue::UInt(v as u32))
            }
            (ParamKind::Int { min, max, .. }, Some(v), _) => {
                if v < i64::from(*min) || v > i64::from(*max) {
                    return Err(out_of_range(&v, min, max));
                }
                Ok(ParamValue::Int(v as i32))
            }
            (ParamKind::Float { min, max, .. }, _, ParamValue::Float(v)) => {
                // NaN fails both comparisons, so test for containment.
                if !(*min..=*max).contains(&v) {
                    return Err(out_of_range(&v, min, max));
                }
                Ok(ParamValue::Float(v))
            }
            (ParamKind::Bool { .. }, _, ParamValue::Bool(v)) => Ok(ParamValue::Bool(v)),
            (ParamKind::Str { .. }, _, ParamValue::Str(v)) => Ok(ParamValue::Str(v)),
            (kind, _, value) => Err(ParamError::TypeMismatch {
                name: self.name,
                expected: kind.type_name(),
                value,
            }),
        }
    }
}

/// All the parameters of the element.
pub static PARAMS: [ParamSpec; 16] = [
    ParamSpec {
        name: "qp",
        nick: "QP",
        blurb: "Quantization parameter",
        kind: ParamKind::UInt {
            min: 0,
            max: 51,
            default: DEFAULT_QP,
        },
    },
    ParamSpec {
        name: "base-qp",
        nick: "Base QP",
        blurb: "Base encoder QP",
        kind: ParamKind::UInt {
            min: 0,
            max: 51,
            default: DEFAULT_BASE_QP,
        },
    },
    ParamSpec {
        name: "step-width-loq1",
        nick: "Step Width LOQ1",
        blurb: "Step width for level 1",
        kind: ParamKind::UInt {
            min: 200,
            max: 32767,
            default: DEFAULT_STEP_WIDTH_LOQ1,
        },
    },
    ParamSpec {
        name: "step-width-loq2",
        nick: "Step Width LOQ2",
        blurb: "Step width for level 2",
        kind: ParamKind::UInt {
            min: 200,
            max: 32767,
            default: DEFAULT_STEP_WIDTH_LOQ2,
        },
    },
    ParamSpec {
        name: "base-encoder",
        nick: "Base Encoder",
        blurb: "Base codec (avc, hevc, vvc, evc)",
        kind: ParamKind::Str { default: "hevc" },
    },
    ParamSpec {
        name: "transform-type",
        nick: "Transform Type",
        blurb: "Transform type (dd, dds)",
        kind: ParamKind::Str { default: "dds" },
    },
    ParamSpec {
        name: "priority-mode",
        nick: "Priority Mode",
        blurb: "Priority map mode (mode_<major>_<minor>)",
        kind: ParamKind::Str {
            default: "mode_2_0",
        },
    },
    ParamSpec {
        name: "temporal-enabled",
        nick: "Temporal Enabled",
        blurb: "Enable temporal prediction",
        kind: ParamKind::Bool {
            default: DEFAULT_TEMPORAL_ENABLED,
        },
    },
    ParamSpec {
        name: "enhancement-enabled",
        nick: "Enhancement Enabled",
        blurb: "Enable enhancement layers",
        kind: ParamKind::Bool {
            default: DEFAULT_ENHANCEMENT_ENABLED,
        },
    },
    ParamSpec {
        name: "base-depth",
        nick: "Base Depth",
        blurb: "Base bit depth",
        kind: ParamKind::UInt {
            min: 8,
            max: 14,
            default: DEFAULT_BASE_DEPTH,
        },
    },
    ParamSpec {
        name: "enhancement-depth",
        nick: "Enhancement Depth",
        blurb: "Enhancement bit depth",
        kind: ParamKind::UInt {
            min: 8,
            max: 14,
            default: DEFAULT_ENHANCEMENT_DEPTH,
        },
    },
    ParamSpec {
        name: "fps",
        nick: "FPS",
        blurb: "Frame rate",
        kind: ParamKind::UInt {
            min: 1,
            max: 120,
            default: DEFAULT_FPS,
        },
    },
    ParamSpec {
        name: "bitrate",
        nick: "Bitrate",
        blurb: "Target bitrate in kbps",
        kind: ParamKind::Int {
            min: 100,
            max: 50000,
            default: DEFAULT_BITRATE,
        },
    },
    ParamSpec {
        name: "quality",
        nick: "Quality",
        blurb: "Encoding quality (0.0 - 1.0)",
        kind: ParamKind::Float {
            min: 0.0,
            max: 1.0,
            default: DEFAULT_QUALITY,
        },
    },
    ParamSpec {
        name: "enhancement-layers",
        nick: "Enhancement Layers",
        blurb: "Number of LCEVC enhancement layers",
        kind: ParamKind::Int {
            min: 1,
            max: 4,
            default: DEFAULT_ENHANCEMENT_LAYERS,
        },
    },
    ParamSpec {
        name: "two-pass",
        nick: "Two Pass",
        blurb: "Enable two-pass encoding",
        kind: ParamKind::Bool {
            default: DEFAULT_TWO_PASS,
        },
    },
];

/// Looks up the [`ParamSpec`] of parameter `name`.
pub fn find_param(name: &str) -> Option<&'static ParamSpec> {
    PARAMS.iter().find(|spec| spec.name == name)
}

/// Current values of all the parameters. Every stored value has passed [`ParamSpec::check`].
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub(crate) qp: u32,
    pub(crate) base_qp: u32,
    pub(crate) step_width_loq1: u32,
    pub(crate) step_width_loq2: u32,
    pub(crate) base_encoder: BaseCodec,
    pub(crate) transform_type: TransformType,
    pub(crate) priority_mode: PriorityMode,
    pub(crate) temporal_enabled: bool,
    pub(crate) enhancement_enabled: bool,
    pub(crate) base_depth: u32,
    pub(crate) enhancement_depth: u32,
    pub(crate) fps: u32,
    pub(crate) bitrate: i32,
    pub(crate) quality: f32,
    pub(crate) enhancement_layers: i32,
    pub(crate) two_pass: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            qp: DEFAULT_QP,
            base_qp: DEFAULT_BASE_QP,
            step_width_loq1: DEFAULT_STEP_WIDTH_LOQ1,
            step_width_loq2: DEFAULT_STEP_WIDTH_LOQ2,
            base_encoder: DEFAULT_BASE_ENCODER,
            transform_type: DEFAULT_TRANSFORM_TYPE,
            priority_mode: DEFAULT_PRIORITY_MODE,
            temporal_enabled: DEFAULT_TEMPORAL_ENABLED,
            enhancement_enabled: DEFAULT_ENHANCEMENT_ENABLED,
            base_depth: DEFAULT_BASE_DEPTH,
            enhancement_depth: DEFAULT_ENHANCEMENT_DEPTH,
            fps: DEFAULT_FPS,
            bitrate: DEFAULT_BITRATE,
            quality: DEFAULT_QUALITY,
            enhancement_layers: DEFAULT_ENHANCEMENT_LAYERS,
            two_pass: DEFAULT_TWO_PASS,
        }
    }
}

fn parse_str<T>(spec: &ParamSpec, value: &str) -> Result<T, ParamError>
where
    T: FromStr<Err = &'static str>,
{
    value.parse().map_err(|reason| ParamError::InvalidValue {
        name: spec.name,
        value: value.to_string(),
        reason,
    })
}

impl Settings {
    /// Sets parameter `name` to `value`. On error the stored value is left untouched.
    pub fn set(&mut self, name: &str, value: impl Into<ParamValue>) -> Result<(), ParamError> {
        let spec = find_param(name).ok_or_else(|| ParamError::UnknownParameter(name.to_string()))?;
        let value = spec.check(value.into())?;
        let shown = value.to_string();

        match (spec.name, value) {
            ("qp", ParamValue::UInt(v)) => self.qp = v,
            ("base-qp", ParamValue::UInt(v)) => self.base_qp = v,
            ("step-width-loq1", ParamValue::UInt(v)) => self.step_width_loq1 = v,
            ("step-width-loq2", ParamValue::UInt(v)) => self.step_width_loq2 = v,
            ("base-encoder", ParamValue::Str(v)) => self.base_encoder = parse_str(spec, &v)?,
            ("transform-type", ParamValue::Str(v)) => self.transform_type = parse_str(spec, &v)?,
            ("priority-mode", ParamValue::Str(v)) => self.priority_mode = parse_str(spec, &v)?,
            ("temporal-enabled", ParamValue::Bool(v)) => self.temporal_enabled = v,
            ("enhancement-enabled", ParamValue::Bool(v)) => self.enhancement_enabled = v,
            ("base-depth", ParamValue::UInt(v)) => self.base_depth = v,
            ("enhancement-depth", ParamValue::UInt(v)) => self.enhancement_depth = v,
            ("fps", ParamValue::UInt(v)) => self.fps = v,
            ("bitrate", ParamValue::Int(v)) => self.bitrate = v,
            ("quality", ParamValue::Float(v)) => self.quality = v,
            ("enhancement-layers", ParamValue::Int(v)) => self.enhancement_layers = v,
            ("two-pass", ParamValue::Bool(v)) => self.two_pass = v,
            (_, value) => {
                return Err(ParamError::TypeMismatch {
                    name: spec.name,
                    expected: spec.kind.type_name(),
                    value,
                })
            }
        }

        log::debug!("set {} to {}", spec.name, shown);

        Ok(())
    }

    /// Returns the current value of parameter `name`.
    pub fn get(&self, name: &str) -> Result<ParamValue, ParamError> {
        let value: ParamValue = match name {
            "qp" => self.qp.into(),
            "base-qp" => self.base_qp.into(),
            "step-width-loq1" => self.step_width_loq1.into(),
            "step-width-loq2" => self.step_width_loq2.into(),
            "base-encoder" => self.base_encoder.to_string().into(),
            "transform-type" => self.transform_type.to_string().into(),
            "priority-mode" => self.priority_mode.to_string().into(),
            "temporal-enabled" => self.temporal_enabled.into(),
            "enhancement-enabled" => self.enhancement_enabled.into(),
            "base-depth" => self.base_depth.into(),
            "enhancement-depth" => self.enhancement_depth.into(),
            "fps" => self.fps.into(),
            "bitrate" => self.bitrate.into(),
            "quality" => self.quality.into(),
            "enhancement-layers" => self.enhancement_layers.into(),
            "two-pass" => self.two_pass.into(),
            _ => return Err(ParamError::UnknownParameter(name.to_string())),
        };

        Ok(value)
    }
}
