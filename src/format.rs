// Copyright 2026 The ChromiumOS Authors
// Use of this source code is governed by a BSD-style license that can be
// found in the LICENSE file.

//! Mapping between the formats negotiated by the host and the image descriptions understood by
//! LCEVC engines.

use std::fmt;
use std::str::FromStr;

use byteorder::ByteOrder;
use byteorder::LittleEndian;
use enumn::N;
use thiserror::Error;

use crate::Fraction;
use crate::PlaneLayout;
use crate::Resolution;

/// Smallest accepted input width.
pub const MIN_WIDTH: u32 = 16;
/// Largest accepted input width.
pub const MAX_WIDTH: u32 = 7680;
/// Smallest accepted input height.
pub const MIN_HEIGHT: u32 = 16;
/// Largest accepted input height.
pub const MAX_HEIGHT: u32 = 4320;

/// Pixel formats a host may negotiate on the sink pad. The discriminants are the host's numeric
/// format codes.
#[allow(non_camel_case_types)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, N)]
pub enum HostVideoFormat {
    Unknown = 0,
    I420 = 2,
    YV12 = 3,
    YUY2 = 4,
    RGBx = 7,
    BGRx = 8,
    RGBA = 11,
    BGRA = 12,
    RGB = 15,
    BGR = 16,
    Y42B = 18,
    Y444 = 20,
    NV12 = 23,
    NV21 = 24,
    GRAY8 = 25,
    I420_10LE = 43,
    I422_10LE = 45,
    Y444_10LE = 47,
}

impl HostVideoFormat {
    /// Decodes a numeric host format code. Codes this crate does not know map to `Unknown`.
    pub fn from_code(code: u32) -> Self {
        Self::n(code).unwrap_or(Self::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::I420 => "I420",
            Self::YV12 => "YV12",
            Self::YUY2 => "YUY2",
            Self::RGBx => "RGBx",
            Self::BGRx => "BGRx",
            Self::RGBA => "RGBA",
            Self::BGRA => "BGRA",
            Self::RGB => "RGB",
            Self::BGR => "BGR",
            Self::Y42B => "Y42B",
            Self::Y444 => "Y444",
            Self::NV12 => "NV12",
            Self::NV21 => "NV21",
            Self::GRAY8 => "GRAY8",
            Self::I420_10LE => "I420_10LE",
            Self::I422_10LE => "I422_10LE",
            Self::Y444_10LE => "Y444_10LE",
        }
    }
}

impl fmt::Display for HostVideoFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostVideoFormat {
    type Err = &'static str;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "I420" => Ok(Self::I420),
            "YV12" => Ok(Self::YV12),
            "YUY2" => Ok(Self::YUY2),
            "RGBx" => Ok(Self::RGBx),
            "BGRx" => Ok(Self::BGRx),
            "RGBA" => Ok(Self::RGBA),
            "BGRA" => Ok(Self::BGRA),
            "RGB" => Ok(Self::RGB),
            "BGR" => Ok(Self::BGR),
            "Y42B" => Ok(Self::Y42B),
            "Y444" => Ok(Self::Y444),
            "NV12" => Ok(Self::NV12),
            "NV21" => Ok(Self::NV21),
            "GRAY8" => Ok(Self::GRAY8),
            "I420_10LE" => Ok(Self::I420_10LE),
            "I422_10LE" => Ok(Self::I422_10LE),
            "Y444_10LE" => Ok(Self::Y444_10LE),
            _ => Err("unrecognized video format"),
        }
    }
}

/// Host formats that map to an [`ImagePixelFormat`] other than `None`.
pub const SUPPORTED_FORMATS: [HostVideoFormat; 6] = [
    HostVideoFormat::I420,
    HostVideoFormat::Y42B,
    HostVideoFormat::Y444,
    HostVideoFormat::I420_10LE,
    HostVideoFormat::I422_10LE,
    HostVideoFormat::Y444_10LE,
];

/// Pixel formats of the images handed to the engine. All of them are 3-plane YUV.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ImagePixelFormat {
    /// Sentinel for formats that cannot be encoded.
    None,
    Yuv420P8,
    Yuv422P8,
    Yuv444P8,
    Yuv420P10,
    Yuv422P10,
    Yuv444P10,
}

impl ImagePixelFormat {
    pub fn is_none(&self) -> bool {
        *self == Self::None
    }

    /// Bits per sample, `None` for the sentinel.
    pub fn bit_depth(&self) -> Option<u32> {
        match self {
            Self::None => None,
            Self::Yuv420P8 | Self::Yuv422P8 | Self::Yuv444P8 => Some(8),
            Self::Yuv420P10 | Self::Yuv422P10 | Self::Yuv444P10 => Some(10),
        }
    }

    /// Bytes used to store one sample. 10-bit samples are stored in 16-bit little endian words.
    pub fn bytes_per_sample(&self) -> usize {
        match self.bit_depth() {
            Some(8) => 1,
            Some(_) => 2,
            None => 0,
        }
    }

    /// Horizontal and vertical chroma subsampling.
    pub fn subsampling(&self) -> (bool, bool) {
        match self {
            Self::Yuv420P8 | Self::Yuv420P10 => (true, true),
            Self::Yuv422P8 | Self::Yuv422P10 => (true, false),
            Self::Yuv444P8 | Self::Yuv444P10 | Self::None => (false, false),
        }
    }

    pub fn num_planes(&self) -> usize {
        if self.is_none() {
            0
        } else {
            3
        }
    }
}

impl From<HostVideoFormat> for ImagePixelFormat {
    fn from(format: HostVideoFormat) -> Self {
        match format {
            HostVideoFormat::I420 => Self::Yuv420P8,
            HostVideoFormat::Y42B => Self::Yuv422P8,
            HostVideoFormat::Y444 => Self::Yuv444P8,
            HostVideoFormat::I420_10LE => Self::Yuv420P10,
            HostVideoFormat::I422_10LE => Self::Yuv422P10,
            HostVideoFormat::Y444_10LE => Self::Yuv444P10,
            _ => Self::None,
        }
    }
}

impl fmt::Display for ImagePixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Yuv420P8 => "yuv420p",
            Self::Yuv422P8 => "yuv422p",
            Self::Yuv444P8 => "yuv444p",
            Self::Yuv420P10 => "yuv420p10",
            Self::Yuv422P10 => "yuv422p10",
            Self::Yuv444P10 => "yuv444p10",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("unsupported pixel format {0}")]
    UnsupportedPixelFormat(HostVideoFormat),
    #[error("unsupported resolution {}x{}", .0.width, .0.height)]
    UnsupportedResolution(Resolution),
    #[error("invalid framerate {0}")]
    InvalidFramerate(Fraction),
}

/// Format negotiated by the host on the sink pad.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct VideoInfo {
    pub format: HostVideoFormat,
    pub resolution: Resolution,
    pub framerate: Fraction,
}

impl VideoInfo {
    pub fn new(format: HostVideoFormat, width: u32, height: u32, framerate: Fraction) -> Self {
        Self {
            format,
            resolution: Resolution { width, height },
            framerate,
        }
    }
}

/// Description of the images an engine instance is built for.
///
/// A descriptor can only be obtained through [`ImageDescriptor::try_from`], which refuses the
/// `None` pixel format, so every descriptor in circulation is encodable.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ImageDescriptor {
    format: ImagePixelFormat,
    resolution: Resolution,
}

impl TryFrom<&VideoInfo> for ImageDescriptor {
    type Error = FormatError;

    fn try_from(info: &VideoInfo) -> Result<Self, Self::Error> {
        let format = ImagePixelFormat::from(info.format);
        if format.is_none() {
            return Err(FormatError::UnsupportedPixelFormat(info.format));
        }

        let Resolution { width, height } = info.resolution;
        if !(MIN_WIDTH..=MAX_WIDTH).contains(&width) || !(MIN_HEIGHT..=MAX_HEIGHT).contains(&height)
        {
            return Err(FormatError::UnsupportedResolution(info.resolution));
        }

        if info.framerate.denom == 0 {
            return Err(FormatError::InvalidFramerate(info.framerate));
        }

        Ok(Self {
            format,
            resolution: info.resolution,
        })
    }
}

impl ImageDescriptor {
    pub fn format(&self) -> ImagePixelFormat {
        self.format
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Visible size of `plane`, in samples. Chroma planes of odd sized images are rounded up.
    pub fn plane_resolution(&self, plane: usize) -> Resolution {
        let (sub_h, sub_v) = self.format.subsampling();
        let Resolution { width, height } = self.resolution;
        if plane == 0 {
            return self.resolution;
        }

        Resolution {
            width: if sub_h { (width + 1) / 2 } else { width },
            height: if sub_v { (height + 1) / 2 } else { height },
        }
    }

    /// Number of bytes holding the visible samples of one row of `plane`.
    pub fn row_size(&self, plane: usize) -> usize {
        self.plane_resolution(plane).width as usize * self.format.bytes_per_sample()
    }

    /// Layout of a tightly packed frame, planes one after the other.
    pub fn packed_layout(&self) -> Vec<PlaneLayout> {
        let mut offset = 0;
        (0..self.format.num_planes())
            .map(|plane| {
                let stride = self.row_size(plane);
                let layout = PlaneLayout { offset, stride };
                offset += stride * self.plane_resolution(plane).height as usize;
                layout
            })
            .collect()
    }

    /// Size of a tightly packed frame.
    pub fn packed_size(&self) -> usize {
        (0..self.format.num_planes())
            .map(|plane| self.row_size(plane) * self.plane_resolution(plane).height as usize)
            .sum()
    }

    /// Checks that `data` laid out as `layout` holds a complete image of this description.
    ///
    /// Frames come from the host, so every plane is bounds checked. For 10-bit formats, the
    /// samples are also checked to fit in 10 bits.
    pub fn validate_frame(&self, data: &[u8], layout: &[PlaneLayout]) -> Result<(), String> {
        if layout.len() != self.format.num_planes() {
            return Err(format!(
                "expected {} planes for {}, got {}",
                self.format.num_planes(),
                self.format,
                layout.len()
            ));
        }

        for (plane, plane_layout) in layout.iter().enumerate() {
            let row_size = self.row_size(plane);
            let rows = self.plane_resolution(plane).height as usize;

            if plane_layout.stride < row_size {
                return Err(format!(
                    "stride {} of plane {} is smaller than its row size {}",
                    plane_layout.stride, plane, row_size
                ));
            }

            let needed = plane_layout
                .stride
                .checked_mul(rows - 1)
                .and_then(|n| n.checked_add(plane_layout.offset))
                .and_then(|n| n.checked_add(row_size))
                .ok_or_else(|| format!("layout of plane {} overflows: {:?}", plane, plane_layout))?;
            if data.len() < needed {
                return Err(format!(
                    "plane {} needs {} bytes but the buffer holds {}",
                    plane,
                    needed,
                    data.len()
                ));
            }
        }

        if self.format.bit_depth() == Some(10) {
            self.check_sample_depth(data, layout)?;
        }

        Ok(())
    }

    fn check_sample_depth(&self, data: &[u8], layout: &[PlaneLayout]) -> Result<(), String> {
        const MAX_SAMPLE: u16 = 0x3ff;

        for (plane, plane_layout) in layout.iter().enumerate() {
            let row_size = self.row_size(plane);
            let rows = data
                .get(plane_layout.offset..)
                .ok_or_else(|| format!("plane {} starts past the end of the buffer", plane))?
                .chunks(plane_layout.stride)
                .take(self.plane_resolution(plane).height as usize);

            for (row_idx, row) in rows.enumerate() {
                if let Some(sample) = row[..row_size]
                    .chunks_exact(2)
                    .map(LittleEndian::read_u16)
                    .find(|s| *s > MAX_SAMPLE)
                {
                    return Err(format!(
                        "sample {:#x} in row {} of plane {} exceeds 10 bits",
                        sample, row_idx, plane
                    ));
                }
            }
        }

        Ok(())
    }
}
