//! Codec profiles modelled on libwebrtc's encoder settings.
//!
//! Each entry mirrors what libwebrtc configures for the corresponding codec
//! (see `modules/video_coding/codecs` in the m104 release): a fixed speed preset,
//! rate control bounded by the single target bitrate, lookahead disabled, and
//! row/tile parallelism where the encoder supports it. libwebrtc ships OpenH264,
//! which FFmpeg doesn't provide, so both H.264 entries use libx264 instead.
//!
//! New codecs are added as rows of [`PROFILES`]; nothing else branches on the codec.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::error::BenchError;

/// Area of one 640x480 frame; the encoder gets one thread per such area
pub const THREAD_UNIT_AREA: u64 = 640 * 480;

/// Placeholder substituted with the target bitrate in kb/s
const KBPS: &str = "{kbps}";

/// Codecs the benchmark knows how to configure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecId {
    H264,
    H264Zerolatency,
    H265,
    Vp8,
    Vp9,
    Av1,
}

impl CodecId {
    /// Identifier used on the command line and in artifact names
    pub fn as_str(self) -> &'static str {
        self.profile().name
    }

    pub fn profile(self) -> &'static CodecProfile {
        // Every variant has exactly one row; enforced by `every_codec_has_one_profile`
        PROFILES
            .iter()
            .find(|p| p.id == self)
            .unwrap_or(&PROFILES[0])
    }

    /// All identifiers, in registry order
    pub fn valid_names() -> Vec<&'static str> {
        PROFILES.iter().map(|p| p.name).collect()
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CodecId {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PROFILES
            .iter()
            .find(|p| p.name == s)
            .map(|p| p.id)
            .ok_or_else(|| BenchError::UnsupportedCodec {
                requested: s.to_string(),
                valid: CodecId::valid_names(),
            })
    }
}

/// One `-flag value` pair; `value` may contain `{kbps}`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Param {
    pub flag: &'static str,
    pub value: &'static str,
}

const fn p(flag: &'static str, value: &'static str) -> Param {
    Param { flag, value }
}

impl Param {
    fn render(&self, bitrate_kbps: u32) -> (String, String) {
        (
            self.flag.to_string(),
            self.value.replace(KBPS, &bitrate_kbps.to_string()),
        )
    }
}

/// Resolution predicate gating extra parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionCondition {
    /// Output height is at least this many lines
    MinHeight(u32),
}

impl ResolutionCondition {
    pub fn holds(&self, _width: u32, height: u32) -> bool {
        match *self {
            ResolutionCondition::MinHeight(min) => height >= min,
        }
    }
}

impl fmt::Display for ResolutionCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolutionCondition::MinHeight(min) => write!(f, "height >= {}", min),
        }
    }
}

/// Parameters appended only when `condition` holds for the output resolution
#[derive(Debug, Clone, Copy)]
pub struct GatedParams {
    pub condition: ResolutionCondition,
    pub params: &'static [Param],
}

/// A row of the registry
#[derive(Debug, Clone, Copy)]
pub struct CodecProfile {
    pub id: CodecId,
    pub name: &'static str,
    /// FFmpeg encoder passed to `-c:v`
    pub encoder: &'static str,
    pub description: &'static str,
    pub params: &'static [Param],
    pub gated: Option<GatedParams>,
}

pub static PROFILES: [CodecProfile; 6] = [
    CodecProfile {
        id: CodecId::H264,
        name: "h264",
        encoder: "libx264",
        description: "H.264 baseline, veryfast, no lookahead",
        params: &[
            p("-preset", "veryfast"),
            p("-rc-lookahead", "0"),
            p("-profile:v", "baseline"),
            p("-maxrate", "{kbps}K"),
            p("-bufsize", "{kbps}K"),
        ],
        gated: None,
    },
    CodecProfile {
        id: CodecId::H264Zerolatency,
        name: "h264_zerolatency",
        encoder: "libx264",
        description: "H.264 baseline, veryfast, zerolatency tune",
        params: &[
            p("-preset", "veryfast"),
            p("-tune", "zerolatency"),
            p("-profile:v", "baseline"),
            p("-maxrate", "{kbps}K"),
            p("-bufsize", "{kbps}K"),
        ],
        gated: None,
    },
    CodecProfile {
        id: CodecId::H265,
        name: "h265",
        encoder: "libx265",
        description: "HEVC veryfast, no B-frames, no lookahead, VBV at target",
        params: &[
            p("-preset", "veryfast"),
            p("-b:v", "{kbps}K"),
            p("-maxrate", "{kbps}K"),
            p("-bufsize", "{kbps}K"),
            p(
                "-x265-params",
                "bframes=0:rc-lookahead=0:vbv-maxrate={kbps}:vbv-bufsize={kbps}:repeat-headers=1",
            ),
        ],
        gated: None,
    },
    CodecProfile {
        id: CodecId::Vp8,
        name: "vp8",
        encoder: "libvpx",
        description: "VP8 realtime, cpu-used -6 (libwebrtc default complexity)",
        params: &[
            p("-b:v", "{kbps}K"),
            p("-minrate", "{kbps}K"),
            p("-maxrate", "{kbps}K"),
            p("-deadline", "realtime"),
            p("-cpu-used", "-6"),
            p("-qmax", "52"),
            p("-qmin", "2"),
            p("-bufsize", "{kbps}K"),
        ],
        gated: None,
    },
    CodecProfile {
        id: CodecId::Vp9,
        name: "vp9",
        encoder: "libvpx-vp9",
        description: "VP9 realtime, speed 7, row-mt, 3 tile columns",
        params: &[
            p("-b:v", "{kbps}K"),
            p("-minrate", "{kbps}K"),
            p("-maxrate", "{kbps}K"),
            p("-deadline", "realtime"),
            // Chrome uses speed 7 for most resolutions
            p("-speed", "7"),
            p("-row-mt", "1"),
            p("-tile-columns", "3"),
            p("-tile-rows", "1"),
            p("-frame-parallel", "1"),
            p("-qmax", "52"),
            p("-qmin", "2"),
        ],
        gated: None,
    },
    CodecProfile {
        id: CodecId::Av1,
        name: "av1",
        encoder: "libaom-av1",
        description: "AV1 realtime usage, cpu-used 8, row-mt, tiles from 360p",
        params: &[
            p("-b:v", "{kbps}K"),
            p("-usage", "realtime"),
            p("-minrate", "{kbps}K"),
            p("-maxrate", "{kbps}K"),
            p("-cpu-used", "8"),
            p("-row-mt", "1"),
            p("-qmax", "52"),
            p("-qmin", "10"),
            p("-aq-mode", "3"),
            p("-enable-global-motion", "0"),
            p("-enable-intrabc", "0"),
            p("-enable-restoration", "0"),
            p("-enable-interintra-comp", "0"),
            p("-enable-interintra-wedge", "0"),
            p("-refs", "3"),
        ],
        gated: Some(GatedParams {
            condition: ResolutionCondition::MinHeight(360),
            params: &[p("-tile-columns", "3")],
        }),
    },
];

/// Encoder selection plus its ordered, fully rendered parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderArgs {
    pub encoder: &'static str,
    pub params: Vec<(String, String)>,
}

impl EncoderArgs {
    /// `-c:v <encoder>` followed by every flag/value pair
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::with_capacity(2 + self.params.len() * 2);
        args.push("-c:v".to_string());
        args.push(self.encoder.to_string());
        for (flag, value) in &self.params {
            args.push(flag.clone());
            args.push(value.clone());
        }
        args
    }

    /// Value of `flag`, if present
    pub fn get(&self, flag: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(f, _)| f == flag)
            .map(|(_, v)| v.as_str())
    }
}

/// Encoder parameters for `codec` at the given output resolution and target bitrate
pub fn profile_for(codec: CodecId, width: u32, height: u32, bitrate_kbps: u32) -> EncoderArgs {
    let profile = codec.profile();

    let mut params: Vec<(String, String)> = profile
        .params
        .iter()
        .map(|param| param.render(bitrate_kbps))
        .collect();

    if let Some(gated) = &profile.gated {
        if gated.condition.holds(width, height) {
            params.extend(gated.params.iter().map(|param| param.render(bitrate_kbps)));
        }
    }

    EncoderArgs {
        encoder: profile.encoder,
        params,
    }
}

/// Encoder thread count: one per 640x480-equivalent area, rounded up, at least 1
pub fn thread_hint(width: u32, height: u32) -> u32 {
    let area = width as u64 * height as u64;
    let threads = area.div_ceil(THREAD_UNIT_AREA).max(1);
    u32::try_from(threads).unwrap_or(u32::MAX)
}
