//! Codec profiles and encoder argument construction.

use std::path::PathBuf;
use std::str::FromStr;

use scenecast_common::clock::output_timestamp_ms;
use scenecast_common::error::ScenecastError;
use serde::{Deserialize, Serialize};

/// Named encoder configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodecProfile {
    /// H.264 in MP4, for uploading and delivery.
    Small,
    /// ProRes 422 in MOV, for editing.
    Prores,
    /// ProRes 422 HQ in MOV, very large files.
    ProresHq,
    /// ProRes 4444 with alpha channel in MOV.
    Alpha,
}

/// Arguments for one encoder invocation plus the file it will write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderArgs {
    pub args: Vec<String>,
    pub output_path: PathBuf,
}

impl CodecProfile {
    pub const ALL: [CodecProfile; 4] = [
        CodecProfile::Small,
        CodecProfile::Prores,
        CodecProfile::ProresHq,
        CodecProfile::Alpha,
    ];

    /// Name used on the command line.
    pub fn name(self) -> &'static str {
        match self {
            Self::Small => "small",
            Self::Prores => "prores",
            Self::ProresHq => "prores-hq",
            Self::Alpha => "alpha",
        }
    }

    /// Container file extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Small => "mp4",
            Self::Prores | Self::ProresHq | Self::Alpha => "mov",
        }
    }

    /// Encoder codec name.
    pub fn codec(self) -> &'static str {
        match self {
            Self::Small => "libx264",
            Self::Prores | Self::ProresHq | Self::Alpha => "prores_ks",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Small => "H.264 10-bit 4:4:4 MP4, crf 14 (upload/delivery)",
            Self::Prores => "ProRes 422 10-bit MOV (editing)",
            Self::ProresHq => "ProRes 422 HQ 10-bit MOV (editing, large)",
            Self::Alpha => "ProRes 4444 10-bit MOV with alpha channel",
        }
    }

    /// Build the argument list with a fresh output timestamp.
    pub fn build_arguments(self, fps: u32, filename_prefix: &str) -> EncoderArgs {
        self.build_arguments_at(fps, filename_prefix, output_timestamp_ms())
    }

    /// Build the argument list for a given output timestamp.
    ///
    /// Same inputs always give the same list. Every profile writes a
    /// fragmented container (`frag_keyframe+empty_moov`) so a file cut off
    /// by a killed encoder still plays up to the last fragment.
    pub fn build_arguments_at(self, fps: u32, filename_prefix: &str, timestamp_ms: i64) -> EncoderArgs {
        let fps = fps.to_string();
        let file_name = output_file_name(filename_prefix, timestamp_ms, self.extension());

        let mut args: Vec<String> = [
            "-loglevel",
            "warning",
            "-framerate",
            fps.as_str(),
            "-f",
            "image2pipe",
            "-i",
            "-",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.extend(self.codec_args());
        args.extend(
            [
                "-colorspace",
                "bt709",
                "-color_primaries",
                "bt709",
                "-color_trc",
                "bt709",
                "-color_range",
                "pc",
                "-metadata:s:v:0",
                "color_space=display-p3",
                "-movflags",
                "frag_keyframe+empty_moov",
                "-r",
                fps.as_str(),
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push(file_name.clone());

        EncoderArgs {
            args,
            output_path: PathBuf::from(file_name),
        }
    }

    fn codec_args(self) -> Vec<String> {
        let args: &[&str] = match self {
            Self::Small => &[
                "-c:v",
                "libx264",
                "-preset",
                "medium",
                "-crf",
                "14",
                "-pix_fmt",
                "yuv444p10le",
            ],
            Self::Prores => &["-c:v", "prores_ks", "-profile:v", "2", "-pix_fmt", "yuv422p10le"],
            Self::ProresHq => &["-c:v", "prores_ks", "-profile:v", "3", "-pix_fmt", "yuv422p10le"],
            Self::Alpha => &[
                "-c:v",
                "prores_ks",
                "-profile:v",
                "4444",
                "-pix_fmt",
                "yuva444p10le",
                "-alpha_bits",
                "16",
            ],
        };
        args.iter().map(|s| s.to_string()).collect()
    }
}

impl FromStr for CodecProfile {
    type Err = ScenecastError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|profile| profile.name() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|p| p.name()).collect();
                ScenecastError::config(format!(
                    "Unknown output-type: \"{s}\". Use one of: {}",
                    known.join(", ")
                ))
            })
    }
}

impl std::fmt::Display for CodecProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// `{prefix}{timestamp}.{extension}`
pub fn output_file_name(prefix: &str, timestamp_ms: i64, extension: &str) -> String {
    format!("{prefix}{timestamp_ms}.{extension}")
}
