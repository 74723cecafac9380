//! Codec configuration for locally captured tracks

use serde::{Deserialize, Serialize};
use webrtc::rtp_transceiver::rtp_codec::RTCRtpCodecCapability;

/// Supported audio codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCodec {
    /// Opus codec (default, required for WebRTC)
    Opus,
}

/// Supported video codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    /// VP8 codec (WebRTC standard, wide compatibility)
    VP8,
    /// VP9 codec (better compression, modern browsers)
    VP9,
    /// H.264 codec (universal compatibility)
    H264,
}

impl AudioCodec {
    /// MIME type as registered in the media engine
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioCodec::Opus => "audio/opus",
        }
    }
}

impl VideoCodec {
    /// MIME type as registered in the media engine
    pub fn mime_type(&self) -> &'static str {
        match self {
            VideoCodec::VP8 => "video/VP8",
            VideoCodec::VP9 => "video/VP9",
            VideoCodec::H264 => "video/H264",
        }
    }
}

/// Codecs and clock parameters used when capturing local media
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaCaptureConfig {
    /// Audio codec for the local audio track
    pub audio_codec: AudioCodec,

    /// Audio sample rate in Hz
    pub audio_sample_rate: u32,

    /// Audio channel count
    pub audio_channels: u16,

    /// Video codec for the local video track
    pub video_codec: VideoCodec,
}

impl Default for MediaCaptureConfig {
    fn default() -> Self {
        Self {
            audio_codec: AudioCodec::Opus,
            audio_sample_rate: 48000,
            audio_channels: 2,
            video_codec: VideoCodec::VP8,
        }
    }
}

impl MediaCaptureConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.audio_sample_rate == 0 {
            anyhow::bail!("audio_sample_rate must be greater than zero");
        }
        if !(1..=2).contains(&self.audio_channels) {
            anyhow::bail!(
                "audio_channels must be 1 or 2, got {}",
                self.audio_channels
            );
        }
        Ok(())
    }

    pub(crate) fn audio_capability(&self) -> RTCRtpCodecCapability {
        RTCRtpCodecCapability {
            mime_type: self.audio_codec.mime_type().to_string(),
            clock_rate: self.audio_sample_rate,
            channels: self.audio_channels,
            sdp_fmtp_line: String::new(),
            rtcp_feedback: vec![],
        }
    }

    pub(crate) fn video_capability(&self) -> RTCRtpCodecCapability {
        RTCRtpCodecCapability {
            mime_type: self.video_codec.mime_type().to_string(),
            clock_rate: 90000, // Standard 90kHz clock for video
            channels: 0,       // Not used for video
            sdp_fmtp_line: String::new(),
            rtcp_feedback: vec![],
        }
    }
}
