//! ffmpeg invocation builder
//!
//! Every format shares one input template tuned for live sources; only the
//! output tail differs per format.

use crate::config::TranscoderConfig;
use crate::hls::ResolvedSource;
use crate::stations::{OutputFormat, StationSpec};

/// PCM sample depth for wav/flac output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitDepth {
    Sixteen,
    TwentyFour,
}

impl BitDepth {
    /// Only 16 and 24 are accepted; anything else falls back to 16.
    pub fn from_bits(bits: Option<u32>) -> Self {
        match bits {
            Some(24) => BitDepth::TwentyFour,
            _ => BitDepth::Sixteen,
        }
    }

    fn bits(self) -> &'static str {
        match self {
            BitDepth::Sixteen => "16",
            BitDepth::TwentyFour => "24",
        }
    }

    fn pcm_codec(self) -> &'static str {
        match self {
            BitDepth::Sixteen => "pcm_s16le",
            BitDepth::TwentyFour => "pcm_s24le",
        }
    }

    fn sample_fmt(self) -> &'static str {
        match self {
            BitDepth::Sixteen => "s16",
            BitDepth::TwentyFour => "s24",
        }
    }
}

/// Arguments for one transcoder run
#[derive(Debug, Clone)]
pub struct TranscodeCommand {
    args: Vec<String>,
}

impl TranscodeCommand {
    /// Build the argument list for relaying `source` as `station` requests.
    pub fn build(
        config: &TranscoderConfig,
        user_agent: &str,
        source: &ResolvedSource,
        station: &StationSpec,
    ) -> Self {
        let mut cmd = Self { args: Vec::new() };

        cmd.push_all(["-loglevel", config.log_level.as_str(), "-nostdin"]);
        cmd.push_all(["-user_agent", user_agent, "-headers", "Icy-MetaData: 1"]);
        cmd.push_all(source.header_args.iter().map(String::as_str));
        cmd.push_all(["-analyzeduration", "0", "-probesize", config.probe_size.as_str()]);
        cmd.push_all(["-fflags", "+nobuffer"]);
        cmd.push_all(["-rw_timeout", &config.rw_timeout_us.to_string()]);
        cmd.push_all([
            "-reconnect",
            "1",
            "-reconnect_streamed",
            "1",
            "-reconnect_on_network_error",
            "1",
        ]);
        cmd.push_all(["-i", source.playable_url.as_str()]);

        cmd.push_output(station);
        cmd
    }

    fn push_all<'a>(&mut self, args: impl IntoIterator<Item = &'a str>) {
        self.args.extend(args.into_iter().map(str::to_string));
    }

    fn push_output(&mut self, station: &StationSpec) {
        match &station.format {
            OutputFormat::Mp4 => {
                self.push_all(["-c:a", "copy", "-bsf:a", "aac_adtstoasc"]);
                self.push_all(["-movflags", "+frag_keyframe+empty_moov+default_base_moof"]);
                self.push_all(["-muxdelay", "0", "-muxpreload", "0", "-f", "mp4", "-"]);
            }
            OutputFormat::MpegTs => {
                self.push_all(["-c:a", "copy"]);
                self.push_all(["-muxdelay", "0", "-muxpreload", "0", "-f", "mpegts", "-"]);
            }
            OutputFormat::Wav => {
                let depth = BitDepth::from_bits(station.bits);
                self.push_all(["-vn", "-sn", "-acodec", depth.pcm_codec()]);
                self.push_layout(station);
                self.push_all(["-f", "wav", "-"]);
            }
            OutputFormat::Flac => {
                let depth = BitDepth::from_bits(station.bits);
                let filter = format!(
                    "aformat=sample_fmts={}:channel_layouts=stereo",
                    depth.sample_fmt()
                );
                self.push_all(["-vn", "-sn", "-c:a", "flac", "-compression_level", "5"]);
                self.push_all(["-af", filter.as_str()]);
                self.push_all(["-sample_fmt", depth.sample_fmt()]);
                self.push_all(["-bits_per_raw_sample", depth.bits()]);
                self.push_layout(station);
                self.push_all(["-f", "flac", "-"]);
            }
            OutputFormat::Adts | OutputFormat::Other(_) => {
                self.push_all(["-c:a", "copy"]);
                self.push_all(["-fflags", "+flush_packets", "-flush_packets", "1"]);
                self.push_all(["-muxdelay", "0", "-muxpreload", "0", "-f", "adts", "-"]);
            }
        }
    }

    /// Channel count and sample rate, only when the station sets them
    fn push_layout(&mut self, station: &StationSpec) {
        if let Some(channels) = station.channels {
            self.push_all(["-ac", &channels.to_string()]);
        }
        if let Some(rate) = station.rate {
            self.push_all(["-ar", &rate.to_string()]);
        }
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}
