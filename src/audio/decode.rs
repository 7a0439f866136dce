//! In-process decoding with symphonia.
//!
//! [`SymphoniaFrontend`] probes the container from the file extension,
//! decodes the first audio track packet by packet, keeps one channel and
//! resamples the result to the configured rate.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::frontend::{AudioError, AudioFrontend, PcmSignal};
use super::resample::{resample, to_i16_scale};

/// Decodes wav / mp3 / flac / ogg files without any external program.
#[derive(Debug, Clone)]
pub struct SymphoniaFrontend {
    sample_rate: u32,
    channel: usize,
}

impl SymphoniaFrontend {
    /// Create a frontend producing `sample_rate` Hz audio from `channel`.
    pub fn new(sample_rate: u32, channel: usize) -> Self {
        Self {
            sample_rate,
            channel,
        }
    }
}

impl AudioFrontend for SymphoniaFrontend {
    fn decode(&self, path: &Path) -> Result<PcmSignal, AudioError> {
        if !path.exists() {
            return Err(AudioError::NotFound(path.to_path_buf()));
        }

        let decode_err = |reason: String| AudioError::Decode {
            path: path.to_path_buf(),
            reason,
        };

        let src = File::open(path).map_err(|source| AudioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(src), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| decode_err(e.to_string()))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| decode_err("no supported audio track".into()))?;
        let track_id = track.id;
        let mut source_rate = track.codec_params.sample_rate.unwrap_or(0);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| decode_err(e.to_string()))?;

        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(decode_err(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    let channels = spec.channels.count();
                    if self.channel >= channels {
                        return Err(AudioError::MissingChannel {
                            path: path.to_path_buf(),
                            requested: self.channel,
                            available: channels,
                        });
                    }
                    source_rate = spec.rate;

                    let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    samples.extend(
                        buf.samples()
                            .iter()
                            .skip(self.channel)
                            .step_by(channels)
                            .copied(),
                    );
                }
                // A corrupt packet is skipped; the rest of the stream is
                // still usable.
                Err(SymphoniaError::DecodeError(e)) => {
                    log::warn!("decode: skipping bad packet in {}: {e}", path.display());
                }
                Err(e) => return Err(decode_err(e.to_string())),
            }
        }

        if samples.is_empty() {
            return Err(AudioError::Empty(path.to_path_buf()));
        }
        if source_rate == 0 {
            return Err(decode_err("unknown sample rate".into()));
        }

        let mut mono = resample(&samples, source_rate, self.sample_rate);
        to_i16_scale(&mut mono);

        log::debug!(
            "decode: {} → {} samples @ {} Hz (source {} Hz)",
            path.display(),
            mono.len(),
            self.sample_rate,
            source_rate
        );

        Ok(PcmSignal::new(self.sample_rate, mono))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
