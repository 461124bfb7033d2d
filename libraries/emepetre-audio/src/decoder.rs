/// In-memory decoding using Symphonia
use crate::buffer::DecodedAudio;
use crate::error::{AudioError, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decoder for complete encoded files held in memory
///
/// Supports: MP3, FLAC, OGG/Vorbis, WAV, AAC/M4A
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    /// Decode an entire file into interleaved `f32` samples
    ///
    /// `extension` is an optional format hint such as `"mp3"`.
    pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedAudio> {
        if bytes.is_empty() {
            return Err(AudioError::DecodeError("empty input".to_string()));
        }

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let detected = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| AudioError::UnsupportedFormat(format!("Failed to detect input format: {}", e)))?;

        let mut format = detected.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::DecodeError("No audio tracks found".to_string()))?;

        let track_id = track.id;
        let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
        let mut channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(2);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Symphonia(format!("Failed to create decoder: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(AudioError::Symphonia(e.to_string())),
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate = spec.rate;
                    channels = spec.channels.count() as u16;

                    let mut buf = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                    buf.copy_interleaved_ref(decoded);
                    samples.extend_from_slice(buf.samples());
                }
                // Corrupt packet: skip it and keep going
                Err(SymphoniaError::DecodeError(e)) => {
                    tracing::debug!(error = %e, "skipping undecodable packet");
                }
                Err(e) => return Err(AudioError::Symphonia(e.to_string())),
            }
        }

        if samples.is_empty() {
            return Err(AudioError::DecodeError("No audio frames decoded".to_string()));
        }

        DecodedAudio::new(samples, channels, sample_rate)
    }
}
