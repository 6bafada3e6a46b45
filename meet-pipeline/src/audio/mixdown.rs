//! Lockstep multi-track decode + resample + sum (§4.3). Each track is
//! independently decoded to mono f32 at 16kHz, then summed sample-by-sample
//! up to the longest track's length (shorter tracks contribute silence past
//! their end, which is exactly what padding already encodes as leading
//! zeros). A single-track meeting skips the sum but still transcodes to the
//! common container so downstream consumers never special-case track count.

use std::io::Cursor;

use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};
use symphonia::core::audio::{AudioBufferRef, Signal};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::audio::backend::MixdownOutput;
use crate::error::{PipelineError, PipelineResult};

const TARGET_SAMPLE_RATE: u32 = 16_000;

pub fn mixdown(tracks: &[Vec<u8>]) -> PipelineResult<(Vec<u8>, MixdownOutput)> {
    if tracks.is_empty() {
        return Err(PipelineError::permanent("mixdown called with no tracks".to_string()));
    }

    let decoded: Vec<Vec<f32>> = tracks
        .iter()
        .map(|bytes| decode_track(bytes))
        .collect::<PipelineResult<_>>()?;

    let mixed = if decoded.len() == 1 {
        decoded.into_iter().next().unwrap()
    } else {
        let max_len = decoded.iter().map(|t| t.len()).max().unwrap_or(0);
        if max_len == 0 {
            return Err(PipelineError::permanent("all tracks decoded to zero samples".to_string()));
        }
        let mut sum = vec![0.0_f32; max_len];
        for track in &decoded {
            for (i, &s) in track.iter().enumerate() {
                sum[i] += s;
            }
        }
        sum
    };

    let duration_ms = (mixed.len() as u64 * 1000) / TARGET_SAMPLE_RATE as u64;
    let wav = write_wav(&mixed)?;
    Ok((wav, MixdownOutput { duration_ms }))
}

pub(super) fn decode_track(bytes: &[u8]) -> PipelineResult<Vec<f32>> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(&Hint::new(), mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| PipelineError::permanent(format!("probe failed: {e}")))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != symphonia::core::codecs::CODEC_TYPE_NULL)
        .ok_or_else(|| PipelineError::permanent("no decodable audio track".to_string()))?
        .clone();

    let source_rate = track.codec_params.sample_rate.unwrap_or(TARGET_SAMPLE_RATE);
    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &Default::default())
        .map_err(|e| PipelineError::permanent(format!("no decoder for track: {e}")))?;

    let mut mono = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => {
                decoder.reset();
                continue;
            }
            Err(e) => return Err(PipelineError::permanent(format!("demux error: {e}"))),
        };

        match decoder.decode(&packet) {
            Ok(buf) => append_mono(&buf, &mut mono),
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(SymphoniaError::DecodeError(_)) => continue,
            Err(e) => return Err(PipelineError::permanent(format!("decode error: {e}"))),
        }
    }

    if source_rate != TARGET_SAMPLE_RATE {
        mono = resample(&mono, source_rate, TARGET_SAMPLE_RATE)?;
    }
    Ok(mono)
}

/// Downmixes one decoded packet's buffer to mono by averaging channels,
/// appending the result in-place. Handles the sample formats symphonia
/// commonly hands back; anything else is skipped rather than failing the
/// whole decode, since a single malformed packet shouldn't sink a track.
pub(super) fn append_mono(buf: &AudioBufferRef, out: &mut Vec<f32>) {
    match buf {
        AudioBufferRef::F32(b) => push_planar(b.planes().planes(), b.frames(), out),
        AudioBufferRef::S16(b) => {
            let planes = b.planes();
            let chans = planes.planes();
            let frames = b.frames();
            for i in 0..frames {
                let mut acc = 0.0_f32;
                for chan in chans {
                    acc += chan[i] as f32 / i16::MAX as f32;
                }
                out.push(acc / chans.len() as f32);
            }
        }
        AudioBufferRef::U8(b) => {
            let planes = b.planes();
            let chans = planes.planes();
            let frames = b.frames();
            for i in 0..frames {
                let mut acc = 0.0_f32;
                for chan in chans {
                    acc += (chan[i] as f32 - 128.0) / 128.0;
                }
                out.push(acc / chans.len() as f32);
            }
        }
        _ => {}
    }
}

fn push_planar(chans: &[&[f32]], frames: usize, out: &mut Vec<f32>) {
    for i in 0..frames {
        let mut acc = 0.0_f32;
        for chan in chans {
            acc += chan[i];
        }
        out.push(acc / chans.len() as f32);
    }
}

pub(super) fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> PipelineResult<Vec<f32>> {
    if input.is_empty() || from_rate == to_rate {
        return Ok(input.to_vec());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };
    let ratio = to_rate as f64 / from_rate as f64;
    let chunk_size = 1024;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, chunk_size, 1)
        .map_err(|e| PipelineError::permanent(format!("resampler init failed: {e}")))?;

    let mut out = Vec::with_capacity((input.len() as f64 * ratio) as usize);
    let mut pos = 0;
    while pos < input.len() {
        let end = (pos + chunk_size).min(input.len());
        let mut chunk = input[pos..end].to_vec();
        chunk.resize(chunk_size, 0.0);
        let result = resampler
            .process(&[chunk], None)
            .map_err(|e| PipelineError::permanent(format!("resample failed: {e}")))?;
        out.extend_from_slice(&result[0]);
        pos = end;
    }
    Ok(out)
}

fn write_wav(samples: &[f32]) -> PipelineResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: TARGET_SAMPLE_RATE,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut buf = Vec::new();
    {
        let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec)
            .map_err(|e| PipelineError::permanent(format!("wav writer init failed: {e}")))?;
        for &s in samples {
            writer
                .write_sample(s)
                .map_err(|e| PipelineError::permanent(format!("wav write failed: {e}")))?;
        }
        writer
            .finalize()
            .map_err(|e| PipelineError::permanent(format!("wav finalize failed: {e}")))?;
    }
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mixdown_rejects_empty_input() {
        let err = mixdown(&[]).unwrap_err();
        assert!(matches!(err, PipelineError::Permanent(_)));
    }

    #[test]
    fn resample_noop_when_rates_match() {
        let input = vec![0.1, 0.2, 0.3];
        let out = resample(&input, 16_000, 16_000).unwrap();
        assert_eq!(out, input);
    }
}
