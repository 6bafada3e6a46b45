//! Per-track padding: each recorded track carries its own join-offset
//! relative to the meeting start, resolved via symphonia's probed
//! container/packet metadata in priority order (stream start_ts, container
//! start_ts, first-packet timestamp, zero). A track whose resolved offset is
//! <= 0 is returned unchanged — prepending zero or negative silence is a
//! no-op, and re-encoding for nothing would be a pointless transcode.

use std::io::Cursor;

use symphonia::core::codecs::CODEC_TYPE_NULL;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

use crate::audio::backend::PadOutput;
use crate::error::{PipelineError, PipelineResult};

const TARGET_SAMPLE_RATE: u32 = 16_000;

pub fn pad(bytes: &[u8]) -> PipelineResult<PadOutput> {
    let offset_secs = resolve_offset_secs(bytes)?;
    if offset_secs <= 0.0 {
        return Ok(PadOutput {
            bytes: Vec::new(),
            offset_secs: offset_secs.max(0.0),
            passthrough: true,
        });
    }

    let samples = super::mixdown::decode_track(bytes)?;
    let silence_frames = (offset_secs * TARGET_SAMPLE_RATE as f64).round() as usize;
    let mut padded = Vec::with_capacity(silence_frames + samples.len());
    padded.resize(silence_frames, 0.0_f32);
    padded.extend(samples);

    let wav = write_wav(&padded, TARGET_SAMPLE_RATE)?;
    Ok(PadOutput { bytes: wav, offset_secs, passthrough: false })
}

/// Step order (§4.2): (1) the track's own `start_ts` in its `time_base`;
/// (2) failing that, the earliest `start_ts` reported by any track in the
/// container, which is the closest symphonia equivalent of a container-level
/// start time; (3) failing that, the timestamp on the first packet demuxed
/// for the track; (4) zero. Containers produced by our own recording clients
/// never carry a negative offset, but a clock-skewed client can report one —
/// the caller clamps to zero either way.
fn resolve_offset_secs(bytes: &[u8]) -> PipelineResult<f64> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    let probed = symphonia::default::get_probe()
        .format(&Hint::new(), mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| PipelineError::permanent(format!("probe failed: {e}")))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .cloned()
        .ok_or_else(|| PipelineError::permanent("no decodable audio track".to_string()))?;

    // 1. stream-level start_time: the track's own start_ts x time_base.
    if let Some(secs) = time_base_secs(track.codec_params.time_base, track.codec_params.start_ts) {
        if secs > 0.0 {
            return Ok(secs);
        }
    }

    // 2. container-level start_time: earliest start_ts across every track.
    let container_start = format
        .tracks()
        .iter()
        .filter_map(|t| time_base_secs(t.codec_params.time_base, t.codec_params.start_ts))
        .filter(|&secs| secs > 0.0)
        .fold(None, |acc: Option<f64>, secs| Some(acc.map_or(secs, |a: f64| a.min(secs))));
    if let Some(secs) = container_start {
        return Ok(secs);
    }

    // 3. first-packet timestamp, in the track's time_base.
    if let Some(time_base) = track.codec_params.time_base {
        while let Ok(packet) = format.next_packet() {
            if packet.track_id() != track.id {
                continue;
            }
            if let Some(secs) = time_base_secs(Some(time_base), packet.ts()) {
                if secs > 0.0 {
                    return Ok(secs);
                }
            }
            break;
        }
    }

    // 4. fallback.
    Ok(0.0)
}

fn time_base_secs(time_base: Option<TimeBase>, ts: u64) -> Option<f64> {
    let time_base = time_base?;
    let time = time_base.calc_time(ts);
    Some(time.seconds as f64 + time.frac)
}

fn write_wav(samples: &[f32], sample_rate: u32) -> PipelineResult<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut buf = Vec::new();
    {
        let cursor = Cursor::new(&mut buf);
        let mut writer = hound::WavWriter::new(cursor, spec)
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
    fn zero_offset_is_passthrough() {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        };
        let mut buf = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut buf), spec).unwrap();
            for _ in 0..1600 {
                writer.write_sample(0.0_f32).unwrap();
            }
            writer.finalize().unwrap();
        }
        let out = pad(&buf).unwrap();
        assert!(out.passthrough);
        assert_eq!(out.offset_secs, 0.0);
    }
}
