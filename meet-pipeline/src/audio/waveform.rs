//! Peak extraction for the UI's waveform strip (§4.4): the mixdown is
//! decoded, divided into a fixed number of equal-width buckets, and each
//! bucket is reduced to its maximum absolute sample so short transients
//! (a single loud word) aren't smoothed away by averaging.

use crate::error::{PipelineError, PipelineResult};

pub fn extract(mix_bytes: &[u8], buckets: usize) -> PipelineResult<Vec<f32>> {
    if buckets == 0 {
        return Err(PipelineError::permanent("waveform buckets must be > 0".to_string()));
    }

    let samples = super::mixdown::decode_track(mix_bytes)?;
    if samples.is_empty() {
        return Ok(vec![0.0; buckets]);
    }

    let bucket_len = (samples.len() as f64 / buckets as f64).ceil() as usize;
    let bucket_len = bucket_len.max(1);

    let mut peaks = Vec::with_capacity(buckets);
    for chunk in samples.chunks(bucket_len) {
        let peak = chunk.iter().fold(0.0_f32, |acc, &s| acc.max(s.abs()));
        peaks.push(peak);
    }
    peaks.resize(buckets, 0.0);
    Ok(peaks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_zero_buckets() {
        let err = extract(&[], 0).unwrap_err();
        assert!(matches!(err, PipelineError::Permanent(_)));
    }
}
