//! Word merger (C6): combines per-track word streams into one globally
//! time-ordered stream (multitrack path), or reassigns speakers to a single
//! mixed-track transcript using diarization segments (single-track path).

use meet_shared::Word;

/// Stable k-way merge keyed on `start`, ties broken by `speaker` ascending.
/// "Stable" here means: among words with equal `(start, speaker)`, the
/// relative order within their own track is preserved.
pub fn merge_tracks(tracks: Vec<Vec<Word>>) -> Vec<Word> {
    let mut all: Vec<Word> = tracks.into_iter().flatten().collect();
    all.sort_by(|a, b| {
        a.start
            .partial_cmp(&b.start)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.speaker.cmp(&b.speaker))
    });
    all
}

#[derive(Debug, Clone, Copy)]
pub struct DiarizationSegment {
    pub start: f64,
    pub end: f64,
    pub speaker: i32,
}

/// Reassigns `speaker` on every word of a single mixed-track ASR output
/// using diarization segments, per the §4.6 single-track algorithm:
/// 1. Remove overlapping segments, keeping the longer one.
/// 2. Drop segments that contain no words.
/// 3. Merge adjacent same-speaker segments.
/// 4. Sweep-assign: a word inside a segment takes that segment's speaker. A
///    word in a gap between segments inherits the previous segment's
///    speaker unless the previous word ends with terminal punctuation *and*
///    the current word starts uppercase, in which case it inherits the next
///    segment's speaker. Words past the last segment inherit the last
///    segment's speaker.
pub fn reassign_speakers(mut words: Vec<Word>, segments: Vec<DiarizationSegment>) -> Vec<Word> {
    if segments.is_empty() {
        return words;
    }

    let segments = drop_empty_segments(
        merge_adjacent_same_speaker(remove_overlaps(segments)),
        &words,
    );

    if segments.is_empty() {
        return words;
    }

    words.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));

    let mut prev_terminal = true;
    for i in 0..words.len() {
        let speaker = assign_one(&words[i], &segments, prev_terminal);
        prev_terminal = words[i].is_terminal_punctuation();
        words[i].speaker = speaker;
    }
    words
}

fn assign_one(word: &Word, segments: &[DiarizationSegment], prev_terminal: bool) -> i32 {
    if let Some(seg) = segments.iter().find(|s| word.start >= s.start && word.start < s.end) {
        return seg.speaker;
    }

    // Gap: find the segment immediately before and after `word.start`.
    let before = segments.iter().filter(|s| s.end <= word.start).last();
    let after = segments.iter().find(|s| s.start > word.start);

    match (before, after) {
        (Some(b), Some(a)) => {
            let inherit_next = prev_terminal && word.starts_uppercase();
            if inherit_next {
                a.speaker
            } else {
                b.speaker
            }
        }
        (Some(b), None) => b.speaker,
        (None, Some(a)) => a.speaker,
        (None, None) => 0,
    }
}

fn remove_overlaps(mut segments: Vec<DiarizationSegment>) -> Vec<DiarizationSegment> {
    segments.sort_by(|a, b| a.start.partial_cmp(&b.start).unwrap_or(std::cmp::Ordering::Equal));
    let mut kept: Vec<DiarizationSegment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let Some(last) = kept.last_mut() {
            if seg.start < last.end {
                // Overlap: keep whichever is longer.
                let seg_len = seg.end - seg.start;
                let last_len = last.end - last.start;
                if seg_len > last_len {
                    *last = seg;
                }
                continue;
            }
        }
        kept.push(seg);
    }
    kept
}

fn merge_adjacent_same_speaker(segments: Vec<DiarizationSegment>) -> Vec<DiarizationSegment> {
    let mut merged: Vec<DiarizationSegment> = Vec::with_capacity(segments.len());
    for seg in segments {
        if let Some(last) = merged.last_mut() {
            if last.speaker == seg.speaker {
                last.end = last.end.max(seg.end);
                continue;
            }
        }
        merged.push(seg);
    }
    merged
}

fn drop_empty_segments(segments: Vec<DiarizationSegment>, words: &[Word]) -> Vec<DiarizationSegment> {
    segments
        .into_iter()
        .filter(|s| words.iter().any(|w| w.start >= s.start && w.start < s.end))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start: f64, end: f64, speaker: i32) -> Word {
        Word { text: text.to_string(), start, end, speaker }
    }

    #[test]
    fn merge_is_start_ascending_with_speaker_tiebreak() {
        let track_a = vec![word("hi", 1.0, 1.5, 0), word("there", 2.0, 2.5, 0)];
        let track_b = vec![word("hello", 1.0, 1.4, 1)];
        let merged = merge_tracks(vec![track_a, track_b]);
        assert_eq!(merged[0].speaker, 0);
        assert_eq!(merged[1].speaker, 1);
        assert_eq!(merged[2].text, "there");
    }

    #[test]
    fn gap_word_inherits_previous_speaker_by_default() {
        let words = vec![word("um", 5.0, 5.2, -1)];
        let segments = vec![
            DiarizationSegment { start: 0.0, end: 4.0, speaker: 0 },
            DiarizationSegment { start: 6.0, end: 10.0, speaker: 1 },
        ];
        let out = reassign_speakers(words, segments);
        assert_eq!(out[0].speaker, 0);
    }

    #[test]
    fn gap_word_after_terminal_and_uppercase_inherits_next_speaker() {
        let words = vec![word("done.", 3.0, 4.0, -1), word("Hi", 5.0, 5.2, -1)];
        let segments = vec![
            DiarizationSegment { start: 0.0, end: 4.0, speaker: 0 },
            DiarizationSegment { start: 6.0, end: 10.0, speaker: 1 },
        ];
        let out = reassign_speakers(words, segments);
        assert_eq!(out[1].speaker, 1);
    }

    #[test]
    fn overlapping_segments_keep_the_longer() {
        let segments = vec![
            DiarizationSegment { start: 0.0, end: 2.0, speaker: 0 },
            DiarizationSegment { start: 1.0, end: 5.0, speaker: 1 },
        ];
        let kept = remove_overlaps(segments);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].speaker, 1);
    }
}
