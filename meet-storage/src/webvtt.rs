//! Deterministic WebVTT regeneration from topics (invariant 4, §8: idempotent
//! and deterministic for the same topic/word input). Consecutive same-speaker
//! words within a topic are grouped into one caption, rendered with a
//! `<v Speaker Name>` voice tag per the source's named-caption convention.

use meet_shared::{Participant, Topic, Word};

fn seconds_to_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let total_mins = total_secs / 60;
    let mins = total_mins % 60;
    let hours = total_mins / 60;
    format!("{hours:02}:{mins:02}:{secs:02}.{ms:03}")
}

fn speaker_name(speaker: i32, participants: &[Participant]) -> String {
    participants
        .iter()
        .find(|p| p.speaker == Some(speaker))
        .map(|p| p.name.clone())
        .unwrap_or_else(|| format!("Speaker {speaker}"))
}

struct Segment {
    speaker: i32,
    start: f64,
    end: f64,
    text: String,
}

fn words_to_segments(words: &[Word]) -> Vec<Segment> {
    let mut segments: Vec<Segment> = Vec::new();
    for word in words {
        match segments.last_mut() {
            Some(seg) if seg.speaker == word.speaker => {
                seg.end = word.end;
                seg.text.push(' ');
                seg.text.push_str(&word.text);
            }
            _ => segments.push(Segment {
                speaker: word.speaker,
                start: word.start,
                end: word.end,
                text: word.text.clone(),
            }),
        }
    }
    segments
}

/// Regenerate the full WebVTT document from a transcript's topics. Always
/// called from the persistence update path, never accepted from callers.
pub fn render(topics: &[Topic], participants: &[Participant]) -> String {
    let mut out = String::from("WEBVTT\n\n");

    for topic in topics {
        if topic.words.is_empty() {
            continue;
        }
        for segment in words_to_segments(&topic.words) {
            let name = speaker_name(segment.speaker, participants);
            out.push_str(&seconds_to_timestamp(segment.start));
            out.push_str(" --> ");
            out.push_str(&seconds_to_timestamp(segment.end));
            out.push('\n');
            out.push_str(&format!("<v {name}>{}\n\n", segment.text.trim()));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn word(text: &str, start: f64, end: f64, speaker: i32) -> Word {
        Word {
            text: text.into(),
            start,
            end,
            speaker,
        }
    }

    #[test]
    fn groups_consecutive_same_speaker_words() {
        let topic = Topic {
            id: Uuid::now_v7(),
            title: "t".into(),
            summary: "s".into(),
            timestamp: 0.0,
            duration: 2.0,
            words: vec![
                word("Hello", 0.0, 0.5, 0),
                word("world", 0.5, 1.0, 0),
                word("Hi", 1.0, 1.5, 1),
            ],
        };
        let vtt = render(&[topic], &[]);
        assert!(vtt.starts_with("WEBVTT\n\n"));
        assert!(vtt.contains("Hello world"));
        assert!(vtt.contains("<v Speaker 0>"));
        assert!(vtt.contains("<v Speaker 1>Hi"));
    }

    #[test]
    fn is_deterministic() {
        let topic = Topic {
            id: Uuid::now_v7(),
            title: "t".into(),
            summary: "s".into(),
            timestamp: 0.0,
            duration: 1.0,
            words: vec![word("a", 0.0, 0.2, 0)],
        };
        let first = render(&[topic.clone()], &[]);
        let second = render(&[topic], &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_topics_yield_header_only() {
        assert_eq!(render(&[], &[]), "WEBVTT\n\n");
    }
}
