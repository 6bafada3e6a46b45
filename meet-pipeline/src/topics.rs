//! Topic segmenter (C7): breaks the merged word stream into bounded chunks.
//! Chunking happens in the `detect_topics` task; each chunk's LLM
//! summarization is its own `topic_summary` fork child (the DAG owns the
//! fan-out, per §4.11), and `aggregate_topics` merges the results once all
//! children complete. Keeping the per-chunk call as a separate durable task
//! rather than an in-process `tokio::spawn` loop means a crash mid-segmentation
//! loses at most one chunk's progress, not the whole topic list.

use std::time::Duration;

use meet_shared::{Topic, Word};

use crate::llm::{parse_title_summary, LlmClient};

const MAX_CHUNK_TOKENS: usize = 800;
const CHUNK_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_CHUNK_RETRIES: u32 = 3;

/// Splits on whitespace-delimited word count as a token-count proxy,
/// preferring to break right after a word ending in terminal punctuation so
/// chunks roughly align with sentence boundaries rather than cutting
/// mid-sentence.
pub fn chunk_words(words: &[Word]) -> Vec<Vec<Word>> {
    if words.is_empty() {
        return Vec::new();
    }

    let mut chunks = Vec::new();
    let mut current: Vec<Word> = Vec::new();

    for word in words {
        current.push(word.clone());
        let at_sentence_boundary = word.is_terminal_punctuation();
        if current.len() >= MAX_CHUNK_TOKENS && at_sentence_boundary {
            chunks.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Summarizes one chunk via the LLM, retrying up to `MAX_CHUNK_RETRIES`
/// times before falling back to a degraded topic (§4.7's last paragraph):
/// the `topic_summary` fork child calls this once per chunk.
pub async fn summarize_chunk(llm: &dyn LlmClient, chunk: Vec<Word>, language: &str) -> Option<Topic> {
    let text: String = chunk.iter().map(|w| w.text.as_str()).collect::<Vec<_>>().join(" ");
    let system = "You summarize a segment of a meeting transcript. Respond with a JSON object \
        {\"title\": <nominal phrase>, \"summary\": <one paragraph>}. Use nominalization style titles \
        (e.g. \"Budget approval\" not \"We approved the budget\").";
    let prompt = format!("Language: {language}\n\nTranscript segment:\n{text}");

    for attempt in 0..MAX_CHUNK_RETRIES {
        match llm.complete(system, &prompt, CHUNK_TIMEOUT).await {
            Ok(raw) => {
                if let Some(parsed) = parse_title_summary(&raw) {
                    return Topic::from_words(parsed.title, parsed.summary, chunk.clone());
                }
            }
            Err(e) if attempt + 1 == MAX_CHUNK_RETRIES => {
                tracing::warn!(error = %e, "topic chunk summarization exhausted retries, emitting degraded topic");
            }
            Err(_) => continue,
        }
    }

    degraded_topic(chunk)
}

/// On total exhaustion: a generic placeholder title and a summary made of
/// the chunk's leading sentences, so the workflow still produces a topic
/// rather than dropping the chunk's words entirely.
fn degraded_topic(chunk: Vec<Word>) -> Option<Topic> {
    let leading_sentences: String = chunk
        .iter()
        .take(40)
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    Topic::from_words("Untitled segment".to_string(), leading_sentences, chunk)
}

/// Merges adjacent topics whose titles are near-duplicates (case-insensitive
/// exact match after trimming), concatenating their word slices and
/// summaries. Chosen over a fuzzy-similarity merge because it is
/// deterministic given the same LLM output, per §4.7 step 3.
pub fn aggregate_topics(topics: Vec<Topic>) -> Vec<Topic> {
    let mut merged: Vec<Topic> = Vec::with_capacity(topics.len());

    for topic in topics {
        if let Some(last) = merged.last_mut() {
            if normalize_title(&last.title) == normalize_title(&topic.title) {
                last.words.extend(topic.words);
                last.summary = format!("{} {}", last.summary, topic.summary);
                if let Some(last_word) = last.words.last() {
                    last.duration = (last_word.end - last.timestamp).max(0.0);
                }
                continue;
            }
        }
        merged.push(topic);
    }
    merged
}

fn normalize_title(title: &str) -> String {
    title.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start: f64, end: f64) -> Word {
        Word { text: text.to_string(), start, end, speaker: 0 }
    }

    #[test]
    fn chunking_splits_on_sentence_boundary_past_budget() {
        let mut words = Vec::new();
        for i in 0..(MAX_CHUNK_TOKENS + 5) {
            let text = if i == MAX_CHUNK_TOKENS { "done.".to_string() } else { "word".to_string() };
            words.push(word(&text, i as f64, i as f64 + 0.5));
        }
        let chunks = chunk_words(&words);
        assert!(chunks.len() >= 2);
    }

    #[test]
    fn aggregate_merges_adjacent_duplicate_titles() {
        let a = Topic::from_words("Budget".into(), "part one".into(), vec![word("a", 0.0, 1.0)]).unwrap();
        let b = Topic::from_words("budget".into(), "part two".into(), vec![word("b", 1.0, 2.0)]).unwrap();
        let merged = aggregate_topics(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].words.len(), 2);
    }
}
