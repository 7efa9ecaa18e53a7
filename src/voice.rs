//! Speech pipeline benchmarking harness.
//!
//! Wraps caller-supplied text-to-speech and speech-to-text engines so they
//! can be timed in round trips or batch benchmarks. The engines themselves
//! are opaque closures; this module only measures them.

use std::time::Instant;

/// Wraps a TTS/STT engine pair for benchmarking or integration tests.
pub struct SpeechPipeline<T, S>
where
    T: Fn(&str) -> Vec<u8>,
    S: Fn(&[u8]) -> String,
{
    tts: T,
    stt: S,
}

/// Timing and accuracy of one utterance round trip.
#[derive(Debug, Clone, PartialEq)]
pub struct RoundTripReport {
    /// The utterance fed through the pipeline.
    pub utterance: String,
    /// Seconds spent in text-to-speech.
    pub tts_seconds: f64,
    /// Seconds spent in speech-to-text.
    pub stt_seconds: f64,
    /// Total round trip seconds.
    pub round_trip_seconds: f64,
    /// 1.0 when the transcript matches the utterance (case- and
    /// surrounding-whitespace-insensitive), else 0.0.
    pub accuracy: f64,
}

/// Duration of a single TTS invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct TtsSample {
    /// The synthesized prompt.
    pub prompt: String,
    /// Seconds taken.
    pub seconds: f64,
}

/// Duration of a single STT invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SttSample {
    /// Seconds taken.
    pub seconds: f64,
}

/// Aggregate statistics over a set of benchmark durations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BenchmarkSummary {
    /// Number of samples.
    pub count: usize,
    /// Mean duration in seconds.
    pub mean: f64,
    /// 95th percentile duration (nearest-rank over sorted samples).
    pub p95: f64,
    /// Maximum duration.
    pub max: f64,
}

impl<T, S> SpeechPipeline<T, S>
where
    T: Fn(&str) -> Vec<u8>,
    S: Fn(&[u8]) -> String,
{
    /// Creates a pipeline over the given engines.
    pub fn new(tts: T, stt: S) -> Self {
        Self { tts, stt }
    }

    /// Runs one utterance through TTS then STT and reports timings.
    pub fn round_trip(&self, utterance: &str) -> RoundTripReport {
        let tts_start = Instant::now();
        let audio = (self.tts)(utterance);
        let tts_seconds = tts_start.elapsed().as_secs_f64();

        let stt_start = Instant::now();
        let transcript = (self.stt)(&audio);
        let stt_seconds = stt_start.elapsed().as_secs_f64();

        let matches = transcript.trim().eq_ignore_ascii_case(utterance.trim());
        RoundTripReport {
            utterance: utterance.to_string(),
            tts_seconds,
            stt_seconds,
            round_trip_seconds: tts_seconds + stt_seconds,
            accuracy: if matches { 1.0 } else { 0.0 },
        }
    }
}

/// Times a TTS engine over each prompt.
pub fn benchmark_tts(tts: impl Fn(&str) -> Vec<u8>, prompts: &[&str]) -> Vec<TtsSample> {
    prompts
        .iter()
        .map(|prompt| {
            let start = Instant::now();
            tts(prompt);
            TtsSample {
                prompt: (*prompt).to_string(),
                seconds: start.elapsed().as_secs_f64(),
            }
        })
        .collect()
}

/// Times an STT engine over each audio sample.
pub fn benchmark_stt(stt: impl Fn(&[u8]) -> String, samples: &[Vec<u8>]) -> Vec<SttSample> {
    samples
        .iter()
        .map(|audio| {
            let start = Instant::now();
            stt(audio);
            SttSample {
                seconds: start.elapsed().as_secs_f64(),
            }
        })
        .collect()
}

/// Summarises benchmark durations; `None` when the set is empty.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn summarise(durations: &[f64]) -> Option<BenchmarkSummary> {
    if durations.is_empty() {
        return None;
    }
    let mut sorted = durations.to_vec();
    sorted.sort_by(f64::total_cmp);

    let count = sorted.len();
    let mean = sorted.iter().sum::<f64>() / count as f64;
    let rank = ((count as f64) * 0.95).ceil() as usize;
    let p95 = sorted[rank.saturating_sub(1).min(count - 1)];
    let max = sorted[count - 1];

    Some(BenchmarkSummary {
        count,
        mean,
        p95,
        max,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn echo_tts(text: &str) -> Vec<u8> {
        text.as_bytes().to_vec()
    }

    fn echo_stt(audio: &[u8]) -> String {
        String::from_utf8_lossy(audio).into_owned()
    }

    #[test]
    fn test_round_trip_exact_match_scores_one() {
        let pipeline = SpeechPipeline::new(echo_tts, echo_stt);
        let report = pipeline.round_trip("hello world");
        assert_eq!(report.utterance, "hello world");
        assert!((report.accuracy - 1.0).abs() < f64::EPSILON);
        assert!(report.round_trip_seconds >= report.tts_seconds);
    }

    #[test]
    fn test_round_trip_match_ignores_case_and_whitespace() {
        let pipeline = SpeechPipeline::new(echo_tts, |_: &[u8]| "  HELLO  ".to_string());
        let report = pipeline.round_trip("hello");
        assert!((report.accuracy - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_round_trip_mismatch_scores_zero() {
        let pipeline = SpeechPipeline::new(echo_tts, |_: &[u8]| "goodbye".to_string());
        let report = pipeline.round_trip("hello");
        assert!(report.accuracy.abs() < f64::EPSILON);
    }

    #[test]
    fn test_benchmark_tts_one_sample_per_prompt() {
        let samples = benchmark_tts(echo_tts, &["a", "b", "c"]);
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[1].prompt, "b");
        assert!(samples.iter().all(|s| s.seconds >= 0.0));
    }

    #[test]
    fn test_benchmark_stt_one_sample_per_input() {
        let samples = benchmark_stt(echo_stt, &[b"x".to_vec(), b"y".to_vec()]);
        assert_eq!(samples.len(), 2);
    }

    #[test]
    fn test_summarise_empty_is_none() {
        assert!(summarise(&[]).is_none());
    }

    #[test]
    fn test_summarise_single_sample() {
        let summary = summarise(&[0.5]).unwrap();
        assert_eq!(summary.count, 1);
        assert!((summary.mean - 0.5).abs() < f64::EPSILON);
        assert!((summary.p95 - 0.5).abs() < f64::EPSILON);
        assert!((summary.max - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_summarise_statistics() {
        let durations: Vec<f64> = (1..=100).map(f64::from).collect();
        let summary = summarise(&durations).unwrap();
        assert_eq!(summary.count, 100);
        assert!((summary.mean - 50.5).abs() < f64::EPSILON);
        assert!((summary.p95 - 95.0).abs() < f64::EPSILON);
        assert!((summary.max - 100.0).abs() < f64::EPSILON);
    }
}
