//! Speech evaluation behind a strategy trait.
//!
//! The only implementation today draws random scores; nothing inspects the
//! text or audio.

use rand::Rng;
use serde::Serialize;

use crate::i18n::{self, Lang};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeechScore {
    pub score: i32,
    pub pronunciation_score: i32,
    pub fluency_score: i32,
    pub feedback: String,
}

pub trait SpeechScorer: Send + Sync {
    fn evaluate(&self, topic: &str, text: &str, lang: Lang) -> SpeechScore;
}

pub struct RandomSpeechScorer;

impl RandomSpeechScorer {
    pub const OVERALL: std::ops::RangeInclusive<i32> = 70..=95;
    pub const PRONUNCIATION: std::ops::RangeInclusive<i32> = 65..=95;
    pub const FLUENCY: std::ops::RangeInclusive<i32> = 70..=90;
}

impl SpeechScorer for RandomSpeechScorer {
    fn evaluate(&self, _topic: &str, _text: &str, lang: Lang) -> SpeechScore {
        let mut rng = rand::thread_rng();
        let score = rng.gen_range(Self::OVERALL);
        let pronunciation_score = rng.gen_range(Self::PRONUNCIATION);
        let fluency_score = rng.gen_range(Self::FLUENCY);

        SpeechScore {
            score,
            pronunciation_score,
            fluency_score,
            feedback: i18n::speech_feedback(lang, pronunciation_score, fluency_score),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_scores_stay_in_range() {
        let scorer = RandomSpeechScorer;
        for _ in 0..500 {
            let result = scorer.evaluate("travel", "wo xiang qu beijing", Lang::En);
            assert!(RandomSpeechScorer::OVERALL.contains(&result.score));
            assert!(RandomSpeechScorer::PRONUNCIATION.contains(&result.pronunciation_score));
            assert!(RandomSpeechScorer::FLUENCY.contains(&result.fluency_score));
            assert!(
                result
                    .feedback
                    .contains(&result.pronunciation_score.to_string())
            );
        }
    }
}
