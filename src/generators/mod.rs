//! Event Generators
//!
//! Payload sources plugged into the hub:
//!
//! - [`TranscriptGenerator`]: plays a scripted call transcript, then a
//!   terminal summary
//! - [`RandomGenerator`]: an endless stream of random readings

mod random;
mod transcript;

pub use random::RandomGenerator;
pub use transcript::{CallSummary, Sentiment, SentimentBreakdown, TranscriptEntry, TranscriptGenerator};

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::Arc;

use crate::hub::EventGenerator;

/// Selects which generator feeds every stream
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    #[default]
    Transcript,
    Random,
}

impl GeneratorKind {
    pub fn build(self) -> Arc<dyn EventGenerator> {
        match self {
            Self::Transcript => Arc::new(TranscriptGenerator::default()),
            Self::Random => Arc::new(RandomGenerator::new()),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Transcript => "transcript",
            Self::Random => "random",
        }
    }
}

impl std::fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GeneratorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transcript" => Ok(Self::Transcript),
            "random" => Ok(Self::Random),
            other => Err(format!("unknown generator: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_kind() {
        assert_eq!("transcript".parse::<GeneratorKind>(), Ok(GeneratorKind::Transcript));
        assert_eq!(" Random ".parse::<GeneratorKind>(), Ok(GeneratorKind::Random));
        assert!("nope".parse::<GeneratorKind>().is_err());
    }

    #[test]
    fn test_build_names() {
        assert_eq!(GeneratorKind::Transcript.build().name(), "transcript");
        assert_eq!(GeneratorKind::Random.build().name(), "random");
    }

    #[test]
    fn test_kind_deserialize() {
        #[derive(Deserialize)]
        struct Wrapper {
            generator: GeneratorKind,
        }
        let parsed: Wrapper = toml::from_str(r#"generator = "random""#).unwrap();
        assert_eq!(parsed.generator, GeneratorKind::Random);
    }
}
