pub mod provider;
pub mod gemini;
pub mod prompts;
pub mod local;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::error::Result;
use crate::models::Snapshot;

pub use gemini::GeminiGenerator;
pub use local::local_summary;
pub use prompts::SummaryRequest;
pub use provider::SummaryGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummarySource {
    Generated,
    Local,
}

impl SummarySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SummarySource::Generated => "generated",
            SummarySource::Local => "local",
        }
    }
}

impl fmt::Display for SummarySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SummarySource {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "generated" => Ok(SummarySource::Generated),
            "local" => Ok(SummarySource::Local),
            other => Err(format!("unknown summary source '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub content: String,
    pub source: SummarySource,
    /// Model that wrote a generated summary.
    pub model: Option<String>,
}

impl Summary {
    pub fn local(snapshot: &Snapshot) -> Self {
        Self {
            content: local_summary(snapshot),
            source: SummarySource::Local,
            model: None,
        }
    }
}

/// Picks between the configured generator and the local fallback. Never
/// fails: any generator error yields the local summary.
pub struct SummaryService {
    generator: Option<Box<dyn SummaryGenerator>>,
}

impl SummaryService {
    pub fn new(generator: Option<Box<dyn SummaryGenerator>>) -> Self {
        Self { generator }
    }

    pub fn local_only() -> Self {
        Self { generator: None }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let generator: Option<Box<dyn SummaryGenerator>> = match &config.gemini_api_key {
            Some(key) => Some(Box::new(GeminiGenerator::new(
                key.clone(),
                Some(config.summary_model.clone()),
            )?)),
            None => None,
        };
        Ok(Self { generator })
    }

    pub fn generator_name(&self) -> Option<&str> {
        self.generator.as_deref().map(|g| g.name())
    }

    pub async fn summarize(&self, snapshot: &Snapshot) -> Summary {
        let Some(generator) = self.generator.as_deref() else {
            return Summary::local(snapshot);
        };

        match generator.generate(snapshot).await {
            Ok(content) if !content.trim().is_empty() => {
                tracing::info!("Summary generated with {} ({})", generator.name(), generator.model());
                Summary {
                    content,
                    source: SummarySource::Generated,
                    model: Some(generator.model().to_string()),
                }
            }
            Ok(_) => {
                tracing::warn!("{} returned an empty summary, using local summary", generator.name());
                Summary::local(snapshot)
            }
            Err(e) => {
                tracing::warn!("{} summary failed, using local summary: {}", generator.name(), e);
                Summary::local(snapshot)
            }
        }
    }
}
