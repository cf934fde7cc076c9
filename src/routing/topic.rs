//! Topic resolution.

use crate::config::TopicOptions;
use crate::envelope::EnvelopeMetadata;
use crate::error::ConfigError;

use super::OverrideTable;

/// Where a message is published on a topic-style broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTarget {
    pub project_id: String,
    pub topic_id: String,
}

impl TopicTarget {
    /// Fully-qualified `projects/{project}/topics/{topic}` name, or the bare
    /// topic id when no project is configured.
    pub fn path(&self) -> String {
        if self.project_id.is_empty() {
            self.topic_id.clone()
        } else {
            format!("projects/{}/topics/{}", self.project_id, self.topic_id)
        }
    }
}

/// Resolves [`TopicTarget`]s. One topic per configuration unless an event
/// has a `topicId` override.
#[derive(Debug, Clone)]
pub struct TopicRouting {
    options: TopicOptions,
    overrides: OverrideTable,
}

impl TopicRouting {
    pub fn new(options: TopicOptions) -> Result<Self, ConfigError> {
        options.validate()?;
        let overrides = OverrideTable::new(&options.overrides);
        Ok(Self { options, overrides })
    }

    pub fn options(&self) -> &TopicOptions {
        &self.options
    }

    pub fn resolve(&self, meta: &EnvelopeMetadata) -> TopicTarget {
        let topic_id = self
            .overrides
            .get(&meta.name)
            .and_then(|r| r.topic_id.clone())
            .unwrap_or_else(|| self.options.topic_id.clone());

        TopicTarget {
            project_id: self.options.project_id.clone(),
            topic_id,
        }
    }
}
