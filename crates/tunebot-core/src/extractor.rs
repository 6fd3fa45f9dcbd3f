//! Song recommendations embedded in assistant replies
//!
//! The system prompt asks the model to wrap song names in 【】. Each marked
//! name is resolved against the local catalog by case-insensitive substring
//! containment in the track's display name.

use crate::catalog::Track;
use regex::Regex;
use std::sync::OnceLock;

fn marker_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"【(.*?)】").expect("static marker regex"))
}

/// How a name that matches several tracks is resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TieBreak {
    /// First matching track in catalog order
    #[default]
    FirstInCatalog,
    /// An exact (case-insensitive) display-name match wins, otherwise catalog order
    ExactFirst,
}

#[derive(Debug, Clone, Default)]
pub struct RecommendationExtractor {
    tie_break: TieBreak,
}

impl RecommendationExtractor {
    pub fn new(tie_break: TieBreak) -> Self {
        Self { tie_break }
    }

    /// Resolved file names in the order their markers appear in the reply.
    ///
    /// Unresolvable names are dropped; duplicates are kept.
    pub fn extract(&self, reply: &str, tracks: &[Track]) -> Vec<String> {
        marked_names(reply)
            .into_iter()
            .filter_map(|name| self.resolve(name, tracks))
            .map(|track| track.file_name.clone())
            .collect()
    }

    pub fn resolve<'a>(&self, name: &str, tracks: &'a [Track]) -> Option<&'a Track> {
        let needle = name.to_lowercase();

        if self.tie_break == TieBreak::ExactFirst {
            if let Some(exact) = tracks
                .iter()
                .find(|t| t.display_name.to_lowercase() == needle)
            {
                return Some(exact);
            }
        }

        tracks
            .iter()
            .find(|t| t.display_name.to_lowercase().contains(&needle))
    }
}

/// Non-empty names between 【 and 】, in order of appearance
pub fn marked_names(reply: &str) -> Vec<&str> {
    marker_regex()
        .captures_iter(reply)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| !name.is_empty())
        .collect()
}
