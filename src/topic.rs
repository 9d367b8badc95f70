use ratatui::style::Color;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicId {
    BlindSsrf,
    CloudMetadata,
    FilterBypass,
    DnsRebinding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
    Expert,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Medium => "Medium",
            Difficulty::Hard => "Hard",
            Difficulty::Expert => "Expert",
        }
    }

    /// Badge color for the topic list and lesson header.
    pub fn color(&self) -> Color {
        match self {
            Difficulty::Easy => Color::Green,
            Difficulty::Medium => Color::Blue,
            Difficulty::Hard => Color::Yellow,
            Difficulty::Expert => Color::Red,
        }
    }
}

/// A training module in the catalog. Built once at startup, never mutated.
#[derive(Debug, Clone)]
pub struct Topic {
    pub id: TopicId,
    pub title: &'static str,
    pub description: &'static str,
    pub difficulty: Difficulty,
    pub icon: &'static str,
}

impl Topic {
    pub fn catalog() -> Vec<Topic> {
        vec![
            Topic {
                id: TopicId::BlindSsrf,
                title: "Blind SSRF",
                description: "Exploiting vulnerabilities where the backend response is not returned.",
                difficulty: Difficulty::Hard,
                icon: "🛡",
            },
            Topic {
                id: TopicId::CloudMetadata,
                title: "Cloud Metadata",
                description: "Accessing instance metadata services (IMDSv1/v2) on AWS, GCP, and Azure.",
                difficulty: Difficulty::Medium,
                icon: "☁",
            },
            Topic {
                id: TopicId::FilterBypass,
                title: "Filter Bypasses",
                description: "Evading IP blocklists using octal, hex, and alternative encoding.",
                difficulty: Difficulty::Expert,
                icon: "⚙",
            },
            Topic {
                id: TopicId::DnsRebinding,
                title: "DNS Rebinding",
                description: "Bypassing same-origin policy using dynamic DNS resolution.",
                difficulty: Difficulty::Expert,
                icon: "🌐",
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_has_four_topics() {
        assert_eq!(Topic::catalog().len(), 4);
    }

    #[test]
    fn test_catalog_ids_are_unique() {
        let catalog = Topic::catalog();
        for (i, a) in catalog.iter().enumerate() {
            for b in catalog.iter().skip(i + 1) {
                assert_ne!(a.id, b.id);
            }
        }
    }

    #[test]
    fn test_catalog_order_is_stable() {
        let ids: Vec<TopicId> = Topic::catalog().iter().map(|t| t.id).collect();
        assert_eq!(
            ids,
            vec![
                TopicId::BlindSsrf,
                TopicId::CloudMetadata,
                TopicId::FilterBypass,
                TopicId::DnsRebinding,
            ]
        );
    }

    #[test]
    fn test_difficulty_labels() {
        assert_eq!(Difficulty::Easy.as_str(), "Easy");
        assert_eq!(Difficulty::Expert.as_str(), "Expert");
    }
}
