use std::collections::BTreeMap;

use crate::config::HeatmapConfig;

/// How a raw sender string was attributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Alias(String),
    Fuzzy(String),
    /// No roster match; the sender stands for itself and never reaches the matrix.
    Unresolved,
}

impl Resolution {
    pub fn canonical(&self) -> Option<&str> {
        match self {
            Resolution::Alias(name) | Resolution::Fuzzy(name) => Some(name),
            Resolution::Unresolved => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Resolution::Alias(_) => "alias",
            Resolution::Fuzzy(_) => "fuzzy",
            Resolution::Unresolved => "unresolved",
        }
    }
}

/// Keeps ASCII letters and spaces after trimming, lower-cased.
pub fn normalize_name(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == ' ')
        .collect::<String>()
        .to_lowercase()
}

pub struct Reconciler<'a> {
    config: &'a HeatmapConfig,
}

impl<'a> Reconciler<'a> {
    pub fn new(config: &'a HeatmapConfig) -> Self {
        Self { config }
    }

    /// Alias table first, then the first roster name in declared order that
    /// contains (or is contained in) the normalized sender.
    pub fn resolve(&self, raw: &str) -> Resolution {
        if let Some(canonical) = self.config.aliases.get(raw) {
            return Resolution::Alias(canonical.clone());
        }

        let normalized = normalize_name(raw);
        let matched = self.config.roster.iter().find(|canonical| {
            let canonical = canonical.to_lowercase();
            canonical.contains(&normalized) || normalized.contains(&canonical)
        });

        match matched {
            Some(canonical) => {
                // An empty or blank form is contained in the first roster name (with a space).
                if normalized.trim().is_empty() {
                    tracing::warn!(
                        event = "sender_matched_without_letters",
                        sender = raw,
                        canonical = canonical.as_str()
                    );
                }
                Resolution::Fuzzy(canonical.clone())
            }
            None => Resolution::Unresolved,
        }
    }

    pub fn reconcile<I, S>(&self, raw_names: I) -> NameResolution
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut resolution = NameResolution::default();

        for raw in raw_names {
            let raw = raw.as_ref();
            if resolution.targets.contains_key(raw) {
                continue;
            }

            let resolved = self.resolve(raw);
            match resolved.canonical() {
                Some(canonical) => resolution
                    .by_canonical
                    .entry(canonical.to_string())
                    .or_default()
                    .push(raw.to_string()),
                None => tracing::warn!(event = "sender_unresolved", sender = raw),
            }
            resolution.targets.insert(raw.to_string(), resolved);
        }

        resolution
    }
}

/// Every observed raw sender mapped to exactly one target, plus the inverse
/// multimap from roster names to all raw senders attributed to them.
#[derive(Debug, Clone, Default)]
pub struct NameResolution {
    targets: BTreeMap<String, Resolution>,
    by_canonical: BTreeMap<String, Vec<String>>,
}

impl NameResolution {
    /// The roster name a sender resolves to, or the sender itself when unresolved.
    pub fn target<'s>(&'s self, raw: &'s str) -> &'s str {
        self.targets
            .get(raw)
            .and_then(Resolution::canonical)
            .unwrap_or(raw)
    }

    pub fn raw_names_for(&self, canonical: &str) -> &[String] {
        self.by_canonical
            .get(canonical)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &Resolution)> {
        self.targets.iter().map(|(raw, resolution)| (raw.as_str(), resolution))
    }

    pub fn unresolved(&self) -> impl Iterator<Item = &str> {
        self.entries()
            .filter(|(_, resolution)| resolution.canonical().is_none())
            .map(|(raw, _)| raw)
    }
}
