use crate::directory::Directory;
use crate::models::{FacetCount, FacetKind, WILDCARD};
use tracing::{debug, warn};

/// Facet values with this population or fewer are treated as noise.
pub const MIN_POPULATION: u64 = 5;

/// Selectable values of one facet, wildcard first, then sorted names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetVocabulary {
    entries: Vec<String>,
}

impl Default for FacetVocabulary {
    fn default() -> Self {
        Self {
            entries: vec![WILDCARD.to_string()],
        }
    }
}

impl FacetVocabulary {
    pub fn from_counts(counts: Vec<FacetCount>) -> Self {
        let mut names: Vec<String> = counts
            .into_iter()
            .filter(|c| c.population > MIN_POPULATION)
            .map(|c| c.name.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        names.sort();
        names.dedup();

        let mut entries = Vec::with_capacity(names.len() + 1);
        entries.push(WILDCARD.to_string());
        entries.extend(names);
        Self { entries }
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Concrete values, without the wildcard.
    pub fn values(&self) -> &[String] {
        &self.entries[1..]
    }

    pub fn contains(&self, value: &str) -> bool {
        self.values().binary_search_by(|v| v.as_str().cmp(value)).is_ok()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetCatalog {
    pub countries: FacetVocabulary,
    pub languages: FacetVocabulary,
    pub tags: FacetVocabulary,
}

impl FacetCatalog {
    pub fn get(&self, kind: FacetKind) -> &FacetVocabulary {
        match kind {
            FacetKind::Country => &self.countries,
            FacetKind::Language => &self.languages,
            FacetKind::Tag => &self.tags,
        }
    }

    fn slot(&mut self, kind: FacetKind) -> &mut FacetVocabulary {
        match kind {
            FacetKind::Country => &mut self.countries,
            FacetKind::Language => &mut self.languages,
            FacetKind::Tag => &mut self.tags,
        }
    }
}

/// Result of one catalog load. Vocabularies that loaded are kept even when
/// another facet failed.
#[derive(Debug)]
pub struct CatalogLoad {
    pub catalog: FacetCatalog,
    pub failures: Vec<(FacetKind, anyhow::Error)>,
}

impl CatalogLoad {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Fetches the three facet vocabularies concurrently. Never retries.
pub async fn load_catalog<D: Directory + ?Sized>(directory: &D) -> CatalogLoad {
    let (countries, languages, tags) = tokio::join!(
        directory.fetch_facet(FacetKind::Country),
        directory.fetch_facet(FacetKind::Language),
        directory.fetch_facet(FacetKind::Tag),
    );

    let mut load = CatalogLoad {
        catalog: FacetCatalog::default(),
        failures: Vec::new(),
    };
    for (kind, res) in FacetKind::ALL.into_iter().zip([countries, languages, tags]) {
        match res {
            Ok(counts) => {
                let vocab = FacetVocabulary::from_counts(counts);
                debug!(facet = %kind, count = vocab.values().len(), "facet vocabulary loaded");
                *load.catalog.slot(kind) = vocab;
            }
            Err(e) => {
                warn!(facet = %kind, error = ?e, "facet vocabulary failed to load");
                load.failures.push((kind, e));
            }
        }
    }
    load
}
