use anyhow::Result;
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_pcg::Mcg128Xsl64;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::{
    entities::{CatalogItem, Document, HistoryEntry},
    kmeans::k_means,
    sources::{CatalogSource, HistorySource},
    tfidf::TfIdf,
};

pub const DEFAULT_CLUSTER_COUNT: usize = 6;

/// Upper bound on the number of recommended applications.
pub const RECOMMENDATION_COUNT: usize = 3;

/// Groups the catalog by textual similarity. Returns one cluster index per item, in catalog order.
/// At most `min(cluster_count, catalog.len())` clusters are used, at least one for a non-empty
/// catalog.
pub fn cluster_catalog<R: Rng + ?Sized>(
    catalog: &[CatalogItem],
    cluster_count: usize,
    rng: &mut R,
) -> Vec<Option<usize>> {
    let TfIdf { vectors, .. } = TfIdf::build(catalog);
    let mut documents = vectors.into_iter().map(Document::new).collect::<Vec<_>>();

    let k = cluster_count.clamp(1, catalog.len().max(1));
    k_means(&mut documents, k, rng);

    documents.into_iter().map(|v| v.cluster).collect()
}

/// Recommends applications similar to the most recent quest choice.
///
/// The catalog is clustered and up to [RECOMMENDATION_COUNT] random applications are taken from
/// the cluster of the latest history entry, excluding that application. If it's alone in its
/// cluster, it is recommended again. An empty history, an empty catalog or a latest choice missing
/// from the catalog produce no recommendations.
///
/// Randomness comes from `rng`, so the result is only reproducible with a seeded generator.
#[instrument(skip_all, fields(catalog = catalog.len(), history = history.len()))]
pub fn recommend<R: Rng + ?Sized>(
    catalog: &[CatalogItem],
    history: &[HistoryEntry],
    cluster_count: usize,
    rng: &mut R,
) -> Vec<CatalogItem> {
    // Ties keep the earliest entry.
    let Some(latest) = history
        .iter()
        .reduce(|a, b| if b.chosen_at > a.chosen_at { b } else { a })
    else {
        return vec![];
    };
    if catalog.is_empty() {
        return vec![];
    }

    let clusters = cluster_catalog(catalog, cluster_count, rng);

    let Some(target) = catalog
        .iter()
        .position(|v| v.identifier == latest.identifier)
    else {
        debug!("Latest choice {} is not in the catalog", latest.identifier);
        return vec![];
    };
    let target_cluster = clusters[target];

    let neighbours = catalog
        .iter()
        .zip(&clusters)
        .filter(|(item, cluster)| {
            **cluster == target_cluster && item.identifier != latest.identifier
        })
        .map(|(item, _)| item)
        .collect::<Vec<_>>();

    debug!(
        "{} shares cluster {target_cluster:?} with {} apps",
        latest.identifier,
        neighbours.len()
    );

    if neighbours.is_empty() {
        vec![catalog[target].clone()]
    } else {
        neighbours
            .choose_multiple(rng, RECOMMENDATION_COUNT)
            .map(|v| (*v).clone())
            .collect()
    }
}

/// Configured entry point for recommendations. Without a seed every call uses fresh entropy.
#[derive(Debug, Clone, Copy)]
pub struct RecommendationEngine {
    cluster_count: usize,
    seed: Option<u64>,
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self {
            cluster_count: DEFAULT_CLUSTER_COUNT,
            seed: None,
        }
    }
}

impl RecommendationEngine {
    pub fn new(cluster_count: usize, seed: Option<u64>) -> Self {
        Self {
            cluster_count,
            seed,
        }
    }

    pub fn recommend(&self, catalog: &[CatalogItem], history: &[HistoryEntry]) -> Vec<CatalogItem> {
        let mut rng = match self.seed {
            Some(seed) => Mcg128Xsl64::seed_from_u64(seed),
            None => Mcg128Xsl64::from_entropy(),
        };
        recommend(catalog, history, self.cluster_count, &mut rng)
    }

    pub fn recommend_from(
        &self,
        catalog: &dyn CatalogSource,
        history: &dyn HistorySource,
    ) -> Result<Vec<CatalogItem>> {
        let history = history.history()?;
        if history.is_empty() {
            return Ok(vec![]);
        }
        Ok(self.recommend(&catalog.catalog()?, &history))
    }

    /// Same as [RecommendationEngine::recommend_from], but reads the sources and runs the
    /// clustering on the blocking pool. Returns [None] if `cancel` fires first, the computation
    /// itself can't be interrupted and its result is dropped.
    pub async fn recommend_in_background<C, H>(
        self,
        catalog: C,
        history: H,
        cancel: CancellationToken,
    ) -> Result<Option<Vec<CatalogItem>>>
    where
        C: CatalogSource + Send + 'static,
        H: HistorySource + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(move || self.recommend_from(&catalog, &history));
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Recommendation cancelled");
                Ok(None)
            }
            result = task => Ok(Some(result??)),
        }
    }
}
