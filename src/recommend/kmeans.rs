use rand::Rng;
use tracing::{debug, instrument};

use super::entities::Document;

/// Upper bound on assignment rounds. This is the only thing bounding a clustering pass.
pub const MAX_ITERATIONS: usize = 20;

/// Cosine of the angle between two vectors, 0 if either of them is a zero vector.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> f64 {
    let mut dot = 0f64;
    let mut norm_a = 0f64;
    let mut norm_b = 0f64;
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a > 0. && norm_b > 0. {
        dot / (norm_a.sqrt() * norm_b.sqrt())
    } else {
        0.
    }
}

/// Outcome of a clustering pass.
#[derive(Debug, Clone, PartialEq)]
pub struct Clustering {
    pub centroids: Vec<Vec<f64>>,
    /// Assignment rounds that were run.
    pub rounds: usize,
    /// False if the round cap stopped the pass while assignments were still moving.
    pub converged: bool,
}

/// Clusters `documents` into at most `k` groups, writing the result into [Document::cluster].
/// Centroids are seeded from randomly picked documents (the same document may be picked more than
/// once). Stops once a round changes no assignment or after [MAX_ITERATIONS] rounds.
#[instrument(skip(documents, rng))]
pub fn k_means<R: Rng + ?Sized>(documents: &mut [Document], k: usize, rng: &mut R) -> Clustering {
    k_means_bounded(documents, k, rng, MAX_ITERATIONS)
}

fn k_means_bounded<R: Rng + ?Sized>(
    documents: &mut [Document],
    k: usize,
    rng: &mut R,
    max_rounds: usize,
) -> Clustering {
    if documents.is_empty() || k == 0 {
        return Clustering {
            centroids: vec![],
            rounds: 0,
            converged: true,
        };
    }

    let mut centroids = (0..k)
        .map(|_| documents[rng.gen_range(0..documents.len())].vector.clone())
        .collect::<Vec<_>>();

    let mut rounds = 0;
    let mut changed = true;
    while changed && rounds < max_rounds {
        rounds += 1;
        changed = assign(documents, &centroids);
        update_centroids(documents, &mut centroids);
    }
    debug!("Clustering finished after {rounds} rounds, converged: {}", !changed);

    Clustering {
        centroids,
        rounds,
        converged: !changed,
    }
}

/// Moves every document to its most similar centroid. On equal similarity the lower index is kept.
/// Returns whether any assignment changed.
fn assign(documents: &mut [Document], centroids: &[Vec<f64>]) -> bool {
    let mut changed = false;
    for document in documents.iter_mut() {
        let mut best = 0;
        let mut max_similarity = -1f64;
        for (i, centroid) in centroids.iter().enumerate() {
            let similarity = cosine_similarity(&document.vector, centroid);
            if similarity > max_similarity {
                max_similarity = similarity;
                best = i;
            }
        }
        if document.cluster != Some(best) {
            document.cluster = Some(best);
            changed = true;
        }
    }
    changed
}

/// Recomputes centroids as the mean of their members. A centroid without members stays where it
/// was.
fn update_centroids(documents: &[Document], centroids: &mut [Vec<f64>]) {
    for (i, centroid) in centroids.iter_mut().enumerate() {
        let members = documents
            .iter()
            .filter(|v| v.cluster == Some(i))
            .collect::<Vec<_>>();
        if members.is_empty() {
            continue;
        }
        let mut mean = vec![0.; centroid.len()];
        for member in &members {
            for (sum, value) in mean.iter_mut().zip(&member.vector) {
                *sum += value;
            }
        }
        for value in mean.iter_mut() {
            *value /= members.len() as f64;
        }
        *centroid = mean;
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_pcg::Mcg128Xsl64;

    use crate::recommend::entities::Document;

    use super::{assign, cosine_similarity, k_means, k_means_bounded, update_centroids};

    #[test]
    fn test_cosine_similarity() {
        assert!((cosine_similarity(&[1., 2.], &[2., 4.]) - 1.).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[1., 0.], &[0., 1.]), 0.);
        assert!((cosine_similarity(&[1., 0.], &[-1., 0.]) + 1.).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[0., 0.], &[1., 1.]), 0.);
        assert_eq!(cosine_similarity(&[0., 0.], &[0., 0.]), 0.);
    }

    #[test]
    fn test_assign_ties_go_to_lowest_index() {
        let mut documents = vec![Document::new(vec![1., 0.]), Document::new(vec![0., 0.])];
        let centroids = vec![vec![0., 1.], vec![2., 0.], vec![1., 0.]];
        assert!(assign(&mut documents, &centroids));
        // Equal similarity with centroids 1 and 2.
        assert_eq!(documents[0].cluster, Some(1));
        // Zero vector is equally (un)similar to everything.
        assert_eq!(documents[1].cluster, Some(0));
        assert!(!assign(&mut documents, &centroids));
    }

    #[test]
    fn test_update_centroids_keeps_empty_clusters() {
        let mut documents = vec![Document::new(vec![1., 0.]), Document::new(vec![3., 2.])];
        documents[0].cluster = Some(0);
        documents[1].cluster = Some(0);
        let mut centroids = vec![vec![0., 0.], vec![5., 5.]];
        update_centroids(&documents, &mut centroids);
        assert_eq!(centroids, vec![vec![2., 1.], vec![5., 5.]]);
    }

    #[test]
    fn test_k_means_separates_orthogonal_groups() {
        let mut rng = Mcg128Xsl64::seed_from_u64(11);
        for _ in 0..20 {
            let mut documents = vec![
                Document::new(vec![1., 0.1, 0.]),
                Document::new(vec![0.9, 0., 0.]),
                Document::new(vec![0., 0., 1.]),
                Document::new(vec![0., 0.1, 0.8]),
            ];
            let clustering = k_means(&mut documents, 2, &mut rng);
            assert_eq!(clustering.centroids.len(), 2);
            // Any seeding settles within three rounds on this input.
            assert!(clustering.converged);
            assert!(clustering.rounds <= 3);
            assert!(documents.iter().all(|v| matches!(v.cluster, Some(c) if c < 2)));
            assert_eq!(documents[0].cluster, documents[1].cluster);
            assert_eq!(documents[2].cluster, documents[3].cluster);
        }
    }

    #[test]
    fn test_k_means_empty_input() {
        let mut rng = Mcg128Xsl64::seed_from_u64(1);
        assert!(k_means(&mut Vec::<Document>::new(), 3, &mut rng)
            .centroids
            .is_empty());
        let mut documents = vec![Document::new(vec![1.])];
        let clustering = k_means(&mut documents, 0, &mut rng);
        assert!(clustering.centroids.is_empty());
        assert_eq!(clustering.rounds, 0);
        assert_eq!(documents[0].cluster, None);
    }

    #[test]
    fn test_k_means_stops_once_assignments_are_stable() {
        let mut rng = Mcg128Xsl64::seed_from_u64(3);
        let mut documents = vec![
            Document::new(vec![1., 0.]),
            Document::new(vec![0., 1.]),
            Document::new(vec![1., 1.]),
        ];
        // A single cluster is final after the first round, the second one only confirms it.
        let clustering = k_means(&mut documents, 1, &mut rng);
        assert_eq!(clustering.rounds, 2);
        assert!(clustering.converged);
        assert_eq!(clustering.centroids, vec![vec![2. / 3., 2. / 3.]]);
    }

    #[test]
    fn test_k_means_round_cap() {
        let mut rng = Mcg128Xsl64::seed_from_u64(3);
        let mut documents = vec![Document::new(vec![1., 0.]), Document::new(vec![0., 1.])];
        let clustering = k_means_bounded(&mut documents, 2, &mut rng, 1);
        assert_eq!(clustering.rounds, 1);
        assert!(!clustering.converged);
        assert!(documents.iter().all(|v| v.cluster.is_some()));
    }
}
