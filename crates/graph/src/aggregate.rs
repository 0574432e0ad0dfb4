//! Citation aggregation
//!
//! Buckets paper-level citations by the clusters of their two ends. Buckets
//! and the citations inside them keep insertion order so rendering is
//! reproducible.

use indexmap::IndexMap;
use std::collections::HashMap;

use biblio_common::models::{Citation, Papers, ReferencesByPaper};
use biblio_common::{ClusterId, PaperId, NOISE_CLUSTER};

/// (source cluster, target cluster)
pub type PairKey = (ClusterId, ClusterId);

/// Citations grouped by cluster pair, in first-seen order
pub type ClusterPairs = IndexMap<PairKey, Vec<Citation>>;

/// Resolved outgoing citations per citing paper
pub type CitationsByPaper = IndexMap<PaperId, Vec<Citation>>;

/// Keep only citations between papers of the snapshot
///
/// References without a cited id or pointing outside `papers` are dropped.
/// Every citing paper of `references` keeps an entry, possibly empty.
pub fn restrict_to_snapshot(references: &ReferencesByPaper, papers: &Papers) -> CitationsByPaper {
    references
        .papers
        .iter()
        .map(|(citing, refs)| {
            let citations = refs
                .references
                .iter()
                .filter_map(|reference| reference.resolve(citing))
                .filter(|citation| papers.contains(&citation.cited))
                .collect();
            (citing.clone(), citations)
        })
        .collect()
}

/// Group citations by the clusters of the citing and cited papers
///
/// Ends without a cluster or in the noise cluster are skipped. Self-pairs are
/// kept here; retention rejects them later.
pub fn aggregate(
    citations: &CitationsByPaper,
    cluster_of: &HashMap<PaperId, ClusterId>,
) -> ClusterPairs {
    let mut pairs = ClusterPairs::new();

    for (citing, outgoing) in citations {
        let Some(&source) = cluster_of.get(citing) else {
            continue;
        };
        if source == NOISE_CLUSTER {
            continue;
        }

        for citation in outgoing {
            let Some(&target) = cluster_of.get(&citation.cited) else {
                continue;
            };
            if target == NOISE_CLUSTER {
                continue;
            }
            pairs.entry((source, target)).or_default().push(citation.clone());
        }
    }

    pairs
}
