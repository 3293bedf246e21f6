//! Embedding-based payee clustering

use tracing::debug;

use crate::ai::Orchestrator;
use crate::analytics::{cosine_similarity, normalize_payee};
use crate::error::Result;

/// Payee spellings judged to be the same merchant
#[derive(Debug, Clone, PartialEq)]
pub struct PayeeCluster {
    /// Normalized name of the first member
    pub canonical: String,
    pub members: Vec<String>,
}

/// Group payee names whose embeddings are at least `threshold` similar
///
/// Greedy single pass: each payee joins the first cluster whose first
/// member it resembles, otherwise it starts a new cluster. Names that
/// normalize identically are grouped without an embedding call.
pub async fn cluster_payees(
    orchestrator: &Orchestrator,
    payees: &[String],
    threshold: f32,
) -> Result<Vec<PayeeCluster>> {
    let mut clusters: Vec<(PayeeCluster, Vec<f32>)> = Vec::new();

    for payee in payees {
        let canonical = normalize_payee(payee);
        if let Some((cluster, _)) = clusters.iter_mut().find(|(c, _)| c.canonical == canonical) {
            if !cluster.members.contains(payee) {
                cluster.members.push(payee.clone());
            }
            continue;
        }

        let embedding = orchestrator.embed(&canonical).await?;
        let nearest = clusters
            .iter_mut()
            .find(|(_, centre)| cosine_similarity(&embedding, centre) >= threshold);

        match nearest {
            Some((cluster, _)) => {
                debug!(payee = %payee, cluster = %cluster.canonical, "Joined payee cluster");
                cluster.members.push(payee.clone());
            }
            None => clusters.push((
                PayeeCluster {
                    canonical,
                    members: vec![payee.clone()],
                },
                embedding,
            )),
        }
    }

    Ok(clusters.into_iter().map(|(cluster, _)| cluster).collect())
}
