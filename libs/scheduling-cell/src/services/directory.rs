// libs/scheduling-cell/src/services/directory.rs
use std::collections::BTreeMap;

use tracing::debug;

use crate::error::SchedulingError;
use crate::models::{Provider, SpecializationSummary};
use crate::store::LedgerTx;

#[derive(Debug, Clone, Copy, Default)]
pub struct DirectoryService;

impl DirectoryService {
    pub fn new() -> Self {
        Self
    }

    pub async fn providers_by_specialization(
        &self,
        tx: &mut dyn LedgerTx,
        specialization: &str,
    ) -> Result<Vec<Provider>, SchedulingError> {
        let specialization = specialization.trim();
        if specialization.is_empty() {
            return Err(SchedulingError::Validation("specialization is required".to_string()));
        }

        debug!("Looking up providers for specialization {}", specialization);
        let providers = tx.providers_by_specialization(specialization).await?;
        if providers.is_empty() {
            return Err(SchedulingError::NotFound(format!(
                "Providers with specialization '{}'",
                specialization
            )));
        }

        Ok(providers)
    }

    /// Specializations with their provider counts, alphabetically.
    pub async fn specializations(
        &self,
        tx: &mut dyn LedgerTx,
    ) -> Result<Vec<SpecializationSummary>, SchedulingError> {
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for provider in tx.providers().await? {
            *counts.entry(provider.specialization).or_default() += 1;
        }

        Ok(counts
            .into_iter()
            .map(|(specialization, provider_count)| SpecializationSummary { specialization, provider_count })
            .collect())
    }
}
