use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use crate::audit::{AuditLog, AuditRecord, ProductStatus};
use crate::catalogue::Catalogue;
use crate::codec::{parse_footprint, parse_timestamp};
use crate::config::ResolvedConfig;
use crate::descriptor::{ProductDescriptor, build_descriptor};
use crate::domain::{CatalogueRow, ProductLocation};
use crate::embedded::read_embedded_metadata;
use crate::error::AvhrrError;
use crate::output::ProductSink;
use crate::store::{Store, relocate, remove_source};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub dataset_override: Option<String>,
    pub reorganize: bool,
    pub separate_no_footprint: bool,
    pub remove_source: bool,
}

/// Where per-product metadata rows come from.
#[derive(Debug, Clone)]
pub enum MetadataSource {
    Catalogue(Catalogue),
    Embedded,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductOutcome {
    pub input: String,
    #[serde(serialize_with = "serialize_status")]
    pub status: ProductStatus,
    pub descriptor: Option<ProductDescriptor>,
    pub destination: Option<PathBuf>,
}

fn serialize_status<S: serde::Serializer>(
    status: &ProductStatus,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(status.as_str())
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub outcomes: Vec<ProductOutcome>,
    pub duplicates: usize,
}

impl RunSummary {
    pub fn resolved(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.status.is_resolved())
            .count()
    }

    pub fn unresolved(&self) -> usize {
        self.outcomes.len() - self.resolved()
    }
}

pub struct App {
    config: ResolvedConfig,
    source: MetadataSource,
    store: Store,
    options: RunOptions,
    audit: Option<AuditLog>,
}

impl App {
    pub fn new(
        config: ResolvedConfig,
        source: MetadataSource,
        store: Store,
        options: RunOptions,
    ) -> Self {
        Self {
            config,
            source,
            store,
            options,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    /// Processes every input in order. Per-product failures are recorded, not returned;
    /// only audit-log write failures abort the run.
    pub fn run(
        &mut self,
        inputs: &[PathBuf],
        sink: &dyn ProductSink,
    ) -> Result<RunSummary, AvhrrError> {
        let mut summary = RunSummary::default();
        let mut seen = HashSet::new();

        for input in inputs {
            let location = match ProductLocation::locate(input, &self.config) {
                Ok(location) => location,
                Err(err) => {
                    info!("---Processing product {}", input.display());
                    warn!("Product was not found or doesn't have the expected file structure! ({err})");
                    let outcome = ProductOutcome {
                        input: input.display().to_string(),
                        status: ProductStatus::NotLocated,
                        descriptor: None,
                        destination: None,
                    };
                    self.record(&outcome)?;
                    summary.outcomes.push(outcome);
                    continue;
                }
            };

            if !seen.insert(location.container_name()) {
                info!("Skipping duplicate product {}", location.path.display());
                summary.duplicates += 1;
                continue;
            }

            info!("---Processing product {}", location.path.display());
            let outcome = match self.process(&location, sink) {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!("{err}");
                    ProductOutcome {
                        input: location.path.display().to_string(),
                        status: status_for(&err),
                        descriptor: None,
                        destination: None,
                    }
                }
            };
            self.record(&outcome)?;
            summary.outcomes.push(outcome);
        }

        Ok(summary)
    }

    fn process(
        &self,
        location: &ProductLocation,
        sink: &dyn ProductSink,
    ) -> Result<ProductOutcome, AvhrrError> {
        let row = self.resolve_row(location)?;
        let footprint = parse_footprint(row.corners());
        let dataset_footprint = !self.options.separate_no_footprint || footprint.valid;

        let descriptor = build_descriptor(
            &location.product_id,
            location,
            &row,
            self.options.dataset_override.as_deref(),
            dataset_footprint,
            &self.config,
        )?;
        if !descriptor.processing_level.is_available() {
            info!("Could not find the processing level for the product.");
        }
        if !descriptor.footprint_valid {
            info!("Product has no footprint");
        }

        sink.emit(&descriptor)
            .map_err(|err| AvhrrError::Filesystem(err.to_string()))?;
        info!("Metadata was successfully printed to stdout");

        if !self.options.reorganize {
            return Ok(ProductOutcome {
                input: location.path.display().to_string(),
                status: ProductStatus::Metadata,
                descriptor: Some(descriptor),
                destination: None,
            });
        }

        let start = parse_timestamp(row.date(), row.start_time())?;
        let dir = self
            .store
            .destination_path(&descriptor.dataset, &start.instant)?;
        let relocation = relocate(location, dir.as_std_path())?;
        if self.options.remove_source {
            if relocation.is_stored() {
                remove_source(location)?;
            } else {
                warn!(
                    "Source kept: {} already existed and was not rewritten",
                    relocation.path().display()
                );
            }
        }
        let destination = relocation.into_path();
        Ok(ProductOutcome {
            input: location.path.display().to_string(),
            status: ProductStatus::Reorganized,
            descriptor: Some(descriptor),
            destination: Some(destination),
        })
    }

    fn resolve_row(&self, location: &ProductLocation) -> Result<CatalogueRow, AvhrrError> {
        match &self.source {
            MetadataSource::Catalogue(catalogue) => catalogue.lookup(&location.product_id),
            MetadataSource::Embedded => {
                read_embedded_metadata(&location.product_id, location).map(|meta| meta.row)
            }
        }
    }

    fn record(&mut self, outcome: &ProductOutcome) -> Result<(), AvhrrError> {
        let Some(audit) = self.audit.as_mut() else {
            return Ok(());
        };
        let record = match &outcome.descriptor {
            Some(descriptor) => AuditRecord {
                product: outcome.input.clone(),
                status: outcome.status,
                footprint_valid: Some(descriptor.footprint_valid),
                destination: outcome.destination.clone(),
                level: Some(descriptor.processing_level.clone()),
            },
            None => AuditRecord::unresolved(outcome.input.clone(), outcome.status),
        };
        audit.append(&record)
    }
}

fn status_for(err: &AvhrrError) -> ProductStatus {
    match err {
        AvhrrError::CatalogueRowNotFound(_) => ProductStatus::NotInCatalogue,
        AvhrrError::EmbeddedMetadataUnavailable { .. } => ProductStatus::NoEmbeddedMetadata,
        AvhrrError::MalformedTimestamp(_) | AvhrrError::MalformedFootprint(_) => {
            ProductStatus::MalformedMetadata
        }
        AvhrrError::ProductNotLocated(_) => ProductStatus::NotLocated,
        _ => ProductStatus::Failed,
    }
}

/// Reads one product path per line; blank lines are skipped.
pub fn read_input_list(path: &Path) -> Result<Vec<PathBuf>, AvhrrError> {
    let content = fs::read_to_string(path)
        .map_err(|err| AvhrrError::Filesystem(format!("{}: {err}", path.display())))?;
    Ok(content
        .lines()
        .map(str::trim_end)
        .filter(|line| !line.is_empty())
        .map(|line| PathBuf::from(line).components().collect::<PathBuf>())
        .collect())
}
