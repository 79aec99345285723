//! Command flows: glue between the configuration file, the database and the core.
//!
//! The `plan`, `apply` and `pull` entry points own the connection for the duration of
//! a run. The helpers they are built from take any [`IndexStore`], which keeps them
//! testable against a mock.

use std::io::Write;
use std::path::Path;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::{self, ConfigError, IndexConfigEntry};
use crate::core::client::database::{DatabaseError, IndexStore};
use crate::core::client::MongoClient;
use crate::normalizer::{normalize_desired, normalize_observed, observed_to_config};
use crate::reconcile::{compute_plan, ComparePolicy};
use crate::render::Renderer;
use crate::types::index::CollectionIndexSet;
use crate::types::params::RunParams;
use crate::types::plan::{IndexOperation, ReconciliationPlan};
use crate::MondexResult;

/// Result of a single create or drop during `apply`.
#[derive(Debug)]
pub struct OperationOutcome {
    pub collection: String,
    pub operation: IndexOperation,
    pub result: Result<(), DatabaseError>,
}

impl OperationOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Progress of an `apply`, reported while it runs.
#[derive(Debug, Clone, Copy)]
pub enum ApplyProgress<'a> {
    /// The operation is about to be sent to the database.
    Started { collection: &'a str, operation: &'a IndexOperation },
    /// The operation completed, successfully or not.
    Finished(&'a OperationOutcome),
}

/// Per-operation outcomes of an `apply`, in execution order.
#[derive(Debug, Default)]
pub struct ApplyReport {
    outcomes: Vec<OperationOutcome>,
}

impl ApplyReport {
    pub fn outcomes(&self) -> &[OperationOutcome] {
        &self.outcomes
    }

    pub fn failures(&self) -> impl Iterator<Item = &OperationOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.is_success())
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failures().count()
    }

    pub fn succeeded_count(&self) -> usize {
        self.total() - self.failed_count()
    }

    pub fn is_success(&self) -> bool {
        self.failed_count() == 0
    }
}

impl FromIterator<OperationOutcome> for ApplyReport {
    fn from_iter<T: IntoIterator<Item = OperationOutcome>>(iter: T) -> Self {
        Self { outcomes: iter.into_iter().collect() }
    }
}

/// Reads the configuration file and normalizes it into the desired index set.
pub fn load_desired(path: &Path) -> Result<CollectionIndexSet, ConfigError> {
    let entries = config::load_config(path)?;
    let desired = normalize_desired(&entries)?;
    debug!(path = %path.display(), collections = desired.len(), "Loaded index configuration");
    Ok(desired)
}

/// Reads the indexes of every collection accepted by `include`.
///
/// Collections come back in name order. Collections that do not exist yet simply
/// have no entry.
pub async fn fetch_observed<F>(store: &dyn IndexStore, include: F) -> Result<CollectionIndexSet, DatabaseError>
where
    F: Fn(&str) -> bool,
{
    let mut observed = CollectionIndexSet::new();
    for collection in store.list_collections().await? {
        if !include(&collection) {
            continue;
        }
        let indexes = store.list_indexes(&collection).await?;
        observed.insert(collection, indexes.into_iter().map(normalize_observed).collect());
    }
    Ok(observed)
}

/// Fetches the observed state of the configured collections and diffs it against `desired`.
pub async fn build_plan(
    store: &dyn IndexStore,
    desired: &CollectionIndexSet,
    policy: ComparePolicy,
) -> Result<ReconciliationPlan, DatabaseError> {
    let observed = fetch_observed(store, |collection| desired.contains_key(collection)).await?;
    let plan = compute_plan(&observed, desired, policy);
    info!(collections = plan.len(), operations = plan.operation_count(), "Computed reconciliation plan");
    Ok(plan)
}

/// Executes `plan` one operation at a time.
///
/// Collections are processed in plan order and, within a collection, every drop runs
/// before any create. A failed operation is recorded and the next one still runs;
/// nothing already applied is undone. `on_progress` sees every operation right
/// before it is sent and again once it completes.
pub async fn apply_plan<F>(store: &dyn IndexStore, plan: &ReconciliationPlan, mut on_progress: F) -> ApplyReport
where
    F: FnMut(ApplyProgress<'_>),
{
    let mut report = ApplyReport::default();

    for diff in plan {
        let span = info_span!("collection", collection = %diff.collection);
        async {
            for operation in diff.operations() {
                on_progress(ApplyProgress::Started { collection: &diff.collection, operation: &operation });
                let result = execute(store, &diff.collection, &operation).await;
                match &result {
                    Ok(()) => info!(index = %operation.index().name, drop = operation.is_drop(), "Index operation applied"),
                    Err(e) => warn!(
                        index = %operation.index().name,
                        drop = operation.is_drop(),
                        error = %e,
                        "Index operation failed"
                    ),
                }
                let outcome = OperationOutcome { collection: diff.collection.clone(), operation, result };
                on_progress(ApplyProgress::Finished(&outcome));
                report.outcomes.push(outcome);
            }
        }
        .instrument(span)
        .await;
    }

    report
}

async fn execute(store: &dyn IndexStore, collection: &str, operation: &IndexOperation) -> Result<(), DatabaseError> {
    match operation {
        IndexOperation::Drop(index) => store.drop_index(collection, &index.name).await,
        IndexOperation::Create(index) => store.create_index(collection, index).await,
    }
}

/// Reads every collection of the database and renders it as configuration entries.
pub async fn pull_config(store: &dyn IndexStore) -> Result<Vec<IndexConfigEntry>, DatabaseError> {
    let observed = fetch_observed(store, |_| true).await?;
    Ok(observed_to_config(&observed))
}

/// `plan`: render the changes `apply` would make.
pub async fn plan(params: &RunParams, out: &mut impl Write) -> MondexResult<ReconciliationPlan> {
    let desired = load_desired(&params.index_file)?;
    let client = MongoClient::connect(&params.database).await?;
    let plan = build_plan(&client, &desired, params.policy).await?;

    Renderer::new(params.colored).plan(&plan, out)?;
    Ok(plan)
}

/// `apply`: compute the plan and execute it, printing each operation as it runs.
///
/// Returns `Err` only when the plan could not be computed. Failed operations are
/// reported through the returned [`ApplyReport`].
pub async fn apply(params: &RunParams, out: &mut impl Write) -> MondexResult<ApplyReport> {
    let desired = load_desired(&params.index_file)?;
    let client = MongoClient::connect(&params.database).await?;
    let plan = build_plan(&client, &desired, params.policy).await?;

    let mut printer = Renderer::new(params.colored).apply_printer(out);
    let report = apply_plan(&client, &plan, |progress| printer.record(progress)).await;
    printer.finish(&report)?;
    Ok(report)
}

/// `pull`: write the database's current indexes to the configuration file.
///
/// Returns the number of collections written. Nothing is written when the database
/// has no index besides `_id_`.
pub async fn pull(params: &RunParams, out: &mut impl Write) -> MondexResult<usize> {
    config::ensure_pull_target(&params.index_file)?;
    let client = MongoClient::connect(&params.database).await?;
    let entries = pull_config(&client).await?;

    let renderer = Renderer::new(params.colored);
    if entries.is_empty() {
        renderer.info("No existing indexes found", out)?;
        return Ok(0);
    }

    config::save_config(&params.index_file, &entries)?;
    renderer.success(&format!("Config file written at: {}", params.index_file.display()), out)?;
    Ok(entries.len())
}
