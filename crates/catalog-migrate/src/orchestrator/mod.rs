//! Migration orchestrator - main workflow coordinator.
//!
//! Runs the phases of [`Phase`] in order over one control connection pair.
//! Objects are processed in listing order. Per-object failures are recorded
//! and the run continues; only a lost control connection ends the run early.

pub mod phase;

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::apply::Applier;
use crate::config::{Config, TableDdlMode};
use crate::core::dialect::Dialect;
use crate::core::identifier::IdentStyle;
use crate::core::schema::{ConstraintClass, ObjectKind, SchemaObject};
use crate::core::traits::{ConnectionFactory, SourceCatalog, TargetCatalog, TypeMapper};
use crate::ddl::{
    rewrite_definition, AssistedGenerator, DdlGenerator, DeterministicGenerator, TableDdlGenerator,
};
use crate::error::{MigrateError, Result};
use crate::report::{
    EndpointHealth, HealthCheckResult, MigrationOutcome, MigrationPlan, MigrationReport,
    OutcomeStatus, PlannedPhase, RowCountCheck, RunWarning,
};
use crate::transfer::{TransferConfig, TransferEngine, TransferJob, TransferStats};
use crate::typemap::{OracleIdentityMapper, OracleToSnowflakeMapper};

pub use phase::Phase;

/// How table definitions are obtained for this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TablePath {
    Catalog,
    Generate,
}

impl TablePath {
    fn name(&self) -> &'static str {
        match self {
            TablePath::Catalog => "catalog",
            TablePath::Generate => "generate",
        }
    }

    /// Spelling that matches the DDL this path creates tables with.
    fn ident_style(&self) -> IdentStyle {
        match self {
            TablePath::Catalog => IdentStyle::Exact,
            TablePath::Generate => IdentStyle::Normalized,
        }
    }
}

/// Errors that mean a control connection is unusable. A timeout fails only
/// the object it happened on.
fn is_fatal(error: &MigrateError) -> bool {
    match error {
        MigrateError::Transport(_) => true,
        MigrateError::Backend(e) => e.sqlstate_class() == Some("08"),
        _ => false,
    }
}

/// Mutable state of one run.
struct RunState {
    source: Arc<dyn SourceCatalog>,
    target: Arc<dyn TargetCatalog>,
    applier: Applier,
    path: TablePath,
    generator: TableDdlGenerator,
    tables: Vec<String>,
    created_tables: HashSet<String>,
    insert_columns: HashMap<String, Vec<String>>,
    outcomes: Vec<MigrationOutcome>,
    warnings: Vec<RunWarning>,
}

impl RunState {
    fn record(&mut self, outcome: MigrationOutcome) -> OutcomeStatus {
        let status = outcome.status;
        match status {
            OutcomeStatus::Created => match outcome.rows_loaded {
                Some(rows) => info!("{}: loaded {} rows", outcome.object, rows),
                None => info!("{}: created", outcome.object),
            },
            OutcomeStatus::SkippedExists => info!("{}: already exists, skipped", outcome.object),
            OutcomeStatus::Failed => warn!(
                "{}: FAILED - {}",
                outcome.object,
                outcome.detail.as_deref().unwrap_or("unknown error")
            ),
        }
        self.outcomes.push(outcome);
        status
    }
}

/// Migration orchestrator.
pub struct Orchestrator {
    config: Arc<Config>,
    factory: Arc<dyn ConnectionFactory>,
    assisted: Option<Arc<dyn DdlGenerator>>,
    cancel: CancellationToken,
}

impl Orchestrator {
    /// Create an orchestrator. The configuration is fixed for the run.
    ///
    /// When the `assist` section is enabled but unusable (no API key), the
    /// run continues with deterministic table definitions.
    pub fn new(config: Config, factory: Arc<dyn ConnectionFactory>) -> Self {
        let assisted = config.active_assist().and_then(|assist| {
            match AssistedGenerator::from_config(
                assist,
                &config.target.schema_name(),
                config.migration.create_or_replace,
            ) {
                Ok(generator) => Some(Arc::new(generator) as Arc<dyn DdlGenerator>),
                Err(e) => {
                    warn!("Assisted DDL generation disabled: {}", e);
                    None
                }
            }
        });

        Self {
            config: Arc::new(config),
            factory,
            assisted,
            cancel: CancellationToken::new(),
        }
    }

    /// Use a specific assisted generator for generated table definitions.
    pub fn with_assisted_generator(mut self, generator: Arc<dyn DdlGenerator>) -> Self {
        self.assisted = Some(generator);
        self
    }

    /// Stop at the next object boundary when `token` is cancelled.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.migration.statement_timeout_secs)
    }

    fn cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn timed<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let timeout = self.timeout();
        match tokio::time::timeout(timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(MigrateError::timeout(operation, timeout.as_secs())),
        }
    }

    /// Run a listing; non-fatal errors become a warning and an empty list.
    async fn list_or_warn<T, F>(
        &self,
        warnings: &mut Vec<RunWarning>,
        listing: &str,
        fut: F,
    ) -> Result<Vec<T>>
    where
        F: Future<Output = Result<Vec<T>>>,
    {
        match self.timed(listing, fut).await {
            Ok(items) => Ok(items),
            Err(e) if is_fatal(&e) => {
                error!("{}: {}", listing, e);
                Err(e)
            }
            Err(e) => {
                warn!("{} failed, skipping: {}", listing, e);
                warnings.push(RunWarning::listing_failed(listing, e.to_string()));
                Ok(Vec::new())
            }
        }
    }

    fn table_path(&self, source: Dialect, target: Dialect) -> TablePath {
        match self.config.migration.table_ddl {
            TableDdlMode::Catalog => TablePath::Catalog,
            TableDdlMode::Generate => TablePath::Generate,
            TableDdlMode::Auto if source == target => TablePath::Catalog,
            TableDdlMode::Auto => TablePath::Generate,
        }
    }

    fn table_generator(&self, target: Dialect) -> TableDdlGenerator {
        let (mapper, create_or_replace): (Arc<dyn TypeMapper>, bool) = match target {
            Dialect::Snowflake => (
                Arc::new(OracleToSnowflakeMapper),
                self.config.migration.create_or_replace,
            ),
            Dialect::Oracle => (Arc::new(OracleIdentityMapper), false),
        };
        let generator = TableDdlGenerator::new(DeterministicGenerator::new(mapper, create_or_replace));
        match (&self.assisted, target) {
            (Some(assisted), Dialect::Snowflake) => generator.with_assisted(assisted.clone()),
            _ => generator,
        }
    }

    fn transfer_config(&self) -> TransferConfig {
        TransferConfig {
            batch_size: self.config.migration.batch_size,
            commit_every_batch: self.config.migration.commit_every_batch,
            timeout: self.timeout(),
        }
    }

    async fn connect(&self) -> Result<(Arc<dyn SourceCatalog>, Arc<dyn TargetCatalog>)> {
        let source = self.factory.connect_source().await?;
        let target = match self.factory.connect_target().await {
            Ok(target) => target,
            Err(e) => {
                source.close().await;
                return Err(e);
            }
        };
        info!(
            "Connected: source {} schema {}, target {} schema {}",
            source.dialect(),
            source.schema(),
            target.dialect(),
            target.schema()
        );
        Ok((source, target))
    }

    /// Run the migration.
    pub async fn run(&self) -> Result<MigrationReport> {
        let started_at = Utc::now();
        let run_id = uuid::Uuid::new_v4().to_string();
        info!("Starting migration run: {}", run_id);

        info!("Phase {}: {}", Phase::Connect.number(), Phase::Connect.description());
        let (source, target) = self.connect().await?;

        let path = self.table_path(source.dialect(), target.dialect());
        let mut run = RunState {
            applier: Applier::new(target.clone(), self.factory.classifier(), self.timeout()),
            generator: self.table_generator(target.dialect()),
            source: source.clone(),
            target: target.clone(),
            path,
            tables: Vec::new(),
            created_tables: HashSet::new(),
            insert_columns: HashMap::new(),
            outcomes: Vec::new(),
            warnings: Vec::new(),
        };

        let result = self.run_phases(&mut run).await;
        source.close().await;
        target.close().await;

        if let Err(e) = result {
            error!(
                "Migration aborted after {} outcomes: {}",
                run.outcomes.len(),
                e
            );
            return Err(e);
        }

        let cancelled = self.cancelled();
        if cancelled {
            info!("Cancellation requested, migration stopped early");
        }
        info!("Phase {}: {}", Phase::Done.number(), Phase::Done.description());

        let report = MigrationReport::build(
            run_id,
            source.schema().to_string(),
            target.schema().to_string(),
            started_at,
            run.outcomes,
            run.warnings,
            cancelled,
        );

        info!(
            "Migration {:?}: {} created, {} skipped, {} failed, {} rows in {} tables ({:.1}s)",
            report.status,
            report.created,
            report.skipped_exists,
            report.failed,
            report.rows_loaded,
            report.tables_loaded,
            report.duration_seconds
        );

        Ok(report)
    }

    async fn run_phases(&self, run: &mut RunState) -> Result<()> {
        let mut phase = Phase::ListTables;
        loop {
            if self.cancelled() || phase == Phase::Done {
                return Ok(());
            }
            info!("Phase {}: {}", phase.number(), phase.description());
            match phase {
                Phase::ListTables => self.list_tables(run).await?,
                Phase::CreateTables => self.create_tables(run).await?,
                Phase::CreateSequences => self.create_sequences(run).await?,
                Phase::LoadData => self.load_data(run).await?,
                Phase::ApplyNonReferentialConstraints => {
                    self.apply_constraints(run, ConstraintClass::NonReferential).await?
                }
                Phase::ApplyReferentialConstraints => {
                    self.apply_constraints(run, ConstraintClass::Referential).await?
                }
                Phase::CreateIndexes => self.create_indexes(run).await?,
                Phase::CreateViews => self.create_views(run).await?,
                Phase::CreateCodeObjects => self.create_code_objects(run).await?,
                Phase::Connect | Phase::Done => {}
            }
            phase = match phase.next() {
                Some(next) => next,
                None => return Ok(()),
            };
        }
    }

    /// Listed tables narrowed by the allow-list.
    async fn filtered_tables(
        &self,
        source: &dyn SourceCatalog,
        warnings: &mut Vec<RunWarning>,
    ) -> Result<Vec<String>> {
        let all = self
            .list_or_warn(warnings, "table listing", source.list_tables())
            .await?;
        let migration = &self.config.migration;
        let tables: Vec<String> = all
            .into_iter()
            .filter(|t| migration.includes_table(t))
            .collect();

        for wanted in &migration.include_tables {
            if !tables.iter().any(|t| t.eq_ignore_ascii_case(wanted.trim())) {
                warn!("Allow-listed table {} not found in source schema", wanted);
            }
        }
        Ok(tables)
    }

    async fn list_tables(&self, run: &mut RunState) -> Result<()> {
        let source = run.source.clone();
        run.tables = self
            .filtered_tables(source.as_ref(), &mut run.warnings)
            .await?;
        info!(
            "Found {} tables to migrate (table DDL: {})",
            run.tables.len(),
            run.path.name()
        );
        Ok(())
    }

    /// Record an apply result; a lost target connection ends the run.
    fn record_apply(
        &self,
        run: &mut RunState,
        phase: Phase,
        object: SchemaObject,
        result: crate::apply::ApplyResult,
    ) -> Result<OutcomeStatus> {
        let transport = result.is_transport_failure();
        let mut outcome = MigrationOutcome::new(phase, object, result.status);
        if let Some(detail) = result.detail.filter(|_| result.status == OutcomeStatus::Failed) {
            outcome = outcome.with_detail(detail);
        }
        let detail = outcome.detail.clone();
        let status = run.record(outcome);
        if transport {
            return Err(MigrateError::Transport(
                detail.unwrap_or_else(|| "target connection lost".into()),
            ));
        }
        Ok(status)
    }

    fn record_failure(
        &self,
        run: &mut RunState,
        phase: Phase,
        object: SchemaObject,
        error: MigrateError,
    ) -> Result<OutcomeStatus> {
        let fatal = is_fatal(&error);
        let status = run.record(
            MigrationOutcome::new(phase, object, OutcomeStatus::Failed).with_detail(error.to_string()),
        );
        if fatal {
            return Err(error);
        }
        Ok(status)
    }

    /// Fetch an object's catalog definition, rewrite it for the target
    /// schema and apply it.
    async fn migrate_object(
        &self,
        run: &mut RunState,
        phase: Phase,
        object: SchemaObject,
    ) -> Result<OutcomeStatus> {
        if self.config.migration.drop_if_exists {
            run.applier
                .drop_best_effort(object.kind, &object.name, IdentStyle::Exact)
                .await;
        }

        let source = run.source.clone();
        let definition = match self
            .timed("definition fetch", source.definition(&object))
            .await
        {
            Ok(ddl) => ddl,
            Err(e) => return self.record_failure(run, phase, object, e),
        };

        let ddl = rewrite_definition(&definition, source.schema(), run.target.schema());
        debug!("{}: applying {} bytes of DDL", object, ddl.len());
        let result = run.applier.apply(&ddl).await;
        self.record_apply(run, phase, object, result)
    }

    async fn create_tables(&self, run: &mut RunState) -> Result<()> {
        let tables = run.tables.clone();
        for table in tables {
            if self.cancelled() {
                return Ok(());
            }
            let object = SchemaObject::new(ObjectKind::Table, &table);

            let status = match run.path {
                TablePath::Catalog => {
                    self.migrate_object(run, Phase::CreateTables, object).await?
                }
                TablePath::Generate => {
                    if self.config.migration.drop_if_exists {
                        run.applier
                            .drop_best_effort(ObjectKind::Table, &table, IdentStyle::Normalized)
                            .await;
                    }
                    let source = run.source.clone();
                    let definition = match self
                        .timed("column listing", source.table_definition(&table))
                        .await
                    {
                        Ok(def) if def.columns.is_empty() => {
                            run.record(
                                MigrationOutcome::new(
                                    Phase::CreateTables,
                                    object,
                                    OutcomeStatus::Failed,
                                )
                                .with_detail("table has no columns"),
                            );
                            continue;
                        }
                        Ok(def) => def,
                        Err(e) => {
                            self.record_failure(run, Phase::CreateTables, object, e)?;
                            continue;
                        }
                    };
                    let generated = run.generator.generate(&definition).await;
                    run.insert_columns.insert(table.clone(), generated.columns);
                    let result = run.applier.apply(&generated.sql).await;
                    self.record_apply(run, Phase::CreateTables, object, result)?
                }
            };

            if status == OutcomeStatus::Created {
                run.created_tables.insert(table);
            }
        }
        Ok(())
    }

    async fn create_sequences(&self, run: &mut RunState) -> Result<()> {
        let source = run.source.clone();
        let sequences = self
            .list_or_warn(&mut run.warnings, "sequence listing", source.list_sequences())
            .await?;
        for name in sequences {
            if self.cancelled() {
                return Ok(());
            }
            let object = SchemaObject::new(ObjectKind::Sequence, name);
            self.migrate_object(run, Phase::CreateSequences, object).await?;
        }
        Ok(())
    }

    async fn load_data(&self, run: &mut RunState) -> Result<()> {
        let source = run.source.clone();
        let mut jobs = Vec::new();
        for table in run.tables.clone() {
            if !run.created_tables.contains(&table) {
                debug!("{}: not created in this run, skipping load", table);
                continue;
            }
            let columns = match self.timed("column listing", source.columns(&table)).await {
                Ok(cols) => cols.into_iter().map(|c| c.name).collect::<Vec<_>>(),
                Err(e) => {
                    let object = SchemaObject::new(ObjectKind::Table, &table);
                    self.record_failure(run, Phase::LoadData, object, e)?;
                    continue;
                }
            };
            let insert_columns = run
                .insert_columns
                .get(&table)
                .cloned()
                .unwrap_or_else(|| columns.clone());
            jobs.push(TransferJob {
                table,
                select_columns: columns,
                insert_columns,
                ident_style: run.path.ident_style(),
            });
        }

        let workers = self.config.migration.workers.max(1);
        info!("Loading {} tables with {} workers", jobs.len(), workers);

        let loaded = if workers > 1 && jobs.len() > 1 {
            self.load_parallel(run, jobs, workers).await?
        } else {
            self.load_sequential(run, jobs).await?
        };

        if self.config.migration.validate_row_counts {
            for table in loaded {
                if self.cancelled() {
                    return Ok(());
                }
                self.check_row_count(run, &table).await?;
            }
        }
        Ok(())
    }

    fn record_load(
        &self,
        run: &mut RunState,
        table: &str,
        result: Result<TransferStats>,
    ) -> Option<String> {
        let object = SchemaObject::new(ObjectKind::Table, table);
        match result {
            Ok(stats) => {
                run.record(
                    MigrationOutcome::new(Phase::LoadData, object, OutcomeStatus::Created)
                        .with_rows(stats.rows),
                );
                Some(table.to_string())
            }
            Err(e) => {
                run.record(
                    MigrationOutcome::new(Phase::LoadData, object, OutcomeStatus::Failed)
                        .with_detail(e.to_string()),
                );
                None
            }
        }
    }

    async fn load_sequential(&self, run: &mut RunState, jobs: Vec<TransferJob>) -> Result<Vec<String>> {
        let engine = TransferEngine::new(run.source.clone(), run.target.clone(), self.transfer_config());
        let mut loaded = Vec::new();
        for job in jobs {
            if self.cancelled() {
                info!("Cancellation requested, stopping new transfers");
                break;
            }
            let table = job.table.clone();
            let result = engine.execute(job).await;
            loaded.extend(self.record_load(run, &table, result));
        }
        Ok(loaded)
    }

    /// One connection pair per worker; outcomes are recorded in listing order.
    async fn load_parallel(
        &self,
        run: &mut RunState,
        jobs: Vec<TransferJob>,
        workers: usize,
    ) -> Result<Vec<String>> {
        let semaphore = Arc::new(Semaphore::new(workers));
        let mut handles = Vec::new();

        for job in jobs {
            if self.cancelled() {
                info!("Cancellation requested, stopping new transfers");
                break;
            }
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|_| MigrateError::Cancelled)?;
            let factory = self.factory.clone();
            let config = self.transfer_config();
            let table = job.table.clone();

            let handle = tokio::spawn(async move {
                let _permit = permit;
                let source = factory.connect_source().await?;
                let target = match factory.connect_target().await {
                    Ok(target) => target,
                    Err(e) => {
                        source.close().await;
                        return Err(e);
                    }
                };
                let engine = TransferEngine::new(source.clone(), target.clone(), config);
                let result = engine.execute(job).await;
                source.close().await;
                target.close().await;
                result
            });
            handles.push((table, handle));
        }

        let mut loaded = Vec::new();
        for (table, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(MigrateError::transfer(&table, format!("Task panicked: {}", e))),
            };
            loaded.extend(self.record_load(run, &table, result));
        }
        Ok(loaded)
    }

    async fn check_row_count(&self, run: &mut RunState, table: &str) -> Result<()> {
        let source_count = self.timed("source row count", run.source.row_count(table)).await;
        let style = run.path.ident_style();
        let target_count = self
            .timed("target row count", run.target.row_count(table, style))
            .await;
        match (source_count, target_count) {
            (Ok(s), Ok(t)) if s == t => {
                debug!("{}: {} rows (match)", table, s);
            }
            (Ok(s), Ok(t)) => {
                warn!("{}: source={} target={} (MISMATCH)", table, s, t);
                run.warnings.push(RunWarning::row_count_mismatch(table, s, t));
            }
            (Err(e), _) | (_, Err(e)) => {
                if is_fatal(&e) {
                    return Err(e);
                }
                warn!("{}: row count unavailable: {}", table, e);
                run.warnings
                    .push(RunWarning::row_count_unavailable(table, e.to_string()));
            }
        }
        Ok(())
    }

    async fn apply_constraints(&self, run: &mut RunState, class: ConstraintClass) -> Result<()> {
        let phase = match class {
            ConstraintClass::NonReferential => Phase::ApplyNonReferentialConstraints,
            ConstraintClass::Referential => Phase::ApplyReferentialConstraints,
        };
        let source = run.source.clone();
        for table in run.tables.clone() {
            if self.cancelled() {
                return Ok(());
            }
            let listing = format!("constraint listing for {}", table);
            let names = self
                .list_or_warn(&mut run.warnings, &listing, source.constraint_names(&table, class))
                .await?;
            for name in names {
                if self.cancelled() {
                    return Ok(());
                }
                let object = SchemaObject::on_table(ObjectKind::Constraint, name, &table);
                self.migrate_object(run, phase, object).await?;
            }
        }
        Ok(())
    }

    async fn create_indexes(&self, run: &mut RunState) -> Result<()> {
        let source = run.source.clone();
        for table in run.tables.clone() {
            if self.cancelled() {
                return Ok(());
            }
            let listing = format!("index listing for {}", table);
            let names = self
                .list_or_warn(&mut run.warnings, &listing, source.index_names(&table))
                .await?;
            for name in names {
                if self.cancelled() {
                    return Ok(());
                }
                let object = SchemaObject::on_table(ObjectKind::Index, name, &table);
                self.migrate_object(run, Phase::CreateIndexes, object).await?;
            }
        }
        Ok(())
    }

    async fn create_views(&self, run: &mut RunState) -> Result<()> {
        let source = run.source.clone();
        let views = self
            .list_or_warn(&mut run.warnings, "view listing", source.list_views())
            .await?;
        for name in views {
            if self.cancelled() {
                return Ok(());
            }
            let object = SchemaObject::new(ObjectKind::View, name);
            self.migrate_object(run, Phase::CreateViews, object).await?;
        }
        Ok(())
    }

    async fn create_code_objects(&self, run: &mut RunState) -> Result<()> {
        if !self.config.migration.migrate_code_objects {
            info!("Code object migration disabled");
            return Ok(());
        }
        let source = run.source.clone();
        let objects = self
            .list_or_warn(&mut run.warnings, "code object listing", source.list_code_objects())
            .await?;
        for object in objects {
            if self.cancelled() {
                return Ok(());
            }
            self.migrate_object(run, Phase::CreateCodeObjects, object).await?;
        }
        Ok(())
    }

    /// List everything a run would touch without changing the target.
    pub async fn plan(&self) -> Result<MigrationPlan> {
        info!("Phase {}: {}", Phase::Connect.number(), Phase::Connect.description());
        let (source, target) = self.connect().await?;
        let result = self.build_plan(source.as_ref(), target.as_ref()).await;
        source.close().await;
        target.close().await;
        result
    }

    async fn build_plan(
        &self,
        source: &dyn SourceCatalog,
        target: &dyn TargetCatalog,
    ) -> Result<MigrationPlan> {
        let mut warnings = Vec::new();
        info!("Phase {}: {}", Phase::ListTables.number(), Phase::ListTables.description());
        let tables = self.filtered_tables(source, &mut warnings).await?;
        let table_objects: Vec<SchemaObject> = tables
            .iter()
            .map(|t| SchemaObject::new(ObjectKind::Table, t))
            .collect();

        let sequences = self
            .list_or_warn(&mut warnings, "sequence listing", source.list_sequences())
            .await?
            .into_iter()
            .map(|s| SchemaObject::new(ObjectKind::Sequence, s))
            .collect();

        let mut non_ref = Vec::new();
        let mut referential = Vec::new();
        let mut indexes = Vec::new();
        for table in &tables {
            let listing = format!("constraint listing for {}", table);
            for name in self
                .list_or_warn(
                    &mut warnings,
                    &listing,
                    source.constraint_names(table, ConstraintClass::NonReferential),
                )
                .await?
            {
                non_ref.push(SchemaObject::on_table(ObjectKind::Constraint, name, table));
            }
            for name in self
                .list_or_warn(
                    &mut warnings,
                    &listing,
                    source.constraint_names(table, ConstraintClass::Referential),
                )
                .await?
            {
                referential.push(SchemaObject::on_table(ObjectKind::Constraint, name, table));
            }
            let listing = format!("index listing for {}", table);
            for name in self
                .list_or_warn(&mut warnings, &listing, source.index_names(table))
                .await?
            {
                indexes.push(SchemaObject::on_table(ObjectKind::Index, name, table));
            }
        }

        let views = self
            .list_or_warn(&mut warnings, "view listing", source.list_views())
            .await?
            .into_iter()
            .map(|v| SchemaObject::new(ObjectKind::View, v))
            .collect();

        let code_objects = if self.config.migration.migrate_code_objects {
            self.list_or_warn(&mut warnings, "code object listing", source.list_code_objects())
                .await?
        } else {
            Vec::new()
        };

        let path = self.table_path(source.dialect(), target.dialect());
        let phases = vec![
            PlannedPhase {
                phase: Phase::CreateTables,
                objects: table_objects.clone(),
            },
            PlannedPhase {
                phase: Phase::CreateSequences,
                objects: sequences,
            },
            PlannedPhase {
                phase: Phase::LoadData,
                objects: table_objects,
            },
            PlannedPhase {
                phase: Phase::ApplyNonReferentialConstraints,
                objects: non_ref,
            },
            PlannedPhase {
                phase: Phase::ApplyReferentialConstraints,
                objects: referential,
            },
            PlannedPhase {
                phase: Phase::CreateIndexes,
                objects: indexes,
            },
            PlannedPhase {
                phase: Phase::CreateViews,
                objects: views,
            },
            PlannedPhase {
                phase: Phase::CreateCodeObjects,
                objects: code_objects,
            },
        ];

        for planned in &phases {
            info!("{}: {} objects", planned.phase, planned.objects.len());
        }

        Ok(MigrationPlan {
            source_schema: source.schema().to_string(),
            target_schema: target.schema().to_string(),
            table_ddl: path.name().to_string(),
            phases,
            warnings,
        })
    }

    /// Validate row counts between source and target.
    pub async fn validate(&self) -> Result<Vec<RowCountCheck>> {
        let (source, target) = self.connect().await?;
        let result = self.compare_counts(source.as_ref(), target.as_ref()).await;
        source.close().await;
        target.close().await;
        result
    }

    async fn compare_counts(
        &self,
        source: &dyn SourceCatalog,
        target: &dyn TargetCatalog,
    ) -> Result<Vec<RowCountCheck>> {
        let mut warnings = Vec::new();
        let tables = self.filtered_tables(source, &mut warnings).await?;
        let style = self
            .table_path(source.dialect(), target.dialect())
            .ident_style();
        let mut results = Vec::with_capacity(tables.len());

        for table in tables {
            let source_rows = self
                .timed("source row count", source.row_count(&table))
                .await?;
            let target_rows = match self
                .timed("target row count", target.row_count(&table, style))
                .await
            {
                Ok(count) => Some(count),
                Err(e) if is_fatal(&e) => return Err(e),
                Err(e) => {
                    debug!("{}: target count failed: {}", table, e);
                    None
                }
            };

            let check = RowCountCheck {
                table,
                source_rows,
                target_rows,
            };
            if check.matches() {
                info!("{}: {} rows (match)", check.table, source_rows);
            } else {
                warn!(
                    "{}: source={} target={} (MISMATCH)",
                    check.table,
                    source_rows,
                    target_rows.map_or_else(|| "unavailable".to_string(), |t| t.to_string())
                );
            }
            results.push(check);
        }

        Ok(results)
    }

    /// Open both connections and time a round trip on each.
    pub async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        let source = match self.factory.connect_source().await {
            Ok(conn) => {
                let ping = self.timed("source ping", conn.ping()).await;
                conn.close().await;
                ping
            }
            Err(e) => Err(e),
        };
        let source = endpoint_health(source, started);

        let started = Instant::now();
        let target = match self.factory.connect_target().await {
            Ok(conn) => {
                let ping = self.timed("target ping", conn.ping()).await;
                conn.close().await;
                ping
            }
            Err(e) => Err(e),
        };
        let target = endpoint_health(target, started);

        HealthCheckResult { source, target }
    }
}

fn endpoint_health(result: Result<()>, started: Instant) -> EndpointHealth {
    let latency_ms = started.elapsed().as_millis() as u64;
    match result {
        Ok(()) => EndpointHealth {
            healthy: true,
            latency_ms,
            error: None,
        },
        Err(e) => EndpointHealth {
            healthy: false,
            latency_ms,
            error: Some(e.to_string()),
        },
    }
}
