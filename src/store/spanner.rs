use anyhow::{Context, Result};
use async_trait::async_trait;
use gcloud_gax::conn::Environment;
use gcloud_gax::grpc::{Code, Status};
use gcloud_googleapis::spanner::admin::database::v1::{
    CreateDatabaseRequest, GetDatabaseDdlRequest, GetDatabaseRequest, UpdateDatabaseDdlRequest,
};
use gcloud_googleapis::spanner::admin::instance::v1::{
    CreateInstanceRequest, GetInstanceRequest, Instance,
};
use gcloud_spanner::admin::client::Client as AdminClient;
use gcloud_spanner::admin::AdminClientConfig;
use gcloud_spanner::client::{Client, ClientConfig, Error as SpannerError};
use gcloud_spanner::key::Key;
use gcloud_spanner::mutation::{delete, insert, insert_or_update, update};
use gcloud_spanner::statement::Statement;
use gcloud_spanner::transaction_rw::ReadWriteTransaction;
use gcloud_spanner::value::CommitTimestamp;
use std::sync::Arc;

use super::{PatientStore, StoreError, StoreResult, TriageStore};
use crate::config::{Config, SpannerSettings};
use crate::models::{merge_patch, Record, TriageKey};

/// Shareable Spanner client for use across async handlers
///
/// Holds both the patient and the triage table names; each service only
/// touches its own table.
#[derive(Clone)]
pub struct SpannerClient {
    inner: Arc<Client>,
    patients_table: Arc<str>,
    triage_table: Arc<str>,
}

impl SpannerClient {
    /// Create a new Spanner client from configuration
    ///
    /// Connects to the emulator named in the settings, or to production
    /// Spanner when no emulator host is configured.
    ///
    /// This function also performs auto-provisioning: it will automatically
    /// create the instance, database, and both tables if they don't exist.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let settings = config
            .spanner
            .as_ref()
            .context("Spanner settings are required for the spanner store backend")?;

        auto_provision(settings, &config.patients_table, &config.triage_table).await?;

        let database_path = settings.database_path();

        match &settings.emulator_host {
            Some(host) => tracing::info!("Connecting to Spanner emulator at: {}", host),
            None => tracing::info!("Connecting to production Spanner"),
        }

        let client = Client::new(&database_path, client_config(settings))
            .await
            .context("Failed to create Spanner client")?;

        tracing::info!(
            "Successfully connected to Spanner database: {}",
            database_path
        );

        Ok(Self {
            inner: Arc::new(client),
            patients_table: Arc::from(config.patients_table.as_str()),
            triage_table: Arc::from(config.triage_table.as_str()),
        })
    }

    /// Perform a health check by executing a simple query
    async fn probe(&self) -> Result<()> {
        let statement = Statement::new("SELECT 1");

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create health check transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to execute health check query")?;

        if result_set.next().await?.is_some() {
            tracing::debug!("Health check query succeeded");
            Ok(())
        } else {
            Err(anyhow::anyhow!("Health check query returned no results"))
        }
    }

    /// Run a single-row query and decode its `data` column
    async fn read_data(&self, statement: Statement) -> Result<Option<Record>> {
        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query data from Spanner")?;

        match result_set.next().await? {
            Some(row) => {
                let data: String = row.column_by_name("data")?;
                let record = serde_json::from_str(&data)
                    .context("Failed to deserialize stored record")?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }
}

fn client_config(settings: &SpannerSettings) -> ClientConfig {
    match &settings.emulator_host {
        Some(host) => ClientConfig {
            environment: Environment::Emulator(host.clone()),
            ..ClientConfig::default()
        },
        None => ClientConfig::default(),
    }
}

fn admin_config(settings: &SpannerSettings) -> AdminClientConfig {
    match &settings.emulator_host {
        Some(host) => AdminClientConfig {
            environment: Environment::Emulator(host.clone()),
            ..AdminClientConfig::default()
        },
        None => AdminClientConfig::default(),
    }
}

/// Read the serialized patient inside a read-write transaction.
async fn read_patient_data(
    tx: &mut ReadWriteTransaction,
    table: &str,
    dni: &str,
) -> std::result::Result<Option<String>, SpannerError> {
    let mut statement = Statement::new(format!("SELECT data FROM {} WHERE dni = @dni", table));
    statement.add_param("dni", &dni.to_string());

    let mut rows = tx.query(statement).await?;
    match rows.next().await? {
        Some(row) => Ok(Some(row.column_by_name::<String>("data")?)),
        None => Ok(None),
    }
}

fn corrupt_record(err: serde_json::Error) -> Status {
    Status::new(Code::Internal, format!("stored patient record is not valid JSON: {}", err))
}

#[async_trait]
impl PatientStore for SpannerClient {
    async fn create(&self, dni: &str, record: &Record) -> StoreResult<()> {
        let data = serde_json::to_string(record)
            .context("Failed to serialize patient record")?;
        let table = self.patients_table.clone();

        let result: std::result::Result<(_, bool), SpannerError> = self
            .inner
            .read_write_transaction(|tx| {
                let table = table.clone();
                let dni = dni.to_string();
                let data = data.clone();
                Box::pin(async move {
                    if read_patient_data(tx, &table, &dni).await?.is_some() {
                        return Ok(false);
                    }
                    tx.buffer_write(vec![insert(
                        &table,
                        &["dni", "data", "created_at", "updated_at"],
                        &[&dni, &data, &CommitTimestamp::new(), &CommitTimestamp::new()],
                    )]);
                    Ok(true)
                })
            })
            .await;

        let (_, inserted) = result.context("Failed to insert patient into Spanner")?;
        if !inserted {
            return Err(StoreError::ConditionFailed);
        }
        tracing::debug!("Inserted patient with dni: {}", dni);
        Ok(())
    }

    async fn get(&self, dni: &str) -> StoreResult<Option<Record>> {
        let mut statement = Statement::new(format!(
            "SELECT data FROM {} WHERE dni = @dni",
            self.patients_table
        ));
        statement.add_param("dni", &dni.to_string());

        Ok(self.read_data(statement).await?)
    }

    async fn update(&self, dni: &str, changes: &Record) -> StoreResult<Record> {
        let table = self.patients_table.clone();

        let result: std::result::Result<(_, Option<Record>), SpannerError> = self
            .inner
            .read_write_transaction(|tx| {
                let table = table.clone();
                let dni = dni.to_string();
                let changes = changes.clone();
                Box::pin(async move {
                    let Some(data) = read_patient_data(tx, &table, &dni).await? else {
                        return Ok(None);
                    };
                    let mut stored: Record = serde_json::from_str(&data).map_err(corrupt_record)?;
                    merge_patch(&mut stored, &changes);
                    let merged = serde_json::to_string(&stored).map_err(corrupt_record)?;
                    tx.buffer_write(vec![update(
                        &table,
                        &["dni", "data", "updated_at"],
                        &[&dni, &merged, &CommitTimestamp::new()],
                    )]);
                    Ok(Some(stored))
                })
            })
            .await;

        let (_, updated) = result.context("Failed to update patient in Spanner")?;
        let record = updated.ok_or(StoreError::ConditionFailed)?;
        tracing::debug!("Updated patient with dni: {}", dni);
        Ok(record)
    }

    async fn delete(&self, dni: &str) -> StoreResult<()> {
        let table = self.patients_table.clone();

        let result: std::result::Result<(_, bool), SpannerError> = self
            .inner
            .read_write_transaction(|tx| {
                let table = table.clone();
                let dni = dni.to_string();
                Box::pin(async move {
                    if read_patient_data(tx, &table, &dni).await?.is_none() {
                        return Ok(false);
                    }
                    tx.buffer_write(vec![delete(&table, Key::new(&dni))]);
                    Ok(true)
                })
            })
            .await;

        let (_, deleted) = result.context("Failed to delete patient from Spanner")?;
        if !deleted {
            return Err(StoreError::ConditionFailed);
        }
        tracing::debug!("Deleted patient with dni: {}", dni);
        Ok(())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(self.probe().await?)
    }
}

#[async_trait]
impl TriageStore for SpannerClient {
    async fn put(&self, key: &TriageKey, record: &Record) -> StoreResult<()> {
        let data = serde_json::to_string(record)
            .context("Failed to serialize triage record")?;

        let mutation = insert_or_update(
            &self.triage_table,
            &["dni", "fecha_hora", "data", "created_at", "updated_at"],
            &[
                &key.dni,
                &key.fecha_hora,
                &data,
                &CommitTimestamp::new(),
                &CommitTimestamp::new(),
            ],
        );

        self.inner
            .apply(vec![mutation])
            .await
            .context("Failed to upsert triage record to Spanner")?;

        tracing::debug!("Upserted triage record {:?}", key);
        Ok(())
    }

    async fn list_keys(&self, dni: &str) -> StoreResult<Vec<TriageKey>> {
        let mut statement = Statement::new(format!(
            "SELECT fecha_hora FROM {} WHERE dni = @dni ORDER BY fecha_hora ASC",
            self.triage_table
        ));
        statement.add_param("dni", &dni.to_string());

        let mut tx = self.inner
            .single()
            .await
            .context("Failed to create read transaction for triage list")?;

        let mut result_set = tx
            .query(statement)
            .await
            .context("Failed to query triage keys")?;

        let mut keys = Vec::new();
        while let Some(row) = result_set.next().await.context("Failed to read triage keys")? {
            let fecha_hora: String = row
                .column_by_name("fecha_hora")
                .context("Failed to decode fecha_hora")?;
            keys.push(TriageKey::new(dni, fecha_hora));
        }

        tracing::debug!("Listed {} triage records for dni: {}", keys.len(), dni);
        Ok(keys)
    }

    async fn get(&self, key: &TriageKey) -> StoreResult<Option<Record>> {
        let mut statement = Statement::new(format!(
            "SELECT data FROM {} WHERE dni = @dni AND fecha_hora = @fecha_hora",
            self.triage_table
        ));
        statement.add_param("dni", &key.dni);
        statement.add_param("fecha_hora", &key.fecha_hora);

        Ok(self.read_data(statement).await?)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(self.probe().await?)
    }
}

/// Automatically provision Spanner instance, database, and tables
///
/// Checks if the configured resources exist and creates them if needed,
/// which gives zero-setup local development with the emulator.
async fn auto_provision(
    settings: &SpannerSettings,
    patients_table: &str,
    triage_table: &str,
) -> Result<()> {
    tracing::info!("Starting auto-provisioning checks...");

    let admin_client = AdminClient::new(admin_config(settings))
        .await
        .context("Failed to create Spanner admin client")?;

    let project_path = format!("projects/{}", settings.project);
    let instance_path = format!("{}/instances/{}", project_path, settings.instance);
    let database_path = settings.database_path();

    ensure_instance_exists(&admin_client, settings, &project_path, &instance_path).await?;
    ensure_database_exists(&admin_client, &instance_path, &database_path).await?;
    for (table, ddl) in [
        (patients_table, patients_ddl(patients_table)),
        (triage_table, triage_ddl(triage_table)),
    ] {
        ensure_table_exists(&admin_client, &database_path, table, &ddl).await?;
    }

    tracing::info!("Auto-provisioning complete");
    Ok(())
}

fn patients_ddl(table: &str) -> String {
    format!(
        r#"
CREATE TABLE {table} (
    dni STRING(64) NOT NULL,
    data STRING(MAX) NOT NULL,
    created_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (dni)
"#
    )
    .trim()
    .to_string()
}

fn triage_ddl(table: &str) -> String {
    format!(
        r#"
CREATE TABLE {table} (
    dni STRING(64) NOT NULL,
    fecha_hora STRING(64) NOT NULL,
    data STRING(MAX) NOT NULL,
    created_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
    updated_at TIMESTAMP NOT NULL OPTIONS (allow_commit_timestamp=true),
) PRIMARY KEY (dni, fecha_hora)
"#
    )
    .trim()
    .to_string()
}

/// Ensure the Spanner instance exists, creating it if necessary
async fn ensure_instance_exists(
    admin_client: &AdminClient,
    settings: &SpannerSettings,
    project_path: &str,
    instance_path: &str,
) -> Result<()> {
    let get_request = GetInstanceRequest {
        name: instance_path.to_string(),
        field_mask: None,
    };

    match admin_client.instance().get_instance(get_request, None).await {
        Ok(_) => {
            tracing::info!("Instance already exists: {}", instance_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Instance not found, creating: {}", instance_path);

            let instance_config = if settings.emulator_host.is_some() {
                format!("{}/instanceConfigs/emulator-config", project_path)
            } else {
                format!("{}/instanceConfigs/regional-us-central1", project_path)
            };

            let create_request = CreateInstanceRequest {
                parent: project_path.to_string(),
                instance_id: settings.instance.clone(),
                instance: Some(Instance {
                    name: instance_path.to_string(),
                    config: instance_config,
                    display_name: format!("{} instance", settings.instance),
                    node_count: 1,
                    ..Default::default()
                }),
            };

            let mut operation = admin_client
                .instance()
                .create_instance(create_request, None)
                .await
                .context("Failed to start instance creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create instance")?;

            tracing::info!("Instance created successfully: {}", instance_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check instance existence: {}",
            e.message()
        )),
    }
}

/// Ensure the Spanner database exists, creating it if necessary
async fn ensure_database_exists(
    admin_client: &AdminClient,
    instance_path: &str,
    database_path: &str,
) -> Result<()> {
    let get_request = GetDatabaseRequest {
        name: database_path.to_string(),
    };

    match admin_client
        .database()
        .get_database(get_request, None)
        .await
    {
        Ok(_) => {
            tracing::info!("Database already exists: {}", database_path);
            Ok(())
        }
        Err(status) if status.code() == Code::NotFound => {
            tracing::info!("Database not found, creating: {}", database_path);

            let database_id = database_path
                .split('/')
                .next_back()
                .context("Invalid database path")?;

            let create_request = CreateDatabaseRequest {
                parent: instance_path.to_string(),
                create_statement: format!("CREATE DATABASE `{}`", database_id),
                extra_statements: vec![],
                encryption_config: None,
                database_dialect: 1, // Google Standard SQL
                proto_descriptors: vec![],
            };

            let mut operation = admin_client
                .database()
                .create_database(create_request, None)
                .await
                .context("Failed to start database creation")?;

            operation
                .wait(None)
                .await
                .context("Failed to create database")?;

            tracing::info!("Database created successfully: {}", database_path);
            Ok(())
        }
        Err(e) => Err(anyhow::anyhow!(
            "Failed to check database existence: {}",
            e.message()
        )),
    }
}

/// Ensure `table` exists, creating it from `ddl` if necessary
async fn ensure_table_exists(
    admin_client: &AdminClient,
    database_path: &str,
    table: &str,
    ddl: &str,
) -> Result<()> {
    let get_ddl_request = GetDatabaseDdlRequest {
        database: database_path.to_string(),
    };

    let ddl_response = admin_client
        .database()
        .get_database_ddl(get_ddl_request, None)
        .await
        .context("Failed to get database DDL")?;

    let plain = format!("CREATE TABLE {} ", table);
    let quoted = format!("CREATE TABLE `{}`", table);
    let table_exists = ddl_response
        .into_inner()
        .statements
        .iter()
        .any(|stmt| stmt.starts_with(&plain) || stmt.starts_with(&quoted));

    if table_exists {
        tracing::info!("Table '{}' already exists", table);
        return Ok(());
    }

    tracing::info!("Table '{}' not found, creating...", table);

    let update_request = UpdateDatabaseDdlRequest {
        database: database_path.to_string(),
        statements: vec![ddl.to_string()],
        operation_id: String::new(),
        proto_descriptors: vec![],
        throughput_mode: false,
    };

    let mut operation = admin_client
        .database()
        .update_database_ddl(update_request, None)
        .await
        .context("Failed to start table creation")?;

    operation
        .wait(None)
        .await
        .context("Failed to create table")?;

    tracing::info!("Table '{}' created successfully", table);
    Ok(())
}
