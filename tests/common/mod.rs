use std::collections::HashMap;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, ensure, Context, Result};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::PgConnection;
use diesel_migrations::MigrationHarness;
use dispatch_ledger::auth::jwt::JwtService;
use dispatch_ledger::config::{AppConfig, SettlementCodes, DEFAULT_UPLOAD_MAX_BYTES};
use dispatch_ledger::db::{self, PgPool};
use dispatch_ledger::routes;
use dispatch_ledger::schema::{customers, delivery_locations, user_customers, vehicles, vendors};
use dispatch_ledger::state::AppState;
use dispatch_ledger::storage::ObjectStorage;
use http_body_util::BodyExt;
use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::util::ServiceExt;
use uuid::Uuid;

static DB_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));

pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

#[allow(dead_code)]
#[derive(Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
}

#[derive(Default)]
pub struct FakeStorage {
    objects: Mutex<HashMap<String, StoredObject>>,
}

#[async_trait]
impl ObjectStorage for FakeStorage {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
        content_disposition: Option<String>,
    ) -> Result<()> {
        let stored = StoredObject {
            key: key.to_string(),
            bytes,
            content_type,
            content_disposition,
        };
        let mut guard = self.objects.lock().await;
        guard.insert(stored.key.clone(), stored);
        Ok(())
    }

    async fn presign_get_object(&self, key: &str, expires_in: Duration) -> Result<String> {
        let guard = self.objects.lock().await;
        ensure!(guard.contains_key(key), "object {key} missing");
        Ok(format!(
            "https://fake-storage/{key}?expires_in={}",
            expires_in.as_secs()
        ))
    }
}

impl FakeStorage {
    #[allow(dead_code)]
    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        let guard = self.objects.lock().await;
        guard.get(key).cloned()
    }

    #[allow(dead_code)]
    pub async fn object_count(&self) -> usize {
        let guard = self.objects.lock().await;
        guard.len()
    }
}

/// Reference rows most flows need: one vendor per role, a vehicle, and an
/// active delivery location belonging to a customer assigned to the app user.
#[allow(dead_code)]
pub struct Fixture {
    pub loader_vendor_id: i64,
    pub labour_vendor_id: i64,
    pub transporter_vendor_id: i64,
    pub vehicle_id: i64,
    pub customer_id: i64,
    pub location_id: i64,
}

pub struct TestApp {
    pub state: AppState,
    pub user_id: Uuid,
    pub token: String,
    router: Router,
    storage: Arc<FakeStorage>,
}

impl TestApp {
    pub async fn new() -> Result<Self> {
        let database_url = env::var("TEST_DATABASE_URL")
            .context("TEST_DATABASE_URL must be set for integration tests")?;

        let config = AppConfig {
            database_url: database_url.clone(),
            database_max_pool_size: 4,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            jwt_secret: "test-secret".to_string(),
            jwt_issuer: "test-issuer".to_string(),
            jwt_audience: "test-audience".to_string(),
            cors_allowed_origin: None,
            aws_endpoint_url: None,
            aws_access_key_id: None,
            aws_secret_access_key: None,
            aws_region: "us-east-1".to_string(),
            s3_bucket: "test-bucket".to_string(),
            upload_max_bytes: DEFAULT_UPLOAD_MAX_BYTES,
            settlement: SettlementCodes::default(),
        };

        let pool = db::init_pool_with_size(&config.database_url, config.database_max_pool_size)?;
        prepare_database(&pool).await?;

        let storage = Arc::new(FakeStorage::default());
        let storage_for_state: Arc<dyn ObjectStorage> = storage.clone();
        let jwt = JwtService::from_config(&config)?;
        let user_id = Uuid::new_v4();
        let token = jwt.issue_token(user_id, "operator", "operator", chrono::Duration::hours(1))?;
        let state = AppState::new(pool.clone(), config, storage_for_state, jwt);
        let router = routes::create_router(state.clone());

        Ok(Self {
            state,
            user_id,
            token,
            router,
            storage,
        })
    }

    pub async fn cleanup(&self) -> Result<()> {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get cleanup connection: {err}"))?;
            truncate_all(&mut conn)?;
            Ok(())
        })
        .await
        .context("cleanup task panicked")?
    }

    #[allow(dead_code)]
    pub fn storage(&self) -> Arc<FakeStorage> {
        self.storage.clone()
    }

    /// A token for a different operator with no customer assignments.
    #[allow(dead_code)]
    pub fn token_for(&self, user_id: Uuid) -> Result<String> {
        self.state
            .jwt
            .issue_token(user_id, "other", "operator", chrono::Duration::hours(1))
    }

    #[allow(dead_code)]
    pub async fn seed_vendor(
        &self,
        name: &str,
        is_loader: bool,
        is_labour: bool,
        active: bool,
    ) -> Result<i64> {
        let name = name.to_string();
        self.with_conn(move |conn| {
            let status = if active { "Active" } else { "Inactive" };
            diesel::insert_into(vendors::table)
                .values((
                    vendors::name.eq(name),
                    vendors::status.eq(status),
                    vendors::is_loader.eq(is_loader),
                    vendors::is_labour.eq(is_labour),
                ))
                .returning(vendors::id)
                .get_result(conn)
                .context("failed to insert vendor")
        })
        .await
    }

    #[allow(dead_code)]
    pub async fn seed_fixture(&self) -> Result<Fixture> {
        let user_id = self.user_id;
        let loader_vendor_id = self.seed_vendor("Bucket Loaders", true, false, true).await?;
        let labour_vendor_id = self.seed_vendor("Gang Labour", false, true, true).await?;
        let transporter_vendor_id = self.seed_vendor("Highway Haulers", false, false, true).await?;

        self.with_conn(move |conn| {
            let vehicle_id: i64 = diesel::insert_into(vehicles::table)
                .values(vehicles::registration_no.eq("LHR-4471"))
                .returning(vehicles::id)
                .get_result(conn)?;
            let customer_id: i64 = diesel::insert_into(customers::table)
                .values(customers::name.eq("Indus Cement"))
                .returning(customers::id)
                .get_result(conn)?;
            let location_id: i64 = diesel::insert_into(delivery_locations::table)
                .values((
                    delivery_locations::customer_id.eq(customer_id),
                    delivery_locations::name.eq("Plant Gate 2"),
                    delivery_locations::status.eq("Active"),
                ))
                .returning(delivery_locations::id)
                .get_result(conn)?;
            diesel::insert_into(user_customers::table)
                .values((
                    user_customers::user_id.eq(user_id),
                    user_customers::customer_id.eq(customer_id),
                ))
                .execute(conn)?;

            Ok(Fixture {
                loader_vendor_id,
                labour_vendor_id,
                transporter_vendor_id,
                vehicle_id,
                customer_id,
                location_id,
            })
        })
        .await
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::POST, path, payload, token).await
    }

    #[allow(dead_code)]
    pub async fn put_json<T: Serialize + ?Sized>(
        &self,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        self.send_json(Method::PUT, path, payload, token).await
    }

    async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        payload: &T,
        token: Option<&str>,
    ) -> Result<hyper::Response<Body>> {
        let body = serde_json::to_vec(payload)?;
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn get(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let mut builder = Request::builder().method(Method::GET).uri(path);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    #[allow(dead_code)]
    pub async fn delete(&self, path: &str, token: Option<&str>) -> Result<hyper::Response<Body>> {
        let builder = Request::builder().method(Method::DELETE).uri(path);
        let builder = if let Some(token) = token {
            builder.header("authorization", format!("Bearer {token}"))
        } else {
            builder
        };
        let request = builder.body(Body::empty())?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    /// Sends `payload` as the JSON `payload` part, plus an optional `file` part.
    #[allow(dead_code)]
    pub async fn send_multipart(
        &self,
        method: Method,
        path: &str,
        payload: &Value,
        file: Option<(&str, &[u8])>,
        token: &str,
    ) -> Result<hyper::Response<Body>> {
        let boundary = format!("boundary-{}", Uuid::new_v4());
        let mut body = Vec::new();
        body.extend(format!("--{boundary}\r\n").as_bytes());
        body.extend(b"Content-Disposition: form-data; name=\"payload\"\r\n");
        body.extend(b"Content-Type: application/json\r\n\r\n");
        body.extend(serde_json::to_vec(payload)?);
        body.extend(b"\r\n");

        if let Some((filename, data)) = file {
            body.extend(format!("--{boundary}\r\n").as_bytes());
            body.extend(
                format!(
                    "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
                    filename
                )
                .as_bytes(),
            );
            body.extend(b"Content-Type: application/octet-stream\r\n\r\n");
            body.extend(data);
            body.extend(b"\r\n");
        }

        body.extend(format!("--{boundary}--\r\n").as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(path)
            .header(
                "content-type",
                format!("multipart/form-data; boundary={boundary}"),
            )
            .header("authorization", format!("Bearer {token}"))
            .body(Body::from(body))?;
        Ok(self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("infallible response"))
    }

    pub async fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut PgConnection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.state.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool
                .get()
                .map_err(|err| anyhow!("failed to get database connection: {err}"))?;
            f(&mut conn)
        })
        .await
        .context("connection task panicked")?
    }

    #[allow(dead_code)]
    pub async fn execute_sql(&self, sql: impl Into<String>) -> Result<()> {
        let sql = sql.into();
        self.with_conn(move |conn| {
            conn.batch_execute(&sql).context("failed to execute SQL")?;
            Ok(())
        })
        .await
    }
}

pub async fn acquire_db_lock() -> tokio::sync::MutexGuard<'static, ()> {
    DB_LOCK.lock().await
}

pub async fn body_to_vec(body: Body) -> Result<Vec<u8>> {
    let collected = body
        .collect()
        .await
        .map_err(|err| anyhow!("failed to read response body: {err}"))?;
    Ok(collected.to_bytes().to_vec())
}

/// Status and parsed JSON body of a response.
pub async fn read_json(response: hyper::Response<Body>) -> Result<(StatusCode, Value)> {
    let status = response.status();
    let body = body_to_vec(response.into_body()).await?;
    let value = serde_json::from_slice(&body)
        .with_context(|| format!("response body is not JSON: {}", String::from_utf8_lossy(&body)))?;
    Ok((status, value))
}

/// Money fields serialise as strings; accept numbers too.
#[allow(dead_code)]
pub fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(raw) => Decimal::from_str(raw).expect("decimal string"),
        Value::Number(number) => Decimal::from_str(&number.to_string()).expect("decimal number"),
        other => panic!("expected a decimal, got {other}"),
    }
}

async fn prepare_database(pool: &PgPool) -> Result<()> {
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<()> {
        let mut conn = pool
            .get()
            .map_err(|err| anyhow!("failed to acquire connection: {err}"))?;
        conn.run_pending_migrations(db::MIGRATIONS)
            .map_err(|err| anyhow!("failed to run migrations: {err}"))?;
        truncate_all(&mut conn)?;
        Ok(())
    })
    .await
    .context("migration task panicked")?
}

fn truncate_all(conn: &mut PgConnection) -> Result<()> {
    conn.batch_execute(
        "DROP TRIGGER IF EXISTS fail_settlement_insert ON cashbook;
         DROP TRIGGER IF EXISTS fail_settlement_insert ON ap_ledger;
         DROP TRIGGER IF EXISTS fail_settlement_insert ON dispatch_receipts_log;
         DO $$ BEGIN
             IF to_regprocedure('wallet_balance_offline(bigint)') IS NOT NULL THEN
                 ALTER FUNCTION wallet_balance_offline(BIGINT) RENAME TO wallet_balance;
             END IF;
         END $$;
         TRUNCATE TABLE dispatch_receipts_log, ap_ledger, cashbook, dispatch_receipts, dispatches,
             user_customers, delivery_locations, customers, vehicles, vendors RESTART IDENTITY CASCADE;",
    )
    .context("failed to truncate tables")?;
    Ok(())
}
