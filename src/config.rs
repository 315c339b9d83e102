// src/config.rs

use std::{collections::HashMap, env, net::SocketAddr, sync::Arc, time::Duration};

use anyhow::{bail, Context};
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{DashboardRepository, SubmissionRepository, TenantRepository},
    services::{
        dashboard_service::DashboardService,
        notification::{build_notifier, NotificationQueue},
        rate_limit::{Bucket, CounterStore, MemoryCounterStore, RateLimiter, RatePolicy, RedisCounterStore},
        submission_service::SubmissionRouter,
        tenancy_service::TenantDirectory,
    },
};

/// Provedor de e-mail escolhido por `EMAIL_PROVIDER`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailProvider {
    Console,
    Resend { api_key: String },
    SendGrid { api_key: String },
    Mailgun { api_key: String, domain: String },
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub database_max_connections: u32,
    pub server_addr: SocketAddr,
    pub redis_url: Option<String>,
    pub submit_policy: RatePolicy,
    pub hr_register_policy: RatePolicy,
    pub legacy_access_code: Option<String>,
    pub hr_notify_emails: Vec<String>,
    pub email_provider: EmailProvider,
    pub email_from: String,
    pub notification_queue_capacity: usize,
    pub admin_api_token: Option<String>,
    pub public_base_url: Option<String>,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Lê tudo por uma função de busca; os testes passam um HashMap.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        // Variável vazia conta como ausente.
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let database_url = get("DATABASE_URL").context("DATABASE_URL deve ser definida")?;

        let database_max_connections = parse_or(&get, "DATABASE_MAX_CONNECTIONS", 5)?;
        let server_addr = parse_or(&get, "SERVER_ADDR", SocketAddr::from(([0, 0, 0, 0], 3000)))?;

        let submit_policy = rate_policy(&get, "RATE_LIMIT_SUBMIT")?;
        let hr_register_policy = rate_policy(&get, "RATE_LIMIT_HR_REGISTER")?;

        let hr_notify_emails = get("HR_NOTIFY_EMAILS")
            .map(|list| {
                list.split(',')
                    .map(str::trim)
                    .filter(|email| !email.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let email_provider = match get("EMAIL_PROVIDER").as_deref().map(str::to_ascii_lowercase).as_deref() {
            None | Some("console") => EmailProvider::Console,
            Some("resend") => EmailProvider::Resend {
                api_key: get("RESEND_API_KEY").context("RESEND_API_KEY é obrigatória para o provedor resend")?,
            },
            Some("sendgrid") => EmailProvider::SendGrid {
                api_key: get("SENDGRID_API_KEY")
                    .context("SENDGRID_API_KEY é obrigatória para o provedor sendgrid")?,
            },
            Some("mailgun") => EmailProvider::Mailgun {
                api_key: get("MAILGUN_API_KEY").context("MAILGUN_API_KEY é obrigatória para o provedor mailgun")?,
                domain: get("MAILGUN_DOMAIN").context("MAILGUN_DOMAIN é obrigatória para o provedor mailgun")?,
            },
            Some(other) => bail!("EMAIL_PROVIDER desconhecido: {other}"),
        };

        let notification_queue_capacity = parse_or(&get, "NOTIFICATION_QUEUE_CAPACITY", 100usize)?;
        if notification_queue_capacity == 0 {
            bail!("NOTIFICATION_QUEUE_CAPACITY deve ser maior que zero");
        }

        Ok(Self {
            database_url,
            database_max_connections,
            server_addr,
            redis_url: get("REDIS_URL"),
            submit_policy,
            hr_register_policy,
            legacy_access_code: get("LEGACY_ACCESS_CODE"),
            hr_notify_emails,
            email_provider,
            email_from: get("EMAIL_FROM").unwrap_or_else(|| "noreply@localhost".to_string()),
            notification_queue_capacity,
            admin_api_token: get("ADMIN_API_TOKEN"),
            public_base_url: get("PUBLIC_BASE_URL").map(|url| url.trim_end_matches('/').to_string()),
        })
    }

    pub fn rate_policies(&self) -> HashMap<Bucket, RatePolicy> {
        HashMap::from([
            (Bucket::Submit, self.submit_policy),
            (Bucket::HrRegister, self.hr_register_policy),
        ])
    }
}

fn parse_or<T>(get: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(key) {
        Some(raw) => raw
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} inválida ({raw}): {e}")),
        None => Ok(default),
    }
}

fn rate_policy(get: &impl Fn(&str) -> Option<String>, prefix: &str) -> anyhow::Result<RatePolicy> {
    let defaults = RatePolicy::default();
    let max_requests: u64 = parse_or(get, &format!("{prefix}_MAX"), defaults.max_requests)?;
    let window_secs: u64 = parse_or(get, &format!("{prefix}_WINDOW_SECS"), defaults.window.as_secs())?;

    if max_requests == 0 || window_secs == 0 {
        bail!("{prefix}_MAX e {prefix}_WINDOW_SECS devem ser maiores que zero");
    }

    Ok(RatePolicy { max_requests, window: Duration::from_secs(window_secs) })
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub settings: Arc<Settings>,
    pub tenant_directory: TenantDirectory,
    pub submission_router: SubmissionRouter,
    pub dashboard_service: DashboardService,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub async fn new() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let settings = Arc::new(Settings::from_env()?);

        let db_pool = PgPoolOptions::new()
            .max_connections(settings.database_max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await
            .context("Falha ao conectar ao banco de dados")?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // Redis quando configurado; senão o contador fica na memória do processo
        let counter_store: Arc<dyn CounterStore> = match &settings.redis_url {
            Some(url) => {
                let store = RedisCounterStore::connect(url)
                    .await
                    .map_err(|e| anyhow::anyhow!("Falha ao conectar ao Redis: {e}"))?;
                tracing::info!("✅ Rate limit usando Redis");
                Arc::new(store)
            }
            None => {
                tracing::warn!("REDIS_URL não definida, rate limit em memória (uma instância só)");
                Arc::new(MemoryCounterStore::default())
            }
        };
        let rate_limiter = RateLimiter::new(counter_store, settings.rate_policies());

        let notifier = build_notifier(&settings.email_provider, &settings.email_from)?;
        let (notifications, _worker) = NotificationQueue::start(notifier, settings.notification_queue_capacity);

        if settings.legacy_access_code.is_some() {
            tracing::warn!("LEGACY_ACCESS_CODE ativo: submissões sem tenant serão aceitas");
        }
        if settings.admin_api_token.is_none() {
            tracing::warn!("ADMIN_API_TOKEN não definido, rotas /admin desabilitadas");
        }

        // --- Monta o gráfico de dependências ---
        let tenant_directory = TenantDirectory::new(
            Arc::new(TenantRepository::new(db_pool.clone())),
            settings.legacy_access_code.clone(),
            notifications.clone(),
        );
        let submission_router = SubmissionRouter::new(
            Arc::new(SubmissionRepository::new(db_pool.clone())),
            tenant_directory.clone(),
            notifications,
            settings.hr_notify_emails.clone(),
            settings.public_base_url.clone(),
        );
        let dashboard_service = DashboardService::new(DashboardRepository::new(db_pool.clone()));

        Ok(Self {
            db_pool,
            settings,
            tenant_directory,
            submission_router,
            dashboard_service,
            rate_limiter,
        })
    }
}
