// src/services/rate_limit.rs

//! Janela fixa por `(bucket, cliente)` sobre um contador com TTL.
//!
//! Toda chamada a [`RateLimiter::allow`] incrementa o contador, inclusive as
//! que depois falham na validação: o contador mede tentativas, não sucessos.
//! Não existe job de limpeza: no Redis as chaves expiram sozinhas e o contador
//! em memória varre as expiradas de tempos em tempos.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use tokio::time::Instant;

use crate::common::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bucket {
    Submit,
    HrRegister,
}

impl Bucket {
    pub fn as_str(self) -> &'static str {
        match self {
            Bucket::Submit => "submit",
            Bucket::HrRegister => "hr_register",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatePolicy {
    pub max_requests: u64,
    pub window: Duration,
}

impl Default for RatePolicy {
    fn default() -> Self {
        Self { max_requests: 10, window: Duration::from_secs(3600) }
    }
}

// ---
// Contador compartilhado
// ---

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Incrementa e devolve o valor novo. O primeiro incremento de uma janela
    /// define o TTL da chave.
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, AppError>;
}

/// Contador em processo. Serve para uma instância só (ou testes).
pub struct MemoryCounterStore {
    state: Mutex<CounterState>,
    sweep_threshold: usize,
    sweep_interval: Duration,
}

#[derive(Default)]
struct CounterState {
    counters: HashMap<String, (u64, Instant)>,
    next_sweep: Option<Instant>,
}

const MEMORY_SWEEP_THRESHOLD: usize = 10_000;
const MEMORY_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

impl Default for MemoryCounterStore {
    fn default() -> Self {
        Self::with_sweep(MEMORY_SWEEP_THRESHOLD, MEMORY_SWEEP_INTERVAL)
    }
}

impl MemoryCounterStore {
    /// Acima de `threshold` chaves, varre as expiradas no máximo uma vez por `interval`.
    pub fn with_sweep(threshold: usize, interval: Duration) -> Self {
        Self {
            state: Mutex::new(CounterState::default()),
            sweep_threshold: threshold,
            sweep_interval: interval,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.state.lock().unwrap().counters.len()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, AppError> {
        let now = Instant::now();
        let mut state = self
            .state
            .lock()
            .map_err(|_| anyhow::anyhow!("mutex do rate limit envenenado"))?;

        let sweep_due = state.next_sweep.is_none_or(|at| now >= at);
        if state.counters.len() > self.sweep_threshold && sweep_due {
            let before = state.counters.len();
            state.counters.retain(|_, (_, expires_at)| *expires_at > now);
            state.next_sweep = Some(now + self.sweep_interval);
            tracing::debug!(removed = before - state.counters.len(), "Contadores expirados removidos");
        }

        let entry = state.counters.entry(key.to_string()).or_insert((0, now + window));
        if entry.1 <= now {
            *entry = (0, now + window);
        }
        entry.0 += 1;

        Ok(entry.0)
    }
}

/// Contador no Redis, compartilhado entre instâncias.
#[derive(Clone)]
pub struct RedisCounterStore {
    connection: ConnectionManager,
}

impl RedisCounterStore {
    pub async fn connect(url: &str) -> Result<Self, AppError> {
        let client = redis::Client::open(url)?;
        let connection = ConnectionManager::new(client).await?;
        Ok(Self { connection })
    }
}

// SET NX cria a chave zerada com TTL só no começo da janela; o INCR vai na
// mesma transação, então nenhuma chave fica sem expiração.
fn window_pipeline(key: &str, window: Duration) -> redis::Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .cmd("SET")
        .arg(key)
        .arg(0)
        .arg("NX")
        .arg("EX")
        .arg(window.as_secs().max(1))
        .ignore()
        .incr(key, 1u64);
    pipe
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, AppError> {
        let mut conn = self.connection.clone();
        let (count,): (u64,) = window_pipeline(key, window).query_async(&mut conn).await?;
        Ok(count)
    }
}

// ---
// O limitador
// ---

#[derive(Clone)]
pub struct RateLimiter {
    store: Arc<dyn CounterStore>,
    policies: HashMap<Bucket, RatePolicy>,
}

impl RateLimiter {
    pub fn new(store: Arc<dyn CounterStore>, policies: HashMap<Bucket, RatePolicy>) -> Self {
        Self { store, policies }
    }

    pub fn policy(&self, bucket: Bucket) -> RatePolicy {
        self.policies.get(&bucket).copied().unwrap_or_default()
    }

    pub async fn allow(&self, bucket: Bucket, client_identity: &str) -> Result<bool, AppError> {
        let policy = self.policy(bucket);
        let key = format!("ratelimit:{bucket}:{client_identity}");

        let count = self.store.increment(&key, policy.window).await?;
        let allowed = count <= policy.max_requests;

        if !allowed {
            tracing::warn!(%bucket, client = client_identity, count, "Rate limit excedido");
        }

        Ok(allowed)
    }
}
