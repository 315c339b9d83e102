// src/common/codes.rs

//! Geração de códigos numéricos curtos (recibos e códigos de acesso).
//!
//! Os códigos também funcionam como tokens, então a fonte aleatória é sempre
//! o gerador do sistema operacional.

use std::future::Future;

use rand::{rngs::OsRng, Rng};

use crate::common::error::AppError;

const DIGITS: &[u8] = b"0123456789";

/// Os dois tipos de código emitidos pelo sistema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodeKind {
    /// 10 dígitos, exibido como `XXXXX-XXXXX`.
    Receipt,
    /// 6 dígitos, sem formatação.
    Access,
}

impl CodeKind {
    pub fn length(self) -> usize {
        match self {
            CodeKind::Receipt => 10,
            CodeKind::Access => 6,
        }
    }

    pub fn max_attempts(self) -> u32 {
        match self {
            CodeKind::Receipt => 10,
            CodeKind::Access => 100,
        }
    }

    /// Gera um código novo já no formato em que é armazenado.
    pub fn generate(self) -> String {
        let raw = generate_code(self.length(), DIGITS);
        match self {
            CodeKind::Receipt => format_receipt(&raw),
            CodeKind::Access => raw,
        }
    }
}

pub fn generate_code(length: usize, charset: &[u8]) -> String {
    let mut rng = OsRng;
    (0..length)
        .map(|_| charset[rng.gen_range(0..charset.len())] as char)
        .collect()
}

/// `1234567890` -> `12345-67890`. Outros tamanhos passam sem alteração.
pub fn format_receipt(raw: &str) -> String {
    if raw.len() == 10 && raw.is_ascii() {
        format!("{}-{}", &raw[..5], &raw[5..])
    } else {
        raw.to_string()
    }
}

/// Aceita o recibo como o usuário digitou (com traços ou espaços) e devolve a
/// forma armazenada, ou `None` se não forem exatamente 10 dígitos.
pub fn normalize_receipt(input: &str) -> Option<String> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .collect();

    if cleaned.len() == 10 && cleaned.chars().all(|c| c.is_ascii_digit()) {
        Some(format_receipt(&cleaned))
    } else {
        None
    }
}

/// Orçamento de tentativas de um código. Cada candidato gerado gasta uma,
/// tanto os barrados pela checagem quanto os que colidem no INSERT.
#[derive(Debug)]
pub struct AttemptBudget {
    kind: CodeKind,
    used: u32,
}

impl AttemptBudget {
    pub fn new(kind: CodeKind) -> Self {
        Self { kind, used: 0 }
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    fn take(&mut self) -> Result<u32, AppError> {
        let max = self.kind.max_attempts();
        if self.used >= max {
            return Err(AppError::CodeGenerationExhausted { kind: self.kind, attempts: max });
        }
        self.used += 1;
        Ok(self.used)
    }
}

/// Gera códigos até encontrar um que não existe no store.
///
/// A checagem é apenas otimista: a constraint única do banco continua sendo a
/// autoridade final, e quem insere deve tratar a violação como colisão,
/// chamando de novo com o mesmo `budget`.
pub async fn ensure_unique<F, C, Fut>(
    budget: &mut AttemptBudget,
    mut factory: F,
    mut exists_check: C,
) -> Result<String, AppError>
where
    F: FnMut() -> String,
    C: FnMut(String) -> Fut,
    Fut: Future<Output = Result<bool, AppError>>,
{
    loop {
        let attempt = budget.take()?;
        let candidate = factory();
        if !exists_check(candidate.clone()).await? {
            return Ok(candidate);
        }
        tracing::debug!(kind = ?budget.kind, attempt, "Colisão de código, gerando outro");
    }
}
