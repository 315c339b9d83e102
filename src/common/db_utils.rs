// src/common/db_utils.rs

// Nomes das constraints únicas criadas nas migrações.
pub const TENANT_ACCESS_CODE_KEY: &str = "tenants_access_code_key";
pub const SUBMISSION_RECEIPT_CODE_KEY: &str = "submissions_receipt_code_key";
pub const RESPONSE_SUBMISSION_KEY: &str = "hr_responses_submission_id_key";

/// `%termo%` para ILIKE, com os curingas do próprio termo escapados.
pub fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

/// Verdadeiro quando o erro é uma violação da constraint única `constraint`.
pub(crate) fn is_unique_violation_on(error: &sqlx::Error, constraint: &str) -> bool {
    match error {
        sqlx::Error::Database(db_err) => {
            db_err.is_unique_violation() && db_err.constraint() == Some(constraint)
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_wildcards_are_literal() {
        assert_eq!(contains_pattern("chair"), "%chair%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern(r"a\b"), r"%a\\b%");
    }
}
