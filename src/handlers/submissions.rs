// src/handlers/submissions.rs

use axum::{
    extract::State,
    response::{IntoResponse, Redirect},
    Form, Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};

use crate::{
    common::error::AppError,
    config::AppState,
    models::submission::{StatusLookupForm, SubmitForm, SubmittedView},
};

const LAST_RECEIPT_COOKIE: &str = "last_receipt_code";
// Tempo de sobra para chegar à página de confirmação, não para guardar o recibo.
const LAST_RECEIPT_MAX_AGE: time::Duration = time::Duration::minutes(10);

// POST /submit
pub async fn submit(
    State(app_state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<SubmitForm>,
) -> Result<impl IntoResponse, AppError> {
    let submission = app_state.submission_router.submit(form).await?;

    // O recibo só aparece na página de confirmação, nunca na URL.
    let cookie = Cookie::build((LAST_RECEIPT_COOKIE, submission.receipt_code))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .max_age(LAST_RECEIPT_MAX_AGE);

    Ok((jar.add(cookie), Redirect::to("/submitted")))
}

// GET /submitted
pub async fn submitted(jar: CookieJar) -> impl IntoResponse {
    let receipt_code = jar.get(LAST_RECEIPT_COOKIE).map(|c| c.value().to_string());

    // Mostrado uma vez só.
    let jar = jar.remove(Cookie::build(LAST_RECEIPT_COOKIE).path("/"));

    (jar, Json(SubmittedView { receipt_code }))
}

// POST /status
pub async fn status(
    State(app_state): State<AppState>,
    Form(form): Form<StatusLookupForm>,
) -> Result<impl IntoResponse, AppError> {
    let view = app_state.submission_router.lookup_status(&form.receipt_code).await?;
    Ok(Json(view))
}
