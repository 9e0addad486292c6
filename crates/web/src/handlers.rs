//! Route handlers for the chat UI.

use crate::error::{status_for, ApiError};
use crate::render::Notice;
use crate::session::{Session, SessionHandle};
use crate::state::AppState;
use axum::extract::State;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::Multipart;
use docu_core::AppError;
use docu_knowledge::UploadedFile;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Cookie carrying the session id.
pub const SESSION_COOKIE: &str = "docu_session";

/// Multipart field holding the uploaded PDFs.
pub const UPLOAD_FIELD: &str = "pdfs";

fn session_cookie(id: Uuid) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

fn cookie_session_id(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// Resolve the caller's session from its cookie, creating one if needed.
async fn open_session(state: &AppState, jar: CookieJar) -> (Uuid, CookieJar, SessionHandle) {
    let (id, handle) = state.sessions.get_or_create(cookie_session_id(&jar)).await;
    (id, jar.add(session_cookie(id)), handle)
}

fn render_session(
    state: &AppState,
    session: &Session,
    notice: Option<&Notice>,
) -> Result<Html<String>, ApiError> {
    let html = state.renderer.render_page(
        session.chat_history.as_deref(),
        session.indexed_chunks(),
        notice,
    )?;
    Ok(Html(html))
}

/// GET / - the chat page for the caller's session.
pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<(CookieJar, Html<String>), ApiError> {
    let (_, jar, handle) = open_session(&state, jar).await;
    let session = handle.lock().await;
    Ok((jar, render_session(&state, &session, None)?))
}

/// POST /train - build a new engine from the uploaded PDFs.
///
/// The session keeps its previous engine and history unless the whole
/// pipeline succeeds.
pub async fn train(
    State(state): State<AppState>,
    jar: CookieJar,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let (id, jar, handle) = open_session(&state, jar).await;
    let files = read_uploads(&mut multipart).await?;

    let mut session = handle.lock().await;
    tracing::info!(session = %id, files = files.len(), "Training session");

    match state.trainer.train(&files).await {
        Ok(outcome) => {
            let notice = match outcome.notice {
                Some(text) => Notice::warning(text),
                None => Notice::info(outcome.stats.summary()),
            };
            session.install(outcome.engine);
            Ok((jar, render_session(&state, &session, Some(&notice))?).into_response())
        }
        Err(err) => {
            tracing::warn!(session = %id, "Training failed: {}", err);
            let status = status_for(&err);
            let notice = Notice::error(err.to_string());
            Ok((status, jar, render_session(&state, &session, Some(&notice))?).into_response())
        }
    }
}

async fn read_uploads(multipart: &mut Multipart) -> Result<Vec<UploadedFile>, ApiError> {
    let mut files = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid upload: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let name = field.file_name().unwrap_or_default().to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read upload '{}': {}", name, e)))?;

        // An empty file input still submits one nameless, empty part
        if name.is_empty() && bytes.is_empty() {
            continue;
        }

        files.push(UploadedFile::new(name, bytes.to_vec()));
    }

    Ok(files)
}

/// Question form body.
#[derive(Debug, Deserialize)]
pub struct AskForm {
    #[serde(default)]
    pub question: String,
}

/// POST /ask - answer a question against the session's engine.
pub async fn ask(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AskForm>,
) -> Result<Response, ApiError> {
    let (id, jar, handle) = open_session(&state, jar).await;
    let mut session = handle.lock().await;

    let question = form.question.trim();
    if question.is_empty() {
        return Ok((jar, render_session(&state, &session, None)?).into_response());
    }

    tracing::debug!(session = %id, "Asking question");
    let result = session.ask(question).await.map(|_| ());

    match result {
        Ok(()) => Ok((jar, render_session(&state, &session, None)?).into_response()),
        Err(err) => {
            let status = status_for(&err);
            let notice = match err {
                AppError::NotTrained => Notice::warning(err.to_string()),
                _ => {
                    tracing::warn!(session = %id, "Question failed: {}", err);
                    Notice::error(err.to_string())
                }
            };
            Ok((status, jar, render_session(&state, &session, Some(&notice))?).into_response())
        }
    }
}

/// POST /reset - forget the caller's session, engine and history included.
pub async fn reset(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    if let Some(id) = cookie_session_id(&jar) {
        if state.sessions.remove(id).await {
            tracing::info!(session = %id, "Session reset");
        }
    }
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Redirect::to("/"))
}

/// Response for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub sessions: usize,
    pub uptime_secs: u64,
}

/// GET /health - liveness and session count.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        sessions: state.sessions.len().await,
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
