use axum::Json;
use catalog_http::{ApiInput, AppError, WriteSession};

use crate::modules::catalog::models::{CreateLanguage, StatusBody};
use crate::modules::catalog::store;

/// Names are stored as given; duplicates are allowed.
pub async fn create_language(
    mut session: WriteSession,
    ApiInput(body): ApiInput<CreateLanguage>,
) -> Result<Json<StatusBody>, AppError> {
    let language = store::insert_language(session.conn(), &body.name).await?;
    session.commit().await?;

    tracing::info!(language_id = language.id, name = %language.name, "language created");
    Ok(Json(StatusBody::success()))
}
