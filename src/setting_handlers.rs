use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use axum_macros::debug_handler;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    config::AppState,
    db::DB,
    models::{NewSetting, Setting},
    response::{ResponseError, ResponseResult},
    validation::ValidJson,
};

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SettingsQuery {
    /// comma separated keys, every setting when absent
    pub keys: Option<String>,
}

impl SettingsQuery {
    fn keys(&self) -> Vec<String> {
        self.keys
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(String::from)
            .collect()
    }
}

#[utoipa::path(
    get,
    path = "/api/settings",
    tag = "Settings",
    params(SettingsQuery),
    responses(
        (status = 200, description = "Requested settings", body = [Setting]),
        (status = 500, description = "Internal server error", body = crate::response::ErrorBody),
    )
)]
#[debug_handler]
pub async fn list_settings_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SettingsQuery>,
) -> Result<Json<Vec<Setting>>, ResponseError> {
    Ok(Json(state.db.list_settings(&query.keys()).await?))
}

/// Creates the setting or replaces the value stored under its key.
#[utoipa::path(
    post,
    path = "/api/admin/settings",
    tag = "Admin",
    request_body = NewSetting,
    responses(
        (status = 200, description = "Setting stored", body = Setting),
        (status = 400, description = "Invalid input", body = crate::response::ErrorBody),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn upsert_setting_handler(
    State(state): State<Arc<AppState>>,
    ValidJson(body): ValidJson<NewSetting>,
) -> Result<Json<Setting>, ResponseError> {
    let setting = state.db.upsert_setting(body.key.trim(), body.value).await?;
    Ok(Json(setting))
}

#[utoipa::path(
    delete,
    path = "/api/admin/settings/{id}",
    tag = "Admin",
    params(("id" = i64, Path, description = "Setting id")),
    responses(
        (status = 200, description = "Setting deleted", body = crate::response::MessageResponse),
    ),
    security(("bearerAuth" = []))
)]
#[debug_handler]
pub async fn delete_setting_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<ResponseResult, ResponseError> {
    state.db.delete_setting(id).await?;
    Ok(ResponseResult::Message(
        "Setting deleted successfully".to_string(),
    ))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_keys_parsing() {
        assert!(SettingsQuery::default().keys().is_empty());

        let query = SettingsQuery {
            keys: Some("footer_email, footer_phone,,".into()),
        };
        assert_eq!(query.keys(), vec!["footer_email", "footer_phone"]);
    }
}
