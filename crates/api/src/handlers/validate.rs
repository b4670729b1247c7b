use axum::{http::StatusCode, Json};

use engine::{topo_sort, Workflow};

#[derive(serde::Serialize)]
pub struct ValidationResponseDto {
    pub valid: bool,
    pub order: Vec<String>,
}

#[derive(serde::Serialize)]
pub struct ValidationErrorDto {
    pub valid: bool,
    pub error: String,
}

pub async fn validate(Json(workflow): Json<Workflow>) -> Result<Json<ValidationResponseDto>, (StatusCode, Json<ValidationErrorDto>)> {
    match topo_sort(&workflow) {
        Ok(order) => Ok(Json(ValidationResponseDto { valid: true, order })),
        Err(e) => Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ValidationErrorDto { valid: false, error: e.to_string() }),
        )),
    }
}
