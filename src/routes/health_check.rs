#[get("/health_check")]
pub async fn health() {}
