//! Undocumented banner route.

use axum::response::IntoResponse;

pub async fn root() -> impl IntoResponse {
    concat!(env!("CARGO_PKG_NAME"), " ", env!("CARGO_PKG_VERSION"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn root_names_the_service() {
        let response = root().await.into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body reads");
        let banner = String::from_utf8(bytes.to_vec()).expect("utf8 banner");
        assert!(banner.starts_with(env!("CARGO_PKG_NAME")));
    }
}
