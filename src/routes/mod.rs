use axum::routing::get;
use axum::Router;
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::{apply_security_headers, create_cors_layer, Config};
use crate::handlers::{
    create_record, delete_record, get_record, health_check, list_records, update_record,
    ResourceState,
};
use crate::models::{all_resources, ResourceDescriptor};
use crate::store::RecordStore;

/// Full application router: `/api/<collection>` for every resource,
/// `/health`, and the static landing page for everything else.
pub fn create_routes(store: Arc<dyn RecordStore>, config: &Config) -> Router {
    let api = all_resources()
        .into_iter()
        .fold(Router::new(), |api, resource| {
            api.nest(
                &format!("/{}", resource.collection),
                resource_routes(store.clone(), resource),
            )
        });

    let router = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api)
        .fallback_service(ServeDir::new(&config.static_dir));

    apply_security_headers(router, config.include_hsts)
        .layer(create_cors_layer(config.cors_allowed_origins.as_deref()))
        .layer(TraceLayer::new_for_http())
}

fn resource_routes(
    store: Arc<dyn RecordStore>,
    resource: &'static ResourceDescriptor,
) -> Router {
    Router::new()
        .route("/", get(list_records).post(create_record))
        .route(
            "/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
        .with_state(ResourceState { store, resource })
}
