use axum::{
    routing::{delete, get, post, put},
    Extension, Router,
};
use std::sync::Arc;
use tower_http::{compression::CompressionLayer, trace::TraceLayer};
use tracing::info;

use crate::{
    api::handler::{health_check, AppState},
    contracts::handlers::{
        apply_ipc_increase, create_contract, get_contract, list_contracts, terminate_contract,
        upcoming_expirations,
    },
    ledger::handlers::{
        apply_credit, delete_credit, get_credit, list_credits, pending_total, register_credit,
        return_credit,
    },
    middleware::{create_cors_layer, rate_limit_middleware, RateLimitLayer},
    parameters::handlers::{get_parameter, list_parameters, update_parameter},
    settlement::handlers::{
        approve_settlement, cancel_settlement, compute_settlement, get_settlement,
        list_adjustments, list_contract_settlements, pay_settlement, register_adjustment,
        settle_owner,
    },
};

pub async fn create_app(state: AppState) -> Router {
    info!("setting up HTTP routes");

    let app = Router::new()
        // Public health check endpoint
        .route("/health", get(health_check))
        .nest(
            "/api/v1",
            Router::new()
                // Parameter store
                .route("/parameters", get(list_parameters))
                .route("/parameters/:name", get(get_parameter))
                .route("/parameters/:name", put(update_parameter))
                // Balance ledger (saldo a favor)
                .route("/credits", post(register_credit).get(list_credits))
                .route("/credits/pending-total", get(pending_total))
                .route("/credits/:id", get(get_credit))
                .route("/credits/:id", delete(delete_credit))
                .route("/credits/:id/apply", post(apply_credit))
                .route("/credits/:id/return", post(return_credit))
                // Settlements (liquidaciones)
                .route("/settlements", post(compute_settlement))
                .route("/settlements/bulk", post(settle_owner))
                .route("/settlements/:id", get(get_settlement))
                .route("/settlements/:id/approve", post(approve_settlement))
                .route("/settlements/:id/pay", post(pay_settlement))
                .route("/settlements/:id/cancel", post(cancel_settlement))
                .route("/settlements/contract/:contract_id", get(list_contract_settlements))
                // Itemized deductions and bonuses
                .route("/adjustments", post(register_adjustment).get(list_adjustments))
                // Contracts and lease tracking
                .route("/contracts", post(create_contract).get(list_contracts))
                .route("/contracts/expirations", get(upcoming_expirations))
                .route("/contracts/:id", get(get_contract))
                .route("/contracts/:id/terminate", post(terminate_contract))
                .route("/contracts/:id/ipc-increase", post(apply_ipc_increase))
                .layer(axum::middleware::from_fn(rate_limit_middleware))
                .layer(Extension(Arc::new(RateLimitLayer::new(100, 60)))),
        )
        .layer(CompressionLayer::new())
        .layer(create_cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    info!("HTTP routes configured");
    app
}

pub async fn run_server(app: Router, bind_address: &str) -> Result<(), Box<dyn std::error::Error>> {
    let listener = tokio::net::TcpListener::bind(bind_address).await?;
    info!("server listening on {}", bind_address);

    axum::serve(listener, app).await?;
    Ok(())
}
