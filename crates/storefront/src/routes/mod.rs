//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health               - Health check
//!
//! # Products
//! GET    /products             - Product listing (?search=&category=)
//!
//! # Cart
//! GET    /cart                 - Cart view
//! POST   /cart/add             - Add a product ({product_id})
//! POST   /cart/update          - Set a line's quantity ({line|index, quantity, version?})
//! POST   /cart/remove          - Remove a line ({line|index, version?})
//! DELETE /cart                 - Empty the cart
//! GET    /cart/count           - Badge counts
//! GET    /cart/events          - Cart change notifications (SSE)
//!
//! # Checkout
//! GET    /checkout             - Pre-filled buyer details and cart summary
//! POST   /checkout             - Place the order
//!
//! # Auth
//! POST   /auth/login           - Login action
//! POST   /auth/register        - Register action
//! POST   /auth/logout          - Logout action
//! ```

pub mod auth;
pub mod cart;
pub mod checkout;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
}

/// Create the cart routes router. `/cart` itself is registered in [`routes`].
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add", post(cart::add))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
        .route("/events", get(cart::events))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::index))
        .route("/cart", get(cart::show).delete(cart::clear))
        .nest("/cart", cart_routes())
        .route("/checkout", get(checkout::show).post(checkout::submit))
        .nest("/auth", auth_routes())
}
