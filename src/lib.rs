pub mod application;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use std::sync::Arc;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use application::cart_service::CartService;
use application::order_id::OrderIdAllocator;
use infrastructure::cart_store::DieselCartStore;

pub use db::{create_pool, DbPool};

/// The service wired to its production store.
pub type AppCartService = CartService<DieselCartStore>;

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool
        .get()
        .expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::cart::add_to_cart,
        handlers::cart::submit_order,
        handlers::cart::remove_line,
        handlers::cart::cart_details,
        handlers::cart::order_details,
    ),
    components(schemas(
        handlers::cart::CartRequest,
        handlers::cart::CartLineRequest,
        handlers::cart::AddToCartResponse,
        handlers::cart::CartResponse,
        handlers::cart::CartLineResponse,
    )),
    tags((name = "cart", description = "Cart and order lifecycle"))
)]
struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The order id allocator is created once here and shared across workers;
/// every create path draws from the same counter.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    let order_ids = Arc::new(OrderIdAllocator::new());
    Ok(HttpServer::new(move || {
        let service = CartService::new(DieselCartStore::new(pool.clone()), Arc::clone(&order_ids));
        App::new()
            .app_data(web::Data::new(service))
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
            .service(
                web::scope("/cart")
                    .route("/add", web::post().to(handlers::cart::add_to_cart))
                    .route("/submit", web::post().to(handlers::cart::submit_order))
                    .route("/details", web::get().to(handlers::cart::cart_details))
                    .route("/orders", web::get().to(handlers::cart::order_details))
                    .route(
                        "/{order_id}/lines/{product_id}",
                        web::delete().to(handlers::cart::remove_line),
                    ),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}
