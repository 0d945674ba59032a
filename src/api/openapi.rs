//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, json};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Library API",
        version = "1.0.0",
        description = "Read-only JSON mirrors of the library catalog and loan ledger",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    paths(
        // Health
        health::health_check,
        // Catalog
        json::list_books,
        json::get_book,
        json::list_categories,
        // Loans
        json::list_borrow_records,
    ),
    components(
        schemas(
            crate::models::book::Book,
            crate::models::book::BookWithAvailability,
            crate::models::loan::BorrowRecord,
            crate::models::loan::BorrowRecordDetails,
            crate::models::loan::LoanStatus,
            crate::models::user::Role,
            health::HealthResponse,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "books", description = "Catalog"),
        (name = "loans", description = "Loan ledger")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
