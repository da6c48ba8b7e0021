//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart scope comes from the session: the logged-in customer if there is
//! one, otherwise an anonymous token issued on first add.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{AppendHeaders, IntoResponse, Response},
};
use rust_decimal::{Decimal, dec};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use heartwood_core::cart::{CabinetOptions, CartScope, CartSession};
use heartwood_core::{LineItemId, ProductTypeId};

use crate::error::{AppError, Result};
use crate::models::{CurrentUser, session};
use crate::services::carts::NewLineItem;
use crate::services::consolidation::TriggerOutcome;
use crate::state::AppState;

/// Cart item display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: String,
    pub finish: String,
    pub color: String,
    pub hardware: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u32,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            subtotal: "$0.00".to_string(),
            item_count: 0,
        }
    }
}

// =============================================================================
// Type Conversions
// =============================================================================

/// Format a decimal amount as a price string.
fn format_price(amount: Decimal) -> String {
    format!("${amount:.2}")
}

impl From<&CartSession> for CartView {
    fn from(cart: &CartSession) -> Self {
        Self {
            items: cart
                .lines
                .iter()
                .map(|line| CartItemView {
                    id: line.id.to_string(),
                    finish: line.options.finish.clone(),
                    color: line.options.color.clone(),
                    hardware: line.options.hardware.clone(),
                    quantity: line.quantity,
                    price: format_price(line.unit_price),
                    line_price: format_price(line.line_total()),
                })
                .collect(),
            subtotal: format_price(cart.subtotal()),
            item_count: cart.total_quantity(),
        }
    }
}

// =============================================================================
// Pricing
// =============================================================================

/// Quote the unit price for a configured cabinet.
///
/// Flat schedule keyed off the configuration: a shared base plus upcharges
/// for premium finish and hardware lines.
fn quote_unit_price(_product_type: ProductTypeId, options: &CabinetOptions) -> Decimal {
    let mut price = dec!(640.00);
    if matches!(options.finish.as_str(), "walnut stain" | "rift oak") {
        price += dec!(95.00);
    }
    if options.hardware.as_str() == "brass" {
        price += dec!(38.00);
    }
    price
}

// =============================================================================
// Forms & Templates
// =============================================================================

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_type_id: i32,
    pub finish: String,
    pub color: String,
    pub hardware: String,
    pub quantity: Option<u32>,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: i32,
    pub quantity: u32,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub line_id: i32,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub cart: CartView,
    pub signed_in: bool,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Consolidation notice fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/consolidation_notice.html")]
pub struct ConsolidationNoticeTemplate {
    pub success: bool,
    pub title: String,
    pub description: String,
}

// =============================================================================
// Session Helpers
// =============================================================================

/// The cart scope for this request, without issuing a new anonymous token.
async fn current_scope(session: &Session, user: Option<&CurrentUser>) -> Option<CartScope> {
    if let Some(user) = user {
        return Some(CartScope::Customer(user.id));
    }
    session::cart_token(session).await.map(CartScope::Anonymous)
}

/// The cart scope for this request, issuing an anonymous token if needed.
async fn scope_for_write(session: &Session, user: Option<&CurrentUser>) -> Result<CartScope> {
    if let Some(user) = user {
        return Ok(CartScope::Customer(user.id));
    }
    Ok(CartScope::Anonymous(
        session::ensure_cart_token(session).await?,
    ))
}

/// Fetch the current cart through the view cache, degrading to empty.
async fn load_cart_view(state: &AppState, scope: Option<&CartScope>) -> CartView {
    let Some(scope) = scope else {
        return CartView::empty();
    };
    match state.cart_cache().session_for(scope, state.carts()).await {
        Ok(Some(cart)) => CartView::from(&cart),
        Ok(None) => CartView::empty(),
        Err(error) => {
            tracing::warn!(error = %error, "Failed to fetch cart");
            CartView::empty()
        }
    }
}

/// Claim a leftover anonymous cart for a freshly authenticated customer.
///
/// Detecting dual cart state (anonymous token alongside an identity) is what
/// kicks off automatic reconciliation; the executor's idempotence makes the
/// follow-up consolidation safe to run unconditionally.
async fn adopt_anonymous_cart(state: &AppState, session: &Session, user: &CurrentUser) {
    let Some(token) = session::cart_token(session).await else {
        return;
    };
    let anon_scope = CartScope::Anonymous(token);

    match state.carts().find_session(&anon_scope).await {
        Ok(Some(anon)) => {
            if let Err(error) = state.carts().claim_session(anon.id, user.id).await {
                tracing::warn!(error = %error, "Failed to claim anonymous cart");
                return;
            }
            state.cart_cache().invalidate(&anon_scope).await;
            if let Err(error) = session::clear_cart_token(session).await {
                tracing::warn!(error = %error, "Failed to clear cart token");
            }
            state.trigger().reconcile_after_login(user).await;
        }
        Ok(None) => {
            // Token without a session; just drop it
            if let Err(error) = session::clear_cart_token(session).await {
                tracing::warn!(error = %error, "Failed to clear cart token");
            }
        }
        Err(error) => {
            tracing::warn!(error = %error, "Failed to look up anonymous cart");
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Display cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let user = session::current_user(&session).await;
    if let Some(user) = &user {
        adopt_anonymous_cart(&state, &session, user).await;
    }

    let scope = current_scope(&session, user.as_ref()).await;
    let cart = load_cart_view(&state, scope.as_ref()).await;

    CartShowTemplate {
        cart,
        signed_in: user.is_some(),
    }
}

/// Add a configured cabinet to the cart (HTMX).
///
/// Creates a session for the current scope if one doesn't exist yet.
/// Returns an HTMX trigger to update the cart count badge.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let quantity = form.quantity.unwrap_or(1).max(1);
    let user = session::current_user(&session).await;
    let scope = scope_for_write(&session, user.as_ref()).await?;

    let cart = match state.carts().find_session(&scope).await? {
        Some(cart) => cart,
        None => state.carts().create_session(scope.clone()).await?,
    };

    let product_type = ProductTypeId::new(form.product_type_id);
    let options = CabinetOptions {
        finish: form.finish,
        color: form.color,
        hardware: form.hardware,
    };
    let unit_price = quote_unit_price(product_type, &options);

    state
        .carts()
        .add_line(
            cart.id,
            NewLineItem {
                product_type,
                options,
                quantity,
                unit_price,
            },
        )
        .await?;
    state.cart_cache().invalidate(&scope).await;

    let count = state
        .carts()
        .find_session(&scope)
        .await?
        .map_or(0, |cart| cart.total_quantity());

    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartCountTemplate { count },
    )
        .into_response())
}

/// Update cart item quantity (HTMX).
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response> {
    if form.quantity == 0 {
        return Err(AppError::BadRequest(
            "quantity must be at least 1; use remove instead".to_string(),
        ));
    }

    let user = session::current_user(&session).await;
    let Some(scope) = current_scope(&session, user.as_ref()).await else {
        return Ok(CartItemsTemplate {
            cart: CartView::empty(),
        }
        .into_response());
    };

    state
        .carts()
        .update_line_quantity(LineItemId::new(form.line_id), form.quantity)
        .await?;
    state.cart_cache().invalidate(&scope).await;

    let cart = load_cart_view(&state, Some(&scope)).await;
    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate { cart },
    )
        .into_response())
}

/// Remove item from cart (HTMX).
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<RemoveFromCartForm>,
) -> Result<Response> {
    let user = session::current_user(&session).await;
    let Some(scope) = current_scope(&session, user.as_ref()).await else {
        return Ok(CartItemsTemplate {
            cart: CartView::empty(),
        }
        .into_response());
    };

    // Deleting an already-gone line is fine; the cart converges either way
    match state.carts().remove_line(LineItemId::new(form.line_id)).await {
        Ok(()) | Err(crate::services::carts::CartStoreError::LineNotFound(_)) => {}
        Err(error) => return Err(error.into()),
    }
    state.cart_cache().invalidate(&scope).await;

    let cart = load_cart_view(&state, Some(&scope)).await;
    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate { cart },
    )
        .into_response())
}

/// Get cart count badge (HTMX).
#[instrument(skip(state, session))]
pub async fn count(State(state): State<AppState>, session: Session) -> impl IntoResponse {
    let user = session::current_user(&session).await;
    let scope = current_scope(&session, user.as_ref()).await;
    let count = load_cart_view(&state, scope.as_ref()).await.item_count;

    CartCountTemplate { count }
}

/// Merge duplicate cart sessions for the signed-in customer (HTMX).
///
/// Anonymous sessions never see the control; if one posts here anyway the
/// request is a silent no-op.
#[instrument(skip(state, session))]
pub async fn consolidate(State(state): State<AppState>, session: Session) -> Response {
    let user = session::current_user(&session).await;

    match state.trigger().request_consolidation(user.as_ref()).await {
        TriggerOutcome::Completed(result) => {
            let description = if result.is_noop() {
                "Your cart was already tidy.".to_string()
            } else {
                result.summary()
            };
            (
                AppendHeaders([("HX-Trigger", "cart-updated")]),
                ConsolidationNoticeTemplate {
                    success: true,
                    title: "Cart cleaned up".to_string(),
                    description,
                },
            )
                .into_response()
        }
        TriggerOutcome::AlreadyRunning => (
            StatusCode::ACCEPTED,
            ConsolidationNoticeTemplate {
                success: true,
                title: "Hold on".to_string(),
                description: "A cart cleanup is already in progress.".to_string(),
            },
        )
            .into_response(),
        TriggerOutcome::SkippedAnonymous => StatusCode::NO_CONTENT.into_response(),
        TriggerOutcome::Failed => (
            StatusCode::INTERNAL_SERVER_ERROR,
            ConsolidationNoticeTemplate {
                success: false,
                title: "Cart cleanup failed".to_string(),
                description: "We couldn't tidy your cart. Your items are unchanged.".to_string(),
            },
        )
            .into_response(),
    }
}
