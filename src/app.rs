use std::{env, sync::Arc};

use axum::{
    extract::{Form, Path, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse},
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use sha2::{Digest, Sha256};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Row,
};
use tower_http::cors::CorsLayer;

use crate::types::{
    AssistantReply, ChatRequest, Config, HistoryEntry, OrderPayload, OrderPaymentRequest,
    PaymentItem, PaymentLinkRequest, Product, ProductPayload, WhatsappInbound,
};
use crate::{ai, message, payment};

/// Number of prior conversation rows handed to the assistant as context.
const HISTORY_WINDOW: usize = 10;

/// Fixed user identifier for the web chat channel.
const WEB_USER_ID: &str = "4";

/// Empty TwiML document; the transport always gets this acknowledgement.
const TWIML_EMPTY: &str = r#"<?xml version="1.0" encoding="UTF-8"?><Response></Response>"#;

const PAYMENT_ERROR_REPLY: &str =
    "Sorry, there was an error creating the payment link. Please try again.";
const PROCESSING_ERROR_REPLY: &str =
    "Sorry, there was an error processing your message. Please try again.";

const CRUD_PAGE: &str = include_str!("../public/crud_products.html");
const CHAT_PAGE: &str = include_str!("../public/chat.html");

pub struct AppState {
    pub db: PgPool,
    pub http: reqwest::Client,
    pub config: Config,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum ChatChannel {
    Web,
    Whatsapp,
}

fn now_iso() -> String {
    Utc::now().to_rfc3339()
}

fn resolve_database_url() -> String {
    if let Ok(url) = env::var("DATABASE_URL") {
        if !url.trim().is_empty() {
            return url;
        }
    }
    let host = env::var("POSTGRES_HOST")
        .or_else(|_| env::var("PGHOST"))
        .unwrap_or_else(|_| "localhost".to_string());
    let port = env::var("POSTGRES_PORT")
        .or_else(|_| env::var("PGPORT"))
        .unwrap_or_else(|_| "5432".to_string());
    let user = env::var("POSTGRES_USER")
        .or_else(|_| env::var("PGUSER"))
        .unwrap_or_else(|_| "postgres".to_string());
    let password = env::var("POSTGRES_PASSWORD")
        .or_else(|_| env::var("PGPASSWORD"))
        .unwrap_or_else(|_| "postgres".to_string());
    let db = env::var("POSTGRES_DB")
        .or_else(|_| env::var("PGDATABASE"))
        .unwrap_or_else(|_| "orderflow".to_string());
    format!("postgres://{user}:{password}@{host}:{port}/{db}")
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Hash of the user identifier modulo a fixed range. Collision-prone but
/// stable across restarts; see DESIGN.md.
fn order_reference(user_id: &str) -> i64 {
    let digest = Sha256::digest(user_id.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(bytes) % 1_000_000) as i64
}

/// Truncates a newest-first row set to the context window and reverses it so
/// the assistant sees the turns oldest-to-newest.
fn history_window(mut newest_first: Vec<HistoryEntry>, window: usize) -> Vec<HistoryEntry> {
    newest_first.truncate(window);
    newest_first.reverse();
    newest_first
}

/// Single strict parse attempt over the raw assistant reply: an order payload
/// or the original text verbatim. A reply that parses as JSON but misses any
/// of `products`, `total_price` or `address` stays conversational.
fn classify_assistant_reply(raw: &str) -> AssistantReply {
    match serde_json::from_str::<OrderPayload>(raw.trim()) {
        Ok(order) => AssistantReply::Order(order),
        Err(_) => AssistantReply::Text(raw.to_string()),
    }
}

fn payment_items_for_order(order: &OrderPayload) -> Vec<PaymentItem> {
    order
        .products
        .iter()
        .map(|item| PaymentItem {
            name: item.product.clone(),
            price: item.unit_price,
            quantity: item.quantity,
            description: None,
        })
        .collect()
}

fn customer_label(channel: ChatChannel, user_id: &str) -> String {
    match channel {
        ChatChannel::Web => format!("Cliente Web {user_id}"),
        ChatChannel::Whatsapp => {
            let tail = user_id
                .chars()
                .rev()
                .take(4)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<String>();
            format!("Cliente {tail}")
        }
    }
}

fn compose_order_confirmation(
    order: &OrderPayload,
    payment_link: &str,
    store_address: &str,
    channel: ChatChannel,
) -> String {
    let bold = |text: &str| match channel {
        ChatChannel::Whatsapp => format!("*{text}*"),
        ChatChannel::Web => text.to_string(),
    };

    let products_list = order
        .products
        .iter()
        .map(|item| {
            let item_total = item.unit_price * item.quantity;
            format!("- {} x{} - ${:.2}", item.product, item.quantity, item_total)
        })
        .collect::<Vec<_>>()
        .join("\n");

    let is_pickup = !store_address.is_empty() && order.address == store_address;
    let delivery_label = if is_pickup {
        "Store Pickup:"
    } else {
        "Delivery Address:"
    };

    format!(
        "{}\n\n{}\n{}\n\n{}\n{} {}\n\n{}\n{}\n\nOnce payment is completed, we will process your order immediately. Thank you for your purchase!",
        bold("Order Confirmed!"),
        bold("Order Summary:"),
        products_list,
        bold(&format!("Total: ${:.2}", order.total_price)),
        bold(delivery_label),
        order.address,
        bold("To complete your purchase, make the payment here:"),
        payment_link,
    )
}

fn row_to_product(row: PgRow) -> Product {
    Product {
        id: row.get("id"),
        name: row.get("name"),
        price_half_quantity: row.get("price_half_quantity"),
    }
}

async fn load_turn_context(
    state: &Arc<AppState>,
    user_id: &str,
) -> Result<(Vec<Product>, Vec<HistoryEntry>), sqlx::Error> {
    let product_rows =
        sqlx::query("SELECT id, name, price_half_quantity FROM products ORDER BY id DESC")
            .fetch_all(&state.db)
            .await?;
    let products = product_rows.into_iter().map(row_to_product).collect();

    let history_rows = sqlx::query(
        "SELECT role, content FROM conversations WHERE user_id = $1 \
         ORDER BY created_at DESC, id DESC LIMIT $2",
    )
    .bind(user_id)
    .bind(HISTORY_WINDOW as i64)
    .fetch_all(&state.db)
    .await?;
    let newest_first = history_rows
        .into_iter()
        .map(|row| HistoryEntry {
            role: row.get("role"),
            content: row.get("content"),
        })
        .collect::<Vec<_>>();

    Ok((products, history_window(newest_first, HISTORY_WINDOW)))
}

async fn insert_conversation_row(
    state: &Arc<AppState>,
    user_id: &str,
    role: &str,
    content: &str,
) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO conversations (user_id, role, content) VALUES ($1, $2, $3)")
        .bind(user_id)
        .bind(role)
        .bind(content)
        .execute(&state.db)
        .await?;
    Ok(())
}

/// One conversational turn, shared by both channels: load catalog + history,
/// persist the user message, query the assistant, branch on order detection
/// (payment link + confirmation, or pass the text through), persist exactly
/// one assistant row. The user row committed here is never rolled back on a
/// later failure.
async fn run_chat_turn(
    state: &Arc<AppState>,
    user_id: &str,
    user_message: &str,
    channel: ChatChannel,
) -> Result<String, String> {
    let (products, history) = load_turn_context(state, user_id).await.map_err(|err| {
        eprintln!("failed to load turn context for {user_id}: {err}");
        "database error".to_string()
    })?;

    insert_conversation_row(state, user_id, "user", user_message)
        .await
        .map_err(|err| {
            eprintln!("failed to persist user message for {user_id}: {err}");
            "database error".to_string()
        })?;

    let raw_reply = ai::chat_with_assistant(state, user_message, &products, &history)
        .await
        .map_err(|err| {
            eprintln!("assistant call failed for {user_id}: {err}");
            format!("assistant service error: {err}")
        })?;

    let reply = match classify_assistant_reply(&raw_reply) {
        AssistantReply::Text(text) => text,
        AssistantReply::Order(order) => {
            println!("Order detected for {user_id}, creating payment link...");
            let items = payment_items_for_order(&order);
            let label = customer_label(channel, user_id);
            match payment::create_order_payment_link(
                state,
                order_reference(user_id),
                &items,
                Some(&label),
            )
            .await
            {
                Ok(link) => compose_order_confirmation(
                    &order,
                    &link.payment_link,
                    &state.config.store_address,
                    channel,
                ),
                Err(err) => {
                    eprintln!("payment link creation failed for {user_id}: {err}");
                    PAYMENT_ERROR_REPLY.to_string()
                }
            }
        }
    };

    insert_conversation_row(state, user_id, "assistant", &reply)
        .await
        .map_err(|err| {
            eprintln!("failed to persist assistant reply for {user_id}: {err}");
            "database error".to_string()
        })?;

    Ok(reply)
}

async fn read_root() -> Html<&'static str> {
    Html(CRUD_PAGE)
}

async fn chat_page() -> Html<&'static str> {
    Html(CHAT_PAGE)
}

async fn health() -> impl IntoResponse {
    Json(json!({ "ok": true, "now": now_iso() }))
}

fn validate_product_payload(payload: &ProductPayload) -> Option<&'static str> {
    if payload.name.trim().is_empty() {
        return Some("name must be a non-empty string");
    }
    if payload.price_half_quantity <= 0.0 {
        return Some("price_half_quantity must be positive");
    }
    None
}

async fn create_product(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProductPayload>,
) -> impl IntoResponse {
    if let Some(reason) = validate_product_payload(&payload) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response();
    }
    let result = sqlx::query("INSERT INTO products (name, price_half_quantity) VALUES ($1, $2)")
        .bind(payload.name.trim())
        .bind(round2(payload.price_half_quantity))
        .execute(&state.db)
        .await;
    match result {
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        Err(err) => {
            eprintln!("failed to save product: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "could not save the product" })),
            )
                .into_response()
        }
    }
}

async fn list_products(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let rows = sqlx::query("SELECT id, name, price_half_quantity FROM products ORDER BY id DESC")
        .fetch_all(&state.db)
        .await;
    match rows {
        Ok(rows) => {
            let products = rows.into_iter().map(row_to_product).collect::<Vec<_>>();
            (StatusCode::OK, Json(json!({ "items": products }))).into_response()
        }
        Err(err) => {
            eprintln!("failed to list products: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "could not list products" })),
            )
                .into_response()
        }
    }
}

async fn update_product(
    Path(product_id): Path<i64>,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ProductPayload>,
) -> impl IntoResponse {
    if let Some(reason) = validate_product_payload(&payload) {
        return (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response();
    }
    let result =
        sqlx::query("UPDATE products SET name = $2, price_half_quantity = $3 WHERE id = $1")
            .bind(product_id)
            .bind(payload.name.trim())
            .bind(round2(payload.price_half_quantity))
            .execute(&state.db)
            .await;
    match result {
        Ok(outcome) if outcome.rows_affected() == 0 => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "product not found" })),
        )
            .into_response(),
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        Err(err) => {
            eprintln!("failed to update product {product_id}: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "could not update the product" })),
            )
                .into_response()
        }
    }
}

async fn delete_product(
    Path(product_id): Path<i64>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(product_id)
        .execute(&state.db)
        .await;
    match result {
        Ok(outcome) if outcome.rows_affected() == 0 => (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": "product not found" })),
        )
            .into_response(),
        Ok(_) => (StatusCode::OK, Json(json!({ "status": "ok" }))).into_response(),
        Err(err) => {
            eprintln!("failed to delete product {product_id}: {err}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": "could not delete the product" })),
            )
                .into_response()
        }
    }
}

async fn chat_endpoint(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequest>,
) -> impl IntoResponse {
    if body.message.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "message is required" })),
        )
            .into_response();
    }
    match run_chat_turn(&state, WEB_USER_ID, &body.message, ChatChannel::Web).await {
        Ok(reply) => (StatusCode::OK, Json(json!({ "response": reply }))).into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": err })),
        )
            .into_response(),
    }
}

async fn create_payment_link_endpoint(
    State(state): State<Arc<AppState>>,
    Json(body): Json<PaymentLinkRequest>,
) -> impl IntoResponse {
    if body.title.trim().is_empty() || body.amount <= 0.0 || body.quantity <= 0 {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "title, positive amount and positive quantity are required" })),
        )
            .into_response();
    }
    let result = payment::create_payment_link(
        &state,
        body.title.trim(),
        body.amount,
        body.description.as_deref(),
        body.quantity,
        body.external_reference.as_deref(),
    )
    .await;
    match result {
        Ok(link) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "payment_link": link.payment_link,
                "payment_link_mobile": link.payment_link_mobile,
                "preference_id": link.preference_id,
                "external_reference": body.external_reference,
                "amount": body.amount,
                "quantity": body.quantity,
                "total": link.total,
                "cbu": state.config.mp_cbu,
            })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("failed to create payment link: {err}") })),
        )
            .into_response(),
    }
}

async fn create_order_payment_link_endpoint(
    State(state): State<Arc<AppState>>,
    Json(body): Json<OrderPaymentRequest>,
) -> impl IntoResponse {
    if body.order_id <= 0 || body.items.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "positive order_id and a non-empty item list are required" })),
        )
            .into_response();
    }
    let result = payment::create_order_payment_link(
        &state,
        body.order_id,
        &body.items,
        body.customer_name.as_deref(),
    )
    .await;
    match result {
        Ok(link) => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "payment_link": link.payment_link,
                "payment_link_mobile": link.payment_link_mobile,
                "preference_id": link.preference_id,
                "order_id": body.order_id,
                "total": link.total,
                "items_count": body.items.len(),
                "cbu": state.config.mp_cbu,
            })),
        )
            .into_response(),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": format!("failed to create order payment link: {err}") })),
        )
            .into_response(),
    }
}

/// Webhook for inbound WhatsApp messages. Whatever happens downstream, the
/// transport gets the empty TwiML acknowledgement; failures are logged and
/// answered with a best-effort apology message.
async fn whatsapp_webhook(
    State(state): State<Arc<AppState>>,
    Form(inbound): Form<WhatsappInbound>,
) -> impl IntoResponse {
    let user_phone = message::strip_whatsapp_prefix(&inbound.from);
    println!(
        "whatsapp message from {user_phone} (sid {}): {}",
        inbound.message_sid.as_deref().unwrap_or("-"),
        inbound.body
    );

    match run_chat_turn(&state, &user_phone, &inbound.body, ChatChannel::Whatsapp).await {
        Ok(reply) => match message::send_whatsapp_message(&state, &reply, &user_phone).await {
            Ok(sid) => println!("reply {sid} sent to {user_phone}"),
            Err(err) => eprintln!("failed to send whatsapp reply to {user_phone}: {err}"),
        },
        Err(err) => {
            eprintln!("error processing whatsapp message from {user_phone}: {err}");
            if let Err(send_err) =
                message::send_whatsapp_message(&state, PROCESSING_ERROR_REPLY, &user_phone).await
            {
                eprintln!("failed to send error notice to {user_phone}: {send_err}");
            }
        }
    }

    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/xml")],
        TWIML_EMPTY,
    )
}

pub async fn run() {
    let _ = dotenvy::dotenv();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(err) => panic!("{err}"),
    };
    let port = env::var("PORT")
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .unwrap_or(8000);
    let database_url = resolve_database_url();

    let db = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await
        .expect("failed to connect to postgres (set DATABASE_URL or POSTGRES_* env vars)");

    sqlx::migrate!("./migrations")
        .run(&db)
        .await
        .expect("failed to run sqlx migrations");

    let state = Arc::new(AppState {
        db,
        http: reqwest::Client::new(),
        config,
    });

    let app = Router::new()
        .route("/", get(read_root))
        .route("/health", get(health))
        .route("/chat", get(chat_page).post(chat_endpoint))
        .route("/products", get(list_products).post(create_product))
        .route(
            "/products/{product_id}",
            put(update_product).delete(delete_product),
        )
        .route("/payment/create-link", post(create_payment_link_endpoint))
        .route(
            "/payment/create-order-link",
            post(create_order_payment_link_endpoint),
        )
        .route("/webhook/whatsapp", post(whatsapp_webhook))
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind TCP listener");

    println!("orderflow server running at http://localhost:{port}");
    axum::serve(listener, app)
        .await
        .expect("server runtime failure");
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORDER_JSON: &str = r#"{"products":[{"product":"Empanada","quantity":6,"unit_price":200}],"total_price":1200,"address":"Main St 1"}"#;

    fn entry(role: &str, content: &str) -> HistoryEntry {
        HistoryEntry {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn order_json_is_classified_as_order() {
        match classify_assistant_reply(ORDER_JSON) {
            AssistantReply::Order(order) => {
                assert_eq!(order.products.len(), 1);
                assert_eq!(order.products[0].product, "Empanada");
                assert!((order.products[0].quantity - 6.0).abs() < f64::EPSILON);
                assert!((order.total_price - 1200.0).abs() < f64::EPSILON);
                assert_eq!(order.address, "Main St 1");
            }
            AssistantReply::Text(_) => panic!("expected an order"),
        }
    }

    #[test]
    fn fractional_quantity_order_is_still_an_order() {
        let raw = r#"{"products":[{"product":"Empanada","quantity":1.5,"unit_price":400}],"total_price":600,"address":"Main St 1"}"#;
        match classify_assistant_reply(raw) {
            AssistantReply::Order(order) => {
                assert!((order.products[0].quantity - 1.5).abs() < f64::EPSILON);
                let items = payment_items_for_order(&order);
                assert!((payment::order_total(&items) - 600.0).abs() < f64::EPSILON);
                let text = compose_order_confirmation(
                    &order,
                    "https://mp.example/checkout/abc",
                    "",
                    ChatChannel::Web,
                );
                assert!(text.contains("- Empanada x1.5 - $600.00"));
            }
            AssistantReply::Text(_) => panic!("half-unit quantity order must stay an order"),
        }
    }

    #[test]
    fn json_missing_address_stays_conversational() {
        let raw = r#"{"products":[{"product":"Empanada","quantity":6,"unit_price":200}],"total_price":1200}"#;
        match classify_assistant_reply(raw) {
            AssistantReply::Text(text) => assert_eq!(text, raw),
            AssistantReply::Order(_) => panic!("must not be treated as an order"),
        }
    }

    #[test]
    fn plain_text_and_json_embedded_in_prose_stay_conversational() {
        for raw in [
            "Sure, anything else?",
            "Here is your order: {\"products\":[],\"total_price\":0,\"address\":\"x\"} thanks!",
        ] {
            match classify_assistant_reply(raw) {
                AssistantReply::Text(text) => assert_eq!(text, raw),
                AssistantReply::Order(_) => panic!("must not be treated as an order"),
            }
        }
    }

    #[test]
    fn extra_keys_are_tolerated_in_order_json() {
        let raw = r#"{"products":[{"product":"Pizza","quantity":1,"unit_price":3000}],"total_price":3000,"address":"Elm St 2","note":"ring twice"}"#;
        assert!(matches!(
            classify_assistant_reply(raw),
            AssistantReply::Order(_)
        ));
    }

    #[test]
    fn payment_items_mirror_the_order_and_sum_to_total() {
        let AssistantReply::Order(order) = classify_assistant_reply(ORDER_JSON) else {
            panic!("expected an order");
        };
        let items = payment_items_for_order(&order);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].name, "Empanada");
        assert!((items[0].quantity - 6.0).abs() < f64::EPSILON);
        assert!((payment::order_total(&items) - 1200.0).abs() < f64::EPSILON);
    }

    #[test]
    fn confirmation_contains_link_total_and_delivery_label() {
        let AssistantReply::Order(order) = classify_assistant_reply(ORDER_JSON) else {
            panic!("expected an order");
        };
        let text = compose_order_confirmation(
            &order,
            "https://mp.example/checkout/abc",
            "Av. Siempre Viva 742, Springfield",
            ChatChannel::Web,
        );
        assert!(text.contains("https://mp.example/checkout/abc"));
        assert!(text.contains("Total: $1200.00"));
        assert!(text.contains("- Empanada x6 - $1200.00"));
        assert!(text.contains("Delivery Address: Main St 1"));
        assert!(!text.contains('*'));
    }

    #[test]
    fn confirmation_marks_pickup_when_address_matches_store() {
        let AssistantReply::Order(order) = classify_assistant_reply(ORDER_JSON) else {
            panic!("expected an order");
        };
        let text = compose_order_confirmation(
            &order,
            "https://mp.example/checkout/abc",
            "Main St 1",
            ChatChannel::Web,
        );
        assert!(text.contains("Store Pickup: Main St 1"));
    }

    #[test]
    fn whatsapp_confirmation_uses_bold_markers() {
        let AssistantReply::Order(order) = classify_assistant_reply(ORDER_JSON) else {
            panic!("expected an order");
        };
        let text = compose_order_confirmation(
            &order,
            "https://mp.example/checkout/abc",
            "",
            ChatChannel::Whatsapp,
        );
        assert!(text.contains("*Order Confirmed!*"));
        assert!(text.contains("*Total: $1200.00*"));
        assert!(text.contains("*Delivery Address:* Main St 1"));
    }

    #[test]
    fn payment_failure_reply_carries_no_link() {
        assert!(!PAYMENT_ERROR_REPLY.contains("http"));
        assert!(PAYMENT_ERROR_REPLY.contains("payment link"));
    }

    #[test]
    fn history_window_truncates_and_orders_oldest_first() {
        let newest_first = (0..12)
            .map(|i| entry(if i % 2 == 0 { "assistant" } else { "user" }, &i.to_string()))
            .collect::<Vec<_>>();
        let window = history_window(newest_first, HISTORY_WINDOW);
        assert_eq!(window.len(), HISTORY_WINDOW);
        assert_eq!(window.first().map(|e| e.content.as_str()), Some("9"));
        assert_eq!(window.last().map(|e| e.content.as_str()), Some("0"));
    }

    #[test]
    fn history_window_passes_short_histories_through() {
        let newest_first = vec![entry("assistant", "b"), entry("user", "a")];
        let window = history_window(newest_first, HISTORY_WINDOW);
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "a");
        assert_eq!(window[1].content, "b");
    }

    #[test]
    fn order_reference_is_stable_and_bounded() {
        let first = order_reference("+5491122334455");
        let second = order_reference("+5491122334455");
        assert_eq!(first, second);
        assert!((0..1_000_000).contains(&first));
        assert_ne!(first, order_reference("+5491100000000"));
    }

    #[test]
    fn customer_labels_per_channel() {
        assert_eq!(customer_label(ChatChannel::Web, "4"), "Cliente Web 4");
        assert_eq!(
            customer_label(ChatChannel::Whatsapp, "+5491122334455"),
            "Cliente 4455"
        );
    }

    #[test]
    fn round2_keeps_two_fractional_digits() {
        assert!((round2(199.999) - 200.0).abs() < f64::EPSILON);
        assert!((round2(10.125) - 10.13).abs() < 1e-9);
    }

    #[test]
    fn twiml_ack_is_an_empty_response_document() {
        assert!(TWIML_EMPTY.starts_with("<?xml"));
        assert!(TWIML_EMPTY.ends_with("<Response></Response>"));
    }
}
