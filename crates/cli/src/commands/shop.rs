//! Shopper commands over the REST API.
//!
//! Session state (login, cart, last search) is kept under `--session-dir`
//! and survives between invocations.
//!
//! ```bash
//! bazaar shop login -e abc@gmail.com -p 1234
//! bazaar shop products --page 2
//! bazaar shop cart add Textbook
//! bazaar shop checkout --nonce fake-valid-nonce
//! ```

use std::fmt::Write as _;

use bazaar_client::api::Registration;
use bazaar_client::{ApiClient, ClientError, Session};
use bazaar_core::{Order, Product, ProductId};

/// Shopper actions.
#[derive(Debug, Clone)]
pub enum ShopAction {
    Register(Registration),
    Login { email: String, password: String },
    Logout,
    WhoAmI,
    Products { page: i64 },
    Search { keyword: String },
    CartAdd { slug: String },
    CartRemove { id: ProductId },
    CartShow,
    CartClear,
    Checkout { nonce: String },
    Orders,
}

#[allow(clippy::print_stdout)]
fn emit(text: &str) {
    println!("{text}");
}

fn product_line(product: &Product) -> String {
    format!(
        "{:>5}  {:<30} {:>10}  {}",
        product.id, product.name, product.price, product.slug
    )
}

fn product_table(products: &[Product]) -> String {
    if products.is_empty() {
        return "(no products)".to_owned();
    }
    products
        .iter()
        .map(product_line)
        .collect::<Vec<_>>()
        .join("\n")
}

fn order_summary(order: &Order) -> String {
    let mut out = format!(
        "Order {} - {} - {}",
        order.id,
        order.status,
        order.created_at.format("%Y-%m-%d %H:%M")
    );
    for product in &order.products {
        let _ = write!(out, "\n  {}", product_line(product));
    }
    out
}

/// Run one shopper action against `api`, reading and updating `session`.
///
/// # Errors
///
/// Returns the API or session error.
pub async fn run(api: ApiClient, session: &mut Session, action: ShopAction) -> Result<(), ClientError> {
    let api = api.with_token(session.auth.token().map(str::to_owned));

    match action {
        ShopAction::Register(registration) => {
            let user = api.register(&registration).await?;
            emit(&format!("Registered {} <{}>. Log in to continue.", user.name, user.email));
        }
        ShopAction::Login { email, password } => {
            let auth = api.login(&email, &password).await?;
            emit(&format!("Logged in as {}", auth.user.name));
            session.auth.sign_in(auth)?;
        }
        ShopAction::Logout => {
            session.auth.sign_out()?;
            emit("Logged out");
        }
        ShopAction::WhoAmI => match session.auth.user() {
            Some(user) => {
                let valid = api.user_auth().await?;
                let role = if user.role.is_admin() { "admin" } else { "buyer" };
                let note = if valid { "" } else { " (session expired)" };
                emit(&format!("{} <{}> [{role}]{note}", user.name, user.email));
            }
            None => emit("Not logged in"),
        },
        ShopAction::Products { page } => {
            let products = api.product_page(page).await?;
            let total = api.product_count().await?;
            emit(&product_table(&products));
            emit(&format!("Page {} ({total} products)", page.max(1)));
        }
        ShopAction::Search { keyword } => {
            let results = api.search(&keyword).await?;
            emit(&product_table(&results));
            session.search.set(keyword, results)?;
        }
        ShopAction::CartAdd { slug } => {
            let product = api.product(&slug).await?;
            emit(&format!("Added {} to cart", product.name));
            session.cart.add(product)?;
        }
        ShopAction::CartRemove { id } => {
            if session.cart.remove(id)? {
                emit(&format!("Removed product {id} from cart"));
            } else {
                emit(&format!("Product {id} is not in the cart"));
            }
        }
        ShopAction::CartShow => {
            emit(&product_table(session.cart.items()));
            emit(&format!(
                "{} item(s), total {}",
                session.cart.len(),
                session.cart.total()
            ));
        }
        ShopAction::CartClear => {
            session.cart.clear()?;
            emit("Cart cleared");
        }
        ShopAction::Checkout { nonce } => {
            if session.cart.is_empty() {
                emit("Cart is empty");
                return Ok(());
            }
            api.checkout(&nonce, &session.cart.ids()).await?;
            session.cart.clear()?;
            emit("Payment completed successfully");
        }
        ShopAction::Orders => {
            let orders = api.orders().await?;
            if orders.is_empty() {
                emit("(no orders)");
            }
            for order in &orders {
                emit(&order_summary(order));
            }
        }
    }
    Ok(())
}
