//! Checkout: turns the session cart into an order.
//!
//! Input, cart and stock are checked before anything is written. The writes
//! (order header, line snapshots, stock decrement, cart clearing) share one
//! transaction, and product rows stay locked while it runs.

use std::borrow::Cow;
use std::str::FromStr;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{info, instrument, warn};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::domain::aggregates::cart::{cart_total, first_short_line};
use crate::domain::aggregates::{CustomerDetails, NewOrder, NewOrderItem, Order, PaymentMethod, UnknownChoice};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{SessionKey, ShippingPolicy};
use crate::error::{Result, ShopError};
use crate::services::events::EventPublisher;
use crate::storage::Store;

/// Checkout request body. Every field is optional at the serde level so that
/// missing fields show up as per-field validation errors.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct CheckoutForm {
    #[validate(required(message = "This field is required."), length(min = 1, max = 100, message = "Ensure this field has between 1 and 100 characters."))]
    pub customer_name: Option<String>,
    #[validate(required(message = "This field is required."), email(message = "Enter a valid email address."))]
    pub customer_email: Option<String>,
    #[validate(required(message = "This field is required."), length(min = 1, max = 20, message = "Ensure this field has between 1 and 20 characters."))]
    pub customer_phone: Option<String>,
    #[validate(required(message = "This field is required."), length(min = 1, message = "This field may not be blank."))]
    pub shipping_address: Option<String>,
    #[validate(required(message = "This field is required."), length(min = 1, max = 50, message = "Ensure this field has between 1 and 50 characters."))]
    pub city: Option<String>,
    #[validate(length(max = 10, message = "Ensure this field has no more than 10 characters."))]
    pub postal_code: Option<String>,
    #[validate(required(message = "This field is required."))]
    pub payment_method: Option<String>,
    pub note: Option<String>,
}

fn invalid_choice(e: UnknownChoice) -> ValidationError {
    let mut err = ValidationError::new("invalid_choice");
    err.message = Some(Cow::from(e.to_string()));
    err
}

impl CheckoutForm {
    /// Trims every field, then validates.
    pub fn into_details(self) -> Result<CustomerDetails> {
        let trim = |v: Option<String>| v.map(|s| s.trim().to_string());
        let form = CheckoutForm {
            customer_name: trim(self.customer_name),
            customer_email: trim(self.customer_email),
            customer_phone: trim(self.customer_phone),
            shipping_address: trim(self.shipping_address),
            city: trim(self.city),
            postal_code: trim(self.postal_code),
            payment_method: trim(self.payment_method),
            note: trim(self.note),
        };
        let mut errors = form.validate().err().unwrap_or_else(ValidationErrors::new);

        // A missing method is already reported by `required`.
        let payment_method = match form.payment_method.as_deref().map(PaymentMethod::from_str) {
            Some(Ok(method)) if errors.errors().is_empty() => method,
            parsed => {
                if let Some(Err(e)) = parsed { errors.add("payment_method", invalid_choice(e)); }
                return Err(errors.into());
            }
        };
        Ok(CustomerDetails {
            customer_name: form.customer_name.unwrap_or_default(),
            customer_email: form.customer_email.unwrap_or_default(),
            customer_phone: form.customer_phone.unwrap_or_default(),
            shipping_address: form.shipping_address.unwrap_or_default(),
            city: form.city.unwrap_or_default(),
            postal_code: form.postal_code.unwrap_or_default(),
            payment_method,
            note: form.note.unwrap_or_default(),
        })
    }
}

#[derive(Clone)]
pub struct OrderAssembler {
    store: Arc<dyn Store>,
    shipping: ShippingPolicy,
    events: EventPublisher,
}

impl OrderAssembler {
    pub fn new(store: Arc<dyn Store>, shipping: ShippingPolicy, events: EventPublisher) -> Self {
        Self { store, shipping, events }
    }

    #[instrument(skip_all, fields(session = %session))]
    pub async fn checkout(&self, session: &SessionKey, form: CheckoutForm) -> Result<Order> {
        let customer = form.into_details()?;

        let cart = self.store.find_cart(session.as_str()).await?.ok_or(ShopError::EmptyCart)?;
        let lines = self.store.cart_lines(cart.id).await?;
        if lines.is_empty() { return Err(ShopError::EmptyCart); }
        if let Some(short) = first_short_line(&lines) {
            return Err(ShopError::InsufficientStock(short.product.name.clone()));
        }

        let mut tx = self.store.begin_checkout().await?;
        let lines = tx.lock_cart_lines(cart.id).await?;
        if lines.is_empty() { return Err(ShopError::EmptyCart); }

        let total_amount = cart_total(&lines);
        let shipping_cost = self.shipping.cost_for(&customer.city);
        let mut order = tx.insert_order(&NewOrder { customer, total_amount, shipping_cost }).await?;
        for line in &lines {
            order.items.push(tx.insert_order_item(order.id, &NewOrderItem::snapshot(line)).await?);
            if !tx.take_stock(line.product.id, line.quantity).await? {
                warn!(product_id = line.product.id, "stock changed during checkout, rolling back");
                return Err(ShopError::InsufficientStock(line.product.name.clone()));
            }
        }
        tx.clear_cart(cart.id).await?;
        tx.commit().await?;

        info!(order_id = order.id, total = %order.total_amount, shipping = %order.shipping_cost, "order placed");
        self.events.publish(&DomainEvent::order_placed(&order)).await;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::{NewProduct, OrderStatus};
    use crate::services::CartService;
    use crate::storage::MemoryStore;
    use rust_decimal::Decimal;

    struct Fixture { store: Arc<MemoryStore>, carts: CartService, assembler: OrderAssembler, session: SessionKey }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture {
            carts: CartService::new(store.clone()),
            assembler: OrderAssembler::new(store.clone(), ShippingPolicy::default(), EventPublisher::disabled()),
            store,
            session: SessionKey::new("checkout-session").unwrap(),
        }
    }

    fn form(city: &str) -> CheckoutForm {
        CheckoutForm {
            customer_name: Some("Nusrat Jahan".into()),
            customer_email: Some("nusrat@example.com".into()),
            customer_phone: Some("01700000000".into()),
            shipping_address: Some("House 12, Road 4".into()),
            city: Some(city.into()),
            postal_code: None,
            payment_method: Some("cod".into()),
            note: None,
        }
    }

    #[test]
    fn test_form_validation_lists_fields() {
        let err = CheckoutForm { customer_email: Some("not-an-email".into()), payment_method: Some("paypal".into()), ..Default::default() }
            .into_details().unwrap_err();
        let ShopError::Validation(errors) = err else { panic!("expected validation error") };
        let fields = errors.field_errors();
        for f in ["customer_name", "customer_email", "customer_phone", "shipping_address", "city", "payment_method"] {
            assert!(fields.contains_key(f), "missing error for {f}");
        }
        assert!(!fields.contains_key("postal_code"));
        assert!(!fields.contains_key("note"));
    }

    #[test]
    fn test_unknown_payment_method_is_the_only_error() {
        let mut f = form("Dhaka");
        f.payment_method = Some(" paypal ".into());
        let ShopError::Validation(errors) = f.into_details().unwrap_err() else { panic!("expected validation error") };
        let fields = errors.field_errors();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields["payment_method"][0].message.as_deref(), Some("\"paypal\" is not a valid choice."));
    }

    #[test]
    fn test_form_trims_and_parses() {
        let mut f = form("  Dhaka ");
        f.payment_method = Some("bkash".into());
        f.note = Some("  ring twice ".into());
        let details = f.into_details().unwrap();
        assert_eq!(details.city, "Dhaka");
        assert_eq!(details.payment_method, PaymentMethod::Bkash);
        assert_eq!(details.note, "ring twice");
        assert_eq!(details.postal_code, "");
    }

    #[tokio::test]
    async fn test_checkout_creates_order_and_settles_cart() {
        let fx = fixture();
        let lipstick = fx.store.add_product(NewProduct::new("Lipstick", Decimal::new(45000, 2), 10)).await;
        let serum = fx.store.add_product(NewProduct::new("Serum", Decimal::new(120000, 2), 3)).await;
        fx.carts.add(&fx.session, lipstick.id, 2).await.unwrap();
        let before = fx.carts.add(&fx.session, serum.id, 1).await.unwrap();

        let order = fx.assembler.checkout(&fx.session, form("Chittagong")).await.unwrap();
        assert_eq!(order.total_amount, before.total);
        assert_eq!(order.total_amount, Decimal::new(210000, 2));
        assert_eq!(order.shipping_cost, Decimal::from(60));
        assert_eq!(order.grand_total(), Decimal::new(216000, 2));
        assert_eq!(order.status, OrderStatus::Pending);
        assert!(!order.is_paid);
        assert_eq!(order.items.len(), 2);

        assert!(fx.carts.view(&fx.session).await.unwrap().items.is_empty());
        assert_eq!(fx.store.product(lipstick.id).await.unwrap().stock, 8);
        assert_eq!(fx.store.product(serum.id).await.unwrap().stock, 2);
        assert_eq!(fx.store.order(order.id).await.unwrap().unwrap(), order);
    }

    #[tokio::test]
    async fn test_shipping_is_free_in_dhaka() {
        let fx = fixture();
        let p = fx.store.add_product(NewProduct::new("Kajal", Decimal::from(180), 5)).await;
        for city in ["Dhaka", "dhaka", "DHAKA"] {
            fx.carts.add(&fx.session, p.id, 1).await.unwrap();
            let order = fx.assembler.checkout(&fx.session, form(city)).await.unwrap();
            assert_eq!(order.shipping_cost, Decimal::ZERO);
        }
    }

    #[tokio::test]
    async fn test_empty_cart_never_creates_order() {
        let fx = fixture();
        assert!(matches!(fx.assembler.checkout(&fx.session, form("Dhaka")).await, Err(ShopError::EmptyCart)));
        fx.carts.view(&fx.session).await.unwrap();
        assert!(matches!(fx.assembler.checkout(&fx.session, form("Dhaka")).await, Err(ShopError::EmptyCart)));
        assert!(fx.store.orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_short_stock_names_product() {
        let fx = fixture();
        let p = fx.store.add_product(NewProduct::new("Palette", Decimal::from(900), 5)).await;
        fx.carts.add(&fx.session, p.id, 4).await.unwrap();
        fx.store.update_product(p.id, |p| p.stock = 2).await;
        let err = fx.assembler.checkout(&fx.session, form("Khulna")).await.unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock(ref name) if name == "Palette"));
        assert!(fx.store.orders().await.unwrap().is_empty());
        assert_eq!(fx.carts.view(&fx.session).await.unwrap().total_items, 4);
    }

    #[tokio::test]
    async fn test_invalid_form_leaves_cart_alone() {
        let fx = fixture();
        let p = fx.store.add_product(NewProduct::new("Palette", Decimal::from(900), 5)).await;
        fx.carts.add(&fx.session, p.id, 1).await.unwrap();
        let mut bad = form("Dhaka");
        bad.customer_email = Some("nope".into());
        assert!(matches!(fx.assembler.checkout(&fx.session, bad).await, Err(ShopError::Validation(_))));
        assert_eq!(fx.carts.view(&fx.session).await.unwrap().items.len(), 1);
    }

    #[tokio::test]
    async fn test_failure_mid_transaction_rolls_everything_back() {
        let fx = fixture();
        let p = fx.store.add_product(NewProduct::new("Sunscreen", Decimal::from(650), 5)).await;
        fx.carts.add(&fx.session, p.id, 2).await.unwrap();
        fx.store.set_fail_on_cart_clear(true).await;

        let err = fx.assembler.checkout(&fx.session, form("Dhaka")).await.unwrap_err();
        assert!(matches!(err, ShopError::Storage(_)));
        assert!(fx.store.orders().await.unwrap().is_empty());
        assert_eq!(fx.store.product(p.id).await.unwrap().stock, 5);
        assert_eq!(fx.carts.view(&fx.session).await.unwrap().total_items, 2);

        fx.store.set_fail_on_cart_clear(false).await;
        fx.assembler.checkout(&fx.session, form("Dhaka")).await.unwrap();
        assert_eq!(fx.store.product(p.id).await.unwrap().stock, 3);
    }

    #[tokio::test]
    async fn test_stock_sold_during_checkout_rolls_everything_back() {
        let fx = fixture();
        let cleanser = fx.store.add_product(NewProduct::new("Cleanser", Decimal::from(400), 5)).await;
        let mask = fx.store.add_product(NewProduct::new("Sheet Mask", Decimal::from(120), 3)).await;
        fx.carts.add(&fx.session, cleanser.id, 2).await.unwrap();
        fx.carts.add(&fx.session, mask.id, 2).await.unwrap();
        fx.store.sell_before_next_checkout(mask.id, 2).await;

        let err = fx.assembler.checkout(&fx.session, form("Sylhet")).await.unwrap_err();
        assert!(matches!(err, ShopError::InsufficientStock(ref name) if name == "Sheet Mask"));
        assert!(fx.store.orders().await.unwrap().is_empty());
        assert_eq!(fx.store.product(cleanser.id).await.unwrap().stock, 5);
        assert_eq!(fx.store.product(mask.id).await.unwrap().stock, 1);
        assert_eq!(fx.carts.view(&fx.session).await.unwrap().total_items, 4);
    }

    #[tokio::test]
    async fn test_order_lines_are_frozen_snapshots() {
        let fx = fixture();
        let p = fx.store.add_product(NewProduct::new("Face Wash", Decimal::from(250), 5)).await;
        fx.carts.add(&fx.session, p.id, 2).await.unwrap();
        let order = fx.assembler.checkout(&fx.session, form("Dhaka")).await.unwrap();

        fx.store.update_product(p.id, |p| { p.name = "Face Wash XL".into(); p.price = Decimal::from(999); }).await;
        let stored = fx.store.order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.items[0].product_name, "Face Wash");
        assert_eq!(stored.items[0].product_price, Decimal::from(250));
        assert_eq!(stored.total_amount, Decimal::from(500));

        fx.store.delete_product(p.id).await;
        let stored = fx.store.order(order.id).await.unwrap().unwrap();
        assert_eq!(stored.items[0].product_id, None);
        assert_eq!(stored.items[0].product_name, "Face Wash");
    }
}
