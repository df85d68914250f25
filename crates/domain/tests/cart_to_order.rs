//! Integration tests for the path from a persisted cart to an order document.

use chrono::Utc;
use common::OrderId;
use domain::{
    CartSession, CatalogSnapshot, CheckoutForm, FileSnapshotStore, LineItemProductResolver,
    MatchKind, Money, OrderDraftBuilder, OrderStatus, PaymentChoice, Product, ProductId,
    RawGeolocation, Variant, VariantId,
};

fn catalog() -> CatalogSnapshot {
    CatalogSnapshot::new(vec![
        Product {
            id: ProductId::new("p1"),
            name: "Trail Jacket".into(),
            stock: 0,
            base_price: Money::from_cents(12_000),
            purchase_cost: Money::from_cents(7_000),
            discount_percent: 25,
            variants: vec![Variant {
                id: VariantId::new("v1"),
                size: Some("L".into()),
                stock: 5,
                ..Default::default()
            }],
            ..Default::default()
        },
        Product {
            id: ProductId::new("p2"),
            name: "Wool Socks".into(),
            stock: 40,
            base_price: Money::from_cents(900),
            purchase_cost: Money::from_cents(300),
            ..Default::default()
        },
    ])
}

fn form() -> CheckoutForm {
    CheckoutForm {
        full_name: "Jo Rivera".into(),
        email: "jo@example.com".into(),
        phone: "555-0100".into(),
        address: "12 Elm St".into(),
        city: "Springfield".into(),
        zip_code: "12345".into(),
    }
}

mod cart_persistence {
    use super::*;

    #[test]
    fn cart_survives_a_session_restart() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog();
        let jacket = catalog.get("p1").unwrap();

        let mut session = CartSession::open(FileSnapshotStore::new(dir.path()));
        session.add_item(jacket, jacket.variant("v1"));
        session.add_item(jacket, jacket.variant("v1"));
        session.add_item(catalog.get("p2").unwrap(), None);
        let closed = session.close();

        let reopened = CartSession::open(FileSnapshotStore::new(dir.path()));
        assert_eq!(reopened.cart(), &closed);
        // 2 x (120.00 - 25%) + 9.00
        assert_eq!(reopened.cart().subtotal().cents(), 2 * 9_000 + 900);
    }

    #[test]
    fn garbage_snapshot_file_yields_empty_cart() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("cart.json"), b"\x00\x01garbage").unwrap();

        let session = CartSession::open(FileSnapshotStore::new(dir.path()));
        assert!(session.cart().is_empty());
    }
}

mod draft_to_document {
    use super::*;

    #[test]
    fn order_lines_resolve_back_to_catalog_products() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog();
        let jacket = catalog.get("p1").unwrap();

        let mut session = CartSession::open(FileSnapshotStore::new(dir.path()));
        session.add_item(jacket, jacket.variant("v1"));
        session.add_item(catalog.get("p2").unwrap(), None);

        let builder = OrderDraftBuilder::new(Money::from_cents(500));
        let geolocation: RawGeolocation =
            serde_json::from_str(r#"{"lat": 40.7, "lng": -74.0}"#).unwrap();
        let payment = PaymentChoice {
            method: "cash".into(),
            ..Default::default()
        };
        let draft = builder
            .assemble(
                session.cart().items(),
                &form(),
                payment,
                Some(geolocation),
                Some("user-1".into()),
            )
            .unwrap();

        let order_id = OrderId::new();
        let document = draft.to_document(&order_id, draft.initial_status(), Utc::now());
        assert_eq!(document.status, OrderStatus::Pending.as_str());
        assert_eq!(document.payment.total.cents(), 9_000 + 900 + 500);

        let resolver = LineItemProductResolver::new(&catalog);
        let kinds: Vec<_> = document
            .items
            .iter()
            .map(|line| resolver.resolve(line).map(|r| r.matched_by))
            .collect();
        assert_eq!(kinds, vec![Some(MatchKind::ProductId), Some(MatchKind::ProductId)]);
        assert_eq!(resolver.unit_cost(&document.items[0]).cents(), 7_000);

        let stored = serde_json::to_value(&document).unwrap();
        assert_eq!(stored["items"][0]["variantId"], "v1");
        assert_eq!(stored["shippingAddress"]["zipCode"], "12345");
        assert_eq!(stored["customer"]["location"]["lat"], 40.7);
    }
}
