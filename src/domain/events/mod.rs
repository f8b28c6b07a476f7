//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", content = "event", rename_all = "lowercase")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
    Review(ReviewEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProductEvent {
    Created { product_id: Uuid, title: String },
    Updated { product_id: Uuid },
    Deleted { product_id: Uuid },
    InventoryRemoved { product_id: Uuid, quantity: u32, remaining: u32 },
    RatingRecomputed { product_id: Uuid, average_rate: f64 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: Uuid, user_id: Uuid, total: Decimal },
    Paid { order_id: Uuid, payment_id: String },
    StatusChanged { order_id: Uuid, status: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReviewEvent {
    Added { review_id: Uuid, product_id: Uuid, rate: u8 },
}

impl DomainEvent {
    /// Subject suffix used when the event leaves the process.
    pub fn subject(&self) -> String {
        let (aggregate, name) = match self {
            Self::Product(e) => ("product", match e {
                ProductEvent::Created { .. } => "created",
                ProductEvent::Updated { .. } => "updated",
                ProductEvent::Deleted { .. } => "deleted",
                ProductEvent::InventoryRemoved { .. } => "inventory_removed",
                ProductEvent::RatingRecomputed { .. } => "rating_recomputed",
            }),
            Self::Order(e) => ("order", match e {
                OrderEvent::Created { .. } => "created",
                OrderEvent::Paid { .. } => "paid",
                OrderEvent::StatusChanged { .. } => "status_changed",
            }),
            Self::Review(ReviewEvent::Added { .. }) => ("review", "added"),
        };
        format!("{aggregate}.{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subject_and_payload() {
        let id = Uuid::nil();
        let e = DomainEvent::Order(OrderEvent::Paid { order_id: id, payment_id: "cs_1".into() });
        assert_eq!(e.subject(), "order.paid");
        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["aggregate"], "order");
        assert_eq!(json["event"]["type"], "paid");
        assert_eq!(json["event"]["payment_id"], "cs_1");
    }
}
