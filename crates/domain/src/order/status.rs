//! Order status values and normalization of stored status strings.

use serde::{Deserialize, Serialize};

/// Canonical order statuses.
///
/// `PendingInventory` marks orders created by the reservation fallback whose
/// stock still has to be reconciled by an administrator. It is kept apart
/// from `Pending` on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PendingPayment,
    PendingInventory,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::PendingPayment,
        OrderStatus::PendingInventory,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Returns the stored spelling.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PendingPayment => "pending_payment",
            OrderStatus::PendingInventory => "pending_inventory",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    /// Parses any known spelling, legacy ones included.
    pub fn parse(raw: &str) -> Option<OrderStatus> {
        let key = status_key(raw);
        let status = match key.as_str() {
            "pending" | "pendiente" => OrderStatus::Pending,
            "pending_payment" | "pago_pendiente" | "pendiente_pago" | "pendiente_de_pago"
            | "awaiting_payment" => OrderStatus::PendingPayment,
            "pending_inventory" | "pendiente_inventario" | "pendiente_de_inventario" => {
                OrderStatus::PendingInventory
            }
            "completed" | "complete" | "completado" | "completada" => OrderStatus::Completed,
            "cancelled" | "canceled" | "cancelado" | "cancelada" => OrderStatus::Cancelled,
            _ => return None,
        };
        Some(status)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a stored status string to its canonical spelling.
///
/// Matching ignores case, surrounding whitespace and the choice between
/// spaces, hyphens and underscores. Unrecognized strings are returned
/// unchanged so that unknown workflow states are never rewritten.
pub fn normalize_status(raw: &str) -> String {
    match OrderStatus::parse(raw) {
        Some(status) => status.as_str().to_string(),
        None => raw.to_string(),
    }
}

fn status_key(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_spellings_map_to_canonical() {
        assert_eq!(normalize_status("Pendiente"), "pending");
        assert_eq!(normalize_status("pago pendiente"), "pending_payment");
        assert_eq!(normalize_status("  COMPLETADO "), "completed");
        assert_eq!(normalize_status("completada"), "completed");
        assert_eq!(normalize_status("Cancelado"), "cancelled");
        assert_eq!(normalize_status("canceled"), "cancelled");
        assert_eq!(normalize_status("Pending-Payment"), "pending_payment");
        assert_eq!(normalize_status("pendiente inventario"), "pending_inventory");
    }

    #[test]
    fn test_pending_inventory_is_not_folded_into_pending() {
        assert_eq!(normalize_status("pending_inventory"), "pending_inventory");
        assert_ne!(
            OrderStatus::parse("pending_inventory"),
            Some(OrderStatus::Pending)
        );
    }

    #[test]
    fn test_unknown_status_passes_through_unchanged() {
        assert_eq!(normalize_status("Shipped"), "Shipped");
        assert_eq!(normalize_status(""), "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "pendiente",
            "pago pendiente",
            "completado",
            "cancelado",
            "Shipped",
            "  Mixed-Case Thing ",
        ];
        for raw in inputs
            .into_iter()
            .chain(OrderStatus::ALL.iter().map(OrderStatus::as_str))
        {
            let once = normalize_status(raw);
            assert_eq!(normalize_status(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn test_serde_uses_stored_spelling() {
        let json = serde_json::to_string(&OrderStatus::PendingPayment).unwrap();
        assert_eq!(json, "\"pending_payment\"");
    }
}
