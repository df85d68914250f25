use std::fmt::Write;

use chrono::SecondsFormat;

use super::ReportRow;

pub const CSV_HEADER: &str =
    "orderId,date,productId,productName,qty,price,purchaseCost,revenue,cost,profit";

const BOM: char = '\u{feff}';

/// Renders rows as CSV with a UTF-8 byte order mark and a header line.
///
/// Product names are always quoted. Other text fields are quoted only when
/// they contain a delimiter, quote or line break. Amounts use two decimals.
pub fn write_csv<'a>(rows: impl IntoIterator<Item = &'a ReportRow>) -> String {
    let mut csv = String::new();
    csv.push(BOM);
    csv.push_str(CSV_HEADER);
    csv.push('\n');

    for row in rows {
        let date = row
            .date
            .map(|d| d.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_default();
        let _ = writeln!(
            csv,
            "{},{},{},{},{},{},{},{},{},{}",
            escape(&row.order_id),
            date,
            escape(&row.product_id),
            quote(&row.product_name),
            row.quantity,
            row.price.to_decimal_string(),
            row.purchase_cost.to_decimal_string(),
            row.revenue.to_decimal_string(),
            row.cost.to_decimal_string(),
            row.profit.to_decimal_string(),
        );
    }
    csv
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        quote(field)
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use domain::Money;

    use super::*;

    fn row() -> ReportRow {
        ReportRow {
            order_id: "o1".into(),
            date: Some(Utc.with_ymd_and_hms(2026, 3, 2, 9, 30, 0).unwrap()),
            product_id: "p1".into(),
            product_name: "Tote \"Classic\", large".into(),
            quantity: 2,
            price: Money::from_cents(1050),
            purchase_cost: Money::from_cents(400),
            revenue: Money::from_cents(2100),
            cost: Money::from_cents(800),
            profit: Money::from_cents(1300),
        }
    }

    #[test]
    fn test_bom_header_and_quoting() {
        let csv = write_csv(&[row()]);
        let mut lines = csv.lines();

        assert_eq!(lines.next(), Some(format!("\u{feff}{CSV_HEADER}").as_str()));
        assert_eq!(
            lines.next(),
            Some(
                "o1,2026-03-02T09:30:00Z,p1,\"Tote \"\"Classic\"\", large\",2,10.50,4.00,21.00,8.00,13.00"
            )
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_plain_name_still_quoted_and_ids_escaped() {
        let mut row = row();
        row.product_name = "Mug".into();
        row.order_id = "a,b".into();
        row.date = None;
        row.profit = Money::from_cents(-250);

        let csv = write_csv(&[row]);
        let line = csv.lines().nth(1).unwrap();

        assert!(line.starts_with("\"a,b\",,p1,\"Mug\",2,"));
        assert!(line.ends_with(",-2.50"));
    }
}
