use crate::models::{ChartKind, ChartSeries, Dashboard, Product};
use indexmap::IndexMap;

/// How the distribution chart expresses each category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartScale {
    #[default]
    Quantity,
    Percent,
}

impl ChartScale {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "quantity" | "qty" => Some(ChartScale::Quantity),
            "percent" | "percentage" => Some(ChartScale::Percent),
            _ => None,
        }
    }
}

pub fn build_dashboard(products: &[Product], scale: ChartScale) -> Dashboard {
    let total_stock = products
        .iter()
        .fold(0u64, |sum, product| sum.saturating_add(product.qty));
    let total_value: f64 = products.iter().map(Product::stock_value).sum();
    let by_category = stock_by_category(products);

    let labels: Vec<String> = by_category.keys().cloned().collect();
    let quantities: Vec<f64> = by_category.values().map(|&qty| qty as f64).collect();
    let shares: Vec<f64> = by_category
        .values()
        .map(|&qty| share_percent(qty, total_stock))
        .collect();

    let distribution = ChartSeries {
        kind: ChartKind::Doughnut,
        labels: labels
            .iter()
            .zip(&shares)
            .map(|(label, share)| format!("{label} ({share:.1}%)"))
            .collect(),
        values: match scale {
            ChartScale::Quantity => quantities.clone(),
            ChartScale::Percent => shares,
        },
    };
    let bars = ChartSeries {
        kind: ChartKind::Bar,
        labels,
        values: quantities,
    };

    Dashboard {
        product_count: products.len(),
        total_stock,
        total_value,
        total_value_label: format_euros(total_value),
        stock_by_category: by_category,
        distribution,
        bars,
    }
}

/// Sums quantities per category label in order of first appearance.
pub fn stock_by_category(products: &[Product]) -> IndexMap<String, u64> {
    let mut totals: IndexMap<String, u64> = IndexMap::new();
    for product in products {
        let entry = totals.entry(product.category.clone()).or_default();
        *entry = entry.saturating_add(product.qty);
    }
    totals
}

/// Share of `part` in `total`, in percent, rounded to one decimal.
pub fn share_percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 / total as f64 * 1000.0).round() / 10.0
}

/// `1234.5` → `"1,234.50 €"`.
pub fn format_euros(value: f64) -> String {
    let value = if value.is_finite() { value } else { 0.0 };
    let cents = (value.abs() * 100.0).round() as u128;
    let whole = (cents / 100).to_string();
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    let sign = if value < 0.0 && cents > 0 { "-" } else { "" };
    format!("{sign}{grouped}.{:02} €", cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProductId;

    fn product(id: i64, qty: u64, price: f64, category: &str) -> Product {
        Product {
            id: ProductId(id),
            name: format!("p{id}"),
            price,
            qty,
            category: category.into(),
        }
    }

    #[test]
    fn dashboard_aggregates_counts_stock_and_value() {
        let products = vec![product(1, 3, 10.0, "A"), product(2, 2, 5.0, "B")];
        let dashboard = build_dashboard(&products, ChartScale::Quantity);

        assert_eq!(dashboard.product_count, 2);
        assert_eq!(dashboard.total_stock, 5);
        assert_eq!(dashboard.total_value, 40.0);
        assert_eq!(dashboard.total_value_label, "40.00 €");
        let map: Vec<(&str, u64)> = dashboard
            .stock_by_category
            .iter()
            .map(|(label, qty)| (label.as_str(), *qty))
            .collect();
        assert_eq!(map, vec![("A", 3), ("B", 2)]);
        assert_eq!(dashboard.bars.values, vec![3.0, 2.0]);
        assert_eq!(dashboard.distribution.values, vec![3.0, 2.0]);
        assert_eq!(dashboard.distribution.labels, vec!["A (60.0%)", "B (40.0%)"]);
    }

    #[test]
    fn percent_scale_rounds_to_one_decimal() {
        let products = vec![product(1, 1, 1.0, "A"), product(2, 2, 1.0, "B")];
        let dashboard = build_dashboard(&products, ChartScale::Percent);
        assert_eq!(dashboard.distribution.values, vec![33.3, 66.7]);
        assert_eq!(dashboard.bars.values, vec![1.0, 2.0]);
    }

    #[test]
    fn categories_keep_first_appearance_order() {
        let products = vec![
            product(1, 1, 1.0, "Z"),
            product(2, 4, 1.0, "A"),
            product(3, 2, 1.0, "Z"),
        ];
        let totals = stock_by_category(&products);
        assert_eq!(totals.keys().collect::<Vec<_>>(), vec!["Z", "A"]);
        assert_eq!(totals["Z"], 3);
    }

    #[test]
    fn empty_inventory_has_empty_charts() {
        let dashboard = build_dashboard(&[], ChartScale::Percent);
        assert_eq!(dashboard.total_stock, 0);
        assert!(dashboard.distribution.labels.is_empty());
        assert_eq!(share_percent(0, 0), 0.0);
    }

    #[test]
    fn euros_are_grouped_by_thousands() {
        assert_eq!(format_euros(0.0), "0.00 €");
        assert_eq!(format_euros(1234.5), "1,234.50 €");
        assert_eq!(format_euros(1_000_000.0), "1,000,000.00 €");
        assert_eq!(format_euros(999.999), "1,000.00 €");
    }

    #[test]
    fn chart_scale_parses_env_values() {
        assert_eq!(ChartScale::parse("Percent"), Some(ChartScale::Percent));
        assert_eq!(ChartScale::parse("qty"), Some(ChartScale::Quantity));
        assert_eq!(ChartScale::parse("pie"), None);
    }
}
