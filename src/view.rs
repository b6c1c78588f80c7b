//! View models for the page: plain data derived from the inventory, no markup.

use crate::inventory::Inventory;
use crate::models::{
    CategoryItem, CategoryList, ChartFrame, ChartSeries, Product, ProductDetail, ProductId,
    ProductRow,
};
use crate::stats::{format_euros, share_percent};

pub const LOW_STOCK_BELOW: u64 = 5;
pub const DISTRIBUTION_CANVAS: &str = "pieChart";
pub const BARS_CANVAS: &str = "barChart";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filter: String,
    pub sort_by_name: bool,
}

pub fn product_rows(products: &[Product], query: &ListQuery) -> Vec<ProductRow> {
    let needle = query.filter.to_lowercase();
    let mut matching: Vec<&Product> = products
        .iter()
        .filter(|product| product.name.to_lowercase().contains(&needle))
        .collect();
    if query.sort_by_name {
        matching.sort_by_key(|product| product.name.to_lowercase());
    }
    matching
        .into_iter()
        .map(|product| ProductRow {
            id: product.id,
            name: product.name.clone(),
            category: product.category.clone(),
            price_label: format_euros(product.price),
            qty: product.qty,
            low_stock: product.qty < LOW_STOCK_BELOW,
        })
        .collect()
}

pub fn product_detail(inventory: &Inventory, id: ProductId) -> Option<ProductDetail> {
    let product = inventory.product(id)?;
    let total_stock = inventory
        .products
        .iter()
        .fold(0u64, |sum, p| sum.saturating_add(p.qty));
    Some(ProductDetail {
        id: product.id,
        name: product.name.clone(),
        category: product.category.clone(),
        price_label: format_euros(product.price),
        qty: product.qty,
        low_stock: product.qty < LOW_STOCK_BELOW,
        stock_value_label: format_euros(product.stock_value()),
        share_of_stock: share_percent(product.qty, total_stock),
    })
}

pub fn category_list(inventory: &Inventory) -> CategoryList {
    CategoryList {
        items: inventory
            .categories
            .iter()
            .enumerate()
            .map(|(index, label)| CategoryItem {
                index,
                label: label.clone(),
                product_count: inventory.products_in(label),
            })
            .collect(),
        options: inventory.categories.clone(),
    }
}

#[derive(Debug)]
struct ChartSlot {
    canvas: &'static str,
    generation: u64,
    series: ChartSeries,
}

/// Live chart instances, one per canvas.
#[derive(Debug, Default)]
pub struct ChartBoard {
    slots: Vec<ChartSlot>,
    next_generation: u64,
    disposed: u64,
}

impl ChartBoard {
    /// Draws `series` on `canvas`, disposing whatever was drawn there before.
    pub fn draw(&mut self, canvas: &'static str, series: ChartSeries) -> ChartFrame {
        if let Some(index) = self.slots.iter().position(|slot| slot.canvas == canvas) {
            self.slots.swap_remove(index);
            self.disposed += 1;
        }
        self.next_generation += 1;
        let slot = ChartSlot {
            canvas,
            generation: self.next_generation,
            series,
        };
        let frame = ChartFrame {
            canvas: slot.canvas,
            generation: slot.generation,
            series: slot.series.clone(),
        };
        self.slots.push(slot);
        frame
    }

    pub fn frames(&self) -> Vec<ChartFrame> {
        let mut frames: Vec<ChartFrame> = self
            .slots
            .iter()
            .map(|slot| ChartFrame {
                canvas: slot.canvas,
                generation: slot.generation,
                series: slot.series.clone(),
            })
            .collect();
        frames.sort_by_key(|frame| frame.canvas);
        frames
    }

    pub fn live(&self) -> usize {
        self.slots.len()
    }

    pub fn disposed(&self) -> u64 {
        self.disposed
    }
}
