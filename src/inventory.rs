use crate::models::{Product, ProductForm, ProductId};
use crate::storage::Snapshot;

/// In-memory product and category collections of one execution context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Inventory {
    pub products: Vec<Product>,
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted(ProductId),
    Replaced(ProductId),
}

impl Upsert {
    pub fn id(self) -> ProductId {
        match self {
            Upsert::Inserted(id) | Upsert::Replaced(id) => id,
        }
    }
}

impl From<Snapshot> for Inventory {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            products: snapshot.products,
            categories: snapshot.categories,
        }
    }
}

impl Inventory {
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|product| product.id == id)
    }

    /// Replaces the product with the form's id in place, or appends a new one.
    pub fn upsert_product(&mut self, form: &ProductForm, now_ms: i64) -> Upsert {
        let supplied = form
            .id
            .as_deref()
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| raw.parse::<i64>().ok())
            .map(ProductId);
        let id = supplied.unwrap_or_else(|| next_product_id(&self.products, now_ms));

        let product = Product {
            id,
            name: form.name.clone(),
            price: parse_price(&form.price),
            qty: parse_qty(&form.qty),
            category: form.category.clone(),
        };

        match self.products.iter().position(|existing| existing.id == id) {
            Some(index) => {
                self.products[index] = product;
                Upsert::Replaced(id)
            }
            None => {
                self.products.push(product);
                Upsert::Inserted(id)
            }
        }
    }

    pub fn remove_product(&mut self, id: ProductId) -> Option<Product> {
        let index = self.products.iter().position(|product| product.id == id)?;
        Some(self.products.remove(index))
    }

    /// Appends a trimmed label unless it is blank or already present.
    pub fn add_category(&mut self, label: &str) -> bool {
        let label = label.trim();
        if label.is_empty() || self.categories.iter().any(|existing| existing == label) {
            return false;
        }
        self.categories.push(label.to_string());
        true
    }

    pub fn remove_category_at(&mut self, index: usize) -> Option<String> {
        (index < self.categories.len()).then(|| self.categories.remove(index))
    }

    /// Adds every label not yet present, keeping first-seen order. Returns how many were added.
    pub fn merge_categories<'a>(&mut self, labels: impl IntoIterator<Item = &'a str>) -> usize {
        labels
            .into_iter()
            .filter(|label| self.add_category(label))
            .count()
    }

    pub fn products_in(&self, category: &str) -> usize {
        self.products
            .iter()
            .filter(|product| product.category == category)
            .count()
    }
}

/// Millisecond timestamp ids, bumped past any id already taken.
fn next_product_id(products: &[Product], now_ms: i64) -> ProductId {
    let mut candidate = now_ms;
    while products.iter().any(|product| product.id.0 == candidate) {
        candidate += 1;
    }
    ProductId(candidate)
}

/// Reads the leading decimal of `raw`; anything unreadable or negative becomes 0.
pub fn parse_price(raw: &str) -> f64 {
    let numeric: String = raw
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || matches!(c, '.' | '-' | '+' | 'e' | 'E'))
        .collect();
    let value = (1..=numeric.len())
        .rev()
        .find_map(|end| numeric[..end].parse::<f64>().ok())
        .unwrap_or(0.0);
    if value.is_finite() && value > 0.0 { value } else { 0.0 }
}

/// Reads the leading integer of `raw`; anything unreadable or negative becomes 0.
pub fn parse_qty(raw: &str) -> u64 {
    let trimmed = raw.trim();
    let (negative, digits) = match trimmed.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, trimmed.strip_prefix('+').unwrap_or(trimmed)),
    };
    let digits: String = digits.chars().take_while(char::is_ascii_digit).collect();
    if negative {
        return 0;
    }
    digits.parse().unwrap_or(0)
}
