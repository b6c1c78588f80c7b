use crate::catalog::SyncStatus;
use crate::nav::View;
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductId(pub i64);

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Ids written by older pages may be numbers or numeric strings.
impl<'de> Deserialize<'de> for ProductId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match LooseNumber::deserialize(deserializer)? {
            LooseNumber::Int(value) => Ok(ProductId(value)),
            LooseNumber::Float(value) if value.is_finite() => Ok(ProductId(value as i64)),
            LooseNumber::Text(text) => text
                .trim()
                .parse::<i64>()
                .map(ProductId)
                .map_err(|_| serde::de::Error::custom(format!("invalid product id {text:?}"))),
            LooseNumber::Float(value) => {
                Err(serde::de::Error::custom(format!("invalid product id {value}")))
            }
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Int(i64),
    Float(f64),
    Text(String),
}

impl LooseNumber {
    fn to_f64(&self) -> f64 {
        match self {
            LooseNumber::Int(value) => *value as f64,
            LooseNumber::Float(value) => *value,
            LooseNumber::Text(text) => text.trim().parse().unwrap_or(0.0),
        }
    }
}

fn lenient_price<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Option::<LooseNumber>::deserialize(deserializer)?
        .map(|number| number.to_f64())
        .unwrap_or(0.0);
    Ok(if value.is_finite() && value > 0.0 { value } else { 0.0 })
}

fn lenient_qty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let value = Option::<LooseNumber>::deserialize(deserializer)?
        .map(|number| number.to_f64())
        .unwrap_or(0.0);
    Ok(if value.is_finite() && value > 0.0 { value as u64 } else { 0 })
}

/// Persisted as `{id, name, price, qty, cat}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_price")]
    pub price: f64,
    #[serde(default, deserialize_with = "lenient_qty")]
    pub qty: u64,
    #[serde(rename = "cat", default)]
    pub category: String,
}

impl Product {
    pub fn stock_value(&self) -> f64 {
        self.qty as f64 * self.price
    }
}

/// Raw field values as typed into the product form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub qty: String,
    #[serde(default)]
    pub category: String,
}

impl From<&Product> for ProductForm {
    fn from(product: &Product) -> Self {
        Self {
            id: Some(product.id.to_string()),
            name: product.name.clone(),
            price: product.price.to_string(),
            qty: product.qty.to_string(),
            category: product.category.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub title: String,
    pub price: f64,
    pub category: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct TabQuery {
    pub tab: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ViewQuery {
    pub tab: Option<String>,
    #[serde(default)]
    pub filter: String,
    #[serde(default)]
    pub sort: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ConfirmQuery {
    pub tab: Option<String>,
    #[serde(default)]
    pub confirmed: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Doughnut,
    Bar,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub kind: ChartKind,
    pub labels: Vec<String>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub product_count: usize,
    pub total_stock: u64,
    pub total_value: f64,
    pub total_value_label: String,
    pub stock_by_category: IndexMap<String, u64>,
    pub distribution: ChartSeries,
    pub bars: ChartSeries,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRow {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price_label: String,
    pub qty: u64,
    pub low_stock: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductDetail {
    pub id: ProductId,
    pub name: String,
    pub category: String,
    pub price_label: String,
    pub qty: u64,
    pub low_stock: bool,
    pub stock_value_label: String,
    pub share_of_stock: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryItem {
    pub index: usize,
    pub label: String,
    pub product_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryList {
    pub items: Vec<CategoryItem>,
    pub options: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChartFrame {
    pub canvas: &'static str,
    pub generation: u64,
    pub series: ChartSeries,
}

#[derive(Debug, Clone, Serialize)]
pub struct ViewResponse {
    pub tab: String,
    pub active: View,
    pub dashboard: Dashboard,
    pub charts: Vec<ChartFrame>,
    pub products: Vec<ProductRow>,
    pub categories: CategoryList,
    pub catalog: SyncStatus,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    pub applied: bool,
    pub view: ViewResponse,
}

#[derive(Debug, Clone, Serialize)]
pub struct EditResponse {
    pub form: ProductForm,
    pub view: ViewResponse,
}
