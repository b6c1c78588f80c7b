use crate::models::ProductId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum View {
    #[default]
    Dashboard,
    Products,
    Categories,
    ProductDetail { id: ProductId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: View,
    pub to: View,
    pub recompute_dashboard: bool,
}

/// Exactly one view is active; there is no history.
#[derive(Debug, Default)]
pub struct Navigator {
    active: View,
}

impl Navigator {
    pub fn active(&self) -> View {
        self.active
    }

    pub fn show(&mut self, view: View) -> Transition {
        let from = std::mem::replace(&mut self.active, view);
        Transition {
            from,
            to: view,
            recompute_dashboard: view == View::Dashboard,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_on_dashboard() {
        assert_eq!(Navigator::default().active(), View::Dashboard);
    }

    #[test]
    fn only_entering_dashboard_recomputes() {
        let mut nav = Navigator::default();
        assert!(!nav.show(View::Products).recompute_dashboard);
        assert!(!nav.show(View::ProductDetail { id: ProductId(3) }).recompute_dashboard);
        let back = nav.show(View::Dashboard);
        assert!(back.recompute_dashboard);
        assert_eq!(back.from, View::ProductDetail { id: ProductId(3) });
        assert_eq!(nav.active(), View::Dashboard);
    }

    #[test]
    fn views_use_tagged_json() {
        let view: View = serde_json::from_str(r#"{"view":"product_detail","id":"12"}"#).unwrap();
        assert_eq!(view, View::ProductDetail { id: ProductId(12) });
        let json = serde_json::to_string(&View::Categories).unwrap();
        assert_eq!(json, r#"{"view":"categories"}"#);
    }
}
