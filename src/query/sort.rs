// src/query/sort.rs

use serde::{Deserialize, Serialize};

use crate::domain::Entity;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Asc => write!(f, "ASC"),
            Direction::Desc => write!(f, "DESC"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub field: String,
    pub direction: Direction,
}

impl Order {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: Direction::Desc,
        }
    }
}

/// Sort keys in priority order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn unsorted() -> Self {
        Self::default()
    }

    pub fn by(direction: Direction, fields: &[&str]) -> Self {
        Self {
            orders: fields
                .iter()
                .map(|field| Order {
                    field: field.to_string(),
                    direction,
                })
                .collect(),
        }
    }

    pub fn and(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn is_unsorted(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn validate<E: Entity>(&self) -> AppResult<()> {
        for order in &self.orders {
            if E::column_kind(&order.field).is_none() {
                return Err(AppError::query_syntax(format!(
                    "cannot sort {} by unknown field '{}'",
                    E::TABLE,
                    order.field
                )));
            }
        }
        Ok(())
    }

    /// `ORDER BY` with the identifier appended as the final tie-breaker
    pub(crate) fn render_order_by(&self) -> String {
        let mut keys: Vec<String> = self
            .orders
            .iter()
            .map(|order| format!("{} {}", order.field, order.direction))
            .collect();

        if !self.orders.iter().any(|order| order.field == "id") {
            keys.push("id ASC".to_string());
        }

        format!(" ORDER BY {}", keys.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Member;

    #[test]
    fn test_render_appends_id_tiebreak() {
        let sort = Sort::by(Direction::Desc, &["username"]).and(Order::asc("age"));
        assert_eq!(sort.render_order_by(), " ORDER BY username DESC, age ASC, id ASC");
        assert_eq!(Sort::unsorted().render_order_by(), " ORDER BY id ASC");
        assert_eq!(Sort::by(Direction::Desc, &["id"]).render_order_by(), " ORDER BY id DESC");
    }

    #[test]
    fn test_unknown_sort_field_rejected() {
        assert!(Sort::by(Direction::Asc, &["username", "created_at"]).validate::<Member>().is_ok());
        assert!(matches!(
            Sort::by(Direction::Asc, &["height"]).validate::<Member>(),
            Err(AppError::QuerySyntax(_))
        ));
    }
}
