// src/query/predicate.rs
//
// Conjunctive filter predicates
//
// A Clause is a declared (field, operator) pair with no value yet.
// A Condition is a clause with its bound value; a Filter ANDs conditions.

use crate::domain::{Entity, FieldKind};
use crate::error::{AppError, AppResult};
use crate::query::value::Value;

/// Comparison operator usable in a clause
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
    In,
    Like,
    StartingWith,
    IsNull,
    IsNotNull,
}

/// How many values an operator consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    None,
    Scalar,
    List,
}

impl Operator {
    pub fn arity(self) -> Arity {
        match self {
            Operator::IsNull | Operator::IsNotNull => Arity::None,
            Operator::In => Arity::List,
            _ => Arity::Scalar,
        }
    }

    /// Operator/field-kind compatibility matrix
    pub fn supports(self, kind: FieldKind) -> bool {
        match self {
            Operator::Eq | Operator::Ne | Operator::In | Operator::IsNull | Operator::IsNotNull => true,
            Operator::Gt | Operator::Ge | Operator::Lt | Operator::Le => {
                matches!(kind, FieldKind::Integer | FieldKind::Text)
            }
            Operator::Like | Operator::StartingWith => matches!(kind, FieldKind::Text),
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::In => "IN",
            Operator::Like | Operator::StartingWith => "LIKE",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }
}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Operator::Eq => "equal",
            Operator::Ne => "not_equal",
            Operator::Gt => "greater_than",
            Operator::Ge => "greater_than_equal",
            Operator::Lt => "less_than",
            Operator::Le => "less_than_equal",
            Operator::In => "in",
            Operator::Like => "like",
            Operator::StartingWith => "starting_with",
            Operator::IsNull => "is_null",
            Operator::IsNotNull => "is_not_null",
        };
        write!(f, "{}", name)
    }
}

/// A declared field/operator pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
    pub field: String,
    pub op: Operator,
}

impl Clause {
    pub fn new(field: impl Into<String>, op: Operator) -> Self {
        Self {
            field: field.into(),
            op,
        }
    }

    /// Checks the field exists on `E` and the operator suits its kind
    pub fn validate<E: Entity>(&self) -> AppResult<FieldKind> {
        let kind = E::column_kind(&self.field).ok_or_else(|| {
            AppError::query_syntax(format!("unknown field '{}' on {}", self.field, E::TABLE))
        })?;
        if !self.op.supports(kind) {
            return Err(AppError::query_syntax(format!(
                "operator {} is not supported on {}.{} ({:?})",
                self.op,
                E::TABLE,
                self.field,
                kind
            )));
        }
        Ok(kind)
    }
}

/// A clause with its bound value
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub clause: Clause,
    pub value: Option<Value>,
}

impl Condition {
    pub fn new(field: impl Into<String>, op: Operator, value: impl Into<Value>) -> Self {
        Self {
            clause: Clause::new(field, op),
            value: Some(value.into()),
        }
    }

    pub fn unary(field: impl Into<String>, op: Operator) -> Self {
        Self {
            clause: Clause::new(field, op),
            value: None,
        }
    }

    fn validate<E: Entity>(&self) -> AppResult<()> {
        let kind = self.clause.validate::<E>()?;
        let field = &self.clause.field;

        // NULL only makes sense as an equality argument, where it renders IS [NOT] NULL
        let comparable = |v: &Value| *v != Value::Null && !v.is_list() && v.fits(kind);

        match (self.clause.op.arity(), &self.value) {
            (Arity::None, None) => Ok(()),
            (Arity::Scalar, Some(Value::Null)) if matches!(self.clause.op, Operator::Eq | Operator::Ne) => Ok(()),
            (Arity::Scalar, Some(v)) if comparable(v) => Ok(()),
            (Arity::List, Some(Value::List(items))) if items.iter().all(comparable) => Ok(()),
            (_, value) => Err(AppError::query_syntax(format!(
                "value {} does not fit {} {} on {}",
                value.as_ref().map(|v| v.type_name()).unwrap_or("<none>"),
                field,
                self.clause.op,
                E::TABLE
            ))),
        }
    }
}

/// Conjunction of conditions
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn and(mut self, condition: Condition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn validate<E: Entity>(&self) -> AppResult<()> {
        self.conditions.iter().try_for_each(Condition::validate::<E>)
    }

    /// Render `WHERE ...` (or an empty string) appending positional values
    pub(crate) fn render_where(&self, values: &mut Vec<Value>) -> String {
        if self.conditions.is_empty() {
            return String::new();
        }

        let parts: Vec<String> = self
            .conditions
            .iter()
            .map(|condition| render_condition(condition, values))
            .collect();

        format!(" WHERE {}", parts.join(" AND "))
    }
}

fn render_condition(condition: &Condition, values: &mut Vec<Value>) -> String {
    let field = &condition.clause.field;
    let op = condition.clause.op;

    match (op, &condition.value) {
        (Operator::IsNull, _) | (Operator::IsNotNull, _) => format!("{} {}", field, op.sql()),
        (Operator::Eq, Some(Value::Null)) => format!("{} {}", field, Operator::IsNull.sql()),
        (Operator::Ne, Some(Value::Null)) => format!("{} {}", field, Operator::IsNotNull.sql()),
        // IN () never matches; keep it explicit
        (Operator::In, Some(Value::List(items))) if items.is_empty() => "0 = 1".to_string(),
        (Operator::In, Some(Value::List(items))) => {
            let placeholders: Vec<String> = items
                .iter()
                .map(|item| {
                    values.push(item.clone());
                    format!("?{}", values.len())
                })
                .collect();
            format!("{} IN ({})", field, placeholders.join(", "))
        }
        (Operator::StartingWith, Some(Value::Text(prefix))) => {
            values.push(Value::Text(format!("{}%", escape_like(prefix))));
            format!("{} LIKE ?{} ESCAPE '\\'", field, values.len())
        }
        (_, value) => {
            values.push(value.clone().unwrap_or(Value::Null));
            format!("{} {} ?{}", field, op.sql(), values.len())
        }
    }
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Member;

    #[test]
    fn test_operator_matrix() {
        assert!(Operator::Gt.supports(FieldKind::Integer));
        assert!(!Operator::Gt.supports(FieldKind::Reference("team")));
        assert!(Operator::Like.supports(FieldKind::Text));
        assert!(!Operator::Like.supports(FieldKind::Integer));
        assert!(Operator::In.supports(FieldKind::Reference("team")));
    }

    #[test]
    fn test_clause_validation() {
        assert!(Clause::new("username", Operator::Eq).validate::<Member>().is_ok());
        assert!(matches!(
            Clause::new("nickname", Operator::Eq).validate::<Member>(),
            Err(AppError::QuerySyntax(_))
        ));
        assert!(matches!(
            Clause::new("age", Operator::Like).validate::<Member>(),
            Err(AppError::QuerySyntax(_))
        ));
    }

    #[test]
    fn test_condition_value_shape_checked() {
        let wrong_type = Filter::all().and(Condition::new("age", Operator::Gt, "ten"));
        assert!(wrong_type.validate::<Member>().is_err());

        let scalar_for_in = Filter::all().and(Condition::new("username", Operator::In, "a"));
        assert!(scalar_for_in.validate::<Member>().is_err());

        let ok = Filter::all()
            .and(Condition::new("username", Operator::In, vec!["a", "b"]))
            .and(Condition::unary("team_id", Operator::IsNull));
        assert!(ok.validate::<Member>().is_ok());
    }

    #[test]
    fn test_render_where() {
        let filter = Filter::all()
            .and(Condition::new("username", Operator::Eq, "memberBB"))
            .and(Condition::new("age", Operator::Gt, 10))
            .and(Condition::new("username", Operator::In, vec!["a", "b"]));

        let mut values = Vec::new();
        let sql = filter.render_where(&mut values);

        assert_eq!(sql, " WHERE username = ?1 AND age > ?2 AND username IN (?3, ?4)");
        assert_eq!(values.len(), 4);
    }

    #[test]
    fn test_render_empty_in_and_prefix() {
        let filter = Filter::all()
            .and(Condition::new("username", Operator::In, Vec::<String>::new()))
            .and(Condition::new("username", Operator::StartingWith, "50%_"));

        let mut values = Vec::new();
        let sql = filter.render_where(&mut values);

        assert_eq!(sql, " WHERE 0 = 1 AND username LIKE ?1 ESCAPE '\\'");
        assert_eq!(values, vec![Value::Text("50\\%\\_%".to_string())]);
    }

    #[test]
    fn test_null_argument_renders_null_test() {
        let filter = Filter::all()
            .and(Condition::new("team_id", Operator::Eq, Value::Null))
            .and(Condition::new("username", Operator::Ne, Value::Null))
            .and(Condition::new("age", Operator::Ge, 10));
        assert!(filter.validate::<Member>().is_ok());

        let mut values = Vec::new();
        let sql = filter.render_where(&mut values);

        assert_eq!(sql, " WHERE team_id IS NULL AND username IS NOT NULL AND age >= ?1");
        assert_eq!(values, vec![Value::Integer(10)]);
    }

    #[test]
    fn test_null_rejected_for_ordering_and_lists() {
        for op in [Operator::Gt, Operator::Le, Operator::Like, Operator::StartingWith] {
            let filter = Filter::all().and(Condition::new("username", op, Value::Null));
            assert!(matches!(filter.validate::<Member>(), Err(AppError::QuerySyntax(_))), "{}", op);
        }

        let null_in_list = Filter::all().and(Condition::new("age", Operator::In, Value::List(vec![Value::Null])));
        assert!(matches!(null_in_list.validate::<Member>(), Err(AppError::QuerySyntax(_))));
    }
}
