//! Condition-key operator table.
//!
//! A `where` key is `<field>` or `<field>_<suffix>`, e.g. `price_gte`.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    In,
}

/// Suffix tokens and the operators they select.
pub const OPERATORS: &[(&str, Operator)] = &[
    ("eq", Operator::Eq),
    ("neq", Operator::Neq),
    ("gt", Operator::Gt),
    ("gte", Operator::Gte),
    ("lt", Operator::Lt),
    ("lte", Operator::Lte),
    ("like", Operator::Like),
    ("in", Operator::In),
];

impl Operator {
    pub fn sql(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "!=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
        }
    }

}

impl std::fmt::Display for Operator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sql())
    }
}

/// Split a condition key into its base field and operator.
///
/// The longest registered suffix wins; a key without a recognized suffix is
/// an equality test on the whole key.
pub fn parse_condition_key(key: &str) -> (&str, Operator) {
    let mut best: Option<(&str, Operator)> = None;
    for (suffix, op) in OPERATORS {
        let Some(field) = key
            .strip_suffix(suffix)
            .and_then(|rest| rest.strip_suffix('_'))
        else {
            continue;
        };
        match best {
            Some((current, _)) if current.len() <= field.len() => {}
            _ => best = Some((field, *op)),
        }
    }
    best.unwrap_or((key, Operator::Eq))
}
