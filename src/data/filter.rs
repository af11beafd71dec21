use std::fmt;

use thiserror::Error;

use super::model::{Column, ColumnKind};

/// Separator between clauses of a filter query.
pub const CLAUSE_SEPARATOR: &str = " && ";

const QUOTES: [char; 3] = ['\'', '"', '`'];

// ---------------------------------------------------------------------------
// Predicate – one parsed `{column} operator value` clause
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    DateStartsWith,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
            FilterOp::Lt => "lt",
            FilterOp::Le => "le",
            FilterOp::Gt => "gt",
            FilterOp::Ge => "ge",
            FilterOp::Contains => "contains",
            FilterOp::DateStartsWith => "datestartswith",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Number(f64),
    Text(String),
}

impl FilterValue {
    /// Text used by `contains` / `datestartswith`; numbers use their shortest form.
    pub fn as_text(&self) -> String {
        match self {
            FilterValue::Number(n) => n.to_string(),
            FilterValue::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    /// Raw column name as written between the braces.
    pub column: String,
    pub op: FilterOp,
    pub value: FilterValue,
}

// Order matters: a token earlier in the table wins even when a later one also
// occurs in the clause, so `<=` is never read as `<`.
const OPERATOR_TOKENS: &[(FilterOp, &[&str])] = &[
    (FilterOp::Ge, &["ge ", ">="]),
    (FilterOp::Le, &["le ", "<="]),
    (FilterOp::Lt, &["lt ", "<"]),
    (FilterOp::Gt, &["gt ", ">"]),
    (FilterOp::Ne, &["ne ", "!="]),
    (FilterOp::Eq, &["eq ", "="]),
    (FilterOp::Contains, &["contains "]),
    (FilterOp::DateStartsWith, &["datestartswith "]),
];

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Split a filter query into clauses and parse each one.
///
/// Clauses without a recognised operator come back as `None` so callers can
/// skip them.
pub fn parse_query(query: &str) -> Vec<Option<Predicate>> {
    if query.trim().is_empty() {
        return Vec::new();
    }
    query.split(CLAUSE_SEPARATOR).map(parse_clause).collect()
}

/// Parse a single clause such as `{Metric} ge 10`.
pub fn parse_clause(clause: &str) -> Option<Predicate> {
    for (op, tokens) in OPERATOR_TOKENS {
        for token in tokens.iter() {
            if let Some((name_part, value_part)) = clause.split_once(token) {
                return Some(Predicate {
                    column: column_name(name_part),
                    op: *op,
                    value: parse_value(value_part),
                });
            }
        }
    }
    None
}

fn column_name(name_part: &str) -> String {
    match (name_part.find('{'), name_part.rfind('}')) {
        (Some(open), Some(close)) if open < close => name_part[open + 1..close].to_string(),
        _ => name_part.trim().to_string(),
    }
}

fn parse_value(value_part: &str) -> FilterValue {
    let raw = value_part.trim();
    if let (Some(first), Some(last)) = (raw.chars().next(), raw.chars().last()) {
        if first == last && QUOTES.contains(&first) {
            // Quotes are ASCII, so byte offsets are char boundaries.
            let inner = if raw.len() >= 2 { &raw[1..raw.len() - 1] } else { "" };
            return FilterValue::Text(inner.replace(&format!("\\{first}"), &first.to_string()));
        }
    }
    match raw.parse::<f64>() {
        Ok(n) => FilterValue::Number(n),
        Err(_) => FilterValue::Text(raw.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Filter cells → query string
// ---------------------------------------------------------------------------

// Operators a user may type at the start of a filter cell. Longer symbols first.
const CELL_PREFIXES: &[(&str, FilterOp)] = &[
    (">=", FilterOp::Ge),
    ("<=", FilterOp::Le),
    ("!=", FilterOp::Ne),
    ("<", FilterOp::Lt),
    (">", FilterOp::Gt),
    ("=", FilterOp::Eq),
    ("ge ", FilterOp::Ge),
    ("le ", FilterOp::Le),
    ("lt ", FilterOp::Lt),
    ("gt ", FilterOp::Gt),
    ("ne ", FilterOp::Ne),
    ("eq ", FilterOp::Eq),
    ("contains ", FilterOp::Contains),
    ("datestartswith ", FilterOp::DateStartsWith),
];

/// Filter cell text that has no faithful single-clause spelling, e.g. a value
/// holding an operator token (`Stage 1`, `a=b`) or the clause separator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("filter '{input}' on {column} cannot be expressed as one clause and is ignored")]
pub struct CellError {
    pub column: &'static str,
    pub input: String,
}

/// Turn the text of one column's filter cell into a query clause.
///
/// `"> 10"` on `Metric` becomes `{Metric} gt 10`; a bare value uses the
/// column's default operator (`eq` for numbers, `contains` for text,
/// `datestartswith` for timestamps). Empty cells produce no clause. The clause
/// is parsed back, and text that would not read back as the same predicate is
/// an error.
pub fn check_cell(column: Column, input: &str) -> Result<Option<String>, CellError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }

    let (op, rest) = CELL_PREFIXES
        .iter()
        .find_map(|(prefix, op)| input.strip_prefix(prefix).map(|rest| (*op, rest)))
        .unwrap_or_else(|| (default_op(column), input));

    let rest = rest.trim();
    if rest.is_empty() {
        return Ok(None);
    }

    let comparison = !matches!(op, FilterOp::Contains | FilterOp::DateStartsWith);
    let value = if comparison && rest.parse::<f64>().is_ok() {
        rest.to_string()
    } else {
        quote_if_needed(rest)
    };

    let clause = format!("{{{}}} {} {}", column.display_name(), op, value);
    let intended = Predicate {
        column: column.display_name().to_string(),
        op,
        value: parse_value(&value),
    };
    match parse_query(&clause).as_slice() {
        [Some(parsed)] if *parsed == intended => Ok(Some(clause)),
        _ => Err(CellError {
            column: column.display_name(),
            input: input.to_string(),
        }),
    }
}

/// Like [`check_cell`], with rejected cells contributing no clause.
pub fn clause_for_cell(column: Column, input: &str) -> Option<String> {
    check_cell(column, input).ok().flatten()
}

/// Join the clauses of every non-empty filter cell.
pub fn build_query<'a, I>(cells: I) -> String
where
    I: IntoIterator<Item = (Column, &'a str)>,
{
    cells
        .into_iter()
        .filter_map(|(column, input)| clause_for_cell(column, input))
        .collect::<Vec<_>>()
        .join(CLAUSE_SEPARATOR)
}

fn default_op(column: Column) -> FilterOp {
    match column.kind() {
        ColumnKind::Numeric => FilterOp::Eq,
        ColumnKind::Text => FilterOp::Contains,
        ColumnKind::Timestamp => FilterOp::DateStartsWith,
    }
}

fn quote_if_needed(value: &str) -> String {
    let already_quoted = match (value.chars().next(), value.chars().last()) {
        (Some(first), Some(last)) => value.len() >= 2 && first == last && QUOTES.contains(&first),
        _ => false,
    };
    if already_quoted {
        return value.to_string();
    }
    let needs_quotes = value.chars().any(|c| c.is_whitespace() || QUOTES.contains(&c))
        || value.contains("&&");
    if needs_quotes {
        format!("\"{}\"", value.replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pred(column: &str, op: FilterOp, value: FilterValue) -> Option<Predicate> {
        Some(Predicate {
            column: column.into(),
            op,
            value,
        })
    }

    #[test]
    fn parses_numeric_clause() {
        assert_eq!(
            parse_clause("{Metric} ge 10"),
            pred("Metric", FilterOp::Ge, FilterValue::Number(10.0))
        );
    }

    #[test]
    fn parses_word_operator_with_text_value() {
        assert_eq!(
            parse_clause("{Table} contains B"),
            pred("Table", FilterOp::Contains, FilterValue::Text("B".into()))
        );
        assert_eq!(
            parse_clause("{Inserted} datestartswith 2023-01-02"),
            pred(
                "Inserted",
                FilterOp::DateStartsWith,
                FilterValue::Text("2023-01-02".into())
            )
        );
    }

    #[test]
    fn strips_quotes_and_unescapes() {
        assert_eq!(
            parse_clause("{Status} eq 'used'"),
            pred("Status", FilterOp::Eq, FilterValue::Text("used".into()))
        );
        assert_eq!(
            parse_clause(r#"{Table} eq "say \"hi\"""#),
            pred("Table", FilterOp::Eq, FilterValue::Text(r#"say "hi""#.into()))
        );
        // Quoted numbers stay text.
        assert_eq!(
            parse_clause("{Table} eq `42`"),
            pred("Table", FilterOp::Eq, FilterValue::Text("42".into()))
        );
    }

    #[test]
    fn symbol_operators_map_to_words() {
        assert_eq!(
            parse_clause("{Metric} >= 3"),
            pred("Metric", FilterOp::Ge, FilterValue::Number(3.0))
        );
        assert_eq!(
            parse_clause("{Metric} <= 3"),
            pred("Metric", FilterOp::Le, FilterValue::Number(3.0))
        );
        assert_eq!(
            parse_clause("{Metric} != 3"),
            pred("Metric", FilterOp::Ne, FilterValue::Number(3.0))
        );
        assert_eq!(
            parse_clause("{PID} = 7"),
            pred("PID", FilterOp::Eq, FilterValue::Number(7.0))
        );
    }

    #[test]
    fn malformed_clauses_parse_to_none() {
        assert_eq!(parse_clause("{Metric} about 10"), None);
        assert_eq!(parse_clause(""), None);
        assert!(parse_query("").is_empty());
        assert_eq!(parse_query("{Metric} ge 1 && junk"), vec![
            pred("Metric", FilterOp::Ge, FilterValue::Number(1.0)),
            None,
        ]);
    }

    #[test]
    fn empty_value_is_empty_text() {
        assert_eq!(
            parse_clause("{Table} eq "),
            pred("Table", FilterOp::Eq, FilterValue::Text(String::new()))
        );
        assert_eq!(
            parse_clause("{Table} eq '"),
            pred("Table", FilterOp::Eq, FilterValue::Text(String::new()))
        );
    }

    #[test]
    fn splits_conjunctions() {
        let parsed = parse_query("{Metric} ge 10 && {Metric} le 40");
        assert_eq!(parsed, vec![
            pred("Metric", FilterOp::Ge, FilterValue::Number(10.0)),
            pred("Metric", FilterOp::Le, FilterValue::Number(40.0)),
        ]);
    }

    #[test]
    fn cell_input_becomes_clause() {
        assert_eq!(clause_for_cell(Column::Metric, "> 10").as_deref(), Some("{Metric} gt 10"));
        assert_eq!(clause_for_cell(Column::Metric, "12.5").as_deref(), Some("{Metric} eq 12.5"));
        assert_eq!(clause_for_cell(Column::TableName, "B").as_deref(), Some("{Table} contains B"));
        assert_eq!(
            clause_for_cell(Column::InsertedAt, "2023-01-02").as_deref(),
            Some("{Inserted} datestartswith 2023-01-02")
        );
        assert_eq!(clause_for_cell(Column::Status, "= used").as_deref(), Some("{Status} eq used"));
        assert_eq!(clause_for_cell(Column::Metric, "  "), None);
        assert_eq!(clause_for_cell(Column::Metric, ">="), None);
    }

    #[test]
    fn cell_values_with_spaces_are_quoted() {
        let clause = clause_for_cell(Column::TableName, r#"x "2" y"#).unwrap();
        assert_eq!(clause, r#"{Table} contains "x \"2\" y""#);
        assert_eq!(
            parse_clause(&clause),
            pred("Table", FilterOp::Contains, FilterValue::Text(r#"x "2" y"#.into()))
        );
    }

    #[test]
    fn cells_that_read_back_differently_are_rejected() {
        for input in ["Stage 1", "a=b", "x && y", "lot <3>"] {
            let err = check_cell(Column::TableName, input).unwrap_err();
            assert_eq!(err.column, "Table");
            assert_eq!(err.input, input);
            assert_eq!(clause_for_cell(Column::TableName, input), None);
        }
        assert_eq!(
            build_query([(Column::TableName, "Stage 1"), (Column::Metric, "> 4")]),
            "{Metric} gt 4"
        );
    }

    #[test]
    fn accepted_cells_parse_back_to_their_predicate() {
        let cases = [
            (Column::TableName, "B 7", FilterOp::Contains, FilterValue::Text("B 7".into())),
            (Column::Metric, "<= 2.5", FilterOp::Le, FilterValue::Number(2.5)),
            (Column::Status, "!= ignore", FilterOp::Ne, FilterValue::Text("ignore".into())),
            (
                Column::InsertedAt,
                "2023-01-01 05",
                FilterOp::DateStartsWith,
                FilterValue::Text("2023-01-01 05".into()),
            ),
        ];
        for (column, input, op, value) in cases {
            let clause = check_cell(column, input).unwrap().unwrap();
            assert_eq!(
                parse_query(&clause),
                vec![pred(column.display_name(), op, value)],
                "{clause}"
            );
        }
    }

    #[test]
    fn build_query_skips_empty_cells() {
        let query = build_query([
            (Column::Id, ""),
            (Column::Metric, ">= 10"),
            (Column::Status, "used"),
        ]);
        assert_eq!(query, "{Metric} ge 10 && {Status} contains used");
    }
}
