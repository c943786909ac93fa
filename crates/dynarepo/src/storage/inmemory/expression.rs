//! Filter expression evaluation for the in-memory store.
//!
//! Parses the store's condition language (the subset the expression builder
//! emits, plus comparisons and `not`) and evaluates it against items.
//! Precedence, lowest first: `or`, `and`, `not`. Keywords are
//! case-insensitive. Placeholders are resolved while parsing, so an unbound
//! or unused placeholder rejects the whole filter.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::iter::Peekable;
use std::str::CharIndices;

use dynarepo_core::expression::FilterSpecification;
use dynarepo_core::storage::{FieldValue, Item};

use super::error::ExpressionError;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Comma,
    Comparator(Comparator),
    Word(String),
    ValueRef(String),
    NameRef(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Comparator {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operand {
    Path(Vec<String>),
    Literal(FieldValue),
}

/// A parsed filter, ready to be evaluated against items.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Condition {
    Or(Box<Condition>, Box<Condition>),
    And(Box<Condition>, Box<Condition>),
    Not(Box<Condition>),
    Compare(Operand, Comparator, Operand),
    Between(Operand, Operand, Operand),
    In(Operand, Vec<Operand>),
    Contains(Operand, Operand),
    BeginsWith(Operand, Operand),
    AttributeExists(Vec<String>),
    AttributeNotExists(Vec<String>),
}

impl Condition {
    /// Parses a filter specification, resolving every placeholder.
    pub fn parse(filter: &FilterSpecification) -> Result<Self, ExpressionError> {
        let length = filter.expression().len();
        if length > MAX_EXPRESSION_LENGTH {
            return Err(ExpressionError::TooLong {
                length,
                max: MAX_EXPRESSION_LENGTH,
            });
        }

        let tokens = tokenize(filter.expression())?;
        if tokens.is_empty() {
            return Err(ExpressionError::Empty);
        }

        let mut parser = Parser {
            tokens,
            position: 0,
            depth: 0,
            filter,
            used_values: HashSet::new(),
            used_names: HashSet::new(),
        };
        let condition = parser.parse_or()?;
        if let Some(token) = parser.peek() {
            return Err(ExpressionError::UnexpectedToken(describe(token)));
        }
        parser.check_all_used()?;
        Ok(condition)
    }

    /// Evaluates the condition against one item.
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Self::Or(left, right) => left.matches(item) || right.matches(item),
            Self::And(left, right) => left.matches(item) && right.matches(item),
            Self::Not(inner) => !inner.matches(item),
            Self::Compare(left, comparator, right) => {
                match (resolve(left, item), resolve(right, item)) {
                    (Some(left), Some(right)) => compare(&left, *comparator, &right),
                    _ => false,
                }
            }
            Self::Between(operand, low, high) => {
                match (resolve(operand, item), resolve(low, item), resolve(high, item)) {
                    (Some(value), Some(low), Some(high)) => {
                        compare(&value, Comparator::Ge, &low)
                            && compare(&value, Comparator::Le, &high)
                    }
                    _ => false,
                }
            }
            Self::In(operand, candidates) => match resolve(operand, item) {
                Some(value) => candidates
                    .iter()
                    .filter_map(|candidate| resolve(candidate, item))
                    .any(|candidate| value.matches(&candidate)),
                None => false,
            },
            Self::Contains(haystack, needle) => {
                match (resolve(haystack, item), resolve(needle, item)) {
                    (Some(haystack), Some(needle)) => contains(&haystack, &needle),
                    _ => false,
                }
            }
            Self::BeginsWith(value, prefix) => match (resolve(value, item), resolve(prefix, item)) {
                (Some(FieldValue::S(value)), Some(FieldValue::S(prefix))) => {
                    value.starts_with(prefix.as_str())
                }
                (Some(FieldValue::B(value)), Some(FieldValue::B(prefix))) => {
                    value.starts_with(&prefix)
                }
                _ => false,
            },
            Self::AttributeExists(path) => lookup(path, item).is_some(),
            Self::AttributeNotExists(path) => lookup(path, item).is_none(),
        }
    }
}

fn compare(left: &FieldValue, comparator: Comparator, right: &FieldValue) -> bool {
    match comparator {
        Comparator::Eq => left.matches(right),
        Comparator::Ne => !left.matches(right),
        Comparator::Lt => left.compare(right) == Some(Ordering::Less),
        Comparator::Le => matches!(
            left.compare(right),
            Some(Ordering::Less | Ordering::Equal)
        ),
        Comparator::Gt => left.compare(right) == Some(Ordering::Greater),
        Comparator::Ge => matches!(
            left.compare(right),
            Some(Ordering::Greater | Ordering::Equal)
        ),
    }
}

fn contains(haystack: &FieldValue, needle: &FieldValue) -> bool {
    match (haystack, needle) {
        (FieldValue::S(haystack), FieldValue::S(needle)) => haystack.contains(needle.as_str()),
        (FieldValue::B(haystack), FieldValue::B(needle)) => {
            needle.is_empty() || haystack.windows(needle.len()).any(|w| w == needle.as_slice())
        }
        (FieldValue::Ss(set), FieldValue::S(needle)) => set.contains(needle),
        (FieldValue::Ns(set), needle @ FieldValue::N(_)) => set
            .iter()
            .any(|n| FieldValue::N(n.clone()).matches(needle)),
        (FieldValue::Bs(set), FieldValue::B(needle)) => set.contains(needle),
        (FieldValue::L(list), needle) => list.iter().any(|element| element.matches(needle)),
        _ => false,
    }
}

fn resolve(operand: &Operand, item: &Item) -> Option<FieldValue> {
    match operand {
        Operand::Literal(value) => Some(value.clone()),
        Operand::Path(path) => lookup(path, item).cloned(),
    }
}

fn lookup<'a>(path: &[String], item: &'a Item) -> Option<&'a FieldValue> {
    let (first, rest) = path.split_first()?;
    let mut current = item.get(first)?;
    for segment in rest {
        current = match current {
            FieldValue::M(map) => map.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn describe(token: &Token) -> String {
    match token {
        Token::LParen => "(".to_string(),
        Token::RParen => ")".to_string(),
        Token::Comma => ",".to_string(),
        Token::Comparator(comparator) => format!("{comparator:?}"),
        Token::Word(word) | Token::ValueRef(word) | Token::NameRef(word) => word.clone(),
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '.' || c == '-'
}

fn is_placeholder_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn read_word(
    first: char,
    chars: &mut Peekable<CharIndices<'_>>,
    accept: fn(char) -> bool,
) -> String {
    let mut word = String::from(first);
    while let Some(&(_, c)) = chars.peek() {
        if !accept(c) {
            break;
        }
        word.push(c);
        chars.next();
    }
    word
}

fn tokenize(expression: &str) -> Result<Vec<Token>, ExpressionError> {
    let mut tokens = Vec::new();
    let mut chars = expression.char_indices().peekable();

    while let Some((position, c)) = chars.next() {
        let token = match c {
            c if c.is_whitespace() => continue,
            '(' => Token::LParen,
            ')' => Token::RParen,
            ',' => Token::Comma,
            '=' => Token::Comparator(Comparator::Eq),
            '<' => match chars.peek() {
                Some(&(_, '>')) => {
                    chars.next();
                    Token::Comparator(Comparator::Ne)
                }
                Some(&(_, '=')) => {
                    chars.next();
                    Token::Comparator(Comparator::Le)
                }
                _ => Token::Comparator(Comparator::Lt),
            },
            '>' => match chars.peek() {
                Some(&(_, '=')) => {
                    chars.next();
                    Token::Comparator(Comparator::Ge)
                }
                _ => Token::Comparator(Comparator::Gt),
            },
            ':' => Token::ValueRef(read_word(':', &mut chars, is_placeholder_char)),
            '#' => Token::NameRef(read_word('#', &mut chars, is_placeholder_char)),
            c if is_word_char(c) => Token::Word(read_word(c, &mut chars, is_word_char)),
            other => {
                return Err(ExpressionError::UnexpectedCharacter {
                    character: other,
                    position,
                })
            }
        };
        tokens.push(token);
    }

    Ok(tokens)
}

const KEYWORDS: [&str; 5] = ["and", "or", "not", "between", "in"];

/// Byte limit DynamoDB applies to a filter expression.
const MAX_EXPRESSION_LENGTH: usize = 4096;

/// Maximum nesting of `not` and parentheses.
const MAX_NESTING_DEPTH: usize = 64;

struct Parser<'a> {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
    filter: &'a FilterSpecification,
    used_values: HashSet<String>,
    used_names: HashSet<String>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.position + offset)
    }

    fn next(&mut self) -> Result<Token, ExpressionError> {
        let token = self
            .tokens
            .get(self.position)
            .cloned()
            .ok_or(ExpressionError::UnexpectedEnd)?;
        self.position += 1;
        Ok(token)
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek(), Some(Token::Word(word)) if word.eq_ignore_ascii_case(keyword))
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExpressionError> {
        let token = self.next()?;
        if token == expected {
            Ok(())
        } else {
            Err(ExpressionError::UnexpectedToken(describe(&token)))
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<(), ExpressionError> {
        if self.peek_keyword(keyword) {
            self.position += 1;
            return Ok(());
        }
        match self.peek() {
            Some(token) => Err(ExpressionError::UnexpectedToken(describe(token))),
            None => Err(ExpressionError::UnexpectedEnd),
        }
    }

    fn parse_or(&mut self) -> Result<Condition, ExpressionError> {
        let mut left = self.parse_and()?;
        while self.peek_keyword("or") {
            self.position += 1;
            let right = self.parse_and()?;
            left = Condition::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Condition, ExpressionError> {
        let mut left = self.parse_not()?;
        while self.peek_keyword("and") {
            self.position += 1;
            let right = self.parse_not()?;
            left = Condition::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn descend(&mut self) -> Result<(), ExpressionError> {
        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            return Err(ExpressionError::TooDeep(MAX_NESTING_DEPTH));
        }
        Ok(())
    }

    fn parse_not(&mut self) -> Result<Condition, ExpressionError> {
        if self.peek_keyword("not") {
            self.position += 1;
            self.descend()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(Condition::Not(Box::new(inner)));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Condition, ExpressionError> {
        if self.peek() == Some(&Token::LParen) {
            self.position += 1;
            self.descend()?;
            let inner = self.parse_or()?;
            self.expect(Token::RParen)?;
            self.depth -= 1;
            return Ok(inner);
        }

        if let (Some(Token::Word(word)), Some(Token::LParen)) = (self.peek(), self.peek_at(1)) {
            let function = word.to_ascii_lowercase();
            self.position += 2;
            return self.parse_function(&function);
        }

        let left = self.parse_operand()?;
        match self.next()? {
            Token::Comparator(comparator) => {
                let right = self.parse_operand()?;
                Ok(Condition::Compare(left, comparator, right))
            }
            Token::Word(word) if word.eq_ignore_ascii_case("between") => {
                let low = self.parse_operand()?;
                self.expect_keyword("and")?;
                let high = self.parse_operand()?;
                Ok(Condition::Between(left, low, high))
            }
            Token::Word(word) if word.eq_ignore_ascii_case("in") => {
                self.expect(Token::LParen)?;
                let mut candidates = vec![self.parse_operand()?];
                while self.peek() == Some(&Token::Comma) {
                    self.position += 1;
                    candidates.push(self.parse_operand()?);
                }
                self.expect(Token::RParen)?;
                Ok(Condition::In(left, candidates))
            }
            token => Err(ExpressionError::UnexpectedToken(describe(&token))),
        }
    }

    /// Parses the arguments of `function`, whose name and `(` are consumed.
    fn parse_function(&mut self, function: &str) -> Result<Condition, ExpressionError> {
        let condition = match function {
            "contains" | "begins_with" => {
                let first = self.parse_operand()?;
                self.expect(Token::Comma)?;
                let second = self.parse_operand()?;
                if function == "contains" {
                    Condition::Contains(first, second)
                } else {
                    Condition::BeginsWith(first, second)
                }
            }
            "attribute_exists" => Condition::AttributeExists(self.parse_path()?),
            "attribute_not_exists" => Condition::AttributeNotExists(self.parse_path()?),
            other => return Err(ExpressionError::UnknownFunction(other.to_string())),
        };
        self.expect(Token::RParen)?;
        Ok(condition)
    }

    fn parse_path(&mut self) -> Result<Vec<String>, ExpressionError> {
        match self.parse_operand()? {
            Operand::Path(path) => Ok(path),
            Operand::Literal(_) => Err(ExpressionError::InvalidOperand(
                "attribute functions take an attribute path".to_string(),
            )),
        }
    }

    fn parse_operand(&mut self) -> Result<Operand, ExpressionError> {
        match self.next()? {
            Token::ValueRef(placeholder) => {
                let value = self
                    .filter
                    .value(&placeholder)
                    .cloned()
                    .ok_or_else(|| ExpressionError::UnboundValue(placeholder.clone()))?;
                self.used_values.insert(placeholder);
                Ok(Operand::Literal(value))
            }
            Token::NameRef(placeholder) => {
                let name = self
                    .filter
                    .name(&placeholder)
                    .ok_or_else(|| ExpressionError::UnboundName(placeholder.clone()))?
                    .to_string();
                self.used_names.insert(placeholder);
                Ok(Operand::Path(vec![name]))
            }
            Token::Word(word)
                if !KEYWORDS
                    .iter()
                    .any(|keyword| word.eq_ignore_ascii_case(keyword)) =>
            {
                Ok(Operand::Path(word.split('.').map(str::to_string).collect()))
            }
            token => Err(ExpressionError::UnexpectedToken(describe(&token))),
        }
    }

    fn check_all_used(&self) -> Result<(), ExpressionError> {
        let mut unused_values: Vec<&String> = self
            .filter
            .values()
            .keys()
            .filter(|placeholder| !self.used_values.contains(*placeholder))
            .collect();
        unused_values.sort();
        if let Some(placeholder) = unused_values.first() {
            return Err(ExpressionError::UnusedValue((*placeholder).clone()));
        }

        let mut unused_names: Vec<&String> = self
            .filter
            .names()
            .keys()
            .filter(|placeholder| !self.used_names.contains(*placeholder))
            .collect();
        unused_names.sort();
        if let Some(placeholder) = unused_names.first() {
            return Err(ExpressionError::UnusedName((*placeholder).clone()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use dynarepo_core::expression::FilterExpressionBuilder;

    use super::*;

    fn fruit(value: &str) -> Item {
        Item::from([
            ("id".to_string(), FieldValue::from(value)),
            ("value".to_string(), FieldValue::from(value)),
        ])
    }

    fn spec(expression: &str, values: &[(&str, FieldValue)]) -> FilterSpecification {
        FilterSpecification::new(
            expression,
            values
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<HashMap<_, _>>(),
        )
    }

    #[test]
    fn test_builder_output_parses() {
        let filter = FilterExpressionBuilder::new()
            .contains("value", ":f0")
            .or()
            .in_list("value", [":f1", ":f2"])
            .or()
            .begins_with("value", ":f3")
            .build_filter_specification([
                (":f0", FieldValue::from("tomato")),
                (":f1", FieldValue::from("jackfruit")),
                (":f2", FieldValue::from("avocado")),
                (":f3", FieldValue::from("drago")),
            ]);

        let condition = Condition::parse(&filter).unwrap();

        assert!(condition.matches(&fruit("tomato")));
        assert!(condition.matches(&fruit("avocado")));
        assert!(condition.matches(&fruit("dragon fruit")));
        assert!(!condition.matches(&fruit("mango")));
        assert!(!condition.matches(&fruit("other fruit")));
    }

    #[test]
    fn test_and_binds_tighter_than_or() {
        // true or (false and false) => true
        let filter = spec(
            "attribute_exists(id) or attribute_exists(a) and attribute_exists(b)",
            &[],
        );
        let condition = Condition::parse(&filter).unwrap();
        assert!(condition.matches(&fruit("mango")));
    }

    #[test]
    fn test_not_and_parentheses() {
        let filter = spec(
            "not (value = :a or value = :b)",
            &[(":a", FieldValue::from("mango")), (":b", FieldValue::from("kiwi"))],
        );
        let condition = Condition::parse(&filter).unwrap();
        assert!(!condition.matches(&fruit("mango")));
        assert!(condition.matches(&fruit("tomato")));
    }

    #[test]
    fn test_between_numbers() {
        let filter = FilterExpressionBuilder::new()
            .between("weight", ":lo", ":hi")
            .build_filter_specification([
                (":lo", FieldValue::number(100)),
                (":hi", FieldValue::number(200)),
            ]);
        let condition = Condition::parse(&filter).unwrap();

        let mut item = fruit("mango");
        item.insert("weight".to_string(), FieldValue::number(150));
        assert!(condition.matches(&item));

        item.insert("weight".to_string(), FieldValue::number(200));
        assert!(condition.matches(&item));

        item.insert("weight".to_string(), FieldValue::number(1000));
        assert!(!condition.matches(&item));
    }

    #[test]
    fn test_comparators() {
        let values = [(":n", FieldValue::number(10))];
        let mut item = fruit("mango");
        item.insert("weight".to_string(), FieldValue::number(9));

        let cases = [
            ("weight < :n", true),
            ("weight <= :n", true),
            ("weight > :n", false),
            ("weight >= :n", false),
            ("weight = :n", false),
            ("weight <> :n", true),
        ];
        for (expression, expected) in cases {
            let condition = Condition::parse(&spec(expression, &values)).unwrap();
            assert_eq!(condition.matches(&item), expected, "{expression}");
        }
    }

    #[test]
    fn test_missing_attribute_never_compares() {
        let filter = spec("color <> :c", &[(":c", FieldValue::from("red"))]);
        let condition = Condition::parse(&filter).unwrap();
        assert!(!condition.matches(&fruit("mango")));
    }

    #[test]
    fn test_contains_on_sets_and_lists() {
        let filter = spec("contains(tags, :t)", &[(":t", FieldValue::from("sweet"))]);
        let condition = Condition::parse(&filter).unwrap();

        let mut item = fruit("mango");
        item.insert(
            "tags".to_string(),
            FieldValue::Ss(vec!["sweet".to_string(), "tropical".to_string()]),
        );
        assert!(condition.matches(&item));

        item.insert(
            "tags".to_string(),
            FieldValue::L(vec![FieldValue::from("sour")]),
        );
        assert!(!condition.matches(&item));
    }

    #[test]
    fn test_name_placeholder_resolves_attribute() {
        let filter = spec("#value = :v", &[(":v", FieldValue::from("kiwi"))])
            .with_name("#value", "value");
        let condition = Condition::parse(&filter).unwrap();
        assert!(condition.matches(&fruit("kiwi")));
        assert!(!condition.matches(&fruit("mango")));
    }

    #[test]
    fn test_nested_path_lookup() {
        let mut item = fruit("mango");
        item.insert(
            "origin".to_string(),
            FieldValue::M(HashMap::from([(
                "country".to_string(),
                FieldValue::from("BR"),
            )])),
        );

        let filter = spec("origin.country = :c", &[(":c", FieldValue::from("BR"))]);
        assert!(Condition::parse(&filter).unwrap().matches(&item));

        let filter = spec("attribute_exists(value.country)", &[]);
        assert!(!Condition::parse(&filter).unwrap().matches(&item));
    }

    #[test]
    fn test_keywords_case_insensitive() {
        let filter = spec(
            "value IN (:a) OR value BETWEEN :a AND :a",
            &[(":a", FieldValue::from("kiwi"))],
        );
        let condition = Condition::parse(&filter).unwrap();
        assert!(condition.matches(&fruit("kiwi")));
    }

    #[test]
    fn test_missing_connective_is_rejected() {
        let filter = FilterExpressionBuilder::new()
            .attribute_exists("a")
            .attribute_exists("b")
            .build_filter_specification(Vec::<(String, FieldValue)>::new());

        let err = Condition::parse(&filter).unwrap_err();
        assert_eq!(err, ExpressionError::UnexpectedToken("(".to_string()));
    }

    #[test]
    fn test_unbound_placeholder_is_rejected() {
        let filter = spec("contains(value, :missing)", &[]);
        assert_eq!(
            Condition::parse(&filter).unwrap_err(),
            ExpressionError::UnboundValue(":missing".to_string())
        );

        let filter = spec("#v = :v", &[(":v", FieldValue::from("x"))]);
        assert_eq!(
            Condition::parse(&filter).unwrap_err(),
            ExpressionError::UnboundName("#v".to_string())
        );
    }

    #[test]
    fn test_unused_placeholder_is_rejected() {
        let filter = spec(
            "value = :a",
            &[(":a", FieldValue::from("x")), (":b", FieldValue::from("y"))],
        );
        assert_eq!(
            Condition::parse(&filter).unwrap_err(),
            ExpressionError::UnusedValue(":b".to_string())
        );
    }

    #[test]
    fn test_malformed_expressions() {
        assert_eq!(
            Condition::parse(&spec("", &[])).unwrap_err(),
            ExpressionError::Empty
        );
        assert_eq!(
            Condition::parse(&spec("value between", &[])).unwrap_err(),
            ExpressionError::UnexpectedEnd
        );
        assert_eq!(
            Condition::parse(&spec("size(value) = value", &[])).unwrap_err(),
            ExpressionError::UnknownFunction("size".to_string())
        );
        assert!(matches!(
            Condition::parse(&spec("value ; value", &[])).unwrap_err(),
            ExpressionError::UnexpectedCharacter { character: ';', .. }
        ));
        assert!(matches!(
            Condition::parse(&spec("attribute_exists(:v)", &[(":v", FieldValue::Null)]))
                .unwrap_err(),
            ExpressionError::InvalidOperand(_)
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let nested_not = format!("{}attribute_exists(id)", "not ".repeat(1_000));
        assert_eq!(
            Condition::parse(&spec(&nested_not, &[])).unwrap_err(),
            ExpressionError::TooDeep(MAX_NESTING_DEPTH)
        );

        let unclosed = format!("{}attribute_exists(id)", "( ".repeat(1_000));
        assert_eq!(
            Condition::parse(&spec(&unclosed, &[])).unwrap_err(),
            ExpressionError::TooDeep(MAX_NESTING_DEPTH)
        );

        let shallow = format!(
            "{}attribute_exists(id){}",
            "not (".repeat(10),
            ")".repeat(10)
        );
        let condition = Condition::parse(&spec(&shallow, &[])).unwrap();
        assert!(condition.matches(&fruit("mango")));
    }

    #[test]
    fn test_expression_length_limit() {
        let long = format!("attribute_exists({})", "a".repeat(MAX_EXPRESSION_LENGTH));
        assert!(matches!(
            Condition::parse(&spec(&long, &[])).unwrap_err(),
            ExpressionError::TooLong { max: MAX_EXPRESSION_LENGTH, .. }
        ));
    }
}
