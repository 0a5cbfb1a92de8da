/*!
# Query Parser

Recursive descent parser for the fleetql query language. The parser converts
query text into the [`Query`] AST consumed by the validator and the execution
engine.

## Grammar Overview

```sql
[SELECT] [DISTINCT] field_list FROM resource [alias]
[(INNER|LEFT|RIGHT) JOIN resource [alias] ON field = field (AND field = field)*]...
[WHERE condition]
[GROUP BY field_list]
[HAVING condition]
[ORDER BY field [ASC|DESC], ...]
[LIMIT n [OFFSET n]]
```

Field list entries are plain names or aggregates in three syntaxes:
`COUNT(*) AS total`, `COUNT.status AS total`, and bare `COUNT AS total`.
Conditions combine with `AND`/`OR` (OR binds loosest) and use the operators
`= != > < >= <= LIKE NOT LIKE IN NOT IN` or their shell-safe word synonyms
`EQ NE GT GE LT LE`. `IN` accepts a parenthesized literal list or a nested
query (`owner IN (name FROM deployment)`).

## Architecture

Parsing is a two-phase process, the conventional shape for this kind of
engine:

1. **Tokenization**: query text becomes a stream of [`Token`]s with position
   information. Keywords are matched case-insensitively; identifiers keep
   their case and may contain `.`, `-`, `/`, `:`, and `%` so that dotted
   sub-fields (`labels.app`), hyphenated names (`cluster-ip`), and LIKE
   patterns (`nginx-%`) lex as single words.
2. **Parsing**: a cursor walks the tokens with one rule per clause.

Identical input text always produces a structurally identical AST; the parser
holds no state across calls.
*/

use crate::fleetql::sql::ast::*;
use crate::fleetql::sql::error::{SqlError, SqlResult};
use std::collections::HashMap;

/// Token types recognized by the lexer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenType {
    // Keywords
    Select,
    Distinct,
    From,
    Where,
    Group,
    By,
    Having,
    Order,
    Asc,
    Desc,
    Limit,
    Offset,
    Inner,
    Left,
    Right,
    Join,
    On,
    And,
    Or,
    As,
    Like,
    In,
    Not,

    // Literals and identifiers
    Identifier,
    Number,
    String,

    // Punctuation and operators
    LeftParen,
    RightParen,
    Comma,
    Asterisk,
    Equal,
    NotEqual,
    LessThan,
    GreaterThan,
    LessThanOrEqual,
    GreaterThanOrEqual,

    Eof,
}

/// A token with its type, original text, and position for error reporting.
#[derive(Debug, Clone)]
pub struct Token {
    pub token_type: TokenType,
    pub value: String,
    pub position: usize,
}

/// Parser for fleetql query text.
///
/// Construction builds the keyword table once; [`QueryParser::parse`] can
/// then be called any number of times.
#[derive(Debug, Clone)]
pub struct QueryParser {
    keywords: HashMap<&'static str, TokenType>,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryParser {
    pub fn new() -> Self {
        let mut keywords = HashMap::new();
        keywords.insert("SELECT", TokenType::Select);
        keywords.insert("DISTINCT", TokenType::Distinct);
        keywords.insert("FROM", TokenType::From);
        keywords.insert("WHERE", TokenType::Where);
        keywords.insert("GROUP", TokenType::Group);
        keywords.insert("BY", TokenType::By);
        keywords.insert("HAVING", TokenType::Having);
        keywords.insert("ORDER", TokenType::Order);
        keywords.insert("ASC", TokenType::Asc);
        keywords.insert("DESC", TokenType::Desc);
        keywords.insert("LIMIT", TokenType::Limit);
        keywords.insert("OFFSET", TokenType::Offset);
        keywords.insert("INNER", TokenType::Inner);
        keywords.insert("LEFT", TokenType::Left);
        keywords.insert("RIGHT", TokenType::Right);
        keywords.insert("JOIN", TokenType::Join);
        keywords.insert("ON", TokenType::On);
        keywords.insert("AND", TokenType::And);
        keywords.insert("OR", TokenType::Or);
        keywords.insert("AS", TokenType::As);
        keywords.insert("LIKE", TokenType::Like);
        keywords.insert("IN", TokenType::In);
        keywords.insert("NOT", TokenType::Not);
        QueryParser { keywords }
    }

    /// Parse query text into a [`Query`].
    pub fn parse(&self, text: &str) -> SqlResult<Query> {
        let tokens = self.tokenize(text)?;
        let mut cursor = TokenCursor::new(tokens);
        let query = cursor.parse_query()?;
        if cursor.current().token_type != TokenType::Eof {
            return Err(cursor.error(format!(
                "unexpected input after query: '{}'",
                cursor.current().value
            )));
        }
        Ok(query)
    }

    /// Parse a bare condition expression (the text of a WHERE or HAVING
    /// clause) into a [`ConditionGroup`].
    ///
    /// Empty input yields an empty AND group, which evaluates vacuously true.
    pub fn parse_conditions(&self, text: &str) -> SqlResult<ConditionGroup> {
        if text.trim().is_empty() {
            return Ok(ConditionGroup::empty());
        }
        let tokens = self.tokenize(text)?;
        let mut cursor = TokenCursor::new(tokens);
        let group = cursor.parse_condition_tree()?;
        if cursor.current().token_type != TokenType::Eof {
            return Err(cursor.error(format!(
                "unexpected input after condition: '{}'",
                cursor.current().value
            )));
        }
        Ok(group)
    }

    fn tokenize(&self, text: &str) -> SqlResult<Vec<Token>> {
        let mut tokens = Vec::new();
        let chars: Vec<char> = text.chars().collect();
        let mut pos = 0;

        while pos < chars.len() {
            let ch = chars[pos];
            match ch {
                ' ' | '\t' | '\n' | '\r' => {
                    pos += 1;
                }
                '(' => {
                    tokens.push(Token {
                        token_type: TokenType::LeftParen,
                        value: "(".to_string(),
                        position: pos,
                    });
                    pos += 1;
                }
                ')' => {
                    tokens.push(Token {
                        token_type: TokenType::RightParen,
                        value: ")".to_string(),
                        position: pos,
                    });
                    pos += 1;
                }
                ',' => {
                    tokens.push(Token {
                        token_type: TokenType::Comma,
                        value: ",".to_string(),
                        position: pos,
                    });
                    pos += 1;
                }
                '*' => {
                    tokens.push(Token {
                        token_type: TokenType::Asterisk,
                        value: "*".to_string(),
                        position: pos,
                    });
                    pos += 1;
                }
                '=' => {
                    tokens.push(Token {
                        token_type: TokenType::Equal,
                        value: "=".to_string(),
                        position: pos,
                    });
                    pos += 1;
                }
                '!' => {
                    if pos + 1 < chars.len() && chars[pos + 1] == '=' {
                        tokens.push(Token {
                            token_type: TokenType::NotEqual,
                            value: "!=".to_string(),
                            position: pos,
                        });
                        pos += 2;
                    } else {
                        return Err(SqlError::parse_error(
                            "expected '=' after '!'",
                            Some(pos),
                        ));
                    }
                }
                '<' => {
                    if pos + 1 < chars.len() && chars[pos + 1] == '=' {
                        tokens.push(Token {
                            token_type: TokenType::LessThanOrEqual,
                            value: "<=".to_string(),
                            position: pos,
                        });
                        pos += 2;
                    } else {
                        tokens.push(Token {
                            token_type: TokenType::LessThan,
                            value: "<".to_string(),
                            position: pos,
                        });
                        pos += 1;
                    }
                }
                '>' => {
                    if pos + 1 < chars.len() && chars[pos + 1] == '=' {
                        tokens.push(Token {
                            token_type: TokenType::GreaterThanOrEqual,
                            value: ">=".to_string(),
                            position: pos,
                        });
                        pos += 2;
                    } else {
                        tokens.push(Token {
                            token_type: TokenType::GreaterThan,
                            value: ">".to_string(),
                            position: pos,
                        });
                        pos += 1;
                    }
                }
                '\'' | '"' => {
                    let quote = ch;
                    let start = pos;
                    pos += 1;
                    let mut literal = String::new();
                    let mut closed = false;
                    while pos < chars.len() {
                        if chars[pos] == quote {
                            closed = true;
                            pos += 1;
                            break;
                        }
                        literal.push(chars[pos]);
                        pos += 1;
                    }
                    if !closed {
                        return Err(SqlError::parse_error(
                            "unterminated string literal",
                            Some(start),
                        ));
                    }
                    tokens.push(Token {
                        token_type: TokenType::String,
                        value: literal,
                        position: start,
                    });
                }
                c if c.is_alphanumeric() || c == '_' || c == '%' => {
                    let start = pos;
                    let mut word = String::new();
                    while pos < chars.len() {
                        let c = chars[pos];
                        if c.is_alphanumeric()
                            || matches!(c, '_' | '%' | '.' | '-' | '/' | ':')
                        {
                            word.push(c);
                            pos += 1;
                        } else {
                            break;
                        }
                    }
                    let token_type = if word.chars().all(|c| c.is_ascii_digit()) {
                        TokenType::Number
                    } else {
                        self.keywords
                            .get(word.to_ascii_uppercase().as_str())
                            .copied()
                            .unwrap_or(TokenType::Identifier)
                    };
                    tokens.push(Token {
                        token_type,
                        value: word,
                        position: start,
                    });
                }
                other => {
                    return Err(SqlError::parse_error(
                        format!("unexpected character '{}'", other),
                        Some(pos),
                    ));
                }
            }
        }

        tokens.push(Token {
            token_type: TokenType::Eof,
            value: String::new(),
            position: chars.len(),
        });
        Ok(tokens)
    }
}

/// Cursor over the token stream with the usual expect/advance helpers.
struct TokenCursor {
    tokens: Vec<Token>,
    position: usize,
}

impl TokenCursor {
    fn new(tokens: Vec<Token>) -> Self {
        TokenCursor {
            tokens,
            position: 0,
        }
    }

    fn current(&self) -> &Token {
        // tokenize always appends Eof, so the last token is a safe fallback
        self.tokens
            .get(self.position)
            .unwrap_or(&self.tokens[self.tokens.len() - 1])
    }

    fn advance(&mut self) {
        if self.position < self.tokens.len() - 1 {
            self.position += 1;
        }
    }

    fn error(&self, message: impl Into<String>) -> SqlError {
        SqlError::parse_error(message, Some(self.current().position))
    }

    fn expect(&mut self, expected: TokenType) -> SqlResult<Token> {
        let token = self.current().clone();
        if token.token_type != expected {
            return Err(self.error(format!(
                "expected {:?}, found '{}'",
                expected, token.value
            )));
        }
        self.advance();
        Ok(token)
    }

    /// Consume an identifier-shaped token (field, resource, or alias name).
    fn expect_name(&mut self, what: &str) -> SqlResult<String> {
        let token = self.current().clone();
        if token.token_type != TokenType::Identifier {
            return Err(self.error(format!("expected {}, found '{}'", what, token.value)));
        }
        self.advance();
        Ok(token.value)
    }

    /// Consume a literal operand: bare word, number, or quoted string.
    fn expect_literal(&mut self) -> SqlResult<String> {
        let token = self.current().clone();
        match token.token_type {
            TokenType::Identifier | TokenType::Number | TokenType::String => {
                self.advance();
                Ok(token.value)
            }
            _ => Err(self.error(format!("expected a value, found '{}'", token.value))),
        }
    }

    // ---- query ----

    fn parse_query(&mut self) -> SqlResult<Query> {
        let mut query = Query::default();

        // Optional leading pseudo-keyword: SELECT for SQL muscle memory, or
        // the tool's own name as pasted from a shell invocation
        match self.current().token_type {
            TokenType::Select => self.advance(),
            TokenType::Identifier if self.current().value.eq_ignore_ascii_case("fleetql") => {
                self.advance()
            }
            _ => {}
        }

        self.parse_select_fields(&mut query)?;
        self.expect(TokenType::From)?;

        query.resource = self.expect_name("resource name after FROM")?.to_lowercase();
        if self.current().token_type == TokenType::Identifier {
            query.resource_alias = Some(self.current().value.clone());
            self.advance();
        }

        while matches!(
            self.current().token_type,
            TokenType::Inner | TokenType::Left | TokenType::Right
        ) {
            let join = self.parse_join_clause()?;
            query.joins.push(join);
        }

        if self.current().token_type == TokenType::Where {
            self.advance();
            query.conditions = Some(self.parse_condition_tree()?);
        }

        if self.current().token_type == TokenType::Group {
            self.advance();
            self.expect(TokenType::By)?;
            loop {
                query.group_by.push(self.expect_name("GROUP BY field")?);
                if self.current().token_type == TokenType::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if self.current().token_type == TokenType::Having {
            self.advance();
            query.having = Some(self.parse_condition_tree()?);
        }

        if self.current().token_type == TokenType::Order {
            self.advance();
            self.expect(TokenType::By)?;
            loop {
                let field = self.expect_name("ORDER BY field")?;
                let mut descending = false;
                match self.current().token_type {
                    TokenType::Desc => {
                        descending = true;
                        self.advance();
                    }
                    TokenType::Asc => {
                        self.advance();
                    }
                    _ => {}
                }
                query.order_by.push(OrderByField { field, descending });
                if self.current().token_type == TokenType::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if self.current().token_type == TokenType::Limit {
            self.advance();
            query.limit = self.expect_count("LIMIT")?;
            if self.current().token_type == TokenType::Offset {
                self.advance();
                query.offset = self.expect_count("OFFSET")?;
            }
        }

        // Seed the implicit scope from the first namespace equality in the
        // WHERE tree; fall back to the default namespace.
        query.scope = query
            .conditions
            .as_ref()
            .and_then(find_scope_value)
            .unwrap_or_else(|| "default".to_string());

        Ok(query)
    }

    fn expect_count(&mut self, clause: &str) -> SqlResult<i64> {
        let token = self.expect(TokenType::Number).map_err(|_| {
            self.error(format!("expected a number after {}", clause))
        })?;
        token
            .value
            .parse::<i64>()
            .map_err(|_| SqlError::parse_error(
                format!("invalid {} value '{}'", clause, token.value),
                Some(token.position),
            ))
    }

    // ---- field list ----

    fn parse_select_fields(&mut self, query: &mut Query) -> SqlResult<()> {
        // Bare "FROM ..." means "show default fields"
        if self.current().token_type == TokenType::From {
            query.fields = vec!["*".to_string()];
            query.use_default_fields = true;
            return Ok(());
        }

        if self.current().token_type == TokenType::Distinct {
            query.distinct = true;
            self.advance();
        }

        loop {
            self.parse_field_item(query)?;
            if self.current().token_type == TokenType::Comma {
                self.advance();
            } else {
                break;
            }
        }

        if query.fields.is_empty() && query.aggregates.is_empty() {
            query.fields = vec!["*".to_string()];
            query.use_default_fields = true;
        }
        Ok(())
    }

    fn parse_field_item(&mut self, query: &mut Query) -> SqlResult<()> {
        let token = self.current().clone();
        match token.token_type {
            TokenType::Asterisk => {
                self.advance();
                query.fields.push("*".to_string());
                Ok(())
            }
            TokenType::Identifier => {
                self.advance();
                let word = token.value;

                // FUNC(field) [AS alias]
                if let Some(function) = AggregateFunction::from_name(&word) {
                    if self.current().token_type == TokenType::LeftParen {
                        self.advance();
                        let field = match self.current().token_type {
                            TokenType::Asterisk => {
                                self.advance();
                                "*".to_string()
                            }
                            TokenType::RightParen => "*".to_string(),
                            TokenType::Identifier | TokenType::Number => {
                                let value = self.current().value.clone();
                                self.advance();
                                value
                            }
                            _ => {
                                return Err(self.error(format!(
                                    "expected field or '*' in {}(...)",
                                    function.as_str()
                                )))
                            }
                        };
                        self.expect(TokenType::RightParen)?;
                        let alias = self.parse_optional_alias()?;
                        query
                            .aggregates
                            .push(AggregateFunc::new(function, field, alias));
                        return Ok(());
                    }

                    // Bare FUNC AS alias (implies *)
                    if self.current().token_type == TokenType::As {
                        self.advance();
                        let alias = self.expect_name("aggregate alias after AS")?;
                        query.aggregates.push(AggregateFunc::new(
                            function,
                            "*".to_string(),
                            Some(alias),
                        ));
                        return Ok(());
                    }
                }

                // FUNC.field [AS alias] (dot form; empty field defaults to *)
                if let Some((prefix, rest)) = word.split_once('.') {
                    if let Some(function) = AggregateFunction::from_name(prefix) {
                        let field = if rest.is_empty() {
                            "*".to_string()
                        } else {
                            rest.to_string()
                        };
                        let alias = self.parse_optional_alias()?;
                        query
                            .aggregates
                            .push(AggregateFunc::new(function, field, alias));
                        return Ok(());
                    }
                }

                query.fields.push(word);
                Ok(())
            }
            _ => Err(self.error(format!(
                "expected field name, found '{}'",
                token.value
            ))),
        }
    }

    fn parse_optional_alias(&mut self) -> SqlResult<Option<String>> {
        if self.current().token_type == TokenType::As {
            self.advance();
            Ok(Some(self.expect_name("alias after AS")?))
        } else {
            Ok(None)
        }
    }

    // ---- joins ----

    fn parse_join_clause(&mut self) -> SqlResult<JoinClause> {
        let join_type = match self.current().token_type {
            TokenType::Inner => JoinType::Inner,
            TokenType::Left => JoinType::Left,
            TokenType::Right => JoinType::Right,
            _ => return Err(self.error("expected INNER, LEFT, or RIGHT")),
        };
        self.advance();
        self.expect(TokenType::Join)?;

        let resource = self.expect_name("resource name after JOIN")?.to_lowercase();
        let alias = if self.current().token_type == TokenType::Identifier {
            let value = self.current().value.clone();
            self.advance();
            Some(value)
        } else {
            None
        };

        self.expect(TokenType::On)?;

        let mut conditions = Vec::new();
        loop {
            let left_field = self.expect_name("field in ON condition")?;
            self.expect(TokenType::Equal)?;
            let right_field = self.expect_name("field in ON condition")?;
            conditions.push(JoinCondition {
                left_field,
                right_field,
            });
            if self.current().token_type == TokenType::And {
                self.advance();
            } else {
                break;
            }
        }

        Ok(JoinClause {
            join_type,
            resource,
            alias,
            conditions,
        })
    }

    // ---- conditions ----

    /// OR binds loosest: the tree is an OR group of AND groups, or a single
    /// AND group when no top-level OR appears.
    fn parse_condition_tree(&mut self) -> SqlResult<ConditionGroup> {
        let first = self.parse_and_group()?;
        if self.current().token_type != TokenType::Or {
            return Ok(first);
        }

        let mut group = ConditionGroup {
            operator: LogicalOperator::Or,
            conditions: Vec::new(),
            sub_groups: vec![first],
        };
        while self.current().token_type == TokenType::Or {
            self.advance();
            group.sub_groups.push(self.parse_and_group()?);
        }
        Ok(group)
    }

    fn parse_and_group(&mut self) -> SqlResult<ConditionGroup> {
        let mut group = ConditionGroup::empty();
        loop {
            group.conditions.push(self.parse_condition()?);
            if self.current().token_type == TokenType::And {
                self.advance();
            } else {
                break;
            }
        }
        Ok(group)
    }

    fn parse_condition(&mut self) -> SqlResult<Condition> {
        let field = self.expect_name("field in condition")?;
        let operator = self.parse_condition_operator()?;

        let mut condition = Condition {
            field,
            operator,
            ..Condition::default()
        };

        if matches!(
            operator,
            ConditionOperator::In | ConditionOperator::NotIn
        ) {
            self.parse_in_operand(&mut condition)?;
        } else {
            condition.value = self.expect_literal()?;
        }
        Ok(condition)
    }

    fn parse_condition_operator(&mut self) -> SqlResult<ConditionOperator> {
        let token = self.current().clone();
        let operator = match token.token_type {
            TokenType::Equal => ConditionOperator::Equal,
            TokenType::NotEqual => ConditionOperator::NotEqual,
            TokenType::GreaterThan => ConditionOperator::GreaterThan,
            TokenType::LessThan => ConditionOperator::LessThan,
            TokenType::GreaterThanOrEqual => ConditionOperator::GreaterEqual,
            TokenType::LessThanOrEqual => ConditionOperator::LessEqual,
            TokenType::Like => ConditionOperator::Like,
            TokenType::In => ConditionOperator::In,
            TokenType::Not => {
                self.advance();
                let negated = match self.current().token_type {
                    TokenType::Like => ConditionOperator::NotLike,
                    TokenType::In => ConditionOperator::NotIn,
                    _ => {
                        return Err(self.error("expected LIKE or IN after NOT"));
                    }
                };
                self.advance();
                return Ok(negated);
            }
            // Shell-safe word synonyms, matched case-insensitively
            TokenType::Identifier => match token.value.to_ascii_uppercase().as_str() {
                "EQ" => ConditionOperator::Equal,
                "NE" => ConditionOperator::NotEqual,
                "GT" => ConditionOperator::GreaterThan,
                "GE" => ConditionOperator::GreaterEqual,
                "LT" => ConditionOperator::LessThan,
                "LE" => ConditionOperator::LessEqual,
                _ => {
                    return Err(self.error(format!(
                        "expected comparison operator, found '{}'",
                        token.value
                    )));
                }
            },
            _ => {
                return Err(self.error(format!(
                    "expected comparison operator, found '{}'",
                    token.value
                )));
            }
        };
        self.advance();
        Ok(operator)
    }

    /// Operand of IN/NOT IN: a parenthesized literal list `(v1, v2, ...)`,
    /// a parenthesized subquery, or a trailing subquery
    /// (`name NOT IN fleetql name FROM deployment`).
    fn parse_in_operand(&mut self, condition: &mut Condition) -> SqlResult<()> {
        if self.current().token_type != TokenType::LeftParen {
            // Trailing subquery: the rest of the clause is a nested query
            let subquery = self.parse_query()?;
            condition.subquery = Some(Box::new(subquery));
            return Ok(());
        }
        self.advance();

        if self.subquery_ahead() {
            let subquery = self.parse_query()?;
            self.expect(TokenType::RightParen)?;
            condition.subquery = Some(Box::new(subquery));
            return Ok(());
        }

        let mut items = Vec::new();
        if self.current().token_type != TokenType::RightParen {
            loop {
                items.push(self.expect_literal()?);
                if self.current().token_type == TokenType::Comma {
                    self.advance();
                } else {
                    break;
                }
            }
        }
        self.expect(TokenType::RightParen)?;
        condition.value = items.join(",");
        Ok(())
    }

    /// Lookahead: does a FROM appear before the parenthesis we are inside
    /// closes? Distinguishes a subquery from a literal list.
    fn subquery_ahead(&self) -> bool {
        let mut depth = 0usize;
        for token in &self.tokens[self.position..] {
            match token.token_type {
                TokenType::LeftParen => depth += 1,
                TokenType::RightParen => {
                    if depth == 0 {
                        return false;
                    }
                    depth -= 1;
                }
                TokenType::From if depth == 0 => return true,
                TokenType::Eof => return false,
                _ => {}
            }
        }
        false
    }
}

/// Depth-first search of the WHERE tree for the first direct equality on the
/// scope field (or its short alias); direct conditions are checked before
/// nested groups at each level.
fn find_scope_value(group: &ConditionGroup) -> Option<String> {
    for condition in &group.conditions {
        if (condition.field == SCOPE_FIELD || condition.field == SCOPE_FIELD_ALIAS)
            && condition.operator == ConditionOperator::Equal
            && condition.subquery.is_none()
        {
            return Some(condition.value.clone());
        }
    }
    for sub in &group.sub_groups {
        if let Some(value) = find_scope_value(sub) {
            return Some(value);
        }
    }
    None
}
