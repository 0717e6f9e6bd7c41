/// SQL keywords, operators and punctuation.
#[allow(non_camel_case_types, clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token {
    // ==================== keywords ====================
    SELECT,
    DISTINCT,
    FROM,
    WHERE,
    JOIN,
    LEFT_OUTER_JOIN,
    ON,
    GROUP_BY,
    ORDER_BY,
    LIMIT,
    OFFSET,
    AS,
    AND,
    OR,
    NOT,
    IN,
    IS,
    NULL,
    TRUE,
    FALSE,
    LIKE,
    ESCAPE,
    REGEXP,
    CASE,
    WHEN,
    THEN,
    ELSE,
    END,
    ASC,
    DESC,
    COUNT,

    // ==================== operators ====================
    EQ,
    NE,
    LT,
    GT,
    LE,
    GE,
    PLUS,
    MINUS,
    STAR,

    // ==================== punctuation ====================
    LPAREN,
    RPAREN,
    COMMA,
    DOT,
}

impl Token {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Token::SELECT => "SELECT",
            Token::DISTINCT => "DISTINCT",
            Token::FROM => "FROM",
            Token::WHERE => "WHERE",
            Token::JOIN => "JOIN",
            Token::LEFT_OUTER_JOIN => "LEFT OUTER JOIN",
            Token::ON => "ON",
            Token::GROUP_BY => "GROUP BY",
            Token::ORDER_BY => "ORDER BY",
            Token::LIMIT => "LIMIT",
            Token::OFFSET => "OFFSET",
            Token::AS => "AS",
            Token::AND => "AND",
            Token::OR => "OR",
            Token::NOT => "NOT",
            Token::IN => "IN",
            Token::IS => "IS",
            Token::NULL => "NULL",
            Token::TRUE => "TRUE",
            Token::FALSE => "FALSE",
            Token::LIKE => "LIKE",
            Token::ESCAPE => "ESCAPE",
            Token::REGEXP => "REGEXP",
            Token::CASE => "CASE",
            Token::WHEN => "WHEN",
            Token::THEN => "THEN",
            Token::ELSE => "ELSE",
            Token::END => "END",
            Token::ASC => "ASC",
            Token::DESC => "DESC",
            Token::COUNT => "COUNT",
            Token::EQ => "=",
            Token::NE => "!=",
            Token::LT => "<",
            Token::GT => ">",
            Token::LE => "<=",
            Token::GE => ">=",
            Token::PLUS => "+",
            Token::MINUS => "-",
            Token::STAR => "*",
            Token::LPAREN => "(",
            Token::RPAREN => ")",
            Token::COMMA => ",",
            Token::DOT => ".",
        }
    }

    /// Comparison and arithmetic operators are always surrounded by spaces.
    pub const fn is_operator(&self) -> bool {
        matches!(
            self,
            Token::EQ
                | Token::NE
                | Token::LT
                | Token::GT
                | Token::LE
                | Token::GE
                | Token::PLUS
                | Token::MINUS
                | Token::STAR
        )
    }

    /// Tokens that behave like punctuation for spacing purposes.
    pub const fn is_punctuation(&self) -> bool {
        matches!(
            self,
            Token::LPAREN | Token::RPAREN | Token::COMMA | Token::DOT
        )
    }
}

impl core::fmt::Display for Token {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
