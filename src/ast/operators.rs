use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

/// Binary operators.
///
/// Word and symbol spellings of the logical operators are kept apart so a
/// tree dumps back to what the user wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOperator {
    // Logical
    /// `or`
    Or,
    /// `||`
    OrOr,
    /// `and`
    And,
    /// `&&`
    AndAnd,

    // Bitwise
    /// `|`
    BitOr,
    /// `^`
    BitXor,
    /// `&`
    BitAnd,
    /// `<<`
    ShiftLeft,
    /// `>>`
    ShiftRight,

    // Comparison
    /// Loose equality (`==`)
    Equal,
    /// Strict equality (`===`)
    Identical,
    /// `!=`
    NotEqual,
    /// `!==`
    NotIdentical,
    /// `<`
    Less,
    /// `>`
    Greater,
    /// `<=`
    LessEqual,
    /// `>=`
    GreaterEqual,

    // Membership and string predicates
    /// `in`
    In,
    /// `not in`
    NotIn,
    /// `contains`
    Contains,
    /// `starts with`
    StartsWith,
    /// `ends with`
    EndsWith,
    /// `matches`
    Matches,

    /// Inclusive integer range (`..`)
    Range,

    // Arithmetic
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// String concatenation (`~`)
    Concat,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `%`
    Modulo,
    /// `**`
    Power,
}

impl BinaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        use BinaryOperator::*;
        Some(match symbol {
            "or" => Or,
            "||" => OrOr,
            "and" => And,
            "&&" => AndAnd,
            "|" => BitOr,
            "^" => BitXor,
            "&" => BitAnd,
            "<<" => ShiftLeft,
            ">>" => ShiftRight,
            "==" => Equal,
            "===" => Identical,
            "!=" => NotEqual,
            "!==" => NotIdentical,
            "<" => Less,
            ">" => Greater,
            "<=" => LessEqual,
            ">=" => GreaterEqual,
            "in" => In,
            "not in" => NotIn,
            "contains" => Contains,
            "starts with" => StartsWith,
            "ends with" => EndsWith,
            "matches" => Matches,
            ".." => Range,
            "+" => Add,
            "-" => Subtract,
            "~" => Concat,
            "*" => Multiply,
            "/" => Divide,
            "%" => Modulo,
            "**" => Power,
            _ => return None,
        })
    }

    pub fn symbol(&self) -> &'static str {
        use BinaryOperator::*;
        match self {
            Or => "or",
            OrOr => "||",
            And => "and",
            AndAnd => "&&",
            BitOr => "|",
            BitXor => "^",
            BitAnd => "&",
            ShiftLeft => "<<",
            ShiftRight => ">>",
            Equal => "==",
            Identical => "===",
            NotEqual => "!=",
            NotIdentical => "!==",
            Less => "<",
            Greater => ">",
            LessEqual => "<=",
            GreaterEqual => ">=",
            In => "in",
            NotIn => "not in",
            Contains => "contains",
            StartsWith => "starts with",
            EndsWith => "ends with",
            Matches => "matches",
            Range => "..",
            Add => "+",
            Subtract => "-",
            Concat => "~",
            Multiply => "*",
            Divide => "/",
            Modulo => "%",
            Power => "**",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(&self) -> u16 {
        use BinaryOperator::*;
        match self {
            Or | OrOr => 10,
            And | AndAnd => 15,
            BitOr => 16,
            BitXor => 17,
            BitAnd => 18,
            Equal | Identical | NotEqual | NotIdentical | Less | Greater | LessEqual | GreaterEqual | In
            | NotIn | Contains | StartsWith | EndsWith | Matches => 20,
            Range | ShiftLeft | ShiftRight => 25,
            Add | Subtract => 30,
            Concat => 40,
            Multiply | Divide | Modulo => 60,
            Power => 200,
        }
    }

    pub fn associativity(&self) -> Associativity {
        match self {
            BinaryOperator::Power => Associativity::Right,
            _ => Associativity::Left,
        }
    }

    pub fn is_short_circuit(&self) -> bool {
        matches!(
            self,
            BinaryOperator::Or | BinaryOperator::OrOr | BinaryOperator::And | BinaryOperator::AndAnd
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOperator {
    /// `not`
    Not,
    /// `!`
    Bang,
    /// `-`
    Minus,
    /// `+`
    Plus,
    /// Bitwise not (`~`)
    Tilde,
}

impl UnaryOperator {
    pub fn from_symbol(symbol: &str) -> Option<Self> {
        match symbol {
            "not" => Some(UnaryOperator::Not),
            "!" => Some(UnaryOperator::Bang),
            "-" => Some(UnaryOperator::Minus),
            "+" => Some(UnaryOperator::Plus),
            "~" => Some(UnaryOperator::Tilde),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOperator::Not => "not",
            UnaryOperator::Bang => "!",
            UnaryOperator::Minus => "-",
            UnaryOperator::Plus => "+",
            UnaryOperator::Tilde => "~",
        }
    }

    pub fn precedence(&self) -> u16 {
        match self {
            UnaryOperator::Not | UnaryOperator::Bang => 50,
            UnaryOperator::Minus | UnaryOperator::Plus | UnaryOperator::Tilde => 500,
        }
    }
}
