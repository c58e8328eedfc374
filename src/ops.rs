//! Operator descriptors shared by the lexer (maximal munch), the parser
//! (precedence folding) and the builtin bindings (which give the symbols
//! their meaning at the top-level scope).

pub const KEYWORDS: &[&str] = &[
    "include", "function", "var", "return", "if", "else", "while", "break",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Sentinel used to drain the operator stack at the end of an expression.
pub const MIN_PREC: i32 = i32::MIN;

/// Fold precedence applied when `[` is recognized as element indexing.
pub const ELEMENT_INDEX_PREC: i32 = 1000;

/// Fold precedence applied when `(` is recognized as a function call.
pub const FUNC_CALL_PREC: i32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Left,
    Right,
    Prefix,
}

#[derive(Debug, Clone)]
pub struct Operator {
    pub symbol: &'static str,
    pub prec: i32,
    pub assoc: Assoc,
}

impl Operator {
    const fn new(symbol: &'static str, prec: i32, assoc: Assoc) -> Self {
        Self {
            symbol,
            prec,
            assoc,
        }
    }
}

/// The configured operator table. A symbol may appear twice when it is both
/// binary and prefix (`-`).
#[derive(Debug, Clone)]
pub struct OperatorSet {
    ops: Vec<Operator>,
}

impl Default for OperatorSet {
    fn default() -> Self {
        use Assoc::{Left, Prefix, Right};
        Self {
            ops: vec![
                Operator::new("=", 10, Left),
                Operator::new("||", 20, Left),
                Operator::new("&&", 30, Left),
                Operator::new("==", 40, Left),
                Operator::new("!=", 40, Left),
                Operator::new(">", 50, Left),
                Operator::new(">=", 50, Left),
                Operator::new("<", 50, Left),
                Operator::new("<=", 50, Left),
                Operator::new("+", 60, Left),
                Operator::new("-", 60, Left),
                Operator::new("*", 70, Left),
                Operator::new("/", 70, Left),
                Operator::new("%", 70, Left),
                Operator::new("-", 80, Prefix),
                Operator::new("!", 80, Prefix),
                Operator::new("^", 90, Right),
                Operator::new(".", 1001, Left),
            ],
        }
    }
}

impl OperatorSet {
    pub fn binary(&self, symbol: &str) -> Option<&Operator> {
        self.ops
            .iter()
            .find(|op| op.symbol == symbol && matches!(op.assoc, Assoc::Left | Assoc::Right))
    }

    pub fn prefix(&self, symbol: &str) -> Option<&Operator> {
        self.ops
            .iter()
            .find(|op| op.symbol == symbol && op.assoc == Assoc::Prefix)
    }

    /// True when `lexeme` is a prefix of some declared operator symbol. The
    /// lexer extends an operator lexeme while this holds.
    pub fn is_lexeme_prefix(&self, lexeme: &str) -> bool {
        self.ops.iter().any(|op| op.symbol.starts_with(lexeme))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minus_is_both_binary_and_prefix() {
        let ops = OperatorSet::default();
        assert_eq!(ops.binary("-").expect("binary -").prec, 60);
        assert_eq!(ops.prefix("-").expect("prefix -").prec, 80);
    }

    #[test]
    fn power_is_right_associative() {
        let ops = OperatorSet::default();
        assert_eq!(ops.binary("^").expect("binary ^").assoc, Assoc::Right);
    }

    #[test]
    fn lexeme_prefix_matching() {
        let ops = OperatorSet::default();
        assert!(ops.is_lexeme_prefix("<"));
        assert!(ops.is_lexeme_prefix("<="));
        assert!(ops.is_lexeme_prefix("&"));
        assert!(!ops.is_lexeme_prefix("<=>"));
        assert!(!ops.is_lexeme_prefix("@"));
    }
}
