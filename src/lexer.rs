use std::rc::Rc;

use crate::ops::{OperatorSet, is_keyword};
use crate::token::{SrcLoc, Token, TokenKind};

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_'
}

fn is_ident_cont(ch: char) -> bool {
    is_ident_start(ch) || ch.is_ascii_digit()
}

fn is_space(ch: char) -> bool {
    ch == ' ' || ch == '\t' || ch == '\r' || ch == '\n'
}

/// Pull-based tokenizer over a single named source.
///
/// Each call to [`Tokenizer::next_token`] yields the next token; failures
/// are reported in-band as `TokenKind::Error` tokens so the parser decides
/// how to surface them.
pub struct Tokenizer {
    file: Rc<str>,
    chars: Vec<char>,
    pos: usize,
    line: u32,
    col: u32,
    last_line: u32,
    last_col: u32,
    ops: Rc<OperatorSet>,
}

impl Tokenizer {
    pub fn new(file: &str, source: &str, ops: Rc<OperatorSet>) -> Self {
        Self {
            file: Rc::from(file),
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            last_line: 1,
            last_col: 1,
            ops,
        }
    }

    pub fn loc(&self) -> SrcLoc {
        SrcLoc::new(&self.file, self.line, self.col)
    }

    fn get(&mut self) -> Option<char> {
        let ch = *self.chars.get(self.pos)?;
        self.pos += 1;
        self.last_line = self.line;
        self.last_col = self.col;
        if ch == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(ch)
    }

    // Single-step pushback; callers never unget more than one rune.
    fn unget(&mut self) {
        if self.pos > 0 {
            self.pos -= 1;
            self.line = self.last_line;
            self.col = self.last_col;
        }
    }

    pub fn next_token(&mut self) -> Token {
        loop {
            // Skip whitespace up to the first significant character; its
            // position becomes the token location.
            let (first, loc) = loop {
                let loc = self.loc();
                match self.get() {
                    None => return Token::new(TokenKind::Eof, loc),
                    Some(ch) if is_space(ch) => {}
                    Some(ch) => break (ch, loc),
                }
            };

            if first == '#' {
                while let Some(ch) = self.get() {
                    if ch == '\n' {
                        break;
                    }
                }
                continue;
            }

            if is_ident_start(first) {
                return self.read_word(first, loc);
            }
            if first.is_ascii_digit() {
                return self.read_number(first, loc);
            }
            if first == '"' {
                return self.read_string(loc);
            }
            if matches!(first, ',' | ';' | ':' | '(' | ')' | '{' | '}' | '[' | ']') {
                return Token::new(TokenKind::Punct(first), loc);
            }
            return self.read_operator(first, loc);
        }
    }

    fn read_word(&mut self, first: char, loc: SrcLoc) -> Token {
        let mut word = String::from(first);
        while let Some(ch) = self.get() {
            if !is_ident_cont(ch) {
                self.unget();
                break;
            }
            word.push(ch);
        }
        if is_keyword(&word) {
            Token::new(TokenKind::Keyword(word), loc)
        } else {
            Token::new(TokenKind::Ident(word), loc)
        }
    }

    fn read_number(&mut self, first: char, loc: SrcLoc) -> Token {
        let mut lexeme = String::from(first);
        let mut last = first;
        while let Some(ch) = self.get() {
            let accept = ch.is_ascii_digit()
                || ch == '.'
                || ((ch == 'e' || ch == 'E') && last != '-' && last != '+')
                || ((ch == '-' || ch == '+') && (last == 'e' || last == 'E'));
            if !accept {
                self.unget();
                break;
            }
            last = ch;
            lexeme.push(ch);
        }
        match lexeme.parse::<f64>() {
            Ok(num) => Token::new(TokenKind::Number(num), loc),
            Err(_) => Token::new(
                TokenKind::Error(format!("invalid number '{lexeme}'")),
                loc,
            ),
        }
    }

    fn read_string(&mut self, loc: SrcLoc) -> Token {
        let mut text = String::new();
        loop {
            let Some(ch) = self.get() else {
                return Token::new(TokenKind::Error("unterminated string".to_string()), self.loc());
            };
            match ch {
                '"' => return Token::new(TokenKind::Str(text), loc),
                '\\' => {
                    let Some(next) = self.get() else {
                        return Token::new(
                            TokenKind::Error("unterminated string".to_string()),
                            self.loc(),
                        );
                    };
                    match next {
                        '"' => text.push('"'),
                        '\'' => text.push('\''),
                        '\\' => text.push('\\'),
                        'r' => text.push('\r'),
                        'n' => text.push('\n'),
                        't' => text.push('\t'),
                        other => {
                            return Token::new(
                                TokenKind::Error(format!(
                                    "invalid character escape: '\\{other}'"
                                )),
                                self.loc(),
                            );
                        }
                    }
                }
                other => text.push(other),
            }
        }
    }

    // Maximal munch: keep extending while the accumulated lexeme is still a
    // prefix of some declared operator symbol.
    fn read_operator(&mut self, first: char, loc: SrcLoc) -> Token {
        let mut lexeme = String::from(first);
        while let Some(ch) = self.get() {
            lexeme.push(ch);
            if !self.ops.is_lexeme_prefix(&lexeme) {
                self.unget();
                lexeme.pop();
                break;
            }
        }
        Token::new(TokenKind::Op(lexeme), loc)
    }
}
