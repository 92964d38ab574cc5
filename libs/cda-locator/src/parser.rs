//! Locator parser - converts locator strings to [`Path`] values
//!
//! Recursive descent over the token stream. Predicates contain relative
//! paths, so the path rule reenters itself; locators in practice nest one
//! or two levels (`[./cda:templateId[@root = '...']]`), and a depth guard
//! keeps hostile input from recursing unboundedly.

use crate::ast::{Anchor, Axis, NodeTest, Path, Predicate, Step};
use crate::error::{Error, Result};
use crate::lexer::{Lexer, Token};

const MAX_PREDICATE_DEPTH: usize = 16;

/// Parse a locator string.
///
/// Deterministic: the same locator always yields the same [`Path`].
pub fn parse(locator: &str) -> Result<Path> {
    let mut parser = Parser::new(locator)?;
    let path = parser.parse_path(0)?;
    parser.expect_eof()?;
    if path.steps.is_empty() {
        return Err(Error::parse(locator, "empty locator"));
    }
    Ok(path)
}

struct Parser<'a> {
    locator: &'a str,
    lexer: Lexer<'a>,
    current: Token,
}

impl<'a> Parser<'a> {
    fn new(locator: &'a str) -> Result<Self> {
        let mut lexer = Lexer::new(locator);
        let current = lexer.next_token()?;
        Ok(Self {
            locator,
            lexer,
            current,
        })
    }

    fn advance(&mut self) -> Result<()> {
        self.current = self.lexer.next_token()?;
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::parse(self.locator, message)
    }

    fn expect_eof(&self) -> Result<()> {
        if self.current == Token::Eof {
            Ok(())
        } else {
            Err(self.error(format!("trailing input at {:?}", self.current)))
        }
    }

    /// path := ('/' | '//')? step (('/' | '//') step)*
    fn parse_path(&mut self, depth: usize) -> Result<Path> {
        if depth > MAX_PREDICATE_DEPTH {
            return Err(self.error("predicates nested too deeply"));
        }

        let (anchor, mut axis) = match self.current {
            Token::Slash => {
                self.advance()?;
                (Anchor::Root, Axis::Child)
            }
            Token::DoubleSlash => {
                // Descendant search within the context subtree.
                self.advance()?;
                (Anchor::Relative, Axis::Descendant)
            }
            _ => (Anchor::Relative, Axis::Child),
        };

        let mut steps = vec![self.parse_step(axis, depth)?];

        loop {
            axis = match self.current {
                Token::Slash => Axis::Child,
                Token::DoubleSlash => Axis::Descendant,
                _ => break,
            };
            self.advance()?;
            steps.push(self.parse_step(axis, depth)?);
        }

        // Attribute and text() tests select values, not elements; nothing
        // can follow them.
        for step in &steps[..steps.len() - 1] {
            match &step.test {
                NodeTest::Attribute(name) => {
                    return Err(Error::MisplacedTerminalStep(format!("@{}", name)));
                }
                NodeTest::Text => {
                    return Err(Error::MisplacedTerminalStep("text()".to_string()));
                }
                _ => {}
            }
        }

        Ok(Path { anchor, steps })
    }

    /// step := '.' | '@' name | name (':' name)? | 'text' '(' ')' | '*'
    ///         followed by any number of predicates
    fn parse_step(&mut self, axis: Axis, depth: usize) -> Result<Step> {
        let test = match self.current.clone() {
            Token::Dot => {
                self.advance()?;
                return Ok(Step {
                    axis: Axis::SelfNode,
                    test: NodeTest::Wildcard,
                    predicates: Vec::new(),
                });
            }
            Token::Star => {
                self.advance()?;
                NodeTest::Wildcard
            }
            Token::At => {
                self.advance()?;
                match self.current.clone() {
                    Token::Identifier(name) => {
                        self.advance()?;
                        NodeTest::Attribute(name)
                    }
                    other => return Err(self.error(format!("expected attribute name, got {:?}", other))),
                }
            }
            Token::Identifier(first) => {
                self.advance()?;
                if self.current == Token::Colon {
                    self.advance()?;
                    match self.current.clone() {
                        Token::Identifier(name) => {
                            self.advance()?;
                            NodeTest::Element {
                                prefix: Some(first),
                                name,
                            }
                        }
                        other => {
                            return Err(self.error(format!("expected element name, got {:?}", other)))
                        }
                    }
                } else if self.current == Token::LParen {
                    if first != "text" {
                        return Err(self.error(format!("unknown node test '{}()'", first)));
                    }
                    self.advance()?;
                    if self.current != Token::RParen {
                        return Err(self.error("expected ')' after 'text('"));
                    }
                    self.advance()?;
                    NodeTest::Text
                } else {
                    NodeTest::Element {
                        prefix: None,
                        name: first,
                    }
                }
            }
            other => return Err(self.error(format!("expected a step, got {:?}", other))),
        };

        let mut predicates = Vec::new();
        while self.current == Token::LBracket {
            self.advance()?;
            predicates.push(self.parse_predicate(depth + 1)?);
            if self.current != Token::RBracket {
                return Err(self.error("expected ']' to close predicate"));
            }
            self.advance()?;
        }

        Ok(Step {
            axis,
            test,
            predicates,
        })
    }

    /// predicate := number | path ('=' literal)?
    fn parse_predicate(&mut self, depth: usize) -> Result<Predicate> {
        if let Token::Number(digits) = self.current.clone() {
            self.advance()?;
            let position: usize = digits
                .parse()
                .map_err(|_| self.error(format!("invalid position '{}'", digits)))?;
            if position == 0 {
                return Err(self.error("positions are 1-based"));
            }
            return Ok(Predicate::Position(position));
        }

        let path = self.parse_path(depth)?;
        if self.current == Token::Equals {
            self.advance()?;
            match self.current.clone() {
                Token::Literal(literal) => {
                    self.advance()?;
                    Ok(Predicate::Equals { path, literal })
                }
                other => Err(self.error(format!("expected string literal, got {:?}", other))),
            }
        } else {
            Ok(Predicate::Exists(path))
        }
    }
}
