//! Recursive-descent parser from a macro-expanded [`Token`] stream into
//! [`BoolExpr`]/[`IntExpr`]. Stands in for the node-typed grammar a
//! dedicated preprocessor parser would give `#if`/`#elif` conditions;
//! tree-sitter-c hands us the condition as one opaque token blob, so this
//! module (together with [`crate::token`]) is the whole front end for it.
//!
//! Implements the standard C constant-expression precedence chain, narrow
//! enough for preprocessor conditions: ternary, `||`, `&&`, `|`, `^`, `&`,
//! equality, relational, shift, additive, multiplicative, unary, primary.
//! Free identifiers (macros whose value was never concretely resolved)
//! become [`IntExpr::MacroValue`]; `defined NAME` / `defined(NAME)` become
//! [`BoolExpr::Defined`].

use crate::error::{HayrollError, Result};
use crate::expr::{BoolExpr, IntExpr};
use crate::token::Token;

/// A parsed subexpression before its boolean/integer sort is settled by
/// the context it's used in -- mirrors how C doesn't distinguish bool from
/// int in the preprocessor.
enum Expr {
    Bool(BoolExpr),
    Int(IntExpr),
}

impl Expr {
    fn into_bool(self) -> BoolExpr {
        match self {
            Expr::Bool(b) => b,
            Expr::Int(i) => BoolExpr::Ne(Box::new(i), Box::new(IntExpr::Literal(0))),
        }
    }

    fn into_int(self) -> IntExpr {
        match self {
            Expr::Int(i) => i,
            Expr::Bool(b) => IntExpr::Cond(
                Box::new(b),
                Box::new(IntExpr::Literal(1)),
                Box::new(IntExpr::Literal(0)),
            ),
        }
    }
}

/// Parses a full `#if`/`#elif` condition (already macro-expanded) into a
/// single [`BoolExpr`]. Errors if the token stream is empty, malformed, or
/// has trailing tokens after a complete expression.
pub fn parse_condition(tokens: &[Token]) -> Result<BoolExpr> {
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.conditional()?;
    if parser.pos != parser.tokens.len() {
        return Err(HayrollError::MalformedExpression(format!(
            "trailing tokens after condition: {:?}",
            &parser.tokens[parser.pos..]
        )));
    }
    Ok(expr.into_bool())
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn bump(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if matches!(self.peek(), Some(t) if t.is_punct(punct)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> Result<()> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(HayrollError::MalformedExpression(format!(
                "expected {punct:?}, found {:?}",
                self.peek()
            )))
        }
    }

    fn conditional(&mut self) -> Result<Expr> {
        let cond = self.logical_or()?;
        if self.eat_punct("?") {
            let then_branch = self.conditional()?;
            self.expect_punct(":")?;
            let else_branch = self.conditional()?;
            return Ok(Expr::Int(IntExpr::Cond(
                Box::new(cond.into_bool()),
                Box::new(then_branch.into_int()),
                Box::new(else_branch.into_int()),
            )));
        }
        Ok(cond)
    }

    fn logical_or(&mut self) -> Result<Expr> {
        let mut lhs = self.logical_and()?.into_bool();
        while self.eat_punct("||") {
            let rhs = self.logical_and()?.into_bool();
            lhs = lhs.or(rhs);
        }
        Ok(Expr::Bool(lhs))
    }

    fn logical_and(&mut self) -> Result<Expr> {
        let mut lhs = self.inclusive_or()?.into_bool();
        while self.eat_punct("&&") {
            let rhs = self.inclusive_or()?.into_bool();
            lhs = lhs.and(rhs);
        }
        Ok(Expr::Bool(lhs))
    }

    fn inclusive_or(&mut self) -> Result<Expr> {
        let mut lhs = self.exclusive_or()?.into_int();
        while self.eat_punct("|") {
            let rhs = self.exclusive_or()?.into_int();
            lhs = IntExpr::BitOr(Box::new(lhs), Box::new(rhs));
        }
        Ok(Expr::Int(lhs))
    }

    fn exclusive_or(&mut self) -> Result<Expr> {
        let mut lhs = self.and()?.into_int();
        while self.eat_punct("^") {
            let rhs = self.and()?.into_int();
            lhs = IntExpr::BitXor(Box::new(lhs), Box::new(rhs));
        }
        Ok(Expr::Int(lhs))
    }

    fn and(&mut self) -> Result<Expr> {
        let mut lhs = self.equality()?.into_int();
        while self.eat_punct("&") {
            let rhs = self.equality()?.into_int();
            lhs = IntExpr::BitAnd(Box::new(lhs), Box::new(rhs));
        }
        Ok(Expr::Int(lhs))
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut lhs = self.relational()?;
        loop {
            if self.eat_punct("==") {
                let rhs = self.relational()?;
                lhs = Expr::Bool(BoolExpr::Eq(Box::new(lhs.into_int()), Box::new(rhs.into_int())));
            } else if self.eat_punct("!=") {
                let rhs = self.relational()?;
                lhs = Expr::Bool(BoolExpr::Ne(Box::new(lhs.into_int()), Box::new(rhs.into_int())));
            } else {
                return Ok(lhs);
            }
        }
    }

    fn relational(&mut self) -> Result<Expr> {
        let mut lhs = self.shift()?;
        loop {
            let op = ["<=", ">=", "<", ">"]
                .into_iter()
                .find(|p| matches!(self.peek(), Some(t) if t.is_punct(p)));
            let Some(op) = op else { return Ok(lhs) };
            self.bump();
            let rhs = self.shift()?;
            let (a, b) = (lhs.into_int(), rhs.into_int());
            lhs = Expr::Bool(match op {
                "<=" => BoolExpr::Le(Box::new(a), Box::new(b)),
                ">=" => BoolExpr::Ge(Box::new(a), Box::new(b)),
                "<" => BoolExpr::Lt(Box::new(a), Box::new(b)),
                ">" => BoolExpr::Gt(Box::new(a), Box::new(b)),
                _ => unreachable!(),
            });
        }
    }

    fn shift(&mut self) -> Result<Expr> {
        let mut lhs = self.additive()?.into_int();
        loop {
            if self.eat_punct("<<") {
                let rhs = self.additive()?.into_int();
                lhs = IntExpr::Shl(Box::new(lhs), Box::new(rhs));
            } else if self.eat_punct(">>") {
                let rhs = self.additive()?.into_int();
                lhs = IntExpr::Shr(Box::new(lhs), Box::new(rhs));
            } else {
                return Ok(Expr::Int(lhs));
            }
        }
    }

    fn additive(&mut self) -> Result<Expr> {
        let mut lhs = self.multiplicative()?.into_int();
        loop {
            if self.eat_punct("+") {
                let rhs = self.multiplicative()?.into_int();
                lhs = IntExpr::Add(Box::new(lhs), Box::new(rhs));
            } else if self.eat_punct("-") {
                let rhs = self.multiplicative()?.into_int();
                lhs = IntExpr::Sub(Box::new(lhs), Box::new(rhs));
            } else {
                return Ok(Expr::Int(lhs));
            }
        }
    }

    fn multiplicative(&mut self) -> Result<Expr> {
        let mut lhs = self.unary()?.into_int();
        loop {
            if self.eat_punct("*") {
                let rhs = self.unary()?.into_int();
                lhs = IntExpr::Mul(Box::new(lhs), Box::new(rhs));
            } else if self.eat_punct("/") {
                let rhs = self.unary()?.into_int();
                lhs = IntExpr::Div(Box::new(lhs), Box::new(rhs));
            } else if self.eat_punct("%") {
                let rhs = self.unary()?.into_int();
                lhs = IntExpr::Rem(Box::new(lhs), Box::new(rhs));
            } else {
                return Ok(Expr::Int(lhs));
            }
        }
    }

    fn unary(&mut self) -> Result<Expr> {
        if self.eat_punct("!") {
            return Ok(Expr::Bool(self.unary()?.into_bool().not()));
        }
        if self.eat_punct("-") {
            return Ok(Expr::Int(IntExpr::Neg(Box::new(self.unary()?.into_int()))));
        }
        if self.eat_punct("+") {
            return self.unary();
        }
        if self.eat_punct("~") {
            return Ok(Expr::Int(IntExpr::BitNot(Box::new(self.unary()?.into_int()))));
        }
        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Number(n)) => {
                self.bump();
                let value = parse_c_integer_literal(n)?;
                Ok(Expr::Int(IntExpr::Literal(value)))
            }
            Some(Token::Identifier(name)) if name == "defined" => {
                self.bump();
                self.defined_expr()
            }
            Some(Token::Identifier(name)) => {
                let name = name.clone();
                self.bump();
                Ok(Expr::Int(IntExpr::MacroValue(name)))
            }
            Some(t) if t.is_punct("(") => {
                self.bump();
                let inner = self.conditional()?;
                self.expect_punct(")")?;
                Ok(inner)
            }
            other => Err(HayrollError::MalformedExpression(format!(
                "unexpected token in condition: {other:?}"
            ))),
        }
    }

    fn defined_expr(&mut self) -> Result<Expr> {
        if self.eat_punct("(") {
            let name = self.expect_identifier()?;
            self.expect_punct(")")?;
            Ok(Expr::Bool(BoolExpr::Defined(name)))
        } else {
            let name = self.expect_identifier()?;
            Ok(Expr::Bool(BoolExpr::Defined(name)))
        }
    }

    fn expect_identifier(&mut self) -> Result<String> {
        match self.bump() {
            Some(Token::Identifier(name)) => Ok(name.clone()),
            other => Err(HayrollError::MalformedExpression(format!(
                "expected an identifier, found {other:?}"
            ))),
        }
    }
}

/// Parses decimal, hex (`0x`), octal (`0`-prefixed), or binary (`0b`) C
/// integer literals, ignoring any `u`/`l`/`U`/`L` suffix.
fn parse_c_integer_literal(text: &str) -> Result<i64> {
    let trimmed = text.trim_end_matches(['u', 'U', 'l', 'L']);
    let parsed = if let Some(hex) = trimmed.strip_prefix("0x").or_else(|| trimmed.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else if let Some(bin) = trimmed.strip_prefix("0b").or_else(|| trimmed.strip_prefix("0B")) {
        i64::from_str_radix(bin, 2)
    } else if trimmed.len() > 1 && trimmed.starts_with('0') {
        i64::from_str_radix(&trimmed[1..], 8)
    } else {
        trimmed.parse::<i64>()
    };
    parsed.map_err(|e| HayrollError::MalformedExpression(format!("bad integer literal {text:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::tokenize;

    #[test]
    fn parses_logical_and_of_comparisons() {
        let tokens = tokenize("VERSION >= 2 && VERSION < 5").unwrap();
        let expr = parse_condition(&tokens).unwrap();
        let expected = BoolExpr::Ge(
            Box::new(IntExpr::MacroValue("VERSION".into())),
            Box::new(IntExpr::Literal(2)),
        )
        .and(BoolExpr::Lt(
            Box::new(IntExpr::MacroValue("VERSION".into())),
            Box::new(IntExpr::Literal(5)),
        ));
        assert_eq!(expr, expected);
    }

    #[test]
    fn parses_defined_with_and_without_parens() {
        assert_eq!(
            parse_condition(&tokenize("defined(FOO)").unwrap()).unwrap(),
            BoolExpr::Defined("FOO".into())
        );
        assert_eq!(
            parse_condition(&tokenize("defined FOO").unwrap()).unwrap(),
            BoolExpr::Defined("FOO".into())
        );
    }

    #[test]
    fn bare_macro_condition_becomes_nonzero_test() {
        let expr = parse_condition(&tokenize("FOO").unwrap()).unwrap();
        assert_eq!(
            expr,
            BoolExpr::Ne(
                Box::new(IntExpr::MacroValue("FOO".into())),
                Box::new(IntExpr::Literal(0))
            )
        );
    }

    #[test]
    fn top_level_ternary_is_coerced_to_a_nonzero_test() {
        let expr = parse_condition(&tokenize("defined(X) ? 0x10 : 0").unwrap()).unwrap();
        assert!(matches!(expr, BoolExpr::Ne(_, _)));
    }

    #[test]
    fn ternary_inside_comparison_is_fine() {
        let tokens = tokenize("(defined(X) ? 1 : 0) == 1").unwrap();
        assert!(parse_condition(&tokens).is_ok());
    }
}
