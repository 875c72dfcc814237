//! Stack-based macro expansion over a flat [`Token`] stream, mirroring the
//! GCC/Clang rule set: object-like macros substitute their body, function-
//! like macros substitute with their arguments bound, undefined identifiers
//! inside `defined(...)` test false, and a macro cannot expand into itself.
//!
//! Tokens are pushed onto a stack in reverse order so the leftmost token is
//! always on top; popping and re-pushing an expansion's tokens is what
//! "rescans" them for further macro references, same as the reference
//! algorithm. A [`UndefStackSymbolTable`] shadow keeps track of which
//! macro names are currently mid-expansion so they can't recurse into
//! themselves, popped off again once every token of that expansion has
//! been consumed off the stack.

use crate::error::{HayrollError, Result};
use crate::symbol_table::{Symbol, SymbolTable, UndefStackSymbolTable};
use crate::token::Token;

/// Expands a flat token stream (a macro body or `#if` condition) against
/// `symbol_table`, returning the fully macro-expanded token stream. Tokens
/// whose name is unknown to `symbol_table` are left untouched -- the
/// symbolic executor treats them as free variables.
pub fn expand_preproc_tokens(tokens: &[Token], symbol_table: &SymbolTable) -> Result<Vec<Token>> {
    let const_zero = Token::Number("0".to_string());
    let const_one = Token::Number("1".to_string());

    // (token, should_pop_undef_after_this_token)
    let mut stack: Vec<(Token, bool)> = Vec::new();
    let mut table = UndefStackSymbolTable::new(symbol_table);
    let mut buffer = Vec::new();

    push_tokens(&mut stack, &mut table, tokens, None);

    while let Some((token, should_pop_undef)) = stack.pop() {
        match &token {
            Token::Identifier(name) if name == "defined" => {
                if should_pop_undef {
                    table.pop();
                }
                expand_defined(&mut stack, &mut table, &mut buffer, token, const_zero.clone(), const_one.clone())?;
            }
            Token::Identifier(name) => {
                let Some(symbol) = table.lookup(name) else {
                    buffer.push(token);
                    continue;
                };
                if !matches!(symbol, Symbol::Expanded(_)) && should_pop_undef {
                    table.pop();
                }
                match symbol {
                    Symbol::Object(obj) => {
                        if !obj.body.is_empty() {
                            push_tokens(&mut stack, &mut table, &obj.body, Some(name));
                        }
                    }
                    Symbol::Function(func) => {
                        let next_is_lparen = matches!(stack.last(), Some((t, _)) if t.is_punct("("));
                        if !next_is_lparen {
                            buffer.push(token);
                        } else {
                            let args = collect_arguments(&mut stack, &mut table, name)?;
                            if args.len() != func.params.len() {
                                return Err(HayrollError::UnbalancedInvocation(format!(
                                    "{} called with {} arguments, expected {}",
                                    name,
                                    args.len(),
                                    func.params.len()
                                )));
                            }
                            let expanded = expand_function_like_macro(&args, &func, symbol_table)?;
                            push_tokens(&mut stack, &mut table, &expanded, Some(name));
                        }
                    }
                    Symbol::Undefined(_) => buffer.push(const_zero.clone()),
                    Symbol::Expanded(_) => {
                        if should_pop_undef {
                            table.pop();
                        }
                        return Err(HayrollError::RecursiveExpansion(name.clone()));
                    }
                }
            }
            _ => {
                buffer.push(token);
                if should_pop_undef {
                    table.pop();
                }
            }
        }
    }

    Ok(buffer)
}

fn push_tokens(
    stack: &mut Vec<(Token, bool)>,
    table: &mut UndefStackSymbolTable,
    tokens: &[Token],
    expanded_name: Option<&str>,
) {
    let mut undef_bit = false;
    if let Some(name) = expanded_name {
        table.push_expanded(name);
        undef_bit = true;
    }
    for token in tokens.iter().rev() {
        stack.push((token.clone(), undef_bit));
        undef_bit = false;
    }
}

/// Looks forward past `defined` for `IDENT` or `(IDENT)` and replaces it
/// with 1 (defined, including function-like/in-progress expansions) or 0
/// (undefined). Unknown identifiers are left as `defined IDENT` so the
/// symbolic executor can symbolize them.
fn expand_defined(
    stack: &mut Vec<(Token, bool)>,
    table: &mut UndefStackSymbolTable,
    buffer: &mut Vec<Token>,
    defined_token: Token,
    const_zero: Token,
    const_one: Token,
) -> Result<()> {
    let Some((next, next_pop)) = stack.pop() else {
        buffer.push(defined_token);
        return Ok(());
    };

    let mut handle_identifier = |name: &str,
                                  pop_after: bool,
                                  left_paren: Option<Token>,
                                  buffer: &mut Vec<Token>,
                                  table: &mut UndefStackSymbolTable|
     -> bool {
        let replaced = match table.lookup(name) {
            Some(Symbol::Object(_)) | Some(Symbol::Function(_)) | Some(Symbol::Expanded(_)) => {
                buffer.push(const_one.clone());
                true
            }
            Some(Symbol::Undefined(_)) => {
                buffer.push(const_zero.clone());
                true
            }
            None => {
                buffer.push(defined_token.clone());
                if let Some(paren) = left_paren {
                    buffer.push(paren);
                }
                buffer.push(Token::Identifier(name.to_string()));
                false
            }
        };
        if pop_after {
            table.pop();
        }
        replaced
    };

    if let Token::Identifier(name) = &next {
        handle_identifier(name, next_pop, None, buffer, table);
        return Ok(());
    }

    if next.is_punct("(") {
        if next_pop {
            table.pop();
        }
        let Some((inner, inner_pop)) = stack.pop() else {
            return Ok(());
        };
        let Token::Identifier(inner_name) = &inner else {
            return Err(HayrollError::MalformedExpression(
                "expected an identifier inside defined(...)".to_string(),
            ));
        };
        let replaced = handle_identifier(inner_name, inner_pop, Some(next.clone()), buffer, table);

        let Some((close, close_pop)) = stack.pop() else {
            return Err(HayrollError::MalformedExpression(
                "unbalanced parenthesis in defined(...)".to_string(),
            ));
        };
        if !close.is_punct(")") {
            return Err(HayrollError::MalformedExpression(
                "unbalanced parenthesis in defined(...)".to_string(),
            ));
        }
        if !replaced {
            buffer.push(close);
        }
        if close_pop {
            table.pop();
        }
        return Ok(());
    }

    Err(HayrollError::MalformedExpression(
        "expected an identifier after defined".to_string(),
    ))
}

/// Pops a balanced `( arg, arg, ... )` off the stack (the `(` itself must
/// already be on top), splitting on top-level commas.
fn collect_arguments(
    stack: &mut Vec<(Token, bool)>,
    table: &mut UndefStackSymbolTable,
    name: &str,
) -> Result<Vec<Vec<Token>>> {
    let mut args: Vec<Vec<Token>> = vec![Vec::new()];
    let mut paren_depth = 0usize;
    loop {
        let Some((token, should_pop_undef)) = stack.pop() else {
            return Err(HayrollError::UnbalancedInvocation(name.to_string()));
        };
        if token.is_punct("(") {
            if paren_depth != 0 {
                args.last_mut().unwrap().push(token);
            }
            paren_depth += 1;
        } else if token.is_punct(")") {
            paren_depth -= 1;
            if paren_depth != 0 {
                args.last_mut().unwrap().push(token);
            }
        } else if paren_depth == 1 && token.is_punct(",") {
            args.push(Vec::new());
        } else {
            args.last_mut().unwrap().push(token);
        }
        if should_pop_undef {
            table.pop();
        }
        if paren_depth == 0 {
            break;
        }
    }
    // A macro invoked with zero arguments, e.g. `F()`, parses as one empty
    // argument by the loop above; that matches a zero-parameter macro.
    if args.len() == 1 && args[0].is_empty() {
        return Ok(Vec::new());
    }
    Ok(args)
}

fn expand_function_like_macro(
    args: &[Vec<Token>],
    func: &crate::symbol_table::FunctionSymbol,
    symbol_table: &SymbolTable,
) -> Result<Vec<Token>> {
    let mut arg_table = std::collections::HashMap::new();
    for (param, arg) in func.params.iter().zip(args.iter()) {
        let expanded_arg = expand_preproc_tokens(arg, symbol_table)?;
        arg_table.insert(param.clone(), expanded_arg);
    }

    let mut buffer = Vec::new();
    for token in &func.body {
        if let Token::Identifier(name) = token {
            if let Some(arg) = arg_table.get(name) {
                buffer.extend(arg.iter().cloned());
                continue;
            }
        }
        buffer.push(token.clone());
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol_table::{FunctionSymbol, ObjectSymbol, UndefinedSymbol};
    use crate::token::tokenize;

    #[test]
    fn object_like_macro_expands() {
        let table = SymbolTable::new();
        table.define(Symbol::Object(ObjectSymbol {
            name: "MAX_SIZE".into(),
            body: tokenize("100").unwrap(),
            def_site: None,
        }));
        let tokens = tokenize("MAX_SIZE").unwrap();
        let expanded = expand_preproc_tokens(&tokens, &table).unwrap();
        assert_eq!(expanded, tokenize("100").unwrap());
    }

    #[test]
    fn function_like_macro_substitutes_arguments() {
        let table = SymbolTable::new();
        table.define(Symbol::Function(FunctionSymbol {
            name: "ADD".into(),
            params: vec!["a".into(), "b".into()],
            variadic: false,
            body: tokenize("a + b").unwrap(),
            def_site: None,
        }));
        let tokens = tokenize("ADD(1, 2)").unwrap();
        let expanded = expand_preproc_tokens(&tokens, &table).unwrap();
        assert_eq!(expanded, tokenize("1 + 2").unwrap());
    }

    #[test]
    fn undefined_identifier_in_condition_becomes_zero() {
        let table = SymbolTable::new();
        table.define(Symbol::Undefined(UndefinedSymbol { name: "FOO".into(), def_site: None }));
        let tokens = tokenize("FOO").unwrap();
        let expanded = expand_preproc_tokens(&tokens, &table).unwrap();
        assert_eq!(expanded, tokenize("0").unwrap());
    }

    #[test]
    fn defined_on_an_object_macro_is_one() {
        let table = SymbolTable::new();
        table.define(Symbol::Object(ObjectSymbol {
            name: "FOO".into(),
            body: vec![],
            def_site: None,
        }));
        let tokens = tokenize("defined(FOO)").unwrap();
        let expanded = expand_preproc_tokens(&tokens, &table).unwrap();
        assert_eq!(expanded, tokenize("1").unwrap());
    }

    #[test]
    fn unknown_identifier_is_left_alone() {
        let table = SymbolTable::new();
        let tokens = tokenize("UNKNOWN").unwrap();
        let expanded = expand_preproc_tokens(&tokens, &table).unwrap();
        assert_eq!(expanded, tokenize("UNKNOWN").unwrap());
    }

    #[test]
    fn self_referencing_object_macro_errors() {
        let table = SymbolTable::new();
        table.define(Symbol::Object(ObjectSymbol {
            name: "A".into(),
            body: tokenize("A + 1").unwrap(),
            def_site: None,
        }));
        let tokens = tokenize("A").unwrap();
        assert!(expand_preproc_tokens(&tokens, &table).is_err());
    }
}
