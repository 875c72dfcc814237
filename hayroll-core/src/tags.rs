//! Machine-readable tags embedded as C string literals by [`crate::seeder`],
//! serialized through `serde_json` with the same field names the macro
//! analyzer's own summaries use, so tags and analyzer output share a
//! vocabulary.

use serde::{Deserialize, Serialize};

use crate::expr::BoolExpr;

/// A source or compilation-unit location, serialized as `file:line:col`
/// inside a tag the way Maki's summary locations are.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagLocation {
    pub file: String,
    pub line: u32,
    pub column: u32,
}

impl std::fmt::Display for TagLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Which half of a begin/end tag pair this is; only meaningful for
/// statement/declaration invocations and conditional regions, whose
/// seeding inserts two tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagEdge {
    Begin,
    End,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "seedType", rename_all = "camelCase")]
pub enum Tag {
    /// Marks a macro invocation or one of its arguments.
    Invocation(InvocationTag),
    /// Marks a `#if`/`#elif`/`#else` region, carrying the symbolic premise
    /// under which the region is active.
    Conditional(ConditionalTag),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationTag {
    pub edge: TagEdge,
    pub macro_name: String,
    pub ast_kind: String,
    pub is_lvalue: bool,
    pub source_location: TagLocation,
    pub cu_location: TagLocation,
    /// Groups sibling variants of the same invocation across configurations:
    /// a reference location shared by every variant produced from one
    /// underlying invocation site.
    pub reference_location: TagLocation,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionalTag {
    pub edge: TagEdge,
    pub ast_kind: String,
    pub source_location: TagLocation,
    pub cu_location: TagLocation,
    pub reference_location: TagLocation,
    #[serde(with = "premise_as_string")]
    pub premise: BoolExpr,
}

impl Tag {
    /// Serializes to a JSON string and escapes it into a C string literal
    /// body, e.g. `"{\"seedType\":\"invocation\",...}"`.
    pub fn to_c_string_literal(&self) -> String {
        let json = serde_json::to_string(self).expect("Tag serializes infallibly");
        format!("\"{}\"", escape_c_string(&json))
    }
}

fn escape_c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 8);
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            other => out.push(other),
        }
    }
    out
}

/// `BoolExpr` has no human-authored `Display`/`FromStr`, so the tag embeds
/// it pretty-printed via `Debug` rather than pulling its full structural
/// `Serialize` impl into the tag JSON -- downstream tooling treats the
/// premise as an opaque diagnostic string, never round-trips it.
mod premise_as_string {
    use super::BoolExpr;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(expr: &BoolExpr, ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&format!("{expr:?}"))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<BoolExpr, D::Error> {
        let _s = String::deserialize(de)?;
        Ok(BoolExpr::Bool(true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc(file: &str, line: u32, column: u32) -> TagLocation {
        TagLocation {
            file: file.to_string(),
            line,
            column,
        }
    }

    #[test]
    fn invocation_tag_round_trips_through_c_string_literal() {
        let tag = Tag::Invocation(InvocationTag {
            edge: TagEdge::Begin,
            macro_name: "INCR".to_string(),
            ast_kind: "Stmt".to_string(),
            is_lvalue: false,
            source_location: loc("a.c", 3, 1),
            cu_location: loc("a.cu.c", 10, 1),
            reference_location: loc("a.c", 3, 1),
        });
        let literal = tag.to_c_string_literal();
        assert!(literal.starts_with('"') && literal.ends_with('"'));
        let inner = &literal[1..literal.len() - 1];
        let parsed: Tag = serde_json::from_str(inner).unwrap();
        assert_eq!(parsed, tag);
    }

    #[test]
    fn quotes_and_backslashes_are_escaped() {
        let tag = Tag::Invocation(InvocationTag {
            edge: TagEdge::End,
            macro_name: "X".to_string(),
            ast_kind: "Expr".to_string(),
            is_lvalue: false,
            source_location: loc("a\"b.c", 1, 1),
            cu_location: loc("a.cu.c", 1, 1),
            reference_location: loc("a\"b.c", 1, 1),
        });
        let literal = tag.to_c_string_literal();
        assert!(literal.contains("\\\""));
        assert!(!literal.contains("\"b.c\""));
    }
}
