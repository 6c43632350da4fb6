//! Small textbook grammars, shared by the tests and the command line tool.
//! All of them draw terminal codes from the same token kinds below.

use crate::grammar::{Grammar, GrammarBuilder, Symbol};

pub const ID: u32 = 0;
pub const PLUS: u32 = 1;
pub const MINUS: u32 = 2;
pub const STAR: u32 = 3;
pub const SLASH: u32 = 4;
pub const LPAREN: u32 = 5;
pub const RPAREN: u32 = 6;
pub const COMMA: u32 = 7;
pub const IF: u32 = 8;
pub const THEN: u32 = 9;
pub const ELSE: u32 = 10;
pub const OTHER: u32 = 11;
pub const A: u32 = 12;
pub const EQUALS: u32 = 13;

/// Names of every sample, in the order `by_name` knows them.
pub const NAMES: [&str; 6] = [
    "expression",
    "arithmetic",
    "list",
    "ambiguous",
    "dangling_else",
    "lalr_not_slr",
];

pub fn by_name(name: &str) -> Option<Grammar> {
    let grammar = match name {
        "expression" => expression(),
        "arithmetic" => arithmetic(),
        "list" => list(),
        "ambiguous" => ambiguous(),
        "dangling_else" => dangling_else(),
        "lalr_not_slr" => lalr_not_slr(),
        _ => return None,
    };
    Some(grammar)
}

fn finish(builder: GrammarBuilder, start: Symbol) -> Grammar {
    builder.build(start).expect("sample grammars are well formed")
}

/// E -> E + T | T ; T -> id
pub fn expression() -> Grammar {
    let mut g = GrammarBuilder::new();
    let e = g.nonterminal("E");
    let t = g.nonterminal("T");
    let id = g.terminal(ID, "id");
    let plus = g.terminal(PLUS, "+");

    g.rule(e, [e, plus, t]).rule(e, [t]).rule(t, [id]);
    finish(g, e)
}

/// E -> E + T | E - T | T ; T -> T * F | T / F | F ; F -> ( E ) | id
pub fn arithmetic() -> Grammar {
    let mut g = GrammarBuilder::new();
    let e = g.nonterminal("E");
    let t = g.nonterminal("T");
    let f = g.nonterminal("F");
    let id = g.terminal(ID, "id");
    let plus = g.terminal(PLUS, "+");
    let minus = g.terminal(MINUS, "-");
    let star = g.terminal(STAR, "*");
    let slash = g.terminal(SLASH, "/");
    let lparen = g.terminal(LPAREN, "(");
    let rparen = g.terminal(RPAREN, ")");

    g.rule(e, [e, plus, t])
        .rule(e, [e, minus, t])
        .rule(e, [t])
        .rule(t, [t, star, f])
        .rule(t, [t, slash, f])
        .rule(t, [f])
        .rule(f, [lparen, e, rparen])
        .rule(f, [id]);
    finish(g, e)
}

/// L -> id L' ; L' -> , id L' | ε
pub fn list() -> Grammar {
    let mut g = GrammarBuilder::new();
    let l = g.nonterminal("L");
    let tail = g.nonterminal("L'");
    let id = g.terminal(ID, "id");
    let comma = g.terminal(COMMA, ",");

    g.rule(l, [id, tail]).rule(tail, [comma, id, tail]).rule(tail, []);
    finish(g, l)
}

/// S -> a | a
pub fn ambiguous() -> Grammar {
    let mut g = GrammarBuilder::new();
    let s = g.nonterminal("S");
    let a = g.terminal(A, "a");

    g.rule(s, [a]).rule(s, [a]);
    finish(g, s)
}

/// S -> if E then S | if E then S else S | other ; E -> id
pub fn dangling_else() -> Grammar {
    let mut g = GrammarBuilder::new();
    let s = g.nonterminal("S");
    let e = g.nonterminal("E");
    let if_ = g.terminal(IF, "if");
    let then = g.terminal(THEN, "then");
    let else_ = g.terminal(ELSE, "else");
    let other = g.terminal(OTHER, "other");
    let id = g.terminal(ID, "id");

    g.rule(s, [if_, e, then, s])
        .rule(s, [if_, e, then, s, else_, s])
        .rule(s, [other])
        .rule(e, [id]);
    finish(g, s)
}

/// S -> L = R | R ; L -> * R | id ; R -> L
///
/// LALR(1) but not SLR(1): FOLLOW(R) contains `=`, so an SLR table would also
/// reduce R -> L on `=` in the state after L.
pub fn lalr_not_slr() -> Grammar {
    let mut g = GrammarBuilder::new();
    let s = g.nonterminal("S");
    let l = g.nonterminal("L");
    let r = g.nonterminal("R");
    let equals = g.terminal(EQUALS, "=");
    let star = g.terminal(STAR, "*");
    let id = g.terminal(ID, "id");

    g.rule(s, [l, equals, r])
        .rule(s, [r])
        .rule(l, [star, r])
        .rule(l, [id])
        .rule(r, [l]);
    finish(g, s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_name_resolves() {
        for name in NAMES {
            let grammar = by_name(name).unwrap();
            assert!(grammar.n_productions() > 1, "{}", name);
        }
        assert!(by_name("nope").is_none());
    }

    #[test]
    fn expression_production_order() {
        let grammar = expression();
        let rendered: Vec<String> = (0..grammar.n_productions())
            .map(|p| grammar.display_production(crate::grammar::ProdIdx::new(p)).to_string())
            .collect();
        assert_eq!(rendered, vec!["S' -> E", "E -> E + T", "E -> T", "T -> id"]);
    }
}
