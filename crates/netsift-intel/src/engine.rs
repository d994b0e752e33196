//! The compiled token scan engine.
//!
//! Built once from a full indicator set; the compiled ruleset is immutable
//! for the life of the instance. To pick up new indicators, build a new
//! engine and swap it in.
//!
//! Term lookup structures:
//! - per-kind `HashMap` for exact token terms
//! - Aho-Corasick automaton over hostname values, with full-length equality
//!   verification (hostnames are matched case-insensitively)
//! - suffix list for wildcard hostname terms (`*.evil.com`)
//!
//! Per-stream match state lives inside the instance and follows the stream
//! contract: `reset()`, then `update()` per token in order, then the `end`
//! sentinel, then `hits()`.

use std::collections::HashMap;

use aho_corasick::AhoCorasick;

use crate::types::*;

type TermId = usize;

/// A pattern expression compiled down to interned term ids.
#[derive(Debug, Clone)]
enum Expr {
    Term(TermId),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
}

#[derive(Debug)]
struct CompiledRule {
    id: String,
    descriptor: IndicatorDescriptor,
    expr: Expr,
}

// ---------------------------------------------------------------------------
// ScanEngine
// ---------------------------------------------------------------------------

/// The compiled scan engine plus the per-stream state it drives.
///
/// One instance is exclusively owned by whichever context is feeding a
/// stream; `update` and `reset` take `&mut self` so two streams can never
/// interleave on the same instance.
#[derive(Debug)]
pub struct ScanEngine {
    rules: Vec<CompiledRule>,

    // -- Compiled term lookup --
    /// Exact terms, per kind: value -> term id.
    exact_terms: HashMap<TokenKind, HashMap<String, TermId>>,
    /// Lowercase hostname values used as Aho-Corasick patterns.
    hostname_patterns: Vec<String>,
    hostname_term_ids: Vec<TermId>,
    hostname_ac: Option<AhoCorasick>,
    /// Wildcard hostname suffixes (e.g. ".evil.com" for "*.evil.com").
    wildcard_hostnames: Vec<(String, TermId)>,

    // -- Per-stream state --
    seen: Vec<bool>,
    ended: bool,
    hits: Vec<Hit>,
}

impl ScanEngine {
    /// Compile a new engine from a set of indicator definitions.
    pub fn build(defs: Vec<IndicatorDef>) -> Self {
        let mut builder = TermInterner::default();
        let mut rules = Vec::with_capacity(defs.len());

        for def in defs {
            let expr = match &def.pattern {
                Some(pattern) => builder.compile(pattern),
                // No compound pattern: match on the descriptor's own term.
                None => Expr::Term(builder.intern(def.descriptor.kind, &def.descriptor.value)),
            };
            rules.push(CompiledRule {
                id: def.id,
                descriptor: def.descriptor,
                expr,
            });
        }

        let hostname_ac = if builder.hostname_patterns.is_empty() {
            None
        } else {
            AhoCorasick::builder()
                .ascii_case_insensitive(true)
                .build(&builder.hostname_patterns)
                .ok()
        };

        let term_count = builder.next_id;
        Self {
            rules,
            exact_terms: builder.exact_terms,
            hostname_patterns: builder.hostname_patterns,
            hostname_term_ids: builder.hostname_term_ids,
            hostname_ac,
            wildcard_hostnames: builder.wildcard_hostnames,
            seen: vec![false; term_count],
            ended: false,
            hits: Vec::new(),
        }
    }

    /// Clear per-stream match state. Must be called before feeding a new
    /// token stream. Does not alter the compiled ruleset.
    pub fn reset(&mut self) {
        self.seen.iter_mut().for_each(|s| *s = false);
        self.ended = false;
        self.hits.clear();
    }

    /// Feed one token. Total: never fails for any well-formed token.
    ///
    /// Feeding the `end` sentinel finalizes the stream: every rule is
    /// evaluated against the seen-term set and hits are recorded. Further
    /// tokens after the sentinel are ignored until the next `reset()`.
    pub fn update(&mut self, token: &Token) {
        if self.ended {
            return;
        }
        if token.kind == TokenKind::End {
            self.finalize();
            return;
        }

        match token.kind {
            TokenKind::Hostname => {
                let lower = token.value.to_lowercase();
                if let Some(ac) = &self.hostname_ac {
                    // Exact match wanted, not substring, so verify length.
                    for mat in ac.find_overlapping_iter(&lower) {
                        let pattern_idx = mat.pattern().as_usize();
                        if self.hostname_patterns[pattern_idx] == lower {
                            self.seen[self.hostname_term_ids[pattern_idx]] = true;
                        }
                    }
                }
                for (suffix, term_id) in &self.wildcard_hostnames {
                    if lower.ends_with(suffix.as_str()) && lower.len() > suffix.len() {
                        self.seen[*term_id] = true;
                    }
                }
            }
            _ => {
                if let Some(values) = self.exact_terms.get(&token.kind) {
                    if let Some(&term_id) = values.get(&token.value) {
                        self.seen[term_id] = true;
                    }
                }
            }
        }
    }

    /// All hits since the last `reset()`. Idempotent: calling twice without
    /// an intervening `reset()` yields the same result.
    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    /// Number of compiled indicators.
    pub fn indicator_count(&self) -> usize {
        self.rules.len()
    }

    fn finalize(&mut self) {
        self.ended = true;
        for rule in &self.rules {
            if eval(&rule.expr, &self.seen) {
                self.hits.push(Hit {
                    id: rule.id.clone(),
                    descriptor: rule.descriptor.clone(),
                });
            }
        }
    }
}

fn eval(expr: &Expr, seen: &[bool]) -> bool {
    match expr {
        Expr::Term(id) => seen[*id],
        Expr::And(children) => children.iter().all(|c| eval(c, seen)),
        Expr::Or(children) => children.iter().any(|c| eval(c, seen)),
        Expr::Not(child) => !eval(child, seen),
    }
}

// ---------------------------------------------------------------------------
// Term interning
// ---------------------------------------------------------------------------

/// Assigns dense term ids to unique (kind, value) leaves during compilation
/// and routes each term to its lookup structure.
#[derive(Default)]
struct TermInterner {
    ids: HashMap<(TokenKind, String), TermId>,
    exact_terms: HashMap<TokenKind, HashMap<String, TermId>>,
    hostname_patterns: Vec<String>,
    hostname_term_ids: Vec<TermId>,
    wildcard_hostnames: Vec<(String, TermId)>,
    next_id: TermId,
}

impl TermInterner {
    fn compile(&mut self, pattern: &Pattern) -> Expr {
        match pattern {
            Pattern::Match { kind, value } => Expr::Term(self.intern(*kind, value)),
            Pattern::And { and } => Expr::And(and.iter().map(|p| self.compile(p)).collect()),
            Pattern::Or { or } => Expr::Or(or.iter().map(|p| self.compile(p)).collect()),
            Pattern::Not { not } => Expr::Not(Box::new(self.compile(not))),
        }
    }

    fn intern(&mut self, kind: TokenKind, value: &str) -> TermId {
        // Hostnames compare case-insensitively.
        let norm = if kind == TokenKind::Hostname {
            value.to_lowercase()
        } else {
            value.to_string()
        };

        if let Some(&id) = self.ids.get(&(kind, norm.clone())) {
            return id;
        }
        let id = self.next_id;
        self.next_id += 1;
        self.ids.insert((kind, norm.clone()), id);

        if kind == TokenKind::Hostname {
            if let Some(suffix) = norm.strip_prefix('*') {
                // "*.evil.com" -> suffix ".evil.com"
                self.wildcard_hostnames.push((suffix.to_string(), id));
            } else {
                self.hostname_patterns.push(norm);
                self.hostname_term_ids.push(id);
            }
        } else {
            self.exact_terms.entry(kind).or_default().insert(norm, id);
        }
        id
    }
}
