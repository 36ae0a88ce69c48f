//! Selector text tokenizer.
//!
//! Accepts `ns|el#id.class[attr=value]:pseudo(arg)::suffix` compounds joined by
//! whitespace (descendant), `>`, `+` and `~`. Parsing never fails: characters
//! that start no known token are skipped, and `&` (the parent reference of
//! nested style sheets) is ignored because nesting is expressed by the tree.

use crate::normalize::normalize;
use crate::{Combinator, Selector, SelectorItem, SelectorPart};
use core::mem::take;
use log::trace;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Internal tokenizer token kinds.
enum Tok {
    /// `>`, `+` or `~`.
    Combinator(Combinator),
    /// Whitespace between compounds.
    Whitespace,
    /// `name|` prefix.
    Namespace(String),
    /// Element name or `*`.
    Element(String),
    /// `#name`.
    Id(String),
    /// `.name`.
    Class(String),
    /// `:name`, `:name(args)` or `[...]`, verbatim.
    Qualifier(String),
    /// `::name`, verbatim.
    Suffix(String),
}

/// Tokenizer over selector text.
struct SelectorTokenizer<'src> {
    /// Underlying characters of the selector.
    input: Vec<char>,
    /// Current cursor index into `input`.
    index: usize,
    /// Original text, for log lines.
    source: &'src str,
}

impl<'src> SelectorTokenizer<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            input: source.chars().collect(),
            index: 0,
            source,
        }
    }

    fn peek(&self) -> Option<char> {
        self.input.get(self.index).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.input.get(self.index + offset).copied()
    }

    fn bump(&mut self) {
        self.index = self.index.saturating_add(1);
    }

    /// Return the next selector token, if any.
    fn next_token(&mut self) -> Option<Tok> {
        loop {
            let current = self.peek()?;
            let token = match current {
                ws if ws.is_whitespace() => {
                    while self.peek().is_some_and(char::is_whitespace) {
                        self.bump();
                    }
                    Tok::Whitespace
                }
                '>' | '+' | '~' => {
                    self.bump();
                    match Combinator::from_symbol(current) {
                        Some(combinator) => Tok::Combinator(combinator),
                        None => continue,
                    }
                }
                '#' => {
                    self.bump();
                    Tok::Id(self.consume_ident())
                }
                '.' => {
                    self.bump();
                    Tok::Class(self.consume_ident())
                }
                '[' => Tok::Qualifier(self.consume_bracketed()),
                ':' if self.peek_at(1) == Some(':') => Tok::Suffix(self.consume_pseudo()),
                ':' => Tok::Qualifier(self.consume_pseudo()),
                '*' => {
                    self.bump();
                    self.namespace_or_element("*".to_owned())
                }
                '|' => {
                    // `|el`: element in no namespace.
                    self.bump();
                    Tok::Namespace(String::new())
                }
                ident if is_ident_char(ident) => {
                    let name = self.consume_ident();
                    self.namespace_or_element(name)
                }
                skipped => {
                    trace!("Skipping {skipped:?} in selector {:?}", self.source);
                    self.bump();
                    continue;
                }
            };
            return Some(token);
        }
    }

    /// `name|` is a namespace prefix, anything else an element name.
    fn namespace_or_element(&mut self, name: String) -> Tok {
        if self.peek() == Some('|') {
            self.bump();
            Tok::Namespace(name)
        } else {
            Tok::Element(name)
        }
    }

    /// Consume an identifier: alphanumerics, `-`, `_`, non-ASCII, and `\` escapes.
    fn consume_ident(&mut self) -> String {
        let mut out = String::new();
        while let Some(current) = self.peek() {
            if current == '\\' {
                self.bump();
                if let Some(escaped) = self.peek() {
                    out.push(escaped);
                    self.bump();
                }
            } else if is_ident_char(current) {
                out.push(current);
                self.bump();
            } else {
                break;
            }
        }
        out
    }

    /// Consume `[...]` verbatim, honouring quotes.
    fn consume_bracketed(&mut self) -> String {
        let mut out = String::new();
        let mut quote: Option<char> = None;
        while let Some(current) = self.peek() {
            out.push(current);
            self.bump();
            match (quote, current) {
                (Some(open), close) if open == close => quote = None,
                (None, '"' | '\'') => quote = Some(current),
                (None, ']') => break,
                _ => {}
            }
        }
        out
    }

    /// Consume `:name`, `::name` and an optional balanced `(...)` argument.
    fn consume_pseudo(&mut self) -> String {
        let mut out = String::new();
        while self.peek() == Some(':') {
            out.push(':');
            self.bump();
        }
        out.push_str(&self.consume_ident());
        if self.peek() == Some('(') {
            let mut depth = 0_usize;
            while let Some(current) = self.peek() {
                out.push(current);
                self.bump();
                match current {
                    '(' => depth += 1,
                    ')' => {
                        depth = depth.saturating_sub(1);
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
            }
        }
        out
    }
}

fn is_ident_char(current: char) -> bool {
    current.is_alphanumeric() || current == '-' || current == '_' || !current.is_ascii()
}

/// Parse selector text into a normalized [`Selector`].
pub fn parse_selector(input: &str) -> Selector {
    let mut tokens = SelectorTokenizer::new(input);
    let mut items: Vec<SelectorItem> = Vec::new();
    let mut current = SelectorPart::new();

    while let Some(token) = tokens.next_token() {
        match token {
            Tok::Whitespace => {
                if !current.is_empty() {
                    items.push(SelectorItem::Part(take(&mut current)));
                }
            }
            Tok::Combinator(combinator) => {
                if !current.is_empty() {
                    items.push(SelectorItem::Part(take(&mut current)));
                }
                items.push(SelectorItem::Combinator(combinator));
            }
            Tok::Namespace(namespace) => current.namespace = Some(namespace),
            Tok::Element(element) => current.element = Some(element),
            Tok::Id(id) => current.id = Some(id),
            Tok::Class(class) => current.classes.push(class),
            Tok::Qualifier(qualifier) => current.qualifiers.push(qualifier),
            Tok::Suffix(suffix) => current.suffix = Some(suffix),
        }
    }
    if !current.is_empty() {
        items.push(SelectorItem::Part(current));
    }

    normalize(&Selector::new(items))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(selector: &Selector) -> Vec<SelectorPart> {
        selector
            .items()
            .iter()
            .filter_map(SelectorItem::as_part)
            .cloned()
            .collect()
    }

    #[test]
    fn parses_compound_fields() {
        let selector = parse_selector("svg|use#icon.b.a[href='#x']:hover::after");
        assert_eq!(
            parts(&selector),
            vec![
                SelectorPart::element("use")
                    .with_namespace("svg")
                    .with_id("icon")
                    .with_class("a")
                    .with_class("b")
                    .with_qualifier(":hover")
                    .with_qualifier("[href='#x']")
                    .with_suffix("::after")
            ]
        );
    }

    #[test]
    fn parses_combinators_and_descendants() {
        let selector = parse_selector("ul  > li a ~ span+em");
        let rendered = selector.to_string();
        assert_eq!(rendered, "ul > li a ~ span + em");
    }

    #[test]
    fn pseudo_arguments_are_balanced() {
        let selector = parse_selector("li:not(.a, :is(.b))");
        assert_eq!(
            parts(&selector),
            vec![SelectorPart::element("li").with_qualifier(":not(.a, :is(.b))")]
        );
    }

    #[test]
    fn malformed_text_degrades_to_empty() {
        assert!(parse_selector("").is_empty());
        assert!(parse_selector("   ").is_empty());
        assert!(parse_selector("&").is_empty());
        assert!(parse_selector("$%").is_empty());
        assert_eq!(parse_selector(">").to_string(), "> *");
    }

    #[test]
    fn escapes_are_kept_in_names() {
        let selector = parse_selector(".md\\:flex");
        assert_eq!(parts(&selector), vec![SelectorPart::class("md:flex")]);
    }
}
