//! Declaration scanning for the reference analyzer.
//!
//! Tokenizes a C#-like source surface (skipping comments and string
//! literals), extracts type-like declarations — class, interface, delegate,
//! enum, struct — with their nesting structure, and resolves a declaration
//! to a [`Symbol`] carrying its qualified name chain. Also provides the
//! identifier-occurrence scan the rename operation is built on.

use crate::workspace::{Document, DocumentId};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Structural kind of a type-like declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeclarationKind {
    Class,
    Interface,
    Delegate,
    Enum,
    Struct,
}

impl DeclarationKind {
    fn from_keyword(word: &str) -> Option<DeclarationKind> {
        match word {
            "class" => Some(DeclarationKind::Class),
            "interface" => Some(DeclarationKind::Interface),
            "delegate" => Some(DeclarationKind::Delegate),
            "enum" => Some(DeclarationKind::Enum),
            "struct" => Some(DeclarationKind::Struct),
            _ => None,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            DeclarationKind::Class => "class",
            DeclarationKind::Interface => "interface",
            DeclarationKind::Delegate => "delegate",
            DeclarationKind::Enum => "enum",
            DeclarationKind::Struct => "struct",
        }
    }
}

/// A declaration found in a document, with nested declarations in
/// document order.
#[derive(Debug, Clone, Serialize)]
pub struct Declaration {
    pub kind: DeclarationKind,
    pub name: String,
    /// Byte offset of the name token.
    pub name_offset: usize,
    /// Line number, 1-indexed.
    pub line: usize,
    /// Column number, 1-indexed.
    pub column: usize,
    pub children: Vec<Declaration>,
}

/// The semantically resolved identity of a declaration: the owning project,
/// the declaring document, and the qualified name chain from the outermost
/// enclosing declaration down to the declaration itself.
#[derive(Debug, Clone)]
pub struct Symbol {
    pub project: PathBuf,
    pub document: DocumentId,
    pub qualified: Vec<String>,
    pub kind: DeclarationKind,
}

impl Symbol {
    /// The simple (unqualified) name.
    pub fn name(&self) -> &str {
        self.qualified.last().map(String::as_str).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Ident,
    Punct,
}

#[derive(Debug, Clone, Copy)]
struct Token<'a> {
    kind: TokenKind,
    text: &'a str,
    start: usize,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Splits source into identifier and punctuation tokens, skipping
/// whitespace, line/block comments, and string/char literals.
fn tokenize(source: &str) -> Vec<Token<'_>> {
    let chars: Vec<(usize, char)> = source.char_indices().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let (offset, c) = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '/' && source[offset..].starts_with("//") {
            while i < chars.len() && chars[i].1 != '\n' {
                i += 1;
            }
        } else if c == '/' && source[offset..].starts_with("/*") {
            i += 2;
            while i < chars.len() {
                if chars[i].1 == '*' && i + 1 < chars.len() && chars[i + 1].1 == '/' {
                    i += 2;
                    break;
                }
                i += 1;
            }
        } else if c == '"' || c == '\'' {
            let quote = c;
            i += 1;
            while i < chars.len() {
                match chars[i].1 {
                    '\\' => i += 2,
                    q if q == quote => {
                        i += 1;
                        break;
                    }
                    _ => i += 1,
                }
            }
        } else if is_ident_start(c) {
            while i < chars.len() && is_ident_continue(chars[i].1) {
                i += 1;
            }
            let end = chars.get(i).map(|&(o, _)| o).unwrap_or(source.len());
            tokens.push(Token {
                kind: TokenKind::Ident,
                text: &source[offset..end],
                start: offset,
            });
        } else {
            tokens.push(Token {
                kind: TokenKind::Punct,
                text: &source[offset..offset + c.len_utf8()],
                start: offset,
            });
            i += 1;
        }
    }

    tokens
}

/// Extracts the declaration tree of `source` in document order.
///
/// Nesting follows brace depth: a declaration whose header appears inside
/// another declaration's body becomes its child. Delegates are leaves (no
/// body); their name is the identifier preceding the parameter list, with
/// generic parameter lists skipped.
pub fn parse_declarations(source: &str) -> Vec<Declaration> {
    let tokens = tokenize(source);
    let mut roots: Vec<Declaration> = Vec::new();
    // Open declarations paired with the depth their body opened at.
    let mut stack: Vec<(Declaration, usize)> = Vec::new();
    let mut pending: Option<Declaration> = None;
    let mut depth = 0usize;
    let mut i = 0;

    while i < tokens.len() {
        let token = tokens[i];
        match token.kind {
            TokenKind::Ident => {
                if let Some(kind) = DeclarationKind::from_keyword(token.text) {
                    if kind == DeclarationKind::Delegate {
                        if let Some((decl, consumed)) = parse_delegate(source, &tokens[i + 1..]) {
                            attach(&mut roots, &mut stack, decl);
                            i += consumed;
                        }
                    } else if let Some(name) = tokens.get(i + 1).filter(|t| {
                        t.kind == TokenKind::Ident
                            && DeclarationKind::from_keyword(t.text).is_none()
                    }) {
                        let (line, column) = offset_to_line_col(source, name.start);
                        pending = Some(Declaration {
                            kind,
                            name: name.text.to_string(),
                            name_offset: name.start,
                            line,
                            column,
                            children: Vec::new(),
                        });
                        i += 1;
                    }
                }
            }
            TokenKind::Punct => match token.text {
                "{" => {
                    depth += 1;
                    if let Some(decl) = pending.take() {
                        stack.push((decl, depth));
                    }
                }
                "}" => {
                    depth = depth.saturating_sub(1);
                    while stack.last().is_some_and(|(_, d)| *d > depth) {
                        if let Some((decl, _)) = stack.pop() {
                            attach(&mut roots, &mut stack, decl);
                        }
                    }
                }
                ";" => {
                    // A header with no body (e.g. a forward-looking stub)
                    // never opened; discard it.
                    pending = None;
                }
                _ => {}
            },
        }
        i += 1;
    }

    // Unbalanced input: close whatever is still open.
    while let Some((decl, _)) = stack.pop() {
        attach(&mut roots, &mut stack, decl);
    }

    roots
}

fn attach(roots: &mut Vec<Declaration>, stack: &mut [(Declaration, usize)], decl: Declaration) {
    match stack.last_mut() {
        Some((parent, _)) => parent.children.push(decl),
        None => roots.push(decl),
    }
}

/// Parses a delegate header following the `delegate` keyword. Returns the
/// declaration and the number of tokens consumed past the keyword.
fn parse_delegate<'a>(source: &str, rest: &[Token<'a>]) -> Option<(Declaration, usize)> {
    let mut last_ident: Option<Token<'a>> = None;
    let mut i = 0;
    while i < rest.len() {
        let token = rest[i];
        match (token.kind, token.text) {
            (TokenKind::Punct, "(") => break,
            (TokenKind::Punct, "<") => {
                // Skip a generic parameter list so `delegate void Foo<T>(..)`
                // names Foo, not T.
                let mut nesting = 1;
                i += 1;
                while i < rest.len() && nesting > 0 {
                    match rest[i].text {
                        "<" => nesting += 1,
                        ">" => nesting -= 1,
                        _ => {}
                    }
                    i += 1;
                }
                continue;
            }
            (TokenKind::Punct, ";" | "{") => return None,
            (TokenKind::Ident, _) => last_ident = Some(token),
            _ => {}
        }
        i += 1;
    }

    let name = last_ident?;
    let (line, column) = offset_to_line_col(source, name.start);
    Some((
        Declaration {
            kind: DeclarationKind::Delegate,
            name: name.text.to_string(),
            name_offset: name.start,
            line,
            column,
            children: Vec::new(),
        },
        i,
    ))
}

/// First declaration in preorder (document order, outer before inner)
/// whose name equals `name`.
pub fn find_declaration<'a>(declarations: &'a [Declaration], name: &str) -> Option<&'a Declaration> {
    for declaration in declarations {
        if declaration.name == name {
            return Some(declaration);
        }
        if let Some(found) = find_declaration(&declaration.children, name) {
            return Some(found);
        }
    }
    None
}

/// Walks a qualifier chain: each segment names a declaration nested in the
/// previous one, starting at the top level.
pub fn find_qualified<'a>(
    declarations: &'a [Declaration],
    chain: &[&str],
) -> Option<&'a Declaration> {
    let (first, rest) = chain.split_first()?;
    let mut current = declarations.iter().find(|d| d.name == *first)?;
    for segment in rest {
        current = current.children.iter().find(|d| d.name == *segment)?;
    }
    Some(current)
}

/// Resolves a declaration to its bound [`Symbol`], reconstructing the
/// qualified chain from the document's declaration tree. Returns `None`
/// when the declaration is not part of the tree.
pub fn resolve_symbol(
    project: &Path,
    document: &Document,
    declarations: &[Declaration],
    target: &Declaration,
) -> Option<Symbol> {
    let mut qualified = Vec::new();
    if !path_to(declarations, target, &mut qualified) {
        return None;
    }
    Some(Symbol {
        project: project.to_path_buf(),
        document: document.id(),
        qualified,
        kind: target.kind,
    })
}

fn path_to(level: &[Declaration], target: &Declaration, acc: &mut Vec<String>) -> bool {
    for declaration in level {
        acc.push(declaration.name.clone());
        if std::ptr::eq(declaration, target) {
            return true;
        }
        if path_to(&declaration.children, target, acc) {
            return true;
        }
        acc.pop();
    }
    false
}

/// Byte spans of every identifier token equal to `name`. Occurrences inside
/// comments and string literals are not identifiers and never match.
pub fn identifier_occurrences(source: &str, name: &str) -> Vec<(usize, usize)> {
    tokenize(source)
        .into_iter()
        .filter(|t| t.kind == TokenKind::Ident && t.text == name)
        .map(|t| (t.start, t.start + t.text.len()))
        .collect()
}

fn offset_to_line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut col = 1;
    for (i, c) in source.char_indices() {
        if i >= offset {
            break;
        }
        if c == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}

/// Renders a declaration tree as an indented listing, two spaces per
/// nesting level.
pub fn format_declaration_tree(declarations: &[Declaration]) -> String {
    fn walk(declarations: &[Declaration], depth: usize, out: &mut String) {
        for declaration in declarations {
            out.push_str(&"  ".repeat(depth));
            out.push_str(declaration.kind.keyword());
            out.push(' ');
            out.push_str(&declaration.name);
            out.push('\n');
            walk(&declaration.children, depth + 1, out);
        }
    }
    let mut out = String::new();
    walk(declarations, 0, &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(declarations: &[Declaration]) -> Vec<&str> {
        declarations.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn extracts_top_level_declarations_in_order() {
        let source = r#"
            public class Foo { }
            interface IBar { }
            enum Color { Red, Green }
            struct Point { int x; }
        "#;
        let decls = parse_declarations(source);
        assert_eq!(names(&decls), vec!["Foo", "IBar", "Color", "Point"]);
        assert_eq!(decls[0].kind, DeclarationKind::Class);
        assert_eq!(decls[1].kind, DeclarationKind::Interface);
        assert_eq!(decls[2].kind, DeclarationKind::Enum);
        assert_eq!(decls[3].kind, DeclarationKind::Struct);
    }

    #[test]
    fn nests_inner_declarations() {
        let source = "class Foo { class Nested { enum Deep { A } } class Other { } }";
        let decls = parse_declarations(source);
        assert_eq!(names(&decls), vec!["Foo"]);
        assert_eq!(names(&decls[0].children), vec!["Nested", "Other"]);
        assert_eq!(names(&decls[0].children[0].children), vec!["Deep"]);
    }

    #[test]
    fn enum_members_are_not_declarations() {
        let source = "enum Color { Red, Green, Blue }";
        let decls = parse_declarations(source);
        assert_eq!(names(&decls), vec!["Color"]);
        assert!(decls[0].children.is_empty());
    }

    #[test]
    fn parses_delegate_name_before_parameter_list() {
        let source = "delegate int Handler(string message);";
        let decls = parse_declarations(source);
        assert_eq!(names(&decls), vec!["Handler"]);
        assert_eq!(decls[0].kind, DeclarationKind::Delegate);
    }

    #[test]
    fn parses_generic_delegate_name() {
        let source = "public delegate TResult Selector<T, TResult>(T item);";
        let decls = parse_declarations(source);
        assert_eq!(names(&decls), vec!["Selector"]);
    }

    #[test]
    fn generic_class_name_excludes_type_parameters() {
        let source = "class Container<T> : IEnumerable<T> { }";
        let decls = parse_declarations(source);
        assert_eq!(names(&decls), vec!["Container"]);
    }

    #[test]
    fn ignores_keywords_in_comments_and_strings() {
        let source = r#"
            // class Fake { }
            /* struct AlsoFake { } */
            class Real {
                string s = "class InString";
                char c = '{';
            }
        "#;
        let decls = parse_declarations(source);
        assert_eq!(names(&decls), vec!["Real"]);
        assert!(decls[0].children.is_empty());
    }

    #[test]
    fn generic_constraint_class_keyword_is_not_a_declaration() {
        let source = "class Wrapper<T> where T : class { }";
        let decls = parse_declarations(source);
        assert_eq!(names(&decls), vec!["Wrapper"]);
    }

    #[test]
    fn declarations_inside_method_bodies_attach_to_the_type() {
        let source = "class Foo { void M() { class Local { } } }";
        let decls = parse_declarations(source);
        assert_eq!(names(&decls), vec!["Foo"]);
        assert_eq!(names(&decls[0].children), vec!["Local"]);
    }

    #[test]
    fn records_line_and_column_of_name() {
        let source = "class A { }\n  class B { }";
        let decls = parse_declarations(source);
        assert_eq!((decls[0].line, decls[0].column), (1, 7));
        assert_eq!((decls[1].line, decls[1].column), (2, 9));
    }

    #[test]
    fn find_declaration_prefers_document_order() {
        let source = "class Outer { class Foo { } } class Foo { }";
        let decls = parse_declarations(source);
        let found = find_declaration(&decls, "Foo").unwrap();
        // The nested Foo comes first in preorder.
        assert_eq!(found.name_offset, decls[0].children[0].name_offset);
    }

    #[test]
    fn find_declaration_missing_name_returns_none() {
        let decls = parse_declarations("class Foo { }");
        assert!(find_declaration(&decls, "Bar").is_none());
    }

    #[test]
    fn find_qualified_walks_nesting_chain() {
        let source = "class Foo { class Bar { struct Baz { } } }";
        let decls = parse_declarations(source);
        let found = find_qualified(&decls, &["Foo", "Bar", "Baz"]).unwrap();
        assert_eq!(found.name, "Baz");
        assert_eq!(found.kind, DeclarationKind::Struct);
        assert!(find_qualified(&decls, &["Foo", "Baz"]).is_none());
        assert!(find_qualified(&decls, &[]).is_none());
    }

    #[test]
    fn identifier_occurrences_match_whole_identifiers_only() {
        let source = "class Foo { Foo MakeFoo() { return new Foo(); } FooBar other; }";
        let occurrences = identifier_occurrences(source, "Foo");
        assert_eq!(occurrences.len(), 3);
        for (start, end) in occurrences {
            assert_eq!(&source[start..end], "Foo");
        }
    }

    #[test]
    fn identifier_occurrences_skip_comments_and_strings() {
        let source = "// Foo is old\nclass Foo { string s = \"Foo\"; }";
        let occurrences = identifier_occurrences(source, "Foo");
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].0, source.find("class Foo").unwrap() + 6);
    }

    #[test]
    fn formats_declaration_tree() {
        let source = "class Foo { class Nested { } }\nenum Color { Red }";
        let tree = format_declaration_tree(&parse_declarations(source));
        insta::assert_snapshot!(tree, @r"
        class Foo
          class Nested
        enum Color
        ");
    }
}
