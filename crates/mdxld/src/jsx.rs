//! JSX tag scanning for component embeds.
//!
//! Splits raw HTML/JSX text such as `<Video src="./intro.mp4" autoplay />` into
//! opening tags, closing tags, raw markup and text. Tags are matched by the
//! tree builder, which may see an opening tag and its closing tag in
//! different markdown blocks.

use serde::Serialize;

/// An attribute on a component tag.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

/// An attribute value from JSX.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AttributeValue {
    /// String literal: src="./a.png"
    String(String),
    /// Boolean (presence): autoplay
    Boolean(bool),
    /// Expression: data={items}
    Expression(String),
}

impl AttributeValue {
    /// Get as string if it's a string literal.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttributeValue::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Look up an attribute by name.
pub fn attribute<'a>(attributes: &'a [Attribute], name: &str) -> Option<&'a AttributeValue> {
    attributes.iter().find(|a| a.name == name).map(|a| &a.value)
}

/// A lexical piece of HTML/JSX text. Offsets are byte offsets into the input.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Open {
        name: String,
        attributes: Vec<Attribute>,
        self_closing: bool,
        offset: usize,
    },
    Close {
        name: String,
        offset: usize,
    },
    /// Comments, doctypes and processing instructions
    Raw { value: String, offset: usize },
    Text { value: String, offset: usize },
}

/// Tokenize HTML/JSX text.
pub fn scan(source: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while let Some(rel) = source[pos..].find('<') {
        let lt = pos + rel;
        let parsed = parse_raw(source, lt)
            .or_else(|| parse_close(source, lt))
            .or_else(|| parse_open(source, lt));

        match parsed {
            Some((token, end)) => {
                push_text(&mut tokens, source, text_start, lt);
                tokens.push(token);
                pos = end;
                text_start = end;
            }
            None => pos = lt + 1,
        }
    }
    push_text(&mut tokens, source, text_start, source.len());

    tokens
}

fn push_text(tokens: &mut Vec<Token>, source: &str, start: usize, end: usize) {
    if start < end {
        tokens.push(Token::Text {
            value: source[start..end].to_string(),
            offset: start,
        });
    }
}

/// `<!-- ... -->`, `<!DOCTYPE ...>`, `<? ... ?>`
fn parse_raw(source: &str, lt: usize) -> Option<(Token, usize)> {
    let rest = &source[lt..];
    let terminator = if rest.starts_with("<!--") {
        "-->"
    } else if rest.starts_with("<!") || rest.starts_with("<?") {
        ">"
    } else {
        return None;
    };

    let end = rest[2..]
        .find(terminator)
        .map(|i| lt + 2 + i + terminator.len())
        .unwrap_or(source.len());

    Some((
        Token::Raw {
            value: source[lt..end].to_string(),
            offset: lt,
        },
        end,
    ))
}

/// `</Name>` or the `</>` fragment close.
fn parse_close(source: &str, lt: usize) -> Option<(Token, usize)> {
    let rest = source[lt..].strip_prefix("</")?;
    let name_len = tag_name_len(rest);
    let after = rest[name_len..].trim_start();
    if !after.starts_with('>') {
        return None;
    }
    let end = source.len() - after.len() + 1;

    Some((
        Token::Close {
            name: rest[..name_len].to_string(),
            offset: lt,
        },
        end,
    ))
}

/// `<Name attr="v" flag expr={x}>` or `<Name ... />`.
fn parse_open(source: &str, lt: usize) -> Option<(Token, usize)> {
    let rest = &source[lt + 1..];
    let first = rest.chars().next()?;
    if !first.is_ascii_alphabetic() && first != '>' {
        return None;
    }

    let name_len = tag_name_len(rest);
    let name = rest[..name_len].to_string();
    let mut cursor = Cursor::new(&rest[name_len..]);
    let mut attributes = Vec::new();

    loop {
        cursor.skip_whitespace();
        match cursor.peek()? {
            '>' => {
                cursor.bump();
                break;
            }
            '/' => {
                cursor.bump();
                cursor.skip_whitespace();
                if cursor.peek()? != '>' {
                    return None;
                }
                cursor.bump();
                let end = lt + 1 + name_len + cursor.pos;
                return Some((open(name, attributes, true, lt), end));
            }
            '{' => {
                // Spread attributes: {...props}
                cursor.balanced_braces()?;
            }
            c if is_attribute_start(c) => attributes.push(cursor.attribute()?),
            _ => return None,
        }
    }

    let end = lt + 1 + name_len + cursor.pos;
    Some((open(name, attributes, false, lt), end))
}

fn open(name: String, attributes: Vec<Attribute>, self_closing: bool, offset: usize) -> Token {
    Token::Open {
        name,
        attributes,
        self_closing,
        offset,
    }
}

fn tag_name_len(s: &str) -> usize {
    s.char_indices()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-' | '_')))
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

fn is_attribute_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':' || c == '@'
}

/// Byte cursor over the inside of a tag.
struct Cursor<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.src[start..self.pos]
    }

    fn attribute(&mut self) -> Option<Attribute> {
        let name = self
            .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.' | '@'))
            .to_string();

        let save = self.pos;
        self.skip_whitespace();
        if self.peek() != Some('=') {
            self.pos = save;
            return Some(Attribute {
                name,
                value: AttributeValue::Boolean(true),
            });
        }
        self.bump();
        self.skip_whitespace();

        let value = match self.peek()? {
            quote @ ('"' | '\'') => {
                self.bump();
                let value = self.take_while(|c| c != quote).to_string();
                if self.peek() != Some(quote) {
                    return None;
                }
                self.bump();
                AttributeValue::String(value)
            }
            '{' => {
                let inner = self.balanced_braces()?;
                AttributeValue::Expression(inner.trim().to_string())
            }
            _ => {
                let value = self.take_while(|c| !c.is_whitespace() && !matches!(c, '>' | '/'));
                if value.is_empty() {
                    return None;
                }
                AttributeValue::String(value.to_string())
            }
        };

        Some(Attribute { name, value })
    }

    /// Consume `{ ... }` honoring nesting and string literals; returns the inside.
    fn balanced_braces(&mut self) -> Option<&'a str> {
        let start = self.pos;
        let mut depth = 0usize;
        let mut quote: Option<char> = None;

        while let Some(c) = self.peek() {
            self.bump();
            match quote {
                Some(_) if c == '\\' => self.bump(),
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None => match c {
                    '"' | '\'' | '`' => quote = Some(c),
                    '{' => depth += 1,
                    '}' => {
                        depth -= 1;
                        if depth == 0 {
                            return Some(&self.src[start + 1..self.pos - 1]);
                        }
                    }
                    _ => {}
                },
            }
        }

        None
    }
}
