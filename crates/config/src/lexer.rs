use std::path::{Path, PathBuf};

use crate::error::Error;
use crate::fs::FileLoader;

const MAX_INCLUDE_DEPTH: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Word(String),
    Str(String),
    LBrace,
    RBrace,
    Semi,
    Eof,
}

struct Frame {
    path: PathBuf,
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Frame {
    fn new(path: PathBuf, src: &str) -> Self {
        Frame {
            path,
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn exhausted(&self) -> bool {
        self.pos >= self.chars.len()
    }
}

/// Tokenizes a top-level file, transparently splicing in `$INCLUDE`d files
/// at the point of reference.
pub(crate) struct Lexer<'a> {
    frames: Vec<Frame>,
    fs: Option<&'a dyn FileLoader>,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(path: &Path, fs: &'a dyn FileLoader) -> Result<Self, Error> {
        let src = fs.load(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Lexer {
            frames: vec![Frame::new(path.to_path_buf(), &src)],
            fs: Some(fs),
        })
    }

    pub(crate) fn from_str(name: &str, src: &str) -> Self {
        Lexer {
            frames: vec![Frame::new(PathBuf::from(name), src)],
            fs: None,
        }
    }

    pub(crate) fn current_path(&self) -> PathBuf {
        self.frames
            .last()
            .map(|f| f.path.clone())
            .unwrap_or_default()
    }

    pub(crate) fn current_line(&self) -> usize {
        self.frames.last().map(|f| f.line).unwrap_or(0)
    }

    fn err(&self, msg: impl Into<String>) -> Error {
        Error::Syntax {
            path: self.current_path(),
            line: self.current_line(),
            msg: msg.into(),
        }
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            let top = self.frames.last_mut().expect("at least one frame");
            match top.peek() {
                Some(c) if c.is_whitespace() => {
                    top.bump();
                }
                Some('#') => {
                    while let Some(c) = top.peek() {
                        top.bump();
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if top.peek_at(1) == Some('/') => {
                    while let Some(c) = top.peek() {
                        top.bump();
                        if c == '\n' {
                            break;
                        }
                    }
                }
                Some('/') if top.peek_at(1) == Some('*') => {
                    top.bump();
                    top.bump();
                    loop {
                        match top.peek() {
                            None => break,
                            Some('*') if top.peek_at(1) == Some('/') => {
                                top.bump();
                                top.bump();
                                break;
                            }
                            Some(_) => {
                                top.bump();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
    }

    fn read_quoted(&mut self) -> Result<String, Error> {
        let top = self.frames.last_mut().expect("at least one frame");
        top.bump(); // opening quote
        let mut out = String::new();
        loop {
            match top.bump() {
                None => {
                    return Err(Error::Syntax {
                        path: top.path.clone(),
                        line: top.line,
                        msg: "unterminated string".into(),
                    })
                }
                Some('"') => break,
                Some('\\') => {
                    let escaped = top.bump().ok_or_else(|| Error::Syntax {
                        path: top.path.clone(),
                        line: top.line,
                        msg: "unterminated escape".into(),
                    })?;
                    out.push(match escaped {
                        'n' => '\n',
                        'r' => '\r',
                        't' => '\t',
                        'v' => '\u{0B}',
                        'b' => '\u{08}',
                        'a' => '\u{07}',
                        'f' => '\u{0C}',
                        '"' => '"',
                        '\\' => '\\',
                        other => other,
                    });
                }
                Some(c) => out.push(c),
            }
        }
        Ok(out)
    }

    fn read_word(&mut self) -> String {
        let top = self.frames.last_mut().expect("at least one frame");
        let mut out = String::new();
        while let Some(c) = top.peek() {
            if c.is_whitespace() || matches!(c, '{' | '}' | ';' | '"') {
                break;
            }
            out.push(c);
            top.bump();
        }
        out
    }

    fn push_include(&mut self, raw_path: &str) -> Result<(), Error> {
        if self.frames.len() >= MAX_INCLUDE_DEPTH {
            return Err(Error::IncludeTooDeep(MAX_INCLUDE_DEPTH));
        }
        let fs = self.fs.ok_or_else(|| self.err("$INCLUDE unsupported here"))?;
        let base = self
            .frames
            .last()
            .and_then(|f| f.path.parent())
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let resolved = if Path::new(raw_path).is_absolute() {
            PathBuf::from(raw_path)
        } else {
            base.join(raw_path)
        };
        let src = fs.load(&resolved).map_err(|source| Error::Io {
            path: resolved.clone(),
            source,
        })?;
        self.frames.push(Frame::new(resolved, &src));
        Ok(())
    }

    pub(crate) fn next_token(&mut self) -> Result<Token, Error> {
        loop {
            self.skip_ws_and_comments();

            let exhausted = self.frames.last().expect("at least one frame").exhausted();
            if exhausted {
                if self.frames.len() > 1 {
                    self.frames.pop();
                    continue;
                }
                return Ok(Token::Eof);
            }

            let c = self.frames.last().unwrap().peek().unwrap();
            match c {
                '{' => {
                    self.frames.last_mut().unwrap().bump();
                    return Ok(Token::LBrace);
                }
                '}' => {
                    self.frames.last_mut().unwrap().bump();
                    return Ok(Token::RBrace);
                }
                ';' => {
                    self.frames.last_mut().unwrap().bump();
                    return Ok(Token::Semi);
                }
                '"' => return Ok(Token::Str(self.read_quoted()?)),
                _ => {
                    let word = self.read_word();
                    if word.is_empty() {
                        // Shouldn't happen given the dispatch above, but
                        // avoid looping forever on an unexpected byte.
                        self.frames.last_mut().unwrap().bump();
                        continue;
                    }
                    if word == "$INCLUDE" {
                        self.skip_ws_and_comments();
                        let path = match self.next_raw_primary()? {
                            Token::Str(s) => s,
                            Token::Word(s) => s,
                            _ => return Err(self.err("expected a path after $INCLUDE")),
                        };
                        self.skip_ws_and_comments();
                        match self.next_raw_primary()? {
                            Token::Semi => {}
                            _ => return Err(self.err("expected ';' after $INCLUDE path")),
                        }
                        self.push_include(&path)?;
                        continue;
                    }
                    return Ok(Token::Word(word));
                }
            }
        }
    }

    /// Reads one token without include-splicing recursion, used only while
    /// parsing the `$INCLUDE "path";` statement itself.
    fn next_raw_primary(&mut self) -> Result<Token, Error> {
        let c = self.frames.last().expect("at least one frame").peek();
        match c {
            Some('"') => Ok(Token::Str(self.read_quoted()?)),
            Some(';') => {
                self.frames.last_mut().unwrap().bump();
                Ok(Token::Semi)
            }
            _ => Ok(Token::Word(self.read_word())),
        }
    }
}
