use crate::error::Error;
use crate::lexer::{Lexer, Token};
use crate::tree::Entry;

/// entry := name ( ';' | string ';' | '{' entry* '}' ';' )
/// name  := Word | Str
pub(crate) fn parse(lexer: &mut Lexer) -> Result<Vec<Entry>, Error> {
    let mut entries = Vec::new();
    loop {
        let tok = lexer.next_token()?;
        match tok {
            Token::Eof => break,
            Token::Word(_) | Token::Str(_) => {
                entries.push(parse_entry(lexer, primary_text(tok))?);
            }
            other => {
                return Err(Error::Syntax {
                    path: lexer.current_path(),
                    line: lexer.current_line(),
                    msg: format!("unexpected token {other:?} at top level"),
                })
            }
        }
    }
    Ok(entries)
}

fn primary_text(tok: Token) -> String {
    match tok {
        Token::Word(s) | Token::Str(s) => s,
        _ => unreachable!("primary_text called on non-primary token"),
    }
}

fn parse_entry(lexer: &mut Lexer, name: String) -> Result<Entry, Error> {
    match lexer.next_token()? {
        Token::Semi => Ok(Entry::Data {
            name,
            value: String::new(),
        }),
        Token::Word(v) | Token::Str(v) => {
            expect(lexer, Token::Semi)?;
            Ok(Entry::Data { name, value: v })
        }
        Token::LBrace => {
            let mut children = Vec::new();
            loop {
                let tok = lexer.next_token()?;
                match tok {
                    Token::RBrace => break,
                    Token::Word(_) | Token::Str(_) => {
                        children.push(parse_entry(lexer, primary_text(tok))?);
                    }
                    other => {
                        return Err(Error::Syntax {
                            path: lexer.current_path(),
                            line: lexer.current_line(),
                            msg: format!("unexpected token {other:?} inside {name:?} block"),
                        })
                    }
                }
            }
            expect(lexer, Token::Semi)?;
            Ok(Entry::List { name, children })
        }
        other => Err(Error::Syntax {
            path: lexer.current_path(),
            line: lexer.current_line(),
            msg: format!("unexpected token {other:?} after name {name:?}"),
        }),
    }
}

fn expect(lexer: &mut Lexer, want: Token) -> Result<(), Error> {
    let got = lexer.next_token()?;
    if got == want {
        Ok(())
    } else {
        Err(Error::Syntax {
            path: lexer.current_path(),
            line: lexer.current_line(),
            msg: format!("expected {want:?}, found {got:?}"),
        })
    }
}
