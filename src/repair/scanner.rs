//! Finite-state JSON scanner.
//!
//! Tracks only what repair needs: whether the cursor sits inside a string literal
//! and which brackets are open. It never validates tokens.

use tracing::debug;

/// Lexical state of the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanState {
    #[default]
    Normal,
    InString,
}

/// An open container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bracket {
    Brace,
    Square,
}

impl Bracket {
    pub fn from_open(c: char) -> Option<Self> {
        match c {
            '{' => Some(Bracket::Brace),
            '[' => Some(Bracket::Square),
            _ => None,
        }
    }

    fn from_close(c: char) -> Option<Self> {
        match c {
            '}' => Some(Bracket::Brace),
            ']' => Some(Bracket::Square),
            _ => None,
        }
    }

    pub fn open(self) -> char {
        match self {
            Bracket::Brace => '{',
            Bracket::Square => '[',
        }
    }

    pub fn close(self) -> char {
        match self {
            Bracket::Brace => '}',
            Bracket::Square => ']',
        }
    }
}

/// What a single character meant to the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    EnterString,
    ExitString,
    /// Any character inside a string literal, escapes included.
    StringChar,
    Open(Bracket),
    Close(Bracket),
    /// A closer that does not match the innermost open bracket. The stack is left as is.
    StrayClose(char),
    /// `,` or `:` outside a string.
    Separator(char),
    Whitespace,
    /// Part of a number or literal (`true`, `null`, ...) or plain garbage.
    Bare(char),
}

/// Character-at-a-time scanner with states {Normal, InString} and a bracket stack.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    state: ScanState,
    stack: Vec<Bracket>,
    escaped: bool,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Open brackets, outermost first.
    pub fn open_brackets(&self) -> &[Bracket] {
        &self.stack
    }

    /// True when the last character consumed was an unfinished `\` escape.
    pub fn in_escape(&self) -> bool {
        self.escaped
    }

    pub fn step(&mut self, c: char) -> Event {
        match self.state {
            ScanState::InString => {
                if self.escaped {
                    self.escaped = false;
                    Event::StringChar
                } else if c == '\\' {
                    self.escaped = true;
                    Event::StringChar
                } else if c == '"' {
                    self.state = ScanState::Normal;
                    Event::ExitString
                } else {
                    Event::StringChar
                }
            }
            ScanState::Normal => match c {
                '"' => {
                    self.state = ScanState::InString;
                    Event::EnterString
                }
                '{' | '[' => {
                    let b = if c == '{' { Bracket::Brace } else { Bracket::Square };
                    self.stack.push(b);
                    Event::Open(b)
                }
                '}' | ']' => match Bracket::from_close(c) {
                    Some(b) if self.stack.last() == Some(&b) => {
                        self.stack.pop();
                        Event::Close(b)
                    }
                    _ => Event::StrayClose(c),
                },
                ',' | ':' => Event::Separator(c),
                c if c.is_whitespace() => Event::Whitespace,
                c => Event::Bare(c),
            },
        }
    }
}

/// Result of scanning text that starts at an opening bracket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    /// Byte offset just past the first complete top-level value, if it closed.
    pub end: Option<usize>,
    pub state: ScanState,
    /// Brackets still open at end of input, outermost first.
    pub open: Vec<Bracket>,
    pub dangling_escape: bool,
    pub stray_closers: usize,
}

impl ScanOutcome {
    pub fn is_complete(&self) -> bool {
        self.end.is_some()
    }

    /// Suffix that terminates an open string and closes every open bracket.
    pub fn closing_suffix(&self) -> String {
        let mut suffix = String::new();
        if self.state == ScanState::InString {
            if self.dangling_escape {
                suffix.push('\\');
            }
            suffix.push('"');
        }
        suffix.extend(self.open.iter().rev().map(|b| b.close()));
        suffix
    }
}

/// Scan until the first top-level value closes or input runs out.
pub fn scan(text: &str) -> ScanOutcome {
    let mut scanner = Scanner::new();
    let mut stray_closers = 0;
    for (i, c) in text.char_indices() {
        match scanner.step(c) {
            Event::Close(_) if scanner.depth() == 0 => {
                return ScanOutcome {
                    end: Some(i + c.len_utf8()),
                    state: scanner.state,
                    open: Vec::new(),
                    dangling_escape: false,
                    stray_closers,
                };
            }
            Event::StrayClose(ch) => {
                stray_closers += 1;
                debug!(position = i, closer = %ch, "ignoring unmatched closer");
            }
            _ => {}
        }
    }
    ScanOutcome {
        end: None,
        state: scanner.state,
        dangling_escape: scanner.escaped,
        open: scanner.stack,
        stray_closers,
    }
}
