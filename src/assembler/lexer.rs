//! Tokenises assembly source text into tagged lines.
//!
//! A line is split on whitespace (spaces, CR ignored everywhere) into
//! tokens, respecting `"..."` string literals (no escapes) and `;` line
//! comments. The first token's leading character picks the line's kind:
//! `.` for a constant definition, `:` for a label definition, anything
//! else is a bytecode instruction.

/// What kind of line a tokenised source line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// `.name value`
    ConstantDef,
    /// `:label`
    LabelDef,
    /// `mnemonic [operand [operand]]`
    BytecodeDef,
}

/// One non-empty, non-comment-only source line, with its tokens and the
/// instruction address it shares (for `BytecodeDef`, its own address; for
/// everything else, the address of the next upcoming `BytecodeDef` line).
#[derive(Debug, Clone)]
pub struct SourceLine {
    /// 1-based line number in the original source, for error messages.
    pub line_no: usize,
    /// Whitespace/quote/comment-tokenised words on this line.
    pub tokens: Vec<String>,
    /// The line's kind, derived from `tokens[0]`'s leading character.
    pub kind: LineKind,
    /// Instruction address this line is associated with (see struct docs).
    pub address: usize,
}

fn tokenize_line(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_string = false;

    for c in raw.chars() {
        if in_string {
            current.push(c);
            if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            ';' => break,
            '"' => {
                in_string = true;
                current.push(c);
            }
            c if c.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn line_kind(first_token: &str) -> LineKind {
    match first_token.chars().next() {
        Some('.') => LineKind::ConstantDef,
        Some(':') => LineKind::LabelDef,
        _ => LineKind::BytecodeDef,
    }
}

/// Tokenises `source` into tagged lines and assigns each line its
/// instruction address: `BytecodeDef` lines get a monotonically
/// increasing address starting at 0; every other line shares the address
/// of the next upcoming `BytecodeDef` line.
pub fn tokenize(source: &str) -> Vec<SourceLine> {
    let mut lines = Vec::new();
    for (idx, raw) in source.lines().enumerate() {
        let raw: String = raw.chars().filter(|&c| c != '\r').collect();
        let tokens = tokenize_line(&raw);
        if tokens.is_empty() {
            continue;
        }
        let kind = line_kind(&tokens[0]);
        lines.push(SourceLine {
            line_no: idx + 1,
            tokens,
            kind,
            address: 0,
        });
    }

    let mut addr = 0usize;
    // Two passes over the already-collected records: first find each
    // BytecodeDef's own address, then backfill non-bytecode lines with
    // the address of the next upcoming one.
    for line in lines.iter_mut() {
        if line.kind == LineKind::BytecodeDef {
            line.address = addr;
            addr += 1;
        }
    }
    let mut next_bytecode_addr = addr;
    for line in lines.iter_mut().rev() {
        if line.kind == LineKind::BytecodeDef {
            next_bytecode_addr = line.address;
        } else {
            line.address = next_bytecode_addr;
        }
    }

    lines
}
