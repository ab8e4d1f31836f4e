//! Line-oriented tokenizer. Each source line becomes at most one optional
//! label and at most one mnemonic with its operand tokens; everything after
//! a `//` is a comment.
//!
//! Operand tokens are split on commas, colons and whitespace. Brackets and
//! the post/pre-index `!` marker are kept as their own single-character
//! tokens (rather than discarded) so load/store operand parsing can tell
//! `[rn, #imm]` apart from `[rn], #imm`.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Line {
    pub lineno: usize,
    pub label: Option<String>,
    pub mnemonic: Option<String>,
    pub operands: Vec<String>,
}

pub fn lex(source: &str) -> Vec<Line> {
    let mut lines = Vec::new();
    for (i, raw) in source.lines().enumerate() {
        let lineno = i + 1;
        let without_comment = strip_comment(raw);
        let trimmed = without_comment.trim();
        if trimmed.is_empty() {
            continue;
        }
        let (label, rest) = split_label(trimmed);
        if rest.trim().is_empty() {
            lines.push(Line {
                lineno,
                label: label.map(str::to_string),
                mnemonic: None,
                operands: Vec::new(),
            });
            continue;
        }
        let mut tokens = tokenize(rest);
        if tokens.is_empty() {
            lines.push(Line {
                lineno,
                label: label.map(str::to_string),
                mnemonic: None,
                operands: Vec::new(),
            });
            continue;
        }
        let mnemonic = tokens.remove(0).to_lowercase();
        lines.push(Line {
            lineno,
            label: label.map(str::to_string),
            mnemonic: Some(mnemonic),
            operands: tokens,
        });
    }
    lines
}

fn strip_comment(line: &str) -> &str {
    match line.find("//") {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn split_label(line: &str) -> (Option<&str>, &str) {
    if let Some(idx) = line.find(':') {
        let candidate = line[..idx].trim();
        if is_ident(candidate) {
            return (Some(candidate), line[idx + 1..].trim());
        }
    }
    (None, line)
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn tokenize(rest: &str) -> Vec<String> {
    let spaced = rest.replace('[', " [ ").replace(']', " ] ").replace('!', " ! ");
    spaced
        .split(|c: char| c == ',' || c == ':' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_only_line_has_no_mnemonic() {
        let lines = lex("loop:\n");
        assert_eq!(lines[0].label.as_deref(), Some("loop"));
        assert_eq!(lines[0].mnemonic, None);
    }

    #[test]
    fn label_and_instruction_on_one_line() {
        let lines = lex("loop: add x0, x1, x2");
        assert_eq!(lines[0].label.as_deref(), Some("loop"));
        assert_eq!(lines[0].mnemonic.as_deref(), Some("add"));
        assert_eq!(lines[0].operands, vec!["x0", "x1", "x2"]);
    }

    #[test]
    fn comments_are_stripped() {
        let lines = lex("add x0, x1, x2 // bump counter");
        assert_eq!(lines[0].operands, vec!["x0", "x1", "x2"]);
    }

    #[test]
    fn unsigned_offset_keeps_brackets_as_tokens() {
        let lines = lex("ldr x0, [x1, #8]");
        assert_eq!(lines[0].operands, vec!["x0", "[", "x1", "#8", "]"]);
    }

    #[test]
    fn post_index_imm_trails_the_closing_bracket() {
        let lines = lex("str x0, [x1], #8");
        assert_eq!(lines[0].operands, vec!["x0", "[", "x1", "]", "#8"]);
    }

    #[test]
    fn pre_index_keeps_bang_after_bracket() {
        let lines = lex("str x0, [x1, #8]!");
        assert_eq!(lines[0].operands, vec!["x0", "[", "x1", "#8", "]", "!"]);
    }

    #[test]
    fn mnemonic_is_lowercased() {
        let lines = lex("ADD x0, x1, x2");
        assert_eq!(lines[0].mnemonic.as_deref(), Some("add"));
    }
}
