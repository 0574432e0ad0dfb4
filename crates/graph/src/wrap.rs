//! Greedy word wrapping for node labels

/// Wrap `text` into lines of at most `width` characters
///
/// Words are separated by single spaces. A word longer than the width fills
/// the rest of the current line and is then split across lines.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in text.split_whitespace() {
        let len = word.chars().count();
        let sep = usize::from(!line.is_empty());

        if line_len + sep + len <= width {
            if sep == 1 {
                line.push(' ');
            }
            line.push_str(word);
            line_len += sep + len;
            continue;
        }

        if len <= width {
            lines.push(std::mem::take(&mut line));
            line.push_str(word);
            line_len = len;
            continue;
        }

        let mut rest = word;
        let room = width.saturating_sub(line_len + sep);
        if room > 0 {
            let (head, tail) = split_chars(rest, room);
            if sep == 1 {
                line.push(' ');
            }
            line.push_str(head);
            rest = tail;
        }
        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }

        while rest.chars().count() > width {
            let (head, tail) = split_chars(rest, width);
            lines.push(head.to_string());
            rest = tail;
        }
        line.push_str(rest);
        line_len = rest.chars().count();
    }

    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Wrapped lines joined with newlines
pub fn wrap_label(text: &str, width: usize) -> String {
    wrap(text, width).join("\n")
}

fn split_chars(s: &str, n: usize) -> (&str, &str) {
    let at = s.char_indices().nth(n).map(|(i, _)| i).unwrap_or(s.len());
    s.split_at(at)
}
