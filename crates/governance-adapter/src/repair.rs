/// Deterministic JSON repair pass applied when the strict parse fails:
/// cuts the reply down to its outermost brace segment, strips markdown
/// code fences, quotes bare keys, removes trailing commas, balances an
/// odd number of quotes and closes unterminated braces/brackets.
pub(crate) fn repair(text: &str) -> String {
    let stripped = strip_code_fences(text);
    let segment = extract_brace_segment(stripped);
    let mut repaired = quote_bare_keys(segment);
    repaired = strip_trailing_commas(&repaired);
    balance_quotes(&mut repaired);
    close_open_scopes(&mut repaired);
    repaired
}

fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the fence line.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Models often wrap the object in chatter. Keep everything from the
/// first `{` through the last `}` (or to the end when unterminated).
fn extract_brace_segment(text: &str) -> &str {
    let Some(start) = text.find('{') else {
        return text;
    };
    match text.rfind('}') {
        Some(end) if end > start => &text[start..=end],
        _ => &text[start..],
    }
}

/// Quote identifiers used as keys (`{decision: 2}`), tracking string
/// context so values are never touched.
fn quote_bare_keys(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut output = String::with_capacity(text.len() + 8);
    let mut in_string = false;
    let mut escaped = false;
    let mut expect_key = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if in_string {
            output.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            i += 1;
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                expect_key = false;
                output.push(c);
                i += 1;
            }
            '{' | ',' => {
                expect_key = true;
                output.push(c);
                i += 1;
            }
            _ if expect_key && (c.is_alphabetic() || c == '_') => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                // Only treat it as a key when a colon follows.
                let mut j = i;
                while j < chars.len() && chars[j].is_whitespace() {
                    j += 1;
                }
                if chars.get(j) == Some(&':') {
                    output.push('"');
                    output.push_str(&word);
                    output.push('"');
                } else {
                    output.push_str(&word);
                }
                expect_key = false;
            }
            _ => {
                if !c.is_whitespace() {
                    expect_key = false;
                }
                output.push(c);
                i += 1;
            }
        }
    }
    output
}

fn strip_trailing_commas(text: &str) -> String {
    let mut output = String::with_capacity(text.len());
    let chars: Vec<char> = text.chars().collect();
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if in_string {
            output.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                output.push(c);
            }
            ',' => {
                // Drop the comma when the next significant char closes a
                // scope or ends the text.
                let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
                match next {
                    Some('}') | Some(']') | None => {}
                    _ => output.push(c),
                }
            }
            _ => output.push(c),
        }
    }
    output
}

fn balance_quotes(text: &mut String) {
    let mut count = 0usize;
    let mut escaped = false;
    for c in text.chars() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == '"' {
            count += 1;
        }
    }
    if count % 2 == 1 {
        text.push('"');
    }
}

fn close_open_scopes(text: &mut String) {
    let mut stack = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => stack.push('}'),
            '[' => stack.push(']'),
            '}' | ']' => {
                if stack.last() == Some(&c) {
                    stack.pop();
                }
            }
            _ => {}
        }
    }
    while let Some(closer) = stack.pop() {
        text.push(closer);
    }
}
