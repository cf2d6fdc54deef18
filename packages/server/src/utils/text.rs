use common::Status;

/// Zero-width and bidi controls that render as nothing.
fn is_format(c: char) -> bool {
    matches!(
        c,
        '\u{00AD}'
            | '\u{061C}'
            | '\u{180E}'
            | '\u{200B}'..='\u{200F}'
            | '\u{202A}'..='\u{202E}'
            | '\u{2060}'..='\u{2064}'
            | '\u{2066}'..='\u{206F}'
            | '\u{FEFF}'
            | '\u{FFF9}'..='\u{FFFB}'
    )
}

fn is_private_use(c: char) -> bool {
    matches!(
        c,
        '\u{E000}'..='\u{F8FF}' | '\u{F0000}'..='\u{FFFFD}' | '\u{100000}'..='\u{10FFFD}'
    )
}

fn is_unprintable(c: char) -> bool {
    c.is_control() || is_format(c) || is_private_use(c) || matches!(c, '\u{2028}' | '\u{2029}')
}

/// Single-line text: every unprintable character removed, then trimmed.
pub fn normalize_print_text(text: &str) -> String {
    text.chars()
        .filter(|&c| !is_unprintable(c))
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Multi-line text: like [`normalize_print_text`] but keeps `\n`.
pub fn normalize_graphic_text(text: &str) -> String {
    text.chars()
        .filter(|&c| c == '\n' || !is_unprintable(c))
        .collect::<String>()
        .trim()
        .to_owned()
}

/// Byte length of `text` must lie in `min..=max`.
pub fn check_length(text: &str, field: &str, min: usize, max: usize) -> Result<(), Status> {
    if text.len() < min {
        return Err(Status::invalid_argument(format!(
            "{field} too short ({} < {min})",
            text.len()
        )));
    }
    if text.len() > max {
        return Err(Status::invalid_argument(format!(
            "{field} too long ({} > {max})",
            text.len()
        )));
    }
    Ok(())
}

/// Normalize raw tag names: drop empties and duplicates, keep first-seen order.
pub fn clean_tag_names(raw: &[String], min: usize, max: usize) -> Result<Vec<String>, Status> {
    let mut names: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let name = normalize_print_text(tag);
        if name.is_empty() {
            continue;
        }
        check_length(&name, "tag", min, max)?;
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names)
}
