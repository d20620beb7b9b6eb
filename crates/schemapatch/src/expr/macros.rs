//! Syntax-level expansion of the `objects.apply(base, overlay)` macro (C4).
//!
//! The expression host's parser has no plug-in surface for registering CEL
//! macros the way the Go original's `cel-go` does (`cel.NewReceiverMacro` is
//! treated as an external black box — see SPEC_FULL §1). Orchestrators only
//! ever produce this call in one shape — `objects.apply(<base>,\n<user
//! literal>\n)` wrapping the entire expression source (see
//! `crate::orchestrate`) — so expansion is a bounded, whole-source rewrite
//! rather than a general AST macro.

use crate::error::Error;

/// If `source` (trimmed) is an `objects.apply(base, overlay)` call, rewrites
/// it to `apply_filter(base, {"object": overlay-without-removals, "removals":
/// [...]})` and returns the rewritten source. Otherwise returns `source`
/// unchanged — `mutate_eval`/`convert_eval` expressions never use the macro.
pub fn expand(source: &str) -> Result<String, Error> {
    let trimmed = source.trim();
    let Some(rest) = trimmed.strip_prefix("objects.apply(") else {
        return Ok(source.to_string());
    };
    let Some(inner) = rest.strip_suffix(')') else {
        return Err(Error::ExpressionCompile(
            "objects.apply(...) call is not closed".to_string(),
        ));
    };

    let (base_src, overlay_src) = split_top_level_args(inner)?;
    let overlay_src = overlay_src.trim();

    if !overlay_src.starts_with('{') || !overlay_src.ends_with('}') {
        return Err(Error::ExpressionCompile(
            "objects.apply()'s second argument must be an object creation expression".to_string(),
        ));
    }

    let literal_body = &overlay_src[1..overlay_src.len() - 1];
    let mut removals = Vec::new();
    let stripped_body = strip_removals(literal_body, "", &mut removals)?;

    let removals_literal = removals
        .iter()
        .map(|path| format!("\"{path}\""))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        "apply_filter({base_src}, {{\"object\": {{{stripped_body}}}, \"removals\": [{removals_literal}]}})"
    ))
}

/// Splits `s` (the argument list of a call, without the enclosing parens)
/// into exactly two top-level comma-separated arguments.
fn split_top_level_args(s: &str) -> Result<(&str, &str), Error> {
    let mut depth: i32 = 0;
    let mut in_string: Option<char> = None;
    let mut escape = false;

    for (i, c) in s.char_indices() {
        if let Some(quote) = in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => in_string = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => return Ok((s[..i].trim(), s[i + 1..].trim())),
            _ => {}
        }
    }

    Err(Error::ExpressionCompile(
        "objects.apply(...) requires exactly two arguments".to_string(),
    ))
}

/// Splits the body of an object literal (without the enclosing braces) into
/// its top-level `key: value` entries, respecting nested braces/brackets/
/// parens and string literals.
fn split_top_level_entries(body: &str) -> Vec<&str> {
    let mut entries = Vec::new();
    let mut depth: i32 = 0;
    let mut in_string: Option<char> = None;
    let mut escape = false;
    let mut start = 0usize;

    for (i, c) in body.char_indices() {
        if let Some(quote) = in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => in_string = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ',' if depth == 0 => {
                entries.push(body[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    let last = body[start..].trim();
    if !last.is_empty() {
        entries.push(last);
    }
    entries
}

/// Splits a single `key: value` (or `?key: value`) entry at the first
/// top-level `:`.
fn split_entry(entry: &str) -> Option<(&str, &str)> {
    let mut depth: i32 = 0;
    let mut in_string: Option<char> = None;
    let mut escape = false;

    for (i, c) in entry.char_indices() {
        if let Some(quote) = in_string {
            if escape {
                escape = false;
            } else if c == '\\' {
                escape = true;
            } else if c == quote {
                in_string = None;
            }
            continue;
        }

        match c {
            '"' | '\'' => in_string = Some(c),
            '(' | '[' | '{' => depth += 1,
            ')' | ']' | '}' => depth -= 1,
            ':' if depth == 0 => return Some((entry[..i].trim(), entry[i + 1..].trim())),
            _ => {}
        }
    }
    None
}

fn normalize_key(raw_key: &str) -> String {
    let key = raw_key.strip_prefix('?').unwrap_or(raw_key).trim();
    match key.strip_prefix('"').and_then(|k| k.strip_suffix('"')) {
        Some(unquoted) => unquoted.to_string(),
        None => key.to_string(),
    }
}

/// Walks an object literal's entries, dropping those whose value is the
/// literal call `optional.none()` and recording their dotted removal path
/// (keys containing `.` are lost — a known, accepted limitation), recursing
/// into nested object-literal values. Returns the rewritten entry list
/// (still valid as the body of a `{...}` literal).
fn strip_removals(body: &str, prefix: &str, removals: &mut Vec<String>) -> Result<String, Error> {
    let mut kept = Vec::new();

    for entry in split_top_level_entries(body) {
        let Some((raw_key, value)) = split_entry(entry) else {
            kept.push(entry.to_string());
            continue;
        };

        let key = normalize_key(raw_key);
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };

        if value.trim() == "optional.none()" {
            removals.push(path);
            continue;
        }

        if value.starts_with('{') && value.ends_with('}') {
            let nested_body = &value[1..value.len() - 1];
            let rewritten_nested = strip_removals(nested_body, &path, removals)?;
            kept.push(format!("\"{key}\": {{{rewritten_nested}}}"));
        } else {
            kept.push(format!("\"{key}\": {value}"));
        }
    }

    Ok(kept.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_non_apply_expressions() {
        let src = "oldObject.spec.replicas";
        assert_eq!(expand(src).unwrap(), src);
    }

    #[test]
    fn rewrites_flat_removal() {
        let src = "objects.apply(oldObject, {\"name\": optional.none(), \"replicas\": 3})";
        let rewritten = expand(src).unwrap();

        assert!(rewritten.starts_with("apply_filter(oldObject, "));
        assert!(rewritten.contains("\"removals\": [\"name\"]"));
        assert!(rewritten.contains("\"replicas\": 3"));
        assert!(!rewritten.contains("optional.none()"));
    }

    #[test]
    fn rewrites_nested_removal_with_dotted_path() {
        let src =
            "objects.apply(oldObject, {\"spec\": {\"name\": optional.none(), \"replicas\": 3}})";
        let rewritten = expand(src).unwrap();

        assert!(rewritten.contains("\"removals\": [\"spec.name\"]"));
    }

    #[test]
    fn no_removals_yields_empty_list() {
        let src = "objects.apply(oldObject, {\"replicas\": 3})";
        let rewritten = expand(src).unwrap();

        assert!(rewritten.contains("\"removals\": []"));
    }

    #[test]
    fn rejects_non_object_second_argument() {
        let src = "objects.apply(oldObject, oldObject.spec)";
        let err = expand(src).unwrap_err();
        assert!(matches!(err, Error::ExpressionCompile(_)));
    }

    #[test]
    fn passes_through_unrelated_calls_even_with_matching_prefix_elsewhere() {
        let src = "oldObject.things.map(t, objects.apply(t, {\"a\": 1}))";
        assert_eq!(expand(src).unwrap(), src);
    }
}
