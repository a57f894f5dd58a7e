//! Text-level rewriting of catalog definitions for the target schema.

use std::sync::OnceLock;

use regex::{NoExpand, Regex, RegexBuilder};

fn trailing_slash() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A SQL*Plus terminator: "/" alone on the last line.
    RE.get_or_init(|| Regex::new(r"(?:^|\n)[ \t]*/[ \t]*\z").expect("valid terminator pattern"))
}

/// Make a source definition usable on the target.
///
/// Trims the text, strips a trailing lone `/` line, then replaces the source
/// schema qualifier with the target's: `"SRC".` becomes `"TGT".` and a
/// word-bounded `SRC.` becomes `TGT.`, both case-insensitively. Nothing is
/// remapped when either schema is empty or both are equal.
pub fn rewrite_definition(ddl: &str, source_schema: &str, target_schema: &str) -> String {
    let mut text = ddl.trim().to_string();
    if let Some(m) = trailing_slash().find(&text) {
        text.truncate(m.start());
        text = text.trim_end().to_string();
    }

    if source_schema.is_empty()
        || target_schema.is_empty()
        || source_schema.eq_ignore_ascii_case(target_schema)
    {
        return text;
    }

    let escaped = regex::escape(source_schema);
    let quoted_target = format!("\"{}\".", target_schema);
    let bare_target = format!("{}.", target_schema);

    let quoted = RegexBuilder::new(&format!("\"{}\"\\.", escaped))
        .case_insensitive(true)
        .build();
    if let Ok(re) = quoted {
        text = re.replace_all(&text, NoExpand(&quoted_target)).into_owned();
    }

    // `\b` needs a word character at the edge; schemas with symbols only get the quoted form.
    let bare = RegexBuilder::new(&format!(r"\b{}\.", escaped))
        .case_insensitive(true)
        .build();
    if let Ok(re) = bare {
        text = re.replace_all(&text, NoExpand(&bare_target)).into_owned();
    }

    text
}
