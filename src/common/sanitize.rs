// src/common/sanitize.rs

// Texto livre: trim, corte por tamanho, escape de HTML.
// As regras de tamanho rodam sobre o valor escapado; o banco recebe o texto
// "desescapado" e o escape só volta a acontecer na hora de renderizar.

pub fn sanitize_input(text: &str, max_length: usize) -> String {
    let trimmed: String = text.trim().chars().take(max_length).collect();
    escape_html(&trimmed)
}

pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Inverso exato de [`escape_html`].
pub fn unescape_html(text: &str) -> String {
    const ENTITIES: [(&str, char); 5] = [
        ("&amp;", '&'),
        ("&lt;", '<'),
        ("&gt;", '>'),
        ("&quot;", '"'),
        ("&#x27;", '\''),
    ];

    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        match ENTITIES.iter().find(|(entity, _)| rest.starts_with(entity)) {
            Some((entity, c)) => {
                out.push(*c);
                rest = &rest[entity.len()..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

pub fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trims_and_caps_before_escaping() {
        assert_eq!(sanitize_input("   hello   ", 255), "hello");
        assert_eq!(sanitize_input("abcdef", 3), "abc");
        assert_eq!(sanitize_input("<b>", 255), "&lt;b&gt;");
    }

    #[test]
    fn unescape_restores_the_original_text() {
        let inputs = [
            "plain text",
            "Tom & Jerry <script>alert('x')</script> \"quoted\"",
            "already &amp; escaped looking",
            "ação & café ☕",
        ];
        for input in inputs {
            assert_eq!(unescape_html(&escape_html(input)), input);
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        assert_eq!(char_len("ação"), 4);
    }
}
