/// Minimal ANSI styling for driver output. Rendering stays plain when the
/// `--no-color` flag is set; no terminal detection happens here.
pub struct Style;

impl Style {
    fn wrap(code: &str, text: &str) -> String {
        format!("\x1b[{}m{}\x1b[0m", code, text)
    }

    pub fn bold(text: &str) -> String {
        Self::wrap("1", text)
    }

    pub fn red(text: &str) -> String {
        Self::wrap("31", text)
    }

    pub fn bold_red(text: &str) -> String {
        Self::wrap("1;31", text)
    }

    pub fn yellow(text: &str) -> String {
        Self::wrap("33", text)
    }

    pub fn cyan(text: &str) -> String {
        Self::wrap("36", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn styles_reset_after_the_text() {
        let styled = Style::bold_red("error");
        assert!(styled.starts_with("\x1b[1;31m"));
        assert!(styled.ends_with("\x1b[0m"));
        assert!(styled.contains("error"));
    }
}
