/// Sanitizes a post body before it is stored.
///
/// Whitelist-based: safe formatting tags (<p>, <b>, <a href>, ...) survive,
/// while <script>, <iframe> and event-handler attributes are stripped along
/// with the content of script tags.
pub fn sanitize_post_body(input: &str) -> String {
    ammonia::clean(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_scripts_keeps_formatting() {
        let cleaned = sanitize_post_body("<p onclick=\"x()\">Hi <b>there</b><script>alert(1)</script></p>");
        assert!(cleaned.contains("<b>there</b>"));
        assert!(!cleaned.contains("script"));
        assert!(!cleaned.contains("alert"));
        assert!(!cleaned.contains("onclick"));
    }
}
