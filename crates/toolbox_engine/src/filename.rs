use toolbox_core::OutputFormat;

const MAX_BASE_LEN: usize = 80;

/// Download name for a transform result: `<original-base-name>.<target-extension>`.
///
/// The base is made safe for common file systems; an empty one becomes
/// `untitled`.
pub fn output_file_name(input_name: &str, format: OutputFormat) -> String {
    let file = input_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(input_name);
    let base = match file.rsplit_once('.') {
        Some((base, _)) if !base.is_empty() => base,
        _ => file,
    };
    format!("{}.{}", sanitize_base(base), format.extension())
}

fn sanitize_base(input: &str) -> String {
    let replaced: String = input
        .chars()
        .map(|c| if is_forbidden(c) { '_' } else { c })
        .collect();

    let mut compacted = String::with_capacity(replaced.len());
    let mut prev_underscore = false;
    for c in replaced.trim_matches(&['_', ' ', '.'][..]).chars() {
        if c == '_' && prev_underscore {
            continue;
        }
        prev_underscore = c == '_';
        compacted.push(c);
    }

    if compacted.len() > MAX_BASE_LEN {
        let mut end = MAX_BASE_LEN;
        while !compacted.is_char_boundary(end) {
            end -= 1;
        }
        compacted.truncate(end);
    }
    if compacted.is_empty() {
        return "untitled".to_string();
    }
    if is_reserved_windows_name(&compacted) {
        compacted.push('_');
    }
    compacted
}

fn is_forbidden(c: char) -> bool {
    matches!(c, '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '\0'..='\u{1F}')
}

fn is_reserved_windows_name(name: &str) -> bool {
    const RESERVED: &[&str] = &[
        "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
        "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
    ];
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replaces_last_extension_only() {
        assert_eq!(
            output_file_name("holiday.photo.jpeg", OutputFormat::Webp),
            "holiday.photo.webp"
        );
        assert_eq!(output_file_name("scan", OutputFormat::Png), "scan.png");
    }

    #[test]
    fn strips_directories_and_forbidden_characters() {
        assert_eq!(output_file_name("C:\\pics\\a:b?.png", OutputFormat::Jpeg), "a_b.jpg");
        assert_eq!(output_file_name("/tmp/x/logo.svg", OutputFormat::Png), "logo.png");
    }

    #[test]
    fn empty_base_is_untitled() {
        assert_eq!(output_file_name("", OutputFormat::Png), "untitled.png");
        assert_eq!(output_file_name("???.gif", OutputFormat::Gif), "untitled.gif");
    }

    #[test]
    fn reserved_and_long_names() {
        assert_eq!(output_file_name("con.bmp", OutputFormat::Bmp), "con_.bmp");
        let long = format!("{}.png", "é".repeat(60));
        let name = output_file_name(&long, OutputFormat::Png);
        assert!(name.len() <= MAX_BASE_LEN + ".png".len());
        assert!(name.ends_with(".png"));
    }
}
