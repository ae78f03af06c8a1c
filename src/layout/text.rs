use crate::config::LayoutConfig;
use crate::text_metrics;
use crate::theme::Theme;

use super::TextBlock;

/// Measures and word-wraps a label so that no line exceeds `max_width` pixels.
pub(super) fn measure_label(
    text: &str,
    font_size: f32,
    max_width: f32,
    theme: &Theme,
    config: &LayoutConfig,
) -> TextBlock {
    let metrics = Metrics {
        font_size,
        font_family: &theme.font_family,
        fast: config.fast_text_metrics,
    };
    let mut lines = Vec::new();
    for raw in text.split('\n') {
        lines.extend(wrap_line(raw.trim(), &metrics, max_width));
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    let width = lines
        .iter()
        .map(|line| metrics.width(line))
        .fold(0.0, f32::max);
    let height = lines.len() as f32 * font_size * config.label_line_height;
    TextBlock {
        lines,
        width,
        height,
    }
}

struct Metrics<'a> {
    font_size: f32,
    font_family: &'a str,
    fast: bool,
}

impl Metrics<'_> {
    fn width(&self, text: &str) -> f32 {
        if self.fast {
            return fallback_text_width(text, self.font_size);
        }
        text_metrics::measure_text_width(text, self.font_size, self.font_family)
            .unwrap_or_else(|| fallback_text_width(text, self.font_size))
    }
}

fn fallback_text_width(text: &str, font_size: f32) -> f32 {
    text.chars().map(char_width_factor).sum::<f32>() * font_size
}

/// Approximate Arial advance widths, in ems.
fn char_width_factor(ch: char) -> f32 {
    match ch {
        ' ' => 0.278,
        'i' | 'j' | 'l' | '\'' | '|' | '!' | '.' | ',' | ':' | ';' => 0.24,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '{' | '}' | '/' | '\\' | '-' => 0.333,
        'm' | 'w' | 'M' | 'W' | '@' => 0.86,
        'A'..='Z' => 0.68,
        'a'..='z' | '0'..='9' => 0.556,
        ch if ch.is_ascii() => 0.5,
        _ => 0.8,
    }
}

fn wrap_line(line: &str, metrics: &Metrics<'_>, max_width: f32) -> Vec<String> {
    if line.is_empty() {
        return vec![String::new()];
    }
    let mut out = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if current.is_empty() || metrics.width(&candidate) <= max_width {
            current = candidate;
        } else {
            out.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> LayoutConfig {
        LayoutConfig {
            fast_text_metrics: true,
            ..LayoutConfig::default()
        }
    }

    fn measure(text: &str, max_width: f32) -> TextBlock {
        measure_label(text, 14.0, max_width, &Theme::dark(), &fast())
    }

    #[test]
    fn short_label_stays_on_one_line() {
        let block = measure("User", 180.0);
        assert_eq!(block.lines, vec!["User".to_string()]);
        assert!(block.width > 0.0 && block.width < 180.0);
        assert!((block.height - 14.0 * 1.4).abs() < 1e-4);
    }

    #[test]
    fn long_label_wraps_on_words() {
        let block = measure(
            "Attacker creates a new Lambda function with an admin role",
            180.0,
        );
        assert!(block.lines.len() > 1);
        for line in &block.lines {
            assert!(!line.starts_with(' '));
        }
    }

    #[test]
    fn single_long_word_is_not_split() {
        let block = measure("iam:CreatePolicyVersionWithoutLimits", 50.0);
        assert_eq!(block.lines.len(), 1);
    }

    #[test]
    fn fast_metrics_use_width_table() {
        let block = measure("User", 180.0);
        assert!((block.width - fallback_text_width("User", 14.0)).abs() < 1e-4);
    }

    #[test]
    fn font_metrics_measure_against_theme_family() {
        let config = LayoutConfig::default();
        assert!(!config.fast_text_metrics);
        let mut theme = Theme::dark();
        theme.font_family = "sans-serif".to_string();
        let block = measure_label("User", 14.0, 180.0, &theme, &config);
        let expected = text_metrics::measure_text_width("User", 14.0, "sans-serif")
            .unwrap_or_else(|| fallback_text_width("User", 14.0));
        assert!((block.width - expected).abs() < 1e-4);
    }
}
