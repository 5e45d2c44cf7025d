use crate::classy::{Assessment, Label};

pub struct Style {
    pub icon: &'static str,
    pub background: &'static str,
    pub border: &'static str,
}

pub fn style(label: Label) -> Style {
    match label {
        Label::Positive => Style {
            icon: "😊",
            background: "#ecfdf5",
            border: "#10b981",
        },
        Label::Negative => Style {
            icon: "😞",
            background: "#fef2f2",
            border: "#ef4444",
        },
        Label::Neutral => Style {
            icon: "😐",
            background: "#f9fafb",
            border: "#6b7280",
        },
    }
}

fn rgb(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |at: usize| u8::from_str_radix(hex.get(at..at + 2)?, 16).ok();
    Some((channel(0)?, channel(2)?, channel(4)?))
}

impl Style {
    /// 24-bit escape drawing the border colour on the background colour.
    pub fn ansi(&self) -> Option<String> {
        let (fr, fg, fb) = rgb(self.border)?;
        let (br, bg, bb) = rgb(self.background)?;
        Some(format!(
            "\x1b[38;2;{};{};{};48;2;{};{};{}m",
            fr, fg, fb, br, bg, bb
        ))
    }
}

pub fn render(assessment: &Assessment, color: bool) -> String {
    let style = style(assessment.label);
    let line = format!(
        "Sentiment: {} {} | Polarity: {:.2}",
        assessment.label, style.icon, assessment.polarity
    );
    match style.ansi() {
        Some(escape) if color => format!("{}{}\x1b[0m", escape, line),
        _ => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_line() {
        let assessment = Assessment {
            polarity: 0.75,
            label: Label::Positive,
        };
        assert_eq!(
            render(&assessment, false),
            "Sentiment: Positive 😊 | Polarity: 0.75"
        );
        let assessment = Assessment {
            polarity: -0.7,
            label: Label::Negative,
        };
        assert_eq!(
            render(&assessment, false),
            "Sentiment: Negative 😞 | Polarity: -0.70"
        );
    }

    #[test]
    fn coloured_line_uses_border_and_background() {
        let assessment = Assessment {
            polarity: 0.1,
            label: Label::Neutral,
        };
        assert_eq!(
            render(&assessment, true),
            "\x1b[38;2;107;114;128;48;2;249;250;251mSentiment: Neutral 😐 | Polarity: 0.10\x1b[0m"
        );
    }

    #[test]
    fn every_label_has_a_colour() {
        for &label in &[Label::Positive, Label::Negative, Label::Neutral] {
            assert!(style(label).ansi().is_some());
        }
        assert!(rgb("#10b98").is_none());
        assert_eq!(rgb("#ef4444"), Some((239, 68, 68)));
    }
}
