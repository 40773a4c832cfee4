use lazy_static::lazy_static;
use regex::Regex;

use crate::config::EmojiHandling;

lazy_static! {
    // Word characters, whitespace, basic caption punctuation and emoji.
    static ref PASSTHROUGH_DISALLOWED: Regex = Regex::new(r#"[^\w\s.,!?@#\-_()+=<>:;"'/\\\p{Extended_Pictographic}\x{FE0F}\x{200D}]"#).unwrap();
    // Same punctuation, plus the brackets used by emoji tokens.
    static ref TOKENIZE_DISALLOWED: Regex = Regex::new(r#"[^\w\s\[\].,!?@#\-_()+=<>:;"'/\\]"#).unwrap();
}

const EMOJI_TOKENS: [(&str, &str); 22] = [
    ("🔥", "[fire]"),
    ("💯", "[100]"),
    ("✨", "[sparkles]"),
    ("❤️", "[heart]"),
    ("😍", "[heart_eyes]"),
    ("🚀", "[rocket]"),
    ("🎉", "[party]"),
    ("💪", "[muscle]"),
    ("👏", "[clap]"),
    ("🌟", "[star]"),
    ("📸", "[camera]"),
    ("🎨", "[art]"),
    ("💝", "[gift_heart]"),
    ("🌈", "[rainbow]"),
    ("⭐", "[star]"),
    ("💎", "[diamond]"),
    ("🔴", "[red_circle]"),
    ("🟢", "[green_circle]"),
    ("🔵", "[blue_circle]"),
    ("⚡", "[lightning]"),
    ("🎯", "[target]"),
    ("💡", "[bulb]"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SanitizeStyle {
    pub emoji: EmojiHandling,
    /// Drop everything above U+FFFF
    pub bmp_only: bool,
}

impl Default for SanitizeStyle {
    fn default() -> Self {
        Self { emoji: EmojiHandling::Passthrough, bmp_only: true }
    }
}

/// Makes caption text safe to type into the browser.
///
/// Control characters go first, then (for the tokenize style) known emoji become
/// bracketed words, then astral characters if `bmp_only` is set, and finally
/// anything outside the allow-set. The result is trimmed.
pub fn sanitize(text: &str, style: SanitizeStyle) -> String {
    let mut text: String = text.chars().filter(|c| !c.is_control()).collect();

    if style.emoji == EmojiHandling::Tokenize {
        for (emoji, token) in EMOJI_TOKENS {
            text = text.replace(emoji, token);
        }
    }

    if style.bmp_only {
        text.retain(|c| (c as u32) <= 0xFFFF);
    }

    let disallowed: &Regex = match style.emoji {
        EmojiHandling::Passthrough => &PASSTHROUGH_DISALLOWED,
        EmojiHandling::Tokenize => &TOKENIZE_DISALLOWED,
    };

    disallowed.replace_all(&text, "").trim().to_string()
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const TOKENIZE: SanitizeStyle = SanitizeStyle { emoji: EmojiHandling::Tokenize, bmp_only: true };
    const PASSTHROUGH: SanitizeStyle = SanitizeStyle { emoji: EmojiHandling::Passthrough, bmp_only: true };
    const PASSTHROUGH_WIDE: SanitizeStyle = SanitizeStyle { emoji: EmojiHandling::Passthrough, bmp_only: false };

    // Letters, a few accented ones, caption punctuation, control characters,
    // a symbol outside every allow-set, and emoji from both planes.
    const CAPTION_CHARS: &str = "[ -~\\t\\n\\x07àçéñü€⚡🔥🐱❤\u{FE0F}]{0,40}";

    const PUNCTUATION: &str = ".,!?@#-_()+=<>:;\"'/\\";
    const PASSTHROUGH_EMOJI: [char; 5] = ['⚡', '🔥', '🐱', '❤', '\u{FE0F}'];

    fn permitted(c: char, style: SanitizeStyle) -> bool {
        if c.is_control() || (style.bmp_only && (c as u32) > 0xFFFF) {
            return false;
        }
        let base = c.is_alphanumeric() || c == '_' || c.is_whitespace() || PUNCTUATION.contains(c);
        match style.emoji {
            EmojiHandling::Tokenize => base || c == '[' || c == ']',
            EmojiHandling::Passthrough => base || PASSTHROUGH_EMOJI.contains(&c),
        }
    }

    #[test]
    fn strips_control_characters_and_trims() {
        assert_eq!(sanitize("  Hello\u{7}\tworld\n ", PASSTHROUGH), "Helloworld");
    }

    #[test]
    fn keeps_caption_punctuation_and_accents() {
        let caption = "Promoção! R$35 (50% OFF) - garanta já: @loja #Dinheiro";
        assert_eq!(sanitize(caption, PASSTHROUGH), "Promoção! R35 (50 OFF) - garanta já: @loja #Dinheiro");
    }

    #[test]
    fn tokenize_replaces_known_emoji() {
        assert_eq!(sanitize("Hot 🔥 deal 💯 ❤️", TOKENIZE), "Hot [fire] deal [100] [heart]");
    }

    #[test]
    fn tokenize_drops_unknown_emoji() {
        assert_eq!(sanitize("Cat 🐱 time", TOKENIZE), "Cat  time");
    }

    #[test]
    fn passthrough_keeps_bmp_emoji_but_drops_astral_ones() {
        assert_eq!(sanitize("Fast ⚡ and 🔥", PASSTHROUGH), "Fast ⚡ and");
    }

    #[test]
    fn passthrough_without_bmp_limit_keeps_astral_emoji() {
        assert_eq!(sanitize("Fire 🔥!", PASSTHROUGH_WIDE), "Fire 🔥!");
    }

    #[test]
    fn symbols_outside_the_allow_set_are_dropped() {
        assert_eq!(sanitize("Price: 5€ | 50% & more ~ $", PASSTHROUGH), "Price: 5  50  more");
    }

    #[test]
    fn brackets_only_survive_in_tokenize_style() {
        assert_eq!(sanitize("[tag]", PASSTHROUGH), "tag");
        assert_eq!(sanitize("[tag]", TOKENIZE), "[tag]");
    }

    proptest! {
        #[test]
        fn output_only_contains_allowed_characters(input in CAPTION_CHARS) {
            for style in [TOKENIZE, PASSTHROUGH, PASSTHROUGH_WIDE] {
                let cleaned = sanitize(&input, style);
                prop_assert!(cleaned.chars().all(|c| permitted(c, style)), "{:?} -> {:?}", input, cleaned);
                prop_assert!(!cleaned.contains('€'));
            }
        }

        #[test]
        fn sanitizing_twice_changes_nothing(input in any::<String>()) {
            for style in [TOKENIZE, PASSTHROUGH, PASSTHROUGH_WIDE] {
                let once = sanitize(&input, style);
                prop_assert_eq!(sanitize(&once, style), once);
            }
        }
    }
}
