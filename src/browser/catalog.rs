use crate::browser::selector::{Selector, SelectorSet};

/// Every locator the posting flow depends on. When the site's markup drifts,
/// this table is the only thing that should need to change.
#[derive(Debug, Clone)]
pub struct SelectorCatalog {
    pub username_field: SelectorSet,
    pub password_field: SelectorSet,
    pub login_submit: SelectorSet,
    pub not_now: SelectorSet,
    pub create_button: SelectorSet,
    pub create_url: String,
    pub post_option: SelectorSet,
    pub file_input: SelectorSet,
    pub reels_notice_ok: SelectorSet,
    pub crop_button: SelectorSet,
    pub crop_nine_sixteen: SelectorSet,
    pub next_button: SelectorSet,
    pub share_button: SelectorSet,
    pub caption_field: SelectorSet,
    pub share_confirmation: SelectorSet,
}

impl SelectorCatalog {
    pub fn instagram(site_url: &str) -> Self {
        let site_url = site_url.trim_end_matches('/');
        Self {
            username_field: SelectorSet::new("username field", vec![Selector::name("username")]),
            password_field: SelectorSet::new("password field", vec![Selector::name("password")]),
            login_submit: SelectorSet::new("login button", vec![Selector::css(r#"button[type="submit"]"#)]),
            not_now: SelectorSet::new(
                "Not now",
                vec![
                    Selector::xpath("//div[@role='button' and contains(@class, 'x1i10hfl') and text()='Not now']"),
                    Selector::xpath("//div[@role='button' and text()='Not now']"),
                    Selector::xpath("//button[text()='Not now']"),
                ],
            ),
            create_button: SelectorSet::new(
                "create",
                vec![
                    Selector::css(r#"svg[aria-label="Nova publicação"]"#),
                    Selector::css(r#"svg[aria-label="New post"]"#),
                    Selector::css(r#"svg[aria-label="Create"]"#),
                    Selector::css(r#"a[href*="/create/"]"#),
                ],
            ),
            create_url: format!("{site_url}/create/select/"),
            post_option: SelectorSet::new(
                "Post",
                vec![
                    Selector::xpath("//div[contains(@class, 'xdj266r') and contains(@class, 'x14z9mp')]//span[text()='Post']"),
                    Selector::xpath("//span[text()='Post']"),
                    Selector::xpath("//div[@role='button']//span[text()='Post']"),
                ],
            ),
            file_input: SelectorSet::new("file input", vec![Selector::css(r#"input[type="file"]"#)]),
            reels_notice_ok: SelectorSet::new(
                "reels notice OK",
                vec![
                    Selector::xpath("//div[.//h2[contains(text(), 'Video posts are now shared as reels')]]//button[text()='OK']"),
                    Selector::xpath("//button[text()='OK']"),
                ],
            ),
            crop_button: SelectorSet::new("crop", vec![Selector::css(r#"svg[aria-label="Select crop"]"#)]),
            crop_nine_sixteen: SelectorSet::new("9:16", vec![Selector::xpath("//span[text()='9:16']")]),
            next_button: advance_control("Next"),
            share_button: advance_control("Share"),
            caption_field: SelectorSet::new(
                "caption field",
                vec![
                    Selector::css(r#"div[aria-label="Write a caption..."][contenteditable="true"]"#),
                    Selector::css(r#"div[contenteditable="true"][role="textbox"]"#),
                ],
            ),
            share_confirmation: SelectorSet::new(
                "share confirmation",
                vec![
                    Selector::xpath("//h3[contains(text(), 'Your reel has been shared')]"),
                    Selector::xpath("//h3[contains(text(), 'Seu reel foi compartilhado')]"),
                    Selector::xpath("//h3[contains(text(), 'Your post has been shared')]"),
                    Selector::xpath("//h3[contains(text(), 'Seu post foi compartilhado')]"),
                ],
            ),
        }
    }
}

/// The wizard's "Next"/"Share" style buttons, which render as several
/// different element shapes depending on the page revision.
pub fn advance_control(text: &str) -> SelectorSet {
    SelectorSet::new(
        text,
        vec![
            Selector::xpath(format!("//div[@role='button' and contains(@class, 'x1i10hfl') and text()='{text}']")),
            Selector::xpath(format!("//button[text()='{text}']")),
            Selector::xpath(format!("//div[@role='button' and text()='{text}']")),
            Selector::xpath(format!("//span[text()='{text}']/parent::div[@role='button']")),
            Selector::xpath(format!("//*[contains(text(), '{text}') and (@role='button' or self::button)]")),
        ],
    )
}
